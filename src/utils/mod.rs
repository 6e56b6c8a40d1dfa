pub mod http;
pub mod simulation;
