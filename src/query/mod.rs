pub mod client;
pub mod infinite;
pub mod key;

pub use client::{PageFetcher, QueryClient, Subscription};
pub use infinite::{PageResponse, QueryStatus};
pub use key::QueryKey;
