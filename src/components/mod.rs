pub mod app_shell;
pub mod feed;
pub mod layout;
