pub mod load_more;
pub use load_more::{use_load_more, LoadMoreOptions};
