pub mod cache;
pub mod error;
pub mod posts;
pub mod state;
