pub mod cli;
pub mod config;
pub mod convert;
pub mod delete;
pub mod fs;
pub mod metadata;
mod metrics;
pub mod query;
pub mod scoring;
pub mod server;
pub mod store;

pub use config::Opts;
pub use query::{GroupQueryService, GroupView, ImageView, QueryError};
pub use store::{GroupStore, ImageRecord};
