pub mod catalog;
pub mod config;
pub mod error;
pub mod lineparse;
pub mod logql;
pub mod model;
pub mod query;
pub mod time;
pub mod timeline;

pub use error::{LokimapError, Result};
