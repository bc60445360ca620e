pub mod client;
pub mod fetch;

pub use client::{LokiClient, LokiTransport};
pub use fetch::{Cursor, query_logs};
