//! Remote Data Source
//!
//! Everything that reads the backend over HTTP:
//!
//! - **client**: REST client for table pages and token search
//! - **loader**: paginated bulk loader over any [`PageSource`]
//! - **error**: error types
//!
//! ```text
//! PaginatedLoader ──fetch_page(offset, limit)──▶ TableSource<E> ──▶ SourceClient ──▶ /rest/v1/{table}
//! ```

pub mod client;
pub mod error;
pub mod loader;

pub use client::{SourceClient, SourceConfig, TableQuery, TableSource, TokenProfile};
pub use error::{SourceError, SourceResult};
pub use loader::{PageSource, PaginatedLoader};
