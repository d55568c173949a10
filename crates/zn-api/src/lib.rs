// zn-api: Async Rust client for the Zero Networks REST API

mod activities;
mod assets;
mod clusters;
mod groups;

pub mod client;
pub mod error;
pub mod filters;
pub mod pagination;
pub mod query;
pub mod retry;
pub mod token;
pub mod transport;
pub mod types;

pub use client::{DEFAULT_PORTAL_HOST, ZnClient};
pub use error::Error;
pub use filters::{FilterExpr, FilterSelection, FilterSet, NetworkFilter, NetworkFilterCatalog};
pub use groups::Upserted;
pub use pagination::{Cursor, CursorKey, DEFAULT_PAGE_SIZE, Page, PageStrategy, sort_by_name_desc};
pub use query::Query;
pub use retry::RetryPolicy;
pub use transport::TransportConfig;
