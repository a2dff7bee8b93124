pub mod dates;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod paginate;
pub mod pipeline;
pub mod render;
pub mod site;
pub mod taxonomy;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::AppError;
pub use fetch::{FetchConfig, PageFetcher};
pub use models::{NO_SUMMARY, QueryParams, Record, SearchQuery, TimeRange};
pub use pipeline::Pipeline;
pub use site::{SiteProfile, TimestampFormat, builtin_sites, find_site, load_sites};
pub use taxonomy::Taxonomy;
pub use traits::{PageSession, ResultBlock, SessionFactory};
