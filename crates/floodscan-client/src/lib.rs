#[cfg(feature = "browser")]
pub mod browser;
pub mod http;

#[cfg(feature = "browser")]
pub use browser::{BrowserOptions, BrowserSessionFactory};
pub use http::HttpSessionFactory;
