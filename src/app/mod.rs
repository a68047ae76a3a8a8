pub mod context;
pub mod error;
pub mod run;

pub use context::AppContext;
pub use error::{Result, TrendError};
pub use run::{CrawlReport, Crawler};
