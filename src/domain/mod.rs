pub mod facet;
pub mod job;
pub mod repository;
pub mod trend;

pub use facet::{Language, Period, ALL_LANGUAGES_MACHINE_NAME};
pub use job::FetchJob;
pub use repository::{RepoResult, Repository};
pub use trend::{CompositeTrend, TrendEntry};
