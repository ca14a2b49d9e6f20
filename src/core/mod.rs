pub mod etl;
pub mod identity;
pub mod pipeline;
pub mod render;
pub mod resolve;

pub use crate::domain::model::{Ledger, RangeSummary, Report, SortOrder};
pub use crate::domain::ports::{ConfigProvider, IdentityNormalizer, Pipeline, VersionControl};
pub use crate::utils::error::Result;
