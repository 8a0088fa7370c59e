//! Spatial hashtag histogram over line-delimited JSON posts.
//!
//! The input is cut into byte ranges ([`partition::plan`]), each range is
//! scanned by its own [`PartitionAggregator`] against a private copy of the
//! [`GridIndex`], and the per-worker [`PartialAggregate`]s are summed and ranked
//! by the [`ResultMerger`].

pub mod aggregator;
pub mod config;
pub mod error;
pub mod grid;
pub mod merge;
pub mod partition;
pub mod pipeline;
pub mod record;
mod report;

pub use aggregator::{PartialAggregate, PartitionAggregator, RecordSource, ScanStats};
pub use config::HistogramConfig;
pub use error::{HistogramError, Result};
pub use grid::{Bounds, CellStats, Coordinate, GridIndex};
pub use merge::{top_hashtags, RankedCell, RankedReport, ResultMerger};
pub use partition::ByteRange;
pub use pipeline::Histogram;
pub use record::{ParseFailure, Record, RecordParser};
