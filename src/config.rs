use std::path::PathBuf;

use crate::error::{HistogramError, Result};
use crate::merge::DEFAULT_TOP_N;

pub const DEFAULT_GRID_FILE: &str = "./melbGrid.json";
pub const DEFAULT_INPUT_FILE: &str = "./bigTwitter.json";

/// Settings for one histogram run.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramConfig {
    pub grid_path: PathBuf,
    pub input_path: PathBuf,
    pub workers: usize,
    /// Number of distinct frequency values reported per cell
    pub top_n: usize,
    /// Character that must sit on both sides of a hashtag
    pub hashtag_delimiter: char,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            grid_path: PathBuf::from(DEFAULT_GRID_FILE),
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            workers: num_cpus::get(),
            top_n: DEFAULT_TOP_N,
            hashtag_delimiter: ' ',
        }
    }
}

impl HistogramConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(HistogramError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(HistogramError::InvalidConfig(
                "top hashtag count must be at least 1".to_string(),
            ));
        }
        if self.hashtag_delimiter == '#' {
            return Err(HistogramError::InvalidConfig(
                "hashtag delimiter cannot be '#'".to_string(),
            ));
        }
        Ok(())
    }
}
