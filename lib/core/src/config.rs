use serde::{Deserialize, Serialize};
use crate::path::{DEFAULT_MAX_HOPS, DEFAULT_PATH_LIMIT};
use crate::places::DEFAULT_FUZZY_THRESHOLD;
use crate::{Error, Result};

/// Query defaults shared by the HTTP layer and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Upper bound on legs per path; callers may lower it per request
    pub max_hops: usize,
    pub path_limit: usize,
    pub bbox_limit: usize,
    pub autocomplete_limit: usize,
    /// Minimum Jaro-Winkler similarity for fuzzy autocomplete matches
    pub fuzzy_threshold: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            path_limit: DEFAULT_PATH_LIMIT,
            bbox_limit: 10,
            autocomplete_limit: 10,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(Error::InvalidConfig("max_hops must be at least 1".to_string()));
        }
        if self.path_limit == 0 || self.bbox_limit == 0 || self.autocomplete_limit == 0 {
            return Err(Error::InvalidConfig("limits must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(Error::InvalidConfig(format!(
                "fuzzy_threshold must be within [0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }
}
