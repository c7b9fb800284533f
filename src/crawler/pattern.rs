//! Key patterns and segment globs
//!
//! A [`KeyPattern`] such as `data/spot/daily/klines/SYMBOL/1m/` names one
//! variable path segment. The part before the placeholder is listed to find
//! candidate segments; [`SegmentGlob`] decides which of them are expanded.

use std::fmt;
use std::str::FromStr;

/// Placeholder standing for the variable segment
pub const PLACEHOLDER: &str = "SYMBOL";

/// Errors building a pattern or glob
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// Pattern must contain the placeholder exactly once
    #[error("pattern '{pattern}' must contain '{PLACEHOLDER}' exactly once (found {found})")]
    PlaceholderCount { pattern: String, found: usize },

    /// Glob failed to compile
    #[error("invalid symbol glob '{glob}': {reason}")]
    InvalidGlob { glob: String, reason: String },
}

/// Path template with exactly one [`PLACEHOLDER`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    raw: String,
    prefix_len: usize,
}

impl KeyPattern {
    /// Parse a pattern, rejecting anything without exactly one placeholder
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let found = raw.matches(PLACEHOLDER).count();
        let prefix_len = match (found, raw.find(PLACEHOLDER)) {
            (1, Some(idx)) => idx,
            _ => {
                return Err(PatternError::PlaceholderCount {
                    pattern: raw.to_string(),
                    found,
                })
            }
        };
        Ok(Self {
            raw: raw.to_string(),
            prefix_len,
        })
    }

    /// Fixed part before the placeholder; listed to discover segments
    pub fn prefix(&self) -> &str {
        &self.raw[..self.prefix_len]
    }

    /// Fixed part after the placeholder
    pub fn suffix(&self) -> &str {
        &self.raw[self.prefix_len + PLACEHOLDER.len()..]
    }

    /// Substitute one segment value for the placeholder
    pub fn expand(&self, segment: &str) -> String {
        format!("{}{}{}", self.prefix(), segment, self.suffix())
    }

    /// Pattern as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for KeyPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Shell-style wildcard over segment values
#[derive(Debug, Clone)]
pub struct SegmentGlob {
    raw: String,
    compiled: glob::Pattern,
}

impl SegmentGlob {
    /// Compile a glob such as `BTC*` or `*USDT`
    pub fn new(raw: &str) -> Result<Self, PatternError> {
        let compiled = glob::Pattern::new(raw).map_err(|e| PatternError::InvalidGlob {
            glob: raw.to_string(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            compiled,
        })
    }

    /// Whether `segment` matches
    pub fn matches(&self, segment: &str) -> bool {
        self.compiled.matches(segment)
    }

    /// Glob as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for SegmentGlob {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for SegmentGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
