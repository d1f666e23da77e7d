//! The query under analysis.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum query length in characters after trimming.
pub const MAX_QUERY_CHARS: usize = 512;

/// A validated, trimmed search query.
///
/// Construct through [`Query::parse`]; a `Query` is never empty and never
/// longer than [`MAX_QUERY_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query(String);

impl Query {
    /// Validates and trims a raw query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the query is empty after trimming or
    /// exceeds [`MAX_QUERY_CHARS`].
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".to_string()));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(Error::InvalidInput(format!(
                "query is {chars} characters, maximum is {MAX_QUERY_CHARS}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the query text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased, alphanumeric tokens of the query.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        tokenize(&self.0)
    }
}

/// Splits text into lowercase alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Query {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.0
    }
}
