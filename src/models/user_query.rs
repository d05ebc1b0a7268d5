use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::null_as_default;

/// Userid reported for a batch entry that carries none
const UNKNOWN_USER: &str = "unknown";

/// A user's search and favorite history, the input of a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub userid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub search_history: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorites: Vec<String>,
}

impl UserQuery {
    pub fn new(
        userid: impl Into<String>,
        search_history: Vec<String>,
        favorites: Vec<String>,
    ) -> Self {
        Self {
            userid: userid.into(),
            search_history,
            favorites,
        }
    }

    /// Reads one entry of a recommendation batch. A malformed entry is
    /// returned as an [`InvalidQuery`] naming the best userid available.
    pub fn from_value(value: Value) -> Result<Self, InvalidQuery> {
        let userid = match value.get("userid") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => UNKNOWN_USER.to_string(),
            Some(other) => other.to_string(),
        };

        serde_json::from_value(value).map_err(|error| InvalidQuery { userid, error })
    }

    /// Search history followed by favorites, space-joined, trimmed and lowercased
    pub fn interest_text(&self) -> String {
        self.search_history
            .iter()
            .chain(self.favorites.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_lowercase()
    }
}

/// A batch entry that could not be read as a [`UserQuery`]
#[derive(Debug, thiserror::Error)]
#[error("invalid query for user {userid}: {error}")]
pub struct InvalidQuery {
    pub userid: String,
    #[source]
    pub error: serde_json::Error,
}

/// Outcome of a recommendation for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    /// Nothing could be recommended (no interest text or no active events)
    NoRecommendation,
    /// Event ids, most similar first
    Recommendations(Vec<String>),
}

impl Recommendation {
    pub fn event_ids(&self) -> Option<&[String]> {
        match self {
            Recommendation::NoRecommendation => None,
            Recommendation::Recommendations(ids) => Some(ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationResult {
    pub userid: String,
    pub recommendation: Recommendation,
}

impl RecommendationResult {
    pub fn none(userid: impl Into<String>) -> Self {
        Self {
            userid: userid.into(),
            recommendation: Recommendation::NoRecommendation,
        }
    }
}
