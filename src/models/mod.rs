use serde::{de, Deserialize, Deserializer, Serialize};

mod event;
mod user_query;

pub use event::{Catalog, Event, EventId, END_STATUS};
pub use user_query::{InvalidQuery, Recommendation, RecommendationResult, UserQuery};

// ============================================================================
// Recommendation API Types
// ============================================================================

/// Per-user entry of the `/recommend` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub userid: String,
    pub festival_recommendations: Vec<FestivalRecommendation>,
}

/// `eventid` is `null` when nothing could be recommended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalRecommendation {
    pub eventid: Option<Vec<String>>,
}

impl From<RecommendationResult> for RecommendationResponse {
    fn from(result: RecommendationResult) -> Self {
        let eventid = match result.recommendation {
            Recommendation::NoRecommendation => None,
            Recommendation::Recommendations(ids) => Some(ids),
        };

        RecommendationResponse {
            userid: result.userid,
            festival_recommendations: vec![FestivalRecommendation { eventid }],
        }
    }
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// Event submitted to `/events`; the id may be a JSON string or integer
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    #[serde(deserialize_with = "deserialize_event_id")]
    pub eventid: EventId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<NewEvent> for Event {
    fn from(new_event: NewEvent) -> Self {
        Event {
            eventid: new_event.eventid,
            title: new_event.title,
            category: new_event.category,
            location: new_event.location,
            description: new_event.description,
            status: new_event.status.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEventsResponse {
    /// Events received in the request
    pub added: usize,
    /// Catalog size after the update
    pub total: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEventId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

/// Reads an explicit JSON `null` the same way as an absent field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_event_id<'de, D>(deserializer: D) -> Result<EventId, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match RawEventId::deserialize(deserializer)? {
        RawEventId::Text(text) => EventId::from(text.trim()),
        RawEventId::Signed(n) => EventId::new(n.to_string()),
        RawEventId::Unsigned(n) => EventId::from(n),
    };

    if id.as_str().is_empty() {
        return Err(de::Error::custom("eventid must not be empty"));
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recommendations_serialize_as_array() {
        let response = RecommendationResponse::from(RecommendationResult {
            userid: "u1".to_string(),
            recommendation: Recommendation::Recommendations(vec!["1".to_string(), "7".to_string()]),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"userid": "u1", "festivalRecommendations": [{"eventid": ["1", "7"]}]})
        );
    }

    #[test]
    fn test_no_recommendation_serializes_as_null() {
        let response = RecommendationResponse::from(RecommendationResult::none("u2"));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"userid": "u2", "festivalRecommendations": [{"eventid": null}]})
        );
    }

    #[test]
    fn test_new_event_accepts_integer_id() {
        let new_event: NewEvent =
            serde_json::from_value(json!({"eventid": 12, "title": "Lantern Festival"})).unwrap();
        let event = Event::from(new_event);
        assert_eq!(event.eventid, EventId::from("12"));
        assert_eq!(event.title, "Lantern Festival");
        assert_eq!(event.description, "");
        assert_eq!(event.status, None);
    }

    #[test]
    fn test_new_event_rejects_blank_id() {
        let result: Result<NewEvent, _> = serde_json::from_value(json!({"eventid": "  "}));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_event_null_fields_are_empty() {
        let new_event: NewEvent = serde_json::from_value(json!({
            "eventid": 3,
            "title": "jazz festival",
            "category": null,
            "location": null,
            "description": null,
            "status": null
        }))
        .unwrap();
        let event = Event::from(new_event);
        assert_eq!(event.title, "jazz festival");
        assert_eq!(event.category, "");
        assert_eq!(event.location, "");
        assert_eq!(event.description, "");
        assert_eq!(event.status, None);
    }

    #[test]
    fn test_new_event_blank_status_is_none() {
        let new_event: NewEvent =
            serde_json::from_value(json!({"eventid": "9", "status": ""})).unwrap();
        assert_eq!(Event::from(new_event).status, None);
    }
}
