//! Wire types shared with the recipe backend and the geolocation provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Geolocation blob cached on disk between page loads.
///
/// Unknown provider fields (`loc`, `org`, `postal`, ...) are kept so the cache
/// round-trips whatever the provider sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IpInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(
        rename = "userSelectedCity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_selected_city: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IpInfo {
    /// The IP if present and non-empty.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// RFC 3339 text or epoch milliseconds. Anything else leaves the blob
/// unstamped, which makes it stale.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc)),
        Some(serde_json::Value::Number(millis)) => {
            millis.as_i64().and_then(DateTime::from_timestamp_millis)
        }
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeRequest {
    pub mood: String,
    pub age: u32,
    pub city: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "prepTime", default, deserialize_with = "prep_time")]
    pub prep_time: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_city: Option<String>,
}

/// Accepts `"25 minutes"` as-is and turns a bare `25` into `"25 minutes"`.
fn prep_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PrepTime {
        Text(String),
        Minutes(u64),
        Fractional(f64),
        Missing(()),
    }

    Ok(match PrepTime::deserialize(deserializer)? {
        PrepTime::Text(text) => text,
        PrepTime::Minutes(minutes) => format!("{minutes} minutes"),
        PrepTime::Fractional(minutes) => format!("{minutes} minutes"),
        PrepTime::Missing(()) => String::new(),
    })
}

/// The recipe endpoint answers with either a recipe or `{"error": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RecipeResponse {
    Failure { error: serde_json::Value },
    Recipe(Recipe),
}

/// Stored recipes keyed by mood, then by recipe ID, both iterated in key order.
pub type RecipeHistory = BTreeMap<String, BTreeMap<String, Recipe>>;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedbackRequest {
    pub rating: String,
    pub comment: String,
    #[serde(rename = "clientIP")]
    pub client_ip: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedbackResponse {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HitCount {
    pub hit_count: u64,
}
