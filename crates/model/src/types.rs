use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ids::LineHandle;

/// Decoded payload of one relay line event. Absent fields mean "unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineData {
    pub line: LineHandle,
    #[serde(
        default,
        serialize_with = "serialize_unix_seconds",
        deserialize_with = "deserialize_unix_seconds"
    )]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub highlight: Option<bool>,
    #[serde(default)]
    pub displayed: Option<bool>,
}

impl LineData {
    pub fn new(line: LineHandle) -> Self {
        Self {
            line,
            date: None,
            prefix: None,
            message: None,
            tags: None,
            highlight: None,
            displayed: None,
        }
    }

    pub fn at(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Decoded nicklist entry fields; only present fields overwrite the roster entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NickFields {
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub group: Option<bool>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub prefix_color: Option<String>,
}

/// Buffer properties announced on open and on later rename/title events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferFields {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub local_variables: Option<BTreeMap<String, String>>,
}

fn serialize_unix_seconds<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_some(&date.timestamp()),
        None => serializer.serialize_none(),
    }
}

// Out-of-range dates become `None`, which sorts the line as synthetic rather than failing the event.
fn deserialize_unix_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = Option::<i64>::deserialize(deserializer)?;
    Ok(seconds.and_then(|seconds| DateTime::from_timestamp(seconds, 0)))
}
