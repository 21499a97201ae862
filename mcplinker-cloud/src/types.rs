//! Wire and report types for cloud backup.

use chrono::{DateTime, NaiveDateTime, Utc};
use mcplinker_model::NamedServer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A stored record as the API returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    #[serde(deserialize_with = "deserialize_id_from_str_or_num")]
    pub id: String,
    pub server_name: String,
    #[serde(default)]
    pub client_name: String,
    /// Encrypted JSON of the entry, name excluded. Empty when the row
    /// carries no usable payload.
    #[serde(
        rename = "encryptConfigData",
        default,
        deserialize_with = "deserialize_payload"
    )]
    pub cipher_text: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A record to be created or upserted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub server_name: String,
    pub client_name: String,
    #[serde(rename = "encryptConfigData")]
    pub cipher_text: String,
}

/// Body of the list endpoint. Rows are decoded one by one so a single
/// malformed row cannot hide the others.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecordList {
    #[serde(default)]
    pub configs: Vec<Value>,
}

impl RecordList {
    /// Rows without a usable id or server name are dropped with a warning.
    pub fn into_records(self) -> Vec<EncryptedRecord> {
        self.configs
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<EncryptedRecord>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "dropping unreadable cloud record");
                    None
                }
            })
            .collect()
    }
}

/// Summary of what the cloud holds for one client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudStatus {
    pub total: usize,
    /// Latest `updatedAt` across the records, `None` when there are none.
    pub last_sync: Option<DateTime<Utc>>,
}

/// Which step an item failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Upload,
    Download,
    Delete,
}

/// One entry that did not make it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub name: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(name: impl Into<String>, kind: FailureKind, reason: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Aggregate outcome of a multi-entry operation.
///
/// Successes are never rolled back because a sibling failed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn record_success(&mut self, name: impl Into<String>) {
        self.succeeded.push(name.into());
    }

    pub fn record_failure(&mut self, failure: ItemFailure) {
        self.failed.push(failure);
    }

    /// `"3 of 10 entries failed"`, or `None` when everything succeeded.
    pub fn summary(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        Some(format!(
            "{} of {} entries failed",
            self.failed.len(),
            self.total()
        ))
    }
}

/// Servers reconstructed from the cloud plus the records that were skipped.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DownloadReport {
    pub servers: Vec<NamedServer>,
    pub skipped: Vec<ItemFailure>,
}

/// Access and refresh tokens for the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Accepts either a JSON number or a string id.
fn deserialize_id_from_str_or_num<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct IdVisitor;
    impl<'de> de::Visitor<'de> for IdVisitor {
        type Value = String;
        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or integer id")
        }
        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }
    }
    deserializer.deserialize_any(IdVisitor)
}

/// A string payload, or empty for `null` and other non-string values.
fn deserialize_payload<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC. Anything
/// else reads as `None`.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = match Value::deserialize(deserializer)? {
        Value::String(raw) => raw,
        _ => return Ok(None),
    };
    Ok(parse_timestamp(&raw))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .ok()
}
