//! MCP server entries.
//!
//! Client config files describe a server either by `command` (a local process
//! spoken to over stdio) or by `url` (an http / sse endpoint). The raw JSON is
//! checked once in [`ServerConfig::parse`]; everything downstream matches on
//! the enum instead of probing for keys.

use crate::error::{ModelError, ModelResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Keys a client stored on an entry that this model has no field for.
/// Carried through untouched so a sync never strips them.
pub type ExtraFields = BTreeMap<String, Value>;

const STDIO_KEYS: &[&str] = &["type", "command", "args", "env", "disabled", "autoApprove"];
const NETWORK_KEYS: &[&str] = &["type", "url", "headers"];

/// A single MCP server entry.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerConfig {
    Stdio(StdioConfig),
    Network(NetworkConfig),
}

/// A server launched as a local process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StdioConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub disabled: Option<bool>,
    pub auto_approve: BTreeSet<String>,
    pub extra: ExtraFields,
}

/// Network transport flavour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Http,
    Sse,
}

impl NetworkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkKind::Http => "http",
            NetworkKind::Sse => "sse",
        }
    }
}

/// A server reached over http or sse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkConfig {
    pub kind: NetworkKind,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub extra: ExtraFields,
}

impl StdioConfig {
    pub fn new(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl NetworkConfig {
    pub fn new(kind: NetworkKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            ..Self::default()
        }
    }
}

impl ServerConfig {
    /// Validates raw JSON into a normalized entry.
    ///
    /// Exactly one of `command` / `url` must be present. `args` may be a list
    /// or a single command-line string; `env` and `headers` must be objects
    /// whose values are scalars.
    pub fn parse(raw: &Value) -> ModelResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ModelError::shape(format!("expected an object, got {}", kind_of(raw))))?;

        let has_command = present(obj, "command");
        let has_url = present(obj, "url");
        let declared = match obj.get("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(t)) => Some(t.as_str()),
            Some(other) => {
                return Err(ModelError::shape(format!(
                    "`type` must be a string, got {}",
                    kind_of(other)
                )));
            }
        };

        let config = match (has_command, has_url) {
            (true, true) => {
                return Err(ModelError::shape("entry has both `command` and `url`"));
            }
            (false, false) => {
                return Err(ModelError::shape("entry has neither `command` nor `url`"));
            }
            (true, false) => {
                if let Some(t) = declared.filter(|t| *t != "stdio") {
                    return Err(ModelError::shape(format!(
                        "`type` \"{t}\" conflicts with `command`"
                    )));
                }
                ServerConfig::Stdio(StdioConfig {
                    command: non_empty_string(obj, "command")?,
                    args: args_field(obj)?,
                    env: string_map(obj, "env")?,
                    disabled: optional_bool(obj, "disabled")?,
                    auto_approve: string_set(obj, "autoApprove")?,
                    extra: extra_fields(obj, STDIO_KEYS),
                })
            }
            (false, true) => {
                let kind = match declared {
                    None | Some("http") | Some("streamable-http") | Some("streamableHttp") => {
                        NetworkKind::Http
                    }
                    Some("sse") => NetworkKind::Sse,
                    Some(t) => {
                        return Err(ModelError::shape(format!(
                            "unsupported transport \"{t}\" for a `url` entry"
                        )));
                    }
                };
                ServerConfig::Network(NetworkConfig {
                    kind,
                    url: non_empty_string(obj, "url")?,
                    headers: string_map(obj, "headers")?,
                    extra: extra_fields(obj, NETWORK_KEYS),
                })
            }
        };

        Ok(config.normalize())
    }

    /// Parses a JSON document holding a single entry.
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| ModelError::shape(format!("not valid JSON: {e}")))?;
        Self::parse(&raw)
    }

    /// Returns the canonical form used for comparisons.
    ///
    /// Drops blank `args` tokens and trims `command` / `url`. Absent `env` /
    /// `headers` are already empty maps by construction.
    pub fn normalize(self) -> Self {
        match self {
            ServerConfig::Stdio(mut s) => {
                s.command = s.command.trim().to_string();
                s.args.retain(|a| !a.trim().is_empty());
                ServerConfig::Stdio(s)
            }
            ServerConfig::Network(mut n) => {
                n.url = n.url.trim().to_string();
                ServerConfig::Network(n)
            }
        }
    }

    /// Deep structural equality after normalization.
    pub fn equals(&self, other: &ServerConfig) -> bool {
        self.clone().normalize() == other.clone().normalize()
    }

    /// Transport name as written in the `type` key.
    pub fn transport(&self) -> &'static str {
        match self {
            ServerConfig::Stdio(_) => "stdio",
            ServerConfig::Network(n) => n.kind.as_str(),
        }
    }

    pub fn is_stdio(&self) -> bool {
        matches!(self, ServerConfig::Stdio(_))
    }

    /// Serializes to the client-file JSON shape.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        match self {
            ServerConfig::Stdio(s) => {
                for (k, v) in &s.extra {
                    obj.insert(k.clone(), v.clone());
                }
                obj.insert("type".into(), Value::from("stdio"));
                obj.insert("command".into(), Value::from(s.command.clone()));
                obj.insert(
                    "args".into(),
                    Value::Array(s.args.iter().cloned().map(Value::from).collect()),
                );
                obj.insert("env".into(), map_to_value(&s.env));
                if let Some(disabled) = s.disabled {
                    obj.insert("disabled".into(), Value::Bool(disabled));
                }
                if !s.auto_approve.is_empty() {
                    obj.insert(
                        "autoApprove".into(),
                        Value::Array(s.auto_approve.iter().cloned().map(Value::from).collect()),
                    );
                }
            }
            ServerConfig::Network(n) => {
                for (k, v) in &n.extra {
                    obj.insert(k.clone(), v.clone());
                }
                obj.insert("type".into(), Value::from(n.kind.as_str()));
                obj.insert("url".into(), Value::from(n.url.clone()));
                obj.insert("headers".into(), map_to_value(&n.headers));
            }
        }
        Value::Object(obj)
    }

    /// JSON text of the entry without its name, as stored in encrypted payloads.
    pub fn to_payload(&self) -> String {
        self.to_value().to_string()
    }
}

impl From<StdioConfig> for ServerConfig {
    fn from(value: StdioConfig) -> Self {
        ServerConfig::Stdio(value)
    }
}

impl From<NetworkConfig> for ServerConfig {
    fn from(value: NetworkConfig) -> Self {
        ServerConfig::Network(value)
    }
}

impl Serialize for ServerConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        ServerConfig::parse(&raw).map_err(D::Error::custom)
    }
}

/// A server entry together with the name it is keyed by.
///
/// The JSON form is the entry object plus a `name` key, matching the rows
/// the UI works with.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedServer {
    pub name: String,
    pub config: ServerConfig,
}

impl NamedServer {
    pub fn new(name: impl Into<String>, config: impl Into<ServerConfig>) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
        }
    }

    /// Parses a UI row: the entry keys plus `name` (an `id` key is ignored).
    pub fn parse(raw: &Value) -> ModelResult<Self> {
        let mut obj = raw
            .as_object()
            .cloned()
            .ok_or_else(|| ModelError::shape(format!("expected an object, got {}", kind_of(raw))))?;
        let name = match obj.remove("name") {
            Some(Value::String(n)) if !n.trim().is_empty() => n,
            _ => return Err(ModelError::shape("entry is missing a non-empty `name`")),
        };
        obj.remove("id");
        let config = ServerConfig::parse(&Value::Object(obj))
            .map_err(|e| ModelError::shape(format!("server '{name}': {}", shape_reason(&e))))?;
        Ok(Self { name, config })
    }

    pub fn to_value(&self) -> Value {
        let mut value = self.config.to_value();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("name".into(), Value::from(self.name.clone()));
        }
        value
    }
}

impl Serialize for NamedServer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NamedServer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        NamedServer::parse(&raw).map_err(D::Error::custom)
    }
}

fn shape_reason(err: &ModelError) -> String {
    match err {
        ModelError::InvalidConfigShape(reason) => reason.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn present(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

fn non_empty_string(obj: &Map<String, Value>, key: &str) -> ModelResult<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ModelError::shape(format!("`{key}` must not be empty"))),
        Some(other) => Err(ModelError::shape(format!(
            "`{key}` must be a string, got {}",
            kind_of(other)
        ))),
        None => Err(ModelError::shape(format!("`{key}` is missing"))),
    }
}

/// Renders a scalar as the string a client would have meant.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn args_field(obj: &Map<String, Value>) -> ModelResult<Vec<String>> {
    match obj.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        // A pasted command line: "-y @scope/server --flag"
        Some(Value::String(line)) => Ok(line.split_whitespace().map(str::to_string).collect()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                scalar_to_string(item).ok_or_else(|| {
                    ModelError::shape(format!(
                        "`args[{i}]` must be a string, got {}",
                        kind_of(item)
                    ))
                })
            })
            .collect(),
        Some(other) => Err(ModelError::shape(format!(
            "`args` must be an array of strings, got {}",
            kind_of(other)
        ))),
    }
}

fn string_map(obj: &Map<String, Value>, key: &str) -> ModelResult<BTreeMap<String, String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                if v.is_null() {
                    continue;
                }
                let s = scalar_to_string(v).ok_or_else(|| {
                    ModelError::shape(format!("`{key}.{k}` must be a string, got {}", kind_of(v)))
                })?;
                out.insert(k.clone(), s);
            }
            Ok(out)
        }
        Some(other) => Err(ModelError::shape(format!(
            "`{key}` must be an object, got {}",
            kind_of(other)
        ))),
    }
}

fn string_set(obj: &Map<String, Value>, key: &str) -> ModelResult<BTreeSet<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ModelError::shape(format!(
                    "`{key}` entries must be strings, got {}",
                    kind_of(other)
                ))),
            })
            .collect(),
        Some(other) => Err(ModelError::shape(format!(
            "`{key}` must be an array, got {}",
            kind_of(other)
        ))),
    }
}

fn optional_bool(obj: &Map<String, Value>, key: &str) -> ModelResult<Option<bool>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ModelError::shape(format!(
            "`{key}` must be a boolean, got {}",
            kind_of(other)
        ))),
    }
}

fn extra_fields(obj: &Map<String, Value>, known: &[&str]) -> ExtraFields {
    obj.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn map_to_value(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect(),
    )
}
