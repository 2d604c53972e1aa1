//! The decoded event record and watch payload decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// The kind of change a watch reported for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// The resource was created or first observed.
    Added,
    /// The resource was updated.
    Modified,
    /// The resource was removed.
    Deleted,
    /// A progress marker carrying only a resource version.
    Bookmark,
    /// The watch reported an error object instead of a resource.
    Error,
}

impl ChangeType {
    /// Returns the canonical watch string for this change type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
            Self::Bookmark => "BOOKMARK",
            Self::Error => "ERROR",
        }
    }

    /// Returns `true` if the watch object is a real resource.
    ///
    /// `BOOKMARK` carries only a resource version and `ERROR` carries a
    /// `Status` object; neither describes a resource instance.
    pub fn is_resource(self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = ParseChangeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(Self::Added),
            "MODIFIED" => Ok(Self::Modified),
            "DELETED" => Ok(Self::Deleted),
            "BOOKMARK" => Ok(Self::Bookmark),
            "ERROR" => Ok(Self::Error),
            _ => Err(ParseChangeTypeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown change type string.
#[derive(Debug, Clone)]
pub struct ParseChangeTypeError(pub String);

impl std::fmt::Display for ParseChangeTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown change type: {}", self.0)
    }
}

impl std::error::Error for ParseChangeTypeError {}

/// One decoded observation of a resource instance.
///
/// The five classification fields (`api_version`, `kind`, `namespace`,
/// `name`, `resource_version`) route the event through the index. The raw
/// payload and observation time are carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Resource kind, e.g. `Pod`.
    pub kind: String,
    /// API group and version, e.g. `v1` or `apps/v1`.
    pub api_version: String,
    /// Namespace of the resource; empty for cluster-scoped resources.
    pub namespace: String,
    /// Resource name.
    pub name: String,
    /// Opaque version token assigned by the control plane.
    pub resource_version: String,
    /// The change reported by the watch, when known.
    pub change: Option<ChangeType>,
    /// The undecoded object JSON.
    pub raw: String,
    /// When the event was observed.
    pub observed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ObjectHeader {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default, rename = "apiVersion")]
    api_version: Option<String>,
    #[serde(default)]
    metadata: Option<ObjectMeta>,
}

#[derive(Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default, rename = "resourceVersion")]
    resource_version: Option<String>,
}

#[derive(Deserialize)]
struct WatchEnvelope {
    #[serde(rename = "type")]
    change: ChangeType,
    object: serde_json::Value,
}

impl Event {
    /// Builds an event from its classification fields with an empty payload.
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        resource_version: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: kind.into(),
            api_version: api_version.into(),
            namespace: namespace.into(),
            name: name.into(),
            resource_version: resource_version.into(),
            change: None,
            raw: String::new(),
            observed_at,
        }
    }

    /// Decodes a bare resource object such as the body of a `GET`.
    ///
    /// Missing metadata fields decode as empty strings; `raw` keeps the input.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Decode` if `raw` is not a JSON object.
    pub fn from_object_json(raw: &str, observed_at: DateTime<Utc>) -> Result<Self, EventError> {
        let header: ObjectHeader = serde_json::from_str(raw)?;
        Ok(Self::from_header(header, None, raw.to_string(), observed_at))
    }

    /// Decodes one watch line of the form `{"type": ..., "object": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Decode` if the envelope or its object is malformed.
    pub fn from_watch_json(line: &str, observed_at: DateTime<Utc>) -> Result<Self, EventError> {
        let envelope: WatchEnvelope = serde_json::from_str(line)?;
        let header = ObjectHeader::deserialize(&envelope.object)?;
        Ok(Self::from_header(
            header,
            Some(envelope.change),
            envelope.object.to_string(),
            observed_at,
        ))
    }

    fn from_header(
        header: ObjectHeader,
        change: Option<ChangeType>,
        raw: String,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let metadata = header.metadata.unwrap_or_default();
        Self {
            kind: header.kind.unwrap_or_default(),
            api_version: header.api_version.unwrap_or_default(),
            namespace: metadata.namespace.unwrap_or_default(),
            name: metadata.name.unwrap_or_default(),
            resource_version: metadata.resource_version.unwrap_or_default(),
            change,
            raw,
            observed_at,
        }
    }

    /// Returns `true` if both events carry the same five classification fields.
    pub fn same_observation(&self, other: &Event) -> bool {
        self.api_version == other.api_version
            && self.kind == other.kind
            && self.namespace == other.namespace
            && self.name == other.name
            && self.resource_version == other.resource_version
    }

    /// Returns `true` for resources without a namespace.
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Checks the attributes the index cannot classify without.
    ///
    /// # Errors
    ///
    /// Returns `EventError::MissingField` when `kind` or `apiVersion` is empty.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.kind.is_empty() {
            return Err(EventError::MissingField("kind"));
        }
        if self.api_version.is_empty() {
            return Err(EventError::MissingField("apiVersion"));
        }
        Ok(())
    }
}
