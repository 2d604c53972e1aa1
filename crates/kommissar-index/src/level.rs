//! Classification levels and their transition rules.

use kommissar_types::Event;

/// The attribute a tree node classifies on.
///
/// Each variant matches events sharing one attribute at its depth and knows
/// which variant a matching event descends into next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationLevel {
    /// Matches every event.
    Root,
    /// Matches events with this API version.
    ApiVersion {
        /// The API version, e.g. `apps/v1`.
        value: String,
    },
    /// Matches events with this kind.
    Kind {
        /// The resource kind.
        value: String,
    },
    /// Matches events in this namespace.
    Namespace {
        /// The namespace; never empty.
        value: String,
    },
    /// Matches events for this resource name within the branch's namespace.
    ///
    /// `namespace` is empty for Name nodes created directly under a Kind, so
    /// cluster-scoped and namespaced resources never share a Name node.
    Name {
        /// The resource name.
        value: String,
        /// The namespace of the path this node sits on.
        namespace: String,
    },
    /// Matches events with this resource version. Always a leaf.
    ResourceVersion {
        /// The resource version token.
        value: String,
        /// The most recently ingested event for this exact path.
        last_event: Option<Event>,
    },
}

impl ClassificationLevel {
    /// Returns `true` if `event` belongs under a node at this level.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Root => true,
            Self::ApiVersion { value } => *value == event.api_version,
            Self::Kind { value } => *value == event.kind,
            Self::Namespace { value } => *value == event.namespace,
            Self::Name { value, namespace } => {
                *value == event.name && *namespace == event.namespace
            }
            Self::ResourceVersion { value, .. } => *value == event.resource_version,
        }
    }

    /// Computes the child level a matching event descends into.
    ///
    /// Returns `None` for `ResourceVersion`, the terminal level.
    pub fn next_level(&self, event: &Event) -> Option<Self> {
        match self {
            Self::Root => Some(Self::ApiVersion {
                value: event.api_version.clone(),
            }),
            Self::ApiVersion { .. } => Some(Self::Kind {
                value: event.kind.clone(),
            }),
            Self::Kind { .. } if !event.namespace.is_empty() => Some(Self::Namespace {
                value: event.namespace.clone(),
            }),
            Self::Kind { .. } | Self::Namespace { .. } => Some(Self::Name {
                value: event.name.clone(),
                namespace: event.namespace.clone(),
            }),
            Self::Name { .. } => Some(Self::ResourceVersion {
                value: event.resource_version.clone(),
                last_event: None,
            }),
            Self::ResourceVersion { .. } => None,
        }
    }

    /// Returns the display label for a node at this level.
    pub fn label(&self) -> String {
        match self {
            Self::Root => "*".to_string(),
            Self::ApiVersion { value }
            | Self::Kind { value }
            | Self::Namespace { value }
            | Self::Name { value, .. } => value.clone(),
            Self::ResourceVersion { value, .. } => format!("#{value}"),
        }
    }

    /// Returns a stable tag naming the variant.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::ApiVersion { .. } => "apiVersion",
            Self::Kind { .. } => "kind",
            Self::Namespace { .. } => "namespace",
            Self::Name { .. } => "name",
            Self::ResourceVersion { .. } => "resourceVersion",
        }
    }

    /// Returns `true` for the terminal `ResourceVersion` level.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::ResourceVersion { .. })
    }

    /// Returns the event stored on a `ResourceVersion` level.
    pub fn last_event(&self) -> Option<&Event> {
        match self {
            Self::ResourceVersion { last_event, .. } => last_event.as_ref(),
            _ => None,
        }
    }

    /// Applies the terminal side effect: stores `event` as the latest event.
    ///
    /// Only `ResourceVersion` stores anything; returns `true` if it did.
    pub fn record(&mut self, event: Event) -> bool {
        match self {
            Self::ResourceVersion { last_event, .. } => {
                *last_event = Some(event);
                true
            }
            _ => false,
        }
    }
}
