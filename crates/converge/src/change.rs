//! Change records - one typed delta for one resource

use crate::snapshot::Attributes;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Placeholder rendered instead of secret attribute values
pub const MASKED: &str = "[secret]";

static SECRET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password|secret|token").expect("valid secret key pattern"));

/// Whether an attribute key names a secret (`*password*`, `*secret*`, `*token*`)
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEY.is_match(key)
}

/// Kind of delta a change record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
    /// Resource already satisfies the desired state
    NoOp,
    /// Add a user to a group
    SetGroup,
    /// Write service configuration after an install
    Configure,
}

impl ChangeKind {
    /// Plan symbol used by renderers
    pub fn symbol(self) -> char {
        match self {
            Self::Create | Self::SetGroup | Self::Configure => '+',
            Self::Update => '~',
            Self::Delete => '-',
            Self::NoOp => '=',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
            Self::SetGroup => "set-group",
            Self::Configure => "configure",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable description of one delta to one resource
///
/// Built through the constructors below and read through accessors. A
/// `NoOp` record never carries new or old values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    kind: ChangeKind,
    resource_id: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    new_values: Attributes,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    old_values: Attributes,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    diff_properties: Attributes,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    details: Attributes,
}

impl ChangeRecord {
    /// Start a record of the given kind with no attributes
    pub fn new(kind: ChangeKind, resource_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
            new_values: Attributes::new(),
            old_values: Attributes::new(),
            diff_properties: Attributes::new(),
            details: Attributes::new(),
        }
    }

    /// A create carrying every desired attribute
    pub fn create(resource_id: impl Into<String>, new_values: Attributes) -> Self {
        Self {
            new_values,
            ..Self::new(ChangeKind::Create, resource_id)
        }
    }

    /// An update restricted to the differing keys
    ///
    /// `diff_properties` gets an `"old -> new"` string for every key in
    /// `new_values`.
    pub fn update(resource_id: impl Into<String>, old_values: Attributes, new_values: Attributes) -> Self {
        let diff_properties = new_values
            .iter()
            .map(|(key, new)| {
                let old = old_values.get(key).map_or_else(|| "<unset>".to_string(), plain);
                (key.clone(), Value::String(format!("{} -> {}", old, plain(new))))
            })
            .collect();
        Self {
            new_values,
            old_values,
            diff_properties,
            ..Self::new(ChangeKind::Update, resource_id)
        }
    }

    /// Marker that the resource already matches its desired state
    pub fn no_op(resource_id: impl Into<String>, message: &str) -> Self {
        Self::new(ChangeKind::NoOp, resource_id).with_detail("message", message)
    }

    /// Builder-style new value. Ignored on `NoOp` records.
    pub fn with_new(mut self, key: &str, value: impl Into<Value>) -> Self {
        if self.kind != ChangeKind::NoOp {
            self.new_values.insert(key.to_string(), value.into());
        }
        self
    }

    /// Builder-style detail annotation
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn new_values(&self) -> &Attributes {
        &self.new_values
    }

    pub fn old_values(&self) -> &Attributes {
        &self.old_values
    }

    pub fn diff_properties(&self) -> &Attributes {
        &self.diff_properties
    }

    pub fn details(&self) -> &Attributes {
        &self.details
    }

    /// Kind part of the resource id (`"user"` for `"user:ops"`)
    pub fn resource_kind(&self) -> &str {
        self.resource_id
            .split_once(':')
            .map_or(self.resource_id.as_str(), |(kind, _)| kind)
    }

    /// Name part of the resource id (`"ops"` for `"user:ops"`)
    pub fn resource_name(&self) -> &str {
        self.resource_id
            .split_once(':')
            .map_or("", |(_, name)| name)
    }

    /// Whether this record asks for any mutation
    pub fn is_change(&self) -> bool {
        self.kind != ChangeKind::NoOp
    }

    /// Look up a string in `new_values`
    pub fn new_str(&self, key: &str) -> Option<&str> {
        self.new_values.get(key).and_then(Value::as_str)
    }

    /// Look up a boolean in `new_values`
    pub fn new_bool(&self, key: &str) -> Option<bool> {
        self.new_values.get(key).and_then(Value::as_bool)
    }

    /// Copy of this record with secret values replaced by [`MASKED`]
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        for map in [
            &mut copy.new_values,
            &mut copy.old_values,
            &mut copy.diff_properties,
        ] {
            for (key, value) in map.iter_mut() {
                if is_secret_key(key) {
                    *value = Value::String(MASKED.to_string());
                }
            }
        }
        copy
    }
}

/// Render an attribute value for display, masking secrets
pub fn display_value(key: &str, value: &Value) -> String {
    if is_secret_key(key) {
        MASKED.to_string()
    } else {
        plain(value)
    }
}

/// Strings without JSON quotes, everything else as JSON
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
