//! Model specification types

use crate::completion::CompletionRequest;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameters mapped onto dedicated request fields; everything else is
/// passed through as an extra body field.
const TEMPERATURE: &str = "temperature";
const TOP_P: &str = "top_p";
const MAX_TOKENS: &str = "max_tokens";

/// Declared type of a tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// `true` / `false`
    Bool,
    /// Integer
    Int,
    /// Floating point (integers are accepted)
    Float,
    /// Free-form string
    String,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// A concrete parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
}

impl ParameterValue {
    /// Whether this value is acceptable for `kind`
    #[must_use]
    pub fn matches(&self, kind: ParameterKind) -> bool {
        matches!(
            (self, kind),
            (Self::Bool(_), ParameterKind::Bool)
                | (Self::Int(_), ParameterKind::Int)
                | (Self::Int(_) | Self::Float(_), ParameterKind::Float)
                | (Self::Str(_), ParameterKind::String)
        )
    }

    /// Numeric value as `f64`
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// JSON form for pass-through body fields
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Bool(v) => Some(serde_json::Value::Bool(*v)),
            Self::Int(v) => Some(serde_json::Value::from(*v)),
            Self::Float(v) => serde_json::Number::from_f64(*v).map(serde_json::Value::Number),
            Self::Str(v) => Some(serde_json::Value::String(v.clone())),
        }
    }
}

/// A tunable parameter: declared type, default and optional override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Declared type
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Default value
    pub default: ParameterValue,
    /// Value used instead of the default when set
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_value: Option<ParameterValue>,
}

impl ParameterSpec {
    /// Create a parameter with only a default
    #[must_use]
    pub fn new(kind: ParameterKind, default: ParameterValue) -> Self {
        Self {
            kind,
            default,
            override_value: None,
        }
    }

    /// Set the override
    #[must_use]
    pub fn with_override(mut self, value: ParameterValue) -> Self {
        self.override_value = Some(value);
        self
    }

    /// Override if set, otherwise the default
    #[must_use]
    pub fn effective(&self) -> &ParameterValue {
        self.override_value.as_ref().unwrap_or(&self.default)
    }

    /// Check that default and override agree with the declared type
    pub(crate) fn validate(&self, name: &str) -> std::result::Result<(), String> {
        if !self.default.matches(self.kind) {
            return Err(format!(
                "parameter '{name}' default {:?} is not a {}",
                self.default, self.kind
            ));
        }
        if let Some(value) = &self.override_value {
            if !value.matches(self.kind) {
                return Err(format!(
                    "parameter '{name}' override {value:?} is not a {}",
                    self.kind
                ));
            }
        }
        let expected = match name {
            TEMPERATURE | TOP_P => Some(ParameterKind::Float),
            MAX_TOKENS => Some(ParameterKind::Int),
            _ => None,
        };
        match expected {
            Some(kind) if kind != self.kind => Err(format!(
                "parameter '{name}' must be declared as {kind}, found {}",
                self.kind
            )),
            _ => Ok(()),
        }
    }
}

/// Immutable per-model configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Unique model name used on the command line and in artifact names
    pub name: String,
    /// Provider id resolving to a registered factory
    pub provider_id: String,
    /// Model identifier sent to the backend
    pub backend_model_id: String,
    /// Input token limit
    pub context_window_tokens: usize,
    /// Output token limit
    pub max_output_tokens: u32,
    /// Tunable parameters by name
    pub parameters: BTreeMap<String, ParameterSpec>,
}

impl ModelSpec {
    /// Effective value of a parameter
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.get(name).map(ParameterSpec::effective)
    }

    /// Build a generation request for a rendered prompt
    ///
    /// `max_tokens` never exceeds `max_output_tokens`; parameters without a
    /// dedicated request field are sent as extra body fields.
    #[must_use]
    pub fn build_request(&self, prompt: &str) -> CompletionRequest {
        let mut request =
            CompletionRequest::new(&self.backend_model_id).with_message(Message::user(prompt));

        let mut max_tokens = self.max_output_tokens;
        for (name, spec) in &self.parameters {
            let value = spec.effective();
            match name.as_str() {
                TEMPERATURE => request.temperature = value.as_f64().map(|v| v as f32),
                TOP_P => request.top_p = value.as_f64().map(|v| v as f32),
                MAX_TOKENS => {
                    if let Some(v) = value.as_i64().filter(|v| *v > 0) {
                        max_tokens = max_tokens.min(u32::try_from(v).unwrap_or(u32::MAX));
                    }
                }
                _ => {
                    if let Some(json) = value.to_json() {
                        request.extra.insert(name.clone(), json);
                    }
                }
            }
        }

        request.with_max_tokens(max_tokens)
    }
}
