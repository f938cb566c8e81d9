//! Configuration and per-call options for HAL containers

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorReporter, HalError, TracingReporter};
use crate::member::InvalidMemberPolicy;

/// Representation requested from serializers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    /// Plain JSON, the resource attributes only
    #[default]
    #[serde(rename = "application/json")]
    Json,
    /// Full HAL document including `_links` and `_embedded`
    #[serde(rename = "application/hal+json")]
    HalJson,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::HalJson => "application/hal+json",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "application/json" => Ok(ContentType::Json),
            "application/hal+json" => Ok(ContentType::HalJson),
            other => Err(HalError::Config(format!("Unsupported content type: {}", other))),
        }
    }
}

/// Configuration shared by a container and every member it creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HalConfig {
    /// Content type used when a call does not request one
    pub default_content_type: ContentType,

    /// What `Links` does with a value it cannot coerce
    pub links_policy: InvalidMemberPolicy,

    /// What `Embedded` does with a value it cannot coerce
    pub embedded_policy: InvalidMemberPolicy,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            default_content_type: ContentType::Json,
            links_policy: InvalidMemberPolicy::Report,
            embedded_policy: InvalidMemberPolicy::Raise,
        }
    }
}

impl HalConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> HalConfigBuilder {
        HalConfigBuilder::default()
    }

    /// Load a configuration from YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HalError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from JSON; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, HalError> {
        serde_json::from_str(json).map_err(|e| HalError::Config(e.to_string()))
    }

    /// Effective content type for a serialization call
    pub fn resolve_content_type(&self, options: &JsonOptions) -> ContentType {
        options.content_type.unwrap_or(self.default_content_type)
    }
}

/// Builder for HalConfig
#[derive(Debug, Default)]
pub struct HalConfigBuilder {
    config: HalConfig,
}

impl HalConfigBuilder {
    /// Set the fallback content type
    pub fn default_content_type(mut self, content_type: ContentType) -> Self {
        self.config.default_content_type = content_type;
        self
    }

    /// Set the invalid member policy of `Links`
    pub fn links_policy(mut self, policy: InvalidMemberPolicy) -> Self {
        self.config.links_policy = policy;
        self
    }

    /// Set the invalid member policy of `Embedded`
    pub fn embedded_policy(mut self, policy: InvalidMemberPolicy) -> Self {
        self.config.embedded_policy = policy;
        self
    }

    /// Use the same policy for both containers
    pub fn on_invalid_member(self, policy: InvalidMemberPolicy) -> Self {
        self.links_policy(policy).embedded_policy(policy)
    }

    /// Build the configuration
    pub fn build(self) -> HalConfig {
        self.config
    }
}

/// Configuration and error reporter shared along a resource tree
///
/// Members created by coercion inherit the context of their container.
#[derive(Clone)]
pub struct HalContext {
    pub config: Rc<HalConfig>,
    pub reporter: Rc<dyn ErrorReporter>,
}

impl HalContext {
    pub fn new(config: HalConfig, reporter: Rc<dyn ErrorReporter>) -> Self {
        Self {
            config: Rc::new(config),
            reporter,
        }
    }

    /// Context with the given configuration and the tracing reporter
    pub fn with_config(config: HalConfig) -> Self {
        Self::new(config, Rc::new(TracingReporter))
    }
}

impl Default for HalContext {
    fn default() -> Self {
        Self::with_config(HalConfig::default())
    }
}

impl fmt::Debug for HalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HalContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Options accepted by every `to_json` call
///
/// Forwarded unchanged to nested members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(content_type: ContentType) -> Self {
        Self {
            content_type: Some(content_type),
        }
    }

    pub fn hal() -> Self {
        Self::with_content_type(ContentType::HalJson)
    }
}

/// Options accepted by every store operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOptions {
    /// Store without notifying change listeners
    #[serde(default)]
    pub silent: bool,
}

impl SetOptions {
    pub fn silent() -> Self {
        Self { silent: true }
    }
}
