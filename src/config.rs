//! # Client Configuration
//!
//! A client needs two settings: the base URL its resource paths hang off, and whether every
//! write is sent as a create (`always_create`).
//!
//! `ClientConfig` can be built in code, deserialized from any serde format, or read from the
//! environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `RESOURCE_BRIDGE_BASE_URL` | base URL (required) |
//! | `RESOURCE_BRIDGE_ALWAYS_CREATE` | `true`/`false`, `1`/`0`, `yes`/`no` (default `false`) |

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};

pub const BASE_URL_VAR: &str = "RESOURCE_BRIDGE_BASE_URL";
pub const ALWAYS_CREATE_VAR: &str = "RESOURCE_BRIDGE_ALWAYS_CREATE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    #[serde(deserialize_with = "normalized_url")]
    base_url: String,
    #[serde(default)]
    always_create: bool,
}

impl ClientConfig {
    /// Trailing slashes of `base_url` are dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize(base_url.into()),
            always_create: false,
        }
    }

    pub fn with_always_create(mut self, always_create: bool) -> Self {
        self.always_create = always_create;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// When set, `save` and `update` POST like `create` regardless of the entity's id.
    pub fn always_create(&self) -> bool {
        self.always_create
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingVar(BASE_URL_VAR))?;

        let always_create = match lookup(ALWAYS_CREATE_VAR) {
            None => false,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "0" | "no" => false,
                "true" | "1" | "yes" => true,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: ALWAYS_CREATE_VAR,
                        value: raw,
                    })
                }
            },
        };

        Ok(Self::new(base_url.trim()).with_always_create(always_create))
    }
}

fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn normalized_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(normalize)
}
