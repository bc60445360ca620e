use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{LokimapError, Result};

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceNames {
    pub display: String,
    #[serde(default)]
    pub methods: HashMap<String, String>,
}

/// Read-only service/method localization table. Loaded once at startup and
/// injected where needed; lookups are exact-match only and unknown ids fall
/// back to the raw identifier.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct NameCatalog {
    services: HashMap<String, ServiceNames>,
}

impl NameCatalog {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| LokimapError::Config(format!("invalid name catalog: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            LokimapError::Config(format!("failed reading {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// The catalog compiled into the binary. Validity is covered by a test.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_CATALOG).expect("embedded catalog is valid")
    }

    pub fn service_display<'a>(&'a self, service_id: &'a str) -> &'a str {
        self.services
            .get(service_id)
            .map(|s| s.display.as_str())
            .unwrap_or(service_id)
    }

    pub fn method_display<'a>(&'a self, service_id: &str, method_id: &'a str) -> &'a str {
        self.services
            .get(service_id)
            .and_then(|s| s.methods.get(method_id))
            .map(String::as_str)
            .unwrap_or(method_id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
