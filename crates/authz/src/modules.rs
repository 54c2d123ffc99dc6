//! Coarse module gating (`allowedModules`).
//!
//! Entries are dot-separated module paths. `"*"` allows everything,
//! `"hr.*"` allows `hr` and anything below it, and a plain entry such as
//! `"hr.employee"` allows that path and its descendants. Comparison is by
//! whole segments, so `"hr"` never covers `"hrx"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::permissions::json_kind;

/// A single parsed `allowedModules` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModulePattern {
    /// `"*"`
    Any,
    /// `"<prefix>.*"`
    Prefix(String),
    /// `"<path>"`
    Exact(String),
}

impl ModulePattern {
    /// Parse an entry. Blank entries and degenerate wildcards (`".*"`) yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Some(Self::Any);
        }
        if let Some(prefix) = raw.strip_suffix(".*") {
            return valid_path(prefix).then(|| Self::Prefix(prefix.to_string()));
        }
        valid_path(raw).then(|| Self::Exact(raw.to_string()))
    }

    /// Whether this entry grants access to `module`.
    pub fn matches(&self, module: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(base) | Self::Exact(base) => covers(base, module),
        }
    }
}

impl core::fmt::Display for ModulePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(p) => write!(f, "{p}.*"),
            Self::Exact(p) => f.write_str(p),
        }
    }
}

impl Serialize for ModulePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModulePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid module pattern '{raw}'")))
    }
}

fn valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|seg| !seg.is_empty() && seg != "*")
}

/// `module` equals `base` or lies below it, compared segment by segment.
fn covers(base: &str, module: &str) -> bool {
    let mut candidate = module.split('.');
    base.split('.').all(|seg| candidate.next() == Some(seg))
}

/// Ordered `allowedModules` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AllowedModules(Vec<ModulePattern>);

impl AllowedModules {
    pub fn new(patterns: Vec<ModulePattern>) -> Self {
        Self(patterns)
    }

    /// Parse string entries, dropping (and logging) invalid ones.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.as_ref();
            match ModulePattern::parse(entry) {
                Some(p) => out.push(p),
                None => tracing::warn!(entry, "dropping invalid allowed-module entry"),
            }
        }
        Self(out)
    }

    pub fn from_json_lossy(value: &Value) -> Self {
        let Some(items) = value.as_array() else {
            if !value.is_null() {
                tracing::warn!(kind = json_kind(value), "allowed modules is not an array; treating as empty");
            }
            return Self::default();
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(s) => entries.push(s),
                None => tracing::warn!(kind = json_kind(item), "dropping non-string allowed-module entry"),
            }
        }
        Self::from_entries(entries)
    }

    pub fn patterns(&self) -> &[ModulePattern] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_any(&self) -> bool {
        self.0.iter().any(|p| *p == ModulePattern::Any)
    }

    pub fn allows(&self, module: &str) -> bool {
        self.contains_any() || self.0.iter().any(|p| p.matches(module))
    }
}

impl<'de> Deserialize<'de> for AllowedModules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json_lossy(&value))
    }
}
