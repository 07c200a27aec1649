//! User configuration for the symbol registry.
//!
//! A registry file is YAML with optional sections; every section extends or
//! overrides the default table. Malformed entries are user-input faults and
//! abort startup with a descriptive message; no analysis runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cir::{LogLevel, Reference};

use super::{AbandonKind, Registry, WrapKind};

/// Failure while loading or validating a registry file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read registry config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse registry config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("wrapper entry {index}: empty package or name")]
    BadWrapper { index: usize },
    #[error("logger entry {index}: empty package or name")]
    BadLogger { index: usize },
}

/// A wrapper registration: `{package, type?, name, kind: "fmt"|"errors"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperEntry {
    pub package: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    pub name: String,
    pub kind: WrapKind,
}

/// A logger registration: `{package, type?, name, level}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerEntry {
    pub package: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    pub name: String,
    pub level: LogLevel,
}

/// A checker registration: `{func: Ref, class: Ref}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerEntry {
    pub func: Reference,
    pub class: Reference,
}

/// An abandon registration: `{ref: Ref, kind}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonEntry {
    #[serde(rename = "ref")]
    pub reference: Reference,
    pub kind: AbandonKind,
}

/// Top-level registry configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub wrappers: Vec<WrapperEntry>,
    #[serde(default)]
    pub loggers: Vec<LoggerEntry>,
    #[serde(default)]
    pub checkers: Vec<CheckerEntry>,
    #[serde(default)]
    pub constructors: Vec<Reference>,
    #[serde(default)]
    pub abandon: Vec<AbandonEntry>,
    #[serde(default)]
    pub sentinels: Vec<Reference>,
}

impl RegistryFile {
    /// Parse a registry file from YAML text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = serde_yaml::from_str(text)?;
        Ok(file)
    }

    /// Parse a registry file from disk.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Convert the file into an override registry, validating entries.
    pub fn to_registry(&self) -> Result<Registry, ConfigError> {
        let mut r = Registry::empty();

        for (index, entry) in self.wrappers.iter().enumerate() {
            if entry.package.is_empty() || entry.name.is_empty() {
                return Err(ConfigError::BadWrapper { index });
            }
            r.register_wrapper(entry_reference(&entry.package, &entry.type_name, &entry.name), entry.kind);
        }
        for (index, entry) in self.loggers.iter().enumerate() {
            if entry.package.is_empty() || entry.name.is_empty() {
                return Err(ConfigError::BadLogger { index });
            }
            r.register_logger(entry_reference(&entry.package, &entry.type_name, &entry.name), entry.level);
        }
        for entry in &self.checkers {
            r.register_checker(entry.func.clone(), entry.class.clone());
        }
        for reference in &self.constructors {
            r.register_constructor(reference.clone());
        }
        for entry in &self.abandon {
            r.register_abandon(entry.reference.clone(), entry.kind);
        }
        for reference in &self.sentinels {
            r.register_benign_sentinel(reference.clone());
        }
        Ok(r)
    }
}

fn entry_reference(package: &str, type_name: &Option<String>, name: &str) -> Reference {
    match type_name {
        Some(t) => Reference::method(package, t, name),
        None => Reference::func(package, name),
    }
}
