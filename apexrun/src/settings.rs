//! Run settings: CLI flags merged over an optional TOML config file.
//!
//! Every field a flag can set can also live in the file; flags win. The
//! string `"null"` (or an empty string) in a namespace list selects classes
//! with no namespace.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use apexrun_core::SelectionCriteria;
use serde::Deserialize;

/// Optional TOML run configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfigFile {
    /// SOQL `LIKE` patterns for class names.
    pub patterns: Option<Vec<String>>,
    /// Exact class names.
    pub exact_names: Option<Vec<String>>,
    /// Namespace prefixes; `"null"` selects the empty namespace.
    pub namespaces: Option<Vec<String>>,
    pub coverage: Option<bool>,
    pub poll_interval_ms: Option<u64>,
    pub max_submit_attempts: Option<u32>,
    pub max_polls: Option<u32>,
}

impl RunConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("malformed config file {}", path.display()))
    }
}

/// Map raw namespace strings to selection entries.
pub fn parse_namespaces(raw: &[String]) -> Vec<Option<String>> {
    raw.iter()
        .map(|ns| {
            if ns.is_empty() || ns.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(ns.clone())
            }
        })
        .collect()
}

/// Fully merged run settings (credentials are resolved separately).
#[derive(Debug, Clone)]
pub struct Settings {
    pub selection: SelectionCriteria,
    pub coverage: bool,
    pub poll_interval: Duration,
    pub max_submit_attempts: Option<u32>,
    pub max_polls: Option<u32>,
}

/// Flag values that override the config file when supplied.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub patterns: Vec<String>,
    pub exact_names: Vec<String>,
    pub namespaces: Vec<String>,
    pub coverage: bool,
    pub poll_interval: Option<Duration>,
    pub max_submit_attempts: Option<u32>,
    pub max_polls: Option<u32>,
}

/// Merge flags over the config file into final settings.
pub fn merge(file: &RunConfigFile, flags: &Overrides) -> Settings {
    let patterns = if flags.patterns.is_empty() {
        file.patterns.clone()
    } else {
        Some(flags.patterns.clone())
    };
    let exact_names = if flags.exact_names.is_empty() {
        file.exact_names.clone()
    } else {
        Some(flags.exact_names.clone())
    };
    let namespaces = if flags.namespaces.is_empty() {
        file.namespaces
            .as_deref()
            .map(parse_namespaces)
            .unwrap_or_else(|| vec![None])
    } else {
        parse_namespaces(&flags.namespaces)
    };

    Settings {
        selection: SelectionCriteria {
            name_patterns: patterns,
            exact_names,
            namespace_prefixes: namespaces,
        },
        coverage: flags.coverage || file.coverage.unwrap_or(false),
        poll_interval: flags
            .poll_interval
            .or(file.poll_interval_ms.map(Duration::from_millis))
            .unwrap_or(apexrun_core::DEFAULT_POLL_INTERVAL),
        max_submit_attempts: flags.max_submit_attempts.or(file.max_submit_attempts),
        max_polls: flags.max_polls.or(file.max_polls),
    }
}
