//! Run configuration: selection criteria, credentials, and pacing options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RunError;

/// Default pause between submission attempts and status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(6000);

/// Default login server for sandbox orgs.
pub const DEFAULT_SERVER: &str = "https://test.salesforce.com";

/// Which remote test classes to run.
///
/// `namespace_prefixes` entries of `None` select classes with no namespace;
/// the default selection is exactly that. Supplying neither patterns nor
/// exact names builds a query that matches nothing useful — discovery will
/// then fail with [`RunError::NoTestClasses`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// SOQL `LIKE` patterns for class names (e.g. `%Test`).
    pub name_patterns: Option<Vec<String>>,
    /// Exact class names.
    pub exact_names: Option<Vec<String>>,
    /// Namespace prefixes to match; `None` entries match the empty namespace.
    /// An empty list omits the namespace clause entirely.
    pub namespace_prefixes: Vec<Option<String>>,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            name_patterns: None,
            exact_names: None,
            namespace_prefixes: vec![None],
        }
    }
}

/// Credentials for the username/password OAuth flow.
///
/// Matches the camelCase key layout of a `secret.json` org block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default = "default_server")]
    pub server: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

impl Credentials {
    /// Reject any blank field before network activity is attempted.
    pub fn validate(&self) -> Result<(), RunError> {
        let missing: Vec<&str> = [
            ("server", &self.server),
            ("username", &self.username),
            ("password", &self.password),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RunError::Config(format!(
                "missing credential field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Everything one orchestration run needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub credentials: Credentials,
    pub selection: SelectionCriteria,
    /// Fetch per-class coverage after result aggregation.
    pub collect_coverage: bool,
    /// Pause before each submission attempt and each status poll.
    pub poll_interval: Duration,
    /// Ceiling on busy-retried submission attempts. `None` retries forever,
    /// which is the legacy behavior, not a recommendation.
    pub max_submit_attempts: Option<u32>,
    /// Ceiling on status polls. `None` polls forever (legacy behavior).
    pub max_polls: Option<u32>,
}

impl RunOptions {
    pub fn new(credentials: Credentials, selection: SelectionCriteria) -> Self {
        Self {
            credentials,
            selection,
            collect_coverage: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_submit_attempts: None,
            max_polls: None,
        }
    }
}
