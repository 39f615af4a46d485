//! Error catalog for the test-run pipeline.
//!
//! One variant per pipeline stage. Every variant is fatal to the run except
//! where the submission retrier and status poller absorb the condition
//! themselves (a busy org is signalled out-of-band via
//! [`crate::client::SubmitOutcome::Conflict`], never as an error).

use thiserror::Error;

/// Fatal errors that abort an orchestration run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Missing or invalid credentials, raised before any network activity.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The org rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The test class selection query failed.
    #[error("test class discovery failed: {0}")]
    Discovery(String),

    /// The selection query matched nothing. An empty selection is an error,
    /// not a trivially passing run.
    #[error("no test classes found to execute")]
    NoTestClasses,

    /// Submission failed for a reason other than a conflicting in-flight job.
    #[error("test submission failed: {0}")]
    Submission(String),

    /// Fetching queue item statuses failed.
    #[error("job status poll failed: {0}")]
    Poll(String),

    /// Fetching method-level results failed.
    #[error("result fetch failed: {0}")]
    ResultFetch(String),

    /// The aggregate coverage query failed.
    #[error("coverage fetch failed: {0}")]
    CoverageFetch(String),
}

impl RunError {
    /// Pipeline stage this error belongs to, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Auth(_) => "authentication",
            Self::Discovery(_) | Self::NoTestClasses => "discovery",
            Self::Submission(_) => "submission",
            Self::Poll(_) => "polling",
            Self::ResultFetch(_) => "result collection",
            Self::CoverageFetch(_) => "coverage collection",
        }
    }
}
