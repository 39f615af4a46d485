//! Remote job client interface consumed by the orchestration pipeline.
//!
//! The transport is deliberately opaque: the pipeline only needs the six
//! operations below. [`crate::rest::RestToolingClient`] implements them over
//! HTTP; [`crate::mock::MockToolingClient`] scripts them for tests.
//!
//! Error classification happens at this seam: each method returns the
//! [`RunError`] variant of the pipeline stage it serves, so callers can
//! propagate with `?` and still surface the right stage name.

use crate::error::RunError;
use crate::types::{
    ClassId, ClassRow, CoverageRow, JobId, MethodResultRow, QueueItemId, QueueItemRow,
};

/// Outcome of one submission attempt.
///
/// A conflicting in-flight test job (Salesforce `ALREADY_IN_PROCESS`) is an
/// expected transient condition, not an error, so it gets its own variant
/// rather than a `RunError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The job was queued; poll it by this id.
    Started(JobId),
    /// Another test job is already running on the org.
    Conflict,
}

/// Client capability required to drive a test run.
pub trait ToolingClient {
    /// Authenticate against the org. Must be called before any other method.
    fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), RunError>> + Send;

    /// Run a class discovery query (errors map to [`RunError::Discovery`]).
    fn query_classes(
        &self,
        soql: &str,
    ) -> impl Future<Output = Result<Vec<ClassRow>, RunError>> + Send;

    /// Run the aggregate coverage query (errors map to
    /// [`RunError::CoverageFetch`]).
    fn query_coverage(
        &self,
        soql: &str,
    ) -> impl Future<Output = Result<Vec<CoverageRow>, RunError>> + Send;

    /// Start an asynchronous test job for the given classes.
    fn submit_tests(
        &self,
        class_ids: &[ClassId],
    ) -> impl Future<Output = Result<SubmitOutcome, RunError>> + Send;

    /// Fetch the current status of every queue item belonging to a job.
    fn fetch_queue_status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<Vec<QueueItemRow>, RunError>> + Send;

    /// Fetch method-level results for a set of finished queue items.
    fn fetch_results(
        &self,
        queue_item_ids: &[QueueItemId],
    ) -> impl Future<Output = Result<Vec<MethodResultRow>, RunError>> + Send;
}
