//! Scripted mock Tooling client for tests.
//!
//! No network involved: responses are configured up front through the
//! builder and call counters are exposed so tests can assert attempt counts
//! and cadence. Ships in the library (not behind `cfg(test)`) so integration
//! tests and downstream users can drive the whole pipeline offline.

use std::sync::Mutex;

use crate::client::{SubmitOutcome, ToolingClient};
use crate::error::RunError;
use crate::types::{
    ClassId, ClassRow, CoverageRow, JobId, MethodResultRow, QueueItemId, QueueItemRow,
};

#[derive(Debug, Default)]
struct MockState {
    auth_calls: u32,
    class_queries: u32,
    submit_attempts: u32,
    status_fetches: u32,
    result_fetches: u32,
    coverage_queries: u32,
    last_class_query: Option<String>,
    last_coverage_query: Option<String>,
}

/// Scripted [`ToolingClient`] implementation.
#[derive(Debug)]
pub struct MockToolingClient {
    classes: Vec<ClassRow>,
    submit_conflicts: u32,
    job_id: Option<JobId>,
    status_snapshots: Vec<Vec<QueueItemRow>>,
    results: Vec<MethodResultRow>,
    coverage: Vec<CoverageRow>,
    fail_auth: Option<String>,
    fail_classes: Option<String>,
    fail_submit: Option<String>,
    fail_status: Option<String>,
    fail_results: Option<String>,
    fail_coverage: Option<String>,
    state: Mutex<MockState>,
}

impl MockToolingClient {
    pub fn builder() -> MockToolingClientBuilder {
        MockToolingClientBuilder::default()
    }

    pub fn auth_calls(&self) -> u32 {
        self.state.lock().unwrap().auth_calls
    }

    pub fn class_queries(&self) -> u32 {
        self.state.lock().unwrap().class_queries
    }

    pub fn submit_attempts(&self) -> u32 {
        self.state.lock().unwrap().submit_attempts
    }

    pub fn status_fetches(&self) -> u32 {
        self.state.lock().unwrap().status_fetches
    }

    pub fn result_fetches(&self) -> u32 {
        self.state.lock().unwrap().result_fetches
    }

    pub fn coverage_queries(&self) -> u32 {
        self.state.lock().unwrap().coverage_queries
    }

    /// The most recent discovery SOQL, if any query ran.
    pub fn last_class_query(&self) -> Option<String> {
        self.state.lock().unwrap().last_class_query.clone()
    }

    /// The most recent coverage SOQL, if any query ran.
    pub fn last_coverage_query(&self) -> Option<String> {
        self.state.lock().unwrap().last_coverage_query.clone()
    }
}

impl ToolingClient for MockToolingClient {
    async fn authenticate(&mut self, _username: &str, _password: &str) -> Result<(), RunError> {
        self.state.lock().unwrap().auth_calls += 1;
        match &self.fail_auth {
            Some(msg) => Err(RunError::Auth(msg.clone())),
            None => Ok(()),
        }
    }

    async fn query_classes(&self, soql: &str) -> Result<Vec<ClassRow>, RunError> {
        {
            let mut state = self.state.lock().unwrap();
            state.class_queries += 1;
            state.last_class_query = Some(soql.to_string());
        }
        match &self.fail_classes {
            Some(msg) => Err(RunError::Discovery(msg.clone())),
            None => Ok(self.classes.clone()),
        }
    }

    async fn query_coverage(&self, soql: &str) -> Result<Vec<CoverageRow>, RunError> {
        {
            let mut state = self.state.lock().unwrap();
            state.coverage_queries += 1;
            state.last_coverage_query = Some(soql.to_string());
        }
        match &self.fail_coverage {
            Some(msg) => Err(RunError::CoverageFetch(msg.clone())),
            None => Ok(self.coverage.clone()),
        }
    }

    async fn submit_tests(&self, _class_ids: &[ClassId]) -> Result<SubmitOutcome, RunError> {
        let attempt = {
            let mut state = self.state.lock().unwrap();
            state.submit_attempts += 1;
            state.submit_attempts
        };
        if let Some(msg) = &self.fail_submit {
            return Err(RunError::Submission(msg.clone()));
        }
        if attempt <= self.submit_conflicts {
            return Ok(SubmitOutcome::Conflict);
        }
        match &self.job_id {
            Some(job_id) => Ok(SubmitOutcome::Started(job_id.clone())),
            None => Err(RunError::Submission(
                "mock: no scripted job id".to_string(),
            )),
        }
    }

    async fn fetch_queue_status(&self, _job_id: &JobId) -> Result<Vec<QueueItemRow>, RunError> {
        let fetch = {
            let mut state = self.state.lock().unwrap();
            state.status_fetches += 1;
            state.status_fetches
        };
        if let Some(msg) = &self.fail_status {
            return Err(RunError::Poll(msg.clone()));
        }
        if self.status_snapshots.is_empty() {
            return Err(RunError::Poll(
                "mock: no scripted status snapshots".to_string(),
            ));
        }
        // Past the end of the script, the job stays in its final state.
        let index = usize::min(fetch as usize - 1, self.status_snapshots.len() - 1);
        Ok(self.status_snapshots[index].clone())
    }

    async fn fetch_results(
        &self,
        _queue_item_ids: &[QueueItemId],
    ) -> Result<Vec<MethodResultRow>, RunError> {
        self.state.lock().unwrap().result_fetches += 1;
        match &self.fail_results {
            Some(msg) => Err(RunError::ResultFetch(msg.clone())),
            None => Ok(self.results.clone()),
        }
    }
}

/// Builder for [`MockToolingClient`].
#[derive(Debug, Default)]
pub struct MockToolingClientBuilder {
    classes: Vec<ClassRow>,
    submit_conflicts: u32,
    job_id: Option<JobId>,
    status_snapshots: Vec<Vec<QueueItemRow>>,
    results: Vec<MethodResultRow>,
    coverage: Vec<CoverageRow>,
    fail_auth: Option<String>,
    fail_classes: Option<String>,
    fail_submit: Option<String>,
    fail_status: Option<String>,
    fail_results: Option<String>,
    fail_coverage: Option<String>,
}

impl MockToolingClientBuilder {
    /// Rows the discovery query returns.
    pub fn classes(mut self, classes: Vec<ClassRow>) -> Self {
        self.classes = classes;
        self
    }

    /// Number of submission attempts answered with a conflict before the
    /// job starts.
    pub fn submit_conflicts(mut self, conflicts: u32) -> Self {
        self.submit_conflicts = conflicts;
        self
    }

    /// Job id returned once submission succeeds.
    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(JobId::new(job_id));
        self
    }

    /// Queue status snapshots, one per fetch; the last repeats thereafter.
    pub fn status_snapshots(mut self, snapshots: Vec<Vec<QueueItemRow>>) -> Self {
        self.status_snapshots = snapshots;
        self
    }

    /// Rows the result fetch returns.
    pub fn results(mut self, results: Vec<MethodResultRow>) -> Self {
        self.results = results;
        self
    }

    /// Rows the coverage query returns.
    pub fn coverage(mut self, coverage: Vec<CoverageRow>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn fail_auth(mut self, msg: impl Into<String>) -> Self {
        self.fail_auth = Some(msg.into());
        self
    }

    pub fn fail_classes(mut self, msg: impl Into<String>) -> Self {
        self.fail_classes = Some(msg.into());
        self
    }

    pub fn fail_submit(mut self, msg: impl Into<String>) -> Self {
        self.fail_submit = Some(msg.into());
        self
    }

    pub fn fail_status(mut self, msg: impl Into<String>) -> Self {
        self.fail_status = Some(msg.into());
        self
    }

    pub fn fail_results(mut self, msg: impl Into<String>) -> Self {
        self.fail_results = Some(msg.into());
        self
    }

    pub fn fail_coverage(mut self, msg: impl Into<String>) -> Self {
        self.fail_coverage = Some(msg.into());
        self
    }

    pub fn build(self) -> MockToolingClient {
        MockToolingClient {
            classes: self.classes,
            submit_conflicts: self.submit_conflicts,
            job_id: self.job_id,
            status_snapshots: self.status_snapshots,
            results: self.results,
            coverage: self.coverage,
            fail_auth: self.fail_auth,
            fail_classes: self.fail_classes,
            fail_submit: self.fail_submit,
            fail_status: self.fail_status,
            fail_results: self.fail_results,
            fail_coverage: self.fail_coverage,
            state: Mutex::new(MockState::default()),
        }
    }
}
