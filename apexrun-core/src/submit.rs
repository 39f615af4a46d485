//! Busy-retrying job submission.
//!
//! The org only runs one asynchronous test job at a time. A submission that
//! collides with an in-flight job reports a conflict, which is an expected
//! condition: wait one interval and resubmit. By default this repeats
//! forever, matching the legacy contract; a ceiling can be configured.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::{SubmitOutcome, ToolingClient};
use crate::error::RunError;
use crate::types::{ClassId, JobId};

/// Submits a test job, absorbing conflicts.
#[derive(Debug, Clone)]
pub struct SubmissionRetrier {
    /// Pause before every attempt, including the first.
    pub interval: Duration,
    /// Attempt ceiling; `None` retries indefinitely (legacy behavior).
    pub max_attempts: Option<u32>,
}

impl SubmissionRetrier {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Submit until the org accepts the job.
    ///
    /// Conflicts are retried after one interval each, unconditionally. Any
    /// other submission error propagates immediately. The first conflict
    /// logs a waiting notice; later conflicts only a progress marker.
    pub async fn submit<C: ToolingClient>(
        &self,
        client: &C,
        class_ids: &[ClassId],
    ) -> Result<JobId, RunError> {
        let mut attempt: u32 = 0;
        let mut conflict_seen = false;

        loop {
            sleep(self.interval).await;
            attempt += 1;

            match client.submit_tests(class_ids).await? {
                SubmitOutcome::Started(job_id) => {
                    info!(%job_id, attempt, "test job queued");
                    return Ok(job_id);
                }
                SubmitOutcome::Conflict => {
                    if let Some(max) = self.max_attempts
                        && attempt >= max
                    {
                        return Err(RunError::Submission(format!(
                            "gave up after {attempt} attempts, another test job is still running"
                        )));
                    }
                    if conflict_seen {
                        debug!(attempt, "test queue still busy");
                    } else {
                        info!("Waiting for an existing test queue to finish...");
                        conflict_seen = true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockToolingClient;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_millis(6000);

    fn ids() -> Vec<ClassId> {
        vec![ClassId::new("01p1")]
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_success_takes_one_attempt_after_one_interval() {
        let client = MockToolingClient::builder()
            .submit_conflicts(0)
            .job_id("707job")
            .build();
        let retrier = SubmissionRetrier::new(INTERVAL, None);

        let start = Instant::now();
        let job = retrier.submit(&client, &ids()).await.unwrap();

        assert_eq!(job.as_str(), "707job");
        assert_eq!(client.submit_attempts(), 1);
        assert_eq!(start.elapsed(), INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn n_conflicts_take_exactly_n_plus_one_attempts() {
        let client = MockToolingClient::builder()
            .submit_conflicts(3)
            .job_id("707job")
            .build();
        let retrier = SubmissionRetrier::new(INTERVAL, None);

        let start = Instant::now();
        let job = retrier.submit(&client, &ids()).await.unwrap();

        assert_eq!(job.as_str(), "707job");
        assert_eq!(client.submit_attempts(), 4);
        // Attempts are spaced one interval apart, including before the first.
        assert_eq!(start.elapsed(), INTERVAL * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_conflict_error_propagates_immediately() {
        let client = MockToolingClient::builder()
            .fail_submit("INVALID_SESSION_ID")
            .build();
        let retrier = SubmissionRetrier::new(INTERVAL, None);

        let err = retrier.submit(&client, &ids()).await.unwrap_err();
        assert!(matches!(err, RunError::Submission(_)));
        assert_eq!(client.submit_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_ceiling_turns_persistent_conflict_into_an_error() {
        let client = MockToolingClient::builder()
            .submit_conflicts(u32::MAX)
            .build();
        let retrier = SubmissionRetrier::new(INTERVAL, Some(5));

        let err = retrier.submit(&client, &ids()).await.unwrap_err();
        assert!(matches!(err, RunError::Submission(_)));
        assert_eq!(client.submit_attempts(), 5);
    }
}
