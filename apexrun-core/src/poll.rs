//! Fixed-cadence job status polling.
//!
//! A job fans out into one queue item per class. The run may only move on to
//! result collection once every queue item has finished, so the poller keeps
//! fetching the full status set on a fixed interval until all observed
//! statuses are terminal.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::client::ToolingClient;
use crate::error::RunError;
use crate::types::{JobId, QueueItemId};

/// Queue item statuses that count as finished.
pub const TERMINAL_STATUSES: [&str; 3] = ["Aborted", "Completed", "Failed"];

/// Polls queue items until all of them reach a terminal status.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    /// Pause before every fetch, including the first.
    pub interval: Duration,
    /// Poll ceiling; `None` polls indefinitely (legacy behavior).
    pub max_polls: Option<u32>,
}

impl StatusPoller {
    pub fn new(interval: Duration, max_polls: Option<u32>) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    /// Poll until every queue item is terminal, then return the distinct
    /// queue item ids.
    ///
    /// Termination requires the non-empty set of observed statuses to be a
    /// subset of [`TERMINAL_STATUSES`]. Items in different terminal states
    /// (one `Completed`, one `Failed`) still terminate; requiring a single
    /// uniform status would poll such a job forever.
    pub async fn poll<C: ToolingClient>(
        &self,
        client: &C,
        job_id: &JobId,
    ) -> Result<Vec<QueueItemId>, RunError> {
        let mut polls: u32 = 0;

        loop {
            sleep(self.interval).await;
            polls += 1;

            let items = client.fetch_queue_status(job_id).await?;
            let statuses: BTreeSet<&str> = items.iter().map(|item| item.status.as_str()).collect();
            let all_terminal = !statuses.is_empty()
                && statuses
                    .iter()
                    .all(|status| TERMINAL_STATUSES.contains(status));

            if all_terminal {
                debug!(%job_id, polls, ?statuses, "all queue items terminal");
                let mut ids: Vec<QueueItemId> = Vec::new();
                for item in items {
                    if !ids.contains(&item.id) {
                        ids.push(item.id);
                    }
                }
                return Ok(ids);
            }

            if let Some(max) = self.max_polls
                && polls >= max
            {
                return Err(RunError::Poll(format!(
                    "job {job_id} not finished after {polls} polls, statuses: {statuses:?}"
                )));
            }

            debug!(%job_id, polls, ?statuses, "queue items still running");
        }
    }
}
