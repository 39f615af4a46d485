//! Pipeline orchestration.
//!
//! One strictly linear run: authenticate, discover target classes, submit
//! the job (busy-retrying conflicts), poll queue items to a terminal state,
//! aggregate results, optionally fetch coverage, render the report. One
//! remote call is in flight at any time and every stage failure aborts the
//! run; a report exists only for runs that reach the reporting stage.

use tracing::{error, info};

use crate::client::ToolingClient;
use crate::collect::{collect_coverage, collect_results};
use crate::config::RunOptions;
use crate::error::RunError;
use crate::poll::StatusPoller;
use crate::query::build_class_query;
use crate::report::render;
use crate::submit::SubmissionRetrier;
use crate::types::TargetClass;

/// Stages of one orchestration run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Authenticating,
    Discovering,
    Submitting,
    Polling,
    CollectingResults,
    CollectingCoverage,
    Reporting,
    Done,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Authenticating => "authenticating",
            Self::Discovering => "discovering",
            Self::Submitting => "submitting",
            Self::Polling => "polling",
            Self::CollectingResults => "collecting results",
            Self::CollectingCoverage => "collecting coverage",
            Self::Reporting => "reporting",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Final product of a successful pipeline run.
///
/// `passed` is the run verdict: false as soon as any method outcome other
/// than `Pass` was observed. A false verdict still carries the full report.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Rendered report text (see [`crate::report::render`]).
    pub text: String,
    /// Overall verdict: no non-`Pass` outcome observed.
    pub passed: bool,
    /// Aggregated per-class state, for hosts that want structured access.
    pub classes: Vec<TargetClass>,
}

/// Context owned by one run; never shared across runs.
struct TestRun {
    options: RunOptions,
    stage: RunStage,
    classes: Vec<TargetClass>,
    failed: bool,
}

impl TestRun {
    fn advance(&mut self, stage: RunStage) {
        info!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }

    async fn drive<C: ToolingClient>(&mut self, client: &mut C) -> Result<RunReport, RunError> {
        // Credential validation is the one synchronous check, done before
        // any remote call.
        self.options.credentials.validate()?;

        client
            .authenticate(
                &self.options.credentials.username,
                &self.options.credentials.password,
            )
            .await?;

        self.advance(RunStage::Discovering);
        let soql = build_class_query(&self.options.selection);
        let rows = client.query_classes(&soql).await?;
        if rows.is_empty() {
            return Err(RunError::NoTestClasses);
        }
        info!("Found the following test classes to execute:");
        for row in &rows {
            info!(" - {}", row.name);
        }
        self.classes = rows.into_iter().map(TargetClass::from_row).collect();

        self.advance(RunStage::Submitting);
        info!("Queuing tests for execution...");
        let class_ids: Vec<_> = self.classes.iter().map(|class| class.id.clone()).collect();
        let retrier = SubmissionRetrier::new(
            self.options.poll_interval,
            self.options.max_submit_attempts,
        );
        let job_id = retrier.submit(client, &class_ids).await?;

        self.advance(RunStage::Polling);
        info!("Tests are running...");
        let poller = StatusPoller::new(self.options.poll_interval, self.options.max_polls);
        let queue_item_ids = poller.poll(client, &job_id).await?;

        self.advance(RunStage::CollectingResults);
        info!("Job complete, collecting results...");
        self.failed = collect_results(client, &mut self.classes, &queue_item_ids).await?;

        if self.options.collect_coverage {
            self.advance(RunStage::CollectingCoverage);
            collect_coverage(client, &mut self.classes).await?;
        }

        self.advance(RunStage::Reporting);
        let text = render(&self.classes);

        self.advance(RunStage::Done);
        Ok(RunReport {
            text,
            passed: !self.failed,
            classes: std::mem::take(&mut self.classes),
        })
    }
}

/// Execute one full test run against the given client.
///
/// Errors abort the pipeline at the failing stage; no partial report is
/// produced. A completed run with failing tests is `Ok` with
/// `passed == false`.
pub async fn run<C: ToolingClient>(
    client: &mut C,
    options: RunOptions,
) -> Result<RunReport, RunError> {
    let mut run = TestRun {
        options,
        stage: RunStage::Authenticating,
        classes: Vec::new(),
        failed: false,
    };

    match run.drive(client).await {
        Ok(report) => Ok(report),
        Err(err) => {
            error!(stage = err.stage(), error = %err, "test run aborted");
            Err(err)
        }
    }
}
