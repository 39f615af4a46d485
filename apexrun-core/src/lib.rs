//! Orchestration core for running Apex tests through the Salesforce
//! Tooling API.
//!
//! The API exposes no push notifications, so a run is a strictly linear,
//! single-call-in-flight pipeline: authenticate, discover target classes via
//! SOQL, submit an asynchronous test job (retrying indefinitely while a
//! conflicting job holds the org's test queue), poll queue items on a fixed
//! cadence until all are terminal, aggregate per-method results and optional
//! coverage, and render a pass/fail report.
//!
//! All run state is owned by the run context created in [`runner::run`];
//! the crate holds no mutable globals, so concurrent runs as a library are
//! safe as long as each gets its own client.

pub mod client;
pub mod collect;
pub mod config;
pub mod error;
pub mod mock;
pub mod poll;
pub mod query;
pub mod report;
pub mod rest;
pub mod runner;
pub mod submit;
pub mod types;

pub use client::{SubmitOutcome, ToolingClient};
pub use config::{Credentials, RunOptions, SelectionCriteria, DEFAULT_POLL_INTERVAL};
pub use error::RunError;
pub use rest::RestToolingClient;
pub use runner::{run, RunReport, RunStage};
pub use types::{
    ClassId, Coverage, JobId, MethodResult, OutcomeCounts, OutcomeKind, QueueItemId, TargetClass,
};
