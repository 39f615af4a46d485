//! Core data model for a single Apex test run.
//!
//! Everything here is owned by the run context and lives for exactly one
//! orchestration run. Nothing is persisted and nothing is shared between
//! concurrent runs.

use serde::{Deserialize, Serialize};

/// Opaque identifier of an asynchronous test job (`AsyncApexJob`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of an `ApexClass` record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub String);

impl ClassId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of one `ApexTestQueueItem` belonging to a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(pub String);

impl QueueItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verdict of one test method execution.
///
/// Variant names match the literal `Outcome` values the Tooling API returns
/// on `ApexTestResult`, so no serde renames are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Pass,
    Fail,
    CompileFail,
    Skip,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::CompileFail => "CompileFail",
            Self::Skip => "Skip",
        };
        write!(f, "{s}")
    }
}

/// Per-class tally of method outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub pass: u32,
    pub fail: u32,
    pub compile_fail: u32,
    pub skip: u32,
}

impl OutcomeCounts {
    pub fn increment(&mut self, outcome: OutcomeKind) {
        match outcome {
            OutcomeKind::Pass => self.pass += 1,
            OutcomeKind::Fail => self.fail += 1,
            OutcomeKind::CompileFail => self.compile_fail += 1,
            OutcomeKind::Skip => self.skip += 1,
        }
    }

    /// Count of outcomes other than `Pass`.
    pub fn non_pass(&self) -> u32 {
        self.fail + self.compile_fail + self.skip
    }
}

/// Code coverage attributed to one class, from the aggregate coverage query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub covered_lines: u32,
    pub uncovered_lines: u32,
}

impl Coverage {
    /// Covered percentage of coverable lines. A class with no coverable
    /// lines reports 100%.
    pub fn percent(&self) -> f64 {
        let total = self.covered_lines + self.uncovered_lines;
        if total == 0 {
            100.0
        } else {
            100.0 * f64::from(self.covered_lines) / f64::from(total)
        }
    }
}

/// One test-method outcome, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodResult {
    /// Denormalized class display name.
    pub class_name: String,
    pub method_name: String,
    pub outcome: OutcomeKind,
    pub message: Option<String>,
}

/// One discovered remote test class, created at discovery time and mutated
/// only by result aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct TargetClass {
    pub id: ClassId,
    pub name: String,
    pub namespace_prefix: Option<String>,
    pub coverage: Option<Coverage>,
    pub outcome_counts: OutcomeCounts,
    pub method_results: Vec<MethodResult>,
}

impl TargetClass {
    pub fn from_row(row: ClassRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            namespace_prefix: row.namespace_prefix,
            coverage: None,
            outcome_counts: OutcomeCounts::default(),
            method_results: Vec::new(),
        }
    }
}

/// `ApexClass` discovery row as returned by the Tooling query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRow {
    #[serde(rename = "Id")]
    pub id: ClassId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "NamespacePrefix")]
    pub namespace_prefix: Option<String>,
}

/// `ApexTestQueueItem` status row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItemRow {
    #[serde(rename = "Id")]
    pub id: QueueItemId,
    #[serde(rename = "Status")]
    pub status: String,
}

/// Flattened `ApexTestResult` row.
#[derive(Debug, Clone)]
pub struct MethodResultRow {
    pub class_id: ClassId,
    pub class_name: String,
    pub method_name: String,
    pub outcome: OutcomeKind,
    pub message: Option<String>,
}

/// One row of the `ApexCodeCoverageAggregate` query, reduced to line counts.
#[derive(Debug, Clone)]
pub struct CoverageRow {
    pub class_id: ClassId,
    pub covered_lines: u32,
    pub uncovered_lines: u32,
}
