//! Tooling API client over HTTP.
//!
//! Implements [`ToolingClient`] with the username/password OAuth flow and
//! the Tooling REST endpoints: `query` for discovery, coverage, queue status
//! and method results, and `runTestsAsynchronous` for submission. The
//! transport is blocking (`ureq`) and every call is wrapped in
//! `spawn_blocking`, preserving the one-call-in-flight pipeline model.
//!
//! HTTP status errors are not turned into transport errors: Salesforce puts
//! the interesting part (`errorCode`) in the error body, and submission
//! conflicts in particular must be read out of a non-2xx response.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::task::spawn_blocking;
use tracing::debug;
use ureq::Agent;

use crate::client::{SubmitOutcome, ToolingClient};
use crate::config::Credentials;
use crate::error::RunError;
use crate::query::{build_queue_status_query, build_result_query};
use crate::types::{
    ClassId, ClassRow, CoverageRow, JobId, MethodResultRow, OutcomeKind, QueueItemId, QueueItemRow,
};

/// Tooling REST API version used for all endpoints.
const API_VERSION: &str = "v61.0";

/// Salesforce error code for a conflicting in-flight test job.
const ALREADY_IN_PROCESS: &str = "ALREADY_IN_PROCESS";

#[derive(Debug, Clone, Deserialize)]
struct Session {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "errorCode")]
    error_code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    records: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CoverageRecord {
    #[serde(rename = "ApexClassOrTriggerId")]
    class_id: ClassId,
    #[serde(rename = "Coverage")]
    coverage: CoverageDetail,
}

#[derive(Debug, Deserialize)]
struct CoverageDetail {
    #[serde(rename = "coveredLines")]
    covered_lines: Vec<u32>,
    #[serde(rename = "uncoveredLines")]
    uncovered_lines: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TestResultRecord {
    #[serde(rename = "ApexClass")]
    apex_class: ApexClassRef,
    #[serde(rename = "MethodName")]
    method_name: String,
    #[serde(rename = "Outcome")]
    outcome: OutcomeKind,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApexClassRef {
    #[serde(rename = "Id")]
    id: ClassId,
    #[serde(rename = "Name")]
    name: String,
}

/// [`ToolingClient`] backed by the Tooling REST API.
#[derive(Clone)]
pub struct RestToolingClient {
    agent: Agent,
    server: String,
    client_id: String,
    client_secret: String,
    session: Option<Session>,
}

impl RestToolingClient {
    /// Build an unauthenticated client from credentials. The username and
    /// password are supplied to [`ToolingClient::authenticate`] by the
    /// pipeline, matching the client seam.
    pub fn new(credentials: &Credentials) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            server: credentials.server.trim_end_matches('/').to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            session: None,
        }
    }

    fn session(&self) -> Result<Session, String> {
        self.session
            .clone()
            .ok_or_else(|| "client is not authenticated".to_string())
    }

    /// Run a Tooling SOQL query and deserialize its records.
    async fn tooling_query<T>(&self, soql: &str) -> Result<Vec<T>, String>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let session = self.session()?;
        let agent = self.agent.clone();
        let url = format!(
            "{}/services/data/{API_VERSION}/tooling/query/?q={}",
            session.instance_url,
            urlencoding::encode(soql)
        );
        debug!(%url, "tooling query");

        spawn_blocking(move || {
            let mut response = agent
                .get(&url)
                .header("Authorization", &format!("Bearer {}", session.access_token))
                .call()
                .map_err(|err| err.to_string())?;

            if !response.status().is_success() {
                return Err(read_api_error(&mut response));
            }
            let body: QueryResponse<T> = response
                .body_mut()
                .read_json()
                .map_err(|err| format!("malformed query response: {err}"))?;
            Ok(body.records)
        })
        .await
        .map_err(|err| format!("blocking task failed: {err}"))?
    }
}

/// Extract `errorCode: message` from a failed Tooling response body.
fn read_api_error(response: &mut ureq::http::Response<ureq::Body>) -> String {
    let status = response.status();
    match response.body_mut().read_json::<Vec<ApiError>>() {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| format!("{}: {}", e.error_code, e.message))
            .collect::<Vec<_>>()
            .join("; "),
        _ => format!("HTTP {status}"),
    }
}

impl ToolingClient for RestToolingClient {
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<(), RunError> {
        let agent = self.agent.clone();
        let url = format!("{}/services/oauth2/token", self.server);
        let form = [
            ("grant_type", "password".to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("username", username.to_string()),
            ("password", password.to_string()),
        ];

        let session = spawn_blocking(move || {
            let mut response = agent
                .post(&url)
                .send_form(form)
                .map_err(|err| err.to_string())?;

            if !response.status().is_success() {
                let status = response.status();
                return Err(match response.body_mut().read_json::<OAuthError>() {
                    Ok(oauth) => format!(
                        "{}: {}",
                        oauth.error,
                        oauth.error_description.unwrap_or_default()
                    ),
                    Err(_) => format!("HTTP {status}"),
                });
            }
            response
                .body_mut()
                .read_json::<Session>()
                .map_err(|err| format!("malformed token response: {err}"))
        })
        .await
        .map_err(|err| RunError::Auth(format!("blocking task failed: {err}")))?
        .map_err(RunError::Auth)?;

        debug!(instance = %session.instance_url, "authenticated");
        self.session = Some(session);
        Ok(())
    }

    async fn query_classes(&self, soql: &str) -> Result<Vec<ClassRow>, RunError> {
        self.tooling_query(soql).await.map_err(RunError::Discovery)
    }

    async fn query_coverage(&self, soql: &str) -> Result<Vec<CoverageRow>, RunError> {
        let records: Vec<CoverageRecord> = self
            .tooling_query(soql)
            .await
            .map_err(RunError::CoverageFetch)?;
        Ok(records
            .into_iter()
            .map(|record| CoverageRow {
                class_id: record.class_id,
                covered_lines: record.coverage.covered_lines.len() as u32,
                uncovered_lines: record.coverage.uncovered_lines.len() as u32,
            })
            .collect())
    }

    async fn submit_tests(&self, class_ids: &[ClassId]) -> Result<SubmitOutcome, RunError> {
        let session = self.session().map_err(RunError::Submission)?;
        let agent = self.agent.clone();
        let url = format!(
            "{}/services/data/{API_VERSION}/tooling/runTestsAsynchronous",
            session.instance_url
        );
        let classids = class_ids
            .iter()
            .map(ClassId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        spawn_blocking(move || {
            let mut response = agent
                .post(&url)
                .header("Authorization", &format!("Bearer {}", session.access_token))
                .send_json(serde_json::json!({ "classids": classids }))
                .map_err(|err| RunError::Submission(err.to_string()))?;

            if response.status().is_success() {
                // The endpoint returns the async job id as a bare JSON string.
                let job_id: String = response
                    .body_mut()
                    .read_json()
                    .map_err(|err| RunError::Submission(format!("malformed job id: {err}")))?;
                return Ok(SubmitOutcome::Started(JobId::new(job_id)));
            }

            let status = response.status();
            match response.body_mut().read_json::<Vec<ApiError>>() {
                Ok(errors) if errors.iter().any(|e| e.error_code == ALREADY_IN_PROCESS) => {
                    Ok(SubmitOutcome::Conflict)
                }
                Ok(errors) if !errors.is_empty() => Err(RunError::Submission(
                    errors
                        .iter()
                        .map(|e| format!("{}: {}", e.error_code, e.message))
                        .collect::<Vec<_>>()
                        .join("; "),
                )),
                _ => Err(RunError::Submission(format!("HTTP {status}"))),
            }
        })
        .await
        .map_err(|err| RunError::Submission(format!("blocking task failed: {err}")))?
    }

    async fn fetch_queue_status(&self, job_id: &JobId) -> Result<Vec<QueueItemRow>, RunError> {
        let soql = build_queue_status_query(job_id);
        self.tooling_query(&soql).await.map_err(RunError::Poll)
    }

    async fn fetch_results(
        &self,
        queue_item_ids: &[QueueItemId],
    ) -> Result<Vec<MethodResultRow>, RunError> {
        let soql = build_result_query(queue_item_ids);
        let records: Vec<TestResultRecord> = self
            .tooling_query(&soql)
            .await
            .map_err(RunError::ResultFetch)?;
        Ok(records
            .into_iter()
            .map(|record| MethodResultRow {
                class_id: record.apex_class.id,
                class_name: record.apex_class.name,
                method_name: record.method_name,
                outcome: record.outcome,
                message: record.message,
            })
            .collect())
    }
}
