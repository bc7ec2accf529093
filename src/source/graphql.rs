// GraphQL run source: one POST per fetch, response decoded by __typename

use serde::Deserialize;
use tokio::time::Duration;

use super::{RunSource, SourceError};
use crate::models::{RunFilter, RunRecord};

pub const RUNS_QUERY: &str = r#"
query RunProgressQuery($filter: PipelineRunsFilter!, $limit: Int) {
  pipelineRunsOrError(filter: $filter, limit: $limit) {
    __typename
    ... on PipelineRuns {
      results {
        id
        status
      }
    }
    ... on InvalidPipelineRunsFilterError {
      message
    }
    ... on PythonError {
      message
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<RunsData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunsData {
    pipeline_runs_or_error: RunsOrError,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum RunsOrError {
    PipelineRuns { results: Vec<RunRecord> },
    InvalidPipelineRunsFilterError { message: String },
    PythonError { message: String },
}

/// Decodes a `pipelineRunsOrError` response body into runs or the matching error.
pub fn parse_runs_response(body: &str) -> Result<Vec<RunRecord>, SourceError> {
    let response: GraphqlResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    if let Some(first) = response.errors.first() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        tracing::debug!(errors = response.errors.len(), first = %first.message, "graphql errors");
        return Err(SourceError::Graphql(messages.join("; ")));
    }
    let data = response
        .data
        .ok_or_else(|| SourceError::Malformed("response has neither data nor errors".into()))?;
    match data.pipeline_runs_or_error {
        RunsOrError::PipelineRuns { results } => Ok(results),
        RunsOrError::InvalidPipelineRunsFilterError { message } => {
            Err(SourceError::InvalidFilter(message))
        }
        RunsOrError::PythonError { message } => Err(SourceError::Internal(message)),
    }
}

pub struct GraphqlSource {
    endpoint: String,
    client: reqwest::Client,
}

impl GraphqlSource {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("runprogress/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RunSource for GraphqlSource {
    async fn fetch(&self, filter: &RunFilter) -> Result<Vec<RunRecord>, SourceError> {
        let body = serde_json::json!({
            "operationName": "RunProgressQuery",
            "query": RUNS_QUERY,
            "variables": {
                "filter": {
                    "pipelineName": filter.pipeline_name,
                    "tags": filter.tags,
                },
                "limit": filter.limit,
            },
        });

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let text = resp.text().await?;
        parse_runs_response(&text)
    }
}
