//! GitHub GraphQL adapter: fetches one issue by number.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

use crate::application::repos::{IssuesRepo, RepoError};
use crate::config::GithubSettings;
use crate::domain::posts::{LabelRecord, PostNumber, PostRecord};
use crate::infra::error::InfraError;

const USER_AGENT: &str = concat!("quaderno/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_LABELS: u32 = 100;
const NOT_FOUND_ERROR_TYPE: &str = "NOT_FOUND";

const ISSUE_QUERY: &str = r"
query PostByNumber($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      number
      url
      title
      createdAt
      labels(first: 100) {
        nodes {
          name
        }
      }
      bodyHTML
    }
  }
}
";

pub struct GithubIssuesRepo {
    client: Client,
    endpoint: Url,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubIssuesRepo {
    pub fn new(settings: &GithubSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build upstream client: {err}"))
            })?;

        Ok(Self {
            client,
            endpoint: settings.graphql_url.clone(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            token: settings.token.clone(),
        })
    }

    async fn fetch(&self, number: PostNumber) -> Result<Option<PostRecord>, RepoError> {
        let body = json!({
            "query": ISSUE_QUERY,
            "variables": {
                "owner": self.owner,
                "name": self.repo,
                "number": number.get(),
            },
        });

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RepoError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepoError::Status {
                status: status.as_u16(),
            });
        }

        let envelope: GraphqlEnvelope = response
            .json()
            .await
            .map_err(|err| RepoError::malformed(err.to_string()))?;

        map_envelope(envelope)
    }
}

#[async_trait]
impl IssuesRepo for GithubIssuesRepo {
    async fn issue_by_number(&self, number: PostNumber) -> Result<Option<PostRecord>, RepoError> {
        counter!("quaderno_upstream_request_total").increment(1);
        let start = Instant::now();

        let result = self.fetch(number).await;

        histogram!("quaderno_upstream_latency_ms").record(start.elapsed().as_millis() as f64);
        match &result {
            Ok(found) => debug!(
                target = "quaderno::github",
                number = number.get(),
                found = found.is_some(),
                "issue lookup completed"
            ),
            Err(_) => counter!("quaderno_upstream_failure_total").increment(1),
        }

        result
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    repository: Option<RepositoryData>,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    issue: Option<IssueData>,
}

#[derive(Debug, Deserialize)]
struct IssueData {
    number: u64,
    url: String,
    title: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(default)]
    labels: LabelConnection,
    #[serde(rename = "bodyHTML")]
    body_html: String,
}

#[derive(Debug, Default, Deserialize)]
struct LabelConnection {
    #[serde(default)]
    nodes: Vec<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

/// Interpret the GraphQL envelope.
///
/// A `NOT_FOUND` error (or a resolved repository with a null issue) is the
/// clean "no such post" answer; any other error entry is an upstream fault.
fn map_envelope(envelope: GraphqlEnvelope) -> Result<Option<PostRecord>, RepoError> {
    if !envelope.errors.is_empty() {
        let all_not_found = envelope
            .errors
            .iter()
            .all(|err| err.kind.as_deref() == Some(NOT_FOUND_ERROR_TYPE));
        if all_not_found {
            return Ok(None);
        }
        let message = envelope
            .errors
            .iter()
            .map(|err| err.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RepoError::Query { message });
    }

    let data = envelope
        .data
        .ok_or_else(|| RepoError::malformed("response carried neither data nor errors"))?;

    let Some(repository) = data.repository else {
        return Ok(None);
    };
    let Some(issue) = repository.issue else {
        return Ok(None);
    };

    let mut record = PostRecord {
        number: issue.number,
        url: issue.url,
        title: issue.title,
        created_at: issue.created_at,
        labels: issue
            .labels
            .nodes
            .into_iter()
            .take(MAX_LABELS as usize)
            .map(|node| LabelRecord { name: node.name })
            .collect(),
        body_html: issue.body_html,
    };
    record.dedupe_labels();

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: &str) -> GraphqlEnvelope {
        serde_json::from_str(raw).expect("valid envelope")
    }

    #[test]
    fn full_issue_payload_maps_to_a_record() {
        let record = map_envelope(envelope(
            r#"{
                "data": {
                    "repository": {
                        "issue": {
                            "number": 42,
                            "url": "https://github.com/zhangyu1818/blog/issues/42",
                            "title": "hello",
                            "createdAt": "2021-03-14T09:26:53Z",
                            "labels": { "nodes": [ { "name": "rust" }, { "name": "rust" } ] },
                            "bodyHTML": "<p>body</p>"
                        }
                    }
                }
            }"#,
        ))
        .expect("mapped")
        .expect("present");

        assert_eq!(record.number, 42);
        assert_eq!(record.title, "hello");
        assert_eq!(record.labels.len(), 1, "duplicate labels collapse");
        assert_eq!(record.body_html, "<p>body</p>");
    }

    #[test]
    fn null_issue_resolves_to_none() {
        let record = map_envelope(envelope(
            r#"{ "data": { "repository": { "issue": null } } }"#,
        ))
        .expect("mapped");
        assert!(record.is_none());
    }

    #[test]
    fn not_found_error_resolves_to_none() {
        let record = map_envelope(envelope(
            r#"{
                "data": { "repository": null },
                "errors": [ { "message": "Could not resolve", "type": "NOT_FOUND" } ]
            }"#,
        ))
        .expect("mapped");
        assert!(record.is_none());
    }

    #[test]
    fn other_graphql_errors_are_query_failures() {
        let err = map_envelope(envelope(
            r#"{ "errors": [ { "message": "rate limited", "type": "RATE_LIMITED" } ] }"#,
        ))
        .expect_err("must fail");
        assert!(matches!(err, RepoError::Query { .. }));
    }

    #[test]
    fn empty_envelope_is_malformed() {
        let err = map_envelope(envelope("{}")).expect_err("must fail");
        assert!(matches!(err, RepoError::Malformed { .. }));
    }
}
