//! Agent facing Codefresh API

use crate::error::Result;
use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, instrument};
use venona_core::{endpoints, AgentStatus, Task};

/// What the agent needs from Codefresh. Implementations are shared by the
/// task puller and the status reporter, so they must be usable concurrently.
#[async_trait]
pub trait Codefresh: Send + Sync {
    /// All tasks currently waiting for this agent
    async fn tasks(&self) -> Result<Vec<Task>>;

    /// Update the agent entity with the given status
    async fn report_status(&self, status: &AgentStatus) -> Result<()>;

    fn host(&self) -> &str;
}

/// Options for building a [`CodefreshClient`]
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Defaults to [`endpoints::DEFAULT_CODEFRESH_HOST`] when empty
    pub host: String,
    pub token: String,
    pub agent_id: String,
    /// Skip TLS verification of the Codefresh host
    pub insecure: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct CodefreshClient {
    agent_id: String,
    transport: Transport,
}

impl CodefreshClient {
    pub fn new(opt: Options) -> Result<Self> {
        let host = if opt.host.is_empty() {
            endpoints::DEFAULT_CODEFRESH_HOST
        } else {
            opt.host.as_str()
        };
        Ok(Self {
            agent_id: opt.agent_id,
            transport: Transport::new(host, &opt.token, opt.insecure, opt.timeout)?,
        })
    }
}

#[async_trait]
impl Codefresh for CodefreshClient {
    #[instrument(skip(self), fields(agent_id = %self.agent_id))]
    async fn tasks(&self) -> Result<Vec<Task>> {
        debug!("Requesting tasks");
        let data = self
            .transport
            .send::<()>(Method::GET, &endpoints::agent_tasks(&self.agent_id), None)
            .await?;
        Ok(serde_json::from_slice(&data)?)
    }

    #[instrument(skip(self, status), fields(agent_id = %self.agent_id))]
    async fn report_status(&self, status: &AgentStatus) -> Result<()> {
        debug!("Reporting status");
        self.transport
            .send(
                Method::PUT,
                &endpoints::agent_status(&self.agent_id),
                Some(status),
            )
            .await?;
        Ok(())
    }

    fn host(&self) -> &str {
        self.transport.host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodefreshError;
    use serde_json::json;
    use venona_core::TaskType;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: &str) -> CodefreshClient {
        CodefreshClient::new(Options {
            host: server.uri(),
            token: token.to_string(),
            agent_id: "agent-1".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_host() {
        let client = CodefreshClient::new(Options::default()).unwrap();
        assert_eq!(client.host(), "https://g.codefresh.io");
    }

    #[test]
    fn test_given_host() {
        let client = CodefreshClient::new(Options {
            host: "http://host.com".to_string(),
            insecure: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.host(), "http://host.com");
    }

    #[tokio::test]
    async fn test_tasks_are_fetched_with_agent_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agent/agent-1/tasks"))
            .and(header("Authorization", "secret"))
            .and(header("Codefresh-Agent-Version", venona_core::VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "type": "CreatePod", "metadata": { "workflow": "wf", "reName": "rt" }, "spec": {} },
                { "type": "DeletePod", "metadata": { "workflow": "wf", "reName": "rt" }, "spec": {} }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let tasks = client_for(&server, "secret").tasks().await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_type, TaskType::CreatePod);
        assert_eq!(tasks[1].task_type, TaskType::DeletePod);
    }

    #[tokio::test]
    async fn test_api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agent/agent-1/tasks"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server, "bad").tasks().await.unwrap_err();

        match err {
            CodefreshError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_task_list_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = client_for(&server, "").tasks().await.unwrap_err();
        assert!(matches!(err, CodefreshError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_report_status_puts_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/agent/agent-1/status"))
            .and(body_json(json!({ "message": "All good" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, "secret")
            .report_status(&AgentStatus::healthy())
            .await
            .unwrap();
    }
}
