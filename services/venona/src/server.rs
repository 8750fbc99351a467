//! Health and status endpoints

use anyhow::Context;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use task_scheduler::Agent;
use tokio::net::TcpListener;
use tracing::{info, instrument};
use venona_core::{endpoints, Status, VERSION};

pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::STATUS, get(status))
        .with_state(agent)
}

/// Binds the port, then runs the agent behind the status server until `shutdown`
/// resolves. The agent is only started once the port is held.
pub async fn serve(
    agent: Arc<Agent>,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    let address = listener.local_addr()?;

    agent.start().await?;
    info!("Venona listening on {address}");

    let served = axum::serve(listener, router(agent.clone()))
        .with_graceful_shutdown(shutdown)
        .await;
    agent.stop().await?;
    served.context("Status server failed")
}

#[instrument]
async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "venona",
        "version": VERSION
    })))
}

#[instrument(skip(agent), fields(agent = %agent.id()))]
async fn status(State(agent): State<Arc<Agent>>) -> Json<Status> {
    Json(agent.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use codefresh::Codefresh;
    use runtime::Runtime;
    use std::time::Duration;
    use task_scheduler::{AgentOptions, Lifecycle, RuntimeMap};
    use tower::ServiceExt;
    use venona_core::{AgentStatus, Task};

    struct Idle;

    #[async_trait]
    impl Codefresh for Idle {
        async fn tasks(&self) -> codefresh::Result<Vec<Task>> {
            Ok(Vec::new())
        }

        async fn report_status(&self, _status: &AgentStatus) -> codefresh::Result<()> {
            Ok(())
        }

        fn host(&self) -> &str {
            "https://codefresh.test"
        }
    }

    #[async_trait]
    impl Runtime for Idle {
        async fn start_workflow(&self, _tasks: &[Task]) -> runtime::Result<()> {
            Ok(())
        }

        async fn terminate_workflow(&self, _tasks: &[Task]) -> runtime::Result<()> {
            Ok(())
        }
    }

    fn agent() -> Arc<Agent> {
        let options = AgentOptions {
            id: "agent-1".to_string(),
            codefresh: Some(Arc::new(Idle) as Arc<dyn Codefresh>),
            runtimes: RuntimeMap::from([("rt".to_string(), Arc::new(Idle) as Arc<dyn Runtime>)]),
            logger: Some(tracing::info_span!("agent")),
            task_pulling_interval: Duration::from_secs(60),
            status_reporting_interval: Duration::from_secs(60),
            ..AgentOptions::default()
        };
        Arc::new(Agent::new(Some(options)).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_version() {
        let (status, body) = get_json(router(agent()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "venona");
        assert_eq!(body["version"], VERSION);
    }

    #[tokio::test]
    async fn test_status_is_empty_before_start() {
        let (status, body) = get_json(router(agent()), "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "");
        assert!(body["time"].is_null());
    }

    #[tokio::test]
    async fn test_status_follows_last_report() {
        let agent = agent();
        agent.start().await.unwrap();

        let (_, body) = get_json(router(agent.clone()), "/status").await;

        assert_eq!(body["message"], "All good");
        assert!(body["time"].is_string());
        agent.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_serve_leaves_agent_idle_when_port_is_taken() {
        let taken = TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let agent = agent();

        let result = serve(agent.clone(), port, std::future::pending()).await;

        assert!(result.is_err());
        assert_eq!(agent.lifecycle(), Lifecycle::Created);
    }

    #[tokio::test]
    async fn test_serve_stops_agent_on_shutdown() {
        let agent = agent();

        serve(agent.clone(), 0, async {}).await.unwrap();

        assert_eq!(agent.lifecycle(), Lifecycle::Stopped);
        assert_eq!(agent.status().message, "All good");
    }
}
