//! BDD Tests for the Venona agent service

use axum::body::{to_bytes, Body};
use axum::http::Request;
use codefresh::{Codefresh, CodefreshClient};
use cucumber::{given, then, when, World};
use runtime::{KubernetesRuntime, Runtime};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use task_scheduler::{Agent, AgentOptions, RuntimeMap};
use tower::ServiceExt;
use venona_core::RuntimeConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct ServiceWorld {
    codefresh: Option<MockServer>,
    agent: Option<Arc<Agent>>,
    response: Option<Value>,
}

impl ServiceWorld {
    fn new() -> Self {
        Self {
            codefresh: None,
            agent: None,
            response: None,
        }
    }

    fn agent(&self) -> Arc<Agent> {
        self.agent.clone().expect("agent should be built")
    }
}

async fn codefresh_stub(status_code: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/agent/agent-bdd/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/agent/agent-bdd/status"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;
    server
}

#[given("a Codefresh API that accepts status reports")]
async fn given_accepting_codefresh(world: &mut ServiceWorld) {
    world.codefresh = Some(codefresh_stub(200).await);
}

#[given("a Codefresh API that rejects status reports")]
async fn given_rejecting_codefresh(world: &mut ServiceWorld) {
    world.codefresh = Some(codefresh_stub(500).await);
}

#[given(expr = "a venona agent with runtime {string}")]
async fn given_agent(world: &mut ServiceWorld, name: String) {
    let codefresh_uri = world.codefresh.as_ref().expect("Codefresh stub").uri();
    let codefresh = CodefreshClient::new(codefresh::Options {
        host: codefresh_uri,
        token: "cf-token".to_string(),
        agent_id: "agent-bdd".to_string(),
        ..codefresh::Options::default()
    })
    .unwrap();
    let runtime = KubernetesRuntime::from_config(
        &name,
        &RuntimeConfig {
            host: "https://kubernetes.test".to_string(),
            token: "k8s-token".to_string(),
            crt: None,
            namespace: None,
        },
    )
    .unwrap();

    let options = AgentOptions {
        id: "agent-bdd".to_string(),
        codefresh: Some(Arc::new(codefresh) as Arc<dyn Codefresh>),
        runtimes: RuntimeMap::from([(name, Arc::new(runtime) as Arc<dyn Runtime>)]),
        logger: Some(tracing::info_span!("agent")),
        task_pulling_interval: Duration::from_secs(60),
        status_reporting_interval: Duration::from_secs(60),
        ..AgentOptions::default()
    };
    world.agent = Some(Arc::new(Agent::new(Some(options)).unwrap()));
}

#[when("the agent starts")]
async fn when_agent_starts(world: &mut ServiceWorld) {
    world.agent().start().await.unwrap();
}

#[when(expr = "I request {string}")]
async fn when_request(world: &mut ServiceWorld, uri: String) {
    let response = venona::router(world.agent())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    world.response = Some(serde_json::from_slice(&body).unwrap());
}

#[then(expr = "the response field {string} should be {string}")]
async fn then_field_equals(world: &mut ServiceWorld, field: String, expected: String) {
    let response = world.response.as_ref().expect("a response should be recorded");
    assert_eq!(response[&field], Value::String(expected));
}

#[then(expr = "the response field {string} should start with {string}")]
async fn then_field_starts_with(world: &mut ServiceWorld, field: String, prefix: String) {
    let response = world.response.as_ref().expect("a response should be recorded");
    let value = response[&field].as_str().unwrap_or_default();
    assert!(value.starts_with(&prefix), "{value} should start with {prefix}");
}

#[tokio::main]
async fn main() {
    ServiceWorld::run("tests/features").await;
}
