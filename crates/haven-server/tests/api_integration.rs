//! HTTP API integration tests, driven through the router with a mock LLM and chain.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tower::ServiceExt;

use haven_agents::{AgentContext, AgentManager, MemoryAnnouncer};
use haven_chain::{ChainClient, ConfiguredWallets, MockChain, ShelterApproval};
use haven_config::HavenConfig;
use haven_core::{NewShelter, ShelterMetrics};
use haven_llm::{LlmRequest, MockProvider, ModelRouter};
use haven_store::Store;
use std::collections::HashMap;
use std::sync::Arc;

const CONTRACT: &str = "0x933bF9dbBe7ccff543Abb2C5878Fb879618182C8";
const SHELTER_A: &str = "0x7C6461Aa79DD6eEb22191c68d37F3E5a22763112";
const SHELTER_B: &str = "0x0396e77cC09293C5E61E6058423928694f0C1D0b";

fn config() -> HavenConfig {
    let mut c = HavenConfig::default();
    c.agent.model = "mock/test-model".into();
    c.agent.max_iterations = 5;
    c.agent.stream_delay_ms = 0;
    c.chain.network_id = Some("base-sepolia".into());
    c.chain.rpc_url = Some("http://127.0.0.1:8545".into());
    c.chain.contract_address = Some(CONTRACT.into());
    c
}

struct TestApp {
    router: axum::Router,
    store: Store,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

fn setup_with(config: HavenConfig, provider: MockProvider, chain: MockChain) -> TestApp {
    let requests = provider.recorded_requests();
    let store = Store::open_in_memory().unwrap();
    let wallets = ConfiguredWallets::new("base-sepolia", HashMap::new(), Some(CONTRACT.into()));
    let chain: Arc<dyn ChainClient> = Arc::new(chain);
    let ctx = AgentContext::new(
        config,
        ModelRouter::new().with_provider(Arc::new(provider)),
        store.clone(),
        chain,
        Arc::new(wallets),
        Arc::new(MemoryAnnouncer::new()),
    );
    TestApp {
        router: haven_server::build_router(Arc::new(AgentManager::new(ctx))),
        store,
        requests,
    }
}

/// A test app whose mock provider answers with `responses`, in order.
fn setup(responses: Vec<&str>) -> TestApp {
    let mut mock = MockProvider::new("mock");
    for r in responses {
        mock = mock.with_response(r);
    }
    setup_with(config(), mock, MockChain::new())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to read the full body bytes from a response.
async fn body_string(resp: axum::response::Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

fn insert_shelter(store: &Store, name: &str) -> String {
    let mut new = NewShelter::empty(name, "Portland, OR", "12000");
    new.metrics = ShelterMetrics {
        current_animals: 10,
        monthly_intake: 4,
        neutering_count: 3,
        adoption_rate: 0.75,
    };
    store.insert_shelter(new).unwrap().id
}

fn shelter_body() -> Value {
    json!({
        "name": "Happy Paws",
        "location": "Portland, OR",
        "operational_costs": 12000,
        "metrics": {
            "current_animals": 1,
            "monthly_intake": 2,
            "neutering_count": 1,
            "adoption_rate": 0.5
        },
        "animals": [
            {"species": "dog", "status": "available", "intake_date": "2024-03-20T00:00:00Z"}
        ]
    })
}

// ── Health ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup(vec![]);
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["shelter_agents"], 0);
}

// ── Shelters ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_shelters_empty() {
    let app = setup(vec![]);
    let req = Request::get("/api/shelters").body(Body::empty()).unwrap();
    let resp = app.router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn test_create_then_list_hides_costs() {
    let app = setup(vec![]);
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/shelters", shelter_body()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    assert_eq!(created["message"], "Shelter created successfully");
    let id = created["ids"][0].as_str().unwrap().to_string();

    let req = Request::get("/api/shelters").body(Body::empty()).unwrap();
    let listed = body_json(app.router.oneshot(req).await.unwrap()).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["name"], "Happy Paws");
    assert_eq!(listed[0]["metrics"]["current_animals"], 1);
    assert!(listed[0].get("operational_costs").is_none());
    assert!(listed[0].get("animals").is_none());

    assert_eq!(app.store.get_shelter(&id).unwrap().unwrap().animals.len(), 1);
}

#[tokio::test]
async fn test_create_shelter_missing_field() {
    let app = setup(vec![]);
    let mut body = shelter_body();
    body.as_object_mut().unwrap().remove("location");
    let resp = app.router.oneshot(post_json("/api/shelters", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Missing required field: location"})
    );
}

#[tokio::test]
async fn test_blank_location_is_rejected_and_not_stored() {
    let app = setup(vec![]);
    let mut body = shelter_body();
    body["location"] = json!("");
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/shelters", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Invalid value for field: location"})
    );
    assert!(app.store.list_shelters().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_checked_requires_metrics_fields() {
    let app = setup(vec![]);
    let mut body = shelter_body();
    body["metrics"].as_object_mut().unwrap().remove("neutering_count");
    let resp = app
        .router
        .oneshot(post_json("/api/shelters/create", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["error"],
        "Missing required metrics field: neutering_count"
    );
}

#[tokio::test]
async fn test_create_checked_success() {
    let app = setup(vec![]);
    let resp = app
        .router
        .oneshot(post_json("/api/shelters/create", shelter_body()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["totalRecords"], 1);
    let id = json["shelterId"].as_str().unwrap();
    assert!(app.store.get_shelter(id).unwrap().is_some());
}

// ── Donors ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_donor_validation_messages() {
    let cases = [
        (
            json!({"name": "Ada", "amount": 50, "recurring": true}),
            "Missing required field: duration_months",
        ),
        (
            json!({"name": "Ada", "amount": 50, "recurring": true, "duration_months": -1}),
            "duration_months must be 0 or positive",
        ),
        (
            json!({"name": "Ada", "amount": 50, "recurring": false, "duration_months": 3}),
            "Non-recurring donations must have duration_months set to 0",
        ),
    ];
    for (body, expected) in cases {
        let app = setup(vec![]);
        let resp = app.router.oneshot(post_json("/api/donors", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({ "error": expected }));
        assert!(app.store.list_donors().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_donor_created() {
    let app = setup(vec![]);
    let body = json!({"name": "Ada", "amount": 25.5, "recurring": true, "duration_months": 12});
    let resp = app.router.oneshot(post_json("/api/donors", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Donor created successfully");
    let donors = app.store.list_donors().unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!(json["ids"][0], donors[0].id.as_str());
    assert_eq!(donors[0].duration_months, 12);
}

// ── Chat ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_unknown_shelter_is_404_without_llm_call() {
    let app = setup(vec!["should not be used"]);
    let body = json!({"message": "Hello", "shelterId": "no-such-shelter"});
    let resp = app.router.oneshot(post_json("/api/chat", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "Shelter not found"}));
    assert!(app.requests.lock().is_empty());
}

#[tokio::test]
async fn test_chat_requires_message_and_shelter() {
    let app = setup(vec![]);
    let resp = app
        .router
        .oneshot(post_json("/api/chat", json!({"message": "Hi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Message and shelter ID are required");
}

#[tokio::test]
async fn test_shelter_chat_streams_text() {
    let app = setup(vec!["We have 10 animals in our care."]);
    let id = insert_shelter(&app.store, "Happy Paws");

    let uri = format!("/api/shelters/{id}/chat");
    let resp = app
        .router
        .oneshot(post_json(&uri, json!({"message": "How many animals?"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain"));
    assert_eq!(body_string(resp).await, "We have 10 animals in our care.");

    let requests = app.requests.lock();
    assert_eq!(requests.len(), 1);
    assert!(
        requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("10 animals in our care")
    );
}

#[tokio::test]
async fn test_shelter_chat_requires_message() {
    let app = setup(vec![]);
    let id = insert_shelter(&app.store, "Happy Paws");
    let resp = app
        .router
        .oneshot(post_json(&format!("/api/shelters/{id}/chat"), json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Message is required");
}

#[tokio::test]
async fn test_chat_without_model_key_is_500() {
    let mut config = config();
    config.agent.model = "anthropic/claude-3-5-sonnet-latest".into();
    let app = setup_with(config, MockProvider::new("mock"), MockChain::new());
    let id = insert_shelter(&app.store, "Happy Paws");

    let body = json!({"message": "Hello", "shelterId": id});
    let resp = app.router.oneshot(post_json("/api/chat", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("ANTHROPIC_API_KEY")
    );
}

// ── Coordinator ────────────────────────────────────────────────

#[tokio::test]
async fn test_coordinator_requires_messages_array() {
    let app = setup(vec![]);
    let resp = app
        .router
        .oneshot(post_json("/api/coordinator", json!({"messages": "hi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Invalid request body - messages array required"})
    );
}

#[tokio::test]
async fn test_coordinator_success() {
    let app = setup(vec!["Hello from the coordinator"]);
    let body = json!({"messages": [{"role": "user", "content": "Hi"}]});
    let resp = app.router.oneshot(post_json("/api/coordinator", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"status": "success", "response": "Hello from the coordinator"})
    );
}

#[tokio::test]
async fn test_coordinator_failure_is_500() {
    let app = setup_with(
        config(),
        MockProvider::new("mock").with_error("upstream down"),
        MockChain::new(),
    );
    let body = json!({"messages": [{"role": "user", "content": "Hi"}]});
    let resp = app.router.oneshot(post_json("/api/coordinator", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "Failed to process request"}));
}

// ── Adopt & intake ─────────────────────────────────────────────

#[tokio::test]
async fn test_adopt_streams_with_preference_guidance() {
    let app = setup(vec!["Do you have a yard?"]);
    let body = json!({"messages": [
        {"role": "user", "content": "I'd like a dog for my apartment"}
    ]});
    let resp = app.router.oneshot(post_json("/api/adopt", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "Do you have a yard?");

    let requests = app.requests.lock();
    let system = requests[0].system.as_deref().unwrap();
    assert!(system.contains("\"animalType\":\"dog\""));
    assert!(system.contains("\"livingSpace\":\"apartment\""));
}

#[tokio::test]
async fn test_adopt_provider_error_apologizes() {
    let app = setup_with(
        config(),
        MockProvider::new("mock").with_error("rate limited"),
        MockChain::new(),
    );
    let body = json!({"messages": [{"role": "user", "content": "a cat please"}]});
    let resp = app.router.oneshot(post_json("/api/adopt", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_string(resp).await,
        haven_agents::relay::APOLOGY
    );
}

#[tokio::test]
async fn test_intake_creates_shelter() {
    let provider = MockProvider::new("mock")
        .with_tool_call(
            "create_shelter",
            json!({"name": "Whisker Haven", "location": "Salem, OR", "operational_costs": "8000"}),
        )
        .with_response("Your shelter is registered!");
    let app = setup_with(config(), provider, MockChain::new());

    let body = json!({"messages": [
        {"role": "user", "content": "Register Whisker Haven in Salem, OR, costs are 8000 a month"}
    ]});
    let resp = app
        .router
        .clone()
        .oneshot(post_json("/api/intake", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "Your shelter is registered!");

    let shelters = app.store.list_shelters().unwrap();
    assert_eq!(shelters.len(), 1);
    assert_eq!(shelters[0].name, "Whisker Haven");

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let health = body_json(app.router.oneshot(req).await.unwrap()).await;
    assert_eq!(health["shelter_agents"], 1);
}

// ── Stats ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_stats_from_chain() {
    let mut config = config();
    config.chain.known_shelters = vec![SHELTER_A.into(), SHELTER_B.into()];
    let chain = MockChain::new()
        .with_balance(CONTRACT, 2_500_000_000_000_000_000)
        .with_tx_count(CONTRACT, 7)
        .with_approval(
            SHELTER_A,
            ShelterApproval {
                is_approved: true,
                monthly_allowance: 100,
                last_distribution_time: 0,
            },
        )
        .failing(SHELTER_B);
    let app = setup_with(config, MockProvider::new("mock"), chain);

    let req = Request::get("/api/stats").body(Body::empty()).unwrap();
    let resp = app.router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"balance": "2.5", "shelterCount": 1, "donationCount": 7})
    );
}

#[tokio::test]
async fn test_stats_without_contract_is_500() {
    let mut config = config();
    config.chain.contract_address = None;
    let app = setup_with(config, MockProvider::new("mock"), MockChain::new());

    let req = Request::get("/api/stats").body(Body::empty()).unwrap();
    let resp = app.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Failed to fetch blockchain stats"})
    );
}

// ── Auth ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let mut config = config();
    config.server.api_key = Some("secret".into());
    let app = setup_with(config, MockProvider::new("mock"), MockChain::new());

    let req = Request::get("/api/shelters").body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::get("/api/shelters")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
