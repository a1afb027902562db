use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use grantlens_application::{
    FieldGrantQuery, FieldGrantSource, ObjectGrantQuery, ObjectGrantSource, RemediationGateway,
    RiskAnalyzer, SharingSource, SystemPermissionSource, UserDirectory,
};
use grantlens_core::{AppError, UserId};
use grantlens_domain::{GrantSourceType, RemediationAction, RiskLevel, SearchGate, SearchTerm};

use super::HttpAccessReviewClient;

#[derive(Clone, Default)]
struct ServerState {
    hits: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    authorization: Arc<Mutex<Vec<Option<String>>>>,
    idempotency_keys: Arc<Mutex<Vec<Option<String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn serve(router: Router) -> Url {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(error) => panic!("failed to bind test listener: {error}"),
    };
    let address = match listener.local_addr() {
        Ok(address) => address,
        Err(error) => panic!("failed to read test listener address: {error}"),
    };

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    match Url::parse(&format!("http://{address}/api/")) {
        Ok(url) => url,
        Err(error) => panic!("failed to build test base URL: {error}"),
    }
}

fn client(base_url: Url) -> HttpAccessReviewClient {
    HttpAccessReviewClient::new(reqwest::Client::new(), base_url, 3, 50)
}

fn user_id(value: &str) -> UserId {
    UserId::new(value).unwrap_or_else(|_| unreachable!())
}

fn term(value: &str) -> SearchTerm {
    SearchGate::default()
        .accept(value)
        .unwrap_or_else(|_| unreachable!())
}

async fn object_grants(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    state.queries.lock().await.push(params);
    state.authorization.lock().await.push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    );

    Json(json!({
        "grants": [
            {
                "source_type": "permission_set",
                "source_name": "Sales_Ops",
                "object_name": "SA_Audit__Account__c",
                "can_read": true
            }
        ],
        "total": 51,
        "owner": user_id
    }))
}

async fn field_grants(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let next = if params.contains_key("last_record_id") {
        Value::Null
    } else {
        json!("T1")
    };
    state.queries.lock().await.push(params);

    Json(json!({
        "grants": [
            {
                "source_type": "profile",
                "source_name": "Standard User",
                "object_name": "Contact",
                "field_name": "Contact.Email",
                "can_read": true,
                "can_edit": true
            }
        ],
        "last_record_id": next
    }))
}

async fn flaky_risk(State(state): State<ServerState>) -> Response {
    if state.hits.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    Json(json!({
        "high_risk_count": 2,
        "risk_score": 70,
        "risk_level": "High",
        "critical_findings": ["View All Data"]
    }))
    .into_response()
}

async fn always_unavailable(State(state): State<ServerState>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::BAD_GATEWAY
}

async fn forbidden() -> (StatusCode, &'static str) {
    (
        StatusCode::FORBIDDEN,
        "FIELD_INTEGRITY_EXCEPTION: cannot modify running user",
    )
}

async fn flaky_remediation(State(state): State<ServerState>, headers: HeaderMap) -> StatusCode {
    state.idempotency_keys.lock().await.push(
        headers
            .get("idempotency-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    );

    if state.hits.fetch_add(1, Ordering::SeqCst) == 0 {
        return StatusCode::BAD_GATEWAY;
    }

    StatusCode::NO_CONTENT
}

async fn capture_body(State(state): State<ServerState>, Json(body): Json<Value>) -> StatusCode {
    state.bodies.lock().await.push(body);
    StatusCode::NO_CONTENT
}

#[tokio::test]
async fn object_grants_send_paging_search_and_token() {
    let state = ServerState::default();
    let router = Router::new()
        .route("/api/users/{user_id}/object-grants", get(object_grants))
        .with_state(state.clone());
    let client = client(serve(router).await).with_api_token("secret");

    let page = client
        .fetch_object_grants(ObjectGrantQuery {
            user_id: user_id("005U1"),
            page_index: 2,
            page_size: 50,
            term: term("acc"),
        })
        .await;

    assert!(page.is_ok_and(|page| {
        page.total == 51
            && page.grants.len() == 1
            && page.grants[0].source_type == GrantSourceType::PermissionSet
            && page.grants[0].can_read
            && !page.grants[0].can_delete
    }));

    let queries = state.queries.lock().await;
    assert_eq!(queries[0].get("page").map(String::as_str), Some("2"));
    assert_eq!(queries[0].get("page_size").map(String::as_str), Some("50"));
    assert_eq!(queries[0].get("search").map(String::as_str), Some("acc"));
    assert_eq!(
        state.authorization.lock().await[0].as_deref(),
        Some("Bearer secret")
    );
}

#[tokio::test]
async fn field_grants_follow_last_record_id() {
    let state = ServerState::default();
    let router = Router::new()
        .route("/api/users/{user_id}/field-grants", get(field_grants))
        .with_state(state.clone());
    let client = client(serve(router).await);

    let first = client
        .fetch_field_grants(FieldGrantQuery {
            user_id: user_id("005U1"),
            continuation_token: None,
            term: SearchTerm::empty(),
        })
        .await;
    let second = client
        .fetch_field_grants(FieldGrantQuery {
            user_id: user_id("005U1"),
            continuation_token: Some("T1".to_owned()),
            term: SearchTerm::empty(),
        })
        .await;

    assert!(first.is_ok_and(|batch| batch.next_token.as_deref() == Some("T1")));
    assert!(second.is_ok_and(|batch| batch.next_token.is_none()));

    let queries = state.queries.lock().await;
    assert!(!queries[0].contains_key("search"));
    assert_eq!(
        queries[1].get("last_record_id").map(String::as_str),
        Some("T1")
    );
}

#[tokio::test]
async fn transient_status_is_retried() {
    let state = ServerState::default();
    let router = Router::new()
        .route("/api/users/{user_id}/risk", get(flaky_risk))
        .with_state(state.clone());
    let client = client(serve(router).await);

    let risk = client.analyze_user_risk(&user_id("005U1")).await;

    assert!(risk.is_ok_and(|risk| risk.risk_level == RiskLevel::High));
    assert_eq!(state.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_retries_surface_as_network_error() {
    let state = ServerState::default();
    let router = Router::new()
        .route(
            "/api/users/{user_id}/system-permissions",
            get(always_unavailable),
        )
        .with_state(state.clone());
    let client = client(serve(router).await);

    let result = client.fetch_system_permissions(&user_id("005U1")).await;

    assert!(matches!(result, Err(AppError::Network(_))));
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn forbidden_remediation_is_restricted() {
    let router = Router::new().route("/api/users/{user_id}/remediations", post(forbidden));
    let client = client(serve(router).await);

    let result = client
        .apply_remediation(&user_id("005U1"), RemediationAction::RevokePermissionSets)
        .await;

    assert!(matches!(result, Err(AppError::RemediationRestricted(_))));
}

#[tokio::test]
async fn retried_remediation_repeats_one_idempotency_key() {
    let state = ServerState::default();
    let router = Router::new()
        .route("/api/users/{user_id}/remediations", post(flaky_remediation))
        .with_state(state.clone());
    let client = client(serve(router).await);

    let first = client
        .apply_remediation(&user_id("005U1"), RemediationAction::RevokePermissionSets)
        .await;
    let second = client
        .apply_remediation(&user_id("005U1"), RemediationAction::RevokePermissionSets)
        .await;

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);

    let keys = state.idempotency_keys.lock().await;
    assert_eq!(keys.len(), 3);
    assert!(keys[0].is_some());
    assert_eq!(keys[0], keys[1]);
    assert_ne!(keys[1], keys[2]);
}

#[tokio::test]
async fn forbidden_read_is_a_network_error() {
    let router = Router::new().route("/api/users/{user_id}/sharing-rules", get(forbidden));
    let client = client(serve(router).await);

    let result = client.fetch_sharing_rules(&user_id("005U1")).await;

    assert!(matches!(result, Err(AppError::Network(_))));
}

#[tokio::test]
async fn undo_posts_the_action() {
    let state = ServerState::default();
    let router = Router::new()
        .route("/api/users/{user_id}/remediations/undo", post(capture_body))
        .with_state(state.clone());
    let client = client(serve(router).await);

    let result = client
        .undo_remediation(&user_id("005U1"), RemediationAction::ResetSystemPermissions)
        .await;

    assert!(result.is_ok());
    assert_eq!(
        state.bodies.lock().await.first(),
        Some(&json!({ "action": "reset_system_permissions" }))
    );
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let router = Router::new().route("/api/users", get(|| async { Json(json!([])) }));
    let client = client(serve(router).await);

    let users = client.list_active_users().await;
    let details = client.fetch_user_details(&user_id("005U9")).await;

    assert!(users.is_ok_and(|users| users.is_empty()));
    assert!(matches!(details, Err(AppError::NotFound(_))));
}
