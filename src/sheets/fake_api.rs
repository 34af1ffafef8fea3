//! In-process stand-in for the Sheets values API and the OAuth token endpoint.

use super::auth::ServiceAccountKey;
use axum::extract::{Form, Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");
pub const PUBLIC_KEY: &str = include_str!("testdata/service_account_pub.pem");
pub const ACCESS_TOKEN: &str = "fake-access-token";

/// Sheet name whose reads are answered with 404.
pub const MISSING_SHEET: &str = "Missing";

/// What the fake server has seen.
#[derive(Clone, Default)]
pub struct Recorded {
    /// `"<METHOD> <spreadsheet> <range> <query>"`, decoded.
    pub requests: Arc<Mutex<Vec<String>>>,
    pub authorization: Arc<Mutex<Vec<String>>>,
    pub bodies: Arc<Mutex<Vec<Value>>>,
    pub token_forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
    pub token_posts: Arc<AtomicUsize>,
}

impl Recorded {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn token_posts(&self) -> usize {
        self.token_posts.load(Ordering::SeqCst)
    }

    fn note(&self, line: String, headers: &HeaderMap) {
        self.requests.lock().unwrap().push(line);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.authorization.lock().unwrap().push(auth);
    }
}

/// Start the fake API on an ephemeral port and return its base URL.
pub async fn start() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/token", post(token))
        .route("/token-denied", post(token_denied))
        .route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(read_values).put(update_values),
        )
        .route("/v4/spreadsheets/{id}/values:batchUpdate", post(batch_update))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), recorded)
}

/// A service account key whose token endpoint is `<base><path>`.
pub fn service_account(base: &str, path: &str) -> ServiceAccountKey {
    ServiceAccountKey::from_json(
        &json!({
            "type": "service_account",
            "client_email": "tracker@example.iam.gserviceaccount.com",
            "private_key": PRIVATE_KEY,
            "token_uri": format!("{}{}", base, path),
        })
        .to_string(),
    )
    .unwrap()
}

async fn token(
    State(recorded): State<Recorded>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    recorded.token_posts.fetch_add(1, Ordering::SeqCst);
    recorded.token_forms.lock().unwrap().push(form);
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "expires_in": 3600,
        "token_type": "Bearer"
    }))
}

async fn token_denied() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "invalid_grant"})),
    )
}

async fn read_values(
    State(recorded): State<Recorded>,
    Path((id, range)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    recorded.note(
        format!("GET {} {} {}", id, range, query.unwrap_or_default()),
        &headers,
    );

    if range.contains(MISSING_SHEET) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": "Unable to parse range"}})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [["Client", "Date"], ["Alice", "2024-01-01"]]
        })),
    )
}

async fn update_values(
    State(recorded): State<Recorded>,
    Path((id, range)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.note(
        format!("PUT {} {} {}", id, range, query.unwrap_or_default()),
        &headers,
    );
    recorded.bodies.lock().unwrap().push(body);
    Json(json!({"spreadsheetId": id, "updatedRange": range}))
}

async fn batch_update(
    State(recorded): State<Recorded>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    recorded.note(format!("POST {} values:batchUpdate ", id), &headers);
    recorded.bodies.lock().unwrap().push(body);
    Json(json!({"spreadsheetId": id}))
}
