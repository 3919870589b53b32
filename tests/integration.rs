//! End-to-end tests for the scenario runner
//!
//! These tests start an in-process travel booking API on an ephemeral port
//! and run probes against it:
//! 1. The bundled scenario passes end to end against a conforming server
//! 2. Missing identities and bindings fail without sending a request
//! 3. A dead server still yields one outcome per probe
//! 4. The built binary exits 0 only when every probe passed

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use apiprobe::harness::{Check, Echo, FailureKind, Outcome, Suite};
use apiprobe::http::HttpClient;
use apiprobe::{Category, Ledger, Probe, Scenario, ScenarioRunner};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

const SESSION_COOKIE: &str = "demo-session";

#[derive(Clone)]
struct Departure {
    id: &'static str,
    allow_free_rsvp: bool,
    capacity: u64,
    spots_left: u64,
}

struct Booking {
    id: String,
    owner: String,
    departure_id: String,
    status: &'static str,
}

struct TravelState {
    departures: Vec<Departure>,
    bookings: Vec<Booking>,
    created_trips: Vec<Value>,
}

#[derive(Clone)]
struct AppState {
    travel: Arc<Mutex<TravelState>>,
    requests: Arc<AtomicUsize>,
}

/// Running mock server
struct TestServer {
    base_url: String,
    requests: Arc<AtomicUsize>,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState {
            travel: Arc::new(Mutex::new(TravelState {
                departures: vec![
                    Departure {
                        id: "dep-free-june",
                        allow_free_rsvp: true,
                        capacity: 12,
                        spots_left: 12,
                    },
                    Departure {
                        id: "dep-paid-july",
                        allow_free_rsvp: false,
                        capacity: 10,
                        spots_left: 10,
                    },
                ],
                bookings: Vec::new(),
                created_trips: Vec::new(),
            })),
            requests: Arc::new(AtomicUsize::new(0)),
        };
        let requests = state.requests.clone();

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/me", get(me))
            .route("/api/trips", get(list_trips))
            .route("/api/trips/:slug", get(trip_detail))
            .route("/api/admin/trips", get(admin_trips).post(create_trip))
            .route("/api/admin/dashboard", get(dashboard))
            .route("/api/bookings", get(list_bookings).post(create_booking))
            .route("/api/payments/webhook", post(webhook))
            .route("/api/status", get(status_page))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            requests,
        }
    }

    fn client(&self) -> HttpClient {
        HttpClient::new(&self.base_url, Duration::from_secs(5)).expect("Failed to build client")
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Role carried by the session cookie, if any
fn session_role(state: &AppState, headers: &HeaderMap) -> Option<String> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn trip_json(departures: &[Departure]) -> Value {
    json!({
        "slug": "alps-hiking-escape",
        "title": "Alps Hiking Escape",
        "departures": departures.iter().map(|d| json!({
            "id": d.id,
            "allow_free_rsvp": d.allow_free_rsvp,
            "capacity": d.capacity,
            "spots_left": d.spots_left,
        })).collect::<Vec<_>>(),
    })
}

async fn login(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    session_role(&state, &headers);
    let role = match body["type"].as_str() {
        Some("admin") => "admin",
        _ => "user",
    };
    (
        [(header::SET_COOKIE, format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, role))],
        Json(json!({
            "success": true,
            "user": { "email": format!("{}@example.com", role), "role": role },
        })),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    session_role(&state, &headers);
    (
        [(header::SET_COOKIE, format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE))],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_role(&state, &headers) {
        Some(role) => Json(json!({ "user": { "role": role } })).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Authentication required"),
    }
}

async fn list_trips(State(state): State<AppState>, headers: HeaderMap) -> Response {
    session_role(&state, &headers);
    let travel = state.travel.lock().expect("state poisoned");
    Json(json!({ "trips": [trip_json(&travel.departures)] })).into_response()
}

async fn trip_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    session_role(&state, &headers);
    if slug != "alps-hiking-escape" {
        return error(StatusCode::NOT_FOUND, "Trip not found");
    }
    let travel = state.travel.lock().expect("state poisoned");
    Json(json!({ "trip": trip_json(&travel.departures) })).into_response()
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    match session_role(state, headers).as_deref() {
        Some("admin") => Ok(()),
        Some(_) => Err(error(StatusCode::FORBIDDEN, "Admin access required")),
        None => Err(error(StatusCode::UNAUTHORIZED, "Authentication required")),
    }
}

async fn admin_trips(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    let travel = state.travel.lock().expect("state poisoned");
    let mut trips = vec![trip_json(&travel.departures)];
    trips.extend(travel.created_trips.iter().cloned());
    Json(json!({ "trips": trips })).into_response()
}

async fn create_trip(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    let mut travel = state.travel.lock().expect("state poisoned");
    travel.created_trips.push(body.clone());
    Json(json!({ "trip": body })).into_response()
}

async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    let travel = state.travel.lock().expect("state poisoned");
    Json(json!({
        "stats": { "total_bookings": travel.bookings.len() },
        "upcoming_departures": travel.departures.iter().map(|d| d.id).collect::<Vec<_>>(),
    }))
    .into_response()
}

async fn list_bookings(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(role) = session_role(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    };
    let travel = state.travel.lock().expect("state poisoned");
    let bookings: Vec<Value> = travel
        .bookings
        .iter()
        .filter(|b| role == "admin" || b.owner == role)
        .map(|b| json!({ "id": b.id, "departure_id": b.departure_id, "status": b.status }))
        .collect();
    Json(json!({ "bookings": bookings })).into_response()
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(role) = session_role(&state, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "Authentication required");
    };
    let seats = body["seats"].as_u64().unwrap_or(1);
    let mut travel = state.travel.lock().expect("state poisoned");
    let Some(departure) = travel
        .departures
        .iter_mut()
        .find(|d| Some(d.id) == body["departure_id"].as_str())
    else {
        return error(StatusCode::NOT_FOUND, "Departure not found");
    };
    if departure.spots_left < seats {
        return error(StatusCode::BAD_REQUEST, "Not enough spots left");
    }
    departure.spots_left -= seats;
    let free = departure.allow_free_rsvp;
    let departure_id = departure.id.to_string();

    let booking = Booking {
        id: format!("booking-{}", travel.bookings.len() + 1),
        owner: role,
        departure_id,
        status: if free { "reserved_unpaid" } else { "pending_deposit" },
    };
    let response = json!({
        "booking": { "id": booking.id, "status": booking.status },
        "payment_required": !free,
    });
    travel.bookings.push(booking);
    Json(response).into_response()
}

async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    session_role(&state, &headers);
    let event: Option<Value> = serde_json::from_slice(&body).ok();
    let signed = headers.contains_key("stripe-signature");
    match event {
        Some(event) if signed && event["type"].is_string() => {
            Json(json!({ "received": true })).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "Invalid webhook"),
    }
}

async fn status_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    session_role(&state, &headers);
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>All systems go</body></html>",
    )
        .into_response()
}

async fn run(client: HttpClient, suites: &[Suite]) -> Ledger {
    ScenarioRunner::new(client)
        .with_echo(Echo::Silent)
        .run(suites)
        .await
}

fn outcome<'a>(ledger: &'a Ledger, probe: &str) -> &'a Outcome {
    ledger
        .outcomes()
        .find(|o| o.probe == probe)
        .unwrap_or_else(|| panic!("no outcome for '{}'", probe))
}

fn suite(category: Category, probes: Vec<Probe>) -> Suite {
    Suite { category, probes }
}

#[tokio::test]
async fn test_bundled_scenario_passes() {
    let server = TestServer::start().await;
    let scenario = Scenario::bundled().unwrap();

    let ledger = run(server.client(), &scenario.suites).await;

    let failures: Vec<String> = ledger
        .outcomes()
        .filter(|o| !o.passed)
        .map(|o| format!("[{}] {}: {}", o.category, o.probe, o.detail))
        .collect();
    assert!(failures.is_empty(), "failed probes:\n{}", failures.join("\n"));

    let summary = ledger.summary();
    assert_eq!(summary.total_passed, scenario.probe_count());
    assert_eq!(summary.total_failed, 0);
    assert_eq!(ledger.len(), scenario.probe_count());

    let order: Vec<Category> = ledger.categories().iter().map(|r| r.category).collect();
    assert_eq!(order, Category::ALL.to_vec());
}

#[tokio::test]
async fn test_negative_cases_see_expected_status() {
    let server = TestServer::start().await;
    let scenario = Scenario::bundled().unwrap();
    let ledger = run(server.client(), &scenario.suites).await;

    for name in [
        "Unauthorized access handling",
        "Unauthorized admin access",
        "Invalid webhook handling",
        "Invalid trip slug handling",
    ] {
        let o = outcome(&ledger, name);
        assert!(o.passed, "{}: {}", name, o.detail);
    }
}

#[tokio::test]
async fn test_missing_identity_sends_nothing() {
    let server = TestServer::start().await;
    let probes = vec![Probe::get(Category::Auth, "Ghost me", "/auth/me")
        .as_identity("ghost")
        .expect_status(200)];

    let ledger = run(server.client(), &[suite(Category::Auth, probes)]).await;

    let o = outcome(&ledger, "Ghost me");
    assert!(!o.passed);
    assert_eq!(o.kind, Some(FailureKind::IdentityMissing));
    assert!(o.detail.contains("ghost"));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_missing_binding_does_not_stop_run() {
    let server = TestServer::start().await;
    let probes = vec![
        Probe::post(
            Category::Bookings,
            "Book unknown departure",
            "/bookings",
            json!({ "departure_id": "${departure_id_free}" }),
        )
        .requires("departure_id_free")
        .expect_status(200),
        Probe::get(Category::Bookings, "List trips", "/trips")
            .expect_status(200)
            .check(Check::IsArray {
                path: "trips".to_string(),
            }),
    ];

    let ledger = run(server.client(), &[suite(Category::Bookings, probes)]).await;

    let blocked = outcome(&ledger, "Book unknown departure");
    assert_eq!(blocked.kind, Some(FailureKind::MissingPrecondition));
    assert!(blocked.detail.contains("departure_id_free"));
    assert!(outcome(&ledger, "List trips").passed);
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_unexpected_status_detail() {
    let server = TestServer::start().await;
    let probes = vec![Probe::get(Category::Bookings, "Anonymous bookings", "/bookings")
        .expect_status(200)];

    let ledger = run(server.client(), &[suite(Category::Bookings, probes)]).await;

    let o = outcome(&ledger, "Anonymous bookings");
    assert_eq!(o.kind, Some(FailureKind::UnexpectedStatus));
    assert_eq!(o.detail, "expected status 200, got 401");
}

#[tokio::test]
async fn test_logout_forgets_identity() {
    let server = TestServer::start().await;
    let probes = vec![
        Probe::post(Category::Auth, "Login", "/auth/login", json!({ "type": "user" }))
            .login("visitor", Some("user"))
            .expect_status(200),
        Probe::post(Category::Auth, "Logout", "/auth/logout", json!({}))
            .as_identity("visitor")
            .logout("visitor")
            .expect_status(200),
        Probe::get(Category::Auth, "Me after logout", "/auth/me")
            .as_identity("visitor")
            .expect_status(200),
    ];

    let ledger = run(server.client(), &[suite(Category::Auth, probes)]).await;

    assert!(outcome(&ledger, "Login").passed);
    assert!(outcome(&ledger, "Logout").passed);
    assert_eq!(
        outcome(&ledger, "Me after logout").kind,
        Some(FailureKind::IdentityMissing)
    );
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn test_idempotent_probes_repeat() {
    let server = TestServer::start().await;
    let probes = || {
        vec![
            Probe::get(Category::Trips, "List", "/trips")
                .expect_status(200)
                .check(Check::NonEmpty {
                    path: "trips".to_string(),
                }),
            Probe::get(Category::Trips, "Missing", "/trips/nowhere").expect_status(404),
            Probe::get(Category::Trips, "Wrong expectation", "/trips/nowhere").expect_status(200),
        ]
    };

    let first = run(server.client(), &[suite(Category::Trips, probes())]).await;
    let second = run(server.client(), &[suite(Category::Trips, probes())]).await;

    let verdicts = |ledger: &Ledger| -> Vec<(String, bool, String)> {
        ledger
            .outcomes()
            .map(|o| (o.probe.clone(), o.passed, o.detail.clone()))
            .collect()
    };
    assert_eq!(verdicts(&first), verdicts(&second));
    assert_eq!(first.summary().total_failed, 1);
}

#[tokio::test]
async fn test_unreachable_server_records_every_probe() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = HttpClient::new(&format!("http://{}/api", addr), Duration::from_secs(2)).unwrap();
    let scenario = Scenario::bundled().unwrap();

    let ledger = run(client, &scenario.suites).await;

    assert_eq!(ledger.len(), scenario.probe_count());
    assert!(!ledger.all_passed());
    assert_eq!(ledger.summary().total_failed, scenario.probe_count());

    let kinds: HashMap<&str, Option<FailureKind>> = ledger
        .outcomes()
        .map(|o| (o.probe.as_str(), o.kind))
        .collect();
    assert_eq!(kinds["Admin login"], Some(FailureKind::Transport));
    assert_eq!(kinds["Auth/me admin"], Some(FailureKind::IdentityMissing));
    assert_eq!(kinds["Free RSVP booking"], Some(FailureKind::IdentityMissing));
    assert_eq!(kinds["Spots left decrement"], Some(FailureKind::MissingPrecondition));
}

#[tokio::test]
async fn test_html_body_is_assertion_failure() {
    let server = TestServer::start().await;
    let probes = vec![
        Probe::get(Category::Trips, "Status page as JSON", "/status").expect_status(200),
        Probe::get(Category::Trips, "Status page as text", "/status")
            .expect_status(200)
            .allow_non_json()
            .assert_with(|r| {
                if r.raw.contains("All systems go") {
                    Ok(())
                } else {
                    Err(format!("unexpected page: {}", r.raw))
                }
            }),
    ];

    let ledger = run(server.client(), &[suite(Category::Trips, probes)]).await;

    let strict = outcome(&ledger, "Status page as JSON");
    assert_eq!(strict.kind, Some(FailureKind::AssertionFailure));
    assert!(strict.detail.contains("not JSON"), "{}", strict.detail);
    assert!(strict.detail.contains("expected value"), "{}", strict.detail);

    let lenient = outcome(&ledger, "Status page as text");
    assert!(lenient.passed, "{}", lenient.detail);
}

#[tokio::test]
async fn test_request_timeout_overrides_default() {
    // Accepts connections and never answers
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let client = HttpClient::new(&format!("http://{}/api", addr), Duration::from_secs(30)).unwrap();
    let probes = vec![Probe::get(Category::Trips, "Hung trips", "/trips")
        .with_timeout(Duration::from_millis(500))
        .expect_status(200)];

    let started = Instant::now();
    let ledger = run(client, &[suite(Category::Trips, probes)]).await;
    let elapsed = started.elapsed();

    let o = outcome(&ledger, "Hung trips");
    assert_eq!(o.kind, Some(FailureKind::Transport));
    assert!(o.detail.contains("timed out after 0.5s"), "{}", o.detail);
    assert!(elapsed < Duration::from_secs(10), "took {:?}", elapsed);
}

/// Run the built binary against a base URL with an empty config file
async fn run_binary(base_url: &str) -> std::process::Output {
    let config = tempfile::NamedTempFile::new().unwrap();
    tokio::process::Command::new(env!("CARGO_BIN_EXE_apiprobe"))
        .arg("run")
        .arg("--base-url")
        .arg(base_url)
        .arg("--config")
        .arg(config.path())
        .env("NO_COLOR", "1")
        .output()
        .await
        .expect("Failed to run apiprobe binary")
}

#[tokio::test]
async fn test_binary_exits_zero_when_all_pass() {
    let server = TestServer::start().await;

    let output = run_binary(&server.base_url).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stdout:\n{}", stdout);
    assert!(stdout.contains("ALL TESTS PASSED"));
}

#[tokio::test]
async fn test_binary_exits_one_on_failure() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let output = run_binary(&format!("http://{}/api", addr)).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stdout:\n{}", stdout);
    assert!(stdout.contains("Some tests failed"));
}

#[tokio::test]
async fn test_binary_exits_one_on_bad_base_url() {
    let output = run_binary("ftp://example.com").await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Invalid base URL"), "{}", stderr);
    assert!(output.stdout.is_empty());
}
