//! In-process stand-in for the Authentication Service.
//!
//! Speaks the same response envelope as the real service, keeps its users
//! in memory, and binds to an ephemeral port so each test gets its own
//! isolated instance.

// shared across integration test binaries; not every binary uses every helper
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Mutex;

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use quantauth_client::{
    AuthRequest, AuthSuccess, FaceSample, Frame, HealthProbeConfig, ServiceConfig, SessionClient,
};

#[derive(Clone)]
struct StubUser {
    id: i64,
    username: String,
    email: String,
    password: String,
    face_registered: bool,
    fingerprint_registered: bool,
    created_at: String,
    last_login: Option<String>,
}

#[derive(Default)]
struct StubState {
    users: HashMap<String, StubUser>,
    tokens: HashMap<String, String>,
    next_id: i64,
}

type Shared = web::Data<Mutex<StubState>>;

/// Naive ISO 8601, the way the real service formats timestamps.
fn now_isoformat() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn rejected(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({"success": false, "message": message}))
}

fn profile_json(user: &StubUser) -> Value {
    json!({
        "user_id": user.id,
        "username": user.username,
        "email": user.email,
        "created_at": user.created_at,
        "last_login": user.last_login,
        "biometrics_registered": {
            "face": user.face_registered,
            "fingerprint": user.fingerprint_registered
        }
    })
}

fn non_empty_str(body: &Value, key: &str) -> bool {
    body.get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

fn authed_user(state: &Mutex<StubState>, req: &HttpRequest) -> Result<StubUser, HttpResponse> {
    let Some(token) = bearer_token(req) else {
        return Err(rejected(StatusCode::UNAUTHORIZED, "Token is missing"));
    };
    let state = state.lock().unwrap();
    let Some(username) = state.tokens.get(&token) else {
        return Err(rejected(StatusCode::UNAUTHORIZED, "Invalid token"));
    };
    match state.users.get(username) {
        Some(user) => Ok(user.clone()),
        None => Err(rejected(StatusCode::UNAUTHORIZED, "User not found")),
    }
}

async fn health(state: Shared) -> HttpResponse {
    let total_users = state.lock().unwrap().users.len();
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "System operational",
        "data": {
            "quantum_crypto": {
                "algorithm": "Kyber768",
                "pqc": true,
                "qrng_source": "ANU Quantum Random Numbers",
                "qrng_active": true
            },
            "biometric_services": {"face_detection": true, "fingerprint": true},
            "timestamp": now_isoformat(),
            "total_users": total_users
        }
    }))
}

async fn register(state: Shared, body: web::Json<Value>) -> HttpResponse {
    let username = body.get("username").and_then(Value::as_str).unwrap_or("");
    let email = body.get("email").and_then(Value::as_str).unwrap_or("");
    let password = body.get("password").and_then(Value::as_str).unwrap_or("");
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return rejected(StatusCode::BAD_REQUEST, "Missing required fields");
    }

    let mut state = state.lock().unwrap();
    if state.users.contains_key(username) {
        return rejected(StatusCode::BAD_REQUEST, "Username already exists");
    }
    if state.users.values().any(|user| user.email == email) {
        return rejected(StatusCode::BAD_REQUEST, "Email already exists");
    }

    state.next_id += 1;
    let user = StubUser {
        id: state.next_id,
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        face_registered: non_empty_str(&body, "face_image"),
        fingerprint_registered: non_empty_str(&body, "fingerprint_template"),
        created_at: now_isoformat(),
        last_login: None,
    };
    let token = format!("token_{}", Uuid::new_v4());
    state.tokens.insert(token.clone(), username.to_string());
    let data = profile_json(&user);
    state.users.insert(username.to_string(), user);

    HttpResponse::Created().json(json!({
        "success": true,
        "message": "User registered successfully",
        "token": token,
        "data": data
    }))
}

async fn login(state: Shared, body: web::Json<Value>) -> HttpResponse {
    let username = body
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let password = body.get("password").and_then(Value::as_str).unwrap_or("");
    if username.is_empty() || password.is_empty() {
        return rejected(StatusCode::BAD_REQUEST, "Missing username or password");
    }

    let mut state = state.lock().unwrap();
    let data;
    {
        let Some(user) = state.users.get_mut(&username) else {
            return rejected(StatusCode::UNAUTHORIZED, "Invalid username or password");
        };
        if user.password != password {
            return rejected(StatusCode::UNAUTHORIZED, "Invalid username or password");
        }
        user.last_login = Some(now_isoformat());
        data = profile_json(user);
    }

    // a misbehaving service that claims success without issuing a token;
    // exercised by the client's envelope-invariant tests
    if username == "empty-token" {
        return HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Login successful",
            "token": "",
            "data": data
        }));
    }

    let token = format!("token_{}", Uuid::new_v4());
    state.tokens.insert(token.clone(), username);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "data": data
    }))
}

async fn get_user(state: Shared, req: HttpRequest) -> HttpResponse {
    match authed_user(state.get_ref(), &req) {
        Ok(user) => HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile_json(&user)
        })),
        Err(response) => response,
    }
}

async fn update_biometrics(state: Shared, req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    let user = match authed_user(state.get_ref(), &req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    if !non_empty_str(&body, "face_image") {
        return rejected(StatusCode::BAD_REQUEST, "No biometric data provided");
    }
    let mut state = state.lock().unwrap();
    if let Some(stored) = state.users.get_mut(&user.username) {
        stored.face_registered = true;
    }
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Biometrics updated successfully"
    }))
}

async fn delete_user(state: Shared, req: HttpRequest) -> HttpResponse {
    let user = match authed_user(state.get_ref(), &req) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let mut state = state.lock().unwrap();
    state.users.remove(&user.username);
    state.tokens.retain(|_, username| *username != user.username);
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Account deleted successfully"
    }))
}

async fn admin_users(state: Shared, req: HttpRequest) -> HttpResponse {
    if let Err(response) = authed_user(state.get_ref(), &req) {
        return response;
    }
    let state = state.lock().unwrap();
    let users: Vec<Value> = state.users.values().map(profile_json).collect();
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {"total_users": users.len(), "users": users}
    }))
}

async fn security_metrics() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "quantum_status": {
                "algorithm": "Kyber768",
                "pqc": true,
                "qrng_source": "ANU Quantum Random Numbers",
                "qrng": true
            },
            "encryption_metrics": {"quantum_avg_ms": 1.8, "classical_avg_ms": 0.4},
            "login_metrics": {"successful": 0, "failed": 0}
        }
    }))
}

async fn test_quantum() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Quantum crypto self-test passed",
        "data": {
            "algorithm": "Kyber768",
            "encryption_ms": 2.1,
            "decryption_ms": 1.7,
            "round_trip_ok": true
        }
    }))
}

/// A running stub service on an ephemeral local port
pub struct StubService {
    pub base_url: String,
    handle: ServerHandle,
}

impl StubService {
    /// Bind and start serving. Must run inside an actix system
    /// (`#[actix_web::test]`).
    pub async fn spawn() -> Self {
        let state = web::Data::new(Mutex::new(StubState::default()));
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub listener address");

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/health", web::get().to(health))
                .route("/register", web::post().to(register))
                .route("/login", web::post().to(login))
                .route("/user", web::get().to(get_user))
                .route("/update-biometrics", web::post().to(update_biometrics))
                .route("/user/delete", web::delete().to(delete_user))
                .route("/admin/users", web::get().to(admin_users))
                .route("/security/metrics", web::get().to(security_metrics))
                .route("/security/test-quantum", web::post().to(test_quantum))
        })
        .workers(1)
        .listen(listener)
        .expect("stub server listens")
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Client configuration pointing at this stub, with fast timeouts.
    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: self.base_url.clone(),
            connect_timeout_seconds: 2,
            request_timeout_seconds: 5,
            health_probe: HealthProbeConfig {
                retries: 0,
                initial_delay_ms: 1,
                max_delay_ms: 10,
            },
        }
    }

    pub fn client(&self) -> SessionClient {
        SessionClient::new(&self.config()).expect("stub config should build a client")
    }

    /// Stop accepting connections, leaving in-flight requests to finish.
    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

/// A tiny but genuine PNG face sample.
pub fn face_sample() -> FaceSample {
    Frame {
        width: 2,
        height: 2,
        rgb: vec![128; 12],
    }
    .encode()
    .expect("tiny frame should encode")
}

/// Register a user through the real client, with both factors attached.
pub async fn register_user(client: &SessionClient, username: &str) -> AuthSuccess {
    let request = AuthRequest {
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        password: "password1".to_string(),
        face_image: Some(face_sample().data_uri()),
        fingerprint_template: Some(format!("fp_seed_{username}")),
    };
    client
        .register(&request)
        .await
        .expect("registration should succeed")
}
