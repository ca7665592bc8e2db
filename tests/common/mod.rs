// tests/common/mod.rs

//! In-process fake of the portal backend, serving the same legacy shapes
//! the real one does (ids under `id`, stringified lists, numeric strings).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use portal_client::models::attempt::{SubmitAttemptRequest, grade_locally};
use portal_client::normalize::decode_assignment;
use portal_client::utils::jwt::{Claims, now_secs};
use portal_client::{ApiClient, SessionContext};

pub const PASSWORD: &str = "secret";
pub const ADMIN_EMAIL: &str = "ravi@corp.io";
pub const EMPLOYEE_EMAIL: &str = "asha@corp.io";
pub const ADMIN_ID: &str = "64b7f0c2a1b2c3d4e5f60700";
pub const EMPLOYEE_ID: &str = "64b7f0c2a1b2c3d4e5f60718";

#[derive(Default)]
pub struct Backend {
    pub employees: Vec<Value>,
    pub assignments: Vec<Value>,
    pub blogs: Vec<Value>,
    pub attempts: Vec<Value>,
    /// token -> employee id
    pub tokens: HashMap<String, String>,
    /// "METHOD /path" of every authenticated request, in arrival order.
    pub requests: Vec<String>,
    /// Answer for the next non-GET request.
    pub fail_next: Option<(StatusCode, Value)>,
    pub list_delay: Duration,
    pub report_delay: Duration,
    pub save_delay: Duration,
}

pub type Shared = Arc<Mutex<Backend>>;

pub struct TestApp {
    pub address: String,
    pub backend: Shared,
}

impl TestApp {
    pub fn base_url(&self) -> String {
        format!("{}/api", self.address)
    }

    /// A client with its own empty in-memory session.
    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.base_url(), SessionContext::in_memory()).unwrap()
    }

    pub async fn login_as(&self, email: &str) -> ApiClient {
        let api = self.api();
        api.login(email, PASSWORD).await.unwrap();
        api
    }

    pub fn backend(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<String> {
        self.backend().requests.clone()
    }

    pub fn add_assignment(&self, assignment: Value) {
        self.backend().assignments.push(assignment);
    }

    pub fn add_attempt(&self, attempt: Value) {
        self.backend().attempts.push(attempt);
    }

    /// Every issued token stops working, as after a server-side expiry.
    pub fn revoke_tokens(&self) {
        self.backend().tokens.clear();
    }
}

/// Helper function to spawn the fake backend on a random port.
pub async fn spawn_app() -> TestApp {
    let backend: Shared = Arc::new(Mutex::new(seed()));

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route("/assignments/available", get(available_assignments))
        .route("/assignments/my-report", get(my_report))
        .route("/assignments/status/{employee_id}", get(employee_status))
        .route(
            "/assignments/{id}",
            get(get_assignment).put(update_assignment).delete(delete_assignment),
        )
        .route("/assignments/{id}/attempts", get(assignment_attempts))
        .route("/assignments/{id}/submissions", get(assignment_submissions))
        .route("/assignments/{id}/report", get(assignment_report))
        .route("/assignments/{id}/attempt", post(submit_attempt))
        .route("/blogs", get(list_blogs).post(create_blog))
        .route("/blogs/{id}", get(get_blog).put(update_blog).delete(delete_blog))
        .route("/blogs/{id}/toggle", patch(toggle_blog))
        .route("/employees", get(list_employees))
        .route("/employees/{id}", get(get_employee));

    let app = Router::new().nest("/api", api).with_state(backend.clone());

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, backend }
}

fn seed() -> Backend {
    Backend {
        employees: vec![
            json!({
                "_id": ADMIN_ID, "name": "Ravi Kumar", "email": ADMIN_EMAIL,
                "role": "admin", "isAdmin": "true", "designation": "HR Lead"
            }),
            json!({
                "id": EMPLOYEE_ID, "name": "Asha Rao", "email": EMPLOYEE_EMAIL,
                "role": "employee", "isAdmin": false, "designation": "Engineer"
            }),
        ],
        assignments: vec![
            json!({
                "id": "a1",
                "title": "Rust basics",
                "description": "Ownership and borrowing",
                "cutoff": "2",
                "totalMarks": "3",
                "isActive": "true",
                "questions": [
                    {"_id": "q1", "type": "MCQ", "text": "Who frees the value?", "options": ["Owner", "Borrower"], "correctAnswer": "Owner", "marks": "2"},
                    {"_id": "q2", "type": "MAQ", "text": "Smart pointers", "options": "[\"Box\",\"Rc\",\"i32\"]", "correctAnswer": ["Box", "Rc"], "marks": 1}
                ]
            }),
            json!({
                "_id": "a2",
                "title": "Security awareness",
                "description": "Phishing basics",
                "cutoff": 1,
                "totalMarks": 1,
                "isActive": true,
                "questions": [
                    {"_id": "q3", "type": "TrueFalse", "text": "Share your password with IT?", "correctAnswer": false, "marks": 1}
                ]
            }),
        ],
        attempts: vec![json!({
            "_id": "t1",
            "assignmentId": "a2",
            "employee": EMPLOYEE_ID,
            "attemptNumber": 1,
            "score": 0,
            "passed": false,
            "completedAt": "2025-01-10T09:00:00Z",
            "answers": [{"questionId": "q3", "answer": "True"}]
        })],
        blogs: vec![
            json!({
                "_id": "b1",
                "title": "Hello portal",
                "slug": "hello-portal",
                "tags": ["[\"x\",\"y\"]"],
                "metaKeywords": "[\"intro\"]",
                "published": "true",
                "author": EMPLOYEE_ID,
                "contentBlocks": [
                    {"type": "paragraph", "content": "<p>Hi<script>alert(1)</script></p>", "order": 2},
                    {"type": "heading", "content": "Welcome", "level": "h2", "order": 1}
                ]
            }),
            json!({
                "_id": "b2",
                "title": "Draft notes",
                "slug": "draft-notes",
                "published": false,
                "author": {"_id": ADMIN_ID, "name": "Ravi Kumar"},
                "contentBlocks": "[]"
            }),
        ],
        ..Backend::default()
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn record_id(value: &Value) -> Option<&str> {
    value.get("_id").or_else(|| value.get("id")).and_then(Value::as_str)
}

/// Records the request, checks the bearer token and applies `fail_next`.
/// Returns the caller's employee id.
fn guard(backend: &Shared, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<String, Response> {
    let mut b = backend.lock().unwrap();
    b.requests.push(format!("{} {}", method, uri.path()));

    let employee = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| b.tokens.get(token).cloned());
    let Some(employee) = employee else {
        return Err(error(StatusCode::UNAUTHORIZED, "Token expired"));
    };

    if *method != Method::GET {
        if let Some((status, body)) = b.fail_next.take() {
            return Err((status, Json(body)).into_response());
        }
    }
    Ok(employee)
}

fn is_admin(backend: &Shared, employee_id: &str) -> bool {
    backend
        .lock()
        .unwrap()
        .employees
        .iter()
        .any(|e| record_id(e) == Some(employee_id) && e["role"] == "admin")
}

async fn login(State(backend): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    let mut b = backend.lock().unwrap();
    let employee = b.employees.iter().find(|e| e["email"] == email.as_str()).cloned();
    match employee {
        Some(employee) if password == PASSWORD => {
            let id = record_id(&employee).unwrap_or_default().to_string();
            let claims = Claims {
                sub: Some(id.clone()),
                role: employee["role"].as_str().map(str::to_string),
                exp: Some(now_secs() + 3600),
                ..Claims::default()
            };
            let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"backend-secret")).unwrap();
            b.tokens.insert(token.clone(), id);
            (StatusCode::OK, Json(json!({ "token": token, "employee": employee }))).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

async fn list_assignments(State(backend): State<Shared>, method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let delay = backend.lock().unwrap().list_delay;
    tokio::time::sleep(delay).await;
    let list = backend.lock().unwrap().assignments.clone();
    Json(Value::Array(list)).into_response()
}

async fn available_assignments(State(backend): State<Shared>, method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    let active: Vec<Value> = b
        .assignments
        .iter()
        .filter(|a| a["isActive"] != false && a["isActive"] != "false")
        .cloned()
        .collect();
    Json(json!({ "assignments": active })).into_response()
}

async fn get_assignment(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    match b.assignments.iter().find(|a| record_id(a) == Some(id.as_str())) {
        Some(a) => Json(a.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Assignment not found"),
    }
}

async fn create_assignment(
    State(backend): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let employee = match guard(&backend, &method, &uri, &headers) {
        Ok(e) => e,
        Err(r) => return r,
    };
    if !is_admin(&backend, &employee) {
        return error(StatusCode::FORBIDDEN, "Admins only");
    }
    let delay = backend.lock().unwrap().save_delay;
    tokio::time::sleep(delay).await;

    body["_id"] = json!(uuid::Uuid::new_v4().simple().to_string());
    backend.lock().unwrap().assignments.push(body.clone());
    (StatusCode::CREATED, Json(json!({ "message": "Assignment created", "assignment": body }))).into_response()
}

async fn update_assignment(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let delay = backend.lock().unwrap().save_delay;
    tokio::time::sleep(delay).await;

    let mut b = backend.lock().unwrap();
    match b.assignments.iter_mut().find(|a| record_id(a) == Some(id.as_str())) {
        Some(stored) => {
            body["_id"] = json!(id);
            *stored = body.clone();
            Json(body).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Assignment not found"),
    }
}

async fn delete_assignment(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let mut b = backend.lock().unwrap();
    let before = b.assignments.len();
    b.assignments.retain(|a| record_id(a) != Some(id.as_str()));
    if b.assignments.len() == before {
        return error(StatusCode::NOT_FOUND, "Assignment not found");
    }
    Json(json!({ "message": "Assignment deleted" })).into_response()
}

fn attempt_summary(attempt: &Value) -> Value {
    json!({
        "attemptNumber": attempt["attemptNumber"],
        "score": attempt["score"],
        "passed": attempt["passed"],
        "completedAt": attempt.get("completedAt").or_else(|| attempt.get("submittedAt")).cloned().unwrap_or(Value::Null),
    })
}

fn attempts_of<'a>(b: &'a Backend, assignment_id: &str, employee_id: &str) -> Vec<&'a Value> {
    b.attempts
        .iter()
        .filter(|t| t["assignmentId"] == assignment_id && t["employee"] == employee_id)
        .collect()
}

async fn my_report(State(backend): State<Shared>, method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    let employee = match guard(&backend, &method, &uri, &headers) {
        Ok(e) => e,
        Err(r) => return r,
    };
    let delay = backend.lock().unwrap().report_delay;
    tokio::time::sleep(delay).await;

    let b = backend.lock().unwrap();
    let report: Vec<Value> = b
        .assignments
        .iter()
        .map(|a| {
            let id = record_id(a).unwrap_or_default();
            json!({
                "assignmentId": id,
                "title": a["title"],
                "description": a["description"],
                "cutoff": a["cutoff"],
                "isActive": a["isActive"],
                "attempts": attempts_of(&b, id, &employee).into_iter().map(attempt_summary).collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(json!({ "report": report })).into_response()
}

async fn assignment_attempts(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    let attempts: Vec<Value> = b
        .attempts
        .iter()
        .filter(|t| t["assignmentId"] == id.as_str())
        .map(|t| {
            let mut t = t.clone();
            let employee = b.employees.iter().find(|e| Some(record_id(e).unwrap_or_default()) == t["employee"].as_str());
            if let Some(e) = employee {
                t["employee"] = json!({"_id": record_id(e), "name": e["name"], "email": e["email"]});
            }
            t
        })
        .collect();
    Json(Value::Array(attempts)).into_response()
}

/// Like `/attempts`, but populated the way the submissions view gets it:
/// an employee that no longer exists comes back with null name and email.
async fn assignment_submissions(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    let submissions: Vec<Value> = b
        .attempts
        .iter()
        .filter(|t| t["assignmentId"] == id.as_str())
        .map(|t| {
            let mut t = t.clone();
            let employee_id = t["employee"].as_str().unwrap_or_default().to_string();
            let employee = b.employees.iter().find(|e| record_id(e) == Some(employee_id.as_str()));
            t["employee"] = match employee {
                Some(e) => json!({"_id": {"$oid": employee_id}, "name": e["name"], "email": e["email"]}),
                None => json!({"_id": {"$oid": employee_id}, "name": null, "email": null}),
            };
            t
        })
        .collect();
    Json(json!({ "submissions": submissions })).into_response()
}

async fn assignment_report(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    let rows: Vec<Value> = b
        .employees
        .iter()
        .map(|e| {
            let employee_id = record_id(e).unwrap_or_default();
            json!({
                "employee": {"_id": employee_id, "name": e["name"], "email": e["email"]},
                "attempts": attempts_of(&b, &id, employee_id).into_iter().map(attempt_summary).collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(rows).into_response()
}

async fn employee_status(
    State(backend): State<Shared>,
    Path(employee_id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    let (completed, remaining): (Vec<Value>, Vec<Value>) = b.assignments.iter().cloned().partition(|a| {
        attempts_of(&b, record_id(a).unwrap_or_default(), &employee_id)
            .iter()
            .any(|t| t["passed"] == true)
    });
    Json(json!({ "completedAssignments": completed, "remainingAssignments": remaining })).into_response()
}

async fn submit_attempt(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let employee = match guard(&backend, &method, &uri, &headers) {
        Ok(e) => e,
        Err(r) => return r,
    };
    let mut b = backend.lock().unwrap();
    let Some(raw) = b.assignments.iter().find(|a| record_id(a) == Some(id.as_str())).cloned() else {
        return error(StatusCode::NOT_FOUND, "Assignment not found");
    };
    let Ok(payload) = serde_json::from_value::<SubmitAttemptRequest>(body.clone()) else {
        return error(StatusCode::BAD_REQUEST, "Malformed answers");
    };
    let assignment = decode_assignment(raw).unwrap();
    let previous = attempts_of(&b, &id, &employee).len() as u32;
    let result = grade_locally(&assignment, &payload, previous);

    b.attempts.push(json!({
        "_id": uuid::Uuid::new_v4().simple().to_string(),
        "assignmentId": id,
        "employee": employee,
        "attemptNumber": result.attempt_number,
        "score": result.score,
        "passed": result.passed,
        "submittedAt": chrono::Utc::now().to_rfc3339(),
        "answers": body["answers"],
    }));
    Json(json!({
        "score": result.score,
        "passed": result.passed,
        "attemptNumber": result.attempt_number,
        "message": if result.passed { "Congratulations, you passed" } else { "Below the cutoff, try again" },
    }))
    .into_response()
}

async fn list_blogs(State(backend): State<Shared>, method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let blogs = backend.lock().unwrap().blogs.clone();
    Json(json!({ "blogs": blogs })).into_response()
}

async fn get_blog(
    State(backend): State<Shared>,
    Path(key): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    match b.blogs.iter().find(|blog| blog["slug"] == key.as_str() || record_id(blog) == Some(key.as_str())) {
        Some(blog) => Json(json!({ "blog": blog })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Blog not found"),
    }
}

async fn create_blog(
    State(backend): State<Shared>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    let employee = match guard(&backend, &method, &uri, &headers) {
        Ok(e) => e,
        Err(r) => return r,
    };
    body["_id"] = json!(uuid::Uuid::new_v4().simple().to_string());
    // Stored unpopulated, like the real backend.
    body["author"] = json!(employee);
    backend.lock().unwrap().blogs.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_blog(
    State(backend): State<Shared>,
    Path(key): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let mut b = backend.lock().unwrap();
    match b.blogs.iter_mut().find(|blog| record_id(blog) == Some(key.as_str())) {
        Some(stored) => {
            body["_id"] = json!(key);
            body["author"] = stored["author"].clone();
            *stored = body.clone();
            Json(json!({ "message": "Blog updated", "blog": body })).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Blog not found"),
    }
}

async fn delete_blog(
    State(backend): State<Shared>,
    Path(key): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let mut b = backend.lock().unwrap();
    let before = b.blogs.len();
    b.blogs.retain(|blog| record_id(blog) != Some(key.as_str()));
    if b.blogs.len() == before {
        return error(StatusCode::NOT_FOUND, "Blog not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_blog(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let mut b = backend.lock().unwrap();
    match b.blogs.iter_mut().find(|blog| record_id(blog) == Some(id.as_str())) {
        Some(blog) => {
            let published = matches!(&blog["published"], Value::Bool(true)) || blog["published"] == "true";
            blog["published"] = json!(!published);
            Json(blog.clone()).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Blog not found"),
    }
}

async fn list_employees(State(backend): State<Shared>, method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let employees = backend.lock().unwrap().employees.clone();
    Json(Value::Array(employees)).into_response()
}

async fn get_employee(
    State(backend): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = guard(&backend, &method, &uri, &headers) {
        return r;
    }
    let b = backend.lock().unwrap();
    match b.employees.iter().find(|e| record_id(e) == Some(id.as_str())) {
        Some(e) => Json(e.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Employee not found"),
    }
}
