// Copyright 2025 Folia Interiors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP API handlers for the booking gateway.
//!
//! This module implements the REST endpoints of the service:
//!
//! - `GET /healthz` - Service health check
//! - `GET /metrics` - Prometheus metrics export
//! - `POST /auth/login` - Admin credential check
//! - `POST /tasks` - Create and score a task
//! - `GET /tasks/{id}` - Fetch a task
//! - `PATCH /tasks/{id}` - Update, re-score, and record completions
//! - `GET /tasks/{id}/insights` - Completion insights for a task
//!
//! Every handler passes through admission control before touching business
//! logic; admitted responses carry the `X-RateLimit-*` headers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::admission::AdmissionController;
use crate::auth::Verifier;
use crate::clock::Clock;
use crate::error::AppError;
use crate::limiter::{Decision, LimiterClass};
use crate::metrics::Metrics;
use crate::model::{
    CreateTaskRequest, InsightListResponse, InsightType, LoginRequest, LoginResponse, TaskInsight,
    TaskRecord, TaskStatus, UpdateTaskRequest,
};
use crate::repository::{RepoError, Repository};
use crate::scoring::{self, TaskScoreInput};

#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub repository: Repository,
    pub verifier: Arc<dyn Verifier>,
    pub metrics: Metrics,
    pub clock: Arc<dyn Clock>,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/auth/login", post(login))
        .route("/tasks", post(create_task))
        .route("/tasks/:id", get(get_task).patch(update_task))
        .route("/tasks/:id/insights", get(get_insights))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
pub async fn health() -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "bookgate",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<String, AppError> {
    state.metrics.export()
}

/// Check admin credentials
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let endpoint = "/auth/login";
    let client = RequestClient::from_parts(&headers, &addr);
    let decision = admit(&state, &client, endpoint, LimiterClass::Login)?;

    let success = state
        .verifier
        .verify(&request.username, &request.password);

    state.admission.record_auth_outcome(
        success,
        &client.ip,
        &request.username,
        endpoint,
        (!success).then_some("invalid_credentials"),
        client.user_agent.as_deref(),
    );
    state.metrics.record_auth_outcome(success);

    if !success {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    Ok((
        rate_headers(&decision),
        Json(LoginResponse {
            authenticated: true,
        }),
    ))
}

/// Create a task, score it, and persist it
pub async fn create_task(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<CreateTaskRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let endpoint = "/tasks";
    let client = RequestClient::from_parts(&headers, &addr);
    let decision = admit(&state, &client, endpoint, LimiterClass::Admin)?;

    if request.title.trim().is_empty() {
        state.admission.record_validation_failure(
            &client.ip,
            endpoint,
            "title",
            &request.title,
            client.user_agent.as_deref(),
        );
        state.metrics.record_validation_failure();
        return Err(AppError::bad_request("title is required"));
    }

    if let Some(complexity) = request.complexity_score {
        if complexity > 5 {
            state.admission.record_validation_failure(
                &client.ip,
                endpoint,
                "complexity_score",
                &complexity.to_string(),
                client.user_agent.as_deref(),
            );
            state.metrics.record_validation_failure();
            return Err(AppError::bad_request(
                "complexity_score must be between 0 and 5",
            ));
        }
    }

    let now = state.clock.now();
    let category = request.parsed_category();

    let priority_score = scoring::score_priority(
        &TaskScoreInput {
            due_date: request.due_date,
            priority_level: request.priority_level,
            category,
            complexity_score: request.complexity_score,
        },
        now,
    );
    state.metrics.record_task_scored();

    let task = TaskRecord {
        id: Uuid::new_v4(),
        title: request.title,
        description: request.description,
        status: TaskStatus::Pending,
        due_date: request.due_date,
        priority_level: request.priority_level,
        category,
        complexity_score: scoring::assign_complexity(category),
        priority_score,
        suggestions: scoring::generate_suggestions(category),
        created_at: now,
        updated_at: now,
    };

    let created = state.repository.insert(task).await.map_err(map_repo)?;

    Ok((StatusCode::CREATED, rate_headers(&decision), Json(created)))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let endpoint = format!("/tasks/{id}");
    let client = RequestClient::from_parts(&headers, &addr);
    let decision = admit(&state, &client, &endpoint, LimiterClass::General)?;

    let task = state
        .repository
        .find(id)
        .await
        .map_err(map_repo)?
        .ok_or_else(|| AppError::not_found("task not found"))?;

    Ok((rate_headers(&decision), Json(task)))
}

/// Update a task, re-score it, and record a completion insight when the
/// status transitions into `completed` from anything else
pub async fn update_task(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let endpoint = format!("/tasks/{id}");
    let client = RequestClient::from_parts(&headers, &addr);
    let decision = admit(&state, &client, &endpoint, LimiterClass::Admin)?;

    if let Some(title) = &request.title {
        if title.trim().is_empty() {
            state.admission.record_validation_failure(
                &client.ip,
                &endpoint,
                "title",
                title,
                client.user_agent.as_deref(),
            );
            state.metrics.record_validation_failure();
            return Err(AppError::bad_request("title must not be empty"));
        }
    }

    if let Some(complexity) = request.complexity_score {
        if complexity > 5 {
            state.admission.record_validation_failure(
                &client.ip,
                &endpoint,
                "complexity_score",
                &complexity.to_string(),
                client.user_agent.as_deref(),
            );
            state.metrics.record_validation_failure();
            return Err(AppError::bad_request(
                "complexity_score must be between 0 and 5",
            ));
        }
    }

    let mut task = state
        .repository
        .find(id)
        .await
        .map_err(map_repo)?
        .ok_or_else(|| AppError::not_found("task not found"))?;

    let now = state.clock.now();
    let previous_status = task.status;

    if let Some(title) = request.title.clone() {
        task.title = title;
    }
    if request.description.is_some() {
        task.description = request.description.clone();
    }
    if request.due_date.is_some() {
        task.due_date = request.due_date;
    }
    if let Some(level) = request.priority_level {
        task.priority_level = level;
    }
    if request.category.is_some() {
        task.category = request.parsed_category();
    }
    if let Some(status) = request.status {
        task.status = status;
    }

    task.priority_score = scoring::score_priority(
        &TaskScoreInput {
            due_date: task.due_date,
            priority_level: task.priority_level,
            category: task.category,
            complexity_score: request.complexity_score,
        },
        now,
    );
    task.complexity_score = scoring::assign_complexity(task.category);
    task.suggestions = scoring::generate_suggestions(task.category);
    task.updated_at = now;
    state.metrics.record_task_scored();

    let updated = state.repository.update(task).await.map_err(map_repo)?;

    if updated.status == TaskStatus::Completed && previous_status != TaskStatus::Completed {
        let insight = TaskInsight {
            id: Uuid::new_v4(),
            task_id: updated.id,
            insight_type: InsightType::StatusChange,
            previous_status,
            new_status: TaskStatus::Completed,
            changed_at: now,
            completion_time_seconds: (now - updated.created_at).num_seconds(),
        };
        state
            .repository
            .insert_insight(insight)
            .await
            .map_err(map_repo)?;
    }

    Ok((rate_headers(&decision), Json(updated)))
}

/// List completion insights for one task
pub async fn get_insights(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let endpoint = format!("/tasks/{id}/insights");
    let client = RequestClient::from_parts(&headers, &addr);
    let decision = admit(&state, &client, &endpoint, LimiterClass::General)?;

    if state.repository.find(id).await.map_err(map_repo)?.is_none() {
        return Err(AppError::not_found("task not found"));
    }

    let insights = state.repository.insights_for(id).await.map_err(map_repo)?;

    Ok((
        rate_headers(&decision),
        Json(InsightListResponse {
            task_id: id,
            insights,
        }),
    ))
}

/// Client identity as seen by the limiter: forwarded ip when a proxy set
/// one, the socket peer otherwise.
struct RequestClient {
    ip: String,
    user_agent: Option<String>,
}

impl RequestClient {
    fn from_parts(headers: &HeaderMap, addr: &SocketAddr) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| addr.ip().to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Self { ip, user_agent }
    }
}

/// Run admission control and convert a rejection into the 429 error.
fn admit(
    state: &AppState,
    client: &RequestClient,
    endpoint: &str,
    class: LimiterClass,
) -> Result<Decision, AppError> {
    let decision = state.admission.check_limit(
        &client.ip,
        endpoint,
        client.user_agent.as_deref(),
        class,
    );
    state.metrics.record_admission(decision.allowed);

    if !decision.allowed {
        let now = state.clock.now();
        return Err(AppError::RateLimited {
            limit: decision.limit,
            reset_unix: decision.reset_unix(),
            retry_after_secs: decision.retry_after_secs(now),
        });
    }

    Ok(decision)
}

fn rate_headers(decision: &Decision) -> [(HeaderName, String); 3] {
    [
        (
            HeaderName::from_static("x-ratelimit-limit"),
            decision.limit.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            decision.remaining.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            decision.reset_unix().to_string(),
        ),
    ]
}

fn map_repo(err: RepoError) -> AppError {
    match err {
        RepoError::NotFound => AppError::not_found("task not found"),
        RepoError::Conflict(message) => AppError::bad_request(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticVerifier;
    use crate::clock::ManualClock;
    use crate::limiter::LimiterConfig;
    use crate::repository::MemoryRepository;
    use crate::security::testing::CapturingSink;
    use crate::security::SecurityLogger;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sink = Arc::new(CapturingSink::default());
        let admission = Arc::new(
            AdmissionController::new(
                LimiterConfig::default(),
                SecurityLogger::new(sink),
                clock.clone(),
            )
            .expect("default config is valid"),
        );

        let state = AppState {
            admission,
            repository: Repository::new(MemoryRepository::new()),
            verifier: Arc::new(StaticVerifier::new("admin", "hunter2")),
            metrics: Metrics::new().expect("fresh registry"),
            clock: clock.clone(),
        };

        (router(state), clock)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));

        match body {
            Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/healthz", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn sixth_login_attempt_in_window_is_rejected() {
        let (app, _) = app();
        let credentials = json!({ "username": "admin", "password": "wrong" });

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(request("POST", "/auth/login", Some(credentials.clone())))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .oneshot(request("POST", "/auth/login", Some(credentials)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let headers = response.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "5");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
        assert!(headers.contains_key("retry-after"));
        assert!(headers.contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn login_window_reopens_after_it_elapses() {
        let (app, clock) = app();
        let credentials = json!({ "username": "admin", "password": "hunter2" });

        for _ in 0..5 {
            app.clone()
                .oneshot(request("POST", "/auth/login", Some(credentials.clone())))
                .await
                .unwrap();
        }
        let response = app
            .clone()
            .oneshot(request("POST", "/auth/login", Some(credentials.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        clock.advance(Duration::seconds(61));
        let response = app
            .oneshot(request("POST", "/auth/login", Some(credentials)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
    }

    #[tokio::test]
    async fn create_task_scores_and_suggests() {
        let (app, _) = app();
        let payload = json!({
            "title": "Fit frosted film in the Aoyama office",
            "priority_level": "urgent",
            "category": "installations",
            "due_date": Utc::now().to_rfc3339(),
        });

        let response = app
            .oneshot(request("POST", "/tasks", Some(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("x-ratelimit-limit").unwrap(),
            "100"
        );

        let body = body_json(response).await;
        // 50 + 25 (due today) + 25 (urgent) + 12 (installations) = 112, clamped.
        assert_eq!(body["priority_score"], 100);
        assert_eq!(body["complexity_score"], 4);
        assert_eq!(body["status"], "pending");
        assert_eq!(
            body["suggestions"]["recommended_time_of_day"],
            "morning"
        );
        assert!(!body["suggestions"]["preparation_items"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn create_task_rejects_blank_title() {
        let (app, _) = app();
        let response = app
            .oneshot(request("POST", "/tasks", Some(json!({ "title": "   " }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_task_is_404() {
        let (app, _) = app();
        let response = app
            .oneshot(request(
                "GET",
                &format!("/tasks/{}", Uuid::new_v4()),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn completing_a_task_records_an_insight() {
        let (app, clock) = app();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/tasks",
                Some(json!({ "title": "Send quote for lobby wrap", "category": "quotes" })),
            ))
            .await
            .unwrap();
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        clock.advance(Duration::seconds(3600));

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/tasks/{id}"),
                Some(json!({ "status": "completed" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["status"], "completed");

        let response = app
            .oneshot(request("GET", &format!("/tasks/{id}/insights"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let insights = body["insights"].as_array().unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0]["insight_type"], "status_change");
        assert_eq!(insights[0]["previous_status"], "pending");
        assert_eq!(insights[0]["new_status"], "completed");
        assert_eq!(insights[0]["completion_time_seconds"], 3600);
    }

    #[tokio::test]
    async fn completing_an_already_completed_task_adds_nothing() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/tasks",
                Some(json!({ "title": "Archive old invoices" })),
            ))
            .await
            .unwrap();
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        for _ in 0..2 {
            app.clone()
                .oneshot(request(
                    "PATCH",
                    &format!("/tasks/{id}"),
                    Some(json!({ "status": "completed" })),
                ))
                .await
                .unwrap();
        }

        let response = app
            .oneshot(request("GET", &format!("/tasks/{id}/insights"), None))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["insights"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admitted_responses_carry_remaining_header() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/tasks",
                Some(json!({ "title": "Order matte film rolls" })),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("x-ratelimit-remaining").unwrap(),
            "99"
        );

        let response = app
            .oneshot(request(
                "POST",
                "/tasks",
                Some(json!({ "title": "Order gloss film rolls" })),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("x-ratelimit-remaining").unwrap(),
            "98"
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_exports_counters() {
        let (app, _) = app();

        app.clone()
            .oneshot(request(
                "POST",
                "/tasks",
                Some(json!({ "title": "Book site survey" })),
            ))
            .await
            .unwrap();

        let response = app.oneshot(request("GET", "/metrics", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("bookgate_tasks_scored_total 1"));
    }
}
