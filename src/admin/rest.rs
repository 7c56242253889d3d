//! REST surface for administrators and the commerce platform.
//!
//! Endpoints:
//! - `GET /health` : health check
//! - `GET /admin` : overview (codes, redeemed codes, settings) as JSON
//! - `POST /admin/email-template` : form field `email_template`
//! - `POST /admin/notification-email` : form field `notification_email`
//! - `POST /admin/notification-threshold` : form field `notification_threshold`
//! - `POST /admin/codes/import` : raw CSV body
//! - `POST /admin/codes/delete-all`
//! - `POST /admin/codes/{id}/delete`
//! - `POST /hooks/order-completed` : JSON `{"order_id": N}`, bearer hook token
//!
//! Admin POSTs redirect back to `/admin` with `303 See Other`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{AdminError, AdminService, Caller, Overview};
use crate::orders::{OrderCompletionHandler, OrderOutcome};
use crate::scheduler::Scheduler;
use crate::settings::parse_threshold_input;

/// Where admin actions redirect on completion.
pub const MANAGEMENT_PAGE: &str = "/admin";

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub admin: AdminService,
    pub orders: Arc<dyn OrderCompletionHandler>,
    pub scheduler: Arc<dyn Scheduler>,
    /// Bearer token granting administrative privilege. `None` denies everyone.
    pub admin_token: Option<String>,
    /// Bearer token the commerce platform presents on the order hook.
    /// `None` rejects every hook call.
    pub hook_token: Option<String>,
}

impl AppState {
    fn caller(&self, headers: &HeaderMap) -> Caller {
        if presents_token(headers, self.admin_token.as_deref()) {
            Caller::administrator()
        } else {
            Caller::anonymous()
        }
    }
}

fn presents_token(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match (expected, presented) {
        (Some(expected), Some(presented)) => token_matches(expected, presented),
        _ => false,
    }
}

/// Compare secrets without short-circuiting on the first differing byte.
fn token_matches(expected: &str, presented: &str) -> bool {
    let (expected, presented) = (expected.as_bytes(), presented.as_bytes());
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .iter()
        .zip(presented)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Start the REST server.
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "REST API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin", get(overview))
        .route("/admin/email-template", post(save_email_template))
        .route("/admin/notification-email", post(save_notification_email))
        .route("/admin/notification-threshold", post(save_notification_threshold))
        .route("/admin/codes/import", post(import_codes))
        .route("/admin/codes/delete-all", post(delete_all_codes))
        .route("/admin/codes/{id}/delete", post(delete_code))
        .route("/hooks/order-completed", post(order_completed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            AdminError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "Non hai il permesso di accedere a questa pagina.",
            )
                .into_response(),
            AdminError::UploadFailed(e) => {
                info!(error = %e, "rejected upload");
                (
                    StatusCode::BAD_REQUEST,
                    "Errore durante il caricamento del file.",
                )
                    .into_response()
            }
            AdminError::Storage(e) => {
                error!(error = %e, "admin action failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Overview>, AdminError> {
    state.scheduler.ensure_scheduled().await;
    let overview = state.admin.overview(&state.caller(&headers)).await?;
    Ok(Json(overview))
}

#[derive(Deserialize)]
struct EmailTemplateForm {
    email_template: String,
}

async fn save_email_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<EmailTemplateForm>,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .save_email_template(&state.caller(&headers), &form.email_template)
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

#[derive(Deserialize)]
struct NotificationEmailForm {
    notification_email: String,
}

async fn save_notification_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NotificationEmailForm>,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .save_notification_email(&state.caller(&headers), &form.notification_email)
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

/// Taken as text so non-numeric input is cast, not rejected.
#[derive(Deserialize)]
struct NotificationThresholdForm {
    notification_threshold: String,
}

async fn save_notification_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NotificationThresholdForm>,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .save_notification_threshold(
            &state.caller(&headers),
            parse_threshold_input(&form.notification_threshold),
        )
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

async fn import_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .import_csv(&state.caller(&headers), &body)
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

async fn delete_all_codes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .delete_all_codes(&state.caller(&headers))
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

async fn delete_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Redirect, AdminError> {
    state
        .admin
        .delete_code(&state.caller(&headers), id)
        .await?;
    Ok(Redirect::to(MANAGEMENT_PAGE))
}

#[derive(Deserialize)]
struct OrderCompleted {
    order_id: u64,
}

async fn order_completed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<OrderCompleted>,
) -> Result<Json<OrderOutcome>, StatusCode> {
    if !presents_token(&headers, state.hook_token.as_deref()) {
        warn!(order_id = event.order_id, "order hook rejected: bad or missing token");
        return Err(StatusCode::FORBIDDEN);
    }

    state.scheduler.ensure_scheduled().await;
    let outcome = state
        .orders
        .on_order_completed(event.order_id)
        .await
        .map_err(|e| {
            error!(order_id = event.order_id, error = %e, "failed to read completed order");
            StatusCode::BAD_GATEWAY
        })?;
    Ok(Json(outcome))
}
