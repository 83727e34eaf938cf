//! The JSON boundary over the core: registration and the dashboard.
//!
//! Authentication is a collaborator concern. The routes here expect the
//! authenticated user ID to arrive as a request extension placed by the
//! deployment's auth middleware; requests without one are rejected with
//! 403. Authorization (membership and role checks) happens inside the core
//! operations, not here.

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

use crate::{
    AppState, Error, ErrorKind,
    dashboard::{DashboardSummary, accounts_and_summary},
    endpoints,
    provisioning::{Registration, register_user},
    timezone::today_in,
    user::UserId,
};

/// The identity resolved by the collaborator's auth middleware.
///
/// The core never authenticates; it only authorizes against this
/// already-resolved identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(Error::Forbidden)
    }
}

/// The registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    /// The user's display name.
    pub name: Option<String>,
    /// The user's email address.
    pub email: String,
    /// The user's raw password.
    pub password: String,
}

/// The registration response body. Deliberately excludes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    /// The new user's ID.
    pub id: UserId,
    /// The new user's email address.
    pub email: String,
    /// The new user's display name.
    pub name: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, self.to_string()),
            ErrorKind::Conflict => (StatusCode::CONFLICT, self.to_string()),
            // Reveal nothing about the resource to an unauthorized caller.
            ErrorKind::Authorization => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ErrorKind::Internal => {
                tracing::error!("An unexpected error occurred: {self}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn lock_connection(state: &AppState) -> Result<MutexGuard<'_, Connection>, Error> {
    state.db_connection.lock().map_err(|_| Error::DatabaseLock)
}

/// Handle `POST /api/users`: register a new user and bootstrap their
/// default personal account.
pub async fn create_user_endpoint(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<RegisteredUser>), Error> {
    let registration = Registration {
        name: form.name,
        email: form.email,
        password: form.password,
    };

    let connection = lock_connection(&state)?;
    let provisioned = register_user(
        registration,
        state.min_password_length,
        state.bcrypt_cost,
        &connection,
    )?;

    tracing::info!("registered user {}", provisioned.user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: provisioned.user.id,
            email: provisioned.user.email,
            name: provisioned.user.name,
        }),
    ))
}

/// Handle `GET /api/dashboard`: the caller's accounts and the aggregate
/// totals for the current calendar month.
pub async fn get_dashboard_endpoint(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<DashboardSummary>, Error> {
    let today = today_in(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezone(state.local_timezone.clone()))?;

    let connection = lock_connection(&state)?;
    let dashboard = accounts_and_summary(user_id, today, &connection)?;

    Ok(Json(dashboard))
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::USERS, post(create_user_endpoint))
        .route(endpoints::DASHBOARD, get(get_dashboard_endpoint))
        .with_state(state)
}
