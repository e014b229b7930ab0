//! Registration, activation and login endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::user::{AuthenticationRequest, AuthenticationResponse, RegistrationRequest},
    AppState,
};

/// Activation link query
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ActivationQuery {
    /// Activation code received by e-mail
    pub token: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegistrationRequest,
    responses(
        (status = 202, description = "Account created, activation code sent"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> AppResult<StatusCode> {
    state.services.auth.register(request).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Log in and receive a JWT
#[utoipa::path(
    post,
    path = "/auth/authenticate",
    tag = "auth",
    request_body = AuthenticationRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthenticationResponse),
        (status = 401, description = "Bad credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Account locked or disabled", body = crate::error::ErrorResponse)
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<AuthenticationRequest>,
) -> AppResult<Json<AuthenticationResponse>> {
    let response = state.services.auth.authenticate(request).await?;
    Ok(Json(response))
}

/// Activate an account with its e-mailed code
#[utoipa::path(
    get,
    path = "/auth/activate-account",
    tag = "auth",
    params(ActivationQuery),
    responses(
        (status = 200, description = "Account activated"),
        (status = 400, description = "Invalid or expired token", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate_account(
    State(state): State<AppState>,
    Query(query): Query<ActivationQuery>,
) -> AppResult<StatusCode> {
    state.services.auth.activate_account(query.token.trim()).await?;
    Ok(StatusCode::OK)
}
