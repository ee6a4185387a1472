use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, LoginResponse, PublicUser, RegisterRequest,
            VerifyOtpRequest,
        },
        error::AuthError,
        extractors::AuthUser,
        jwt::JwtKeys,
        otp,
        repo::is_unique_violation,
        repo_types::NewUser,
    },
    mailer,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify-otp", post(verify_otp))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_user_info))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    if payload.full_name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(AuthError::Validation("All fields are required".into()));
    }
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::Conflict);
    }

    let code = otp::generate();
    let new_user = NewUser {
        full_name: payload.full_name,
        email: payload.email,
        password: payload.password,
        profile_image_url: payload.profile_image_url,
        otp: code.clone(),
        otp_expiry: otp::expiry_from_now(),
    };

    let user = match state.users.create(new_user).await {
        Ok(u) => u,
        // The pre-check can lose to a concurrent insert; the unique index
        // is authoritative.
        Err(e) if is_unique_violation(&e) => {
            warn!("email registered concurrently");
            return Err(AuthError::Conflict);
        }
        Err(e) => return Err(AuthError::Internal(e)),
    };

    // Best-effort: a failed send is logged and never fails registration.
    let body = mailer::welcome_body(&user.full_name, &code);
    if let Err(e) = state
        .mailer
        .send(&user.email, mailer::WELCOME_SUBJECT, &body)
        .await
    {
        warn!(error = %e, email = %user.email, "welcome email send failed");
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registered. Please verify your email using OTP sent to your inbox.".into(),
            user: user.into(),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AuthError::Validation("All fields are required".into()));
    }
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password collapse into one response on
    // purpose.
    let user = match state.users.find_by_email(&payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !user.verify_password(&payload.password)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let id = user.id;
    Ok(Json(LoginResponse {
        id,
        user: user.into(),
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_user_info(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or(AuthError::OtpUserNotFound)?;

    // Equality first: an expired-but-wrong code still reads as invalid.
    if user.otp.as_deref() != Some(payload.otp.as_str()) {
        warn!(email = %user.email, "otp mismatch");
        return Err(AuthError::InvalidOtp);
    }
    match user.otp_expiry {
        Some(expiry) if !otp::is_expired(expiry) => {}
        _ => {
            warn!(email = %user.email, "otp expired");
            return Err(AuthError::ExpiredOtp);
        }
    }

    let user = state.users.mark_email_verified(user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(AuthResponse {
        message: "Email verified successfully".into(),
        user: user.into(),
        token,
    }))
}
