use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{password, TOKEN_COOKIE},
    error::{AppError, AppResult},
    models::{NewUser, User},
    schema::users::dsl,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_ROLE: &str = "staff";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A user as returned to clients, never carrying the password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user: UserResponse,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub status: &'static str,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<SessionResponse>)> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request(
            "All fields are required and cannot be empty",
        ));
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(AppError::bad_request("Invalid email format"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        password_hash,
        role: DEFAULT_ROLE.to_string(),
    };

    let mut conn = state.db()?;
    let user: User = diesel::insert_into(dsl::users)
        .values(&new_user)
        .get_result(&mut conn)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::conflict("Email already registered")
            }
            other => AppError::from(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, "registered staff user");

    let (headers, session) = open_session(&state, user, "Registration successful")?;
    Ok((StatusCode::CREATED, headers, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<SessionResponse>)> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let mut conn = state.db()?;
    let user: User = dsl::users
        .filter(dsl::email.eq(&email))
        .first(&mut conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| invalid_credentials())?;
    if !valid {
        return Err(invalid_credentials());
    }

    let (headers, session) = open_session(&state, user, "Login successful")?;
    Ok((headers, Json(session)))
}

pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<MessageResponse>) {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_token_cookie(&state));
    (
        headers,
        Json(MessageResponse {
            status: "success",
            message: "Logout successful",
        }),
    )
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserEnvelope>> {
    let user_id =
        Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid user ID format"))?;

    let mut conn = state.db()?;
    let user: User = dsl::users
        .find(user_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(Json(UserEnvelope {
        status: "success",
        user: user.into(),
    }))
}

fn invalid_credentials() -> AppError {
    AppError::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
}

fn open_session(
    state: &AppState,
    user: User,
    message: &'static str,
) -> AppResult<(HeaderMap, SessionResponse)> {
    let token = state
        .jwt
        .generate_token(user.id, &user.email, &user.role)
        .map_err(AppError::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_token_cookie(state, &token)?);

    Ok((
        headers,
        SessionResponse {
            status: "success",
            message,
            user: user.into(),
            token,
            token_type: "Bearer",
            expires_in: state.jwt.expiry().num_seconds(),
        },
    ))
}

fn build_token_cookie(state: &AppState, token: &str) -> AppResult<HeaderValue> {
    let mut parts = vec![format!("{}={}", TOKEN_COOKIE, token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={}", state.jwt.expiry().num_seconds()));
    if state.config.auth_cookie_secure {
        parts.push("Secure".into());
    }

    HeaderValue::from_str(&parts.join("; ")).map_err(AppError::internal)
}

fn build_clear_token_cookie(state: &AppState) -> HeaderValue {
    if state.config.auth_cookie_secure {
        HeaderValue::from_static(
            "token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure",
        )
    } else {
        HeaderValue::from_static(
            "token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        )
    }
}
