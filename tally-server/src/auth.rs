use crate::{entity::user, json_err, AppState};
use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

mod session;
pub use session::{AuthSession, Keys};

pub const ADMIN_USERNAME: &str = "admin";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> (StatusCode, Response) {
    let user = match check_credentials(&state.db, &payload.username, &payload.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            log::info!("failed login for `{}`", payload.username);
            return (
                StatusCode::UNAUTHORIZED,
                json_err!("invalid username or password"),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to look up user: {e}"),
            );
        }
    };
    match state.keys.issue(user.id, &user.username) {
        Ok(token) => (
            StatusCode::OK,
            Json(json!({"token": token})).into_response(),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to encode token: {e}"),
        ),
    }
}

pub async fn get_me(Extension(session): Extension<AuthSession>) -> Json<serde_json::Value> {
    Json(json!({
        "id": session.sub,
        "username": session.username,
    }))
}

/// Rejects requests without a valid `Authorization: Bearer` token and makes
/// the session available to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = bearer_token(req.headers()).map(|token| state.keys.verify(token));
    match session {
        Some(Ok(session)) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Some(Err(e)) => {
            log::debug!("rejected token: {e}");
            (StatusCode::UNAUTHORIZED, json_err!("invalid session")).into_response()
        }
        None => (StatusCode::UNAUTHORIZED, json_err!("not logged in")).into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub async fn check_credentials(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?;
    Ok(user.filter(|u| verify_password(password, &u.password_hash)))
}

/// Create the `admin` user when no user exists yet. Returns whether one was created.
pub async fn ensure_admin(db: &DatabaseConnection, password: &str) -> Result<bool> {
    if user::Entity::find().one(db).await?.is_some() {
        return Ok(false);
    }
    user::ActiveModel {
        username: Set(ADMIN_USERNAME.to_string()),
        password_hash: Set(hash_password(password)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(true)
}

/// Salted SHA-256, stored as `salt$digest`.
pub fn hash_password(password: &str) -> String {
    let salt = hex::encode(rand::random::<[u8; 16]>());
    let digest = digest(&salt, password);
    format!("{salt}${digest}")
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, hash)| digest(salt, password) == hash)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
