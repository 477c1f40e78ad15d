//! Tally - Live Counter Server
//!
//! This server provides:
//! 1. Recording of attendance, offerings, members, funds and budgets (SQLite)
//! 2. Push events for the dashboard over WebSocket and HTTP long-polling
//! 3. Static file serving for the web frontend

use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use clap::Parser;
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

mod attendance;
mod auth;
mod budget;
mod dashboard;
mod db;
mod entity;
mod funds;
mod live;
mod members;
mod offering;
mod utils;

// ── CLI Arguments ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Clone)]
#[command(name = "tally-server", about = "Tally Live Counter Server")]
pub struct Args {
    /// Debug mode
    #[arg(long)]
    pub debug: bool,

    /// Port to listen on
    #[arg(long, default_value_t = 3080)]
    pub port: u16,

    /// Database connection URL
    #[arg(long, env = "TALLY_DATABASE_URL", default_value = "sqlite://tally.db?mode=rwc")]
    pub database_url: String,

    /// Directory of the built web frontend
    #[arg(long, default_value = "web/dist")]
    pub static_dir: PathBuf,

    /// Secret for signing session tokens; random per process when unset
    #[arg(long, env = "TALLY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Password of the `admin` user created on first start
    #[arg(long, default_value = "password")]
    pub admin_password: String,

    /// Longest time a long-poll request is held open
    #[arg(long, default_value_t = 25)]
    pub poll_window_secs: u64,

    /// Number of recent events kept for long-poll clients
    #[arg(long, default_value_t = 256)]
    pub event_backlog: usize,
}

impl Args {
    pub fn poll_window(&self) -> Duration {
        Duration::from_secs(self.poll_window_secs)
    }
}

// ── Application State ──────────────────────────────────────────────────────────

pub struct AppStateInner {
    /// CLI arguments
    pub args: Args,

    /// Database pool
    pub db: DatabaseConnection,

    /// Push event fan-out
    pub hub: live::EventHub,

    /// Session token keys
    pub keys: auth::Keys,
}

pub struct AppState(Arc<AppStateInner>);

impl AppState {
    pub async fn new(args: Args) -> anyhow::Result<Self> {
        let db = db::connect(&args.database_url).await?;
        if auth::ensure_admin(&db, &args.admin_password).await? {
            log::warn!("created default `admin` user, change its password");
        }
        let keys = match &args.jwt_secret {
            Some(secret) => auth::Keys::new(secret.as_bytes()),
            None => {
                log::info!("no JWT secret configured, sessions end on restart");
                auth::Keys::random()
            }
        };
        let hub = live::EventHub::new(args.event_backlog);

        Ok(Self::from_parts(args, db, hub, keys))
    }

    pub fn from_parts(
        args: Args,
        db: DatabaseConnection,
        hub: live::EventHub,
        keys: auth::Keys,
    ) -> Self {
        Self(Arc::new(AppStateInner {
            args,
            db,
            hub,
            keys,
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

// ── Macros ─────────────────────────────────────────────────────────────────────

#[macro_export]
macro_rules! json_err {
    ($($arg: tt)*) => {
        {
            use serde_json::json;
            use axum::{Json, response::IntoResponse};
            let msg = format!($($arg)*);
            Json(json!({"error": msg})).into_response()
        }
    };
}
#[macro_export]
macro_rules! json_msg {
    ($($arg: tt)*) => {
        {
            use serde_json::json;
            use axum::{Json, response::IntoResponse};
            let msg = format!($($arg)*);
            Json(json!({"message": msg})).into_response()
        }
    };
}

// ── Router ─────────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/health", get(live::health))
        .route("/auth/login", post(auth::login))
        .route("/ws/live", get(live::live_ws))
        .route("/events/poll", get(live::poll));
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::get_me))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/attendance", post(attendance::post_attendance))
        .route("/offerings", post(offering::post_offering))
        .route(
            "/members",
            get(members::list_members).post(members::register_member),
        )
        .route("/funds", get(funds::list_funds).post(funds::create_fund))
        .route(
            "/contributions",
            get(funds::list_contributions).post(funds::record_contribution),
        )
        .route("/budget", get(budget::get_budget).post(budget::set_budget))
        .route("/reports/monthly", get(budget::monthly_report))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let static_dir = state.args.static_dir.clone();
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(cors)
}

// ── Main ───────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("Tally server starting...");
    log::info!("Database: {}", args.database_url);
    log::info!("Static Dir: {:?}", args.static_dir);

    let port = args.port;
    let state = AppState::new(args).await?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Request, StatusCode,
        },
    };
    use serde_json::{json, Value};
    use tally_common::{PushEvent, UpdateEvent};
    use tower::ServiceExt;

    async fn state() -> AppState {
        let args = Args::parse_from(["tally-server"]);
        let db = db::memory().await;
        auth::ensure_admin(&db, "password").await.unwrap();
        AppState::from_parts(
            args,
            db,
            live::EventHub::new(8),
            auth::Keys::new(b"test-secret"),
        )
    }

    fn admin_token(state: &AppState) -> String {
        state.keys.issue(1, auth::ADMIN_USERNAME).unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let state = state().await;
        let app = router(state.clone());

        let (status, _) = send(&app, Method::GET, "/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::GET, "/dashboard", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body = json!({"service_type": "Sunday", "adults_men": 3});
        let (status, _) = send(&app, Method::POST, "/attendance", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(state.hub.since(0).await.events.is_empty());

        let token = admin_token(&state);
        let (status, summary) = send(&app, Method::GET, "/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["services"]["Sunday"]["attendance"], 0);

        let (status, health) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_login() {
        let state = state().await;
        let app = router(state.clone());

        let good = json!({"username": "admin", "password": "password"});
        let (status, body) = send(&app, Method::POST, "/auth/login", None, Some(good)).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "admin");

        let bad = json!({"username": "admin", "password": "guess"});
        let (status, _) = send(&app, Method::POST, "/auth/login", None, Some(bad)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_attendance_publishes_day_and_month() {
        let state = state().await;
        let app = router(state.clone());
        let token = admin_token(&state);

        let body = json!({"service_type": "Sunday", "adults_men": 3, "visitors_female": 2});
        let (status, resp) = send(&app, Method::POST, "/attendance", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["total"], 5);

        let batch = state.hub.since(0).await;
        assert_eq!(batch.cursor, 2);
        assert_eq!(
            batch.events,
            vec![
                PushEvent::AttendanceUpdate(UpdateEvent::new("Sunday", 5.0)),
                PushEvent::MonthlyAttUpdate(UpdateEvent::new("Sunday", 5.0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_offering_publishes_rounded_totals() {
        let state = state().await;
        let app = router(state.clone());
        let token = admin_token(&state);

        for amount in [0.1, 0.2] {
            let body = json!({"service_type": "Monday", "amount": amount});
            let (status, _) = send(&app, Method::POST, "/offerings", Some(&token), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let events = state.hub.since(2).await.events;
        assert_eq!(
            events,
            vec![
                PushEvent::OfferingUpdate(UpdateEvent::new("Monday", 0.3)),
                PushEvent::MonthlyOffUpdate(UpdateEvent::new("Monday", 0.3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected() {
        let state = state().await;
        let app = router(state.clone());
        let token = admin_token(&state);

        let body = json!({"service_type": "Friday", "adults_men": 1});
        let (status, resp) = send(&app, Method::POST, "/attendance", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["error"].as_str().unwrap().contains("Friday"));

        let body = json!({"service_type": "sunday", "amount": 4.0});
        let (status, _) = send(&app, Method::POST, "/offerings", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({"service_type": "Sunday", "adults_men": -1});
        let (status, _) = send(&app, Method::POST, "/attendance", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(state.hub.since(0).await.events.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_fund_conflicts() {
        let state = state().await;
        let app = router(state.clone());
        let token = admin_token(&state);

        let body = json!({"name": "Roof"});
        let (status, fund) = send(&app, Method::POST, "/funds", Some(&token), Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fund["name"], "Roof");
        let (status, _) = send(&app, Method::POST, "/funds", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let events = state.hub.since(0).await.events;
        assert_eq!(
            events,
            vec![PushEvent::FundUpdate {
                action: "created".to_string(),
                name: "Roof".to_string(),
            }]
        );

        let missing = json!({"fund_id": 99, "service_type": "Sunday", "amount": 1.0});
        let (status, _) = send(&app, Method::POST, "/contributions", Some(&token), Some(missing)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
