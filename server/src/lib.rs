//! # Gavel Server
//!
//! Committee-meeting voting platform, API half.
//!
//! Browser clients talk plain JSON to this server and poll for updates; all
//! state lives in MongoDB. Committees collect members, meetings collect
//! participants and motions, and the chair runs each motion through
//! simplified Robert's-Rules procedure: propose, discuss, vote, close.
//!
//!
//!
//! # General Infrastructure
//! - One axum process, one shared Mongo client, no in-process state beyond
//!   the connection pool
//! - Every mutation is a single-document update, so the store's own
//!   atomicity is the concurrency story
//! - Closing a vote is a conditional update; double-close loses cleanly
//!
//!
//!
//! # Routes
//!
//! Identity: `POST /auth/register`, `POST /auth/login`, `GET|PATCH /user/me`.
//!
//! Committees: `POST|GET /committees`, `GET|DELETE /committees/{id}`,
//! `POST /committees/{id}/members`,
//! `PATCH|DELETE /committees/{id}/members/{uid}`.
//!
//! Meetings: `POST|GET /meetings`, `GET|PATCH /meetings/{id}`,
//! `GET /meetings/code/{code}`, `POST /meetings/{id}/join|leave|discuss`.
//!
//! Motions: `POST /motions`, `GET|PATCH /motions/{id}` (GET takes a meeting
//! id), `POST /motions/{id}/vote|discuss`.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run locally (needs a reachable MongoDB and a `JWT_SECRET`).
//! ```sh
//! RUST_LOG=info JWT_SECRET=dev-secret cargo run -p server
//! ```

use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, patch, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod accounts;
pub mod auth;
pub mod committees;
pub mod config;
pub mod database;
pub mod error;
pub mod meetings;
pub mod motions;
pub mod state;
pub mod utils;
pub mod views;

use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/auth/register", post(accounts::register_handler))
        .route("/auth/login", post(accounts::login_handler))
        .route(
            "/user/me",
            get(accounts::me_handler).patch(accounts::update_me_handler),
        )
        .route(
            "/committees",
            post(committees::create_committee_handler).get(committees::list_committees_handler),
        )
        .route(
            "/committees/{id}",
            get(committees::get_committee_handler).delete(committees::delete_committee_handler),
        )
        .route("/committees/{id}/members", post(committees::add_member_handler))
        .route(
            "/committees/{id}/members/{uid}",
            patch(committees::update_member_role_handler).delete(committees::remove_member_handler),
        )
        .route(
            "/meetings",
            post(meetings::create_meeting_handler).get(meetings::list_meetings_handler),
        )
        .route(
            "/meetings/{id}",
            get(meetings::get_meeting_handler).patch(meetings::update_meeting_handler),
        )
        .route("/meetings/code/{code}", get(meetings::get_meeting_by_code_handler))
        .route("/meetings/{id}/join", post(meetings::join_meeting_handler))
        .route("/meetings/{id}/leave", post(meetings::leave_meeting_handler))
        .route("/meetings/{id}/discuss", post(meetings::discuss_meeting_handler))
        .route("/motions", post(motions::create_motion_handler))
        .route(
            "/motions/{id}",
            get(motions::list_motions_handler).patch(motions::update_motion_handler),
        )
        .route("/motions/{id}/vote", post(motions::vote_handler))
        .route("/motions/{id}/discuss", post(motions::discuss_motion_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
