use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use secrecy::SecretString;
use sked_engine::TaskService;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthGate};
use crate::handlers::{self, AppState};

/// Server configuration.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the static front-end.
    pub web_dir: PathBuf,
    /// Sign-in password. `None` disables authentication.
    pub password: Option<SecretString>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7540,
            web_dir: PathBuf::from("web"),
            password: None,
            request_timeout_secs: 30,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, web_dir: PathBuf, request_timeout: Duration) -> Router {
    let protected = Router::new()
        .route(
            "/api/task",
            post(handlers::add_task)
                .get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/task/done", post(handlers::task_done))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            auth::require_auth,
        ));

    Router::new()
        .route("/api/signin", post(handlers::sign_in))
        .route("/api/nextdate", get(handlers::next_date))
        .route("/health", get(handlers::health))
        .merge(protected)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback_service(ServeDir::new(web_dir))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and start serving. Returns a handle to shut the server down.
pub async fn start(
    config: ServerConfig,
    service: Arc<TaskService>,
) -> Result<ServerHandle, std::io::Error> {
    let auth = Arc::new(AuthGate::new(config.password.as_ref()));
    if auth.is_enabled() {
        tracing::info!("authentication enabled");
    } else {
        tracing::warn!("no password configured, authentication disabled");
    }

    let state = AppState { service, auth };
    let router = build_router(
        state,
        config.web_dir.clone(),
        Duration::from_secs(config.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        port = local_addr.port(),
        web_dir = %config.web_dir.display(),
        "sked server started"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "server terminated");
        }
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        server,
        shutdown: shutdown_tx,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    server: tokio::task::JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.server.await {
            tracing::warn!(error = %e, "server task did not exit cleanly");
        }
        tracing::info!("sked server stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sked_store::{Database, TaskRepo};

    fn service(db: &Database) -> Arc<TaskService> {
        let repo = TaskRepo::new(db.clone());
        Arc::new(
            TaskService::new(Arc::new(repo))
                .with_clock(|| NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        )
    }

    async fn start_test_server(password: Option<&str>, web_dir: PathBuf) -> (ServerHandle, Database) {
        let db = Database::in_memory().unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            web_dir,
            password: password.map(|p| SecretString::from(p.to_string())),
            ..Default::default()
        };
        let handle = start(config, service(&db)).await.unwrap();
        (handle, db)
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let (handle, _db) = start_test_server(None, PathBuf::from("web")).await;
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn health_reports_closed_database() {
        let (handle, db) = start_test_server(None, PathBuf::from("web")).await;
        db.close().unwrap();

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 503);

        let tasks = reqwest::get(format!("http://127.0.0.1:{}/api/tasks", handle.port))
            .await
            .unwrap();
        assert_eq!(tasks.status(), 503);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn serves_static_front_end() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>sked</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let (handle, _db) = start_test_server(None, dir.path().to_path_buf()).await;
        let base = format!("http://127.0.0.1:{}", handle.port);

        let index = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(index.status(), 200);
        assert_eq!(index.text().await.unwrap(), "<h1>sked</h1>");

        let js = reqwest::get(format!("{base}/app.js")).await.unwrap();
        assert_eq!(js.status(), 200);

        let missing = reqwest::get(format!("{base}/nope.css")).await.unwrap();
        assert_eq!(missing.status(), 404);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_releases_port() {
        let (handle, _db) = start_test_server(None, PathBuf::from("web")).await;
        let port = handle.port;
        handle.shutdown().await;

        let result = reqwest::get(format!("http://127.0.0.1:{port}/health")).await;
        assert!(result.is_err());
    }
}
