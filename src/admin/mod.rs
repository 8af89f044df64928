//! Admin HTTP interface.
//!
//! Read-only JSON introspection of the backend registry, behind HTTP Basic
//! authentication. Handler panics are caught and answered with a 500.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::backends::BackendRegistry;
use self::auth::{basic_auth_middleware, Credentials};
use self::handlers::{get_backends, handle_panic};

/// Build the admin router.
pub fn setup_admin_router(registry: Arc<BackendRegistry>, credentials: Credentials) -> Router {
    let routes = Router::new()
        .route("/v0/backends", get(get_backends))
        .with_state(registry);
    protect(routes, credentials)
}

/// Wrap a router in the admin middleware stack: panic recovery outermost,
/// then request tracing, then basic auth.
pub fn protect(router: Router, credentials: Credentials) -> Router {
    router
        .layer(middleware::from_fn_with_state(
            Arc::new(credentials),
            basic_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Serve the admin router until shutdown.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendStatus;
    use crate::config::BackendConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use tower::ServiceExt;

    fn registry() -> Arc<BackendRegistry> {
        let configs: Vec<_> = (0..2)
            .map(|i| BackendConfig {
                name: format!("backend-{i}"),
                host: "localhost".to_string(),
                port: 45000 + i,
                healthcheck_port: 45500 + i,
            })
            .collect();
        Arc::new(BackendRegistry::new(&configs))
    }

    fn credentials() -> Credentials {
        Credentials::new("username", "password")
    }

    fn request(path: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(user_pass) = auth {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode(user_pass)),
            );
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn backends_requires_auth() {
        let app = setup_admin_router(registry(), credentials());

        let res = app.clone().oneshot(request("/v0/backends", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));

        let res = app
            .oneshot(request("/v0/backends", Some("username:wrong")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn backends_lists_registry() {
        let registry = registry();
        let active = registry.active().unwrap();
        registry.set_unhealthy(&active);
        let app = setup_admin_router(Arc::clone(&registry), credentials());

        let res = app
            .oneshot(request("/v0/backends", Some("username:password")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let statuses: Vec<BackendStatus> = serde_json::from_slice(&body).unwrap();
        assert_eq!(statuses.len(), 2);

        let demoted = statuses.iter().find(|s| s.name == active.name()).unwrap();
        assert!(!demoted.healthy && !demoted.active);
        let promoted = statuses.iter().find(|s| s.name != active.name()).unwrap();
        assert!(promoted.healthy && promoted.active);
        assert_eq!(promoted.host, "localhost");
    }

    #[tokio::test]
    async fn panics_become_server_errors() {
        async fn boom() -> &'static str {
            panic!("handler exploded")
        }
        let app = protect(Router::new().route("/boom", get(boom)), credentials());

        let res = app
            .clone()
            .oneshot(request("/boom", Some("username:password")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = app.oneshot(request("/boom", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_when_authorized() {
        let app = setup_admin_router(registry(), credentials());
        let res = app
            .oneshot(request("/v0/nope", Some("username:password")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
