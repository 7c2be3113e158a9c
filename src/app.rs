use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth;
use crate::state::AppState;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    let users_api = users::router().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_api_key,
    ));

    Router::new()
        .merge(users_api)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    fn request(method: Method, uri: &str, key: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("X-API-KEY", key);
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(res: axum::http::Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_body(email: &str) -> Value {
        json!({
            "name": "Ada Lovelace",
            "birth_date": "1815-12-10",
            "email": email,
            "address": "12 St James's Square, London",
            "password": "password"
        })
    }

    #[tokio::test]
    async fn health_is_open() {
        let res = app()
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_api_key_is_unauthorized() {
        let res = app()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                None,
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_api_key_is_unauthorized() {
        let res = app()
            .oneshot(request(
                Method::GET,
                "/api/users/d035e79d-ffe9-4ebf-b665-747353b3ea40",
                Some("wrong-key"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_returns_created_record() {
        let res = app()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body = body_json(res).await;
        assert!(body["uuid"].as_str().is_some());
        assert_eq!(body["name"], "Ada Lovelace");
        assert_eq!(body["birth_date"], "1815-12-10");
        assert_eq!(body["email"], "ada@example.com");
        // the stored digest comes back, never the plaintext
        let password = body["password"].as_str().unwrap();
        assert_eq!(password.len(), 64);
        assert_ne!(password, "password");
    }

    #[tokio::test]
    async fn create_answers_with_and_without_trailing_slash() {
        let app = app();
        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users",
                Some("test-api-key"),
                Some(create_body("grace@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        // both forms sit behind the key guard
        let res = app
            .oneshot(request(
                Method::POST,
                "/api/users",
                None,
                Some(create_body("alan@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_with_bad_email_is_bad_request() {
        let res = app()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("not_valid_email")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({"error": "Invalid email format"}));
    }

    #[tokio::test]
    async fn create_with_duplicate_email_is_bad_request() {
        let app = app();
        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(res).await,
            json!({"error": "Email already registered"})
        );
    }

    #[tokio::test]
    async fn get_with_malformed_id_is_bad_request() {
        let res = app()
            .oneshot(request(
                Method::GET,
                "/api/users/not%20an%20uuid",
                Some("test-api-key"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({"error": "Invalid uuid format"}));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let res = app()
            .oneshot(request(
                Method::GET,
                "/api/users/d035e79d-ffe9-4ebf-b665-747353b3ea40",
                Some("test-api-key"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await, json!({"error": "Could not find user"}));
    }

    #[tokio::test]
    async fn patch_updates_only_submitted_fields() {
        let app = app();
        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        let created = body_json(res).await;
        let uuid = created["uuid"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                &format!("/api/users/{uuid}"),
                Some("test-api-key"),
                Some(json!({"name": "Ada King"})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let updated = body_json(res).await;
        assert_eq!(updated["name"], "Ada King");
        assert_eq!(updated["email"], created["email"]);
        assert_eq!(updated["birth_date"], created["birth_date"]);
        assert_eq!(updated["address"], created["address"]);
        assert_eq!(updated["password"], created["password"]);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let app = app();
        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/users/",
                Some("test-api-key"),
                Some(create_body("ada@example.com")),
            ))
            .await
            .unwrap();
        let uuid = body_json(res).await["uuid"].as_str().unwrap().to_string();

        let res = app
            .clone()
            .oneshot(request(
                Method::DELETE,
                &format!("/api/users/{uuid}"),
                Some("test-api-key"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .oneshot(request(
                Method::GET,
                &format!("/api/users/{uuid}"),
                Some("test-api-key"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
