//! Cross-module tests for the auth crate

#[cfg(test)]
mod http_tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::application::config::AuthConfig;
    use crate::infra::memory::InMemoryUserRepository;
    use crate::presentation::router::auth_router;

    fn app(config: AuthConfig) -> Router {
        Router::new().nest("/api/auth", auth_router(InMemoryUserRepository::new(), config))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn registration() -> Value {
        json!({
            "email": "ana@example.com",
            "password": "Secret123",
            "firstName": "Ana",
            "lastName": "Pérez",
            "island": "Tenerife",
            "city": "La Laguna"
        })
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let app = app(AuthConfig::development());

        let response = app
            .clone()
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        let body = json_body(response).await;
        assert_eq!(body["user"]["island"], "Tenerife");
        assert_eq!(body["requiresEmailConfirmation"], false);

        let response = app
            .clone()
            .oneshot(post(
                "/api/auth/login",
                json!({"email": "ANA@example.com", "password": "Secret123", "rememberMe": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("auth_token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let body = json_body(response).await;
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["email"], "ana@example.com");

        let response = app
            .clone()
            .oneshot(get("/api/auth/me", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["user"]["fullName"], "Ana Pérez");
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = app(AuthConfig::development());

        let response = app.clone().oneshot(get("/api/auth/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "AUTH_REQUIRED");

        let response = app
            .oneshot(get("/api/auth/me", Some("a.b.c")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn test_wrong_password_is_generic() {
        let app = app(AuthConfig::development());
        app.clone()
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();

        let wrong = app
            .clone()
            .oneshot(post(
                "/api/auth/login",
                json!({"email": "ana@example.com", "password": "secret123"}),
            ))
            .await
            .unwrap();
        let unknown = app
            .oneshot(post(
                "/api/auth/login",
                json!({"email": "bob@example.com", "password": "Secret123"}),
            ))
            .await
            .unwrap();

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(wrong).await, json_body(unknown).await);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = app(AuthConfig::development());
        app.clone()
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();

        let response = app
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn test_registration_with_confirmation_has_no_token() {
        let config = AuthConfig {
            require_email_verification: true,
            ..AuthConfig::development()
        };
        let response = app(config)
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
        let body = json_body(response).await;
        assert_eq!(body["requiresEmailConfirmation"], true);
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_validate_and_refresh() {
        let app = app(AuthConfig::development());
        let body = json_body(
            app.clone()
                .oneshot(post("/api/auth/register", registration()))
                .await
                .unwrap(),
        )
        .await;
        let token = body["token"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(get("/api/auth/validate", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["role"], "individual");

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .header(header::COOKIE, format!("auth_token={token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"extendExpiration":true}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let refreshed = json_body(response).await;
        assert_ne!(refreshed["token"], token.as_str());
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = app(AuthConfig::development())
            .oneshot(post("/api/auth/logout", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_cross_site_cookie_policy() {
        let config = AuthConfig {
            cross_site_cookies: true,
            ..AuthConfig::development()
        };
        let response = app(config)
            .oneshot(post("/api/auth/register", registration()))
            .await
            .unwrap();

        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Partitioned"));
    }
}

#[cfg(test)]
mod token_flow_tests {
    use crate::application::config::AuthConfig;
    use crate::domain::token_codec::{TokenCodec, TokenError};
    use crate::domain::user::UserRecord;
    use crate::domain::value_object::email::Email;
    use platform::password::{ClearTextPassword, PasswordVerifier};

    #[test]
    fn test_issued_token_verifies_and_peeks() {
        let config = AuthConfig::development();
        let codec = config.token_codec();
        let hash = PasswordVerifier.hash(&ClearTextPassword::for_login("Secret123".to_string()));
        let user = UserRecord::new(Email::from_db("ana@example.com"), hash, "Ana", "Pérez");

        let (token, claims) = codec.issue_for(&user, false).unwrap();
        assert_eq!(claims.iss.as_deref(), Some(config.issuer.as_str()));
        assert_eq!(claims.exp - claims.iat, config.token_ttl_short.as_secs() as i64);

        let verified = codec.decode(&token).unwrap();
        assert_eq!(verified, claims);
        assert_eq!(TokenCodec::peek_unverified(&token), Some(claims));
    }

    #[test]
    fn test_other_secret_rejected() {
        let user = UserRecord::new(
            Email::from_db("ana@example.com"),
            PasswordVerifier.hash(&ClearTextPassword::for_login("Secret123".to_string())),
            "Ana",
            "Pérez",
        );
        let (token, _) = AuthConfig::development()
            .token_codec()
            .issue_for(&user, false)
            .unwrap();

        assert_eq!(
            AuthConfig::development().token_codec().decode(&token),
            Err(TokenError::SignatureInvalid)
        );
    }
}
