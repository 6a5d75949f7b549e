use serde_json::json;

use crate::common::{TestApp, routes};
use classifieds_server::config::RateLimitRule;

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_receives_token_and_profile() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "securepass",
                    "first_name": "Alice",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["access_token"].is_string());
        assert_eq!(res.body["user"]["username"], "alice");
        assert_eq!(res.body["user"]["first_name"], "Alice");
        assert!(res.body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let same_name = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alice", "email": "other@example.com", "password": "pw"}),
            )
            .await;
        let same_email = app
            .post_without_token(
                routes::REGISTER,
                &json!({"username": "alicia", "email": "alice@example.com", "password": "pw"}),
            )
            .await;

        assert_eq!(same_name.status, 409);
        assert_eq!(same_name.body["code"], "CONFLICT");
        assert_eq!(same_email.status, 409);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"username": "alice"}))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_by_username_or_email() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let by_name = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "password123"}),
            )
            .await;
        let by_email = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice@example.com", "password": "password123"}),
            )
            .await;

        assert_eq!(by_name.status, 200, "{}", by_name.text);
        assert!(by_name.body["access_token"].is_string());
        assert_eq!(by_email.status, 200, "{}", by_email.text);

        let token = by_email.body["access_token"].as_str().unwrap();
        let me = app.get_with_token(routes::CURRENT_USER, token).await;
        assert_eq!(me.body["username"], "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = TestApp::spawn().await;
        app.create_user("alice").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "alice", "password": "wrong"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
        assert_eq!(res.body["message"], "Bad username or password");
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "ghost", "password": "whatever"}),
            )
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn repeated_logins_are_rate_limited() {
        let app = TestApp::spawn_with(|c| {
            c.rate_limit.enabled = true;
            c.rate_limit.login = RateLimitRule::per_minute(2);
        })
        .await;
        let body = json!({"username": "ghost", "password": "whatever"});

        for _ in 0..2 {
            let res = app.post_without_token(routes::LOGIN, &body).await;
            assert_eq!(res.status, 401);
        }
        let res = app.post_without_token(routes::LOGIN, &body).await;

        assert_eq!(res.status, 429);
        assert_eq!(res.body["code"], "RATE_LIMITED");
        assert!(res.headers.contains_key("retry-after"));
    }

    #[tokio::test]
    async fn rotating_forwarded_for_does_not_reset_login_limit() {
        let app = TestApp::spawn_with(|c| {
            c.rate_limit.enabled = true;
            c.rate_limit.login = RateLimitRule::per_minute(3);
        })
        .await;
        let body = json!({"username": "ghost", "password": "whatever"});

        let mut statuses = Vec::new();
        for i in 0..6 {
            let res = app
                .post_forwarded(routes::LOGIN, &body, &format!("10.0.0.{i}"))
                .await;
            statuses.push(res.status);
        }

        assert_eq!(statuses, vec![401, 401, 401, 429, 429, 429]);
    }

    #[tokio::test]
    async fn forwarded_for_keys_the_limit_behind_a_trusted_proxy() {
        let app = TestApp::spawn_with(|c| {
            c.server.trust_forwarded_for = true;
            c.rate_limit.enabled = true;
            c.rate_limit.login = RateLimitRule::per_minute(1);
        })
        .await;
        let body = json!({"username": "ghost", "password": "whatever"});

        let first = app.post_forwarded(routes::LOGIN, &body, "203.0.113.1").await;
        let repeat = app.post_forwarded(routes::LOGIN, &body, "203.0.113.1").await;
        let other = app.post_forwarded(routes::LOGIN, &body, "203.0.113.2").await;

        assert_eq!(first.status, 401);
        assert_eq!(repeat.status, 429);
        assert_eq!(other.status, 401);
    }
}

mod tokens {
    use super::*;

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::CURRENT_USER).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn malformed_authorization_header_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_token(routes::CURRENT_USER, "definitely.not.a.jwt")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
