// Integration tests for the HTTP gateway client and the intermediary routes
// against a fake Spotify built with wiremock
use actix_web::{http::StatusCode, test, web, App, HttpServer};
use serde_json::json;
use spotilink::handlers::configure_services;
use spotilink::models::ErrorResponse;
use spotilink::pkce::generate_verifier;
use spotilink::session::{AuthSession, SessionStatus};
use spotilink::spotify::types::NewPlaylist;
use spotilink::spotify::{AccountsClient, GatewayError, HttpGateway, ProviderGateway};
use spotilink::storage::MemoryStore;
use spotilink::testing::{fixtures, ManualClock};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body() -> serde_json::Value {
    json!({
        "access_token": fixtures::ACCESS_TOKEN,
        "token_type": "Bearer",
        "scope": spotilink::spotify::DEFAULT_SCOPES,
        "expires_in": 3600,
        "refresh_token": fixtures::REFRESH_TOKEN,
    })
}

fn accounts_for(server: &MockServer) -> AccountsClient {
    AccountsClient::from_settings(&fixtures::settings_for(&server.uri())).unwrap()
}

// =============================================================================
// HttpGateway
// =============================================================================

#[tokio::test]
async fn test_http_gateway_requests_auth_url_with_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spotify/auth"))
        .and(body_json(json!({"codeChallenge": "challenge-xyz"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"url": "https://accounts.spotify.com/authorize?x=1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let url = gateway.authorize_url("challenge-xyz").await.unwrap();

    assert_eq!(url, "https://accounts.spotify.com/authorize?x=1");
}

#[tokio::test]
async fn test_http_gateway_exchange_sends_code_and_verifier() {
    let server = MockServer::start().await;
    let verifier = generate_verifier();
    Mock::given(method("POST"))
        .and(path("/api/spotify/token"))
        .and(body_json(json!({"code": "auth-code", "codeVerifier": verifier.as_str()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let tokens = gateway.exchange_code("auth-code", &verifier).await.unwrap();

    assert_eq!(tokens.access_token, fixtures::ACCESS_TOKEN);
    assert_eq!(tokens.refresh_token.as_deref(), Some(fixtures::REFRESH_TOKEN));
    assert_eq!(tokens.expires_in, 3600);
}

#[tokio::test]
async fn test_http_gateway_reports_intermediary_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/spotify/refresh"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Token refresh failed"})),
        )
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let err = gateway.refresh_token("old-refresh").await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::Status {
            status: 500,
            message: "Token refresh failed".to_string()
        }
    );
}

#[tokio::test]
async fn test_http_gateway_fetches_profile_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "wizzler", "display_name": "Wizzler", "country": "SE"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let profile = gateway.fetch_profile("test-token").await.unwrap();

    assert_eq!(profile.id, "wizzler");
    assert_eq!(profile.display_name.as_deref(), Some("Wizzler"));
}

#[tokio::test]
async fn test_http_gateway_create_playlist_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users/wizzler/playlists"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"error": {"status": 403, "message": "Insufficient client scope"}}),
        ))
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let playlist = NewPlaylist {
        name: "Mix".to_string(),
        description: "d".to_string(),
        public: false,
    };
    let err = gateway
        .create_playlist("test-token", "wizzler", &playlist)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Insufficient client scope");
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn test_http_gateway_falls_back_to_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users/wizzler/playlists"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let gateway = HttpGateway::new(&server.uri(), &server.uri());
    let playlist = NewPlaylist {
        name: "Mix".to_string(),
        description: "d".to_string(),
        public: false,
    };
    let err = gateway
        .create_playlist("stale-token", "wizzler", &playlist)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Unauthorized");
}

// =============================================================================
// Intermediary routes
// =============================================================================

#[actix_web::test]
async fn test_token_route_forwards_authorization_code_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier=verifier-value"))
        .and(body_string_contains(format!("client_id={}", fixtures::CLIENT_ID).as_str()))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(accounts_for(&server)))
            .configure(configure_services),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/api/spotify/token")
        .set_json(json!({"code": "auth-code", "codeVerifier": "verifier-value"}))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, token_body());
}

#[actix_web::test]
async fn test_refresh_route_forwards_refresh_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .and(body_string_contains(format!("client_id={}", fixtures::CLIENT_ID).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "token_type": "Bearer",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(accounts_for(&server)))
            .configure(configure_services),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/api/spotify/refresh")
        .set_json(json!({"refreshToken": "old-refresh"}))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["access_token"], "new-access");
    assert!(body.get("refresh_token").is_none());
}

#[actix_web::test]
async fn test_token_route_upstream_failure_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid authorization code",
        })))
        .mount(&server)
        .await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(accounts_for(&server)))
            .configure(configure_services),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/api/spotify/token")
        .set_json(json!({"code": "used-code", "codeVerifier": "verifier-value"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body, ErrorResponse::new("Token exchange failed"));
}

#[actix_web::test]
async fn test_refresh_route_requires_token() {
    let server = MockServer::start().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(accounts_for(&server)))
            .configure(configure_services),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/spotify/refresh")
        .set_json(json!({"refreshToken": ""}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body, ErrorResponse::new("Refresh token is required"));
}

// =============================================================================
// End to end: session -> intermediary -> fake Spotify
// =============================================================================

#[actix_web::test]
async fn test_full_login_and_playlist_creation() {
    let spotify = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
        .expect(1)
        .mount(&spotify)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header(
            "Authorization",
            format!("Bearer {}", fixtures::ACCESS_TOKEN).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": fixtures::USER_ID})))
        .expect(1)
        .mount(&spotify)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/users/{}/playlists", fixtures::USER_ID)))
        .and(body_json(json!({
            "name": "Road Trip",
            "description": "Created with Spotify Integration",
            "public": false,
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": fixtures::PLAYLIST_ID,
            "name": "Road Trip",
            "public": false,
        })))
        .expect(1)
        .mount(&spotify)
        .await;

    // Run the intermediary on an ephemeral port
    let accounts = web::Data::new(accounts_for(&spotify));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(accounts.clone())
            .configure(configure_services)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let gateway_addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    let gateway = HttpGateway::new(&format!("http://{gateway_addr}"), &spotify.uri());
    let mut session = AuthSession::new(
        gateway,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
    );

    let auth_url = url::Url::parse(&session.get_auth_url().await.unwrap()).unwrap();
    let challenge = auth_url
        .query_pairs()
        .find(|(key, _)| key == "code_challenge")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert_eq!(challenge.len(), 43);

    session.handle_auth_code("auth-code").await.unwrap();
    assert_eq!(session.status(), SessionStatus::Authenticated);

    let playlist = session.create_playlist(" Road Trip ", "").await.unwrap();
    assert_eq!(playlist.id, fixtures::PLAYLIST_ID);
}
