//! Integration tests for the configuration service client

#![cfg(not(target_arch = "wasm32"))]

use appshell_core::client::error::ClientError;
use appshell_core::identity::SettingsLoader;
use appshell_core::{ConfigApi, ConfigClient, CoreError, User};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ConfigClient {
    ConfigClient::builder()
        .base_url(server.uri())
        .app_name("study")
        .idp_settings_url(format!("{}/idpSettings.json", server.uri()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_client_builder() {
    let client = ConfigClient::builder()
        .base_url("http://localhost:9000/api/gateway/config/")
        .app_name("study")
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "http://localhost:9000/api/gateway/config");
    assert_eq!(client.namespace_of("theme"), "common");
    assert_eq!(client.namespace_of("language"), "common");
    assert_eq!(client.namespace_of("mapZoom"), "study");
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ConfigClient::builder().app_name("study").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));

    let result = ConfigClient::builder().base_url("http://localhost").build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_fetch_namespace_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/applications/common/parameters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "theme", "value": "Light"},
            {"name": "language", "value": "fr"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = client.fetch_all_parameters("common").await.unwrap();

    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "theme");
    assert_eq!(params[0].value, "Light");
    assert_eq!(params[1].value, "fr");
}

#[tokio::test]
async fn test_fetch_single_parameter_reads_where_it_was_written() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/applications/common/parameters/theme"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "theme", "value": "Dark"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/applications/study/parameters/mapZoom"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "mapZoom", "value": "12"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let param = client.fetch_parameter("theme").await.unwrap();
    assert_eq!(param.name, "theme");
    assert_eq!(param.value, "Dark");

    let param = client.fetch_parameter("mapZoom").await.unwrap();
    assert_eq!(param.value, "12");
}

#[tokio::test]
async fn test_credentials_follow_the_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/applications/study/parameters"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/applications/study/parameters"))
        .respond_with(ResponseTemplate::new(401).set_body_string("missing token"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_credentials(Some(&User::new("alice").with_token("token-123")));
    assert!(client.fetch_all_parameters("study").await.unwrap().is_empty());

    client.set_credentials(None);
    let err = client.get_parameters("study").await.unwrap_err();
    assert_eq!(err.status().map(|status| status.as_u16()), Some(401));
    assert_eq!(err.to_string(), "missing token");
}

#[tokio::test]
async fn test_update_parameter_sends_value_in_query() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v1/applications/common/parameters/theme"))
        .and(query_param("value", "Light"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/applications/study/parameters/mapZoom"))
        .and(query_param("value", "12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.update_parameter("theme", "Light").await.unwrap();
    client.update_parameter("mapZoom", "12").await.unwrap();
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/applications/study/parameters/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such parameter"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/applications/common/parameters/theme"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/applications/common/parameters/language"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client.get_parameter("missing").await.unwrap_err();
    assert!(
        matches!(&err, ClientError::Rejected { status, message }
            if status.as_u16() == 404 && message == "no such parameter")
    );

    let err = client.get_parameter("theme").await.unwrap_err();
    assert_eq!(err.status().map(|status| status.as_u16()), Some(503));

    // Through the port the failure becomes a displayable fetch error
    let err = client.fetch_parameter("theme").await.unwrap_err();
    assert!(matches!(err, CoreError::Fetch { .. }));
    assert_eq!(err.to_string(), "maintenance");

    // Empty body: the status reason is shown instead
    let err = client.update_parameter("language", "fr").await.unwrap_err();
    assert_eq!(err.to_string(), "Forbidden");
}

#[tokio::test]
async fn test_load_idp_settings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/idpSettings.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authority": "https://idp.example.org/realms/suite",
            "client_id": "study-ui",
            "redirect_uri": "https://app.example.org/sign-in-callback",
            "post_logout_redirect_uri": "https://app.example.org/logout-callback",
            "silent_redirect_uri": "https://app.example.org/silent-renew-callback",
            "scope": "openid",
            "maxExpiresIn": 3600
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let settings = client.load_idp_settings().await.unwrap();
    assert_eq!(settings.authority, "https://idp.example.org/realms/suite");
    assert_eq!(settings.client_id, "study-ui");
    assert_eq!(settings.max_expires_in, Some(3600));
}

#[tokio::test]
async fn test_idp_settings_url_is_required() {
    let client = ConfigClient::builder()
        .base_url("http://localhost")
        .app_name("study")
        .build()
        .unwrap();
    let err = client.get_idp_settings().await.unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
}
