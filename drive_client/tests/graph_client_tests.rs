use bytes::Bytes;
use drive_client::{DriveClientError, GraphClient, RemoteTransport};
use tracing_test::traced_test;
use utils::auth::AuthConfig;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GraphClient {
    GraphClient::new(&server.uri(), &AuthConfig::with_static_token("secret-token")).unwrap()
}

#[tokio::test]
async fn test_put_sends_bearer_token_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/me/drive/items/ITEM1/content"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"ITEM1"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = client
        .put("/me/drive/items/ITEM1/content", Bytes::from_static(b"payload"))
        .await
        .unwrap();
    assert_eq!(body, Bytes::from_static(br#"{"id":"ITEM1"}"#));
}

#[tokio::test]
#[traced_test]
async fn test_put_conflict_is_resource_modified() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string(r#"{"error":{"code":"resourceModified","message":"The resource has changed"}}"#),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .put("/me/drive/items/ITEM1/content", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert!(err.is_resource_modified());
    assert_eq!(err.status().map(|s| s.as_u16()), Some(409));
    assert!(logs_contain("drive API request failed"));
}

#[tokio::test]
async fn test_post_sends_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/me/drive/items/ITEM1/createUploadSession"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"uploadUrl":"https://upload.example/1"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = client_for(&server)
        .post("/me/drive/items/ITEM1/createUploadSession", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    assert!(std::str::from_utf8(&body).unwrap().contains("uploadUrl"));
}

#[tokio::test]
async fn test_put_chunk_headers_and_no_auth() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("content-range", "bytes 0-4/10"))
        .and(header("content-length", "5"))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"nextExpectedRanges":["5-"]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let upload_url = format!("{}/upload/session-1", server.uri());
    let response = client_for(&server)
        .put_chunk(&upload_url, "bytes 0-4/10", Bytes::from_static(b"01234"))
        .await
        .unwrap();
    assert_eq!(response.status, 202);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_put_chunk_reports_server_errors_as_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let upload_url = format!("{}/upload/session-1", server.uri());
    let response = client_for(&server)
        .put_chunk(&upload_url, "bytes 0-0/1", Bytes::from_static(b"0"))
        .await
        .unwrap();
    assert!(response.is_server_error());
    assert_eq!(response.body, Bytes::from_static(b"try later"));
}

#[tokio::test]
async fn test_put_chunk_unreachable_is_transport_error() {
    let client = GraphClient::new("http://127.0.0.1:9", &AuthConfig::with_static_token("t")).unwrap();
    let err = client
        .put_chunk("http://127.0.0.1:9/upload", "bytes 0-0/1", Bytes::from_static(b"0"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveClientError::ReqwestMiddlewareError(_) | DriveClientError::ReqwestError(_)
    ));
}

#[tokio::test]
async fn test_delete_upload_url_without_auth() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let upload_url = format!("{}/upload/session-1", server.uri());
    client_for(&server).delete(&upload_url).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_refresh_without_credentials_fails() {
    let client = GraphClient::new("https://graph.example", &AuthConfig::default()).unwrap();
    assert!(matches!(client.refresh().await, Err(DriveClientError::AuthError(_))));
}
