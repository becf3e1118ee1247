use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kervy_core::{Collection, ImageSource};
use kervy_sync::config::FirebaseSettings;
use kervy_sync::remote::{token_cell, FirebaseImageStore, FirestoreClient, TokenCell};
use kervy_sync::{AuthProvider, AuthSession, BatchWrite, Direction, FirebaseAuth, ImageStore, Query, RemoteStore, SyncError};

const DOCS: &str = "/v1/projects/kervy-pos/databases/(default)/documents";

fn settings(server: &MockServer) -> FirebaseSettings {
    FirebaseSettings {
        project_id: "kervy-pos".to_string(),
        api_key: "test-key".to_string(),
        storage_bucket: Some("kervy-bucket".to_string()),
        firestore_url: server.uri(),
        storage_url: server.uri(),
        auth_url: server.uri(),
        token_url: server.uri(),
        request_timeout_secs: 5,
    }
}

fn session(id_token: &str, ttl: Option<Duration>) -> AuthSession {
    AuthSession {
        user_id: "user-1".to_string(),
        email: "cashier@kervy.ph".to_string(),
        id_token: id_token.to_string(),
        refresh_token: Some("refresh-token".to_string()),
        expires_in: ttl,
    }
}

async fn holding(id_token: &str) -> TokenCell {
    let token = token_cell();
    token.store(&session(id_token, None)).await;
    token
}

async fn signed_in_client(server: &MockServer) -> FirestoreClient {
    let token = holding("id-token").await;
    FirestoreClient::new(&settings(server), token).unwrap()
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// ── Firestore ───────────────────────────────────────────────────

#[tokio::test]
async fn firestore_create_encodes_fields_and_returns_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/Categories")))
        .and(header("authorization", "Bearer id-token"))
        .and(body_partial_json(json!({
            "fields": {
                "name": { "stringValue": "Drinks" },
                "userId": { "stringValue": "user-1" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/kervy-pos/databases/(default)/documents/Categories/cat-42",
            "fields": { "name": { "stringValue": "Drinks" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    let id = client
        .create(
            Collection::Categories,
            fields(json!({ "name": "Drinks", "description": "", "userId": "user-1" })),
        )
        .await
        .unwrap();

    assert_eq!(id, "cat-42");
}

#[tokio::test]
async fn firestore_query_decodes_documents() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:runQuery")))
        .and(body_partial_json(json!({
            "structuredQuery": {
                "from": [{ "collectionId": "Transactions" }],
                "orderBy": [{ "field": { "fieldPath": "date" }, "direction": "DESCENDING" }],
                "limit": 1
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "document": {
                    "name": "projects/kervy-pos/databases/(default)/documents/Transactions/t-7",
                    "fields": {
                        "number": { "integerValue": "7" },
                        "userId": { "stringValue": "user-1" }
                    }
                },
                "readTime": "2024-03-09T08:05:00Z"
            },
            { "readTime": "2024-03-09T08:05:00Z" }
        ])))
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    let query = Query::new()
        .where_eq("userId", "user-1")
        .order_by("date", Direction::Descending)
        .limit(1);
    let docs = client.query(Collection::Transactions, &query).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "t-7");
    assert_eq!(docs[0].fields["number"], 7);
}

#[tokio::test]
async fn firestore_update_sends_field_mask() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/Inventory/p-1")))
        .and(query_param("updateMask.fieldPaths", "stock"))
        .and(query_param("currentDocument.exists", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/kervy-pos/databases/(default)/documents/Inventory/p-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    client
        .update(Collection::Inventory, "p-1", fields(json!({ "stock": 3 })))
        .await
        .unwrap();
}

#[tokio::test]
async fn firestore_update_of_missing_document_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/Inventory/ghost")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "No document to update" }
        })))
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    let err = client
        .update(Collection::Inventory, "ghost", fields(json!({ "stock": 1 })))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::NotFound { .. }));
}

#[tokio::test]
async fn firestore_commit_sends_all_writes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}:commit")))
        .and(body_partial_json(json!({
            "writes": [
                { "delete": "projects/kervy-pos/databases/(default)/documents/Inventory/p-1" },
                { "delete": "projects/kervy-pos/databases/(default)/documents/Categories/c-1" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "writeResults": [{}, {}] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    client
        .commit(vec![
            BatchWrite::Delete {
                collection: Collection::Inventory,
                id: "p-1".to_string(),
            },
            BatchWrite::Delete {
                collection: Collection::Categories,
                id: "c-1".to_string(),
            },
        ])
        .await
        .unwrap();
}

#[tokio::test]
async fn firestore_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{DOCS}/Categories")))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "code": 503, "message": "The service is currently unavailable." }
        })))
        .mount(&server)
        .await;

    let client = signed_in_client(&server).await;
    let err = client
        .create(Collection::Categories, fields(json!({ "name": "Drinks" })))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Remote { status: 503, .. }));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("currently unavailable"));
}

#[tokio::test]
async fn firestore_requires_sign_in() {
    let server = MockServer::start().await;
    let client = FirestoreClient::new(&settings(&server), token_cell()).unwrap();

    let err = client
        .create(Collection::Categories, Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotAuthenticated));
}

// ── Storage ─────────────────────────────────────────────────────

#[tokio::test]
async fn storage_upload_returns_tokenized_download_url() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ube.jpg");
    std::fs::write(&file, b"\xFF\xD8\xFFjpeg-bytes").unwrap();

    Mock::given(method("POST"))
        .and(path("/v0/b/kervy-bucket/o"))
        .and(query_param("uploadType", "media"))
        .and(query_param("name", "pos-kervy/abcube.jpg"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "pos-kervy/abcube.jpg",
            "bucket": "kervy-bucket",
            "downloadTokens": "tok-1,tok-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = holding("id-token").await;
    let store = FirebaseImageStore::new(&settings(&server), token).unwrap();

    let image = ImageSource::new(format!("file://{}", file.display()));
    let url = store.upload(&image, "pos-kervy/abcube.jpg").await.unwrap();

    assert_eq!(
        url,
        format!(
            "{}/v0/b/kervy-bucket/o/pos-kervy%2Fabcube.jpg?alt=media&token=tok-1",
            server.uri()
        )
    );
}

#[tokio::test]
async fn storage_upload_of_missing_file_fails_before_request() {
    let server = MockServer::start().await;

    let token = holding("id-token").await;
    let store = FirebaseImageStore::new(&settings(&server), token).unwrap();

    let err = store
        .upload(&ImageSource::new("/definitely/not/here.jpg"), "pos-kervy/x.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ImageReadFailed { .. }));
}

// ── Auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_sign_in_returns_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signInWithPassword"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "email": "cashier@kervy.ph",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "localId": "user-1",
            "email": "cashier@kervy.ph",
            "idToken": "id-token",
            "refreshToken": "refresh-token",
            "expiresIn": "3600"
        })))
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(&settings(&server)).unwrap();
    let session = auth.sign_in("cashier@kervy.ph", "secret1").await.unwrap();

    assert_eq!(session.user_id, "user-1");
    assert_eq!(session.id_token, "id-token");
    assert_eq!(session.expires_in, Some(std::time::Duration::from_secs(3600)));
}

#[tokio::test]
async fn auth_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "EMAIL_EXISTS" }
        })))
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(&settings(&server)).unwrap();
    let err = auth.sign_up("cashier@kervy.ph", "secret1").await.unwrap_err();

    assert!(matches!(err, SyncError::AuthFailed(ref m) if m == "EMAIL_EXISTS"));
}

#[tokio::test]
async fn auth_refresh_exchanges_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(query_param("key", "test-key"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "new-token",
            "refresh_token": "rotated-token",
            "expires_in": "3600",
            "token_type": "Bearer",
            "user_id": "user-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = FirebaseAuth::new(&settings(&server)).unwrap();
    let fresh = auth.refresh("refresh-token").await.unwrap();

    assert_eq!(fresh.id_token, "new-token");
    assert_eq!(fresh.refresh_token.as_deref(), Some("rotated-token"));
    assert_eq!(fresh.expires_in, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn firestore_renews_an_expiring_token_before_the_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "new-token",
            "refresh_token": "refresh-token",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(format!("{DOCS}/Inventory/p-1")))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/kervy-pos/databases/(default)/documents/Inventory/p-1"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let auth = Arc::new(FirebaseAuth::new(&settings(&server)).unwrap());
    let token = TokenCell::refreshing(auth);
    // Issued an hour ago: a minute of validity left.
    token
        .store(&session("old-token", Some(Duration::from_secs(60))))
        .await;

    let client = FirestoreClient::new(&settings(&server), token).unwrap();
    for stock in [3, 2] {
        client
            .update(Collection::Inventory, "p-1", fields(json!({ "stock": stock })))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn expired_token_with_revoked_refresh_fails_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "TOKEN_EXPIRED" }
        })))
        .mount(&server)
        .await;

    let auth = Arc::new(FirebaseAuth::new(&settings(&server)).unwrap());
    let token = TokenCell::refreshing(auth);
    token.store(&session("old-token", Some(Duration::ZERO))).await;

    let client = FirestoreClient::new(&settings(&server), token).unwrap();
    let err = client
        .create(Collection::Categories, fields(json!({ "name": "Drinks" })))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::AuthFailed(ref m) if m == "TOKEN_EXPIRED"));
}
