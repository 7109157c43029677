//! End-to-end resource tests against a mock backend: list-shape
//! normalization, the mutate→invalidate→refetch round trip, validation
//! payload mapping, multipart upload, PDF caching and timeouts.

use std::time::Duration;

use hermod::auth::TokenPair;
use hermod::resources::{ClientInput, ClientKind, ClientStatus, DocumentUpload};
use hermod::{ApiClient, DocumentCacheConfig, Hermod, HermodError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_client(server: &MockServer) -> ApiClient {
    Hermod::builder()
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .tokens(TokenPair::new("access", "refresh"))
        .document_cache(DocumentCacheConfig::new())
        .build()
        .expect("valid config")
}

fn client_json(id: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id, "name": name, "kind": "COMPANY", "phone": "0600",
        "email": "contact@example.com", "address": "1 main st",
        "city": "Casablanca", "status": "ACTIVE", "created_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn bare_array_list_normalizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([client_json(1, "ACME")])),
        )
        .mount(&server)
        .await;

    let client = api_client(&server);
    let mut handle = client.clients().watch_list();
    let snapshot = handle.ready().await;
    let list = snapshot.data.expect("list data");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "ACME");
}

#[tokio::test]
async fn paginated_list_normalizes_identically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clients/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [client_json(1, "ACME")]
        })))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let mut handle = client.clients().watch_list();
    let snapshot = handle.ready().await;
    let list = snapshot.data.expect("list data");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "ACME");
}

#[tokio::test]
async fn create_refetches_the_invalidated_list() {
    let server = MockServer::start().await;

    // First subscription sees one client; after the create, the refetch
    // lands on the second mock with two.
    Mock::given(method("GET"))
        .and(path("/clients/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!([client_json(1, "ACME")])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clients/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            client_json(1, "ACME"),
            client_json(2, "Globex")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/clients/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(client_json(2, "Globex")))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let mut handle = client.clients().watch_list();
    assert_eq!(handle.ready().await.data.unwrap().len(), 1);

    let created = client
        .clients()
        .create(ClientInput {
            name: "Globex".to_string(),
            kind: ClientKind::Company,
            phone: "0600".to_string(),
            email: "contact@example.com".to_string(),
            address: "1 main st".to_string(),
            city: "Casablanca".to_string(),
            status: ClientStatus::Active,
        })
        .await
        .expect("created");
    assert_eq!(created.id, 2);

    let snapshot = handle.ready().await;
    assert_eq!(snapshot.data.unwrap().len(), 2);
}

#[tokio::test]
async fn field_errors_surface_as_validation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clients/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "name": ["This field may not be blank."],
            "email": ["Enter a valid email address."]
        })))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let result = client
        .clients()
        .create(ClientInput {
            name: String::new(),
            kind: ClientKind::Individual,
            phone: String::new(),
            email: "nope".to_string(),
            address: String::new(),
            city: String::new(),
            status: ClientStatus::Active,
        })
        .await;

    match result {
        Err(HermodError::Validation { fields, .. }) => {
            assert_eq!(fields["name"], vec!["This field may not be blank."]);
            assert!(fields.contains_key("email"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn document_upload_posts_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 5, "name": "contract", "kind": "PDF",
            "file_url": "/media/contract.pdf", "project": 3,
            "created_at": "2024-02-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_client(&server);
    let document = client
        .documents()
        .upload(DocumentUpload {
            name: "contract".to_string(),
            kind: "PDF".to_string(),
            project: 3,
            file_name: "contract.pdf".to_string(),
            bytes: b"%PDF-1.4 fake".to_vec(),
        })
        .await
        .expect("uploaded");
    assert_eq!(document.id, 5);
    assert_eq!(document.file_url, "/media/contract.pdf");
}

#[tokio::test]
async fn quote_pdf_is_cached_after_first_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes/7/pdf/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 quote".to_vec()))
        .expect(1) // second call must come from the blob cache
        .mount(&server)
        .await;

    let client = api_client(&server);
    let first = client.quotes().pdf(7).await.expect("first download");
    let second = client.quotes().pdf(7).await.expect("cached download");
    assert_eq!(first.as_slice(), b"%PDF-1.4 quote");
    assert_eq!(first.as_slice(), second.as_slice());
}

#[tokio::test]
async fn delivery_note_generation_returns_blob() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/quotes/9/generate-delivery-note/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 note".to_vec()))
        .mount(&server)
        .await;

    let client = api_client(&server);
    let blob = client.tracking().delivery_note(9).await.expect("generated");
    assert_eq!(blob.as_slice(), b"%PDF-1.4 note");
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notifications/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = Hermod::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(50))
        .tokens(TokenPair::new("access", "refresh"))
        .build()
        .expect("valid config");

    let mut handle = client.notifications().watch_list();
    let snapshot = handle.ready().await;
    let error = snapshot.error.expect("timeout error");
    assert!(matches!(*error, HermodError::Timeout(_)));
}
