//! Client tests against a one-shot local HTTP stub.

mod common;

use serde_json::{json, Value};

use common::{serve, serve_raw};
use nakala_cli::metadata::{Dataset, DatasetStatus, Meta, MetadataFilter, Property, ResourceKind};
use nakala_cli::{ApiClient, NakalaError};

const KEY: &str = "test-key";

fn client(url: &str) -> ApiClient {
    ApiClient::new(url, KEY).unwrap()
}

#[test]
fn test_get_dataset_sends_key_and_path() {
    let (url, rx) = serve(vec![(200, r#"{"identifier":"abc","status":"pending","metas":[]}"#)]);

    let state = client(&url).get_dataset("abc").unwrap().expect("dataset");
    assert_eq!(state["status"], "pending");

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("GET /datas/abc "), "{}", request.line);
    assert_eq!(request.header("x-api-key"), Some(KEY));
}

#[test]
fn test_get_missing_resource_is_none() {
    let (url, _rx) = serve(vec![(404, r#"{"code":404,"message":"Not found"}"#), (403, "{}")]);
    let api = client(&url);
    assert!(api.get_dataset("gone").unwrap().is_none());
    assert!(api.get_collection("private").unwrap().is_none());
}

#[test]
fn test_create_dataset_posts_payload_and_returns_id() {
    let (url, rx) = serve(vec![(201, r#"{"code":201,"message":"Data created","payload":{"id":"10.34847/nkl.1234"}}"#)]);

    let dataset = Dataset {
        status: DatasetStatus::Pending,
        files: Vec::new(),
        metas: vec![Meta::text(Property::Title, "Demo").with_lang(Some("en"))],
    };
    let response = client(&url).create_dataset(&dataset).unwrap();
    assert_eq!(response.code(), 201);
    assert_eq!(response.created_id().as_deref(), Some("10.34847/nkl.1234"));

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("POST /datas "));
    assert_eq!(
        request.json(),
        json!({"status": "pending", "metas": [
            {"propertyUri": "http://nakala.fr/terms#title", "value": "Demo", "lang": "en"}
        ]})
    );
}

#[test]
fn test_upload_sets_embargo_to_today() {
    let (url, rx) = serve(vec![(201, r#"{"name":"demo.txt","sha1":"da39a3ee","mime_type":"text/plain"}"#)]);

    let file = client(&url)
        .upload_bytes("demo.txt", b"hello".to_vec(), "text/plain")
        .unwrap();
    assert_eq!(file.sha1, "da39a3ee");
    assert_eq!(
        file.embargoed.as_deref(),
        Some(chrono::Local::now().format("%Y-%m-%d").to_string().as_str())
    );
    assert_eq!(file.extra.get("mime_type"), Some(&json!("text/plain")));

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("POST /datas/uploads "));
    assert!(request
        .header("content-type")
        .is_some_and(|v| v.starts_with("multipart/form-data")));
    assert!(request.body.contains("filename=\"demo.txt\""));
    assert!(request.body.contains("hello"));
}

#[test]
fn test_upload_rejection_is_an_error() {
    let (url, _rx) = serve(vec![(413, r#"{"message":"too large"}"#)]);
    let err = client(&url)
        .upload_bytes("big.bin", vec![0; 16], "application/octet-stream")
        .unwrap_err();
    assert!(matches!(err, NakalaError::UnexpectedStatus { status: 413, .. }));
}

#[test]
fn test_generic_request_passes_status_through() {
    let (url, rx) = serve(vec![(405, r#"{"message":"Method Not Allowed"}"#)]);

    let body = json!({"metas": []});
    let response = client(&url).request("patch", "/datas/abc", Some(&body)).unwrap();
    assert_eq!(response.code(), 405);
    assert!(!response.is_success());

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("PATCH /datas/abc "));
    assert_eq!(request.json(), body);
}

#[test]
fn test_remove_metadata_sends_filter_body() {
    let (url, rx) = serve(vec![(204, "")]);

    let filter = MetadataFilter::new(Property::Subject, Some("en"));
    let response = client(&url)
        .remove_metadata(ResourceKind::Collection, "col-1", &filter)
        .unwrap();
    assert_eq!(response.code(), 204);

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("DELETE /collections/col-1/metadatas "));
    assert_eq!(
        request.json(),
        json!({"propertyUri": "http://purl.org/dc/terms/subject", "lang": "en"})
    );
}

#[test]
fn test_search_users_query_string() {
    let (url, rx) = serve(vec![(200, r#"[{"id":"u-1","username":"tnakala"}]"#)]);

    let response = client(&url).search_users("tnakala", 1).unwrap();
    let users: Vec<Value> = response.json().unwrap();
    assert_eq!(users[0]["id"], "u-1");

    let request = rx.recv().unwrap();
    assert!(request.line.starts_with("GET /users/search?q=tnakala&limit=1 "), "{}", request.line);
}

#[test]
fn test_truncated_body_is_an_error() {
    let url = serve_raw("HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"id\"");

    let err = client(&url).request("GET", "/datas/abc", None).unwrap_err();
    assert!(matches!(err, NakalaError::Http(_)), "{:?}", err);
}
