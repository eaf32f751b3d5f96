// API client module: a small blocking HTTP client for the NAKALA REST API.
// One method per endpoint, no retries and no backoff: callers decide what
// an unexpected status means for them.

use std::fs;
use std::path::Path;

use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{NakalaError, Result};
use crate::metadata::{
    Collection, CollectionStatus, Dataset, DatasetStatus, FileInfo, GroupRequest, Meta,
    MetadataFilter, ResourceKind, RightAssignment,
};

/// Header carrying the API key on every request (`X-API-KEY`; header names
/// are case-insensitive and `HeaderMap` wants them lowercase).
pub const API_KEY_HEADER: &str = "x-api-key";

/// Status and body of a finished request. Kept raw so the demos can show
/// exactly what the service answered.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// True when the status is one of `codes`.
    pub fn is_any(&self, codes: &[u16]) -> bool {
        codes.contains(&self.code())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The `payload.id` of a creation response, if any.
    pub fn created_id(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.body).ok()?;
        value
            .pointer("/payload/id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// At most `max` characters of the body, for error messages.
    pub fn body_excerpt(&self, max: usize) -> String {
        self.body.chars().take(max).collect()
    }

    /// Turn a response whose status is not in `expected` into an error.
    pub fn expect(self, expected: &[u16]) -> Result<Self> {
        if self.is_any(expected) {
            Ok(self)
        } else {
            Err(NakalaError::UnexpectedStatus {
                status: self.code(),
                body: self.body,
            })
        }
    }
}

/// Blocking client holding the HTTP connection pool, the API root and the
/// key sent as `X-API-KEY`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client from the configured URL and key.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, &config.api_key)
    }

    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn send(&self, builder: RequestBuilder) -> Result<ApiResponse> {
        let res = builder.send()?;
        let status = res.status();
        let body = res.text()?;
        debug!(status = status.as_u16(), "response received");
        Ok(ApiResponse { status, body })
    }

    fn call<B: Serialize + ?Sized>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<ApiResponse> {
        debug!(%method, endpoint, "sending request");
        let mut req = self.client.request(method, self.url(endpoint));
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req)
    }

    /// Send `method` to `endpoint` with an optional JSON body. The method
    /// name is case-insensitive; only GET, POST, PUT, PATCH and DELETE are
    /// accepted.
    pub fn request(&self, method: &str, endpoint: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let method = match method.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            _ => return Err(NakalaError::UnsupportedMethod(method.to_string())),
        };
        self.call(method, endpoint, body)
    }

    /// GET that yields the JSON body on 200 and `None` on any other status.
    fn get_json(&self, endpoint: &str, what: &str) -> Result<Option<Value>> {
        let res = self.call::<Value>(Method::GET, endpoint, None)?;
        if res.status == StatusCode::OK {
            Ok(Some(res.json()?))
        } else {
            warn!(endpoint, status = res.code(), "{} not found", what);
            Ok(None)
        }
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Upload a local file. See [`ApiClient::upload_bytes`].
    pub fn upload_file(&self, path: &Path) -> Result<FileInfo> {
        let bytes = fs::read(path).map_err(|e| NakalaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        self.upload_bytes(&name, bytes, "application/octet-stream")
    }

    /// POST `/datas/uploads` as multipart/form-data. The returned file
    /// object is ready to go in a dataset payload, with `embargoed` set to
    /// today's date.
    pub fn upload_bytes(&self, name: &str, bytes: Vec<u8>, mime: &str) -> Result<FileInfo> {
        info!(file = name, size = bytes.len(), "uploading file");
        let part = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new().part("file", part);

        let res = self
            .send(self.client.post(self.url("/datas/uploads")).multipart(form))?
            .expect(&[201])?;
        let mut file_info: FileInfo = res.json()?;
        file_info.embargoed = Some(chrono::Local::now().format("%Y-%m-%d").to_string());
        info!(file = name, sha1 = %file_info.sha1, "file uploaded");
        Ok(file_info)
    }

    // ------------------------------------------------------------------
    // Datasets
    // ------------------------------------------------------------------

    pub fn create_dataset(&self, dataset: &Dataset) -> Result<ApiResponse> {
        self.call(Method::POST, "/datas", Some(dataset))
    }

    pub fn get_dataset(&self, id: &str) -> Result<Option<Value>> {
        self.get_json(&format!("/datas/{}", id), "dataset")
    }

    /// PUT replaces every metadata entry of the dataset.
    pub fn modify_dataset(&self, id: &str, dataset: &Dataset) -> Result<ApiResponse> {
        self.call(Method::PUT, &format!("/datas/{}", id), Some(dataset))
    }

    pub fn delete_dataset(&self, id: &str) -> Result<ApiResponse> {
        self.call::<Value>(Method::DELETE, &format!("/datas/{}", id), None)
    }

    pub fn set_dataset_status(&self, id: &str, status: DatasetStatus) -> Result<ApiResponse> {
        self.call::<Value>(Method::PUT, &format!("/datas/{}/status/{}", id, status), None)
    }

    /// Affectation: link a dataset to one or more collections.
    pub fn link_collections(&self, dataset_id: &str, collection_ids: &[String]) -> Result<ApiResponse> {
        self.call(Method::POST, &format!("/datas/{}/collections", dataset_id), Some(collection_ids))
    }

    /// Désaffectation: unlink without deleting anything.
    pub fn unlink_collections(&self, dataset_id: &str, collection_ids: &[String]) -> Result<ApiResponse> {
        self.call(Method::DELETE, &format!("/datas/{}/collections", dataset_id), Some(collection_ids))
    }

    pub fn get_rights(&self, dataset_id: &str) -> Result<ApiResponse> {
        self.call::<Value>(Method::GET, &format!("/datas/{}/rights", dataset_id), None)
    }

    pub fn add_rights(&self, dataset_id: &str, rights: &[RightAssignment]) -> Result<ApiResponse> {
        self.call(Method::POST, &format!("/datas/{}/rights", dataset_id), Some(rights))
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    pub fn create_collection(&self, collection: &Collection) -> Result<ApiResponse> {
        self.call(Method::POST, "/collections", Some(collection))
    }

    pub fn get_collection(&self, id: &str) -> Result<Option<Value>> {
        self.get_json(&format!("/collections/{}", id), "collection")
    }

    /// PUT replaces every metadata entry of the collection.
    pub fn modify_collection(&self, id: &str, collection: &Collection) -> Result<ApiResponse> {
        self.call(Method::PUT, &format!("/collections/{}", id), Some(collection))
    }

    pub fn delete_collection(&self, id: &str) -> Result<ApiResponse> {
        self.call::<Value>(Method::DELETE, &format!("/collections/{}", id), None)
    }

    pub fn set_collection_status(&self, id: &str, status: CollectionStatus) -> Result<ApiResponse> {
        self.call::<Value>(Method::PUT, &format!("/collections/{}/status/{}", id, status), None)
    }

    // ------------------------------------------------------------------
    // Metadata (both resource kinds)
    // ------------------------------------------------------------------

    /// Add one metadata entry, leaving the others untouched.
    pub fn add_metadata(&self, kind: ResourceKind, id: &str, meta: &Meta) -> Result<ApiResponse> {
        self.call(Method::POST, &format!("/{}/{}/metadatas", kind.path(), id), Some(meta))
    }

    /// Remove every metadata entry matching `filter`.
    pub fn remove_metadata(&self, kind: ResourceKind, id: &str, filter: &MetadataFilter) -> Result<ApiResponse> {
        self.call(Method::DELETE, &format!("/{}/{}/metadatas", kind.path(), id), Some(filter))
    }

    // ------------------------------------------------------------------
    // Groups and users
    // ------------------------------------------------------------------

    pub fn create_group(&self, group: &GroupRequest) -> Result<ApiResponse> {
        self.call(Method::POST, "/groups", Some(group))
    }

    pub fn get_group(&self, id: &str) -> Result<Option<Value>> {
        self.get_json(&format!("/groups/{}", id), "group")
    }

    pub fn delete_group(&self, id: &str) -> Result<ApiResponse> {
        self.call::<Value>(Method::DELETE, &format!("/groups/{}", id), None)
    }

    pub fn search_users(&self, query: &str, limit: u32) -> Result<ApiResponse> {
        let limit = limit.to_string();
        let req = self
            .client
            .get(self.url("/users/search"))
            .query(&[("q", query), ("limit", limit.as_str())]);
        self.send(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status: StatusCode::from_u16(code).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_created_id() {
        let res = response(201, r#"{"code":201,"message":"Created","payload":{"id":"10.34847/nkl.abc"}}"#);
        assert_eq!(res.created_id().as_deref(), Some("10.34847/nkl.abc"));
        assert_eq!(response(201, "not json").created_id(), None);
        assert_eq!(response(201, r#"{"payload":{}}"#).created_id(), None);
    }

    #[test]
    fn test_expect_statuses() {
        assert!(response(204, "").expect(&[200, 204]).is_ok());
        match response(422, "nope").expect(&[204]) {
            Err(NakalaError::UnexpectedStatus { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.code())),
        }
    }

    #[test]
    fn test_body_excerpt_respects_chars() {
        assert_eq!(response(400, "ééééé").body_excerpt(3), "ééé");
    }

    #[test]
    fn test_unsupported_method_is_rejected_before_sending() {
        let client = ApiClient::new("http://127.0.0.1:9", "key").unwrap();
        let err = client.request("TRACE", "/datas", None).unwrap_err();
        assert!(matches!(err, NakalaError::UnsupportedMethod(m) if m == "TRACE"));
    }

    #[test]
    fn test_invalid_api_key() {
        assert!(matches!(
            ApiClient::new("http://localhost", "bad\nkey"),
            Err(NakalaError::InvalidApiKey(_))
        ));
    }
}
