use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use serde::de::DeserializeOwned;

// ============================================================================
// Request Builders
// ============================================================================

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Asserts the status and decodes the JSON body
pub async fn read_json<T: DeserializeOwned>(response: Response, expected: StatusCode) -> T {
    assert_eq!(response.status(), expected, "unexpected status code");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
