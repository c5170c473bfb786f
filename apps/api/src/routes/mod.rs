pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assessment::handlers as assessment;
use crate::ingest::handlers as ingest;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        // Document ingest
        .route("/api/parse-resume", post(ingest::handle_parse_resume))
        .route("/api/resume/upload", post(ingest::handle_resume_upload))
        // Assessments
        .route(
            "/api/career-assessment",
            post(assessment::handle_career_assessment),
        )
        .route(
            "/api/assessments/latest",
            get(assessment::handle_latest_assessment),
        )
        // Profile
        .route("/api/sync-profile", post(profile::handle_sync_profile))
        .route("/api/profile", get(profile::handle_get_profile))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;
    use crate::ingest::decoder::tests::text_pdf;
    use crate::profile::memory::InMemoryProfileStore;

    const BOUNDARY: &str = "careerfit-test-boundary";

    fn app() -> Router {
        let state = AppState::new(test_config(), Arc::new(InMemoryProfileStore::new())).unwrap();
        build_router(state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, content_type, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "careerfit-api");
    }

    #[tokio::test]
    async fn test_sync_then_read_profile() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/sync-profile",
                json!({
                    "user_id": "u-1",
                    "profile": {
                        "bio": "Engineer",
                        "education": [{"degree": "BS CS", "institution": "Test Univ", "year": 2024}],
                        "goals": {"target_role": "SRE"}
                    },
                    "skills": ["Python", "Flask"]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let (status, body) = send(&app, get_request("/api/profile?user_id=u-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skills"], json!(["flask", "python"]));
        assert_eq!(body["education"][0]["year"], "2024");
        assert_eq!(body["goals"]["target_role"], "SRE");
    }

    #[tokio::test]
    async fn test_sync_validation_error_body() {
        let (status, body) = send(
            &app(),
            json_request(
                Method::POST,
                "/api/sync-profile",
                json!({"user_id": "", "skills": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "validation_error");
        assert!(body["error"].as_str().unwrap().contains("user_id"));
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let (status, body) = send(&app(), get_request("/api/profile?user_id=nobody")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "not_found");
    }

    #[tokio::test]
    async fn test_career_assessment_is_recorded() {
        let app = app();
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/career-assessment",
                json!({
                    "user_id": "u-1",
                    "target_role": "Data Scientist",
                    "resume_text": "Experienced data analyst with Python skills"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 90);
        assert_eq!(body["feedback"]["keywords"]["present"], json!(["data"]));
        assert_eq!(body["feedback"]["keywords"]["missing"], json!(["scientist"]));
        assert_eq!(body["feedback"]["strengths"].as_array().unwrap().len(), 3);

        let (status, latest) = send(&app, get_request("/api/assessments/latest?user_id=u-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["id"], body["id"]);
        assert_eq!(latest["score"], 90);
    }

    #[tokio::test]
    async fn test_career_assessment_rejects_blank_role() {
        let (status, body) = send(
            &app(),
            json_request(
                Method::POST,
                "/api/career-assessment",
                json!({"user_id": "u-1", "target_role": "  ", "resume_text": "Rust"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_latest_assessment_missing() {
        let (status, _) = send(&app(), get_request("/api/assessments/latest?user_id=u-9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_parse_resume_rejects_non_pdf() {
        let request = multipart_request(
            "/api/parse-resume",
            &[Part::File("file", "text/plain", b"Skills: Rust")],
        );
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["type"], "unsupported_format");
    }

    #[tokio::test]
    async fn test_parse_resume_requires_file_part() {
        let request = multipart_request("/api/parse-resume", &[Part::Text("other", "x")]);
        let (status, _) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_corrupt_pdf() {
        let request = multipart_request(
            "/api/resume/upload",
            &[
                Part::Text("user_id", "u-1"),
                Part::Text("role", "Rust Engineer"),
                Part::File("resume", "application/pdf", b"%PDF-1.7 truncated"),
            ],
        );
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["type"], "corrupt_document");
    }

    #[tokio::test]
    async fn test_upload_runs_full_pipeline() {
        let app = app();
        let pdf = text_pdf("Rust Engineer");
        let request = multipart_request(
            "/api/resume/upload",
            &[
                Part::Text("user_id", "u-1"),
                Part::Text("role", "Rust Engineer"),
                Part::File("resume", "application/pdf", &pdf),
            ],
        );
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assessment"]["score"], 95);
        assert_eq!(body["extraction_degraded"], false);
        assert_eq!(body["sync"]["user_id"], "u-1");

        let (status, profile) = send(&app, get_request("/api/profile?user_id=u-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["latest_assessment_id"], body["assessment"]["id"]);
    }
}
