//! Defines the HTTP surface of the service.
//!
//! ## Structure
//! - `POST /api/upload-zip` — multipart upload (field `zipFile`) of one `.zip`
//!   archive, extracted under the uploads directory
//! - `GET  /api/files` — JSON array of entry names in the downloads directory
//! - `GET  /files/{*path}` — static files from the downloads directory
//! - `GET  /healthz`, `GET /readyz` — liveness and readiness probes
//!
//! Every route allows cross-origin requests.

use crate::{
    handlers::{
        file_handlers::list_files,
        health_handlers::{healthz, readyz},
        upload_handlers::upload_zip,
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Build the application router.
///
/// `body_limit_bytes` caps the size of an uploaded archive.
pub fn routes(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/upload-zip", post(upload_zip))
        .route("/api/files", get(list_files))
        .nest_service("/files", ServeDir::new(&state.downloads_dir))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::{fs, io::Cursor, io::Write, path::Path};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use zip::write::SimpleFileOptions;

    const BOUNDARY: &str = "content-sync-test-boundary";

    struct TestApp {
        _tmp: TempDir,
        state: AppState,
        router: Router,
    }

    fn test_app() -> TestApp {
        test_app_with_limit(10 * 1024 * 1024)
    }

    fn test_app_with_limit(body_limit_bytes: usize) -> TestApp {
        let tmp = TempDir::new().unwrap();
        let state = AppState::new(tmp.path().join("downloads"), tmp.path().join("uploads"));
        fs::create_dir_all(&state.downloads_dir).unwrap();
        fs::create_dir_all(&state.uploads_dir).unwrap();
        let router = routes(state.clone(), body_limit_bytes);
        TestApp {
            _tmp: tmp,
            state,
            router,
        }
    }

    fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Multipart body with one part per `(field, file name, content)`.
    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/upload-zip")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn uploads_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn upload_extracts_nested_archive() {
        let app = test_app();
        let archive = zip_bytes(&[("a.txt", b"alpha"), ("sub/b.txt", b"beta")]);
        let body = multipart_body(&[("zipFile", Some("sample.zip"), &archive)]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let extracted_to = app.state.uploads_dir.join("sample");
        assert_eq!(
            json_body(response).await,
            json!({
                "message": "ZIP file uploaded and extracted successfully",
                "extractedTo": extracted_to.display().to_string()
            })
        );
        assert_eq!(fs::read(extracted_to.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(extracted_to.join("sub/b.txt")).unwrap(), b"beta");
        assert_eq!(
            fs::read(app.state.uploads_dir.join("sample.zip")).unwrap(),
            archive
        );
    }

    #[tokio::test]
    async fn upload_accepts_uppercase_extension_and_sanitizes_entries() {
        let app = test_app();
        let archive = zip_bytes(&[("what?.txt", b"q")]);
        let body = multipart_body(&[("zipFile", Some("Mixed.ZIP"), &archive)]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let extracted = app.state.uploads_dir.join("Mixed");
        assert_eq!(fs::read(extracted.join("what_.txt")).unwrap(), b"q");
    }

    #[tokio::test]
    async fn upload_without_zip_field_is_bad_request() {
        let app = test_app();
        let body = multipart_body(&[("note", None, b"hello")]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "No ZIP file uploaded" })
        );
        assert!(uploads_entries(&app.state.uploads_dir).is_empty());
    }

    #[tokio::test]
    async fn upload_with_wrong_extension_stores_nothing() {
        let app = test_app();
        for name in ["notes.txt", "archive.tar.gz", "zip", "sample.zip.exe"] {
            let body = multipart_body(&[("zipFile", Some(name), b"PK-not-really")]);

            let response = send(&app.router, upload_request(body)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name}");
            assert_eq!(
                json_body(response).await,
                json!({ "error": "Only ZIP files are allowed" })
            );
        }
        assert!(uploads_entries(&app.state.uploads_dir).is_empty());
    }

    #[tokio::test]
    async fn upload_rejects_path_like_file_names() {
        let app = test_app();
        let archive = zip_bytes(&[("a.txt", b"a")]);
        let body = multipart_body(&[("zipFile", Some("../escape.zip"), &archive)]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!app._tmp.path().join("escape.zip").exists());
        assert!(uploads_entries(&app.state.uploads_dir).is_empty());
    }

    #[tokio::test]
    async fn upload_over_body_limit_is_payload_too_large() {
        let app = test_app_with_limit(1024);
        let oversized = vec![7u8; 4096];
        let body = multipart_body(&[("zipFile", Some("big.zip"), &oversized)]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "ZIP file too large");
        assert!(uploads_entries(&app.state.uploads_dir).is_empty());
    }

    #[tokio::test]
    async fn corrupt_archive_reports_extraction_failure() {
        let app = test_app();
        let body = multipart_body(&[("zipFile", Some("broken.zip"), b"not a zip at all")]);

        let response = send(&app.router, upload_request(body)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Failed to extract ZIP file");
        assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
        assert!(app.state.uploads_dir.join("broken.zip").is_file());
    }

    #[tokio::test]
    async fn repeated_upload_overwrites_archive() {
        let app = test_app();
        let first = zip_bytes(&[("a.txt", b"one")]);
        let second = zip_bytes(&[("a.txt", b"two")]);

        for archive in [&first, &second] {
            let body = multipart_body(&[("zipFile", Some("same.zip"), archive)]);
            let response = send(&app.router, upload_request(body)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(
            fs::read(app.state.uploads_dir.join("same.zip")).unwrap(),
            second
        );
        assert_eq!(
            fs::read(app.state.uploads_dir.join("same/a.txt")).unwrap(),
            b"two"
        );
    }

    #[tokio::test]
    async fn list_files_is_stable_between_calls() {
        let app = test_app();
        fs::write(app.state.downloads_dir.join("b.txt"), b"b").unwrap();
        fs::write(app.state.downloads_dir.join("a.txt"), b"a").unwrap();
        fs::create_dir(app.state.downloads_dir.join("folder")).unwrap();

        let first = json_body(send(&app.router, get("/api/files")).await).await;
        let second = json_body(send(&app.router, get("/api/files")).await).await;

        assert_eq!(first, json!(["a.txt", "b.txt", "folder"]));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_files_hides_scratch_files() {
        let app = test_app();
        fs::write(app.state.downloads_dir.join("done.txt"), b"d").unwrap();
        fs::write(app.state.downloads_dir.join(".tmp-1234"), b"partial").unwrap();
        fs::write(app.state.downloads_dir.join(".readyz-5678"), b"readyz").unwrap();

        let listed = json_body(send(&app.router, get("/api/files")).await).await;

        assert_eq!(listed, json!(["done.txt"]));
    }

    #[tokio::test]
    async fn list_files_fails_when_directory_is_missing() {
        let app = test_app();
        fs::remove_dir_all(&app.state.downloads_dir).unwrap();

        let response = send(&app.router, get("/api/files")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Failed to list files");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn static_files_are_served_from_downloads() {
        let app = test_app();
        fs::write(app.state.downloads_dir.join("hello.txt"), b"hi there").unwrap();

        let response = send(&app.router, get("/files/hello.txt")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"hi there");

        let missing = send(&app.router, get("/files/absent.txt")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_headers_are_present() {
        let app = test_app();
        let request = Request::builder()
            .uri("/api/files")
            .header(header::ORIGIN, "https://example.com")
            .body(Body::empty())
            .unwrap();

        let response = send(&app.router, request).await;

        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[tokio::test]
    async fn health_probes_report_ok() {
        let app = test_app();

        let health = send(&app.router, get("/healthz")).await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(json_body(health).await, json!({ "status": "ok" }));

        let ready = send(&app.router, get("/readyz")).await;
        assert_eq!(ready.status(), StatusCode::OK);
        let body = json_body(ready).await;
        assert_eq!(body["checks"]["downloads"]["ok"], true);
        assert_eq!(body["checks"]["uploads"]["ok"], true);
    }

    #[tokio::test]
    async fn readiness_fails_without_uploads_directory() {
        let app = test_app();
        fs::remove_dir_all(&app.state.uploads_dir).unwrap();

        let ready = send(&app.router, get("/readyz")).await;

        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(ready).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["checks"]["uploads"]["ok"], false);
    }
}
