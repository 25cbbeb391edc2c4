//! The HTTP surface, driven through the router without a socket.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestLibrary, jpeg, library, library_with, png};
use http_body_util::BodyExt;
use media_library::{config::LibraryConfig, routes::routes::routes};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "media-library-test-boundary";

fn app(test: &TestLibrary) -> Router {
    routes(test.library.config().max_upload_bytes).with_state(test.library.clone())
}

/// `(field name, filename, content type, bytes)` parts as multipart/form-data.
fn multipart(parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    multipart_to("POST", "/assets", parts)
}

fn multipart_to(method: &str, uri: &str, parts: &[(&str, &str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, content_type, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoints_respond() {
    let test = library().await;
    let app = app(&test);

    let (status, body) = send_json(&app, empty("GET", "/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send_json(&app, empty("GET", "/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["disk"]["ok"], true);
}

#[tokio::test]
async fn upload_serve_convert_and_delete() {
    let test = library().await;
    let app = app(&test);
    let bytes = png(32, 16);

    let (status, asset) = send_json(
        &app,
        multipart(&[("file", "photo.png", "image/png", bytes.as_slice())]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(asset["filename"], "photo.png");
    assert_eq!(asset["mimeType"], "image/png");
    assert_eq!(asset["width"], 32);
    assert!(asset.get("storageKey").is_none());
    let id = asset["id"].as_str().unwrap().to_string();
    let checksum = asset["checksum"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(empty("GET", &format!("/assets/{}/original", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::ETAG],
        format!("\"{}\"", checksum).as_str()
    );
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(served.as_ref(), bytes.as_slice());

    let (status, variant) = send_json(
        &app,
        empty("POST", &format!("/assets/{}/convert-webformat?width=16", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(variant["kind"], "web-16");
    assert_eq!(variant["height"], 8);

    let response = app
        .clone()
        .oneshot(empty("GET", &format!("/assets/{}/variants/web-16", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");

    let (status, summary) = send_json(&app, empty("GET", &format!("/assets/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary["previewUrl"],
        format!("/assets/{}/variants/web-16", id)
    );
    assert_eq!(summary["duplicateCount"], 0);

    for _ in 0..2 {
        let (status, _) = send(&app, empty("DELETE", &format!("/assets/{}", id))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (status, body) = send_json(&app, empty("GET", &format!("/assets/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn upload_rejections_map_to_statuses() {
    let config = LibraryConfig {
        max_upload_bytes: 200,
        ..LibraryConfig::default()
    };
    let test = library_with(config).await;
    let app = app(&test);

    let (status, body) = send_json(
        &app,
        multipart(&[("file", "notes.txt", "text/plain", b"hello".as_slice())]),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["kind"], "InvalidFormat");

    let big = jpeg(128, 128);
    let (status, body) = send_json(
        &app,
        multipart(&[("file", "big.jpg", "image/jpeg", big.as_slice())]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["kind"], "TooLarge");

    let (status, _) = send_json(&app, multipart(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, empty("GET", "/assets/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_upload_reports_per_file() {
    let test = library().await;
    let app = app(&test);
    let good = png(4, 4);

    let (status, outcomes) = send_json(
        &app,
        multipart_to(
            "POST",
            "/assets/bulk",
            &[
                ("file", "a.png", "image/png", good.as_slice()),
                ("file", "b.txt", "text/plain", b"nope".as_slice()),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcomes[0]["status"], "ingested");
    assert_eq!(outcomes[0]["asset"]["filename"], "a.png");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[1]["reason"], "InvalidFormat");
    assert_eq!(outcomes[1]["filename"], "b.txt");
}

#[tokio::test]
async fn bulk_upload_caps_each_part_at_the_upload_ceiling() {
    let config = LibraryConfig {
        max_upload_bytes: 200,
        ..LibraryConfig::default()
    };
    let test = library_with(config).await;
    let app = app(&test);
    let small = png(2, 2);
    let big = jpeg(256, 256);
    assert!(small.len() <= 200 && big.len() > 200);

    let (status, outcomes) = send_json(
        &app,
        multipart_to(
            "POST",
            "/assets/bulk",
            &[
                ("file", "big.jpg", "image/jpeg", big.as_slice()),
                ("file", "small.png", "image/png", small.as_slice()),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcomes[0]["status"], "failed");
    assert_eq!(outcomes[0]["reason"], "TooLarge");
    assert_eq!(outcomes[1]["status"], "ingested");
    assert_eq!(outcomes[1]["asset"]["sizeBytes"], small.len());
}

#[tokio::test]
async fn replace_via_put_keeps_the_id() {
    let test = library().await;
    let app = app(&test);
    let first = png(4, 4);

    let (_, asset) = send_json(
        &app,
        multipart(&[("file", "a.png", "image/png", first.as_slice())]),
    )
    .await;
    let id = asset["id"].as_str().unwrap().to_string();

    let second = jpeg(8, 8);
    let (status, replaced) = send_json(
        &app,
        multipart_to(
            "PUT",
            &format!("/assets/{}", id),
            &[("file", "b.jpg", "image/jpeg", second.as_slice())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["id"], id.as_str());
    assert_eq!(replaced["mimeType"], "image/jpeg");
    assert_ne!(replaced["checksum"], asset["checksum"]);
}

#[tokio::test]
async fn taxonomy_and_patch_round_trip() {
    let test = library().await;
    let app = app(&test);

    let (status, folder) =
        send_json(&app, json_request("POST", "/folders", json!({ "name": "Hero" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, tag) = send_json(&app, json_request("POST", "/tags", json!({ "name": "summer" }))).await;

    let bytes = png(4, 4);
    let (_, asset) = send_json(
        &app,
        multipart(&[("file", "a.png", "image/png", bytes.as_slice())]),
    )
    .await;
    let id = asset["id"].as_str().unwrap().to_string();

    let (status, patched) = send_json(
        &app,
        json_request(
            "PATCH",
            &format!("/assets/{}", id),
            json!({ "filename": "hero.png", "folderId": folder["id"], "tagIds": [tag["id"]] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["filename"], "hero.png");
    assert_eq!(patched["folderId"], folder["id"]);
    assert_eq!(patched["tagIds"], json!([tag["id"]]));

    let (_, folders) = send_json(&app, empty("GET", "/folders")).await;
    assert_eq!(folders[0]["assetCount"], 1);

    let (status, page) = send_json(
        &app,
        empty(
            "GET",
            &format!("/assets?folderId={}&query=HERO&pageSize=5", folder["id"]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["pagination"]["pageSize"], 5);
    assert_eq!(page["items"][0]["id"], id.as_str());

    let (status, patched) = send_json(
        &app,
        json_request("PATCH", &format!("/assets/{}", id), json!({ "folderId": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["folderId"], Value::Null);
    assert_eq!(patched["filename"], "hero.png");

    let folder_uri = format!("/folders/{}", folder["id"]);
    let (status, _) = send(&app, empty("DELETE", &folder_uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, empty("DELETE", &folder_uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, empty("DELETE", &format!("/tags/{}", tag["id"]))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, tags) = send_json(&app, empty("GET", "/tags")).await;
    assert_eq!(tags, json!([]));
}

#[tokio::test]
async fn batch_endpoint_reports_partial_failure() {
    let test = library().await;
    let app = app(&test);
    let bytes = png(4, 4);
    let (_, asset) = send_json(
        &app,
        multipart(&[("file", "a.png", "image/png", bytes.as_slice())]),
    )
    .await;
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, result) = send_json(
        &app,
        json_request(
            "POST",
            "/assets/batch",
            json!({ "op": "download", "assetIds": [asset["id"], missing], "params": { "inline": true } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["succeeded"], json!([asset["id"]]));
    assert_eq!(result["failed"][0]["id"], missing.as_str());
    assert_eq!(result["failed"][0]["reason"], "NotFound");
    assert!(result["downloads"][0]["data"].is_string());

    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/assets/batch",
            json!({ "op": "tag", "assetIds": [asset["id"]] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidInput");

    let (status, result) = send_json(
        &app,
        json_request(
            "POST",
            "/assets/batch",
            json!({ "op": "delete", "assetIds": [asset["id"]] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["succeeded"], json!([asset["id"]]));
    assert_eq!(result["failed"], json!([]));
}

#[tokio::test]
async fn dedup_rebuild_endpoint_counts_checksums() {
    let test = library().await;
    let app = app(&test);
    let bytes = png(4, 4);
    for name in ["a.png", "b.png"] {
        send(
            &app,
            multipart(&[("file", name, "image/png", bytes.as_slice())]),
        )
        .await;
    }

    let (status, body) = send_json(&app, empty("POST", "/dedup/rebuild")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checksums"], 1);

    let (_, page) = send_json(&app, empty("GET", "/assets")).await;
    assert_eq!(page["items"][0]["duplicateCount"], 1);
    assert_eq!(page["items"][1]["duplicateCount"], 1);
}
