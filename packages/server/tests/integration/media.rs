use crate::common::{TestApp, png_bytes};

#[tokio::test]
async fn missing_object_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app.get("/media/uploads/does-not-exist.png").await;

    assert_eq!(res.status, 404);
    assert_eq!(res.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn hidden_segments_are_rejected() {
    let app = TestApp::spawn().await;

    let res = app.get("/media/.tmp/anything").await;

    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn served_objects_are_cacheable() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    let url = app.upload_image(&id, "photo.png").await;

    let res = app.client.get(&url).send().await.unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let cache = res
        .headers()
        .get(reqwest::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cache.contains("max-age"));
    assert_eq!(res.bytes().await.unwrap().to_vec(), png_bytes());
}

#[tokio::test]
async fn openapi_document_lists_session_routes() {
    let app = TestApp::spawn().await;

    let res = app.get("/api-docs/openapi.json").await;

    assert_eq!(res.status, 200);
    assert!(res.body["paths"]["/api/v1/sessions/{id}/navigate/confirm"].is_object());
}
