use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn clean_form_navigates_immediately() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;

    let res = app
        .post(&routes::navigate(&id), &json!({ "target": "/admin/news" }))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["outcome"], "navigated");
    assert_eq!(res.body["target"], "/admin/news");
    assert_eq!(res.body["session"]["location"], "/admin/news");
    assert!(res.body["session"]["pending_target"].is_null());
}

#[tokio::test]
async fn dirty_form_requires_confirmation() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    app.upload_image(&id, "img1.png").await;

    let res = app
        .post(&routes::navigate(&id), &json!({ "target": "/admin/news" }))
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["outcome"], "confirmation_required");
    assert_eq!(res.body["session"]["pending_target"], "/admin/news");
    assert_eq!(res.body["session"]["location"], "/admin/news/1");
}

#[tokio::test]
async fn latest_target_wins() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    app.put(&routes::dirty(&id), &json!({ "dirty": true })).await;

    app.post(&routes::navigate(&id), &json!({ "target": "/a" })).await;
    app.post(&routes::navigate(&id), &json!({ "target": "/b" })).await;

    let res = app.post_empty(&routes::confirm(&id)).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["target"], "/b");
    assert_eq!(res.body["session"]["location"], "/b");
}

#[tokio::test]
async fn confirm_discards_uploads_then_navigates() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    let url = app.upload_image(&id, "img1.png").await;
    app.post(&routes::navigate(&id), &json!({ "target": "/list" }))
        .await;

    let res = app.post_empty(&routes::confirm(&id)).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["target"], "/list");
    assert_eq!(res.strings("/report/deleted"), vec![url.clone()]);
    assert_eq!(res.body["session"]["location"], "/list");
    assert_eq!(res.body["session"]["dirty"], false);
    assert!(res.body["session"]["pending_target"].is_null());
    assert_eq!(app.fetch_media(&url).await.status, 404);
}

#[tokio::test]
async fn cancel_keeps_uploads_and_dirty_flag() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    let url = app.upload_image(&id, "img1.png").await;
    app.post(&routes::navigate(&id), &json!({ "target": "/list" }))
        .await;

    let res = app.post_empty(&routes::cancel(&id)).await;

    assert_eq!(res.status, 200);
    assert!(res.body["pending_target"].is_null());
    assert_eq!(res.body["dirty"], true);
    assert_eq!(res.body["location"], "/admin/news/1");
    assert_eq!(res.strings("/tracked_uploads"), vec![url.clone()]);
    assert_eq!(app.fetch_media(&url).await.status, 200);
}

#[tokio::test]
async fn confirm_without_pending_navigation_conflicts() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    let url = app.upload_image(&id, "img1.png").await;

    let res = app.post_empty(&routes::confirm(&id)).await;

    assert_eq!(res.status, 409);
    assert_eq!(res.error_code(), "CONFLICT");
    assert_eq!(app.fetch_media(&url).await.status, 200);
}

#[tokio::test]
async fn navigate_rejects_relative_target() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;

    let res = app
        .post(&routes::navigate(&id), &json!({ "target": "" }))
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn history_on_clean_form_proceeds() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;

    let res = app
        .post(
            &routes::history(&id),
            &json!({ "leaving": "/admin/news/1", "destination": "/admin/news", "confirmed": false }),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["decision"], "proceed");
    assert!(res.body["location"].is_null());
    assert_eq!(res.body["session"]["location"], "/admin/news");
}

#[tokio::test]
async fn history_declined_pins_location_back() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    app.put(&routes::dirty(&id), &json!({ "dirty": true })).await;

    let res = app
        .post(
            &routes::history(&id),
            &json!({ "leaving": "/admin/news/1", "destination": "/admin/news", "confirmed": false }),
        )
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["decision"], "repinned");
    assert_eq!(res.body["location"], "/admin/news/1");
    assert_eq!(res.body["session"]["dirty"], true);
    assert_eq!(res.body["session"]["location"], "/admin/news/1");
}

#[tokio::test]
async fn repeated_history_declines_keep_one_entry() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    app.put(&routes::dirty(&id), &json!({ "dirty": true })).await;

    for _ in 0..3 {
        let res = app
            .post(
                &routes::history(&id),
                &json!({ "leaving": "/admin/news/1", "destination": "/admin/news", "confirmed": false }),
            )
            .await;
        assert_eq!(res.body["decision"], "repinned");
    }

    let session = app.sessions.get(id.parse().unwrap()).unwrap();
    let session = session.lock().await;
    assert_eq!(session.changes().navigator().history(), ["/admin/news/1"]);
}

#[tokio::test]
async fn history_requires_absolute_destination() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;

    let res = app
        .post(
            &routes::history(&id),
            &json!({ "leaving": "/admin/news/1", "destination": "admin/news" }),
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn history_confirmed_clears_dirty_flag() {
    let app = TestApp::spawn().await;
    let id = app.open_session("/admin/news/1").await;
    app.put(&routes::dirty(&id), &json!({ "dirty": true })).await;

    let res = app
        .post(
            &routes::history(&id),
            &json!({ "leaving": "/admin/news/1", "destination": "/admin/news", "confirmed": true }),
        )
        .await;

    assert_eq!(res.body["decision"], "proceed");
    assert_eq!(res.body["session"]["dirty"], false);
    assert_eq!(res.body["session"]["block_exit"], false);
    assert_eq!(res.body["session"]["location"], "/admin/news");
}
