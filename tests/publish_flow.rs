//! Publish pipeline flows against a mock API: best-effort cover stage,
//! required save and snapshot stages, and guard hygiene.

mod common;

use std::io::Write;

use httpmock::MockServer;
use serde_json::json;
use tempfile::NamedTempFile;

use common::{drain_notices, harness, record};
use scrittoio::application::notify::NoticeLevel;
use scrittoio::application::publish::{PublishError, PublishForm};
use scrittoio::application::tracker::OperationKind;
use scrittoio::domain::entities::PostId;
use scrittoio::domain::types::PostStatus;

fn form() -> PublishForm {
    PublishForm {
        title: "Hello World".to_string(),
        slug: String::new(),
        tags: vec!["rust".to_string()],
        summary: Some("A greeting.".to_string()),
        raw_html: "<p>Hi there.</p>".to_string(),
        cover_caption: None,
        staged_cover: None,
    }
}

fn staged_cover() -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("tmp cover");
    file.write_all(b"\x89PNG fake bytes").expect("write cover");
    file
}

#[tokio::test]
async fn publish_uploads_cover_saves_and_snapshots() {
    let server = MockServer::start();
    let h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    let cover_mock = server.mock(|when, then| {
        when.method("POST").path("/assets");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "asset_id": "c1",
                "public_link": format!("{}/media/c1.png", server.base_url())
            }));
    });
    let warmup_mock = server.mock(|when, then| {
        when.method("GET").path("/media/c1.png");
        then.status(200).body("png");
    });
    let save_mock = server.mock(|when, then| {
        when.method("PATCH")
            .path("/posts/p1")
            .json_body_partial(r#"{"title":"Hello World","slug":"hello-world","status":"draft"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "id": "p1",
                "title": "Hello World",
                "slug": "hello-world",
                "status": "draft"
            }));
    });
    let snapshot_mock = server.mock(|when, then| {
        when.method("POST").path("/assets/html");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "asset_id": "s1",
                "public_link": format!("{}/media/hello-world-post.html", server.base_url())
            }));
    });

    let cover = staged_cover();
    let mut editor = form();
    editor.staged_cover = Some(cover.path().to_path_buf());

    let outcome = h
        .publish
        .publish(&PostId::from("p1"), &editor)
        .await
        .expect("publish");

    assert!(outcome.preview_link.ends_with("/media/hello-world-post.html"));
    assert!(outcome.cover_failure.is_none());
    cover_mock.assert();
    warmup_mock.assert();
    save_mock.assert();
    snapshot_mock.assert();
}

#[tokio::test]
async fn failed_cover_upload_does_not_block_publishing() {
    let server = MockServer::start();
    let mut h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    let cover_mock = server.mock(|when, then| {
        when.method("POST").path("/assets");
        then.status(413)
            .header("content-type", "application/json")
            .json_body(json!({"detail": "image too large"}));
    });
    let save_mock = server.mock(|when, then| {
        when.method("PATCH").path("/posts/p1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"id": "p1", "title": "Hello World", "slug": "hello-world", "status": "draft"}));
    });
    let snapshot_mock = server.mock(|when, then| {
        when.method("POST").path("/assets/html");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"asset_id": "s1", "public_link": "http://cdn.example/snap.html"}));
    });

    let cover = staged_cover();
    let mut editor = form();
    editor.staged_cover = Some(cover.path().to_path_buf());

    let outcome = h
        .publish
        .publish(&PostId::from("p1"), &editor)
        .await
        .expect("publish succeeds without the cover");

    assert_eq!(outcome.preview_link, "http://cdn.example/snap.html");
    let failure = outcome.cover_failure.expect("cover failure is reported");
    assert!(failure.contains("image too large"));

    let notices = drain_notices(&mut h.notice_rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert_eq!(notices[0].context, "publish: cover image upload");

    cover_mock.assert();
    save_mock.assert();
    snapshot_mock.assert();
}

#[tokio::test]
async fn failed_save_aborts_before_the_snapshot() {
    let server = MockServer::start();
    let mut h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    let save_mock = server.mock(|when, then| {
        when.method("PATCH").path("/posts/p1");
        then.status(422)
            .header("content-type", "application/json")
            .json_body(json!({"detail": "slug already taken"}));
    });
    let snapshot_mock = server.mock(|when, then| {
        when.method("POST").path("/assets/html");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"asset_id": "s1", "public_link": "http://cdn.example/snap.html"}));
    });

    let err = h
        .publish
        .publish(&PostId::from("p1"), &form())
        .await
        .expect_err("save failure aborts");

    assert!(matches!(err, PublishError::Save(_)));
    assert_eq!(snapshot_mock.hits(), 0);
    save_mock.assert();

    // The guard is released on the failure path too.
    assert!(!h
        .tracker
        .is_active(&PostId::from("p1"), OperationKind::Publish));

    let notices = drain_notices(&mut h.notice_rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].context, "publish: save");
}

#[tokio::test]
async fn failed_snapshot_leaves_the_post_saved() {
    let server = MockServer::start();
    let mut h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    let save_mock = server.mock(|when, then| {
        when.method("PATCH").path("/posts/p1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"id": "p1", "title": "Hello World", "slug": "hello-world", "status": "draft"}));
    });
    let snapshot_mock = server.mock(|when, then| {
        when.method("POST").path("/assets/html");
        then.status(507)
            .header("content-type", "application/json")
            .json_body(json!({"detail": "storage full"}));
    });

    let err = h
        .publish
        .publish(&PostId::from("p1"), &form())
        .await
        .expect_err("snapshot failure aborts");

    assert!(matches!(err, PublishError::Snapshot(_)));
    save_mock.assert();
    snapshot_mock.assert();

    let notices = drain_notices(&mut h.notice_rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].context, "publish: snapshot upload");
}

#[tokio::test]
async fn concurrent_publish_is_rejected_while_in_flight() {
    let server = MockServer::start();
    let h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    assert!(h
        .tracker
        .begin(&PostId::from("p1"), OperationKind::Publish));

    let err = h
        .publish
        .publish(&PostId::from("p1"), &form())
        .await
        .expect_err("second publish is rejected");
    assert!(matches!(err, PublishError::Busy));

    h.tracker.end(&PostId::from("p1"), OperationKind::Publish);
}

#[tokio::test]
async fn save_draft_skips_cover_and_snapshot() {
    let server = MockServer::start();
    let h = harness(&server);
    h.store
        .replace_all(vec![record("p1", PostStatus::Draft, false)]);

    let save_mock = server.mock(|when, then| {
        when.method("PATCH")
            .path("/posts/p1")
            .json_body_partial(r#"{"status":"draft"}"#);
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"id": "p1", "title": "Hello World", "slug": "hello-world", "status": "draft"}));
    });
    let snapshot_mock = server.mock(|when, then| {
        when.method("POST").path("/assets/html");
        then.status(200).json_body(json!({"asset_id": "s", "public_link": "x"}));
    });

    let saved = h
        .publish
        .save_draft(&PostId::from("p1"), &form())
        .await
        .expect("draft saved");

    assert_eq!(saved.slug, "hello-world");
    assert_eq!(snapshot_mock.hits(), 0);
    save_mock.assert();
}
