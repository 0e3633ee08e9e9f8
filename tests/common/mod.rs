//! Shared harness for integration tests: services wired against a mock API.

use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use scrittoio::application::moderation::ModerationService;
use scrittoio::application::notify::{Notice, NoticeHub};
use scrittoio::application::publish::PublishService;
use scrittoio::application::store::PostStore;
use scrittoio::application::tracker::OperationTracker;
use scrittoio::domain::entities::{PostId, PostRecord};
use scrittoio::domain::types::PostStatus;
use scrittoio::infra::api::{ApiClient, StaticToken};
use tokio::sync::broadcast;

pub struct Harness {
    pub store: Arc<PostStore>,
    pub tracker: Arc<OperationTracker>,
    pub moderation: ModerationService,
    pub publish: PublishService,
    pub notice_rx: broadcast::Receiver<Notice>,
}

pub fn harness(server: &MockServer) -> Harness {
    let api = Arc::new(
        ApiClient::new(
            &server.base_url(),
            Arc::new(StaticToken::new("test-token")),
            Duration::from_secs(5),
        )
        .expect("client"),
    );
    let store = Arc::new(PostStore::new());
    let tracker = Arc::new(OperationTracker::new());
    let notices = NoticeHub::new();
    let notice_rx = notices.subscribe();

    let moderation = ModerationService::new(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&api),
        notices.clone(),
    );
    let publish = PublishService::new(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&api),
        notices,
        format!("{}/", server.base_url()),
    );

    Harness {
        store,
        tracker,
        moderation,
        publish,
        notice_rx,
    }
}

pub fn record(id: &str, status: PostStatus, is_deleted: bool) -> PostRecord {
    PostRecord {
        id: PostId::from(id),
        title: format!("Post {id}"),
        slug: format!("post-{id}"),
        summary: None,
        tags: Vec::new(),
        raw_html: String::from("<p>hello</p>"),
        body_html: None,
        status,
        is_deleted,
        cover_image: None,
        created_at: None,
        updated_at: None,
        published_at: None,
    }
}

/// Drain every queued notice without waiting.
pub fn drain_notices(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
