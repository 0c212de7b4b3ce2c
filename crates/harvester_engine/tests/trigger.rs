use harvester_core::{CommentId, CrawlSession};
use harvester_engine::{
    ApiClient, FetchSettings, MainListingTrigger, SessionHandle, ThreadContext, TopLevelSource,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reply(rpid: u64, rcount: u64) -> Value {
    json!({
        "rpid": rpid,
        "rcount": rcount,
        "ctime": 1_700_000_000,
        "like": 1,
        "member": { "uname": format!("user{rpid}") },
        "content": { "message": format!("comment {rpid}") }
    })
}

async fn mount_listing(server: &MockServer, cursor: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/x/v2/reply/main"))
        .and(query_param("oid", "170001"))
        .and(query_param("mode", "3"))
        .and(query_param("next", cursor))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn trigger_for(server: &MockServer, session: &SessionHandle) -> MainListingTrigger {
    let settings = FetchSettings {
        api_base: server.uri(),
        ..FetchSettings::default()
    };
    MainListingTrigger::new(
        ApiClient::new(settings).expect("client"),
        ThreadContext::new("170001"),
        session.clone(),
    )
}

#[tokio::test]
async fn follows_the_cursor_until_the_listing_ends() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "0",
        json!({
            "code": 0,
            "message": "0",
            "data": {
                "cursor": { "is_end": false, "next": 2 },
                "replies": [reply(11, 4), reply(12, 0)]
            }
        }),
    )
    .await;
    mount_listing(
        &server,
        "2",
        json!({
            "code": 0,
            "message": "0",
            "data": {
                "cursor": { "is_end": true, "next": 3 },
                "replies": [reply(12, 0), reply(13, 1)]
            }
        }),
    )
    .await;
    let session = SessionHandle::new(CrawlSession::new(5));
    let trigger = trigger_for(&server, &session);

    trigger.trigger_more().await.expect("first page");
    assert_eq!(session.root_count(), 2);
    assert!(!trigger.is_exhausted());

    trigger.trigger_more().await.expect("second page");
    assert_eq!(session.root_count(), 3);
    assert!(trigger.is_exhausted());

    trigger.trigger_more().await.expect("exhausted is a no-op");
    assert_eq!(session.root_count(), 3);

    let hint = session.with(|s| s.store().get(CommentId(11)).and_then(|r| r.reply_count_hint));
    assert_eq!(hint, Some(4));
}

#[tokio::test]
async fn empty_listing_exhausts_and_rewind_starts_over() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "0",
        json!({
            "code": 0,
            "message": "0",
            "data": { "cursor": { "is_end": false, "next": 1 }, "replies": [] }
        }),
    )
    .await;
    let session = SessionHandle::new(CrawlSession::new(5));
    let trigger = trigger_for(&server, &session);

    trigger.trigger_more().await.expect("listing");
    assert!(trigger.is_exhausted());

    trigger.rewind();
    assert!(!trigger.is_exhausted());
}

#[tokio::test]
async fn upstream_errors_leave_the_cursor_in_place() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "0",
        json!({ "code": -352, "message": "risk control", "data": null }),
    )
    .await;
    let session = SessionHandle::new(CrawlSession::new(5));
    let trigger = trigger_for(&server, &session);

    assert!(trigger.trigger_more().await.is_err());
    assert!(trigger.trigger_more().await.is_err());
    assert!(!trigger.is_exhausted());
    assert_eq!(session.root_count(), 0);
}
