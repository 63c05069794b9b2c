// tests/providers.rs
// Adapter parsers against recorded API responses.

use chrono::{TimeZone, Utc};
use lead_scanner::matcher::match_keyword;
use lead_scanner::sources::discord::{parse_event, GatewayEvent};
use lead_scanner::sources::github::GitHubAdapter;
use lead_scanner::sources::hackernews::HackerNewsAdapter;
use lead_scanner::sources::reddit::RedditAdapter;
use lead_scanner::sources::stackoverflow::StackOverflowAdapter;

const GITHUB: &str = include_str!("fixtures/github_search.json");
const STACKOVERFLOW: &str = include_str!("fixtures/so_questions.json");
const HACKERNEWS: &str = include_str!("fixtures/hn_search.json");
const REDDIT: &str = include_str!("fixtures/reddit_new.xml");

#[test]
fn github_search_maps_issues() {
    let items = GitHubAdapter::parse_search(GITHUB).expect("parse github");
    assert_eq!(items.len(), 2);

    let first = &items[0];
    assert_eq!(first.source_id, "gh_2451337001");
    assert_eq!(first.url, "https://github.com/example/app/issues/4412");
    assert_eq!(
        first.created_at,
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 12, 44).unwrap()
    );
    assert_eq!(
        match_keyword(&first.search_text(), &["TurboModuleRegistry.getEnforcing"]),
        Some("TurboModuleRegistry.getEnforcing")
    );

    // null body becomes empty content
    assert_eq!(items[1].content, "");
}

#[test]
fn stackoverflow_questions_are_decoded() {
    let items = StackOverflowAdapter::parse_questions(STACKOVERFLOW).expect("parse so");
    assert_eq!(items.len(), 1);

    let q = &items[0];
    assert_eq!(q.source_id, "so_79011234");
    assert_eq!(
        q.title,
        "Undefined symbols for architecture arm64 with \"RCTBridge\" after pod install"
    );
    assert!(!q.content.contains("<p>"));
    assert!(q.content.contains("\"_OBJC_CLASS_$_RCTBridge\""));
    assert_eq!(q.created_at.timestamp(), 1_760_520_000);
}

#[test]
fn hackernews_hits_link_to_item_pages() {
    let items = HackerNewsAdapter::parse_hits(HACKERNEWS).expect("parse hn");
    assert_eq!(items.len(), 2, "untitled hits are skipped");

    assert_eq!(items[0].source_id, "hn_41877001");
    assert_eq!(items[0].url, "https://news.ycombinator.com/item?id=41877001");
    assert_eq!(
        items[0].content,
        "Execution failed for task ':app:mergeExtDexDebug'"
    );

    // link posts keep the outbound url as content
    assert_eq!(items[1].content, "https://example.com/hermes-profiler");
}

#[test]
fn reddit_feed_strips_prefix_and_markup() {
    let items = RedditAdapter::parse_feed(REDDIT).expect("parse reddit");
    assert_eq!(items.len(), 1, "entries without a link are skipped");

    let post = &items[0];
    assert_eq!(post.source_id, "rd_1g4abcd");
    assert_eq!(post.title, "Android release build crashes with JNI error");
    assert_eq!(
        post.url,
        "https://www.reddit.com/r/reactnative/comments/1g4abcd/jni_crash/"
    );
    assert_eq!(
        post.content,
        "JNI DETECTED ERROR IN APPLICATION: use of deleted global reference"
    );
    assert_eq!(
        post.created_at,
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 57, 30).unwrap()
    );
}

#[test]
fn garbage_bodies_are_errors() {
    assert!(GitHubAdapter::parse_search("<html>rate limited</html>").is_err());
    assert!(StackOverflowAdapter::parse_questions("").is_err());
    assert!(HackerNewsAdapter::parse_hits("{").is_err());
}

#[test]
fn gateway_message_becomes_item() {
    let raw = r#"{"op":0,"s":7,"t":"MESSAGE_CREATE","d":{
        "id":"1290000000000000001","channel_id":"555","guild_id":"42",
        "content":"No visible @interface for 'RCTBridge' declares the selector",
        "timestamp":"2026-10-15T10:00:00.000000+00:00",
        "author":{"id":"9","username":"ana","bot":false}}}"#;
    match parse_event(raw).expect("parse") {
        GatewayEvent::Message { item, from_bot, channel_id, .. } => {
            assert!(!from_bot);
            assert_eq!(channel_id, "555");
            assert_eq!(item.source_id, "dc_1290000000000000001");
            assert_eq!(
                item.url,
                "https://discord.com/channels/42/555/1290000000000000001"
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}
