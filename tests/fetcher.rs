use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use ytinsight::youtube::{Endpoints, TranscriptProvider, YouTubeScraper};
use ytinsight::{ErrorKind, UNKNOWN_TITLE, extract_video_id};

const CAPTIONS: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1">Hello &amp; welcome</text><text start="1" dur="1">to the show</text></transcript>"#;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn watch_page(addr: SocketAddr) -> String {
    format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"playabilityStatus": {{"status": "OK"}}, "captions": {{"playerCaptionsTracklistRenderer": {{"captionTracks": [{{"baseUrl": "http://{addr}/api/timedtext?lang=fr", "languageCode": "fr"}}, {{"baseUrl": "http://{addr}/api/timedtext?lang=en-US", "languageCode": "en-US"}}]}}}}}};</script></html>"#
    )
}

fn fake_youtube(page: fn(SocketAddr) -> String, oembed_ok: bool, addr_slot: Arc<std::sync::OnceLock<SocketAddr>>) -> Router {
    let page_slot = addr_slot.clone();
    Router::new()
        .route(
            "/watch",
            get(move |headers: HeaderMap| {
                let addr = *page_slot.get().unwrap();
                async move {
                    assert!(headers.get("user-agent").unwrap().to_str().unwrap().contains("Mozilla"));
                    assert_eq!(headers.get("accept-language").unwrap(), "en-US,en;q=0.9");
                    page(addr)
                }
            }),
        )
        .route(
            "/api/timedtext",
            get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
                match q.get("lang").map(String::as_str) {
                    Some("en-US") => (StatusCode::OK, CAPTIONS.to_string()),
                    _ => (StatusCode::OK, "<transcript><text start=\"0\" dur=\"1\">Bonjour</text></transcript>".to_string()),
                }
            }),
        )
        .route(
            "/oembed",
            get(move || async move {
                if oembed_ok {
                    (StatusCode::OK, Json(serde_json::json!({"title": "The Show", "author_name": "someone"})))
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({})))
                }
            }),
        )
}

async fn scraper_for(page: fn(SocketAddr) -> String, oembed_ok: bool) -> YouTubeScraper {
    let slot = Arc::new(std::sync::OnceLock::new());
    let addr = serve(fake_youtube(page, oembed_ok, slot.clone())).await;
    slot.set(addr).unwrap();
    YouTubeScraper::with_endpoints(
        reqwest::Client::new(),
        Endpoints {
            watch: format!("http://{addr}/watch"),
            oembed: format!("http://{addr}/oembed"),
        },
    )
}

#[tokio::test]
async fn fetches_english_transcript_and_title() {
    let scraper = scraper_for(watch_page, true).await;
    let video_id = extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap();

    let record = scraper.fetch(&video_id).await.unwrap();
    assert_eq!(record.text, "Hello & welcome to the show");
    assert_eq!(record.title, "The Show");
    assert_eq!(record.language, "en-US");
    assert_eq!(record.video_id, video_id);
}

#[tokio::test]
async fn failed_title_lookup_uses_placeholder() {
    let scraper = scraper_for(watch_page, false).await;
    let video_id = extract_video_id("dQw4w9WgXcQ").unwrap();

    let record = scraper.fetch(&video_id).await.unwrap();
    assert_eq!(record.title, UNKNOWN_TITLE);
    assert_eq!(record.text, "Hello & welcome to the show");
}

#[tokio::test]
async fn unreachable_title_endpoint_uses_placeholder() {
    let slot = Arc::new(std::sync::OnceLock::new());
    let addr = serve(fake_youtube(watch_page, true, slot.clone())).await;
    slot.set(addr).unwrap();
    let scraper = YouTubeScraper::with_endpoints(
        reqwest::Client::new(),
        Endpoints {
            watch: format!("http://{addr}/watch"),
            oembed: "http://127.0.0.1:9/oembed".to_string(),
        },
    );

    let record = scraper.fetch(&extract_video_id("dQw4w9WgXcQ").unwrap()).await.unwrap();
    assert_eq!(record.title, UNKNOWN_TITLE);
}

#[tokio::test]
async fn unavailable_video_surfaces_reason() {
    fn private_page(_: SocketAddr) -> String {
        r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "This video is private"}}"#.to_string()
    }
    let scraper = scraper_for(private_page, true).await;

    let err = scraper.fetch(&extract_video_id("dQw4w9WgXcQ").unwrap()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoCaptionsAvailable);
    assert_eq!(err.to_string(), "Video unavailable: This video is private");
}

#[tokio::test]
async fn missing_watch_page_is_upstream_failure() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/watch",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { StatusCode::NOT_FOUND }
        }),
    );
    let addr = serve(app).await;
    let scraper = YouTubeScraper::with_endpoints(
        reqwest::Client::new(),
        Endpoints {
            watch: format!("http://{addr}/watch"),
            oembed: format!("http://{addr}/oembed"),
        },
    );

    let err = scraper.fetch(&extract_video_id("dQw4w9WgXcQ").unwrap()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
