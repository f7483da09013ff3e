//! Edge case tests for pantry-net
//!
//! Request identity, cache storage behavior and persistence.

use std::thread;

use pantry_net::*;

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

#[test]
fn test_request_defaults() {
    let req = Request::get("/index.html");
    assert_eq!(req.method, Method::Get);
    assert!(req.headers.is_empty());
    assert!(req.body.is_none());
    assert_eq!(Method::default(), Method::Get);
}

#[test]
fn test_accept_header_case_insensitive() {
    let req = Request::get("/").with_header("ACCEPT", "TEXT/HTML");
    // Media types are matched as sent; only the header name is case-insensitive
    assert_eq!(req.header("accept"), Some("TEXT/HTML"));
    assert!(!req.accepts_html());

    let req = Request::get("/").with_header("accept", "text/html;q=0.9, */*;q=0.8");
    assert!(req.accepts_html());
}

#[test]
fn test_response_text_utf8() {
    let resp = Response::new(200, "אין חיבור לאינטרנט");
    assert_eq!(resp.text().unwrap(), "אין חיבור לאינטרנט");
}

#[test]
fn test_response_text_invalid_utf8() {
    let resp = Response::new(200, vec![0xff, 0xfe]);
    assert!(resp.text().is_err());
}

#[test]
fn test_response_ok_range() {
    for code in [200, 201, 204] {
        assert!(Response::new(code, "").ok(), "Status {} should be ok", code);
    }
    for code in [301, 404, 500, 503] {
        assert!(!Response::new(code, "").ok(), "Status {} should not be ok", code);
    }
}

// ============================================================================
// CACHE STORAGE
// ============================================================================

#[test]
fn test_one_entry_per_key() {
    let storage = CacheStorage::new();
    let cache = storage.open("dynamic");

    cache.put(&Request::get("/list"), Response::new(200, "v1"));
    cache.put(&Request::get("/list"), Response::new(200, "v2"));

    assert_eq!(cache.keys().len(), 1);
    assert_eq!(cache.match_request(&Request::get("/list")).unwrap().body, b"v2");
}

#[test]
fn test_put_all_is_single_batch() {
    let storage = CacheStorage::new();
    let cache = storage.open("static");

    cache.put_all(vec![
        (Request::get("/"), Response::new(200, "root")),
        (Request::get("/index.html"), Response::new(200, "index")),
    ]);

    let keys: Vec<String> = cache.keys().iter().map(ToString::to_string).collect();
    assert_eq!(keys, vec!["GET /", "GET /index.html"]);
}

#[test]
fn test_open_is_idempotent() {
    let storage = CacheStorage::new();
    storage.open("a").put(&Request::get("/"), Response::new(200, "x"));
    storage.open("a");

    assert_eq!(storage.keys(), vec!["a"]);
    assert_eq!(storage.stats("a").unwrap().entry_count, 1);
}

#[test]
fn test_limit_applied_to_existing_cache() {
    let storage = CacheStorage::new();
    let cache = storage.open("dynamic");
    for i in 0..5 {
        cache.put(&Request::get(&format!("/item/{}", i)), Response::new(200, "x"));
    }

    storage.open_with_limit("dynamic", Some(2));

    let stats = storage.stats("dynamic").unwrap();
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.max_entries, Some(2));
}

#[test]
fn test_concurrent_writes_distinct_keys() {
    let storage = CacheStorage::new();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = storage.open("dynamic");
            thread::spawn(move || {
                for j in 0..50 {
                    let url = format!("/t{}/{}", i, j);
                    cache.put(&Request::get(&url), Response::new(200, url.clone()));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(storage.stats("dynamic").unwrap().entry_count, 400);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caches.json");

    let storage = CacheStorage::new();
    storage.open("grocery-app-static-v1.0.0").put(
        &Request::get("/index.html"),
        Response::new(200, "<html></html>")
            .with_header("Content-Type", "text/html")
            .with_type(ResponseType::Basic),
    );
    storage.open("grocery-app-dynamic-v1.0.0");
    storage.save(&path).unwrap();

    let loaded = CacheStorage::load(&path).unwrap();
    assert_eq!(
        loaded.keys(),
        vec!["grocery-app-static-v1.0.0", "grocery-app-dynamic-v1.0.0"]
    );

    let hit = loaded.match_request(&Request::get("/index.html"), &[]).unwrap();
    assert_eq!(hit.body, b"<html></html>");
    assert_eq!(hit.content_type(), Some("text/html"));
    assert!(hit.is_basic());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = CacheStorage::load(dir.path().join("absent.json")).unwrap();
    assert!(storage.keys().is_empty());
}

#[test]
fn test_load_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caches.json");
    std::fs::write(&path, b"{ not json").unwrap();

    assert!(matches!(CacheStorage::load(&path), Err(NetError::Snapshot(_))));
}
