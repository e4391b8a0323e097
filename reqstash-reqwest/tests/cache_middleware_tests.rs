//! Integration tests for LocalCacheMiddleware using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqstash_backend::MemoryStorage;
use reqstash_configuration::ConfigCache;
use reqstash_core::Storage;
use reqstash_reqwest::{CacheOptions, CacheSettings, DataType, LocalCache, LocalCacheMiddleware};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(storage: &MemoryStorage) -> ClientWithMiddleware {
    let cache = LocalCache::new(
        CacheSettings::builder()
            .default_storage(Arc::new(storage.clone()))
            .build(),
    );
    ClientBuilder::new(Client::new())
        .with(LocalCacheMiddleware::new(cache))
        .build()
}

/// Test 1: Cache MISS then HIT - basic caching works
#[tokio::test]
async fn test_cache_miss_then_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 1}])))
        .expect(1) // Should only be called once due to caching
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/posts", mock_server.uri());

    let send = || {
        client
            .get(&url)
            .with_extension(CacheOptions::default_store().ttl_minutes(5.0))
            .with_extension(DataType::Json)
            .send()
    };

    // First request - should be a cache miss
    let response1 = send().await.unwrap();
    assert_eq!(response1.status(), 200);
    assert_eq!(response1.headers().get("X-Cache-Status").unwrap(), "MISS");
    let body1: serde_json::Value = serde_json::from_str(&response1.text().await.unwrap()).unwrap();
    assert_eq!(body1[0]["id"], 1);

    // Second request - should be a cache hit
    let response2 = send().await.unwrap();
    assert_eq!(response2.status(), 200);
    assert_eq!(response2.headers().get("X-Cache-Status").unwrap(), "HIT");
    assert_eq!(
        response2.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body2: serde_json::Value = serde_json::from_str(&response2.text().await.unwrap()).unwrap();
    assert_eq!(body2, body1);

    let key = format!("{url}GET");
    assert_eq!(storage.get(&key).unwrap().as_deref(), Some(r#"[{"id":1}]"#));
    assert!(storage.contains_key(&format!("{key}_cachettl")));
}

/// Test 2: Requests without cache options are never cached
#[tokio::test]
async fn test_requests_without_options_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/plain", mock_server.uri());

    for _ in 0..2 {
        let response = client.get(&url).send().await.unwrap();
        assert!(response.headers().get("X-Cache-Status").is_none());
        assert_eq!(response.text().await.unwrap(), "hello");
    }
    assert!(storage.is_empty());
}

/// Test 3: Error responses are returned untouched and not cached
#[tokio::test]
async fn test_error_responses_are_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/error", mock_server.uri());

    for _ in 0..2 {
        let response = client
            .get(&url)
            .with_extension(CacheOptions::default_store())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.text().await.unwrap(), "boom");
    }
    assert!(storage.is_empty());
}

/// Test 4: Response headers and body survive the miss path
#[tokio::test]
async fn test_response_integrity_on_miss() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/headers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("response body content")
                .insert_header("X-Custom-Header", "custom-value"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/headers", mock_server.uri());

    let response = client
        .get(&url)
        .with_extension(CacheOptions::default_store())
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("X-Custom-Header").unwrap(),
        "custom-value"
    );
    assert_eq!(response.text().await.unwrap(), "response body content");

    let cached = client
        .get(&url)
        .with_extension(CacheOptions::default_store())
        .send()
        .await
        .unwrap();
    assert_eq!(cached.headers().get("X-Cache-Status").unwrap(), "HIT");
    assert_eq!(cached.text().await.unwrap(), "response body content");
}

/// Test 5: Bodies that do not parse as the expected type are returned but not cached
#[tokio::test]
async fn test_unparseable_json_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/broken", mock_server.uri());

    for _ in 0..2 {
        let response = client
            .get(&url)
            .with_extension(CacheOptions::default_store())
            .with_extension(DataType::Json)
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers().get("X-Cache-Status").unwrap(), "MISS");
        assert_eq!(response.text().await.unwrap(), "not json");
    }
    assert!(storage.is_empty());
}

/// Test 6: The request body is part of the cache key
#[tokio::test]
async fn test_post_bodies_are_cached_separately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string("q=rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string("rust results"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string("q=go"))
        .respond_with(ResponseTemplate::new(200).set_body_string("go results"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/search", mock_server.uri());

    for query in ["q=rust", "q=go", "q=rust", "q=go"] {
        let response = client
            .post(&url)
            .body(query)
            .with_extension(CacheOptions::default_store())
            .send()
            .await
            .unwrap();
        assert!(response.text().await.unwrap().ends_with("results"));
    }
    assert!(storage.contains_key(&format!("{url}POSTq=rust")));
    assert!(storage.contains_key(&format!("{url}POSTq=go")));
}

/// Test 7: A rejecting validity predicate forces a refetch
#[tokio::test]
async fn test_validity_predicate_invalidates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("feed"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let storage = MemoryStorage::new();
    let client = client(&storage);
    let url = format!("{}/feed", mock_server.uri());
    let valid = Arc::new(AtomicBool::new(true));

    let send = || {
        let valid = Arc::clone(&valid);
        client
            .get(&url)
            .with_extension(
                CacheOptions::default_store()
                    .is_cache_valid(move || valid.load(Ordering::SeqCst)),
            )
            .send()
    };

    assert_eq!(send().await.unwrap().headers()["X-Cache-Status"], "MISS");
    assert_eq!(send().await.unwrap().headers()["X-Cache-Status"], "HIT");
    valid.store(false, Ordering::SeqCst);
    assert_eq!(send().await.unwrap().headers()["X-Cache-Status"], "MISS");
}

/// Test 8: Cache built from YAML configuration
#[tokio::test]
async fn test_cache_from_configuration() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("configured"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config_yaml = r#"
    storage:
      type: Memory
      max_bytes: 1 MiB
    ttl_minutes: 10
    ttl_suffix: _exp
    "#;

    let cache = ConfigCache::from_yaml(config_yaml)
        .unwrap()
        .into_cache()
        .unwrap();
    let client = ClientBuilder::new(Client::new())
        .with(LocalCacheMiddleware::new(cache.clone()))
        .build();
    let url = format!("{}/data", mock_server.uri());

    for expected in ["MISS", "HIT"] {
        let response = client
            .get(&url)
            .with_extension(CacheOptions::default_store())
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()["X-Cache-Status"], expected);
    }

    let storage = cache.settings().default_storage().unwrap();
    assert!(storage.get(&format!("{url}GET_exp")).unwrap().is_some());
}
