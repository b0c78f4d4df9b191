//! Scripted transport and fixtures for client tests.

use crate::api::{ApiError, ApiResult, HttpResponse, Transport};
use async_trait::async_trait;
use serde_json::json;
use shared::config::ApiConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One request seen by the scripted transport
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Last path segment of the URL (`latest`, `search`, `getvideo`, ...)
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub at: Instant,
}

impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Transport answering from per-endpoint FIFO queues.
///
/// An endpoint with nothing queued answers 404.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<ApiResult<HttpResponse>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, endpoint: &str, response: ApiResult<HttpResponse>) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn ok(&self, endpoint: &str, body: impl Into<String>) {
        self.push(
            endpoint,
            Ok(HttpResponse {
                status: 200,
                retry_after: None,
                body: body.into(),
            }),
        );
    }

    pub fn status(&self, endpoint: &str, status: u16) {
        self.push(
            endpoint,
            Ok(HttpResponse {
                status,
                retry_after: None,
                body: String::new(),
            }),
        );
    }

    pub fn rate_limited(&self, endpoint: &str, retry_after_secs: Option<u64>) {
        self.push(
            endpoint,
            Ok(HttpResponse {
                status: 429,
                retry_after: retry_after_secs.map(Duration::from_secs),
                body: String::new(),
            }),
        );
    }

    pub fn error(&self, endpoint: &str, error: ApiError) {
        self.push(endpoint, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> ApiResult<HttpResponse> {
        let endpoint = url.rsplit('/').next().unwrap_or_default().to_string();

        self.calls.lock().unwrap().push(RecordedCall {
            endpoint: endpoint.clone(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            at: Instant::now(),
        });

        self.responses
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 404,
                    retry_after: None,
                    body: "no scripted response".to_string(),
                })
            })
    }
}

/// Configuration pointing at a host that is never contacted
pub fn test_config() -> ApiConfig {
    ApiConfig {
        base_url: "http://upstream.test/api/anime/".to_string(),
        ..ApiConfig::default()
    }
}

/// Bare list body with one item per url-id
pub fn anime_list(urls: &[&str]) -> String {
    let items: Vec<_> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            json!({
                "id": i + 1,
                "url": url,
                "judul": url.replace('-', " "),
                "cover": format!("https://img.test/{}.jpg", url),
                "lastch": "12",
                "lastup": "2024-01-17"
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// Nested search body with `count` results and pagination
pub fn search_body(prefix: &str, count: usize, page: u32, has_next: bool) -> String {
    let results: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": format!("{}", i),
                "url": format!("{}-{}-{}", prefix, page, i),
                "judul": format!("{} {}", prefix, i),
                "score": "7.5"
            })
        })
        .collect();
    json!({
        "data": [{
            "jumlah": count,
            "result": results,
            "pagination": {
                "page": page,
                "per_page": count,
                "total": count * 3,
                "total_pages": 3,
                "has_next": has_next,
                "next_page": (page + 1).to_string(),
                "next_offset": ""
            }
        }]
    })
    .to_string()
}

/// Wrapped detail body with the given status
pub fn detail_body(status: &str) -> String {
    json!({
        "data": [{
            "id": 42,
            "series_id": "frieren",
            "judul": "Frieren",
            "type": "TV",
            "status": status,
            "genre": ["Adventure", "Fantasy"],
            "sinopsis": "An elf mage outlives her party.",
            "chapter": [
                {"id": 1, "ch": "1", "url": "frieren-episode-1", "date": "2023-09-29"},
                {"id": 2, "ch": "2", "url": "frieren-episode-2", "date": "2023-09-29"}
            ]
        }]
    })
    .to_string()
}

/// Wrapped video body for one episode
pub fn video_body(episode_id: u64) -> String {
    json!({
        "data": [{
            "episode_id": episode_id,
            "likeCount": 10,
            "dislikeCount": 0,
            "userLikeStatus": 0,
            "reso": ["480p", "720p"],
            "stream": [
                {"reso": "720p", "url": "https://cdn.test/ep.mp4", "provider": "cdn"}
            ]
        }]
    })
    .to_string()
}
