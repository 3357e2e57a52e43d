//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kanka_core::error::TransportError;
use kanka_core::{
    ApiUrl, ClientConfig, HttpRequest, HttpResponse, KankaClient, RetryPolicy, Transport,
};
use serde_json::{Value, json};

/// Campaign used by every test client.
pub const CAMPAIGN: u64 = 123;

/// Base of every endpoint URL the test client produces.
pub const BASE: &str = "https://api.kanka.io/1.0/campaigns/123";

/// A transport that answers from a script and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response.
    pub fn push(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Queues a JSON response with the given status.
    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(HttpResponse::new(status).with_json(&body))
    }

    /// Queues `{"data": data}`.
    pub fn push_data(&self, data: Value) -> &Self {
        self.push_json(200, json!({ "data": data }))
    }

    /// Queues an empty 204, as sent for deletes.
    pub fn push_no_content(&self) -> &Self {
        self.push(HttpResponse::new(204))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connection {
                message: "no scripted response left".to_string(),
            })
    }
}

/// A client over `transport` with the default retry policy.
pub fn client(transport: &Arc<MockTransport>) -> KankaClient {
    client_with_retry(transport, RetryPolicy::default())
}

pub fn client_with_retry(transport: &Arc<MockTransport>, retry: RetryPolicy) -> KankaClient {
    let config = ClientConfig::new("test-token", CAMPAIGN)
        .with_api_url(ApiUrl::default())
        .with_retry(retry);
    KankaClient::new(config, transport.clone())
}

/// Full URL of a campaign-relative path.
pub fn url(path: &str) -> String {
    format!("{}/{}", BASE, path)
}

/// A character payload as the server returns it.
pub fn character(id: i64, entity_id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "entity_id": entity_id,
        "name": name,
        "created_at": "2024-01-01T00:00:00.000000Z",
        "created_by": 7,
    })
}

/// A managed or plain asset payload.
pub fn asset(id: i64, name: &str, url: &str) -> Value {
    json!({
        "id": id,
        "entity_id": 100,
        "name": name,
        "type_id": 1,
        "_url": url,
        "is_private": false,
    })
}

/// A list envelope holding one page.
pub fn page(data: Value, current: u64, last: u64) -> Value {
    json!({
        "data": data,
        "meta": { "current_page": current, "last_page": last, "per_page": 100 },
        "links": { "next": null },
    })
}
