//! In-memory NetBox for integration tests
//!
//! Routes requests to a handler and records every call so tests can
//! assert how many remote queries the engine issued.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use netbox_enrich::{
    EnrichConfig, EnrichSettings, EnrichmentGate, NetboxEnrichmentService, NetboxTransport,
    TransportError,
};

pub type Handler =
    Box<dyn Fn(&str, &[(String, String)]) -> Result<Value, TransportError> + Send + Sync>;

pub struct MockNetbox {
    handler: Handler,
    delay: Option<Duration>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockNetbox {
    pub fn new(
        handler: impl Fn(&str, &[(String, String)]) -> Result<Value, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::default(),
        })
    }

    /// Like [`MockNetbox::new`], but every response is delayed
    pub fn slow(
        delay: Duration,
        handler: impl Fn(&str, &[(String, String)]) -> Result<Value, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Some(delay),
            requests: Mutex::default(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[async_trait]
impl NetboxTransport for MockNetbox {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), query.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(path, &query)
    }
}

pub fn query_param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

pub fn paged(results: Vec<Value>) -> Result<Value, TransportError> {
    Ok(json!({"count": results.len(), "results": results}))
}

pub fn unavailable() -> TransportError {
    TransportError::Status {
        status: 502,
        body: "Bad Gateway".into(),
    }
}

pub fn settings(yaml: &str) -> EnrichSettings {
    EnrichConfig::from_yaml_str(yaml)
        .unwrap()
        .resolve_with(|_| None)
        .unwrap()
}

pub fn service(settings: &EnrichSettings, netbox: Arc<MockNetbox>) -> NetboxEnrichmentService {
    NetboxEnrichmentService::with_transport(settings, EnrichmentGate::enabled(), netbox)
}

pub const DEVICE_CONFIG: &str = r#"
source: "[destination][ip]"
target: "[destination][device]"
lookup_type: ip_device
netbox_url: "http://netbox:8080/netbox/api"
"#;

pub const VRF_CONFIG: &str = r#"
source: "[source][ip]"
target: "[source][segment]"
lookup_type: ip_vrf
netbox_url: "http://netbox:8080/netbox/api"
"#;
