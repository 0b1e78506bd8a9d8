//! Test doubles for the dispatch core.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{HeaderMap, StatusCode};

use crate::proxy::client::{TransportError, UpstreamClient};
use crate::proxy::request::InboundRequest;
use crate::proxy::upstream::{AttemptObserver, FailureCause, Role, Upstream, UpstreamResponse};

/// Canned behaviour for one upstream.
#[derive(Debug, Clone)]
pub enum Script {
    Respond(StatusCode, &'static str),
    /// Fail at the transport level.
    Refuse,
}

impl Script {
    pub fn respond(status: u16, body: &'static str) -> Self {
        Script::Respond(StatusCode::from_u16(status).unwrap(), body)
    }
}

/// Client that answers from a script and records every request it receives.
pub struct ScriptedClient {
    primary: Script,
    secondary: Script,
    primary_calls: AtomicUsize,
    secondary_calls: AtomicUsize,
    requests: Mutex<Vec<(Role, InboundRequest)>>,
}

impl ScriptedClient {
    pub fn new(primary: Script, secondary: Script) -> Self {
        Self {
            primary,
            secondary,
            primary_calls: AtomicUsize::new(0),
            secondary_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self, role: Role) -> usize {
        match role {
            Role::Primary => self.primary_calls.load(Ordering::SeqCst),
            Role::Secondary => self.secondary_calls.load(Ordering::SeqCst),
        }
    }

    pub fn requests(&self) -> Vec<(Role, InboundRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for ScriptedClient {
    async fn execute(
        &self,
        target: &Upstream,
        request: &InboundRequest,
    ) -> Result<UpstreamResponse, TransportError> {
        let role = target.role();
        let script = match role {
            Role::Primary => {
                self.primary_calls.fetch_add(1, Ordering::SeqCst);
                &self.primary
            }
            Role::Secondary => {
                self.secondary_calls.fetch_add(1, Ordering::SeqCst);
                &self.secondary
            }
        };
        self.requests.lock().unwrap().push((role, request.clone()));

        match script {
            Script::Respond(status, body) => {
                let mut headers = HeaderMap::new();
                headers.insert("x-upstream", HeaderValue::from_static(role.as_str()));
                Ok(UpstreamResponse::new(*status, headers, Bytes::from_static(body.as_bytes())))
            }
            Script::Refuse => Err(TransportError::Timeout(Duration::from_millis(1))),
        }
    }
}

/// Observer that records hook invocations as `kind:role` strings.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, target: &Upstream) {
        self.events.lock().unwrap().push(format!("{kind}:{}", target.role()));
    }
}

impl AttemptObserver for RecordingObserver {
    fn on_success(&self, target: &Upstream, _response: &UpstreamResponse) {
        self.record("success", target);
    }

    fn on_failure(&self, target: &Upstream, _response: &UpstreamResponse, _cause: &FailureCause) {
        self.record("failure", target);
    }

    fn on_complete(&self, target: &Upstream, _response: &UpstreamResponse) {
        self.record("complete", target);
    }
}
