//! Upstream targets and single outbound attempts.
//!
//! # Responsibilities
//! - Identify the primary and secondary upstreams
//! - Issue exactly one request per attempt and buffer the response
//! - Classify the result (2xx = success, anything else = failure)
//! - Notify an [`AttemptObserver`]: success-or-failure first, then complete
//!
//! # Design Decisions
//! - A pending [`UpstreamAttempt`] is consumed by `send`, so it cannot be sent twice
//! - Transport errors become a failure with a synthesized 500 and no headers/body
//! - A [`ResolvedAttempt`] can re-deliver its captured outcome any number of times

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use hyper::http::uri::{Authority, Scheme};
use hyper::{HeaderMap, StatusCode, Uri};
use thiserror::Error;
use url::Url;

use crate::proxy::client::{TransportError, UpstreamClient};
use crate::proxy::coordinator::FinalResponse;
use crate::proxy::request::InboundRequest;

/// Which side of the blue-green pair an upstream is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    /// Lowercase label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving an upstream URI.
#[derive(Debug, Error)]
pub enum UpstreamParseError {
    #[error("invalid upstream URI '{uri}': {source}")]
    Invalid {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme '{scheme}' in upstream URI '{uri}' (only http is supported)")]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("upstream URI '{uri}' has no host")]
    MissingHost { uri: String },

    #[error("upstream URI '{uri}' has an invalid authority: {source}")]
    Authority {
        uri: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
}

/// A configured upstream: role plus scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    role: Role,
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Resolve an upstream from a URI such as `http://10.0.0.5:8080`.
    ///
    /// Only scheme, host and port are used; any path on the URI is ignored
    /// because inbound paths are relayed verbatim.
    pub fn parse(role: Role, uri: &str) -> Result<Self, UpstreamParseError> {
        let url = Url::parse(uri).map_err(|source| UpstreamParseError::Invalid {
            uri: uri.to_string(),
            source,
        })?;

        if url.scheme() != "http" {
            return Err(UpstreamParseError::UnsupportedScheme {
                uri: uri.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = url.host_str().ok_or_else(|| UpstreamParseError::MissingHost {
            uri: uri.to_string(),
        })?;
        let port = url.port_or_known_default().unwrap_or(80);

        let authority = Authority::try_from(format!("{host}:{port}").as_str()).map_err(|source| {
            UpstreamParseError::Authority {
                uri: uri.to_string(),
                source,
            }
        })?;

        Ok(Self {
            role,
            scheme: Scheme::HTTP,
            authority,
        })
    }

    /// Which side of the pair this upstream serves.
    pub fn role(&self) -> Role {
        self.role
    }

    /// `host:port`, also sent as the outbound `Host` header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI for relaying `path` (path and query) to this upstream.
    pub fn uri_for(&self, path: &str) -> Result<Uri, hyper::http::Error> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path)
            .build()
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}://{})", self.role, self.scheme, self.authority)
    }
}

/// A fully buffered upstream response (or the synthesized transport failure).
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Create a response from fully received parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The outcome recorded when no status was ever received.
    pub fn transport_failure() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), Bytes::new())
    }
}

/// Why an attempt was classified as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// A response arrived with a non-2xx status.
    Status(StatusCode),
    /// The transport failed before a complete response was received.
    Transport(String),
}

/// Classified result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(UpstreamResponse),
    Failed {
        response: UpstreamResponse,
        cause: FailureCause,
    },
}

impl Outcome {
    /// Classify a transport result: 2xx succeeds, anything else fails.
    pub fn classify(result: Result<UpstreamResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.status.is_success() => Outcome::Succeeded(response),
            Ok(response) => Outcome::Failed {
                cause: FailureCause::Status(response.status),
                response,
            },
            Err(e) => Outcome::Failed {
                response: UpstreamResponse::transport_failure(),
                cause: FailureCause::Transport(e.to_string()),
            },
        }
    }

    /// Check if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    /// Captured response, received or synthesized.
    pub fn response(&self) -> &UpstreamResponse {
        match self {
            Outcome::Succeeded(response) | Outcome::Failed { response, .. } => response,
        }
    }

    /// Consume the outcome, keeping only the response.
    pub fn into_response(self) -> UpstreamResponse {
        match self {
            Outcome::Succeeded(response) | Outcome::Failed { response, .. } => response,
        }
    }
}

/// Hooks fired when an attempt resolves.
///
/// Exactly one of `on_success` / `on_failure` fires, then `on_complete`.
/// Every hook defaults to a no-op.
pub trait AttemptObserver: Send + Sync {
    /// Called when the attempt got a 2xx response.
    fn on_success(&self, _target: &Upstream, _response: &UpstreamResponse) {}

    /// Called on a non-2xx status or a transport failure.
    fn on_failure(&self, _target: &Upstream, _response: &UpstreamResponse, _cause: &FailureCause) {}

    /// Called last, once per attempt.
    fn on_complete(&self, _target: &Upstream, _response: &UpstreamResponse) {}
}

/// Observer with every hook left empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {}

/// A pending outbound attempt to one upstream.
#[derive(Debug)]
pub struct UpstreamAttempt {
    target: Upstream,
    request: Arc<InboundRequest>,
}

impl UpstreamAttempt {
    /// Prepare an attempt against `target`. Nothing is sent yet.
    pub fn new(target: Upstream, request: Arc<InboundRequest>) -> Self {
        Self { target, request }
    }

    /// Issue the request, classify the result and notify `observer`.
    pub async fn send(
        self,
        client: &dyn UpstreamClient,
        observer: &dyn AttemptObserver,
    ) -> ResolvedAttempt {
        let started = Instant::now();
        tracing::debug!(
            upstream = %self.target,
            method = %self.request.method,
            path = %self.request.path,
            "Sending upstream request"
        );

        let result = client.execute(&self.target, &self.request).await;
        if let Err(e) = &result {
            tracing::error!(upstream = %self.target, error = %e, "Upstream transport failure");
        }

        let outcome = Outcome::classify(result);
        tracing::debug!(
            upstream = %self.target,
            status = %outcome.response().status,
            success = outcome.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream attempt resolved"
        );

        let resolved = ResolvedAttempt {
            target: self.target,
            outcome,
        };
        resolved.notify(observer);
        resolved
    }
}

/// An attempt whose outcome has been captured.
#[derive(Debug, Clone)]
pub struct ResolvedAttempt {
    target: Upstream,
    outcome: Outcome,
}

impl ResolvedAttempt {
    fn notify(&self, observer: &dyn AttemptObserver) {
        match &self.outcome {
            Outcome::Succeeded(response) => observer.on_success(&self.target, response),
            Outcome::Failed { response, cause } => observer.on_failure(&self.target, response, cause),
        }
        observer.on_complete(&self.target, self.outcome.response());
    }

    /// Classified outcome of the attempt.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Check if the attempt succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Re-deliver the captured outcome to `handler` without re-sending.
    pub fn write_response<R>(&self, handler: impl FnOnce(&Upstream, &UpstreamResponse) -> R) -> R {
        handler(&self.target, self.outcome.response())
    }

    /// Turn the captured outcome into the caller's final response.
    pub fn into_final(self) -> FinalResponse {
        FinalResponse::new(self.target.role(), self.outcome.into_response())
    }
}
