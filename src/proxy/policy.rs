//! Method-based dispatch policy.

use hyper::Method;

/// How an inbound request is spread over the two upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Safe methods: primary first, secondary only if primary fails.
    Failover,
    /// Everything else: both upstreams, primary's result is authoritative.
    DualSend,
}

impl DispatchPolicy {
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            DispatchPolicy::Failover
        } else {
            DispatchPolicy::DualSend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchPolicy::Failover => "failover",
            DispatchPolicy::DualSend => "dual-send",
        }
    }
}

impl std::fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
