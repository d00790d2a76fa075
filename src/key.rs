use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite identity a quota is tracked under: who is calling, and which
/// resource or window the quota applies to.
///
/// Two keys with the same caller but different resources count against
/// separate windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimitKey {
    /// Caller identity (API key, client IP, tenant id).
    pub caller: String,
    /// Resource or window identifier the quota applies to.
    pub resource: String,
}

impl RateLimitKey {
    pub fn new(caller: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            resource: resource.into(),
        }
    }

    /// Namespaced key used in the counting store. Separator characters
    /// inside components are escaped, so `("a:b", "c")` and `("a", "b:c")`
    /// map to distinct windows.
    pub fn storage_key(&self) -> String {
        format!(
            "ratekeeper:sliding_window:{}:{}:timestamps",
            escape(&self.caller),
            escape(&self.resource)
        )
    }
}

fn escape(component: &str) -> String {
    component.replace('\\', "\\\\").replace(':', "\\:")
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.caller, self.resource)
    }
}
