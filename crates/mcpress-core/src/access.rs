//! Caller authorization seam.
//!
//! Identity is a deployment concern (reverse proxy, host platform, ...);
//! the core only asks a yes/no question before doing any work. Handlers
//! consult the gate and refuse with 403 when it says no.

/// Boolean authorization gate consulted before chatting or executing tools.
pub trait AccessGate: Send + Sync {
    fn can_chat(&self) -> bool;

    fn can_execute_tools(&self) -> bool;
}

/// Default gate for standalone deployments.
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn can_chat(&self) -> bool {
        true
    }

    fn can_execute_tools(&self) -> bool {
        true
    }
}

/// Gate that refuses everything. Used in tests and lockdown deployments.
pub struct DenyAll;

impl AccessGate for DenyAll {
    fn can_chat(&self) -> bool {
        false
    }

    fn can_execute_tools(&self) -> bool {
        false
    }
}
