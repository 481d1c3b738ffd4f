use serde::Serialize;

/// Machine-readable classification attached to every service error.
///
/// Callers (route layers, RPC shims) branch on this instead of matching
/// individual service error enums.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input rejected before any state was touched.
    Validation,
    /// The addressed record does not exist (or belongs to another user).
    NotFound,
    /// The operation conflicts with current state, e.g. an overdraw.
    Conflict,
    /// The storage backend failed; the operation may be retried.
    Storage,
}
