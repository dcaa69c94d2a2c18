//! # Conditions
//!
//! Typed status facts shared by CertificateRequests and issuers.

use serde::{Deserialize, Serialize};

/// Condition type signalling the resource has reached its goal
pub const CONDITION_READY: &str = "Ready";
/// Condition type set by an approval controller on CertificateRequests
pub const CONDITION_APPROVED: &str = "Approved";
/// Condition type set by an approval controller on CertificateRequests
pub const CONDITION_DENIED: &str = "Denied";

pub const REASON_ISSUED: &str = "Issued";
pub const REASON_FAILED: &str = "Failed";
pub const REASON_DENIED: &str = "Denied";
pub const REASON_PENDING: &str = "Pending";
pub const REASON_NOT_FOUND: &str = "NotFound";
pub const REASON_ERROR: &str = "Error";
pub const REASON_VERIFIED: &str = "Verified";

/// Status of a condition (True, False, Unknown)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema,
)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents a typed boolean fact about a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g. Ready)
    pub r#type: String,
    /// Status of the condition
    pub status: ConditionStatus,
    /// Last time the status changed (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
