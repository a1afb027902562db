//! Reviewed-user projections: directory entries, details and risk.

use grantlens_core::UserId;
use serde::{Deserialize, Serialize};

/// Selectable entry of the active user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOption {
    /// Display label.
    pub label: String,
    /// User identifier.
    pub value: UserId,
}

/// Profile and assignment summary of the reviewed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    /// Username.
    pub user_name: String,
    /// Primary email.
    pub user_email: String,
    /// Assigned profile name.
    pub profile_name: String,
    /// Whether the user can log in.
    pub is_active: bool,
    /// Names of assigned permission sets.
    #[serde(default)]
    pub permission_sets: Vec<String>,
}

impl UserDetails {
    /// Returns the status label shown next to the user name.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        if self.is_active { "Active" } else { "Inactive" }
    }
}

/// Coarse risk classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Default classification.
    #[default]
    Low,
    /// Needs review.
    Medium,
    /// Needs remediation.
    High,
    /// Needs immediate remediation.
    Critical,
}

/// Result of the remote access risk analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Number of high-risk grants found.
    #[serde(default)]
    pub high_risk_count: u32,
    /// Aggregate score.
    #[serde(default)]
    pub risk_score: u32,
    /// Classification.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Human-readable findings.
    #[serde(default)]
    pub critical_findings: Vec<String>,
}
