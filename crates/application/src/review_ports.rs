use async_trait::async_trait;

use grantlens_core::{AppResult, UserId};
use grantlens_domain::{
    RiskAssessment, RoleHierarchyEntry, SharingRuleAccess, UserDetails, UserOption,
};

/// Port for the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Lists users that can be selected for review.
    async fn list_active_users(&self) -> AppResult<Vec<UserOption>>;

    /// Returns profile and assignment details of one user.
    async fn fetch_user_details(&self, user_id: &UserId) -> AppResult<UserDetails>;
}

/// Port for the remote access risk analyzer.
#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    /// Analyzes the user's effective access.
    async fn analyze_user_risk(&self, user_id: &UserId) -> AppResult<RiskAssessment>;
}

/// Port for record-sharing visibility.
#[async_trait]
pub trait SharingSource: Send + Sync {
    /// Lists sharing rules that grant the user record access.
    async fn fetch_sharing_rules(&self, user_id: &UserId) -> AppResult<Vec<SharingRuleAccess>>;

    /// Lists the user's path through the role hierarchy.
    async fn fetch_role_hierarchy(&self, user_id: &UserId) -> AppResult<Vec<RoleHierarchyEntry>>;
}
