use grantlens_domain::{MergedGrant, RemediationAction, SearchRejection};
use serde::Serialize;

use super::*;

/// Current object page as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectGrantView {
    /// Merged rows of the current page.
    pub rows: Vec<MergedGrant>,
    /// 1-based page index.
    pub page_index: u32,
    /// Server-reported total.
    pub server_total: u64,
    /// Display range text.
    pub page_info: String,
    /// Whether the page is the first.
    pub is_first_page: bool,
    /// Whether the page is the last.
    pub is_last_page: bool,
    /// Accepted search term.
    pub search_term: String,
    /// Set when the latest object search was refused.
    pub search_rejection: Option<SearchRejection>,
}

/// Current local field page as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldGrantView {
    /// Merged rows of the current local page.
    pub rows: Vec<MergedGrant>,
    /// 1-based local page index.
    pub page_index: u32,
    /// Rows merged so far across all batches.
    pub buffered: usize,
    /// Buffered rows matching the search term.
    pub filtered_count: usize,
    /// Whether the server has more batches.
    pub has_more: bool,
    /// Display range text.
    pub page_info: String,
    /// Whether the page is the first.
    pub is_first_page: bool,
    /// Whether the page is the last.
    pub is_last_page: bool,
    /// Accepted search term.
    pub search_term: String,
    /// Set when the latest field search was refused.
    pub search_rejection: Option<SearchRejection>,
}

/// Read-only view of a review session, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSnapshot {
    /// Session identifier.
    pub session_id: ReviewSessionId,
    /// Selection generation the snapshot reflects.
    pub generation: u64,
    /// Selected user.
    pub selected_user: Option<UserId>,
    /// Loaded user details.
    pub user_details: Option<UserDetails>,
    /// Loaded risk assessment.
    pub risk: Option<RiskAssessment>,
    /// Object-level grants.
    pub object_grants: ObjectGrantView,
    /// Field-level grants.
    pub field_grants: FieldGrantView,
    /// System-level permission rows.
    pub system_permissions: Vec<SystemPermissionRow>,
    /// Sharing rule rows.
    pub sharing_rules: Vec<SharingRuleAccess>,
    /// Role hierarchy rows.
    pub role_hierarchy: Vec<RoleHierarchyEntry>,
    /// Visible sections.
    pub visible_sections: VisibleSections,
    /// Permission-set assignments plus system permissions.
    pub total_permissions: usize,
    /// Remediation that can currently be undone.
    pub undoable_action: Option<RemediationAction>,
    /// Set when the server total reached the result cap.
    pub truncation_notice: Option<Notice>,
    /// Notices raised and not yet taken.
    pub notices: Vec<Notice>,
}

impl AccessReviewSession {
    /// Builds a snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ReviewSnapshot {
        ReviewSnapshot {
            session_id: self.session_id,
            generation: self.generation,
            selected_user: self.selected_user.clone(),
            user_details: self.user_details.clone(),
            risk: self.risk.clone(),
            object_grants: self.object_grant_view(),
            field_grants: self.field_grant_view(),
            system_permissions: self.system_permissions.clone(),
            sharing_rules: self.sharing_rules.clone(),
            role_hierarchy: self.role_hierarchy.clone(),
            visible_sections: self.visible_sections.clone(),
            total_permissions: self.total_permissions(),
            undoable_action: self.remediation.undoable_action(),
            truncation_notice: self.truncation_notice(),
            notices: self.notices.clone(),
        }
    }

    /// Returns the notice asking to refine the search once the cap is hit.
    #[must_use]
    pub fn truncation_notice(&self) -> Option<Notice> {
        self.object_grants.is_truncated().then(|| {
            Notice::info(
                "Object Grants",
                format!(
                    "Results are limited to {} records. Refine the search to narrow them down.",
                    self.settings.server_result_cap
                ),
            )
        })
    }

    fn object_grant_view(&self) -> ObjectGrantView {
        let window = self.object_grants.window();

        ObjectGrantView {
            rows: self.object_grants.rows().to_vec(),
            page_index: window.page_index(),
            server_total: window.server_total(),
            page_info: self.object_grants.page_info().to_string(),
            is_first_page: window.is_first_page(),
            is_last_page: window.is_last_page(),
            search_term: self.object_grants.term().as_str().to_owned(),
            search_rejection: self.object_grants.search_rejection().cloned(),
        }
    }

    fn field_grant_view(&self) -> FieldGrantView {
        FieldGrantView {
            rows: self.field_grants.current_page().to_vec(),
            page_index: self.field_grants.page_index(),
            buffered: self.field_grants.buffered().len(),
            filtered_count: self.field_grants.filtered_rows().len(),
            has_more: self.field_grants.has_more(),
            page_info: self.field_grants.page_info().to_string(),
            is_first_page: self.field_grants.is_first_page(),
            is_last_page: self.field_grants.is_last_page(),
            search_term: self.field_grants.term().as_str().to_owned(),
            search_rejection: self.field_grants.search_rejection().cloned(),
        }
    }
}
