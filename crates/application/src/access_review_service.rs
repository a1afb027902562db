//! Access review session: one operator reviewing one selected user.
//!
//! The session owns every buffer, window and the remediation record. Loads
//! are tagged with the selection generation so results that arrive after
//! the operator moved on are dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use grantlens_core::{AppError, AppResult, ReviewSessionId, UserId};
use grantlens_domain::{
    RiskAssessment, RoleHierarchyEntry, Section, SharingRuleAccess, SystemPermissionRow,
    UserDetails, UserOption, VisibleSections,
};

use crate::{
    FieldGrantPager, FieldGrantSource, Notice, ObjectGrantPager, ObjectGrantSource,
    RemediationGateway, RemediationService, ReviewSettings, RiskAnalyzer, SharingSource,
    SystemPermissionSource, UserDirectory,
};

mod grants;
mod loading;
mod remediation;
mod sections;
mod snapshot;

pub use loading::{LoadOutcome, SelectionTicket, UserAccessLoad, UserAccessRequest};
pub use snapshot::{FieldGrantView, ObjectGrantView, ReviewSnapshot};

/// Port bundle consumed by an access review session.
#[derive(Clone)]
pub struct AccessReviewPorts {
    /// User list and details.
    pub users: Arc<dyn UserDirectory>,
    /// Risk analysis.
    pub risk: Arc<dyn RiskAnalyzer>,
    /// Offset-paged object grants.
    pub object_grants: Arc<dyn ObjectGrantSource>,
    /// Cursor-paged field grants.
    pub field_grants: Arc<dyn FieldGrantSource>,
    /// System-level permissions.
    pub system_permissions: Arc<dyn SystemPermissionSource>,
    /// Sharing rules and role hierarchy.
    pub sharing: Arc<dyn SharingSource>,
    /// Remote remediation procedures.
    pub remediation: Arc<dyn RemediationGateway>,
}

/// Stateful review of one selected user at a time.
pub struct AccessReviewSession {
    session_id: ReviewSessionId,
    settings: ReviewSettings,
    ports: AccessReviewPorts,
    generation: u64,
    selected_user: Option<UserId>,
    user_options: Vec<UserOption>,
    user_details: Option<UserDetails>,
    risk: Option<RiskAssessment>,
    object_grants: ObjectGrantPager,
    field_grants: FieldGrantPager,
    system_permissions: Vec<SystemPermissionRow>,
    sharing_rules: Vec<SharingRuleAccess>,
    role_hierarchy: Vec<RoleHierarchyEntry>,
    visible_sections: VisibleSections,
    loaded_sections: BTreeSet<Section>,
    remediation: RemediationService,
    notices: Vec<Notice>,
}

impl AccessReviewSession {
    /// Creates a session with no selected user and every section collapsed.
    #[must_use]
    pub fn new(ports: AccessReviewPorts, settings: ReviewSettings) -> Self {
        Self {
            session_id: ReviewSessionId::new(),
            object_grants: ObjectGrantPager::new(ports.object_grants.clone(), &settings),
            field_grants: FieldGrantPager::new(ports.field_grants.clone(), &settings),
            remediation: RemediationService::new(ports.remediation.clone()),
            settings,
            ports,
            generation: 0,
            selected_user: None,
            user_options: Vec::new(),
            user_details: None,
            risk: None,
            system_permissions: Vec::new(),
            sharing_rules: Vec::new(),
            role_hierarchy: Vec::new(),
            visible_sections: VisibleSections::new(),
            loaded_sections: BTreeSet::new(),
            notices: Vec::new(),
        }
    }

    /// Returns the session identifier used in log fields.
    #[must_use]
    pub fn session_id(&self) -> ReviewSessionId {
        self.session_id
    }

    /// Returns the settings the session was created with.
    #[must_use]
    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    /// Returns the current selection generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the selected user.
    #[must_use]
    pub fn selected_user(&self) -> Option<&UserId> {
        self.selected_user.as_ref()
    }

    /// Loads the selectable user list.
    pub async fn load_user_options(&mut self) -> AppResult<&[UserOption]> {
        match self.ports.users.list_active_users().await {
            Ok(options) => {
                debug!(
                    session_id = %self.session_id,
                    users = options.len(),
                    "user options loaded"
                );
                self.user_options = options;
                Ok(self.user_options.as_slice())
            }
            Err(error) => {
                self.user_options.clear();
                self.note_failure("Users", &error);
                Err(error)
            }
        }
    }

    /// Returns the loaded user list.
    #[must_use]
    pub fn user_options(&self) -> &[UserOption] {
        self.user_options.as_slice()
    }

    /// Switches the reviewed user and discards everything loaded for the
    /// previous one.
    ///
    /// Returns the ticket to tag the follow-up load with, or `None` when the
    /// selection was cleared.
    pub fn select_user(&mut self, user_id: Option<UserId>) -> Option<SelectionTicket> {
        self.generation = self.generation.wrapping_add(1);
        self.selected_user = user_id;
        self.user_details = None;
        self.risk = None;
        self.object_grants.select_user(self.selected_user.clone());
        self.field_grants.select_user(self.selected_user.clone());
        self.system_permissions.clear();
        self.sharing_rules.clear();
        self.role_hierarchy.clear();
        self.loaded_sections.clear();

        info!(
            session_id = %self.session_id,
            generation = self.generation,
            user_id = self.selected_user.as_ref().map(UserId::as_str),
            "review selection changed"
        );

        self.selected_user
            .clone()
            .map(|user_id| SelectionTicket::new(self.generation, user_id))
    }

    /// Returns notices raised since they were last taken.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        self.notices.as_slice()
    }

    /// Drains raised notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn note(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn note_failure(&mut self, title: &str, error: &AppError) {
        match error {
            AppError::Validation(_) => debug!(
                session_id = %self.session_id,
                title,
                error = %error,
                "review request refused locally"
            ),
            _ => warn!(
                session_id = %self.session_id,
                title,
                error = %error,
                "review section degraded"
            ),
        }

        self.note(Notice::from_error(title, error));
    }
}
