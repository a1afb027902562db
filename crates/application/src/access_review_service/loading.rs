use std::collections::{BTreeMap, BTreeSet};

use crate::{FieldGrantBatch, FieldGrantQuery, ObjectGrantPage, ObjectGrantQuery};

use super::*;

/// Selection generation and user a load was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    user_id: UserId,
}

impl SelectionTicket {
    pub(super) fn new(generation: u64, user_id: UserId) -> Self {
        Self {
            generation,
            user_id,
        }
    }

    /// Returns the generation the ticket was issued at.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the user the ticket was issued for.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Owned description of one user load, detached from the session borrow.
pub struct UserAccessRequest {
    ticket: SelectionTicket,
    ports: AccessReviewPorts,
    object_query: Option<ObjectGrantQuery>,
    field_query: Option<FieldGrantQuery>,
}

impl UserAccessRequest {
    /// Returns the ticket the request was built for.
    #[must_use]
    pub fn ticket(&self) -> &SelectionTicket {
        &self.ticket
    }

    /// Fetches user details, then fans out the independent fetches.
    ///
    /// Details are awaited first; the remaining calls run concurrently and
    /// their completion order is not observable in the result.
    pub async fn run(self) -> UserAccessLoad {
        let Self {
            ticket,
            ports,
            object_query,
            field_query,
        } = self;
        let user_id = ticket.user_id.clone();

        let details = ports.users.fetch_user_details(&user_id).await;

        let (risk, object_page, field_batch, system_permissions) = tokio::join!(
            ports.risk.analyze_user_risk(&user_id),
            async {
                match object_query {
                    Some(query) => Some(ports.object_grants.fetch_object_grants(query).await),
                    None => None,
                }
            },
            async {
                match field_query {
                    Some(query) => Some(ports.field_grants.fetch_field_grants(query).await),
                    None => None,
                }
            },
            ports.system_permissions.fetch_system_permissions(&user_id),
        );

        UserAccessLoad {
            ticket,
            details,
            risk,
            object_page,
            field_batch,
            system_permissions,
        }
    }
}

/// Raw results of one user load, ready to apply to the session.
pub struct UserAccessLoad {
    ticket: SelectionTicket,
    details: AppResult<UserDetails>,
    risk: AppResult<RiskAssessment>,
    object_page: Option<AppResult<ObjectGrantPage>>,
    field_batch: Option<AppResult<FieldGrantBatch>>,
    system_permissions: AppResult<BTreeMap<String, bool>>,
}

impl UserAccessLoad {
    /// Returns the ticket the load was issued with.
    #[must_use]
    pub fn ticket(&self) -> &SelectionTicket {
        &self.ticket
    }
}

/// Whether a completed load reached the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Results were written into the session.
    Applied,
    /// The selection changed while the load was in flight; results dropped.
    Stale,
}

impl AccessReviewSession {
    /// Builds the load for `ticket` from the pagers' current queries.
    #[must_use]
    pub fn begin_load(&self, ticket: &SelectionTicket) -> UserAccessRequest {
        UserAccessRequest {
            ticket: ticket.clone(),
            ports: self.ports.clone(),
            object_query: self.object_grants.query(),
            field_query: self.field_grants.query(),
        }
    }

    /// Writes a completed load into the session when its ticket is current.
    ///
    /// Each failed fetch degrades only its own section and raises a notice.
    pub fn apply_load(&mut self, load: UserAccessLoad) -> LoadOutcome {
        match self.absorb_load(load) {
            Some(_) => LoadOutcome::Applied,
            None => LoadOutcome::Stale,
        }
    }

    /// Applies a current load and returns the sections it degraded, or `None`
    /// when the load is stale.
    fn absorb_load(&mut self, load: UserAccessLoad) -> Option<BTreeSet<Section>> {
        if !self.is_current(&load.ticket) {
            debug!(
                session_id = %self.session_id,
                ticket_generation = load.ticket.generation,
                generation = self.generation,
                user_id = %load.ticket.user_id,
                "dropping stale user load"
            );
            return None;
        }

        let UserAccessLoad {
            ticket,
            details,
            risk,
            object_page,
            field_batch,
            system_permissions,
        } = load;
        let mut degraded = BTreeSet::new();

        match details {
            Ok(details) => self.user_details = Some(details),
            Err(error) => {
                self.user_details = None;
                self.note_failure("User Details", &error);
            }
        }

        match risk {
            Ok(risk) => self.risk = Some(risk),
            Err(error) => {
                self.risk = Some(RiskAssessment::default());
                self.note_failure("Risk Analysis", &error);
            }
        }

        if let Some(result) = object_page {
            match self.object_grants.absorb_page(result) {
                Ok(()) => {
                    self.loaded_sections.insert(Section::Objects);
                }
                Err(error) => {
                    degraded.insert(Section::Objects);
                    self.note_failure("Object Grants", &error);
                }
            }
        }

        if let Some(result) = field_batch {
            match self.field_grants.absorb_batch(result) {
                Ok(_) => {
                    self.loaded_sections.insert(Section::Fields);
                }
                Err(error) => {
                    degraded.insert(Section::Fields);
                    self.note_failure("Field Grants", &error);
                }
            }
        }

        match system_permissions {
            Ok(permissions) => {
                self.system_permissions = SystemPermissionRow::from_map(&permissions);
                self.loaded_sections.insert(Section::SystemPermissions);
            }
            Err(error) => {
                degraded.insert(Section::SystemPermissions);
                self.system_permissions.clear();
                self.note_failure("System Permissions", &error);
            }
        }

        info!(
            session_id = %self.session_id,
            generation = ticket.generation,
            user_id = %ticket.user_id,
            object_rows = self.object_grants.rows().len(),
            field_rows = self.field_grants.buffered().len(),
            degraded = degraded.len(),
            "user access loaded"
        );

        Some(degraded)
    }

    /// Loads the selected user and every visible lazy section.
    ///
    /// Sections the load itself failed to fill are left for the next toggle.
    /// Returns `None` when no user is selected.
    pub async fn load_selected_user(&mut self) -> Option<LoadOutcome> {
        let user_id = self.selected_user.clone()?;
        let ticket = SelectionTicket::new(self.generation, user_id);
        let load = self.begin_load(&ticket).run().await;

        let Some(degraded) = self.absorb_load(load) else {
            return Some(LoadOutcome::Stale);
        };
        self.load_visible_sections(&degraded).await;

        Some(LoadOutcome::Applied)
    }

    /// Selects a user and loads it.
    pub async fn select_and_load(&mut self, user_id: Option<UserId>) -> Option<LoadOutcome> {
        self.select_user(user_id)?;
        self.load_selected_user().await
    }

    /// Rebuilds every buffer for the selected user from scratch.
    pub async fn refresh(&mut self) -> Option<LoadOutcome> {
        let user_id = self.selected_user.clone();
        self.select_and_load(user_id).await
    }

    fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.generation == self.generation && self.selected_user.as_ref() == Some(&ticket.user_id)
    }
}
