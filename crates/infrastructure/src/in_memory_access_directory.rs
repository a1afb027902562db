use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use grantlens_application::{
    DEFAULT_SERVER_RESULT_CAP, FieldGrantBatch, FieldGrantQuery, FieldGrantSource,
    ObjectGrantPage, ObjectGrantQuery, ObjectGrantSource, RemediationGateway, RiskAnalyzer,
    SharingSource, SystemPermissionSource, UserDirectory,
};
use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{
    Grant, GrantSourceType, RemediationAction, RiskAssessment, RoleHierarchyEntry,
    SharingRuleAccess, UserDetails, UserOption,
};
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_FIELD_BATCH_SIZE: usize = 200;
const CURSOR_PREFIX: &str = "cursor-";

/// Everything the directory knows about one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccessFixture {
    /// Profile and assignment summary.
    pub details: UserDetails,
    /// Risk analysis result.
    pub risk: RiskAssessment,
    /// Raw object-level rows.
    pub object_grants: Vec<Grant>,
    /// Raw field-level rows.
    pub field_grants: Vec<Grant>,
    /// System permission name to granted state.
    pub system_permissions: BTreeMap<String, bool>,
    /// Sharing rule access.
    pub sharing_rules: Vec<SharingRuleAccess>,
    /// Role hierarchy path.
    pub role_hierarchy: Vec<RoleHierarchyEntry>,
}

impl UserAccessFixture {
    /// Creates a fixture with details only.
    #[must_use]
    pub fn new(details: UserDetails) -> Self {
        Self {
            details,
            risk: RiskAssessment::default(),
            object_grants: Vec::new(),
            field_grants: Vec::new(),
            system_permissions: BTreeMap::new(),
            sharing_rules: Vec::new(),
            role_hierarchy: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum RemediationSnapshot {
    PermissionSets {
        permission_sets: Vec<String>,
        object_grants: Vec<Grant>,
        field_grants: Vec<Grant>,
    },
    SystemPermissions(BTreeMap<String, bool>),
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: BTreeMap<UserId, UserAccessFixture>,
    remediation_snapshots: HashMap<(UserId, RemediationAction), RemediationSnapshot>,
    offline: bool,
}

/// In-memory access directory with server-like paging semantics.
///
/// Object pages are offset-based with a capped total; field grants come in
/// fixed-size batches behind opaque cursor tokens.
#[derive(Debug)]
pub struct InMemoryAccessDirectory {
    state: RwLock<DirectoryState>,
    operator_id: Option<UserId>,
    field_batch_size: usize,
    server_result_cap: u64,
}

impl Default for InMemoryAccessDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccessDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DirectoryState::default()),
            operator_id: None,
            field_batch_size: DEFAULT_FIELD_BATCH_SIZE,
            server_result_cap: DEFAULT_SERVER_RESULT_CAP,
        }
    }

    /// Sets the operator whose own account refuses remediation.
    #[must_use]
    pub fn with_operator(mut self, operator_id: UserId) -> Self {
        self.operator_id = Some(operator_id);
        self
    }

    /// Sets how many field rows one cursor batch carries.
    #[must_use]
    pub fn with_field_batch_size(mut self, field_batch_size: usize) -> Self {
        self.field_batch_size = field_batch_size.max(1);
        self
    }

    /// Sets the cap applied to reported object totals.
    #[must_use]
    pub fn with_server_result_cap(mut self, server_result_cap: u64) -> Self {
        self.server_result_cap = server_result_cap.max(1);
        self
    }

    /// Inserts or replaces a user.
    pub async fn upsert_user(&self, user_id: UserId, fixture: UserAccessFixture) {
        self.state.write().await.users.insert(user_id, fixture);
    }

    /// Makes every subsequent call fail with a network error, or recover.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    async fn read_user<T>(
        &self,
        user_id: &UserId,
        project: impl FnOnce(&UserAccessFixture) -> T,
    ) -> AppResult<T> {
        let state = self.state.read().await;
        ensure_online(&state)?;

        state
            .users
            .get(user_id)
            .map(project)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }

    fn ensure_not_operator(&self, user_id: &UserId) -> AppResult<()> {
        if self.operator_id.as_ref() == Some(user_id) {
            return Err(AppError::RemediationRestricted(format!(
                "user '{user_id}' is the running operator"
            )));
        }

        Ok(())
    }
}

fn ensure_online(state: &DirectoryState) -> AppResult<()> {
    if state.offline {
        return Err(AppError::Network("access directory is offline".to_owned()));
    }

    Ok(())
}

fn matches_term(grant: &Grant, term: Option<&str>) -> bool {
    let Some(term) = term else {
        return true;
    };

    let needle = term.to_lowercase();
    grant.object_name.to_lowercase().contains(needle.as_str())
        || grant
            .field_name
            .as_deref()
            .is_some_and(|field_name| field_name.to_lowercase().contains(needle.as_str()))
}

fn parse_cursor(token: &str) -> AppResult<usize> {
    token
        .strip_prefix(CURSOR_PREFIX)
        .and_then(|offset| offset.parse::<usize>().ok())
        .ok_or_else(|| AppError::Validation(format!("unknown continuation token '{token}'")))
}

fn is_permission_set_grant(grant: &Grant) -> bool {
    grant.source_type == GrantSourceType::PermissionSet
}

#[async_trait]
impl UserDirectory for InMemoryAccessDirectory {
    async fn list_active_users(&self) -> AppResult<Vec<UserOption>> {
        let state = self.state.read().await;
        ensure_online(&state)?;

        Ok(state
            .users
            .iter()
            .filter(|(_, fixture)| fixture.details.is_active)
            .map(|(user_id, fixture)| UserOption {
                label: format!(
                    "{} ({})",
                    fixture.details.user_name, fixture.details.profile_name
                ),
                value: user_id.clone(),
            })
            .collect())
    }

    async fn fetch_user_details(&self, user_id: &UserId) -> AppResult<UserDetails> {
        self.read_user(user_id, |fixture| fixture.details.clone())
            .await
    }
}

#[async_trait]
impl RiskAnalyzer for InMemoryAccessDirectory {
    async fn analyze_user_risk(&self, user_id: &UserId) -> AppResult<RiskAssessment> {
        self.read_user(user_id, |fixture| fixture.risk.clone()).await
    }
}

#[async_trait]
impl ObjectGrantSource for InMemoryAccessDirectory {
    async fn fetch_object_grants(&self, query: ObjectGrantQuery) -> AppResult<ObjectGrantPage> {
        let page_size = usize::try_from(query.page_size.max(1)).unwrap_or(usize::MAX);
        let offset = usize::try_from(query.page_index.max(1) - 1)
            .unwrap_or(usize::MAX)
            .saturating_mul(page_size);
        let server_result_cap = self.server_result_cap;

        self.read_user(&query.user_id, |fixture| {
            let matching = fixture
                .object_grants
                .iter()
                .filter(|grant| matches_term(grant, query.term.as_filter()))
                .collect::<Vec<_>>();
            let total = u64::try_from(matching.len())
                .unwrap_or(u64::MAX)
                .min(server_result_cap);

            ObjectGrantPage {
                grants: matching
                    .into_iter()
                    .skip(offset)
                    .take(page_size)
                    .cloned()
                    .collect(),
                total,
            }
        })
        .await
    }
}

#[async_trait]
impl FieldGrantSource for InMemoryAccessDirectory {
    async fn fetch_field_grants(&self, query: FieldGrantQuery) -> AppResult<FieldGrantBatch> {
        let offset = match query.continuation_token.as_deref() {
            Some(token) => parse_cursor(token)?,
            None => 0,
        };
        let batch_size = self.field_batch_size;

        let batch = self
            .read_user(&query.user_id, |fixture| {
                let matching = fixture
                    .field_grants
                    .iter()
                    .filter(|grant| matches_term(grant, query.term.as_filter()))
                    .collect::<Vec<_>>();
                let end = offset.saturating_add(batch_size).min(matching.len());
                let grants = matching
                    .get(offset..end)
                    .unwrap_or_default()
                    .iter()
                    .map(|grant| (*grant).clone())
                    .collect::<Vec<_>>();
                let next_token = (end < matching.len()).then(|| format!("{CURSOR_PREFIX}{end}"));

                FieldGrantBatch { grants, next_token }
            })
            .await?;

        debug!(
            user_id = %query.user_id,
            offset,
            returned = batch.grants.len(),
            has_more = batch.next_token.is_some(),
            "served in-memory field grant batch"
        );

        Ok(batch)
    }
}

#[async_trait]
impl SystemPermissionSource for InMemoryAccessDirectory {
    async fn fetch_system_permissions(
        &self,
        user_id: &UserId,
    ) -> AppResult<BTreeMap<String, bool>> {
        self.read_user(user_id, |fixture| fixture.system_permissions.clone())
            .await
    }
}

#[async_trait]
impl SharingSource for InMemoryAccessDirectory {
    async fn fetch_sharing_rules(&self, user_id: &UserId) -> AppResult<Vec<SharingRuleAccess>> {
        self.read_user(user_id, |fixture| fixture.sharing_rules.clone())
            .await
    }

    async fn fetch_role_hierarchy(&self, user_id: &UserId) -> AppResult<Vec<RoleHierarchyEntry>> {
        self.read_user(user_id, |fixture| fixture.role_hierarchy.clone())
            .await
    }
}

#[async_trait]
impl RemediationGateway for InMemoryAccessDirectory {
    async fn apply_remediation(
        &self,
        user_id: &UserId,
        action: RemediationAction,
    ) -> AppResult<()> {
        self.ensure_not_operator(user_id)?;

        let mut state = self.state.write().await;
        ensure_online(&state)?;
        let fixture = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;

        let snapshot = match action {
            RemediationAction::RevokePermissionSets => {
                let snapshot = RemediationSnapshot::PermissionSets {
                    permission_sets: std::mem::take(&mut fixture.details.permission_sets),
                    object_grants: fixture.object_grants.clone(),
                    field_grants: fixture.field_grants.clone(),
                };
                fixture
                    .object_grants
                    .retain(|grant| !is_permission_set_grant(grant));
                fixture
                    .field_grants
                    .retain(|grant| !is_permission_set_grant(grant));
                snapshot
            }
            RemediationAction::ResetSystemPermissions => {
                let snapshot =
                    RemediationSnapshot::SystemPermissions(fixture.system_permissions.clone());
                for enabled in fixture.system_permissions.values_mut() {
                    *enabled = false;
                }
                snapshot
            }
        };

        state
            .remediation_snapshots
            .insert((user_id.clone(), action), snapshot);
        debug!(user_id = %user_id, action = %action, "applied in-memory remediation");

        Ok(())
    }

    async fn undo_remediation(
        &self,
        user_id: &UserId,
        action: RemediationAction,
    ) -> AppResult<()> {
        self.ensure_not_operator(user_id)?;

        let mut state = self.state.write().await;
        ensure_online(&state)?;
        let snapshot = state
            .remediation_snapshots
            .remove(&(user_id.clone(), action))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no '{action}' remediation to undo for user '{user_id}'"
                ))
            })?;
        let fixture = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))?;

        match snapshot {
            RemediationSnapshot::PermissionSets {
                permission_sets,
                object_grants,
                field_grants,
            } => {
                fixture.details.permission_sets = permission_sets;
                fixture.object_grants = object_grants;
                fixture.field_grants = field_grants;
            }
            RemediationSnapshot::SystemPermissions(system_permissions) => {
                fixture.system_permissions = system_permissions;
            }
        }

        debug!(user_id = %user_id, action = %action, "undid in-memory remediation");
        Ok(())
    }
}
