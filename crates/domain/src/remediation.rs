//! Reversible remediation bookkeeping.
//!
//! At most one applied remediation is undoable at a time. A new apply
//! supersedes the previous record; an undo of the same action returns the
//! machine to idle. Transitions are only taken after the remote call
//! succeeded, so failures leave the state as it was.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use grantlens_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

/// Destructive corrective action applied to a user's access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    /// Removes every permission set assignment from the user.
    RevokePermissionSets,
    /// Resets system-level permissions to the profile baseline.
    ResetSystemPermissions,
}

impl RemediationAction {
    /// Returns a stable transport value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RevokePermissionSets => "revoke_permission_sets",
            Self::ResetSystemPermissions => "reset_system_permissions",
        }
    }

    /// Returns all known actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[RemediationAction] = &[
            RemediationAction::RevokePermissionSets,
            RemediationAction::ResetSystemPermissions,
        ];

        ALL
    }
}

impl Display for RemediationAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RemediationAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "revoke_permission_sets" => Ok(Self::RevokePermissionSets),
            "reset_system_permissions" => Ok(Self::ResetSystemPermissions),
            _ => Err(AppError::Validation(format!(
                "unknown remediation action '{value}'"
            ))),
        }
    }
}

/// Validated remediation request with both a target and an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationRequest {
    target_user_id: UserId,
    action: RemediationAction,
}

impl RemediationRequest {
    /// Fails fast when either the target or the action is missing.
    pub fn new(
        target_user_id: Option<UserId>,
        action: Option<RemediationAction>,
    ) -> AppResult<Self> {
        let Some(target_user_id) = target_user_id else {
            return Err(AppError::Validation(
                "select a user before applying a remediation".to_owned(),
            ));
        };
        let Some(action) = action else {
            return Err(AppError::Validation(
                "select a remediation action before applying it".to_owned(),
            ));
        };

        Ok(Self {
            target_user_id,
            action,
        })
    }

    /// Returns the target user.
    #[must_use]
    pub fn target_user_id(&self) -> &UserId {
        &self.target_user_id
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> RemediationAction {
        self.action
    }
}

/// Record of one applied remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationRecord {
    /// Applied action.
    pub action: RemediationAction,
    /// User the action was applied to.
    pub target_user_id: UserId,
    /// When the apply call succeeded.
    pub applied_at: DateTime<Utc>,
    /// Whether the action can still be undone.
    pub undoable: bool,
}

/// Remediation state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "record", rename_all = "snake_case")]
pub enum RemediationState {
    /// Nothing undoable.
    #[default]
    Idle,
    /// One undoable remediation.
    Applied(RemediationRecord),
}

impl RemediationState {
    /// Enters `Applied` for a successful apply and returns the superseded
    /// record, no longer undoable.
    pub fn record_applied(
        &mut self,
        request: &RemediationRequest,
        applied_at: DateTime<Utc>,
    ) -> Option<RemediationRecord> {
        let next = Self::Applied(RemediationRecord {
            action: request.action(),
            target_user_id: request.target_user_id().clone(),
            applied_at,
            undoable: true,
        });

        match std::mem::replace(self, next) {
            Self::Idle => None,
            Self::Applied(mut superseded) => {
                superseded.undoable = false;
                Some(superseded)
            }
        }
    }

    /// Returns the record an undo of `action` would revert.
    pub fn undo_target(&self, action: RemediationAction) -> AppResult<&RemediationRecord> {
        match self {
            Self::Applied(record) if record.action == action => Ok(record),
            Self::Applied(record) => Err(AppError::Validation(format!(
                "only the last applied remediation '{}' can be undone",
                record.action
            ))),
            Self::Idle => Err(AppError::Validation(
                "there is no remediation to undo".to_owned(),
            )),
        }
    }

    /// Returns to `Idle` after a successful undo of `action`.
    pub fn record_undone(&mut self, action: RemediationAction) -> AppResult<RemediationRecord> {
        self.undo_target(action)?;

        match std::mem::take(self) {
            Self::Applied(mut record) => {
                record.undoable = false;
                Ok(record)
            }
            Self::Idle => Err(AppError::Internal(
                "remediation state changed during undo".to_owned(),
            )),
        }
    }

    /// Returns the action that can currently be undone.
    #[must_use]
    pub fn undoable_action(&self) -> Option<RemediationAction> {
        match self {
            Self::Applied(record) if record.undoable => Some(record.action),
            _ => None,
        }
    }

    /// Returns the undoable record, if any.
    #[must_use]
    pub fn current(&self) -> Option<&RemediationRecord> {
        match self {
            Self::Applied(record) => Some(record),
            Self::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use grantlens_core::{AppError, UserId};

    use super::{RemediationAction, RemediationRequest, RemediationState};

    fn request(action: RemediationAction) -> RemediationRequest {
        let target = UserId::new("005U1").ok();
        RemediationRequest::new(target, Some(action))
            .unwrap_or_else(|error| panic!("request should validate: {error}"))
    }

    #[test]
    fn action_roundtrip_transport_value() {
        for action in RemediationAction::all() {
            assert_eq!(RemediationAction::from_str(action.as_str()).ok(), Some(*action));
        }
    }

    #[test]
    fn request_requires_target_and_action() {
        let missing_target =
            RemediationRequest::new(None, Some(RemediationAction::RevokePermissionSets));
        let missing_action = RemediationRequest::new(UserId::new("005U1").ok(), None);

        assert!(matches!(missing_target, Err(AppError::Validation(_))));
        assert!(matches!(missing_action, Err(AppError::Validation(_))));
    }

    #[test]
    fn apply_then_undo_returns_to_idle() {
        let mut state = RemediationState::default();
        let superseded = state.record_applied(
            &request(RemediationAction::RevokePermissionSets),
            Utc::now(),
        );

        assert!(superseded.is_none());
        assert_eq!(
            state.undoable_action(),
            Some(RemediationAction::RevokePermissionSets)
        );

        let undone = state.record_undone(RemediationAction::RevokePermissionSets);
        assert!(undone.is_ok_and(|record| !record.undoable));
        assert_eq!(state, RemediationState::Idle);
    }

    #[test]
    fn second_apply_supersedes_first() {
        let mut state = RemediationState::default();
        let _ = state.record_applied(
            &request(RemediationAction::RevokePermissionSets),
            Utc::now(),
        );
        let superseded = state.record_applied(
            &request(RemediationAction::ResetSystemPermissions),
            Utc::now(),
        );

        assert!(superseded.is_some_and(|record| {
            record.action == RemediationAction::RevokePermissionSets && !record.undoable
        }));
        assert_eq!(
            state.undoable_action(),
            Some(RemediationAction::ResetSystemPermissions)
        );
        assert!(
            state
                .undo_target(RemediationAction::RevokePermissionSets)
                .is_err()
        );
    }

    #[test]
    fn undo_of_other_action_leaves_state_untouched() {
        let mut state = RemediationState::default();
        let _ = state.record_applied(
            &request(RemediationAction::ResetSystemPermissions),
            Utc::now(),
        );
        let before = state.clone();

        let result = state.record_undone(RemediationAction::RevokePermissionSets);

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn undo_when_idle_is_rejected() {
        let state = RemediationState::Idle;
        assert!(
            state
                .undo_target(RemediationAction::ResetSystemPermissions)
                .is_err()
        );
    }
}
