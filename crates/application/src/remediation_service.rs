//! Remediation port and application service.
//!
//! Drives the remediation state machine around the remote apply and undo
//! calls. Transitions happen only after the remote call succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{
    RemediationAction, RemediationRecord, RemediationRequest, RemediationState,
};

/// Operator-facing explanation for a refused self-targeted remediation.
pub const SELF_REMEDIATION_MESSAGE: &str =
    "You cannot revoke or reset access on your own user account.";

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Port for the remote remediation procedures.
#[async_trait]
pub trait RemediationGateway: Send + Sync {
    /// Applies `action` to the user.
    async fn apply_remediation(&self, user_id: &UserId, action: RemediationAction)
    -> AppResult<()>;

    /// Reverts a previously applied `action` on the user.
    async fn undo_remediation(&self, user_id: &UserId, action: RemediationAction)
    -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service tracking the single undoable remediation.
pub struct RemediationService {
    gateway: Arc<dyn RemediationGateway>,
    state: RemediationState,
}

impl RemediationService {
    /// Creates an idle remediation service.
    #[must_use]
    pub fn new(gateway: Arc<dyn RemediationGateway>) -> Self {
        Self {
            gateway,
            state: RemediationState::Idle,
        }
    }

    /// Applies an action to a target user.
    ///
    /// Fails with a validation error before any remote call when either
    /// input is missing. A successful apply supersedes any undoable record.
    pub async fn apply(
        &mut self,
        target_user_id: Option<UserId>,
        action: Option<RemediationAction>,
    ) -> AppResult<RemediationRecord> {
        let request = RemediationRequest::new(target_user_id, action)?;

        self.gateway
            .apply_remediation(request.target_user_id(), request.action())
            .await
            .map_err(rewrite_restriction)?;

        if let Some(superseded) = self.state.record_applied(&request, Utc::now()) {
            debug!(
                superseded_action = %superseded.action,
                "previous remediation is no longer undoable"
            );
        }

        info!(
            user_id = %request.target_user_id(),
            action = %request.action(),
            "remediation applied"
        );

        self.state.current().cloned().ok_or_else(|| {
            AppError::Internal("remediation state lost its applied record".to_owned())
        })
    }

    /// Reverts the last applied action when it equals `action`.
    pub async fn undo(&mut self, action: RemediationAction) -> AppResult<RemediationRecord> {
        let target_user_id = self.state.undo_target(action)?.target_user_id.clone();

        self.gateway
            .undo_remediation(&target_user_id, action)
            .await
            .map_err(rewrite_restriction)?;

        let record = self.state.record_undone(action)?;
        info!(
            user_id = %target_user_id,
            action = %action,
            "remediation undone"
        );

        Ok(record)
    }

    /// Returns the action that can currently be undone.
    #[must_use]
    pub fn undoable_action(&self) -> Option<RemediationAction> {
        self.state.undoable_action()
    }

    /// Returns the state machine.
    #[must_use]
    pub fn state(&self) -> &RemediationState {
        &self.state
    }
}

fn rewrite_restriction(error: AppError) -> AppError {
    match error {
        AppError::RemediationRestricted(raw) => {
            debug!(backend_message = %raw, "remediation restricted by remote service");
            AppError::RemediationRestricted(SELF_REMEDIATION_MESSAGE.to_owned())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use grantlens_core::{AppError, AppResult, UserId};
    use grantlens_domain::{RemediationAction, RemediationState};

    use super::{RemediationGateway, RemediationService, SELF_REMEDIATION_MESSAGE};

    #[derive(Default)]
    struct FakeRemediationGateway {
        calls: Mutex<Vec<(String, UserId, RemediationAction)>>,
        failure: Mutex<Option<AppError>>,
    }

    impl FakeRemediationGateway {
        async fn fail_next(&self, error: AppError) {
            *self.failure.lock().await = Some(error);
        }

        async fn record(
            &self,
            call: &str,
            user_id: &UserId,
            action: RemediationAction,
        ) -> AppResult<()> {
            self.calls
                .lock()
                .await
                .push((call.to_owned(), user_id.clone(), action));
            match self.failure.lock().await.take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RemediationGateway for FakeRemediationGateway {
        async fn apply_remediation(
            &self,
            user_id: &UserId,
            action: RemediationAction,
        ) -> AppResult<()> {
            self.record("apply", user_id, action).await
        }

        async fn undo_remediation(
            &self,
            user_id: &UserId,
            action: RemediationAction,
        ) -> AppResult<()> {
            self.record("undo", user_id, action).await
        }
    }

    fn target() -> Option<UserId> {
        UserId::new("005U1").ok()
    }

    #[tokio::test]
    async fn missing_inputs_fail_before_any_call() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        let mut service = RemediationService::new(gateway.clone());

        let no_target = service
            .apply(None, Some(RemediationAction::RevokePermissionSets))
            .await;
        let no_action = service.apply(target(), None).await;

        assert!(matches!(no_target, Err(AppError::Validation(_))));
        assert!(matches!(no_action, Err(AppError::Validation(_))));
        assert!(gateway.calls.lock().await.is_empty());
        assert_eq!(service.state(), &RemediationState::Idle);
    }

    #[tokio::test]
    async fn only_latest_apply_is_undoable() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        let mut service = RemediationService::new(gateway.clone());

        let first = service
            .apply(target(), Some(RemediationAction::RevokePermissionSets))
            .await;
        let second = service
            .apply(target(), Some(RemediationAction::ResetSystemPermissions))
            .await;

        assert!(first.is_ok());
        assert!(second.is_ok_and(|record| record.undoable));
        assert_eq!(
            service.undoable_action(),
            Some(RemediationAction::ResetSystemPermissions)
        );

        let stale_undo = service.undo(RemediationAction::RevokePermissionSets).await;
        assert!(matches!(stale_undo, Err(AppError::Validation(_))));
        assert_eq!(gateway.calls.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn undo_returns_to_idle() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        let mut service = RemediationService::new(gateway.clone());
        assert!(
            service
                .apply(target(), Some(RemediationAction::RevokePermissionSets))
                .await
                .is_ok()
        );

        let undone = service.undo(RemediationAction::RevokePermissionSets).await;

        assert!(undone.is_ok_and(|record| !record.undoable));
        assert_eq!(service.undoable_action(), None);
        let calls = gateway.calls.lock().await;
        assert_eq!(calls[1].0, "undo");
        assert_eq!(calls[1].1.as_str(), "005U1");
    }

    #[tokio::test]
    async fn failed_apply_keeps_previous_state() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        let mut service = RemediationService::new(gateway.clone());
        assert!(
            service
                .apply(target(), Some(RemediationAction::RevokePermissionSets))
                .await
                .is_ok()
        );
        gateway
            .fail_next(AppError::Network("gateway timeout".to_owned()))
            .await;

        let result = service
            .apply(target(), Some(RemediationAction::ResetSystemPermissions))
            .await;

        assert!(matches!(result, Err(AppError::Network(_))));
        assert_eq!(
            service.undoable_action(),
            Some(RemediationAction::RevokePermissionSets)
        );
    }

    #[tokio::test]
    async fn failed_undo_keeps_record_undoable() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        let mut service = RemediationService::new(gateway.clone());
        assert!(
            service
                .apply(target(), Some(RemediationAction::ResetSystemPermissions))
                .await
                .is_ok()
        );
        gateway
            .fail_next(AppError::Network("connection refused".to_owned()))
            .await;

        let result = service.undo(RemediationAction::ResetSystemPermissions).await;

        assert!(result.is_err());
        assert_eq!(
            service.undoable_action(),
            Some(RemediationAction::ResetSystemPermissions)
        );
    }

    #[tokio::test]
    async fn self_targeted_rejection_is_rewritten() {
        let gateway = Arc::new(FakeRemediationGateway::default());
        gateway
            .fail_next(AppError::RemediationRestricted(
                "FIELD_INTEGRITY_EXCEPTION: cannot modify running user".to_owned(),
            ))
            .await;
        let mut service = RemediationService::new(gateway);

        let result = service
            .apply(target(), Some(RemediationAction::RevokePermissionSets))
            .await;

        assert_eq!(
            result.err(),
            Some(AppError::RemediationRestricted(
                SELF_REMEDIATION_MESSAGE.to_owned()
            ))
        );
        assert_eq!(service.state(), &RemediationState::Idle);
    }
}
