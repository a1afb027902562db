use grantlens_domain::RemediationAction;

use super::*;

impl AccessReviewSession {
    /// Applies a remediation to the selected user, then reloads everything.
    ///
    /// Returns whether the remediation was applied. Failures leave the
    /// undo availability untouched and raise a notice.
    pub async fn apply_remediation(&mut self, action: Option<RemediationAction>) -> bool {
        let target = self.selected_user.clone();

        match self.remediation.apply(target, action).await {
            Ok(record) => {
                self.note(Notice::success(
                    "Remediation",
                    format!(
                        "Applied {} to user {}.",
                        record.action, record.target_user_id
                    ),
                ));
                self.refresh().await;
                true
            }
            Err(error) => {
                self.note_failure("Remediation", &error);
                false
            }
        }
    }

    /// Reverts the last applied remediation, then reloads everything.
    pub async fn undo_remediation(&mut self, action: RemediationAction) -> bool {
        match self.remediation.undo(action).await {
            Ok(record) => {
                self.note(Notice::success(
                    "Remediation",
                    format!(
                        "Reverted {} for user {}.",
                        record.action, record.target_user_id
                    ),
                ));
                self.refresh().await;
                true
            }
            Err(error) => {
                self.note_failure("Remediation", &error);
                false
            }
        }
    }

    /// Returns the action that can currently be undone.
    #[must_use]
    pub fn undoable_remediation(&self) -> Option<RemediationAction> {
        self.remediation.undoable_action()
    }
}
