use grantlens_domain::{MergedGrant, SearchRejection};

use super::*;

impl AccessReviewSession {
    /// Returns the object-level pager.
    #[must_use]
    pub fn object_grants(&self) -> &ObjectGrantPager {
        &self.object_grants
    }

    /// Returns the field-level pager.
    #[must_use]
    pub fn field_grants(&self) -> &FieldGrantPager {
        &self.field_grants
    }

    /// Returns the loaded user details.
    #[must_use]
    pub fn user_details(&self) -> Option<&UserDetails> {
        self.user_details.as_ref()
    }

    /// Returns the loaded risk assessment.
    #[must_use]
    pub fn risk(&self) -> Option<&RiskAssessment> {
        self.risk.as_ref()
    }

    /// Returns the system permission rows.
    #[must_use]
    pub fn system_permissions(&self) -> &[SystemPermissionRow] {
        self.system_permissions.as_slice()
    }

    /// Returns permission-set assignments plus system permissions.
    #[must_use]
    pub fn total_permissions(&self) -> usize {
        let permission_sets = self
            .user_details
            .as_ref()
            .map_or(0, |details| details.permission_sets.len());

        permission_sets + self.system_permissions.len()
    }

    /// Returns field rows matching the field search term.
    #[must_use]
    pub fn filtered_field_grants(&self) -> Vec<&MergedGrant> {
        self.field_grants.filtered_rows()
    }

    /// Moves to the next object page. Returns whether it moved.
    pub async fn next_object_page(&mut self) -> bool {
        let result = self.object_grants.next().await;
        self.settle_move("Object Grants", result)
    }

    /// Moves to the previous object page. Returns whether it moved.
    pub async fn previous_object_page(&mut self) -> bool {
        let result = self.object_grants.previous().await;
        self.settle_move("Object Grants", result)
    }

    /// Applies an object search term and reloads page 1.
    ///
    /// A short term raises an informational notice and is handed back to the
    /// caller; nothing is fetched.
    pub async fn search_object_grants(&mut self, term: &str) -> Result<(), SearchRejection> {
        let accepted = match self.object_grants.accept_term(term) {
            Ok(accepted) => accepted,
            Err(rejection) => return Err(self.reject_search("Object Grants", rejection)),
        };

        if let Err(error) = self.object_grants.apply_search_term(accepted).await {
            self.note_failure("Object Grants", &error);
        }

        Ok(())
    }

    /// Applies a field search term and refetches the first batch.
    ///
    /// A short term raises an informational notice and is handed back to the
    /// caller; the buffer is kept.
    pub async fn search_field_grants(&mut self, term: &str) -> Result<(), SearchRejection> {
        let accepted = match self.field_grants.accept_term(term) {
            Ok(accepted) => accepted,
            Err(rejection) => return Err(self.reject_search("Field Grants", rejection)),
        };

        if let Err(error) = self.field_grants.refetch_with(accepted).await {
            self.note_failure("Field Grants", &error);
        }

        Ok(())
    }

    /// Fetches the next field batch when the cursor has more.
    pub async fn load_more_field_grants(&mut self) -> usize {
        match self.field_grants.fetch_more().await {
            Ok(received) => received,
            Err(error) => {
                self.note_failure("Field Grants", &error);
                0
            }
        }
    }

    /// Moves to the next local field page, fetching when the buffer is short.
    pub async fn next_field_page(&mut self) -> bool {
        let result = self.field_grants.next_page().await;
        self.settle_move("Field Grants", result)
    }

    /// Moves to the previous local field page.
    pub fn previous_field_page(&mut self) -> bool {
        self.field_grants.previous_page()
    }

    /// Jumps to a local field page, fetching when the buffer is short.
    pub async fn go_to_field_page(&mut self, page_index: u32) -> bool {
        let result = self.field_grants.go_to_page(page_index).await;
        self.settle_move("Field Grants", result)
    }

    fn reject_search(&mut self, title: &str, rejection: SearchRejection) -> SearchRejection {
        debug!(
            session_id = %self.session_id,
            title,
            term = %rejection.term,
            min_length = rejection.min_length,
            "search term refused"
        );
        self.note(Notice::search_rejected(title, &rejection));
        rejection
    }

    fn settle_move(&mut self, title: &str, result: AppResult<bool>) -> bool {
        match result {
            Ok(moved) => moved,
            Err(error) => {
                self.note_failure(title, &error);
                false
            }
        }
    }
}
