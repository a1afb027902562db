use std::sync::Arc;

use tracing::{debug, warn};

use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{
    MergedGrant, PageInfo, PageWindow, SearchGate, SearchRejection, SearchTerm, merge_batch,
};

use crate::{ObjectGrantPage, ObjectGrantQuery, ObjectGrantSource, ReviewSettings};

/// Server-counted pager over object-level grants.
///
/// Each page is fetched and merged on its own; rows never carry over from
/// one page to the next.
pub struct ObjectGrantPager {
    source: Arc<dyn ObjectGrantSource>,
    user_id: Option<UserId>,
    gate: SearchGate,
    term: SearchTerm,
    rejection: Option<SearchRejection>,
    window: PageWindow,
    rows: Vec<MergedGrant>,
    server_result_cap: u64,
}

impl ObjectGrantPager {
    /// Creates a pager with no selected user.
    #[must_use]
    pub fn new(source: Arc<dyn ObjectGrantSource>, settings: &ReviewSettings) -> Self {
        Self {
            source,
            user_id: None,
            gate: SearchGate::new(settings.min_search_length),
            term: SearchTerm::empty(),
            rejection: None,
            window: PageWindow::new(settings.object_page_size),
            rows: Vec::new(),
            server_result_cap: settings.server_result_cap,
        }
    }

    /// Points the pager at another user and drops the current page.
    pub fn select_user(&mut self, user_id: Option<UserId>) {
        self.user_id = user_id;
        self.rejection = None;
        self.clear();
        self.window.reset();
    }

    /// Returns the request the next `fetch_page` would issue.
    #[must_use]
    pub fn query(&self) -> Option<ObjectGrantQuery> {
        self.user_id.as_ref().map(|user_id| ObjectGrantQuery {
            user_id: user_id.clone(),
            page_index: self.window.page_index(),
            page_size: self.window.page_size(),
            term: self.term.clone(),
        })
    }

    /// Fetches the current page, replacing the working set.
    pub async fn fetch_page(&mut self) -> AppResult<()> {
        let Some(query) = self.query() else {
            return Err(AppError::Validation(
                "select a user before loading object grants".to_owned(),
            ));
        };

        let result = self.source.fetch_object_grants(query).await;
        self.absorb_page(result)
    }

    /// Applies a fetch result: replaces the page on success, clears it on failure.
    pub fn absorb_page(&mut self, result: AppResult<ObjectGrantPage>) -> AppResult<()> {
        match result {
            Ok(page) => {
                self.rows = merge_batch(&page.grants);
                self.window.set_server_total(page.total);
                debug!(
                    page_index = self.window.page_index(),
                    raw_rows = page.grants.len(),
                    merged_rows = self.rows.len(),
                    server_total = page.total,
                    "object grant page loaded"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    page_index = self.window.page_index(),
                    error = %error,
                    "object grant page failed to load"
                );
                self.clear();
                Err(error)
            }
        }
    }

    /// Advances one page when a following page exists. Returns whether it moved.
    pub async fn next(&mut self) -> AppResult<bool> {
        let Some(page_index) = self.window.next_index() else {
            return Ok(false);
        };

        self.window.move_to(page_index);
        self.fetch_page().await?;
        Ok(true)
    }

    /// Goes back one page when not on the first. Returns whether it moved.
    pub async fn previous(&mut self) -> AppResult<bool> {
        let Some(page_index) = self.window.previous_index() else {
            return Ok(false);
        };

        self.window.move_to(page_index);
        self.fetch_page().await?;
        Ok(true)
    }

    /// Applies a new search term and reloads page 1.
    ///
    /// A refused term changes nothing and issues no request.
    pub async fn set_search_term(&mut self, term: &str) -> AppResult<()> {
        let accepted = self
            .accept_term(term)
            .map_err(|rejection| AppError::Validation(rejection.to_string()))?;

        self.apply_search_term(accepted).await
    }

    /// Runs `term` through the search gate and remembers a refusal until the
    /// next accepted term.
    pub fn accept_term(&mut self, term: &str) -> Result<SearchTerm, SearchRejection> {
        let result = self.gate.accept(term);
        self.rejection = result.as_ref().err().cloned();
        result
    }

    /// Reloads page 1 under an already accepted term.
    pub async fn apply_search_term(&mut self, term: SearchTerm) -> AppResult<()> {
        self.term = term;
        self.window.reset();
        self.rows.clear();
        self.fetch_page().await
    }

    /// Returns the last refused term, if the latest search was refused.
    #[must_use]
    pub fn search_rejection(&self) -> Option<&SearchRejection> {
        self.rejection.as_ref()
    }

    /// Returns the merged rows of the current page.
    #[must_use]
    pub fn rows(&self) -> &[MergedGrant] {
        self.rows.as_slice()
    }

    /// Returns the page window.
    #[must_use]
    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    /// Returns the accepted search term.
    #[must_use]
    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    /// Returns the display range of the current page.
    #[must_use]
    pub fn page_info(&self) -> PageInfo {
        self.window.page_info()
    }

    /// Returns whether the server total hit the truncation cap.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.window.is_truncated(self.server_result_cap)
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.window.set_server_total(0);
    }
}
