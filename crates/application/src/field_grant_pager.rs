use std::sync::Arc;

use tracing::{debug, warn};

use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{
    MergedGrant, MergedGrantBuffer, PageInfo, SearchGate, SearchRejection, SearchTerm,
    local_page_bounds, records_required_for_page,
};

use crate::{FieldGrantBatch, FieldGrantQuery, FieldGrantSource, ReviewSettings};

/// Position of the field-grant cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// Nothing fetched since the last reset.
    Fresh,
    /// The server handed out a continuation token.
    Pending(String),
    /// The server reported the end of the listing.
    Exhausted,
}

/// Cursor-driven pager over field-level grants.
///
/// Batches accumulate into one merged buffer, so a later batch can upgrade
/// flags of an entity seen earlier. Pages are local slices of that buffer.
pub struct FieldGrantPager {
    source: Arc<dyn FieldGrantSource>,
    user_id: Option<UserId>,
    gate: SearchGate,
    term: SearchTerm,
    rejection: Option<SearchRejection>,
    cursor: CursorState,
    buffer: MergedGrantBuffer,
    page_index: u32,
    page_size: u32,
}

impl FieldGrantPager {
    /// Creates a pager with no selected user.
    #[must_use]
    pub fn new(source: Arc<dyn FieldGrantSource>, settings: &ReviewSettings) -> Self {
        Self {
            source,
            user_id: None,
            gate: SearchGate::new(settings.min_search_length),
            term: SearchTerm::empty(),
            rejection: None,
            cursor: CursorState::Fresh,
            buffer: MergedGrantBuffer::new(),
            page_index: 1,
            page_size: settings.field_page_size.max(1),
        }
    }

    /// Points the pager at another user and drops the buffer.
    pub fn select_user(&mut self, user_id: Option<UserId>) {
        self.user_id = user_id;
        self.rejection = None;
        self.reset();
    }

    /// Returns whether another batch can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        !matches!(self.cursor, CursorState::Exhausted)
    }

    /// Returns the request the next `fetch_more` would issue.
    #[must_use]
    pub fn query(&self) -> Option<FieldGrantQuery> {
        let user_id = self.user_id.as_ref()?;
        let continuation_token = match &self.cursor {
            CursorState::Fresh => None,
            CursorState::Pending(token) => Some(token.clone()),
            CursorState::Exhausted => return None,
        };

        Some(FieldGrantQuery {
            user_id: user_id.clone(),
            continuation_token,
            term: self.term.clone(),
        })
    }

    /// Fetches the next batch into the buffer and returns the raw row count.
    ///
    /// Once the cursor is exhausted this is a no-op that issues no request.
    pub async fn fetch_more(&mut self) -> AppResult<usize> {
        if self.user_id.is_none() {
            return Err(AppError::Validation(
                "select a user before loading field grants".to_owned(),
            ));
        }

        let Some(query) = self.query() else {
            return Ok(0);
        };

        let result = self.source.fetch_field_grants(query).await;
        self.absorb_batch(result)
    }

    /// Applies a fetch result to the buffer and cursor.
    ///
    /// A failure clears the buffer and marks the cursor exhausted.
    pub fn absorb_batch(&mut self, result: AppResult<FieldGrantBatch>) -> AppResult<usize> {
        match result {
            Ok(batch) => {
                let received = batch.grants.len();
                self.buffer.extend(&batch.grants);
                self.cursor = match batch.next_token {
                    // A token that does not advance would refetch the same batch forever.
                    Some(token) if self.cursor == CursorState::Pending(token.clone()) => {
                        warn!(token = %token, "field grant cursor did not advance");
                        CursorState::Exhausted
                    }
                    Some(token) => CursorState::Pending(token),
                    None => CursorState::Exhausted,
                };
                debug!(
                    received,
                    buffered = self.buffer.len(),
                    has_more = self.has_more(),
                    "field grant batch merged"
                );
                Ok(received)
            }
            Err(error) => {
                warn!(error = %error, "field grant batch failed to load");
                self.buffer.clear();
                self.cursor = CursorState::Exhausted;
                self.page_index = 1;
                Err(error)
            }
        }
    }

    /// Clears buffer and cursor, applies a new term and fetches once.
    ///
    /// A refused term changes nothing and issues no request.
    pub async fn reset_and_refetch(&mut self, term: &str) -> AppResult<()> {
        let accepted = self
            .accept_term(term)
            .map_err(|rejection| AppError::Validation(rejection.to_string()))?;

        self.refetch_with(accepted).await
    }

    /// Runs `term` through the search gate and remembers a refusal until the
    /// next accepted term.
    pub fn accept_term(&mut self, term: &str) -> Result<SearchTerm, SearchRejection> {
        let result = self.gate.accept(term);
        self.rejection = result.as_ref().err().cloned();
        result
    }

    /// Clears buffer and cursor and fetches once under an already accepted term.
    pub async fn refetch_with(&mut self, term: SearchTerm) -> AppResult<()> {
        self.term = term;
        self.reset();
        self.fetch_more().await.map(|_| ())
    }

    /// Returns the last refused term, if the latest search was refused.
    #[must_use]
    pub fn search_rejection(&self) -> Option<&SearchRejection> {
        self.rejection.as_ref()
    }

    /// Drops the buffer and fetches the first batch again under the current term.
    ///
    /// Unlike `fetch_more`, this recovers a cursor exhausted by a failed fetch.
    pub async fn reload(&mut self) -> AppResult<usize> {
        self.reset();
        self.fetch_more().await
    }

    /// Moves to a local page, fetching batches until it is filled or the
    /// cursor runs out. Returns whether the page index changed.
    pub async fn go_to_page(&mut self, page_index: u32) -> AppResult<bool> {
        let page_index = page_index.max(1);
        let required = records_required_for_page(page_index, self.page_size);

        while self.buffer.len() < required && self.has_more() {
            if self.fetch_more().await? == 0 {
                break;
            }
        }

        let bounds = local_page_bounds(page_index, self.page_size, self.buffer.len());
        if page_index > 1 && bounds.is_empty() {
            return Ok(false);
        }

        let moved = self.page_index != page_index;
        self.page_index = page_index;
        Ok(moved)
    }

    /// Advances one local page unless the current one is the last.
    pub async fn next_page(&mut self) -> AppResult<bool> {
        if self.is_last_page() {
            return Ok(false);
        }

        self.go_to_page(self.page_index.saturating_add(1)).await
    }

    /// Goes back one local page. Never fetches.
    pub fn previous_page(&mut self) -> bool {
        if self.page_index <= 1 {
            return false;
        }

        self.page_index -= 1;
        true
    }

    /// Returns the rows of the current local page.
    #[must_use]
    pub fn current_page(&self) -> &[MergedGrant] {
        let bounds = local_page_bounds(self.page_index, self.page_size, self.buffer.len());
        &self.buffer.as_slice()[bounds]
    }

    /// Returns buffered rows that match the current term on object or field name.
    #[must_use]
    pub fn filtered_rows(&self) -> Vec<&MergedGrant> {
        self.buffer
            .as_slice()
            .iter()
            .filter(|grant| grant.matches(self.term.as_str()))
            .collect()
    }

    /// Returns every buffered row in first-seen order.
    #[must_use]
    pub fn buffered(&self) -> &[MergedGrant] {
        self.buffer.as_slice()
    }

    /// Returns the 1-based local page index.
    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Returns the accepted search term.
    #[must_use]
    pub fn term(&self) -> &SearchTerm {
        &self.term
    }

    /// Returns whether the current page is the first.
    #[must_use]
    pub fn is_first_page(&self) -> bool {
        self.page_index == 1
    }

    /// Returns whether neither the buffer nor the server has rows past this page.
    #[must_use]
    pub fn is_last_page(&self) -> bool {
        !self.has_more()
            && records_required_for_page(self.page_index, self.page_size) >= self.buffer.len()
    }

    /// Returns the display range of the current page over the buffer.
    #[must_use]
    pub fn page_info(&self) -> PageInfo {
        let buffered = u64::try_from(self.buffer.len()).unwrap_or(u64::MAX);
        PageInfo::new(self.page_index, self.page_size, buffered)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = CursorState::Fresh;
        self.page_index = 1;
    }
}
