use std::collections::BTreeMap;

use async_trait::async_trait;

use grantlens_core::{AppResult, UserId};
use grantlens_domain::{Grant, SearchTerm};

/// Request for one server-counted page of object-level grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectGrantQuery {
    /// Reviewed user.
    pub user_id: UserId,
    /// 1-based page index.
    pub page_index: u32,
    /// Rows per page.
    pub page_size: u32,
    /// Accepted search term; empty means no filter.
    pub term: SearchTerm,
}

/// One page of raw object-level grant rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectGrantPage {
    /// Raw rows of the requested page.
    pub grants: Vec<Grant>,
    /// Authoritative number of matching rows across all pages.
    pub total: u64,
}

/// Request for the next batch of field-level grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGrantQuery {
    /// Reviewed user.
    pub user_id: UserId,
    /// Continuation token from the previous batch; `None` requests the first one.
    pub continuation_token: Option<String>,
    /// Accepted search term; empty means no filter.
    pub term: SearchTerm,
}

/// One batch of raw field-level grant rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldGrantBatch {
    /// Raw rows of the batch.
    pub grants: Vec<Grant>,
    /// Token for the following batch; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// Port for offset-paged object-level grants.
#[async_trait]
pub trait ObjectGrantSource: Send + Sync {
    /// Fetches one page of object grants with the matching total.
    async fn fetch_object_grants(&self, query: ObjectGrantQuery) -> AppResult<ObjectGrantPage>;
}

/// Port for cursor-paged field-level grants.
#[async_trait]
pub trait FieldGrantSource: Send + Sync {
    /// Fetches the batch following the query's continuation token.
    async fn fetch_field_grants(&self, query: FieldGrantQuery) -> AppResult<FieldGrantBatch>;
}

/// Port for system-level permissions.
#[async_trait]
pub trait SystemPermissionSource: Send + Sync {
    /// Returns every system permission name with its granted state.
    async fn fetch_system_permissions(&self, user_id: &UserId)
    -> AppResult<BTreeMap<String, bool>>;
}
