//! Domain values and invariants of an access review.

#![forbid(unsafe_code)]

mod access;
mod grant;
mod merge;
mod paging;
mod remediation;
mod search;
mod section;
mod user;

pub use access::{RoleHierarchyEntry, SharingRuleAccess, SystemPermissionRow};
pub use grant::{AccessFlags, Grant, GrantSourceType};
pub use merge::{
    CUSTOM_OBJECT_SUFFIX, GrantKey, GrantProvenance, INTERNAL_NAMESPACE_TOKEN, MergedGrant,
    MergedGrantBuffer, merge, merge_batch, normalize_field_name, normalize_object_name,
};
pub use paging::{PageInfo, PageWindow, local_page_bounds, records_required_for_page};
pub use remediation::{
    RemediationAction, RemediationRecord, RemediationRequest, RemediationState,
};
pub use search::{DEFAULT_MIN_SEARCH_LENGTH, SearchGate, SearchRejection, SearchTerm};
pub use section::{Section, VisibleSections};
pub use user::{RiskAssessment, RiskLevel, UserDetails, UserOption};
