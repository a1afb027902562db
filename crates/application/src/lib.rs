//! Application services and ports.

#![forbid(unsafe_code)]

mod access_review_service;
mod field_grant_pager;
mod grant_ports;
mod notice;
mod object_grant_pager;
mod remediation_service;
mod review_ports;
mod review_settings;

pub use access_review_service::{
    AccessReviewPorts, AccessReviewSession, FieldGrantView, LoadOutcome, ObjectGrantView,
    ReviewSnapshot, SelectionTicket, UserAccessLoad, UserAccessRequest,
};
pub use field_grant_pager::FieldGrantPager;
pub use grant_ports::{
    FieldGrantBatch, FieldGrantQuery, FieldGrantSource, ObjectGrantPage, ObjectGrantQuery,
    ObjectGrantSource, SystemPermissionSource,
};
pub use notice::{Notice, NoticeSeverity};
pub use object_grant_pager::ObjectGrantPager;
pub use remediation_service::{RemediationGateway, RemediationService, SELF_REMEDIATION_MESSAGE};
pub use review_ports::{RiskAnalyzer, SharingSource, UserDirectory};
pub use review_settings::{DEFAULT_PAGE_SIZE, DEFAULT_SERVER_RESULT_CAP, ReviewSettings};
