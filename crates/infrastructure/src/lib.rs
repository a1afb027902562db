//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_access_review_client;
mod in_memory_access_directory;

pub use http_access_review_client::HttpAccessReviewClient;
pub use in_memory_access_directory::{InMemoryAccessDirectory, UserAccessFixture};
