use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use grantlens_application::{
    FieldGrantBatch, FieldGrantQuery, FieldGrantSource, ObjectGrantPage, ObjectGrantQuery,
    ObjectGrantSource, RemediationGateway, RiskAnalyzer, SharingSource, SystemPermissionSource,
    UserDirectory,
};
use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{
    Grant, RemediationAction, RiskAssessment, RoleHierarchyEntry, SharingRuleAccess,
    UserDetails, UserOption,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
struct ObjectGrantPageResponse {
    #[serde(default)]
    grants: Vec<Grant>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct FieldGrantBatchResponse {
    #[serde(default)]
    grants: Vec<Grant>,
    #[serde(default)]
    last_record_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RemediationRequestBody<'a> {
    action: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Remediation,
}

/// REST client for the grants-and-remediation service.
///
/// Transient failures (5xx, 429, transport errors) are retried with linear
/// backoff. Every port of the review session is served from one base URL.
pub struct HttpAccessReviewClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpAccessReviewClient {
    /// Creates a client rooted at `base_url`.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: Url,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            http_client,
            base_url,
            api_token: None,
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        }
    }

    /// Adds a bearer token sent with every request.
    #[must_use]
    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "API base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn user_endpoint(&self, user_id: &UserId, resource: &str) -> AppResult<Url> {
        self.endpoint(&["users", user_id.as_str(), resource])
    }

    async fn get_json<T>(&self, operation: &'static str, url: Url) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send_with_retry(operation, CallKind::Read, |client| client.get(url.clone()))
            .await?;

        response.json::<T>().await.map_err(|error| {
            AppError::Network(format!("{operation} returned an unreadable body: {error}"))
        })
    }

    async fn post_remediation(
        &self,
        operation: &'static str,
        url: Url,
        action: RemediationAction,
    ) -> AppResult<()> {
        let body = RemediationRequestBody {
            action: action.as_str(),
        };
        // One key per call; every retry of the same call repeats it.
        let idempotency_key = Uuid::new_v4().to_string();
        debug!(operation, idempotency_key = %idempotency_key, "sending remediation request");

        self.send_with_retry(operation, CallKind::Remediation, |client| {
            client
                .post(url.clone())
                .header(IDEMPOTENCY_KEY_HEADER, idempotency_key.as_str())
                .json(&body)
        })
        .await
        .map(|_| ())
    }

    async fn send_with_retry<F>(
        &self,
        operation: &'static str,
        kind: CallKind,
        mut build: F,
    ) -> AppResult<reqwest::Response>
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let mut builder = build(&self.http_client);
            if let Some(api_token) = &self.api_token {
                builder = builder.bearer_auth(api_token);
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(operation, attempt, "access review request succeeded");
                    return Ok(response);
                }
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS =>
                {
                    last_error = Some(format!(
                        "{operation} hit transient HTTP status {}",
                        response.status()
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "<response body unavailable>".to_owned());
                    return Err(rejection_error(operation, kind, status, body));
                }
                Err(error) => {
                    last_error = Some(format!("{operation} transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                warn!(operation, attempt, delay_ms = delay, "retrying access review request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Network(last_error.unwrap_or_else(|| {
            format!("{operation} exhausted retries")
        })))
    }
}

fn rejection_error(
    operation: &'static str,
    kind: CallKind,
    status: StatusCode,
    body: String,
) -> AppError {
    match (kind, status) {
        (CallKind::Remediation, StatusCode::FORBIDDEN) => AppError::RemediationRestricted(body),
        (_, StatusCode::NOT_FOUND) => {
            AppError::NotFound(format!("{operation} found nothing: {body}"))
        }
        _ => AppError::Network(format!("{operation} failed with status {status}: {body}")),
    }
}

#[async_trait]
impl UserDirectory for HttpAccessReviewClient {
    async fn list_active_users(&self) -> AppResult<Vec<UserOption>> {
        let url = self.endpoint(&["users"])?;
        self.get_json("list active users", url).await
    }

    async fn fetch_user_details(&self, user_id: &UserId) -> AppResult<UserDetails> {
        let url = self.endpoint(&["users", user_id.as_str()])?;
        self.get_json("fetch user details", url).await
    }
}

#[async_trait]
impl RiskAnalyzer for HttpAccessReviewClient {
    async fn analyze_user_risk(&self, user_id: &UserId) -> AppResult<RiskAssessment> {
        let url = self.user_endpoint(user_id, "risk")?;
        self.get_json("analyze user risk", url).await
    }
}

#[async_trait]
impl ObjectGrantSource for HttpAccessReviewClient {
    async fn fetch_object_grants(&self, query: ObjectGrantQuery) -> AppResult<ObjectGrantPage> {
        let mut url = self.user_endpoint(&query.user_id, "object-grants")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", query.page_index.to_string().as_str())
                .append_pair("page_size", query.page_size.to_string().as_str());
            if let Some(term) = query.term.as_filter() {
                pairs.append_pair("search", term);
            }
        }

        let response: ObjectGrantPageResponse =
            self.get_json("fetch object grants", url).await?;

        Ok(ObjectGrantPage {
            grants: response.grants,
            total: response.total,
        })
    }
}

#[async_trait]
impl FieldGrantSource for HttpAccessReviewClient {
    async fn fetch_field_grants(&self, query: FieldGrantQuery) -> AppResult<FieldGrantBatch> {
        let mut url = self.user_endpoint(&query.user_id, "field-grants")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = query.continuation_token.as_deref() {
                pairs.append_pair("last_record_id", token);
            }
            if let Some(term) = query.term.as_filter() {
                pairs.append_pair("search", term);
            }
        }

        let response: FieldGrantBatchResponse = self.get_json("fetch field grants", url).await?;

        Ok(FieldGrantBatch {
            grants: response.grants,
            next_token: response.last_record_id.filter(|token| !token.is_empty()),
        })
    }
}

#[async_trait]
impl SystemPermissionSource for HttpAccessReviewClient {
    async fn fetch_system_permissions(
        &self,
        user_id: &UserId,
    ) -> AppResult<BTreeMap<String, bool>> {
        let url = self.user_endpoint(user_id, "system-permissions")?;
        self.get_json("fetch system permissions", url).await
    }
}

#[async_trait]
impl SharingSource for HttpAccessReviewClient {
    async fn fetch_sharing_rules(&self, user_id: &UserId) -> AppResult<Vec<SharingRuleAccess>> {
        let url = self.user_endpoint(user_id, "sharing-rules")?;
        self.get_json("fetch sharing rules", url).await
    }

    async fn fetch_role_hierarchy(&self, user_id: &UserId) -> AppResult<Vec<RoleHierarchyEntry>> {
        let url = self.user_endpoint(user_id, "role-hierarchy")?;
        self.get_json("fetch role hierarchy", url).await
    }
}

#[async_trait]
impl RemediationGateway for HttpAccessReviewClient {
    async fn apply_remediation(
        &self,
        user_id: &UserId,
        action: RemediationAction,
    ) -> AppResult<()> {
        let url = self.user_endpoint(user_id, "remediations")?;
        self.post_remediation("apply remediation", url, action)
            .await
    }

    async fn undo_remediation(
        &self,
        user_id: &UserId,
        action: RemediationAction,
    ) -> AppResult<()> {
        let url = self.endpoint(&["users", user_id.as_str(), "remediations", "undo"])?;
        self.post_remediation("undo remediation", url, action)
            .await
    }
}

#[cfg(test)]
mod tests;
