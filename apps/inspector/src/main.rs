//! Grantlens inspector: one access review run printed as JSON.

#![forbid(unsafe_code)]

mod demo_seed;
mod inspector_config;

use std::sync::Arc;
use std::time::Duration;

use grantlens_application::{AccessReviewPorts, AccessReviewSession, LoadOutcome};
use grantlens_core::AppError;
use grantlens_infrastructure::HttpAccessReviewClient;
use tracing::{info, warn};

use crate::inspector_config::{HttpRuntimeConfig, InspectorConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = InspectorConfig::load()?;
    let ports = match &config.http {
        Some(http) => http_ports(http)?,
        None => {
            info!("GRANTLENS_API_BASE_URL not set, reviewing the in-memory demo directory");
            demo_seed::ports().await?
        }
    };

    let mut session = AccessReviewSession::new(ports, config.settings);
    info!(
        session_id = %session.session_id(),
        object_page_size = config.settings.object_page_size,
        field_page_size = config.settings.field_page_size,
        "grantlens-inspector started"
    );

    if let Err(error) = session.load_user_options().await {
        warn!(error = %error, "failed to list active users");
    }

    let user_id = config.user_id.clone().or_else(|| {
        session
            .user_options()
            .first()
            .map(|option| option.value.clone())
    });
    let Some(user_id) = user_id else {
        return Err(AppError::Validation(
            "no active user to review; set GRANTLENS_USER_ID".to_owned(),
        ));
    };

    for section in &config.visible_sections {
        session.set_section_visible(*section, true).await;
    }

    if session.select_and_load(Some(user_id.clone())).await == Some(LoadOutcome::Stale) {
        warn!(user_id = %user_id, "user load was superseded");
    }

    if !config.object_search.is_empty()
        && let Err(rejection) = session
            .search_object_grants(config.object_search.as_str())
            .await
    {
        warn!(%rejection, "GRANTLENS_OBJECT_SEARCH was not applied");
    }

    if !config.field_search.is_empty()
        && let Err(rejection) = session
            .search_field_grants(config.field_search.as_str())
            .await
    {
        warn!(%rejection, "GRANTLENS_FIELD_SEARCH was not applied");
    }

    if let Some(action) = config.remediation {
        session.apply_remediation(Some(action)).await;
    }

    let rendered = serde_json::to_string_pretty(&session.snapshot())
        .map_err(|error| AppError::Internal(format!("failed to render snapshot: {error}")))?;
    println!("{rendered}");

    Ok(())
}

fn http_ports(config: &HttpRuntimeConfig) -> Result<AccessReviewPorts, AppError> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let mut client = HttpAccessReviewClient::new(
        http_client,
        config.api_base_url.clone(),
        config.max_attempts,
        config.retry_backoff_ms,
    );
    if let Some(api_token) = &config.api_token {
        client = client.with_api_token(api_token.as_str());
    }

    info!(api_base_url = %config.api_base_url, "reviewing through the HTTP access review API");

    let client = Arc::new(client);
    Ok(AccessReviewPorts {
        users: client.clone(),
        risk: client.clone(),
        object_grants: client.clone(),
        field_grants: client.clone(),
        system_permissions: client.clone(),
        sharing: client.clone(),
        remediation: client,
    })
}
