use std::env;
use std::fmt::Display;
use std::str::FromStr;

use grantlens_application::{DEFAULT_PAGE_SIZE, DEFAULT_SERVER_RESULT_CAP, ReviewSettings};
use grantlens_core::{AppError, AppResult, UserId};
use grantlens_domain::{DEFAULT_MIN_SEARCH_LENGTH, RemediationAction, Section};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpRuntimeConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    pub timeout_ms: u64,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub http: Option<HttpRuntimeConfig>,
    pub user_id: Option<UserId>,
    pub object_search: String,
    pub field_search: String,
    pub visible_sections: Vec<Section>,
    pub remediation: Option<RemediationAction>,
    pub settings: ReviewSettings,
}

impl InspectorConfig {
    pub fn load() -> AppResult<Self> {
        let http = optional_env("GRANTLENS_API_BASE_URL")
            .map(|value| {
                let api_base_url = Url::parse(value.as_str()).map_err(|error| {
                    AppError::Validation(format!(
                        "invalid GRANTLENS_API_BASE_URL '{value}': {error}"
                    ))
                })?;
                if api_base_url.cannot_be_a_base() {
                    return Err(AppError::Validation(format!(
                        "GRANTLENS_API_BASE_URL '{value}' must be an absolute http(s) URL"
                    )));
                }

                let timeout_ms = parse_env("GRANTLENS_HTTP_TIMEOUT_MS", 15_000_u64)?;
                let max_attempts = parse_env("GRANTLENS_HTTP_MAX_ATTEMPTS", 3_u8)?;
                let retry_backoff_ms = parse_env("GRANTLENS_HTTP_RETRY_BACKOFF_MS", 250_u64)?;

                if timeout_ms == 0 {
                    return Err(AppError::Validation(
                        "GRANTLENS_HTTP_TIMEOUT_MS must be greater than zero".to_owned(),
                    ));
                }

                if max_attempts == 0 {
                    return Err(AppError::Validation(
                        "GRANTLENS_HTTP_MAX_ATTEMPTS must be greater than zero".to_owned(),
                    ));
                }

                Ok(HttpRuntimeConfig {
                    api_base_url,
                    api_token: optional_env("GRANTLENS_API_TOKEN"),
                    timeout_ms,
                    max_attempts,
                    retry_backoff_ms,
                })
            })
            .transpose()?;

        let user_id = optional_env("GRANTLENS_USER_ID")
            .map(UserId::new)
            .transpose()?;
        let visible_sections = optional_env("GRANTLENS_SECTIONS")
            .map(|value| parse_sections(value.as_str()))
            .transpose()?
            .unwrap_or_default();
        let remediation = optional_env("GRANTLENS_APPLY_REMEDIATION")
            .map(|value| RemediationAction::from_str(value.as_str()))
            .transpose()?;

        let settings = ReviewSettings::new(
            parse_env("GRANTLENS_OBJECT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            parse_env("GRANTLENS_FIELD_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            parse_env("GRANTLENS_MIN_SEARCH_LENGTH", DEFAULT_MIN_SEARCH_LENGTH)?,
            parse_env("GRANTLENS_SERVER_RESULT_CAP", DEFAULT_SERVER_RESULT_CAP)?,
        )?;

        Ok(Self {
            http,
            user_id,
            object_search: optional_env("GRANTLENS_OBJECT_SEARCH").unwrap_or_default(),
            field_search: optional_env("GRANTLENS_FIELD_SEARCH").unwrap_or_default(),
            visible_sections,
            remediation,
            settings,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match optional_env(name) {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}

fn parse_sections(value: &str) -> AppResult<Vec<Section>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .map(Section::from_str)
        .collect()
}
