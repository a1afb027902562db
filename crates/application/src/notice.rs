use grantlens_core::AppError;
use grantlens_domain::SearchRejection;
use serde::Serialize;

/// Severity of an operator-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    /// Informational, nothing failed.
    Info,
    /// A requested action completed.
    Success,
    /// A section degraded to its empty state.
    Error,
}

/// Non-fatal message raised by a review operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Severity.
    pub severity: NoticeSeverity,
    /// Short title naming the affected area.
    pub title: String,
    /// Operator-facing message.
    pub message: String,
}

impl Notice {
    /// Creates an informational notice.
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Creates a success notice.
    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Creates a notice for a failed operation.
    ///
    /// Validation failures never reached the network and are informational.
    #[must_use]
    pub fn from_error(title: impl Into<String>, error: &AppError) -> Self {
        let severity = match error {
            AppError::Validation(_) => NoticeSeverity::Info,
            _ => NoticeSeverity::Error,
        };

        Self {
            severity,
            title: title.into(),
            message: error.message().to_owned(),
        }
    }

    /// Creates the informational notice for a refused search term.
    #[must_use]
    pub fn search_rejected(title: impl Into<String>, rejection: &SearchRejection) -> Self {
        Self::info(title, rejection.to_string())
    }
}

#[cfg(test)]
mod tests {
    use grantlens_core::AppError;

    use super::{Notice, NoticeSeverity};

    #[test]
    fn validation_errors_are_informational() {
        let notice = Notice::from_error(
            "Remediation",
            &AppError::Validation("select a user".to_owned()),
        );
        assert_eq!(notice.severity, NoticeSeverity::Info);
        assert_eq!(notice.message, "select a user");
    }

    #[test]
    fn network_errors_are_errors() {
        let notice = Notice::from_error("Field Grants", &AppError::Network("503".to_owned()));
        assert_eq!(notice.severity, NoticeSeverity::Error);
    }
}
