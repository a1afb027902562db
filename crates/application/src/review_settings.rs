use grantlens_core::{AppError, AppResult};
use grantlens_domain::DEFAULT_MIN_SEARCH_LENGTH;

/// Default number of rows per object or field page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Record count at which the server stops counting matches.
pub const DEFAULT_SERVER_RESULT_CAP: u64 = 2000;

/// Product policy values of an access review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSettings {
    /// Rows per object-grant page, sent to the server.
    pub object_page_size: u32,
    /// Rows per local field-grant page.
    pub field_page_size: u32,
    /// Minimum length of a non-empty search term.
    pub min_search_length: usize,
    /// Server-side truncation threshold for matching records.
    pub server_result_cap: u64,
}

impl ReviewSettings {
    /// Creates validated settings.
    pub fn new(
        object_page_size: u32,
        field_page_size: u32,
        min_search_length: usize,
        server_result_cap: u64,
    ) -> AppResult<Self> {
        if object_page_size == 0 {
            return Err(AppError::Validation(
                "object page size must be greater than zero".to_owned(),
            ));
        }

        if field_page_size == 0 {
            return Err(AppError::Validation(
                "field page size must be greater than zero".to_owned(),
            ));
        }

        if min_search_length == 0 {
            return Err(AppError::Validation(
                "minimum search length must be greater than zero".to_owned(),
            ));
        }

        if server_result_cap == 0 {
            return Err(AppError::Validation(
                "server result cap must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            object_page_size,
            field_page_size,
            min_search_length,
            server_result_cap,
        })
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            object_page_size: DEFAULT_PAGE_SIZE,
            field_page_size: DEFAULT_PAGE_SIZE,
            min_search_length: DEFAULT_MIN_SEARCH_LENGTH,
            server_result_cap: DEFAULT_SERVER_RESULT_CAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReviewSettings;

    #[test]
    fn zero_values_are_rejected() {
        assert!(ReviewSettings::new(0, 100, 3, 2000).is_err());
        assert!(ReviewSettings::new(100, 0, 3, 2000).is_err());
        assert!(ReviewSettings::new(100, 100, 0, 2000).is_err());
        assert!(ReviewSettings::new(100, 100, 3, 0).is_err());
    }

    #[test]
    fn defaults_follow_product_policy() {
        let settings = ReviewSettings::default();
        assert_eq!(settings.min_search_length, 3);
        assert_eq!(settings.server_result_cap, 2000);
        assert_eq!(ReviewSettings::new(100, 100, 3, 2000).ok(), Some(settings));
    }
}
