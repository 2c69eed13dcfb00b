//! Operation-level error type with Sentry integration.
//!
//! Every public store operation returns `Result<T, StorefrontError>`. Failures
//! are caught at the operation boundary and turned into a short message for
//! the user via [`StorefrontError::user_message`]; backend failures are also
//! captured to Sentry when it is initialized.

use thiserror::Error;

use crate::api::ApiError;
use crate::token::TokenStoreError;

/// Errors surfaced by storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// A cart or admin operation was attempted without a valid session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session is valid but lacks the admin role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any request failure (transport, timeout, 4xx/5xx, malformed body).
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    /// The product list could not be loaded.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[source] ApiError),

    /// Input rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The persisted token could not be read or written.
    #[error("Token storage error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

impl StorefrontError {
    /// Short message suitable for a transient notification.
    ///
    /// Internal details (URLs, raw bodies, paths) are never included.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAuthenticated => "Please log in to continue.".to_string(),
            Self::Forbidden(_) => "You do not have permission to do that.".to_string(),
            Self::Backend(err) if err.is_unauthorized() => {
                "Your session has expired, please log in again.".to_string()
            }
            Self::Backend(ApiError::Status { message, .. }) if !message.is_empty() => {
                format!("Request failed: {message}")
            }
            Self::Backend(_) => "Could not reach the store, please try again.".to_string(),
            Self::CatalogUnavailable(_) => "Products are unavailable right now.".to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::TokenStore(_) => "Could not access saved login.".to_string(),
        }
    }

    /// Capture server-side failures to Sentry and log them.
    ///
    /// Client-side conditions (not logged in, bad input) are only logged.
    pub fn report(&self) {
        if matches!(self, Self::Backend(_) | Self::CatalogUnavailable(_) | Self::TokenStore(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront operation failed"
            );
        } else {
            tracing::info!(error = %self, "Storefront operation rejected");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from the resolved identity.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(name: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(name.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Quantity changed", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storefront_error_display() {
        assert_eq!(StorefrontError::NotAuthenticated.to_string(), "Not authenticated");
        assert_eq!(
            StorefrontError::InvalidInput("password is required".to_string()).to_string(),
            "Invalid input: password is required"
        );
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let expired = StorefrontError::Backend(ApiError::Status {
            status: 401,
            message: "jwt expired".to_string(),
        });
        assert_eq!(
            expired.user_message(),
            "Your session has expired, please log in again."
        );

        let rejected = StorefrontError::Backend(ApiError::Status {
            status: 400,
            message: "Product does not exist".to_string(),
        });
        assert_eq!(rejected.user_message(), "Request failed: Product does not exist");

        let catalog = StorefrontError::CatalogUnavailable(ApiError::Status {
            status: 503,
            message: "mongo down at 10.0.0.3".to_string(),
        });
        assert!(!catalog.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_not_authenticated_prompts_login() {
        assert!(
            StorefrontError::NotAuthenticated
                .user_message()
                .contains("log in")
        );
    }
}
