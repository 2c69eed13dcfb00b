//! Session store.
//!
//! Holds the access token and the identity resolved from it. A session is
//! authenticated only once both are present.
//!
//! # Boot sequence
//!
//! ```text
//! LoadPersistedToken --none--> Anonymous
//!        |
//!   RefreshToken --err--> ClearSession --> RefreshRejected
//!        |
//!  ResolveIdentity --err--> IdentityUnavailable
//!        |
//!     Restored (caller loads the cart)
//! ```
//!
//! Every step fails silently: boot never surfaces an error to the user.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use shopline_core::{Email, Identity};
use tracing::{debug, info, instrument, warn};

use crate::api::{AccessToken, AuthBackend, Credentials, Registration};
use crate::error::{Result, StorefrontError, clear_sentry_user, set_sentry_user};
use crate::token::TokenStore;

/// Current authentication state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: Option<AccessToken>,
    pub identity: Option<Identity>,
}

impl Session {
    /// A token is held and the identity endpoint accepted it.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.identity.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_admin)
    }
}

/// How start-up restoration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// No persisted token.
    Anonymous,
    /// Token refreshed and identity resolved.
    Restored(Identity),
    /// The backend refused to refresh; the persisted token was discarded.
    RefreshRejected,
    /// A fresh token was obtained but the identity lookup failed.
    IdentityUnavailable,
}

/// Validate login input before any request is made.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidInput`] for a malformed email or an
/// empty password.
pub fn parse_credentials(email: &str, password: &str) -> Result<Credentials> {
    let email = Email::parse(email)
        .map_err(|e| StorefrontError::InvalidInput(format!("Invalid email: {e}")))?;
    if password.is_empty() {
        return Err(StorefrontError::InvalidInput(
            "Password is required".to_string(),
        ));
    }
    Ok(Credentials {
        email,
        password: SecretString::from(password.to_string()),
    })
}

/// Validate registration input before any request is made.
///
/// # Errors
///
/// Returns [`StorefrontError::InvalidInput`] for a blank name or invalid
/// credentials.
pub fn parse_registration(name: &str, email: &str, password: &str) -> Result<Registration> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorefrontError::InvalidInput("Name is required".to_string()));
    }
    Ok(Registration {
        name: name.to_string(),
        credentials: parse_credentials(email, password)?,
    })
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    /// Bumped whenever the session is replaced, so a slow identity lookup
    /// cannot resurrect a session that was logged out meanwhile.
    generation: u64,
}

/// Owner of the session and the persisted token.
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    tokens: Arc<dyn TokenStore>,
    inner: RwLock<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            tokens,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.read(|inner| inner.session.clone())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|inner| inner.session.is_authenticated())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.read(|inner| inner.session.is_admin())
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read(|inner| inner.session.identity.clone())
    }

    /// Token of an authenticated session.
    #[must_use]
    pub fn authenticated_token(&self) -> Option<AccessToken> {
        self.read(|inner| {
            inner
                .session
                .is_authenticated()
                .then(|| inner.session.token.clone())
                .flatten()
        })
    }

    /// Raw token, whether or not the identity resolved.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.read(|inner| inner.session.token.clone())
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Silently restore a session from the persisted token.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> BootOutcome {
        let persisted = match self.tokens.load().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No persisted token");
                return BootOutcome::Anonymous;
            }
            Err(e) => {
                warn!(error = %e, "Persisted token unreadable, discarding");
                self.discard_persisted().await;
                return BootOutcome::Anonymous;
            }
        };

        let fresh = match self.backend.refresh_token(Some(&persisted)).await {
            Ok(token) => token,
            Err(e) => {
                info!(error = %e, "Token refresh rejected, clearing session");
                self.discard_persisted().await;
                self.replace(Session::default());
                return BootOutcome::RefreshRejected;
            }
        };

        if let Err(e) = self.tokens.save(&fresh).await {
            warn!(error = %e, "Could not persist refreshed token");
        }

        match self.resolve(fresh).await {
            Ok(identity) => {
                info!(name = %identity.name, role = %identity.role, "Session restored");
                BootOutcome::Restored(identity)
            }
            Err(e) => {
                warn!(error = %e, "Identity unavailable after refresh");
                BootOutcome::IdentityUnavailable
            }
        }
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Log in and resolve the identity.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Backend`] if the backend rejects the
    /// credentials or the identity lookup fails, and
    /// [`StorefrontError::TokenStore`] if the token cannot be persisted. The
    /// session is unauthenticated after any error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity> {
        let token = self.backend.login(credentials).await?;
        self.establish(token).await
    }

    /// Create an account; on success behaves like [`Self::login`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::login`].
    #[instrument(skip(self, registration), fields(email = %registration.credentials.email))]
    pub async fn register(&self, registration: &Registration) -> Result<Identity> {
        let token = self.backend.register(registration).await?;
        self.establish(token).await
    }

    /// Drop the session and the persisted token. Never fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.replace(Session::default());
        self.discard_persisted().await;
        clear_sentry_user();
        info!("Logged out");
    }

    async fn establish(&self, token: AccessToken) -> Result<Identity> {
        self.tokens.save(&token).await?;
        self.resolve(token).await
    }

    /// Install `token` and look up its identity.
    async fn resolve(&self, token: AccessToken) -> Result<Identity> {
        let generation = self.replace(Session {
            token: Some(token.clone()),
            identity: None,
        });

        let identity = self.backend.identity(&token).await?;

        let installed = self.write(|inner| {
            if inner.generation != generation {
                return false;
            }
            inner.session.identity = Some(identity.clone());
            true
        });
        if !installed {
            debug!("Session replaced during identity lookup");
            return Err(StorefrontError::NotAuthenticated);
        }

        set_sentry_user(&identity.name, identity.email.as_deref());
        Ok(identity)
    }

    async fn discard_persisted(&self) {
        if let Err(e) = self.tokens.clear().await {
            warn!(error = %e, "Could not clear persisted token");
        }
    }

    fn replace(&self, session: Session) -> u64 {
        self.write(|inner| {
            inner.generation += 1;
            inner.session = session;
            inner.generation
        })
    }

    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::ExposeSecret;
    use shopline_core::Role;

    use super::*;
    use crate::api::ApiError;
    use crate::token::MemoryTokenStore;

    /// Auth backend with fixed answers. The token `"admin"` resolves to an
    /// admin identity.
    pub struct FakeAuth {
        pub refresh_ok: bool,
        pub identity_ok: bool,
        pub issued: &'static str,
        pub refresh_calls: AtomicUsize,
    }

    impl Default for FakeAuth {
        fn default() -> Self {
            Self {
                refresh_ok: true,
                identity_ok: true,
                issued: "fresh",
                refresh_calls: AtomicUsize::new(0),
            }
        }
    }

    fn rejected() -> ApiError {
        ApiError::Status {
            status: 401,
            message: "Invalid Authentication".to_string(),
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn login(
            &self,
            credentials: &Credentials,
        ) -> std::result::Result<AccessToken, ApiError> {
            if credentials.password.expose_secret() == "secret" {
                Ok(AccessToken::new(self.issued))
            } else {
                Err(rejected())
            }
        }

        async fn register(
            &self,
            _registration: &Registration,
        ) -> std::result::Result<AccessToken, ApiError> {
            Ok(AccessToken::new(self.issued))
        }

        async fn refresh_token(
            &self,
            _current: Option<&AccessToken>,
        ) -> std::result::Result<AccessToken, ApiError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.refresh_ok {
                Ok(AccessToken::new(self.issued))
            } else {
                Err(rejected())
            }
        }

        async fn identity(&self, token: &AccessToken) -> std::result::Result<Identity, ApiError> {
            if !self.identity_ok {
                return Err(ApiError::Status {
                    status: 500,
                    message: "db down".to_string(),
                });
            }
            Ok(Identity {
                name: "Ada".to_string(),
                email: Some("ada@example.com".to_string()),
                role: if token.expose() == "admin" {
                    Role::ADMIN
                } else {
                    Role::CUSTOMER
                },
            })
        }
    }

    fn store(auth: FakeAuth, tokens: &Arc<MemoryTokenStore>) -> SessionStore {
        SessionStore::new(Arc::new(auth), tokens.clone())
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let auth = FakeAuth::default();
        let sessions = SessionStore::new(Arc::new(auth), tokens);

        assert_eq!(sessions.restore().await, BootOutcome::Anonymous);
        assert!(!sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_refreshes_and_persists() {
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("old")));
        let sessions = store(FakeAuth::default(), &tokens);

        let outcome = sessions.restore().await;

        assert!(matches!(outcome, BootOutcome::Restored(ref id) if id.name == "Ada"));
        assert!(sessions.is_authenticated());
        assert!(!sessions.is_admin());
        assert_eq!(tokens.peek(), Some(AccessToken::new("fresh")));
        assert_eq!(sessions.authenticated_token(), Some(AccessToken::new("fresh")));
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_token_silently() {
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("old")));
        let sessions = store(
            FakeAuth {
                refresh_ok: false,
                ..FakeAuth::default()
            },
            &tokens,
        );

        assert_eq!(sessions.restore().await, BootOutcome::RefreshRejected);
        assert!(tokens.peek().is_none());
        assert!(sessions.session().token.is_none());
    }

    #[tokio::test]
    async fn test_identity_failure_leaves_session_unauthenticated() {
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("old")));
        let sessions = store(
            FakeAuth {
                identity_ok: false,
                ..FakeAuth::default()
            },
            &tokens,
        );

        assert_eq!(sessions.restore().await, BootOutcome::IdentityUnavailable);
        assert!(!sessions.is_authenticated());
        assert!(sessions.authenticated_token().is_none());
        // The token itself is kept
        assert!(sessions.token().is_some());
    }

    #[tokio::test]
    async fn test_login_persists_token_and_resolves_admin() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let sessions = store(
            FakeAuth {
                issued: "admin",
                ..FakeAuth::default()
            },
            &tokens,
        );

        let credentials = parse_credentials("ada@example.com", "secret").unwrap();
        let identity = sessions.login(&credentials).await.unwrap();

        assert!(identity.is_admin());
        assert!(sessions.is_admin());
        assert_eq!(tokens.peek(), Some(AccessToken::new("admin")));
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_error() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let sessions = store(FakeAuth::default(), &tokens);

        let credentials = parse_credentials("ada@example.com", "wrong").unwrap();
        let err = sessions.login(&credentials).await.unwrap_err();

        assert!(matches!(err, StorefrontError::Backend(ref e) if e.is_unauthorized()));
        assert!(!sessions.is_authenticated());
        assert!(tokens.peek().is_none());
    }

    #[tokio::test]
    async fn test_register_stores_token_like_login() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let sessions = store(FakeAuth::default(), &tokens);

        let registration = parse_registration(" Ada ", "ada@example.com", "pw").unwrap();
        assert_eq!(registration.name, "Ada");
        sessions.register(&registration).await.unwrap();

        assert!(sessions.is_authenticated());
        assert_eq!(tokens.peek(), Some(AccessToken::new("fresh")));
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("old")));
        let sessions = store(FakeAuth::default(), &tokens);
        sessions.restore().await;

        sessions.logout().await;

        assert!(!sessions.is_authenticated());
        assert!(sessions.session().token.is_none());
        assert!(sessions.identity().is_none());
        assert!(tokens.peek().is_none());
    }

    #[test]
    fn test_input_validation() {
        assert!(matches!(
            parse_credentials("not-an-email", "pw"),
            Err(StorefrontError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_credentials("ada@example.com", ""),
            Err(StorefrontError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_registration("   ", "ada@example.com", "pw"),
            Err(StorefrontError::InvalidInput(_))
        ));
    }
}
