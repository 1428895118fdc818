//! Auth provider seam

use crate::error::AuthError;
use crate::types::AuthProfile;
use async_trait::async_trait;
use tokio::sync::watch;

/// Identity and session capability
///
/// Session changes are published on a watch channel: every subscriber sees
/// the latest signed-in profile, or `None` when signed out.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Subscribe to session changes
    fn sessions(&self) -> watch::Receiver<Option<AuthProfile>>;

    /// Currently signed-in profile
    fn current(&self) -> Option<AuthProfile> {
        let rx = self.sessions();
        let profile = rx.borrow().clone();
        profile
    }

    /// Complete a sign-in and publish the new session
    async fn sign_in(&self, profile: AuthProfile) -> Result<AuthProfile, AuthError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// In-process auth provider
#[derive(Debug)]
pub struct LocalAuth {
    session: watch::Sender<Option<AuthProfile>>,
}

impl LocalAuth {
    /// Create provider with no session
    #[must_use]
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    /// Create provider already signed in
    #[must_use]
    pub fn signed_in(profile: AuthProfile) -> Self {
        let (session, _) = watch::channel(Some(profile));
        Self { session }
    }
}

impl Default for LocalAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    fn sessions(&self) -> watch::Receiver<Option<AuthProfile>> {
        self.session.subscribe()
    }

    async fn sign_in(&self, profile: AuthProfile) -> Result<AuthProfile, AuthError> {
        if profile.identity.as_str().is_empty() {
            return Err(AuthError::Provider("empty subject".to_string()));
        }
        tracing::info!(identity = %profile.identity, "signed in");
        self.session.send_replace(Some(profile.clone()));
        Ok(profile)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(previous) = self.session.send_replace(None) {
            tracing::info!(identity = %previous.identity, "signed out");
        }
        Ok(())
    }
}
