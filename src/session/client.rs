use std::sync::Arc;

use chrono::Utc;
use futures_util::{Stream, stream};
use tokio::sync::{RwLock, broadcast, broadcast::error::RecvError};

use crate::db::auth::{AuthError, AuthService};
use crate::db::models::{Identity, Session};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    UserUpdated(Identity),
}

/// One browser's handle on the identity provider. Caches at most one session
/// and broadcasts every sign-in / sign-out it observes.
pub struct AuthClient {
    service: Arc<AuthService>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    pub fn new(service: Arc<AuthService>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            service,
            session: RwLock::new(None),
            events,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.service.sign_in(email, password).await?;
        self.store(session.clone()).await;
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.service.sign_up(email, password).await?;
        self.store(session.clone()).await;
        Ok(session)
    }

    /// Keeps the cached session when the provider refuses the revocation.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => return Ok(()),
        };
        match self.service.sign_out(&token).await {
            Ok(()) | Err(AuthError::InvalidSession) => {
                self.clear().await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Cached session. An expired one is dropped and reported as an error.
    pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let cached = self.session.read().await.clone();
        match cached {
            Some(session) if session.expires_at <= Utc::now() => {
                self.clear().await;
                Err(AuthError::InvalidSession)
            }
            other => Ok(other),
        }
    }

    /// Revalidates the cached session with the provider.
    pub async fn get_user(&self) -> Result<Option<Identity>, AuthError> {
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };
        match self.service.get_user(&session.access_token).await {
            Ok(user) => {
                if user != session.user {
                    self.emit(AuthEvent::UserUpdated(user.clone()));
                }
                Ok(Some(user))
            }
            Err(AuthError::InvalidSession) => {
                self.clear().await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Events emitted after this call. Ends once the client is dropped.
    pub fn on_auth_state_change(&self) -> impl Stream<Item = AuthEvent> + Send + 'static {
        stream::unfold(self.events.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("auth subscriber lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    async fn store(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        self.emit(AuthEvent::SignedIn(session));
    }

    async fn clear(&self) {
        let previous = self.session.write().await.take();
        if previous.is_some() {
            self.emit(AuthEvent::SignedOut);
        }
    }

    fn emit(&self, event: AuthEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
