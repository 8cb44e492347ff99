use futures_util::StreamExt;
use tokio::{sync::watch, task::JoinHandle};

use crate::db::models::Identity;
use crate::session::client::{AuthClient, AuthEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_user: Option<Identity>,
    pub loading: bool,
}

/// Observable "who is signed in" cell for one auth client.
///
/// Written only by the task draining the client's auth-change stream; readers
/// borrow the latest value. The subscription ends on [`SessionContext::stop`]
/// or drop.
pub struct SessionContext {
    state: watch::Receiver<SessionState>,
    subscription: JoinHandle<()>,
}

impl SessionContext {
    pub async fn start(client: &AuthClient) -> Self {
        let (tx, state) = watch::channel(SessionState {
            current_user: None,
            loading: true,
        });

        // subscribe before the first read so nothing emitted in between is lost
        let mut events = Box::pin(client.on_auth_state_change());

        let current_user = match client.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(err) => {
                tracing::warn!("initial session fetch failed: {err}");
                None
            }
        };
        tx.send_replace(SessionState {
            current_user,
            loading: false,
        });

        let subscription = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                tx.send_modify(|state| apply(state, event));
            }
        });

        Self {
            state,
            subscription,
        }
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state.borrow().current_user.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn stop(&self) {
        self.subscription.abort();
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}

fn apply(state: &mut SessionState, event: AuthEvent) {
    match event {
        AuthEvent::SignedIn(session) => state.current_user = Some(session.user),
        AuthEvent::SignedOut => state.current_user = None,
        AuthEvent::UserUpdated(user) => state.current_user = Some(user),
    }
}
