use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::session::client::AuthClient;
use crate::session::context::SessionContext;

/// A signed-in browser: its auth client and the context observing it.
pub struct ClientSession {
    pub client: Arc<AuthClient>,
    pub context: SessionContext,
}

/// Browser session cookie -> live client session.
#[derive(Default)]
pub struct Sessions {
    entries: RwLock<HashMap<Uuid, Arc<ClientSession>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client that has just signed in and returns its cookie key.
    pub async fn open(&self, client: Arc<AuthClient>) -> (Uuid, Arc<ClientSession>) {
        let context = SessionContext::start(&client).await;
        let entry = Arc::new(ClientSession { client, context });
        let sid = Uuid::new_v4();
        self.entries.write().await.insert(sid, entry.clone());
        tracing::debug!(%sid, "client session opened");
        (sid, entry)
    }

    pub async fn get(&self, sid: Uuid) -> Option<Arc<ClientSession>> {
        self.entries.read().await.get(&sid).cloned()
    }

    pub async fn close(&self, sid: Uuid) {
        if let Some(entry) = self.entries.write().await.remove(&sid) {
            entry.context.stop();
            tracing::debug!(%sid, "client session closed");
        }
    }

    /// Drops every entry whose cached session has expired or been signed out.
    pub async fn prune(&self) -> usize {
        let snapshot: Vec<(Uuid, Arc<ClientSession>)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(sid, entry)| (*sid, entry.clone()))
            .collect();

        let mut stale = Vec::new();
        for (sid, entry) in snapshot {
            if !matches!(entry.client.get_session().await, Ok(Some(_))) {
                stale.push(sid);
            }
        }
        for sid in &stale {
            self.close(*sid).await;
        }
        stale.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::auth::tests::service;

    #[tokio::test]
    async fn open_get_close() {
        let auth = Arc::new(service().await);
        let sessions = Sessions::new();
        let client = Arc::new(AuthClient::new(auth));
        let session = client.sign_up("quinn@example.com", "Secret123").await.unwrap();

        let (sid, entry) = sessions.open(client).await;
        assert_eq!(entry.context.current_user(), Some(session.user));
        assert!(sessions.get(sid).await.is_some());

        sessions.close(sid).await;
        assert!(sessions.get(sid).await.is_none());
        assert_eq!(sessions.len().await, 0);
    }

    #[tokio::test]
    async fn prune_removes_signed_out_clients() {
        let auth = Arc::new(service().await);
        let sessions = Sessions::new();

        let live = Arc::new(AuthClient::new(auth.clone()));
        live.sign_up("ray@example.com", "Secret123").await.unwrap();
        let (live_sid, _) = sessions.open(live).await;

        let gone = Arc::new(AuthClient::new(auth));
        gone.sign_up("sam@example.com", "Secret123").await.unwrap();
        let (gone_sid, gone_entry) = sessions.open(gone).await;
        gone_entry.client.sign_out().await.unwrap();

        assert_eq!(sessions.prune().await, 1);
        assert!(sessions.get(live_sid).await.is_some());
        assert!(sessions.get(gone_sid).await.is_none());
    }
}
