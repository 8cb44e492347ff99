use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::api::server::AppState;
use crate::db::models::Identity;
use crate::session::ClientSession;

pub const SESSION_COOKIE: &str = "job_board_sid";

#[derive(Clone)]
pub struct ActiveSession {
    pub sid: Uuid,
    pub entry: Arc<ClientSession>,
    pub user: Identity,
}

/// The signed-in browser behind a request, if any.
#[derive(Clone, Default)]
pub struct CurrentSession(pub Option<ActiveSession>);

impl CurrentSession {
    pub fn user(&self) -> Option<&Identity> {
        self.0.as_ref().map(|active| &active.user)
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.0.as_ref()
    }
}

/// Resolves the session cookie against the registry and exposes the result
/// to handlers as [`CurrentSession`]. Entries whose cached session has
/// expired, or whose context reports nobody signed in, are torn down here.
pub async fn attach_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let sid = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok());

    let mut current = CurrentSession::default();
    if let Some(sid) = sid {
        match state.sessions.get(sid).await {
            Some(entry) => {
                let live = matches!(entry.client.get_session().await, Ok(Some(_)));
                match entry.context.current_user().filter(|_| live) {
                    Some(user) => current = CurrentSession(Some(ActiveSession { sid, entry, user })),
                    None => {
                        tracing::debug!(%sid, "dropping expired or signed-out client session");
                        state.sessions.close(sid).await;
                    }
                }
            }
            None => tracing::debug!(%sid, "unknown session cookie"),
        }
    }

    request.extensions_mut().insert(current);
    next.run(request).await
}

pub fn session_cookie(sid: Uuid) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, sid.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
