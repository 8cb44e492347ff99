use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::middleware::{self, CurrentSession};
use crate::api::notice::{self, Notice};
use crate::api::server::AppState;
use crate::api::views::{AuthPage, Layout};
use crate::error::AppError;
use crate::session::AuthClient;

const SIGN_UP_VIEW: &str = "sign_up";

#[derive(Deserialize)]
pub struct AuthQuery {
    pub view: Option<String>,
}

#[derive(Deserialize)]
pub struct AuthPayload {
    pub email: String,
    pub password: String,
    pub view: Option<String>,
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Query(query): Query<AuthQuery>,
) -> Result<Response, AppError> {
    let (jar, pending) = notice::take(jar);
    let page = AuthPage {
        layout: Layout::build(&state.db, &current, pending).await,
        sign_up: query.view.as_deref() == Some(SIGN_UP_VIEW),
        email: String::new(),
        error: String::new(),
    };
    Ok((jar, Html(page.render()?)).into_response())
}

/// Signs in or up with a fresh client and, on success, registers it under a
/// new session cookie.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Form(payload): Form<AuthPayload>,
) -> Result<Response, AppError> {
    let sign_up = payload.view.as_deref() == Some(SIGN_UP_VIEW);
    let client = Arc::new(AuthClient::new(state.auth.clone()));
    let result = if sign_up {
        client.sign_up(&payload.email, &payload.password).await
    } else {
        client.sign_in(&payload.email, &payload.password).await
    };

    match result {
        Ok(session) => {
            if let Some(previous) = current.active() {
                state.sessions.close(previous.sid).await;
            }
            let (sid, _) = state.sessions.open(client).await;
            tracing::info!(user_id = %session.user.id, sign_up, "signed in");

            let jar = jar.add(middleware::session_cookie(sid));
            let (jar, target) = if sign_up {
                (notice::push(jar, Notice::Welcome), "/profile")
            } else {
                (notice::push(jar, Notice::WelcomeBack), "/")
            };
            Ok((jar, Redirect::to(target)).into_response())
        }
        Err(err) => {
            tracing::warn!("authentication failed: {err}");
            let page = AuthPage {
                layout: Layout::build(&state.db, &current, None).await,
                sign_up,
                email: payload.email,
                error: err.user_message(),
            };
            Ok(Html(page.render()?).into_response())
        }
    }
}

pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> Response {
    let Some(active) = current.active() else {
        return Redirect::to("/").into_response();
    };

    match active.entry.client.sign_out().await {
        Ok(()) => {
            state.sessions.close(active.sid).await;
            let jar = middleware::clear_session_cookie(jar);
            let jar = notice::push(jar, Notice::SignedOut);
            (jar, Redirect::to("/")).into_response()
        }
        Err(err) => {
            tracing::error!("error signing out: {err}");
            let jar = notice::push(jar, Notice::SignOutFailed);
            (jar, Redirect::to("/")).into_response()
        }
    }
}
