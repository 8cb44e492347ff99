use std::sync::Arc;

use askama::Template;
use axum::{
    Extension,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::api::middleware::CurrentSession;
use crate::api::notice::{self, Notice};
use crate::api::server::AppState;
use crate::api::views::{HomePage, Layout};
use crate::error::AppError;

const CATEGORIES: [&str; 3] = ["Technology", "Healthcare", "Finance"];

/// Present only once the hero form has been submitted.
#[derive(Deserialize, Default)]
pub struct SearchInput {
    pub q: Option<String>,
    pub l: Option<String>,
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Query(input): Query<SearchInput>,
) -> Result<Response, AppError> {
    let (jar, mut pending) = notice::take(jar);

    let submitted = input.q.is_some() || input.l.is_some();
    let q = input.q.unwrap_or_default();
    let l = input.l.unwrap_or_default();
    if submitted {
        if q.is_empty() && l.is_empty() {
            pending = Some(Notice::SearchCriteriaRequired);
        } else {
            let target = format!(
                "/jobs?q={}&l={}",
                urlencoding::encode(&q),
                urlencoding::encode(&l)
            );
            return Ok((jar, Redirect::to(&target)).into_response());
        }
    }

    let page = HomePage {
        layout: Layout::build(&state.db, &current, pending).await,
        q,
        l,
        categories: CATEGORIES.to_vec(),
    };
    Ok((jar, Html(page.render()?)).into_response())
}
