use std::sync::Arc;

use askama::Template;
use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::middleware::CurrentSession;
use crate::api::notice::{self, Notice};
use crate::api::server::AppState;
use crate::api::views::{Layout, ProfilePage, SelectOption};
use crate::db::models::{Gender, Profile, ProfileChanges};
use crate::db::repo;
use crate::error::AppError;
use crate::page::{PageError, PageState};

pub async fn show(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        return Ok(Redirect::to("/auth").into_response());
    };
    let (jar, mut pending) = notice::take(jar);

    let mut fetched: PageState<Option<Profile>> = PageState::default();
    fetched
        .run(async {
            repo::get_profile(&state.db, user.id).await.map_err(|err| {
                tracing::error!(user_id = %user.id, "error fetching profile: {err}");
                PageError::Failed
            })
        })
        .await;

    let profile = match fetched {
        PageState::Success(profile) => profile,
        _ => {
            pending = Some(Notice::ProfileLoadFailed);
            None
        }
    };

    let layout = Layout::build(&state.db, &current, pending).await;
    let page = ProfilePage::from_profile(layout, profile.as_ref());
    Ok((jar, Html(page.render()?)).into_response())
}

#[derive(Deserialize, Default)]
pub struct ProfileInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub date_of_birth: String,
}

impl ProfileInput {
    /// `None` when a submitted value cannot be stored.
    fn changes(&self) -> Option<ProfileChanges> {
        let gender = match self.gender.as_str() {
            "" => None,
            other => Some(Gender::parse(other)?),
        };
        let date_of_birth = match self.date_of_birth.as_str() {
            "" => None,
            other => Some(NaiveDate::parse_from_str(other, "%Y-%m-%d").ok()?),
        };
        Some(ProfileChanges {
            username: non_empty(&self.username),
            full_name: non_empty(&self.full_name),
            gender,
            date_of_birth,
        })
    }

    fn into_page(self, layout: Layout) -> ProfilePage {
        ProfilePage {
            layout,
            gender_selected: !self.gender.is_empty(),
            gender_options: SelectOption::genders(&self.gender),
            username: self.username,
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Form(input): Form<ProfileInput>,
) -> Result<Response, AppError> {
    let Some(user) = current.user() else {
        return Ok(Redirect::to("/auth").into_response());
    };

    let outcome = match input.changes() {
        Some(changes) => match repo::update_profile(&state.db, user.id, &changes).await {
            Ok(Some(_)) => Notice::ProfileUpdated,
            Ok(None) => {
                tracing::warn!(user_id = %user.id, "no profile row to update");
                Notice::ProfileUpdateFailed
            }
            Err(err) => {
                tracing::error!(user_id = %user.id, "error updating profile: {err}");
                Notice::ProfileUpdateFailed
            }
        },
        None => Notice::ProfileUpdateFailed,
    };

    let layout = Layout::build(&state.db, &current, Some(outcome)).await;
    Ok(Html(input.into_page(layout).render()?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::tests::{app, body, get, location, post_form, sign_up};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn signed_out_visitors_are_sent_to_auth() {
        let (app, _) = app().await;
        let response = get(&app, "/profile", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth");

        let response = post_form(&app, "/profile", "full_name=Eve", None).await;
        assert_eq!(location(&response), "/auth");
    }

    #[tokio::test]
    async fn update_then_show() {
        let (app, _) = app().await;
        let cookie = sign_up(&app, "bea@example.com").await;

        let form = "username=bea&full_name=Bea+Arthur&gender=female&date_of_birth=1990-05-17";
        let page = body(post_form(&app, "/profile", form, Some(&cookie)).await).await;
        assert!(page.contains("Profile updated successfully"));

        let page = body(get(&app, "/profile", Some(&cookie)).await).await;
        assert!(page.contains("value=\"Bea Arthur\""));
        assert!(page.contains("value=\"1990-05-17\""));
        assert!(page.contains("<option value=\"female\" selected>"));
        assert!(page.contains(">B</a>"), "header initial comes from the full name");
    }

    #[tokio::test]
    async fn invalid_values_keep_the_form() {
        let (app, _) = app().await;
        let cookie = sign_up(&app, "cal@example.com").await;
        let form = "username=cal&full_name=Cal&gender=robot&date_of_birth=";
        let page = body(post_form(&app, "/profile", form, Some(&cookie)).await).await;
        assert!(page.contains("Failed to update profile"));
        assert!(page.contains("value=\"cal\""));
    }

    #[test]
    fn blank_fields_clear_values() {
        let input = ProfileInput::default();
        assert_eq!(input.changes(), Some(ProfileChanges::default()));

        let input = ProfileInput {
            date_of_birth: "17/05/1990".into(),
            ..ProfileInput::default()
        };
        assert_eq!(input.changes(), None);
    }
}
