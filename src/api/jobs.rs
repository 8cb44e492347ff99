use std::sync::Arc;

use askama::Template;
use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::CurrentSession;
use crate::api::notice::{self, Notice};
use crate::api::server::AppState;
use crate::api::views::{DetailPage, JobView, Layout, ListingPage, PostJobPage, SelectOption};
use crate::db::models::{JobPosting, JobType, NewJob};
use crate::db::repo;
use crate::error::AppError;
use crate::page::{PageError, PageState};
use crate::search::{JobFilter, ListingScope};

#[derive(Deserialize, Default)]
pub struct ListingQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub l: String,
    #[serde(rename = "type", default)]
    pub job_type: String,
    #[serde(default)]
    pub mine: bool,
}

impl ListingQuery {
    fn toggled_href(&self) -> String {
        let mut href = format!(
            "/jobs?q={}&l={}&type={}",
            urlencoding::encode(&self.q),
            urlencoding::encode(&self.l),
            urlencoding::encode(&self.job_type)
        );
        if !self.mine {
            href.push_str("&mine=true");
        }
        href
    }
}

pub async fn listing(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Query(query): Query<ListingQuery>,
) -> Result<Response, AppError> {
    let (jar, pending) = notice::take(jar);
    let scope = ListingScope::resolve(query.mine, current.user());
    let mine = scope != ListingScope::All;

    let mut fetched = PageState::default();
    fetched
        .run(async {
            repo::list_jobs(&state.db, scope.owner()).await.map_err(|err| {
                tracing::error!("error loading jobs: {err}");
                PageError::Failed
            })
        })
        .await;

    let filter = JobFilter::new(&query.q, &query.l, Some(&query.job_type));
    let (load_error, jobs) = match fetched {
        PageState::Success(jobs) => (false, filter.apply(jobs)),
        _ => (true, Vec::new()),
    };

    let (heading, empty_message) = headings(mine, &query, jobs.len());
    let page = ListingPage {
        layout: Layout::build(&state.db, &current, pending).await,
        load_error,
        jobs: jobs.iter().map(JobView::from).collect(),
        can_toggle: current.user().is_some(),
        mine,
        toggle_href: query.toggled_href(),
        type_options: SelectOption::job_types(&query.job_type, true),
        heading,
        empty_message,
        q: query.q,
        l: query.l,
    };
    Ok((jar, Html(page.render()?)).into_response())
}

fn headings(mine: bool, query: &ListingQuery, found: usize) -> (String, String) {
    if mine {
        let heading = if found > 0 {
            format!("My Posted Jobs ({found} jobs)")
        } else {
            "My Posted Jobs".to_string()
        };
        let empty = if found == 0 {
            "You haven't posted any jobs yet.".to_string()
        } else {
            String::new()
        };
        (heading, empty)
    } else if !query.q.is_empty() || !query.l.is_empty() {
        let heading = if found > 0 {
            format!("Search Results ({found} jobs found)")
        } else {
            "Search Results".to_string()
        };
        let empty = if found == 0 {
            "No jobs found matching your search criteria.".to_string()
        } else {
            String::new()
        };
        (heading, empty)
    } else {
        (String::new(), String::new())
    }
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (jar, pending) = notice::take(jar);

    let mut fetched: PageState<JobPosting> = PageState::default();
    fetched.run(fetch_job(&state, &id)).await;

    let (job, message) = match fetched {
        PageState::Success(job) => (Some(JobView::from(&job)), String::new()),
        PageState::Error(PageError::NotFound) => (None, "Job not found.".to_string()),
        _ => (
            None,
            "Error loading job details. Please try again later.".to_string(),
        ),
    };

    let page = DetailPage {
        layout: Layout::build(&state.db, &current, pending).await,
        job,
        message,
    };
    Ok((jar, Html(page.render()?)).into_response())
}

async fn fetch_job(state: &AppState, id: &str) -> Result<JobPosting, PageError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Err(PageError::NotFound);
    };
    match repo::get_job(&state.db, id).await {
        Ok(Some(job)) => Ok(job),
        Ok(None) => Err(PageError::NotFound),
        Err(err) => {
            tracing::error!(%id, "error loading job: {err}");
            Err(PageError::Failed)
        }
    }
}

#[derive(Deserialize, Validate, Default)]
#[serde(default)]
pub struct PostJobInput {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub company: String,
    #[validate(length(min = 1))]
    pub location: String,
    pub job_type: String,
    pub salary_range: String,
    #[validate(length(min = 1))]
    pub description: String,
}

impl PostJobInput {
    /// A blank type falls back to full-time; an unknown one is `None`.
    fn job_type(&self) -> Option<JobType> {
        match self.job_type.as_str() {
            "" => Some(JobType::default()),
            other => JobType::parse(other),
        }
    }

    fn to_new_job(&self, job_type: JobType) -> NewJob {
        NewJob {
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
            job_type,
            salary_range: Some(self.salary_range.clone()).filter(|s| !s.is_empty()),
            description: self.description.clone(),
        }
    }

    fn into_page(self, layout: Layout) -> PostJobPage {
        let selected = self.job_type().unwrap_or_default();
        PostJobPage {
            layout,
            type_options: SelectOption::job_types(selected.as_str(), false),
            title: self.title,
            company: self.company,
            location: self.location,
            salary_range: self.salary_range,
            description: self.description,
        }
    }
}

pub async fn post_form(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (jar, pending) = notice::take(jar);
    let layout = Layout::build(&state.db, &current, pending).await;
    let page = PostJobInput::default().into_page(layout);
    Ok((jar, Html(page.render()?)).into_response())
}

pub async fn post_submit(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
    Form(input): Form<PostJobInput>,
) -> Result<Response, AppError> {
    match create_job(&state, &current, &input).await {
        Ok(job) => {
            tracing::info!(job_id = %job.id, "job posted");
            let jar = notice::push(jar, Notice::JobPosted);
            Ok((jar, Redirect::to("/jobs")).into_response())
        }
        Err(refusal) => {
            let layout = Layout::build(&state.db, &current, Some(refusal)).await;
            let page = input.into_page(layout);
            Ok((jar, Html(page.render()?)).into_response())
        }
    }
}

/// Refusals come back as the notice to show; the submitted form is kept.
async fn create_job(
    state: &AppState,
    current: &CurrentSession,
    input: &PostJobInput,
) -> Result<JobPosting, Notice> {
    let Some(active) = current.active() else {
        return Err(Notice::MustBeLoggedIn);
    };
    let owner = match active.entry.client.get_user().await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Notice::MustBeLoggedIn),
        Err(err) => {
            tracing::error!("error checking session before posting: {err}");
            return Err(Notice::PostFailed);
        }
    };

    let job_type = match (input.validate(), input.job_type()) {
        (Ok(()), Some(job_type)) => job_type,
        _ => return Err(Notice::MissingFields),
    };

    repo::insert_job(&state.db, &input.to_new_job(job_type), owner.id)
        .await
        .map_err(|err| {
            tracing::error!("error posting job: {err}");
            Notice::PostFailed
        })
}
