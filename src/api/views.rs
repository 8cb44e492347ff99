use askama::Template;
use chrono::{Datelike, Utc};
use sqlx::SqlitePool;

use crate::api::middleware::CurrentSession;
use crate::api::notice::Notice;
use crate::db::models::{Gender, JobPosting, JobType, Profile};
use crate::db::repo;

/// Header, footer and toast shared by every page.
pub struct Layout {
    pub signed_in: bool,
    pub initial: String,
    pub notice: Option<Notice>,
    pub year: i32,
}

impl Layout {
    pub async fn build(db: &SqlitePool, current: &CurrentSession, notice: Option<Notice>) -> Layout {
        let mut layout = Layout {
            signed_in: current.user().is_some(),
            initial: "U".to_string(),
            notice,
            year: Utc::now().year(),
        };
        if let Some(user) = current.user() {
            match repo::get_profile(db, user.id).await {
                Ok(profile) => {
                    layout.initial = initial(profile.as_ref().and_then(|p| p.full_name.as_deref()));
                }
                Err(err) => {
                    tracing::error!("error fetching profile for header: {err}");
                    layout.notice = layout.notice.or(Some(Notice::ProfileLoadFailed));
                }
            }
        }
        layout
    }

    pub fn notice_title(&self) -> &str {
        self.notice.map(|n| n.title()).unwrap_or_default()
    }

    pub fn notice_description(&self) -> &str {
        self.notice.map(|n| n.description()).unwrap_or_default()
    }

    pub fn notice_class(&self) -> &str {
        match self.notice {
            Some(n) if n.destructive() => "toast toast-destructive",
            _ => "toast",
        }
    }
}

fn initial(full_name: Option<&str>) -> String {
    full_name
        .and_then(|name| name.chars().next())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "U".to_string())
}

/// A posting flattened for display.
pub struct JobView {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub salary_range: String,
    pub description: String,
    pub posted_on: String,
}

impl From<&JobPosting> for JobView {
    fn from(job: &JobPosting) -> Self {
        Self {
            id: job.id.to_string(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone().unwrap_or_default(),
            job_type: job.job_type.clone().unwrap_or_default(),
            salary_range: job.salary_range.clone().unwrap_or_default(),
            description: job.description.clone().unwrap_or_default(),
            posted_on: job.posted_on(),
        }
    }
}

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn job_types(selected: &str, include_all: bool) -> Vec<SelectOption> {
        let mut options = Vec::new();
        if include_all {
            options.push(SelectOption {
                value: String::new(),
                label: "All Types".into(),
                selected: selected.is_empty(),
            });
        }
        options.extend(JobType::ALL.iter().map(|t| SelectOption {
            value: t.as_str().into(),
            label: t.label().into(),
            selected: t.as_str().eq_ignore_ascii_case(selected),
        }));
        options
    }

    pub fn genders(selected: &str) -> Vec<SelectOption> {
        Gender::ALL
            .iter()
            .map(|g| SelectOption {
                value: g.as_str().into(),
                label: g.label().into(),
                selected: g.as_str() == selected,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub layout: Layout,
    pub q: String,
    pub l: String,
    pub categories: Vec<&'static str>,
}

#[derive(Template)]
#[template(path = "jobs.html")]
pub struct ListingPage {
    pub layout: Layout,
    pub load_error: bool,
    pub jobs: Vec<JobView>,
    pub can_toggle: bool,
    pub mine: bool,
    pub toggle_href: String,
    pub q: String,
    pub l: String,
    pub type_options: Vec<SelectOption>,
    pub heading: String,
    pub empty_message: String,
}

#[derive(Template)]
#[template(path = "job_detail.html")]
pub struct DetailPage {
    pub layout: Layout,
    pub job: Option<JobView>,
    pub message: String,
}

#[derive(Template)]
#[template(path = "post_job.html")]
pub struct PostJobPage {
    pub layout: Layout,
    pub title: String,
    pub company: String,
    pub location: String,
    pub type_options: Vec<SelectOption>,
    pub salary_range: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub layout: Layout,
    pub username: String,
    pub full_name: String,
    pub gender_options: Vec<SelectOption>,
    pub gender_selected: bool,
    pub date_of_birth: String,
}

impl ProfilePage {
    pub fn from_profile(layout: Layout, profile: Option<&Profile>) -> Self {
        let field = |f: fn(&Profile) -> Option<String>| profile.and_then(f).unwrap_or_default();
        let gender = field(|p| p.gender.clone());
        Self {
            layout,
            username: field(|p| p.username.clone()),
            full_name: field(|p| p.full_name.clone()),
            gender_selected: !gender.is_empty(),
            gender_options: SelectOption::genders(&gender),
            date_of_birth: field(|p| p.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string())),
        }
    }
}

#[derive(Template)]
#[template(path = "auth.html")]
pub struct AuthPage {
    pub layout: Layout,
    pub sign_up: bool,
    pub email: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout {
            signed_in: false,
            initial: "U".into(),
            notice: None,
            year: 2025,
        }
    }

    #[test]
    fn initial_falls_back_to_u() {
        assert_eq!(initial(Some("ada lovelace")), "A");
        assert_eq!(initial(Some("")), "U");
        assert_eq!(initial(None), "U");
    }

    #[test]
    fn job_type_options_mark_selection_case_insensitively() {
        let options = SelectOption::job_types("Part-Time", true);
        assert_eq!(options.len(), 5);
        assert!(!options[0].selected);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.value.as_str()).collect();
        assert_eq!(selected, ["part-time"]);
    }

    #[test]
    fn detail_page_escapes_user_content() {
        let page = DetailPage {
            layout: layout(),
            job: Some(JobView {
                id: "1".into(),
                title: "<script>alert(1)</script>".into(),
                company: "Acme".into(),
                location: "Austin".into(),
                job_type: "full-time".into(),
                salary_range: String::new(),
                description: "desc".into(),
                posted_on: "Jan 01, 2025".into(),
            }),
            message: String::new(),
        };
        let html = page.render().unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&#60;script&#62;alert(1)"));
    }

    #[test]
    fn toast_renders_only_with_a_notice() {
        let mut page = AuthPage {
            layout: layout(),
            sign_up: false,
            email: String::new(),
            error: String::new(),
        };
        assert!(!page.render().unwrap().contains("toast-destructive"));
        page.layout.notice = Some(Notice::SignOutFailed);
        let html = page.render().unwrap();
        assert!(html.contains("toast-destructive"));
        assert!(html.contains("Failed to sign out. Please try again."));
    }
}
