use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const NOTICE_COOKIE: &str = "job_board_notice";

/// Toast shown once on the next rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SearchCriteriaRequired,
    JobPosted,
    PostFailed,
    MissingFields,
    MustBeLoggedIn,
    WelcomeBack,
    Welcome,
    SignedOut,
    SignOutFailed,
    ProfileLoadFailed,
    ProfileUpdated,
    ProfileUpdateFailed,
}

impl Notice {
    const ALL: [Notice; 12] = [
        Notice::SearchCriteriaRequired,
        Notice::JobPosted,
        Notice::PostFailed,
        Notice::MissingFields,
        Notice::MustBeLoggedIn,
        Notice::WelcomeBack,
        Notice::Welcome,
        Notice::SignedOut,
        Notice::SignOutFailed,
        Notice::ProfileLoadFailed,
        Notice::ProfileUpdated,
        Notice::ProfileUpdateFailed,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Notice::SearchCriteriaRequired => "search-criteria",
            Notice::JobPosted => "job-posted",
            Notice::PostFailed => "post-failed",
            Notice::MissingFields => "missing-fields",
            Notice::MustBeLoggedIn => "must-log-in",
            Notice::WelcomeBack => "welcome-back",
            Notice::Welcome => "welcome",
            Notice::SignedOut => "signed-out",
            Notice::SignOutFailed => "sign-out-failed",
            Notice::ProfileLoadFailed => "profile-load-failed",
            Notice::ProfileUpdated => "profile-updated",
            Notice::ProfileUpdateFailed => "profile-update-failed",
        }
    }

    pub fn from_code(code: &str) -> Option<Notice> {
        Notice::ALL.into_iter().find(|n| n.code() == code)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notice::SearchCriteriaRequired => "Search criteria required",
            Notice::JobPosted => "Job Posted Successfully",
            Notice::WelcomeBack => "Welcome back!",
            Notice::Welcome => "Welcome!",
            Notice::SignedOut => "Signed out",
            Notice::ProfileUpdated => "Success",
            _ => "Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Notice::SearchCriteriaRequired => {
                "Please enter either a job title/keyword or location to search."
            }
            Notice::JobPosted => "Your job listing has been created and is now live.",
            Notice::PostFailed => "There was an error posting your job. Please try again.",
            Notice::MissingFields => "Please fill in all required fields.",
            Notice::MustBeLoggedIn => "You must be logged in to post a job.",
            Notice::WelcomeBack => "You have successfully signed in.",
            Notice::Welcome => "Please complete your profile information.",
            Notice::SignedOut => "You have been successfully signed out.",
            Notice::SignOutFailed => "Failed to sign out. Please try again.",
            Notice::ProfileLoadFailed => "Failed to load profile information",
            Notice::ProfileUpdated => "Profile updated successfully",
            Notice::ProfileUpdateFailed => "Failed to update profile",
        }
    }

    pub fn destructive(&self) -> bool {
        self.title() == "Error" || *self == Notice::SearchCriteriaRequired
    }
}

/// Queues a notice for the next page the browser renders.
pub fn push(jar: CookieJar, notice: Notice) -> CookieJar {
    let mut cookie = Cookie::new(NOTICE_COOKIE, notice.code());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Removes the queued notice, if any, and returns it.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Notice>) {
    let notice = jar
        .get(NOTICE_COOKIE)
        .and_then(|c| Notice::from_code(c.value()));
    if jar.get(NOTICE_COOKIE).is_none() {
        return (jar, notice);
    }
    (jar.remove(Cookie::build(NOTICE_COOKIE).path("/")), notice)
}
