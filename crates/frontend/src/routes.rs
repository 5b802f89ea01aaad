//! Route classification

use appshell_core::ShellConfig;

pub const HOME: &str = "/";
pub const SIGN_IN_CALLBACK: &str = "/sign-in-callback";
pub const LOGOUT_CALLBACK: &str = "/logout-callback";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    SignInCallback,
    LogoutCallback,
    SilentRenewCallback,
    NotFound,
}

impl Route {
    /// Exact-match classification of a pathname; one trailing slash is
    /// tolerated
    #[must_use]
    pub fn classify(pathname: &str, config: &ShellConfig) -> Self {
        if config.is_silent_renew_page(pathname) {
            return Self::SilentRenewCallback;
        }
        let path = match pathname.strip_suffix('/') {
            Some("") | None => pathname,
            Some(stripped) => stripped,
        };
        match path {
            "" | HOME => Self::Home,
            SIGN_IN_CALLBACK => Self::SignInCallback,
            LOGOUT_CALLBACK => Self::LogoutCallback,
            _ => Self::NotFound,
        }
    }
}

/// Where to land once the sign-in callback is done: the route saved before
/// the redirect, unless it is missing or itself an authentication route
#[must_use]
pub fn after_sign_in(saved: Option<String>, config: &ShellConfig) -> String {
    saved
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .filter(|path| matches!(Route::classify(path, config), Route::Home | Route::NotFound))
        .unwrap_or_else(|| HOME.to_string())
}
