use axum_extra::extract::cookie::{Cookie, SameSite};

/// Name of the login session cookie.
pub const SESSION_COOKIE: &str = "session_id";

pub fn session_cookie(session_id: impl Into<String>) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.into()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .removal()
        .into()
}
