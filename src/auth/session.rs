//! Session issuance and cookie handling.
//!
//! Sessions are server-side rows keyed by an opaque random token; the
//! browser only ever holds the token in an HttpOnly cookie. The session row
//! carries the role claim, populated at sign-in and refreshed by the
//! resolver when absent.

use axum::http::HeaderMap;
use chrono::Utc;
use sqlx::PgConnection;

use crate::{
    auth::password,
    config::Config,
    db::{
        handlers::Sessions,
        models::sessions::{SessionCreateDBRequest, SessionDBResponse},
        models::users::UserDBResponse,
    },
    errors::Error,
};

/// Open a session for a user at sign-in. The role claim is copied from the
/// user record so later requests resolve without a users lookup.
pub async fn open_session(user: &UserDBResponse, config: &Config, conn: &mut PgConnection) -> Result<SessionDBResponse, Error> {
    let token = password::generate_token();
    let timeout = chrono::Duration::from_std(config.auth.native.session.timeout).unwrap_or(chrono::Duration::days(7));

    let session = Sessions::new(conn)
        .create(&SessionCreateDBRequest {
            token,
            user_id: user.id,
            role: Some(user.role),
            expires: Utc::now() + timeout,
        })
        .await?;

    Ok(session)
}

/// Build the Set-Cookie value carrying a session token
pub fn session_cookie(token: &str, config: &Config) -> String {
    let session = &config.auth.native.session;
    format!(
        "{}={}; Path=/; HttpOnly;{} SameSite={}; Max-Age={}",
        session.cookie_name,
        token,
        if session.cookie_secure { " Secure;" } else { "" },
        capitalize(&session.cookie_same_site),
        session.timeout.as_secs(),
    )
}

/// Build the Set-Cookie value that clears the session cookie
pub fn clear_session_cookie(config: &Config) -> String {
    let session = &config.auth.native.session;
    format!(
        "{}=; Path=/; HttpOnly;{} SameSite={}; Max-Age=0",
        session.cookie_name,
        if session.cookie_secure { " Secure;" } else { "" },
        capitalize(&session.cookie_same_site),
    )
}

/// Extract the session token from the request's Cookie header, if present
pub fn token_from_headers(headers: &HeaderMap, config: &Config) -> Result<Option<String>, Error> {
    let Some(cookie_header) = headers.get(axum::http::header::COOKIE) else {
        return Ok(None);
    };

    let cookie_str = cookie_header.to_str().map_err(|e| Error::BadRequest {
        message: format!("Invalid cookie header: {e}"),
    })?;
    let cookie_name = &config.auth.native.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name == cookie_name
            && !value.is_empty()
        {
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
