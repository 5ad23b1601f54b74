//! Browser session and flash messages.
//!
//! The session cookie carries an access token issued by the users service, so
//! pages and the REST API share one authentication scheme. Flash messages
//! survive exactly one redirect in a second, URL-encoded cookie.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::{config::AuthConfig, models::user::UserClaims, AppState};

pub const SESSION_COOKIE: &str = "biblioteca_session";
pub const FLASH_COOKIE: &str = "biblioteca_flash";

pub fn session_cookie(token: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .max_age(time::Duration::minutes(config.access_token_minutes))
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: FlashLevel::Error, message: message.into() }
    }

    fn encode(&self) -> String {
        let level = match self.level {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        };
        urlencoding::encode(&format!("{}|{}", level, self.message)).into_owned()
    }

    fn decode(value: &str) -> Option<Self> {
        let decoded = urlencoding::decode(value).ok()?;
        let (level, message) = decoded.split_once('|')?;
        let level = match level {
            "success" => FlashLevel::Success,
            "error" => FlashLevel::Error,
            _ => return None,
        };
        Some(Self { level, message: message.to_string() })
    }
}

/// Queue a message for the next page
pub fn set_flash(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

/// Read and clear the pending message
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(value) = jar.get(FLASH_COOKIE).map(|c| c.value().to_string()) else {
        return (jar, None);
    };
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Flash::decode(&value))
}

/// Signed-in user of a page request; anonymous visitors are sent to `/login`
pub struct WebUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for WebUser {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| Redirect::to("/login"))?;

        match state.services.users.verify_access_token(&token) {
            Ok(claims) => Ok(WebUser(claims)),
            Err(e) => {
                tracing::debug!(error = %e.public_message(), "rejected page session");
                Err(Redirect::to("/login"))
            }
        }
    }
}
