//! One-shot notices shown on the next rendered page.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};

const NOTICE_COOKIE: &str = "notice";

/// Attach a notice to the browser.
pub fn set(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((NOTICE_COOKIE, hex::encode(message)))
        .path("/")
        .http_only(true);
    jar.add(cookie)
}

/// Read the pending notice, if any, and clear it.
pub fn take(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(NOTICE_COOKIE)
        .and_then(|c| hex::decode(c.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());
    if jar.get(NOTICE_COOKIE).is_none() {
        return (jar, None);
    }
    (jar.remove(Cookie::build(NOTICE_COOKIE).path("/")), message)
}

/// Redirect (303) carrying a notice.
pub fn redirect(jar: CookieJar, message: &str, to: &str) -> Response {
    (set(jar, message), Redirect::to(to)).into_response()
}
