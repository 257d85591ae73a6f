//! Login and logout for session authentication.
//!
//! The handlers are framework agnostic: they take the parsed form or the request headers and
//! return a complete [`Response`] with a JSON body.

use crate::auth::{Authenticator, SessionAuth};
use crate::user::UserFilter;
use crate::Result;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// The form fields of a login request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    /// The email of the user.
    pub email: Option<String>,
    /// The password of the user.
    pub password: Option<String>,
}

/// `POST /api/v1/auth_session/login`
///
/// Responds with 400 if a field is missing, 404 if no user has the email, 401 if the password is
/// wrong, and otherwise with 200, the user as JSON, and the session cookie.
pub async fn login_session(auth: &SessionAuth, form: &LoginForm) -> Result<Response<String>> {
    let Some(email) = form.email.as_deref().filter(|email| !email.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "email missing");
    };
    let Some(password) = form.password.as_deref().filter(|password| !password.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "password missing");
    };

    let Some(user) = auth
        .directory()
        .find(&UserFilter::Email(email.to_owned()))
        .await?
    else {
        return error_response(StatusCode::NOT_FOUND, "no user found for this email");
    };
    if !user.is_valid_password(password) {
        return error_response(StatusCode::UNAUTHORIZED, "wrong password");
    }

    let Some(cookie_value) = auth.create_session(&user.id).await? else {
        log::error!("No session could be created for user {}", user.id);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "session not created");
    };
    let session_name = auth.session_name().unwrap_or_default();
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .header(
            SET_COOKIE,
            format!("{session_name}={cookie_value}; Path=/; HttpOnly"),
        )
        .body(serde_json::to_string(&user)?)?)
}

/// `DELETE /api/v1/auth_session/logout`
///
/// Responds with 404 if the request carries no valid session, and otherwise with 200 and an empty JSON object.
pub async fn logout_session(auth: &SessionAuth, headers: &HeaderMap) -> Result<Response<String>> {
    if !auth.destroy_session(headers).await? {
        return error_response(StatusCode::NOT_FOUND, "Not found");
    }
    json_response(StatusCode::OK, &json!({}))
}

fn error_response(status: StatusCode, message: &str) -> Result<Response<String>> {
    json_response(status, &json!({ "error": message }))
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Result<Response<String>> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string())?)
}
