use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode};
use session_auth::{
    authenticate, hash_password, login_session, logout_session, require_auth, AuthBackend,
    AuthConfig, AuthType, Authenticator, BasicAuth, Error, LoginForm, MemoryDirectory,
    MemorySessions, SessionAuth, SystemClock, User, UserDirectory, DEFAULT_EXCLUDED_PATHS,
};
use std::sync::Arc;

const SESSION_NAME: &str = "_my_session_id";

async fn directory_with_user(email: &str, password: &str) -> (Arc<MemoryDirectory>, User) {
    let directory = Arc::new(MemoryDirectory::new());
    let user = directory
        .create(email, hash_password(password).unwrap())
        .await
        .unwrap();
    (directory, user)
}

fn session_auth(directory: Arc<MemoryDirectory>) -> SessionAuth {
    SessionAuth::new(
        Box::new(MemorySessions::new(Arc::new(SystemClock))),
        directory,
        SESSION_NAME,
    )
}

fn cookie_headers(cookie: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
    headers
}

fn basic_headers(credentials: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("Basic {}", STANDARD.encode(credentials));
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
    headers
}

fn excluded(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|path| path.to_string()).collect()
}

#[test]
fn test_require_auth() {
    let status = excluded(&["/api/v1/status/*"]);
    assert!(!require_auth(Some("/api/v1/status/"), &status));
    assert!(require_auth(Some("/api/v1/users/"), &status));

    let defaults = excluded(&DEFAULT_EXCLUDED_PATHS);
    assert!(!require_auth(Some("/api/v1/status"), &defaults));
    assert!(!require_auth(Some("/api/v1/status/"), &defaults));
    assert!(require_auth(Some("/api/v1/users"), &defaults));

    assert!(!require_auth(Some("/api/v1/stats"), &excluded(&["/api/v1/stat*"])));
    assert!(require_auth(None, &defaults));
    assert!(require_auth(Some(""), &defaults));
    assert!(require_auth(Some("/api/v1/status/"), &[]));
}

#[async_std::test]
async fn test_basic_auth_current_user() {
    let (directory, user) = directory_with_user("bob@hbtn.io", "H0lberton:School").await;
    let auth = BasicAuth::new(directory);

    let current = auth
        .current_user(&basic_headers("bob@hbtn.io:H0lberton:School"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, user.id);

    for credentials in [
        "bob@hbtn.io:wrong",
        "nobody@hbtn.io:H0lberton:School",
        "no-colon-at-all",
        "bob@hbtn.io:",
    ] {
        assert!(auth
            .current_user(&basic_headers(credentials))
            .await
            .unwrap()
            .is_none());
    }

    assert!(auth.current_user(&HeaderMap::new()).await.unwrap().is_none());
    let mut malformed = HeaderMap::new();
    malformed.insert(AUTHORIZATION, HeaderValue::from_static("Basic %%%not-base64"));
    assert!(auth.current_user(&malformed).await.unwrap().is_none());
    let mut bearer = HeaderMap::new();
    bearer.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(auth.current_user(&bearer).await.unwrap().is_none());
}

#[test]
fn test_basic_auth_header_parsing() {
    let auth = BasicAuth::new(Arc::new(MemoryDirectory::new()));
    assert_eq!(
        auth.extract_base64_authorization_header("Basic SG9sYmVydG9u"),
        Some("SG9sYmVydG9u")
    );
    assert_eq!(auth.extract_base64_authorization_header("Basic"), None);
    assert_eq!(
        auth.decode_base64_authorization_header("SG9sYmVydG9u").as_deref(),
        Some("Holberton")
    );
    assert_eq!(auth.decode_base64_authorization_header("Holberton"), None);
    assert_eq!(
        auth.extract_user_credentials("a@b.com:pw:with:colons"),
        Some(("a@b.com", "pw:with:colons"))
    );
}

#[async_std::test]
async fn test_session_auth_current_user() {
    let (directory, user) = directory_with_user("a@b.com", "pw1").await;
    let auth = session_auth(directory);
    let cookie_value = auth.create_session(&user.id).await.unwrap().unwrap();

    let headers = cookie_headers(&format!("theme=dark; {SESSION_NAME}={cookie_value}"));
    assert_eq!(auth.session_cookie(&headers), Some(cookie_value.clone()));
    let current = auth.current_user(&headers).await.unwrap().unwrap();
    assert_eq!(current.email, "a@b.com");

    let other_cookie = cookie_headers(&format!("other_session={cookie_value}"));
    assert!(auth.current_user(&other_cookie).await.unwrap().is_none());
    assert!(auth.current_user(&HeaderMap::new()).await.unwrap().is_none());
}

/// Login sets the cookie, logout destroys the session, a second logout finds nothing.
#[async_std::test]
async fn test_login_logout_scenario() {
    let (directory, _) = directory_with_user("a@b.com", "pw1").await;
    let auth = session_auth(directory);

    let response = login_session(
        &auth,
        &LoginForm {
            email: Some("a@b.com".to_owned()),
            password: Some("pw1".to_owned()),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
    assert_eq!(body["email"], "a@b.com");
    assert!(body.get("hashed_password").is_none());

    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    let cookie = set_cookie.split(';').next().unwrap().to_owned();
    assert!(cookie.starts_with(&format!("{SESSION_NAME}=")));
    let headers = cookie_headers(&cookie);

    let response = logout_session(&auth, &headers).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "{}");

    let response = logout_session(&auth, &headers).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[async_std::test]
async fn test_login_errors() {
    let (directory, _) = directory_with_user("a@b.com", "pw1").await;
    let auth = session_auth(directory);

    let cases = [
        (None, Some("pw1"), StatusCode::BAD_REQUEST, "email missing"),
        (Some(""), Some("pw1"), StatusCode::BAD_REQUEST, "email missing"),
        (Some("a@b.com"), None, StatusCode::BAD_REQUEST, "password missing"),
        (
            Some("x@b.com"),
            Some("pw1"),
            StatusCode::NOT_FOUND,
            "no user found for this email",
        ),
        (Some("a@b.com"), Some("pw2"), StatusCode::UNAUTHORIZED, "wrong password"),
    ];
    for (email, password, status, message) in cases {
        let form = LoginForm {
            email: email.map(str::to_owned),
            password: password.map(str::to_owned),
        };
        let response = login_session(&auth, &form).await.unwrap();
        assert_eq!(response.status(), status);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], message);
    }
}

#[async_std::test]
async fn test_authenticate_gate() {
    let (directory, user) = directory_with_user("a@b.com", "pw1").await;
    let auth = session_auth(directory);
    let excluded_paths = excluded(&DEFAULT_EXCLUDED_PATHS);
    let cookie_value = auth.create_session(&user.id).await.unwrap().unwrap();

    let anonymous = HeaderMap::new();
    assert!(matches!(
        authenticate(&auth, "/api/v1/status", &excluded_paths, &anonymous).await,
        Ok(None)
    ));
    assert_eq!(
        authenticate(&auth, "/api/v1/users", &excluded_paths, &anonymous)
            .await
            .unwrap_err(),
        StatusCode::UNAUTHORIZED
    );

    let stale = cookie_headers(&format!("{SESSION_NAME}=not-a-session"));
    assert_eq!(
        authenticate(&auth, "/api/v1/users", &excluded_paths, &stale)
            .await
            .unwrap_err(),
        StatusCode::FORBIDDEN
    );

    let valid = cookie_headers(&format!("{SESSION_NAME}={cookie_value}"));
    let current = authenticate(&auth, "/api/v1/users", &excluded_paths, &valid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.id, user.id);
}

#[async_std::test]
async fn test_backend_selection() {
    let directory: Arc<dyn UserDirectory> = Arc::new(MemoryDirectory::new());
    let snapshot = tempfile::tempdir().unwrap();

    assert!(
        AuthBackend::from_config(&AuthConfig::default(), directory.clone(), Arc::new(SystemClock))
            .is_none()
    );

    for (name, is_session) in [
        ("auth", false),
        ("basic_auth", false),
        ("session_auth", true),
        ("session_exp_auth", true),
        ("session_db_auth", true),
    ] {
        let config = AuthConfig::from_vars([
            ("AUTH_TYPE", name.to_owned()),
            ("SESSION_DURATION", "60".to_owned()),
            (
                "SESSION_SNAPSHOT_PATH",
                snapshot.path().join("sessions.json").display().to_string(),
            ),
        ])
        .unwrap();
        let backend =
            AuthBackend::from_config(&config, directory.clone(), Arc::new(SystemClock)).unwrap();
        assert_eq!(backend.as_session().is_some(), is_session, "{name}");
        assert_eq!(backend.session_name().is_some(), is_session, "{name}");
    }
}

/// The gate-only authenticator never accepts any credentials.
#[async_std::test]
async fn test_gate_only_forbids_everything() {
    let (directory, _) = directory_with_user("a@b.com", "pw1").await;
    let config = AuthConfig {
        auth_type: Some(AuthType::Auth),
        ..AuthConfig::default()
    };
    let backend = AuthBackend::from_config(&config, directory, Arc::new(SystemClock)).unwrap();
    assert_eq!(
        authenticate(
            &backend,
            "/api/v1/users",
            &config.excluded_paths,
            &basic_headers("a@b.com:pw1")
        )
        .await
        .unwrap_err(),
        StatusCode::FORBIDDEN
    );
}

#[test]
fn test_config_from_vars() {
    let config = AuthConfig::from_vars([
        ("AUTH_TYPE", "session_exp_auth"),
        ("SESSION_NAME", "sid"),
        ("SESSION_DURATION", "not a number"),
        ("UNRELATED", "ignored"),
    ])
    .unwrap();
    assert_eq!(config.auth_type, Some(AuthType::SessionExpAuth));
    assert_eq!(config.session_name, "sid");
    assert_eq!(config.session_duration, 0);
    assert_eq!(config.session_policy().duration(), None);

    assert!(matches!(
        AuthConfig::from_vars([("AUTH_TYPE", "kerberos")]),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_config_from_json() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        r#"{"auth_type": "session_db_auth", "session_duration": "120", "snapshot_path": "/tmp/s.json"}"#,
    )
    .unwrap();
    let config = AuthConfig::load(file.path()).unwrap();
    assert_eq!(config.auth_type, Some(AuthType::SessionDbAuth));
    assert_eq!(config.session_duration, 120);
    assert_eq!(config.session_name, "_my_session_id");
    assert_eq!(config.excluded_paths.len(), DEFAULT_EXCLUDED_PATHS.len());

    let config: AuthConfig = serde_json::from_str(r#"{"session_duration": [1]}"#).unwrap();
    assert_eq!(config.session_duration, 0);
    assert_eq!(config.auth_type, None);
}
