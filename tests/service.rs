use session_auth::{
    filter_datum, hash_password, verify_password, Error, HashedPassword, MemoryDirectory,
    RedactingLogger, UserAuthService, UserDirectory, UserFilter, PII_FIELDS,
};
use std::sync::{Arc, Mutex};

const EMAIL: &str = "guillaume@holberton.io";
const PASSWD: &str = "b4l0u";
const NEW_PASSWD: &str = "t4rt1fl3tt3";

fn service() -> (Arc<MemoryDirectory>, UserAuthService) {
    let directory = Arc::new(MemoryDirectory::new());
    (directory.clone(), UserAuthService::new(directory))
}

#[test]
fn test_password_hashing() {
    let digest = hash_password("pw1").unwrap();
    assert!(verify_password(&digest, "pw1"));
    assert!(!verify_password(&digest, "pw2"));
    assert!(!verify_password(&digest, ""));

    let other = hash_password("pw1").unwrap();
    assert_ne!(digest.as_str(), other.as_str());
    assert!(other.verify("pw1"));

    let malformed = HashedPassword::from_phc_string("not a digest");
    assert!(!verify_password(&malformed, "not a digest"));
    assert_eq!(format!("{digest:?}"), "HashedPassword([REDACTED])");
}

#[async_std::test]
async fn test_register_user_twice() {
    let (directory, service) = service();
    let user = service.register_user(EMAIL, PASSWD).await.unwrap();
    assert_eq!(user.email, EMAIL);
    assert!(user.is_valid_password(PASSWD));

    match service.register_user(EMAIL, NEW_PASSWD).await {
        Err(Error::UserAlreadyExists { email }) => assert_eq!(email, EMAIL),
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert_eq!(directory.len().await, 1);
}

#[async_std::test]
async fn test_valid_login() {
    let (_, service) = service();
    service.register_user(EMAIL, PASSWD).await.unwrap();
    assert!(service.valid_login(EMAIL, PASSWD).await.unwrap());
    assert!(!service.valid_login(EMAIL, NEW_PASSWD).await.unwrap());
    assert!(!service.valid_login("unknown@holberton.io", PASSWD).await.unwrap());
}

/// A user has a single session. Logging in again invalidates the previous cookie.
#[async_std::test]
async fn test_single_session_flow() {
    let (directory, service) = service();
    let user = service.register_user(EMAIL, PASSWD).await.unwrap();
    assert_eq!(service.create_session("unknown@holberton.io").await.unwrap(), None);

    let first = service.create_session(EMAIL).await.unwrap().unwrap();
    let found = service.get_user_from_session_id(&first).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let second = service.create_session(EMAIL).await.unwrap().unwrap();
    assert_ne!(first, second);
    assert!(service.get_user_from_session_id(&first).await.unwrap().is_none());
    assert!(service.get_user_from_session_id(&second).await.unwrap().is_some());
    assert!(service.get_user_from_session_id("").await.unwrap().is_none());

    service.destroy_session(&user.id).await.unwrap();
    assert!(service.get_user_from_session_id(&second).await.unwrap().is_none());
    let stored = directory
        .find(&UserFilter::Id(user.id.clone()))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.session_id.is_none());
}

/// A reset token can be used once. Unknown emails and tokens fail alike.
#[async_std::test]
async fn test_password_reset() {
    let (_, service) = service();
    service.register_user(EMAIL, PASSWD).await.unwrap();

    assert!(matches!(
        service.get_reset_password_token("unknown@holberton.io").await,
        Err(Error::InvalidResetRequest)
    ));

    let reset_token = service.get_reset_password_token(EMAIL).await.unwrap();
    service.update_password(&reset_token, NEW_PASSWD).await.unwrap();
    assert!(service.valid_login(EMAIL, NEW_PASSWD).await.unwrap());
    assert!(!service.valid_login(EMAIL, PASSWD).await.unwrap());

    assert!(matches!(
        service.update_password(&reset_token, PASSWD).await,
        Err(Error::InvalidResetRequest)
    ));
    assert!(matches!(
        service.update_password("", PASSWD).await,
        Err(Error::InvalidResetRequest)
    ));
}

#[async_std::test]
async fn test_update_unknown_user() {
    let (directory, service) = service();
    let user = service.register_user(EMAIL, PASSWD).await.unwrap();
    let other = MemoryDirectory::new();
    assert!(matches!(
        other.update(&user.id, Default::default()).await,
        Err(Error::UserNotFound { .. })
    ));
    assert!(directory.update(&user.id, Default::default()).await.is_ok());
}

#[test]
fn test_filter_datum() {
    let message = "name=egg;email=eggmin@eggsample.com;password=eggcellent;date_of_birth=12/12/1986;";
    assert_eq!(
        filter_datum(&["password", "date_of_birth"], "xxx", message, ";"),
        "name=egg;email=eggmin@eggsample.com;password=xxx;date_of_birth=xxx;"
    );
    assert_eq!(
        filter_datum(&PII_FIELDS, "***", "name=a b;ip=1.2.3.4;", ";"),
        "name=***;ip=1.2.3.4;"
    );
}

#[derive(Debug, Default)]
struct CapturingLogger {
    messages: Mutex<Vec<String>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

#[test]
fn test_redacting_logger() {
    use log::Log;

    let logger = RedactingLogger::new(CapturingLogger::default());
    logger.log(
        &log::Record::builder()
            .level(log::Level::Info)
            .args(format_args!("email=bob@dylan.com;ssn=123-45-6789;last_login=today;"))
            .build(),
    );
    let messages = logger.into_inner().messages.into_inner().unwrap();
    assert_eq!(
        messages,
        vec!["INFO email=***;ssn=***;last_login=today;".to_owned()]
    );
}
