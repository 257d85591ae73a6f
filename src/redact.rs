//! Keeping personal data out of the logs.

use log::{Log, Metadata, Record};
use regex::Regex;

/// Fields treated as personally identifiable information.
pub const PII_FIELDS: [&str; 5] = ["name", "email", "phone", "ssn", "password"];

/// Replaces the value of every `field=value<separator>` pair in `message` by `redaction`.
pub fn filter_datum(fields: &[&str], redaction: &str, message: &str, separator: &str) -> String {
    let mut message = message.to_owned();
    for field in fields {
        let pattern = format!("{}=.*?{}", regex::escape(field), regex::escape(separator));
        let Ok(pattern) = Regex::new(&pattern) else {
            continue;
        };
        let replacement = format!("{field}={redaction}{separator}");
        message = pattern
            .replace_all(&message, regex::NoExpand(&replacement))
            .into_owned();
    }
    message
}

/// A logger that redacts PII fields before passing records on to another logger.
///
/// Install it in place of the logger it wraps, e.g. with [`log::set_boxed_logger`].
#[derive(Debug)]
pub struct RedactingLogger<L> {
    inner: L,
    fields: Vec<String>,
}

impl<L: Log> RedactingLogger<L> {
    /// The text that replaces redacted values.
    pub const REDACTION: &'static str = "***";
    /// The separator between `field=value` pairs.
    pub const SEPARATOR: &'static str = ";";

    /// Redact [`PII_FIELDS`] before logging to `inner`.
    pub fn new(inner: L) -> Self {
        Self::with_fields(inner, PII_FIELDS)
    }

    /// Redact `fields` before logging to `inner`.
    pub fn with_fields<S: Into<String>>(inner: L, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            inner,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The wrapped logger.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: Log> Log for RedactingLogger<L> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let fields: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        let message = filter_datum(
            &fields,
            Self::REDACTION,
            &record.args().to_string(),
            Self::SEPARATOR,
        );
        self.inner.log(
            &Record::builder()
                .metadata(record.metadata().clone())
                .args(format_args!("{message}"))
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build(),
        );
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
