use rand::distributions::{Alphanumeric, DistString};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A type with the ability to generate session cookies.
pub trait SessionCookieGenerator: Debug + Send + Sync {
    /// Generate a cookie, i.e. a string that is a valid HTTP cookie value.
    fn generate_cookie(&self) -> String;
}

/// The default cookie generator with focus on security.
/// It uses [rand::thread_rng] as a random source and the [Alphanumeric] distribution to generate cookie strings.
/// This gives `log_2(26+26+10) ≥ 5.95` bits of entropy per character, so the default length of 64 carries more than 380 bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionCookieGenerator<const COOKIE_LENGTH: usize = 64>;

impl<const COOKIE_LENGTH: usize> SessionCookieGenerator
    for DefaultSessionCookieGenerator<COOKIE_LENGTH>
{
    fn generate_cookie(&self) -> String {
        let mut cookie = String::with_capacity(COOKIE_LENGTH);
        Alphanumeric.append_string(&mut rand::thread_rng(), &mut cookie, COOKIE_LENGTH);
        cookie
    }
}

/// A debug cookie generator that generates an ascending sequence of integers, formatted as strings padded with zeroes.
#[derive(Debug, Default)]
pub struct DebugSessionCookieGenerator<const COOKIE_LENGTH: usize = 32> {
    next_index: AtomicUsize,
}

impl<const COOKIE_LENGTH: usize> SessionCookieGenerator
    for DebugSessionCookieGenerator<COOKIE_LENGTH>
{
    fn generate_cookie(&self) -> String {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        format!("{index:0width$}", width = COOKIE_LENGTH)
    }
}
