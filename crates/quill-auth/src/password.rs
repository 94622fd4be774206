use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,20}$").expect("hard-coded pattern compiles"));
static PASSWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.{3,20}$").expect("hard-coded pattern compiles"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("hard-coded pattern compiles"));

const SALT_LEN: usize = 5;
const SALT_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub fn valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn valid_password(password: &str) -> bool {
    PASSWORD_RE.is_match(password)
}

/// Email is an optional signup field: empty is fine, anything else must be
/// roughly `local@domain.tld` shaped. Deliberately loose, not RFC 5322.
pub fn valid_email(email: &str) -> bool {
    email.is_empty() || EMAIL_RE.is_match(email)
}

/// Five random letters. Salts need to be unique-ish per credential, not
/// unpredictable.
fn make_salt() -> String {
    let mut rng = rand::rng();
    (0..SALT_LEN)
        .map(|_| SALT_ALPHABET[rng.random_range(0..SALT_ALPHABET.len())] as char)
        .collect()
}

/// Hash a password into the stored `"<hexdigest>,<salt>"` format.
/// A fresh salt is generated when none is supplied.
pub fn hash_password(username: &str, password: &str, salt: Option<&str>) -> String {
    let salt = match salt {
        Some(salt) => salt.to_string(),
        None => make_salt(),
    };

    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());

    format!("{},{}", hex::encode(hasher.finalize()), salt)
}

/// Recompute the digest with the salt parsed from the stored value and
/// compare for exact equality. A stored value with no salt separator never
/// verifies.
pub fn verify_password(username: &str, password: &str, stored: &str) -> bool {
    match stored.split_once(',') {
        Some((_, salt)) => hash_password(username, password, Some(salt)) == stored,
        None => false,
    }
}
