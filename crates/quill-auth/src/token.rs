use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Holds the process-wide signing secret. Constructed once at startup and
/// injected wherever tokens are minted or checked; rotating the secret
/// invalidates every outstanding cookie.
#[derive(Clone)]
pub struct SecurityContext {
    secret: String,
}

impl SecurityContext {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn digest(&self, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce a tamper-evident `"<value>|<hexdigest>"` token.
    pub fn sign(&self, value: &str) -> String {
        format!("{}|{}", value, self.digest(value))
    }

    /// Recover the value from a signed token, or `None` if the token has no
    /// separator or fails to re-sign to exactly the same string. Plain
    /// string comparison; not constant-time.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (value, _) = token.split_once('|')?;
        (self.sign(value) == token).then(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let ctx = SecurityContext::new("test-secret");
        for value in ["1", "42", "9007199254740993", ""] {
            let token = ctx.sign(value);
            assert_eq!(ctx.verify(&token).as_deref(), Some(value));
        }
    }

    #[test]
    fn tampering_any_character_fails() {
        let ctx = SecurityContext::new("test-secret");
        let token = ctx.sign("42");

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(ctx.verify(&tampered), None, "index {i} accepted");
        }
    }

    #[test]
    fn missing_separator_fails() {
        let ctx = SecurityContext::new("test-secret");
        assert_eq!(ctx.verify("42"), None);
        assert_eq!(ctx.verify(""), None);
    }

    #[test]
    fn different_secret_fails() {
        let signer = SecurityContext::new("secret-a");
        let checker = SecurityContext::new("secret-b");
        assert_eq!(checker.verify(&signer.sign("42")), None);
    }
}
