use crate::application_port::ClientError;
use crate::domain_model::SessionId;
use chrono::{TimeDelta, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

pub const DEFAULT_COOKIE_NAME: &str = "beens-session";
pub const MIN_SECRET_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Signs session ids into cookie values: `<id>.<hex hmac-sha256>`.
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    secret: Vec<u8>,
    secure: bool,
    ttl_secs: u64,
}

impl SessionCookie {
    pub fn new(
        name: impl Into<String>,
        secret: &str,
        secure: bool,
        ttl_secs: u64,
    ) -> Result<Self, ClientError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(ClientError::Config(format!(
                "session.secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }
        Ok(SessionCookie {
            name: name.into(),
            secret: secret.as_bytes().to_vec(),
            secure,
            ttl_secs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn mac(&self) -> Result<HmacSha256, ClientError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn encode(&self, id: &SessionId) -> Result<String, ClientError> {
        let mut mac = self.mac()?;
        mac.update(id.as_str().as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", id, signature))
    }

    /// Session id carried by a cookie value, if its signature checks out.
    pub fn decode(&self, value: &str) -> Option<SessionId> {
        let (id, signature) = value.trim().rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(SessionId::from(id))
    }

    /// Session id from a `Cookie:` request header.
    pub fn from_header(&self, header: &str) -> Option<SessionId> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .and_then(|(_, value)| self.decode(value))
    }

    pub fn set_cookie(&self, id: &SessionId) -> Result<String, ClientError> {
        let mut header = format!(
            "{}={}; Path=/; Max-Age={}",
            self.name,
            self.encode(id)?,
            self.ttl_secs
        );
        let expires = i64::try_from(self.ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if let Some(expires) = expires {
            header.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        header.push_str(&self.attributes());
        Ok(header)
    }

    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0{}", self.name, self.attributes())
    }

    fn attributes(&self) -> String {
        let mut attrs = String::from("; HttpOnly; SameSite=Lax");
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn cookie(secure: bool) -> SessionCookie {
        SessionCookie::new(DEFAULT_COOKIE_NAME, SECRET, secure, 3600).unwrap()
    }

    #[test]
    fn short_secret_is_a_config_error() {
        let err = SessionCookie::new("s", "too-short", false, 60).err().unwrap();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn signed_value_verifies_and_tampering_does_not() {
        let cookie = cookie(false);
        let id = SessionId::from("abc123");
        let value = cookie.encode(&id).unwrap();
        assert_eq!(cookie.decode(&value), Some(id));

        let forged = value.replacen("abc123", "abc124", 1);
        assert_eq!(cookie.decode(&forged), None);
        assert_eq!(cookie.decode("abc123"), None);
        assert_eq!(cookie.decode("abc123.zz"), None);

        let other = SessionCookie::new(DEFAULT_COOKIE_NAME, &SECRET.repeat(2), false, 60).unwrap();
        assert_eq!(other.decode(&value), None);
    }

    #[test]
    fn reads_the_named_cookie_from_a_header() {
        let cookie = cookie(false);
        let id = SessionId::from("s-9");
        let header = format!(
            "theme=dark; {}={}; other=1",
            DEFAULT_COOKIE_NAME,
            cookie.encode(&id).unwrap()
        );
        assert_eq!(cookie.from_header(&header), Some(id));
        assert_eq!(cookie.from_header("theme=dark"), None);
    }

    #[test]
    fn set_cookie_carries_session_attributes() {
        let id = SessionId::from("s-1");
        let plain = cookie(false).set_cookie(&id).unwrap();
        assert!(plain.starts_with("beens-session=s-1."));
        assert!(plain.contains("; Max-Age=3600"));
        assert!(plain.contains("; Expires="));
        assert!(plain.contains("; HttpOnly; SameSite=Lax"));
        assert!(!plain.contains("Secure"));

        assert!(cookie(true).set_cookie(&id).unwrap().ends_with("; Secure"));
        assert_eq!(
            cookie(true).clear_cookie(),
            "beens-session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure"
        );
    }
}
