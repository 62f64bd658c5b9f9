use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};

/// Username/password pair for the agent's HTTP Basic authentication.
///
/// The header value is derived on demand and never stored, so it can
/// not drift out of sync with the fields it is built from.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: SecretString,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The full `Authorization` header value: `Basic base64(user:pass)`.
    pub fn header_value(&self) -> SecretString {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        SecretString::from(format!("Basic {}", STANDARD.encode(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_basic_base64_of_user_colon_pass() {
        let creds = BasicCredentials::new("user", SecretString::from("pass".to_string()));
        assert_eq!(creds.header_value().expose_secret(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn empty_password_still_encodes_separator() {
        let creds = BasicCredentials::new("admin", SecretString::from(String::new()));
        assert_eq!(creds.header_value().expose_secret(), "Basic YWRtaW46");
    }
}
