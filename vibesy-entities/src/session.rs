use std::fmt;

/// Bearer token of an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn bearer_header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Never leak the secret into logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_the_token() {
        let token = AuthToken::new("secret");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert_eq!(token.bearer_header_value(), "Bearer secret");
    }
}
