//! Opaque credential verification capability.
//!
//! Token issuance, signing, and cookie semantics live elsewhere; the
//! admission layer is only handed something that can answer yes or no.

pub trait Verifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Single-account verifier backed by environment configuration.
pub struct StaticVerifier {
    username: String,
    password: String,
}

impl StaticVerifier {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Verifier for StaticVerifier {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_configured_pair() {
        let verifier = StaticVerifier::new("admin", "hunter2");

        assert!(verifier.verify("admin", "hunter2"));
        assert!(!verifier.verify("admin", "wrong"));
        assert!(!verifier.verify("root", "hunter2"));
    }
}
