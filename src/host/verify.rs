//! Admission verification for registering plugins.

use crate::protocol::PluginInfo;

/// Admission policy consulted before a candidate is inserted into the
/// registry. A rejection reason becomes `AdmissionRejected` on the wire; no
/// partial state is created for rejected candidates.
///
/// This is a required collaborator of the lifecycle service: hosts without
/// an admission policy pass [`AcceptAll`] explicitly.
pub trait Verifier: Send + Sync {
    fn verify(&self, info: &PluginInfo) -> Result<(), String>;
}

/// Admits every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Verifier for AcceptAll {
    fn verify(&self, _info: &PluginInfo) -> Result<(), String> {
        Ok(())
    }
}

/// Admits candidates whose cookie value matches a shared secret.
#[derive(Debug, Clone)]
pub struct CookieValueVerifier {
    expected: String,
}

impl CookieValueVerifier {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Verifier for CookieValueVerifier {
    fn verify(&self, info: &PluginInfo) -> Result<(), String> {
        if info.cookie_value == self.expected {
            Ok(())
        } else {
            Err(format!("cookie value mismatch for {}", info.cookie_key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(cookie_value: &str) -> PluginInfo {
        PluginInfo {
            version: "1.0".to_string(),
            app_name: "demo".to_string(),
            git_hash: String::new(),
            git_branch: String::new(),
            build_time: String::new(),
            runtime_version: String::new(),
            cookie_key: "alice-key".to_string(),
            cookie_value: cookie_value.to_string(),
            last_heartbeat_time: 0,
            state: 0,
        }
    }

    #[test]
    fn accept_all_admits_anything() {
        assert!(AcceptAll.verify(&candidate("")).is_ok());
    }

    #[test]
    fn cookie_value_verifier_checks_secret() {
        let verifier = CookieValueVerifier::new("secret");
        assert!(verifier.verify(&candidate("secret")).is_ok());

        let reason = verifier.verify(&candidate("wrong")).unwrap_err();
        assert!(reason.contains("alice-key"));
    }
}
