use oauth2::{CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use subtle::ConstantTimeEq;

pub const CHALLENGE_METHOD: &str = "S256";

/// Per-attempt secrets: CSRF `state` plus the PKCE verifier/challenge pair.
/// Lives only as long as one sign-in attempt.
pub struct PkceExchange {
    state: CsrfToken,
    verifier: PkceCodeVerifier,
    challenge: PkceCodeChallenge,
}

impl PkceExchange {
    /// Random state, 32-byte random verifier, S256 challenge.
    pub fn new_random() -> Self {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            state: CsrfToken::new_random(),
            verifier,
            challenge,
        }
    }

    /// Fixed secrets for tests. The verifier must be 43 to 128 characters.
    #[cfg(test)]
    pub(crate) fn from_parts(state: impl Into<String>, verifier: impl Into<String>) -> Self {
        let verifier = PkceCodeVerifier::new(verifier.into());
        let challenge = PkceCodeChallenge::from_code_verifier_sha256(&verifier);
        Self {
            state: CsrfToken::new(state.into()),
            verifier,
            challenge,
        }
    }

    pub fn state(&self) -> &str {
        self.state.secret()
    }

    pub fn csrf_token(&self) -> CsrfToken {
        self.state.clone()
    }

    pub fn verifier(&self) -> &str {
        self.verifier.secret()
    }

    pub fn challenge(&self) -> &str {
        self.challenge.as_str()
    }

    pub fn pkce_challenge(&self) -> PkceCodeChallenge {
        self.challenge.clone()
    }

    /// Constant-time comparison of the callback's `state` with ours.
    pub fn state_matches(&self, returned: Option<&str>) -> bool {
        returned.is_some_and(|s| bool::from(s.as_bytes().ct_eq(self.state().as_bytes())))
    }
}
