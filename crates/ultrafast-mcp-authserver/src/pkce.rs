//! PKCE (RFC 7636) S256 challenge generation and verification.

use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Computes `base64url_no_pad(SHA256(verifier))`.
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Recomputes the challenge from `verifier` and compares it to `challenge` in constant time.
///
/// Empty `verifier` or `challenge` is always rejected: `SHA256("")` is a fixed value, so
/// `verify("", "")` would otherwise be mathematically true. Callers must reject empty PKCE
/// parameters at ingress rather than relying on this function alone.
pub fn verify(verifier: &str, challenge: &str) -> bool {
    if verifier.is_empty() || challenge.is_empty() {
        return false;
    }
    let computed = generate_code_challenge(verifier);
    computed.as_bytes().ct_eq(challenge.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_matching_pair() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert_eq!(generate_code_challenge(verifier), challenge);
        assert!(verify(verifier, challenge));
    }

    #[test]
    fn rejects_mismatched_pair() {
        assert!(!verify("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk", "wrong"));
    }

    #[test]
    fn rejects_empty_inputs() {
        assert!(!verify("", ""));
        assert!(!verify("nonempty", ""));
        assert!(!verify("", "nonempty"));
    }

    #[test]
    fn every_verifier_round_trips() {
        for verifier in ["a", "abc123", "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"] {
            let challenge = generate_code_challenge(verifier);
            assert!(verify(verifier, &challenge));
        }
    }
}
