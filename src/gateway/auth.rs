//! Credential capture for the connect envelope.

use crate::protocol::frames::ConnectEnvelope;
use crate::storage::types::AuthMethod;

/// Non-cryptographic 32-bit rolling hash over the credential, hex encoded.
/// Dedup key for analysis only; the raw prefix is kept alongside.
pub fn fingerprint(credential: &str) -> String {
    let mut hash: u32 = 5381;
    for byte in credential.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }
    format!("hash_{:08x}", hash)
}

/// Pick the presented credential out of an envelope: password wins over
/// token; an envelope with neither is method `none`.
pub fn detect_credentials(envelope: &ConnectEnvelope) -> (AuthMethod, Option<String>) {
    if let Some(auth) = &envelope.auth {
        if let Some(password) = &auth.password {
            return (AuthMethod::Password, Some(password.clone()));
        }
        if let Some(token) = &auth.token {
            return (AuthMethod::Token, Some(token.clone()));
        }
    }
    (AuthMethod::None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frames::AuthBlock;

    #[test]
    fn test_fingerprint_format_and_stability() {
        let fp = fingerprint("abc");
        assert!(fp.starts_with("hash_"));
        assert_eq!(fp.len(), "hash_".len() + 8);
        assert_eq!(fp, fingerprint("abc"));
        assert_ne!(fp, fingerprint("abd"));
    }

    #[test]
    fn test_password_takes_precedence() {
        let envelope = ConnectEnvelope {
            auth: Some(AuthBlock {
                token: Some("tok".to_string()),
                password: Some("hunter2".to_string()),
            }),
            ..Default::default()
        };
        let (method, credential) = detect_credentials(&envelope);
        assert_eq!(method, AuthMethod::Password);
        assert_eq!(credential.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_token_only() {
        let envelope = ConnectEnvelope {
            auth: Some(AuthBlock {
                token: Some("tok".to_string()),
                password: None,
            }),
            ..Default::default()
        };
        let (method, credential) = detect_credentials(&envelope);
        assert_eq!(method, AuthMethod::Token);
        assert_eq!(credential.as_deref(), Some("tok"));
    }

    #[test]
    fn test_no_credentials() {
        let (method, credential) = detect_credentials(&ConnectEnvelope::default());
        assert_eq!(method, AuthMethod::None);
        assert!(credential.is_none());
    }
}
