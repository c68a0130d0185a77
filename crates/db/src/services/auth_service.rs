// Authentication primitives: bcrypt for passwords, SHA256 for tokens.
use bcrypt::{DEFAULT_COST, hash, verify};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub struct AuthService;

impl AuthService {
    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, DEFAULT_COST)
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        verify(password, hash)
    }

    /// Generate a new session token using cryptographically secure random bytes
    pub fn generate_session_token() -> String {
        // UUID v4 provides 122 bits of randomness
        Uuid::new_v4().to_string()
    }

    /// Hash a session token with SHA256 before storage.
    /// Session tokens are already high-entropy, so a fast hash is enough and
    /// keeps per-request verification cheap.
    pub fn hash_session_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a 6-digit one-time code for email verification.
    pub fn generate_otp_code() -> String {
        let bytes = *Uuid::new_v4().as_bytes();
        let n = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        format!("{:06}", n % 1_000_000)
    }

    /// OTP codes are stored hashed, same scheme as session tokens.
    pub fn hash_otp_code(code: &str) -> String {
        Self::hash_session_token(code)
    }

    /// Generate an invite token for acceptance links.
    pub fn generate_invite_token() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let password = "correct horse battery staple";
        let hash = AuthService::hash_password(password).unwrap();

        assert!(AuthService::verify_password(password, &hash).unwrap());
        assert!(!AuthService::verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn session_tokens_are_unique() {
        let a = AuthService::generate_session_token();
        let b = AuthService::generate_session_token();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn otp_codes_are_six_digits() {
        for _ in 0..32 {
            let code = AuthService::generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn token_hash_is_stable() {
        let token = "abc";
        assert_eq!(
            AuthService::hash_session_token(token),
            AuthService::hash_session_token(token)
        );
    }
}
