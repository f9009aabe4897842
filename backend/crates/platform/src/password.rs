//! Password Hashing and Verification
//!
//! Stored credentials come in three shapes:
//! - **PHC strings** (`$argon2id$v=19$...`): self-describing adaptive hashes,
//!   verified with Argon2's own constant-time comparator
//! - **bcrypt** (`$2a$`, `$2b$`, `$2y$`): written by older deployments
//! - **PBKDF2 envelopes**: base64 of a fixed 61-byte binary record
//!
//! ```text
//! offset  len  field
//! 0       1    format marker (0x01)
//! 1       4    PRF id, big-endian (2 = HMAC-SHA512)
//! 5       4    iteration count, big-endian
//! 9       4    salt length, big-endian (16)
//! 13      16   salt
//! 29      32   derived key
//! ```
//!
//! New credentials are always written as envelopes. Verification never
//! panics and never reports *why* a credential failed to the caller of
//! [`PasswordVerifier::verify`]; [`PasswordVerifier::verify_detailed`] exists
//! for audit logging only.
//!
//! ## Security Features
//! - Zeroization of plaintext on drop, redacted `Debug`
//! - Constant-time comparison of derived keys
//! - Iteration count is fixed on creation and capped on verification, so a
//!   crafted envelope cannot turn a login into a CPU sink

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordVerifier as _};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{constant_time_eq, from_base64, random_bytes, to_base64};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length for new credentials
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length for new credentials
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Envelope format marker (byte 0)
pub const ENVELOPE_FORMAT_MARKER: u8 = 0x01;

/// The only supported PRF id: HMAC-SHA512
pub const ENVELOPE_PRF_HMAC_SHA512: u32 = 2;

/// Salt length carried by every envelope
pub const ENVELOPE_SALT_LEN: usize = 16;

/// Derived key length carried by every envelope
pub const ENVELOPE_SUBKEY_LEN: usize = 32;

/// Total decoded envelope length
pub const ENVELOPE_LEN: usize = 1 + 4 + 4 + 4 + ENVELOPE_SALT_LEN + ENVELOPE_SUBKEY_LEN;

/// Version prefixes of modular-crypt bcrypt hashes
const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Iteration count used for every newly created envelope
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Upper bound accepted when verifying a stored envelope
pub const MAX_ENVELOPE_ITERATIONS: u32 = 1_000_000;

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors (new credentials only)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,
}

/// Credential verification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordError {
    /// Stored hash is not a PHC string or a supported envelope
    #[error("Unsupported password hash format")]
    FormatUnsupported,

    /// Hash is well-formed but the plaintext does not match
    #[error("Password mismatch")]
    Mismatch,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// ## Security
/// - Implements `Zeroize` and `ZeroizeOnDrop`
/// - Does not implement `Clone` to prevent accidental copies
/// - Debug output is redacted
///
/// The bytes are used exactly as received: stored envelopes were derived
/// over the raw UTF-8 bytes, so no normalization is applied.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a password for a *new* credential, enforcing the policy
    ///
    /// - 8..=128 Unicode code points
    /// - not empty / whitespace only
    /// - no control characters other than space, tab and newline
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        if raw.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = raw.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if raw
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        Ok(Self(raw))
    }

    /// Wrap a password submitted at sign-in
    ///
    /// No policy is applied: credentials created under older rules must keep
    /// working.
    pub fn for_login(raw: String) -> Self {
        Self(raw)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Stored hash + format discriminator
// ============================================================================

/// Explicit storage format of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFormat {
    /// Self-describing adaptive hash in PHC string format
    Phc,
    /// Modular-crypt bcrypt hash
    Bcrypt,
    /// Base64 PBKDF2-HMAC-SHA512 envelope
    Envelope,
}

impl HashFormat {
    /// Heuristic classification by shape
    ///
    /// Longer than 60 characters and drawn only from the standard base64
    /// alphabet (with trailing `=` padding) means envelope; a `$2?$` prefix
    /// means bcrypt; anything else is treated as a PHC string. A handcrafted
    /// value can fool this, so records should carry the format explicitly once
    /// it is known.
    pub fn detect(stored: &str) -> Self {
        let body = stored.trim_end_matches('=');
        let padding = stored.len() - body.len();

        let looks_base64 = !body.is_empty()
            && padding <= 2
            && body
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/');

        if stored.len() > 60 && looks_base64 {
            HashFormat::Envelope
        } else if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            HashFormat::Bcrypt
        } else {
            HashFormat::Phc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashFormat::Phc => "phc",
            HashFormat::Bcrypt => "bcrypt",
            HashFormat::Envelope => "envelope",
        }
    }
}

/// A stored credential together with its format
///
/// Built once at the repository boundary; the rest of the code never
/// re-derives the format from the string.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredPasswordHash {
    format: HashFormat,
    encoded: String,
}

impl StoredPasswordHash {
    /// Classify a legacy record that carries no discriminator
    pub fn classify(encoded: impl Into<String>) -> Self {
        let encoded = encoded.into();
        let format = HashFormat::detect(&encoded);
        Self { format, encoded }
    }

    /// Build from a record that already carries its format
    pub fn with_format(encoded: impl Into<String>, format: HashFormat) -> Self {
        Self {
            format,
            encoded: encoded.into(),
        }
    }

    pub fn format(&self) -> HashFormat {
        self.format
    }

    /// Encoded string for storage
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Debug for StoredPasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredPasswordHash")
            .field("format", &self.format)
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// PBKDF2 envelope
// ============================================================================

/// Decoded PBKDF2-HMAC-SHA512 envelope
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordEnvelope {
    iterations: u32,
    salt: [u8; ENVELOPE_SALT_LEN],
    subkey: [u8; ENVELOPE_SUBKEY_LEN],
}

impl PasswordEnvelope {
    /// Derive a new envelope with a fresh OS-random salt
    pub fn derive(password: &ClearTextPassword, iterations: u32) -> Self {
        let mut salt = [0u8; ENVELOPE_SALT_LEN];
        salt.copy_from_slice(&random_bytes(ENVELOPE_SALT_LEN));
        let subkey = derive_subkey(password.as_bytes(), &salt, iterations);
        Self {
            iterations,
            salt,
            subkey,
        }
    }

    /// Parse the binary layout; trailing bytes beyond 61 are ignored
    pub fn parse(bytes: &[u8]) -> Result<Self, PasswordError> {
        if bytes.len() < ENVELOPE_LEN {
            return Err(PasswordError::FormatUnsupported);
        }
        if bytes[0] != ENVELOPE_FORMAT_MARKER {
            return Err(PasswordError::FormatUnsupported);
        }

        let prf = read_u32_be(&bytes[1..5]);
        let iterations = read_u32_be(&bytes[5..9]);
        let salt_len = read_u32_be(&bytes[9..13]);

        if prf != ENVELOPE_PRF_HMAC_SHA512 || salt_len as usize != ENVELOPE_SALT_LEN {
            return Err(PasswordError::FormatUnsupported);
        }
        if iterations == 0 || iterations > MAX_ENVELOPE_ITERATIONS {
            return Err(PasswordError::FormatUnsupported);
        }

        let mut salt = [0u8; ENVELOPE_SALT_LEN];
        salt.copy_from_slice(&bytes[13..13 + ENVELOPE_SALT_LEN]);
        let mut subkey = [0u8; ENVELOPE_SUBKEY_LEN];
        subkey.copy_from_slice(&bytes[29..29 + ENVELOPE_SUBKEY_LEN]);

        Ok(Self {
            iterations,
            salt,
            subkey,
        })
    }

    /// Decode from the base64 storage form
    pub fn decode(encoded: &str) -> Result<Self, PasswordError> {
        let bytes = from_base64(encoded).map_err(|_| PasswordError::FormatUnsupported)?;
        Self::parse(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; ENVELOPE_LEN] {
        let mut out = [0u8; ENVELOPE_LEN];
        out[0] = ENVELOPE_FORMAT_MARKER;
        out[1..5].copy_from_slice(&ENVELOPE_PRF_HMAC_SHA512.to_be_bytes());
        out[5..9].copy_from_slice(&self.iterations.to_be_bytes());
        out[9..13].copy_from_slice(&(ENVELOPE_SALT_LEN as u32).to_be_bytes());
        out[13..29].copy_from_slice(&self.salt);
        out[29..61].copy_from_slice(&self.subkey);
        out
    }

    /// Base64 storage form
    pub fn encode(&self) -> String {
        to_base64(&self.to_bytes())
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Recompute the subkey for `password` and compare in constant time
    pub fn matches(&self, password: &ClearTextPassword) -> bool {
        let actual = derive_subkey(password.as_bytes(), &self.salt, self.iterations);
        constant_time_eq(&actual, &self.subkey)
    }
}

impl fmt::Debug for PasswordEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordEnvelope")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

fn derive_subkey(password: &[u8], salt: &[u8], iterations: u32) -> [u8; ENVELOPE_SUBKEY_LEN] {
    let mut out = [0u8; ENVELOPE_SUBKEY_LEN];
    pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out);
    out
}

fn read_u32_be(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

// ============================================================================
// Verifier
// ============================================================================

/// Stateless credential verifier
///
/// Pure and lock-free; safe to call from any number of requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordVerifier;

impl PasswordVerifier {
    /// `true` iff `password` matches `stored`; never panics
    pub fn verify(&self, password: &ClearTextPassword, stored: &StoredPasswordHash) -> bool {
        self.verify_detailed(password, stored).is_ok()
    }

    /// Same as [`verify`](Self::verify) but reports the failure class
    pub fn verify_detailed(
        &self,
        password: &ClearTextPassword,
        stored: &StoredPasswordHash,
    ) -> Result<(), PasswordError> {
        if stored.as_str().is_empty() {
            return Err(PasswordError::FormatUnsupported);
        }

        match stored.format() {
            HashFormat::Phc => {
                let parsed = PasswordHash::new(stored.as_str())
                    .map_err(|_| PasswordError::FormatUnsupported)?;

                // Argon2 uses constant-time comparison internally
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .map_err(|e| match e {
                        argon2::password_hash::Error::Password => PasswordError::Mismatch,
                        _ => PasswordError::FormatUnsupported,
                    })
            }
            HashFormat::Bcrypt => match bcrypt::verify(password.as_bytes(), stored.as_str()) {
                Ok(true) => Ok(()),
                Ok(false) => Err(PasswordError::Mismatch),
                Err(_) => Err(PasswordError::FormatUnsupported),
            },
            HashFormat::Envelope => {
                let envelope = PasswordEnvelope::decode(stored.as_str())?;
                if envelope.matches(password) {
                    Ok(())
                } else {
                    Err(PasswordError::Mismatch)
                }
            }
        }
    }

    /// Hash a new credential as a PBKDF2 envelope
    pub fn hash(&self, password: &ClearTextPassword) -> StoredPasswordHash {
        let envelope = PasswordEnvelope::derive(password, DEFAULT_ITERATIONS);
        StoredPasswordHash::with_format(envelope.encode(), HashFormat::Envelope)
    }

    /// Whether `stored` differs from what [`hash`](Self::hash) would write today
    pub fn needs_rehash(&self, stored: &StoredPasswordHash) -> bool {
        match stored.format() {
            HashFormat::Phc | HashFormat::Bcrypt => true,
            HashFormat::Envelope => PasswordEnvelope::decode(stored.as_str())
                .map(|env| env.iterations() != DEFAULT_ITERATIONS)
                .unwrap_or(true),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString};
    use rand::rngs::OsRng;

    fn login(raw: &str) -> ClearTextPassword {
        ClearTextPassword::for_login(raw.to_string())
    }

    fn raw_envelope(prf: u32, iterations: u32, salt_len: u32) -> String {
        let mut bytes = vec![ENVELOPE_FORMAT_MARKER];
        bytes.extend_from_slice(&prf.to_be_bytes());
        bytes.extend_from_slice(&iterations.to_be_bytes());
        bytes.extend_from_slice(&salt_len.to_be_bytes());
        bytes.extend_from_slice(&[7u8; ENVELOPE_SALT_LEN]);
        bytes.extend_from_slice(&[9u8; ENVELOPE_SUBKEY_LEN]);
        to_base64(&bytes)
    }

    #[test]
    fn test_hash_and_verify() {
        let verifier = PasswordVerifier;
        let hashed = verifier.hash(&login("Secret123"));

        assert_eq!(hashed.format(), HashFormat::Envelope);
        assert!(verifier.verify(&login("Secret123"), &hashed));
        assert!(!verifier.verify(&login("secret123"), &hashed));
    }

    #[test]
    fn test_envelope_layout() {
        let hashed = PasswordVerifier.hash(&login("Secret123"));
        let bytes = from_base64(hashed.as_str()).unwrap();

        assert_eq!(bytes.len(), ENVELOPE_LEN);
        assert_eq!(bytes.len(), 61);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(read_u32_be(&bytes[1..5]), 2);
        assert_eq!(read_u32_be(&bytes[5..9]), 10_000);
        assert_eq!(read_u32_be(&bytes[9..13]), 16);
    }

    #[test]
    fn test_fresh_salt_per_hash() {
        let a = PasswordVerifier.hash(&login("Secret123"));
        let b = PasswordVerifier.hash(&login("Secret123"));
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_unsupported_prf_is_rejected_without_panicking() {
        let stored = StoredPasswordHash::classify(raw_envelope(1, 10_000, 16));
        assert_eq!(stored.format(), HashFormat::Envelope);
        assert_eq!(
            PasswordVerifier.verify_detailed(&login("anything"), &stored),
            Err(PasswordError::FormatUnsupported)
        );
    }

    #[test]
    fn test_wrong_salt_length_is_rejected() {
        let stored = StoredPasswordHash::classify(raw_envelope(2, 10_000, 32));
        assert!(!PasswordVerifier.verify(&login("anything"), &stored));
    }

    #[test]
    fn test_iteration_ceiling() {
        let stored = StoredPasswordHash::classify(raw_envelope(2, u32::MAX, 16));
        assert_eq!(
            PasswordVerifier.verify_detailed(&login("anything"), &stored),
            Err(PasswordError::FormatUnsupported)
        );

        let stored = StoredPasswordHash::classify(raw_envelope(2, 0, 16));
        assert!(!PasswordVerifier.verify(&login("anything"), &stored));
    }

    #[test]
    fn test_truncated_envelope_returns_false() {
        let mut bytes = from_base64(PasswordVerifier.hash(&login("pw")).as_str()).unwrap();
        bytes.truncate(60);
        let stored = StoredPasswordHash::with_format(to_base64(&bytes), HashFormat::Envelope);
        assert_eq!(
            PasswordVerifier.verify_detailed(&login("pw"), &stored),
            Err(PasswordError::FormatUnsupported)
        );
    }

    #[test]
    fn test_wrong_marker_returns_false() {
        let mut bytes = from_base64(PasswordVerifier.hash(&login("pw")).as_str()).unwrap();
        bytes[0] = 0x00;
        let stored = StoredPasswordHash::classify(to_base64(&bytes));
        assert!(!PasswordVerifier.verify(&login("pw"), &stored));
    }

    #[test]
    fn test_phc_hash_verification() {
        let salt = SaltString::generate(OsRng);
        let phc = Argon2::default()
            .hash_password(b"Secret123", &salt)
            .unwrap()
            .to_string();

        let stored = StoredPasswordHash::classify(phc);
        assert_eq!(stored.format(), HashFormat::Phc);
        assert!(PasswordVerifier.verify(&login("Secret123"), &stored));
        assert_eq!(
            PasswordVerifier.verify_detailed(&login("secret123"), &stored),
            Err(PasswordError::Mismatch)
        );
        assert!(PasswordVerifier.needs_rehash(&stored));
    }

    #[test]
    fn test_garbage_and_empty_hashes() {
        assert!(!PasswordVerifier.verify(&login("x"), &StoredPasswordHash::classify("")));
        assert!(!PasswordVerifier.verify(
            &login("x"),
            &StoredPasswordHash::classify("not_a_valid_hash")
        ));
        // Truncated bcrypt record
        assert_eq!(
            PasswordVerifier.verify_detailed(
                &login("x"),
                &StoredPasswordHash::classify("$2y$10$abcdefghij")
            ),
            Err(PasswordError::FormatUnsupported)
        );
    }

    #[test]
    fn test_bcrypt_hash_verification() {
        // OpenBSD reference vector
        let stored =
            StoredPasswordHash::classify("$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW");
        assert_eq!(stored.format(), HashFormat::Bcrypt);
        assert!(PasswordVerifier.verify(&login("U*U"), &stored));
        assert_eq!(
            PasswordVerifier.verify_detailed(&login("U*V"), &stored),
            Err(PasswordError::Mismatch)
        );
        assert!(PasswordVerifier.needs_rehash(&stored));
    }

    #[test]
    fn test_bcrypt_2y_prefix() {
        let hashed = bcrypt::hash_with_result("Secret123", 4)
            .unwrap()
            .format_for_version(bcrypt::Version::TwoY);
        assert!(hashed.starts_with("$2y$04$"));

        let stored = StoredPasswordHash::classify(hashed);
        assert_eq!(stored.format(), HashFormat::Bcrypt);
        assert!(PasswordVerifier.verify(&login("Secret123"), &stored));
        assert!(!PasswordVerifier.verify(&login("Secret124"), &stored));
    }

    #[test]
    fn test_format_detection() {
        let envelope = PasswordVerifier.hash(&login("pw"));
        assert_eq!(HashFormat::detect(envelope.as_str()), HashFormat::Envelope);
        assert_eq!(
            HashFormat::detect("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
            HashFormat::Phc
        );
        assert_eq!(HashFormat::detect("c2hvcnQ="), HashFormat::Phc);
    }

    #[test]
    fn test_needs_rehash_for_current_envelope() {
        let stored = PasswordVerifier.hash(&login("pw"));
        assert!(!PasswordVerifier.needs_rehash(&stored));
        assert!(PasswordVerifier.needs_rehash(&StoredPasswordHash::classify(raw_envelope(
            2, 5_000, 16
        ))));
    }

    #[test]
    fn test_policy() {
        assert!(matches!(
            ClearTextPassword::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("a".repeat(MAX_PASSWORD_LENGTH + 1)),
            Err(PasswordPolicyError::TooLong { .. })
        ));
        assert!(matches!(
            ClearTextPassword::new("        ".to_string()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
        assert!(matches!(
            ClearTextPassword::new("abc\u{0007}defgh".to_string()),
            Err(PasswordPolicyError::InvalidCharacter)
        ));
        assert!(ClearTextPassword::new("MySecure#Pass2024!".to_string()).is_ok());
    }

    #[test]
    fn test_debug_redaction() {
        let password = login("secret");
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("secret"));

        let stored = PasswordVerifier.hash(&password);
        assert!(!format!("{:?}", stored).contains(stored.as_str()));
    }
}
