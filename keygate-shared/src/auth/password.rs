/// Password hashing module using PBKDF2-HMAC-SHA256
///
/// Passwords are hashed with an iterated HMAC-based key derivation and a
/// per-password random salt. Salt and derived key are stored separately,
/// both hex-encoded.
///
/// # Security
///
/// - **Algorithm**: PBKDF2 with HMAC-SHA256
/// - **Iterations**: 260,000
/// - **Salt**: 16 bytes from the OS RNG
/// - **Output**: 32-byte derived key
/// - **Comparison**: constant-time, irrespective of where a mismatch occurs
///
/// # Contract
///
/// Verification returns a `bool`, never an error: a wrong password is an
/// expected business outcome that every call site must handle explicitly.
/// A stored salt that cannot be decoded also verifies as `false`.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::password::{hash_password, verify_password};
///
/// let (salt, hash) = hash_password("correct horse battery staple");
///
/// assert!(verify_password("correct horse battery staple", &hash, &salt));
/// assert!(!verify_password("wrong password", &hash, &salt));
/// ```

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

/// PBKDF2 iteration count
///
/// Fixed for the lifetime of a stored credential; changing it invalidates
/// every stored hash, so treat it as part of the storage format.
const PBKDF2_ITERATIONS: u32 = 260_000;

/// Salt length in bytes (stored as 32 hex characters)
const SALT_LENGTH: usize = 16;

/// Derived key length in bytes (stored as 64 hex characters)
const KEY_LENGTH: usize = 32;

/// Hashes a password with a fresh random salt
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
///
/// # Returns
///
/// Tuple of (salt_hex, hash_hex), both lowercase hex
///
/// # Example
///
/// ```
/// use keygate_shared::auth::password::hash_password;
///
/// let (salt, hash) = hash_password("my_password");
/// assert_eq!(salt.len(), 32); // 16 bytes hex-encoded
/// assert_eq!(hash.len(), 64); // 32 bytes hex-encoded
/// ```
pub fn hash_password(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut derived = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut derived);

    (hex::encode(salt), hex::encode(derived))
}

/// Verifies a candidate password against a stored hash and salt
///
/// Re-derives the key with the stored salt and the fixed iteration count,
/// then compares digests in constant time.
///
/// # Arguments
///
/// * `candidate` - The plaintext password to verify
/// * `hash` - Hex-encoded stored hash
/// * `salt` - Hex-encoded stored salt
///
/// # Returns
///
/// `true` if the candidate matches, `false` otherwise (including an
/// undecodable stored salt)
///
/// # Example
///
/// ```
/// use keygate_shared::auth::password::{hash_password, verify_password};
///
/// let (salt, hash) = hash_password("secret");
/// assert!(verify_password("secret", &hash, &salt));
/// assert!(!verify_password("guess", &hash, &salt));
/// ```
pub fn verify_password(candidate: &str, hash: &str, salt: &str) -> bool {
    let salt_bytes = match hex::decode(salt) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut derived = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(
        candidate.as_bytes(),
        &salt_bytes,
        PBKDF2_ITERATIONS,
        &mut derived,
    );

    constant_time_compare(&hex::encode(derived), hash)
}

/// Constant-time string comparison
///
/// Prevents timing attacks by ensuring comparison always takes
/// the same amount of time regardless of where strings differ.
///
/// # Example
///
/// ```
/// use keygate_shared::auth::password::constant_time_compare;
///
/// assert!(constant_time_compare("hello", "hello"));
/// assert!(!constant_time_compare("hello", "world"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // XOR all bytes and accumulate, no short-circuit
    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}
