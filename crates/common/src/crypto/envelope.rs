//! Client-side envelope encryption using AES-256-GCM
//!
//! This module turns a plaintext byte buffer into a self-contained ciphertext
//! envelope and back, using only a shared symmetric key. It never touches the
//! network or persistent storage; the server only ever sees the opaque
//! envelope bytes.

use std::ops::Deref;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Size of the AES-GCM nonce (IV) in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the envelope key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Size of the GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Errors that can occur while sealing or opening envelopes
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope error: {0}")]
    Default(#[from] anyhow::Error),
    /// Authentication failed: the envelope was tampered with or the key is
    /// wrong. No plaintext is ever released on this path.
    #[error("envelope integrity check failed")]
    Integrity,
    #[error("envelope too short: {0} bytes")]
    Truncated(usize),
    #[error("malformed key encoding: {0}")]
    KeyEncoding(String),
}

/// A 256-bit symmetric key for envelope encryption
///
/// Each shared file gets its own fresh key. The key travels to the receiver
/// inside the share link's URL fragment and never reaches the server.
/// The envelope wire format is `iv (12 bytes) || ciphertext || tag (16 bytes)`,
/// one contiguous byte sequence with no other header.
///
/// # Examples
///
/// ```ignore
/// let key = EnvelopeKey::generate();
/// let envelope = key.encrypt(b"file contents")?;
/// let plaintext = key.decrypt(&envelope)?;
/// assert_eq!(plaintext, b"file contents");
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnvelopeKey([u8; KEY_SIZE]);

impl Deref for EnvelopeKey {
    type Target = [u8; KEY_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; KEY_SIZE]> for EnvelopeKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        EnvelopeKey(bytes)
    }
}

impl EnvelopeKey {
    /// Generate a new random key using a cryptographically secure RNG
    ///
    /// # Panics
    ///
    /// Panics if the system RNG is unavailable. A key built from weak
    /// randomness must never be handed out, so there is no degraded path.
    pub fn generate() -> Self {
        let mut buff = [0; KEY_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, EnvelopeError> {
        if data.len() != KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid key size, expected {}, got {}",
                KEY_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the raw key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encode the key as URL-safe base64 without padding
    ///
    /// The output uses the `-`/`_` alphabet and strips the `=` padding, so it
    /// can be embedded directly in a URL fragment.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Decode a key previously produced by [`EnvelopeKey::encode`]
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid unpadded URL-safe base64 or
    /// does not decode to exactly `KEY_SIZE` bytes.
    pub fn decode(encoded: &str) -> Result<Self, EnvelopeError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| EnvelopeError::KeyEncoding(e.to_string()))?;
        if raw.len() != KEY_SIZE {
            return Err(EnvelopeError::KeyEncoding(format!(
                "decoded to {} bytes, expected {}",
                raw.len(),
                KEY_SIZE
            )));
        }
        Self::from_slice(&raw)
    }

    /// Encrypt data into a self-contained envelope
    ///
    /// Generates a fresh random 96-bit IV for every call. The IV is never
    /// reused with the same key; reuse would break GCM entirely. The output
    /// format is `iv (12 bytes) || ciphertext || auth_tag (16 bytes)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails to produce an IV or the
    /// cipher rejects the input.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let key = Key::<Aes256Gcm>::from_slice(self.bytes());
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Open an envelope and recover the plaintext
    ///
    /// Expects input in the format `iv (12 bytes) || ciphertext || tag (16 bytes)`.
    /// The authentication tag is verified as part of decryption, so a tampered
    /// envelope, a truncated envelope, or a wrong key all fail closed with an
    /// error and zero plaintext bytes.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Truncated`] if the input cannot even hold an IV and tag
    /// - [`EnvelopeError::Integrity`] on tag mismatch (tampering or wrong key)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(EnvelopeError::Truncated(data.len()));
        }

        let key = Key::<Aes256Gcm>::from_slice(self.bytes());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);

        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| EnvelopeError::Integrity)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = EnvelopeKey::generate();
        let data = b"hello world, this is a test message for envelope encryption";

        let envelope = key.encrypt(data).unwrap();
        assert_eq!(envelope.len(), NONCE_SIZE + data.len() + TAG_SIZE);

        let plaintext = key.decrypt(&envelope).unwrap();
        assert_eq!(data.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = EnvelopeKey::generate();
        let envelope = key.encrypt(b"").unwrap();
        assert_eq!(envelope.len(), NONCE_SIZE + TAG_SIZE);
        assert_eq!(key.decrypt(&envelope).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let key = EnvelopeKey::generate();
        let a = key.encrypt(b"same plaintext").unwrap();
        let b = key.encrypt(b"same plaintext").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let key = EnvelopeKey::generate();
        let other = EnvelopeKey::generate();
        let envelope = key.encrypt(b"secret").unwrap();

        let result = other.decrypt(&envelope);
        assert!(matches!(result, Err(EnvelopeError::Integrity)));
    }

    #[test]
    fn test_single_bit_flips_fail_closed() {
        let key = EnvelopeKey::generate();
        let envelope = key.encrypt(b"bit flip sensitivity").unwrap();

        // Flip one bit in every region of the envelope: IV, ciphertext, tag.
        for index in [0, NONCE_SIZE, NONCE_SIZE + 3, envelope.len() - 1] {
            let mut mutated = envelope.clone();
            mutated[index] ^= 0x01;
            let result = key.decrypt(&mutated);
            assert!(
                matches!(result, Err(EnvelopeError::Integrity)),
                "bit flip at byte {} must not decrypt",
                index
            );
        }
    }

    #[test]
    fn test_truncated_envelope() {
        let key = EnvelopeKey::generate();
        let envelope = key.encrypt(b"truncate me").unwrap();

        assert!(matches!(
            key.decrypt(&envelope[..NONCE_SIZE + TAG_SIZE - 1]),
            Err(EnvelopeError::Truncated(_))
        ));
        // Dropping trailing bytes past the minimum length breaks the tag.
        assert!(key.decrypt(&envelope[..envelope.len() - 1]).is_err());
        assert!(matches!(key.decrypt(b""), Err(EnvelopeError::Truncated(0))));
    }

    #[test]
    fn test_large_envelope_corrupted_tag() {
        let key = EnvelopeKey::generate();
        let data = vec![0xabu8; 10 * 1024 * 1024];

        let mut envelope = key.encrypt(&data).unwrap();
        let tag_start = envelope.len() - TAG_SIZE;
        for byte in &mut envelope[tag_start..] {
            *byte ^= 0xff;
        }

        assert!(matches!(
            key.decrypt(&envelope),
            Err(EnvelopeError::Integrity)
        ));
    }

    #[test]
    fn test_key_size_validation() {
        assert!(EnvelopeKey::from_slice(&[1u8; 16]).is_err());
        assert!(EnvelopeKey::from_slice(&[1u8; 64]).is_err());
        assert!(EnvelopeKey::from_slice(&[1u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn test_key_encode_decode_roundtrip() {
        let key = EnvelopeKey::generate();
        let encoded = key.encode();

        // 32 bytes of base64 without padding is always 43 characters.
        assert_eq!(encoded.len(), 43);
        assert!(!encoded.contains('='));
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = EnvelopeKey::decode(&encoded).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_key_decode_rejects_garbage() {
        assert!(EnvelopeKey::decode("not base64!!!").is_err());
        // Valid base64 of the wrong length
        assert!(EnvelopeKey::decode("aGVsbG8").is_err());
        // Standard alphabet with padding is not accepted
        let standard = base64::engine::general_purpose::STANDARD.encode([7u8; KEY_SIZE]);
        if standard.contains('+') || standard.contains('/') || standard.contains('=') {
            assert!(EnvelopeKey::decode(&standard).is_err());
        }
    }

    #[test]
    fn test_known_envelope_layout() {
        // The wire format is byte-exact: 12-byte IV prefix, 16-byte tag suffix.
        let key = EnvelopeKey::from_slice(&[0x42; KEY_SIZE]).unwrap();
        let data = hex::decode("00112233445566778899").unwrap();
        let envelope = key.encrypt(&data).unwrap();
        assert_eq!(envelope.len(), NONCE_SIZE + data.len() + TAG_SIZE);

        let recovered = key.decrypt(&envelope).unwrap();
        assert_eq!(recovered, data);
    }
}
