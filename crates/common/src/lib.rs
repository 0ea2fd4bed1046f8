/**
 * Cryptographic types and operations.
 *  - Envelope key generation and URL-safe encoding
 *  - AEAD envelope sealing/opening (AES-256-GCM)
 */
pub mod crypto;
/**
 * Share link convention: `<base-url>/<id>#<encoded-key>`.
 * The key rides in the URL fragment, which browsers and HTTP
 *  clients never transmit to the server.
 */
pub mod share_link;
/**
 * Helper for reporting build version information.
 */
pub mod version;

pub mod prelude {
    pub use crate::crypto::{EnvelopeError, EnvelopeKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
    pub use crate::share_link::{ShareLink, ShareLinkError};
    pub use crate::version::build_info;
}
