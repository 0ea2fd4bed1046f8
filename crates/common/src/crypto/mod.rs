mod envelope;

pub use envelope::{EnvelopeError, EnvelopeKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
