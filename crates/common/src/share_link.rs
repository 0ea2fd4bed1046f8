//! Share link construction and parsing
//!
//! A share link has the form `<base-url>/<id>#<encoded-key>`. URL fragments
//! are retained client-side by definition, so the decryption key embedded
//! after `#` is never part of any HTTP request. That property is what keeps
//! the server zero-knowledge and must be preserved exactly.

use url::Url;
use uuid::Uuid;

use crate::crypto::{EnvelopeError, EnvelopeKey};

/// Errors that can occur while building or parsing share links
#[derive(Debug, thiserror::Error)]
pub enum ShareLinkError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("link has no share identifier in its path")]
    MissingId,
    #[error("share identifier is not a valid UUID: {0}")]
    InvalidId(#[from] uuid::Error),
    #[error("link has no key fragment")]
    MissingKey,
    #[error("key fragment is malformed: {0}")]
    InvalidKey(#[from] EnvelopeError),
}

/// A fully-formed share link: identifier plus out-of-band key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    id: Uuid,
    key: EnvelopeKey,
    rendered: String,
}

impl ShareLink {
    /// Build a share link for an uploaded envelope
    ///
    /// `base` is the URL the receiver will fetch the ciphertext from, e.g.
    /// `http://localhost:3001/api/v0/share`. The identifier is appended as a
    /// path segment and the key as the fragment.
    pub fn new(base: &Url, id: Uuid, key: &EnvelopeKey) -> Self {
        let rendered = format!(
            "{}/{}#{}",
            base.as_str().trim_end_matches('/'),
            id,
            key.encode()
        );
        Self {
            id,
            key: key.clone(),
            rendered,
        }
    }

    /// Parse a share link back into its identifier and key
    ///
    /// The identifier is the last non-empty path segment; the key is the
    /// fragment. Accepts any base URL shape, so links survive reverse
    /// proxies and path prefixes.
    pub fn parse(link: &str) -> Result<Self, ShareLinkError> {
        let url = Url::parse(link)?;
        let id = Self::id_from_url(&url)?;
        let fragment = url.fragment().ok_or(ShareLinkError::MissingKey)?;
        if fragment.is_empty() {
            return Err(ShareLinkError::MissingKey);
        }
        let key = EnvelopeKey::decode(fragment)?;
        Ok(Self {
            id,
            key,
            rendered: link.to_string(),
        })
    }

    /// Extract just the identifier from a link or a bare UUID string
    ///
    /// Lets CLI commands accept either form for operations that do not need
    /// the key (info, delete).
    pub fn parse_id(reference: &str) -> Result<Uuid, ShareLinkError> {
        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(id);
        }
        let url = Url::parse(reference)?;
        Self::id_from_url(&url)
    }

    fn id_from_url(url: &Url) -> Result<Uuid, ShareLinkError> {
        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or(ShareLinkError::MissingId)?;
        Ok(Uuid::parse_str(segment)?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &EnvelopeKey {
        &self.key
    }
}

impl std::fmt::Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rendered)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_link_roundtrip() {
        let base = Url::parse("http://localhost:3001/api/v0/share").unwrap();
        let id = Uuid::new_v4();
        let key = EnvelopeKey::generate();

        let link = ShareLink::new(&base, id, &key);
        let parsed = ShareLink::parse(&link.to_string()).unwrap();

        assert_eq!(parsed.id(), id);
        assert_eq!(parsed.key(), &key);
    }

    #[test]
    fn test_link_roundtrip_with_trailing_slash() {
        let base = Url::parse("https://drop.example.com/s/").unwrap();
        let id = Uuid::new_v4();
        let key = EnvelopeKey::generate();

        let link = ShareLink::new(&base, id, &key);
        assert!(!link.to_string().contains("//s//"));
        let parsed = ShareLink::parse(&link.to_string()).unwrap();
        assert_eq!(parsed.id(), id);
    }

    #[test]
    fn test_key_stays_in_fragment() {
        let base = Url::parse("http://localhost:3001/api/v0/share").unwrap();
        let key = EnvelopeKey::generate();
        let link = ShareLink::new(&base, Uuid::new_v4(), &key).to_string();

        let url = Url::parse(&link).unwrap();
        // Everything a client would transmit: no trace of the key.
        assert!(!url.path().contains(&key.encode()));
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), Some(key.encode().as_str()));
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ShareLink::parse(&format!("http://host/share/{}", id)),
            Err(ShareLinkError::MissingKey)
        ));
        assert!(matches!(
            ShareLink::parse("http://host/#c2VjcmV0"),
            Err(ShareLinkError::MissingId)
        ));
        assert!(matches!(
            ShareLink::parse(&format!("http://host/{}#tooshort", id)),
            Err(ShareLinkError::InvalidKey(_))
        ));
        assert!(ShareLink::parse(&format!("http://host/not-a-uuid#{}", EnvelopeKey::generate().encode())).is_err());
    }

    #[test]
    fn test_parse_id_accepts_bare_uuid_and_link() {
        let id = Uuid::new_v4();
        assert_eq!(ShareLink::parse_id(&id.to_string()).unwrap(), id);
        assert_eq!(
            ShareLink::parse_id(&format!("http://host/api/v0/share/{}", id)).unwrap(),
            id
        );
        assert!(ShareLink::parse_id("garbage").is_err());
    }
}
