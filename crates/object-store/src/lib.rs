//! Ciphertext blob storage backend
//!
//! This crate stores the opaque envelope blobs the exchange ledger hands it,
//! keyed by share identifier, on pluggable object storage (in-memory, local
//! filesystem, or S3-compatible). The bytes are never inspected or decoded;
//! the ledger alone decides when a blob lives or dies.
//!
//! # Example
//!
//! ```rust,no_run
//! use vaultdrop_object_store::{BlobStore, ObjectStoreConfig};
//! use bytes::Bytes;
//!
//! # async fn example() -> Result<(), vaultdrop_object_store::BlobStoreError> {
//! let store = BlobStore::new(ObjectStoreConfig::Local {
//!     path: "/var/lib/vaultdrop/blobs".into(),
//! })
//! .await?;
//!
//! store.put("some-id", Bytes::from_static(b"ciphertext")).await?;
//! let blob = store.get("some-id").await?;
//! store.delete("some-id").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod storage;

pub use error::{BlobStoreError, Result};
pub use storage::{BlobStore, ObjectStoreConfig};
