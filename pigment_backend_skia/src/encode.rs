// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference kinds and the blob store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pigment_core::raster::ImageReference;

/// How an encoded surface is referenced from a declaration value.
#[derive(Clone, Debug, Default)]
pub enum ReferenceMode {
    /// `data:image/paint-<name>;base64,<png>`.
    #[default]
    DataUrl,
    /// `blob:pigment/<n>#paint=<name>`, with the bytes kept in the store until
    /// revoked.
    Blob(BlobStore),
    /// `-webkit-canvas(<native id>)`. No bytes leave the surface.
    Native,
}

/// Surface configuration shared by every surface a host creates.
#[derive(Clone, Debug)]
pub struct SkiaConfig {
    /// Anti-alias fills and strokes.
    pub anti_alias: bool,
    /// Reference kind produced by `encode`.
    pub references: ReferenceMode,
}

impl Default for SkiaConfig {
    fn default() -> Self {
        Self {
            anti_alias: true,
            references: ReferenceMode::DataUrl,
        }
    }
}

impl SkiaConfig {
    /// Configuration producing revocable blob references backed by `store`.
    #[must_use]
    pub fn with_blobs(store: BlobStore) -> Self {
        Self {
            references: ReferenceMode::Blob(store),
            ..Self::default()
        }
    }

    /// Configuration producing native canvas references.
    #[must_use]
    pub fn native() -> Self {
        Self {
            references: ReferenceMode::Native,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct BlobInner {
    next: u64,
    blobs: HashMap<String, Vec<u8>>,
}

/// Shared storage behind blob references.
///
/// Clones share the same store. A host resolves URLs with [`get`](Self::get)
/// and releases them with [`revoke`](Self::revoke).
#[derive(Clone, Debug, Default)]
pub struct BlobStore {
    inner: Rc<RefCell<BlobInner>>,
}

impl BlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` and returns a fresh URL tagged with `procedure`.
    pub fn insert(&self, procedure: &str, bytes: Vec<u8>) -> String {
        let mut inner = self.inner.borrow_mut();
        inner.next += 1;
        let url = format!("blob:pigment/{}#paint={procedure}", inner.next);
        inner.blobs.insert(url.clone(), bytes);
        url
    }

    /// Returns the bytes behind `url`, if it is still live.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        self.inner.borrow().blobs.get(url).cloned()
    }

    /// Releases `url`. Returns whether it was live.
    pub fn revoke(&self, url: &str) -> bool {
        self.inner.borrow_mut().blobs.remove(url).is_some()
    }

    /// Number of live URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().blobs.len()
    }

    /// Whether no URLs are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps encoded PNG bytes in a reference of the configured kind.
pub(crate) fn reference(
    mode: &ReferenceMode,
    procedure: &str,
    native_id: &str,
    png: impl FnOnce() -> Result<Vec<u8>, String>,
) -> Result<ImageReference, String> {
    Ok(match mode {
        ReferenceMode::DataUrl => ImageReference::Url {
            url: format!(
                "data:image/paint-{procedure};base64,{}",
                STANDARD.encode(png()?)
            ),
            revocable: false,
        },
        ReferenceMode::Blob(store) => ImageReference::Url {
            url: store.insert(procedure, png()?),
            revocable: true,
        },
        ReferenceMode::Native => ImageReference::Native(format!("-webkit-canvas({native_id})")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes() -> Result<Vec<u8>, String> {
        Ok(vec![1, 2, 3])
    }

    #[test]
    fn data_urls_embed_base64() {
        let r = reference(&ReferenceMode::DataUrl, "dots", "paint-1-dots", bytes).unwrap();
        assert_eq!(
            r,
            ImageReference::Url {
                url: "data:image/paint-dots;base64,AQID".into(),
                revocable: false,
            }
        );
    }

    #[test]
    fn blob_urls_are_unique_and_revocable() {
        let store = BlobStore::new();
        let mode = ReferenceMode::Blob(store.clone());
        let a = reference(&mode, "dots", "", bytes).unwrap();
        let b = reference(&mode, "dots", "", bytes).unwrap();
        assert_ne!(a, b);
        let url = a.url().unwrap();
        assert!(url.ends_with("#paint=dots"), "{url}");
        assert_eq!(store.get(url), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 2);

        assert!(store.revoke(url));
        assert!(!store.revoke(url));
        assert_eq!(store.get(url), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn native_references_skip_encoding() {
        let r = reference(&ReferenceMode::Native, "dots", "paint-3-dots", || {
            Err("should not encode".into())
        })
        .unwrap();
        assert_eq!(r.to_css(), "-webkit-canvas(paint-3-dots)");
    }

    #[test]
    fn encoder_failures_propagate() {
        let err = reference(&ReferenceMode::DataUrl, "dots", "", || Err("bad".into()));
        assert_eq!(err, Err("bad".to_owned()));
    }
}
