// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use std::time::Duration;

/// What happens when a procedure is registered under a name already in use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegistrationPolicy {
    /// The new definition replaces the old one and every target whose output
    /// referenced the name is re-rendered.
    #[default]
    Overwrite,
    /// The registration fails with
    /// [`RegistryError::AlreadyRegistered`](crate::RegistryError::AlreadyRegistered).
    Reject,
}

/// Properties whose values may carry paint references, in the order a render
/// enumerates them.
pub const PAINTABLE_PROPERTIES: &[&str] = &[
    "background",
    "background-image",
    "border-image-source",
    "mask-image",
    "-webkit-mask-image",
    "list-style-image",
    "cursor",
];

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Duplicate-name policy for procedure and property registration.
    pub registration: RegistrationPolicy,
    /// Attribute the engine writes onto each painted target so its override
    /// rule can select it.
    pub tracking_attribute: &'static str,
    /// How long a readable sheet with unresolved nested imports is held back
    /// before it is scanned with whatever it has.
    pub import_wait: Duration,
    /// Properties inspected for paint references.
    pub paintable_properties: &'static [&'static str],
}

impl EngineConfig {
    /// Default configuration: last registration wins.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registration: RegistrationPolicy::Overwrite,
            tracking_attribute: "data-css-paint",
            import_wait: Duration::from_secs(1),
            paintable_properties: PAINTABLE_PROPERTIES,
        }
    }

    /// Like [`new`](Self::new), but duplicate registrations are rejected.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            registration: RegistrationPolicy::Reject,
            ..Self::new()
        }
    }

    /// Whether `property` is inspected for paint references.
    #[must_use]
    pub fn is_paintable(&self, property: &str) -> bool {
        self.paintable_properties.contains(&property)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_only_changes_registration() {
        let strict = EngineConfig::strict();
        let default = EngineConfig::default();
        assert_eq!(strict.registration, RegistrationPolicy::Reject);
        assert_eq!(default.registration, RegistrationPolicy::Overwrite);
        assert_eq!(strict.tracking_attribute, default.tracking_attribute);
        assert_eq!(strict.import_wait, default.import_wait);
    }

    #[test]
    fn allow_list_covers_image_families() {
        let config = EngineConfig::new();
        assert!(config.is_paintable("background-image"));
        assert!(config.is_paintable("border-image-source"));
        assert!(config.is_paintable("-webkit-mask-image"));
        assert!(!config.is_paintable("color"));
        assert!(!config.is_paintable("width"));
    }
}
