// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! None of these ever reach the scheduler. Unresolved references are not
//! errors at all, and faults raised while painting or encoding are contained
//! to the target that raised them.

use thiserror::Error;

/// Failure to register a paint procedure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is taken and the engine rejects duplicates.
    #[error("paint procedure `{name}` is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },
    /// The name cannot appear inside a `paint()` reference.
    #[error("`{name}` is not a valid paint procedure name")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
}

/// Failure to register a custom property.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The property is already registered.
    #[error("property `{name}` is already registered")]
    AlreadyRegistered {
        /// The contested name.
        name: String,
    },
    /// Only custom properties (`--*`) can be registered.
    #[error("`{name}` is not a custom property name")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// The syntax descriptor could not be parsed.
    #[error("invalid property syntax `{syntax}`")]
    InvalidSyntax {
        /// The rejected descriptor.
        syntax: String,
    },
    /// The initial value does not match the declared syntax, or is missing
    /// for a syntax other than `*`.
    #[error("initial value {value:?} does not match syntax `{syntax}`")]
    InvalidInitialValue {
        /// The declared syntax.
        syntax: String,
        /// The rejected value, if any.
        value: Option<String>,
    },
}

/// Raised by a [`PaintInstance`](crate::PaintInstance) while drawing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaintError {
    /// The procedure failed.
    #[error("paint procedure failed: {0}")]
    Fault(String),
}

/// Failure to turn a raster surface into a referenceable resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The image encoder failed.
    #[error("PNG encoding failed: {0}")]
    Png(String),
    /// The surface has zero area.
    #[error("cannot encode an empty surface")]
    EmptySurface,
}

/// Failure to load a procedure module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// Evaluating the module source failed.
    #[error("module evaluation failed: {0}")]
    Script(String),
    /// A registration made by the module was rejected.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        let err = RegistryError::AlreadyRegistered {
            name: "dots".into(),
        };
        assert_eq!(err.to_string(), "paint procedure `dots` is already registered");

        let err = PropertyError::InvalidSyntax {
            syntax: "<lenght>".into(),
        };
        assert_eq!(err.to_string(), "invalid property syntax `<lenght>`");
    }

    #[test]
    fn module_error_wraps_registry_error() {
        let err: ModuleError = RegistryError::InvalidName { name: "1x".into() }.into();
        assert_eq!(err.to_string(), "`1x` is not a valid paint procedure name");
        assert!(matches!(err, ModuleError::Registry(_)));
    }
}
