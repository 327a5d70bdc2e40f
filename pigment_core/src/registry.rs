// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Procedure registry with double-buffered instances.

use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use kurbo::Size;

use crate::config::RegistrationPolicy;
use crate::error::{PaintError, RegistryError};
use crate::properties::Properties;
use crate::raster::PaintContext;
use crate::syntax::is_valid_procedure_name;

/// A live paint procedure.
///
/// Instances may keep state between calls. The engine alternates between two
/// instances of each procedure, so an instance never observes the frame it
/// produced last.
pub trait PaintInstance {
    /// Draws into `ctx` for a box of `size` logical pixels.
    fn paint(
        &mut self,
        ctx: &mut dyn PaintContext,
        size: Size,
        properties: &mut dyn Properties,
    ) -> Result<(), PaintError>;
}

/// Constructs fresh [`PaintInstance`]s.
pub type PaintFactory = Rc<dyn Fn() -> Box<dyn PaintInstance>>;

/// How the raster surface for a procedure is sized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextOptions {
    /// Multiply the raster size by the device pixel ratio and scale the
    /// context to match. When off, the raster is sized in logical pixels.
    pub scaling: bool,
    /// Hand the procedure a box measured in device pixels and leave the
    /// context unscaled.
    pub native_pixels: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            scaling: true,
            native_pixels: false,
        }
    }
}

/// Everything known about a registered procedure.
#[derive(Clone)]
pub struct PaintDefinition {
    name: String,
    input_properties: Vec<String>,
    context_options: ContextOptions,
    factory: PaintFactory,
}

impl fmt::Debug for PaintDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintDefinition")
            .field("name", &self.name)
            .field("input_properties", &self.input_properties)
            .field("context_options", &self.context_options)
            .finish_non_exhaustive()
    }
}

impl PaintDefinition {
    /// Creates a definition with no input properties and default options.
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn PaintInstance> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input_properties: Vec::new(),
            context_options: ContextOptions::default(),
            factory: Rc::new(factory),
        }
    }

    /// Declares the properties the procedure reads.
    #[must_use]
    pub fn with_input_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the raster sizing options.
    #[must_use]
    pub fn with_context_options(mut self, options: ContextOptions) -> Self {
        self.context_options = options;
        self
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties whose values invalidate this procedure's output.
    #[must_use]
    pub fn input_properties(&self) -> &[String] {
        &self.input_properties
    }

    /// Raster sizing options.
    #[must_use]
    pub fn context_options(&self) -> ContextOptions {
        self.context_options
    }
}

/// One of the two instances kept per procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    /// The first instance.
    A,
    /// The second instance.
    B,
}

impl BufferSlot {
    /// The other slot.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Outcome of a successful [`Registry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The name was free.
    New,
    /// An earlier definition was replaced and its instances dropped.
    Replaced,
}

struct Procedure {
    definition: PaintDefinition,
    next: BufferSlot,
    instances: [Option<Box<dyn PaintInstance>>; 2],
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("definition", &self.definition)
            .field("next", &self.next)
            .field(
                "instances",
                &[self.instances[0].is_some(), self.instances[1].is_some()],
            )
            .finish()
    }
}

/// Named paint procedures.
#[derive(Debug, Default)]
pub struct Registry {
    procedures: HashMap<String, Procedure>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `definition` under its name.
    ///
    /// With [`RegistrationPolicy::Overwrite`] a duplicate name replaces the
    /// earlier definition; with [`RegistrationPolicy::Reject`] it fails.
    pub fn register(
        &mut self,
        definition: PaintDefinition,
        policy: RegistrationPolicy,
    ) -> Result<Registration, RegistryError> {
        if !is_valid_procedure_name(definition.name()) {
            return Err(RegistryError::InvalidName {
                name: definition.name,
            });
        }
        let exists = self.procedures.contains_key(definition.name());
        if exists && policy == RegistrationPolicy::Reject {
            return Err(RegistryError::AlreadyRegistered {
                name: definition.name,
            });
        }
        self.procedures.insert(
            definition.name.clone(),
            Procedure {
                definition,
                next: BufferSlot::A,
                instances: [None, None],
            },
        );
        Ok(if exists {
            Registration::Replaced
        } else {
            Registration::New
        })
    }

    /// Looks up a definition. An unknown name is not an error.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&PaintDefinition> {
        self.procedures.get(name).map(|p| &p.definition)
    }

    /// Returns the instance for the slot due next and flips the slot.
    ///
    /// Instances are constructed on first use.
    pub fn instance(&mut self, name: &str) -> Option<(BufferSlot, &mut dyn PaintInstance)> {
        let procedure = self.procedures.get_mut(name)?;
        let slot = procedure.next;
        procedure.next = slot.flip();
        let factory = &procedure.definition.factory;
        let instance = procedure.instances[slot.index()].get_or_insert_with(|| factory());
        Some((slot, instance.as_mut()))
    }

    /// Number of registered procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::properties::Properties;

    struct Blank;

    impl PaintInstance for Blank {
        fn paint(
            &mut self,
            _ctx: &mut dyn PaintContext,
            _size: Size,
            _properties: &mut dyn Properties,
        ) -> Result<(), PaintError> {
            Ok(())
        }
    }

    fn counting(name: &str, built: Rc<Cell<u32>>) -> PaintDefinition {
        PaintDefinition::new(name, move || {
            built.set(built.get() + 1);
            Box::new(Blank)
        })
    }

    #[test]
    fn instances_alternate_and_are_built_lazily() {
        let built = Rc::new(Cell::new(0));
        let mut registry = Registry::new();
        registry
            .register(counting("dots", built.clone()), RegistrationPolicy::Overwrite)
            .unwrap();
        assert_eq!(built.get(), 0, "no instance before first use");

        let slots: Vec<_> = (0..3)
            .map(|_| registry.instance("dots").unwrap().0)
            .collect();
        assert_eq!(slots, [BufferSlot::A, BufferSlot::B, BufferSlot::A]);
        assert_eq!(built.get(), 2, "one instance per slot");
    }

    #[test]
    fn overwrite_replaces_and_resets_instances() {
        let built = Rc::new(Cell::new(0));
        let mut registry = Registry::new();
        let policy = RegistrationPolicy::Overwrite;
        assert_eq!(
            registry.register(counting("dots", built.clone()), policy),
            Ok(Registration::New)
        );
        let _ = registry.instance("dots");
        assert_eq!(
            registry.register(
                counting("dots", built.clone()).with_input_properties(["--x"]),
                policy
            ),
            Ok(Registration::Replaced)
        );
        assert_eq!(registry.resolve("dots").unwrap().input_properties(), ["--x"]);
        assert_eq!(registry.instance("dots").unwrap().0, BufferSlot::A);
        assert_eq!(built.get(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reject_policy_keeps_first_definition() {
        let built = Rc::new(Cell::new(0));
        let mut registry = Registry::new();
        let policy = RegistrationPolicy::Reject;
        registry
            .register(counting("dots", built.clone()), policy)
            .unwrap();
        let err = registry
            .register(
                counting("dots", built).with_input_properties(["--x"]),
                policy,
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyRegistered {
                name: "dots".into()
            }
        );
        assert!(registry.resolve("dots").unwrap().input_properties().is_empty());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register(
                counting("2d", Rc::default()),
                RegistrationPolicy::Overwrite,
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_names_resolve_to_nothing() {
        let mut registry = Registry::new();
        assert!(registry.resolve("missing").is_none());
        assert!(registry.instance("missing").is_none());
    }
}
