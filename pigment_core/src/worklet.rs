// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Procedure modules.
//!
//! A module is source text evaluated by a host-supplied [`ScriptRealm`]. The
//! realm receives a [`WorkletScope`] as its only capability: it can register
//! procedures and read the device pixel ratio, nothing else. Registrations are
//! collected during evaluation and applied by
//! [`Engine::add_module`](crate::Engine::add_module) once evaluation succeeds.

use crate::error::ModuleError;
use crate::registry::PaintDefinition;

/// The global scope a module is evaluated against.
#[derive(Debug)]
pub struct WorkletScope {
    registrations: Vec<PaintDefinition>,
    device_pixel_ratio: f64,
}

impl WorkletScope {
    /// Creates an empty scope reporting `device_pixel_ratio`.
    #[must_use]
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            registrations: Vec::new(),
            device_pixel_ratio,
        }
    }

    /// Queues a procedure for registration.
    pub fn register_paint(&mut self, definition: PaintDefinition) {
        self.registrations.push(definition);
    }

    /// Device pixel ratio at the time the module was loaded.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Procedures registered so far, in call order.
    #[must_use]
    pub fn registrations(&self) -> &[PaintDefinition] {
        &self.registrations
    }

    /// Consumes the scope, yielding its registrations.
    #[must_use]
    pub fn into_registrations(self) -> Vec<PaintDefinition> {
        self.registrations
    }
}

/// A sandbox that can evaluate module source.
pub trait ScriptRealm {
    /// Evaluates `source` with `scope` as its global object.
    ///
    /// Evaluation is synchronous. An error discards every registration made
    /// during this call.
    fn evaluate(&mut self, source: &str, scope: &mut WorkletScope) -> Result<(), ModuleError>;
}
