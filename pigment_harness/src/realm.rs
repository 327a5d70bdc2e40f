// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A line-oriented module language for loading the sample procedures.
//!
//! Each non-empty line that is not a `//` comment must read
//!
//! ```text
//! registerPaint <name> solid <color>
//! registerPaint <name> ripple
//! registerPaint <name> faulty
//! ```

use pigment_core::ModuleError;
use pigment_core::raster::Color;
use pigment_core::worklet::{ScriptRealm, WorkletScope};

use crate::procedures::{faulty, ripple, solid};

/// Evaluates demo modules. See the [module documentation](self).
#[derive(Clone, Copy, Debug, Default)]
pub struct DemoRealm {
    evaluated: usize,
}

impl DemoRealm {
    /// Creates a realm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modules evaluated successfully.
    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }
}

impl ScriptRealm for DemoRealm {
    fn evaluate(&mut self, source: &str, scope: &mut WorkletScope) -> Result<(), ModuleError> {
        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let error = |what: &str| ModuleError::Script(format!("line {}: {what}", index + 1));
            let mut words = line.split_whitespace();
            let (Some("registerPaint"), Some(name), Some(kind)) =
                (words.next(), words.next(), words.next())
            else {
                return Err(error(&format!("cannot evaluate `{line}`")));
            };
            let definition = match kind {
                "solid" => {
                    let color = words
                        .next()
                        .and_then(Color::parse)
                        .ok_or_else(|| error("expected a color"))?;
                    solid(name, color)
                }
                "ripple" => ripple(name),
                "faulty" => faulty(name),
                other => return Err(error(&format!("unknown procedure kind `{other}`"))),
            };
            scope.register_paint(definition);
        }
        self.evaluated += 1;
        Ok(())
    }
}
