// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Write interception for inline declarations.
//!
//! Some hosts do not report inline-style writes through their mutation
//! facility. For those, wrap the host's inline-style writer in an
//! [`ObservedDeclarations`], which calls back with the owning node before
//! every write so the caller can forward it to
//! [`Engine::notify_possible_change`](crate::Engine::notify_possible_change).
//!
//! ```rust,ignore
//! let mut touched = Vec::new();
//! let mut style = ObservedDeclarations::new(host.inline_style(), |node| touched.push(*node));
//! style.set_property(&node, "--x", "4", Priority::Normal);
//! drop(style);
//! for node in touched {
//!     engine.notify_possible_change(&mut host, &node, false);
//! }
//! ```

use crate::host::Priority;

/// Mutation entry points of an element's inline declarations.
pub trait InlineStyle {
    /// Element handle.
    type Node;

    /// Sets one declaration.
    fn set_property(&mut self, node: &Self::Node, name: &str, value: &str, priority: Priority);

    /// Removes one declaration and returns its previous value.
    fn remove_property(&mut self, node: &Self::Node, name: &str) -> Option<String>;

    /// Replaces the whole declaration block.
    fn set_css_text(&mut self, node: &Self::Node, text: &str);
}

/// An [`InlineStyle`] decorator that reports each write before forwarding it.
pub struct ObservedDeclarations<S, F> {
    inner: S,
    on_write: F,
}

impl<S: core::fmt::Debug, F> core::fmt::Debug for ObservedDeclarations<S, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObservedDeclarations")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, F> ObservedDeclarations<S, F>
where
    S: InlineStyle,
    F: FnMut(&S::Node),
{
    /// Wraps `inner`, calling `on_write` with the owning node of every write.
    pub fn new(inner: S, on_write: F) -> Self {
        Self { inner, on_write }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, F> InlineStyle for ObservedDeclarations<S, F>
where
    S: InlineStyle,
    F: FnMut(&S::Node),
{
    type Node = S::Node;

    fn set_property(&mut self, node: &S::Node, name: &str, value: &str, priority: Priority) {
        (self.on_write)(node);
        self.inner.set_property(node, name, value, priority);
    }

    fn remove_property(&mut self, node: &S::Node, name: &str) -> Option<String> {
        (self.on_write)(node);
        self.inner.remove_property(node, name)
    }

    fn set_css_text(&mut self, node: &S::Node, text: &str) {
        (self.on_write)(node);
        self.inner.set_css_text(node, text);
    }
}
