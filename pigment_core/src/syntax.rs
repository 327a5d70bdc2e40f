// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint reference tokens.
//!
//! A declaration value references a procedure in one of five forms:
//!
//! | Form | Example |
//! |------|---------|
//! | [`TokenForm::Paint`] | `paint(dots)`, `paint('dots')` |
//! | [`TokenForm::DataUrl`] | `url(data:image/paint-dots,=)` |
//! | [`TokenForm::BlobUrl`] | `url("blob:https://a.test/5c1d#paint=dots")` |
//! | [`TokenForm::WebkitCanvas`] | `-webkit-canvas(paint-3-dots)` |
//! | [`TokenForm::MozElement`] | `-moz-element(#paint-3-dots)` |
//!
//! The last four are what the engine itself writes (or what
//! [`escape_paint_references`] produces), so a value read back from a host
//! that kept an earlier substitution still resolves to the same procedure.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{CaptureMatches, Regex};

static HAS_PAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r##"(\bpaint\(|-moz-element\(#paint-|-webkit-canvas\(paint-|[('"]blob:[^'"#]+#paint=|[('"]data:image/paint-)"##,
    )
    .expect("paint detection pattern is valid")
});

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\bpaint\(\s*["']?(?P<paint>-?[A-Za-z_][\w-]*)["']?\s*\)"#,
        r#"|url\(\s*["']?(?:data:image/paint-(?P<data>-?[A-Za-z_][\w-]*)|blob:[^"'#)]+#paint=(?P<blob>-?[A-Za-z_][\w-]*))[^"')]*["']?\s*\)"#,
        r#"|-webkit-canvas\(paint-\d+-(?P<webkit>-?[A-Za-z_][\w-]*)\)"#,
        r#"|-moz-element\(#paint-\d+-(?P<moz>-?[A-Za-z_][\w-]*)\)"#,
    ))
    .expect("paint token pattern is valid")
});

static ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bpaint\s*\(\s*["']?(-?[A-Za-z_][\w-]*)["']?\s*\)"#)
        .expect("paint escape pattern is valid")
});

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[A-Za-z_][\w-]*$").expect("procedure name pattern is valid")
});

/// Which syntax a [`PaintToken`] was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenForm {
    /// `paint(name)`.
    Paint,
    /// `url(data:image/paint-name…)`.
    DataUrl,
    /// `url(blob:…#paint=name)`.
    BlobUrl,
    /// `-webkit-canvas(paint-id-name)`.
    WebkitCanvas,
    /// `-moz-element(#paint-id-name)`.
    MozElement,
}

/// One paint reference inside a declaration value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaintToken<'a> {
    /// Byte range of the whole reference in the scanned text.
    pub range: Range<usize>,
    /// Referenced procedure name.
    pub name: &'a str,
    /// Syntax the reference was written in.
    pub form: TokenForm,
}

/// Iterator over the paint references in a value, in source order.
#[derive(Debug)]
pub struct PaintTokens<'a> {
    inner: CaptureMatches<'static, 'a>,
}

impl<'a> Iterator for PaintTokens<'a> {
    type Item = PaintToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.inner.next()?;
        let whole = caps.get(0)?;
        let (name, form) = [
            ("paint", TokenForm::Paint),
            ("data", TokenForm::DataUrl),
            ("blob", TokenForm::BlobUrl),
            ("webkit", TokenForm::WebkitCanvas),
            ("moz", TokenForm::MozElement),
        ]
        .into_iter()
        .find_map(|(group, form)| caps.name(group).map(|m| (m.as_str(), form)))?;
        Some(PaintToken {
            range: whole.range(),
            name,
            form,
        })
    }
}

/// Returns the paint references in `value`.
#[must_use]
pub fn paint_tokens(value: &str) -> PaintTokens<'_> {
    PaintTokens {
        inner: TOKEN.captures_iter(value),
    }
}

/// Cheap test for whether `text` may contain a paint reference.
#[must_use]
pub fn has_paint(text: &str) -> bool {
    HAS_PAINT.is_match(text)
}

/// Rewrites every `paint(name)` into `url(data:image/paint-name,=)`.
///
/// Hosts without native paint support drop declarations they cannot parse;
/// the escaped form survives parsing and still resolves to `name`.
#[must_use]
pub fn escape_paint_references(css: &str) -> Cow<'_, str> {
    ESCAPE.replace_all(css, "url(data:image/paint-${1},=)")
}

/// Whether `name` can be referenced from `paint()`.
#[must_use]
pub fn is_valid_procedure_name(name: &str) -> bool {
    NAME.is_match(name)
}
