// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Just enough CSS for the in-memory host: declaration blocks, sheets with
//! `@media` groups, and compound selectors with descendant and child
//! combinators.
//!
//! Parsing is forgiving. Anything the host cannot make sense of is dropped
//! (declarations) or matches nothing (selectors), as a browser would.

/// One `name: value [!important]` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name.
    pub name: String,
    /// Value text, trimmed, without the priority marker.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

/// Splits `text` at every top-level `separator`, ignoring separators inside
/// quotes or parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parses a declaration block body.
#[must_use]
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    split_top_level(text, ';')
        .into_iter()
        .filter_map(|part| {
            let (name, value) = part.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            let (value, important) = match value.strip_suffix("!important") {
                Some(rest) => (rest.trim_end(), true),
                None => (value, false),
            };
            Some(Declaration {
                name: name.to_owned(),
                value: value.to_owned(),
                important,
            })
        })
        .collect()
}

/// Serializes declarations as `name: value; name: value !important;`.
#[must_use]
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| {
            let priority = if d.important { " !important" } else { "" };
            format!("{}: {}{priority};", d.name, d.value)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sets `name` in a declaration block, replacing an earlier value.
pub fn upsert_declaration(text: &str, name: &str, value: &str, important: bool) -> String {
    let mut declarations = parse_declarations(text);
    let declaration = Declaration {
        name: name.to_owned(),
        value: value.trim().to_owned(),
        important,
    };
    match declarations.iter_mut().find(|d| d.name == name) {
        Some(existing) => *existing = declaration,
        None => declarations.push(declaration),
    }
    serialize_declarations(&declarations)
}

/// Removes `name` from a declaration block. Returns the new text and the
/// removed value.
pub fn remove_declaration(text: &str, name: &str) -> (String, Option<String>) {
    let mut declarations = parse_declarations(text);
    let index = declarations.iter().position(|d| d.name == name);
    let removed = index.map(|i| declarations.remove(i).value);
    (serialize_declarations(&declarations), removed)
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// A rule as written in sheet text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedRule {
    /// `selector { declarations }`.
    Style {
        /// Selector text, trimmed.
        selector: String,
        /// Declaration block body, trimmed.
        text: String,
    },
    /// `@media condition { rules }`.
    Media {
        /// Condition text, trimmed.
        condition: String,
        /// Nested rules.
        rules: Vec<ParsedRule>,
    },
    /// Any other at-rule.
    Other,
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Byte index of the `}` closing the block whose body starts at `from`.
fn matching_brace(css: &str, from: usize) -> Option<usize> {
    let mut depth = 1_u32;
    let mut quote: Option<char> = None;
    for (i, c) in css[from..].char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses sheet text into its rule tree.
#[must_use]
pub fn parse_sheet(css: &str) -> Vec<ParsedRule> {
    parse_rules(&strip_comments(css))
}

fn parse_rules(css: &str) -> Vec<ParsedRule> {
    let mut rules = Vec::new();
    let mut pos = 0;
    while pos < css.len() {
        let rest = &css[pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        pos += rest.len() - trimmed.len();

        let brace = trimmed.find('{');
        let semicolon = trimmed.find(';');
        if trimmed.starts_with('@') && semicolon.is_some_and(|s| brace.is_none_or(|b| s < b)) {
            // Statement at-rule such as `@import`.
            rules.push(ParsedRule::Other);
            pos += semicolon.unwrap_or(trimmed.len()) + 1;
            continue;
        }
        let Some(open) = brace else {
            break;
        };
        let prelude = trimmed[..open].trim();
        let body_start = pos + open + 1;
        let Some(close) = matching_brace(css, body_start) else {
            break;
        };
        let body = &css[body_start..close];
        pos = close + 1;

        if let Some(at_rule) = prelude.strip_prefix('@') {
            let (keyword, condition) = at_rule.split_once(char::is_whitespace).unwrap_or((at_rule, ""));
            rules.push(if keyword.eq_ignore_ascii_case("media") {
                ParsedRule::Media {
                    condition: condition.trim().to_owned(),
                    rules: parse_rules(body),
                }
            } else {
                ParsedRule::Other
            });
        } else if !prelude.is_empty() {
            rules.push(ParsedRule::Style {
                selector: prelude.to_owned(),
                text: body.trim().to_owned(),
            });
        }
    }
    rules
}

// ---------------------------------------------------------------------------
// Selectors
// ---------------------------------------------------------------------------

/// Read access to an element tree for selector matching.
pub trait ElementTree {
    /// Element handle.
    type Node: Copy;

    /// Lower-case tag name.
    fn tag(&self, node: Self::Node) -> &str;
    /// Attribute value.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;
    /// Parent element.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One complex selector, such as `.list > li[data-x="1"]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    /// Rightmost compound first, each with the combinator to its left.
    parts: Vec<(Compound, Option<Combinator>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], i: &mut usize) -> Option<String> {
    let start = *i;
    while *i < chars.len() && is_ident_char(chars[*i]) {
        *i += 1;
    }
    (*i > start).then(|| chars[start..*i].iter().collect())
}

fn parse_attribute(chars: &[char], i: &mut usize) -> Option<(String, Option<String>)> {
    let close = chars[*i..].iter().position(|c| *c == ']')? + *i;
    let inner: String = chars[*i..close].iter().collect();
    *i = close + 1;
    match inner.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((name.trim().to_owned(), Some(value.to_owned())))
        }
        None => Some((inner.trim().to_owned(), None)),
    }
}

impl Selector {
    /// Parses one complex selector. Returns `None` for anything unsupported.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let chars: Vec<char> = text.trim().chars().collect();
        if chars.is_empty() {
            return None;
        }
        let mut parts: Vec<(Compound, Option<Combinator>)> = Vec::new();
        let mut compound = Compound::default();
        let mut empty = true;
        let mut pending: Option<Combinator> = None;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() || c == '>' {
                let mut combinator = Combinator::Descendant;
                while i < chars.len() && (chars[i].is_whitespace() || chars[i] == '>') {
                    if chars[i] == '>' {
                        combinator = Combinator::Child;
                    }
                    i += 1;
                }
                if empty {
                    return None;
                }
                parts.push((core::mem::take(&mut compound), pending));
                pending = Some(combinator);
                empty = true;
                continue;
            }
            match c {
                '*' => i += 1,
                '#' => {
                    i += 1;
                    compound.id = Some(take_ident(&chars, &mut i)?);
                }
                '.' => {
                    i += 1;
                    compound.classes.push(take_ident(&chars, &mut i)?);
                }
                '[' => {
                    i += 1;
                    compound.attributes.push(parse_attribute(&chars, &mut i)?);
                }
                c if is_ident_char(c) && empty => {
                    compound.tag = Some(take_ident(&chars, &mut i)?.to_ascii_lowercase());
                }
                _ => return None,
            }
            empty = false;
        }
        if empty {
            return None;
        }
        parts.push((compound, pending));
        // Store rightmost first; each entry keeps the combinator joining it
        // to the compound on its left.
        let mut ordered = Vec::with_capacity(parts.len());
        let combinators: Vec<Option<Combinator>> = parts.iter().map(|(_, c)| *c).collect();
        for (index, (compound, _)) in parts.into_iter().enumerate().rev() {
            ordered.push((compound, combinators[index]));
        }
        Some(Self { parts: ordered })
    }

    /// Specificity as `(ids, classes and attributes, tags)`.
    #[must_use]
    pub fn specificity(&self) -> (u32, u32, u32) {
        let mut weight = (0, 0, 0);
        for (compound, _) in &self.parts {
            weight.0 += u32::from(compound.id.is_some());
            weight.1 += u32::try_from(compound.classes.len() + compound.attributes.len())
                .unwrap_or(u32::MAX);
            weight.2 += u32::from(compound.tag.is_some());
        }
        weight
    }

    /// Whether `node` matches.
    pub fn matches<T: ElementTree>(&self, tree: &T, node: T::Node) -> bool {
        self.matches_from(tree, node, 0)
    }

    fn matches_from<T: ElementTree>(&self, tree: &T, node: T::Node, index: usize) -> bool {
        let (compound, combinator) = &self.parts[index];
        if !compound_matches(compound, tree, node) {
            return false;
        }
        let Some(combinator) = combinator else {
            return true;
        };
        let mut ancestor = tree.parent(node);
        while let Some(candidate) = ancestor {
            if self.matches_from(tree, candidate, index + 1) {
                return true;
            }
            if *combinator == Combinator::Child {
                return false;
            }
            ancestor = tree.parent(candidate);
        }
        false
    }
}

fn compound_matches<T: ElementTree>(compound: &Compound, tree: &T, node: T::Node) -> bool {
    if compound.tag.as_deref().is_some_and(|tag| tag != tree.tag(node)) {
        return false;
    }
    if let Some(id) = &compound.id {
        if tree.attribute(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let classes = tree.attribute(node, "class").unwrap_or("");
        if !compound
            .classes
            .iter()
            .all(|c| classes.split_whitespace().any(|have| have == c))
        {
            return false;
        }
    }
    compound
        .attributes
        .iter()
        .all(|(name, value)| match (tree.attribute(node, name), value) {
            (Some(_), None) => true,
            (Some(have), Some(want)) => have == want,
            (None, _) => false,
        })
}

/// Parses a comma-separated selector list. Returns `None` if any member is
/// unsupported, so an invalid list matches nothing.
#[must_use]
pub fn parse_selector_list(text: &str) -> Option<Vec<Selector>> {
    split_top_level(text, ',')
        .into_iter()
        .map(Selector::parse)
        .collect()
}
