// Copyright 2026 the Pigment Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property access for paint procedures, and registered custom properties.
//!
//! A procedure reads its inputs through [`Properties`]. During a render the
//! engine hands it a [`PropertyMap`] that fetches values from the host's
//! computed style on first access and memoizes them for the rest of the
//! render pass, so every procedure invoked for one target sees the same
//! snapshot.
//!
//! Custom properties registered with
//! [`Engine::register_property`](crate::Engine::register_property) are
//! validated against their declared [`PropertySyntax`]: a value that does not
//! match, or is missing, reads as the registered initial value, and a
//! property registered with `inherits: false` only sees what the element
//! declares itself.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::PropertyError;
use crate::host::ComputedStyle;
use crate::raster::Color;

/// Read access to a target's property values.
pub trait Properties {
    /// Returns the trimmed value of `name`, or an empty string if unset.
    fn get(&mut self, name: &str) -> String;
}

impl Properties for HashMap<String, String> {
    fn get(&mut self, name: &str) -> String {
        HashMap::get(self, name).cloned().unwrap_or_default()
    }
}

/// One component of a property syntax descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SyntaxComponent {
    /// `<length>`.
    Length,
    /// `<number>`.
    Number,
    /// `<integer>`.
    Integer,
    /// `<percentage>`.
    Percentage,
    /// `<length-percentage>`.
    LengthPercentage,
    /// `<color>`.
    Color,
    /// `<angle>`.
    Angle,
    /// `<time>`.
    Time,
    /// `<custom-ident>`.
    CustomIdent,
    /// A literal keyword.
    Keyword(String),
}

/// A parsed syntax descriptor such as `<length> | auto`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertySyntax {
    /// `*`: any value.
    Universal,
    /// Any of the listed components.
    Any(Vec<SyntaxComponent>),
}

const LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "cm", "mm", "in", "pt", "pc", "q",
];
const ANGLE_UNITS: &[&str] = &["deg", "grad", "rad", "turn"];
const TIME_UNITS: &[&str] = &["ms", "s"];
const CSS_WIDE_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert", "default"];

impl PropertySyntax {
    /// Parses a descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, PropertyError> {
        let descriptor = descriptor.trim();
        if descriptor == "*" {
            return Ok(Self::Universal);
        }
        let invalid = || PropertyError::InvalidSyntax {
            syntax: descriptor.to_owned(),
        };
        let mut components = Vec::new();
        for part in descriptor.split('|').map(str::trim) {
            let component = match part {
                "<length>" => SyntaxComponent::Length,
                "<number>" => SyntaxComponent::Number,
                "<integer>" => SyntaxComponent::Integer,
                "<percentage>" => SyntaxComponent::Percentage,
                "<length-percentage>" => SyntaxComponent::LengthPercentage,
                "<color>" => SyntaxComponent::Color,
                "<angle>" => SyntaxComponent::Angle,
                "<time>" => SyntaxComponent::Time,
                "<custom-ident>" => SyntaxComponent::CustomIdent,
                keyword if is_ident(keyword) && !is_css_wide(keyword) => {
                    SyntaxComponent::Keyword(keyword.to_owned())
                }
                _ => return Err(invalid()),
            };
            components.push(component);
        }
        Ok(Self::Any(components))
    }

    /// Whether `value` is valid for this syntax.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Universal => true,
            Self::Any(components) => components.iter().any(|c| component_matches(c, value)),
        }
    }
}

fn component_matches(component: &SyntaxComponent, value: &str) -> bool {
    match component {
        SyntaxComponent::Length => is_length(value),
        SyntaxComponent::Number => value.parse::<f64>().is_ok_and(f64::is_finite),
        SyntaxComponent::Integer => value.parse::<i64>().is_ok(),
        SyntaxComponent::Percentage => is_percentage(value),
        SyntaxComponent::LengthPercentage => is_length(value) || is_percentage(value),
        SyntaxComponent::Color => Color::parse(value).is_some(),
        SyntaxComponent::Angle => has_unit(value, ANGLE_UNITS),
        SyntaxComponent::Time => has_unit(value, TIME_UNITS),
        SyntaxComponent::CustomIdent => is_ident(value) && !is_css_wide(value),
        SyntaxComponent::Keyword(keyword) => value == keyword,
    }
}

fn is_length(value: &str) -> bool {
    value == "0" || has_unit(value, LENGTH_UNITS)
}

fn is_percentage(value: &str) -> bool {
    value
        .strip_suffix('%')
        .is_some_and(|n| n.parse::<f64>().is_ok_and(f64::is_finite))
}

fn has_unit(value: &str, units: &[&str]) -> bool {
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    !number.is_empty()
        && number.parse::<f64>().is_ok_and(f64::is_finite)
        && units.iter().any(|u| unit.eq_ignore_ascii_case(u))
}

fn is_ident(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some('-') => chars.next(),
        other => other,
    };
    first.is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_css_wide(value: &str) -> bool {
    CSS_WIDE_KEYWORDS
        .iter()
        .any(|k| value.eq_ignore_ascii_case(k))
}

/// A registered custom property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDefinition {
    /// Property name, including the leading `--`.
    pub name: String,
    /// Syntax descriptor, e.g. `<length>` or `*`.
    pub syntax: String,
    /// Whether the value inherits from ancestors.
    pub inherits: bool,
    /// Value used when the property is unset or invalid.
    pub initial_value: Option<String>,
}

#[derive(Clone, Debug)]
struct RegisteredProperty {
    syntax: PropertySyntax,
    inherits: bool,
    initial_value: String,
}

/// Registered custom properties.
#[derive(Clone, Debug, Default)]
pub struct PropertyRegistry {
    properties: HashMap<String, RegisteredProperty>,
}

impl PropertyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom property. Names can only be registered once.
    pub fn register(&mut self, definition: PropertyDefinition) -> Result<(), PropertyError> {
        let PropertyDefinition {
            name,
            syntax,
            inherits,
            initial_value,
        } = definition;
        if !name.starts_with("--") || name.len() < 3 {
            return Err(PropertyError::InvalidName { name });
        }
        let parsed = PropertySyntax::parse(&syntax)?;
        let initial_value = match (&parsed, initial_value) {
            (PropertySyntax::Universal, value) => value.unwrap_or_default(),
            (_, Some(value)) if parsed.matches(&value) => value.trim().to_owned(),
            (_, value) => return Err(PropertyError::InvalidInitialValue { syntax, value }),
        };
        match self.properties.entry(name) {
            Entry::Occupied(entry) => Err(PropertyError::AlreadyRegistered {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(RegisteredProperty {
                    syntax: parsed,
                    inherits,
                    initial_value,
                });
                Ok(())
            }
        }
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Reads `name` on `node`, applying registration rules when present.
    pub fn resolve<H: ComputedStyle>(&self, host: &H, node: &H::Node, name: &str) -> String {
        let Some(registered) = self.properties.get(name) else {
            return host.computed_value(node, name).trim().to_owned();
        };
        let raw = if registered.inherits {
            Some(host.computed_value(node, name))
        } else {
            host.specified_value(node, name)
        };
        match raw {
            Some(value) if !value.trim().is_empty() && registered.syntax.matches(&value) => {
                value.trim().to_owned()
            }
            _ => registered.initial_value.clone(),
        }
    }
}

/// Values fetched during one render pass of one target.
#[derive(Clone, Debug, Default)]
pub struct PropertyCache {
    values: HashMap<String, String>,
}

impl PropertyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a [`Properties`] view that fills this cache from `host`.
    pub fn view<'a, H: ComputedStyle>(
        &'a mut self,
        host: &'a H,
        node: &'a H::Node,
        registry: &'a PropertyRegistry,
    ) -> PropertyMap<'a, H> {
        PropertyMap {
            cache: self,
            host,
            node,
            registry,
        }
    }

    /// Drops every memoized value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Lazy, memoized property access for one target.
#[derive(Debug)]
pub struct PropertyMap<'a, H: ComputedStyle> {
    cache: &'a mut PropertyCache,
    host: &'a H,
    node: &'a H::Node,
    registry: &'a PropertyRegistry,
}

impl<H: ComputedStyle> Properties for PropertyMap<'_, H> {
    fn get(&mut self, name: &str) -> String {
        if let Some(value) = self.cache.values.get(name) {
            return value.clone();
        }
        let value = self.registry.resolve(self.host, self.node, name);
        self.cache.values.insert(name.to_owned(), value.clone());
        value
    }
}
