//! Namespaced identifiers for phases and events.
//!
//! An [`Identifier`] is a two-part `namespace:path` name. Extensions use
//! their own namespace so independently written phases never collide:
//!
//! ```
//! use keystone_event::identifier::Identifier;
//!
//! let phase: Identifier = "smelting:fuel".parse().unwrap();
//! assert_eq!(phase.namespace(), "smelting");
//! assert_eq!(phase.path(), "fuel");
//! assert_eq!(phase.to_string(), "smelting:fuel");
//!
//! // Without a namespace the keystone namespace is assumed
//! let bare: Identifier = "default".parse().unwrap();
//! assert_eq!(bare.namespace(), "keystone");
//! ```
//!
//! # Allowed Characters
//!
//! | Part | Characters |
//! |------|------------|
//! | namespace | `a-z 0-9 _ . -` |
//! | path | `a-z 0-9 _ . - /` |
//!
//! Neither part may be empty.

use core::fmt;
use core::str::FromStr;
use std::borrow::Cow;

/// Namespace assumed when parsing an identifier without one.
pub const DEFAULT_NAMESPACE: &str = "keystone";

/// Errors produced when an identifier is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The namespace is empty.
    #[error("identifier namespace must not be empty")]
    EmptyNamespace,

    /// The path is empty.
    #[error("identifier path must not be empty")]
    EmptyPath,

    /// The namespace contains a character outside `a-z 0-9 _ . -`.
    #[error("invalid character {character:?} in identifier namespace '{namespace}'")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
        /// The first offending character.
        character: char,
    },

    /// The path contains a character outside `a-z 0-9 _ . - /`.
    #[error("invalid character {character:?} in identifier path '{path}'")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// The first offending character.
        character: char,
    },
}

/// A validated `namespace:path` name.
///
/// Equality, hashing and ordering consider the namespace first and the path
/// second. Identifiers built from `'static` strings are free to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl Identifier {
    /// Creates an identifier, validating both parts.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentifierError`] if either part is empty or contains a
    /// character outside its allowed set.
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
    ) -> Result<Self, IdentifierError> {
        let namespace = namespace.into();
        let path = path.into();

        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace);
        }
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath);
        }
        if let Some(character) = namespace.chars().find(|&c| !is_namespace_char(c)) {
            return Err(IdentifierError::InvalidNamespace {
                namespace: namespace.into_owned(),
                character,
            });
        }
        if let Some(character) = path.chars().find(|&c| !is_path_char(c)) {
            return Err(IdentifierError::InvalidPath {
                path: path.into_owned(),
                character,
            });
        }

        Ok(Self { namespace, path })
    }

    /// Creates an identifier from static strings in a const context.
    ///
    /// # Panics
    ///
    /// Panics if either part is invalid. When used to initialize a `const`,
    /// the panic is a compile error.
    ///
    /// ```
    /// use keystone_event::identifier::Identifier;
    ///
    /// const FUEL: Identifier = Identifier::from_static("smelting", "fuel");
    /// assert_eq!(FUEL.to_string(), "smelting:fuel");
    /// ```
    #[must_use]
    pub const fn from_static(namespace: &'static str, path: &'static str) -> Self {
        assert!(
            is_valid(namespace.as_bytes(), false),
            "invalid identifier namespace"
        );
        assert!(is_valid(path.as_bytes(), true), "invalid identifier path");

        Self {
            namespace: Cow::Borrowed(namespace),
            path: Cow::Borrowed(path),
        }
    }

    /// Returns the namespace part.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the path part.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_namespace_char(c: char) -> bool {
    u8::try_from(c).is_ok_and(is_namespace_byte)
}

fn is_path_char(c: char) -> bool {
    u8::try_from(c).is_ok_and(|b| is_namespace_byte(b) || b == b'/')
}

const fn is_namespace_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-')
}

const fn is_valid(bytes: &[u8], allow_slash: bool) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !(is_namespace_byte(b) || (allow_slash && b == b'/')) {
            return false;
        }
        i += 1;
    }
    true
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace.to_owned(), path.to_owned()),
            None => Self::new(DEFAULT_NAMESPACE, s.to_owned()),
        }
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
