//! Cache keys for the query store.

use std::fmt;

/// One segment of a [`QueryKey`]: a name or a primitive parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<i32> for KeyPart {
    fn from(value: i32) -> Self {
        KeyPart::Int(value.into())
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::Int(value.into())
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Str(s) => f.write_str(s),
            KeyPart::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Identifier tuple naming one logical data dependency.
///
/// Identity is structural: two keys built from the same segments are the
/// same cache entry, regardless of where they were constructed.
///
/// ```
/// use hermod::sync::QueryKey;
///
/// let a = QueryKey::new("salary-period").with(42);
/// let b = QueryKey::new("salary-period").with(42);
/// assert_eq!(a, b);
/// assert!(a.starts_with(&QueryKey::new("salary-period")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    /// Start a key from a resource name.
    pub fn new(resource: impl Into<KeyPart>) -> Self {
        Self {
            parts: vec![resource.into()],
        }
    }

    /// Append a parameter segment.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Whether `prefix` is a leading subsequence of this key. Used by
    /// prefix invalidation: invalidating `["tracking-lines"]` hits
    /// `["tracking-lines", 7]` and every other parameterised variant.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.parts.len() >= prefix.parts.len()
            && self.parts[..prefix.parts.len()] == prefix.parts[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl From<&str> for QueryKey {
    fn from(resource: &str) -> Self {
        QueryKey::new(resource)
    }
}
