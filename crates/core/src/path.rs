//! Property paths relative to the normalization root.

use std::fmt;

/// Dotted property path, e.g. `child.parent` or `orders[0].customer`.
///
/// The root path is empty. Object keys are joined with `.`; array elements
/// use `[index]` notation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyPath(String);

impl PropertyPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the property `key` below this one.
    pub fn key(&self, key: &str) -> Self {
        if self.is_root() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    /// Path of the array element at `index` below this one.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_empty() {
        let root = PropertyPath::root();
        assert!(root.is_root());
        assert_eq!(root.as_str(), "");
    }

    #[test]
    fn keys_join_with_dots() {
        let path = PropertyPath::root().key("child").key("parent");
        assert_eq!(path.to_string(), "child.parent");
    }

    #[test]
    fn indices_use_brackets() {
        let path = PropertyPath::root().key("orders").index(0).key("customer");
        assert_eq!(path.as_str(), "orders[0].customer");

        let root_element = PropertyPath::root().index(2).key("name");
        assert_eq!(root_element.as_str(), "[2].name");
    }
}
