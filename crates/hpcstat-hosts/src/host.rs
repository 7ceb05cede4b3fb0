//! Canonical host identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node name such as `dg035`: an alphabetic pool prefix followed by a
/// zero-padded index.
///
/// Names that do not follow that shape (`login1-ib`, `a100node`) are still
/// valid hosts, they just have no pool class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (prefix, index, index width).
    ///
    /// Returns None unless the name is letters followed by at least one digit
    /// and nothing else.
    pub fn parts(&self) -> Option<(&str, u32, usize)> {
        let digits_at = self.0.find(|c: char| c.is_ascii_digit())?;
        let (prefix, digits) = self.0.split_at(digits_at);
        if prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphabetic())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let index = digits.parse().ok()?;
        Some((prefix, index, digits.len()))
    }

    /// The pool prefix (`dg` for `dg035`).
    pub fn prefix(&self) -> Option<&str> {
        self.parts().map(|(prefix, _, _)| prefix)
    }

    /// The numeric index (`35` for `dg035`).
    pub fn index(&self) -> Option<u32> {
        self.parts().map(|(_, index, _)| index)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Host {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Host {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Host {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let host = Host::from("dg035");
        assert_eq!(host.parts(), Some(("dg", 35, 3)));
        assert_eq!(host.prefix(), Some("dg"));
        assert_eq!(host.index(), Some(35));
    }

    #[test]
    fn test_parts_irregular_names() {
        assert_eq!(Host::from("login1-ib").parts(), None);
        assert_eq!(Host::from("dgx").parts(), None);
        assert_eq!(Host::from("042").parts(), None);
    }

    #[test]
    fn test_ordering_follows_padding() {
        let mut hosts = vec![Host::from("dn010"), Host::from("dg002"), Host::from("dn002")];
        hosts.sort();
        assert_eq!(
            hosts,
            vec![Host::from("dg002"), Host::from("dn002"), Host::from("dn010")]
        );
    }
}
