//! HTTP method bitmask.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use axum::http::Method;

/// Set of accepted HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSet(u16);

const NAMES: [(&str, u16); 9] = [
    ("GET", 1 << 0),
    ("HEAD", 1 << 1),
    ("POST", 1 << 2),
    ("PUT", 1 << 3),
    ("DELETE", 1 << 4),
    ("OPTIONS", 1 << 5),
    ("PATCH", 1 << 6),
    ("CONNECT", 1 << 7),
    ("TRACE", 1 << 8),
];

impl MethodSet {
    pub const NONE: MethodSet = MethodSet(0);
    pub const GET: MethodSet = MethodSet(1 << 0);
    pub const HEAD: MethodSet = MethodSet(1 << 1);
    pub const POST: MethodSet = MethodSet(1 << 2);
    pub const PUT: MethodSet = MethodSet(1 << 3);
    pub const DELETE: MethodSet = MethodSet(1 << 4);
    pub const OPTIONS: MethodSet = MethodSet(1 << 5);
    pub const PATCH: MethodSet = MethodSet(1 << 6);
    pub const ANY: MethodSet = MethodSet(0x1ff);

    fn bit(method: &Method) -> u16 {
        NAMES
            .iter()
            .find(|(name, _)| *name == method.as_str())
            .map(|(_, bit)| *bit)
            .unwrap_or(0)
    }

    /// Extension methods are never contained.
    pub fn contains(self, method: &Method) -> bool {
        self.0 & Self::bit(method) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MethodSet {
    type Output = MethodSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        MethodSet(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method {0:?}")]
pub struct UnknownMethod(pub String);

/// Parses a single name, `ANY`, or a `|`-separated list such as `GET|HEAD`.
impl FromStr for MethodSet {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = MethodSet::NONE;
        for part in s.split('|').map(str::trim) {
            let upper = part.to_ascii_uppercase();
            if upper == "ANY" {
                set = set | MethodSet::ANY;
                continue;
            }
            let (_, bit) = NAMES
                .iter()
                .find(|(name, _)| *name == upper)
                .ok_or_else(|| UnknownMethod(part.to_string()))?;
            set = set | MethodSet(*bit);
        }
        Ok(set)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == MethodSet::ANY {
            return f.write_str("ANY");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(_, bit)| self.0 & bit != 0)
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}
