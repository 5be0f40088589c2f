//! Uniform property access over heterogeneous items

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Name of a property used for filtering and sorting
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyName {
    /// Object name
    Name,
    /// Object namespace
    Namespace,
    /// Creation timestamp
    CreationTimestamp,
    /// Status or phase
    Status,
    /// Type (for example a Secret's type)
    Type,
    /// Object kind
    Kind,
    /// CPU usage or request metric
    Cpu,
    /// Memory usage or request metric
    Memory,
    /// Value of a label
    Label(String),
    /// Any other property a cell chooses to expose
    Other(String),
}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self {
        match s {
            "name" => Self::Name,
            "namespace" => Self::Namespace,
            "creationTimestamp" => Self::CreationTimestamp,
            "status" => Self::Status,
            "type" => Self::Type,
            "kind" => Self::Kind,
            "cpu" => Self::Cpu,
            "memory" => Self::Memory,
            other => match other.strip_prefix("label:") {
                Some(key) => Self::Label(key.to_string()),
                None => Self::Other(other.to_string()),
            },
        }
    }
}

impl FromStr for PropertyName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Namespace => f.write_str("namespace"),
            Self::CreationTimestamp => f.write_str("creationTimestamp"),
            Self::Status => f.write_str("status"),
            Self::Type => f.write_str("type"),
            Self::Kind => f.write_str("kind"),
            Self::Cpu => f.write_str("cpu"),
            Self::Memory => f.write_str("memory"),
            Self::Label(key) => write!(f, "label:{}", key),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A property value that can be compared and matched
#[derive(Debug, Clone, PartialEq)]
pub enum ComparableValue {
    /// Text, compared lexicographically
    Str(String),
    /// Integer metric
    Int(i64),
    /// Fractional metric
    Float(f64),
    /// Point in time
    Time(DateTime<Utc>),
}

impl ComparableValue {
    /// Total order between two values
    ///
    /// Numbers compare numerically across `Int` and `Float`; times
    /// chronologically. Mixed kinds fall back to their string forms.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (a, b) => a.to_string().cmp(&b.to_string()),
        }
    }

    /// Whether the string form contains `term`
    pub fn contains(&self, term: &str) -> bool {
        match self {
            Self::Str(s) => s.contains(term),
            other => other.to_string().contains(term),
        }
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Time(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<&str> for ComparableValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ComparableValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ComparableValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ComparableValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<DateTime<Utc>> for ComparableValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

/// An item the data selector can filter and sort
pub trait Cell {
    /// Value of `name`, or `None` if the item has no such property
    fn property(&self, name: &PropertyName) -> Option<ComparableValue>;
}
