//! Read-only state inspection.
//!
//! Cores expose registers, flags and scheduler state as named paths so a
//! debugger or test harness can look at them without knowing the concrete
//! type. Queries never change the component.

use std::collections::HashMap;
use std::fmt;

/// A dynamically-typed value for state queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 8-bit unsigned integer.
    U8(u8),
    /// 16-bit unsigned integer.
    U16(u16),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 8-bit signed integer.
    I8(i8),
    /// 32-bit signed integer (cycle counters).
    I32(i32),
    /// String value.
    String(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of string keys to values.
    Map(HashMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v:#010X}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::I8(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A component whose state can be inspected by path.
pub trait Observable {
    /// Query a single property.
    ///
    /// Paths are lower case, with dots for nested items:
    /// - `pc` - program counter
    /// - `hl'` - alternate register pair
    /// - `flags.z` - zero flag
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path `query()` answers.
    fn query_paths(&self) -> &'static [&'static str];

    /// All paths with their current values, in `query_paths()` order.
    fn snapshot(&self) -> Vec<(&'static str, Value)> {
        self.query_paths()
            .iter()
            .filter_map(|&path| self.query(path).map(|value| (path, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        cc: i32,
        halted: bool,
    }

    impl Observable for Counter {
        fn query(&self, path: &str) -> Option<Value> {
            match path {
                "cc" => Some(self.cc.into()),
                "halted" => Some(self.halted.into()),
                _ => None,
            }
        }

        fn query_paths(&self) -> &'static [&'static str] {
            &["cc", "halted", "missing"]
        }
    }

    #[test]
    fn snapshot_skips_unanswered_paths() {
        let counter = Counter {
            cc: -12,
            halted: true,
        };
        let snap = counter.snapshot();
        assert_eq!(
            snap,
            vec![("cc", Value::I32(-12)), ("halted", Value::Bool(true))]
        );
    }

    #[test]
    fn display_formats_by_width() {
        assert_eq!(Value::U8(0x3C).to_string(), "0x3C");
        assert_eq!(Value::U16(0x66).to_string(), "0x0066");
        assert_eq!(Value::I32(-4).to_string(), "-4");
        assert_eq!(
            Value::Array(vec![Value::Bool(false), Value::U8(1)]).to_string(),
            "[false, 0x01]"
        );
    }
}
