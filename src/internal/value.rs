use crate::internal::storage::StreamHandle;
use std::cmp::Ordering;
use std::fmt;

// ========================================================================= //

/// A value from one field of a record.
#[derive(Clone, Debug)]
pub enum Value {
    /// A null value.
    Null,
    /// An integer value.
    Int(i32),
    /// A string value.
    Str(String),
    /// A binary stream.  Cloning the value yields an independent cursor over
    /// the same bytes.
    Stream(StreamHandle),
}

impl Value {
    /// Returns true if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(*self, Value::Null)
    }

    /// Returns true if this is an integer value.
    pub fn is_int(&self) -> bool {
        matches!(*self, Value::Int(_))
    }

    /// Extracts the integer value if it is an integer.
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::Int(number) => Some(number),
            _ => None,
        }
    }

    /// Returns true if this is a string value.
    pub fn is_str(&self) -> bool {
        matches!(*self, Value::Str(_))
    }

    /// Extracts the string value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Str(ref string) => Some(string.as_str()),
            _ => None,
        }
    }

    /// Returns true if this is a stream value.
    pub fn is_stream(&self) -> bool {
        matches!(*self, Value::Stream(_))
    }

    /// Extracts the stream handle if this is a stream value.
    pub fn as_stream(&self) -> Option<&StreamHandle> {
        match *self {
            Value::Stream(ref stream) => Some(stream),
            _ => None,
        }
    }

    /// Creates a boolean value.
    pub(crate) fn from_bool(boolean: bool) -> Value {
        if boolean {
            Value::Int(1)
        } else {
            Value::Int(0)
        }
    }

    /// Coerces the `Value` to a boolean.  Returns false for null, zero, and
    /// empty string; returns true for all other values.
    pub(crate) fn to_bool(&self) -> bool {
        match *self {
            Value::Null => false,
            Value::Int(number) => number != 0,
            Value::Str(ref string) => !string.is_empty(),
            Value::Stream(_) => true,
        }
    }

    /// Renders the value as a SQL literal.  Strings are single-quoted, with
    /// quotes, backslashes, and line breaks escaped by a backslash.
    pub(crate) fn to_sql(&self) -> String {
        match *self {
            Value::Null => "NULL".to_string(),
            Value::Int(number) => number.to_string(),
            Value::Str(ref string) => {
                let mut quoted = String::with_capacity(string.len() + 2);
                quoted.push('\'');
                for chr in string.chars() {
                    match chr {
                        '\n' => quoted.push_str("\\n"),
                        '\r' => quoted.push_str("\\r"),
                        '\\' | '\'' => {
                            quoted.push('\\');
                            quoted.push(chr);
                        }
                        _ => quoted.push(chr),
                    }
                }
                quoted.push('\'');
                quoted
            }
            Value::Stream(_) => "?".to_string(),
        }
    }
}

// Stream values are never equal to anything, not even a stream over the same
// bytes.  Row comparison during merges depends on this.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (&Value::Null, &Value::Null) => true,
            (&Value::Int(a), &Value::Int(b)) => a == b,
            (&Value::Str(ref a), &Value::Str(ref b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (&Value::Null, &Value::Null) => Some(Ordering::Equal),
            (&Value::Null, &Value::Int(_))
            | (&Value::Null, &Value::Str(_))
            | (&Value::Int(_), &Value::Str(_)) => Some(Ordering::Less),
            (&Value::Int(_), &Value::Null)
            | (&Value::Str(_), &Value::Null)
            | (&Value::Str(_), &Value::Int(_)) => Some(Ordering::Greater),
            (&Value::Int(a), &Value::Int(b)) => a.partial_cmp(&b),
            (&Value::Str(ref a), &Value::Str(ref b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Null => formatter.write_str("NULL"),
            Value::Int(number) => number.fmt(formatter),
            Value::Str(ref string) => formatter.write_str(string),
            Value::Stream(ref stream) => {
                write!(formatter, "<stream of {} bytes>", stream.len())
            }
        }
    }
}

impl From<i16> for Value {
    fn from(integer: i16) -> Value {
        Value::Int(integer as i32)
    }
}

impl From<i32> for Value {
    fn from(integer: i32) -> Value {
        Value::Int(integer)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(string: &'a str) -> Value {
        Value::Str(string.to_string())
    }
}

impl From<String> for Value {
    fn from(string: String) -> Value {
        Value::Str(string)
    }
}

impl From<StreamHandle> for Value {
    fn from(stream: StreamHandle) -> Value {
        Value::Stream(stream)
    }
}

// ========================================================================= //


// ========================================================================= //
