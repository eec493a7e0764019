use serde::Serialize;
use std::fmt;

/// A raw reading from a metric source.
///
/// The variant records the width and signedness the source reported so that
/// deltas can be taken without assuming unsigned wraparound.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Unsigned(v) => Some(*v as f64),
            Self::Signed(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text(_))
    }

    /// Returns `self - previous` as a signed quantity. Integer deltas are
    /// taken in 128 bits so a counter that went backwards produces a
    /// negative delta rather than a huge wrapped one.
    pub fn delta(&self, previous: &Value) -> Option<f64> {
        match (self, previous) {
            (Self::Unsigned(c), Self::Unsigned(p)) => Some((*c as i128 - *p as i128) as f64),
            (Self::Signed(c), Self::Signed(p)) => Some((*c as i128 - *p as i128) as f64),
            (Self::Unsigned(c), Self::Signed(p)) => Some((*c as i128 - *p as i128) as f64),
            (Self::Signed(c), Self::Unsigned(p)) => Some((*c as i128 - *p as i128) as f64),
            (current, previous) => Some(current.as_f64()? - previous.as_f64()?),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Signed(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
