use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The literal does not parse as the attribute's declared type.
    Invalid { attribute: String, value: String, expected: &'static str },
    /// The attribute cannot be assigned from a literal at all.
    Unsupported { attribute: String, reason: String },
}

impl CoercionError {
    pub fn invalid(attribute: &str, value: &str, expected: &'static str) -> Self {
        CoercionError::Invalid { attribute: attribute.to_string(), value: value.to_string(), expected }
    }

    pub fn unsupported(attribute: &str, reason: impl Into<String>) -> Self {
        CoercionError::Unsupported { attribute: attribute.to_string(), reason: reason.into() }
    }

    pub fn attribute(&self) -> &str {
        match self {
            CoercionError::Invalid { attribute, .. } | CoercionError::Unsupported { attribute, .. } => attribute,
        }
    }
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionError::Invalid { attribute, value, expected } => {
                write!(f, "cannot convert '{}' to {} for attribute '{}'", value, expected, attribute)
            }
            CoercionError::Unsupported { attribute, reason } => {
                write!(f, "attribute '{}' cannot be set: {}", attribute, reason)
            }
        }
    }
}

impl std::error::Error for CoercionError {}
