use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    ArgumentCount { function: &'static str, expected: usize, got: usize },
    NotNumeric { function: &'static str, value: String },
    MixedTypes { function: &'static str },
    Overflow { function: &'static str },
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::ArgumentCount { function, expected, got } =>
                write!(f, "{} expects {} argument(s), got {}", function, expected, got),
            AggregateError::NotNumeric { function, value } =>
                write!(f, "{} cannot aggregate non numeric value {}", function, value),
            AggregateError::MixedTypes { function } =>
                write!(f, "{} found values of different types in one group", function),
            AggregateError::Overflow { function } =>
                write!(f, "{} overflowed the decimal range", function),
        }
    }
}

impl std::error::Error for AggregateError {}
