use ordered_float::NotNan;
use std::fmt::{self, Display};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(NotNan<f64>),
    Bool(bool),
    Null,
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Text form used for condition values and type coercion.
    /// `None` for NULL, which has no textual value.
    pub fn to_value_string(&self) -> Option<String> {
        match self {
            Literal::String(s) => Some(s.clone()),
            Literal::Int(i) => Some(i.to_string()),
            Literal::Float(f) => Some(f.into_inner().to_string()),
            Literal::Bool(b) => Some(if *b { "1".to_string() } else { "0".to_string() }),
            Literal::Null => None,
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(n) => write!(f, "{}", n.into_inner()),
            Literal::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(_) => write!(f, "String({})", self),
            Literal::Int(_) => write!(f, "Int({})", self),
            Literal::Float(_) => write!(f, "Float({})", self),
            Literal::Bool(_) => write!(f, "Bool({})", self),
            Literal::Null => write!(f, "Null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_strings_follow_platform_conventions() {
        assert_eq!(Literal::Int(42).to_value_string().as_deref(), Some("42"));
        assert_eq!(Literal::Float(NotNan::new(1.5).unwrap()).to_value_string().as_deref(), Some("1.5"));
        assert_eq!(Literal::Bool(true).to_value_string().as_deref(), Some("1"));
        assert_eq!(Literal::Bool(false).to_value_string().as_deref(), Some("0"));
        assert_eq!(Literal::String("O'Neil".into()).to_value_string().as_deref(), Some("O'Neil"));
        assert_eq!(Literal::Null.to_value_string(), None);
    }

    #[test]
    fn display_quotes_strings() {
        assert_eq!(Literal::String("O'Neil".into()).to_string(), "'O''Neil'");
        assert_eq!(Literal::Null.to_string(), "NULL");
    }
}
