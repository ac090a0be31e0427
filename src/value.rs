//! Bind values carried by serialized queries

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType};

/// A constant that is either bound as a parameter or inlined as a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `null`
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value, narrowed on bind when the parameter type is smaller
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Render the value as an SQL literal
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) if f.is_nan() => "'NaN'".to_string(),
            Self::Float(f) if f.is_infinite() => {
                if f.is_sign_positive() { "'Infinity'" } else { "'-Infinity'" }.to_string()
            }
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Numeric view used when folding constant arithmetic
    #[must_use]
    pub const fn as_number(&self) -> Option<Number> {
        match self {
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }
}

/// Numeric operand of a folded expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer operand
    Int(i64),
    /// Floating point operand
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Apply an arithmetic operator, `None` on overflow or integer division by zero
    #[must_use]
    pub fn apply(self, symbol: char, rhs: Self) -> Option<Value> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => {
                let folded = match symbol {
                    '+' => a.checked_add(b),
                    '-' => a.checked_sub(b),
                    '*' => a.checked_mul(b),
                    '/' => a.checked_div(b),
                    _ => None,
                }?;
                Some(Value::Int(folded))
            }
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                let folded = match symbol {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' => a / b,
                    _ => return None,
                };
                folded.is_finite().then_some(Value::Float(folded))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn wrong_type(ty: &Type) -> Box<dyn Error + Sync + Send> {
    Box::new(WrongType::new::<Value>(ty.clone()))
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(b) if *ty == Type::BOOL => b.to_sql(ty, out),
            Self::Int(i) if *ty == Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
            Self::Int(i) if *ty == Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
            Self::Int(i) if *ty == Type::INT8 => i.to_sql(ty, out),
            Self::Int(i) if <String as ToSql>::accepts(ty) => i.to_string().to_sql(ty, out),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(f) if *ty == Type::FLOAT4 => (*f as f32).to_sql(ty, out),
            Self::Float(f) if *ty == Type::FLOAT8 => f.to_sql(ty, out),
            Self::Text(s) if <String as ToSql>::accepts(ty) => s.to_sql(ty, out),
            _ => Err(wrong_type(ty)),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <bool as ToSql>::accepts(ty)
            || <i16 as ToSql>::accepts(ty)
            || <i32 as ToSql>::accepts(ty)
            || <i64 as ToSql>::accepts(ty)
            || <f32 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <String as ToSql>::accepts(ty)
    }

    // `null` binds to a parameter of any type
    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            _ if Self::accepts(ty) => self.to_sql(ty, out),
            _ => Err(wrong_type(ty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_literal_escapes_quotes() {
        assert_eq!(Value::from("O'Hara").to_literal(), "'O''Hara'");
    }

    #[test]
    fn test_non_finite_float_literals_are_quoted() {
        assert_eq!(Value::Float(f64::NAN).to_literal(), "'NaN'");
        assert_eq!(Value::Float(f64::INFINITY).to_literal(), "'Infinity'");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_literal(), "'-Infinity'");
        assert_eq!(Value::Float(2.5).to_literal(), "2.5");
    }

    #[test]
    fn test_bind_narrows_to_parameter_type() {
        let mut out = BytesMut::new();
        Value::Int(7).to_sql_checked(&Type::INT4, &mut out).unwrap();
        assert_eq!(out.len(), 4);

        let mut out = BytesMut::new();
        Value::Int(7).to_sql_checked(&Type::VARCHAR, &mut out).unwrap();
        assert_eq!(&out[..], b"7");

        let mut out = BytesMut::new();
        assert!(Value::Int(70_000)
            .to_sql_checked(&Type::INT2, &mut out)
            .is_err());
    }

    #[test]
    fn test_unhandled_parameter_types_are_rejected() {
        assert!(!Value::accepts(&Type::NUMERIC));
        assert!(Value::accepts(&Type::INT8));

        let mut out = BytesMut::new();
        let err = Value::Int(5)
            .to_sql_checked(&Type::NUMERIC, &mut out)
            .err().unwrap();
        assert!(err.is::<WrongType>());
        let err = Value::Float(1.5)
            .to_sql_checked(&Type::INT8, &mut out)
            .err().unwrap();
        assert!(err.is::<WrongType>());
        let err = Value::Text("x".to_string())
            .to_sql_checked(&Type::BOOL, &mut out)
            .err().unwrap();
        assert!(err.is::<WrongType>());
        assert!(out.is_empty());

        assert!(matches!(
            Value::Null.to_sql_checked(&Type::NUMERIC, &mut out),
            Ok(IsNull::Yes)
        ));
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
    }

    #[test]
    fn test_integer_folding_checks_overflow() {
        assert_eq!(Number::Int(2).apply('+', Number::Int(3)), Some(Value::Int(5)));
        assert_eq!(Number::Int(i64::MAX).apply('+', Number::Int(1)), None);
        assert_eq!(Number::Int(1).apply('/', Number::Int(0)), None);
        assert_eq!(
            Number::Int(1).apply('*', Number::Float(2.5)),
            Some(Value::Float(2.5))
        );
    }
}
