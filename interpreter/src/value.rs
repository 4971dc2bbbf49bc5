use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use losk_core::Literal;

use crate::callable::{Callable, CallableType, Instance};

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Callable(Rc<dyn Callable>),
    Instance(Rc<RefCell<Instance>>),
    Str(Rc<String>),
    Num(f64),
    Bool(bool),
    Nil,
}

impl Value {
    /// `nil`, `false` and the empty string are falsy, everything else is truthy. Numbers are
    /// always truthy, zero included.
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(val) => *val,
            Value::Str(val) => !val.is_empty(),
            Value::Num(_) | Value::Callable(_) | Value::Instance(_) => true,
        }
    }
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Str(val) => Value::Str(Rc::new(val)),
            Literal::Num(val) => Value::Num(val),
            Literal::Bool(val) => Value::Bool(val),
            Literal::Nil => Value::Nil,
        }
    }
}

impl From<&Literal> for Value {
    fn from(value: &Literal) -> Self {
        Value::from(value.clone())
    }
}

// Strings, numbers and booleans compare by value, callables and instances by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Callable(lhs), Value::Callable(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Instance(lhs), Value::Instance(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
            (Value::Num(lhs), Value::Num(rhs)) => lhs == rhs,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::new(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Rc::new(String::from(value)))
    }
}

macro_rules! impl_from_num_for_value {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Value {
                    Value::Num(n as f64)
                }
            }
        )*
    }
}

impl_from_num_for_value!(u8 i8 u16 i16 u32 i32 u64 i64 usize isize f32 f64);

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Callable(val) => match val.ty() {
                CallableType::Native => write!(f, "<native fn>"),
                CallableType::Function => write!(f, "<fn {}>", val.name()),
                CallableType::Class => write!(f, "{}", val.name()),
            },
            Value::Instance(instance) => {
                write!(f, "{}", RefCell::borrow(instance))
            }
            Value::Str(val) => write!(f, "{}", val),
            // f64 formatting already drops the fraction of integral values, "3" rather than "3.0"
            Value::Num(val) => write!(f, "{}", val),
            Value::Bool(val) => write!(f, "{}", val),
            Value::Nil => write!(f, "nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::value::Value;
    use losk_core::Literal;

    #[test]
    fn test_truthiness() {
        let tests = [
            (Value::Nil, false),
            (Value::from(false), false),
            (Value::from(true), true),
            (Value::from(0), true),
            (Value::from(-1.5), true),
            (Value::from(""), false),
            (Value::from("a"), true),
        ];

        for (value, expected) in tests {
            assert_eq!(value.is_truthy(), expected, "truthiness of {}", value);
        }
    }

    #[test]
    fn test_equality() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::from(false));
        assert_ne!(Value::from(0), Value::Nil);
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_ne!(Value::from("1"), Value::from(1));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-0.5).to_string(), "-0.5");
        assert_eq!(Value::from(Literal::Nil).to_string(), "nil");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from("raw text").to_string(), "raw text");
    }
}
