//! Symbolic values: abstract representations of sets of runtime values.
//!
//! A value carrying a payload (`Int(Some(1))`) stands for exactly that runtime
//! value, a value without one (`Int(None)`) stands for every value of its shape.
//! [`Value::test`] is the containment check the whole evaluator relies on:
//! `a.test(b)` holds when every runtime value represented by `b` is also
//! represented by `a`.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::pattern::{Pattern, PatternNamespace};

mod function;
mod multivalue;
mod object;
mod sequence;

pub use function::{FunctionValue, HostFunction};
pub use multivalue::{join_values, merge_same_static_type, narrow_out, Multivalue};
pub use object::{DictionaryValue, PropertyLookup, PropertyMap, SetPropertyError};
pub use object::{ObjectValue, RecordValue};
pub use sequence::{SequenceShape, SequenceValue};

pub const ANY: Value = Value::Any;
pub const NEVER: Value = Value::Never;
pub const NIL: Value = Value::Nil;
pub const ANY_BOOL: Value = Value::Bool(None);
pub const ANY_INT: Value = Value::Int(None);
pub const ANY_FLOAT: Value = Value::Float(None);
pub const ANY_RUNE: Value = Value::Rune(None);
pub const ANY_STR: Value = Value::Str(None);
pub const ANY_PATH: Value = Value::Path(None);
pub const ANY_URL: Value = Value::Url(None);
pub const ANY_HOST: Value = Value::Host(None);
pub const ANY_FUNCTION: Value = Value::Function(None);
pub const ANY_PATTERN: Value = Value::Pattern(Pattern::Any);
pub const ANY_SERIALIZABLE: Value = Value::Abstract(AbstractKind::Serializable);
pub const ANY_ITERABLE: Value = Value::Abstract(AbstractKind::Iterable);
pub const ANY_INDEXABLE: Value = Value::Abstract(AbstractKind::Indexable);

pub static ANY_OBJECT: Lazy<Value> = Lazy::new(|| Value::Object(Arc::new(ObjectValue::any())));
pub static ANY_RECORD: Lazy<Value> = Lazy::new(|| Value::Record(Arc::new(RecordValue::any())));
pub static ANY_LIST: Lazy<Value> = Lazy::new(|| Value::list_of(Value::Any));
pub static ANY_TUPLE: Lazy<Value> = Lazy::new(|| Value::tuple_of(Value::Any));
pub static ANY_DICTIONARY: Lazy<Value> =
    Lazy::new(|| Value::Dictionary(Arc::new(DictionaryValue::any())));

/// Shapes that are only known through a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbstractKind {
    Iterable,
    Indexable,
    Sequence,
    Serializable,
    Walkable,
    StringLike,
}

impl AbstractKind {
    fn accepts(self, value: &Value) -> bool {
        if matches!(value, Value::Any) {
            return false;
        }
        if let Value::Abstract(other) = value {
            return self == *other
                || matches!(
                    (self, other),
                    (AbstractKind::Iterable, AbstractKind::Sequence)
                        | (AbstractKind::Indexable, AbstractKind::Sequence)
                        | (AbstractKind::Iterable, AbstractKind::Indexable)
                        | (AbstractKind::Serializable, AbstractKind::StringLike)
                        | (AbstractKind::Sequence, AbstractKind::StringLike)
                        | (AbstractKind::Indexable, AbstractKind::StringLike)
                        | (AbstractKind::Iterable, AbstractKind::StringLike)
                );
        }
        match self {
            AbstractKind::Iterable => value.iteration_types().is_some(),
            AbstractKind::Indexable => value.is_indexable(),
            AbstractKind::Sequence => value.is_sequence(),
            AbstractKind::Serializable => value.is_serializable(),
            AbstractKind::Walkable => value.is_walkable(),
            AbstractKind::StringLike => value.is_string_like(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            AbstractKind::Iterable => "iterable",
            AbstractKind::Indexable => "indexable",
            AbstractKind::Sequence => "sequence",
            AbstractKind::Serializable => "serializable",
            AbstractKind::Walkable => "walkable",
            AbstractKind::StringLike => "string-like",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Any,
    Never,
    Nil,
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Rune(Option<char>),
    Str(Option<Arc<str>>),
    Path(Option<Arc<str>>),
    Url(Option<Arc<str>>),
    Host(Option<Arc<str>>),
    Scheme(Option<Arc<str>>),
    /// Quantity of a given unit, any unit when `None`.
    Quantity(Option<Arc<str>>),
    Rate(Option<Arc<str>>),
    Bytes,
    IntRange,
    List(Arc<SequenceValue>),
    Tuple(Arc<SequenceValue>),
    Object(Arc<ObjectValue>),
    Record(Arc<RecordValue>),
    Dictionary(Arc<DictionaryValue>),
    KeyList(Option<Arc<[String]>>),
    Function(Option<Arc<FunctionValue>>),
    HostFunction(Arc<HostFunction>),
    Pattern(Pattern),
    PatternNamespace(Arc<PatternNamespace>),
    /// Secret created from the secret pattern defined by the given node, any secret when `None`.
    Secret(Option<crate::ast::NodeId>),
    Routine,
    RoutineGroup,
    LifetimeJob,
    TestSuite,
    TestCase,
    Mapping,
    Abstract(AbstractKind),
    Multi(Arc<Multivalue>),
}

impl Value {
    pub fn str(value: &str) -> Value {
        Value::Str(Some(Arc::from(value)))
    }

    pub fn list_of(element: Value) -> Value {
        Value::List(Arc::new(SequenceValue::generic(element)))
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Arc::new(SequenceValue::known(elements)))
    }

    pub fn tuple_of(element: Value) -> Value {
        Value::Tuple(Arc::new(SequenceValue::generic(element)))
    }

    pub fn tuple(elements: Vec<Value>) -> Value {
        Value::Tuple(Arc::new(SequenceValue::known(elements)))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Value::Any)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Value::Never)
    }

    /// Whether the value stands for exactly one runtime value.
    pub fn has_concrete_payload(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Bool(v) => v.is_some(),
            Value::Int(v) => v.is_some(),
            Value::Float(v) => v.is_some(),
            Value::Rune(v) => v.is_some(),
            Value::Str(v)
            | Value::Path(v)
            | Value::Url(v)
            | Value::Host(v)
            | Value::Scheme(v) => v.is_some(),
            _ => false,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Value::Pattern(pattern) => Some(pattern),
            _ => None,
        }
    }

    pub fn members(&self) -> &[Value] {
        match self {
            Value::Multi(multi) => multi.values(),
            other => std::slice::from_ref(other),
        }
    }

    /// Containment check: every runtime value represented by `other` is represented by `self`.
    pub fn test(&self, other: &Value) -> bool {
        if matches!(other, Value::Never) {
            return true;
        }
        match (self, other) {
            (Value::Multi(own), Value::Multi(theirs)) => {
                return theirs
                    .values()
                    .iter()
                    .all(|value| own.values().iter().any(|member| member.test(value)))
            }
            (Value::Multi(own), _) => {
                return own.values().iter().any(|member| member.test(other))
            }
            (_, Value::Multi(theirs)) => {
                return theirs.values().iter().all(|value| self.test(value))
            }
            _ => {}
        }

        match (self, other) {
            (Value::Any, _) => true,
            (Value::Never, _) => false,
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(expected), Value::Bool(actual)) => scalar_test(expected, actual),
            (Value::Int(expected), Value::Int(actual)) => scalar_test(expected, actual),
            (Value::Float(expected), Value::Float(actual)) => scalar_test(expected, actual),
            (Value::Rune(expected), Value::Rune(actual)) => scalar_test(expected, actual),
            (Value::Str(expected), Value::Str(actual))
            | (Value::Path(expected), Value::Path(actual))
            | (Value::Url(expected), Value::Url(actual))
            | (Value::Host(expected), Value::Host(actual))
            | (Value::Scheme(expected), Value::Scheme(actual))
            | (Value::Quantity(expected), Value::Quantity(actual))
            | (Value::Rate(expected), Value::Rate(actual)) => scalar_test(expected, actual),
            (Value::Bytes, Value::Bytes) | (Value::IntRange, Value::IntRange) => true,
            (Value::List(expected), Value::List(actual))
            | (Value::Tuple(expected), Value::Tuple(actual)) => expected.test(actual),
            (Value::Object(expected), Value::Object(actual)) => expected.test(actual),
            (Value::Record(expected), Value::Record(actual)) => expected.test(actual),
            (Value::Dictionary(expected), Value::Dictionary(actual)) => expected.test(actual),
            (Value::KeyList(None), Value::KeyList(_)) => true,
            (Value::KeyList(Some(expected)), Value::KeyList(Some(actual))) => expected == actual,
            (Value::Function(None), Value::Function(_) | Value::HostFunction(_)) => true,
            (Value::Function(Some(expected)), Value::Function(Some(actual))) => {
                expected.node.id == actual.node.id
            }
            (Value::HostFunction(expected), Value::HostFunction(actual)) => {
                expected.name == actual.name
            }
            (Value::Pattern(expected), Value::Pattern(actual)) => expected.test(actual),
            (Value::PatternNamespace(expected), Value::PatternNamespace(actual)) => {
                expected == actual
            }
            (Value::Secret(None), Value::Secret(_)) => true,
            (Value::Secret(Some(expected)), Value::Secret(Some(actual))) => expected == actual,
            (Value::Routine, Value::Routine)
            | (Value::RoutineGroup, Value::RoutineGroup)
            | (Value::LifetimeJob, Value::LifetimeJob)
            | (Value::TestSuite, Value::TestSuite)
            | (Value::TestCase, Value::TestCase)
            | (Value::Mapping, Value::Mapping) => true,
            (Value::Abstract(kind), _) => kind.accepts(other),
            _ => false,
        }
    }

    pub fn is_mutable(&self) -> bool {
        match self {
            Value::Any => true,
            Value::List(_) | Value::Object(_) | Value::Dictionary(_) | Value::Bytes => true,
            Value::Function(Some(function)) => function.captures_mutable_values(),
            Value::Routine | Value::RoutineGroup | Value::LifetimeJob => true,
            Value::Abstract(kind) => !matches!(kind, AbstractKind::StringLike),
            Value::Multi(multi) => multi.values().iter().any(Value::is_mutable),
            _ => false,
        }
    }

    pub fn is_serializable(&self) -> bool {
        match self {
            Value::HostFunction(_)
            | Value::Routine
            | Value::RoutineGroup
            | Value::LifetimeJob
            | Value::TestSuite
            | Value::TestCase
            | Value::Mapping
            | Value::Secret(_)
            | Value::PatternNamespace(_) => false,
            Value::List(sequence) | Value::Tuple(sequence) => sequence.all(Value::is_serializable),
            Value::Object(object) => object.properties.all(Value::is_serializable),
            Value::Record(record) => record.properties.all(Value::is_serializable),
            Value::Dictionary(dictionary) => dictionary.all_values(Value::is_serializable),
            Value::Pattern(pattern) => pattern.is_serializable(),
            Value::Multi(multi) => multi.values().iter().all(Value::is_serializable),
            _ => true,
        }
    }

    /// Mutable values that can be observed for mutations.
    pub fn is_watchable(&self) -> bool {
        match self {
            Value::Object(_) | Value::List(_) | Value::Dictionary(_) => true,
            Value::Any | Value::Abstract(_) => true,
            Value::Multi(multi) => multi.values().iter().all(Value::is_watchable),
            _ => false,
        }
    }

    pub fn is_sharable(&self) -> bool {
        match self {
            Value::Object(object) => object.shared || object.properties.all(Value::is_sharable),
            Value::Function(_) | Value::HostFunction(_) => true,
            Value::Any | Value::Abstract(_) => true,
            Value::Multi(multi) => multi.values().iter().all(Value::is_sharable),
            other => !other.is_mutable(),
        }
    }

    pub fn is_string_like(&self) -> bool {
        match self {
            Value::Str(_) | Value::Abstract(AbstractKind::StringLike) => true,
            Value::Multi(multi) => multi.values().iter().all(Value::is_string_like),
            _ => false,
        }
    }

    pub fn is_walkable(&self) -> bool {
        match self {
            Value::Any | Value::Path(_) | Value::Abstract(AbstractKind::Walkable) => true,
            Value::Multi(multi) => multi.values().iter().all(Value::is_walkable),
            _ => false,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_) | Value::HostFunction(_) | Value::Any => true,
            Value::Pattern(Pattern::Secret(_)) => true,
            _ => false,
        }
    }

    /// Most general value sharing the shape of `self`.
    pub fn widest_of_type(&self) -> Value {
        match self {
            Value::Bool(_) => ANY_BOOL,
            Value::Int(_) => ANY_INT,
            Value::Float(_) => ANY_FLOAT,
            Value::Rune(_) => ANY_RUNE,
            Value::Str(_) => ANY_STR,
            Value::Path(_) => ANY_PATH,
            Value::Url(_) => ANY_URL,
            Value::Host(_) => ANY_HOST,
            Value::Scheme(_) => Value::Scheme(None),
            Value::KeyList(_) => Value::KeyList(None),
            Value::Function(_) => ANY_FUNCTION,
            Value::List(_) => ANY_LIST.clone(),
            Value::Tuple(_) => ANY_TUPLE.clone(),
            Value::Object(_) => ANY_OBJECT.clone(),
            Value::Record(_) => ANY_RECORD.clone(),
            Value::Dictionary(_) => ANY_DICTIONARY.clone(),
            Value::Pattern(_) => ANY_PATTERN,
            Value::Multi(multi) => join_values(multi.values().iter().map(Value::widest_of_type)),
            other => other.clone(),
        }
    }

    /// One widening step, `None` when the value cannot be widened further without becoming ANY.
    pub fn widen(&self) -> Option<Value> {
        if let Value::Multi(multi) = self {
            let widened = join_values(multi.values().iter().map(|value| {
                value
                    .widen()
                    .unwrap_or_else(|| value.clone())
            }));
            return (&widened != self).then_some(widened);
        }
        let widest = self.widest_of_type();
        (&widest != self).then_some(widest)
    }

    pub fn widen_or_any(&self) -> Value {
        self.widen().unwrap_or(Value::Any)
    }

    /// Widens step by step until `accepts` holds, `None` when no widening is accepted.
    pub fn widen_until(&self, accepts: impl Fn(&Value) -> bool) -> Option<Value> {
        let mut widened = self.clone();
        loop {
            if accepts(&widened) {
                return Some(widened);
            }
            widened = widened.widen()?;
        }
    }
}

fn scalar_test<T: PartialEq>(expected: &Option<T>, actual: &Option<T>) -> bool {
    match (expected, actual) {
        (None, _) => true,
        (Some(expected), Some(actual)) => expected == actual,
        (Some(_), None) => false,
    }
}

fn write_scalar<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    value: &Option<T>,
    type_name: &str,
) -> fmt::Result {
    match value {
        Some(value) => write!(f, "{value}"),
        None => f.write_str(type_name),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Any => f.write_str("any"),
            Value::Never => f.write_str("never"),
            Value::Nil => f.write_str("nil"),
            Value::Bool(value) => write_scalar(f, value, "bool"),
            Value::Int(value) => write_scalar(f, value, "int"),
            Value::Float(value) => write_scalar(f, value, "float"),
            Value::Rune(Some(rune)) => write!(f, "'{rune}'"),
            Value::Rune(None) => f.write_str("rune"),
            Value::Str(Some(string)) => write!(f, "{string:?}"),
            Value::Str(None) => f.write_str("string"),
            Value::Path(value) => write_scalar(f, value, "path"),
            Value::Url(value) => write_scalar(f, value, "url"),
            Value::Host(value) => write_scalar(f, value, "host"),
            Value::Scheme(value) => write_scalar(f, value, "scheme"),
            Value::Quantity(Some(unit)) => write!(f, "quantity({unit})"),
            Value::Quantity(None) => f.write_str("quantity"),
            Value::Rate(Some(unit)) => write!(f, "rate({unit})"),
            Value::Rate(None) => f.write_str("rate"),
            Value::Bytes => f.write_str("byte-slice"),
            Value::IntRange => f.write_str("int-range"),
            Value::List(list) => list.fmt_with(f, "", "list"),
            Value::Tuple(tuple) => tuple.fmt_with(f, "#", "tuple"),
            Value::Object(object) => object.properties.fmt_with(f, "", "object"),
            Value::Record(record) => record.properties.fmt_with(f, "#", "record"),
            Value::Dictionary(dictionary) => write!(f, "{dictionary}"),
            Value::KeyList(Some(keys)) => write!(f, ".{{{}}}", keys.join(", ")),
            Value::KeyList(None) => f.write_str("key-list"),
            Value::Function(Some(function)) => write!(f, "{function}"),
            Value::Function(None) => f.write_str("function"),
            Value::HostFunction(function) => write!(f, "{function}"),
            Value::Pattern(pattern) => write!(f, "{pattern}"),
            Value::PatternNamespace(namespace) => write!(f, "{namespace}"),
            Value::Secret(_) => f.write_str("secret"),
            Value::Routine => f.write_str("routine"),
            Value::RoutineGroup => f.write_str("routine-group"),
            Value::LifetimeJob => f.write_str("lifetime-job"),
            Value::TestSuite => f.write_str("test-suite"),
            Value::TestCase => f.write_str("test-case"),
            Value::Mapping => f.write_str("mapping"),
            Value::Abstract(kind) => f.write_str(kind.name()),
            Value::Multi(multi) => write!(f, "{multi}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_contained_in_its_type() {
        assert!(ANY_INT.test(&Value::Int(Some(1))));
        assert!(!Value::Int(Some(1)).test(&ANY_INT));
        assert!(Value::Int(Some(1)).test(&Value::Int(Some(1))));
        assert!(!ANY_INT.test(&ANY_FLOAT));
        assert!(ANY.test(&ANY_OBJECT));
        assert!(!ANY_INT.test(&ANY));
    }

    #[test]
    fn widening_reaches_type_then_stops() {
        let literal = Value::str("a");
        assert_eq!(literal.widen(), Some(ANY_STR));
        assert_eq!(ANY_STR.widen(), None);
        assert_eq!(ANY_STR.widen_or_any(), ANY);
    }

    #[test]
    fn abstract_kinds_accept_capable_values() {
        assert!(ANY_ITERABLE.test(&ANY_LIST));
        assert!(ANY_ITERABLE.test(&ANY_STR));
        assert!(!ANY_ITERABLE.test(&ANY_INT));
        assert!(!ANY_ITERABLE.test(&ANY));
        assert!(ANY_SERIALIZABLE.test(&ANY_OBJECT));
        assert!(!ANY_SERIALIZABLE.test(&Value::Routine));
    }

    #[test]
    fn display_uses_checker_vocabulary() {
        assert_eq!(ANY_INT.to_string(), "int");
        assert_eq!(Value::Int(Some(3)).to_string(), "3");
        assert_eq!(Value::str("a").to_string(), "\"a\"");
        assert_eq!(ANY_OBJECT.to_string(), "object");
        assert_eq!(Value::list(vec![ANY_INT, ANY_STR]).to_string(), "[int, string]");
        assert_eq!(Value::list_of(ANY_INT).to_string(), "[]int");
    }

    #[test]
    fn mutability_and_watchability() {
        assert!(ANY_LIST.is_mutable());
        assert!(!ANY_TUPLE.is_mutable());
        assert!(Value::Bytes.is_mutable());
        assert!(!Value::Bytes.is_watchable());
        assert!(ANY_OBJECT.is_watchable());
        assert!(!Value::Routine.is_serializable());
    }
}
