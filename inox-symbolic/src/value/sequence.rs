use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::object::PropertyMap;
use super::{join_values, AbstractKind, ObjectValue, Value, ANY_BOOL, ANY_INT, ANY_RUNE, ANY_STR};

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceShape {
    /// Every element is known, the length is statically known.
    Known(Vec<Value>),
    /// Any number of elements, each represented by the given value.
    Generic(Value),
}

/// Shape shared by lists and tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceValue {
    pub shape: SequenceShape,
}

impl SequenceValue {
    pub fn generic(element: Value) -> Self {
        Self {
            shape: SequenceShape::Generic(element),
        }
    }

    pub fn known(elements: Vec<Value>) -> Self {
        Self {
            shape: SequenceShape::Known(elements),
        }
    }

    pub fn elements(&self) -> Option<&[Value]> {
        match &self.shape {
            SequenceShape::Known(elements) => Some(elements),
            SequenceShape::Generic(_) => None,
        }
    }

    pub fn element(&self) -> Value {
        match &self.shape {
            SequenceShape::Known(elements) if elements.is_empty() => Value::Never,
            SequenceShape::Known(elements) => join_values(elements.iter().cloned()),
            SequenceShape::Generic(element) => element.clone(),
        }
    }

    pub fn all(&self, predicate: impl Fn(&Value) -> bool) -> bool {
        match &self.shape {
            SequenceShape::Known(elements) => elements.iter().all(predicate),
            SequenceShape::Generic(element) => predicate(element),
        }
    }

    pub fn test(&self, other: &SequenceValue) -> bool {
        match (&self.shape, &other.shape) {
            (SequenceShape::Generic(element), SequenceShape::Generic(other_element)) => {
                element.test(other_element)
            }
            (SequenceShape::Generic(element), SequenceShape::Known(elements)) => {
                elements.iter().all(|other_element| element.test(other_element))
            }
            (SequenceShape::Known(elements), SequenceShape::Known(other_elements)) => {
                elements.len() == other_elements.len()
                    && elements
                        .iter()
                        .zip(other_elements)
                        .all(|(element, other_element)| element.test(other_element))
            }
            (SequenceShape::Known(_), SequenceShape::Generic(_)) => false,
        }
    }

    pub(super) fn fmt_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        any_name: &str,
    ) -> fmt::Result {
        match &self.shape {
            SequenceShape::Known(elements) => {
                write!(f, "{prefix}[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            SequenceShape::Generic(Value::Any) => f.write_str(any_name),
            SequenceShape::Generic(element) => write!(f, "{prefix}[]{element}"),
        }
    }
}

impl Value {
    pub fn is_indexable(&self) -> bool {
        match self {
            Value::Any
            | Value::List(_)
            | Value::Tuple(_)
            | Value::Str(_)
            | Value::Bytes
            | Value::IntRange => true,
            Value::Abstract(kind) => matches!(
                kind,
                AbstractKind::Indexable | AbstractKind::Sequence | AbstractKind::StringLike
            ),
            Value::Multi(multi) => multi.values().iter().all(Value::is_indexable),
            _ => false,
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.is_indexable()
    }

    pub fn is_mutable_sequence(&self) -> bool {
        match self {
            Value::Any | Value::List(_) | Value::Bytes => true,
            Value::Multi(multi) => multi.values().iter().all(Value::is_mutable_sequence),
            _ => false,
        }
    }

    /// Value of any element, `None` when the value is not indexable.
    pub fn element(&self) -> Option<Value> {
        match self {
            Value::List(sequence) | Value::Tuple(sequence) => Some(sequence.element()),
            Value::Str(_) | Value::Abstract(AbstractKind::StringLike) => Some(ANY_RUNE),
            Value::Bytes | Value::IntRange => Some(ANY_INT),
            Value::Any | Value::Abstract(AbstractKind::Indexable | AbstractKind::Sequence) => {
                Some(Value::Any)
            }
            Value::Multi(multi) => {
                let mut elements = Vec::new();
                for member in multi.values() {
                    elements.push(member.element()?);
                }
                Some(join_values(elements))
            }
            _ => None,
        }
    }

    pub fn element_at(&self, index: usize) -> Option<Value> {
        match self {
            Value::List(sequence) | Value::Tuple(sequence) => match sequence.elements() {
                Some(elements) => elements.get(index).cloned(),
                None => Some(sequence.element()),
            },
            _ => self.element(),
        }
    }

    pub fn known_len(&self) -> Option<usize> {
        match self {
            Value::List(sequence) | Value::Tuple(sequence) => {
                sequence.elements().map(<[Value]>::len)
            }
            Value::Str(Some(string)) => Some(string.len()),
            Value::KeyList(Some(keys)) => Some(keys.len()),
            _ => None,
        }
    }

    /// Key and value types of an iteration over the value, `None` when it is not iterable.
    pub fn iteration_types(&self) -> Option<(Value, Value)> {
        match self {
            Value::Any => Some((Value::Any, Value::Any)),
            Value::List(sequence) | Value::Tuple(sequence) => Some((ANY_INT, sequence.element())),
            Value::Str(_) | Value::Abstract(AbstractKind::StringLike) => Some((ANY_INT, ANY_RUNE)),
            Value::Bytes | Value::IntRange => Some((ANY_INT, ANY_INT)),
            Value::KeyList(_) => Some((ANY_INT, ANY_STR)),
            Value::Object(object) => Some((ANY_STR, property_values(&object.properties))),
            Value::Record(record) => Some((ANY_STR, property_values(&record.properties))),
            Value::Dictionary(dictionary) => {
                Some((dictionary.key_type(), dictionary.value_type()))
            }
            Value::Abstract(AbstractKind::Indexable | AbstractKind::Sequence) => {
                Some((ANY_INT, Value::Any))
            }
            Value::Abstract(AbstractKind::Iterable) => Some((Value::Any, Value::Any)),
            Value::Multi(multi) => {
                let mut keys = Vec::new();
                let mut values = Vec::new();
                for member in multi.values() {
                    let (key, value) = member.iteration_types()?;
                    keys.push(key);
                    values.push(value);
                }
                Some((join_values(keys), join_values(values)))
            }
            _ => None,
        }
    }

    /// Value of the entries produced by walking the value.
    pub fn walk_entry(&self) -> Option<Value> {
        match self {
            Value::Path(_) => {
                let entries = BTreeMap::from([
                    ("is_dir".to_string(), ANY_BOOL),
                    ("name".to_string(), ANY_STR),
                    ("path".to_string(), Value::Path(None)),
                ]);
                Some(Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(
                    entries,
                )))))
            }
            Value::Any | Value::Abstract(AbstractKind::Walkable) => Some(Value::Any),
            Value::Multi(multi) => {
                let mut entries = Vec::new();
                for member in multi.values() {
                    entries.push(member.walk_entry()?);
                }
                Some(join_values(entries))
            }
            _ => None,
        }
    }

    /// Result of slicing the value.
    pub fn slice_result(&self) -> Option<Value> {
        match self {
            Value::List(sequence) => Some(Value::list_of(sequence.element().widest_of_type())),
            Value::Tuple(sequence) => Some(Value::tuple_of(sequence.element().widest_of_type())),
            Value::Str(_) | Value::Abstract(AbstractKind::StringLike) => Some(ANY_STR),
            Value::Bytes => Some(Value::Bytes),
            Value::IntRange => Some(Value::IntRange),
            Value::Any | Value::Abstract(AbstractKind::Sequence | AbstractKind::Indexable) => {
                Some(Value::Any)
            }
            Value::Multi(multi) => {
                let mut slices = Vec::new();
                for member in multi.values() {
                    slices.push(member.slice_result()?);
                }
                Some(join_values(slices))
            }
            _ => None,
        }
    }

    /// Copy of a sequence with a known element replaced, used by narrowing.
    pub fn with_element_replaced(&self, index: usize, value: Value) -> Option<Value> {
        let (sequence, is_list) = match self {
            Value::List(sequence) => (sequence, true),
            Value::Tuple(sequence) => (sequence, false),
            _ => return None,
        };
        let mut elements = sequence.elements()?.to_vec();
        *elements.get_mut(index)? = value;
        Some(if is_list {
            Value::list(elements)
        } else {
            Value::tuple(elements)
        })
    }
}

fn property_values(properties: &PropertyMap) -> Value {
    match &properties.entries {
        Some(entries) if !entries.is_empty() => join_values(entries.values().cloned()),
        Some(_) => Value::Never,
        None => Value::Any,
    }
}
