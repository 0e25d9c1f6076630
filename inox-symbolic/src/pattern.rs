//! Patterns: symbolic values describing constraints over other values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::ast::NodeId;
use crate::value::{
    join_values, ObjectValue, PropertyMap, RecordValue, Value, ANY_PATH, ANY_STR,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Any,
    /// Matches the values contained in a widest-of-type value (`%int`, `%object`).
    Type(Arc<Value>),
    /// Matches values contained in one specific value.
    Exact(Arc<Value>),
    Object(Arc<ObjectPattern>),
    Record(Arc<ObjectPattern>),
    List(Arc<SequencePattern>),
    Tuple(Arc<SequencePattern>),
    Union(Arc<[Pattern]>),
    Optional(Arc<Pattern>),
    Secret(Arc<SecretPattern>),
    Regex(Option<Arc<str>>),
    PathPattern(Option<Arc<str>>),
}

impl Pattern {
    pub fn of_type(value: Value) -> Pattern {
        Pattern::Type(Arc::new(value.widest_of_type()))
    }

    pub fn exact(value: Value) -> Pattern {
        Pattern::Exact(Arc::new(value))
    }

    pub fn union(cases: Vec<Pattern>) -> Pattern {
        Pattern::Union(Arc::from(cases))
    }

    /// Does `value` match the pattern.
    pub fn test_value(&self, value: &Value) -> bool {
        match value {
            Value::Never => return true,
            Value::Multi(multi) => {
                return multi.values().iter().all(|member| self.test_value(member))
            }
            _ => {}
        }

        match self {
            Pattern::Any => true,
            Pattern::Type(expected) | Pattern::Exact(expected) => expected.test(value),
            Pattern::Union(cases) => cases.iter().any(|case| case.test_value(value)),
            Pattern::Optional(inner) => matches!(value, Value::Nil) || inner.test_value(value),
            Pattern::Secret(secret) => matches!(value, Value::Secret(Some(id)) if *id == secret.id),
            _ => self.symbolic_value().test(value),
        }
    }

    /// Is every value matched by `other` also matched by `self`.
    pub fn test(&self, other: &Pattern) -> bool {
        match (self, other) {
            (Pattern::Any, _) => true,
            (Pattern::Secret(own), Pattern::Secret(theirs)) => own.id == theirs.id,
            (_, Pattern::Union(cases)) => cases.iter().all(|case| self.test(case)),
            (_, Pattern::Optional(inner)) => self.test_value(&Value::Nil) && self.test(inner),
            _ => self.test_value(&other.symbolic_value()),
        }
    }

    /// Value representing every value matched by the pattern.
    pub fn symbolic_value(&self) -> Value {
        match self {
            Pattern::Any => Value::Any,
            Pattern::Type(value) | Pattern::Exact(value) => (**value).clone(),
            Pattern::Object(object) => {
                Value::Object(Arc::new(ObjectValue::new(object.property_map())))
            }
            Pattern::Record(record) => Value::Record(Arc::new(RecordValue {
                properties: record.property_map(),
            })),
            Pattern::List(sequence) => match &sequence.elements {
                Some(elements) => Value::list(elements.iter().map(Pattern::symbolic_value).collect()),
                None => Value::list_of(sequence.general_value()),
            },
            Pattern::Tuple(sequence) => match &sequence.elements {
                Some(elements) => {
                    Value::tuple(elements.iter().map(Pattern::symbolic_value).collect())
                }
                None => Value::tuple_of(sequence.general_value()),
            },
            Pattern::Union(cases) => join_values(cases.iter().map(Pattern::symbolic_value)),
            Pattern::Optional(inner) => join_values([inner.symbolic_value(), Value::Nil]),
            Pattern::Secret(secret) => Value::Secret(Some(secret.id)),
            Pattern::Regex(_) => ANY_STR,
            Pattern::PathPattern(_) => ANY_PATH,
        }
    }

    /// The value of everything the pattern matches, when that set is expressible as a value.
    /// `None` for patterns such as regexes whose symbolic value is wider than what they match.
    pub fn exact_match_set(&self) -> Option<Value> {
        match self {
            Pattern::Any => Some(Value::Any),
            Pattern::Type(value) => Some((**value).clone()),
            Pattern::Exact(value) if value.has_concrete_payload() => Some((**value).clone()),
            Pattern::Exact(_) => None,
            Pattern::Secret(secret) => Some(Value::Secret(Some(secret.id))),
            Pattern::Optional(inner) => {
                Some(join_values([inner.exact_match_set()?, Value::Nil]))
            }
            Pattern::Union(cases) => {
                let members = cases
                    .iter()
                    .map(Pattern::exact_match_set)
                    .collect::<Option<Vec<_>>>()?;
                Some(join_values(members))
            }
            Pattern::Object(_)
            | Pattern::Record(_)
            | Pattern::List(_)
            | Pattern::Tuple(_)
            | Pattern::Regex(_)
            | Pattern::PathPattern(_) => None,
        }
    }

    pub fn matches_nil(&self) -> bool {
        self.test_value(&Value::Nil)
    }

    pub fn is_serializable(&self) -> bool {
        !matches!(self, Pattern::Secret(_))
    }

    pub fn as_object_pattern(&self) -> Option<&ObjectPattern> {
        match self {
            Pattern::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Object of the groups captured on a successful match, `None` for patterns that do not
    /// capture groups. Path patterns capture their named segments (`/users/:id`), regex
    /// patterns their named groups.
    pub fn match_groups(&self) -> Option<Value> {
        let names: Vec<String> = match self {
            Pattern::PathPattern(Some(source)) => source
                .split('/')
                .filter_map(|segment| segment.strip_prefix(':'))
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            Pattern::Regex(Some(source)) => source
                .split("(?P<")
                .skip(1)
                .chain(source.split("(?<").skip(1))
                .filter_map(|rest| rest.split_once('>').map(|(name, _)| name))
                .filter(|name| !name.is_empty() && !name.starts_with(['=', '!']))
                .map(str::to_string)
                .collect(),
            _ => return None,
        };
        let mut groups: BTreeMap<String, Value> =
            names.into_iter().map(|name| (name, ANY_STR)).collect();
        groups.insert("0".to_string(), ANY_STR);
        Some(Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(groups)))))
    }
}

/// Entries of an object or record pattern. `entries == None` matches any object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectPattern {
    pub entries: Option<BTreeMap<String, Pattern>>,
    pub optional: BTreeSet<String>,
    pub exact: bool,
}

impl ObjectPattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches_any_object(&self) -> bool {
        self.entries.is_none()
    }

    pub fn entry(&self, name: &str) -> Option<&Pattern> {
        self.entries.as_ref().and_then(|entries| entries.get(name))
    }

    pub fn property_map(&self) -> PropertyMap {
        PropertyMap {
            entries: self.entries.as_ref().map(|entries| {
                entries
                    .iter()
                    .map(|(name, pattern)| (name.clone(), pattern.symbolic_value()))
                    .collect()
            }),
            optional: self.optional.clone(),
            exact: self.exact,
        }
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, prefix: &str, any_name: &str) -> fmt::Result {
        let Some(entries) = &self.entries else {
            return f.write_str(any_name);
        };
        write!(f, "{prefix}{{")?;
        for (index, (name, pattern)) in entries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let marker = if self.optional.contains(name) { "?" } else { "" };
            write!(f, "{name}{marker}: {pattern}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequencePattern {
    pub elements: Option<Vec<Pattern>>,
    pub general_element: Option<Pattern>,
}

impl SequencePattern {
    fn general_value(&self) -> Value {
        self.general_element
            .as_ref()
            .map_or(Value::Any, Pattern::symbolic_value)
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        match (&self.elements, &self.general_element) {
            (Some(elements), _) => {
                write!(f, "{prefix}[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
            (None, Some(general)) => write!(f, "{prefix}[]{general}"),
            (None, None) => write!(f, "{prefix}[]%any"),
        }
    }
}

/// Secret pattern; secrets only match the pattern instance they were created from.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretPattern {
    pub id: NodeId,
    pub string_pattern: Pattern,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("%any"),
            Pattern::Type(value) => write!(f, "%{value}"),
            Pattern::Exact(value) => write!(f, "%({value})"),
            Pattern::Object(object) => object.fmt_with(f, "%", "%object"),
            Pattern::Record(record) => record.fmt_with(f, "%#", "%record"),
            Pattern::List(sequence) => sequence.fmt_with(f, "%"),
            Pattern::Tuple(sequence) => sequence.fmt_with(f, "%#"),
            Pattern::Union(cases) => {
                f.write_str("%|")?;
                for (index, case) in cases.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" |")?;
                    }
                    write!(f, " {case}")?;
                }
                Ok(())
            }
            Pattern::Optional(inner) => write!(f, "{inner}?"),
            Pattern::Secret(secret) => write!(f, "%secret({})", secret.string_pattern),
            Pattern::Regex(Some(source)) => write!(f, "%`{source}`"),
            Pattern::Regex(None) => f.write_str("%regex"),
            Pattern::PathPattern(Some(source)) => write!(f, "%{source}"),
            Pattern::PathPattern(None) => f.write_str("%path-pattern"),
        }
    }
}

/// Named group of patterns (`%ns.member`).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternNamespace {
    pub name: String,
    pub patterns: BTreeMap<String, Pattern>,
}

impl PatternNamespace {
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.patterns.keys().cloned().collect()
    }
}

impl fmt::Display for PatternNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}.", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ANY_INT, ANY_STR};

    fn object_pattern(entries: &[(&str, Pattern)], exact: bool) -> Pattern {
        Pattern::Object(Arc::new(ObjectPattern {
            entries: Some(
                entries
                    .iter()
                    .map(|(name, pattern)| (name.to_string(), pattern.clone()))
                    .collect(),
            ),
            optional: BTreeSet::new(),
            exact,
        }))
    }

    #[test]
    fn type_pattern_matches_literals() {
        let int = Pattern::of_type(ANY_INT);
        assert!(int.test_value(&Value::Int(Some(3))));
        assert!(!int.test_value(&Value::str("a")));
        assert_eq!(int.to_string(), "%int");
    }

    #[test]
    fn union_pattern_matches_each_union_member() {
        let union = Pattern::union(vec![Pattern::of_type(ANY_INT), Pattern::of_type(ANY_STR)]);
        let value = join_values([Value::Int(Some(1)), Value::str("a")]);
        assert!(union.test_value(&value));
        assert!(!union.test_value(&Value::Nil));
        assert!(union.test(&Pattern::of_type(ANY_INT)));
    }

    #[test]
    fn optional_pattern_matches_nil() {
        let optional = Pattern::Optional(Arc::new(Pattern::of_type(ANY_INT)));
        assert!(optional.matches_nil());
        assert!(optional.test_value(&Value::Int(Some(2))));
        assert!(!Pattern::of_type(ANY_INT).matches_nil());
    }

    #[test]
    fn exact_object_pattern_rejects_unknown_properties() {
        let pattern = object_pattern(&[("a", Pattern::of_type(ANY_INT))], true);
        let matching = Pattern::exact(Value::Object(Arc::new(ObjectValue::new(
            PropertyMap::exact([("a".to_string(), Value::Int(Some(1)))].into()),
        ))));
        let extra = Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(
            [
                ("a".to_string(), Value::Int(Some(1))),
                ("b".to_string(), ANY_STR),
            ]
            .into(),
        ))));
        assert!(pattern.test(&matching));
        assert!(!pattern.test_value(&extra));
        assert!(object_pattern(&[("a", Pattern::of_type(ANY_INT))], false).test_value(&extra));
    }

    #[test]
    fn secret_patterns_are_nominal() {
        let first = Pattern::Secret(Arc::new(SecretPattern {
            id: NodeId(1),
            string_pattern: Pattern::of_type(ANY_STR),
        }));
        let second = Pattern::Secret(Arc::new(SecretPattern {
            id: NodeId(2),
            string_pattern: Pattern::of_type(ANY_STR),
        }));
        assert!(first.test_value(&Value::Secret(Some(NodeId(1)))));
        assert!(!second.test_value(&Value::Secret(Some(NodeId(1)))));
        assert!(!first.test(&second));
    }

    #[test]
    fn path_patterns_capture_named_segments() {
        let pattern = Pattern::PathPattern(Some(Arc::from("/users/:id/posts/:post")));
        let groups = pattern.match_groups().expect("path patterns capture groups");
        assert_eq!(
            groups.property_names(),
            Some(vec!["0".to_string(), "id".to_string(), "post".to_string()])
        );
        assert_eq!(Pattern::of_type(ANY_INT).match_groups(), None);
    }

    #[test]
    fn only_exact_patterns_expose_their_match_set() {
        let regex = Pattern::Regex(Some(Arc::from("^a+$")));
        assert_eq!(regex.exact_match_set(), None);
        assert_eq!(Pattern::union(vec![Pattern::of_type(ANY_INT), regex]).exact_match_set(), None);
        assert_eq!(Pattern::of_type(ANY_INT).exact_match_set(), Some(ANY_INT));
        assert_eq!(Pattern::exact(Value::Int(Some(1))).exact_match_set(), Some(Value::Int(Some(1))));
        assert_eq!(Pattern::exact(ANY_STR).exact_match_set(), None);
    }
}
