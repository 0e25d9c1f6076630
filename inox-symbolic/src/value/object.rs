use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::pattern::Pattern;

use super::{join_values, Value};

/// Named entries shared by objects and records. `entries == None` stands for any entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyMap {
    pub entries: Option<BTreeMap<String, Value>>,
    pub optional: BTreeSet<String>,
    pub exact: bool,
}

impl PropertyMap {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn exact(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: Some(entries),
            optional: BTreeSet::new(),
            exact: true,
        }
    }

    pub fn inexact(entries: BTreeMap<String, Value>) -> Self {
        Self {
            entries: Some(entries),
            optional: BTreeSet::new(),
            exact: false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.as_ref().and_then(|entries| entries.get(name))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .as_ref()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all(&self, predicate: impl Fn(&Value) -> bool) -> bool {
        self.entries
            .as_ref()
            .map_or(true, |entries| entries.values().all(predicate))
    }

    pub fn test(&self, other: &PropertyMap) -> bool {
        let Some(entries) = &self.entries else {
            return true;
        };
        let Some(other_entries) = &other.entries else {
            return false;
        };
        if self.exact && !other.exact {
            return false;
        }

        for (name, expected) in entries {
            match other_entries.get(name) {
                Some(actual) => {
                    if other.optional.contains(name) && !self.optional.contains(name) {
                        return false;
                    }
                    if !expected.test(actual) {
                        return false;
                    }
                }
                None if self.optional.contains(name) => {}
                None => return false,
            }
        }

        !self.exact || other_entries.keys().all(|name| entries.contains_key(name))
    }

    fn with_replaced(&self, name: &str, value: Value) -> Option<PropertyMap> {
        let entries = self.entries.as_ref()?;
        if !entries.contains_key(name) {
            return None;
        }
        let mut replaced = self.clone();
        if let Some(entries) = replaced.entries.as_mut() {
            entries.insert(name.to_string(), value);
        }
        Some(replaced)
    }

    pub(super) fn fmt_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        any_name: &str,
    ) -> fmt::Result {
        let Some(entries) = &self.entries else {
            return f.write_str(any_name);
        };
        write!(f, "{prefix}{{")?;
        for (index, (name, value)) in entries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let marker = if self.optional.contains(name) { "?" } else { "" };
            write!(f, "{name}{marker}: {value}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectValue {
    pub properties: PropertyMap,
    /// Types declared on properties of the literal (`{count %int: 0}`).
    pub static_types: BTreeMap<String, Pattern>,
    pub readonly: bool,
    pub shared: bool,
}

impl ObjectValue {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(properties: PropertyMap) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn test(&self, other: &ObjectValue) -> bool {
        self.properties.test(&other.properties)
    }

    /// Result of `object.name = value` on a value of this shape.
    pub fn with_property_set(
        &self,
        name: &str,
        value: Value,
    ) -> Result<ObjectValue, SetPropertyError> {
        if self.readonly {
            return Err(SetPropertyError::Readonly);
        }
        if let Some(pattern) = self.static_types.get(name) {
            if !pattern.test_value(&value) {
                return Err(SetPropertyError::NotAssignable {
                    expected: pattern.clone(),
                });
            }
        }

        let mut updated = self.clone();
        let Some(entries) = updated.properties.entries.as_mut() else {
            return Ok(updated);
        };
        if !entries.contains_key(name) && self.properties.exact {
            return Err(SetPropertyError::NewPropertyOnExactObject);
        }
        entries.insert(name.to_string(), value);
        updated.properties.optional.remove(name);
        Ok(updated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetPropertyError {
    Readonly,
    NewPropertyOnExactObject,
    NotAssignable { expected: Pattern },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordValue {
    pub properties: PropertyMap,
}

impl RecordValue {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn test(&self, other: &RecordValue) -> bool {
        self.properties.test(&other.properties)
    }
}

/// Dictionary keyed by the textual form of its key values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DictionaryValue {
    pub entries: Option<BTreeMap<String, (Value, Value)>>,
}

impl DictionaryValue {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn test(&self, other: &DictionaryValue) -> bool {
        let Some(entries) = &self.entries else {
            return true;
        };
        let Some(other_entries) = &other.entries else {
            return false;
        };
        entries.len() == other_entries.len()
            && entries.iter().all(|(key, (_, value))| {
                other_entries
                    .get(key)
                    .is_some_and(|(_, actual)| value.test(actual))
            })
    }

    pub fn all_values(&self, predicate: impl Fn(&Value) -> bool) -> bool {
        self.entries
            .as_ref()
            .map_or(true, |entries| entries.values().all(|(_, value)| predicate(value)))
    }

    pub fn key_type(&self) -> Value {
        match &self.entries {
            Some(entries) => join_values(entries.values().map(|(key, _)| key.widest_of_type())),
            None => Value::Any,
        }
    }

    pub fn value_type(&self) -> Value {
        match &self.entries {
            Some(entries) => join_values(entries.values().map(|(_, value)| value.clone())),
            None => Value::Any,
        }
    }
}

impl fmt::Display for DictionaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(entries) = &self.entries else {
            return f.write_str("dictionary");
        };
        f.write_str(":{")?;
        for (index, (key, value)) in entries.values().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyLookup {
    Found(Value),
    Missing,
    NoProperties,
}

impl Value {
    /// Names of the properties, `None` when the value has no properties.
    pub fn property_names(&self) -> Option<Vec<String>> {
        match self {
            Value::Any => Some(Vec::new()),
            Value::Object(object) => Some(object.properties.names()),
            Value::Record(record) => Some(record.properties.names()),
            Value::PatternNamespace(namespace) => Some(namespace.names()),
            Value::Multi(multi) => {
                let mut names = Vec::new();
                for member in multi.values() {
                    for name in member.property_names()? {
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                names.sort();
                Some(names)
            }
            _ => None,
        }
    }

    pub fn has_properties(&self) -> bool {
        self.property_names().is_some()
    }

    pub fn get_property(&self, name: &str) -> PropertyLookup {
        match self {
            Value::Any => PropertyLookup::Found(Value::Any),
            Value::Object(object) => lookup_in(&object.properties, name),
            Value::Record(record) => lookup_in(&record.properties, name),
            Value::PatternNamespace(namespace) => match namespace.get(name) {
                Some(pattern) => PropertyLookup::Found(Value::Pattern(pattern.clone())),
                None => PropertyLookup::Missing,
            },
            Value::Multi(multi) => {
                let mut found = Vec::new();
                for member in multi.values() {
                    match member.get_property(name) {
                        PropertyLookup::Found(value) => found.push(value),
                        PropertyLookup::Missing => return PropertyLookup::Missing,
                        PropertyLookup::NoProperties => return PropertyLookup::NoProperties,
                    }
                }
                PropertyLookup::Found(join_values(found))
            }
            _ => PropertyLookup::NoProperties,
        }
    }

    /// Copy of the value where an existing property has been replaced, used by narrowing.
    pub fn with_existing_prop_replaced(&self, name: &str, value: Value) -> Option<Value> {
        match self {
            Value::Object(object) => {
                let properties = object.properties.with_replaced(name, value)?;
                Some(Value::Object(Arc::new(ObjectValue {
                    properties,
                    ..(**object).clone()
                })))
            }
            Value::Record(record) => {
                let properties = record.properties.with_replaced(name, value)?;
                Some(Value::Record(Arc::new(RecordValue { properties })))
            }
            Value::Multi(multi) => {
                let mut replaced = Vec::with_capacity(multi.values().len());
                for member in multi.values() {
                    replaced.push(member.with_existing_prop_replaced(name, value.clone())?);
                }
                Some(join_values(replaced))
            }
            _ => None,
        }
    }
}

fn lookup_in(properties: &PropertyMap, name: &str) -> PropertyLookup {
    match &properties.entries {
        None => PropertyLookup::Found(Value::Any),
        Some(entries) => match entries.get(name) {
            Some(value) if properties.optional.contains(name) => {
                PropertyLookup::Found(join_values([value.clone(), Value::Nil]))
            }
            Some(value) => PropertyLookup::Found(value.clone()),
            None => PropertyLookup::Missing,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ANY_INT, ANY_OBJECT, ANY_STR};

    fn object(entries: &[(&str, Value)], exact: bool) -> Value {
        let entries = entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let properties = if exact {
            PropertyMap::exact(entries)
        } else {
            PropertyMap::inexact(entries)
        };
        Value::Object(Arc::new(ObjectValue::new(properties)))
    }

    #[test]
    fn inexact_object_accepts_extra_properties() {
        let expected = object(&[("a", ANY_INT)], false);
        let actual = object(&[("a", Value::Int(Some(1))), ("b", ANY_STR)], true);
        assert!(expected.test(&actual));
        assert!(ANY_OBJECT.test(&actual));
        assert!(!actual.test(&ANY_OBJECT));
    }

    #[test]
    fn exact_object_rejects_extra_properties() {
        let expected = object(&[("a", ANY_INT)], true);
        let actual = object(&[("a", Value::Int(Some(1))), ("b", ANY_STR)], true);
        assert!(!expected.test(&actual));
    }

    #[test]
    fn property_lookup_and_replacement() {
        let value = object(&[("a", ANY_INT)], true);
        assert_eq!(value.get_property("a"), PropertyLookup::Found(ANY_INT));
        assert_eq!(value.get_property("b"), PropertyLookup::Missing);
        assert_eq!(ANY_INT.get_property("a"), PropertyLookup::NoProperties);

        let replaced = value
            .with_existing_prop_replaced("a", Value::Int(Some(2)))
            .expect("property exists");
        assert_eq!(replaced.get_property("a"), PropertyLookup::Found(Value::Int(Some(2))));
        assert!(value.with_existing_prop_replaced("c", ANY_INT).is_none());
    }

    #[test]
    fn setting_new_property_on_exact_object_fails() {
        let Value::Object(exact) = object(&[("a", ANY_INT)], true) else {
            unreachable!()
        };
        assert_eq!(
            exact.with_property_set("b", ANY_INT),
            Err(SetPropertyError::NewPropertyOnExactObject)
        );
        assert!(exact.with_property_set("a", ANY_STR).is_ok());
    }
}
