use std::fmt;
use std::sync::Arc;

use super::Value;

/// Union of at least two values, none of which contains another.
#[derive(Debug, Clone, PartialEq)]
pub struct Multivalue {
    values: Vec<Value>,
}

impl Multivalue {
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for Multivalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.values.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

/// Joins values into their union. Members contained in another member are dropped,
/// nested unions are flattened and a single remaining member is returned as is.
pub fn join_values<I>(values: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut kept: Vec<Value> = Vec::new();
    for value in values {
        for member in value.members().to_vec() {
            if member.is_never() || kept.iter().any(|existing| existing.test(&member)) {
                continue;
            }
            kept.retain(|existing| !member.test(existing));
            kept.push(member);
        }
    }

    match kept.len() {
        0 => Value::Never,
        1 => kept.remove(0),
        _ => Value::Multi(Arc::new(Multivalue { values: kept })),
    }
}

/// Removes from `from` every possible value that `removed` contains.
pub fn narrow_out(removed: &Value, from: &Value) -> Value {
    match from {
        Value::Multi(multi) => {
            let remaining = multi
                .values()
                .iter()
                .filter(|member| !removed.test(member))
                .cloned()
                .collect::<Vec<_>>();
            join_values(remaining)
        }
        other if removed.test(other) => Value::Never,
        other => other.clone(),
    }
}

/// Merges union members sharing the same widest type, so that `1 | 2` behaves like `int`.
pub fn merge_same_static_type(value: &Value) -> Value {
    let Value::Multi(multi) = value else {
        return value.clone();
    };

    let mut groups: Vec<(Value, Vec<&Value>)> = Vec::new();
    for member in multi.values() {
        let widest = member.widest_of_type();
        match groups.iter_mut().find(|(key, _)| *key == widest) {
            Some((_, group)) => group.push(member),
            None => groups.push((widest, vec![member])),
        }
    }

    join_values(groups.into_iter().map(|(widest, group)| {
        if group.len() > 1 {
            widest
        } else {
            group[0].clone()
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ANY_INT, ANY_STR};

    #[test]
    fn join_drops_contained_members() {
        let joined = join_values([Value::Int(Some(1)), ANY_INT]);
        assert_eq!(joined, ANY_INT);

        let joined = join_values([Value::Int(Some(1)), Value::str("a")]);
        assert_eq!(joined.members().len(), 2);
        assert!(joined.test(&Value::Int(Some(1))));
        assert!(joined.test(&Value::str("a")));
    }

    #[test]
    fn join_of_nothing_is_never() {
        assert_eq!(join_values(Vec::new()), Value::Never);
        assert_eq!(join_values([Value::Never, ANY_STR]), ANY_STR);
    }

    #[test]
    fn narrow_out_removes_union_members() {
        let union = join_values([ANY_INT, Value::Nil]);
        assert_eq!(narrow_out(&Value::Nil, &union), ANY_INT);
        assert_eq!(narrow_out(&ANY_INT, &ANY_INT), Value::Never);
        assert_eq!(narrow_out(&Value::Nil, &ANY_STR), ANY_STR);
    }

    #[test]
    fn merging_same_static_type_members() {
        let union = join_values([Value::Int(Some(1)), Value::Int(Some(2))]);
        assert_eq!(merge_same_static_type(&union), ANY_INT);

        let mixed = join_values([Value::Int(Some(1)), Value::Int(Some(2)), Value::str("a")]);
        let merged = merge_same_static_type(&mixed);
        assert!(merged.test(&ANY_INT));
        assert!(merged.test(&Value::str("a")));
        assert!(!merged.test(&ANY_STR));
    }
}
