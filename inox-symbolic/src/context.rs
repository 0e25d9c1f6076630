//! Named patterns, pattern namespaces and type extensions visible to a module.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use inox_support::{closest_name, MAX_SUGGESTION_DISTANCE};

use crate::ast::{Expression, NodeId};
use crate::pattern::{Pattern, PatternNamespace};
use crate::symbolic_data::ContextSnapshot;
use crate::value::{
    Value, ANY_BOOL, ANY_DICTIONARY, ANY_FLOAT, ANY_FUNCTION, ANY_HOST, ANY_INDEXABLE, ANY_INT,
    ANY_ITERABLE, ANY_LIST, ANY_OBJECT, ANY_PATH, ANY_PATTERN, ANY_RECORD, ANY_RUNE,
    ANY_SERIALIZABLE, ANY_STR, ANY_TUPLE, ANY_URL,
};

static BASE_PATTERNS: Lazy<BTreeMap<String, Pattern>> = Lazy::new(|| {
    let types: [(&str, Value); 22] = [
        ("bool", ANY_BOOL),
        ("int", ANY_INT),
        ("float", ANY_FLOAT),
        ("rune", ANY_RUNE),
        ("str", ANY_STR),
        ("string", ANY_STR),
        ("path", ANY_PATH),
        ("url", ANY_URL),
        ("host", ANY_HOST),
        ("scheme", Value::Scheme(None)),
        ("bytes", Value::Bytes),
        ("int-range", Value::IntRange),
        ("object", ANY_OBJECT.clone()),
        ("record", ANY_RECORD.clone()),
        ("list", ANY_LIST.clone()),
        ("tuple", ANY_TUPLE.clone()),
        ("dict", ANY_DICTIONARY.clone()),
        ("fn", ANY_FUNCTION),
        ("pattern", ANY_PATTERN),
        ("serializable", ANY_SERIALIZABLE),
        ("iterable", ANY_ITERABLE),
        ("indexable", ANY_INDEXABLE),
    ];

    let mut patterns: BTreeMap<String, Pattern> = types
        .into_iter()
        .map(|(name, value)| (name.to_string(), Pattern::Type(Arc::new(value))))
        .collect();
    patterns.insert("any".to_string(), Pattern::Any);
    patterns.insert("nil".to_string(), Pattern::exact(Value::Nil));
    patterns
});

/// Member provided by a type extension.
#[derive(Debug, Clone)]
pub enum ExtensionMember {
    /// Function evaluated once, with self bound to the subject, when the extension is declared.
    Method(Value),
    /// Expression evaluated at every access with self bound to the extended value.
    Computed(Arc<Expression>),
}

#[derive(Debug, Clone)]
pub struct TypeExtension {
    pub id: NodeId,
    pub subject: Pattern,
    pub members: BTreeMap<String, ExtensionMember>,
}

/// Copied when a state is forked; definitions made in a fork stay in the fork.
#[derive(Debug, Clone)]
pub struct Context {
    patterns: BTreeMap<String, Pattern>,
    namespaces: BTreeMap<String, Arc<PatternNamespace>>,
    extensions: Vec<Arc<TypeExtension>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context holding the base patterns (`%int`, `%str`, `%object`, ...).
    pub fn new() -> Self {
        Self {
            patterns: BASE_PATTERNS.clone(),
            namespaces: BTreeMap::new(),
            extensions: Vec::new(),
        }
    }

    pub fn resolve_named_pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Returns false when the name is already taken.
    pub fn add_named_pattern(&mut self, name: &str, pattern: Pattern) -> bool {
        if self.patterns.contains_key(name) {
            return false;
        }
        self.patterns.insert(name.to_string(), pattern);
        true
    }

    pub fn resolve_pattern_namespace(&self, name: &str) -> Option<&Arc<PatternNamespace>> {
        self.namespaces.get(name)
    }

    pub fn add_pattern_namespace(&mut self, namespace: PatternNamespace) -> bool {
        if self.namespaces.contains_key(&namespace.name) {
            return false;
        }
        self.namespaces
            .insert(namespace.name.clone(), Arc::new(namespace));
        true
    }

    /// Closest visible pattern name, for "did you mean" hints.
    pub fn suggest_pattern(&self, name: &str) -> Option<String> {
        closest_name(
            name,
            self.patterns.keys().map(String::as_str),
            MAX_SUGGESTION_DISTANCE,
        )
        .map(str::to_string)
    }

    pub fn add_type_extension(&mut self, extension: TypeExtension) {
        self.extensions.push(Arc::new(extension));
    }

    /// Extensions whose subject pattern matches `value`, in declaration order.
    pub fn extensions_for<'a>(
        &'a self,
        value: &'a Value,
    ) -> impl Iterator<Item = &'a Arc<TypeExtension>> + 'a {
        self.extensions
            .iter()
            .filter(move |extension| extension.subject.test_value(value))
    }

    /// Copies the patterns and namespaces of `other` that are not defined here.
    pub fn inherit_patterns(&mut self, other: &Context) {
        for (name, pattern) in &other.patterns {
            self.patterns
                .entry(name.clone())
                .or_insert_with(|| pattern.clone());
        }
        for (name, namespace) in &other.namespaces {
            self.namespaces
                .entry(name.clone())
                .or_insert_with(|| namespace.clone());
        }
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            patterns: self
                .patterns
                .keys()
                .filter(|name| !BASE_PATTERNS.contains_key(*name))
                .cloned()
                .collect(),
            pattern_namespaces: self.namespaces.keys().cloned().collect(),
        }
    }
}
