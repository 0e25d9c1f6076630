//! Per-node results of a check, consumed by editor tooling.

use std::collections::BTreeMap;

use crate::ast::NodeId;
use crate::value::Value;

/// Variables visible at a statement, with their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeSnapshot {
    pub variables: BTreeMap<String, Value>,
}

/// Named patterns and pattern namespaces visible at a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub patterns: Vec<String>,
    pub pattern_namespaces: Vec<String>,
}

/// A type extension member used at a double-colon expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedExtension {
    /// Node of the `extend` statement declaring the extension.
    pub extension: NodeId,
    pub member: String,
}

/// Append-only store: a node keeps the first value recorded for it.
#[derive(Debug, Clone, Default)]
pub struct SymbolicData {
    node_values: BTreeMap<NodeId, Value>,
    local_scopes: BTreeMap<NodeId, ScopeSnapshot>,
    global_scopes: BTreeMap<NodeId, ScopeSnapshot>,
    contexts: BTreeMap<NodeId, ContextSnapshot>,
    used_extensions: BTreeMap<NodeId, Vec<UsedExtension>>,
}

impl SymbolicData {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_node_value(&mut self, node: NodeId, value: Value) {
        self.node_values.entry(node).or_insert(value);
    }

    pub(crate) fn record_scopes(&mut self, node: NodeId, local: ScopeSnapshot, global: ScopeSnapshot) {
        self.local_scopes.entry(node).or_insert(local);
        self.global_scopes.entry(node).or_insert(global);
    }

    pub(crate) fn record_context(&mut self, node: NodeId, context: ContextSnapshot) {
        self.contexts.entry(node).or_insert(context);
    }

    pub(crate) fn record_used_extension(&mut self, node: NodeId, used: UsedExtension) {
        let uses = self.used_extensions.entry(node).or_default();
        if !uses.contains(&used) {
            uses.push(used);
        }
    }

    pub fn node_value(&self, node: NodeId) -> Option<&Value> {
        self.node_values.get(&node)
    }

    pub fn node_values(&self) -> impl Iterator<Item = (&NodeId, &Value)> {
        self.node_values.iter()
    }

    pub fn local_scope_at(&self, node: NodeId) -> Option<&ScopeSnapshot> {
        self.local_scopes.get(&node)
    }

    pub fn global_scope_at(&self, node: NodeId) -> Option<&ScopeSnapshot> {
        self.global_scopes.get(&node)
    }

    pub fn context_at(&self, node: NodeId) -> Option<&ContextSnapshot> {
        self.contexts.get(&node)
    }

    pub fn used_extensions_at(&self, node: NodeId) -> &[UsedExtension] {
        self.used_extensions
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.node_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_values.is_empty()
    }
}
