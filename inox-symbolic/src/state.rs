//! Scopes, bindings and the fork/join discipline of the evaluator.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{NodeId, SourceSpan};
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::error::CheckError;
use crate::messages;
use crate::options::CheckOptions;
use crate::oracle::{CancelSignal, ConcreteBridge, ModuleLoader, PermissionOracle};
use crate::pattern::Pattern;
use crate::symbolic_data::{ScopeSnapshot, SymbolicData, UsedExtension};
use crate::value::{join_values, Value};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Binding {
    pub value: Value,
    pub static_type: Pattern,
    pub constant: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    variables: BTreeMap<String, Binding>,
    self_value: Option<Value>,
    next_self: Option<Value>,
}

impl Scope {
    fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            variables: self
                .variables
                .iter()
                .map(|(name, binding)| (name.clone(), binding.value.clone()))
                .collect(),
        }
    }
}

/// State shared by every fork and embedded module of one top-level check.
pub(crate) struct Session {
    pub options: CheckOptions,
    pub bridge: Arc<dyn ConcreteBridge>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub loader: Arc<dyn ModuleLoader>,
    cancel: Option<CancelSignal>,
    data: RefCell<SymbolicData>,
    fuel: Cell<u32>,
    steps: Cell<u64>,
    declared_functions: RefCell<HashSet<NodeId>>,
}

impl Session {
    pub fn new(
        options: CheckOptions,
        bridge: Arc<dyn ConcreteBridge>,
        permissions: Arc<dyn PermissionOracle>,
        loader: Arc<dyn ModuleLoader>,
        cancel: Option<CancelSignal>,
    ) -> Self {
        let fuel = options.fuel_check_interval.max(1);
        Self {
            options,
            bridge,
            permissions,
            loader,
            cancel,
            data: RefCell::new(SymbolicData::new()),
            fuel: Cell::new(fuel),
            steps: Cell::new(0),
            declared_functions: RefCell::new(HashSet::new()),
        }
    }

    /// Called once per node visit.
    pub fn consume_fuel(&self) -> Result<(), CheckError> {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if let Some(max_steps) = self.options.max_steps {
            if steps > max_steps {
                return Err(CheckError::StepBudgetExhausted(max_steps));
            }
        }

        let fuel = self.fuel.get();
        if fuel > 1 {
            self.fuel.set(fuel - 1);
            return Ok(());
        }
        self.fuel.set(self.options.fuel_check_interval.max(1));
        self.poll_cancellation()
    }

    pub fn poll_cancellation(&self) -> Result<(), CheckError> {
        match &self.cancel {
            Some(signal) if signal.is_cancelled() => Err(CheckError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn recorded_value(&self, node: NodeId) -> Option<Value> {
        self.data.borrow().node_value(node).cloned()
    }

    pub fn record_node_value(&self, node: NodeId, value: &Value) {
        if self.options.record_node_values {
            self.data.borrow_mut().record_node_value(node, value.clone());
        }
    }

    pub fn record_used_extension(&self, node: NodeId, used: UsedExtension) {
        self.data.borrow_mut().record_used_extension(node, used);
    }

    pub fn with_data<T>(&self, f: impl FnOnce(&mut SymbolicData) -> T) -> T {
        f(&mut self.data.borrow_mut())
    }

    pub fn take_data(&self) -> SymbolicData {
        self.data.take()
    }

    pub fn mark_declared_function(&self, node: NodeId) {
        self.declared_functions.borrow_mut().insert(node);
    }

    pub fn is_declared_function(&self, node: NodeId) -> bool {
        self.declared_functions.borrow().contains(&node)
    }
}

/// Chunk currently evaluated; inclusion imports push the included chunk.
#[derive(Debug, Clone)]
pub(crate) struct ChunkFrame {
    pub name: String,
    pub path: Option<PathBuf>,
}

/// How loops are left by the last evaluated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum IterationChange {
    #[default]
    None,
    Break,
    Continue,
    Prune,
}

pub(crate) struct State {
    pub context: Context,
    pub session: Rc<Session>,
    diagnostics: Rc<RefCell<Diagnostics>>,
    chunk_stack: Vec<ChunkFrame>,
    /// `scopes[0]` holds the globals.
    scopes: Vec<Scope>,
    callee_stack: Vec<NodeId>,
    /// Number of function bodies entered through a call.
    call_depth: usize,
    declaring_functions: Vec<NodeId>,
    /// Sources of the inclusion imports being evaluated, outermost first.
    pub inclusion_stack: Vec<String>,
    pub return_type: Option<Value>,
    pub return_value: Option<Value>,
    pub iteration_change: IterationChange,
}

impl State {
    pub fn new(session: Rc<Session>, context: Context, chunk: ChunkFrame) -> Self {
        Self {
            context,
            session,
            diagnostics: Rc::new(RefCell::new(Diagnostics::new())),
            chunk_stack: vec![chunk],
            scopes: vec![Scope::default()],
            callee_stack: Vec::new(),
            call_depth: 0,
            declaring_functions: Vec::new(),
            inclusion_stack: Vec::new(),
            return_type: None,
            return_value: None,
            iteration_change: IterationChange::None,
        }
    }

    // ---- diagnostics ----

    pub fn location(&self, span: SourceSpan) -> String {
        let chunk = match self.chunk_stack.last() {
            Some(ChunkFrame {
                path: Some(path), ..
            }) => self.session.options.display_path(path),
            Some(frame) => frame.name.clone(),
            None => String::new(),
        };
        format!("{chunk}:{span}")
    }

    pub fn add_error(&self, span: SourceSpan, message: impl Into<String>) {
        let location = self.location(span);
        self.diagnostics
            .borrow_mut()
            .push_error_with_span(message, Some(span), Some(location));
    }

    pub fn add_warning(&self, span: SourceSpan, message: impl Into<String>) {
        let location = self.location(span);
        self.diagnostics
            .borrow_mut()
            .push_warning_with_span(message, Some(span), Some(location));
    }

    pub fn merge_diagnostics(&self, other: Diagnostics) {
        self.diagnostics.borrow_mut().extend(other);
    }

    pub fn take_diagnostics(&self) -> Diagnostics {
        self.diagnostics.take()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().errors().count()
    }

    // ---- chunks ----

    pub fn push_chunk(&mut self, frame: ChunkFrame) {
        self.chunk_stack.push(frame);
    }

    pub fn pop_chunk(&mut self) {
        if self.chunk_stack.len() > 1 {
            self.chunk_stack.pop();
        }
    }

    pub fn current_chunk(&self) -> ChunkFrame {
        self.chunk_stack
            .last()
            .cloned()
            .unwrap_or_else(|| ChunkFrame {
                name: String::new(),
                path: None,
            })
    }

    // ---- scopes ----

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn has_local_scope(&self) -> bool {
        self.scopes.len() > 1
    }

    fn top_scope(&self) -> &Scope {
        self.scopes.last().unwrap_or(&self.scopes[0])
    }

    fn top_scope_mut(&mut self) -> &mut Scope {
        let index = self.scopes.len() - 1;
        &mut self.scopes[index]
    }

    fn local_scope(&self) -> Option<&Scope> {
        self.scopes.last().filter(|_| self.has_local_scope())
    }

    pub fn get_local(&self, name: &str) -> Option<&Binding> {
        self.local_scope()?.variables.get(name)
    }

    pub fn get_global(&self, name: &str) -> Option<&Binding> {
        self.scopes[0].variables.get(name)
    }

    /// Local binding first, then global.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.get_local(name).or_else(|| self.get_global(name))
    }

    pub fn local_names(&self) -> Vec<String> {
        self.local_scope()
            .map(|scope| scope.variables.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, &Binding)> {
        self.scopes[0].variables.iter()
    }

    /// Declares a local; the static type defaults to the widest type of the value.
    pub fn set_local(&mut self, name: &str, value: Value, static_type: Option<Pattern>) {
        let static_type = static_type.unwrap_or_else(|| Pattern::of_type(value.clone()));
        self.top_scope_mut().variables.insert(
            name.to_string(),
            Binding {
                value,
                static_type,
                constant: false,
            },
        );
    }

    /// Returns false when the name is bound to a constant.
    pub fn set_global(&mut self, name: &str, value: Value, constant: bool) -> bool {
        let globals = &mut self.scopes[0].variables;
        match globals.get_mut(name) {
            Some(binding) if binding.constant => false,
            Some(binding) => {
                binding.value = value;
                true
            }
            None => {
                globals.insert(
                    name.to_string(),
                    Binding {
                        static_type: Pattern::of_type(value.clone()),
                        value,
                        constant,
                    },
                );
                true
            }
        }
    }

    /// Replaces a global's value regardless of its constness.
    pub fn override_global(&mut self, name: &str, value: Value) {
        if let Some(binding) = self.scopes[0].variables.get_mut(name) {
            binding.value = value;
        }
    }

    /// Reassigns an existing local. The value is widened until the static type accepts it;
    /// when nothing is accepted the binding becomes ANY.
    pub fn update_local(&mut self, name: &str, value: Value, span: SourceSpan) -> bool {
        let Some(binding) = self.local_scope().and_then(|scope| scope.variables.get(name)) else {
            return false;
        };
        let static_type = binding.static_type.clone();
        let value = self.widen_to_static(value, &static_type, span);
        if let Some(binding) = self.top_scope_mut().variables.get_mut(name) {
            binding.value = value;
        }
        true
    }

    pub fn update_global(&mut self, name: &str, value: Value, span: SourceSpan) -> bool {
        let Some(binding) = self.get_global(name) else {
            return false;
        };
        if binding.constant {
            self.add_error(span, messages::attempt_to_assign_constant_global(name));
            return true;
        }
        let static_type = binding.static_type.clone();
        let value = self.widen_to_static(value, &static_type, span);
        self.override_global(name, value);
        true
    }

    fn widen_to_static(&self, value: Value, static_type: &Pattern, span: SourceSpan) -> Value {
        if let Some(widened) = value.widen_until(|candidate| static_type.test_value(candidate)) {
            return widened;
        }
        self.add_error(
            span,
            messages::not_assignable_to_variable_of_type(&value, static_type),
        );
        Value::Any
    }

    /// Rebinds a variable to a narrowed value without any static check.
    pub fn narrow_binding(&mut self, name: &str, value: Value) {
        if let Some(binding) = self
            .scopes
            .iter_mut()
            .skip(1)
            .last()
            .and_then(|scope| scope.variables.get_mut(name))
        {
            binding.value = value;
            return;
        }
        if let Some(binding) = self.scopes[0].variables.get_mut(name) {
            binding.value = value;
        }
    }

    pub fn narrow_global(&mut self, name: &str, value: Value) {
        self.override_global(name, value);
    }

    // ---- self ----

    pub fn self_value(&self) -> Option<&Value> {
        self.top_scope().self_value.as_ref()
    }

    pub fn next_self(&self) -> Option<&Value> {
        self.top_scope().next_self.as_ref()
    }

    /// Binds self in the current scope until the guard is dropped.
    pub fn bind_self(&mut self, value: Value) -> SelfBinding<'_> {
        SelfBinding::new(self, value, SelfSlot::Current)
    }

    /// Binds the self of the next function or lifetime job created in the current scope.
    pub fn bind_next_self(&mut self, value: Value) -> SelfBinding<'_> {
        SelfBinding::new(self, value, SelfSlot::Next)
    }

    // ---- callees ----

    pub fn is_callee_active(&self, function: NodeId) -> bool {
        self.callee_stack.contains(&function)
    }

    pub fn push_callee(&mut self, function: NodeId) {
        self.callee_stack.push(function);
    }

    pub fn pop_callee(&mut self) {
        self.callee_stack.pop();
    }

    /// Whether a function body is being checked or called.
    pub fn in_function_body(&self) -> bool {
        !self.callee_stack.is_empty()
    }

    pub fn enter_call(&mut self) {
        self.call_depth += 1;
    }

    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub fn reset_call_depth(&mut self) {
        self.call_depth = 0;
    }

    /// Whether a function body is being evaluated for a call rather than checked on its own.
    pub fn is_in_call(&self) -> bool {
        self.call_depth > 0
    }

    pub fn push_declaring(&mut self, function: NodeId) {
        self.declaring_functions.push(function);
    }

    pub fn pop_declaring(&mut self) {
        self.declaring_functions.pop();
    }

    pub fn is_declaring_function(&self) -> bool {
        !self.declaring_functions.is_empty()
    }

    // ---- symbolic data ----

    pub fn record_value(&self, node: NodeId, value: &Value) {
        self.session.record_node_value(node, value);
    }

    pub fn record_scopes(&self, node: NodeId) {
        if !self.session.options.record_node_values {
            return;
        }
        let local = self.local_scope().map(Scope::snapshot).unwrap_or_default();
        let global = self.scopes[0].snapshot();
        self.session
            .with_data(|data| data.record_scopes(node, local, global));
    }

    pub fn record_context(&self, node: NodeId) {
        if !self.session.options.record_node_values {
            return;
        }
        let snapshot = self.context.snapshot();
        self.session
            .with_data(|data| data.record_context(node, snapshot));
    }

    // ---- fork / join ----

    /// Copy of the globals and of the current local scope sharing the diagnostics and
    /// the symbolic data of `self`.
    pub fn fork(&self) -> State {
        let mut scopes = vec![self.scopes[0].clone()];
        if let Some(local) = self.local_scope() {
            scopes.push(local.clone());
        }
        State {
            context: self.context.clone(),
            session: self.session.clone(),
            diagnostics: self.diagnostics.clone(),
            chunk_stack: self.chunk_stack.clone(),
            scopes,
            callee_stack: self.callee_stack.clone(),
            call_depth: self.call_depth,
            declaring_functions: self.declaring_functions.clone(),
            inclusion_stack: self.inclusion_stack.clone(),
            return_type: self.return_type.clone(),
            return_value: None,
            iteration_change: IterationChange::None,
        }
    }

    /// Fork whose diagnostics are discarded, for side-effect free re-evaluations.
    pub fn silent_fork(&self) -> State {
        let mut fork = self.fork();
        fork.diagnostics = Rc::new(RefCell::new(Diagnostics::new()));
        fork
    }

    /// Merges forks back. When `exhaustive` is true the forks cover every path, so the
    /// previous value of a binding does not survive and names bound in every fork are added.
    pub fn join(&mut self, forks: Vec<State>, exhaustive: bool) {
        if forks.is_empty() {
            return;
        }
        debug!(forks = forks.len(), exhaustive, "joining forks");

        let global_scopes: Vec<&Scope> = forks.iter().map(|fork| &fork.scopes[0]).collect();
        join_scope(&mut self.scopes[0], &global_scopes, exhaustive);

        if self.has_local_scope() {
            let local_scopes: Vec<&Scope> = forks
                .iter()
                .filter_map(|fork| fork.local_scope())
                .collect();
            if local_scopes.len() == forks.len() {
                join_scope(self.top_scope_mut(), &local_scopes, exhaustive);
            }
        }

        let returned: Vec<Value> = forks
            .iter()
            .filter_map(|fork| fork.return_value.clone())
            .collect();
        if !returned.is_empty() {
            self.return_value = Some(join_values(
                self.return_value.take().into_iter().chain(returned),
            ));
        }
    }
}

fn join_scope(parent: &mut Scope, forks: &[&Scope], exhaustive: bool) {
    let names: BTreeSet<String> = parent
        .variables
        .keys()
        .chain(forks.iter().flat_map(|scope| scope.variables.keys()))
        .cloned()
        .collect();

    for name in names {
        let fork_values: Vec<Value> = forks
            .iter()
            .filter_map(|scope| scope.variables.get(&name))
            .map(|binding| binding.value.clone())
            .collect();
        let bound_everywhere = fork_values.len() == forks.len();

        match parent.variables.get_mut(&name) {
            Some(binding) => {
                let previous = (!exhaustive || !bound_everywhere).then(|| binding.value.clone());
                binding.value = join_values(fork_values.into_iter().chain(previous));
            }
            None if exhaustive && bound_everywhere => {
                let value = join_values(fork_values);
                parent.variables.insert(
                    name,
                    Binding {
                        static_type: Pattern::of_type(value.clone()),
                        value,
                        constant: false,
                    },
                );
            }
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SelfSlot {
    Current,
    Next,
}

/// Restores the previous self (or next self) of a scope when dropped.
pub(crate) struct SelfBinding<'a> {
    state: &'a mut State,
    scope_index: usize,
    slot: SelfSlot,
    previous: Option<Value>,
}

impl<'a> SelfBinding<'a> {
    fn new(state: &'a mut State, value: Value, slot: SelfSlot) -> Self {
        let scope_index = state.scopes.len() - 1;
        let scope = &mut state.scopes[scope_index];
        let previous = match slot {
            SelfSlot::Current => scope.self_value.replace(value),
            SelfSlot::Next => scope.next_self.replace(value),
        };
        Self {
            state,
            scope_index,
            slot,
            previous,
        }
    }
}

impl Deref for SelfBinding<'_> {
    type Target = State;

    fn deref(&self) -> &State {
        self.state
    }
}

impl DerefMut for SelfBinding<'_> {
    fn deref_mut(&mut self) -> &mut State {
        self.state
    }
}

impl Drop for SelfBinding<'_> {
    fn drop(&mut self) {
        let Some(scope) = self.state.scopes.get_mut(self.scope_index) else {
            return;
        };
        let previous = self.previous.take();
        match self.slot {
            SelfSlot::Current => scope.self_value = previous,
            SelfSlot::Next => scope.next_self = previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{AllowAll, DefaultBridge, NoLoader};
    use crate::value::{ANY_INT, ANY_STR};

    fn state() -> State {
        let session = Session::new(
            CheckOptions::default(),
            Arc::new(DefaultBridge),
            Arc::new(AllowAll),
            Arc::new(NoLoader),
            None,
        );
        let mut state = State::new(
            Rc::new(session),
            Context::new(),
            ChunkFrame {
                name: "main".to_string(),
                path: None,
            },
        );
        state.push_scope();
        state
    }

    #[test]
    fn failed_update_falls_back_to_any() {
        let mut state = state();
        state.set_local("x", Value::Int(Some(1)), Some(Pattern::of_type(ANY_INT)));
        assert!(state.update_local("x", Value::str("a"), SourceSpan::single_point(1, 1)));
        assert_eq!(state.get("x").map(|b| b.value.clone()), Some(Value::Any));
        let diagnostics = state.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.entries()[0]
            .message
            .contains("not assignable to a variable of type %int"));
    }

    #[test]
    fn update_widens_literals() {
        let mut state = state();
        state.set_local("x", Value::Int(Some(1)), Some(Pattern::of_type(ANY_INT)));
        state.update_local("x", Value::Int(Some(2)), SourceSpan::default());
        assert_eq!(state.get("x").map(|b| b.value.clone()), Some(Value::Int(Some(2))));
        assert!(state.take_diagnostics().is_empty());
    }

    #[test]
    fn exhaustive_join_adds_names_bound_in_every_fork() {
        let mut state = state();
        let mut left = state.fork();
        left.set_local("x", Value::Int(Some(1)), None);
        let mut right = state.fork();
        right.set_local("x", Value::str("a"), None);
        state.join(vec![left, right], true);

        let joined = state.get("x").map(|b| b.value.clone()).expect("x is bound");
        assert!(joined.test(&Value::Int(Some(1))));
        assert!(joined.test(&Value::str("a")));
    }

    #[test]
    fn partial_join_keeps_previous_value() {
        let mut state = state();
        state.set_local("x", ANY_STR, None);
        let mut fork = state.fork();
        fork.narrow_binding("x", Value::str("a"));
        state.join(vec![fork], false);
        assert_eq!(state.get("x").map(|b| b.value.clone()), Some(ANY_STR));
    }

    #[test]
    fn self_binding_is_restored_on_drop() {
        let mut state = state();
        {
            let bound = state.bind_self(ANY_INT);
            assert_eq!(bound.self_value(), Some(&ANY_INT));
        }
        assert_eq!(state.self_value(), None);
    }

    #[test]
    fn constant_globals_cannot_be_updated() {
        let mut state = state();
        assert!(state.set_global("limit", Value::Int(Some(3)), true));
        assert!(!state.set_global("limit", Value::Int(Some(4)), false));
        state.update_global("limit", Value::Int(Some(5)), SourceSpan::default());
        let diagnostics = state.take_diagnostics();
        assert!(diagnostics.entries()[0]
            .message
            .contains("attempt to assign constant global 'limit'"));
    }

    #[test]
    fn fuel_exhaustion_polls_cancellation() {
        let signal = CancelSignal::new();
        let options = CheckOptions {
            fuel_check_interval: 2,
            ..CheckOptions::default()
        };
        let session = Session::new(
            options,
            Arc::new(DefaultBridge),
            Arc::new(AllowAll),
            Arc::new(NoLoader),
            Some(signal.clone()),
        );
        assert!(session.consume_fuel().is_ok());
        signal.cancel();
        assert!(matches!(session.consume_fuel(), Err(CheckError::Cancelled)));
    }
}
