//! Inclusion imports, module imports and the constructs that embed a module: spawn
//! expressions, test suites, test cases and lifetime jobs.
//!
//! An embedded module is checked eagerly in its own [`State`] sharing the session of the
//! enclosing module. Its diagnostics are merged back, its bindings are not.

use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{
    EmbeddedModule, ImportStatement, InclusionImport, LifetimeJobExpression, MappingEntry,
    SourceSpan, SpawnExpression, TestExpression,
};
use crate::context::Context;
use crate::error::CheckError;
use crate::messages;
use crate::oracle::Permission;
use crate::state::{ChunkFrame, State};
use crate::value::{PropertyLookup, Value};

impl State {
    /// Context of an embedded module: base patterns plus the patterns and namespaces
    /// defined by the enclosing module.
    fn embedded_context(&self) -> Context {
        let mut context = Context::new();
        context.inherit_patterns(&self.context);
        context
    }

    fn constant_globals(&self) -> BTreeMap<String, Value> {
        self.globals()
            .filter(|(_, binding)| binding.constant)
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect()
    }

    fn check_embedded_module(
        &self,
        module: &EmbeddedModule,
        context: Context,
        globals: BTreeMap<String, Value>,
        self_value: Option<Value>,
    ) -> Result<(), CheckError> {
        debug!(module = %module.id, globals = globals.len(), "checking embedded module");

        let mut embedded = State::new(self.session.clone(), context, self.current_chunk());
        for (name, value) in globals {
            embedded.set_global(&name, value, true);
        }
        embedded.push_scope();
        let result = match self_value {
            Some(value) => embedded.bind_self(value).eval_statements(&module.statements),
            None => embedded.eval_statements(&module.statements),
        };

        let diagnostics = embedded.take_diagnostics();
        debug!(module = %module.id, diagnostics = diagnostics.len(), "embedded module checked");
        self.merge_diagnostics(diagnostics);
        result
    }

    pub(super) fn eval_inclusion_import(
        &mut self,
        import: &InclusionImport,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        if self.in_function_body() {
            return Err(CheckError::Unsupported {
                construct: "inclusion import",
                location: self.location(span),
            });
        }

        let source = &import.source;
        if self.inclusion_stack.contains(source) {
            self.add_error(span, messages::cyclic_inclusion(source));
            return Ok(());
        }

        let chunk = match self.session.loader.load_chunk(source) {
            Ok(chunk) => chunk,
            Err(error) if error.is_interruption() => return Err(error),
            Err(error) => {
                self.add_error(span, messages::module_not_loaded(source, &error));
                return Ok(());
            }
        };
        debug!(source = %source, statements = chunk.statements.len(), "including chunk");

        self.inclusion_stack.push(source.clone());
        self.push_chunk(ChunkFrame {
            name: chunk.name.clone(),
            path: chunk.path.clone(),
        });
        let result = self.eval_statements(&chunk.statements);
        self.pop_chunk();
        self.inclusion_stack.pop();
        result
    }

    pub(super) fn eval_import(
        &mut self,
        import: &ImportStatement,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        if self.in_function_body() {
            return Err(CheckError::Unsupported {
                construct: "import statement",
                location: self.location(span),
            });
        }

        let source = self.eval(&import.source)?;
        if !matches!(source, Value::Path(_) | Value::Url(_) | Value::Any) {
            self.add_error(import.source.span, messages::import_source_not_path_or_url(&source));
        }

        let name = &import.name.name;
        if !self.set_global(name, Value::Any, true) {
            self.add_error(import.name.span, messages::attempt_to_assign_constant_global(name));
        }
        Ok(())
    }

    pub(super) fn eval_spawn(
        &mut self,
        spawn: &SpawnExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let mut globals = self.constant_globals();

        let meta = match &spawn.meta {
            Some(meta) => self.eval(meta)?,
            None => Value::Nil,
        };
        if let Some(meta_node) = &spawn.meta {
            if let Value::Object(_) = &meta {
                if let PropertyLookup::Found(passed) = meta.get_property("globals") {
                    self.add_spawn_globals(&passed, &mut globals, meta_node.span);
                }
                if let PropertyLookup::Found(group) = meta.get_property("group") {
                    if !matches!(group, Value::RoutineGroup | Value::Any) {
                        self.add_error(meta_node.span, messages::group_not_routine_group(&group));
                    }
                }
            } else if !matches!(meta, Value::Any | Value::Nil) {
                self.add_error(meta_node.span, messages::spawn_globals_invalid(&meta));
            }
        }

        // `go do f()` passes the called function along
        if let Some(callee) = spawn.module.single_call_callee() {
            if let Some(binding) = self.get(callee) {
                globals.insert(callee.to_string(), binding.value.clone());
            }
        }

        let create_routine = Permission::CreateRoutine;
        if !self.session.permissions.is_granted(&create_routine) {
            self.add_warning(span, messages::missing_permission(&create_routine));
        }
        for permission in self.session.bridge.estimate_permissions(&meta) {
            if !self.session.permissions.is_granted(&permission) {
                self.add_warning(span, messages::missing_permission(&permission));
            }
        }

        let context = self.embedded_context();
        self.check_embedded_module(&spawn.module, context, globals, None)?;
        Ok(Value::Routine)
    }

    /// Globals listed in the meta object of a spawn expression: an object of values or
    /// a key list of globals of the current module.
    fn add_spawn_globals(
        &self,
        passed: &Value,
        globals: &mut BTreeMap<String, Value>,
        span: SourceSpan,
    ) {
        let entries: Vec<(String, Value)> = match passed {
            Value::Object(object) => object
                .properties
                .entries
                .iter()
                .flatten()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            Value::KeyList(Some(names)) => names
                .iter()
                .map(|name| {
                    let value = self
                        .get(name)
                        .map_or(Value::Any, |binding| binding.value.clone());
                    (name.clone(), value)
                })
                .collect(),
            Value::Any => return,
            other => {
                self.add_error(span, messages::spawn_globals_invalid(other));
                return;
            }
        };

        for (name, value) in entries {
            if !value.is_sharable() {
                self.add_error(span, messages::spawn_global_not_sharable(&name, &value));
            }
            globals.insert(name, value);
        }
    }

    pub(super) fn eval_mapping(&mut self, entries: &[MappingEntry]) -> Result<Value, CheckError> {
        for entry in entries {
            let mut fork = self.fork();
            fork.push_scope();
            let key = fork.eval(&entry.key)?;
            if let Some(variable) = &entry.key_variable {
                let bound = match &key {
                    Value::Pattern(pattern) => pattern.symbolic_value(),
                    other => other.clone(),
                };
                fork.set_local(&variable.name, bound, None);
            }
            fork.eval(&entry.value)?;
        }
        Ok(Value::Mapping)
    }

    pub(super) fn eval_test(&mut self, test: &TestExpression, kind: Value) -> Result<Value, CheckError> {
        if let Some(meta) = &test.meta {
            self.eval(meta)?;
        }

        let context = self.embedded_context();
        let globals = self.constant_globals();
        self.check_embedded_module(&test.module, context, globals, None)?;
        Ok(kind)
    }

    pub(super) fn eval_lifetime_job(
        &mut self,
        job: &LifetimeJobExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        self.eval(&job.meta)?;

        let subject = match &job.subject {
            None => match self.next_self() {
                Some(next_self) => next_self.clone(),
                None => {
                    return Err(CheckError::MissingNextSelf {
                        location: self.location(span),
                    })
                }
            },
            Some(subject_node) => {
                let subject = self.eval(subject_node)?;
                match &subject {
                    Value::Pattern(pattern) if pattern.as_object_pattern().is_some() => {
                        if let Some(owner) = self.next_self() {
                            if !pattern.test_value(owner) {
                                self.add_error(
                                    subject_node.span,
                                    messages::self_should_match_lifetime_job_subject(pattern),
                                );
                            }
                        }
                        pattern.symbolic_value()
                    }
                    Value::Any => Value::Any,
                    other => {
                        self.add_error(
                            subject_node.span,
                            messages::lifetime_job_subject_not_object_pattern(other),
                        );
                        Value::Any
                    }
                }
            }
        };

        let context = self.embedded_context();
        let globals = self
            .globals()
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect();
        self.check_embedded_module(&job.module, context, globals, Some(subject))?;
        Ok(Value::LifetimeJob)
    }
}
