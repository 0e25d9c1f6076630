//! The abstract evaluator: one dispatch over node kinds, one method per kind.
//!
//! Every method returns `Result<_, CheckError>`. An `Err` is a failure of the checker
//! itself; problems of the checked program are reported with [`State::add_error`] and the
//! evaluation continues with an approximated value, usually ANY.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::ast::{Block, Expression, ExpressionKind, SourceSpan, Statement, StatementKind};
use crate::error::CheckError;
use crate::messages;
use crate::state::{IterationChange, State};
use crate::value::Value;

mod assign;
mod control;
mod embedded;
mod function;
mod literals;
mod member;
mod operators;
mod pattern;

pub(crate) use control::block_always_returns;

#[derive(Debug, Clone, Default)]
pub(crate) struct EvalOptions {
    /// Return the value recorded for the node, without side effects.
    pub re_eval: bool,
    pub do_not_record: bool,
    /// Value expected by the parent node, propagated to literals and function arguments.
    pub expected: Option<Value>,
    /// A double-colon expression may appear here: assignment target or callee, possibly
    /// through a chain of member, index and slice expressions.
    pub double_colon_allowed: bool,
    /// The expression is the callee of a call.
    pub callee: bool,
}

impl EvalOptions {
    pub fn expecting(expected: Option<Value>) -> Self {
        Self {
            expected,
            ..Self::default()
        }
    }

    pub fn re_eval() -> Self {
        Self {
            re_eval: true,
            ..Self::default()
        }
    }

    /// Options for the object of a member, index or slice expression.
    fn for_chain_object(&self) -> Self {
        Self {
            double_colon_allowed: self.double_colon_allowed,
            ..Self::default()
        }
    }
}

impl State {
    pub(crate) fn eval(&mut self, expression: &Expression) -> Result<Value, CheckError> {
        self.eval_with(expression, EvalOptions::default())
    }

    pub(crate) fn eval_with(
        &mut self,
        expression: &Expression,
        options: EvalOptions,
    ) -> Result<Value, CheckError> {
        if options.re_eval {
            if let Some(value) = self.session.recorded_value(expression.id) {
                return Ok(value);
            }
            let mut silent = self.silent_fork();
            return silent.eval_with(
                expression,
                EvalOptions {
                    re_eval: false,
                    do_not_record: true,
                    ..options
                },
            );
        }

        self.session.consume_fuel()?;
        trace!(node = %expression.id, kind = expression.kind.describe(), "evaluating expression");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatch_expression(expression, &options)
        }));
        let value = match outcome {
            Ok(result) => result?,
            Err(payload) => return Err(self.internal_panic(payload, expression.span)),
        };

        if !options.do_not_record {
            self.record_value(expression.id, &value);
        }
        Ok(value)
    }

    pub(crate) fn eval_statement(&mut self, statement: &Statement) -> Result<(), CheckError> {
        self.session.consume_fuel()?;
        trace!(node = %statement.id, "evaluating statement");
        self.record_scopes(statement.id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch_statement(statement)));
        match outcome {
            Ok(result) => result,
            Err(payload) => Err(self.internal_panic(payload, statement.span)),
        }
    }

    pub(crate) fn eval_statements(&mut self, statements: &[Statement]) -> Result<(), CheckError> {
        for statement in statements {
            self.eval_statement(statement)?;
        }
        Ok(())
    }

    pub(crate) fn eval_block(&mut self, block: &Block) -> Result<(), CheckError> {
        self.eval_statements(&block.statements)
    }

    fn internal_panic(&self, payload: Box<dyn Any + Send>, span: SourceSpan) -> CheckError {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        let location = self.location(span);
        warn!(%location, %message, "internal error during symbolic evaluation");
        CheckError::Panic {
            message,
            location,
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    fn dispatch_statement(&mut self, statement: &Statement) -> Result<(), CheckError> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::LocalVariables(declarations) => {
                self.eval_local_declarations(declarations, span)
            }
            StatementKind::Assignment(assignment) => self.eval_assignment(assignment, span),
            StatementKind::MultiAssignment(assignment) => {
                self.eval_multi_assignment(assignment, span)
            }
            StatementKind::Expression(expression) => self.eval(expression).map(drop),
            StatementKind::Return(value) => self.eval_return(value.as_ref(), span),
            StatementKind::Break => {
                self.iteration_change = IterationChange::Break;
                Ok(())
            }
            StatementKind::Continue => {
                self.iteration_change = IterationChange::Continue;
                Ok(())
            }
            StatementKind::Prune => {
                self.iteration_change = IterationChange::Prune;
                Ok(())
            }
            StatementKind::If(if_statement) => self.eval_if_statement(if_statement),
            StatementKind::For(for_statement) => self.eval_for(for_statement),
            StatementKind::Walk(walk) => self.eval_walk(walk),
            StatementKind::Switch(switch) => self.eval_switch(switch),
            StatementKind::Match(match_statement) => self.eval_match(match_statement),
            StatementKind::Block(block) => self.eval_block(block),
            StatementKind::Synchronized(synchronized) => self.eval_synchronized(synchronized),
            StatementKind::InclusionImport(import) => self.eval_inclusion_import(import, span),
            StatementKind::Import(import) => self.eval_import(import, span),
            StatementKind::FunctionDeclaration(declaration) => {
                self.eval_function_declaration(declaration, span)
            }
            StatementKind::PatternDefinition(definition) => {
                self.eval_pattern_definition(definition, statement.id, span)
            }
            StatementKind::PatternNamespaceDefinition(definition) => {
                self.eval_pattern_namespace_definition(definition, statement.id, span)
            }
            StatementKind::Assertion(expression) => self.eval_assertion(expression),
            StatementKind::Extend(extend) => self.eval_extend(extend, statement.id),
        }
    }

    fn dispatch_expression(
        &mut self,
        expression: &Expression,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let span = expression.span;
        let value = match &expression.kind {
            ExpressionKind::Nil => Value::Nil,
            ExpressionKind::Bool(value) => Value::Bool(Some(*value)),
            ExpressionKind::Int(value) => Value::Int(Some(*value)),
            ExpressionKind::Float(value) => Value::Float(Some(*value)),
            ExpressionKind::Rune(value) => Value::Rune(Some(*value)),
            ExpressionKind::Str(value) => Value::str(value),
            ExpressionKind::Path(value) => Value::Path(Some(Arc::from(value.as_str()))),
            ExpressionKind::Url(value) => Value::Url(Some(Arc::from(value.as_str()))),
            ExpressionKind::Host(value) => Value::Host(Some(Arc::from(value.as_str()))),
            ExpressionKind::Scheme(value) => Value::Scheme(Some(Arc::from(value.as_str()))),
            ExpressionKind::Quantity { value, unit } => {
                match self.session.bridge.quantity(*value, unit) {
                    Some(quantity) => quantity,
                    None => {
                        self.add_error(span, messages::unknown_unit(unit));
                        Value::Quantity(None)
                    }
                }
            }
            ExpressionKind::Rate { value, unit } => match self.session.bridge.rate(*value, unit) {
                Some(rate) => rate,
                None => {
                    self.add_error(span, messages::unknown_unit(unit));
                    Value::Rate(None)
                }
            },
            ExpressionKind::ByteSlice(_) => Value::Bytes,
            ExpressionKind::Variable(name) => self.eval_variable(name, span),
            ExpressionKind::Identifier(name) => self.eval_identifier(name, span),
            ExpressionKind::GlobalVariable(name) => self.eval_global_variable(name, span),
            ExpressionKind::SelfExpression => match self.self_value() {
                Some(value) => value.clone(),
                None => {
                    self.add_error(span, messages::self_not_available());
                    Value::Any
                }
            },
            ExpressionKind::KeyList(keys) => Value::KeyList(Some(
                keys.iter().map(|key| key.name.clone()).collect(),
            )),
            ExpressionKind::Member(member) => self.eval_member(member, span, options)?,
            ExpressionKind::DoubleColon(double_colon) => {
                self.eval_double_colon(double_colon, expression.id, span, options)?
            }
            ExpressionKind::Index(index) => self.eval_index(index, span, options)?,
            ExpressionKind::Slice(slice) => self.eval_slice(slice, span, options)?,
            ExpressionKind::Extraction(extraction) => self.eval_extraction(extraction, span)?,
            ExpressionKind::Call(call) => self.eval_call(call, span)?,
            ExpressionKind::Unary(unary) => self.eval_unary(unary, span)?,
            ExpressionKind::Binary(binary) => self.eval_binary(binary, span)?,
            ExpressionKind::Object(object) => {
                self.eval_object_literal(object, expression.id, span, options)?
            }
            ExpressionKind::Record(record) => self.eval_record_literal(record, span, options)?,
            ExpressionKind::List(list) => self.eval_list_literal(list, span, options)?,
            ExpressionKind::Tuple(tuple) => self.eval_tuple_literal(tuple, span, options)?,
            ExpressionKind::Dictionary(entries) => self.eval_dictionary_literal(entries, span)?,
            ExpressionKind::Function(function) => self.eval_function_expression(function)?,
            ExpressionKind::Concatenation(elements) => self.eval_concatenation(elements, span)?,
            ExpressionKind::If(if_expression) => self.eval_if_expression(if_expression, span)?,
            ExpressionKind::StringTemplate(template) => {
                self.eval_string_template(template, span)?
            }
            ExpressionKind::Spawn(spawn) => self.eval_spawn(spawn, span)?,
            ExpressionKind::Mapping(entries) => self.eval_mapping(entries)?,
            ExpressionKind::TestSuite(test) => self.eval_test(test, Value::TestSuite)?,
            ExpressionKind::TestCase(test) => self.eval_test(test, Value::TestCase)?,
            ExpressionKind::LifetimeJob(job) => self.eval_lifetime_job(job, span)?,
            ExpressionKind::Xml(xml) => self.eval_xml(xml, span)?,
            ExpressionKind::PatternNamespaceIdentifier(name) => {
                match self.context.resolve_pattern_namespace(name) {
                    Some(namespace) => Value::PatternNamespace(namespace.clone()),
                    None => {
                        self.add_error(span, messages::pattern_namespace_not_declared(name));
                        Value::Any
                    }
                }
            }
            ExpressionKind::PatternIdentifier(_)
            | ExpressionKind::PatternNamespaceMember { .. }
            | ExpressionKind::PathPattern(_)
            | ExpressionKind::ObjectPattern(_)
            | ExpressionKind::RecordPattern(_)
            | ExpressionKind::ListPattern(_)
            | ExpressionKind::TuplePattern(_)
            | ExpressionKind::PatternUnion(_)
            | ExpressionKind::OptionalPattern(_)
            | ExpressionKind::SecretPattern(_)
            | ExpressionKind::RegexPattern(_)
            | ExpressionKind::PatternConversion(_) => {
                Value::Pattern(self.eval_pattern_node(expression)?)
            }
        };
        Ok(value)
    }

    fn undeclared_variable(&self, name: &str, span: SourceSpan) -> Value {
        if self.context.resolve_named_pattern(name).is_some() {
            self.add_error(span, messages::variable_not_declared_but_pattern_exists(name));
        } else {
            self.add_error(span, messages::variable_not_declared(name));
        }
        Value::Any
    }

    fn eval_identifier(&mut self, name: &str, span: SourceSpan) -> Value {
        match self.get(name) {
            Some(binding) => binding.value.clone(),
            None => self.undeclared_variable(name, span),
        }
    }

    fn eval_variable(&mut self, name: &str, span: SourceSpan) -> Value {
        match self.get_local(name) {
            Some(binding) => binding.value.clone(),
            None if self.get_global(name).is_some() => {
                self.add_error(span, messages::local_variable_not_declared(name));
                Value::Any
            }
            None => self.undeclared_variable(name, span),
        }
    }

    fn eval_global_variable(&mut self, name: &str, span: SourceSpan) -> Value {
        match self.get_global(name) {
            Some(binding) => binding.value.clone(),
            None => {
                self.add_error(span, messages::global_variable_not_declared(name));
                Value::Any
            }
        }
    }
}

pub(crate) fn invalid_ast(state: &State, span: SourceSpan, message: impl Into<String>) -> CheckError {
    CheckError::invalid_ast(message, state.location(span))
}
