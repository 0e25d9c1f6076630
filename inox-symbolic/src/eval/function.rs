use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::ast::{
    CallExpression, Element, ExpressionKind, FunctionBody, FunctionDeclaration,
    FunctionExpression, SourceSpan,
};
use crate::error::CheckError;
use crate::messages;
use crate::pattern::{Pattern, SecretPattern};
use crate::state::State;
use crate::value::{join_values, FunctionValue, HostFunction, Value};
use crate::visit;

use super::{block_always_returns, EvalOptions};

/// Parameters and return type of a function expression.
struct Signature {
    parameters: Vec<(String, Value, Pattern)>,
    return_type: Option<Value>,
}

/// Evaluated call arguments. Elements of spread lists are inlined.
struct Arguments {
    values: Vec<Value>,
    spans: Vec<SourceSpan>,
    non_spread: usize,
    has_spread: bool,
}

/// Value produced by a block body: nil when it can end without returning.
fn block_result(returned: Option<Value>, always_returns: bool) -> Value {
    match returned.filter(|value| !value.is_never()) {
        None => Value::Nil,
        Some(value) if always_returns => value,
        Some(value) => join_values([value, Value::Nil]),
    }
}

impl State {
    pub(super) fn eval_function_declaration(
        &mut self,
        declaration: &FunctionDeclaration,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let ExpressionKind::Function(function) = &declaration.function.kind else {
            return Err(super::invalid_ast(
                self,
                span,
                "function declaration without a function expression",
            ));
        };
        let name = &declaration.name.name;

        if self.is_declaring_function() && visit::function_mentions(function, name) {
            self.add_error(span, messages::NESTED_RECURSIVE_FUNCTION_DECLARATION);
        }
        self.session.mark_declared_function(function.id);

        // recursive references resolve to a placeholder carrying the signature only
        let signature = self.silent_fork().eval_signature(function)?;
        let placeholder = FunctionValue {
            node: function.clone(),
            parameter_names: signature.parameters.iter().map(|(name, ..)| name.clone()).collect(),
            parameters: signature.parameters.into_iter().map(|(_, value, _)| value).collect(),
            variadic: function.variadic,
            return_type: signature.return_type,
            inferred_return: Value::Never,
            captured: BTreeMap::new(),
            receiver: None,
        };
        if !self.set_global(name, Value::Function(Some(Arc::new(placeholder))), true) {
            self.add_error(declaration.name.span, messages::attempt_to_assign_constant_global(name));
            return Ok(());
        }

        self.push_declaring(function.id);
        let value = self.eval(&declaration.function);
        self.pop_declaring();
        let value = value?;

        debug!(function = %name, value = %value, "declared function");
        self.override_global(name, value);
        Ok(())
    }

    fn eval_signature(&mut self, function: &FunctionExpression) -> Result<Signature, CheckError> {
        let mut parameters = Vec::with_capacity(function.parameters.len());
        let last = function.parameters.len().saturating_sub(1);

        for (index, parameter) in function.parameters.iter().enumerate() {
            let variadic = function.variadic && index == last;
            let pattern = match &parameter.pattern {
                Some(annotation) => self.eval_type_annotation(annotation)?,
                None if variadic => Pattern::of_type(Value::list_of(Value::Any)),
                None => Pattern::Any,
            };
            let value = match pattern.symbolic_value() {
                Value::List(list) if variadic => Value::List(list),
                _ if variadic => Value::list_of(Value::Any),
                value => value,
            };
            parameters.push((parameter.name.name.clone(), value, pattern));
        }

        let return_type = match &function.return_type {
            Some(annotation) => Some(self.eval_type_annotation(annotation)?.symbolic_value()),
            None => None,
        };
        Ok(Signature {
            parameters,
            return_type,
        })
    }

    pub(super) fn eval_function_expression(
        &mut self,
        function: &Arc<FunctionExpression>,
    ) -> Result<Value, CheckError> {
        let receiver = self.next_self().cloned();

        let mut captured = BTreeMap::new();
        for local in &function.captured_locals {
            let value = match self.get_local(&local.name) {
                Some(binding) => binding.value.clone(),
                None => {
                    self.add_error(local.span, messages::local_variable_not_declared(&local.name));
                    Value::Any
                }
            };
            captured.insert(local.name.clone(), value);
        }

        let mut fork = self.fork();
        fork.reset_call_depth();
        fork.push_scope();
        let (signature, inferred_return) = match &receiver {
            Some(receiver) => fork
                .bind_self(receiver.clone())
                .check_function(function, &captured)?,
            None => fork.check_function(function, &captured)?,
        };

        let value = FunctionValue {
            node: function.clone(),
            parameter_names: signature.parameters.iter().map(|(name, ..)| name.clone()).collect(),
            parameters: signature.parameters.into_iter().map(|(_, value, _)| value).collect(),
            variadic: function.variadic,
            return_type: signature.return_type,
            inferred_return,
            captured,
            receiver,
        };
        Ok(Value::Function(Some(Arc::new(value))))
    }

    /// Checks the body of a function in the fresh scope of a fork, returns the signature and
    /// the inferred return value.
    fn check_function(
        &mut self,
        function: &FunctionExpression,
        captured: &BTreeMap<String, Value>,
    ) -> Result<(Signature, Value), CheckError> {
        let signature = self.eval_signature(function)?;
        for (name, value, pattern) in &signature.parameters {
            self.set_local(name, value.clone(), Some(pattern.clone()));
        }
        for (name, value) in captured {
            self.set_local(name, value.clone(), None);
        }

        self.push_callee(function.id);
        self.return_type = signature.return_type.clone();
        self.return_value = None;

        let inferred = match &function.body {
            FunctionBody::Expression(body) => {
                let value =
                    self.eval_with(body, EvalOptions::expecting(signature.return_type.clone()))?;
                if let Some(return_type) = &signature.return_type {
                    if value.widen_until(|candidate| return_type.test(candidate)).is_none() {
                        self.add_error(body.span, messages::invalid_return_value(&value, return_type));
                    }
                }
                value
            }
            FunctionBody::Block(block) => {
                self.eval_block(block)?;
                let returned = self.return_value.take();
                let always_returns = block_always_returns(block);
                if signature.return_type.is_some() {
                    if returned.is_none() {
                        self.add_error(function.span, messages::MISSING_RETURN);
                    } else if !always_returns {
                        self.add_error(function.span, messages::MISSING_UNCONDITIONAL_RETURN);
                    }
                }
                block_result(returned, always_returns)
            }
        };
        self.pop_callee();
        Ok((signature, inferred))
    }

    pub(super) fn eval_call(
        &mut self,
        call: &CallExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let callee_options = match &call.callee.kind {
            ExpressionKind::DoubleColon(_) => EvalOptions {
                double_colon_allowed: true,
                callee: true,
                ..EvalOptions::default()
            },
            ExpressionKind::Member(_) | ExpressionKind::Index(_) => EvalOptions {
                double_colon_allowed: true,
                ..EvalOptions::default()
            },
            _ => EvalOptions::default(),
        };
        let callee = self.eval_with(&call.callee, callee_options)?;

        let expected_parameters: Vec<Value> = match &callee {
            Value::Function(Some(function)) => function.parameters.clone(),
            Value::HostFunction(function) => function.parameters.clone(),
            _ => Vec::new(),
        };
        let arguments = self.eval_arguments(&call.arguments, &expected_parameters)?;

        match callee {
            Value::Function(Some(function)) => self.call_function(&function, arguments, span),
            Value::HostFunction(function) => Ok(self.call_host_function(&function, arguments, span)),
            Value::Pattern(Pattern::Secret(secret)) => {
                Ok(self.create_secret(&secret, arguments, span))
            }
            Value::Function(None) | Value::Any => Ok(Value::Any),
            other => {
                self.add_error(span, messages::cannot_call(&other));
                Ok(Value::Any)
            }
        }
    }

    fn eval_arguments(
        &mut self,
        elements: &[Element],
        parameters: &[Value],
    ) -> Result<Arguments, CheckError> {
        let mut arguments = Arguments {
            values: Vec::with_capacity(elements.len()),
            spans: Vec::with_capacity(elements.len()),
            non_spread: 0,
            has_spread: false,
        };

        for element in elements {
            if element.spread {
                arguments.has_spread = true;
                let spread = self.eval(&element.value)?;
                match &spread {
                    Value::List(list) => match list.elements() {
                        Some(items) => {
                            for item in items {
                                arguments.values.push(item.clone());
                                arguments.spans.push(element.value.span);
                            }
                        }
                        None => {
                            arguments.values.push(list.element());
                            arguments.spans.push(element.value.span);
                        }
                    },
                    Value::Any => {}
                    other => {
                        self.add_error(element.value.span, messages::spread_argument_not_list(other));
                    }
                }
                continue;
            }

            let expected = parameters
                .get(arguments.values.len())
                .filter(|parameter| !parameter.is_any())
                .cloned();
            let value = self.eval_with(&element.value, EvalOptions::expecting(expected))?;
            arguments.values.push(value);
            arguments.spans.push(element.value.span);
            arguments.non_spread += 1;
        }
        Ok(arguments)
    }

    /// Widens each argument until its parameter accepts it. Rejected arguments are reported
    /// and replaced by the parameter type.
    fn check_arguments(
        &self,
        arguments: &mut Arguments,
        parameter_at: impl Fn(usize) -> Option<Value>,
        call_span: SourceSpan,
    ) {
        for (position, argument) in arguments.values.iter_mut().enumerate() {
            let Some(parameter) = parameter_at(position) else {
                continue;
            };
            if parameter.is_any() {
                continue;
            }
            match argument.widen_until(|candidate| parameter.test(candidate)) {
                Some(widened) => *argument = widened,
                None => {
                    let span = arguments.spans.get(position).copied().unwrap_or(call_span);
                    self.add_error(span, messages::invalid_argument(position, &*argument, &parameter));
                    *argument = parameter;
                }
            }
        }
    }

    fn call_function(
        &mut self,
        function: &Arc<FunctionValue>,
        mut arguments: Arguments,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let fixed = function.non_variadic_parameter_count();

        if function.variadic {
            if arguments.non_spread < fixed {
                self.add_error(span, messages::invalid_number_of_non_spread_args(arguments.non_spread, fixed));
                for parameter in &function.parameters[arguments.values.len().min(fixed)..fixed] {
                    arguments.values.push(parameter.clone());
                    arguments.spans.push(span);
                }
            }
        } else {
            if arguments.has_spread {
                self.add_error(span, messages::SPREAD_ARGS_NOT_SUPPORTED);
            }
            if arguments.values.len() != fixed {
                if !arguments.has_spread {
                    self.add_error(span, messages::invalid_number_of_args(arguments.values.len(), fixed));
                }
                arguments.values.truncate(fixed);
                arguments.spans.truncate(fixed);
                for parameter in &function.parameters[arguments.values.len()..fixed] {
                    arguments.values.push(parameter.clone());
                    arguments.spans.push(span);
                }
            }
        }

        let variadic_element = function
            .variadic
            .then(|| function.parameters.last().and_then(Value::element))
            .flatten();
        self.check_arguments(
            &mut arguments,
            |position| {
                if position < fixed {
                    function.parameters.get(position).cloned()
                } else {
                    variadic_element.clone()
                }
            },
            span,
        );

        if let Some(return_type) = &function.return_type {
            return Ok(return_type.clone());
        }

        if self.is_callee_active(function.node.id) {
            if self.session.is_declared_function(function.node.id) {
                return Ok(function.result().clone());
            }
            self.add_error(span, messages::RECURSIVE_CALL_WITHOUT_RETURN_TYPE);
            return Ok(Value::Any);
        }

        self.push_scope();
        let result = match &function.receiver {
            Some(receiver) => self
                .bind_self(receiver.clone())
                .run_function_body(function, arguments.values),
            None => self.run_function_body(function, arguments.values),
        };
        self.pop_scope();
        result
    }

    /// Evaluates the body of a function with its parameters bound to the arguments.
    fn run_function_body(
        &mut self,
        function: &FunctionValue,
        mut arguments: Vec<Value>,
    ) -> Result<Value, CheckError> {
        let fixed = function.non_variadic_parameter_count();
        let rest = if arguments.len() > fixed {
            arguments.split_off(fixed)
        } else {
            Vec::new()
        };
        for (name, argument) in function.parameter_names.iter().zip(arguments) {
            self.set_local(name, argument, None);
        }
        if function.variadic {
            if let Some(name) = function.parameter_names.last() {
                self.set_local(name, Value::list(rest), None);
            }
        }
        for (name, value) in &function.captured {
            self.set_local(name, value.clone(), None);
        }

        let saved_return_type = self.return_type.take();
        let saved_return_value = self.return_value.take();
        let saved_iteration_change = self.iteration_change;
        self.push_callee(function.node.id);
        self.enter_call();

        let result = match &function.node.body {
            FunctionBody::Expression(body) => self.eval(body),
            FunctionBody::Block(block) => self.eval_block(block).map(|()| {
                block_result(self.return_value.take(), block_always_returns(block))
            }),
        };

        self.exit_call();
        self.pop_callee();
        self.return_type = saved_return_type;
        self.return_value = saved_return_value;
        self.iteration_change = saved_iteration_change;
        result
    }

    fn call_host_function(
        &self,
        function: &HostFunction,
        mut arguments: Arguments,
        span: SourceSpan,
    ) -> Value {
        let fixed = function.parameters.len();
        match &function.variadic {
            Some(_) => {
                if arguments.non_spread < fixed {
                    self.add_error(span, messages::invalid_number_of_non_spread_args(arguments.non_spread, fixed));
                }
            }
            None => {
                if arguments.has_spread {
                    self.add_error(span, messages::SPREAD_ARGS_NOT_SUPPORTED);
                } else if arguments.values.len() != fixed {
                    self.add_error(span, messages::invalid_number_of_args(arguments.values.len(), fixed));
                }
            }
        }
        self.check_arguments(
            &mut arguments,
            |position| {
                function
                    .parameters
                    .get(position)
                    .or(function.variadic.as_ref())
                    .cloned()
            },
            span,
        );
        function.result.clone()
    }

    fn create_secret(&self, secret: &SecretPattern, arguments: Arguments, span: SourceSpan) -> Value {
        match arguments.values.as_slice() {
            [value] => {
                if !value.is_any() && !secret.string_pattern.test_value(value) {
                    self.add_error(span, messages::secret_pattern_argument(value));
                }
            }
            values => self.add_error(span, messages::invalid_number_of_args(values.len(), 1)),
        }
        Value::Secret(Some(secret.id))
    }
}
