use tracing::debug;

use crate::ast::{
    Block, Expression, ForStatement, IfExpression, IfStatement, MatchStatement, SourceSpan,
    Statement, StatementKind, SwitchStatement, SynchronizedBlock, WalkStatement,
};
use crate::error::CheckError;
use crate::messages;
use crate::narrowing::Narrowing;
use crate::pattern::Pattern;
use crate::state::{IterationChange, State};
use crate::value::{join_values, merge_same_static_type, Value};

use super::EvalOptions;

/// Whether every path through the block ends with a return statement.
pub(crate) fn block_always_returns(block: &Block) -> bool {
    block.statements.iter().any(statement_always_returns)
}

fn statement_always_returns(statement: &Statement) -> bool {
    match &statement.kind {
        StatementKind::Return(_) => true,
        StatementKind::Block(block) => block_always_returns(block),
        StatementKind::Synchronized(synchronized) => block_always_returns(&synchronized.block),
        StatementKind::If(if_statement) => {
            if_statement.alternate.as_ref().is_some_and(|alternate| {
                block_always_returns(&if_statement.consequent) && block_always_returns(alternate)
            })
        }
        StatementKind::Switch(switch) => switch.default.as_ref().is_some_and(|default| {
            block_always_returns(default)
                && switch.cases.iter().all(|case| block_always_returns(&case.block))
        }),
        StatementKind::Match(match_statement) => {
            match_statement.default.as_ref().is_some_and(|default| {
                block_always_returns(default)
                    && match_statement
                        .cases
                        .iter()
                        .all(|case| block_always_returns(&case.block))
            })
        }
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    value.is_any() || matches!(merge_same_static_type(value), Value::Bool(_))
}

impl State {
    pub(super) fn eval_return(
        &mut self,
        value: Option<&Expression>,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let expected = self.return_type.clone();
        let returned = match value {
            Some(expression) => self.eval_with(expression, EvalOptions::expecting(expected.clone()))?,
            None => Value::Nil,
        };
        if let Some(expected) = &expected {
            if returned.widen_until(|candidate| expected.test(candidate)).is_none() {
                self.add_error(span, messages::invalid_return_value(&returned, expected));
            }
        }
        self.return_value = Some(match self.return_value.take() {
            Some(previous) => join_values([previous, returned]),
            None => returned,
        });
        Ok(())
    }

    /// Joins the forks of a branching statement. Branches that always return do not reach
    /// the next statement: only their return value is kept.
    fn join_branches(&mut self, branches: Vec<(State, bool)>, exhaustive: bool) {
        if branches.iter().all(|(_, returns)| *returns) {
            let forks = branches.into_iter().map(|(fork, _)| fork).collect();
            self.join(forks, exhaustive);
            return;
        }

        let mut continuing = Vec::with_capacity(branches.len());
        let mut returned = Vec::new();
        for (fork, returns) in branches {
            if returns {
                returned.extend(fork.return_value);
            } else {
                continuing.push(fork);
            }
        }
        self.join(continuing, exhaustive);
        if !returned.is_empty() {
            self.return_value = Some(join_values(self.return_value.take().into_iter().chain(returned)));
        }
    }

    pub(super) fn eval_if_statement(&mut self, if_statement: &IfStatement) -> Result<(), CheckError> {
        let test = self.eval(&if_statement.test)?;
        if !is_boolean(&test) {
            self.add_error(if_statement.test.span, messages::if_test_not_bool(&test));
        }

        let mut consequent = self.fork();
        consequent.narrow_from_test(&if_statement.test, true)?;
        consequent.eval_block(&if_statement.consequent)?;

        // the alternate fork exists even without an else block: it carries the narrowing
        // of the path where the test is false
        let mut alternate = self.fork();
        alternate.narrow_from_test(&if_statement.test, false)?;
        let mut alternate_returns = false;
        if let Some(block) = &if_statement.alternate {
            alternate.eval_block(block)?;
            alternate_returns = block_always_returns(block);
        }

        self.join_branches(
            vec![
                (consequent, block_always_returns(&if_statement.consequent)),
                (alternate, alternate_returns),
            ],
            true,
        );
        Ok(())
    }

    pub(super) fn eval_if_expression(
        &mut self,
        if_expression: &IfExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let test = self.eval(&if_expression.test)?;
        if !is_boolean(&test) {
            self.add_error(span, messages::if_expression_test_not_bool(&test));
        }

        let mut consequent_fork = self.fork();
        consequent_fork.narrow_from_test(&if_expression.test, true)?;
        let consequent = consequent_fork.eval(&if_expression.consequent)?;

        let mut alternate_fork = self.fork();
        alternate_fork.narrow_from_test(&if_expression.test, false)?;
        let alternate = match &if_expression.alternate {
            Some(alternate) => alternate_fork.eval(alternate)?,
            None => Value::Nil,
        };

        self.join(vec![consequent_fork, alternate_fork], true);
        Ok(join_values([consequent, alternate]))
    }

    pub(super) fn eval_for(&mut self, for_statement: &ForStatement) -> Result<(), CheckError> {
        let iterated = self.eval(&for_statement.iterated)?;
        let (key, element) = match iterated.iteration_types() {
            Some(types) => types,
            None if iterated.is_any() => (Value::Any, Value::Any),
            None => {
                self.add_error(for_statement.iterated.span, messages::not_iterable(&iterated));
                (Value::Any, Value::Any)
            }
        };

        // iterating a known empty sequence never runs the body
        if self.is_in_call() && iterated.known_len() == Some(0) {
            return Ok(());
        }

        let mut body = self.fork();
        if let Some(variable) = &for_statement.key {
            body.set_local(&variable.name, key, None);
        }
        if let Some(variable) = &for_statement.value {
            body.set_local(&variable.name, element, None);
        }
        body.eval_block(&for_statement.body)?;
        body.iteration_change = IterationChange::None;

        self.join(vec![body], false);
        Ok(())
    }

    pub(super) fn eval_walk(&mut self, walk: &WalkStatement) -> Result<(), CheckError> {
        let walked = self.eval(&walk.walked)?;
        let entry = match walked.walk_entry() {
            Some(entry) => entry,
            None => {
                if !walked.is_any() {
                    self.add_error(walk.walked.span, messages::not_walkable(&walked));
                }
                Value::Any
            }
        };

        let mut body = self.fork();
        body.set_local(&walk.entry.name, entry, None);
        body.eval_block(&walk.body)?;
        body.iteration_change = IterationChange::None;

        self.join(vec![body], false);
        Ok(())
    }

    pub(super) fn eval_switch(&mut self, switch: &SwitchStatement) -> Result<(), CheckError> {
        self.eval(&switch.discriminant)?;
        let current = self.path_value(&switch.discriminant);

        let mut branches = Vec::new();
        let mut case_values = Vec::new();
        for case in &switch.cases {
            for value_node in &case.values {
                let value = self.eval(value_node)?;
                let mut fork = self.fork();
                if value.has_concrete_payload()
                    && current.as_ref().is_some_and(|current| current.test(&value))
                {
                    fork.narrow_path(&switch.discriminant, Narrowing::To(value.clone()));
                }
                fork.eval_block(&case.block)?;
                branches.push((fork, block_always_returns(&case.block)));
                case_values.push(value);
            }
        }

        if let Some(default) = &switch.default {
            let mut fork = self.fork();
            for value in case_values.into_iter().filter(Value::has_concrete_payload) {
                fork.narrow_path(&switch.discriminant, Narrowing::Out(value));
            }
            fork.eval_block(default)?;
            branches.push((fork, block_always_returns(default)));
        }

        debug!(branches = branches.len(), "joining switch branches");
        self.join_branches(branches, switch.default.is_some());
        Ok(())
    }

    pub(super) fn eval_match(&mut self, match_statement: &MatchStatement) -> Result<(), CheckError> {
        let discriminant = &match_statement.discriminant;
        self.eval(discriminant)?;

        let mut branches = Vec::new();
        let mut patterns = Vec::new();
        for case in &match_statement.cases {
            for value_node in &case.values {
                let pattern = match self.eval(value_node)? {
                    Value::Pattern(pattern) => pattern,
                    other => Pattern::exact(other),
                };

                let mut fork = self.fork();
                fork.narrow_to_pattern(discriminant, &pattern);
                if let Some(variable) = &case.group_matching_variable {
                    match pattern.match_groups() {
                        Some(groups) => fork.set_local(&variable.name, groups, None),
                        None => {
                            self.add_error(variable.span, messages::not_group_matching_pattern(&pattern));
                            fork.set_local(&variable.name, Value::Any, None);
                        }
                    }
                }
                fork.eval_block(&case.block)?;
                branches.push((fork, block_always_returns(&case.block)));
                patterns.push(pattern);
            }
        }

        if let Some(default) = &match_statement.default {
            let mut fork = self.fork();
            for matched in patterns.iter().filter_map(Pattern::exact_match_set) {
                fork.narrow_path(discriminant, Narrowing::Out(matched));
            }
            fork.eval_block(default)?;
            branches.push((fork, block_always_returns(default)));
        }

        self.join_branches(branches, match_statement.default.is_some());
        Ok(())
    }

    pub(super) fn eval_synchronized(
        &mut self,
        synchronized: &SynchronizedBlock,
    ) -> Result<(), CheckError> {
        for value_node in &synchronized.values {
            let value = self.eval(value_node)?;
            if value.is_mutable() && !value.is_sharable() {
                self.add_error(value_node.span, messages::synchronized_value_not_sharable(&value));
            }
        }
        self.eval_block(&synchronized.block)
    }

    pub(super) fn eval_assertion(&mut self, expression: &Expression) -> Result<(), CheckError> {
        let asserted = self.eval(expression)?;
        if !is_boolean(&asserted) {
            self.add_error(expression.span, messages::asserted_value_not_bool(&asserted));
            return Ok(());
        }
        // the statements after an assertion only run when it holds
        self.narrow_from_test(expression, true)
    }
}
