//! Refinement of bindings along one branch of a conditional.
//!
//! A narrowing targets an access chain (`x`, `$$x`, `x.a.b`, `x[0]`). The narrowed value
//! of the innermost element is written back by rebuilding every container up to the root
//! variable, whose binding is then replaced.

use tracing::trace;

use crate::ast::{BinaryOperator, Expression, ExpressionKind, UnaryOperator};
use crate::error::CheckError;
use crate::eval::EvalOptions;
use crate::pattern::Pattern;
use crate::state::State;
use crate::value::{join_values, narrow_out, PropertyLookup, Value};

#[derive(Debug, Clone)]
pub(crate) enum Narrowing {
    /// The path holds exactly this value.
    To(Value),
    /// The path cannot hold any value contained in this one.
    Out(Value),
}

impl State {
    /// Current value of an access chain, read from the bindings without reporting anything.
    pub(crate) fn path_value(&self, path: &Expression) -> Option<Value> {
        match &path.kind {
            ExpressionKind::Variable(name) => self.get_local(name).map(|binding| binding.value.clone()),
            ExpressionKind::Identifier(name) => self.get(name).map(|binding| binding.value.clone()),
            ExpressionKind::GlobalVariable(name) => {
                self.get_global(name).map(|binding| binding.value.clone())
            }
            ExpressionKind::SelfExpression => self.self_value().cloned(),
            ExpressionKind::Member(member) => {
                match self.path_value(&member.object)?.get_property(&member.property.name) {
                    PropertyLookup::Found(value) => Some(value),
                    PropertyLookup::Missing | PropertyLookup::NoProperties => None,
                }
            }
            ExpressionKind::Index(index) => {
                let ExpressionKind::Int(position) = index.index.kind else {
                    return None;
                };
                let position = usize::try_from(position).ok()?;
                self.path_value(&index.indexed)?.element_at(position)
            }
            _ => None,
        }
    }

    pub(crate) fn narrow_path(&mut self, path: &Expression, narrowing: Narrowing) {
        let Some(current) = self.path_value(path) else {
            return;
        };
        let narrowed = match narrowing {
            Narrowing::To(value) => value,
            Narrowing::Out(removed) => {
                let remaining = narrow_out(&removed, &current);
                // an empty remainder means the branch is unreachable, keep the previous value
                if remaining.is_never() {
                    return;
                }
                remaining
            }
        };
        trace!(node = %path.id, value = %narrowed, "narrowing path");

        match &path.kind {
            ExpressionKind::Variable(name) | ExpressionKind::Identifier(name) => {
                self.narrow_binding(name, narrowed);
            }
            ExpressionKind::GlobalVariable(name) => self.narrow_global(name, narrowed),
            ExpressionKind::Member(member) => {
                let Some(object) = self.path_value(&member.object) else {
                    return;
                };
                if let Some(updated) =
                    object.with_existing_prop_replaced(&member.property.name, narrowed)
                {
                    self.narrow_path(&member.object, Narrowing::To(updated));
                }
            }
            ExpressionKind::Index(index) => {
                let ExpressionKind::Int(position) = index.index.kind else {
                    return;
                };
                let Ok(position) = usize::try_from(position) else {
                    return;
                };
                let Some(sequence) = self.path_value(&index.indexed) else {
                    return;
                };
                if let Some(updated) = sequence.with_element_replaced(position, narrowed) {
                    self.narrow_path(&index.indexed, Narrowing::To(updated));
                }
            }
            _ => {}
        }
    }

    /// Narrows the state assuming `test` evaluated to `holds`. The test must already have
    /// been evaluated.
    pub(crate) fn narrow_from_test(&mut self, test: &Expression, holds: bool) -> Result<(), CheckError> {
        match &test.kind {
            ExpressionKind::Unary(unary) if unary.operator == UnaryOperator::Not => {
                self.narrow_from_test(&unary.operand, !holds)
            }
            ExpressionKind::Binary(binary) => {
                let (left, right) = (&*binary.left, &*binary.right);
                match binary.operator {
                    BinaryOperator::And if holds => {
                        self.narrow_from_test(left, true)?;
                        self.narrow_from_test(right, true)
                    }
                    BinaryOperator::Or if !holds => {
                        self.narrow_from_test(left, false)?;
                        self.narrow_from_test(right, false)
                    }
                    BinaryOperator::Is | BinaryOperator::Match => {
                        self.narrow_matching(left, right, holds)
                    }
                    BinaryOperator::IsNot | BinaryOperator::NotMatch => {
                        self.narrow_matching(left, right, !holds)
                    }
                    BinaryOperator::Equal => self.narrow_equal(left, right, holds),
                    BinaryOperator::NotEqual => self.narrow_equal(left, right, !holds),
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn narrow_matching(
        &mut self,
        subject: &Expression,
        matched: &Expression,
        holds: bool,
    ) -> Result<(), CheckError> {
        let Some(current) = self.path_value(subject) else {
            return Ok(());
        };
        let matched = self.eval_with(matched, EvalOptions::re_eval())?;

        let narrowing = match (&matched, holds) {
            (Value::Pattern(pattern), true) => Narrowing::To(matching_part(&current, pattern)),
            (Value::Pattern(pattern), false) => match pattern.exact_match_set() {
                Some(matched) => Narrowing::Out(matched),
                None => return Ok(()),
            },
            (value, true) if value.has_concrete_payload() => Narrowing::To(value.clone()),
            (value, false) if value.has_concrete_payload() => Narrowing::Out(value.clone()),
            _ => return Ok(()),
        };
        self.narrow_path(subject, narrowing);
        Ok(())
    }

    /// Narrows `subject` to the values matched by `pattern`.
    pub(crate) fn narrow_to_pattern(&mut self, subject: &Expression, pattern: &Pattern) {
        let Some(current) = self.path_value(subject) else {
            return;
        };
        self.narrow_path(subject, Narrowing::To(matching_part(&current, pattern)));
    }

    fn narrow_equal(
        &mut self,
        left: &Expression,
        right: &Expression,
        holds: bool,
    ) -> Result<(), CheckError> {
        let (subject, compared) = match (&left.kind, &right.kind) {
            (_, ExpressionKind::Nil) => (left, Value::Nil),
            (ExpressionKind::Nil, _) => (right, Value::Nil),
            _ => {
                let compared = self.eval_with(right, EvalOptions::re_eval())?;
                if !compared.has_concrete_payload() {
                    return Ok(());
                }
                (left, compared)
            }
        };
        let Some(current) = self.path_value(subject) else {
            return Ok(());
        };

        if holds {
            if current.test(&compared) {
                self.narrow_path(subject, Narrowing::To(compared));
            }
        } else {
            self.narrow_path(subject, Narrowing::Out(compared));
        }
        Ok(())
    }
}

/// Union members of `current` matched by the pattern, or the pattern's value when none is.
fn matching_part(current: &Value, pattern: &Pattern) -> Value {
    let kept: Vec<Value> = current
        .members()
        .iter()
        .filter(|member| pattern.test_value(member))
        .cloned()
        .collect();
    if kept.is_empty() {
        pattern.symbolic_value()
    } else {
        join_values(kept)
    }
}
