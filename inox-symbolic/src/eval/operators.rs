use crate::ast::{BinaryExpression, BinaryOperator, SourceSpan, UnaryExpression, UnaryOperator};
use crate::error::CheckError;
use crate::messages;
use crate::state::State;
use crate::value::{
    join_values, merge_same_static_type, narrow_out, Value, ANY_BOOL, ANY_FLOAT, ANY_INT,
    ANY_PATTERN,
};

/// Whether the value is an integer once literal union members are merged (`1|2` is an int).
pub(super) fn is_int(value: &Value) -> bool {
    matches!(merge_same_static_type(value), Value::Int(_))
}

fn is_float(value: &Value) -> bool {
    matches!(merge_same_static_type(value), Value::Float(_))
}

fn is_bool(value: &Value) -> bool {
    matches!(merge_same_static_type(value), Value::Bool(_))
}

fn is_string_like_operand(value: &Value) -> bool {
    value.is_any() || value.is_string_like() || matches!(value, Value::Bytes)
}

impl State {
    pub(super) fn eval_unary(
        &mut self,
        unary: &UnaryExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let operand = self.eval(&unary.operand)?;
        let value = match unary.operator {
            UnaryOperator::Negate => match &operand {
                Value::Int(Some(value)) => Value::Int(value.checked_neg()),
                Value::Float(Some(value)) => Value::Float(Some(-value)),
                Value::Any => Value::Any,
                other if is_int(other) => ANY_INT,
                other if is_float(other) => ANY_FLOAT,
                other => {
                    self.add_error(span, messages::negate_operand(other));
                    Value::Any
                }
            },
            UnaryOperator::Not => match &operand {
                Value::Bool(Some(value)) => Value::Bool(Some(!value)),
                Value::Any => ANY_BOOL,
                other => {
                    if !is_bool(other) {
                        self.add_error(span, messages::not_operand(other));
                    }
                    ANY_BOOL
                }
            },
        };
        Ok(value)
    }

    pub(super) fn eval_binary(
        &mut self,
        binary: &BinaryExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let operator = binary.operator;
        let left = self.eval(&binary.left)?;

        // the right operand of `and` and `or` only runs when the left one did not decide
        let right = match operator {
            BinaryOperator::And | BinaryOperator::Or => {
                let mut fork = self.fork();
                fork.narrow_from_test(&binary.left, operator == BinaryOperator::And)?;
                let right = fork.eval(&binary.right)?;
                self.join(vec![fork], false);
                right
            }
            _ => self.eval(&binary.right)?,
        };

        let value = match operator {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::LessThan
            | BinaryOperator::LessOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterOrEqual => {
                self.eval_arithmetic(binary, operator, &left, &right)
            }
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::Is
            | BinaryOperator::IsNot => ANY_BOOL,
            BinaryOperator::In | BinaryOperator::NotIn => {
                if right.iteration_types().is_none() {
                    self.add_error(span, messages::in_operand_not_iterable(&right));
                }
                ANY_BOOL
            }
            BinaryOperator::Keyof => {
                if !left.is_any() && !left.is_string_like() {
                    self.add_error(span, messages::left_operand(operator, "string", &left));
                }
                if !matches!(right, Value::Object(_) | Value::Any) {
                    self.add_error(span, messages::keyof_operand_not_object(&right));
                }
                ANY_BOOL
            }
            BinaryOperator::Range | BinaryOperator::ExclusiveRange => Value::IntRange,
            BinaryOperator::And | BinaryOperator::Or => {
                if !left.is_any() && !is_bool(&left) {
                    self.add_error(span, messages::left_operand(operator, "boolean", &left));
                }
                if !right.is_any() && !is_bool(&right) {
                    self.add_error(span, messages::right_operand(operator, "boolean", &right));
                }
                ANY_BOOL
            }
            BinaryOperator::Match | BinaryOperator::NotMatch => {
                if !matches!(right, Value::Pattern(_) | Value::Any) {
                    self.add_error(span, messages::match_operand_not_pattern(&right));
                }
                ANY_BOOL
            }
            BinaryOperator::Substrof => {
                if !is_string_like_operand(&left) {
                    self.add_error(span, messages::left_operand(operator, "string-like", &left));
                }
                if !is_string_like_operand(&right) {
                    self.add_error(span, messages::right_operand(operator, "string-like", &right));
                }
                ANY_BOOL
            }
            BinaryOperator::SetDifference => {
                if !matches!(left, Value::Pattern(_) | Value::Any) {
                    self.add_error(span, messages::left_operand(operator, "pattern", &left));
                }
                ANY_PATTERN
            }
            BinaryOperator::NilCoalescing => {
                join_values([narrow_out(&Value::Nil, &left), right])
            }
        };
        Ok(value)
    }

    fn eval_arithmetic(
        &mut self,
        binary: &BinaryExpression,
        operator: BinaryOperator,
        left: &Value,
        right: &Value,
    ) -> Value {
        let is_comparison = matches!(
            operator,
            BinaryOperator::LessThan
                | BinaryOperator::LessOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterOrEqual
        );
        let result = |number: Value| if is_comparison { ANY_BOOL } else { number };

        if is_int(left) {
            if !right.is_any() && !is_int(right) {
                self.add_error(binary.right.span, messages::right_operand(operator, "int", right));
            }
            return result(ANY_INT);
        }
        if is_float(left) {
            if !right.is_any() && !is_float(right) {
                self.add_error(binary.right.span, messages::right_operand(operator, "float", right));
            }
            return result(ANY_FLOAT);
        }
        if left.is_any() {
            return if is_int(right) {
                result(ANY_INT)
            } else if is_float(right) {
                result(ANY_FLOAT)
            } else {
                result(Value::Any)
            };
        }

        self.add_error(
            binary.left.span,
            messages::left_operand(operator, "int or float", left),
        );
        if is_int(right) {
            result(ANY_INT)
        } else if is_float(right) {
            result(ANY_FLOAT)
        } else {
            if !right.is_any() {
                self.add_error(
                    binary.right.span,
                    messages::right_operand(operator, "int or float", right),
                );
            }
            result(Value::Any)
        }
    }
}
