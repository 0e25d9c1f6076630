use crate::ast::{
    Assignment, AssignmentOperator, Expression, ExpressionKind, IndexExpression,
    LocalVariableDeclaration, MultiAssignment, SliceExpression, SourceSpan,
};
use crate::error::CheckError;
use crate::messages;
use crate::narrowing::Narrowing;
use crate::state::State;
use crate::value::{join_values, SetPropertyError, Value, ANY_INT};

use super::operators::is_int;
use super::EvalOptions;

impl State {
    pub(super) fn eval_local_declarations(
        &mut self,
        declarations: &[LocalVariableDeclaration],
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        for declaration in declarations {
            let static_type = match &declaration.type_annotation {
                Some(annotation) => Some(self.eval_type_annotation(annotation)?),
                None => None,
            };
            let expected = static_type.as_ref().map(|pattern| pattern.symbolic_value());

            let (mut value, value_span) = match &declaration.initializer {
                Some(initializer) => (
                    self.eval_with(initializer, EvalOptions::expecting(expected))?,
                    initializer.span,
                ),
                None => (expected.unwrap_or(Value::Nil), span),
            };

            if let Some(static_type) = &static_type {
                if value
                    .widen_until(|candidate| static_type.test_value(candidate))
                    .is_none()
                {
                    self.add_error(
                        value_span,
                        messages::not_assignable_to_variable_of_type(&value, static_type),
                    );
                    value = Value::Any;
                }
            }
            self.set_local(&declaration.name.name, value, static_type);
        }
        Ok(())
    }

    pub(super) fn eval_assignment(
        &mut self,
        assignment: &Assignment,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let right = self.eval(&assignment.value)?;
        let operator = assignment.operator;

        let mut bad_right_operand = false;
        if operator.is_int_operation() && !is_int(&right) {
            self.add_error(assignment.value.span, messages::INT_ASSIGNMENT_RHS_NOT_INT);
            bad_right_operand = true;
        }
        // compound assignments always produce an int
        let assigned = if operator.is_int_operation() {
            ANY_INT
        } else {
            right.clone()
        };

        let target = &assignment.target;
        match &target.kind {
            ExpressionKind::Variable(name) | ExpressionKind::Identifier(name) => {
                match self.get_local(name).map(|binding| binding.value.clone()) {
                    Some(current) if operator.is_int_operation() => {
                        if !is_int(&current) {
                            self.add_error(span, messages::INT_ASSIGNMENT_LHS_NOT_INT);
                        } else if !bad_right_operand {
                            self.update_local(name, assigned, span);
                        }
                    }
                    Some(_) => {
                        self.update_local(name, assigned, span);
                    }
                    None => self.set_local(name, assigned, None),
                }
                self.record_value(target.id, &right);
            }
            ExpressionKind::GlobalVariable(name) => {
                match self.get_global(name).map(|binding| binding.value.clone()) {
                    Some(current) if operator.is_int_operation() => {
                        if !is_int(&current) {
                            self.add_error(span, messages::INT_ASSIGNMENT_LHS_NOT_INT);
                        } else if !bad_right_operand {
                            self.update_global(name, assigned, span);
                        }
                    }
                    Some(_) => {
                        self.update_global(name, assigned, span);
                    }
                    None => {
                        self.set_global(name, assigned, false);
                    }
                }
                self.record_value(target.id, &right);
            }
            ExpressionKind::Member(member) => {
                let options = EvalOptions {
                    double_colon_allowed: true,
                    ..EvalOptions::default()
                };
                let object = self.eval_with(&member.object, options)?;
                self.assign_property(
                    &member.object,
                    object,
                    &member.property.name,
                    operator,
                    assigned,
                    bad_right_operand,
                    span,
                );
                self.record_value(target.id, &right);
            }
            ExpressionKind::DoubleColon(double_colon) => {
                let options = EvalOptions {
                    double_colon_allowed: true,
                    ..EvalOptions::default()
                };
                let element = self.eval_with(&double_colon.element, options)?;
                self.assign_property(
                    &double_colon.element,
                    element,
                    &double_colon.property.name,
                    operator,
                    assigned,
                    bad_right_operand,
                    span,
                );
                self.record_value(target.id, &right);
            }
            ExpressionKind::Index(index) => {
                self.assign_element(index, operator, &right, span)?;
                self.record_value(target.id, &right);
            }
            ExpressionKind::Slice(slice) => {
                self.assign_slice(slice, operator, &right, span)?;
            }
            other => {
                return Err(super::invalid_ast(
                    self,
                    target.span,
                    format!(
                        "invalid assignment: left hand side is a(n) {}",
                        other.describe()
                    ),
                ))
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn assign_property(
        &mut self,
        object_expression: &Expression,
        object: Value,
        name: &str,
        operator: AssignmentOperator,
        value: Value,
        bad_right_operand: bool,
        span: SourceSpan,
    ) {
        if object.is_any() {
            return;
        }
        let Value::Object(shape) = &object else {
            self.add_error(span, messages::cannot_assign_property_of(&object));
            return;
        };

        if operator.is_int_operation() {
            if let Some(previous) = shape.properties.get(name) {
                if !is_int(previous) {
                    self.add_error(span, messages::INT_ASSIGNMENT_LHS_NOT_INT);
                    return;
                }
            }
            if bad_right_operand {
                return;
            }
        }

        if !value.is_serializable() {
            self.add_error(span, messages::not_serializable_property_value(&value));
            return;
        }
        if value.is_mutable() && !value.is_watchable() {
            self.add_error(span, messages::not_watchable_property_value(&value));
            return;
        }

        match shape.with_property_set(name, value.clone()) {
            Ok(updated) => {
                let updated = Value::Object(updated.into());
                self.narrow_path(object_expression, Narrowing::To(updated));
            }
            Err(SetPropertyError::Readonly) => {
                self.add_error(span, messages::readonly_object_property(name));
            }
            Err(SetPropertyError::NewPropertyOnExactObject) => {
                self.add_error(span, messages::cannot_add_property_to_exact_object(name));
            }
            Err(SetPropertyError::NotAssignable { expected }) => {
                self.add_error(
                    span,
                    messages::not_assignable_to_property_of_type(&value, &expected),
                );
            }
        }
    }

    /// Element type the sequence at `expression` was declared with, falling back to the
    /// widest type of its current elements.
    fn declared_element(&self, expression: &Expression, sequence: &Value) -> Value {
        let declared = match &expression.kind {
            ExpressionKind::Variable(name) | ExpressionKind::Identifier(name) => {
                self.get(name).map(|binding| binding.static_type.symbolic_value())
            }
            ExpressionKind::GlobalVariable(name) => self
                .get_global(name)
                .map(|binding| binding.static_type.symbolic_value()),
            _ => None,
        };
        declared
            .and_then(|declared| declared.element())
            .unwrap_or_else(|| {
                sequence
                    .element()
                    .map_or(Value::Any, |element| element.widest_of_type())
            })
    }

    fn assign_element(
        &mut self,
        index: &IndexExpression,
        operator: AssignmentOperator,
        right: &Value,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let options = EvalOptions {
            double_colon_allowed: true,
            ..EvalOptions::default()
        };
        let sequence = self.eval_with(&index.indexed, options)?;
        let mutable = sequence.is_mutable_sequence();
        if !mutable {
            self.add_error(index.indexed.span, messages::not_mutable_sequence(&sequence));
        } else if operator.is_int_operation()
            && !sequence.element().is_some_and(|element| ANY_INT.test(&element))
        {
            self.add_error(span, messages::INT_ASSIGNMENT_LHS_NOT_INT);
        }

        let position = self.eval(&index.index)?;
        if !is_int(&position) {
            self.add_error(span, messages::index_not_int(&position));
            return Ok(());
        }
        if !mutable {
            return Ok(());
        }

        let known_position = match (&position, sequence.known_len()) {
            (Value::Int(Some(position)), Some(len)) => {
                if *position < 0 || *position as usize >= len {
                    self.add_error(span, messages::INDEX_OUT_OF_BOUNDS);
                    return Ok(());
                }
                Some(*position as usize)
            }
            _ => None,
        };

        let assigned = if operator.is_int_operation() {
            ANY_INT
        } else {
            right.clone()
        };
        let element = self.declared_element(&index.indexed, &sequence);
        if !element.test(&assigned) {
            self.add_error(span, messages::IMPOSSIBLE_TO_KNOW_UPDATED_ELEMENT);
            return Ok(());
        }

        if let Some(position) = known_position {
            if let Some(updated) = sequence.with_element_replaced(position, assigned) {
                self.narrow_path(&index.indexed, Narrowing::To(updated));
            }
        }
        Ok(())
    }

    fn assign_slice(
        &mut self,
        slice: &SliceExpression,
        operator: AssignmentOperator,
        right: &Value,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let options = EvalOptions {
            double_colon_allowed: true,
            ..EvalOptions::default()
        };
        let sequence = self.eval_with(&slice.indexed, options)?;
        let mutable = sequence.is_mutable_sequence();
        if !mutable {
            self.add_error(slice.indexed.span, messages::not_mutable_sequence(&sequence));
        } else if operator.is_int_operation() {
            self.add_error(span, messages::INT_ASSIGNMENT_LHS_NOT_INT);
        }

        if let Some(start) = &slice.start {
            let start = self.eval(start)?;
            if !is_int(&start) {
                self.add_error(span, messages::start_index_not_int(&start));
            }
        }
        if let Some(end) = &slice.end {
            let end = self.eval(end)?;
            if !is_int(&end) {
                self.add_error(span, messages::end_index_not_int(&end));
            }
        }
        if !mutable || operator.is_int_operation() {
            return Ok(());
        }

        let Some(assigned_elements) = right.element() else {
            self.add_error(span, messages::sequence_expected(right));
            return Ok(());
        };
        let element = self.declared_element(&slice.indexed, &sequence);
        if !element.test(&assigned_elements) {
            self.add_error(span, messages::IMPOSSIBLE_TO_KNOW_UPDATED_ELEMENTS);
            return Ok(());
        }

        if let Value::List(list) = &sequence {
            if list.elements().is_some() {
                // the length may change, only the element type survives
                let merged = join_values([list.element(), assigned_elements]).widest_of_type();
                self.narrow_path(&slice.indexed, Narrowing::To(Value::list_of(merged)));
            }
        }
        Ok(())
    }

    pub(super) fn eval_multi_assignment(
        &mut self,
        assignment: &MultiAssignment,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let mut names = Vec::with_capacity(assignment.variables.len());
        for variable in &assignment.variables {
            match &variable.kind {
                ExpressionKind::Identifier(name) => names.push((variable.id, name.as_str())),
                other => {
                    return Err(super::invalid_ast(
                        self,
                        variable.span,
                        format!("invalid multi-assignment: {} is not an identifier", other.describe()),
                    ))
                }
            }
        }

        let right = self.eval(&assignment.value)?;
        let list = right.widen_until(|candidate| matches!(candidate, Value::List(_)));

        let Some(list) = list else {
            self.add_error(span, messages::list_expected(&right));
            for (node, name) in names {
                self.bind_destructured(name, Value::Any, span);
                self.record_value(node, &Value::Any);
            }
            return Ok(());
        };

        let known_len = list.known_len();
        if let Some(len) = known_len {
            let required = names.len().max(2);
            if len < required && !assignment.nillable {
                self.add_error(span, messages::list_should_have_len_geq(required));
            }
        }

        for (position, (node, name)) in names.into_iter().enumerate() {
            let element = match (known_len, assignment.nillable) {
                (Some(len), true) if position >= len => Value::Nil,
                (Some(_), true) => list.element_at(position).unwrap_or(Value::Nil),
                (None, true) => join_values([
                    list.element_at(position).unwrap_or(Value::Any),
                    Value::Nil,
                ]),
                (_, false) => list.element_at(position).unwrap_or(Value::Any),
            };
            self.bind_destructured(name, element.clone(), span);
            self.record_value(node, &element);
        }
        Ok(())
    }

    fn bind_destructured(&mut self, name: &str, value: Value, span: SourceSpan) {
        if self.get_local(name).is_some() {
            self.update_local(name, value, span);
        } else {
            self.set_local(name, value, None);
        }
    }
}
