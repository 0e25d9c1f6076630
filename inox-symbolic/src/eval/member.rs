use std::collections::BTreeMap;
use std::sync::Arc;

use inox_support::{closest_name, MAX_SUGGESTION_DISTANCE};
use tracing::debug;

use crate::ast::{
    DoubleColonExpression, ExtractionExpression, IndexExpression, MemberExpression, NodeId,
    SliceExpression, SourceSpan,
};
use crate::context::ExtensionMember;
use crate::error::CheckError;
use crate::messages;
use crate::state::State;
use crate::symbolic_data::UsedExtension;
use crate::value::{ObjectValue, PropertyLookup, PropertyMap, Value};

use super::operators::is_int;
use super::EvalOptions;

impl State {
    /// Property `name` of `value`, reporting missing properties.
    fn property_of(&self, value: &Value, name: &str, optional: bool, span: SourceSpan) -> Value {
        match value.get_property(name) {
            PropertyLookup::Found(property) => property,
            PropertyLookup::Missing if optional => Value::Nil,
            PropertyLookup::Missing => {
                let names = value.property_names().unwrap_or_default();
                let suggestion = closest_name(
                    name,
                    names.iter().map(String::as_str),
                    MAX_SUGGESTION_DISTANCE,
                );
                self.add_error(span, messages::property_does_not_exist(name, value, suggestion));
                Value::Any
            }
            PropertyLookup::NoProperties => {
                self.add_error(span, messages::value_has_no_properties(value));
                Value::Any
            }
        }
    }

    pub(super) fn eval_member(
        &mut self,
        member: &MemberExpression,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let object = self.eval_with(&member.object, options.for_chain_object())?;
        Ok(self.property_of(&object, &member.property.name, member.optional, span))
    }

    pub(super) fn eval_extraction(
        &mut self,
        extraction: &ExtractionExpression,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let object = self.eval(&extraction.object)?;
        let mut entries = BTreeMap::new();
        for key in &extraction.keys {
            let value = self.property_of(&object, &key.name, false, span);
            entries.insert(key.name.clone(), value);
        }
        Ok(Value::Object(Arc::new(ObjectValue::new(PropertyMap::exact(entries)))))
    }

    /// `element::name`: an own property of a mutable object that cannot be shared, a
    /// property of the value referenced by a URL, or a member of a type extension.
    pub(super) fn eval_double_colon(
        &mut self,
        double_colon: &DoubleColonExpression,
        node: NodeId,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let element = self.eval_with(&double_colon.element, options.for_chain_object())?;
        let name = &double_colon.property.name;

        if element.is_any() {
            return Ok(Value::Any);
        }

        if let Value::Object(object) = &element {
            if !element.is_sharable() {
                if let Some(property) = object.properties.get(name) {
                    if !options.double_colon_allowed {
                        self.add_error(span, messages::MISPLACED_DOUBLE_COLON);
                    }
                    return Ok(property.clone());
                }
            }
        }

        if let Value::Url(Some(url)) = &element {
            if let Some(referenced) = self.session.bridge.value_at_url(url) {
                return Ok(self.property_of(&referenced, name, false, span));
            }
        }

        let found = self
            .context
            .extensions_for(&element)
            .find_map(|extension| {
                extension
                    .members
                    .get(name)
                    .map(|member| (extension.id, member.clone()))
            });
        let Some((extension, member)) = found else {
            self.add_error(span, messages::no_extension_member(name, &element));
            return Ok(Value::Any);
        };

        debug!(%extension, member = %name, "resolved type extension member");
        self.session.record_used_extension(
            node,
            UsedExtension {
                extension,
                member: name.clone(),
            },
        );

        match member {
            ExtensionMember::Method(method) => {
                if !options.callee {
                    self.add_error(span, messages::EXTENSION_METHOD_OUTSIDE_CALL);
                }
                // the method runs with self bound to the extended value
                Ok(match method {
                    Value::Function(Some(function)) => {
                        let mut bound = (*function).clone();
                        bound.receiver = Some(element);
                        Value::Function(Some(Arc::new(bound)))
                    }
                    other => other,
                })
            }
            ExtensionMember::Computed(expression) => {
                let mut fork = self.silent_fork();
                fork.push_scope();
                let mut bound = fork.bind_self(element);
                bound.eval_with(
                    &expression,
                    EvalOptions {
                        do_not_record: true,
                        ..EvalOptions::default()
                    },
                )
            }
        }
    }

    pub(super) fn eval_index(
        &mut self,
        index: &IndexExpression,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let indexed = self.eval_with(&index.indexed, options.for_chain_object())?;
        let position = self.eval(&index.index)?;
        if !position.is_any() && !is_int(&position) {
            self.add_error(index.index.span, messages::index_not_int(&position));
        }

        if !indexed.is_indexable() {
            self.add_error(span, messages::not_indexable(&indexed));
            return Ok(Value::Any);
        }

        let element = match (&position, indexed.known_len()) {
            (Value::Int(Some(position)), Some(len)) => {
                match usize::try_from(*position).ok().filter(|position| *position < len) {
                    Some(position) => indexed.element_at(position),
                    None => {
                        self.add_error(span, messages::INDEX_OUT_OF_BOUNDS);
                        indexed.element()
                    }
                }
            }
            _ => indexed.element(),
        };
        Ok(element.unwrap_or(Value::Any))
    }

    pub(super) fn eval_slice(
        &mut self,
        slice: &SliceExpression,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let sliced = self.eval_with(&slice.indexed, options.for_chain_object())?;

        if let Some(start) = &slice.start {
            let start = self.eval(start)?;
            if !start.is_any() && !is_int(&start) {
                self.add_error(span, messages::start_index_not_int(&start));
            }
        }
        if let Some(end) = &slice.end {
            let end = self.eval(end)?;
            if !end.is_any() && !is_int(&end) {
                self.add_error(span, messages::end_index_not_int(&end));
            }
        }

        match sliced.slice_result() {
            Some(result) => Ok(result),
            None => {
                self.add_error(span, messages::sequence_expected(&sliced));
                Ok(Value::Any)
            }
        }
    }
}
