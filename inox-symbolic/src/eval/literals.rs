use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use inox_support::{closest_name, MAX_SUGGESTION_DISTANCE};
use tracing::debug;

use crate::ast::{
    DictionaryEntry, Element, ExpressionKind, NodeId, ObjectLiteral, ObjectProperty,
    RecordLiteral, SequenceLiteral, SourceSpan, StringTemplate, TemplatePart, XmlChild,
    XmlElement, XmlExpression,
};
use crate::error::CheckError;
use crate::messages;
use crate::method_graph::MethodGraph;
use crate::pattern::Pattern;
use crate::state::State;
use crate::value::{
    join_values, DictionaryValue, ObjectValue, PropertyLookup, PropertyMap, RecordValue,
    SequenceValue, Value, ANY_DICTIONARY, ANY_FUNCTION, ANY_STR,
};
use crate::visit;

use super::EvalOptions;

const ACCEPTED_METAPROPERTIES: [&str; 2] = ["_constraints_", "_visibility_"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceKind {
    List,
    Tuple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConcatenationKind {
    Str,
    Bytes,
    Tuple,
}

impl ConcatenationKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes => Some(ConcatenationKind::Bytes),
            Value::Tuple(_) => Some(ConcatenationKind::Tuple),
            value if value.is_string_like() => Some(ConcatenationKind::Str),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConcatenationKind::Str => "string",
            ConcatenationKind::Bytes => "bytes",
            ConcatenationKind::Tuple => "tuple",
        }
    }
}

fn object_value(entries: &BTreeMap<String, Value>, static_types: &BTreeMap<String, Pattern>) -> Value {
    Value::Object(Arc::new(ObjectValue {
        properties: PropertyMap::exact(entries.clone()),
        static_types: static_types.clone(),
        ..ObjectValue::default()
    }))
}

/// Key of a literal property, properties without a key are numbered from zero.
fn property_key(property: &ObjectProperty, implicit_index: &mut usize) -> String {
    match &property.key {
        Some(key) => key.name.clone(),
        None => {
            let key = implicit_index.to_string();
            *implicit_index += 1;
            key
        }
    }
}

impl State {
    fn check_annotated_property(&self, value: &Value, annotation: Option<&Pattern>, span: SourceSpan) {
        let Some(pattern) = annotation else {
            return;
        };
        if value.widen_until(|candidate| pattern.test_value(candidate)).is_none() {
            self.add_error(span, messages::not_assignable_to_property_of_type(value, pattern));
        }
    }

    /// Objects are serializable and watchable containers.
    fn check_object_property_value(&self, value: &Value, span: SourceSpan) {
        if !value.is_serializable() {
            self.add_error(span, messages::not_serializable_property_value(value));
        } else if value.is_mutable() && !value.is_watchable() {
            self.add_error(span, messages::not_watchable_property_value(value));
        }
    }

    fn check_unexpected_properties(&self, expected: &PropertyMap, names: &[String], span: SourceSpan) {
        let Some(expected_entries) = expected.entries.as_ref().filter(|_| expected.exact) else {
            return;
        };
        for name in names {
            if expected_entries.contains_key(name) {
                continue;
            }
            let suggestion = closest_name(
                name,
                expected_entries.keys().map(String::as_str),
                MAX_SUGGESTION_DISTANCE,
            );
            self.add_error(span, messages::unexpected_property(name, suggestion));
        }
    }

    pub(super) fn eval_object_literal(
        &mut self,
        object: &ObjectLiteral,
        node: NodeId,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let expected = match &options.expected {
            Some(Value::Object(expected)) => Some(expected.properties.clone()),
            _ => None,
        };
        let expected_property =
            |name: &str| expected.as_ref().and_then(|expected| expected.get(name).cloned());

        let mut entries = BTreeMap::new();
        let mut static_types = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let mut methods = Vec::new();
        let mut lifetime_jobs = Vec::new();
        let mut implicit_index = 0;

        for property in &object.properties {
            let name = property_key(property, &mut implicit_index);
            if !seen.insert(name.clone()) {
                self.add_error(property.value.span, messages::duplicate_key(&name));
                continue;
            }

            let annotation = match &property.type_annotation {
                Some(annotation) => Some(self.eval_type_annotation(annotation)?),
                None => None,
            };
            let expected_value = annotation
                .as_ref()
                .map(Pattern::symbolic_value)
                .or_else(|| expected_property(&name));
            if let Some(annotation) = &annotation {
                static_types.insert(name.clone(), annotation.clone());
            }

            match &property.value.kind {
                ExpressionKind::Function(_) => {
                    entries.insert(name.clone(), ANY_FUNCTION);
                    methods.push((name, property, expected_value, annotation));
                }
                ExpressionKind::LifetimeJob(_) => {
                    lifetime_jobs.push((name, property, annotation));
                }
                _ => {
                    let current = object_value(&entries, &static_types);
                    let value = self
                        .bind_next_self(current)
                        .eval_with(&property.value, EvalOptions::expecting(expected_value))?;
                    self.check_annotated_property(&value, annotation.as_ref(), property.value.span);
                    self.check_object_property_value(&value, property.value.span);
                    entries.insert(name, value);
                }
            }
        }

        for spread in &object.spreads {
            let spread_value = self.eval(spread)?;
            match &spread_value {
                Value::Object(spread_object) => {
                    for (name, value) in spread_object.properties.entries.iter().flatten() {
                        if !seen.insert(name.clone()) {
                            self.add_error(spread.span, messages::duplicate_key(name));
                            continue;
                        }
                        entries.insert(name.clone(), value.clone());
                    }
                }
                Value::Any => {}
                other => self.add_error(spread.span, messages::spread_should_be_object(other)),
            }
        }

        for meta in &object.meta_properties {
            let name = meta.key.as_ref().map_or("", |key| key.name.as_str());
            if ACCEPTED_METAPROPERTIES.contains(&name) {
                self.eval(&meta.value)?;
            } else {
                self.add_error(meta.value.span, messages::cannot_initialize_metaproperty(name));
            }
        }

        if !methods.is_empty() {
            let mut graph = MethodGraph::new();
            for (name, property, ..) in &methods {
                if let ExpressionKind::Function(function) = &property.value.kind {
                    graph.add_method(name, visit::self_members(function));
                }
            }
            let order = graph.order();
            debug!(object = %node, order = ?order.order, "checking object methods");

            for cycle in &order.cycles {
                debug!(object = %node, methods = ?cycle, "method cycle detected");
                let untyped = methods.iter().any(|(name, property, ..)| {
                    cycle.contains(name)
                        && matches!(
                            &property.value.kind,
                            ExpressionKind::Function(function) if function.return_type.is_none()
                        )
                });
                if untyped {
                    self.add_error(span, messages::method_cycle(cycle));
                }
            }

            for name in &order.order {
                let Some((_, property, expected_value, annotation)) =
                    methods.iter().find(|(method, ..)| method == name)
                else {
                    continue;
                };
                let current = object_value(&entries, &static_types);
                let value = self
                    .bind_next_self(current)
                    .eval_with(&property.value, EvalOptions::expecting(expected_value.clone()))?;
                self.check_annotated_property(&value, annotation.as_ref(), property.value.span);
                entries.insert(name.clone(), value);
            }
        }

        // lifetime jobs see the object with all its other properties
        for (name, property, annotation) in lifetime_jobs {
            let current = object_value(&entries, &static_types);
            let value = self.bind_next_self(current).eval(&property.value)?;
            self.check_annotated_property(&value, annotation.as_ref(), property.value.span);
            entries.insert(name, value);
        }

        if let Some(expected) = &expected {
            let names: Vec<String> = entries.keys().cloned().collect();
            self.check_unexpected_properties(expected, &names, span);
        }
        Ok(object_value(&entries, &static_types))
    }

    pub(super) fn eval_record_literal(
        &mut self,
        record: &RecordLiteral,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let expected = match &options.expected {
            Some(Value::Record(expected)) => Some(expected.properties.clone()),
            _ => None,
        };

        let mut entries = BTreeMap::new();
        let mut implicit_index = 0;
        for property in &record.properties {
            let name = property_key(property, &mut implicit_index);
            if entries.contains_key(&name) {
                self.add_error(property.value.span, messages::duplicate_key(&name));
                continue;
            }
            let annotation = match &property.type_annotation {
                Some(annotation) => Some(self.eval_type_annotation(annotation)?),
                None => None,
            };
            let expected_value = annotation.as_ref().map(Pattern::symbolic_value).or_else(|| {
                expected
                    .as_ref()
                    .and_then(|expected| expected.get(&name).cloned())
            });

            let value = self.eval_with(&property.value, EvalOptions::expecting(expected_value))?;
            self.check_annotated_property(&value, annotation.as_ref(), property.value.span);
            if value.is_mutable() {
                self.add_error(property.value.span, messages::record_value_not_immutable(&name));
            } else if !value.is_serializable() {
                self.add_error(property.value.span, messages::not_serializable_property_value(&value));
            }
            entries.insert(name, value);
        }

        for spread in &record.spreads {
            let spread_value = self.eval(spread)?;
            let properties = match &spread_value {
                Value::Record(spread_record) => &spread_record.properties,
                Value::Object(spread_object) => &spread_object.properties,
                Value::Any => continue,
                other => {
                    self.add_error(spread.span, messages::spread_should_be_object(other));
                    continue;
                }
            };
            for (name, value) in properties.entries.iter().flatten() {
                if entries.contains_key(name) {
                    self.add_error(spread.span, messages::duplicate_key(name));
                    continue;
                }
                if value.is_mutable() {
                    self.add_error(spread.span, messages::record_value_not_immutable(name));
                }
                entries.insert(name.clone(), value.clone());
            }
        }

        if let Some(expected) = &expected {
            let names: Vec<String> = entries.keys().cloned().collect();
            self.check_unexpected_properties(expected, &names, span);
        }
        Ok(Value::Record(Arc::new(RecordValue {
            properties: PropertyMap::exact(entries),
        })))
    }

    pub(super) fn eval_list_literal(
        &mut self,
        list: &SequenceLiteral,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        self.eval_sequence_literal(list, SequenceKind::List, span, options)
    }

    pub(super) fn eval_tuple_literal(
        &mut self,
        tuple: &SequenceLiteral,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        self.eval_sequence_literal(tuple, SequenceKind::Tuple, span, options)
    }

    fn eval_sequence_literal(
        &mut self,
        literal: &SequenceLiteral,
        kind: SequenceKind,
        span: SourceSpan,
        options: &EvalOptions,
    ) -> Result<Value, CheckError> {
        let annotation = match &literal.type_annotation {
            Some(annotation) => Some(self.eval_type_annotation(annotation)?),
            None => None,
        };
        let expected_element = annotation
            .as_ref()
            .map(Pattern::symbolic_value)
            .or_else(|| options.expected.as_ref().and_then(Value::element));

        // elements of spread sequences of unknown length
        let mut generic = Vec::new();
        let mut elements = Vec::with_capacity(literal.elements.len());
        for element in &literal.elements {
            let values = self.eval_sequence_element(element, expected_element.clone(), &mut generic)?;
            for value in values {
                self.check_sequence_element(&value, kind, annotation.as_ref(), element.value.span);
                elements.push(value);
            }
        }
        for value in &generic {
            self.check_sequence_element(value, kind, annotation.as_ref(), span);
        }

        let sequence = match annotation {
            Some(annotation) => SequenceValue::generic(annotation.symbolic_value()),
            None if !generic.is_empty() => {
                SequenceValue::generic(join_values(elements.into_iter().chain(generic)))
            }
            None => SequenceValue::known(elements),
        };
        Ok(match kind {
            SequenceKind::List => Value::List(Arc::new(sequence)),
            SequenceKind::Tuple => Value::Tuple(Arc::new(sequence)),
        })
    }

    /// Values contributed by one element of a list or tuple literal: one value, or the
    /// elements of a spread sequence of known length.
    fn eval_sequence_element(
        &mut self,
        element: &Element,
        expected: Option<Value>,
        generic: &mut Vec<Value>,
    ) -> Result<Vec<Value>, CheckError> {
        if !element.spread {
            return Ok(vec![self.eval_with(&element.value, EvalOptions::expecting(expected))?]);
        }
        let spread = self.eval(&element.value)?;
        match &spread {
            Value::List(sequence) | Value::Tuple(sequence) => match sequence.elements() {
                Some(items) => return Ok(items.to_vec()),
                None => generic.push(sequence.element()),
            },
            Value::Any => generic.push(Value::Any),
            other => self.add_error(element.value.span, messages::list_expected(other)),
        }
        Ok(Vec::new())
    }

    fn check_sequence_element(
        &self,
        value: &Value,
        kind: SequenceKind,
        annotation: Option<&Pattern>,
        span: SourceSpan,
    ) {
        if let Some(pattern) = annotation {
            if value.widen_until(|candidate| pattern.test_value(candidate)).is_none() {
                self.add_error(span, messages::unexpected_element_in_annotated_list(value, pattern));
            }
        }
        if kind == SequenceKind::Tuple && value.is_mutable() {
            self.add_error(span, messages::TUPLE_ELEMENTS_SHOULD_BE_IMMUTABLE);
        } else if !value.is_serializable() {
            self.add_error(span, messages::not_serializable_property_value(value));
        }
    }

    pub(super) fn eval_dictionary_literal(
        &mut self,
        entries: &[DictionaryEntry],
        _span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let mut known = Some(BTreeMap::new());
        for entry in entries {
            let key = self.eval(&entry.key)?;
            let value = self.eval(&entry.value)?;
            if !key.is_serializable() {
                self.add_error(entry.key.span, messages::not_serializable_property_value(&key));
            }
            if !value.is_serializable() {
                self.add_error(entry.value.span, messages::not_serializable_property_value(&value));
            }

            // keys without a concrete payload make the entries unknown
            if !key.has_concrete_payload() {
                known = None;
            }
            if let Some(map) = known.as_mut() {
                let text = key.to_string();
                if map.contains_key(&text) {
                    self.add_error(entry.key.span, messages::duplicate_key(&text));
                    continue;
                }
                map.insert(text, (key, value));
            }
        }
        Ok(match known {
            Some(entries) => Value::Dictionary(Arc::new(DictionaryValue {
                entries: Some(entries),
            })),
            None => ANY_DICTIONARY.clone(),
        })
    }

    pub(super) fn eval_concatenation(
        &mut self,
        elements: &[Element],
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let Some(first) = elements.first() else {
            return Err(super::invalid_ast(self, span, "empty concatenation"));
        };
        if elements.len() == 1 && !first.spread {
            return self.eval(&first.value);
        }

        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push((self.eval(&element.value)?, element));
        }

        let (first_value, _) = &values[0];
        let decisive = if first.spread {
            match first_value.iteration_types() {
                Some((_, element)) => element,
                None => first_value.clone(),
            }
        } else {
            first_value.clone()
        };
        if decisive.is_any() {
            return Ok(Value::Any);
        }
        let Some(kind) = ConcatenationKind::of(&decisive) else {
            self.add_error(
                first.value.span,
                messages::concatenation_invalid_element("string, bytes or tuple", &decisive),
            );
            return Ok(Value::Any);
        };

        let mut tuple_elements = Some(Vec::new());
        let mut tuple_element_types = Vec::new();
        for (value, element) in &values {
            if element.spread {
                let iterated = value.iteration_types().map(|(_, element)| element);
                let valid = value.is_any()
                    || iterated.as_ref().is_some_and(|iterated| {
                        iterated.is_any() || ConcatenationKind::of(iterated) == Some(kind)
                    });
                if !valid {
                    self.add_error(element.value.span, messages::INVALID_SPREAD_IN_CONCATENATION);
                }
                tuple_elements = None;
                tuple_element_types.push(iterated.and_then(|iterated| iterated.element()).unwrap_or(Value::Any));
                continue;
            }

            if value.is_any() {
                tuple_elements = None;
                tuple_element_types.push(Value::Any);
                continue;
            }
            if ConcatenationKind::of(value) != Some(kind) {
                self.add_error(
                    element.value.span,
                    messages::concatenation_invalid_element(kind.name(), value),
                );
                continue;
            }
            if let Value::Tuple(tuple) = value {
                match (tuple.elements(), tuple_elements.as_mut()) {
                    (Some(items), Some(known)) => known.extend(items.iter().cloned()),
                    _ => tuple_elements = None,
                }
                tuple_element_types.push(tuple.element());
            }
        }

        Ok(match kind {
            ConcatenationKind::Str => ANY_STR,
            ConcatenationKind::Bytes => Value::Bytes,
            ConcatenationKind::Tuple => match tuple_elements {
                Some(known) => Value::tuple(known),
                None => Value::tuple_of(join_values(tuple_element_types)),
            },
        })
    }

    pub(super) fn eval_string_template(
        &mut self,
        template: &StringTemplate,
        span: SourceSpan,
    ) -> Result<Value, CheckError> {
        let namespace = match template.pattern.as_deref() {
            None => None,
            Some(pattern) => {
                let ExpressionKind::PatternNamespaceMember { namespace, member } = &pattern.kind
                else {
                    return Err(super::invalid_ast(
                        self,
                        span,
                        "the pattern of a string template should be a pattern namespace member",
                    ));
                };
                match self.context.resolve_pattern_namespace(namespace).cloned() {
                    None => {
                        self.add_error(pattern.span, messages::cannot_interpolate_missing_namespace(namespace));
                        None
                    }
                    Some(resolved) => {
                        if resolved.get(&member.name).is_none() {
                            self.add_error(
                                member.span,
                                messages::cannot_interpolate_missing_member(&member.name, namespace),
                            );
                        }
                        Some(resolved)
                    }
                }
            }
        };

        for part in &template.parts {
            let TemplatePart::Interpolation { member, expression } = part else {
                continue;
            };
            let value = self.eval(expression)?;
            match (member, &namespace) {
                (Some(member), Some(namespace)) => {
                    if namespace.get(&member.name).is_none() {
                        self.add_error(
                            member.span,
                            messages::cannot_interpolate_missing_member(&member.name, &namespace.name),
                        );
                    }
                }
                // a typed interpolation in a template whose namespace is missing was reported above
                (Some(_), None) if template.pattern.is_some() => {}
                _ => {
                    if !value.is_any() && !value.is_string_like() {
                        self.add_error(expression.span, messages::interpolation_not_string(&value));
                    }
                }
            }
        }
        Ok(ANY_STR)
    }

    pub(super) fn eval_xml(&mut self, xml: &XmlExpression, span: SourceSpan) -> Result<Value, CheckError> {
        let namespace = self.eval(&xml.namespace)?;
        self.eval_xml_element(&xml.element)?;

        if namespace.is_any() {
            return Ok(Value::Any);
        }
        let factory = match namespace.get_property("from_xml_factory") {
            PropertyLookup::Found(factory) if factory.is_callable() => factory,
            _ => {
                self.add_error(span, messages::xml_namespace_has_no_factory(&namespace));
                return Ok(Value::Any);
            }
        };
        Ok(match factory {
            Value::Function(Some(function)) => function.result().clone(),
            Value::HostFunction(function) => function.result.clone(),
            _ => Value::Any,
        })
    }

    fn eval_xml_element(&mut self, element: &XmlElement) -> Result<(), CheckError> {
        for attribute in &element.attributes {
            if let Some(value) = &attribute.value {
                self.eval(value)?;
            }
        }
        for child in &element.children {
            match child {
                XmlChild::Text(_) => {}
                XmlChild::Element(child) => self.eval_xml_element(child)?,
                XmlChild::Interpolation(expression) => {
                    self.eval(expression)?;
                }
            }
        }
        Ok(())
    }
}
