use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::ast::{
    ExpressionKind, Expression, ExtendStatement, NodeId, ObjectPatternLiteral, PatternDefinition,
    SequencePatternLiteral, SourceSpan,
};
use crate::context::{ExtensionMember, TypeExtension};
use crate::error::CheckError;
use crate::messages;
use crate::pattern::{ObjectPattern, Pattern, PatternNamespace, SecretPattern, SequencePattern};
use crate::state::State;
use crate::value::Value;

impl State {
    /// Evaluates a node that always produces a pattern.
    pub(super) fn eval_pattern_node(&mut self, expression: &Expression) -> Result<Pattern, CheckError> {
        let span = expression.span;
        let pattern = match &expression.kind {
            ExpressionKind::PatternIdentifier(name) => {
                match self.context.resolve_named_pattern(name) {
                    Some(pattern) => pattern.clone(),
                    None => {
                        let suggestion = self.context.suggest_pattern(name);
                        self.add_error(
                            span,
                            messages::pattern_not_declared(name, suggestion.as_deref()),
                        );
                        Pattern::Any
                    }
                }
            }
            ExpressionKind::PatternNamespaceMember { namespace, member } => {
                self.resolve_namespace_member(namespace, &member.name, span)
            }
            ExpressionKind::PathPattern(source) => {
                Pattern::PathPattern(Some(Arc::from(source.as_str())))
            }
            ExpressionKind::RegexPattern(source) => Pattern::Regex(Some(Arc::from(source.as_str()))),
            ExpressionKind::ObjectPattern(literal) => {
                Pattern::Object(Arc::new(self.eval_object_pattern(literal, false)?))
            }
            ExpressionKind::RecordPattern(literal) => {
                Pattern::Record(Arc::new(self.eval_object_pattern(literal, true)?))
            }
            ExpressionKind::ListPattern(literal) => {
                Pattern::List(Arc::new(self.eval_sequence_pattern(literal)?))
            }
            ExpressionKind::TuplePattern(literal) => {
                Pattern::Tuple(Arc::new(self.eval_sequence_pattern(literal)?))
            }
            ExpressionKind::PatternUnion(cases) => {
                let mut patterns = Vec::with_capacity(cases.len());
                for case in cases {
                    patterns.push(self.eval_pattern_operand(case)?);
                }
                Pattern::union(patterns)
            }
            ExpressionKind::OptionalPattern(inner) => {
                let inner = self.eval_pattern_operand(inner)?;
                if inner.matches_nil() {
                    self.add_error(span, messages::OPTIONAL_PATTERN_MATCHING_NIL);
                    inner
                } else {
                    Pattern::Optional(Arc::new(inner))
                }
            }
            ExpressionKind::SecretPattern(inner) => {
                let string_pattern = self.eval_pattern_operand(inner)?;
                Pattern::Secret(Arc::new(SecretPattern {
                    id: expression.id,
                    string_pattern,
                }))
            }
            ExpressionKind::PatternConversion(inner) => {
                let value = self.eval(inner)?;
                match value {
                    Value::Pattern(pattern) => pattern,
                    other => Pattern::exact(other),
                }
            }
            _ => {
                return Err(super::invalid_ast(
                    self,
                    span,
                    format!("{} is not a pattern node", expression.kind.describe()),
                ))
            }
        };
        Ok(pattern)
    }

    /// Pattern described by an operand of a pattern literal: patterns are kept, other
    /// values become exact-value patterns.
    pub(super) fn eval_pattern_operand(&mut self, expression: &Expression) -> Result<Pattern, CheckError> {
        let value = self.eval(expression)?;
        Ok(match value {
            Value::Pattern(pattern) => pattern,
            other => Pattern::exact(other),
        })
    }

    /// Pattern of a type annotation; a value that is not a pattern is reported.
    pub(super) fn eval_type_annotation(&mut self, expression: &Expression) -> Result<Pattern, CheckError> {
        let value = self.eval(expression)?;
        Ok(match value {
            Value::Pattern(pattern) => pattern,
            Value::Any => Pattern::Any,
            other => {
                self.add_error(expression.span, messages::not_a_pattern(&other));
                Pattern::Any
            }
        })
    }

    fn resolve_namespace_member(&self, namespace: &str, member: &str, span: SourceSpan) -> Pattern {
        let Some(resolved) = self.context.resolve_pattern_namespace(namespace) else {
            self.add_error(span, messages::pattern_namespace_not_declared(namespace));
            return Pattern::Any;
        };
        match resolved.get(member) {
            Some(pattern) => pattern.clone(),
            None => {
                self.add_error(
                    span,
                    messages::pattern_namespace_member_not_declared(namespace, member),
                );
                Pattern::Any
            }
        }
    }

    fn eval_object_pattern(
        &mut self,
        literal: &ObjectPatternLiteral,
        record: bool,
    ) -> Result<ObjectPattern, CheckError> {
        let mut entries: BTreeMap<String, Pattern> = BTreeMap::new();
        let mut optional = BTreeSet::new();

        for spread in &literal.spreads {
            let value = self.eval(spread)?;
            let spread_pattern = match &value {
                Value::Pattern(Pattern::Object(object)) if !record => object.clone(),
                Value::Pattern(Pattern::Record(object)) if record => object.clone(),
                other => {
                    self.add_error(spread.span, messages::spread_should_be_object_pattern(other));
                    continue;
                }
            };
            let Some(spread_entries) = &spread_pattern.entries else {
                self.add_error(spread.span, messages::SPREAD_OF_ANY_OBJECT_PATTERN);
                continue;
            };
            for (name, pattern) in spread_entries {
                if entries.insert(name.clone(), pattern.clone()).is_some() {
                    self.add_error(spread.span, messages::duplicate_pattern_entry(name));
                }
                if spread_pattern.optional.contains(name) {
                    optional.insert(name.clone());
                }
            }
        }

        for entry in &literal.entries {
            let name = &entry.name.name;
            let pattern = self.eval_pattern_operand(&entry.pattern)?;
            let matched = pattern.symbolic_value();
            if !matched.is_serializable() {
                self.add_error(entry.name.span, messages::pattern_entry_not_serializable(name));
            }
            if record && matched.is_mutable() {
                self.add_error(entry.name.span, messages::record_pattern_entry_not_immutable(name));
            }
            if entries.insert(name.clone(), pattern).is_some() {
                self.add_error(entry.name.span, messages::duplicate_pattern_entry(name));
            }
            if entry.optional {
                optional.insert(name.clone());
            } else {
                optional.remove(name);
            }
        }

        Ok(ObjectPattern {
            entries: Some(entries),
            optional,
            exact: literal.exact,
        })
    }

    fn eval_sequence_pattern(
        &mut self,
        literal: &SequencePatternLiteral,
    ) -> Result<SequencePattern, CheckError> {
        if let Some(general) = &literal.general_element {
            let general = self.eval_pattern_operand(general)?;
            return Ok(SequencePattern {
                elements: None,
                general_element: Some(general),
            });
        }
        let mut elements = Vec::with_capacity(literal.elements.len());
        for element in &literal.elements {
            elements.push(self.eval_pattern_operand(element)?);
        }
        Ok(SequencePattern {
            elements: Some(elements),
            general_element: None,
        })
    }

    pub(super) fn eval_pattern_definition(
        &mut self,
        definition: &PatternDefinition,
        node: NodeId,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let pattern = self.eval_pattern_operand(&definition.value)?;
        let name = &definition.name.name;
        if !self.context.add_named_pattern(name, pattern) {
            self.add_error(span, messages::pattern_already_declared(name));
        }
        self.record_context(node);
        Ok(())
    }

    pub(super) fn eval_pattern_namespace_definition(
        &mut self,
        definition: &PatternDefinition,
        node: NodeId,
        span: SourceSpan,
    ) -> Result<(), CheckError> {
        let value = self.eval(&definition.value)?;
        let properties = match &value {
            Value::Object(object) => object.properties.entries.clone(),
            Value::Record(record) => record.properties.entries.clone(),
            _ => None,
        };
        let Some(properties) = properties else {
            self.add_error(definition.value.span, messages::pattern_namespace_initializer(&value));
            return Ok(());
        };

        let patterns = properties
            .into_iter()
            .map(|(name, value)| {
                let pattern = match value {
                    Value::Pattern(pattern) => pattern,
                    other => Pattern::exact(other),
                };
                (name, pattern)
            })
            .collect();
        let name = &definition.name.name;
        let namespace = PatternNamespace {
            name: name.clone(),
            patterns,
        };
        if !self.context.add_pattern_namespace(namespace) {
            self.add_error(span, messages::pattern_already_declared(&format!("{name}.")));
        }
        self.record_context(node);
        Ok(())
    }

    pub(super) fn eval_extend(
        &mut self,
        extend: &ExtendStatement,
        node: NodeId,
    ) -> Result<(), CheckError> {
        let subject = match self.eval(&extend.subject)? {
            Value::Pattern(pattern) => pattern,
            other => {
                self.add_error(extend.subject.span, messages::extension_subject_not_pattern(&other));
                return Ok(());
            }
        };
        let extended = subject.symbolic_value();

        let mut members = BTreeMap::new();
        for member in &extend.members {
            let name = member.name.name.clone();
            if members.contains_key(&name) {
                self.add_error(member.name.span, messages::duplicate_key(&name));
                continue;
            }
            let extension_member = if matches!(member.value.kind, ExpressionKind::Function(_)) {
                let mut bound = self.bind_next_self(extended.clone());
                ExtensionMember::Method(bound.eval(&member.value)?)
            } else {
                let mut fork = self.fork();
                fork.push_scope();
                let mut bound = fork.bind_self(extended.clone());
                bound.eval(&member.value)?;
                ExtensionMember::Computed(Arc::new(member.value.clone()))
            };
            members.insert(name, extension_member);
        }

        debug!(extension = %node, subject = %subject, members = members.len(), "declaring type extension");
        self.context.add_type_extension(TypeExtension {
            id: node,
            subject,
            members,
        });
        Ok(())
    }
}
