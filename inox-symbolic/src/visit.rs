//! Pre-order traversal of expressions, used by analyses that only need to look at the tree.

use crate::ast::{
    Block, Expression, ExpressionKind, FunctionBody, FunctionExpression, Statement, StatementKind,
    TemplatePart, XmlChild, XmlElement,
};

pub(crate) fn walk_statements(statements: &[Statement], visit: &mut dyn FnMut(&Expression)) {
    for statement in statements {
        walk_statement(statement, visit);
    }
}

fn walk_block(block: &Block, visit: &mut dyn FnMut(&Expression)) {
    walk_statements(&block.statements, visit);
}

fn walk_statement(statement: &Statement, visit: &mut dyn FnMut(&Expression)) {
    match &statement.kind {
        StatementKind::LocalVariables(declarations) => {
            for declaration in declarations {
                if let Some(annotation) = &declaration.type_annotation {
                    walk_expression(annotation, visit);
                }
                if let Some(initializer) = &declaration.initializer {
                    walk_expression(initializer, visit);
                }
            }
        }
        StatementKind::Assignment(assignment) => {
            walk_expression(&assignment.target, visit);
            walk_expression(&assignment.value, visit);
        }
        StatementKind::MultiAssignment(assignment) => walk_expression(&assignment.value, visit),
        StatementKind::Expression(expression)
        | StatementKind::Assertion(expression)
        | StatementKind::Return(Some(expression)) => walk_expression(expression, visit),
        StatementKind::Return(None)
        | StatementKind::Break
        | StatementKind::Continue
        | StatementKind::Prune
        | StatementKind::InclusionImport(_) => {}
        StatementKind::If(statement) => {
            walk_expression(&statement.test, visit);
            walk_block(&statement.consequent, visit);
            if let Some(alternate) = &statement.alternate {
                walk_block(alternate, visit);
            }
        }
        StatementKind::For(statement) => {
            walk_expression(&statement.iterated, visit);
            walk_block(&statement.body, visit);
        }
        StatementKind::Walk(statement) => {
            walk_expression(&statement.walked, visit);
            walk_block(&statement.body, visit);
        }
        StatementKind::Switch(statement) => {
            walk_expression(&statement.discriminant, visit);
            for case in &statement.cases {
                case.values.iter().for_each(|value| walk_expression(value, visit));
                walk_block(&case.block, visit);
            }
            if let Some(default) = &statement.default {
                walk_block(default, visit);
            }
        }
        StatementKind::Match(statement) => {
            walk_expression(&statement.discriminant, visit);
            for case in &statement.cases {
                case.values.iter().for_each(|value| walk_expression(value, visit));
                walk_block(&case.block, visit);
            }
            if let Some(default) = &statement.default {
                walk_block(default, visit);
            }
        }
        StatementKind::Block(block) => walk_block(block, visit),
        StatementKind::Synchronized(synchronized) => {
            synchronized
                .values
                .iter()
                .for_each(|value| walk_expression(value, visit));
            walk_block(&synchronized.block, visit);
        }
        StatementKind::Import(import) => walk_expression(&import.source, visit),
        StatementKind::FunctionDeclaration(declaration) => {
            walk_expression(&declaration.function, visit)
        }
        StatementKind::PatternDefinition(definition)
        | StatementKind::PatternNamespaceDefinition(definition) => {
            walk_expression(&definition.value, visit)
        }
        StatementKind::Extend(extend) => {
            walk_expression(&extend.subject, visit);
            for member in &extend.members {
                walk_expression(&member.value, visit);
            }
        }
    }
}

pub(crate) fn walk_function(function: &FunctionExpression, visit: &mut dyn FnMut(&Expression)) {
    for parameter in &function.parameters {
        if let Some(pattern) = &parameter.pattern {
            walk_expression(pattern, visit);
        }
    }
    if let Some(return_type) = &function.return_type {
        walk_expression(return_type, visit);
    }
    match &function.body {
        FunctionBody::Expression(body) => walk_expression(body, visit),
        FunctionBody::Block(block) => walk_block(block, visit),
    }
}

fn walk_xml_element(element: &XmlElement, visit: &mut dyn FnMut(&Expression)) {
    for attribute in &element.attributes {
        if let Some(value) = &attribute.value {
            walk_expression(value, visit);
        }
    }
    for child in &element.children {
        match child {
            XmlChild::Text(_) => {}
            XmlChild::Element(element) => walk_xml_element(element, visit),
            XmlChild::Interpolation(expression) => walk_expression(expression, visit),
        }
    }
}

pub(crate) fn walk_expression(expression: &Expression, visit: &mut dyn FnMut(&Expression)) {
    visit(expression);
    match &expression.kind {
        ExpressionKind::Member(member) => walk_expression(&member.object, visit),
        ExpressionKind::DoubleColon(double_colon) => walk_expression(&double_colon.element, visit),
        ExpressionKind::Index(index) => {
            walk_expression(&index.indexed, visit);
            walk_expression(&index.index, visit);
        }
        ExpressionKind::Slice(slice) => {
            walk_expression(&slice.indexed, visit);
            for bound in [&slice.start, &slice.end].into_iter().flatten() {
                walk_expression(bound, visit);
            }
        }
        ExpressionKind::Extraction(extraction) => walk_expression(&extraction.object, visit),
        ExpressionKind::Call(call) => {
            walk_expression(&call.callee, visit);
            for argument in &call.arguments {
                walk_expression(&argument.value, visit);
            }
        }
        ExpressionKind::Unary(unary) => walk_expression(&unary.operand, visit),
        ExpressionKind::Binary(binary) => {
            walk_expression(&binary.left, visit);
            walk_expression(&binary.right, visit);
        }
        ExpressionKind::Object(object) => {
            for property in object.properties.iter().chain(&object.meta_properties) {
                if let Some(annotation) = &property.type_annotation {
                    walk_expression(annotation, visit);
                }
                walk_expression(&property.value, visit);
            }
            object
                .spreads
                .iter()
                .for_each(|spread| walk_expression(spread, visit));
        }
        ExpressionKind::Record(record) => {
            for property in &record.properties {
                walk_expression(&property.value, visit);
            }
            record
                .spreads
                .iter()
                .for_each(|spread| walk_expression(spread, visit));
        }
        ExpressionKind::List(sequence) | ExpressionKind::Tuple(sequence) => {
            if let Some(annotation) = &sequence.type_annotation {
                walk_expression(annotation, visit);
            }
            for element in &sequence.elements {
                walk_expression(&element.value, visit);
            }
        }
        ExpressionKind::Concatenation(elements) => {
            for element in elements {
                walk_expression(&element.value, visit);
            }
        }
        ExpressionKind::Dictionary(entries) => {
            for entry in entries {
                walk_expression(&entry.key, visit);
                walk_expression(&entry.value, visit);
            }
        }
        ExpressionKind::Function(function) => walk_function(function, visit),
        ExpressionKind::If(if_expression) => {
            walk_expression(&if_expression.test, visit);
            walk_expression(&if_expression.consequent, visit);
            if let Some(alternate) = &if_expression.alternate {
                walk_expression(alternate, visit);
            }
        }
        ExpressionKind::StringTemplate(template) => {
            if let Some(pattern) = &template.pattern {
                walk_expression(pattern, visit);
            }
            for part in &template.parts {
                if let TemplatePart::Interpolation { expression, .. } = part {
                    walk_expression(expression, visit);
                }
            }
        }
        ExpressionKind::Spawn(spawn) => {
            if let Some(meta) = &spawn.meta {
                walk_expression(meta, visit);
            }
            walk_statements(&spawn.module.statements, visit);
        }
        ExpressionKind::TestSuite(test) | ExpressionKind::TestCase(test) => {
            if let Some(meta) = &test.meta {
                walk_expression(meta, visit);
            }
            walk_statements(&test.module.statements, visit);
        }
        ExpressionKind::LifetimeJob(job) => {
            walk_expression(&job.meta, visit);
            if let Some(subject) = &job.subject {
                walk_expression(subject, visit);
            }
            walk_statements(&job.module.statements, visit);
        }
        ExpressionKind::Mapping(entries) => {
            for entry in entries {
                walk_expression(&entry.key, visit);
                walk_expression(&entry.value, visit);
            }
        }
        ExpressionKind::Xml(xml) => {
            walk_expression(&xml.namespace, visit);
            walk_xml_element(&xml.element, visit);
        }
        ExpressionKind::ObjectPattern(pattern) | ExpressionKind::RecordPattern(pattern) => {
            for entry in &pattern.entries {
                walk_expression(&entry.pattern, visit);
            }
            pattern
                .spreads
                .iter()
                .for_each(|spread| walk_expression(spread, visit));
        }
        ExpressionKind::ListPattern(pattern) | ExpressionKind::TuplePattern(pattern) => {
            pattern
                .elements
                .iter()
                .for_each(|element| walk_expression(element, visit));
            if let Some(general) = &pattern.general_element {
                walk_expression(general, visit);
            }
        }
        ExpressionKind::PatternUnion(cases) => {
            cases.iter().for_each(|case| walk_expression(case, visit));
        }
        ExpressionKind::OptionalPattern(inner)
        | ExpressionKind::SecretPattern(inner)
        | ExpressionKind::PatternConversion(inner) => walk_expression(inner, visit),
        _ => {}
    }
}

/// Whether the function body refers to `name` as an identifier or a global variable.
pub(crate) fn function_mentions(function: &FunctionExpression, name: &str) -> bool {
    let mut found = false;
    walk_function(function, &mut |expression: &Expression| {
        if let ExpressionKind::Identifier(identifier) | ExpressionKind::GlobalVariable(identifier) =
            &expression.kind
        {
            found |= identifier == name;
        }
    });
    found
}

/// Names of the `self.<name>` members read by the function.
pub(crate) fn self_members(function: &FunctionExpression) -> Vec<String> {
    let mut names = Vec::new();
    walk_function(function, &mut |expression: &Expression| {
        if let ExpressionKind::Member(member) = &expression.kind {
            if matches!(member.object.kind, ExpressionKind::SelfExpression)
                && !names.contains(&member.property.name)
            {
                names.push(member.property.name.clone());
            }
        }
    });
    names
}
