//! Construction of trees for hosts that do not deserialize them, and for tests.
//!
//! Every node built by one [`AstBuilder`] gets a fresh [`NodeId`] and a span on its own
//! line, so diagnostics reported on different nodes never share a location. Methods take
//! `&self` so that calls nest: `b.call(b.ident("f"), vec![b.int(1)])`.

use std::cell::Cell;
use std::sync::Arc;

use crate::ast::{
    Assignment, AssignmentOperator, BinaryExpression, BinaryOperator, Block, CallExpression,
    Chunk, DoubleColonExpression, Element, EmbeddedModule, Expression, ExpressionKind,
    ForStatement, FunctionBody, FunctionDeclaration, FunctionExpression, GlobalConstant,
    Identifier, IfStatement, IndexExpression, LocalVariableDeclaration, MemberExpression, NodeId,
    ObjectLiteral, ObjectPatternLiteral, ObjectProperty, Parameter, PatternDefinition,
    PatternEntry, RecordLiteral, SequenceLiteral, SourceSpan, SpawnExpression, Statement, StatementKind, UnaryExpression, UnaryOperator,
};

#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: Cell<u32>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> NodeId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        NodeId(id)
    }

    fn span_of(id: NodeId) -> SourceSpan {
        let line = id.0 as usize;
        SourceSpan::new(line, 1, line, 2)
    }

    pub fn span(&self) -> SourceSpan {
        let id = self.next_id();
        Self::span_of(id)
    }

    pub fn identifier(&self, name: &str) -> Identifier {
        Identifier {
            name: name.to_string(),
            span: self.span(),
        }
    }

    pub fn expression(&self, kind: ExpressionKind) -> Expression {
        let id = self.next_id();
        Expression {
            id,
            span: Self::span_of(id),
            kind,
        }
    }

    pub fn statement(&self, kind: StatementKind) -> Statement {
        let id = self.next_id();
        Statement {
            id,
            span: Self::span_of(id),
            kind,
        }
    }

    // ---- literals and names ----

    pub fn nil(&self) -> Expression {
        self.expression(ExpressionKind::Nil)
    }

    pub fn bool(&self, value: bool) -> Expression {
        self.expression(ExpressionKind::Bool(value))
    }

    pub fn int(&self, value: i64) -> Expression {
        self.expression(ExpressionKind::Int(value))
    }

    pub fn float(&self, value: f64) -> Expression {
        self.expression(ExpressionKind::Float(value))
    }

    pub fn str(&self, value: &str) -> Expression {
        self.expression(ExpressionKind::Str(value.to_string()))
    }

    pub fn path(&self, value: &str) -> Expression {
        self.expression(ExpressionKind::Path(value.to_string()))
    }

    pub fn url(&self, value: &str) -> Expression {
        self.expression(ExpressionKind::Url(value.to_string()))
    }

    pub fn ident(&self, name: &str) -> Expression {
        self.expression(ExpressionKind::Identifier(name.to_string()))
    }

    pub fn variable(&self, name: &str) -> Expression {
        self.expression(ExpressionKind::Variable(name.to_string()))
    }

    pub fn global(&self, name: &str) -> Expression {
        self.expression(ExpressionKind::GlobalVariable(name.to_string()))
    }

    pub fn self_expression(&self) -> Expression {
        self.expression(ExpressionKind::SelfExpression)
    }

    /// `%name`
    pub fn pattern(&self, name: &str) -> Expression {
        self.expression(ExpressionKind::PatternIdentifier(name.to_string()))
    }

    /// `%{name: pattern, ...}`, closed to other properties when `exact` is set.
    pub fn object_pattern(&self, entries: Vec<(&str, Expression)>, exact: bool) -> Expression {
        let entries = entries
            .into_iter()
            .map(|(name, pattern)| PatternEntry {
                name: self.identifier(name),
                pattern,
                optional: false,
            })
            .collect();
        self.expression(ExpressionKind::ObjectPattern(ObjectPatternLiteral {
            entries,
            spreads: Vec::new(),
            exact,
        }))
    }

    pub fn pattern_union(&self, cases: Vec<Expression>) -> Expression {
        self.expression(ExpressionKind::PatternUnion(cases))
    }

    // ---- compound expressions ----

    pub fn member(&self, object: Expression, name: &str) -> Expression {
        let property = self.identifier(name);
        self.expression(ExpressionKind::Member(MemberExpression {
            object: Box::new(object),
            property,
            optional: false,
        }))
    }

    pub fn optional_member(&self, object: Expression, name: &str) -> Expression {
        let property = self.identifier(name);
        self.expression(ExpressionKind::Member(MemberExpression {
            object: Box::new(object),
            property,
            optional: true,
        }))
    }

    pub fn double_colon(&self, element: Expression, name: &str) -> Expression {
        let property = self.identifier(name);
        self.expression(ExpressionKind::DoubleColon(DoubleColonExpression {
            element: Box::new(element),
            property,
        }))
    }

    pub fn index(&self, indexed: Expression, index: Expression) -> Expression {
        self.expression(ExpressionKind::Index(IndexExpression {
            indexed: Box::new(indexed),
            index: Box::new(index),
        }))
    }

    pub fn call(&self, callee: Expression, arguments: Vec<Expression>) -> Expression {
        let arguments = arguments
            .into_iter()
            .map(|value| Element {
                spread: false,
                value,
            })
            .collect();
        self.call_with(callee, arguments)
    }

    pub fn call_with(&self, callee: Expression, arguments: Vec<Element>) -> Expression {
        self.expression(ExpressionKind::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
            must: false,
        }))
    }

    pub fn unary(&self, operator: UnaryOperator, operand: Expression) -> Expression {
        self.expression(ExpressionKind::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
        }))
    }

    pub fn binary(
        &self,
        operator: BinaryOperator,
        left: Expression,
        right: Expression,
    ) -> Expression {
        self.expression(ExpressionKind::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    pub fn object(&self, properties: Vec<(&str, Expression)>) -> Expression {
        let properties = self.properties(properties);
        self.expression(ExpressionKind::Object(ObjectLiteral {
            properties,
            meta_properties: Vec::new(),
            spreads: Vec::new(),
        }))
    }

    pub fn record(&self, properties: Vec<(&str, Expression)>) -> Expression {
        let properties = self.properties(properties);
        self.expression(ExpressionKind::Record(RecordLiteral {
            properties,
            spreads: Vec::new(),
        }))
    }

    fn properties(&self, properties: Vec<(&str, Expression)>) -> Vec<ObjectProperty> {
        properties
            .into_iter()
            .map(|(name, value)| ObjectProperty {
                key: Some(self.identifier(name)),
                type_annotation: None,
                value,
            })
            .collect()
    }

    pub fn list(&self, elements: Vec<Expression>) -> Expression {
        let literal = Self::sequence(elements);
        self.expression(ExpressionKind::List(literal))
    }

    pub fn tuple(&self, elements: Vec<Expression>) -> Expression {
        let literal = Self::sequence(elements);
        self.expression(ExpressionKind::Tuple(literal))
    }

    fn sequence(elements: Vec<Expression>) -> SequenceLiteral {
        SequenceLiteral {
            type_annotation: None,
            elements: elements
                .into_iter()
                .map(|value| Element {
                    spread: false,
                    value,
                })
                .collect(),
        }
    }

    /// Function expression with a block body. Parameters are `(name, optional pattern)`.
    pub fn function(
        &self,
        parameters: Vec<(&str, Option<Expression>)>,
        return_type: Option<Expression>,
        body: Vec<Statement>,
    ) -> Expression {
        let body = FunctionBody::Block(Block { statements: body });
        self.function_with(parameters, return_type, body)
    }

    /// Function expression whose body is a single expression.
    pub fn arrow_function(
        &self,
        parameters: Vec<(&str, Option<Expression>)>,
        body: Expression,
    ) -> Expression {
        self.function_with(parameters, None, FunctionBody::Expression(Box::new(body)))
    }

    fn function_with(
        &self,
        parameters: Vec<(&str, Option<Expression>)>,
        return_type: Option<Expression>,
        body: FunctionBody,
    ) -> Expression {
        let parameters = parameters
            .into_iter()
            .map(|(name, pattern)| Parameter {
                name: self.identifier(name),
                pattern,
            })
            .collect();
        let id = self.next_id();
        let function = FunctionExpression {
            id,
            span: Self::span_of(id),
            parameters,
            variadic: false,
            return_type,
            body,
            captured_locals: Vec::new(),
        };
        self.expression(ExpressionKind::Function(Arc::new(function)))
    }

    pub fn module(&self, statements: Vec<Statement>) -> Arc<EmbeddedModule> {
        let id = self.next_id();
        Arc::new(EmbeddedModule {
            id,
            span: Self::span_of(id),
            statements,
        })
    }

    pub fn spawn(&self, meta: Option<Expression>, statements: Vec<Statement>) -> Expression {
        let module = self.module(statements);
        self.expression(ExpressionKind::Spawn(SpawnExpression {
            meta: meta.map(Box::new),
            module,
        }))
    }

    // ---- statements ----

    pub fn local(&self, name: &str, value: Expression) -> Statement {
        self.declare_local(name, None, value)
    }

    pub fn typed_local(&self, name: &str, annotation: Expression, value: Expression) -> Statement {
        self.declare_local(name, Some(annotation), value)
    }

    fn declare_local(
        &self,
        name: &str,
        type_annotation: Option<Expression>,
        value: Expression,
    ) -> Statement {
        let declaration = LocalVariableDeclaration {
            name: self.identifier(name),
            type_annotation,
            initializer: Some(value),
        };
        self.statement(StatementKind::LocalVariables(vec![declaration]))
    }

    pub fn assign(&self, target: Expression, value: Expression) -> Statement {
        self.assign_with(AssignmentOperator::Set, target, value)
    }

    pub fn assign_with(
        &self,
        operator: AssignmentOperator,
        target: Expression,
        value: Expression,
    ) -> Statement {
        self.statement(StatementKind::Assignment(Assignment {
            operator,
            target,
            value,
        }))
    }

    pub fn expression_statement(&self, expression: Expression) -> Statement {
        self.statement(StatementKind::Expression(expression))
    }

    pub fn return_statement(&self, value: Option<Expression>) -> Statement {
        self.statement(StatementKind::Return(value))
    }

    pub fn if_statement(
        &self,
        test: Expression,
        consequent: Vec<Statement>,
        alternate: Option<Vec<Statement>>,
    ) -> Statement {
        self.statement(StatementKind::If(IfStatement {
            test,
            consequent: Block {
                statements: consequent,
            },
            alternate: alternate.map(|statements| Block { statements }),
        }))
    }

    pub fn for_statement(
        &self,
        key: Option<&str>,
        value: Option<&str>,
        iterated: Expression,
        body: Vec<Statement>,
    ) -> Statement {
        let key = key.map(|name| self.identifier(name));
        let value = value.map(|name| self.identifier(name));
        self.statement(StatementKind::For(ForStatement {
            key,
            value,
            iterated,
            body: Block { statements: body },
        }))
    }

    pub fn function_declaration(&self, name: &str, function: Expression) -> Statement {
        let name = self.identifier(name);
        self.statement(StatementKind::FunctionDeclaration(FunctionDeclaration {
            name,
            function,
        }))
    }

    pub fn pattern_definition(&self, name: &str, value: Expression) -> Statement {
        let name = self.identifier(name);
        self.statement(StatementKind::PatternDefinition(PatternDefinition { name, value }))
    }

    pub fn chunk(&self, name: &str, statements: Vec<Statement>) -> Chunk {
        Chunk {
            id: self.next_id(),
            name: name.to_string(),
            path: None,
            global_constants: Vec::new(),
            statements,
        }
    }

    pub fn global_constant(&self, name: &str, value: Expression) -> GlobalConstant {
        GlobalConstant {
            name: self.identifier(name),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_get_distinct_ids_and_lines() {
        let builder = AstBuilder::new();
        let one = builder.int(1);
        let two = builder.int(2);
        let sum = builder.binary(BinaryOperator::Add, one.clone(), two.clone());

        assert_ne!(one.id, two.id);
        assert_ne!(two.id, sum.id);
        assert_ne!(one.span.line, sum.span.line);
    }
}
