use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceSpan {
    pub fn new(line: usize, column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    pub fn single_point(line: usize, column: usize) -> Self {
        Self::new(line, column, line, column)
    }

    pub fn union(a: &Self, b: &Self) -> Self {
        if a.line == 0 {
            return *b;
        }
        if b.line == 0 {
            return *a;
        }

        let (start_line, start_column) =
            if (a.line < b.line) || (a.line == b.line && a.column <= b.column) {
                (a.line, a.column)
            } else {
                (b.line, b.column)
            };

        let (end_line, end_column) = if (a.end_line > b.end_line)
            || (a.end_line == b.end_line && a.end_column >= b.end_column)
        {
            (a.end_line, a.end_column)
        } else {
            (b.end_line, b.end_column)
        };

        Self::new(start_line, start_column, end_line, end_column)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Identity of a node inside one parsed tree. Symbolic data is keyed by it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub global_constants: Vec<GlobalConstant>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConstant {
    pub name: Identifier,
    pub value: Expression,
}

/// Body of a spawn expression, a test suite, a test case or a lifetime job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedModule {
    pub id: NodeId,
    pub span: SourceSpan,
    pub statements: Vec<Statement>,
}

impl EmbeddedModule {
    /// Name of the callee when the module body is a single call to an identifier.
    pub fn single_call_callee(&self) -> Option<&str> {
        let [statement] = self.statements.as_slice() else {
            return None;
        };
        let StatementKind::Expression(expression) = &statement.kind else {
            return None;
        };
        let ExpressionKind::Call(call) = &expression.kind else {
            return None;
        };
        match &call.callee.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatementKind {
    LocalVariables(Vec<LocalVariableDeclaration>),
    Assignment(Assignment),
    MultiAssignment(MultiAssignment),
    Expression(Expression),
    Return(Option<Expression>),
    Break,
    Continue,
    Prune,
    If(IfStatement),
    For(ForStatement),
    Walk(WalkStatement),
    Switch(SwitchStatement),
    Match(MatchStatement),
    Block(Block),
    Synchronized(SynchronizedBlock),
    InclusionImport(InclusionImport),
    Import(ImportStatement),
    FunctionDeclaration(FunctionDeclaration),
    PatternDefinition(PatternDefinition),
    PatternNamespaceDefinition(PatternDefinition),
    Assertion(Expression),
    Extend(ExtendStatement),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariableDeclaration {
    pub name: Identifier,
    #[serde(default)]
    pub type_annotation: Option<Expression>,
    #[serde(default)]
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOperator {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl AssignmentOperator {
    pub fn is_int_operation(self) -> bool {
        !matches!(self, AssignmentOperator::Set)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub operator: AssignmentOperator,
    pub target: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiAssignment {
    /// Identifier expressions.
    pub variables: Vec<Expression>,
    pub value: Expression,
    #[serde(default)]
    pub nillable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Block,
    #[serde(default)]
    pub alternate: Option<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStatement {
    #[serde(default)]
    pub key: Option<Identifier>,
    #[serde(default)]
    pub value: Option<Identifier>,
    pub iterated: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkStatement {
    pub walked: Expression,
    pub entry: Identifier,
    pub body: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
    #[serde(default)]
    pub default: Option<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub values: Vec<Expression>,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatement {
    pub discriminant: Expression,
    pub cases: Vec<MatchCase>,
    #[serde(default)]
    pub default: Option<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCase {
    pub values: Vec<Expression>,
    #[serde(default)]
    pub group_matching_variable: Option<Identifier>,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynchronizedBlock {
    pub values: Vec<Expression>,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusionImport {
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatement {
    pub name: Identifier,
    pub source: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub function: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendStatement {
    pub subject: Expression,
    pub members: Vec<ExtensionMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionMember {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpressionKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Rune(char),
    Str(String),
    Path(String),
    PathPattern(String),
    Url(String),
    Host(String),
    Scheme(String),
    Quantity { value: f64, unit: String },
    Rate { value: f64, unit: String },
    ByteSlice(Vec<u8>),
    Variable(String),
    GlobalVariable(String),
    Identifier(String),
    SelfExpression,
    Member(MemberExpression),
    DoubleColon(DoubleColonExpression),
    Index(IndexExpression),
    Slice(SliceExpression),
    Extraction(ExtractionExpression),
    KeyList(Vec<Identifier>),
    Call(CallExpression),
    Unary(UnaryExpression),
    Binary(BinaryExpression),
    Object(ObjectLiteral),
    Record(RecordLiteral),
    List(SequenceLiteral),
    Tuple(SequenceLiteral),
    Dictionary(Vec<DictionaryEntry>),
    Function(Arc<FunctionExpression>),
    Concatenation(Vec<Element>),
    If(IfExpression),
    StringTemplate(StringTemplate),
    Spawn(SpawnExpression),
    Mapping(Vec<MappingEntry>),
    TestSuite(TestExpression),
    TestCase(TestExpression),
    LifetimeJob(LifetimeJobExpression),
    Xml(XmlExpression),
    PatternIdentifier(String),
    PatternNamespaceIdentifier(String),
    PatternNamespaceMember { namespace: String, member: Identifier },
    ObjectPattern(ObjectPatternLiteral),
    RecordPattern(ObjectPatternLiteral),
    ListPattern(SequencePatternLiteral),
    TuplePattern(SequencePatternLiteral),
    PatternUnion(Vec<Expression>),
    OptionalPattern(Box<Expression>),
    SecretPattern(Box<Expression>),
    RegexPattern(String),
    PatternConversion(Box<Expression>),
}

impl ExpressionKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ExpressionKind::Nil => "nil literal",
            ExpressionKind::Bool(_) => "boolean literal",
            ExpressionKind::Int(_) => "integer literal",
            ExpressionKind::Float(_) => "float literal",
            ExpressionKind::Rune(_) => "rune literal",
            ExpressionKind::Str(_) => "string literal",
            ExpressionKind::Path(_) => "path literal",
            ExpressionKind::PathPattern(_) => "path pattern literal",
            ExpressionKind::Url(_) => "URL literal",
            ExpressionKind::Host(_) => "host literal",
            ExpressionKind::Scheme(_) => "scheme literal",
            ExpressionKind::Quantity { .. } => "quantity literal",
            ExpressionKind::Rate { .. } => "rate literal",
            ExpressionKind::ByteSlice(_) => "byte slice literal",
            ExpressionKind::Variable(_) => "variable",
            ExpressionKind::GlobalVariable(_) => "global variable",
            ExpressionKind::Identifier(_) => "identifier",
            ExpressionKind::SelfExpression => "self expression",
            ExpressionKind::Member(_) => "member expression",
            ExpressionKind::DoubleColon(_) => "double-colon expression",
            ExpressionKind::Index(_) => "index expression",
            ExpressionKind::Slice(_) => "slice expression",
            ExpressionKind::Extraction(_) => "extraction expression",
            ExpressionKind::KeyList(_) => "key list",
            ExpressionKind::Call(_) => "call expression",
            ExpressionKind::Unary(_) => "unary expression",
            ExpressionKind::Binary(_) => "binary expression",
            ExpressionKind::Object(_) => "object literal",
            ExpressionKind::Record(_) => "record literal",
            ExpressionKind::List(_) => "list literal",
            ExpressionKind::Tuple(_) => "tuple literal",
            ExpressionKind::Dictionary(_) => "dictionary literal",
            ExpressionKind::Function(_) => "function expression",
            ExpressionKind::Concatenation(_) => "concatenation",
            ExpressionKind::If(_) => "if expression",
            ExpressionKind::StringTemplate(_) => "string template",
            ExpressionKind::Spawn(_) => "spawn expression",
            ExpressionKind::Mapping(_) => "mapping expression",
            ExpressionKind::TestSuite(_) => "test suite",
            ExpressionKind::TestCase(_) => "test case",
            ExpressionKind::LifetimeJob(_) => "lifetime job",
            ExpressionKind::Xml(_) => "XML expression",
            ExpressionKind::PatternIdentifier(_) => "pattern identifier",
            ExpressionKind::PatternNamespaceIdentifier(_) => "pattern namespace identifier",
            ExpressionKind::PatternNamespaceMember { .. } => "pattern namespace member",
            ExpressionKind::ObjectPattern(_) => "object pattern",
            ExpressionKind::RecordPattern(_) => "record pattern",
            ExpressionKind::ListPattern(_) => "list pattern",
            ExpressionKind::TuplePattern(_) => "tuple pattern",
            ExpressionKind::PatternUnion(_) => "pattern union",
            ExpressionKind::OptionalPattern(_) => "optional pattern",
            ExpressionKind::SecretPattern(_) => "secret pattern",
            ExpressionKind::RegexPattern(_) => "regex pattern",
            ExpressionKind::PatternConversion(_) => "pattern conversion",
        }
    }

    /// Whether the node evaluates to a pattern without further checks.
    pub fn is_pattern_expression(&self) -> bool {
        matches!(
            self,
            ExpressionKind::PatternIdentifier(_)
                | ExpressionKind::PatternNamespaceMember { .. }
                | ExpressionKind::ObjectPattern(_)
                | ExpressionKind::RecordPattern(_)
                | ExpressionKind::ListPattern(_)
                | ExpressionKind::TuplePattern(_)
                | ExpressionKind::PatternUnion(_)
                | ExpressionKind::OptionalPattern(_)
                | ExpressionKind::SecretPattern(_)
                | ExpressionKind::RegexPattern(_)
                | ExpressionKind::PathPattern(_)
                | ExpressionKind::PatternConversion(_)
        )
    }

    /// Literal composites whose re-evaluation returns the recorded value.
    pub fn is_composite_literal(&self) -> bool {
        matches!(
            self,
            ExpressionKind::Object(_)
                | ExpressionKind::Record(_)
                | ExpressionKind::List(_)
                | ExpressionKind::Tuple(_)
                | ExpressionKind::Dictionary(_)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Identifier,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubleColonExpression {
    pub element: Box<Expression>,
    pub property: Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexExpression {
    pub indexed: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceExpression {
    pub indexed: Box<Expression>,
    #[serde(default)]
    pub start: Option<Box<Expression>>,
    #[serde(default)]
    pub end: Option<Box<Expression>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionExpression {
    pub object: Box<Expression>,
    pub keys: Vec<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Element>,
    #[serde(default)]
    pub must: bool,
}

/// An element of a call argument list, a list/tuple literal or a concatenation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub spread: bool,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Is,
    IsNot,
    In,
    NotIn,
    Keyof,
    Range,
    ExclusiveRange,
    And,
    Or,
    Match,
    NotMatch,
    Substrof,
    SetDifference,
    NilCoalescing,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Is => "is",
            BinaryOperator::IsNot => "is-not",
            BinaryOperator::In => "in",
            BinaryOperator::NotIn => "not-in",
            BinaryOperator::Keyof => "keyof",
            BinaryOperator::Range => "..",
            BinaryOperator::ExclusiveRange => "..<",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Match => "match",
            BinaryOperator::NotMatch => "not-match",
            BinaryOperator::Substrof => "substrof",
            BinaryOperator::SetDifference => "\\",
            BinaryOperator::NilCoalescing => "??",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectLiteral {
    pub properties: Vec<ObjectProperty>,
    #[serde(default)]
    pub meta_properties: Vec<ObjectProperty>,
    #[serde(default)]
    pub spreads: Vec<Expression>,
}

/// A property of an object or record literal. Properties without a key get an implicit index key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectProperty {
    #[serde(default)]
    pub key: Option<Identifier>,
    #[serde(default)]
    pub type_annotation: Option<Expression>,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLiteral {
    pub properties: Vec<ObjectProperty>,
    #[serde(default)]
    pub spreads: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceLiteral {
    #[serde(default)]
    pub type_annotation: Option<Box<Expression>>,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionExpression {
    pub id: NodeId,
    pub span: SourceSpan,
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub variadic: bool,
    #[serde(default)]
    pub return_type: Option<Expression>,
    pub body: FunctionBody,
    #[serde(default)]
    pub captured_locals: Vec<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Identifier,
    #[serde(default)]
    pub pattern: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FunctionBody {
    Expression(Box<Expression>),
    Block(Block),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    #[serde(default)]
    pub alternate: Option<Box<Expression>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringTemplate {
    #[serde(default)]
    pub pattern: Option<Box<Expression>>,
    pub parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TemplatePart {
    Slice(String),
    Interpolation {
        #[serde(default)]
        member: Option<Identifier>,
        expression: Expression,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnExpression {
    #[serde(default)]
    pub meta: Option<Box<Expression>>,
    pub module: Arc<EmbeddedModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub key: Expression,
    #[serde(default)]
    pub key_variable: Option<Identifier>,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExpression {
    #[serde(default)]
    pub meta: Option<Box<Expression>>,
    pub module: Arc<EmbeddedModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifetimeJobExpression {
    pub meta: Box<Expression>,
    #[serde(default)]
    pub subject: Option<Box<Expression>>,
    pub module: Arc<EmbeddedModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlExpression {
    pub namespace: Box<Expression>,
    pub element: XmlElement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlElement {
    pub name: Identifier,
    #[serde(default)]
    pub attributes: Vec<XmlAttribute>,
    #[serde(default)]
    pub children: Vec<XmlChild>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlAttribute {
    pub name: Identifier,
    #[serde(default)]
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum XmlChild {
    Text(String),
    Element(XmlElement),
    Interpolation(Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPatternLiteral {
    pub entries: Vec<PatternEntry>,
    #[serde(default)]
    pub spreads: Vec<Expression>,
    #[serde(default)]
    pub exact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    pub name: Identifier,
    pub pattern: Expression,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencePatternLiteral {
    #[serde(default)]
    pub elements: Vec<Expression>,
    #[serde(default)]
    pub general_element: Option<Box<Expression>>,
}
