pub mod ast;
mod builder;
mod check;
mod context;
mod diagnostics;
mod error;
mod eval;
mod globals;
mod messages;
mod method_graph;
mod narrowing;
mod options;
mod oracle;
mod pattern;
mod state;
mod symbolic_data;
mod value;
mod visit;

pub use crate::ast::{Chunk, EmbeddedModule, NodeId, SourceSpan};
pub use crate::builder::AstBuilder;
pub use crate::check::{check, CheckInput, CheckOutput};
pub use crate::context::{Context, ExtensionMember, TypeExtension};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use crate::error::CheckError;
pub use crate::globals::base_globals;
pub use crate::options::{CheckOptions, ValueDescription, DEFAULT_FUEL_CHECK_INTERVAL};
pub use crate::oracle::{
    AllowAll, CancelSignal, ConcreteBridge, ConcreteValue, DefaultBridge, DirectoryLoader,
    ModuleLoader, NoLoader, Permission, PermissionOracle,
};
pub use crate::pattern::{ObjectPattern, Pattern, PatternNamespace, SecretPattern, SequencePattern};
pub use crate::symbolic_data::{ContextSnapshot, ScopeSnapshot, SymbolicData, UsedExtension};
pub use crate::value::{
    join_values, narrow_out, AbstractKind, DictionaryValue, FunctionValue, HostFunction,
    Multivalue, ObjectValue, PropertyLookup, PropertyMap, RecordValue, SequenceShape,
    SequenceValue, Value, ANY, ANY_BOOL, ANY_DICTIONARY, ANY_FLOAT, ANY_FUNCTION, ANY_HOST,
    ANY_INDEXABLE, ANY_INT, ANY_ITERABLE, ANY_LIST, ANY_OBJECT, ANY_PATH, ANY_PATTERN, ANY_RECORD,
    ANY_RUNE, ANY_SERIALIZABLE, ANY_STR, ANY_TUPLE, ANY_URL, NEVER, NIL,
};
