//! Entry point of a module check.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info_span};

use crate::ast::Chunk;
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::error::CheckError;
use crate::globals::base_globals;
use crate::messages;
use crate::oracle::{
    AllowAll, CancelSignal, ConcreteBridge, DefaultBridge, ModuleLoader, NoLoader,
    PermissionOracle,
};
use crate::options::CheckOptions;
use crate::state::{ChunkFrame, Session, State};
use crate::symbolic_data::SymbolicData;
use crate::value::Value;

/// Everything a check needs besides the serializable options.
pub struct CheckInput {
    pub chunk: Arc<Chunk>,
    /// Caller-supplied globals, declared as constants before the chunk's own constants.
    pub globals: BTreeMap<String, Value>,
    pub options: CheckOptions,
    pub bridge: Arc<dyn ConcreteBridge>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub loader: Arc<dyn ModuleLoader>,
    pub cancel: Option<CancelSignal>,
    /// Sources of the chunks currently being included by the caller, outermost first.
    pub import_positions: Vec<String>,
}

impl CheckInput {
    pub fn new(chunk: impl Into<Arc<Chunk>>) -> Self {
        Self {
            chunk: chunk.into(),
            globals: BTreeMap::new(),
            options: CheckOptions::default(),
            bridge: Arc::new(DefaultBridge),
            permissions: Arc::new(AllowAll),
            loader: Arc::new(NoLoader),
            cancel: None,
            import_positions: Vec::new(),
        }
    }

    pub fn with_global(mut self, name: &str, value: Value) -> Self {
        self.globals.insert(name.to_string(), value);
        self
    }

    pub fn with_globals(mut self, globals: BTreeMap<String, Value>) -> Self {
        self.globals.extend(globals);
        self
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_bridge(mut self, bridge: Arc<dyn ConcreteBridge>) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionOracle>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_import_positions(mut self, positions: Vec<String>) -> Self {
        self.import_positions = positions;
        self
    }
}

#[derive(Debug)]
pub struct CheckOutput {
    pub data: SymbolicData,
    pub diagnostics: Diagnostics,
}

impl CheckOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Checks a chunk. Problems of the checked program are returned as diagnostics; an `Err`
/// means the checker itself could not complete.
pub fn check(input: CheckInput) -> Result<CheckOutput, CheckError> {
    let CheckInput {
        chunk,
        globals,
        options,
        bridge,
        permissions,
        loader,
        cancel,
        import_positions,
    } = input;

    let span = info_span!("check", module = %chunk.name);
    let _guard = span.enter();

    let session = Rc::new(Session::new(options, bridge, permissions, loader, cancel));
    session.poll_cancellation()?;

    let frame = ChunkFrame {
        name: chunk.name.clone(),
        path: chunk.path.clone(),
    };
    let mut state = State::new(session.clone(), Context::new(), frame);
    state.inclusion_stack = import_positions;

    if session.options.use_base_globals {
        for (name, value) in base_globals() {
            state.set_global(&name, value, true);
        }
    }
    for (name, value) in globals {
        // caller globals shadow base globals of the same name
        if !state.set_global(&name, value.clone(), true) {
            state.override_global(&name, value);
        }
    }

    for constant in &chunk.global_constants {
        let value = state.eval(&constant.value)?;
        let name = &constant.name;
        if !state.set_global(&name.name, value, true) {
            state.add_error(name.span, messages::attempt_to_assign_constant_global(&name.name));
        }
    }

    state.push_scope();
    if session.options.shell_chunk {
        for (name, description) in &session.options.shell_local_vars {
            state.set_local(name, description.value(), None);
        }
    }

    state.eval_statements(&chunk.statements)?;

    let diagnostics = state.take_diagnostics();
    debug!(
        errors = diagnostics.errors().count(),
        warnings = diagnostics.warnings().count(),
        "module checked"
    );
    drop(state);

    Ok(CheckOutput {
        data: session.take_data(),
        diagnostics,
    })
}
