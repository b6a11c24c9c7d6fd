use std::collections::HashMap;

use cranelift_codegen::ir::StackSlot;
use cranelift_module::DataId;
use tracing::warn;

use crate::error::CodegenError;
use crate::parser::ScalarType;

/// Where a variable lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Local(StackSlot),
    Global(DataId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Storage {
    pub location: Location,
    pub ty: ScalarType,
    pub is_const: bool,
}

/// Globals live for the whole pass. At most one function scope is active at a
/// time and it is flat: nested blocks share it.
#[derive(Debug, Default)]
pub struct SymbolTable {
    globals: HashMap<String, Storage>,
    locals: Option<HashMap<String, Storage>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_function(&mut self) {
        self.locals = Some(HashMap::new());
    }

    pub fn leave_function(&mut self) {
        self.locals = None;
    }

    pub fn in_function(&self) -> bool {
        self.locals.is_some()
    }

    /// Binds `name` in the active function scope. Without one the binding
    /// falls through to the global table.
    pub fn declare_local(&mut self, name: &str, storage: Storage) -> Result<(), CodegenError> {
        let Some(locals) = self.locals.as_mut() else {
            return self.declare_global(name, storage);
        };
        if locals.insert(name.to_string(), storage).is_some() {
            warn!(name, "local redeclared, the previous binding is replaced");
        }
        Ok(())
    }

    pub fn declare_global(&mut self, name: &str, storage: Storage) -> Result<(), CodegenError> {
        if self.in_function() {
            return Err(CodegenError::GlobalInFunctionScope(name.to_string()));
        }
        if self.globals.contains_key(name) {
            return Err(CodegenError::DuplicateDefinition(name.to_string()));
        }
        self.globals.insert(name.to_string(), storage);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Storage, CodegenError> {
        self.locals
            .as_ref()
            .and_then(|locals| locals.get(name))
            .or_else(|| self.globals.get(name))
            .copied()
            .ok_or_else(|| CodegenError::UndeclaredIdentifier(name.to_string()))
    }
}
