use std::fmt;
use std::mem::ManuallyDrop;

use cranelift_codegen::isa::OwnedTargetIsa;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId};
use tracing::info;

use crate::error::EngineError;
use crate::parser::ScalarType;

use super::{runtime_mod, MOD_SYMBOL};

/// Cranelift's `opt_level` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OptLevel {
    #[default]
    None,
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

fn module_error(err: impl fmt::Display) -> EngineError {
    EngineError::Module(err.to_string())
}

fn build_native_isa(opt_level: OptLevel) -> Result<OwnedTargetIsa, EngineError> {
    let mut flag_builder = settings::builder();
    flag_builder
        .set("use_colocated_libcalls", "false")
        .map_err(|e| EngineError::Isa(e.to_string()))?;
    flag_builder
        .set("is_pic", "false")
        .map_err(|e| EngineError::Isa(e.to_string()))?;
    flag_builder
        .set("opt_level", opt_level.as_setting())
        .map_err(|e| EngineError::Isa(e.to_string()))?;

    let isa_builder = cranelift_native::builder().map_err(|e| EngineError::Isa(e.to_string()))?;
    isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| EngineError::Isa(e.to_string()))
}

/// A JIT module for the host with the runtime support symbols registered.
pub fn new_jit_module(opt_level: OptLevel) -> Result<JITModule, EngineError> {
    let isa = build_native_isa(opt_level)?;
    let mut builder = JITBuilder::with_isa(isa, default_libcall_names());
    builder.symbol(MOD_SYMBOL, runtime_mod as *const u8);
    Ok(JITModule::new(builder))
}

/// Result of calling the entry function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunValue {
    Int(i64),
    Float(f64),
    Void,
}

impl fmt::Display for RunValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunValue::Int(n) => write!(f, "{n}"),
            RunValue::Float(n) => write!(f, "{n}"),
            RunValue::Void => write!(f, "void"),
        }
    }
}

/// A generated module together with its entry point. The JIT memory is
/// released on drop.
pub struct Program {
    module: ManuallyDrop<JITModule>,
    entry_name: String,
    entry: Option<(FuncId, ScalarType)>,
    ir: Vec<String>,
}

impl Program {
    pub(crate) fn new(
        module: JITModule,
        entry_name: String,
        entry: Option<(FuncId, ScalarType)>,
        ir: Vec<String>,
    ) -> Self {
        Self {
            module: ManuallyDrop::new(module),
            entry_name,
            entry,
            ir,
        }
    }

    /// Textual IR of every function, in definition order. Empty unless
    /// capturing was requested.
    pub fn ir(&self) -> &[String] {
        &self.ir
    }

    pub fn has_entry(&self) -> bool {
        self.entry.is_some()
    }

    /// Calls the entry function with no arguments.
    pub fn run(&mut self) -> Result<RunValue, EngineError> {
        let (func_id, return_type) = self
            .entry
            .ok_or_else(|| EngineError::MissingEntryPoint(self.entry_name.clone()))?;

        self.module.finalize_definitions().map_err(module_error)?;
        let code = self.module.get_finalized_function(func_id);
        info!(entry = %self.entry_name, "running program");

        // SAFETY: the entry was declared with no parameters and a single
        // return value of `return_type` (or none for `void`).
        let value = unsafe {
            match return_type {
                ScalarType::Int64 => {
                    let f: extern "C" fn() -> i64 = std::mem::transmute(code);
                    RunValue::Int(f())
                }
                ScalarType::Float64 => {
                    let f: extern "C" fn() -> f64 = std::mem::transmute(code);
                    RunValue::Float(f())
                }
                ScalarType::Void => {
                    let f: extern "C" fn() = std::mem::transmute(code);
                    f();
                    RunValue::Void
                }
            }
        };
        Ok(value)
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        // SAFETY: `module` is never touched again, and no function pointer
        // obtained from it outlives `run`.
        unsafe { ManuallyDrop::take(&mut self.module).free_memory() };
    }
}
