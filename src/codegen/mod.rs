mod codegen;
mod constant;
mod control_flow;
mod symbol_table;
mod translator;

pub use codegen::*;
pub use symbol_table::*;

use translator::FunctionTranslator;
