mod jit;
mod runtime;

pub use jit::*;
pub use runtime::*;
