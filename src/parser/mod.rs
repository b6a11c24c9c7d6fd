mod ast;
mod parser;
mod printer;

pub use ast::*;
pub use parser::*;
