pub mod codegen;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod parser;

use codegen::{Codegen, Options};
use engine::{Program, RunValue};
use lexer::Lexer;
use parser::{CompUnit, Parser};

pub use error::{Error, Result};

pub fn parse(source: &str) -> Result<CompUnit> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse()?)
}

/// Parses and generates `source` into a program ready to run.
pub fn compile(source: &str, options: &Options) -> Result<Program> {
    let comp_unit = parse(source)?;
    compile_unit(&comp_unit, options)
}

pub fn compile_unit(comp_unit: &CompUnit, options: &Options) -> Result<Program> {
    let codegen = Codegen::new(options.clone())?;
    Ok(codegen.generate(comp_unit)?)
}

/// Compiles `source` with default options and runs `main`.
pub fn run(source: &str) -> Result<RunValue> {
    let mut program = compile(source, &Options::default())?;
    Ok(program.run()?)
}
