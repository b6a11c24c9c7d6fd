use thiserror::Error;

/// Failures while turning source text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { ch: char, line: usize },
    #[error("line {line}: invalid number literal `{text}`")]
    InvalidNumber { text: String, line: usize },
    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },
}

/// Failures while building the syntax tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },
    #[error("expected {expected}, however reached end of input")]
    UnexpectedEof { expected: String },
}

/// Failures detected while generating IR. The first one aborts generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("undeclared identifier `{0}`")]
    UndeclaredIdentifier(String),
    #[error("call to undeclared function `{0}`")]
    UndeclaredFunction(String),
    #[error("entry point `{0}` is defined more than once")]
    DuplicateEntryPoint(String),
    #[error("global `{0}` can only be initialized from literals")]
    UnsupportedGlobalInitializer(String),
    #[error("function `{0}` never records a return value")]
    MissingReturnValue(String),
    #[error("`{0}` is reserved for the runtime")]
    ReservedName(String),
    #[error("`{0}` is already defined")]
    DuplicateDefinition(String),
    #[error("`{name}` cannot have type {ty}")]
    InvalidType { name: String, ty: String },
    #[error("cannot assign to constant `{0}`")]
    ConstantAssignment(String),
    #[error("`{name}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("`{0}` used outside of a loop")]
    LoopControlOutsideLoop(&'static str),
    #[error("global `{0}` declared while a function scope is active")]
    GlobalInFunctionScope(String),
    #[error("entry point `{0}` must not take parameters")]
    InvalidEntryPoint(String),
    #[error("module error: {0}")]
    Module(String),
}

/// Failures while preparing or running the JIT-compiled program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("entry point `{0}` not found")]
    MissingEntryPoint(String),
    #[error("host machine is not supported: {0}")]
    Isa(String),
    #[error("module error: {0}")]
    Module(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, Error>;
