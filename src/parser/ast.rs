use std::fmt;

/// Scalar types of the language. `Void` only appears as a function return type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    Int64,
    Float64,
    Void,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Int64 => write!(f, "int"),
            ScalarType::Float64 => write!(f, "float"),
            ScalarType::Void => write!(f, "void"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompUnit(pub Vec<Decl>);

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Func(FuncDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub is_const: bool,
    pub init: Option<Expr>,
    pub ty: ScalarType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub return_type: ScalarType,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: ScalarType,
    pub name: String,
}

/// An identifier reference. The parser leaves `ty` empty; the type comes from the binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub ty: Option<ScalarType>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryArithOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryLogicalOp {
    Not,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Ident(Ident),
    Call(String, Vec<Expr>),
    BinaryArith(ArithOp, Box<Expr>, Box<Expr>),
    BinaryLogical(LogicalOp, Box<Expr>, Box<Expr>),
    UnaryArith(UnaryArithOp, Box<Expr>),
    UnaryLogical(UnaryLogicalOp, Box<Expr>),
    Assign(Ident, Box<Expr>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Decl(VarDecl),
    Block(Block),
    Expr(Expr),
    /// `None` is the bare `return;`.
    Return(Option<Expr>),
    If(Expr, Block, Option<Block>),
    While(Expr, Block),
    Break,
    Continue,
}

impl Block {
    /// Wraps a single statement, unless it already is a block.
    pub fn from_stmt(stmt: Stmt) -> Self {
        match stmt {
            Stmt::Block(block) => block,
            s => Block(vec![s]),
        }
    }

    /// Whether any statement, at any nesting depth, returns a value.
    pub fn records_return_value(&self) -> bool {
        self.0.iter().any(|s| match s {
            Stmt::Return(Some(_)) => true,
            Stmt::Block(b) | Stmt::While(_, b) => b.records_return_value(),
            Stmt::If(_, then, else_block) => {
                then.records_return_value()
                    || else_block.as_ref().is_some_and(|b| b.records_return_value())
            }
            _ => false,
        })
    }
}
