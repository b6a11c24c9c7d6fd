use std::fmt;

use phf::phf_map;

pub(super) static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "const" => TokenKind::Const,
    "int" => TokenKind::Int,
    "float" => TokenKind::Float,
    "void" => TokenKind::Void,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
    "return" => TokenKind::Return,
};

pub(super) static TWO_SYMBOLS_TOKENS: phf::Map<&str, TokenKind> = phf_map! {
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "&&" => TokenKind::DoubleAmpersand,
    "||" => TokenKind::DoublePipe,
};

pub(super) static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '{' => TokenKind::OpenCurlyBrace,
    '}' => TokenKind::CloseCurlyBrace,
    ',' => TokenKind::Comma,
    ';' => TokenKind::SemiColon,
    '=' => TokenKind::Equal,
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '%' => TokenKind::Percent,
    '!' => TokenKind::Not,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntConst(i64),
    FloatConst(f64),

    Const,
    Int,
    Float,
    Void,
    If,
    Else,
    While,
    Break,
    Continue,
    Return,

    OpenParen,
    CloseParen,
    OpenCurlyBrace,
    CloseCurlyBrace,
    Comma,
    SemiColon,

    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,

    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    DoubleEqual,
    NotEqual,
    DoubleAmpersand,
    DoublePipe,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident(name) => return write!(f, "identifier `{name}`"),
            TokenKind::IntConst(n) => return write!(f, "integer `{n}`"),
            TokenKind::FloatConst(x) => return write!(f, "float `{x:?}`"),
            TokenKind::Const => "const",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::Void => "void",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenCurlyBrace => "{",
            TokenKind::CloseCurlyBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::SemiColon => ";",
            TokenKind::Equal => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Not => "!",
            TokenKind::LessThan => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::DoubleEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::DoubleAmpersand => "&&",
            TokenKind::DoublePipe => "||",
        };
        write!(f, "`{s}`")
    }
}
