use crate::engine::runtime_mod;
use crate::parser::{ArithOp, Expr, LogicalOp, ScalarType, UnaryArithOp, UnaryLogicalOp};

/// A folded global initializer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
}

impl Constant {
    fn as_f64(self) -> f64 {
        match self {
            Constant::Int(n) => n as f64,
            Constant::Float(n) => n,
        }
    }

    fn is_true(self) -> bool {
        match self {
            Constant::Int(n) => n != 0,
            Constant::Float(n) => n != 0.0,
        }
    }

    /// Converts to the declared type and returns the in-memory bytes.
    pub fn to_bytes(self, ty: ScalarType) -> [u8; 8] {
        match (ty, self) {
            (ScalarType::Float64, c) => c.as_f64().to_ne_bytes(),
            (_, Constant::Int(n)) => n.to_ne_bytes(),
            // saturating, same as `fcvt_to_sint_sat`
            (_, Constant::Float(n)) => (n as i64).to_ne_bytes(),
        }
    }
}

fn from_bool(b: bool) -> Constant {
    Constant::Int(b as i64)
}

/// Folds an expression built only from literals. Anything that reads a
/// variable or calls a function gives `None`. Integer division follows the
/// generated code: a zero divisor or an overflowing quotient gives 0.
pub fn fold(expr: &Expr) -> Option<Constant> {
    match expr {
        Expr::Int(n) => Some(Constant::Int(*n)),
        Expr::Float(n) => Some(Constant::Float(*n)),
        Expr::Ident(_) | Expr::Call(..) | Expr::Assign(..) => None,
        Expr::UnaryArith(UnaryArithOp::Neg, operand) => match fold(operand)? {
            Constant::Int(n) => Some(Constant::Int(n.wrapping_neg())),
            Constant::Float(n) => Some(Constant::Float(-n)),
        },
        Expr::UnaryLogical(UnaryLogicalOp::Not, operand) => Some(from_bool(!fold(operand)?.is_true())),
        Expr::BinaryArith(op, lhs, rhs) => Some(fold_arith(*op, fold(lhs)?, fold(rhs)?)),
        Expr::BinaryLogical(op, lhs, rhs) => Some(fold_logical(*op, fold(lhs)?, fold(rhs)?)),
    }
}

fn fold_arith(op: ArithOp, lhs: Constant, rhs: Constant) -> Constant {
    if let (Constant::Int(a), Constant::Int(b)) = (lhs, rhs) {
        let n = match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => a.checked_div(b).unwrap_or(0),
            ArithOp::Mod => runtime_mod(a, b),
        };
        return Constant::Int(n);
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let n = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        // `mod` only takes integers
        ArithOp::Mod => return Constant::Int(runtime_mod(a as i64, b as i64)),
    };
    Constant::Float(n)
}

fn fold_logical(op: LogicalOp, lhs: Constant, rhs: Constant) -> Constant {
    let ordering = match (lhs, rhs) {
        (Constant::Int(a), Constant::Int(b)) => a.partial_cmp(&b),
        _ => lhs.as_f64().partial_cmp(&rhs.as_f64()),
    };
    let b = match op {
        LogicalOp::And => lhs.is_true() & rhs.is_true(),
        LogicalOp::Or => lhs.is_true() | rhs.is_true(),
        LogicalOp::Equal => ordering.is_some_and(|o| o.is_eq()),
        // unordered compares as not equal, like `fcmp une`
        LogicalOp::NotEqual => !ordering.is_some_and(|o| o.is_eq()),
        LogicalOp::LessThan => ordering.is_some_and(|o| o.is_lt()),
        LogicalOp::LessEqual => ordering.is_some_and(|o| o.is_le()),
        LogicalOp::GreaterThan => ordering.is_some_and(|o| o.is_gt()),
        LogicalOp::GreaterEqual => ordering.is_some_and(|o| o.is_ge()),
    };
    from_bool(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::{Decl, Parser};

    fn fold_init(s: &str) -> Option<Constant> {
        let source = format!("int g = {s};");
        let unit = Parser::new(Lexer::tokenize(&source).unwrap())
            .parse()
            .unwrap();
        let Decl::Var(decl) = &unit.0[0] else {
            panic!()
        };
        fold(decl.init.as_ref().unwrap())
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(fold_init("-5"), Some(Constant::Int(-5)));
        assert_eq!(fold_init("1 + 2 * 3"), Some(Constant::Int(7)));
        assert_eq!(fold_init("!0"), Some(Constant::Int(1)));
        assert_eq!(fold_init("7 % 3"), Some(Constant::Int(1)));
        assert_eq!(fold_init("-7 % 3"), Some(Constant::Int(-1)));
        assert_eq!(fold_init("1 / 0"), Some(Constant::Int(0)));
        assert_eq!(fold_init("(-9223372036854775807 - 1) / -1"), Some(Constant::Int(0)));
        assert_eq!(fold_init("1.5 * 2"), Some(Constant::Float(3.0)));
        assert_eq!(fold_init("2 < 3 && 1.0 != 1"), Some(Constant::Int(0)));
    }

    #[test]
    fn non_literal_operands() {
        assert_eq!(fold_init("x + 1"), None);
        assert_eq!(fold_init("f()"), None);
    }

    #[test]
    fn bytes_follow_declared_type() {
        assert_eq!(Constant::Int(3).to_bytes(ScalarType::Float64), 3.0f64.to_ne_bytes());
        assert_eq!(Constant::Float(2.9).to_bytes(ScalarType::Int64), 2i64.to_ne_bytes());
        assert_eq!(Constant::Float(-1e300).to_bytes(ScalarType::Int64), i64::MIN.to_ne_bytes());
    }
}
