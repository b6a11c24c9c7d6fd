use std::fmt::{self, Display, Formatter};

use super::{
    ArithOp, Block, CompUnit, Decl, Expr, FuncDecl, LogicalOp, Stmt, UnaryArithOp,
    UnaryLogicalOp, VarDecl,
};

const INDENT: &str = "    ";

impl Display for ArithOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        };
        f.write_str(s)
    }
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogicalOp::Equal => "==",
            LogicalOp::NotEqual => "!=",
            LogicalOp::LessThan => "<",
            LogicalOp::LessEqual => "<=",
            LogicalOp::GreaterThan => ">",
            LogicalOp::GreaterEqual => ">=",
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        };
        f.write_str(s)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            // `{:?}` keeps the `.0` so the literal lexes back as a float
            Expr::Float(n) => write!(f, "{n:?}"),
            Expr::Ident(ident) => f.write_str(&ident.name),
            Expr::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::BinaryArith(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            Expr::BinaryLogical(op, lhs, rhs) => write!(f, "({lhs} {op} {rhs})"),
            Expr::UnaryArith(UnaryArithOp::Neg, operand) => write!(f, "-{operand}"),
            Expr::UnaryLogical(UnaryLogicalOp::Not, operand) => write!(f, "!{operand}"),
            Expr::Assign(ident, rhs) => write!(f, "{} = {rhs}", ident.name),
        }
    }
}

impl Display for VarDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(init) = &self.init {
            write!(f, " = {init}")?;
        }
        f.write_str(";")
    }
}

fn fmt_block(f: &mut Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for stmt in &block.0 {
        fmt_stmt(f, stmt, depth + 1)?;
    }
    write!(f, "{}}}", INDENT.repeat(depth))
}

fn fmt_stmt(f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    f.write_str(&INDENT.repeat(depth))?;
    match stmt {
        Stmt::Decl(decl) => write!(f, "{decl}")?,
        Stmt::Block(block) => fmt_block(f, block, depth)?,
        Stmt::Expr(expr) => write!(f, "{expr};")?,
        Stmt::Return(None) => f.write_str("return;")?,
        Stmt::Return(Some(expr)) => write!(f, "return {expr};")?,
        Stmt::If(cond, then, else_block) => {
            write!(f, "if ({cond}) ")?;
            fmt_block(f, then, depth)?;
            if let Some(else_block) = else_block {
                f.write_str(" else ")?;
                fmt_block(f, else_block, depth)?;
            }
        }
        Stmt::While(cond, body) => {
            write!(f, "while ({cond}) ")?;
            fmt_block(f, body, depth)?;
        }
        Stmt::Break => f.write_str("break;")?,
        Stmt::Continue => f.write_str("continue;")?,
    }
    f.write_str("\n")
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt_stmt(f, self, 0)
    }
}

impl Display for FuncDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        f.write_str(") ")?;
        fmt_block(f, &self.body, 0)
    }
}

impl Display for Decl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Var(decl) => write!(f, "{decl}"),
            Decl::Func(decl) => write!(f, "{decl}"),
        }
    }
}

impl Display for CompUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for decl in &self.0 {
            writeln!(f, "{decl}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::parser::{CompUnit, Parser};

    fn parse(s: &str) -> CompUnit {
        Parser::new(Lexer::tokenize(s).unwrap()).parse().unwrap()
    }

    #[test]
    fn restores_source_like_text() {
        let unit = parse("int g=1;int main(){int a=g+2*3;if(a>1)a=a-1;else{return 0;}return a;}");
        let expected = "\
int g = 1;
int main() {
    int a = (g + (2 * 3));
    if ((a > 1)) {
        a = (a - 1);
    } else {
        return 0;
    }
    return a;
}
";
        assert_eq!(unit.to_string(), expected);
    }

    #[test]
    fn reparsing_printed_source_gives_same_tree() {
        let source = "
            const float pi = 3.14, e = 2e0;
            int calls;
            void tick() { calls = calls + 1; return; }
            int fib(int n) {
                if (n < 2 || !(n != 1)) return n;
                return fib(n - 1) + fib(n - 2);
            }
            int main() {
                int i = 0, s;
                while (1) {
                    i = i + 1;
                    if (i % 2 == 0) continue;
                    if (i >= 10 && -i < 0) break;
                    s = s + i;
                    ;
                }
                tick();
                { return s / 2; }
            }
        ";
        let unit = parse(source);
        assert_eq!(parse(&unit.to_string()), unit);
    }
}
