use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

use super::{
    ArithOp, Block, CompUnit, Decl, Expr, FuncDecl, Ident, LogicalOp, Param, ScalarType, Stmt,
    UnaryArithOp, UnaryLogicalOp, VarDecl,
};

type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse(&mut self) -> Result<CompUnit> {
        self.parse_comp_unit()
    }

    fn is_eof(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    fn peek_nth(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + n).map(|t| &t.kind)
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() != Some(kind) {
            return false;
        }
        self.index += 1;
        true
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.index) {
            Some(t) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: t.kind.to_string(),
                line: t.line,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.consume(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        if let Some(TokenKind::Ident(name)) = self.peek() {
            let name = name.clone();
            self.index += 1;
            return Ok(name);
        }
        Err(self.unexpected("identifier"))
    }

    /// comp_unit = (decl | func_def)*
    fn parse_comp_unit(&mut self) -> Result<CompUnit> {
        let mut decls = vec![];

        while !self.is_eof() {
            let is_func = matches!(self.peek_nth(2), Some(TokenKind::OpenParen))
                && !matches!(self.peek(), Some(TokenKind::Const));
            if is_func {
                decls.push(Decl::Func(self.parse_func_def()?));
            } else {
                decls.extend(self.parse_decl()?.into_iter().map(Decl::Var));
            }
        }

        Ok(CompUnit(decls))
    }

    /// btype = "int" | "float"
    fn parse_btype(&mut self) -> Result<ScalarType> {
        if self.consume(&TokenKind::Int) {
            Ok(ScalarType::Int64)
        } else if self.consume(&TokenKind::Float) {
            Ok(ScalarType::Float64)
        } else if self.consume(&TokenKind::Void) {
            // rejected later, when the declaration is generated
            Ok(ScalarType::Void)
        } else {
            Err(self.unexpected("type"))
        }
    }

    /// decl    = "const"? btype var_def ("," var_def)* ";"
    /// var_def = ident ("=" exp)?
    fn parse_decl(&mut self) -> Result<Vec<VarDecl>> {
        let is_const = self.consume(&TokenKind::Const);
        let ty = self.parse_btype()?;

        let mut decls = vec![];
        loop {
            let name = self.expect_ident()?;
            let init = if self.consume(&TokenKind::Equal) {
                Some(self.parse_exp()?)
            } else if is_const {
                return Err(self.unexpected("`=`"));
            } else {
                None
            };
            decls.push(VarDecl {
                name,
                is_const,
                init,
                ty,
            });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::SemiColon)?;

        Ok(decls)
    }

    /// func_def = ("int" | "float" | "void") ident "(" params? ")" block
    fn parse_func_def(&mut self) -> Result<FuncDecl> {
        let return_type = self.parse_btype()?;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;

        Ok(FuncDecl {
            name,
            return_type,
            params,
            body,
        })
    }

    /// params = btype ident ("," btype ident)*
    fn parse_params(&mut self) -> Result<Vec<Param>> {
        let mut params = vec![];
        self.expect(&TokenKind::OpenParen)?;

        if !self.consume(&TokenKind::CloseParen) {
            loop {
                let ty = self.parse_btype()?;
                let name = self.expect_ident()?;
                params.push(Param { ty, name });
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::CloseParen)?;
        }

        Ok(params)
    }

    /// block = "{" (decl | stmt)* "}"
    fn parse_block(&mut self) -> Result<Block> {
        self.expect(&TokenKind::OpenCurlyBrace)?;
        let mut stmts = vec![];
        while !self.consume(&TokenKind::CloseCurlyBrace) {
            if self.is_eof() {
                return Err(self.unexpected("`}`"));
            }
            if matches!(
                self.peek(),
                Some(TokenKind::Const | TokenKind::Int | TokenKind::Float | TokenKind::Void)
            ) {
                stmts.extend(self.parse_decl()?.into_iter().map(Stmt::Decl));
            } else {
                stmts.push(self.parse_stmt()?);
            }
        }
        Ok(Block(stmts))
    }

    /// stmt = ident "=" exp ";"
    ///      | exp? ";"
    ///      | block
    ///      | "if" "(" cond ")" stmt ("else" stmt)?
    ///      | "while" "(" cond ")" stmt
    ///      | "break" ";"
    ///      | "continue" ";"
    ///      | "return" exp? ";"
    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(TokenKind::OpenCurlyBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(TokenKind::If) => {
                self.index += 1;
                self.expect(&TokenKind::OpenParen)?;
                let cond = self.parse_cond()?;
                self.expect(&TokenKind::CloseParen)?;
                let then = Block::from_stmt(self.parse_stmt()?);
                let else_block = if self.consume(&TokenKind::Else) {
                    Some(Block::from_stmt(self.parse_stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If(cond, then, else_block))
            }
            Some(TokenKind::While) => {
                self.index += 1;
                self.expect(&TokenKind::OpenParen)?;
                let cond = self.parse_cond()?;
                self.expect(&TokenKind::CloseParen)?;
                let body = Block::from_stmt(self.parse_stmt()?);
                Ok(Stmt::While(cond, body))
            }
            Some(TokenKind::Break) => {
                self.index += 1;
                self.expect(&TokenKind::SemiColon)?;
                Ok(Stmt::Break)
            }
            Some(TokenKind::Continue) => {
                self.index += 1;
                self.expect(&TokenKind::SemiColon)?;
                Ok(Stmt::Continue)
            }
            Some(TokenKind::Return) => {
                self.index += 1;
                if self.consume(&TokenKind::SemiColon) {
                    return Ok(Stmt::Return(None));
                }
                let expr = self.parse_exp()?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(Stmt::Return(Some(expr)))
            }
            Some(TokenKind::SemiColon) => {
                self.index += 1;
                Ok(Stmt::Block(Block::default()))
            }
            Some(TokenKind::Ident(_)) if self.peek_nth(1) == Some(&TokenKind::Equal) => {
                let name = self.expect_ident()?;
                self.index += 1;
                let rhs = self.parse_exp()?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(Stmt::Expr(Expr::Assign(Ident::new(name), Box::new(rhs))))
            }
            _ => {
                let expr = self.parse_exp()?;
                self.expect(&TokenKind::SemiColon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// exp = lor
    fn parse_exp(&mut self) -> Result<Expr> {
        self.parse_lor()
    }

    /// cond = exp
    fn parse_cond(&mut self) -> Result<Expr> {
        self.parse_exp()
    }

    /// lor = land ("||" land)*
    fn parse_lor(&mut self) -> Result<Expr> {
        let mut node = self.parse_land()?;
        while self.consume(&TokenKind::DoublePipe) {
            let rhs = self.parse_land()?;
            node = Expr::BinaryLogical(LogicalOp::Or, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    /// land = eq ("&&" eq)*
    fn parse_land(&mut self) -> Result<Expr> {
        let mut node = self.parse_eq()?;
        while self.consume(&TokenKind::DoubleAmpersand) {
            let rhs = self.parse_eq()?;
            node = Expr::BinaryLogical(LogicalOp::And, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    /// eq = rel ("==" rel | "!=" rel)*
    fn parse_eq(&mut self) -> Result<Expr> {
        let mut node = self.parse_rel()?;
        loop {
            let op = if self.consume(&TokenKind::DoubleEqual) {
                LogicalOp::Equal
            } else if self.consume(&TokenKind::NotEqual) {
                LogicalOp::NotEqual
            } else {
                return Ok(node);
            };
            let rhs = self.parse_rel()?;
            node = Expr::BinaryLogical(op, Box::new(node), Box::new(rhs));
        }
    }

    /// rel = add ("<" add | "<=" add | ">" add | ">=" add)*
    fn parse_rel(&mut self) -> Result<Expr> {
        let mut node = self.parse_add()?;
        loop {
            let op = if self.consume(&TokenKind::LessThan) {
                LogicalOp::LessThan
            } else if self.consume(&TokenKind::LessEqual) {
                LogicalOp::LessEqual
            } else if self.consume(&TokenKind::GreaterThan) {
                LogicalOp::GreaterThan
            } else if self.consume(&TokenKind::GreaterEqual) {
                LogicalOp::GreaterEqual
            } else {
                return Ok(node);
            };
            let rhs = self.parse_add()?;
            node = Expr::BinaryLogical(op, Box::new(node), Box::new(rhs));
        }
    }

    /// add = mul ("+" mul | "-" mul)*
    fn parse_add(&mut self) -> Result<Expr> {
        let mut node = self.parse_mul()?;
        loop {
            let op = if self.consume(&TokenKind::Plus) {
                ArithOp::Add
            } else if self.consume(&TokenKind::Minus) {
                ArithOp::Sub
            } else {
                return Ok(node);
            };
            let rhs = self.parse_mul()?;
            node = Expr::BinaryArith(op, Box::new(node), Box::new(rhs));
        }
    }

    /// mul = unary ("*" unary | "/" unary | "%" unary)*
    fn parse_mul(&mut self) -> Result<Expr> {
        let mut node = self.parse_unary()?;
        loop {
            let op = if self.consume(&TokenKind::Star) {
                ArithOp::Mul
            } else if self.consume(&TokenKind::Slash) {
                ArithOp::Div
            } else if self.consume(&TokenKind::Percent) {
                ArithOp::Mod
            } else {
                return Ok(node);
            };
            let rhs = self.parse_unary()?;
            node = Expr::BinaryArith(op, Box::new(node), Box::new(rhs));
        }
    }

    /// unary = primary
    ///       | "+" unary
    ///       | "-" unary
    ///       | "!" unary
    fn parse_unary(&mut self) -> Result<Expr> {
        if self.consume(&TokenKind::Plus) {
            self.parse_unary()
        } else if self.consume(&TokenKind::Minus) {
            Ok(Expr::UnaryArith(
                UnaryArithOp::Neg,
                Box::new(self.parse_unary()?),
            ))
        } else if self.consume(&TokenKind::Not) {
            Ok(Expr::UnaryLogical(
                UnaryLogicalOp::Not,
                Box::new(self.parse_unary()?),
            ))
        } else {
            self.parse_primary()
        }
    }

    /// primary = "(" exp ")"
    ///         | number
    ///         | ident ("(" (exp ("," exp)*)? ")")?
    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(kind) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        match kind {
            TokenKind::OpenParen => {
                self.index += 1;
                let expr = self.parse_exp()?;
                self.expect(&TokenKind::CloseParen)?;
                Ok(expr)
            }
            TokenKind::IntConst(num) => {
                self.index += 1;
                Ok(Expr::Int(num))
            }
            TokenKind::FloatConst(num) => {
                self.index += 1;
                Ok(Expr::Float(num))
            }
            TokenKind::Ident(name) => {
                self.index += 1;
                self.parse_ident(name)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<Expr> {
        if !self.consume(&TokenKind::OpenParen) {
            return Ok(Expr::Ident(Ident::new(name)));
        }

        let mut args = vec![];
        if !self.consume(&TokenKind::CloseParen) {
            loop {
                args.push(self.parse_exp()?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::CloseParen)?;
        }
        Ok(Expr::Call(name, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(s: &str) -> Result<CompUnit> {
        Parser::new(Lexer::tokenize(s).unwrap()).parse()
    }

    fn int(n: i64) -> Box<Expr> {
        Box::new(Expr::Int(n))
    }

    #[test]
    fn globals_and_functions() {
        let unit = parse("const int a = 1, b = 2; float c; int main() { return a; }").unwrap();
        assert_eq!(unit.0.len(), 4);
        let Decl::Var(b) = &unit.0[1] else { panic!() };
        assert_eq!(b.name, "b");
        assert!(b.is_const);
        let Decl::Var(c) = &unit.0[2] else { panic!() };
        assert_eq!(c.ty, ScalarType::Float64);
        assert_eq!(c.init, None);
        let Decl::Func(main) = &unit.0[3] else {
            panic!()
        };
        assert_eq!(main.return_type, ScalarType::Int64);
        assert_eq!(
            main.body.0,
            vec![Stmt::Return(Some(Expr::Ident(Ident::new("a"))))]
        );
    }

    #[test]
    fn precedence_and_associativity() {
        let unit = parse("int main() { return 1 - 2 - 3 * 4 % 5; }").unwrap();
        let Decl::Func(main) = &unit.0[0] else {
            panic!()
        };
        let expected = Expr::BinaryArith(
            ArithOp::Sub,
            Box::new(Expr::BinaryArith(ArithOp::Sub, int(1), int(2))),
            Box::new(Expr::BinaryArith(
                ArithOp::Mod,
                Box::new(Expr::BinaryArith(ArithOp::Mul, int(3), int(4))),
                int(5),
            )),
        );
        assert_eq!(main.body.0, vec![Stmt::Return(Some(expected))]);
    }

    #[test]
    fn logical_operators_bind_looser_than_comparisons() {
        let unit = parse("int main() { if (1 < 2 || !3 && 4 == 5) x = -1; }").unwrap();
        let Decl::Func(main) = &unit.0[0] else {
            panic!()
        };
        let cond = Expr::BinaryLogical(
            LogicalOp::Or,
            Box::new(Expr::BinaryLogical(LogicalOp::LessThan, int(1), int(2))),
            Box::new(Expr::BinaryLogical(
                LogicalOp::And,
                Box::new(Expr::UnaryLogical(UnaryLogicalOp::Not, int(3))),
                Box::new(Expr::BinaryLogical(LogicalOp::Equal, int(4), int(5))),
            )),
        );
        let then = Block(vec![Stmt::Expr(Expr::Assign(
            Ident::new("x"),
            Box::new(Expr::UnaryArith(UnaryArithOp::Neg, int(1))),
        ))]);
        assert_eq!(main.body.0, vec![Stmt::If(cond, then, None)]);
    }

    #[test]
    fn loops_and_calls() {
        let unit =
            parse("void f(int a, float b) { while (a) { a = g(a, 1); continue; break; } return; }")
                .unwrap();
        let Decl::Func(f) = &unit.0[0] else { panic!() };
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].ty, ScalarType::Float64);
        let Stmt::While(_, body) = &f.body.0[0] else {
            panic!()
        };
        assert_eq!(body.0[1], Stmt::Continue);
        assert_eq!(body.0[2], Stmt::Break);
        assert_eq!(f.body.0[1], Stmt::Return(None));
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse("int main() { return 1 }"),
            Err(ParseError::UnexpectedToken {
                expected: "`;`".to_string(),
                found: "`}`".to_string(),
                line: 1,
            })
        );
        assert!(matches!(
            parse("int main() {"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(parse("const int a;").is_err());
    }
}
