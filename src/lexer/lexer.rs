use crate::error::LexError;

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    TokenKind,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
    line: usize,
}

impl Lexer {
    fn new() -> Self {
        Self {
            tokens: vec![],
            index: 0,
            line: 1,
        }
    }

    fn new_token(&mut self, kind: TokenKind, len: usize) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
        self.index += len;
    }

    fn parse_number(&mut self, chars: &[char]) -> Result<(), LexError> {
        if chars.len() > 1 && chars[0] == '0' && matches!(chars[1], 'x' | 'X') {
            let digits: String = chars[2..]
                .iter()
                .take_while(|c| c.is_ascii_hexdigit())
                .collect();
            let text = format!("0x{digits}");
            let value = i64::from_str_radix(&digits, 16).map_err(|_| LexError::InvalidNumber {
                text: text.clone(),
                line: self.line,
            })?;
            self.new_token(TokenKind::IntConst(value), text.len());
            return Ok(());
        }

        let mut len = chars.iter().take_while(|c| c.is_ascii_digit()).count();
        let mut is_float = false;
        if chars.get(len) == Some(&'.') {
            is_float = true;
            len += 1;
            len += chars[len..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .count();
        }
        if matches!(chars.get(len), Some('e' | 'E')) {
            let mut exp_len = 1;
            if matches!(chars.get(len + exp_len), Some('+' | '-')) {
                exp_len += 1;
            }
            let digits = chars[(len + exp_len).min(chars.len())..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .count();
            if digits > 0 {
                is_float = true;
                len += exp_len + digits;
            }
        }

        let text: String = chars[..len].iter().collect();
        let invalid = || LexError::InvalidNumber {
            text: text.clone(),
            line: self.line,
        };
        let kind = if is_float {
            TokenKind::FloatConst(text.parse().map_err(|_| invalid())?)
        } else {
            TokenKind::IntConst(text.parse().map_err(|_| invalid())?)
        };
        self.new_token(kind, len);
        Ok(())
    }

    fn parse_identifier(&mut self, chars: &[char]) {
        let s: String = chars
            .iter()
            .take_while(|&&c| c.is_ascii_alphanumeric() || c == '_')
            .collect();
        let len = s.len();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), len);
        } else {
            self.new_token(TokenKind::Ident(s), len);
        }
    }

    /// Skips a `/* ... */` comment starting at the current index.
    fn skip_block_comment(&mut self, chars: &[char]) -> Result<(), LexError> {
        let start_line = self.line;
        self.index += 2;
        while self.index + 1 < chars.len() {
            if chars[self.index] == '*' && chars[self.index + 1] == '/' {
                self.index += 2;
                return Ok(());
            }
            if chars[self.index] == '\n' {
                self.line += 1;
            }
            self.index += 1;
        }
        Err(LexError::UnterminatedComment { line: start_line })
    }

    fn _tokenize(&mut self, s: &str) -> Result<(), LexError> {
        let chars: Vec<_> = s.chars().collect();

        while self.index < chars.len() {
            let c = chars[self.index];
            let c2 = chars[self.index..].iter().take(2).collect::<String>();

            if c == '\n' {
                self.line += 1;
                self.index += 1;
            } else if c.is_whitespace() {
                self.index += 1;
            } else if c2 == "//" {
                while self.index < chars.len() && chars[self.index] != '\n' {
                    self.index += 1;
                }
            } else if c2 == "/*" {
                self.skip_block_comment(&chars)?;
            } else if c.is_ascii_digit()
                || (c == '.' && chars.get(self.index + 1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.parse_number(&chars[self.index..])?;
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.parse_identifier(&chars[self.index..]);
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.new_token(kind.clone(), 2);
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                self.new_token(kind.clone(), 1);
            } else {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    line: self.line,
                });
            }
        }

        Ok(())
    }

    pub fn tokenize(s: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new();
        lexer._tokenize(s)?;

        Ok(lexer.tokens)
    }
}
