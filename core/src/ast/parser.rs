//! Recursive-descent parser over the token stream.
//!
//! Precedence, loosest to tightest: statement sequencing, assignment,
//! comparisons, additive, multiplicative, power (right-associative), unary
//! sign, dice, postfix, primary. Dice binding tighter than unary sign makes
//! `-2d6` negate the whole roll.
//!
//! Parsing stops cleanly at the first token that cannot continue a
//! statement; the caller receives the matched byte length and decides what
//! to do with the tail. A malformed first statement is a hard error.

use crate::ast::{AssignTarget, Expr};
use crate::op::BinOp;
use crate::token::{ParseError, Span, Token, Tokenizer};

pub struct ParseOutcome {
    pub expr: Expr,
    /// Byte offset one past the last consumed token.
    pub matched_end: usize,
}

pub fn parse_program(src: &str) -> Result<ParseOutcome, ParseError> {
    // Tokenize as far as the input stays lexable; a lex error after at
    // least one complete statement just ends the matched region.
    let (tokens, lex_error) = match Tokenizer::new(src).tokenize() {
        Ok(tokens) => (tokens, None),
        Err(err) => {
            let upto = &src[..err.offset];
            match Tokenizer::new(upto).tokenize() {
                Ok(tokens) => (tokens, Some(err)),
                Err(err) => return Err(err),
            }
        }
    };

    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    let outcome = parser.parse_statements();
    match outcome {
        Err(err) => {
            // Prefer reporting the lex failure when parsing consumed
            // everything that lexed.
            if let Some(lex_error) = lex_error {
                if err.offset >= lex_error.offset {
                    return Err(lex_error);
                }
            }
            Err(err)
        }
        Ok(outcome) => Ok(outcome),
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn span(&self, pos: usize) -> Span {
        self.tokens
            .get(pos)
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(self.src.len(), self.src.len()))
    }

    fn offset(&self) -> usize {
        self.span(self.pos).start
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(t) if t == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(ParseError::new(format!("expected {what}"), self.offset())),
        }
    }

    fn err<T>(&self, message: &str) -> Result<T, ParseError> {
        Err(ParseError::new(message, self.offset()))
    }

    fn parse_statements(&mut self) -> Result<ParseOutcome, ParseError> {
        let mut stmts = vec![self.parse_statement()?];
        let mut matched_end = self.span(self.pos.saturating_sub(1)).end;

        loop {
            match self.peek() {
                Some(Token::Semicolon) => {
                    self.pos += 1;
                    // Trailing separator without a following statement.
                    if self.peek().is_none() || !self.can_start_statement() {
                        matched_end = self.span(self.pos - 1).end;
                        break;
                    }
                    stmts.push(self.parse_statement()?);
                    matched_end = self.span(self.pos.saturating_sub(1)).end;
                }
                _ => break,
            }
        }

        let expr = if stmts.len() == 1 {
            stmts.pop().unwrap()
        } else {
            Expr::Seq(stmts)
        };
        Ok(ParseOutcome { expr, matched_end })
    }

    fn can_start_statement(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Int(_)
                    | Token::Float(_)
                    | Token::Str(_)
                    | Token::Id(_)
                    | Token::LParen
                    | Token::LBracket
                    | Token::Amp
                    | Token::Func
                    | Token::Undefined
                    | Token::Null
                    | Token::Add
                    | Token::Sub
                    | Token::Dice
            )
        )
    }

    /// statement := target '=' statement | expr
    fn parse_statement(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_comparison()?;
        if self.peek() != Some(&Token::Assign) {
            return Ok(expr);
        }
        self.pos += 1;
        let target = match expr {
            Expr::Ident(name) => AssignTarget::Name(name),
            Expr::Attr(base, name) => AssignTarget::Attr(base, name),
            Expr::Index(base, idx) => AssignTarget::Index(base, idx),
            Expr::Slice(base, a, b) => AssignTarget::Slice(base, a, b),
            _ => return self.err("invalid assignment target"),
        };
        let rhs = self.parse_statement()?;
        Ok(Expr::Assign(target, Box::new(rhs)))
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                Some(Token::Ge) => BinOp::Ge,
                Some(Token::Gt) => BinOp::Gt,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Bin(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Add) => BinOp::Add,
                Some(Token::Sub) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Bin(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinOp::Mul,
                Some(Token::Div) => BinOp::Div,
                Some(Token::Mod) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Bin(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    /// unary := ('+' | '-') unary | power
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Sub) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Add) => {
                self.pos += 1;
                Ok(Expr::Pos(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_power(),
        }
    }

    /// power := dice ('**' unary)?   (right-associative)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_dice()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exp = self.parse_unary()?;
            return Ok(Expr::Bin(Box::new(base), BinOp::Pow, Box::new(exp)));
        }
        Ok(base)
    }

    /// dice := 'd' operand keep? | postfix ('d' operand? keep?)*
    fn parse_dice(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Dice) {
            self.pos += 1;
            let sides = self.parse_postfix()?;
            let keep = self.parse_keep()?;
            return Ok(Expr::Roll {
                count: None,
                sides: Some(Box::new(sides)),
                keep,
            });
        }

        let mut left = self.parse_postfix()?;
        while self.peek() == Some(&Token::Dice) {
            self.pos += 1;
            let sides = if self.can_start_dice_operand() {
                Some(Box::new(self.parse_postfix()?))
            } else {
                None
            };
            let keep = if sides.is_some() { self.parse_keep()? } else { None };
            left = Expr::Roll {
                count: Some(Box::new(left)),
                sides,
                keep,
            };
        }
        Ok(left)
    }

    fn can_start_dice_operand(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Int(_) | Token::Float(_) | Token::LParen | Token::Id(_))
        )
    }

    fn parse_keep(&mut self) -> Result<Option<(bool, Box<Expr>)>, ParseError> {
        let high = match self.peek() {
            Some(Token::KeepHigh) => true,
            Some(Token::KeepLow) => false,
            _ => return Ok(None),
        };
        self.pos += 1;
        let count = self.parse_postfix()?;
        Ok(Some((high, Box::new(count))))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = match self.advance() {
                        Some(Token::Id(name)) => name,
                        Some(Token::KeepHigh) => "kh".to_string(),
                        Some(Token::KeepLow) => "kl".to_string(),
                        Some(Token::Dice) => "d".to_string(),
                        _ => return self.err("expected attribute name after '.'"),
                    };
                    if self.peek() == Some(&Token::LParen) {
                        let args = self.parse_call_args()?;
                        expr = Expr::MethodCall(Box::new(expr), name, args);
                    } else {
                        expr = Expr::Attr(Box::new(expr), name);
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    expr = self.parse_index_or_slice(expr)?;
                }
                Some(Token::LParen) => {
                    let args = self.parse_call_args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Called with the '[' consumed.
    fn parse_index_or_slice(&mut self, base: Expr) -> Result<Expr, ParseError> {
        let start = if self.peek() == Some(&Token::Colon) {
            None
        } else {
            Some(Box::new(self.parse_comparison()?))
        };
        if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            let end = if self.peek() == Some(&Token::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_comparison()?))
            };
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Slice(Box::new(base), start, end));
        }
        self.expect(&Token::RBracket, "']'")?;
        match start {
            Some(index) => Ok(Expr::Index(Box::new(base), index)),
            None => self.err("expected index expression"),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.parse_comparison()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                _ => return self.err("expected ',' or ')' in argument list"),
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().cloned() {
            Some(Token::Int(i)) => {
                self.pos += 1;
                Ok(Expr::Int(i))
            }
            Some(Token::Float(f)) => {
                self.pos += 1;
                Ok(Expr::Float(f))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            Some(Token::Undefined) => {
                self.pos += 1;
                Ok(Expr::Undefined)
            }
            Some(Token::Null) => {
                self.pos += 1;
                Ok(Expr::Null)
            }
            Some(Token::Id(name)) => {
                self.pos += 1;
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_statement()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.pos += 1;
                    return Ok(Expr::Array(items));
                }
                loop {
                    items.push(self.parse_comparison()?);
                    match self.advance() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => break,
                        _ => return self.err("expected ',' or ']' in array literal"),
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(Token::Amp) => {
                self.pos += 1;
                match self.peek() {
                    Some(Token::LParen) => {
                        let body = self.capture_group(Token::LParen, Token::RParen)?;
                        Ok(Expr::Computed(body))
                    }
                    Some(Token::Id(_)) => match self.advance() {
                        Some(Token::Id(name)) => Ok(Expr::RawRef(name)),
                        _ => unreachable!(),
                    },
                    _ => self.err("expected '(' or a name after '&'"),
                }
            }
            Some(Token::Func) => {
                self.pos += 1;
                let name = match self.peek() {
                    Some(Token::Id(_)) => match self.advance() {
                        Some(Token::Id(name)) => name,
                        _ => unreachable!(),
                    },
                    _ => String::new(),
                };
                self.expect(&Token::LParen, "'(' after func")?;
                let mut params = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                } else {
                    loop {
                        match self.advance() {
                            Some(Token::Id(p)) => params.push(p),
                            _ => return self.err("expected parameter name"),
                        }
                        match self.advance() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            _ => return self.err("expected ',' or ')' in parameter list"),
                        }
                    }
                }
                let body = self.capture_group(Token::LBrace, Token::RBrace)?;
                Ok(Expr::Function {
                    expr: body,
                    name,
                    params,
                })
            }
            _ => self.err("expected expression"),
        }
    }

    /// Consumes a balanced `open..close` group and returns the raw source
    /// text between the delimiters. The body is compiled lazily at first
    /// evaluation, so it is only bracket-checked here.
    fn capture_group(&mut self, open: Token, close: Token) -> Result<String, ParseError> {
        let open_span = self.span(self.pos);
        self.expect(&open, "opening delimiter")?;
        let body_start = open_span.end;
        let mut depth = 1usize;
        loop {
            let span = self.span(self.pos);
            match self.advance() {
                Some(tok) if tok == open => depth += 1,
                Some(tok) if tok == close => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.src[body_start..span.start];
                        return Ok(body.trim().to_string());
                    }
                }
                Some(_) => {}
                None => {
                    return Err(ParseError::new(
                        "unbalanced delimiters",
                        open_span.start,
                    ));
                }
            }
        }
    }
}
