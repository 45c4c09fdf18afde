use crate::frontend::scanner::Scanner;
use crate::frontend::token::Location;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use crate::ir::Block;
use crate::ir::Expr;
use crate::ir::ExprKind;
use crate::ir::IfStmt;
use crate::ir::LoopStmt;
use crate::ir::RawStmt;
use crate::ir::Stmt;
use crate::ir::SwitchStmt;
use anyhow::Result;

/// Keywords that start a statement and can therefore not occur inside an
/// expression.
const STATEMENT_KEYWORDS: &[&str] = &["do", "else", "for", "if", "switch", "while"];

/// Recursive-descent parser for rule-body fragments.
///
/// Expressions are kept as token chains. Only calls, subscripts and
/// parentheses introduce nesting.
pub struct Parser {
    src: String,
    tokens: Vec<Token>,
    current: usize,
    origin: Location,
}

impl Parser {
    fn new(src: &str, origin: &Location) -> Result<Parser> {
        Ok(Parser {
            src: src.to_string(),
            tokens: Scanner::scan(src)?,
            current: 0,
            origin: origin.clone(),
        })
    }
    pub fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }
    pub fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    pub fn peek(&self) -> &Token {
        self.peek_n(0)
    }
    pub fn peek_n(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + n).min(last)]
    }
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    pub fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }
    pub fn error(&self, token: &Token, msg: &str) -> String {
        let msg = Scanner::error(&self.src, &token.location, msg);
        let location = token.location.offset_by(&self.origin);
        format!("\n\n{msg}\nat {location}\n")
    }
    pub fn report_token_error(&self, token: &Token, expected: TokenKind) -> Result<Token> {
        let msg = format!(
            "Expected {:?}, but got \"{}\" of kind {:?}",
            expected, token.lexeme, token.kind
        );
        Err(anyhow::anyhow!(self.error(token, &msg)))
    }
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            self.report_token_error(self.peek(), kind)
        }
    }
    fn expect_operator(&mut self, op: &str) -> Result<Token> {
        if self.peek().is_operator(op) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            let token = self.peek();
            let msg = format!("Expected \"{op}\", but got \"{}\"", token.lexeme);
            Err(anyhow::anyhow!(self.error(token, &msg)))
        }
    }
    /// Whether the next token ends the expression that is being parsed.
    fn at_terminator(&self, terminators: &[&str]) -> bool {
        let token = self.peek();
        let is_punctuation = matches!(
            token.kind,
            TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Operator
        );
        is_punctuation && terminators.contains(&token.lexeme.as_str())
    }
}

// Expressions.
impl Parser {
    fn collapse(mut parts: Vec<Expr>) -> Expr {
        match parts.len() {
            0 => Expr::nil(),
            1 => parts.remove(0),
            _ => Expr::chain(parts),
        }
    }
    /// Parse tokens into a chain until one of the terminators is reached.
    ///
    /// The terminator itself is not consumed.
    fn expression(&mut self, terminators: &[&str]) -> Result<Expr> {
        let mut parts: Vec<Expr> = vec![];
        while !self.at_terminator(terminators) {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Identifier => {
                    self.advance();
                    if self.check(TokenKind::LParen) {
                        self.advance();
                        let args = self.args()?;
                        parts.push(Expr::call(Expr::ident(&token.lexeme), args));
                    } else {
                        parts.push(Expr::ident(&token.lexeme));
                    }
                }
                TokenKind::Integer
                | TokenKind::FloatLiteral
                | TokenKind::String
                | TokenKind::Char => {
                    self.advance();
                    parts.push(Expr::lit(&token.lexeme));
                }
                TokenKind::Keyword => {
                    if STATEMENT_KEYWORDS.contains(&token.lexeme.as_str()) {
                        let msg = format!("Unexpected keyword \"{}\" in expression", token.lexeme);
                        return Err(anyhow::anyhow!(self.error(&token, &msg)));
                    }
                    self.advance();
                    parts.push(Expr::keyword(&token.lexeme));
                }
                TokenKind::Operator | TokenKind::Comma => {
                    self.advance();
                    parts.push(Expr::op(&token.lexeme));
                }
                TokenKind::LParen => {
                    self.advance();
                    let inner = self.expression(&[")"])?;
                    self.expect(TokenKind::RParen)?;
                    parts.push(Self::enclosed(None, "(", inner, ")"));
                }
                TokenKind::LBracket => {
                    self.advance();
                    let inner = self.expression(&["]"])?;
                    self.expect(TokenKind::RBracket)?;
                    // A subscript binds to the operand before it.
                    let prev = match parts.last() {
                        Some(last) if last.expr_kind() != ExprKind::Op => parts.pop(),
                        _ => None,
                    };
                    parts.push(Self::enclosed(prev, "[", inner, "]"));
                }
                TokenKind::LBrace => {
                    self.advance();
                    let inner = self.expression(&["}"])?;
                    self.expect(TokenKind::RBrace)?;
                    parts.push(Self::enclosed(None, "{", inner, "}"));
                }
                TokenKind::Eof => {
                    let msg = "Unexpected end of fragment in expression";
                    return Err(anyhow::anyhow!(self.error(&token, msg)));
                }
                TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Semicolon
                | TokenKind::Directive => {
                    let msg = format!("Unexpected \"{}\" in expression", token.lexeme);
                    return Err(anyhow::anyhow!(self.error(&token, &msg)));
                }
            }
        }
        Ok(Self::collapse(parts))
    }
    fn enclosed(prefix: Option<Expr>, open: &str, inner: Expr, close: &str) -> Expr {
        let mut parts = vec![];
        if let Some(prefix) = prefix {
            parts.push(prefix);
        }
        parts.push(Expr::op(open));
        if !inner.is_nil() {
            parts.push(inner);
        }
        parts.push(Expr::op(close));
        Expr::chain(parts)
    }
    /// Parse call arguments; the opening parenthesis is already consumed.
    fn args(&mut self) -> Result<Expr> {
        let mut args = vec![];
        if self.check(TokenKind::RParen) {
            self.advance();
            return Ok(Expr::args(args));
        }
        loop {
            let arg = self.expression(&[",", ")"])?;
            args.push(arg);
            if self.check(TokenKind::Comma) {
                self.advance();
            } else {
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        Ok(Expr::args(args))
    }
}

// Statements.
impl Parser {
    fn statement(&mut self) -> Result<Stmt> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LBrace => self.block_stmt(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::default())
            }
            TokenKind::Directive => {
                self.advance();
                Ok(Stmt::Raw(RawStmt::new(&token.lexeme)))
            }
            TokenKind::Keyword => match token.lexeme.as_str() {
                "for" => self.for_stmt(),
                "while" => self.while_stmt(),
                "if" => self.if_stmt(),
                "switch" => self.switch_stmt(),
                "case" | "default" => self.label_stmt(),
                "do" | "else" => {
                    let msg = format!("Unsupported statement starting with \"{}\"", token.lexeme);
                    Err(anyhow::anyhow!(self.error(&token, &msg)))
                }
                _ => self.basic_stmt(),
            },
            _ => self.basic_stmt(),
        }
    }
    fn basic_stmt(&mut self) -> Result<Stmt> {
        let expr = self.expression(&[";"])?;
        self.expect(TokenKind::Semicolon)?;
        if expr.is_nil() {
            Ok(Stmt::default())
        } else {
            Ok(Stmt::basic(expr))
        }
    }
    fn block_stmt(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::LBrace)?;
        let mut block = Block::default();
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                let token = self.peek();
                return Err(anyhow::anyhow!(self.error(token, "Unterminated block")));
            }
            block.add_stmt(self.statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::from_block(block))
    }
    fn condition(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LParen)?;
        let cond = self.expression(&[")"])?;
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }
    fn for_stmt(&mut self) -> Result<Stmt> {
        self.advance();
        self.expect(TokenKind::LParen)?;
        let decl = self.expression(&[";"])?;
        self.expect(TokenKind::Semicolon)?;
        let test = self.expression(&[";"])?;
        self.expect(TokenKind::Semicolon)?;
        let inc = self.expression(&[")"])?;
        self.expect(TokenKind::RParen)?;
        let body = self.statement()?;
        Ok(Stmt::Loop(LoopStmt::new(decl, test, inc, body)))
    }
    fn while_stmt(&mut self) -> Result<Stmt> {
        self.advance();
        let test = self.condition()?;
        let body = self.statement()?;
        Ok(Stmt::Loop(LoopStmt::new(Expr::nil(), test, Expr::nil(), body)))
    }
    fn if_stmt(&mut self) -> Result<Stmt> {
        self.advance();
        let cond = self.condition()?;
        let then = self.statement()?;
        let otherwise = if self.peek().is_keyword("else") {
            self.advance();
            Some(self.statement()?)
        } else {
            None
        };
        Ok(Stmt::Cond(IfStmt::new(cond, then, otherwise)))
    }
    fn switch_stmt(&mut self) -> Result<Stmt> {
        self.advance();
        let cond = self.condition()?;
        let body = self.statement()?;
        Ok(Stmt::Switch(SwitchStmt::new(cond, body)))
    }
    /// `case e:` or `default:`, kept as a basic statement.
    fn label_stmt(&mut self) -> Result<Stmt> {
        let keyword = self.advance().lexeme.clone();
        let mut parts = vec![Expr::keyword(&keyword)];
        if keyword == "case" {
            let label = self.expression(&[":"])?;
            parts.push(label);
        }
        self.expect_operator(":")?;
        parts.push(Expr::op(":"));
        // The printed form ends in `;`.
        if self.check(TokenKind::Semicolon) {
            self.advance();
        }
        Ok(Stmt::basic(Expr::chain(parts)))
    }
}

// Entry points.
impl Parser {
    pub fn parse_block(src: &str, pos: &Location) -> Result<Block> {
        let mut parser = Parser::new(src, pos)?;
        let mut block = Block::default();
        while !parser.is_at_end() {
            block.add_stmt(parser.statement()?);
        }
        Ok(block)
    }
    pub fn parse_stmt(src: &str, pos: &Location) -> Result<Stmt> {
        let mut block = Parser::parse_block(src, pos)?;
        let n = block.len();
        if n != 1 {
            return Err(anyhow::anyhow!(
                "Expected exactly one statement at {pos}, but got {n} in:\n{src}"
            ));
        }
        Ok(block.stmts_mut().remove(0))
    }
    pub fn parse_expr(src: &str, pos: &Location) -> Result<Expr> {
        let text = format!("{src};");
        let mut stmt = Parser::parse_stmt(&text, pos)?;
        let is_basic = matches!(stmt, Stmt::Basic(_));
        if !is_basic || stmt.num_exprs() > 1 {
            return Err(anyhow::anyhow!(
                "Expected exactly one expression at {pos}, but got:\n{src}"
            ));
        }
        Ok(stmt.pop_expr().unwrap_or_default())
    }
}
