use crate::frontend::token::Location;
use crate::frontend::token::Token;
use crate::frontend::token::TokenKind;
use anyhow::Result;

const KEYWORDS: &[&str] = &[
    "break", "case", "continue", "default", "delete", "do", "else", "for", "goto", "if", "new",
    "return", "sizeof", "switch", "while",
];

/// Multi-character operators, longest first so that `<<=` wins over `<<`.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "==", "!=",
    ">=", "<=", "&&", "||", "<<", ">>", "->", "::",
];

const SINGLE_OPERATORS: &str = "+-*/%=<>!&|^~?:.";

pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 0,
            column: 0,
        }
    }
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }
    fn peek(&self) -> char {
        self.peek_n(0)
    }
    fn peek_next(&self) -> char {
        self.peek_n(1)
    }
    fn peek_n(&self, n: usize) -> char {
        match self.source.get(self.current + n) {
            Some(c) => *c,
            None => '\0',
        }
    }
    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }
    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = if kind == TokenKind::Eof {
            "".to_string()
        } else {
            self.lexeme()
        };
        let diff = lexeme.chars().count();
        let column = self.column.saturating_sub(diff);
        let location = Location::new(self.line, column, self.start);
        self.tokens.push(Token::new(kind, lexeme, location));
    }
    fn number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        // Suffixes such as `1.0f` or `10UL`.
        while self.peek().is_ascii_alphabetic() {
            self.advance();
        }
        if is_float {
            self.add_token(TokenKind::FloatLiteral);
        } else {
            self.add_token(TokenKind::Integer)
        }
        Ok(())
    }
    // Whether the character is a valid identifier start character.
    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }
    // Whether the character is a valid identifier character.
    fn is_identifier(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }
    // Scan identifiers and keywords.
    fn identifier(&mut self) -> Result<()> {
        while Scanner::is_identifier(self.peek()) {
            self.advance();
        }
        let lexeme = self.lexeme();
        let kind = if KEYWORDS.contains(&lexeme.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.add_token(kind);
        Ok(())
    }
    fn quoted(&mut self, quote: char, kind: TokenKind) -> Result<()> {
        while self.peek() != quote && !self.is_at_end() {
            if self.peek() == '\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
            }
            self.advance();
        }
        if self.is_at_end() {
            let location = Location::new(self.line, self.column, self.start);
            let msg = format!("Unterminated literal starting with {quote}");
            return Err(anyhow::anyhow!(self.error_at(&location, &msg)));
        }
        self.advance();
        self.add_token(kind);
        Ok(())
    }
    fn directive(&mut self) -> Result<()> {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
        self.add_token(TokenKind::Directive);
        Ok(())
    }
    fn line_comment(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }
    fn block_comment(&mut self) -> Result<()> {
        // Skip the opening `*`.
        self.advance();
        while !(self.peek() == '*' && self.peek_next() == '/') {
            if self.is_at_end() {
                let location = Location::new(self.line, self.column, self.start);
                return Err(anyhow::anyhow!(
                    self.error_at(&location, "Unterminated block comment")
                ));
            }
            self.advance();
        }
        self.advance();
        self.advance();
        Ok(())
    }
    fn operator(&mut self, c: char) -> Result<()> {
        for op in OPERATORS {
            let mut chars = op.chars();
            if chars.next() != Some(c) {
                continue;
            }
            let rest = chars.enumerate().all(|(i, expected)| self.peek_n(i) == expected);
            if rest {
                for _ in 1..op.chars().count() {
                    self.advance();
                }
                self.add_token(TokenKind::Operator);
                return Ok(());
            }
        }
        if SINGLE_OPERATORS.contains(c) {
            self.add_token(TokenKind::Operator);
            return Ok(());
        }
        let column = self.column.saturating_sub(1);
        let location = Location::new(self.line, column, self.start);
        let msg = format!("Scanning failed starting at: {c}");
        Err(anyhow::anyhow!(self.error_at(&location, &msg)))
    }
    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            ';' => self.add_token(TokenKind::Semicolon),
            ',' => self.add_token(TokenKind::Comma),
            ' ' | '\r' | '\t' | '\n' => (),
            '#' => self.directive()?,
            '"' => self.quoted('"', TokenKind::String)?,
            '\'' => self.quoted('\'', TokenKind::Char)?,
            '/' if self.peek() == '/' => self.line_comment(),
            '/' if self.peek() == '*' => self.block_comment()?,
            s if s.is_ascii_digit() => self.number()?,
            s if Scanner::is_identifier_start(s) => self.identifier()?,
            s => self.operator(s)?,
        }
        Ok(())
    }
    fn scan_tokens(&mut self) -> Result<()> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.start = self.current;
        self.add_token(TokenKind::Eof);
        Ok(())
    }
    pub fn scan(src: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner::new(src);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }
    fn error_at(&self, loc: &Location, msg: &str) -> String {
        let src: String = self.source.iter().collect();
        Scanner::error(&src, loc, msg)
    }
    pub fn error(src: &str, loc: &Location, msg: &str) -> String {
        let lines = src.split('\n').collect::<Vec<&str>>();
        let n = loc.line().min(lines.len().saturating_sub(1));
        let prev_line = if n > 0 {
            let prev_n = n - 1;
            let prev = lines[prev_n];
            format!("\n{prev_n}  | {prev}")
        } else {
            "".to_string()
        };
        let line = lines.get(n).copied().unwrap_or("");
        let line_num_width = 4 + n.to_string().len();
        let err_indent = " ".repeat(loc.column() + line_num_width);
        format!("```{prev_line}\n{n}  | {line}\n{err_indent}^ {msg}\n```")
    }
}
