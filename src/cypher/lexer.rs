//! Cypher lexer — tokenizes a query string.
//!
//! The scanner walks the source by byte offset, slicing identifiers and
//! numbers straight out of the input; only string literals allocate while
//! scanning (escapes have to be rewritten). Comments and whitespace are
//! consumed up front by `skip_trivia`, so the token dispatch only ever
//! sees the first character of a real token.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Match, Where, Return, Order, By, Asc, Desc, Skip, Limit, As,
    Call, Yield, With,
    And, Or, Not,
    Starts, Ends, Contains,

    // Clauses we recognise to reject with a useful message
    Create, Merge, Delete, Unwind, Optional,

    // Literals
    Integer, Float, StringLiteral,

    // Identifiers and parameters
    Identifier, Parameter,

    // Punctuation
    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Dot, Comma, Colon, Semicolon, Pipe, Star,
    Arrow,      // ->
    LeftArrow,  // <-
    Dash,       // -
    DotDot,     // ..

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,

    // EOF
    Eof,
}

/// Tokenize a Cypher query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner { src: input, pos: 0 };
    let mut tokens = Vec::new();

    loop {
        scanner.skip_trivia()?;
        let Some(first) = scanner.peek() else { break };
        let token = match first {
            '\'' | '"' => scanner.scan_string(first)?,
            '$' => scanner.scan_parameter()?,
            c if c.is_ascii_digit() => scanner.scan_number(),
            c if c.is_alphabetic() || c == '_' => scanner.scan_word(),
            _ => scanner.scan_symbol()?,
        };
        tokens.push(token);
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

// ============================================================================
// Scanner
// ============================================================================

struct Scanner<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Scanner<'s> {
    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advance through characters matching `pred`, returning the slice.
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'s str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span { start, end: self.pos },
            text: self.src[start..self.pos].to_string(),
        }
    }

    fn fail(&self, position: usize, message: impl Into<String>) -> Error {
        Error::Syntax { position, message: message.into() }
    }

    /// Consume whitespace, `//` line comments, and `/* */` block comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.pos += c.len_utf8();
                }
                Some('/') if self.rest().starts_with("//") => {
                    match self.rest().find('\n') {
                        Some(offset) => self.pos += offset,
                        None => self.pos = self.src.len(),
                    }
                }
                Some('/') if self.rest().starts_with("/*") => {
                    let body = &self.src[self.pos + 2..];
                    let Some(close) = body.find("*/") else {
                        return Err(self.fail(self.pos, "Unterminated block comment"));
                    };
                    self.pos += 2 + close + 2;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Quoted string with escape rewriting; both quote styles accepted.
    fn scan_string(&mut self, quote: char) -> Result<Token> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.fail(start, "Unterminated string literal"));
            };
            if c == quote {
                break;
            }
            if c != '\\' {
                text.push(c);
                continue;
            }
            let Some(escaped) = self.bump() else {
                return Err(self.fail(start, "Unterminated string literal"));
            };
            match escaped {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                '\\' => text.push('\\'),
                c if c == quote => text.push(c),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral,
            span: Span { start, end: self.pos },
            text,
        })
    }

    /// Integer, or float when a digit follows the dot. A `..` after the
    /// integer part belongs to a range, not a fraction.
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::Integer;
        if self.rest().starts_with('.') && !self.rest().starts_with("..") {
            let after_dot = self.src[self.pos + 1..].chars().next();
            if after_dot.is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
                self.eat_while(|c| c.is_ascii_digit());
                kind = TokenKind::Float;
            }
        }
        self.token(kind, start)
    }

    /// `$name` parameter reference.
    fn scan_parameter(&mut self) -> Result<Token> {
        let start = self.pos;
        self.bump(); // '$'
        let name = self.eat_while(|c| c.is_alphanumeric() || c == '_');
        if name.is_empty() {
            return Err(self.fail(start, "Expected parameter name after '$'"));
        }
        Ok(Token {
            kind: TokenKind::Parameter,
            span: Span { start, end: self.pos },
            text: name.to_string(),
        })
    }

    /// Keyword or identifier. Keywords match case-insensitively; anything
    /// unknown stays an identifier, so non-reserved words remain usable as
    /// variable names.
    fn scan_word(&mut self) -> Token {
        let start = self.pos;
        let word = self.eat_while(|c| c.is_alphanumeric() || c == '_');
        let kind = lookup_keyword(word);
        self.token(kind, start)
    }

    /// Punctuation and operators, longest match first.
    fn scan_symbol(&mut self) -> Result<Token> {
        use TokenKind::*;

        const TWO_CHAR: &[(&str, TokenKind)] = &[
            ("->", Arrow),
            ("<-", LeftArrow),
            ("<=", Lte),
            (">=", Gte),
            ("<>", Neq),
            ("!=", Neq),
            ("..", DotDot),
        ];
        const ONE_CHAR: &[(char, TokenKind)] = &[
            ('(', LParen), (')', RParen),
            ('[', LBracket), (']', RBracket),
            ('{', LBrace), ('}', RBrace),
            (',', Comma), ('.', Dot), (':', Colon), (';', Semicolon),
            ('|', Pipe), ('*', Star), ('-', Dash),
            ('=', Eq), ('<', Lt), ('>', Gt),
        ];

        let start = self.pos;
        for (symbol, kind) in TWO_CHAR {
            if self.rest().starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(self.token(*kind, start));
            }
        }
        let Some(c) = self.bump() else {
            return Err(self.fail(start, "Unexpected end of input"));
        };
        for (symbol, kind) in ONE_CHAR {
            if *symbol == c {
                return Ok(self.token(*kind, start));
            }
        }
        Err(self.fail(start, format!("Unexpected character: '{c}'")))
    }
}

fn lookup_keyword(word: &str) -> TokenKind {
    use TokenKind::*;

    const KEYWORDS: &[(&str, TokenKind)] = &[
        ("MATCH", Match), ("WHERE", Where), ("RETURN", Return),
        ("ORDER", Order), ("BY", By),
        ("ASC", Asc), ("ASCENDING", Asc),
        ("DESC", Desc), ("DESCENDING", Desc),
        ("SKIP", Skip), ("LIMIT", Limit), ("AS", As),
        ("CALL", Call), ("YIELD", Yield), ("WITH", With),
        ("AND", And), ("OR", Or), ("NOT", Not),
        ("STARTS", Starts), ("ENDS", Ends), ("CONTAINS", Contains),
        ("CREATE", Create), ("MERGE", Merge), ("DELETE", Delete),
        ("UNWIND", Unwind), ("OPTIONAL", Optional),
    ];

    KEYWORDS
        .iter()
        .find(|(keyword, _)| word.eq_ignore_ascii_case(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(Identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_match() {
        let tokens = tokenize("MATCH (n:Protein) RETURN n").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::Match,
            TokenKind::LParen,
            TokenKind::Identifier, // n
            TokenKind::Colon,
            TokenKind::Identifier, // Protein
            TokenKind::RParen,
            TokenKind::Return,
            TokenKind::Identifier, // n
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_relationship_pattern() {
        let tokens = tokenize("(a)-[:INTERACTS]->(b)").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::LParen,
            TokenKind::Identifier, // a
            TokenKind::RParen,
            TokenKind::Dash,
            TokenKind::LBracket,
            TokenKind::Colon,
            TokenKind::Identifier, // INTERACTS
            TokenKind::RBracket,
            TokenKind::Arrow,
            TokenKind::LParen,
            TokenKind::Identifier, // b
            TokenKind::RParen,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_var_length_range() {
        let tokens = tokenize("*1..3").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::Star,
            TokenKind::Integer,
            TokenKind::DotDot,
            TokenKind::Integer,
            TokenKind::Eof,
        ]);
        assert_eq!(tokens[1].text, "1");
        assert_eq!(tokens[3].text, "3");
    }

    #[test]
    fn test_float_literal() {
        let tokens = tokenize("0.85").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].text, "0.85");
    }

    #[test]
    fn test_string_literal_both_quotes() {
        let tokens = tokenize("'hello world'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "hello world");

        let tokens = tokenize("\"double\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "double");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r"'a\nb\\c\'d'").unwrap();
        assert_eq!(tokens[0].text, "a\nb\\c'd");
    }

    #[test]
    fn test_parameter() {
        let tokens = tokenize("$name").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Parameter);
        assert_eq!(tokens[0].text, "name");
    }

    #[test]
    fn test_bare_dollar_rejected() {
        assert!(tokenize("$ name").is_err());
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = tokenize("= <> != < <= > >=").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::Eq, TokenKind::Neq, TokenKind::Neq,
            TokenKind::Lt, TokenKind::Lte, TokenKind::Gt, TokenKind::Gte,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = tokenize("match WHERE Return starts ENDS contains").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::Match, TokenKind::Where, TokenKind::Return,
            TokenKind::Starts, TokenKind::Ends, TokenKind::Contains,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_unknown_keyword_is_identifier() {
        let tokens = tokenize("foo").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_line_comment() {
        let tokens = tokenize("MATCH // trailing\n(n)").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Match);
        assert_eq!(tokens[1].kind, TokenKind::LParen);
    }

    #[test]
    fn test_block_comment() {
        let tokens = tokenize("MATCH /* this is a comment */ (n) RETURN n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Match);
        assert_eq!(tokens[1].kind, TokenKind::LParen);
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize("MATCH /* unterminated").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("'oops").is_err());
    }

    #[test]
    fn test_parameter_span() {
        let tokens = tokenize("$myParam").unwrap();
        let param_token = &tokens[0];
        assert_eq!(param_token.span.start, 0);
        assert_eq!(param_token.span.end, 8); // $ + myParam = 8 chars
    }
}
