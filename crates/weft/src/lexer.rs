//! Lexical analysis: raw source text to a flat token stream.
//!
//! The lexer is a hand-written scanner. Every stream starts with a
//! [`TokenKind::FileBegin`] marker and ends with [`TokenKind::Eof`]; import
//! resolution splices whole streams (markers included) into the importing
//! file's stream, which is how the parser tracks per-file scopes.
//!
//! Text nodes (`|...|`) are decomposed into literal `Chunk` tokens
//! interleaved with the token runs of embedded `{expression}` segments; the
//! embedded runs are produced by re-entering the lexer on the bracketed
//! substring and splicing its tokens (minus its own begin/end markers) with
//! corrected offsets.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, FileId, Result};

/// Kinds of token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Start-of-file marker; the file id is on the token itself.
    FileBegin,
    Eof,

    Ident,
    Str,
    Num,
    Bool,
    /// Literal text segment of a `|...|` text node.
    Chunk,
    /// Raw script body delimited by `-->` ... `<--`, passed through
    /// uninterpreted.
    ModuleBody,

    // Keywords
    Tag,
    Module,
    Doctype,
    Each,
    If,
    In,
    Else,
    Import,
    Yield,
    On,
    Null,
    Export,
    File,
    Controller,
    And,
    Or,
    Var,
    Const,

    // Symbols
    Dot,
    Hash,
    Equal,
    LBracket,
    RBracket,
    Semi,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Colon,
    Dollar,
    Comma,
    Greater,
    Less,
    Question,
    Minus,

    // Comparison composites
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,

    /// Any other single character, kept so the parser can report it.
    Other(char),
}

/// Literal payload carried by a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    None,
    Str(String),
    Num(f64),
    Bool(bool),
}

/// One token of the flat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lit: Lit,
    /// Byte offset into the source of `file`.
    pub pos: usize,
    pub file: FileId,
}

impl Token {
    /// The string payload, or `""` for tokens without one.
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.lit {
            Lit::Str(s) => s,
            _ => "",
        }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "tag" => TokenKind::Tag,
        "module" => TokenKind::Module,
        "doctype" => TokenKind::Doctype,
        "each" => TokenKind::Each,
        "if" => TokenKind::If,
        "in" => TokenKind::In,
        "else" => TokenKind::Else,
        "import" => TokenKind::Import,
        "yield" => TokenKind::Yield,
        "on" => TokenKind::On,
        "null" => TokenKind::Null,
        "export" => TokenKind::Export,
        "file" => TokenKind::File,
        "controller" => TokenKind::Controller,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "var" => TokenKind::Var,
        "const" => TokenKind::Const,
        _ => return None,
    })
}

fn symbol_kind(c: char) -> TokenKind {
    match c {
        '.' => TokenKind::Dot,
        '#' => TokenKind::Hash,
        '=' => TokenKind::Equal,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        ';' => TokenKind::Semi,
        '{' => TokenKind::LBrace,
        '}' => TokenKind::RBrace,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        ':' => TokenKind::Colon,
        '$' => TokenKind::Dollar,
        ',' => TokenKind::Comma,
        '>' => TokenKind::Greater,
        '<' => TokenKind::Less,
        '?' => TokenKind::Question,
        '-' => TokenKind::Minus,
        _ => TokenKind::Other(c),
    }
}

/// Converts `source` into a token stream for `file`.
///
/// # Errors
/// Fails on unterminated strings, text nodes, and raw blocks, carrying the
/// byte offset where the construct opened.
pub fn tokenize(source: &str, file: FileId) -> Result<Vec<Token>> {
    let mut lx = Lexer {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
        file,
        tokens: Vec::new(),
    };
    lx.push(TokenKind::FileBegin, Lit::None, 0);
    lx.run()?;
    Ok(lx.tokens)
}

/// Decomposes the contents of a quoted text child (`h1 'Count: {n}'`) into
/// chunk and expression tokens, terminated by `Eof`. `base` is the offset of
/// the text within its source file, used to shift diagnostics.
pub(crate) fn tokenize_text(text: &str, base: usize, file: FileId) -> Result<Vec<Token>> {
    let mut lx = Lexer {
        src: text,
        bytes: text.as_bytes(),
        pos: 0,
        file,
        tokens: Vec::new(),
    };
    lx.chunks(text, base)?;
    lx.push(TokenKind::Eof, Lit::None, base + text.len());
    Ok(lx.tokens)
}

struct Lexer<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    file: FileId,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn push(&mut self, kind: TokenKind, lit: Lit, pos: usize) {
        self.tokens.push(Token {
            kind,
            lit,
            pos,
            file: self.file,
        });
    }

    fn err(&self, kind: ErrorKind, message: &str, pos: usize) -> Error {
        Error::new(kind, message, pos, self.file)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn run(&mut self) -> Result<()> {
        let n = self.bytes.len();
        while self.pos < n {
            let c = self.bytes[self.pos];
            match c {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.pos < n && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'0'..=b'9' => self.number(),
                b'a'..=b'z' | b'A'..=b'Z' => self.ident(),
                b'|' => self.text_node()?,
                b'<' if self.peek(1) == Some(b'=') => {
                    self.push(TokenKind::LessEq, Lit::None, self.pos);
                    self.pos += 2;
                }
                b'>' if self.peek(1) == Some(b'=') => {
                    self.push(TokenKind::GreaterEq, Lit::None, self.pos);
                    self.pos += 2;
                }
                b'=' if self.peek(1) == Some(b'=') => {
                    self.push(TokenKind::EqEq, Lit::None, self.pos);
                    self.pos += 2;
                }
                b'!' if self.peek(1) == Some(b'=') => {
                    self.push(TokenKind::NotEq, Lit::None, self.pos);
                    self.pos += 2;
                }
                b'"' if self.peek(1) == Some(b'"') && self.peek(2) == Some(b'"') => self.long_string()?,
                b'"' | b'\'' => self.string(c)?,
                b'-' if self.src[self.pos..].starts_with("-->") => self.raw_block()?,
                _ => {
                    let start = self.pos;
                    // Decode one char so non-ASCII input is reported intact.
                    if let Some(ch) = self.src[start..].chars().next() {
                        self.push(symbol_kind(ch), Lit::None, start);
                        self.pos += ch.len_utf8();
                    } else {
                        self.pos += 1;
                    }
                }
            }
        }
        self.push(TokenKind::Eof, Lit::None, self.pos);
        Ok(())
    }

    /// Numeric literal with a single decimal point. A directly preceding
    /// lone `-` token is folded into the literal's sign.
    fn number(&mut self) {
        let start = self.pos;
        let mut dot = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !dot => {
                    dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let mut value: f64 = self.src[start..self.pos].parse().unwrap_or(0.0);
        if self.tokens.last().map(|t| t.kind) == Some(TokenKind::Minus) {
            self.tokens.pop();
            value = -value;
        }
        self.push(TokenKind::Num, Lit::Num(value), start);
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' => self.pos += 1,
                _ => break,
            }
        }
        let word = &self.src[start..self.pos];
        if word == "true" || word == "false" {
            self.push(TokenKind::Bool, Lit::Bool(word == "true"), start);
        } else if let Some(kind) = keyword(word) {
            self.push(kind, Lit::None, start);
        } else {
            self.push(TokenKind::Ident, Lit::Str(word.to_owned()), start);
        }
    }

    /// `|...|` text node, decomposed into chunk and expression tokens.
    fn text_node(&mut self) -> Result<()> {
        let start = self.pos;
        let mut i = self.pos + 1;
        loop {
            if i >= self.bytes.len() {
                return Err(self.err(ErrorKind::UnterminatedTextNode, "unterminated text node", start));
            }
            if self.bytes[i] == b'|' {
                break;
            }
            i += 1;
        }
        let body = &self.src[self.pos + 1..i];
        self.chunks(body, self.pos + 1)?;
        self.pos = i + 1;
        Ok(())
    }

    /// Splits a text-node body into literal chunks and `{expr}` token runs.
    ///
    /// The expression substring (braces included) is handed back to
    /// [`tokenize`]; its begin/eof markers are dropped and its token offsets
    /// shifted to point into the outer source. Braces nest, so a doubled
    /// `{{expr}}` stays one expression run. An unclosed `{` falls through as
    /// literal chunk text.
    fn chunks(&mut self, text: &str, base: usize) -> Result<()> {
        let bytes = text.as_bytes();
        let mut i = 0;
        let mut chunk_start = 0;
        let mut expr_start = 0;
        let mut in_expr = false;
        let mut depth = 0usize;
        while i < bytes.len() {
            if !in_expr && bytes[i] == b'{' {
                self.push(
                    TokenKind::Chunk,
                    Lit::Str(text[chunk_start..i].to_owned()),
                    base + chunk_start,
                );
                in_expr = true;
                expr_start = i;
                i += 1;
            } else if in_expr && bytes[i] == b'{' {
                depth += 1;
                i += 1;
            } else if in_expr && bytes[i] == b'}' {
                if depth > 0 {
                    depth -= 1;
                    i += 1;
                    continue;
                }
                let inner = tokenize(&text[expr_start..=i], self.file)?;
                for mut tok in inner {
                    if matches!(tok.kind, TokenKind::FileBegin | TokenKind::Eof) {
                        continue;
                    }
                    tok.pos += base + expr_start;
                    self.tokens.push(tok);
                }
                in_expr = false;
                i += 1;
                chunk_start = i;
            } else {
                i += 1;
            }
        }
        if in_expr {
            chunk_start = expr_start;
        }
        self.push(
            TokenKind::Chunk,
            Lit::Str(text[chunk_start..].to_owned()),
            base + chunk_start,
        );
        Ok(())
    }

    /// Single- or double-quoted string; backslash escapes the delimiter only.
    fn string(&mut self, del: u8) -> Result<()> {
        let start = self.pos;
        let mut i = self.pos + 1;
        let mut run = i;
        let mut data = String::new();
        loop {
            if i >= self.bytes.len() || self.bytes[i] == b'\n' {
                return Err(self.err(ErrorKind::UnterminatedString, "unterminated string", start));
            }
            if self.bytes[i] == del {
                data.push_str(&self.src[run..i]);
                i += 1;
                break;
            }
            if self.bytes[i] == b'\\' && self.bytes.get(i + 1) == Some(&del) {
                data.push_str(&self.src[run..i]);
                data.push(del as char);
                i += 2;
                run = i;
                continue;
            }
            i += 1;
        }
        self.pos = i;
        self.push(TokenKind::Str, Lit::Str(data), start);
        Ok(())
    }

    /// Triple-quoted raw string; no escapes, newlines allowed.
    fn long_string(&mut self) -> Result<()> {
        let start = self.pos;
        let body_start = self.pos + 3;
        let Some(off) = self.src[body_start..].find("\"\"\"") else {
            return Err(self.err(ErrorKind::UnterminatedString, "unterminated long string", start));
        };
        self.push(
            TokenKind::Str,
            Lit::Str(self.src[body_start..body_start + off].to_owned()),
            start,
        );
        self.pos = body_start + off + 3;
        Ok(())
    }

    /// `-->` ... `\n<--` raw block, emitted as one `ModuleBody` token.
    fn raw_block(&mut self) -> Result<()> {
        let start = self.pos;
        let body_start = self.pos + 3;
        let Some(off) = self.src[body_start..].find("\n<--") else {
            return Err(self.err(ErrorKind::UnterminatedRawBlock, "expected closing <--", start));
        };
        self.push(
            TokenKind::ModuleBody,
            Lit::Str(self.src[body_start..body_start + off].to_owned()),
            start,
        );
        self.pos = body_start + off + 4;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src, FileId(0)).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_idents_and_keywords() {
        assert_eq!(
            kinds("each x in items"),
            vec![
                TokenKind::FileBegin,
                TokenKind::Each,
                TokenKind::Ident,
                TokenKind::In,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bool_promotion() {
        let toks = tokenize("true false", FileId(0)).unwrap();
        assert_eq!(toks[1].lit, Lit::Bool(true));
        assert_eq!(toks[2].lit, Lit::Bool(false));
    }

    #[test]
    fn test_negative_number_folds_preceding_minus() {
        let toks = tokenize("x = -5.5", FileId(0)).unwrap();
        assert_eq!(
            toks.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::FileBegin,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Num,
                TokenKind::Eof,
            ]
        );
        assert_eq!(toks[3].lit, Lit::Num(-5.5));
    }

    #[test]
    fn test_dashed_ident_stays_one_token() {
        let toks = tokenize("data-id", FileId(0)).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[1].text(), "data-id");
    }

    #[test]
    fn test_second_decimal_point_ends_number() {
        let toks = tokenize("1.2.3", FileId(0)).unwrap();
        assert_eq!(toks[1].lit, Lit::Num(1.2));
        assert_eq!(toks[2].kind, TokenKind::Dot);
        assert_eq!(toks[3].lit, Lit::Num(3.0));
    }

    #[test]
    fn test_comparison_composites() {
        assert_eq!(
            kinds("a <= b >= c == d != e < f > g"),
            vec![
                TokenKind::FileBegin,
                TokenKind::Ident,
                TokenKind::LessEq,
                TokenKind::Ident,
                TokenKind::GreaterEq,
                TokenKind::Ident,
                TokenKind::EqEq,
                TokenKind::Ident,
                TokenKind::NotEq,
                TokenKind::Ident,
                TokenKind::Less,
                TokenKind::Ident,
                TokenKind::Greater,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_text_node_chunks_and_expressions() {
        let toks = tokenize("|hi {name}!|", FileId(0)).unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::FileBegin,
                TokenKind::Chunk,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::Chunk,
                TokenKind::Eof,
            ]
        );
        assert_eq!(toks[1].text(), "hi ");
        assert_eq!(toks[3].text(), "name");
        assert_eq!(toks[5].text(), "!");
    }

    #[test]
    fn test_text_node_leading_and_trailing_chunks_are_kept_empty() {
        let toks = tokenize("|{x}|", FileId(0)).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Chunk);
        assert_eq!(toks[1].text(), "");
        assert_eq!(toks[5].kind, TokenKind::Chunk);
        assert_eq!(toks[5].text(), "");
    }

    #[test]
    fn test_spliced_expression_offsets_point_into_outer_source() {
        let src = "|ab {name}|";
        let toks = tokenize(src, FileId(0)).unwrap();
        let ident = toks.iter().find(|t| t.kind == TokenKind::Ident).unwrap();
        assert_eq!(&src[ident.pos..ident.pos + 4], "name");
    }

    #[test]
    fn test_string_escapes_delimiter_only() {
        let toks = tokenize(r"'it\'s'", FileId(0)).unwrap();
        assert_eq!(toks[1].text(), "it's");
        let toks = tokenize(r"'a\nb'", FileId(0)).unwrap();
        assert_eq!(toks[1].text(), r"a\nb");
    }

    #[test]
    fn test_long_string_spans_lines() {
        let toks = tokenize("\"\"\"a\nb\"\"\"", FileId(0)).unwrap();
        assert_eq!(toks[1].kind, TokenKind::Str);
        assert_eq!(toks[1].text(), "a\nb");
    }

    #[test]
    fn test_raw_block() {
        let toks = tokenize("--> var x = 1;\n<--", FileId(0)).unwrap();
        assert_eq!(toks[1].kind, TokenKind::ModuleBody);
        assert_eq!(toks[1].text(), " var x = 1;");
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(
            kinds("// nothing\ndiv"),
            vec![TokenKind::FileBegin, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_constructs() {
        let err = tokenize("|abc", FileId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedTextNode);
        let err = tokenize("'abc", FileId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        let err = tokenize("'abc\ndef'", FileId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        let err = tokenize("--> body", FileId(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedRawBlock);
    }
}
