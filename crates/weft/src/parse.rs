//! Recursive-descent parser: token stream to document AST.
//!
//! One method per grammar construct. File scopes are pushed on `FileBegin`
//! and popped on `Eof`, which is how import flattening works: an imported
//! file's whole token stream (markers included) sits inline in the importing
//! stream, and its exports re-bind into the importing scope when its `Eof`
//! marker is reached.
//!
//! Custom tag definitions are parsed once into an AST fragment and recorded
//! in the scope's tag table; a use site captures the definition by reference,
//! so names inside a definition body resolve against definitions seen so far
//! (declaration before use, as with module dependencies).

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::bytecode::{Program, compile};
use crate::error::{Error, ErrorKind, FileId, Result};
use crate::expressions::{
    Attrs, BoolJoin, CmpOp, Comparison, Condition, ControllerRef, EventBinding, Expr, ExprKind, ModuleDef, Node,
    PathSeg, TagDef, Ternary, TextPart, VarExpr, VarPath,
};
use crate::lexer::{Lit, Token, TokenKind};

/// Parses a token stream into an opcode program.
///
/// # Errors
/// Fails on any syntax error, unknown tag/controller/module reference,
/// missing or ambiguous export, or recursive custom-tag use.
pub fn parse(tokens: &[Token]) -> Result<Program> {
    let doc = parse_document(tokens)?;
    compile(&doc)
}

/// Parses a token stream into the document AST consumed by the compiler.
pub(crate) fn parse_document(tokens: &[Token]) -> Result<Vec<Node>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    Parser {
        toks: tokens,
        cursor: 0,
        scopes: Vec::new(),
    }
    .document()
}

/// Compile-time context of one source file.
#[derive(Default)]
struct FileScope {
    tags: AHashMap<String, Rc<TagDef>>,
    modules: AHashMap<String, Rc<ModuleDef>>,
    exports: Vec<Export>,
}

struct Export {
    name: String,
    pos: usize,
    file: FileId,
}

struct Parser<'t> {
    toks: &'t [Token],
    cursor: usize,
    scopes: Vec<FileScope>,
}

/// Token kind rendered for diagnostics.
fn describe(kind: TokenKind) -> String {
    let name = match kind {
        TokenKind::FileBegin => "file begin",
        TokenKind::Eof => "end of file",
        TokenKind::Ident => "identifier",
        TokenKind::Str => "string",
        TokenKind::Num => "number",
        TokenKind::Bool => "bool",
        TokenKind::Chunk => "text",
        TokenKind::ModuleBody => "module body",
        TokenKind::Tag => "tag",
        TokenKind::Module => "module",
        TokenKind::Doctype => "doctype",
        TokenKind::Each => "each",
        TokenKind::If => "if",
        TokenKind::In => "in",
        TokenKind::Else => "else",
        TokenKind::Import => "import",
        TokenKind::Yield => "yield",
        TokenKind::On => "on",
        TokenKind::Null => "null",
        TokenKind::Export => "export",
        TokenKind::File => "file",
        TokenKind::Controller => "controller",
        TokenKind::And => "and",
        TokenKind::Or => "or",
        TokenKind::Var => "var",
        TokenKind::Const => "const",
        TokenKind::Dot => "'.'",
        TokenKind::Hash => "'#'",
        TokenKind::Equal => "'='",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::Semi => "';'",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::Colon => "':'",
        TokenKind::Dollar => "'$'",
        TokenKind::Comma => "','",
        TokenKind::Greater => "'>'",
        TokenKind::Less => "'<'",
        TokenKind::Question => "'?'",
        TokenKind::Minus => "'-'",
        TokenKind::EqEq => "'=='",
        TokenKind::NotEq => "'!='",
        TokenKind::LessEq => "'<='",
        TokenKind::GreaterEq => "'>='",
        TokenKind::Other(c) => return format!("'{c}'"),
    };
    name.to_owned()
}

impl Parser<'_> {
    fn tok(&self) -> &Token {
        // The stream is terminated by Eof and the cursor is clamped in next().
        &self.toks[self.cursor.min(self.toks.len() - 1)]
    }

    fn next(&mut self) {
        self.cursor = (self.cursor + 1).min(self.toks.len() - 1);
    }

    fn peek(&self, kind: TokenKind) -> bool {
        self.tok().kind == kind
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.peek(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.accept(kind) {
            Ok(())
        } else {
            let tok = self.tok();
            Err(Error::new(
                ErrorKind::ExpectedToken,
                format!("expected {}, found {}", describe(kind), describe(tok.kind)),
                tok.pos,
                tok.file,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        let text = self.tok().text().to_owned();
        self.expect(TokenKind::Ident)?;
        Ok(text)
    }

    fn unexpected<T>(&self) -> Result<T> {
        let tok = self.tok();
        Err(Error::new(
            ErrorKind::UnexpectedToken,
            format!("unexpected {}", describe(tok.kind)),
            tok.pos,
            tok.file,
        ))
    }

    fn scope(&mut self) -> &mut FileScope {
        if self.scopes.is_empty() {
            self.scopes.push(FileScope::default());
        }
        self.scopes.last_mut().expect("scope stack is non-empty")
    }

    fn find_tag(&self, name: &str) -> Option<Rc<TagDef>> {
        self.scopes.last().and_then(|s| s.tags.get(name)).cloned()
    }

    fn document(mut self) -> Result<Vec<Node>> {
        let mut doc = Vec::new();
        loop {
            match self.tok().kind {
                TokenKind::FileBegin => {
                    self.scopes.push(FileScope::default());
                    self.next();
                }
                TokenKind::Eof => {
                    let scope = self.scopes.pop().unwrap_or_default();
                    self.bind_exports(scope)?;
                    if self.scopes.is_empty() {
                        break;
                    }
                    self.next();
                }
                TokenKind::Export => {
                    self.next();
                    let tok = self.tok();
                    let export = Export {
                        name: tok.text().to_owned(),
                        pos: tok.pos,
                        file: tok.file,
                    };
                    self.expect(TokenKind::Ident)?;
                    self.scope().exports.push(export);
                }
                TokenKind::Ident
                | TokenKind::Doctype
                | TokenKind::If
                | TokenKind::Each
                | TokenKind::Chunk => {
                    let nodes = self.tag_list()?;
                    doc.extend(nodes);
                }
                TokenKind::Tag => self.custom_tag()?,
                TokenKind::Var => {
                    self.next();
                    let node = self.var_statement()?;
                    doc.push(node);
                }
                TokenKind::Module => {
                    self.next();
                    self.module_decl(&mut doc)?;
                }
                _ => return self.unexpected(),
            }
        }
        Ok(doc)
    }

    /// Re-binds a popped file's exports into the importing scope. Exports
    /// are validated even for the outermost file, which has no importer to
    /// bind them into.
    fn bind_exports(&mut self, scope: FileScope) -> Result<()> {
        for export in scope.exports {
            let tag = scope.tags.get(&export.name);
            let module = scope.modules.get(&export.name);
            match (tag, module) {
                (Some(_), Some(_)) => {
                    return Err(Error::new(
                        ErrorKind::AmbiguousExport,
                        format!("export is ambiguous: {}", export.name),
                        export.pos,
                        export.file,
                    ));
                }
                (None, None) => {
                    return Err(Error::new(
                        ErrorKind::UnknownExport,
                        format!("no such tag or module: {}", export.name),
                        export.pos,
                        export.file,
                    ));
                }
                (Some(tag), None) => {
                    if !self.scopes.is_empty() {
                        self.scope().tags.insert(export.name, tag.clone());
                    }
                }
                (None, Some(module)) => {
                    if !self.scopes.is_empty() {
                        self.scope().modules.insert(export.name, module.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// A run of sibling nodes; stops at the first token it cannot start.
    fn tag_list(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            match self.tok().kind {
                TokenKind::Doctype => {
                    self.next();
                    let kind = self.expect_ident()?;
                    nodes.push(Node::Doctype(kind));
                }
                TokenKind::If => {
                    self.next();
                    nodes.push(self.if_statement()?);
                }
                TokenKind::Each => {
                    self.next();
                    nodes.push(self.each_statement()?);
                }
                TokenKind::Ident => nodes.push(self.tag()?),
                TokenKind::Chunk => {
                    let parts = self.textnode()?;
                    if !is_blank_text(&parts) {
                        nodes.push(Node::Text(parts));
                    }
                }
                TokenKind::Yield => {
                    self.next();
                    nodes.push(Node::Yield);
                }
                _ => break,
            }
        }
        Ok(nodes)
    }

    /// Interleaved chunk/expression parts of one text node. A doubled
    /// `{{expr}}` reads the same as `{expr}`.
    fn textnode(&mut self) -> Result<Vec<TextPart>> {
        let mut parts = Vec::new();
        loop {
            parts.push(TextPart::Chunk(self.tok().text().to_owned()));
            self.expect(TokenKind::Chunk)?;
            if !self.accept(TokenKind::LBrace) {
                break;
            }
            let doubled = self.accept(TokenKind::LBrace);
            parts.push(TextPart::Expr(self.variable_or_primitive()?));
            self.expect(TokenKind::RBrace)?;
            if doubled {
                self.expect(TokenKind::RBrace)?;
            }
        }
        Ok(parts)
    }

    /// A quoted string in text-child position (`h1 'Count: {n}'`): the
    /// string's contents decompose into chunks exactly like a `|...|` body.
    fn string_textnode(&mut self) -> Result<Vec<TextPart>> {
        let tok = self.tok().clone();
        self.expect(TokenKind::Str)?;
        let sub = crate::lexer::tokenize_text(tok.text(), tok.pos, tok.file)?;
        let mut inner = Parser {
            toks: &sub,
            cursor: 0,
            scopes: Vec::new(),
        };
        inner.textnode()
    }

    /// An element or custom-tag use: `name.class#id attrs... [children]`,
    /// `name 'text'`, or `name;`.
    fn tag(&mut self) -> Result<Node> {
        let pos = self.tok().pos;
        let file = self.tok().file;
        let name = self.expect_ident()?;
        let (classes, id) = self.class_shorthand()?;
        let (mut attrs, events, controller) = self.attributes()?;
        if let Some(id) = id {
            attrs.insert("id".to_owned(), id);
        }
        if !classes.is_empty() {
            let (class_pos, class_file) = (classes[0].pos, classes[0].file);
            attrs.insert(
                "class".to_owned(),
                Expr::new(ExprKind::List(classes), class_pos, class_file),
            );
        }

        if let Some(def) = self.find_tag(&name) {
            let children = if self.accept(TokenKind::LBracket) {
                let children = self.tag_list()?;
                self.expect(TokenKind::RBracket)?;
                children
            } else {
                self.expect(TokenKind::Semi)?;
                Vec::new()
            };
            return Ok(Node::TagUse {
                def,
                attrs,
                children,
                pos,
                file,
            });
        }

        if self.accept(TokenKind::Semi) {
            return Ok(Node::Element {
                name,
                attrs,
                events,
                controller,
                self_close: true,
                children: Vec::new(),
            });
        }
        if self.accept(TokenKind::LBracket) {
            let children = self.tag_list()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(Node::Element {
                name,
                attrs,
                events,
                controller,
                self_close: false,
                children,
            });
        }
        if self.peek(TokenKind::Chunk) || self.peek(TokenKind::Str) {
            let parts = if self.peek(TokenKind::Chunk) {
                self.textnode()?
            } else {
                self.string_textnode()?
            };
            let children = if is_blank_text(&parts) {
                Vec::new()
            } else {
                vec![Node::Text(parts)]
            };
            return Ok(Node::Element {
                name,
                attrs,
                events,
                controller,
                self_close: false,
                children,
            });
        }
        self.unexpected()
    }

    /// `.class` repetitions and an optional `#id`, in any order after the
    /// element name. Classes collect into a list-valued `class` attribute.
    fn class_shorthand(&mut self) -> Result<(Vec<Expr>, Option<Expr>)> {
        let mut classes = Vec::new();
        let mut id = None;
        loop {
            if self.accept(TokenKind::Dot) {
                let tok = self.tok();
                classes.push(Expr::new(ExprKind::Str(tok.text().to_owned()), tok.pos, tok.file));
                self.expect(TokenKind::Ident)?;
            } else if self.accept(TokenKind::Hash) {
                let tok = self.tok();
                id = Some(Expr::new(ExprKind::Str(tok.text().to_owned()), tok.pos, tok.file));
                self.expect(TokenKind::Ident)?;
            } else {
                break;
            }
        }
        Ok((classes, id))
    }

    /// Attribute list, event bindings, and the optional controller binding.
    fn attributes(&mut self) -> Result<(Attrs, Vec<EventBinding>, Option<ControllerRef>)> {
        let mut attrs = Attrs::new();
        let mut events = Vec::new();
        let mut controller = None;
        loop {
            match self.tok().kind {
                TokenKind::Controller => {
                    self.next();
                    self.expect(TokenKind::Equal)?;
                    if self.accept(TokenKind::LBrace) {
                        let tok = self.tok();
                        let (pos, file) = (tok.pos, tok.file);
                        let name = self.expect_ident()?;
                        let Some(module) = self.scopes.last().and_then(|s| s.modules.get(&name)).cloned() else {
                            return Err(Error::new(
                                ErrorKind::UnknownController,
                                format!("unknown controller: {name}"),
                                pos,
                                file,
                            ));
                        };
                        self.expect(TokenKind::RBrace)?;
                        controller = Some(ControllerRef {
                            name,
                            body: module.body.clone(),
                            deps: module.deps.clone(),
                            pos,
                            file,
                        });
                    } else {
                        let tok = self.tok();
                        let (pos, file) = (tok.pos, tok.file);
                        self.expect(TokenKind::Str)?;
                        return Err(Error::new(
                            ErrorKind::ControllerImport,
                            "importing controllers is currently unsupported",
                            pos,
                            file,
                        ));
                    }
                }
                TokenKind::Ident => {
                    let key = self.tok().text().to_owned();
                    let key_pos = self.tok().pos;
                    let key_file = self.tok().file;
                    self.next();
                    let value = if self.accept(TokenKind::Equal) {
                        if self.accept(TokenKind::LBrace) {
                            let value = if self.peek(TokenKind::LBracket) {
                                self.array()?
                            } else {
                                self.ternary_chain()?
                            };
                            self.expect(TokenKind::RBrace)?;
                            value
                        } else if self.peek(TokenKind::Str) {
                            let tok = self.tok();
                            let value = Expr::new(ExprKind::Str(tok.text().to_owned()), tok.pos, tok.file);
                            self.next();
                            value
                        } else {
                            return self.unexpected();
                        }
                    } else {
                        Expr::new(ExprKind::Bool(true), key_pos, key_file)
                    };
                    attrs.insert(key, value);
                }
                TokenKind::On => {
                    self.next();
                    self.expect(TokenKind::Colon)?;
                    let event = self.expect_ident()?;
                    // `on:click(go)` names a handler; `on:click='go()'`
                    // carries a handler expression.
                    let handler = if self.accept(TokenKind::LParen) {
                        let handler = self.expect_ident()?;
                        self.expect(TokenKind::RParen)?;
                        handler
                    } else {
                        self.expect(TokenKind::Equal)?;
                        let handler = self.tok().text().to_owned();
                        self.expect(TokenKind::Str)?;
                        handler
                    };
                    events.push(EventBinding { event, handler });
                }
                _ => break,
            }
        }
        Ok((attrs, events, controller))
    }

    fn is_primitive(&self) -> bool {
        matches!(self.tok().kind, TokenKind::Str | TokenKind::Num | TokenKind::Bool)
    }

    fn primitive(&mut self) -> Result<Expr> {
        let tok = self.tok().clone();
        let kind = match (&tok.kind, &tok.lit) {
            (TokenKind::Str, Lit::Str(s)) => ExprKind::Str(s.clone()),
            (TokenKind::Num, Lit::Num(n)) => ExprKind::Num(*n),
            (TokenKind::Bool, Lit::Bool(b)) => ExprKind::Bool(*b),
            _ => return self.unexpected(),
        };
        self.next();
        Ok(Expr::new(kind, tok.pos, tok.file))
    }

    fn variable(&mut self) -> Result<VarExpr> {
        let pos = self.tok().pos;
        let file = self.tok().file;
        let mut path = VarPath::new();
        path.push(PathSeg::Key(self.expect_ident()?));
        loop {
            if self.accept(TokenKind::Dot) {
                path.push(PathSeg::Key(self.expect_ident()?));
            } else if self.accept(TokenKind::LBracket) {
                let sub = self.variable_or_primitive()?;
                path.push(match sub.kind {
                    ExprKind::Str(s) => PathSeg::Key(s),
                    ExprKind::Num(n) => PathSeg::Index(n),
                    ExprKind::Bool(b) => PathSeg::Key(b.to_string()),
                    ExprKind::Var(p) => PathSeg::Sub(Box::new(p)),
                    _ => {
                        return Err(Error::new(
                            ErrorKind::UnexpectedToken,
                            "unexpected subscript expression",
                            sub.pos,
                            sub.file,
                        ));
                    }
                });
                self.expect(TokenKind::RBracket)?;
            } else {
                break;
            }
        }
        Ok(VarExpr { path, pos, file })
    }

    fn variable_or_primitive(&mut self) -> Result<Expr> {
        if self.is_primitive() {
            self.primitive()
        } else if self.peek(TokenKind::Ident) {
            let var = self.variable()?;
            Ok(Expr::new(ExprKind::Var(var.path), var.pos, var.file))
        } else {
            self.unexpected()
        }
    }

    /// Consumes a comparison operator token if one is next.
    fn cmp_op(&mut self) -> Option<CmpOp> {
        let op = match self.tok().kind {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Ne,
            TokenKind::LessEq => CmpOp::Le,
            TokenKind::GreaterEq => CmpOp::Ge,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::Greater => CmpOp::Gt,
            _ => return None,
        };
        self.next();
        Some(op)
    }

    /// A variable, a primitive, or a `lhs cmp rhs ? pass : fail` ternary.
    fn ternary_chain(&mut self) -> Result<Expr> {
        let first = self.variable_or_primitive()?;
        let Some(cmp) = self.cmp_op() else {
            return Ok(first);
        };
        let rhs = self.variable_or_primitive()?;
        self.expect(TokenKind::Question)?;
        let pass = self.variable_or_primitive()?;
        self.expect(TokenKind::Colon)?;
        let fail = self.variable_or_primitive()?;
        let (pos, file) = (first.pos, first.file);
        Ok(Expr::new(
            ExprKind::Ternary(Box::new(Ternary {
                cmp,
                lhs: first,
                rhs,
                pass,
                fail,
            })),
            pos,
            file,
        ))
    }

    fn object(&mut self) -> Result<Expr> {
        let pos = self.tok().pos;
        let file = self.tok().file;
        self.expect(TokenKind::LBrace)?;
        let mut entries = IndexMap::new();
        loop {
            let key = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let value = if self.peek(TokenKind::LBracket) {
                self.array()?
            } else if self.peek(TokenKind::LBrace) {
                self.object()?
            } else {
                self.variable_or_primitive()?
            };
            entries.insert(key, value);
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Object(entries), pos, file))
    }

    fn array(&mut self) -> Result<Expr> {
        let pos = self.tok().pos;
        let file = self.tok().file;
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        loop {
            let item = if self.peek(TokenKind::LBracket) {
                self.array()?
            } else if self.peek(TokenKind::LBrace) {
                self.object()?
            } else {
                self.variable_or_primitive()?
            };
            items.push(item);
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::new(ExprKind::List(items), pos, file))
    }

    fn comparison(&mut self) -> Result<Comparison> {
        let lhs = self.variable_or_primitive()?;
        let Some(cmp) = self.cmp_op() else {
            let tok = self.tok();
            return Err(Error::new(
                ErrorKind::ExpectedComparison,
                "expected comparison operator",
                tok.pos,
                tok.file,
            ));
        };
        let rhs = self.variable_or_primitive()?;
        Ok(Comparison { lhs, cmp, rhs })
    }

    /// One or more comparisons chained by `and`/`or`; the whole chain is
    /// kept and evaluated left to right with short-circuiting.
    fn conditional(&mut self) -> Result<Condition> {
        let first = self.comparison()?;
        let mut rest = Vec::new();
        loop {
            if self.accept(TokenKind::And) {
                rest.push((BoolJoin::And, self.comparison()?));
            } else if self.accept(TokenKind::Or) {
                rest.push((BoolJoin::Or, self.comparison()?));
            } else {
                break;
            }
        }
        Ok(Condition { first, rest })
    }

    fn if_statement(&mut self) -> Result<Node> {
        self.expect(TokenKind::LParen)?;
        let cond = self.conditional()?;
        self.expect(TokenKind::RParen)?;
        let then = if self.accept(TokenKind::LBracket) {
            let then = self.tag_list()?;
            self.expect(TokenKind::RBracket)?;
            then
        } else {
            vec![self.tag()?]
        };
        let els = if self.accept(TokenKind::Else) {
            if self.accept(TokenKind::LBracket) {
                let els = self.tag_list()?;
                self.expect(TokenKind::RBracket)?;
                els
            } else if self.accept(TokenKind::If) {
                vec![self.if_statement()?]
            } else {
                vec![self.tag()?]
            }
        } else {
            Vec::new()
        };
        Ok(Node::If { cond, then, els })
    }

    fn each_statement(&mut self) -> Result<Node> {
        self.expect(TokenKind::LParen)?;
        let first = self.expect_ident()?;
        let second = if self.accept(TokenKind::Comma) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::In)?;
        let list = if self.peek(TokenKind::LBracket) {
            self.array()?
        } else {
            let var = self.variable()?;
            Expr::new(ExprKind::Var(var.path), var.pos, var.file)
        };
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBracket)?;
        let body = self.tag_list()?;
        self.expect(TokenKind::RBracket)?;
        Ok(Node::Each {
            iters: (first, second),
            list,
            body,
        })
    }

    /// `tag Name [ body ]` — records the parsed body, emits nothing.
    fn custom_tag(&mut self) -> Result<()> {
        self.expect(TokenKind::Tag)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LBracket)?;
        let body = self.tag_list()?;
        self.expect(TokenKind::RBracket)?;
        self.scope()
            .tags
            .insert(name.clone(), Rc::new(TagDef { name, body }));
        Ok(())
    }

    /// `var path = expr` (a `file "path"` value was already inlined as a
    /// string token by import resolution).
    fn var_statement(&mut self) -> Result<Node> {
        let dst = self.variable()?;
        self.expect(TokenKind::Equal)?;
        let val = if self.peek(TokenKind::LBracket) {
            self.array()?
        } else if self.peek(TokenKind::LBrace) {
            self.object()?
        } else {
            self.variable_or_primitive()?
        };
        Ok(Node::Set { dst, val })
    }

    /// `module Name [deps] --> body <--` — records the module and surfaces
    /// each dependency as a `declare_module` op in declaration order.
    fn module_decl(&mut self, doc: &mut Vec<Node>) -> Result<()> {
        let tok = self.tok();
        let (pos, file) = (tok.pos, tok.file);
        let name = self.expect_ident()?;
        let mut deps = Vec::new();
        if self.accept(TokenKind::LBracket) && !self.accept(TokenKind::RBracket) {
            loop {
                deps.push(self.expect_ident()?);
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBracket)?;
        }
        let body = self.tok().text().to_owned();
        self.expect(TokenKind::ModuleBody)?;
        for dep in &deps {
            let Some(module) = self.scopes.last().and_then(|s| s.modules.get(dep)).cloned() else {
                return Err(Error::new(
                    ErrorKind::UnknownModule,
                    format!("unknown module {dep}"),
                    pos,
                    file,
                ));
            };
            doc.push(Node::DeclareModule(module));
        }
        self.scope().modules.insert(name.clone(), Rc::new(ModuleDef { name, body, deps }));
        Ok(())
    }
}

fn is_blank_text(parts: &[TextPart]) -> bool {
    matches!(parts, [TextPart::Chunk(c)] if c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn doc(src: &str) -> Vec<Node> {
        parse_document(&tokenize(src, FileId(0)).unwrap()).unwrap()
    }

    #[test]
    fn test_element_with_classes_and_id() {
        let nodes = doc("div.a.b#main 'hi'");
        let Node::Element { name, attrs, .. } = &nodes[0] else {
            panic!("expected element, got {nodes:?}");
        };
        assert_eq!(name, "div");
        assert!(matches!(&attrs["id"].kind, ExprKind::Str(s) if s == "main"));
        assert!(matches!(&attrs["class"].kind, ExprKind::List(items) if items.len() == 2));
    }

    #[test]
    fn test_bare_attribute_is_boolean() {
        let nodes = doc("input disabled;");
        let Node::Element { attrs, self_close, .. } = &nodes[0] else {
            panic!("expected element");
        };
        assert!(*self_close);
        assert!(matches!(attrs["disabled"].kind, ExprKind::Bool(true)));
    }

    #[test]
    fn test_custom_tag_definition_emits_nothing() {
        let nodes = doc("tag Card [ div 'x' ]");
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_custom_tag_use_captures_children() {
        let nodes = doc("tag Card [ div [ yield ] ] Card [ p 'inner' ]");
        let Node::TagUse { def, children, .. } = &nodes[0] else {
            panic!("expected tag use, got {nodes:?}");
        };
        assert_eq!(def.name, "Card");
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_condition_chain_keeps_every_comparison() {
        let nodes = doc("if (a == 1 and b == 2 or c == 3) [ p; ]");
        let Node::If { cond, .. } = &nodes[0] else {
            panic!("expected if");
        };
        assert_eq!(cond.rest.len(), 2);
        assert_eq!(cond.rest[0].0, BoolJoin::And);
        assert_eq!(cond.rest[1].0, BoolJoin::Or);
    }

    #[test]
    fn test_condition_requires_comparison() {
        let toks = tokenize("if (a) [ p; ]", FileId(0)).unwrap();
        let err = parse_document(&toks).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedComparison);
    }

    #[test]
    fn test_unknown_controller_is_rejected() {
        let toks = tokenize("div controller={Missing} [ p; ]", FileId(0)).unwrap();
        let err = parse_document(&toks).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownController);
    }

    #[test]
    fn test_controller_import_is_rejected() {
        let toks = tokenize("module m --> x\n<-- div controller='path.weft' [ p; ]", FileId(0)).unwrap();
        let err = parse_document(&toks).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ControllerImport);
    }

    #[test]
    fn test_module_dependency_must_be_declared() {
        let toks = tokenize("module a [b] --> x\n<--", FileId(0)).unwrap();
        let err = parse_document(&toks).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownModule);
    }

    #[test]
    fn test_module_dependencies_are_surfaced_in_order() {
        let nodes = doc("module a --> A\n<-- module b [a] --> B\n<-- module c [b, a] --> C\n<--");
        let names: Vec<_> = nodes
            .iter()
            .map(|n| match n {
                Node::DeclareModule(m) => m.name.clone(),
                other => panic!("expected declare_module, got {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "a"]);
    }
}
