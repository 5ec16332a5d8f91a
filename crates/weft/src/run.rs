//! Public interface for compiling and rendering documents.
//!
//! `Engine` owns the file-access collaborator, the source table used for
//! diagnostics, and the optional opcode cache. It is the single recovery
//! boundary of the pipeline: `render` catches every core error, prints a
//! formatted report with a source excerpt, and returns an empty string —
//! rendering is best-effort per request, never fatal to the host.

use crate::bytecode::{Program, execute};
use crate::error::{Error, ErrorKind, FileId, Result, excerpt};
use crate::io::{FsLoader, Loader};
use crate::lexer::{Lit, Token, TokenKind, tokenize};
use crate::parse::parse;
use crate::runtime::attach_runtime;
use crate::value::Value;

/// A source file registered for error excerpts.
#[derive(Debug, Clone)]
struct SourceFile {
    name: String,
    text: String,
}

/// Compiles and renders documents against input data.
///
/// # Example
/// ```no_run
/// use weft::{Engine, Value};
///
/// let mut engine = Engine::new("templates");
/// let html = engine.render("index.weft", Value::from(serde_json::json!({ "count": 3 })));
/// ```
pub struct Engine<L: Loader = FsLoader> {
    loader: L,
    cache: bool,
    cached: Option<Program>,
    files: Vec<SourceFile>,
}

impl Engine<FsLoader> {
    /// An engine reading templates from `root` on the file system.
    #[must_use]
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self::with_loader(FsLoader::new(root))
    }
}

impl<L: Loader> Engine<L> {
    #[must_use]
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            cache: false,
            cached: None,
            files: Vec::new(),
        }
    }

    /// Enables compile-once/execute-many: the first successful compile's
    /// runtime-annotated program is reused verbatim for subsequent renders.
    /// The cached program is treated as immutable; only fresh execution
    /// state is created per render.
    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Compiles `path` and renders it against `data`.
    ///
    /// # Errors
    /// Any lex/parse/codegen/execution error, or a loader failure for the
    /// entry file or one of its imports.
    pub fn try_render(&mut self, path: &str, data: Value) -> Result<String> {
        if self.cache {
            if let Some(program) = &self.cached {
                return execute(program, data);
            }
        }
        let file = self.open(path, 0, FileId(0))?;
        let text = self.file(file).text.clone();
        let tokens = tokenize(&text, file)?;
        let mut chain = vec![self.file(file).name.clone()];
        let tokens = self.resolve_imports(tokens, &mut chain)?;
        let mut program = parse(&tokens)?;
        attach_runtime(&mut program, &data)?;
        let html = execute(&program, data)?;
        if self.cache {
            self.cached = Some(program);
        }
        Ok(html)
    }

    /// Renders `path`, catching every error: a formatted report goes to
    /// stderr and an empty string is returned.
    pub fn render(&mut self, path: &str, data: Value) -> String {
        match self.try_render(path, data) {
            Ok(html) => html,
            Err(err) => {
                eprintln!("{}", self.report(&err));
                String::new()
            }
        }
    }

    /// Formats an error with its file name, message, and a rendered excerpt
    /// of the offending source line with a position caret.
    #[must_use]
    pub fn report(&self, err: &Error) -> String {
        match self.files.get(err.file.0 as usize) {
            Some(file) => format!(
                "Error: {}\n{}\n{}",
                file.name,
                err.message,
                excerpt(&file.text, err.pos)
            ),
            None => format!("Error: {}", err.message),
        }
    }

    fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// Loads `path` through the collaborator and registers it for
    /// diagnostics. `pos`/`from` locate the directive that requested it.
    fn open(&mut self, path: &str, pos: usize, from: FileId) -> Result<FileId> {
        let (name, text) = self
            .loader
            .load(path)
            .map_err(|e| Error::new(ErrorKind::Io, format!("cannot open {path}: {e}"), pos, from))?;
        if let Some(i) = self.files.iter().position(|f| f.name == name) {
            self.files[i].text = text;
            return Ok(FileId(i as u32));
        }
        self.files.push(SourceFile { name, text });
        Ok(FileId((self.files.len() - 1) as u32))
    }

    /// Flattens `import`/`file` directives by splicing the referenced
    /// file's token stream (or contents, as one string token) in place.
    /// Imported streams keep their begin/eof markers; that is what scopes
    /// the parser's per-file tag and module tables.
    fn resolve_imports(&mut self, tokens: Vec<Token>, chain: &mut Vec<String>) -> Result<Vec<Token>> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut toks = tokens.into_iter();
        while let Some(tok) = toks.next() {
            match tok.kind {
                TokenKind::Import => {
                    let path_tok = expect_path(toks.next(), &tok)?;
                    let id = self.open(path_tok.text(), path_tok.pos, path_tok.file)?;
                    let name = self.file(id).name.clone();
                    if chain.contains(&name) {
                        return Err(Error::new(
                            ErrorKind::ImportCycle,
                            format!("import cycle through {}", path_tok.text()),
                            path_tok.pos,
                            path_tok.file,
                        ));
                    }
                    let text = self.file(id).text.clone();
                    chain.push(name);
                    let inner = tokenize(&text, id)?;
                    let inner = self.resolve_imports(inner, chain)?;
                    chain.pop();
                    out.extend(inner);
                }
                TokenKind::File => {
                    let path_tok = expect_path(toks.next(), &tok)?;
                    let id = self.open(path_tok.text(), path_tok.pos, path_tok.file)?;
                    out.push(Token {
                        kind: TokenKind::Str,
                        lit: Lit::Str(self.file(id).text.clone()),
                        pos: path_tok.pos,
                        file: path_tok.file,
                    });
                }
                _ => out.push(tok),
            }
        }
        Ok(out)
    }
}

/// The token after `import`/`file` must be a string literal path.
fn expect_path(tok: Option<Token>, directive: &Token) -> Result<Token> {
    match tok {
        Some(tok) if tok.kind == TokenKind::Str => Ok(tok),
        Some(tok) => Err(Error::new(
            ErrorKind::ExpectedToken,
            "expected a string path",
            tok.pos,
            tok.file,
        )),
        None => Err(Error::new(
            ErrorKind::ExpectedToken,
            "expected a string path",
            directive.pos,
            directive.file,
        )),
    }
}
