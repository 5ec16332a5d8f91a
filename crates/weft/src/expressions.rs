//! Expression and document ASTs produced by the parser.
//!
//! The document tree is an intermediate form: the bytecode compiler walks it
//! once to emit the flat opcode program. Custom tag definitions capture their
//! parsed body here (instead of a token-cursor position), so each use site is
//! instantiated from data rather than by re-lexing the definition.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, IntoStaticStr};

use crate::error::FileId;

/// Comparison operators usable in conditions and ternaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum CmpOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
}

/// One step of a dotted/indexed variable path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSeg {
    /// `.name`, or a string/bool subscript.
    Key(String),
    /// A numeric subscript.
    Index(f64),
    /// A nested variable subscript, resolved at lookup time: `a[b.c]`.
    Sub(Box<VarPath>),
}

/// A variable path; short in practice.
pub type VarPath = SmallVec<[PathSeg; 4]>;

/// A variable reference with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct VarExpr {
    pub path: VarPath,
    pub pos: usize,
    pub file: FileId,
}

/// An expression evaluated against the runtime context.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: usize,
    pub file: FileId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Num(f64),
    Bool(bool),
    Var(VarPath),
    List(Vec<Expr>),
    Object(IndexMap<String, Expr>),
    /// `lhs cmp rhs ? pass : fail`, evaluating only the selected branch.
    Ternary(Box<Ternary>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ternary {
    pub cmp: CmpOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub pass: Expr,
    pub fail: Expr,
}

/// A single `lhs cmp rhs` comparison within a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub lhs: Expr,
    pub cmp: CmpOp,
    pub rhs: Expr,
}

/// `and`/`or` connective between two comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolJoin {
    And,
    Or,
}

/// A chain of comparisons joined by `and`/`or`, evaluated left to right with
/// short-circuiting: `a and b or c` groups as `(a and b) or c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub first: Comparison,
    pub rest: Vec<(BoolJoin, Comparison)>,
}

/// Literal/interpolated pieces of a text node, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum TextPart {
    Chunk(String),
    Expr(Expr),
}

/// `on:event(handler)` binding on an element.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBinding {
    pub event: String,
    pub handler: String,
}

/// Ordered attribute list; insertion order is render-visible.
pub type Attrs = IndexMap<String, Expr>;

/// A controller module bound to an element subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerRef {
    pub name: String,
    pub body: String,
    pub deps: Vec<String>,
    pub pos: usize,
    pub file: FileId,
}

/// A named client-script module with its ordered dependency names.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    pub name: String,
    pub body: String,
    pub deps: Vec<String>,
}

/// A custom tag definition: the parsed body fragment, instantiated per use.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDef {
    pub name: String,
    pub body: Vec<Node>,
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Doctype(String),
    Element {
        name: String,
        attrs: Attrs,
        events: Vec<EventBinding>,
        controller: Option<ControllerRef>,
        self_close: bool,
        children: Vec<Node>,
    },
    Text(Vec<TextPart>),
    If {
        cond: Condition,
        then: Vec<Node>,
        els: Vec<Node>,
    },
    Each {
        iters: (String, Option<String>),
        list: Expr,
        body: Vec<Node>,
    },
    /// A custom tag use site; `def` is the captured definition and
    /// `children` the caller's child block, substituted at `yield`.
    TagUse {
        def: Rc<TagDef>,
        attrs: Attrs,
        children: Vec<Node>,
        pos: usize,
        file: FileId,
    },
    Yield,
    /// Top-level `var path = expr`.
    Set { dst: VarExpr, val: Expr },
    /// Surfaced dependency of a declared module, in declaration order.
    DeclareModule(Rc<ModuleDef>),
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, pos: usize, file: FileId) -> Self {
        Self { kind, pos, file }
    }

    /// True when evaluating this expression can read the data context.
    ///
    /// Drives the hydration pass's static/dynamic split: literal-only
    /// attributes and text need no client update statement.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match &self.kind {
            ExprKind::Str(_) | ExprKind::Num(_) | ExprKind::Bool(_) => false,
            ExprKind::Var(_) => true,
            ExprKind::List(items) => items.iter().any(Expr::is_dynamic),
            ExprKind::Object(entries) => entries.values().any(Expr::is_dynamic),
            ExprKind::Ternary(t) => {
                t.lhs.is_dynamic() || t.rhs.is_dynamic() || t.pass.is_dynamic() || t.fail.is_dynamic()
            }
        }
    }
}
