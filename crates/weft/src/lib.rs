#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked at call sites")]
#![expect(clippy::cast_sign_loss, reason = "float-to-index casts are guarded for sign")]
#![expect(clippy::cast_possible_wrap, reason = "op-index offsets stay far below isize::MAX")]

mod bytecode;
mod error;
mod expressions;
mod io;
mod lexer;
mod parse;
mod run;
mod runtime;
mod value;

pub use crate::{
    bytecode::{BeginTag, Op, Program, RuntimeScript, execute},
    error::{Error, ErrorKind, FileId, Result, excerpt},
    expressions::{
        Attrs, BoolJoin, CmpOp, Comparison, Condition, ControllerRef, EventBinding, Expr, ExprKind, ModuleDef,
        Node, PathSeg, TagDef, Ternary, TextPart, VarExpr, VarPath,
    },
    io::{FsLoader, Loader, MemLoader},
    lexer::{Lit, Token, TokenKind, tokenize},
    parse::parse,
    run::Engine,
    runtime::attach_runtime,
    value::Value,
};
