//! Opcode and program definitions.
//!
//! The program is a flat, position-dependent instruction sequence: `if`,
//! `jump`, `each`, and `iterate` carry relative op-index offsets resolved at
//! compile time, so the sequence must never be reordered after compilation.

use std::rc::Rc;

use crate::expressions::{Attrs, Condition, ControllerRef, EventBinding, Expr, ModuleDef, TextPart, VarExpr};

/// Payload of a `begin_tag` op.
#[derive(Debug, Clone, PartialEq)]
pub struct BeginTag {
    pub name: String,
    pub attrs: Attrs,
    pub events: Vec<EventBinding>,
    pub controller: Option<ControllerRef>,
    pub self_close: bool,
    /// Hydration script attached by the runtime codegen pass; rendered as a
    /// `<script>` block immediately before this tag.
    pub runtime: Option<RuntimeScript>,
}

/// Generated client script, split around the serialized input context.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeScript {
    pub prelude: String,
    pub postlude: String,
}

/// A single instruction of the opcode program.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Doctype(String),
    BeginTag(BeginTag),
    EndTag,
    Textnode(Vec<TextPart>),
    /// Writes a resolved value into the input context at a dotted/indexed path.
    Set { dst: VarExpr, val: Expr },
    /// Pushes the resolved attribute bindings of a custom-tag invocation.
    PushProps(Attrs),
    PopProps,
    /// Jumps `jmp` ops forward when the condition is false.
    If { cond: Condition, jmp: isize },
    /// Unconditional relative jump.
    Jump(isize),
    /// Structural marker between an `if` consequent and its alternative.
    Else,
    /// Structural marker closing an `if` chain.
    EndIf,
    /// Resolves the list once; jumps `jmp` ops forward when it is empty.
    Each {
        iters: (String, Option<String>),
        list: Expr,
        jmp: isize,
    },
    /// Advances the innermost loop frame and jumps back while it has items.
    Iterate(isize),
    /// Surfaces a module declaration for the hydration pass.
    DeclareModule(Rc<ModuleDef>),
}

/// The flat opcode program produced by the parser.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub(crate) ops: Vec<Op>,
}

impl Program {
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
