//! Builder for emitting the opcode program during compilation.
//!
//! `ProgramBuilder` handles the two-phase emit: control-flow ops are emitted
//! with a placeholder offset and patched once the guarded region's length is
//! known.
//!
//! # Usage
//!
//! ```ignore
//! let mut builder = ProgramBuilder::new();
//! let label = builder.emit_if(cond);
//! // ... emit the consequent ...
//! builder.patch_jump(label); // the if now jumps to the next emitted op
//! let program = builder.build();
//! ```

use super::op::{Op, Program};

/// Label for a forward jump that needs patching.
///
/// Stores the op index where the jump-carrying instruction was emitted.
/// Pass this to `patch_jump()` once the target location is known.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JumpLabel(usize);

#[derive(Debug, Default)]
pub(crate) struct ProgramBuilder {
    ops: Vec<Op>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an instruction and returns its index.
    pub fn emit(&mut self, op: Op) -> usize {
        self.ops.push(op);
        self.ops.len() - 1
    }

    /// Emits an `if` with a placeholder offset, to be patched later.
    pub fn emit_if(&mut self, cond: crate::expressions::Condition) -> JumpLabel {
        JumpLabel(self.emit(Op::If { cond, jmp: 0 }))
    }

    /// Emits an unconditional jump with a placeholder offset.
    pub fn emit_jump(&mut self) -> JumpLabel {
        JumpLabel(self.emit(Op::Jump(0)))
    }

    /// Emits an `each` with a placeholder empty-list offset.
    pub fn emit_each(&mut self, iters: (String, Option<String>), list: crate::expressions::Expr) -> JumpLabel {
        JumpLabel(self.emit(Op::Each { iters, list, jmp: 0 }))
    }

    /// Emits the `iterate` closing a loop; its backward offset returns
    /// control to the op just after the `each` at `label`.
    pub fn emit_iterate(&mut self, label: JumpLabel) {
        let offset = label.0 as isize - self.ops.len() as isize;
        self.emit(Op::Iterate(offset));
    }

    /// Patches the op at `label` so its jump lands on the next op to be
    /// emitted. The offset is relative to the position after the jumping op,
    /// matching the executor's post-increment instruction pointer.
    pub fn patch_jump(&mut self, label: JumpLabel) {
        let distance = (self.ops.len() - label.0 - 1) as isize;
        match &mut self.ops[label.0] {
            Op::If { jmp, .. } | Op::Each { jmp, .. } => *jmp = distance,
            Op::Jump(jmp) => *jmp = distance,
            other => debug_assert!(false, "patch target is not a jump op: {other:?}"),
        }
    }

    pub fn build(self) -> Program {
        Program { ops: self.ops }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileId;
    use crate::expressions::{CmpOp, Comparison, Condition, Expr, ExprKind, TextPart};

    fn cond() -> Condition {
        let num = |n| Expr::new(ExprKind::Num(n), 0, FileId(0));
        Condition {
            first: Comparison {
                lhs: num(1.0),
                cmp: CmpOp::Eq,
                rhs: num(1.0),
            },
            rest: Vec::new(),
        }
    }

    fn text() -> Op {
        Op::Textnode(vec![TextPart::Chunk("x".into())])
    }

    #[test]
    fn test_if_chain_layout() {
        // if (...) [ text ] else [ text text ]
        let mut b = ProgramBuilder::new();
        let l = b.emit_if(cond());
        b.emit(text());
        let j = b.emit_jump();
        b.patch_jump(l);
        b.emit(Op::Else);
        b.emit(text());
        b.emit(text());
        b.patch_jump(j);
        b.emit(Op::EndIf);
        let program = b.build();

        // A false condition at index 0 must land on the else marker.
        let Op::If { jmp, .. } = &program.ops()[0] else {
            panic!("expected if op");
        };
        assert_eq!(1 + *jmp, 3, "false branch lands on the else marker");
        // The jump after the consequent must land on end_if.
        let Op::Jump(jmp) = &program.ops()[2] else {
            panic!("expected jump op");
        };
        assert_eq!(3 + *jmp, 6, "consequent jump lands on end_if");
    }

    #[test]
    fn test_each_loop_layout() {
        let mut b = ProgramBuilder::new();
        let list = Expr::new(ExprKind::List(Vec::new()), 0, FileId(0));
        let l = b.emit_each(("x".into(), None), list);
        b.emit(text());
        b.emit(text());
        b.emit_iterate(l);
        b.patch_jump(l);
        let program = b.build();

        // iterate at index 3 branches back to index 1 (just after each).
        let Op::Iterate(off) = &program.ops()[3] else {
            panic!("expected iterate op");
        };
        assert_eq!(4 + *off, 1, "iterate returns to the op after each");
        // An empty list at index 0 must skip past the iterate.
        let Op::Each { jmp, .. } = &program.ops()[0] else {
            panic!("expected each op");
        };
        assert_eq!(1 + *jmp, 4, "empty list lands past the loop");
    }
}
