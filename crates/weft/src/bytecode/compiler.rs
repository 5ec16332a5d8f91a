//! Document AST to opcode program.
//!
//! Control-flow lowering matches the executor's expectations exactly:
//!
//! ```text
//! if ─┐ consequent  jump ─┐ else  alternative  end_if
//!     └─ false ──► else   └─ true ───────────► end_if
//!
//! each ─┐ body  iterate ─► back just after each
//!       └─ empty ───────► past the iterate
//! ```
//!
//! Custom-tag use sites are instantiated here: the captured definition body
//! is walked per use, wrapped in `push_props`/`pop_props`, with the caller's
//! child block substituted wherever the body reaches `yield`. Substituted
//! children may themselves contain `yield` (tags used inside other tag
//! definitions), so each recorded child block remembers how many outer
//! blocks were visible when it was captured. Expansion is fully unrolled in
//! the emitted program; a use of a tag that is already being instantiated
//! would unroll forever and is rejected.

use super::builder::ProgramBuilder;
use super::op::{BeginTag, Op, Program};
use crate::error::{Error, ErrorKind, Result};
use crate::expressions::Node;

/// Compiles a parsed document into the flat opcode program.
pub(crate) fn compile(doc: &[Node]) -> Result<Program> {
    let mut compiler = Compiler {
        b: ProgramBuilder::new(),
        expanding: Vec::new(),
        yields: Vec::new(),
    };
    compiler.walk_list(doc, 0)?;
    Ok(compiler.b.build())
}

struct Compiler<'n> {
    b: ProgramBuilder,
    /// Names of tags currently being instantiated, for cycle rejection.
    expanding: Vec<String>,
    /// Caller child blocks captured by enclosing tag instantiations. Each
    /// entry remembers how many earlier entries were visible when it was
    /// captured, so a `yield` inside a substituted block chains to the
    /// right caller.
    yields: Vec<(&'n [Node], usize)>,
}

impl<'n> Compiler<'n> {
    /// Walks nodes with the innermost `visible` yield blocks in scope.
    fn walk_list(&mut self, nodes: &'n [Node], visible: usize) -> Result<()> {
        for node in nodes {
            self.walk(node, visible)?;
        }
        Ok(())
    }

    fn walk(&mut self, node: &'n Node, visible: usize) -> Result<()> {
        match node {
            Node::Doctype(kind) => {
                self.b.emit(Op::Doctype(kind.clone()));
            }
            Node::Element {
                name,
                attrs,
                events,
                controller,
                self_close,
                children,
            } => {
                self.b.emit(Op::BeginTag(BeginTag {
                    name: name.clone(),
                    attrs: attrs.clone(),
                    events: events.clone(),
                    controller: controller.clone(),
                    self_close: *self_close,
                    runtime: None,
                }));
                if !self_close {
                    self.walk_list(children, visible)?;
                    self.b.emit(Op::EndTag);
                }
            }
            Node::Text(parts) => {
                self.b.emit(Op::Textnode(parts.clone()));
            }
            Node::If { cond, then, els } => {
                let on_false = self.b.emit_if(cond.clone());
                self.walk_list(then, visible)?;
                let past_else = self.b.emit_jump();
                self.b.patch_jump(on_false);
                self.b.emit(Op::Else);
                self.walk_list(els, visible)?;
                self.b.patch_jump(past_else);
                self.b.emit(Op::EndIf);
            }
            Node::Each { iters, list, body } => {
                let on_empty = self.b.emit_each(iters.clone(), list.clone());
                self.walk_list(body, visible)?;
                self.b.emit_iterate(on_empty);
                self.b.patch_jump(on_empty);
            }
            Node::TagUse {
                def,
                attrs,
                children,
                pos,
                file,
            } => {
                if self.expanding.iter().any(|n| n == &def.name) {
                    return Err(Error::new(
                        ErrorKind::RecursiveTag,
                        format!("recursive use of tag {}", def.name),
                        *pos,
                        *file,
                    ));
                }
                self.expanding.push(def.name.clone());
                self.b.emit(Op::PushProps(attrs.clone()));
                self.yields.push((children, visible));
                let body_visible = self.yields.len();
                self.walk_list(&def.body, body_visible)?;
                self.yields.pop();
                self.b.emit(Op::PopProps);
                self.expanding.pop();
            }
            Node::Yield => {
                if visible > 0 {
                    let (children, outer_visible) = self.yields[visible - 1];
                    self.walk_list(children, outer_visible)?;
                }
            }
            Node::Set { dst, val } => {
                self.b.emit(Op::Set {
                    dst: dst.clone(),
                    val: val.clone(),
                });
            }
            Node::DeclareModule(module) => {
                self.b.emit(Op::DeclareModule(module.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileId;
    use crate::lexer::tokenize;
    use crate::parse::parse_document;

    fn ops(src: &str) -> Vec<Op> {
        let doc = parse_document(&tokenize(src, FileId(0)).unwrap()).unwrap();
        compile(&doc).unwrap().ops
    }

    fn kind_names(ops: &[Op]) -> Vec<&'static str> {
        ops.iter()
            .map(|op| match op {
                Op::Doctype(_) => "doctype",
                Op::BeginTag(_) => "begin_tag",
                Op::EndTag => "end_tag",
                Op::Textnode(_) => "textnode",
                Op::Set { .. } => "set",
                Op::PushProps(_) => "push_props",
                Op::PopProps => "pop_props",
                Op::If { .. } => "if",
                Op::Jump(_) => "jump",
                Op::Else => "else",
                Op::EndIf => "end_if",
                Op::Each { .. } => "each",
                Op::Iterate(_) => "iterate",
                Op::DeclareModule(_) => "declare_module",
            })
            .collect()
    }

    #[test]
    fn test_if_else_layout() {
        let ops = ops("if (a == 1) [ p 'x' ] else [ p 'y' ]");
        assert_eq!(
            kind_names(&ops),
            vec![
                "if", "begin_tag", "textnode", "end_tag", "jump", "else", "begin_tag", "textnode", "end_tag",
                "end_if",
            ]
        );
        let Op::If { jmp, .. } = &ops[0] else { panic!() };
        assert_eq!(1 + *jmp, 5, "false condition lands on else");
        let Op::Jump(jmp) = &ops[4] else { panic!() };
        assert_eq!(5 + *jmp, 9, "consequent jump lands on end_if");
    }

    #[test]
    fn test_each_layout() {
        let ops = ops("each (x in items) [ li 'a' ]");
        assert_eq!(
            kind_names(&ops),
            vec!["each", "begin_tag", "textnode", "end_tag", "iterate"]
        );
        let Op::Iterate(off) = &ops[4] else { panic!() };
        assert_eq!(5 + *off, 1);
        let Op::Each { jmp, .. } = &ops[0] else { panic!() };
        assert_eq!(1 + *jmp, 5);
    }

    #[test]
    fn test_tag_use_expands_inline_with_props() {
        let ops = ops("tag Chip [ span 'x' ] Chip a='1'; Chip a='2';");
        assert_eq!(
            kind_names(&ops),
            vec![
                "push_props", "begin_tag", "textnode", "end_tag", "pop_props", "push_props", "begin_tag",
                "textnode", "end_tag", "pop_props",
            ]
        );
    }

    #[test]
    fn test_yield_substitutes_caller_children() {
        let ops = ops("tag Box [ div [ yield ] ] Box [ p 'inner' ]");
        assert_eq!(
            kind_names(&ops),
            vec![
                "push_props", "begin_tag", "begin_tag", "textnode", "end_tag", "end_tag", "pop_props",
            ]
        );
    }

    #[test]
    fn test_nested_yield_chains_through() {
        // Inner's yield receives Outer's caller block.
        let src = "tag Inner [ div [ yield ] ] tag Outer [ Inner [ yield ] ] Outer [ p 'deep' ]";
        let ops = ops(src);
        assert_eq!(
            kind_names(&ops),
            vec![
                "push_props", "push_props", "begin_tag", "begin_tag", "textnode", "end_tag", "end_tag",
                "pop_props", "pop_props",
            ]
        );
    }

    #[test]
    fn test_yield_without_children_emits_nothing() {
        let ops = ops("tag Box [ div [ yield ] ] Box;");
        assert_eq!(
            kind_names(&ops),
            vec!["push_props", "begin_tag", "end_tag", "pop_props"]
        );
    }

    #[test]
    fn test_reentrant_tag_expansion_is_rejected() {
        // Redefining A with a body that routes back through the old A is the
        // one way expansion can re-enter a name; it must be rejected, not
        // unrolled.
        let src = "tag A [ div; ] tag B [ A; ] tag A [ B; ] A;";
        let doc = parse_document(&tokenize(src, FileId(0)).unwrap()).unwrap();
        let err = compile(&doc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveTag);
        assert!(err.message.contains('A'));
    }
}
