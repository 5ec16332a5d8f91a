//! Opcode interpreter: renders markup from a program against a data context.
//!
//! A single instruction pointer walks the flat op sequence; control-flow ops
//! add a relative offset to it. All interpreter state (output buffer,
//! open-tag stack, props stack, iterator stack) lives on the executor value
//! created per call, so a cached program can be executed any number of times
//! independently.
//!
//! Variable resolution order is an invariant: the literal head `props` binds
//! to the innermost custom-tag invocation's attributes, then iterator frames
//! are searched innermost to outermost, then the root data context. Inner
//! bindings shadow outer ones and the root, with no exception.

use std::fmt::Write;

use indexmap::IndexMap;

use super::op::{Op, Program};
use crate::error::{Error, ErrorKind, FileId, Result};
use crate::expressions::{BoolJoin, Comparison, Condition, Expr, ExprKind, PathSeg, VarExpr, VarPath, TextPart};
use crate::value::{Value, loose_cmp, write_number};

/// Executes `program` against `data`, producing markup text.
///
/// # Errors
/// Fails on unresolved variables, shape mismatches during `set`, non-iterable
/// `each` targets, and `props` used outside any custom tag.
pub fn execute(program: &Program, data: Value) -> Result<String> {
    let state = match data {
        Value::Null => Value::Map(IndexMap::new()),
        other => other,
    };
    Vm {
        ops: program.ops(),
        state,
        out: String::new(),
        open_tags: Vec::new(),
        props: Vec::new(),
        iterators: Vec::new(),
    }
    .run()
}

/// Resolved entries of one active loop.
enum IterEntries {
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

/// One active loop frame: the resolved entries plus the bound names.
struct IterFrame {
    names: (String, Option<String>),
    entries: IterEntries,
    index: usize,
}

impl IterFrame {
    fn len(&self) -> usize {
        match &self.entries {
            IterEntries::List(items) => items.len(),
            IterEntries::Map(entries) => entries.len(),
        }
    }

    /// The value bound to `name` at the current position, if this frame
    /// declares it: first name is the element/key, second the index/value.
    fn lookup(&self, name: &str) -> Option<Value> {
        if name == self.names.0 {
            return Some(match &self.entries {
                IterEntries::List(items) => items[self.index].clone(),
                IterEntries::Map(entries) => Value::Str(entries[self.index].0.clone()),
            });
        }
        if self.names.1.as_deref() == Some(name) {
            return Some(match &self.entries {
                IterEntries::List(_) => Value::Number(self.index as f64),
                IterEntries::Map(entries) => entries[self.index].1.clone(),
            });
        }
        None
    }
}

/// A path segment with subscripts resolved to concrete keys.
enum SegKey {
    Num(f64),
    Str(String),
}

impl SegKey {
    fn display(&self) -> String {
        match self {
            Self::Num(n) => {
                let mut buf = String::new();
                write_number(&mut buf, *n);
                buf
            }
            Self::Str(s) => s.clone(),
        }
    }
}

struct Vm<'p> {
    ops: &'p [Op],
    state: Value,
    out: String,
    open_tags: Vec<&'p str>,
    props: Vec<IndexMap<String, Value>>,
    iterators: Vec<IterFrame>,
}

/// Applies a relative jump; offsets come from the builder and stay in range.
fn offset(ptr: usize, delta: isize) -> usize {
    ptr.saturating_add_signed(delta)
}

impl<'p> Vm<'p> {
    fn run(mut self) -> Result<String> {
        let ops = self.ops;
        let mut ptr = 0usize;
        while ptr < ops.len() {
            let op = &ops[ptr];
            ptr += 1;
            match op {
                Op::Doctype(kind) => {
                    self.out.push_str("<!DOCTYPE ");
                    self.out.push_str(kind);
                    self.out.push('>');
                }
                Op::BeginTag(tag) => {
                    if let Some(runtime) = &tag.runtime {
                        self.out.push_str("<script>");
                        self.out.push_str(&runtime.prelude);
                        let mut json = String::new();
                        self.state.write_json(&mut json);
                        self.out.push_str(&json);
                        self.out.push_str(&runtime.postlude);
                        self.out.push_str("</script>");
                    }
                    self.out.push('<');
                    self.out.push_str(&tag.name);
                    for (key, expr) in &tag.attrs {
                        let value = self.get(expr)?;
                        self.out.push(' ');
                        self.out.push_str(key);
                        self.out.push_str("=\"");
                        match &value {
                            // Sequence-valued attributes join with a single space.
                            Value::List(items) => {
                                for (i, item) in items.iter().enumerate() {
                                    if i > 0 {
                                        self.out.push(' ');
                                    }
                                    let _ = write!(self.out, "{item}");
                                }
                            }
                            other => {
                                let _ = write!(self.out, "{other}");
                            }
                        }
                        self.out.push('"');
                    }
                    self.out.push('>');
                    if !tag.self_close {
                        self.open_tags.push(&tag.name);
                    }
                }
                Op::EndTag => {
                    if let Some(name) = self.open_tags.pop() {
                        self.out.push_str("</");
                        self.out.push_str(name);
                        self.out.push('>');
                    }
                }
                Op::Textnode(parts) => {
                    for part in parts {
                        match part {
                            TextPart::Chunk(chunk) => self.out.push_str(chunk),
                            TextPart::Expr(expr) => {
                                let value = self.get(expr)?;
                                let _ = write!(self.out, "{value}");
                            }
                        }
                    }
                }
                Op::Set { dst, val } => self.set(dst, val)?,
                Op::PushProps(attrs) => {
                    let mut frame = IndexMap::new();
                    for (key, expr) in attrs {
                        let value = self.get(expr)?;
                        frame.insert(key.clone(), value);
                    }
                    self.props.push(frame);
                }
                Op::PopProps => {
                    self.props.pop();
                }
                Op::If { cond, jmp } => {
                    if !self.eval_condition(cond)? {
                        ptr = offset(ptr, *jmp);
                    }
                }
                Op::Jump(jmp) => ptr = offset(ptr, *jmp),
                Op::Else | Op::EndIf | Op::DeclareModule(_) => {}
                Op::Each { iters, list, jmp } => {
                    let entries = match self.get(list)? {
                        Value::List(items) => IterEntries::List(items),
                        Value::Map(map) => IterEntries::Map(map.into_iter().collect()),
                        other => {
                            return Err(Error::new(
                                ErrorKind::NotIterable,
                                format!("each can only iterate lists and maps, found {}", other.kind_name()),
                                list.pos,
                                list.file,
                            ));
                        }
                    };
                    let frame = IterFrame {
                        names: iters.clone(),
                        entries,
                        index: 0,
                    };
                    if frame.len() == 0 {
                        ptr = offset(ptr, *jmp);
                    } else {
                        self.iterators.push(frame);
                    }
                }
                Op::Iterate(back) => {
                    if let Some(frame) = self.iterators.last_mut() {
                        if frame.index + 1 < frame.len() {
                            frame.index += 1;
                            ptr = offset(ptr, *back);
                        } else {
                            self.iterators.pop();
                        }
                    }
                }
            }
        }
        Ok(self.out)
    }

    /// Resolves an expression to a value.
    fn get(&self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Num(n) => Ok(Value::Number(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Var(path) => self.resolve_path(path, expr.pos, expr.file),
            ExprKind::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(self.get(item)?);
                }
                Ok(Value::List(resolved))
            }
            ExprKind::Object(entries) => {
                let mut resolved = IndexMap::new();
                for (key, value) in entries {
                    resolved.insert(key.clone(), self.get(value)?);
                }
                Ok(Value::Map(resolved))
            }
            ExprKind::Ternary(ternary) => {
                let lhs = self.get(&ternary.lhs)?;
                let rhs = self.get(&ternary.rhs)?;
                if loose_cmp(ternary.cmp, &lhs, &rhs) {
                    self.get(&ternary.pass)
                } else {
                    self.get(&ternary.fail)
                }
            }
        }
    }

    /// Resolves a subscript segment to a concrete key.
    fn seg_key(&self, seg: &PathSeg, pos: usize, file: FileId) -> Result<SegKey> {
        match seg {
            PathSeg::Key(key) => Ok(SegKey::Str(key.clone())),
            PathSeg::Index(n) => Ok(SegKey::Num(*n)),
            PathSeg::Sub(path) => match self.resolve_path(path, pos, file)? {
                Value::Number(n) => Ok(SegKey::Num(n)),
                Value::Str(s) => Ok(SegKey::Str(s)),
                Value::Bool(b) => Ok(SegKey::Str(b.to_string())),
                other => Err(Error::new(
                    ErrorKind::NotAProperty,
                    format!("cannot index with a {}", other.kind_name()),
                    pos,
                    file,
                )),
            },
        }
    }

    /// Walks a variable path: `props` head, then iterator frames innermost
    /// to outermost, then the root data context.
    fn resolve_path(&self, path: &VarPath, pos: usize, file: FileId) -> Result<Value> {
        let mut start = 0;
        let mut owned: Option<Value> = None;
        if let Some(PathSeg::Key(head)) = path.first() {
            if head == "props" {
                let Some(frame) = self.props.last() else {
                    return Err(Error::new(
                        ErrorKind::PropsOutsideTag,
                        "props can only be used inside a custom tag",
                        pos,
                        file,
                    ));
                };
                owned = Some(Value::Map(frame.clone()));
                start = 1;
            } else if let Some(bound) = self.iterators.iter().rev().find_map(|f| f.lookup(head)) {
                owned = Some(bound);
                start = 1;
            }
        }

        let mut current: &Value = owned.as_ref().unwrap_or(&self.state);
        let mut prev: Option<String> = None;
        for (i, seg) in path.iter().enumerate().skip(start) {
            let key = self.seg_key(seg, pos, file)?;
            let next = match (current, &key) {
                (Value::Map(map), SegKey::Str(s)) => map.get(s),
                (Value::Map(map), SegKey::Num(_)) => map.get(key.display().as_str()),
                (Value::List(items), SegKey::Num(n)) => {
                    if n.fract() == 0.0 && *n >= 0.0 {
                        items.get(*n as usize)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            match next {
                Some(value) if !matches!(value, Value::Null) => current = value,
                _ => {
                    let shown = key.display();
                    return Err(if i == 0 {
                        Error::new(
                            ErrorKind::UndefinedVariable,
                            format!("{shown} is not defined"),
                            pos,
                            file,
                        )
                    } else {
                        Error::new(
                            ErrorKind::NotAProperty,
                            format!(
                                "{shown} is not a property of {}",
                                prev.as_deref().unwrap_or("the context")
                            ),
                            pos,
                            file,
                        )
                    });
                }
            }
            prev = Some(key.display());
        }
        Ok(current.clone())
    }

    /// Writes a resolved value into the data context at a dotted/indexed
    /// path, creating intermediate containers. An intermediate segment that
    /// is already bound conflicts; the container kind is chosen by the next
    /// segment (numeric subscript creates a list).
    fn set(&mut self, dst: &VarExpr, val: &Expr) -> Result<()> {
        let value = self.get(val)?;
        let (pos, file) = (dst.pos, dst.file);
        let mut keys = Vec::with_capacity(dst.path.len());
        for seg in &dst.path {
            keys.push(self.seg_key(seg, pos, file)?);
        }

        let last = keys.len() - 1;
        let mut prev: Option<String> = None;
        let mut current = &mut self.state;
        for (i, key) in keys[..last].iter().enumerate() {
            let container = if matches!(keys[i + 1], SegKey::Num(_)) {
                Value::List(Vec::new())
            } else {
                Value::Map(IndexMap::new())
            };
            let shown = key.display();
            current = match current {
                Value::Map(map) => {
                    if map.get(&shown).is_some_and(|v| !matches!(v, Value::Null)) {
                        return Err(Error::new(
                            ErrorKind::PathConflict,
                            format!("{shown} is already declared"),
                            pos,
                            file,
                        ));
                    }
                    let slot = map.entry(shown.clone()).or_insert(Value::Null);
                    *slot = container;
                    slot
                }
                Value::List(items) => {
                    let index = list_index(key, prev.as_deref(), pos, file)?;
                    if index < items.len() {
                        if !matches!(items[index], Value::Null) {
                            return Err(Error::new(
                                ErrorKind::PathConflict,
                                format!("{shown} is already declared"),
                                pos,
                                file,
                            ));
                        }
                        items[index] = container;
                        &mut items[index]
                    } else if index == items.len() {
                        items.push(container);
                        // The element was just pushed at `index`.
                        &mut items[index]
                    } else {
                        return Err(Error::new(
                            ErrorKind::IndexRange,
                            format!("index {index} is out of range"),
                            pos,
                            file,
                        ));
                    }
                }
                _ => {
                    return Err(Error::new(
                        ErrorKind::PathConflict,
                        format!("{} is already declared", prev.as_deref().unwrap_or(&shown)),
                        pos,
                        file,
                    ));
                }
            };
            prev = Some(shown);
        }

        let key = &keys[last];
        match current {
            Value::Map(map) => {
                map.insert(key.display(), value);
                Ok(())
            }
            Value::List(items) => {
                let index = list_index(key, prev.as_deref(), pos, file)?;
                if index < items.len() {
                    items[index] = value;
                    Ok(())
                } else if index == items.len() {
                    items.push(value);
                    Ok(())
                } else {
                    Err(Error::new(
                        ErrorKind::IndexRange,
                        format!("index {index} is out of range"),
                        pos,
                        file,
                    ))
                }
            }
            _ => Err(Error::new(
                ErrorKind::PathConflict,
                format!(
                    "{} is already declared",
                    prev.as_deref().unwrap_or(&key.display())
                ),
                pos,
                file,
            )),
        }
    }

    /// Left-to-right short-circuit evaluation of an `and`/`or` chain.
    /// Skipped terms are not resolved at all.
    fn eval_condition(&self, cond: &Condition) -> Result<bool> {
        let mut acc = self.eval_comparison(&cond.first)?;
        for (join, cmp) in &cond.rest {
            match join {
                BoolJoin::And => {
                    if acc {
                        acc = self.eval_comparison(cmp)?;
                    }
                }
                BoolJoin::Or => {
                    if !acc {
                        acc = self.eval_comparison(cmp)?;
                    }
                }
            }
        }
        Ok(acc)
    }

    fn eval_comparison(&self, cmp: &Comparison) -> Result<bool> {
        let lhs = self.get(&cmp.lhs)?;
        let rhs = self.get(&cmp.rhs)?;
        Ok(loose_cmp(cmp.cmp, &lhs, &rhs))
    }
}

/// Converts a segment into a list index; string keys on lists are a shape
/// mismatch, fractional or negative numbers are not valid indices.
fn list_index(key: &SegKey, prev: Option<&str>, pos: usize, file: FileId) -> Result<usize> {
    match key {
        SegKey::Num(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
        SegKey::Num(_) => Err(Error::new(
            ErrorKind::ArrayKey,
            "arrays must be indexed with whole numbers",
            pos,
            file,
        )),
        SegKey::Str(_) => Err(Error::new(
            ErrorKind::ArrayKey,
            format!("{} is an array", prev.unwrap_or("value")),
            pos,
            file,
        )),
    }
}
