//! Hydration codegen: lowers controller subtrees of the opcode program into
//! client-side DOM patching script.
//!
//! This is a second walk over the same program the executor renders. It is
//! active only inside a `controller`-bound subtree. Every element under an
//! active controller gets a stable integer id, recorded as a synthesized
//! `data-adom-id` attribute for later DOM lookup; an update statement is
//! emitted only when an attribute or text node genuinely depends on the data
//! context.
//!
//! Depth-0 `each`/`if` constructs become fragment builders reconciled into
//! the live DOM at a computed insertion index; the index expression sums the
//! recorded lengths of all preceding sibling fragments under the same parent
//! (`offs<tag><n>` variables) before the captured static child offset, so
//! multiple dynamic regions under one parent do not clobber each other.
//! Nested constructs build virtual nodes instead of touching the DOM.
//!
//! The generated script — client runtime library, module declarations,
//! serialized input state, one closure per controller — attaches to the
//! first controller's `begin_tag` op and must be attached at most once per
//! program instance.

use std::fmt::Write;
use std::rc::Rc;

use ahash::AHashSet;

use crate::bytecode::{BeginTag, Op, Program, RuntimeScript};
use crate::error::{Error, ErrorKind, FileId, Result};
use crate::expressions::{
    Attrs, Comparison, Condition, ControllerRef, Expr, ExprKind, ModuleDef, PathSeg, TextPart, VarPath,
};
use crate::value::{Value, write_json_string, write_number};

/// The fixed client runtime library of DOM-patch primitives.
const CLIENT_RUNTIME: &str = r#"
function $adom () {
  this.frag_lengths = [];
  this.props = [];
}

$adom.prototype.push_props = function (obj) {
  this.props.push(obj);
  return [];
};

$adom.prototype.pop_props = function () {
  this.props.pop();
  return [];
};

$adom.prototype.id = function (id, all) {
  var a = document.querySelectorAll('[data-adom-id="' + id + '"]');
  return all ? a : a[0];
};

$adom.prototype.setAttributes = function (e, attr) {
  Object.keys(attr).forEach(function (a) {
    e.setAttribute(a, attr[a]);
  });
};

$adom.prototype.addEventListener = function (id, event, handler) {
  var elements = this.id(id, true);
  for (var i = 0; i < elements.length; i++) {
    var e = elements[i];
    if (!e.dataset['on' + event]) {
      e.dataset['on' + event] = true;
      e.addEventListener(event, handler);
    }
  }
};

$adom.prototype.if = function (cond, pass, fail) {
  var elements = [];
  var children = cond ? pass : fail;
  children.forEach(function (child) {
    if (Array.isArray(child)) {
      child.forEach(function (c) {
        elements.push(c);
      });
    } else {
      elements.push(child);
    }
  });
  return elements;
};

$adom.prototype.calculateFragLength = function (ids) {
  var len = 0, self = this;
  ids.forEach(function (id) {
    len += self.id(id.toString(), true).length;
  });
  return len;
};

$adom.prototype.each = function (list, fn) {
  var elements = [];
  function addChildren (children) {
    children.forEach(function (child) {
      if (Array.isArray(child)) {
        child.forEach(function (c) {
          elements.push(c);
        });
      } else {
        elements.push(child);
      }
    });
  }
  if (Array.isArray(list)) {
    list.forEach(function (item, i) {
      addChildren(fn(item, i));
    });
  } else if (typeof list === 'object' && list !== null) {
    Object.keys(list).forEach(function (key) {
      addChildren(fn(key, list[key]));
    });
  } else {
    throw new Error(list + ' is not iterable');
  }
  return elements;
};

$adom.prototype.el = function (tag, attributes, children) {
  if (tag === 'text') {
    return { type: 'text', text: attributes };
  }
  var els = [];
  children.forEach(function (child) {
    if (Array.isArray(child)) {
      child.forEach(function (c) {
        els.push(c);
      });
    } else {
      els.push(child);
    }
  });
  return {
    type: 'node',
    name: tag,
    attributes: attributes,
    children: els
  };
};

$adom.prototype.insertAtIndex = function (child, par, index) {
  if (index >= par.childNodes.length) {
    par.appendChild(child);
  } else {
    par.insertBefore(child, par.childNodes[index]);
  }
};

$adom.prototype.setText = function (id, text, index) {
  var el = this.id(id);
  var children = el.childNodes;
  if (index >= children.length) {
    el.appendChild(document.createTextNode(text));
  } else if (children[index].nodeType === Node.TEXT_NODE) {
    children[index].nodeValue = text;
  } else {
    this.insertAtIndex(document.createTextNode(text), el, index);
  }
};

$adom.prototype.insertFrag = function (elements, par, index, lidx) {
  var frag = document.createDocumentFragment();
  var prevLen = this.frag_lengths[lidx];
  var setAttr = this.setAttributes.bind(this);

  function walk (elements, par) {
    elements.forEach(function (el) {
      var e;
      if (el.type === 'text') {
        e = document.createTextNode(el.text);
      } else {
        e = document.createElement(el.name);
        setAttr(e, el.attributes);
        if (el.children.length) {
          walk(el.children, e);
        }
      }
      par.appendChild(e);
    });
  }

  walk(elements, frag);

  for (var i = index; i < (index + prevLen); i++) {
    par.removeChild(par.childNodes[index]);
  }

  this.insertAtIndex(frag, par, index);

  return (this.frag_lengths[lidx] = elements.length);
};

var $$adom_modules = [];
"#;

/// Annotates `program` with the generated hydration script.
///
/// Must be called at most once per program instance; a host caching the
/// program caches it already annotated. A program with no controllers is
/// left untouched.
///
/// # Errors
/// Fails with `NestedController` when a controller-bound element sits inside
/// another controller's subtree.
pub fn attach_runtime(program: &mut Program, input: &Value) -> Result<()> {
    let mut generator = Codegen::new(input);
    generator.scan(&mut program.ops)?;
    let Some(location) = generator.runtime_location else {
        return Ok(());
    };
    let script = generator.build_script();
    if let Op::BeginTag(tag) = &mut program.ops[location] {
        tag.runtime = Some(script);
    }
    Ok(())
}

/// Per-element bookkeeping while inside a controller subtree.
struct TagInfo {
    id: u32,
    /// Static (depth-0) children seen so far; fragment insertion indices
    /// start after these.
    count: usize,
    /// Fragments opened directly under this element so far.
    frag_count: usize,
}

struct EventRef {
    id: u32,
    event: String,
    handler: String,
}

/// The controller currently being lowered.
struct ActiveController {
    ctrl: ControllerRef,
    updates: Vec<String>,
    init: Vec<String>,
    events: Vec<EventRef>,
}

struct Codegen {
    ids: u32,
    active: Option<ActiveController>,
    done: Vec<ActiveController>,
    modules: Vec<Rc<ModuleDef>>,
    tag_info: Vec<TagInfo>,
    /// Iterator names of enclosing `each` builders, innermost last.
    iterators: Vec<(String, Option<String>)>,
    /// Nesting depth of fragment builders; 0 means direct DOM statements.
    scope_depth: usize,
    /// Index of the innermost props frame; -1 outside any custom tag.
    prop_depth: i32,
    /// Element ids collected for the current depth-0 fragment.
    id_list: Vec<u32>,
    /// Ordinal of the current fragment under its parent element.
    frag_id: usize,
    /// Static child offset captured when the current fragment opened.
    frag_index: usize,
    /// Position of the current fragment in this controller's length table.
    frag_list_index: usize,
    /// Fragments opened so far in the active controller.
    lindex: usize,
    runtime_location: Option<usize>,
    state_keys: Vec<String>,
}

impl Codegen {
    fn new(input: &Value) -> Self {
        let state_keys = match input {
            Value::Map(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        };
        Self {
            ids: 0,
            active: None,
            done: Vec::new(),
            modules: Vec::new(),
            tag_info: Vec::new(),
            iterators: Vec::new(),
            scope_depth: 0,
            prop_depth: -1,
            id_list: Vec::new(),
            frag_id: 0,
            frag_index: 0,
            frag_list_index: 0,
            lindex: 0,
            runtime_location: None,
            state_keys,
        }
    }

    fn in_controller(&self) -> bool {
        self.active.is_some()
    }

    fn push_update(&mut self, statement: String) {
        if let Some(active) = self.active.as_mut() {
            active.updates.push(statement);
        }
    }

    fn push_init(&mut self, statement: String) {
        if let Some(active) = self.active.as_mut() {
            active.init.push(statement);
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.ids;
        self.ids += 1;
        id
    }

    fn scan(&mut self, ops: &mut [Op]) -> Result<()> {
        for index in 0..ops.len() {
            match &mut ops[index] {
                Op::Set { dst, .. } => {
                    if let Some(PathSeg::Key(key)) = dst.path.first() {
                        if !self.state_keys.iter().any(|k| k == key) {
                            self.state_keys.push(key.clone());
                        }
                    }
                }
                Op::DeclareModule(module) => self.modules.push(module.clone()),
                Op::BeginTag(tag) => self.begin_tag(index, tag)?,
                Op::EndTag => self.end_tag(),
                Op::Textnode(parts) => self.textnode(parts),
                Op::Each { iters, list, .. } => self.begin_each(iters, list),
                Op::Iterate(_) => self.end_each(),
                Op::If { cond, .. } => self.begin_if(cond),
                Op::Else => {
                    if self.in_controller() {
                        self.push_update("],[".to_owned());
                    }
                }
                Op::EndIf => self.end_if(),
                Op::PushProps(attrs) => self.begin_props(attrs),
                Op::PopProps => self.end_props(),
                Op::Doctype(_) | Op::Jump(_) => {}
            }
        }
        Ok(())
    }

    fn begin_tag(&mut self, index: usize, tag: &mut BeginTag) -> Result<()> {
        if let Some(ctrl) = &tag.controller {
            if self.in_controller() {
                return Err(Error::new(
                    ErrorKind::NestedController,
                    "nested controllers are illegal",
                    ctrl.pos,
                    ctrl.file,
                ));
            }
            self.runtime_location.get_or_insert(index);
            let id = self.next_id();
            tag.attrs.insert("data-adom-id".to_owned(), id_attr(id));
            self.tag_info.push(TagInfo {
                id,
                count: 0,
                frag_count: 0,
            });
            // Fragment ordinals restart per controller so the client's
            // length table indices stay aligned.
            self.lindex = 0;
            self.active = Some(ActiveController {
                ctrl: ctrl.clone(),
                updates: Vec::new(),
                init: Vec::new(),
                events: Vec::new(),
            });
            return Ok(());
        }

        if !self.in_controller() {
            return Ok(());
        }
        let id = self.next_id();
        tag.attrs.insert("data-adom-id".to_owned(), id_attr(id));
        if let Some(active) = self.active.as_mut() {
            for event in &tag.events {
                active.events.push(EventRef {
                    id,
                    event: event.event.clone(),
                    handler: event.handler.clone(),
                });
            }
        }
        self.tag_info.push(TagInfo {
            id,
            count: 0,
            frag_count: 0,
        });
        if self.scope_depth == 0 {
            let parent = self.tag_info.len() - 2;
            self.tag_info[parent].count += 1;
            let dynamic = self.js_attrs_filtered(&tag.attrs, true);
            if let Some(obj) = dynamic {
                self.push_update(format!("adom.setAttributes(adom.id('{id}'),{obj});"));
            }
            if tag.self_close {
                self.tag_info.pop();
            }
        } else {
            self.id_list.push(id);
            let attrs = self.js_attrs(&tag.attrs);
            let mut stmt = String::new();
            let _ = write!(stmt, "adom.el(\"{}\", {attrs}, [", tag.name);
            self.push_update(stmt);
            if tag.self_close {
                self.push_update("]),".to_owned());
                self.tag_info.pop();
            }
        }
        Ok(())
    }

    fn end_tag(&mut self) {
        if !self.in_controller() {
            return;
        }
        self.tag_info.pop();
        if self.scope_depth > 0 {
            self.push_update("]),".to_owned());
        }
        if self.tag_info.is_empty() {
            if let Some(active) = self.active.take() {
                self.done.push(active);
            }
        }
    }

    fn textnode(&mut self, parts: &[TextPart]) {
        if !self.in_controller() {
            return;
        }
        if self.scope_depth == 0 {
            let Some(parent) = self.tag_info.last_mut() else {
                return;
            };
            let slot = parent.count;
            parent.count += 1;
            let id = parent.id;
            let dynamic = parts
                .iter()
                .any(|p| matches!(p, TextPart::Expr(e) if e.is_dynamic()));
            if dynamic {
                let content = self.js_content(parts);
                self.push_update(format!("adom.setText(\"{id}\", {content}, {slot});"));
            }
        } else {
            let content = self.js_content(parts);
            self.push_update(format!("adom.el(\"text\", {content}),"));
        }
    }

    fn open_fragment(&mut self) -> (u32, usize) {
        self.id_list.clear();
        self.frag_list_index = self.lindex;
        self.lindex += 1;
        let (tag_id, frag_id, frag_index) = match self.tag_info.last_mut() {
            Some(info) => {
                let frag_id = info.frag_count;
                info.frag_count += 1;
                (info.id, frag_id, info.count)
            }
            None => (0, 0, 0),
        };
        self.frag_id = frag_id;
        self.frag_index = frag_index;
        (tag_id, frag_id)
    }

    /// `offs<tag>0 + offs<tag>1 + ... + <static offset>`: every preceding
    /// sibling fragment's recorded length, then the captured child index.
    fn fragment_index_expr(&self, tag_id: u32) -> String {
        let mut expr = String::new();
        for i in 0..self.frag_id {
            let _ = write!(expr, "offs{tag_id}{i} + ");
        }
        let _ = write!(expr, "{}", self.frag_index);
        expr
    }

    fn close_fragment(&mut self, closer: &str) {
        let Some(info) = self.tag_info.last() else {
            return;
        };
        let tag_id = info.id;
        let mut ids = String::from("[");
        for (i, element_id) in self.id_list.iter().enumerate() {
            if i > 0 {
                ids.push(',');
            }
            let _ = write!(ids, "{element_id}");
        }
        ids.push(']');
        self.push_init(format!(
            "adom.frag_lengths.push(adom.calculateFragLength({ids}));"
        ));
        self.push_update(closer.to_owned());
        let index = self.fragment_index_expr(tag_id);
        let frag_id = self.frag_id;
        let list_index = self.frag_list_index;
        self.push_update(format!(
            "var offs{tag_id}{frag_id} = adom.insertFrag(frag{tag_id}{frag_id}, adom.id('{tag_id}'),{index},{list_index});"
        ));
    }

    fn begin_each(&mut self, iters: &(String, Option<String>), list: &Expr) {
        if !self.in_controller() {
            return;
        }
        self.iterators.push(iters.clone());
        let args = match &iters.1 {
            Some(second) => format!("{}, {second}", iters.0),
            None => iters.0.clone(),
        };
        let list_js = self.js_expr(list);
        if self.scope_depth == 0 {
            let (tag_id, frag_id) = self.open_fragment();
            self.push_update(format!(
                "var frag{tag_id}{frag_id} = adom.each({list_js}, function({args}) {{ return ["
            ));
        } else {
            self.push_update(format!("adom.each({list_js}, function({args}) {{ return ["));
        }
        self.scope_depth += 1;
    }

    fn end_each(&mut self) {
        if !self.in_controller() {
            return;
        }
        self.iterators.pop();
        self.scope_depth -= 1;
        if self.scope_depth == 0 {
            self.close_fragment("] });");
        } else {
            self.push_update("] }),".to_owned());
        }
    }

    fn begin_if(&mut self, cond: &Condition) {
        if !self.in_controller() {
            return;
        }
        let cond_js = self.js_condition(cond);
        if self.scope_depth == 0 {
            let (tag_id, frag_id) = self.open_fragment();
            self.push_update(format!("var frag{tag_id}{frag_id} = adom.if({cond_js}, ["));
        } else {
            self.push_update(format!("adom.if({cond_js}, ["));
        }
        self.scope_depth += 1;
    }

    fn end_if(&mut self) {
        if !self.in_controller() {
            return;
        }
        self.scope_depth -= 1;
        if self.scope_depth == 0 {
            self.close_fragment("]);");
        } else {
            self.push_update("]),".to_owned());
        }
    }

    fn begin_props(&mut self, attrs: &Attrs) {
        if !self.in_controller() {
            return;
        }
        // Props values resolve in the caller's scope, before the new frame.
        let obj = self.js_attrs(attrs);
        if self.scope_depth == 0 {
            self.push_update(format!("adom.push_props({obj});"));
        } else {
            self.push_update(format!("adom.push_props({obj}),"));
        }
        self.prop_depth += 1;
    }

    fn end_props(&mut self) {
        if !self.in_controller() {
            return;
        }
        if self.scope_depth == 0 {
            self.push_update("adom.pop_props();".to_owned());
        } else {
            self.push_update("adom.pop_props(),".to_owned());
        }
        self.prop_depth -= 1;
    }

    fn is_iterator(&self, name: &str) -> bool {
        self.iterators
            .iter()
            .any(|(first, second)| first == name || second.as_deref() == Some(name))
    }

    /// The client-side expression for a variable path. Iterator names are
    /// builder-function parameters, `props` indexes the client props stack,
    /// and anything else is a state key captured as a closure parameter.
    fn js_var(&self, path: &VarPath) -> String {
        let mut out = String::new();
        let mut start = 0;
        if let Some(PathSeg::Key(head)) = path.first() {
            if self.is_iterator(head) {
                out.push_str(head);
            } else if head == "props" {
                let _ = write!(out, "adom.props[{}]", self.prop_depth);
            } else {
                out.push_str(head);
            }
            start = 1;
        }
        for seg in path.iter().skip(start) {
            match seg {
                PathSeg::Key(key) => {
                    out.push('[');
                    write_json_string(&mut out, key);
                    out.push(']');
                }
                PathSeg::Index(n) => {
                    out.push('[');
                    write_number(&mut out, *n);
                    out.push(']');
                }
                PathSeg::Sub(sub) => {
                    out.push('[');
                    out.push_str(&self.js_var(sub));
                    out.push(']');
                }
            }
        }
        out
    }

    fn js_expr(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Bool(b) => b.to_string(),
            ExprKind::Str(s) => {
                let mut out = String::new();
                write_json_string(&mut out, s);
                out
            }
            ExprKind::Num(n) => {
                let mut out = String::new();
                write_number(&mut out, *n);
                out
            }
            ExprKind::Var(path) => self.js_var(path),
            ExprKind::List(items) => {
                let mut out = String::from("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&self.js_expr(item));
                }
                out.push(']');
                out
            }
            ExprKind::Object(entries) => {
                let mut out = String::from("{");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_json_string(&mut out, key);
                    out.push_str(": ");
                    out.push_str(&self.js_expr(value));
                }
                out.push('}');
                out
            }
            ExprKind::Ternary(t) => {
                let cmp: &'static str = t.cmp.into();
                format!(
                    "({}){cmp}({})?({}):({})",
                    self.js_expr(&t.lhs),
                    self.js_expr(&t.rhs),
                    self.js_expr(&t.pass),
                    self.js_expr(&t.fail)
                )
            }
        }
    }

    /// `{"key": expr, ...}` for every attribute.
    fn js_attrs(&self, attrs: &Attrs) -> String {
        self.js_attrs_filtered(attrs, false).unwrap_or_else(|| "{}".to_owned())
    }

    /// As `js_attrs`; with `dynamic_only` set, keeps only the attributes
    /// whose value depends on the data context and returns `None` when
    /// nothing remains.
    fn js_attrs_filtered(&self, attrs: &Attrs, dynamic_only: bool) -> Option<String> {
        let mut out = String::from("{");
        let mut kept = 0usize;
        for (key, value) in attrs {
            if dynamic_only && !value.is_dynamic() {
                continue;
            }
            if kept > 0 {
                out.push_str(", ");
            }
            write_json_string(&mut out, key);
            out.push_str(": ");
            out.push_str(&self.js_expr(value));
            kept += 1;
        }
        if dynamic_only && kept == 0 {
            return None;
        }
        out.push('}');
        Some(out)
    }

    /// `(chunk + expr + chunk)` for a text node's parts.
    fn js_content(&self, parts: &[TextPart]) -> String {
        let mut out = String::from("(");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push_str(" + ");
            }
            match part {
                TextPart::Chunk(chunk) => write_json_string(&mut out, chunk),
                TextPart::Expr(expr) => out.push_str(&self.js_expr(expr)),
            }
        }
        out.push(')');
        out
    }

    fn js_comparison(&self, cmp: &Comparison) -> String {
        let op: &'static str = cmp.cmp.into();
        format!("({}){op}({})", self.js_expr(&cmp.lhs), self.js_expr(&cmp.rhs))
    }

    /// Left-to-right chain with explicit grouping, so the client evaluates
    /// the same way the server does.
    fn js_condition(&self, cond: &Condition) -> String {
        let mut acc = self.js_comparison(&cond.first);
        for (join, cmp) in &cond.rest {
            let op = match join {
                crate::expressions::BoolJoin::And => "&&",
                crate::expressions::BoolJoin::Or => "||",
            };
            acc = format!("({acc}) {op} ({})", self.js_comparison(cmp));
        }
        acc
    }

    /// Assembles the final script halves around the serialized input state.
    fn build_script(self) -> RuntimeScript {
        let mut module_code = String::new();
        let mut seen = AHashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.clone()) {
                continue;
            }
            let mut deps = String::new();
            for (i, dep) in module.deps.iter().enumerate() {
                if i > 0 {
                    deps.push(',');
                }
                let _ = write!(deps, "$$adom_modules.{dep}");
            }
            let _ = write!(
                module_code,
                "\n$$adom_modules.{} = (function () {{\n{}\n}})({deps});\n",
                module.name, module.body
            );
        }

        let mut controller_code = String::new();
        for controller in &self.done {
            let ctrl = &controller.ctrl;
            let mut deps = String::new();
            let mut dep_args = String::new();
            for (i, dep) in ctrl.deps.iter().enumerate() {
                if i > 0 {
                    deps.push(',');
                    dep_args.push(',');
                }
                deps.push_str(dep);
                let _ = write!(dep_args, "$$adom_modules.{dep}");
            }
            let mut listeners = String::new();
            for event in &controller.events {
                let _ = writeln!(
                    listeners,
                    "      adom.addEventListener(\"{}\", \"{}\", {});",
                    event.id,
                    event.event,
                    js_handler(&event.handler)
                );
            }
            let mut keys = String::new();
            let mut key_args = String::new();
            for (i, key) in self.state_keys.iter().enumerate() {
                if i > 0 {
                    keys.push(',');
                    key_args.push(',');
                }
                keys.push_str(key);
                let _ = write!(key_args, "$.{key}");
            }
            let _ = write!(
                controller_code,
                "\n(function {name} ({deps}) {{\n  var adom = new $adom();\n  var $ = JSON.parse(JSON.stringify($$adom_input_state));\n\n  {init}\n\n  (function ({keys}) {{\n    function $addEventListeners () {{\n{listeners}    }}\n\n    function $sync () {{\n      {updates}\n      $addEventListeners();\n    }}\n\n    $addEventListeners();\n    {body}\n  }})({key_args});\n}})({dep_args});\n",
                name = ctrl.name,
                init = controller.init.join("\n  "),
                updates = controller.updates.join("\n      "),
                body = ctrl.body,
            );
        }

        let mut prelude = String::new();
        prelude.push_str(CLIENT_RUNTIME);
        prelude.push_str(&module_code);
        prelude.push_str("\nwindow.onload = function () {\n  var $$adom_input_state = ");

        let mut postlude = String::new();
        postlude.push_str(";\n  var $$adom_events = [];\n\n  function $dispatch (event, data) {\n    for (var i = 0; i < $$adom_events.length; i++) {\n      if ($$adom_events[i].event === event) {\n        $$adom_events[i].fn(data);\n      }\n    }\n  }\n\n  function $on (event, fn) {\n    $$adom_events.push({ event: event, fn: fn });\n  }\n");
        postlude.push_str(&controller_code);
        postlude.push_str("}\n");

        RuntimeScript { prelude, postlude }
    }
}

/// The synthesized stable-id attribute; carries no semantic meaning beyond
/// client-side lookup.
fn id_attr(id: u32) -> Expr {
    Expr::new(ExprKind::Str(id.to_string()), 0, FileId::default())
}

/// A bare name binds as the handler function; anything else (the
/// `on:click='go()'` form) wraps into a listener closure.
fn js_handler(handler: &str) -> String {
    let is_name = !handler.is_empty()
        && handler
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_name {
        handler.to_owned()
    } else {
        format!("function (event) {{ {handler} }}")
    }
}
