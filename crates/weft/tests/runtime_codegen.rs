//! Generated hydration script: stable ids, the static/dynamic split,
//! fragment offset accounting, event attachment, and module wiring.

use serde_json::json;
use weft::{Engine, ErrorKind, FileId, MemLoader, Op, Value, attach_runtime, parse, tokenize};

fn render(src: &str, data: serde_json::Value) -> String {
    Engine::with_loader(MemLoader::new().with("main.weft", src))
        .try_render("main.weft", Value::from(data))
        .expect("render should succeed")
}

#[test]
fn plain_documents_get_no_script() {
    let html = render("div [ p 'x' ]", json!({}));
    assert!(!html.contains("<script>"), "no controller, no script: {html}");
    assert!(!html.contains("data-adom-id"));
}

#[test]
fn controller_script_precedes_root_tag_with_stable_ids() {
    let src = "module m --> $sync();\n<--\ndiv controller={m} [ p 'hi' ]";
    let html = render(src, json!({"n": 1}));
    assert!(html.starts_with("<script>"), "script block comes first: {html}");
    assert!(html.contains("</script><div data-adom-id=\"0\">"));
    assert!(html.contains("<p data-adom-id=\"1\">hi</p>"));
    assert!(html.contains("var $$adom_input_state = {\"n\":1};"));
    assert!(html.contains("(function m () {"), "one closure per controller: {html}");
}

#[test]
fn static_text_and_attributes_emit_no_update_statements() {
    let src = "module m --> x\n<--\ndiv controller={m} [ p class='fixed' 'hi' ]";
    let html = render(src, json!({}));
    assert!(!html.contains("adom.setText"), "literal text needs no update: {html}");
    assert!(!html.contains("adom.setAttributes"), "literal attrs need no update: {html}");
}

#[test]
fn dynamic_text_updates_by_id_and_child_index() {
    let src = "module m --> x\n<--\ndiv controller={m} [ p '{n}' ]";
    let html = render(src, json!({"n": 1}));
    assert!(
        html.contains("adom.setText(\"1\", (\"\" + n + \"\"), 0);"),
        "got: {html}"
    );
}

#[test]
fn dynamic_attributes_update_only_the_dynamic_keys() {
    let src = "module m --> x\n<--\ndiv controller={m} [ p class={c} title='fixed' 'x' ]";
    let html = render(src, json!({"c": "on"}));
    assert!(
        html.contains("adom.setAttributes(adom.id('1'),{\"class\": c});"),
        "got: {html}"
    );
    assert!(!html.contains("\"title\""), "static attr stays out of updates: {html}");
}

#[test]
fn ternary_attributes_count_as_dynamic() {
    let src = "module m --> x\n<--\ndiv controller={m} [ p class={n == 1 ? 'a' : 'b'} 'x' ]";
    let html = render(src, json!({"n": 1}));
    assert!(html.contains("adom.setAttributes(adom.id('1'),{\"class\": (n)==(1)?(\"a\"):(\"b\")});"));
}

#[test]
fn sibling_fragments_sum_preceding_offsets() {
    let src = "module m --> $sync();\n<--\ndiv controller={m} [ p 'a' each (x in xs) [ li '{x}' ] each (y in ys) [ li '{y}' ] ]";
    let html = render(src, json!({"xs": [1], "ys": [2]}));
    assert!(html.contains("var frag00 = adom.each(xs, function(x) { return ["));
    assert!(
        html.contains("var offs00 = adom.insertFrag(frag00, adom.id('0'),1,0);"),
        "first fragment inserts after the static child: {html}"
    );
    assert!(
        html.contains("var offs01 = adom.insertFrag(frag01, adom.id('0'),offs00 + 1,1);"),
        "second fragment adds the first fragment's length: {html}"
    );
    assert!(html.contains("adom.frag_lengths.push(adom.calculateFragLength([2]));"));
    assert!(html.contains("adom.frag_lengths.push(adom.calculateFragLength([3]));"));
}

#[test]
fn nested_each_builds_virtual_nodes_not_dom_calls() {
    let src =
        "module m --> x\n<--\ndiv controller={m} [ each (row in rows) [ ul [ each (c in row) [ li '{c}' ] ] ] ]";
    let html = render(src, json!({"rows": [[1, 2]]}));
    // The outer loop is a fragment; the inner loop nests inside the builder.
    assert!(html.contains("var frag00 = adom.each(rows, function(row) { return ["));
    assert!(html.contains("adom.each(row, function(c) { return ["));
    assert!(!html.contains("var frag01"), "inner loop is not a sibling fragment: {html}");
}

#[test]
fn conditional_fragments_emit_both_branches() {
    let src = "module m --> x\n<--\ndiv controller={m} [ if (n == 1) [ p 'yes' ] else [ p 'no' ] ]";
    let html = render(src, json!({"n": 1}));
    assert!(html.contains("var frag00 = adom.if((n)==(1), ["));
    assert!(html.contains("],["), "else marker splits the branch arrays: {html}");
    assert!(html.contains("var offs00 = adom.insertFrag(frag00, adom.id('0'),0,0);"));
}

#[test]
fn fragment_list_indices_restart_per_controller() {
    let src = "module m --> x\n<--\ndiv controller={m} [ each (a in xs) [ li '{a}' ] ]\ndiv controller={m} [ each (b in ys) [ li '{b}' ] ]";
    let html = render(src, json!({"xs": [], "ys": []}));
    assert!(html.contains("var offs00 = adom.insertFrag(frag00, adom.id('0'),0,0);"));
    assert!(
        html.contains("var offs20 = adom.insertFrag(frag20, adom.id('2'),0,0);"),
        "second controller restarts its fragment table index: {html}"
    );
}

#[test]
fn event_bindings_attach_by_id_with_named_handler() {
    let src = "module m --> function go() {}\n<--\ndiv controller={m} [ button on:click(go) 'hi' ]";
    let html = render(src, json!({}));
    assert!(html.contains("adom.addEventListener(\"1\", \"click\", go);"), "got: {html}");
}

#[test]
fn event_handler_expressions_wrap_in_a_closure() {
    let src = "module m --> var n = 0;\n<--\ndiv controller={m} [ button on:click='inc()' 'hi' ]";
    let html = render(src, json!({}));
    assert!(
        html.contains("adom.addEventListener(\"1\", \"click\", function (event) { inc() });"),
        "got: {html}"
    );
}

#[test]
fn props_inside_controller_use_client_props_stack() {
    let src = "tag Chip [ span '{props.label}' ]\nmodule m --> x\n<--\ndiv controller={m} [ Chip label={n}; ]";
    let html = render(src, json!({"n": 1}));
    assert!(html.contains("adom.push_props({\"label\": n});"), "got: {html}");
    assert!(html.contains("adom.props[0][\"label\"]"), "got: {html}");
    assert!(html.contains("adom.pop_props();"));
}

#[test]
fn module_dependencies_instantiate_once_and_pass_by_reference() {
    let src = "module a --> var shared = 1;\n<--\nmodule b [a] --> x\n<--\nmodule c [a] --> y\n<--\ndiv controller={c} [ p 'x' ]";
    let html = render(src, json!({}));
    let declarations = html.matches("$$adom_modules.a = (function () {").count();
    assert_eq!(declarations, 1, "dependency declared once: {html}");
    assert!(html.contains("(function c (a) {"), "controller receives its deps: {html}");
    assert!(html.contains("})($$adom_modules.a);"));
}

#[test]
fn nested_controllers_are_rejected() {
    let src = "module a --> x\n<--\nmodule b --> y\n<--\ndiv controller={a} [ section controller={b} [ p; ] ]";
    let err = Engine::with_loader(MemLoader::new().with("main.weft", src))
        .try_render("main.weft", Value::Null)
        .expect_err("expected a codegen error");
    assert_eq!(err.kind, ErrorKind::NestedController);
}

#[test]
fn attach_runtime_annotates_first_controller_begin_tag() {
    let src = "module m --> x\n<--\np 'before'\ndiv controller={m} [ p 'in' ]";
    let tokens = tokenize(src, FileId(0)).expect("lexes");
    let mut program = parse(&tokens).expect("parses");
    attach_runtime(&mut program, &Value::from(json!({}))).expect("codegen succeeds");
    let annotated: Vec<bool> = program
        .ops()
        .iter()
        .filter_map(|op| match op {
            Op::BeginTag(tag) => Some(tag.runtime.is_some()),
            _ => None,
        })
        .collect();
    // `p 'before'` is outside any controller; only the controller's root
    // carries the script.
    assert_eq!(annotated, vec![false, true, false]);
}

#[test]
fn serialized_state_reflects_set_ops_executed_before_the_controller() {
    let src = "module m --> x\n<--\nvar greeting = 'hi'\ndiv controller={m} [ p '{greeting}' ]";
    let html = render(src, json!({}));
    assert!(
        html.contains("var $$adom_input_state = {\"greeting\":\"hi\"};"),
        "state captured at render time includes set vars: {html}"
    );
    assert!(html.contains("(function (greeting) {"), "set keys become closure params: {html}");
}
