//! Import flattening, export re-binding, `file` inlining, and cycle
//! rejection, all through the in-memory loader.

use pretty_assertions::assert_eq;
use weft::{Engine, ErrorKind, MemLoader, Value};

fn render_with(loader: MemLoader, entry: &str) -> String {
    Engine::with_loader(loader)
        .try_render(entry, Value::Null)
        .expect("render should succeed")
}

fn render_err_with(loader: MemLoader, entry: &str) -> ErrorKind {
    Engine::with_loader(loader)
        .try_render(entry, Value::Null)
        .expect_err("expected a render error")
        .kind
}

#[test]
fn imported_exported_tag_behaves_like_inlined_definition() {
    let imported = render_with(
        MemLoader::new()
            .with("lib.weft", "tag Card [ div.card [ yield ] ]\nexport Card")
            .with("main.weft", "import 'lib.weft'\nCard [ p 'x' ]"),
        "main.weft",
    );
    let inlined = render_with(
        MemLoader::new().with("main.weft", "tag Card [ div.card [ yield ] ]\nCard [ p 'x' ]"),
        "main.weft",
    );
    assert_eq!(imported, inlined);
    assert_eq!(imported, "<div class=\"card\"><p>x</p></div>");
}

#[test]
fn unexported_definitions_stay_private_to_their_file() {
    // Without an export, `Hidden` never reaches the importing scope: the
    // name falls through to a plain element instead of expanding.
    let html = render_with(
        MemLoader::new()
            .with("lib.weft", "tag Hidden [ div 'secret' ]")
            .with("main.weft", "import 'lib.weft'\nHidden;"),
        "main.weft",
    );
    assert_eq!(html, "<Hidden>");
}

#[test]
fn exports_cross_transitive_imports() {
    let loader = MemLoader::new()
        .with("c.weft", "tag Leaf [ span 'leaf' ]\nexport Leaf")
        .with("b.weft", "import 'c.weft'\nexport Leaf")
        .with("a.weft", "import 'b.weft'\nLeaf;");
    assert_eq!(render_with(loader, "a.weft"), "<span>leaf</span>");
}

#[test]
fn exported_module_binds_as_controller_in_importer() {
    let loader = MemLoader::new()
        .with("ctrl.weft", "module counter --> $sync();\n<--\nexport counter")
        .with("main.weft", "import 'ctrl.weft'\ndiv controller={counter} [ p 'x' ]");
    let html = render_with(loader, "main.weft");
    assert!(html.starts_with("<script>"), "controller root gets the script: {html}");
    assert!(html.contains("data-adom-id=\"0\""));
}

#[test]
fn missing_export_in_imported_file_fails() {
    let err = render_err_with(
        MemLoader::new()
            .with("lib.weft", "export Nope")
            .with("main.weft", "import 'lib.weft'\ndiv;"),
        "main.weft",
    );
    assert_eq!(err, ErrorKind::UnknownExport);
}

#[test]
fn import_cycles_are_rejected() {
    let err = render_err_with(
        MemLoader::new()
            .with("a.weft", "import 'b.weft'\ndiv;")
            .with("b.weft", "import 'a.weft'\nspan;"),
        "a.weft",
    );
    assert_eq!(err, ErrorKind::ImportCycle);
}

#[test]
fn self_import_is_rejected() {
    let err = render_err_with(
        MemLoader::new().with("a.weft", "import 'a.weft'\ndiv;"),
        "a.weft",
    );
    assert_eq!(err, ErrorKind::ImportCycle);
}

#[test]
fn file_directive_inlines_contents_as_string() {
    let loader = MemLoader::new()
        .with("note.txt", "hello")
        .with("main.weft", "var msg = file 'note.txt'\np '{msg}'");
    assert_eq!(render_with(loader, "main.weft"), "<p>hello</p>");
}

#[test]
fn missing_import_surfaces_loader_error() {
    let err = render_err_with(
        MemLoader::new().with("main.weft", "import 'gone.weft'\ndiv;"),
        "main.weft",
    );
    assert_eq!(err, ErrorKind::Io);
}
