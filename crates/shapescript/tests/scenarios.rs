//! Black-box end-to-end scenarios driven entirely through the public API, exercising
//! the language core the way a host embedding this crate would: feed it source text,
//! read back the scene graph or the diagnostic.
//!
//! These duplicate a few of the scenarios already covered by the evaluator's own
//! `#[cfg(test)]` module, but from outside the crate, through `shapescript::*` only —
//! a regression here means the public surface itself broke, not just an internal detail.

use std::cell::RefCell;

use pretty_assertions::assert_eq;
use shapescript::{
    evaluate_source, DelegateError, ErrorKind, EvalOptions, EvaluationDelegate, GeometryKind,
    GeometryNode, MeshLibrary, Polygon, Type, Value,
};

#[derive(Default)]
struct RecordingDelegate {
    printed: RefCell<Vec<String>>,
}

impl MeshLibrary for RecordingDelegate {
    fn is_watertight(&self, _node: &GeometryNode) -> bool {
        true
    }
    fn polygons(&self, _node: &GeometryNode) -> Vec<Polygon> {
        Vec::new()
    }
}

impl EvaluationDelegate for RecordingDelegate {
    fn resolve_url(&self, name: &str) -> Result<String, DelegateError> {
        Ok(name.to_owned())
    }
    fn import_geometry(&self, url: &str) -> Result<Option<Value>, DelegateError> {
        Err(DelegateError::NotFound(url.to_owned()))
    }
    fn debug_log(&self, values: &[Value]) {
        for v in values {
            self.printed.borrow_mut().push(v.to_string());
        }
    }
}

fn run(source: &str) -> (shapescript::EvalOutcome, RecordingDelegate) {
    let delegate = RecordingDelegate::default();
    let outcome = evaluate_source(source, &delegate, EvalOptions::default())
        .unwrap_or_else(|e| panic!("{source:?} failed: {e:?}"));
    (outcome, delegate)
}

// === Geometry and material scenarios ===

#[test]
fn colored_sphere_is_a_single_node() {
    let (outcome, _) = run("color 1 0 0\nsphere");
    assert_eq!(outcome.scene.root.len(), 1);
    assert_eq!(outcome.scene.root[0].kind, GeometryKind::Sphere { segments: 16 });
}

#[test]
fn a_block_with_two_children_commits_as_a_group() {
    let (outcome, _) = run("group {\n  cube\n  sphere\n}");
    assert_eq!(outcome.scene.root.len(), 1);
    match &outcome.scene.root[0].kind {
        GeometryKind::Group => assert_eq!(outcome.scene.root[0].children.len(), 2),
        other => panic!("expected group, got {other:?}"),
    }
}

#[test]
fn csg_boolean_blocks_are_recognized() {
    let (outcome, _) = run("union {\n  cube\n  sphere\n}");
    assert!(outcome.scene.root[0].kind.is_csg());
}

// === Control flow and scope scenarios ===

#[test]
fn for_loop_over_a_range_prints_every_index() {
    let (_, delegate) = run("for i in 1 to 3 {\n  print i\n}");
    assert_eq!(*delegate.printed.borrow(), vec!["1", "2", "3"]);
}

#[test]
fn block_definition_option_can_be_overridden_at_the_call_site() {
    let (_, delegate) = run("define foo {\n  option bar 5\n  print bar\n}\nfoo { bar 6 }\nfoo");
    assert_eq!(*delegate.printed.borrow(), vec!["6", "5"]);
}

#[test]
fn seeding_the_rng_reproduces_the_documented_constant() {
    let (_, delegate) = run("seed 1\nprint rnd");
    assert_eq!(delegate.printed.borrow()[0], "0.23645552527159452");
}

// === Error reporting scenarios ===

#[test]
fn extruding_a_mesh_is_reported_as_a_type_mismatch() {
    let delegate = RecordingDelegate::default();
    let err = evaluate_source("extrude sphere", &delegate, EvalOptions::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { got: Type::Mesh, .. }));
}

#[test]
fn a_misspelled_builtin_is_reported_with_a_suggestion() {
    let delegate = RecordingDelegate::default();
    let err = evaluate_source("spehre", &delegate, EvalOptions::default()).unwrap_err();
    let report = err.to_report("spehre", "scene.shape");
    assert!(report.contains("sphere"), "report should suggest the correct spelling: {report}");
}

#[test]
fn an_unterminated_block_is_rejected_at_parse_time_before_any_evaluation() {
    let delegate = RecordingDelegate::default();
    let result = evaluate_source("group {\n  cube\n", &delegate, EvalOptions::default());
    assert!(result.is_err());
}
