//! ShapeScript: a declarative language for procedurally describing 3D scenes.
//!
//! This crate is the language core only — lexer, parser, value model, evaluator, and
//! standard library. It has no opinion about meshes, fonts, files, or rendering; a host
//! supplies those by implementing [`EvaluationDelegate`] (and, for geometry
//! construction, [`MeshLibrary`]) and calling [`evaluate_source`] or [`evaluate`].
//!
//! ```
//! use shapescript::{evaluate_source, EvalOptions};
//! # use shapescript::{DelegateError, EvaluationDelegate, MeshLibrary, Value};
//! # use shapescript::{GeometryNode, Polygon};
//! # #[derive(Default)]
//! # struct Host;
//! # impl MeshLibrary for Host {
//! #     fn is_watertight(&self, _node: &GeometryNode) -> bool { true }
//! #     fn polygons(&self, _node: &GeometryNode) -> Vec<Polygon> { Vec::new() }
//! # }
//! # impl EvaluationDelegate for Host {
//! #     fn resolve_url(&self, name: &str) -> Result<String, DelegateError> { Ok(name.to_owned()) }
//! #     fn import_geometry(&self, url: &str) -> Result<Option<Value>, DelegateError> {
//! #         Err(DelegateError::NotFound(url.to_owned()))
//! #     }
//! #     fn debug_log(&self, _values: &[Value]) {}
//! # }
//! let host = Host::default();
//! let outcome = evaluate_source("color 1 0 0\nsphere", &host, EvalOptions::default()).unwrap();
//! assert_eq!(outcome.scene.root.len(), 1);
//! ```

mod capability;
mod context;
mod delegate;
mod diagnostics;
mod evaluator;
mod lexer;
mod parser;
mod resource;
mod scene;
mod stdlib;
mod value;

pub use capability::{Capability, PermissionDenied, SandboxPolicy};
pub use delegate::{parse_svg_path, DelegateError, EvaluationDelegate, MeshLibrary};
pub use diagnostics::{levenshtein, suggest_name, ErrorKind, LineIndex, ShapeError, SourceRange};
pub use evaluator::{evaluate, evaluate_source, EvalOptions, EvalOutcome};
pub use parser::ast::{
    Definition, Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind, StringPart,
};
pub use parser::parse;
pub use resource::{
    CancellationToken, LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits,
    ResourceTracker, DEFAULT_MAX_RECURSION_DEPTH,
};
pub use scene::{
    CameraData, GeometryKind, GeometryNode, LightData, Material, Path, PathPoint, Polygon, Scene,
    Transform,
};
pub use stdlib::function_names;
pub use value::{format_number, Color, RangeValue, Rotation, Size3, Texture, Type, Value, Vector3};
