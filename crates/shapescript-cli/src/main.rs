//! `shapescript` — parses and evaluates a `.shape` file and prints either the
//! resulting scene graph or a diagnostic report (spec §6 "CLI surface").
//!
//! The delegate bound here is deliberately minimal: `texture`/`background`/`import`
//! resolve relative to the input file's directory under a [`SandboxPolicy`] rooted
//! there, and `print`/`debug` go to stdout. There is no font registry and no mesh
//! library (`is_watertight`/`polygons` have nothing to compute against without a real
//! geometry backend), matching spec §1's framing of those as host collaborators this
//! repository only describes the interface to.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use shapescript::{
    evaluate_source, Capability, DelegateError, EvalOptions, EvaluationDelegate, GeometryNode,
    MeshLibrary, Polygon, ResourceLimits, SandboxPolicy, Value,
};

/// Evaluate a ShapeScript file and print its scene graph or diagnostics.
#[derive(Parser)]
#[command(name = "shapescript", author, version, about)]
struct Cli {
    /// Path to the `.shape` file to evaluate.
    input: PathBuf,

    /// Print the scene graph as JSON instead of a one-line summary.
    #[arg(long)]
    json: bool,

    /// Allow `texture`/`background`/`import` to resolve anywhere on disk, not just
    /// under the input file's directory.
    #[arg(long)]
    unrestricted: bool,

    /// Maximum block/function recursion depth.
    #[arg(long)]
    max_recursion: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprint!("{err}");
            return ExitCode::from(64);
        }
    };

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {err}", cli.input.display());
            return ExitCode::from(66);
        }
    };

    let root = cli.input.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let sandbox = if cli.unrestricted { SandboxPolicy::unrestricted() } else { SandboxPolicy::new(vec![Capability::Directory(root.display().to_string())]) };
    let delegate = FileDelegate { root };

    let mut limits = ResourceLimits::new();
    if let Some(depth) = cli.max_recursion {
        limits = limits.with_max_recursion_depth(depth);
    }
    let options = EvalOptions { resource_limits: limits, sandbox };

    let outcome = match evaluate_source(&source, &delegate, options) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprint!("{}", err.to_report(&source, &cli.input.display().to_string()));
            return ExitCode::from(65);
        }
    };

    for warning in &outcome.warnings {
        eprint!("{}", warning.to_report(&source, &cli.input.display().to_string()));
    }

    if cli.json {
        match outcome.scene.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to serialize scene: {err}");
                return ExitCode::from(65);
            }
        }
    } else {
        println!(
            "{} top-level node(s), {} camera(s), {} warning(s)",
            outcome.scene.root.len(),
            outcome.scene.cameras.len(),
            outcome.warnings.len()
        );
    }

    ExitCode::SUCCESS
}

/// A filesystem-backed [`EvaluationDelegate`]: `texture`/`background`/`import` names
/// resolve relative to the script's directory, gated by the CLI's sandbox policy.
/// Has no mesh library or font registry of its own (spec §1 names both as external
/// collaborators this crate only describes the interface to).
struct FileDelegate {
    root: PathBuf,
}

impl MeshLibrary for FileDelegate {
    fn is_watertight(&self, _node: &GeometryNode) -> bool {
        false
    }

    fn polygons(&self, _node: &GeometryNode) -> Vec<Polygon> {
        Vec::new()
    }
}

impl EvaluationDelegate for FileDelegate {
    fn resolve_url(&self, name: &str) -> Result<String, DelegateError> {
        let path = self.root.join(name);
        path.to_str().map(ToOwned::to_owned).ok_or_else(|| DelegateError::Other(format!("non-UTF-8 path: {}", path.display())))
    }

    fn import_geometry(&self, url: &str) -> Result<Option<Value>, DelegateError> {
        let source = fs::read_to_string(url).map_err(|_| DelegateError::NotFound(url.to_owned()))?;
        let sandbox = SandboxPolicy::new(vec![Capability::Directory(self.root.display().to_string())]);
        let options = EvalOptions { resource_limits: ResourceLimits::new(), sandbox };
        let outcome = evaluate_source(&source, self, options).map_err(|err| DelegateError::Other(err.message()))?;
        match outcome.scene.root.len() {
            0 => Ok(None),
            1 => Ok(Some(Value::Mesh(outcome.scene.root[0].clone()))),
            _ => {
                let mut group = GeometryNode::new(shapescript::GeometryKind::Group, std::rc::Rc::new(shapescript::Material::default()));
                group.children = outcome.scene.root;
                Ok(Some(Value::Mesh(std::rc::Rc::new(group))))
            }
        }
    }

    fn debug_log(&self, values: &[Value]) {
        let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{}", parts.join(" "));
    }
}
