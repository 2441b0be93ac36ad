//! The narrow contract between the evaluator and its host (spec §6 "External
//! Interfaces").
//!
//! Everything the language core cannot do itself — touch a filesystem, decode an
//! image, rasterize a font glyph, triangulate a mesh — goes through these two traits.
//! [`MeshLibrary`] covers geometry construction and introspection the evaluator itself
//! has no algorithm for (font-to-path conversion, watertightness, triangulation);
//! [`EvaluationDelegate`] covers everything else a host needs to supply (file/URL
//! resolution, recursive import, the `print`/`debug` sink). `EvaluationDelegate:
//! MeshLibrary` so a host with a single concrete binding implements one trait.

use std::fmt;
use std::rc::Rc;

use crate::scene::{Path, PathPoint, Polygon};
use crate::value::{Value, Vector3};

/// An error a delegate implementation raises when it cannot satisfy a request.
///
/// Kept deliberately smaller than [`crate::diagnostics::ShapeError`]: a delegate has no
/// access to the call site's source range, so the evaluator is the one that attaches a
/// range and turns this into a proper diagnostic (spec §4.7 "every error carries a
/// source range").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateError {
    NotFound(String),
    AccessRestricted(String),
    Other(String),
}

impl fmt::Display for DelegateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "not found: {name}"),
            Self::AccessRestricted(name) => write!(f, "access restricted: {name}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DelegateError {}

/// Geometry construction and introspection the mesh/path library (spec §1 "the
/// underlying mesh/path library") provides. Constructors mirror the high-level names
/// the evaluator emits (spec §6): most primitives are built directly as
/// [`crate::scene::GeometryNode`] values by the evaluator without reaching this trait at
/// all, since their shape is fully described by [`crate::scene::GeometryKind`] — these
/// methods exist for the handful of operations that genuinely need an external
/// algorithm.
pub trait MeshLibrary {
    /// Whether a mesh forms a closed, manifold surface. No sensible default exists
    /// without a real triangulation backend.
    fn is_watertight(&self, node: &crate::scene::GeometryNode) -> bool;

    /// The triangulated/flattened polygon faces of a mesh.
    fn polygons(&self, node: &crate::scene::GeometryNode) -> Vec<Polygon>;

    /// Triangulates the given mesh into triangle-only polygons.
    fn triangulate(&self, node: &crate::scene::GeometryNode) -> Vec<Polygon> {
        self.polygons(node)
    }

    /// Converts text to one subpath per glyph, using the delegate's font registry
    /// (spec §6 "text-to-path glyph conversion"). The default produces an empty path,
    /// letting a host without font support still evaluate scripts that call `text`
    /// (they simply render nothing), while a real host overrides this.
    fn text_to_path(&self, _text: &str, _font: Option<&str>) -> Result<Rc<Path>, DelegateError> {
        Ok(Rc::new(Path::default()))
    }

    /// Parses SVG path `d`-attribute syntax into a [`Path`] (spec §4.4 `svgpath`).
    ///
    /// Supports the commands a scene description realistically uses: `M`/`m` move,
    /// `L`/`l` line, `H`/`h` horizontal line, `V`/`v` vertical line, `C`/`c` cubic
    /// curve (endpoint only; control points are not retained by [`PathPoint`], so the
    /// endpoint is marked `is_curve`), and `Z`/`z` close. Unsupported commands are
    /// skipped rather than erroring, matching the permissive spirit of `svgpath`
    /// (partial/malformed paths still produce *something* drawable).
    fn svg_path(&self, d: &str) -> Result<Rc<Path>, DelegateError> {
        Ok(Rc::new(parse_svg_path(d)))
    }
}

/// The host capability object (spec glossary "Delegate").
pub trait EvaluationDelegate: MeshLibrary {
    /// Maps a source-relative filename to a canonical location (spec §6 "resolveURL").
    fn resolve_url(&self, name: &str) -> Result<String, DelegateError>;

    /// Parses an imported file and returns its top-level geometry, or `Ok(None)` for
    /// empty files (spec §6 "importGeometry"). May recursively evaluate another
    /// ShapeScript file via a sub-evaluator.
    fn import_geometry(&self, url: &str) -> Result<Option<Value>, DelegateError>;

    /// Sink for `print`/`debug` output (spec §6 "debugLog").
    fn debug_log(&self, values: &[Value]);

    /// Validates a font name and resolves it to a host font id (spec §6 "resolveFont
    /// (optional)"). The default rejects every font name, matching a host with no font
    /// registry.
    fn resolve_font(&self, name: &str) -> Result<String, DelegateError> {
        Err(DelegateError::NotFound(name.to_owned()))
    }
}

/// Implicit repetition (spec-adjacent SVG syntax): extra coordinate groups after a
/// command letter repeat that command (an extra `M` pair repeats as `L`).
pub fn parse_svg_path(d: &str) -> Path {
    let tokens = tokenize_svg(d);
    let mut points: Vec<PathPoint> = Vec::new();
    let mut subpaths: Vec<Path> = Vec::new();
    let mut cursor = Vector3::ZERO;
    let mut start = Vector3::ZERO;
    let mut i = 0;
    let mut command: Option<char> = None;

    let read_num = |tokens: &[SvgToken], i: &mut usize| -> Option<f64> {
        if let Some(SvgToken::Number(n)) = tokens.get(*i) {
            *i += 1;
            Some(*n)
        } else {
            None
        }
    };

    while i < tokens.len() {
        if let SvgToken::Command(cmd) = tokens[i] {
            command = Some(cmd);
            i += 1;
        }
        let Some(cmd) = command else {
            i += 1;
            continue;
        };
        let relative = cmd.is_ascii_lowercase();

        match cmd.to_ascii_uppercase() {
            'M' => {
                if !points.is_empty() {
                    subpaths.push(Path::new(std::mem::take(&mut points)));
                }
                let Some((x, y)) = read_num(&tokens, &mut i).zip(read_num(&tokens, &mut i)) else { break };
                cursor = if relative { cursor + Vector3::new(x, y, 0.0) } else { Vector3::new(x, y, 0.0) };
                start = cursor;
                points.push(PathPoint::new(cursor));
                // Extra coordinate pairs after the initial moveto are implicit linetos.
                command = Some(if relative { 'l' } else { 'L' });
            }
            'L' => {
                let Some((x, y)) = read_num(&tokens, &mut i).zip(read_num(&tokens, &mut i)) else { break };
                cursor = if relative { cursor + Vector3::new(x, y, 0.0) } else { Vector3::new(x, y, 0.0) };
                points.push(PathPoint::new(cursor));
            }
            'H' => {
                let Some(x) = read_num(&tokens, &mut i) else { break };
                cursor = Vector3::new(if relative { cursor.x + x } else { x }, cursor.y, cursor.z);
                points.push(PathPoint::new(cursor));
            }
            'V' => {
                let Some(y) = read_num(&tokens, &mut i) else { break };
                cursor = Vector3::new(cursor.x, if relative { cursor.y + y } else { y }, cursor.z);
                points.push(PathPoint::new(cursor));
            }
            'C' => {
                let nums: Vec<f64> = std::iter::from_fn(|| read_num(&tokens, &mut i)).take(6).collect();
                if nums.len() < 6 {
                    break;
                }
                let (x, y) = (nums[4], nums[5]);
                cursor = if relative { cursor + Vector3::new(x, y, 0.0) } else { Vector3::new(x, y, 0.0) };
                let mut p = PathPoint::new(cursor);
                p.is_curve = true;
                points.push(p);
            }
            'Z' => {
                points.push(PathPoint::new(start));
                cursor = start;
                command = None;
            }
            _ => {
                i += 1;
            }
        }
    }
    if !points.is_empty() {
        subpaths.push(Path::new(points));
    }
    match subpaths.len() {
        0 => Path::default(),
        1 => subpaths.pop().unwrap_or_default(),
        _ => {
            let mut combined = Path::default();
            combined.subpaths = subpaths;
            combined
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SvgToken {
    Command(char),
    Number(f64),
}

fn tokenize_svg(d: &str) -> Vec<SvgToken> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = d.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_alphabetic() {
            tokens.push(SvgToken::Command(c));
            i += 1;
        } else if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == '.' || bytes[i] == 'e' || bytes[i] == 'E') {
                i += 1;
            }
            // handle a sign that starts the *next* number immediately after this one
            // (SVG allows "1-2" to mean two numbers "1" and "-2").
            let text: String = bytes[start..i].iter().collect();
            if let Ok(n) = text.parse::<f64>() {
                tokens.push(SvgToken::Number(n));
            }
        } else {
            i += 1;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn svg_path_move_line_close_produces_closed_path() {
        let path = parse_svg_path("M150 0 L75 200 225 200 Z");
        assert_eq!(path.points.len(), 4);
        assert!(path.is_closed());
    }

    #[test]
    fn svg_path_relative_lines() {
        let path = parse_svg_path("M0 0 l10 0 l0 10 z");
        assert_eq!(path.points.last().unwrap().position, Vector3::new(0.0, 0.0, 0.0));
    }
}
