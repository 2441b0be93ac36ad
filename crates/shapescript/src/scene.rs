//! Scene-graph entities (spec §3 "Entities in the scene graph").
//!
//! These types are the shared vocabulary between the evaluator and the host's mesh/path
//! library (spec §6): the evaluator builds them by walking the AST, and a real host
//! consumes them to produce triangulated meshes, renders, or exports. The crate itself
//! never triangulates or rasterizes anything — that stays behind [`crate::delegate`].

use std::rc::Rc;

use crate::value::{Color, Rotation, Texture, Vector3};

/// Accumulated translation/rotation/scale for a geometry node (spec §3 "transform").
///
/// Composed multiplicatively: a child's effective transform is its own transform
/// applied after the parent's (spec I5 hierarchical propagation, §4.6 "compose
/// multiplicatively with the inherited transform"). Rotation is kept as Euler angles
/// (`roll`, `yaw`, `pitch`) to match the `rotation` value type directly (spec §3);
/// composing Euler rotations is done by summing component-wise, which matches
/// ShapeScript script-level behavior for the common case of axis-aligned rotations
/// without attempting full quaternion composition.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Rotation,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::ZERO,
            rotation: Rotation::ZERO,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    #[must_use]
    pub fn translated(mut self, delta: Vector3) -> Self {
        self.translation = self.translation + delta.scaled_by(self.scale);
        self
    }

    #[must_use]
    pub fn rotated(mut self, delta: Rotation) -> Self {
        self.rotation = self.rotation + delta;
        self
    }

    #[must_use]
    pub fn scaled(mut self, factor: Vector3) -> Self {
        self.scale = self.scale.component_mul(factor);
        self
    }

    /// Composes `self` (parent) with `child`, producing the child's effective transform.
    #[must_use]
    pub fn then(&self, child: Self) -> Self {
        Self {
            translation: self.translation + child.translation.scaled_by(self.scale),
            rotation: self.rotation + child.rotation,
            scale: self.scale.component_mul(child.scale),
        }
    }
}

/// An immutable material record, shared by reference and updated by copy-on-write
/// from the context (spec §3 "Material").
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Material {
    pub color: Option<Color>,
    pub texture: Option<Texture>,
    pub opacity: f64,
    pub metallicity: f64,
    pub roughness: f64,
    pub glow: f64,
    /// `true` if normals should be inverted/flipped on the resulting mesh.
    pub normals_inverted: bool,
}

impl Material {
    #[must_use]
    pub fn with_default_opacity() -> Self {
        Self {
            opacity: 1.0,
            roughness: 0.5,
            ..Default::default()
        }
    }
}

/// One point along a [`Path`] (spec §3 "Path").
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PathPoint {
    pub position: Vector3,
    pub color: Option<Color>,
    pub is_curve: bool,
}

impl PathPoint {
    #[must_use]
    pub fn new(position: Vector3) -> Self {
        Self {
            position,
            color: None,
            is_curve: false,
        }
    }
}

/// An ordered list of points with optional curve markers; may contain subpaths
/// (spec §3 "Path"). Closed iff the first point equals the last.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Path {
    pub points: Vec<PathPoint>,
    pub subpaths: Vec<Path>,
}

impl Path {
    #[must_use]
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self {
            points,
            subpaths: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 2 => first.position == last.position,
            _ => false,
        }
    }

    /// Total point count across this path and all of its subpaths.
    #[must_use]
    pub fn total_point_count(&self) -> usize {
        self.points.len() + self.subpaths.iter().map(Self::total_point_count).sum::<usize>()
    }

    /// Axis-aligned bounding box of every point in this path (and its subpaths).
    #[must_use]
    pub fn bounds(&self) -> Option<(Vector3, Vector3)> {
        let mut min: Option<Vector3> = None;
        let mut max: Option<Vector3> = None;
        self.for_each_point(&mut |p| {
            min = Some(match min {
                Some(m) => Vector3::new(m.x.min(p.x), m.y.min(p.y), m.z.min(p.z)),
                None => p,
            });
            max = Some(match max {
                Some(m) => Vector3::new(m.x.max(p.x), m.y.max(p.y), m.z.max(p.z)),
                None => p,
            });
        });
        min.zip(max)
    }

    fn for_each_point(&self, f: &mut impl FnMut(Vector3)) {
        for point in &self.points {
            f(point.position);
        }
        for sub in &self.subpaths {
            sub.for_each_point(f);
        }
    }

    /// Sum of segment lengths between consecutive points, including subpaths
    /// (spec §6 "path introspection: points, subpaths, length").
    #[must_use]
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        for pair in self.points.windows(2) {
            let delta = pair[1].position + Vector3::new(-pair[0].position.x, -pair[0].position.y, -pair[0].position.z);
            total += (delta.x * delta.x + delta.y * delta.y + delta.z * delta.z).sqrt();
        }
        total + self.subpaths.iter().map(Self::length).sum::<f64>()
    }
}

/// A bare polygon result, as produced by the `polygon` block when given an explicit
/// point list rather than a side count (spec §4.4 block list).
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Polygon {
    pub points: Vec<Vector3>,
}

/// Derived light properties (spec §3 "Light"): `hasPosition`/`hasOrientation` come
/// from whether the enclosing transform carried a non-default translation/rotation
/// at the point the `light` command ran.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LightData {
    pub color: Color,
    pub has_position: bool,
    pub has_orientation: bool,
}

/// Camera-specific data attached to a [`GeometryKind::Camera`] node.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct CameraData {
    pub fov: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub orthographic: bool,
}

/// The kind of geometry a node represents (spec §3 "Geometry node").
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum GeometryKind {
    Cube,
    Sphere { segments: u32 },
    Cylinder { segments: u32 },
    Cone { segments: u32 },
    Extrude { paths: Vec<Rc<Path>>, along: Vec<Rc<Path>> },
    /// A profile path revolved around an axis (spec §4.4 `lathe`); `None` only if the
    /// profile couldn't be resolved, which a type-mismatch error prevents in practice.
    Lathe { segments: u32, path: Option<Rc<Path>> },
    /// A surface blended through an ordered stack of cross-section paths.
    Loft { paths: Vec<Rc<Path>> },
    /// The planar fill of a closed path (spec §4.4 `fill`); keeps the source path(s)
    /// around the same way [`Self::Extrude`] does, since a real mesh library needs them
    /// to triangulate the interior.
    Fill(Vec<Rc<Path>>),
    /// The convex hull of its children (meshes or paths, found in `GeometryNode::children`).
    Hull,
    Group,
    Union,
    Intersection,
    Difference,
    Xor,
    Stencil,
    PathGeometry(Rc<Path>),
    /// A host-supplied opaque mesh (the `mesh { ... }` block).
    CustomMesh,
    Light(LightData),
    Camera(CameraData),
}

impl GeometryKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Cone { .. } => "cone",
            Self::Extrude { .. } => "extrude",
            Self::Lathe { .. } => "lathe",
            Self::Loft { .. } => "loft",
            Self::Fill(_) => "fill",
            Self::Hull => "hull",
            Self::Group => "group",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Difference => "difference",
            Self::Xor => "xor",
            Self::Stencil => "stencil",
            Self::PathGeometry(_) => "path",
            Self::CustomMesh => "mesh",
            Self::Light(_) => "light",
            Self::Camera(_) => "camera",
        }
    }

    /// Whether this kind is a CSG boolean operator (spec §3 `type` enumeration).
    #[must_use]
    pub fn is_csg(&self) -> bool {
        matches!(self, Self::Union | Self::Intersection | Self::Difference | Self::Xor | Self::Stencil)
    }
}

/// A node in the scene graph (spec §3 "Geometry node").
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GeometryNode {
    pub kind: GeometryKind,
    pub transform: Transform,
    pub material: Rc<Material>,
    pub name: Option<String>,
    pub children: Vec<Rc<Self>>,
    pub debug: bool,
}

impl GeometryNode {
    #[must_use]
    pub fn new(kind: GeometryKind, material: Rc<Material>) -> Self {
        Self {
            kind,
            transform: Transform::default(),
            material,
            name: None,
            children: Vec::new(),
            debug: false,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Axis-aligned bounding box across this node and its children, in the node's own
    /// local space (children's transforms are applied before folding in, matching the
    /// mesh library's documented `bounds` introspection, spec §6).
    #[must_use]
    pub fn bounds(&self) -> Option<(Vector3, Vector3)> {
        let own = match &self.kind {
            GeometryKind::PathGeometry(path) => path.bounds(),
            _ => None,
        };
        let mut min = own.map(|(min, _)| min);
        let mut max = own.map(|(_, max)| max);
        for child in &self.children {
            if let Some((child_min, child_max)) = child.bounds() {
                let child_min = child.transform.apply_point(child_min);
                let child_max = child.transform.apply_point(child_max);
                min = Some(match min {
                    Some(m) => Vector3::new(m.x.min(child_min.x), m.y.min(child_min.y), m.z.min(child_min.z)),
                    None => child_min,
                });
                max = Some(match max {
                    Some(m) => Vector3::new(m.x.max(child_max.x), m.y.max(child_max.y), m.z.max(child_max.z)),
                    None => child_max,
                });
            }
        }
        min.zip(max)
    }
}

impl Transform {
    /// Applies translation and scale to a point (rotation is ignored for the
    /// axis-aligned bounding-box approximation used by [`GeometryNode::bounds`]).
    #[must_use]
    pub fn apply_point(&self, point: Vector3) -> Vector3 {
        point.scaled_by(self.scale) + self.translation
    }
}

/// The final output of evaluating a program: the root group plus the resources the
/// host's renderer/exporter needs (spec §6 "scene renderer / exporter").
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct Scene {
    pub root: Vec<Rc<GeometryNode>>,
    pub background_color: Option<Color>,
    pub background_texture: Option<Texture>,
    pub cameras: Vec<Rc<GeometryNode>>,
}

impl Scene {
    /// Renders the scene graph to pretty-printed JSON, for hosts that want a
    /// language-agnostic dump rather than linking against this crate directly
    /// (spec §6 CLI surface, `--json` output mode).
    ///
    /// # Errors
    /// Returns an error only if `serde_json` itself fails, which does not happen for
    /// this type (it contains no maps with non-string keys and no floating-point NaN
    /// that would need special handling beyond what IEEE 754 JSON encoding already does).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_is_closed_when_endpoints_match() {
        let path = Path::new(vec![
            PathPoint::new(Vector3::new(0.0, 0.0, 0.0)),
            PathPoint::new(Vector3::new(1.0, 0.0, 0.0)),
            PathPoint::new(Vector3::new(0.0, 0.0, 0.0)),
        ]);
        assert!(path.is_closed());
        assert!(path.points.len() >= 2);
    }

    #[test]
    fn path_is_not_closed_with_single_point() {
        let path = Path::new(vec![PathPoint::new(Vector3::ZERO)]);
        assert!(!path.is_closed());
    }

    #[test]
    fn transform_composition_accumulates_translation_through_scale() {
        let parent = Transform {
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..Transform::default()
        };
        let child = Transform {
            translation: Vector3::new(1.0, 0.0, 0.0),
            ..Transform::default()
        };
        let composed = parent.then(child);
        assert_eq!(composed.translation, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn scene_serializes_to_json() {
        let node = GeometryNode::new(GeometryKind::Cube, Rc::new(Material::with_default_opacity()));
        let scene = Scene { root: vec![Rc::new(node)], ..Scene::default() };
        let json = scene.to_json().unwrap();
        assert!(json.contains("\"cube\"") || json.contains("\"Cube\""));
    }
}
