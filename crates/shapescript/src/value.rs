//! The ShapeScript value model (spec §3 "Value", §4.3).
//!
//! `Value` is a tagged union with one variant per runtime type. Types are advisory: the
//! evaluator never rejects a value up front based on static shape, it only fails when a
//! coercion is actually attempted and fails (spec §4.6 "Typing is advisory only").

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use strum::{Display as StrumDisplay, EnumString};

use crate::scene::{GeometryNode, LightData, Material, Path, Polygon};

/// An RGBA color, each component nominally in `[0, 1]` (spec §3 "color").
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Self = Self::opaque(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::opaque(1.0, 1.0, 1.0);
    pub const CLEAR: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub const fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Named-color table (spec §5 "Constants": `red green blue yellow cyan magenta
    /// white black gray/grey clear`).
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        Some(match name {
            "red" => Self::opaque(1.0, 0.0, 0.0),
            "green" => Self::opaque(0.0, 1.0, 0.0),
            "blue" => Self::opaque(0.0, 0.0, 1.0),
            "yellow" => Self::opaque(1.0, 1.0, 0.0),
            "cyan" => Self::opaque(0.0, 1.0, 1.0),
            "magenta" => Self::opaque(1.0, 0.0, 1.0),
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "gray" | "grey" => Self::opaque(0.5, 0.5, 0.5),
            "clear" => Self::CLEAR,
            _ => return None,
        })
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b && self.a == other.a
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", format_number(self.r), format_number(self.g), format_number(self.b), format_number(self.a))
    }
}

/// A texture reference: either a file path or no texture, with an intensity multiplier
/// (spec §3 "texture").
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Texture {
    pub file: Option<Rc<str>>,
    pub intensity: f64,
}

impl Texture {
    #[must_use]
    pub fn none() -> Self {
        Self { file: None, intensity: 1.0 }
    }
}

impl fmt::Display for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(path) => write!(f, "{path}"),
            None => write!(f, "none"),
        }
    }
}

/// A 3-component vector (spec §3 "vector").
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn scaled_by(self, factor: Self) -> Self {
        Self::new(self.x * factor.x, self.y * factor.y, self.z * factor.z)
    }

    #[must_use]
    pub fn component_mul(self, other: Self) -> Self {
        self.scaled_by(other)
    }
}

impl PartialEq for Vector3 {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }
}

impl std::ops::Add for Vector3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", format_number(self.x), format_number(self.y), format_number(self.z))
    }
}

/// A width/height/depth triple (spec §3 "size").
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Size3 {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Size3 {
    #[must_use]
    pub const fn new(width: f64, height: f64, depth: f64) -> Self {
        Self { width, height, depth }
    }

    #[must_use]
    pub fn uniform(v: f64) -> Self {
        Self::new(v, v, v)
    }
}

impl fmt::Display for Size3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", format_number(self.width), format_number(self.height), format_number(self.depth))
    }
}

/// An Euler roll/yaw/pitch rotation, in half-turns (spec §3 "rotation").
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Rotation {
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl Rotation {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(roll: f64, yaw: f64, pitch: f64) -> Self {
        Self { roll, yaw, pitch }
    }
}

impl PartialEq for Rotation {
    fn eq(&self, other: &Self) -> bool {
        self.roll == other.roll && self.yaw == other.yaw && self.pitch == other.pitch
    }
}

impl std::ops::Add for Rotation {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.roll + rhs.roll, self.yaw + rhs.yaw, self.pitch + rhs.pitch)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", format_number(self.roll), format_number(self.yaw), format_number(self.pitch))
    }
}

/// A `from [to] [step <step>]` range (spec §3 "range", §4.6 for/in semantics).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RangeValue {
    pub from: f64,
    pub to: Option<f64>,
    pub step: f64,
}

impl RangeValue {
    #[must_use]
    pub fn new(from: f64, to: Option<f64>, step: f64) -> Self {
        Self { from, to, step }
    }

    /// Whether `value` falls within this range, tolerant of floating-point step
    /// accumulation error (spec §4.6 "range membership uses a small epsilon tolerance").
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        const EPSILON: f64 = 1e-9;
        let Some(to) = self.to else {
            return if self.step >= 0.0 { value >= self.from - EPSILON } else { value <= self.from + EPSILON };
        };
        let (lo, hi) = if self.step >= 0.0 { (self.from, to) } else { (to, self.from) };
        if value < lo - EPSILON || value > hi + EPSILON {
            return false;
        }
        let steps = (value - self.from) / self.step;
        (steps - steps.round()).abs() <= EPSILON
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to {
            Some(to) if (self.step - 1.0).abs() < f64::EPSILON => {
                write!(f, "{} to {}", format_number(self.from), format_number(to))
            }
            Some(to) => write!(f, "{} to {} step {}", format_number(self.from), format_number(to), format_number(self.step)),
            None => write!(f, "{} to infinity step {}", format_number(self.from), format_number(self.step)),
        }
    }
}

/// The runtime type tag of a [`Value`] (spec §3 enumerates the variant list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, serde::Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    Number,
    String,
    Boolean,
    Color,
    Texture,
    Vector,
    Size,
    Rotation,
    Range,
    Tuple,
    Path,
    Mesh,
    Polygon,
    Material,
    Object,
    Light,
    Void,
}

/// A tagged runtime value (spec §3 "Value").
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Color(Color),
    Texture(Texture),
    Vector(Vector3),
    Size(Size3),
    Rotation(Rotation),
    Range(RangeValue),
    Tuple(Rc<SmallVec<[Value; 4]>>),
    Path(Rc<Path>),
    Mesh(Rc<GeometryNode>),
    Polygon(Rc<Polygon>),
    Material(Rc<Material>),
    Object(Rc<IndexMap<String, Value>>),
    Light(Rc<LightData>),
    Void,
}

impl Value {
    #[must_use]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    #[must_use]
    pub fn tuple(values: Vec<Self>) -> Self {
        Self::Tuple(Rc::new(SmallVec::from_vec(values)))
    }

    #[must_use]
    pub fn type_name(&self) -> Type {
        match self {
            Self::Number(_) => Type::Number,
            Self::String(_) => Type::String,
            Self::Boolean(_) => Type::Boolean,
            Self::Color(_) => Type::Color,
            Self::Texture(_) => Type::Texture,
            Self::Vector(_) => Type::Vector,
            Self::Size(_) => Type::Size,
            Self::Rotation(_) => Type::Rotation,
            Self::Range(_) => Type::Range,
            Self::Tuple(_) => Type::Tuple,
            Self::Path(_) => Type::Path,
            Self::Mesh(_) => Type::Mesh,
            Self::Polygon(_) => Type::Polygon,
            Self::Material(_) => Type::Material,
            Self::Object(_) => Type::Object,
            Self::Light(_) => Type::Light,
            Self::Void => Type::Void,
        }
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Numeric coercion (spec §4.3 "target-directed coercion"): a single-number tuple
    /// coerces to a number, a `boolean` coerces to `0`/`1`, everything else fails.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Tuple(items) if items.len() == 1 => items[0].as_number(),
            _ => None,
        }
    }

    /// Vector coercion: a vector, a 3-number tuple, or a size/color's first three
    /// components coerce (spec §4.3). Missing trailing axes default to `0`.
    #[must_use]
    pub fn as_vector(&self) -> Option<Vector3> {
        match self {
            Self::Vector(v) => Some(*v),
            Self::Size(s) => Some(Vector3::new(s.width, s.height, s.depth)),
            Self::Tuple(items) => match items.as_slice() {
                [a, b, c] => Some(Vector3::new(a.as_number()?, b.as_number()?, c.as_number()?)),
                [a, b] => Some(Vector3::new(a.as_number()?, b.as_number()?, 0.0)),
                [a] => Some(Vector3::new(a.as_number()?, 0.0, 0.0)),
                _ => None,
            },
            Self::Number(n) => Some(Vector3::new(*n, 0.0, 0.0)),
            _ => None,
        }
    }

    /// Size coercion: a size, or a tuple/number where missing dimensions default to
    /// `width` rather than `0` (spec §3 "size uses width for missing dims").
    #[must_use]
    pub fn as_size(&self) -> Option<Size3> {
        match self {
            Self::Size(s) => Some(*s),
            Self::Vector(v) => Some(Size3::new(v.x, v.y, v.z)),
            Self::Tuple(items) => match items.as_slice() {
                [a, b, c] => Some(Size3::new(a.as_number()?, b.as_number()?, c.as_number()?)),
                [a, b] => {
                    let width = a.as_number()?;
                    Some(Size3::new(width, b.as_number()?, width))
                }
                [a] => {
                    let width = a.as_number()?;
                    Some(Size3::new(width, width, width))
                }
                _ => None,
            },
            Self::Number(n) => Some(Size3::new(*n, *n, *n)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_rotation(&self) -> Option<Rotation> {
        match self {
            Self::Rotation(r) => Some(*r),
            Self::Tuple(items) => match items.as_slice() {
                [a, b, c] => Some(Rotation::new(a.as_number()?, b.as_number()?, c.as_number()?)),
                [a, b] => Some(Rotation::new(a.as_number()?, b.as_number()?, 0.0)),
                [a] => Some(Rotation::new(a.as_number()?, 0.0, 0.0)),
                _ => None,
            },
            Self::Number(n) => Some(Rotation::new(*n, 0.0, 0.0)),
            _ => None,
        }
    }

    /// Color coercion: a color, a named/hex string, or a 3/4-number tuple (spec §4.3,
    /// §4.4 named-color constants fold into this since they evaluate to `Value::Color`
    /// already, so string coercion only handles hex literals here).
    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            Self::Number(n) => Some(Color::opaque(*n, *n, *n)),
            Self::Tuple(items) => match items.as_slice() {
                [Self::Color(c), a] => Some(Color::new(c.r, c.g, c.b, a.as_number()?)),
                [r, g, b, a] => Some(Color::new(r.as_number()?, g.as_number()?, b.as_number()?, a.as_number()?)),
                [r, g, b] => Some(Color::opaque(r.as_number()?, g.as_number()?, b.as_number()?)),
                [v, a] => {
                    let v = v.as_number()?;
                    Some(Color::new(v, v, v, a.as_number()?))
                }
                [v] => {
                    let v = v.as_number()?;
                    Some(Color::opaque(v, v, v))
                }
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<Rc<str>> {
        match self {
            Self::String(s) => Some(Rc::clone(s)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_path(&self) -> Option<Rc<Path>> {
        match self {
            Self::Path(p) => Some(Rc::clone(p)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mesh(&self) -> Option<Rc<GeometryNode>> {
        match self {
            Self::Mesh(m) => Some(Rc::clone(m)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Tuple-like element access used by member lookup and `for`-loop iteration (spec
    /// §4.6): a bare non-tuple value behaves as a one-element tuple of itself.
    #[must_use]
    pub fn elements(&self) -> Vec<Value> {
        match self {
            Self::Tuple(items) => items.to_vec(),
            other => vec![other.clone()],
        }
    }

    /// Member access `e.m` (spec §4.6 "member lookup"). Axis/component names
    /// (`x`/`y`/`z`, `width`/`height`/`depth`, `roll`/`yaw`/`pitch`, `red`/`green`/
    /// `blue`/`alpha`) are tried through the relevant coercion first, so a plain
    /// 3-number tuple answers `.y` the same way an actual vector does. `count` and
    /// ordinal names (`first`, `second`, ... `ninety-ninth`) index into [`Self::elements`].
    /// Remaining members are variant-specific (path points, mesh material, and so on).
    #[must_use]
    pub fn member(&self, name: &str) -> Option<Value> {
        match name {
            "x" => return self.as_vector().map(|v| Value::Number(v.x)),
            "y" => return self.as_vector().map(|v| Value::Number(v.y)),
            "z" => return self.as_vector().map(|v| Value::Number(v.z)),
            "width" => return self.as_size().map(|s| Value::Number(s.width)),
            "height" => return self.as_size().map(|s| Value::Number(s.height)),
            "depth" => return self.as_size().map(|s| Value::Number(s.depth)),
            "roll" => return self.as_rotation().map(|r| Value::Number(r.roll)),
            "yaw" => return self.as_rotation().map(|r| Value::Number(r.yaw)),
            "pitch" => return self.as_rotation().map(|r| Value::Number(r.pitch)),
            "red" => return self.as_color().map(|c| Value::Number(c.r)),
            "green" => return self.as_color().map(|c| Value::Number(c.g)),
            "blue" => return self.as_color().map(|c| Value::Number(c.b)),
            "alpha" => return self.as_color().map(|c| Value::Number(c.a)),
            "count" => return Some(Value::Number(self.elements().len() as f64)),
            _ => {}
        }
        if let Some(index) = ordinal_index(name) {
            return self.elements().get(index).cloned();
        }
        match self {
            Self::Path(p) => match name {
                "points" => Some(Value::tuple(p.points.iter().map(|pt| Value::Vector(pt.position)).collect())),
                "subpaths" => Some(Value::tuple(p.subpaths.iter().cloned().map(|sp| Value::Path(Rc::new(sp))).collect())),
                "closed" => Some(Value::Boolean(p.is_closed())),
                "bounds" => p.bounds().map(|(min, max)| Value::tuple(vec![Value::Vector(min), Value::Vector(max)])),
                "length" => Some(Value::Number(p.length())),
                _ => None,
            },
            Self::Mesh(m) => match name {
                "material" => Some(Value::Material(Rc::clone(&m.material))),
                "name" => m.name.clone().map(Value::string),
                "children" => Some(Value::tuple(m.children.iter().cloned().map(Value::Mesh).collect())),
                "bounds" => m.bounds().map(|(min, max)| Value::tuple(vec![Value::Vector(min), Value::Vector(max)])),
                _ => None,
            },
            Self::Light(l) => match name {
                "color" => Some(Value::Color(l.color)),
                "hasPosition" => Some(Value::Boolean(l.has_position)),
                "hasOrientation" => Some(Value::Boolean(l.has_orientation)),
                _ => None,
            },
            Self::Material(m) => match name {
                "color" => m.color.map(Value::Color),
                "texture" => m.texture.clone().map(Value::Texture),
                "opacity" => Some(Value::Number(m.opacity)),
                _ => None,
            },
            Self::Object(o) => o.get(name).cloned(),
            _ => None,
        }
    }
}

/// Parses an English ordinal word (`"first"` through `"ninety-ninth"`) into a 0-based
/// index, for tuple/vector member access by ordinal name (spec §4.6 "tuple: ordinals").
/// Only the range a scene description realistically indexes is supported; nothing
/// stops a script writing `.hundredth`, it just won't resolve to a member.
fn ordinal_index(name: &str) -> Option<usize> {
    const ONES: [&str; 9] = ["first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth"];
    const TEENS: [&str; 10] =
        ["tenth", "eleventh", "twelfth", "thirteenth", "fourteenth", "fifteenth", "sixteenth", "seventeenth", "eighteenth", "nineteenth"];
    const TENS_ORDINAL: [&str; 8] = ["twentieth", "thirtieth", "fortieth", "fiftieth", "sixtieth", "seventieth", "eightieth", "ninetieth"];
    const TENS_PREFIX: [&str; 8] = ["twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety"];

    if let Some(pos) = ONES.iter().position(|s| *s == name) {
        return Some(pos);
    }
    if let Some(pos) = TEENS.iter().position(|s| *s == name) {
        return Some(pos + 9);
    }
    if let Some(pos) = TENS_ORDINAL.iter().position(|s| *s == name) {
        return Some((pos + 2) * 10 - 1);
    }
    if let Some((prefix, suffix)) = name.split_once('-') {
        let tens = TENS_PREFIX.iter().position(|s| *s == prefix)?;
        let ones = ONES.iter().position(|s| *s == suffix)?;
        return Some((tens + 2) * 10 + ones);
    }
    None
}

/// Structural equality (spec §3 "Equality `=` is reflexive for every non-tuple value,
/// and element-wise for tuples"). `0.0 == -0.0` already holds for IEEE floats so no
/// special-casing is needed there; `NaN == NaN` is `false`, matching ordinary float
/// comparison rather than `PartialOrd`'s total-order variant (see DESIGN.md for why
/// this is the chosen resolution of the spec's own open question on NaN equality).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Texture(a), Self::Texture(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Size(a), Self::Size(b)) => a == b,
            (Self::Rotation(a), Self::Rotation(b)) => a == b,
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Path(a), Self::Path(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Mesh(a), Self::Mesh(b)) => Rc::ptr_eq(a, b),
            (Self::Polygon(a), Self::Polygon(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Material(a), Self::Material(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Light(a), Self::Light(b)) => Rc::ptr_eq(a, b) || a == b,
            (Self::Void, Self::Void) => true,
            _ => false,
        }
    }
}

/// Every value type is hashable (spec §3). Opaque reference types (`mesh`, `material`,
/// `light`) hash by `Rc` pointer identity since they aren't deeply compared for
/// equality either; everything else hashes structurally.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Number(n) => hash_f64(*n, state),
            Self::String(s) => s.hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::Color(c) => {
                hash_f64(c.r, state);
                hash_f64(c.g, state);
                hash_f64(c.b, state);
                hash_f64(c.a, state);
            }
            Self::Texture(t) => {
                t.file.hash(state);
                hash_f64(t.intensity, state);
            }
            Self::Vector(v) => {
                hash_f64(v.x, state);
                hash_f64(v.y, state);
                hash_f64(v.z, state);
            }
            Self::Size(s) => {
                hash_f64(s.width, state);
                hash_f64(s.height, state);
                hash_f64(s.depth, state);
            }
            Self::Rotation(r) => {
                hash_f64(r.roll, state);
                hash_f64(r.yaw, state);
                hash_f64(r.pitch, state);
            }
            Self::Range(r) => {
                hash_f64(r.from, state);
                r.to.map(f64::to_bits).hash(state);
                hash_f64(r.step, state);
            }
            Self::Tuple(items) => items.hash(state),
            Self::Path(p) => (Rc::as_ptr(p) as usize).hash(state),
            Self::Mesh(m) => (Rc::as_ptr(m) as usize).hash(state),
            Self::Polygon(p) => (Rc::as_ptr(p) as usize).hash(state),
            Self::Material(m) => (Rc::as_ptr(m) as usize).hash(state),
            Self::Object(o) => {
                for (k, v) in o.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Self::Light(l) => (Rc::as_ptr(l) as usize).hash(state),
            Self::Void => {}
        }
    }
}

fn hash_f64<H: Hasher>(n: f64, state: &mut H) {
    // Normalize -0.0 to +0.0 so the two values, which compare equal, also hash equal.
    let n = if n == 0.0 { 0.0 } else { n };
    n.to_bits().hash(state);
}

/// Canonical number formatting: integral values print with no fractional part, so
/// `print 1.0` and `print 1` are indistinguishable (spec §8 testable property).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::String(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Color(c) => write!(f, "{c}"),
            Self::Texture(t) => write!(f, "{t}"),
            Self::Vector(v) => write!(f, "{v}"),
            Self::Size(s) => write!(f, "{s}"),
            Self::Rotation(r) => write!(f, "{r}"),
            Self::Range(r) => write!(f, "{r}"),
            Self::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" "))
            }
            Self::Path(p) => write!(f, "path ({} points)", p.total_point_count()),
            Self::Mesh(m) => write!(f, "{}", m.type_name()),
            Self::Polygon(p) => write!(f, "polygon ({} points)", p.points.len()),
            Self::Material(_) => write!(f, "material"),
            Self::Object(o) => {
                let parts: Vec<String> = o.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Self::Light(l) => write!(f, "light {}", l.color),
            Self::Void => write!(f, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integral_numbers_format_without_fraction() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn zero_and_negative_zero_are_equal() {
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn tuple_equality_is_elementwise() {
        let a = Value::tuple(vec![Value::Number(1.0), Value::Number(2.0)]);
        let b = Value::tuple(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(a, b);
    }

    #[test]
    fn single_number_tuple_coerces_to_number() {
        let v = Value::tuple(vec![Value::Number(42.0)]);
        assert_eq!(v.as_number(), Some(42.0));
    }

    #[test]
    fn three_number_tuple_coerces_to_vector() {
        let v = Value::tuple(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(v.as_vector(), Some(Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn a_single_number_zero_pads_missing_vector_axes() {
        assert_eq!(Value::Number(5.0).as_vector(), Some(Vector3::new(5.0, 0.0, 0.0)));
        let v = Value::tuple(vec![Value::Number(5.0)]);
        assert_eq!(v.as_vector(), Some(Vector3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn size_coercion_fills_missing_dimensions_from_width() {
        assert_eq!(Value::Number(4.0).as_size(), Some(Size3::new(4.0, 4.0, 4.0)));
        let one = Value::tuple(vec![Value::Number(4.0)]);
        assert_eq!(one.as_size(), Some(Size3::new(4.0, 4.0, 4.0)));
        let two = Value::tuple(vec![Value::Number(4.0), Value::Number(2.0)]);
        assert_eq!(two.as_size(), Some(Size3::new(4.0, 2.0, 4.0)));
    }

    #[test]
    fn two_number_tuple_coerces_to_rotation() {
        let v = Value::tuple(vec![Value::Number(0.0), Value::Number(90.0)]);
        assert_eq!(v.as_rotation(), Some(Rotation::new(0.0, 90.0, 0.0)));
    }

    #[test]
    fn named_colors_cover_the_documented_table() {
        for name in ["red", "green", "blue", "yellow", "cyan", "magenta", "white", "black", "gray", "grey", "clear"] {
            assert!(Color::named(name).is_some(), "missing named color {name}");
        }
        assert!(Color::named("not-a-color").is_none());
    }

    #[test]
    fn range_contains_respects_step() {
        let r = RangeValue::new(0.0, Some(10.0), 2.0);
        assert!(r.contains(4.0));
        assert!(!r.contains(5.0));
    }

    #[test]
    fn type_display_matches_lowercase_keyword() {
        assert_eq!(Type::Mesh.to_string(), "mesh");
        assert_eq!(Type::Number.to_string(), "number");
    }

    #[test]
    fn member_access_on_a_three_tuple_uses_vector_axis_names() {
        let v = Value::tuple(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(v.member("y"), Some(Value::Number(2.0)));
    }

    #[test]
    fn member_access_on_a_tuple_supports_ordinal_names() {
        let v = Value::tuple(vec![Value::Number(10.0), Value::Number(20.0), Value::Number(30.0)]);
        assert_eq!(v.member("first"), Some(Value::Number(10.0)));
        assert_eq!(v.member("third"), Some(Value::Number(30.0)));
        assert_eq!(v.member("fourth"), None);
    }

    #[test]
    fn ordinal_index_covers_teens_and_compound_forms() {
        assert_eq!(ordinal_index("tenth"), Some(9));
        assert_eq!(ordinal_index("twentieth"), Some(19));
        assert_eq!(ordinal_index("twenty-first"), Some(20));
        assert_eq!(ordinal_index("ninety-ninth"), Some(98));
        assert_eq!(ordinal_index("not-an-ordinal"), None);
    }

    #[test]
    fn color_alpha_override_preserves_rgb() {
        let v = Value::tuple(vec![Value::Color(Color::opaque(1.0, 0.0, 0.0)), Value::Number(0.5)]);
        assert_eq!(v.as_color(), Some(Color::new(1.0, 0.0, 0.0, 0.5)));
    }
}
