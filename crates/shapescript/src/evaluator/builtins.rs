//! Scope-mutating properties and commands (spec §4.4 property/command lists).
//!
//! Unlike [`super::builders`], nothing here produces a child scope or returns geometry
//! (except `light`/`camera`, which are commands but still emit one node each, the same
//! way the corpus keeps a handful of special-cased commands next to the rest of a fixed
//! dispatch table instead of inventing a fourth category for them). A bare-identifier
//! *read* of a property (`print color`) is served by [`get_property`] directly from
//! [`resolve_identifier`](super::Evaluator::resolve_identifier) — by the time a name
//! reaches [`dispatch`] as a command, it is always a write or a side-effecting action.

use std::rc::Rc;

use crate::context::{Context, ContextHandle, GeometryCategory, ScopeKind};
use crate::diagnostics::{ErrorKind, ShapeError, SourceRange};
use crate::parser::ast::Stmt;
use crate::scene::{CameraData, GeometryKind, GeometryNode, LightData, PathPoint, Transform};
use crate::value::{Size3, Texture, Type, Value, Vector3};

use super::Evaluator;

const NAMES: &[&str] = &[
    "color",
    "texture",
    "opacity",
    "material",
    "detail",
    "smoothing",
    "font",
    "background",
    "position",
    "orientation",
    "size",
    "name",
    "translate",
    "rotate",
    "scale",
    "point",
    "curve",
    "seed",
    "print",
    "debug",
    "assert",
    "light",
    "camera",
];

pub(super) fn is_property_or_command(name: &str) -> bool {
    NAMES.contains(&name)
}

pub(super) fn property_and_command_names() -> impl Iterator<Item = &'static str> {
    NAMES.iter().copied()
}

/// Pure getter for a bare-identifier property read (spec §4.6 "Identifier" resolution
/// order tries this before treating the name as a zero-argument builder).
pub(super) fn get_property(ctx: &ContextHandle, name: &str) -> Option<Value> {
    let c = ctx.borrow();
    match name {
        "color" => c.material.color.map(Value::Color),
        "texture" => c.material.texture.clone().map(Value::Texture),
        "opacity" => Some(Value::Number(c.material.opacity)),
        "material" => Some(Value::Material(Rc::new(c.material.clone()))),
        "detail" => Some(Value::Number(f64::from(c.detail))),
        "smoothing" => Some(Value::Number(c.smoothing.unwrap_or(0.0))),
        "font" => c.font.clone().map(Value::string),
        "background" => c.background_color.map(Value::Color).or_else(|| c.background_texture.clone().map(Value::Texture)),
        "position" => Some(Value::Vector(c.self_transform.translation)),
        "orientation" => Some(Value::Rotation(c.self_transform.rotation)),
        "size" => {
            let s = c.self_transform.scale;
            Some(Value::Size(Size3::new(s.x, s.y, s.z)))
        }
        "name" => c.name.clone().map(Value::string),
        _ => None,
    }
}

pub(super) fn dispatch(
    ev: &Evaluator<'_>,
    ctx: &ContextHandle,
    name: &str,
    args_value: Option<Value>,
    body: Option<&[Stmt]>,
    range: SourceRange,
) -> Result<Option<Value>, ShapeError> {
    if !is_property_or_command(name) {
        return Ok(None);
    }
    if matches!(name, "light" | "camera") {
        return emit_indicator(ev, ctx, name, args_value, body, range).map(Some);
    }
    if let Some(body) = body {
        if !body.is_empty() {
            return Err(ShapeError::new(range, ErrorKind::UnexpectedArgument { for_: name.to_owned(), max: 0 }));
        }
    }

    match name {
        "color" => set(ctx, name, args_value, range, |c, v| {
            v.as_color().map(|color| {
                c.material.color = Some(color);
                c.material.texture = None;
            })
        }),
        "texture" => {
            forbid_path_scope(ctx, name, range)?;
            let v = require_arg(args_value, name, "texture", range)?;
            match &v {
                Value::Texture(t) => {
                    let mut c = ctx.borrow_mut();
                    c.material.texture = Some(t.clone());
                    c.material.color = None;
                    Ok(Value::Void)
                }
                Value::String(s) if s.as_ref() == "none" => {
                    ctx.borrow_mut().material.texture = None;
                    Ok(Value::Void)
                }
                Value::String(s) => {
                    let mut c = ctx.borrow_mut();
                    c.material.texture = Some(Texture { file: Some(Rc::clone(s)), intensity: 1.0 });
                    c.material.color = None;
                    Ok(Value::Void)
                }
                _ => Err(type_mismatch(name, "texture", v.type_name(), range)),
            }
        }
        "opacity" => set(ctx, name, args_value, range, |c, v| v.as_number().map(|n| c.material.opacity = n)),
        "material" => set(ctx, name, args_value, range, |c, v| match v {
            Value::Material(m) => Some(c.material = (**m).clone()),
            _ => None,
        }),
        "detail" => set(ctx, name, args_value, range, |c, v| {
            let n = v.as_number()?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let detail = (n.round() as i64).max(1) as u32;
            c.detail = detail;
            Some(())
        }),
        "smoothing" => {
            forbid_path_scope(ctx, name, range)?;
            set(ctx, name, args_value, range, |c, v| v.as_number().map(|n| c.smoothing = if n <= 0.0 { None } else { Some(n) }))
        }
        "font" => set(ctx, name, args_value, range, |c, v| v.as_string().map(|s| c.font = Some(s))),
        "background" => set(ctx, name, args_value, range, |c, v| {
            if let Some(color) = v.as_color() {
                c.background_color = Some(color);
                c.background_texture = None;
                Some(())
            } else if let Value::Texture(t) = v {
                c.background_texture = Some(t.clone());
                c.background_color = None;
                Some(())
            } else {
                None
            }
        }),
        "name" => set(ctx, name, args_value, range, |c, v| v.as_string().map(|s| c.name = Some(s.to_string()))),
        "translate" => set(ctx, name, args_value, range, |c, v| {
            v.as_vector().map(|delta| c.child_transform = c.child_transform.translated(delta))
        }),
        "rotate" => set(ctx, name, args_value, range, |c, v| v.as_rotation().map(|delta| c.child_transform = c.child_transform.rotated(delta))),
        "scale" => set(ctx, name, args_value, range, |c, v| v.as_vector().map(|factor| c.child_transform = c.child_transform.scaled(factor))),
        "position" => set(ctx, name, args_value, range, |c, v| v.as_vector().map(|pos| c.self_transform.translation = pos)),
        "orientation" => set(ctx, name, args_value, range, |c, v| v.as_rotation().map(|rot| c.self_transform.rotation = rot)),
        "size" => set(ctx, name, args_value, range, |c, v| {
            v.as_size().map(|size| c.self_transform.scale = Vector3::new(size.width, size.height, size.depth))
        }),
        "point" => {
            require_path_scope(ctx, name, range)?;
            let v = require_arg(args_value, name, "vector", range)?;
            let pos = v.as_vector().ok_or_else(|| type_mismatch(name, "vector", v.type_name(), range))?;
            Context::push_point(ctx, PathPoint::new(pos));
            Ok(Value::Void)
        }
        "curve" => {
            require_path_scope(ctx, name, range)?;
            let v = require_arg(args_value, name, "vector", range)?;
            let pos = v.as_vector().ok_or_else(|| type_mismatch(name, "vector", v.type_name(), range))?;
            let mut point = PathPoint::new(pos);
            point.is_curve = true;
            Context::push_point(ctx, point);
            Ok(Value::Void)
        }
        "seed" => {
            let v = require_arg(args_value, name, "number", range)?;
            let n = v.as_number().ok_or_else(|| type_mismatch(name, "number", v.type_name(), range))?;
            Context::reseed(ctx, n);
            Ok(Value::Void)
        }
        "print" => {
            let elements = args_value.map(|v| v.elements()).unwrap_or_default();
            ev.delegate.debug_log(&elements);
            Ok(Value::Void)
        }
        "debug" => {
            ctx.borrow_mut().debug = true;
            if let Some(v) = args_value {
                ev.delegate.debug_log(&v.elements());
            }
            Ok(Value::Void)
        }
        "assert" => {
            let v = require_arg(args_value, name, "boolean", range)?;
            let ok = v.as_boolean().ok_or_else(|| type_mismatch(name, "boolean", v.type_name(), range))?;
            if ok {
                Ok(Value::Void)
            } else {
                Err(ShapeError::new(range, ErrorKind::AssertionFailure("Assertion failed".to_owned())))
            }
        }
        _ => unreachable!("covered by is_property_or_command"),
    }
    .map(Some)
}

/// Shared shape for every property setter: evaluate `f` against the current material
/// (returning `None` means the argument didn't coerce), or error with a type mismatch.
fn set(ctx: &ContextHandle, name: &str, args_value: Option<Value>, range: SourceRange, f: impl FnOnce(&mut Context, &Value) -> Option<()>) -> Result<Value, ShapeError> {
    let v = require_arg(args_value, name, "a compatible value", range)?;
    let mut c = ctx.borrow_mut();
    f(&mut c, &v).ok_or_else(|| type_mismatch(name, "a compatible value", v.type_name(), range))?;
    Ok(Value::Void)
}

fn require_arg(args_value: Option<Value>, name: &str, expected: &str, range: SourceRange) -> Result<Value, ShapeError> {
    args_value.ok_or_else(|| ShapeError::new(range, ErrorKind::MissingArgument { for_: name.to_owned(), index: 0, expected: expected.to_owned() }))
}

/// `point`/`curve` are legal only inside a true path-producing builder body.
fn require_path_scope(ctx: &ContextHandle, name: &str, range: SourceRange) -> Result<(), ShapeError> {
    if ctx.borrow().category == GeometryCategory::Path {
        Ok(())
    } else {
        Err(ShapeError::new(range, ErrorKind::ContextNotAllowed { name: name.to_owned(), context: "path", suggestion: None }))
    }
}

/// `texture`/`smoothing` are illegal only inside a path-producing builder body.
fn forbid_path_scope(ctx: &ContextHandle, name: &str, range: SourceRange) -> Result<(), ShapeError> {
    if ctx.borrow().category == GeometryCategory::Path {
        Err(ShapeError::new(range, ErrorKind::ContextNotAllowed { name: name.to_owned(), context: "mesh", suggestion: None }))
    } else {
        Ok(())
    }
}

fn type_mismatch(for_: &str, expected: &str, got: Type, range: SourceRange) -> ShapeError {
    ShapeError::new(range, ErrorKind::TypeMismatch { for_: for_.to_owned(), index: Some(0), expected: expected.to_owned(), got })
}

/// Consumes the parent's pending `child_transform`, the same one-shot convention
/// [`super::builders::dispatch`] uses for every other committed node.
fn take_transform(parent: &ContextHandle, own: Transform) -> Transform {
    let pending = std::mem::replace(&mut parent.borrow_mut().child_transform, Transform::default());
    pending.then(own)
}

/// `light`/`camera` are commands (spec §4.4 item 4), not blocks, but each still attaches
/// one [`GeometryNode`] to the scene the way a builder block does — `hasPosition`/
/// `hasOrientation` reflect whether the node's own placement ended up non-default after
/// its (optional) body ran, an approximation of "was explicitly set" since a dirty-flag
/// per property is not tracked (see `DESIGN.md`).
fn emit_indicator(ev: &Evaluator<'_>, ctx: &ContextHandle, name: &str, args_value: Option<Value>, body: Option<&[Stmt]>, range: SourceRange) -> Result<Value, ShapeError> {
    let child = Context::child(ctx, ScopeKind::Group);
    if let Some(body) = body {
        ev.eval_block(&child, body)?;
    }
    let child_ref = child.borrow();
    let kind = if name == "light" {
        let color = args_value.as_ref().and_then(Value::as_color).or(child_ref.material.color).unwrap_or(crate::value::Color::WHITE);
        GeometryKind::Light(LightData {
            color,
            has_position: child_ref.self_transform.translation != crate::value::Vector3::ZERO,
            has_orientation: child_ref.self_transform.rotation != crate::value::Rotation::ZERO,
        })
    } else {
        GeometryKind::Camera(CameraData { fov: args_value.as_ref().and_then(Value::as_number), width: None, height: None, orthographic: false })
    };
    let transform = take_transform(ctx, child_ref.self_transform);
    let node = GeometryNode {
        kind,
        transform,
        material: Rc::new(child_ref.material.clone()),
        name: child_ref.name.clone(),
        children: Vec::new(),
        debug: child_ref.debug,
    };
    Ok(Value::Mesh(Rc::new(node)))
}
