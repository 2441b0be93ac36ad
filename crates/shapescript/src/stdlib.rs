//! The standard library symbol table (spec §4.4).
//!
//! Constants and pure functions are self-contained and live here, dispatched the same
//! way the corpus dispatches a fixed-function module: a `strum`-derived enum used both
//! as the name table and as the `match` discriminant in a `call` method. Getter/setter
//! properties, commands, and blocks are inherently tied to scope mutation and AST block
//! evaluation, so their dispatch lives in [`crate::evaluator`] instead — this module
//! only owns the parts of the symbol table that are pure functions of their arguments.

use std::rc::Rc;

use strum::{Display as StrumDisplay, EnumString};

use crate::context::{Context, ContextHandle};
use crate::diagnostics::{ErrorKind, ShapeError, SourceRange};
use crate::value::{Color, Type, Value};

/// Named-color and math constants (spec §5 "Constants").
#[must_use]
pub fn constant(name: &str) -> Option<Value> {
    if let Some(color) = Color::named(name) {
        return Some(Value::Color(color));
    }
    Some(match name {
        "pi" => Value::Number(std::f64::consts::PI),
        "halfpi" => Value::Number(std::f64::consts::FRAC_PI_2),
        "twopi" => Value::Number(std::f64::consts::TAU),
        "infinity" => Value::Number(f64::INFINITY),
        _ => return None,
    })
}

/// Names every builtin pure function understands, used for "Did you mean" candidate
/// lists and for recognizing a bare identifier as a function call site.
#[must_use]
pub fn function_names() -> impl Iterator<Item = &'static str> {
    StdFunction::ALL.iter().map(|f| f.as_static_str())
}

/// The pure, typed `(Value…) -> Value` functions (spec §4.4 item 3, plus the
/// supplemental math surface from `SPEC_FULL.md` §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StdFunction {
    Cos,
    Sin,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    Pow,
    Log,
    Exp,
    Hypot,
    Min,
    Max,
    Abs,
    Sign,
    Floor,
    Ceil,
    Round,
    Rnd,
    Trim,
    Split,
    Join,
    Length,
}

impl StdFunction {
    pub const ALL: &'static [Self] = &[
        Self::Cos,
        Self::Sin,
        Self::Tan,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Atan2,
        Self::Sqrt,
        Self::Pow,
        Self::Log,
        Self::Exp,
        Self::Hypot,
        Self::Min,
        Self::Max,
        Self::Abs,
        Self::Sign,
        Self::Floor,
        Self::Ceil,
        Self::Round,
        Self::Rnd,
        Self::Trim,
        Self::Split,
        Self::Join,
        Self::Length,
    ];

    #[must_use]
    pub fn as_static_str(self) -> &'static str {
        // `strum::Display` already lowercases the variant name; this avoids allocating
        // just to get a `&'static str` back for the candidate-name iterator.
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Hypot => "hypot",
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Rnd => "rnd",
            Self::Trim => "trim",
            Self::Split => "split",
            Self::Join => "join",
            Self::Length => "length",
        }
    }

    fn number_arg(args: &[Value], index: usize, for_: &str, range: SourceRange) -> Result<f64, ShapeError> {
        args.get(index).and_then(Value::as_number).ok_or_else(|| {
            ShapeError::new(
                range,
                ErrorKind::TypeMismatch {
                    for_: for_.to_owned(),
                    index: Some(index),
                    expected: "number".to_owned(),
                    got: args.get(index).map_or(Type::Void, Value::type_name),
                },
            )
        })
    }

    /// Evaluates a call to this function (spec §4.6 "Command invocation" coercion
    /// rules apply the same way to function arguments).
    pub fn call(self, ctx: &ContextHandle, name: &str, args: &[Value], range: SourceRange) -> Result<Value, ShapeError> {
        let num = |i: usize| Self::number_arg(args, i, name, range);
        match self {
            Self::Cos => Ok(Value::Number(num(0)?.cos())),
            Self::Sin => Ok(Value::Number(num(0)?.sin())),
            Self::Tan => Ok(Value::Number(num(0)?.tan())),
            Self::Asin => Ok(Value::Number(num(0)?.asin())),
            Self::Acos => Ok(Value::Number(num(0)?.acos())),
            Self::Atan => Ok(Value::Number(num(0)?.atan())),
            Self::Atan2 => Ok(Value::Number(num(0)?.atan2(num(1)?))),
            Self::Sqrt => Ok(Value::Number(num(0)?.sqrt())),
            Self::Pow => Ok(Value::Number(num(0)?.powf(num(1)?))),
            Self::Log => Ok(Value::Number(num(0)?.ln())),
            Self::Exp => Ok(Value::Number(num(0)?.exp())),
            Self::Hypot => Ok(Value::Number(num(0)?.hypot(num(1)?))),
            Self::Min => reduce_numbers(args, name, range, f64::min),
            Self::Max => reduce_numbers(args, name, range, f64::max),
            Self::Abs => Ok(Value::Number(num(0)?.abs())),
            Self::Sign => Ok(Value::Number(num(0)?.signum())),
            Self::Floor => Ok(Value::Number(num(0)?.floor())),
            Self::Ceil => Ok(Value::Number(num(0)?.ceil())),
            Self::Round => Ok(Value::Number(num(0)?.round())),
            Self::Rnd => Ok(Value::Number(Context::next_random(ctx))),
            Self::Trim => string_arg(args, name, range).map(|s| Value::string(s.trim().to_owned())),
            Self::Split => split(args, name, range),
            Self::Join => join(args, name, range),
            Self::Length => length(args, name, range),
        }
    }
}

fn string_arg(args: &[Value], for_: &str, range: SourceRange) -> Result<Rc<str>, ShapeError> {
    args.first().and_then(Value::as_string).ok_or_else(|| {
        ShapeError::new(
            range,
            ErrorKind::TypeMismatch {
                for_: for_.to_owned(),
                index: Some(0),
                expected: "string".to_owned(),
                got: args.first().map_or(Type::Void, Value::type_name),
            },
        )
    })
}

fn reduce_numbers(args: &[Value], for_: &str, range: SourceRange, op: fn(f64, f64) -> f64) -> Result<Value, ShapeError> {
    let mut numbers = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let n = arg.as_number().ok_or_else(|| {
            ShapeError::new(
                range,
                ErrorKind::TypeMismatch {
                    for_: for_.to_owned(),
                    index: Some(index),
                    expected: "number".to_owned(),
                    got: arg.type_name(),
                },
            )
        })?;
        numbers.push(n);
    }
    numbers
        .into_iter()
        .reduce(op)
        .map(Value::Number)
        .ok_or_else(|| ShapeError::new(range, ErrorKind::MissingArgument { for_: for_.to_owned(), index: 0, expected: "number".to_owned() }))
}

fn split(args: &[Value], for_: &str, range: SourceRange) -> Result<Value, ShapeError> {
    let text = string_arg(args, for_, range)?;
    let separator = match args.get(1).and_then(Value::as_string) {
        Some(sep) => sep,
        None => Rc::from(" "),
    };
    let parts = if separator.is_empty() {
        text.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        text.split(separator.as_ref()).map(Value::string).collect()
    };
    Ok(Value::tuple(parts))
}

fn join(args: &[Value], for_: &str, range: SourceRange) -> Result<Value, ShapeError> {
    let Some(first) = args.first() else {
        return Err(ShapeError::new(range, ErrorKind::MissingArgument { for_: for_.to_owned(), index: 0, expected: "tuple".to_owned() }));
    };
    let separator = args.get(1).and_then(Value::as_string).unwrap_or_else(|| Rc::from(""));
    let parts: Vec<String> = first.elements().iter().map(ToString::to_string).collect();
    Ok(Value::string(parts.join(separator.as_ref())))
}

fn length(args: &[Value], for_: &str, range: SourceRange) -> Result<Value, ShapeError> {
    let Some(value) = args.first() else {
        return Err(ShapeError::new(range, ErrorKind::MissingArgument { for_: for_.to_owned(), index: 0, expected: "string or tuple".to_owned() }));
    };
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::Path(p) => p.total_point_count(),
        other => other.elements().len(),
    };
    Ok(Value::Number(len as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::context::Context;

    #[test]
    fn named_colors_and_math_constants_resolve() {
        assert_eq!(constant("red"), Some(Value::Color(Color::opaque(1.0, 0.0, 0.0))));
        assert!(matches!(constant("pi"), Some(Value::Number(n)) if (n - std::f64::consts::PI).abs() < 1e-12));
        assert_eq!(constant("not-a-constant"), None);
    }

    #[test]
    fn min_and_max_reduce_across_all_arguments() {
        let ctx = Context::root();
        let range = SourceRange::empty_at(0);
        let args = vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)];
        assert_eq!(StdFunction::Min.call(&ctx, "min", &args, range).unwrap(), Value::Number(1.0));
        assert_eq!(StdFunction::Max.call(&ctx, "max", &args, range).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn split_defaults_to_whitespace_separator() {
        let ctx = Context::root();
        let range = SourceRange::empty_at(0);
        let args = vec![Value::string("a b c")];
        let result = StdFunction::Split.call(&ctx, "split", &args, range).unwrap();
        assert_eq!(result, Value::tuple(vec![Value::string("a"), Value::string("b"), Value::string("c")]));
    }

    #[test]
    fn join_uses_empty_separator_by_default() {
        let ctx = Context::root();
        let range = SourceRange::empty_at(0);
        let args = vec![Value::tuple(vec![Value::string("a"), Value::string("b")])];
        let result = StdFunction::Join.call(&ctx, "join", &args, range).unwrap();
        assert_eq!(result, Value::string("ab"));
    }

    #[test]
    fn rnd_advances_context_rng() {
        let ctx = Context::root();
        Context::reseed(&ctx, 1.0);
        let range = SourceRange::empty_at(0);
        let value = StdFunction::Rnd.call(&ctx, "rnd", &[], range).unwrap();
        assert_eq!(value, Value::Number(0.236_455_525_271_594_52));
    }
}
