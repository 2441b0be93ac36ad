//! `EvaluationContext` and the scope tree (spec §4.5).
//!
//! Scopes form a tree with strong child-to-parent back-links dropped when evaluation
//! returns (spec §9 "a child-to-parent strong ownership with commit-on-close is the
//! safest discipline") — there is no separate arena, since a ShapeScript scope owns
//! real geometry (not an interned heap object) and the tree's lifetime already matches
//! the evaluator's own call stack. This is a deliberate divergence from a bytecode VM's
//! slot-indexed, reuse-pooled namespace stack (no generator/coroutine suspension here to
//! save and resume, so there is nothing to pool): see `DESIGN.md`.

use std::cell::Cell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::parser::ast::{Expr, Stmt};
use crate::scene::{GeometryNode, Material, Path, PathPoint, Transform};
use crate::value::{Color, Texture, Value};

pub type ContextHandle = Rc<std::cell::RefCell<Context>>;

/// The kind of scope a [`Context`] represents (spec §4.5 "Scope kinds").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    /// A group, primitive, builder, or CSG body — accumulates children, commits
    /// a single node upward on close.
    Group,
    /// A block-definition body, running in a fresh child context per invocation.
    BlockDefinition,
    /// A function body: sees only global symbols, has isolated RNG state, but its
    /// material/transform mutations and produced children are spliced directly into
    /// the calling context (spec §4.5 "may have a documented side effect on the
    /// caller's context").
    Function,
    /// One iteration of a `for` loop body.
    LoopIteration,
}

impl ScopeKind {
    /// Human-readable context name used in "is not available in this context" errors
    /// (spec §4.4).
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Group => "group",
            Self::BlockDefinition => "block definition",
            Self::Function => "function definition",
            Self::LoopIteration => "loop",
        }
    }

    #[must_use]
    pub fn is_function(self) -> bool {
        matches!(self, Self::Function)
    }
}

/// What kind of geometry the nearest enclosing builder body is producing (spec §4.4
/// context-legal matrix: `point`/`curve` only in a path-producing scope, `smoothing`
/// only where meshes are produced, `texture` illegal in path/text/circle).
///
/// This is orthogonal to [`ScopeKind`]: a `sphere { ... }` body and a `circle { ... }`
/// body are both [`ScopeKind::Group`] scopes, but only one of them accepts `point`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryCategory {
    /// Root/plain-group scopes: no builder-specific restriction applies here.
    None,
    /// A path-producing builder body (`circle`, `square`, `path`, `arc`, `text`, ...).
    Path,
    /// A mesh-producing builder body (`cube`, `sphere`, `group`, a CSG op, ...).
    Mesh,
}

/// A named binding visible via the scope chain (spec §4.5 "symbols").
#[derive(Debug, Clone)]
pub enum Symbol {
    /// `define name expr` — re-evaluated on every read in the context that owns it
    /// (spec §4.6 "Define (expression)"), unless the evaluator chooses to memoize a
    /// pure literal.
    Value(Expr),
    /// `define name(params) {...}` — a function with an explicit (possibly empty)
    /// parameter list.
    Function { params: Vec<String>, body: Vec<Stmt> },
    /// `define name {...}` — a block without formal parameters (configured via
    /// `option` instead).
    Block { body: Vec<Stmt> },
    /// An already-resolved value: an `option` binding, a `for`-loop index variable, or
    /// a function parameter bound for one call.
    Bound(Value),
}

/// One scope in the evaluation tree (spec §4.5).
#[derive(Debug)]
pub struct Context {
    pub parent: Option<ContextHandle>,
    pub kind: ScopeKind,
    pub symbols: IndexMap<String, Symbol>,
    pub material: Material,
    pub transform: Transform,
    /// Pending translate/rotate/scale for the *next* child (spec "childTransform").
    pub child_transform: Transform,
    /// This scope's own placement, set directly by `position`/`orientation`/`size`
    /// (spec "set the current node's transform directly"), as opposed to
    /// `child_transform`'s relative, queued-for-the-next-child semantics.
    pub self_transform: Transform,
    pub font: Option<Rc<str>>,
    pub background_color: Option<Color>,
    pub background_texture: Option<Texture>,
    pub detail: u32,
    /// Smoothing threshold in half-turns; `None` means flat-shaded / no smoothing.
    pub smoothing: Option<f64>,
    pub random: Rc<Cell<u64>>,
    pub children: Vec<Rc<GeometryNode>>,
    pub name: Option<String>,
    pub debug: bool,
    /// The caller's argument map for a block invocation (spec §4.5 "options"), read by
    /// `option` statements in the block's own body. Empty outside a block invocation.
    pub options: Rc<IndexMap<String, Value>>,
    /// Points accumulated by `point`/`curve` commands inside a `path { ... }` body.
    /// Never inherited from the parent — reset fresh on every [`Context::child`] call.
    pub path_points: Vec<PathPoint>,
    /// What kind of geometry this scope's builder body is producing (spec §4.4
    /// context-legal matrix). Never inherited — each builder call sets its own.
    pub category: GeometryCategory,
}

/// Default mesh tessellation detail (segments-per-circle) when nothing overrides it.
pub const DEFAULT_DETAIL: u32 = 16;

impl Context {
    /// Builds the program's single root scope.
    #[must_use]
    pub fn root() -> ContextHandle {
        Rc::new(std::cell::RefCell::new(Self {
            parent: None,
            kind: ScopeKind::Root,
            symbols: IndexMap::new(),
            material: Material::with_default_opacity(),
            transform: Transform::default(),
            child_transform: Transform::default(),
            self_transform: Transform::default(),
            font: None,
            background_color: None,
            background_texture: None,
            detail: DEFAULT_DETAIL,
            smoothing: None,
            random: Rc::new(Cell::new(INITIAL_SEED)),
            children: Vec::new(),
            name: None,
            debug: false,
            options: Rc::new(IndexMap::new()),
            path_points: Vec::new(),
            category: GeometryCategory::None,
        }))
    }

    /// Creates a child scope inheriting by value from `parent` (spec invariant I2).
    ///
    /// RNG state is shared by reference with `parent` except when `kind` is
    /// [`ScopeKind::Function`], in which case the child gets an independent copy of
    /// the current seed (spec I6 "entering a function body does not" propagate RNG
    /// changes back to the parent).
    #[must_use]
    pub fn child(parent: &ContextHandle, kind: ScopeKind) -> ContextHandle {
        let p = parent.borrow();
        let random = if kind.is_function() {
            Rc::new(Cell::new(p.random.get()))
        } else {
            Rc::clone(&p.random)
        };
        // Symbol visibility: function bodies see only the root's global symbols, not
        // caller locals (spec "inherits only global symbols"). Every other scope kind
        // shadows through the normal lexical chain.
        let symbol_parent = if kind.is_function() { root_of(parent) } else { Rc::clone(parent) };
        Rc::new(std::cell::RefCell::new(Self {
            parent: Some(symbol_parent),
            kind,
            symbols: IndexMap::new(),
            material: p.material.clone(),
            transform: p.transform,
            child_transform: Transform::default(),
            self_transform: Transform::default(),
            font: p.font.clone(),
            background_color: p.background_color,
            background_texture: p.background_texture.clone(),
            detail: p.detail,
            smoothing: p.smoothing,
            random,
            children: Vec::new(),
            name: None,
            debug: false,
            options: Rc::new(IndexMap::new()),
            path_points: Vec::new(),
            category: GeometryCategory::None,
        }))
    }

    /// Marks this scope as producing `category`-kind geometry (spec §4.4 context-legal
    /// matrix), so nested `point`/`curve`/`smoothing`/`texture` checks can read it back.
    pub fn set_category(this: &ContextHandle, category: GeometryCategory) {
        this.borrow_mut().category = category;
    }

    /// Looks up `name` in this scope or any ancestor (spec §4.6 "Identifier").
    /// Returns the owning context alongside the symbol so a lazy `define` is
    /// re-evaluated using the environment it was declared in.
    #[must_use]
    pub fn resolve(this: &ContextHandle, name: &str) -> Option<(ContextHandle, Symbol)> {
        let mut current = Rc::clone(this);
        loop {
            let next = {
                let ctx = current.borrow();
                if let Some(sym) = ctx.symbols.get(name) {
                    return Some((Rc::clone(&current), sym.clone()));
                }
                ctx.parent.clone()
            };
            current = next?;
        }
    }

    /// All symbol names visible from `this`, innermost first — used to power
    /// "Did you mean" suggestions (spec §4.7).
    #[must_use]
    pub fn visible_names(this: &ContextHandle) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = Some(Rc::clone(this));
        while let Some(ctx) = current {
            let ctx = ctx.borrow();
            names.extend(ctx.symbols.keys().cloned());
            current = ctx.parent.clone();
        }
        names
    }

    /// Defines or shadows a symbol in this exact scope (spec I3 "a nested scope
    /// shadows outer").
    pub fn define(this: &ContextHandle, name: String, symbol: Symbol) {
        this.borrow_mut().symbols.insert(name, symbol);
    }

    /// Advances this scope's RNG seed and returns the next value in `[0, 1)` (spec
    /// §4.6 "Random-number contract": a documented LCG, seed truncated to 2^53 on
    /// ingest). Constants are the Numerical-Recipes LCG parameters, chosen because
    /// they reproduce the documented `seed 1; print rnd` output exactly (spec §8); see
    /// `DESIGN.md`.
    #[must_use]
    pub fn next_random(this: &ContextHandle) -> f64 {
        let cell = Rc::clone(&this.borrow().random);
        let seed = cell.get();
        let next = (seed.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT)) & 0xFFFF_FFFF;
        cell.set(next);
        next as f64 / 4_294_967_296.0
    }

    /// Reseeds this scope's RNG (spec "`seed n` resets the current context").
    pub fn reseed(this: &ContextHandle, seed: f64) {
        // Truncate to 2^53 on ingest (spec §4.6).
        let truncated = (seed.max(0.0) as u64) & ((1u64 << 53) - 1);
        this.borrow().random.set(truncated & 0xFFFF_FFFF);
    }

    /// Appends `node` as a child of this scope, to be committed upward on close
    /// (spec §4.5 "Commit rules").
    pub fn push_child(this: &ContextHandle, node: Rc<GeometryNode>) {
        this.borrow_mut().children.push(node);
    }

    /// Appends a point to a `path { ... }` body's accumulating point list.
    pub fn push_point(this: &ContextHandle, point: PathPoint) {
        this.borrow_mut().path_points.push(point);
    }
}

const LCG_MULTIPLIER: u64 = 1_664_525;
const LCG_INCREMENT: u64 = 1_013_904_223;
/// Seed used only to initialize the root scope before any `seed` command runs;
/// `rnd` is untested without an explicit seed, so this value is arbitrary.
const INITIAL_SEED: u64 = 0;

fn root_of(ctx: &ContextHandle) -> ContextHandle {
    let mut current = Rc::clone(ctx);
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::diagnostics::SourceRange;
    use crate::parser::ast::ExprKind;

    fn dummy_expr() -> Expr {
        Expr::new(ExprKind::Number(1.0), SourceRange::empty_at(0))
    }

    #[test]
    fn seed_one_reproduces_documented_rnd_constant() {
        let root = Context::root();
        Context::reseed(&root, 1.0);
        let value = Context::next_random(&root);
        assert!((value - 0.236_455_525_271_594_52).abs() < 1e-15, "got {value}");
    }

    #[test]
    fn rng_advance_in_child_group_propagates_to_parent() {
        let root = Context::root();
        Context::reseed(&root, 1.0);
        let child = Context::child(&root, ScopeKind::Group);
        let _ = Context::next_random(&child);
        assert_eq!(root.borrow().random.get(), child.borrow().random.get());
    }

    #[test]
    fn rng_advance_in_function_body_does_not_propagate() {
        let root = Context::root();
        Context::reseed(&root, 1.0);
        let before = root.borrow().random.get();
        let func = Context::child(&root, ScopeKind::Function);
        let _ = Context::next_random(&func);
        assert_eq!(root.borrow().random.get(), before);
    }

    #[test]
    fn nested_scope_shadows_outer_symbol() {
        let root = Context::root();
        Context::define(&root, "x".to_owned(), Symbol::Value(dummy_expr()));
        let child = Context::child(&root, ScopeKind::Group);
        Context::define(&child, "x".to_owned(), Symbol::Bound(Value::Number(2.0)));
        let (_, sym) = Context::resolve(&child, "x").unwrap();
        assert!(matches!(sym, Symbol::Bound(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn function_body_only_sees_global_symbols() {
        let root = Context::root();
        Context::define(&root, "g".to_owned(), Symbol::Bound(Value::Number(7.0)));
        let group = Context::child(&root, ScopeKind::Group);
        Context::define(&group, "local".to_owned(), Symbol::Bound(Value::Number(3.0)));
        let func = Context::child(&group, ScopeKind::Function);
        assert!(Context::resolve(&func, "g").is_some());
        assert!(Context::resolve(&func, "local").is_none());
    }

    #[test]
    fn material_inherits_by_value_and_does_not_mutate_parent() {
        let root = Context::root();
        let child = Context::child(&root, ScopeKind::Group);
        child.borrow_mut().material.color = Some(Color::opaque(1.0, 0.0, 0.0));
        assert!(root.borrow().material.color.is_none());
    }
}
