//! Walks an AST against an [`EvaluationContext`](crate::context::Context) and produces a
//! [`Scene`] (spec §4.6).
//!
//! Dispatch for the standard library is split the way the corpus splits its own fixed
//! function surface: pure math/string functions live in [`crate::stdlib`], scope-mutating
//! properties and commands live in [`builtins`], and geometry-producing blocks live in
//! [`builders`] — three flat tables instead of one large one, mirroring the corpus's
//! `builtins/`-per-function and `modules/`-per-module split.

mod builders;
mod builtins;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashSet;

use crate::capability::SandboxPolicy;
use crate::context::{Context, ContextHandle, GeometryCategory, ScopeKind, Symbol};
use crate::delegate::EvaluationDelegate;
use crate::diagnostics::{ErrorKind, ShapeError, SourceRange};
use crate::parser::ast::{Definition, Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind, StringPart};
use crate::resource::{LimitedTracker, ResourceError, ResourceLimits, ResourceTracker};
use crate::scene::Scene;
use crate::stdlib::{self, StdFunction};
use crate::value::{RangeValue, Type, Value};

type EResult<T> = Result<T, ShapeError>;

/// Configuration for one evaluation run (spec §5 "Cancellation/timeout", §1 "sandbox
/// permission policy").
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    pub resource_limits: ResourceLimits,
    pub sandbox: SandboxPolicy,
}

/// The result of a successful evaluation: the scene plus any non-fatal diagnostics
/// (spec §7 "Warnings... are classified separately by the host").
#[derive(Debug, Clone, Default)]
pub struct EvalOutcome {
    pub scene: Scene,
    pub warnings: Vec<ShapeError>,
}

/// Parses and evaluates a whole source file in one call.
pub fn evaluate_source(source: &str, delegate: &dyn EvaluationDelegate, options: EvalOptions) -> EResult<EvalOutcome> {
    let program = crate::parser::parse(source)?;
    evaluate(&program, delegate, options)
}

/// Evaluates an already-parsed program (spec §3 "Lifecycle": parsed once, evaluated
/// against a fresh root context).
pub fn evaluate(program: &Program, delegate: &dyn EvaluationDelegate, options: EvalOptions) -> EResult<EvalOutcome> {
    let tracker: Box<dyn ResourceTracker> = Box::new(LimitedTracker::new(options.resource_limits));
    let evaluator = Evaluator {
        delegate,
        tracker,
        sandbox: options.sandbox,
        depth: Cell::new(0),
        imports_in_flight: RefCell::new(AHashSet::default()),
        resolving: RefCell::new(Vec::new()),
        warnings: RefCell::new(Vec::new()),
    };
    let root = Context::root();
    evaluator.eval_block(&root, &program.statements)?;
    let root_ref = root.borrow();
    let scene = Scene {
        root: root_ref.children.clone(),
        background_color: root_ref.background_color,
        background_texture: root_ref.background_texture.clone(),
        cameras: root_ref.children.iter().filter(|n| matches!(n.kind, crate::scene::GeometryKind::Camera(_))).cloned().collect(),
    };
    drop(root_ref);
    Ok(EvalOutcome { scene, warnings: evaluator.warnings.into_inner() })
}

/// The tree-walking evaluator. Holds everything that is constant for one evaluation run;
/// all per-scope mutable state lives in the [`Context`] tree instead (spec §9 "no global
/// mutable state").
pub(crate) struct Evaluator<'d> {
    pub delegate: &'d dyn EvaluationDelegate,
    tracker: Box<dyn ResourceTracker>,
    pub sandbox: SandboxPolicy,
    depth: Cell<usize>,
    imports_in_flight: RefCell<AHashSet<String>>,
    /// `(context pointer, symbol name)` pairs currently being lazily resolved, used to
    /// detect a `define` expression that (directly or transitively) reads itself (spec
    /// §4.7 `forwardReference`).
    resolving: RefCell<Vec<(usize, String)>>,
    warnings: RefCell<Vec<ShapeError>>,
}

impl<'d> Evaluator<'d> {
    fn push_warning(&self, range: SourceRange, kind: ErrorKind) {
        self.warnings.borrow_mut().push(ShapeError::new(range, kind));
    }

    fn check_cancelled(&self, range: SourceRange) -> EResult<()> {
        self.tracker.check_cancelled().map_err(|e| resource_error(e, range))
    }

    fn enter_call(&self, range: SourceRange) -> EResult<()> {
        self.tracker.check_recursion_depth(self.depth.get()).map_err(|e| resource_error(e, range))?;
        self.depth.set(self.depth.get() + 1);
        Ok(())
    }

    fn exit_call(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    // ---- statements ----

    /// Runs a list of statements directly in `ctx` (no new scope is pushed — callers
    /// that need a fresh scope create one first via [`Context::child`]).
    pub(crate) fn eval_block(&self, ctx: &ContextHandle, stmts: &[Stmt]) -> EResult<()> {
        for stmt in stmts {
            self.check_cancelled(stmt.range)?;
            self.eval_statement(ctx, stmt)?;
        }
        Ok(())
    }

    /// Like [`Self::eval_block`] but returns the value of a trailing bare expression
    /// statement, if the last statement is one (spec §4.6 "the last expression in the
    /// body" — used for function/number-returning block bodies).
    fn eval_block_with_tail(&self, ctx: &ContextHandle, stmts: &[Stmt]) -> EResult<Option<Value>> {
        if stmts.is_empty() {
            return Ok(None);
        }
        let (body, tail) = stmts.split_at(stmts.len() - 1);
        self.eval_block(ctx, body)?;
        match &tail[0].kind {
            StmtKind::Expression(expr) => Ok(Some(self.eval_expr(ctx, expr)?)),
            _ => {
                self.eval_statement(ctx, &tail[0])?;
                Ok(None)
            }
        }
    }

    fn eval_statement(&self, ctx: &ContextHandle, stmt: &Stmt) -> EResult<()> {
        match &stmt.kind {
            StmtKind::Command { name, args } => {
                let args_value = args.as_ref().map(|e| self.eval_expr(ctx, e)).transpose()?;
                let result = self.exec_call(ctx, name, args_value, None, stmt.range)?;
                self.settle_statement_value(ctx, result, stmt.range);
                Ok(())
            }
            StmtKind::BlockCall { name, args, body } => {
                let args_value = args.as_ref().map(|e| self.eval_expr(ctx, e)).transpose()?;
                let result = self.exec_call(ctx, name, args_value, Some(body), stmt.range)?;
                self.settle_statement_value(ctx, result, stmt.range);
                Ok(())
            }
            StmtKind::Define { name, definition } => {
                let symbol = match definition {
                    Definition::Expression(expr) => Symbol::Value(expr.clone()),
                    Definition::Block { parameters: Some(params), body } => Symbol::Function { params: params.clone(), body: body.clone() },
                    Definition::Block { parameters: None, body } => Symbol::Block { body: body.clone() },
                };
                Context::define(ctx, name.clone(), symbol);
                Ok(())
            }
            StmtKind::Option { name, default } => {
                let value = match ctx.borrow().options.get(name).cloned() {
                    Some(v) => v,
                    None => self.eval_expr(ctx, default)?,
                };
                Context::define(ctx, name.clone(), Symbol::Bound(value));
                Ok(())
            }
            StmtKind::ForLoop { index, source, body } => self.eval_for(ctx, index.as_deref(), source, body),
            StmtKind::If { cond, then_branch, else_ifs, else_branch } => self.eval_if(ctx, cond, then_branch, else_ifs, else_branch),
            StmtKind::Switch { subject, cases, else_branch } => self.eval_switch(ctx, subject, cases, else_branch),
            StmtKind::Expression(expr) => {
                let value = self.eval_expr(ctx, expr)?;
                self.settle_statement_value(ctx, Some(value), stmt.range);
                Ok(())
            }
            StmtKind::Import(expr) => {
                let value = self.eval_expr(ctx, expr)?;
                let name = value.as_string().ok_or_else(|| {
                    ShapeError::new(stmt.range, ErrorKind::TypeMismatch { for_: "import".to_owned(), index: Some(0), expected: "string".to_owned(), got: value.type_name() })
                })?;
                if let Some(geometry) = self.import_geometry(ctx, &name, stmt.range)? {
                    self.commit_value(ctx, geometry);
                }
                Ok(())
            }
        }
    }

    /// A bare statement's value is either committed to the scene (a produced geometry
    /// node) or flagged as unused (spec §4.7 `unusedValue`, a warning not a fatal error).
    fn settle_statement_value(&self, ctx: &ContextHandle, value: Option<Value>, range: SourceRange) {
        match value {
            None | Some(Value::Void) => {}
            Some(v @ Value::Mesh(_)) => self.commit_value(ctx, v),
            Some(other) => self.push_warning(range, ErrorKind::UnusedValue(other.type_name())),
        }
    }

    fn commit_value(&self, ctx: &ContextHandle, value: Value) {
        if let Value::Mesh(node) = value {
            Context::push_child(ctx, node);
        }
    }

    fn eval_for(&self, ctx: &ContextHandle, index: Option<&str>, source: &Expr, body: &[Stmt]) -> EResult<()> {
        let source_value = self.eval_expr(ctx, source)?;
        match source_value {
            Value::Range(range) => self.eval_for_range(ctx, index, range, body),
            other => {
                for element in other.elements() {
                    self.check_cancelled(source.range)?;
                    let iter_ctx = Context::child(ctx, ScopeKind::LoopIteration);
                    if let Some(name) = index {
                        Context::define(&iter_ctx, name.to_owned(), Symbol::Bound(element));
                    }
                    self.eval_block(&iter_ctx, body)?;
                    Self::splice_iteration(ctx, &iter_ctx);
                }
                Ok(())
            }
        }
    }

    /// Enumerates a numeric range by step, with tolerant end-inclusion (spec §4.6 "For",
    /// §9 "Numeric tolerance": `(to-from)/step` within `1e-9` of its rounded value).
    fn eval_for_range(&self, ctx: &ContextHandle, index: Option<&str>, range: RangeValue, body: &[Stmt]) -> EResult<()> {
        if range.step == 0.0 {
            return Err(ShapeError::new(SourceRange::default(), ErrorKind::StepMustBeNonzero));
        }
        let Some(to) = range.to else {
            return Ok(());
        };
        let raw_count = (to - range.from) / range.step;
        let count = if (raw_count - raw_count.round()).abs() <= 1e-9 { raw_count.round() } else { raw_count.floor() };
        if count < 0.0 {
            return Ok(());
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = count as u64;
        for i in 0..=steps {
            self.check_cancelled(SourceRange::default())?;
            #[allow(clippy::cast_precision_loss)]
            let value = range.from + range.step * i as f64;
            let iter_ctx = Context::child(ctx, ScopeKind::LoopIteration);
            if let Some(name) = index {
                Context::define(&iter_ctx, name.to_owned(), Symbol::Bound(Value::Number(value)));
            }
            self.eval_block(&iter_ctx, body)?;
            Self::splice_iteration(ctx, &iter_ctx);
        }
        Ok(())
    }

    /// Splices one loop iteration's produced children back into the parent (spec §4.5
    /// "a child context's produced geometry becomes one child of its parent"). RNG state
    /// is already shared by `Rc` (spec I6), so only children need explicit splicing.
    fn splice_iteration(ctx: &ContextHandle, iter_ctx: &ContextHandle) {
        let children = std::mem::take(&mut iter_ctx.borrow_mut().children);
        for child in children {
            Context::push_child(ctx, child);
        }
    }

    fn eval_if(&self, ctx: &ContextHandle, cond: &Expr, then_branch: &[Stmt], else_ifs: &[(Expr, Vec<Stmt>)], else_branch: &Option<Vec<Stmt>>) -> EResult<()> {
        if self.eval_bool(ctx, cond)? {
            return self.eval_block(ctx, then_branch);
        }
        for (cond, body) in else_ifs {
            if self.eval_bool(ctx, cond)? {
                return self.eval_block(ctx, body);
            }
        }
        if let Some(body) = else_branch {
            self.eval_block(ctx, body)?;
        }
        Ok(())
    }

    fn eval_bool(&self, ctx: &ContextHandle, expr: &Expr) -> EResult<bool> {
        let value = self.eval_expr(ctx, expr)?;
        value.as_boolean().ok_or_else(|| {
            ShapeError::new(expr.range, ErrorKind::TypeMismatch { for_: "if".to_owned(), index: None, expected: "boolean".to_owned(), got: value.type_name() })
        })
    }

    fn eval_switch(&self, ctx: &ContextHandle, subject: &Expr, cases: &[(Expr, Vec<Stmt>)], else_branch: &Option<Vec<Stmt>>) -> EResult<()> {
        let subject_value = self.eval_expr(ctx, subject)?;
        for (case_expr, body) in cases {
            let case_value = self.eval_expr(ctx, case_expr)?;
            if subject_value == case_value {
                return self.eval_block(ctx, body);
            }
        }
        if let Some(body) = else_branch {
            self.eval_block(ctx, body)?;
        }
        Ok(())
    }

    // ---- expressions ----

    pub(crate) fn eval_expr(&self, ctx: &ContextHandle, expr: &Expr) -> EResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::StringLiteral(s) => Ok(Value::string(s.clone())),
            ExprKind::ColorLiteral(c) => Ok(Value::Color(*c)),
            ExprKind::InterpolatedString(parts) => self.eval_interpolated_string(ctx, parts),
            ExprKind::Identifier(name) => self.resolve_identifier(ctx, name, expr.range),
            ExprKind::Member(base, name) => {
                let base_value = self.eval_expr(ctx, base)?;
                base_value.member(name).ok_or_else(|| {
                    let suggestion = crate::diagnostics::suggest_name(name, member_candidates(&base_value).iter().copied());
                    ShapeError::new(expr.range, ErrorKind::UnknownMember { name: name.clone(), of: base_value.type_name(), suggestion })
                })
            }
            ExprKind::Tuple(items) => {
                let values = items.iter().map(|item| self.eval_expr(ctx, item)).collect::<EResult<Vec<_>>>()?;
                Ok(Value::tuple(values))
            }
            ExprKind::Call(name, args) => self.eval_call_expr(ctx, name, args, expr.range),
            ExprKind::Infix(op, lhs, rhs) => self.eval_infix(ctx, *op, lhs, rhs, expr.range),
            ExprKind::Prefix(op, operand) => self.eval_prefix(ctx, *op, operand, expr.range),
            ExprKind::Range { from, to, step } => {
                let from = self.eval_number(ctx, from)?;
                let to = to.as_deref().map(|e| self.eval_number(ctx, e)).transpose()?;
                let step = match step {
                    Some(e) => self.eval_number(ctx, e)?,
                    None => 1.0,
                };
                if step == 0.0 {
                    return Err(ShapeError::new(expr.range, ErrorKind::StepMustBeNonzero));
                }
                Ok(Value::Range(RangeValue::new(from, to, step)))
            }
            ExprKind::In(value, range) => {
                let value = self.eval_number(ctx, value)?;
                let range_value = self.eval_expr(ctx, range)?;
                match range_value {
                    Value::Range(r) => Ok(Value::Boolean(r.contains(value))),
                    other => Err(ShapeError::new(range.range, ErrorKind::TypeMismatch { for_: "in".to_owned(), index: None, expected: "range".to_owned(), got: other.type_name() })),
                }
            }
            ExprKind::IfElse { cond, then_value, else_value } => {
                if self.eval_bool(ctx, cond)? {
                    self.eval_expr(ctx, then_value)
                } else {
                    self.eval_expr(ctx, else_value)
                }
            }
            ExprKind::Block(body) => {
                let child = Context::child(ctx, ScopeKind::Group);
                let tail = self.eval_block_with_tail(&child, body)?;
                Ok(builders::finish_block_body(&child, tail))
            }
        }
    }

    fn eval_number(&self, ctx: &ContextHandle, expr: &Expr) -> EResult<f64> {
        let value = self.eval_expr(ctx, expr)?;
        value.as_number().ok_or_else(|| {
            ShapeError::new(expr.range, ErrorKind::TypeMismatch { for_: "range".to_owned(), index: None, expected: "number".to_owned(), got: value.type_name() })
        })
    }

    fn eval_interpolated_string(&self, ctx: &ContextHandle, parts: &[StringPart]) -> EResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                StringPart::Literal(s) => out.push_str(s),
                StringPart::Expr(expr) => out.push_str(&self.eval_expr(ctx, expr)?.to_string()),
            }
        }
        Ok(Value::string(out))
    }

    /// Resolves a bare identifier (spec §4.6 "Identifier"): user symbols first (so a
    /// `define` can shadow a builtin name, spec I3), then stdlib constants, then
    /// property getters, then zero-argument builder blocks.
    fn resolve_identifier(&self, ctx: &ContextHandle, name: &str, range: SourceRange) -> EResult<Value> {
        if let Some(value) = self.resolve_user_symbol(ctx, name, range)? {
            return Ok(value);
        }
        if let Some(value) = stdlib::constant(name) {
            return Ok(value);
        }
        if let Some(value) = builtins::get_property(ctx, name) {
            return Ok(value);
        }
        if let Some(value) = self.exec_call(ctx, name, None, None, range)? {
            return Ok(value);
        }
        Err(self.unknown_symbol(ctx, name, range))
    }

    fn resolve_user_symbol(&self, ctx: &ContextHandle, name: &str, range: SourceRange) -> EResult<Option<Value>> {
        let Some((owner, symbol)) = Context::resolve(ctx, name) else {
            return Ok(None);
        };
        match symbol {
            Symbol::Bound(v) => Ok(Some(v)),
            Symbol::Value(expr) => self.eval_lazy_define(&owner, name, &expr, range).map(Some),
            Symbol::Function { params, body } => {
                if params.is_empty() {
                    self.call_user_function(ctx, name, &params, &body, &[], range).map(Some)
                } else {
                    Err(ShapeError::new(range, ErrorKind::MissingArgument { for_: name.to_owned(), index: 0, expected: format!("{} argument(s)", params.len()) }))
                }
            }
            Symbol::Block { body } => self.call_user_block(ctx, name, &body, &IndexMapDefault::default(), range).map(Some),
        }
    }

    /// Re-evaluates a lazily-bound `define` expression in its *defining* scope (spec
    /// §4.6 "Define (expression): lazy... re-evaluated on every read"), guarding against
    /// a self-referential definition (spec §4.7 `forwardReference`).
    fn eval_lazy_define(&self, owner: &ContextHandle, name: &str, expr: &Expr, range: SourceRange) -> EResult<Value> {
        let key = (Rc::as_ptr(owner) as usize, name.to_owned());
        if self.resolving.borrow().contains(&key) {
            return Err(ShapeError::new(range, ErrorKind::ForwardReference(name.to_owned())));
        }
        self.resolving.borrow_mut().push(key.clone());
        let result = self.eval_expr(owner, expr);
        self.resolving.borrow_mut().retain(|k| k != &key);
        result
    }

    fn eval_call_expr(&self, ctx: &ContextHandle, name: &str, args: &[Expr], range: SourceRange) -> EResult<Value> {
        if let Some((_, symbol)) = Context::resolve(ctx, name) {
            match symbol {
                Symbol::Function { params, body } => {
                    let arg_values = args.iter().map(|a| self.eval_expr(ctx, a)).collect::<EResult<Vec<_>>>()?;
                    return self.call_user_function(ctx, name, &params, &body, &arg_values, range);
                }
                Symbol::Bound(_) | Symbol::Value(_) | Symbol::Block { .. } => {
                    return Err(ShapeError::new(range, ErrorKind::TypeMismatch { for_: name.to_owned(), index: None, expected: "function".to_owned(), got: Type::Void }));
                }
            }
        }
        if let Ok(func) = name.parse::<StdFunction>() {
            if stdlib::function_names().any(|n| n == name) {
                let arg_values = args.iter().map(|a| self.eval_expr(ctx, a)).collect::<EResult<Vec<_>>>()?;
                return func.call(ctx, name, &arg_values, range);
            }
        }
        Err(self.unknown_symbol(ctx, name, range))
    }

    fn call_user_function(&self, ctx: &ContextHandle, name: &str, params: &[String], body: &[Stmt], args: &[Value], range: SourceRange) -> EResult<Value> {
        if args.len() > params.len() {
            return Err(ShapeError::new(range, ErrorKind::UnexpectedArgument { for_: name.to_owned(), max: params.len() }));
        }
        if args.len() < params.len() {
            return Err(ShapeError::new(range, ErrorKind::MissingArgument { for_: name.to_owned(), index: args.len(), expected: format!("{} argument(s)", params.len()) }));
        }
        self.enter_call(range)?;
        // Function bodies see only global symbols and run with independent RNG state,
        // but still splice produced children / material+transform side effects back
        // into the caller (spec §4.5 "Function body... may have a documented side
        // effect on the caller's context; this is deliberate and tested").
        let func_ctx = Context::child(ctx, ScopeKind::Function);
        for (param, value) in params.iter().zip(args) {
            Context::define(&func_ctx, param.clone(), Symbol::Bound(value.clone()));
        }
        let tail = self.eval_block_with_tail(&func_ctx, body);
        self.exit_call();
        let tail = tail?;
        Self::splice_iteration(ctx, &func_ctx);
        propagate_material_and_transform(ctx, &func_ctx);
        Ok(tail.unwrap_or(Value::Void))
    }

    /// Invokes a user-defined block (`Symbol::Block`) with the given already-resolved
    /// option overrides (spec §4.5 "block-definition body").
    fn call_user_block(&self, ctx: &ContextHandle, name: &str, body: &[Stmt], pending_options: &indexmap::IndexMap<String, Value>, range: SourceRange) -> EResult<Value> {
        self.enter_call(range)?;
        let block_ctx = Context::child(ctx, ScopeKind::BlockDefinition);
        block_ctx.borrow_mut().options = Rc::new(pending_options.clone());
        let tail = self.eval_block_with_tail(&block_ctx, body);
        self.exit_call();
        let tail = tail?;
        let result = builders::finish_block_body(&block_ctx, tail);
        if let Value::Mesh(_) = &result {
            // Child geometry stays attached to the node returned from `finish_block_body`
            // rather than being spliced into `ctx` — committing it there is the caller's
            // job (a bare block-call statement, or consumption via `extrude`/`group`/...).
        }
        Ok(result)
    }

    /// Invokes a user block with a call-site `{ ... }` body. Statements in that body
    /// that resolve to a real command run normally (so `color red` at a call site still
    /// mutates material/transform); statements whose name isn't otherwise recognized are
    /// instead captured as an option override (spec §4.5/§8 scenario 3: `foo { bar 6 }`).
    fn call_user_block_with_site_body(&self, ctx: &ContextHandle, name: &str, def_body: &[Stmt], site_body: &[Stmt], range: SourceRange) -> EResult<Value> {
        let site_ctx = Context::child(ctx, ScopeKind::Group);
        let mut pending_options = indexmap::IndexMap::new();
        for stmt in site_body {
            if let StmtKind::Command { name: cmd_name, args } = &stmt.kind {
                if !self.is_recognized_call_site(&site_ctx, cmd_name) {
                    let value = args.as_ref().map(|e| self.eval_expr(&site_ctx, e)).transpose()?.unwrap_or(Value::Void);
                    pending_options.insert(cmd_name.clone(), value);
                    continue;
                }
            }
            self.eval_statement(&site_ctx, stmt)?;
        }
        let block_ctx = Context::child(&site_ctx, ScopeKind::BlockDefinition);
        block_ctx.borrow_mut().options = Rc::new(pending_options);
        let tail = self.eval_block_with_tail(&block_ctx, def_body);
        let tail = tail?;
        let result = builders::finish_block_body(&block_ctx, tail);
        Self::splice_iteration(ctx, &site_ctx);
        let _ = name;
        Ok(result)
    }

    fn is_recognized_call_site(&self, ctx: &ContextHandle, name: &str) -> bool {
        Context::resolve(ctx, name).is_some() || stdlib::constant(name).is_some() || builtins::is_property_or_command(name) || builders::is_builder(name)
    }

    fn eval_infix(&self, ctx: &ContextHandle, op: InfixOp, lhs: &Expr, rhs: &Expr, range: SourceRange) -> EResult<Value> {
        if op == InfixOp::And {
            return Ok(Value::Boolean(self.eval_bool(ctx, lhs)? && self.eval_bool(ctx, rhs)?));
        }
        if op == InfixOp::Or {
            return Ok(Value::Boolean(self.eval_bool(ctx, lhs)? || self.eval_bool(ctx, rhs)?));
        }
        let lhs_value = self.eval_expr(ctx, lhs)?;
        let rhs_value = self.eval_expr(ctx, rhs)?;
        match op {
            InfixOp::Eq => Ok(Value::Boolean(lhs_value == rhs_value)),
            InfixOp::NotEq => Ok(Value::Boolean(lhs_value != rhs_value)),
            InfixOp::Lt | InfixOp::Le | InfixOp::Gt | InfixOp::Ge => self.eval_comparison(op, &lhs_value, &rhs_value, range),
            InfixOp::Add | InfixOp::Sub | InfixOp::Mul | InfixOp::Div | InfixOp::Rem => self.eval_arithmetic(ctx, op, &lhs_value, &rhs_value, range),
            InfixOp::And | InfixOp::Or => unreachable!("short-circuited above"),
        }
    }

    fn eval_comparison(&self, op: InfixOp, lhs: &Value, rhs: &Value, range: SourceRange) -> EResult<Value> {
        let (a, b) = match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(ShapeError::new(
                    range,
                    ErrorKind::TypeMismatch { for_: "comparison".to_owned(), index: None, expected: "number".to_owned(), got: lhs.type_name() },
                ));
            }
        };
        Ok(Value::Boolean(match op {
            InfixOp::Lt => a < b,
            InfixOp::Le => a <= b,
            InfixOp::Gt => a > b,
            InfixOp::Ge => a >= b,
            _ => unreachable!(),
        }))
    }

    /// Per-type infix arithmetic (spec §4.6 "Infix"): numbers arithmetic as usual with a
    /// sign-preserving `%`; strings concatenate via `+`; tuples combine element-wise,
    /// the shorter operand truncating the result; `tuple * number` / `texture * number`
    /// scale.
    fn eval_arithmetic(&self, ctx: &ContextHandle, op: InfixOp, lhs: &Value, rhs: &Value, range: SourceRange) -> EResult<Value> {
        match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(apply_numeric(op, *a, *b))),
            (Value::String(_), _) | (_, Value::String(_)) if op == InfixOp::Add => {
                Ok(Value::string(format!("{lhs}{rhs}")))
            }
            (Value::Texture(t), Value::Number(n)) if op == InfixOp::Mul => {
                Ok(Value::Texture(crate::value::Texture { file: t.file.clone(), intensity: t.intensity * n }))
            }
            (Value::Tuple(a), Value::Number(b)) if op == InfixOp::Mul || op == InfixOp::Div => {
                let items = a.iter().map(|v| self.eval_arithmetic(ctx, op, v, rhs, range)).collect::<EResult<Vec<_>>>()?;
                Ok(Value::tuple(items))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                let len = a.len().min(b.len());
                let items = (0..len).map(|i| self.eval_arithmetic(ctx, op, &a[i], &b[i], range)).collect::<EResult<Vec<_>>>()?;
                Ok(Value::tuple(items))
            }
            (Value::Vector(a), Value::Vector(b)) if matches!(op, InfixOp::Add | InfixOp::Sub) => {
                let sign = if op == InfixOp::Add { 1.0 } else { -1.0 };
                Ok(Value::Vector(crate::value::Vector3::new(a.x + sign * b.x, a.y + sign * b.y, a.z + sign * b.z)))
            }
            (Value::Vector(a), Value::Number(b)) if matches!(op, InfixOp::Mul | InfixOp::Div) => {
                let b = if op == InfixOp::Div { 1.0 / b } else { *b };
                Ok(Value::Vector(crate::value::Vector3::new(a.x * b, a.y * b, a.z * b)))
            }
            _ => match (lhs.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Number(apply_numeric(op, a, b))),
                _ => Err(ShapeError::new(range, ErrorKind::TypeMismatch { for_: infix_name(op).to_owned(), index: None, expected: "number".to_owned(), got: lhs.type_name() })),
            },
        }
    }

    fn eval_prefix(&self, ctx: &ContextHandle, op: PrefixOp, operand: &Expr, range: SourceRange) -> EResult<Value> {
        let value = self.eval_expr(ctx, operand)?;
        match op {
            PrefixOp::Not => {
                let b = value.as_boolean().ok_or_else(|| {
                    ShapeError::new(range, ErrorKind::TypeMismatch { for_: "not".to_owned(), index: None, expected: "boolean".to_owned(), got: value.type_name() })
                })?;
                Ok(Value::Boolean(!b))
            }
            PrefixOp::Pos => value
                .as_number()
                .map(Value::Number)
                .ok_or_else(|| ShapeError::new(range, ErrorKind::TypeMismatch { for_: "+".to_owned(), index: None, expected: "number".to_owned(), got: value.type_name() })),
            PrefixOp::Neg => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                Value::Vector(v) => Ok(Value::Vector(crate::value::Vector3::new(-v.x, -v.y, -v.z))),
                other => other
                    .as_number()
                    .map(|n| Value::Number(-n))
                    .ok_or_else(|| ShapeError::new(range, ErrorKind::TypeMismatch { for_: "-".to_owned(), index: None, expected: "number".to_owned(), got: other.type_name() })),
            },
        }
    }

    // ---- command/block dispatch (spec §4.4/§4.6 "Command invocation") ----

    /// Unified entry point for `Stmt::Command`/`Stmt::BlockCall` and for a bare builder
    /// identifier reference (body and args both optional). Tries, in order: a
    /// user-defined symbol shadowing `name`, then the builtin property/command table,
    /// then the builtin geometry-block table.
    fn exec_call(&self, ctx: &ContextHandle, name: &str, args_value: Option<Value>, body: Option<&[Stmt]>, range: SourceRange) -> EResult<Option<Value>> {
        if let Some((_, symbol)) = Context::resolve(ctx, name) {
            return match symbol {
                Symbol::Block { body: def_body } => match body {
                    Some(site_body) => self.call_user_block_with_site_body(ctx, name, &def_body, site_body, range).map(Some),
                    None => {
                        let opts = indexmap::IndexMap::new();
                        self.call_user_block(ctx, name, &def_body, &opts, range).map(Some)
                    }
                },
                Symbol::Function { params, body: fn_body } => {
                    let args = args_value.map(|v| v.elements()).unwrap_or_default();
                    self.call_user_function(ctx, name, &params, &fn_body, &args, range).map(Some)
                }
                Symbol::Bound(v) => {
                    if args_value.is_some() || body.is_some() {
                        return Err(ShapeError::new(range, ErrorKind::UnexpectedArgument { for_: name.to_owned(), max: 0 }));
                    }
                    Ok(Some(v))
                }
                Symbol::Value(expr) => {
                    if args_value.is_some() || body.is_some() {
                        return Err(ShapeError::new(range, ErrorKind::UnexpectedArgument { for_: name.to_owned(), max: 0 }));
                    }
                    let owner = Context::resolve(ctx, name).map(|(o, _)| o).unwrap_or_else(|| Rc::clone(ctx));
                    self.eval_lazy_define(&owner, name, &expr, range).map(Some)
                }
            };
        }
        if let Some(value) = builtins::dispatch(self, ctx, name, args_value.clone(), body, range)? {
            return Ok(Some(value));
        }
        builders::dispatch(self, ctx, name, args_value, body, range)
    }

    fn unknown_symbol(&self, ctx: &ContextHandle, name: &str, range: SourceRange) -> ShapeError {
        let mut candidates = Context::visible_names(ctx);
        candidates.extend(stdlib::function_names().map(str::to_owned));
        candidates.extend(builtins::property_and_command_names().map(str::to_owned));
        candidates.extend(builders::builder_names().map(str::to_owned));
        let suggestion = crate::diagnostics::suggest_name(name, candidates.iter().map(String::as_str));
        ShapeError::new(range, ErrorKind::UnknownSymbol { name: name.to_owned(), suggestion })
    }

    fn import_geometry(&self, ctx: &ContextHandle, name: &str, range: SourceRange) -> EResult<Option<Value>> {
        self.sandbox.check_path(name).map_err(|_| ShapeError::new(range, ErrorKind::FileAccessRestricted(name.to_owned())))?;
        let url = self.delegate.resolve_url(name).map_err(|e| delegate_error(e, range))?;
        if !self.imports_in_flight.borrow_mut().insert(url.clone()) {
            return Err(ShapeError::new(range, ErrorKind::ImportCycle(name.to_owned())));
        }
        let result = self.delegate.import_geometry(&url).map_err(|e| delegate_error(e, range));
        self.imports_in_flight.borrow_mut().remove(&url);
        let _ = ctx;
        result
    }
}

/// Splices a child context's material/transform mutations back into its caller (spec
/// §4.5 "Function body... may have a documented side effect on the caller's context").
fn propagate_material_and_transform(ctx: &ContextHandle, child: &ContextHandle) {
    let child_ref = child.borrow();
    let mut ctx_ref = ctx.borrow_mut();
    ctx_ref.material = child_ref.material.clone();
    ctx_ref.child_transform = child_ref.child_transform;
    ctx_ref.font = child_ref.font.clone();
    ctx_ref.background_color = child_ref.background_color;
    ctx_ref.background_texture = child_ref.background_texture.clone();
    ctx_ref.detail = child_ref.detail;
    ctx_ref.smoothing = child_ref.smoothing;
}

fn apply_numeric(op: InfixOp, a: f64, b: f64) -> f64 {
    match op {
        InfixOp::Add => a + b,
        InfixOp::Sub => a - b,
        InfixOp::Mul => a * b,
        InfixOp::Div => a / b,
        // Sign-preserving remainder with the dividend (spec §4.6 "tested matrix").
        InfixOp::Rem => a - b * (a / b).trunc(),
        _ => unreachable!(),
    }
}

fn infix_name(op: InfixOp) -> &'static str {
    match op {
        InfixOp::Add => "+",
        InfixOp::Sub => "-",
        InfixOp::Mul => "*",
        InfixOp::Div => "/",
        InfixOp::Rem => "%",
        InfixOp::Eq => "=",
        InfixOp::NotEq => "<>",
        InfixOp::Lt => "<",
        InfixOp::Le => "<=",
        InfixOp::Gt => ">",
        InfixOp::Ge => ">=",
        InfixOp::And => "and",
        InfixOp::Or => "or",
    }
}

fn member_candidates(value: &Value) -> &'static [&'static str] {
    match value {
        Value::Vector(_) | Value::Size(_) | Value::Rotation(_) => &["x", "y", "z", "width", "height", "depth", "roll", "yaw", "pitch"],
        Value::Color(_) => &["red", "green", "blue", "alpha"],
        Value::Path(_) => &["points", "subpaths", "closed", "bounds", "length"],
        Value::Mesh(_) => &["material", "name", "children", "bounds"],
        Value::Light(_) => &["color", "hasPosition", "hasOrientation"],
        Value::Material(_) => &["color", "texture", "opacity"],
        _ => &["count", "first", "second", "third"],
    }
}

fn resource_error(err: ResourceError, range: SourceRange) -> ShapeError {
    match err {
        ResourceError::Recursion { .. } => ShapeError::new(range, ErrorKind::TooMuchRecursion),
        ResourceError::Cancelled => ShapeError::new(range, ErrorKind::Cancelled),
    }
}

fn delegate_error(err: crate::delegate::DelegateError, range: SourceRange) -> ShapeError {
    use crate::delegate::DelegateError;
    match err {
        DelegateError::NotFound(name) => ShapeError::new(range, ErrorKind::FileNotFound(name)),
        DelegateError::AccessRestricted(name) => ShapeError::new(range, ErrorKind::FileAccessRestricted(name)),
        DelegateError::Other(msg) => ShapeError::new(range, ErrorKind::AssertionFailure(msg)),
    }
}

/// Small helper so `IndexMap::default()` doesn't need an explicit generic at call sites
/// scattered across this module.
struct IndexMapDefault;
impl IndexMapDefault {
    fn default() -> indexmap::IndexMap<String, Value> {
        indexmap::IndexMap::new()
    }
}

pub(crate) use builders::builder_names;
pub(crate) use builtins::property_and_command_names;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::delegate::{DelegateError, MeshLibrary};
    use std::cell::RefCell as StdRefCell;

    #[derive(Default)]
    struct TestDelegate {
        log: StdRefCell<Vec<String>>,
    }

    impl MeshLibrary for TestDelegate {
        fn is_watertight(&self, _node: &crate::scene::GeometryNode) -> bool {
            true
        }
        fn polygons(&self, _node: &crate::scene::GeometryNode) -> Vec<crate::scene::Polygon> {
            Vec::new()
        }
    }

    impl EvaluationDelegate for TestDelegate {
        fn resolve_url(&self, name: &str) -> Result<String, DelegateError> {
            Ok(name.to_owned())
        }
        fn import_geometry(&self, url: &str) -> Result<Option<Value>, DelegateError> {
            Err(DelegateError::NotFound(url.to_owned()))
        }
        fn debug_log(&self, values: &[Value]) {
            for v in values {
                self.log.borrow_mut().push(v.to_string());
            }
        }
    }

    fn run(source: &str) -> (EvalOutcome, TestDelegate) {
        let delegate = TestDelegate::default();
        let outcome = evaluate_source(source, &delegate, EvalOptions::default()).unwrap_or_else(|e| panic!("{source:?} failed: {e:?}"));
        (outcome, delegate)
    }

    #[test]
    fn color_then_sphere_produces_one_node_with_that_material() {
        let (outcome, _) = run("color 1 0 0\nsphere");
        assert_eq!(outcome.scene.root.len(), 1);
        assert_eq!(outcome.scene.root[0].material.color, Some(crate::value::Color::opaque(1.0, 0.0, 0.0)));
        assert_eq!(outcome.scene.root[0].type_name(), "sphere");
    }

    #[test]
    fn for_loop_prints_each_iteration() {
        let (_, delegate) = run("for i in 1 to 3 {\n  print i\n}");
        assert_eq!(*delegate.log.borrow(), vec!["1", "2", "3"]);
    }

    #[test]
    fn block_option_override_from_call_site() {
        let (_, delegate) = run("define foo {\n  option bar 5\n  print bar\n}\nfoo { bar 6 }\nfoo");
        assert_eq!(*delegate.log.borrow(), vec!["6", "5"]);
    }

    #[test]
    fn define_expression_member_access() {
        let (_, delegate) = run("define v 1 2 3\nprint v.y");
        assert_eq!(*delegate.log.borrow(), vec!["2"]);
    }

    #[test]
    fn extrude_of_a_mesh_is_a_type_mismatch() {
        let delegate = TestDelegate::default();
        let err = evaluate_source("extrude sphere", &delegate, EvalOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { got: Type::Mesh, .. }), "{err:?}");
    }

    #[test]
    fn fill_of_an_svgpath_has_four_points() {
        let (outcome, _) = run(r#"fill svgpath "M150 0 L75 200 225 200 Z""#);
        let node = &outcome.scene.root[0];
        match &node.kind {
            crate::scene::GeometryKind::Fill(paths) => {
                assert_eq!(paths[0].points.len(), 4);
            }
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_zero_iterations_when_n_less_than_one() {
        let (_, delegate) = run("for i in 1 to 0 {\n  print i\n}");
        assert!(delegate.log.borrow().is_empty());
    }

    #[test]
    fn rng_seed_one_prints_documented_constant() {
        let (_, delegate) = run("seed 1\nprint rnd");
        assert_eq!(delegate.log.borrow()[0], "0.23645552527159452");
    }

    #[test]
    fn assert_false_raises_assertion_failure() {
        let delegate = TestDelegate::default();
        let err = evaluate_source("assert 1 = 2", &delegate, EvalOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::AssertionFailure(_)));
    }

    #[test]
    fn color_and_texture_clear_each_other() {
        let (outcome, _) = run("texture \"wood.png\"\ncolor 1 0 0\nsphere");
        let material = &outcome.scene.root[0].material;
        assert!(material.color.is_some());
        assert!(material.texture.is_none());

        let (outcome, _) = run("color 1 0 0\ntexture \"wood.png\"\nsphere");
        let material = &outcome.scene.root[0].material;
        assert!(material.texture.is_some());
        assert!(material.color.is_none());
    }

    #[test]
    fn unknown_symbol_suggests_close_builtin_name() {
        let delegate = TestDelegate::default();
        let err = evaluate_source("spehre", &delegate, EvalOptions::default()).unwrap_err();
        match err.kind {
            ErrorKind::UnknownSymbol { suggestion, .. } => assert_eq!(suggestion.as_deref(), Some("sphere")),
            other => panic!("expected unknown symbol, got {other:?}"),
        }
    }
}
