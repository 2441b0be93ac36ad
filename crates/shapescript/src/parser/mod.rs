//! Tokens to AST (spec §4.2): recursive-descent, one error reported (no recovery, spec
//! §9 "no recovery").

pub mod ast;

use crate::diagnostics::{ErrorKind, ShapeError, SourceRange};
use crate::lexer::{Keyword, Lexer, StringSegment, Symbol, Token, TokenKind};

pub use ast::*;

type PResult<T> = Result<T, ShapeError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Lexes and parses a whole source file in one call.
    pub fn parse_source(source: &str) -> PResult<Program> {
        Self::new(Lexer::tokenize(source)).parse_program()
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        self.skip_newlines();
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Program { statements })
    }

    // ---- token stream helpers ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn check_symbol(&self, sym: Symbol) -> bool {
        matches!(self.peek_kind(), TokenKind::Symbol(s) if *s == sym)
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_symbol(&mut self, sym: Symbol) -> bool {
        if self.check_symbol(sym) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, sym: Symbol) -> PResult<Token> {
        if self.check_symbol(sym) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(sym.as_str()))
        }
    }

    fn unexpected(&self, expected: &str) -> ShapeError {
        let tok = self.peek();
        ShapeError::new(
            tok.range,
            ErrorKind::UnexpectedToken {
                actual: tok.describe(),
                expected: expected.to_owned(),
            },
        )
    }

    fn identifier_name(&mut self) -> PResult<(String, SourceRange)> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let range = self.peek().range;
                self.advance();
                Ok((name, range))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// Whether the current token can begin a new primary expression — used to detect
    /// juxtaposition-tuple continuations and to decide if a command has an argument.
    fn can_start_expression(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::HexColor(_)
                | TokenKind::Identifier(_)
                | TokenKind::Symbol(Symbol::LParen)
                | TokenKind::Symbol(Symbol::Minus)
                | TokenKind::Symbol(Symbol::Plus)
                | TokenKind::Keyword(Keyword::Not)
                | TokenKind::Keyword(Keyword::If)
        )
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> PResult<Stmt> {
        let start = self.peek().range;
        let kind = match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Define) => self.parse_define()?,
            TokenKind::Keyword(Keyword::Option) => self.parse_option()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch()?,
            TokenKind::Keyword(Keyword::Import) => {
                self.advance();
                StmtKind::Import(self.parse_expression()?)
            }
            TokenKind::Identifier(_) => self.parse_command_or_block_call()?,
            _ => StmtKind::Expression(self.parse_expression()?),
        };
        let end = self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)].range;
        Ok(Stmt::new(kind, start.join(end)))
    }

    fn parse_statement_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_symbol(Symbol::LBrace)?;
        self.skip_newlines();
        let mut statements = Vec::new();
        while !self.check_symbol(Symbol::RBrace) && !self.at_eof() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect_symbol(Symbol::RBrace)?;
        Ok(statements)
    }

    fn parse_define(&mut self) -> PResult<StmtKind> {
        self.advance(); // 'define'
        let (name, _) = self.identifier_name()?;

        let parameters = if self.check_symbol(Symbol::LParen) {
            self.advance();
            let mut params = Vec::new();
            while matches!(self.peek_kind(), TokenKind::Identifier(_)) {
                let (param, range) = self.identifier_name()?;
                if params.contains(&param) {
                    return Err(ShapeError::new(range, ErrorKind::DuplicateParameter(param)));
                }
                params.push(param);
            }
            self.expect_symbol(Symbol::RParen)?;
            Some(params)
        } else {
            None
        };

        let definition = if self.check_symbol(Symbol::LBrace) {
            let body = self.parse_statement_block()?;
            Definition::Block { parameters, body }
        } else {
            Definition::Expression(self.parse_expression()?)
        };
        Ok(StmtKind::Define { name, definition })
    }

    fn parse_option(&mut self) -> PResult<StmtKind> {
        self.advance(); // 'option'
        let (name, _) = self.identifier_name()?;
        let default = self.parse_expression()?;
        Ok(StmtKind::Option { name, default })
    }

    fn parse_for(&mut self) -> PResult<StmtKind> {
        self.advance(); // 'for'
        let index = if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            // `for i in ...` vs a bare `for <range>` with no index variable: only
            // consume the identifier as an index if it is immediately followed by `in`.
            let save = self.pos;
            self.advance();
            if self.check_keyword(Keyword::In) {
                self.advance();
                Some(name)
            } else {
                self.pos = save;
                None
            }
        } else {
            None
        };
        let source = self.parse_expression()?;
        let body = self.parse_statement_block()?;
        Ok(StmtKind::ForLoop { index, source, body })
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.advance(); // 'if'
        let cond = self.parse_expression()?;
        let then_branch = self.parse_statement_block()?;
        let mut else_ifs = Vec::new();
        let mut else_branch = None;
        loop {
            let save = self.pos;
            self.skip_newlines();
            if !self.eat_keyword(Keyword::Else) {
                self.pos = save;
                break;
            }
            if self.eat_keyword(Keyword::If) {
                let cond = self.parse_expression()?;
                let body = self.parse_statement_block()?;
                else_ifs.push((cond, body));
            } else {
                else_branch = Some(self.parse_statement_block()?);
                break;
            }
        }
        Ok(StmtKind::If { cond, then_branch, else_ifs, else_branch })
    }

    fn parse_switch(&mut self) -> PResult<StmtKind> {
        self.advance(); // 'switch'
        let subject = self.parse_expression()?;
        self.expect_symbol(Symbol::LBrace)?;
        self.skip_newlines();
        let mut cases = Vec::new();
        let mut else_branch = None;
        while !self.check_symbol(Symbol::RBrace) && !self.at_eof() {
            if self.eat_keyword(Keyword::Case) {
                let value = self.parse_expression()?;
                let body = self.parse_statement_block()?;
                cases.push((value, body));
            } else if self.eat_keyword(Keyword::Else) {
                else_branch = Some(self.parse_statement_block()?);
            } else {
                return Err(self.unexpected("'case' or 'else'"));
            }
            self.skip_newlines();
        }
        self.expect_symbol(Symbol::RBrace)?;
        Ok(StmtKind::Switch { subject, cases, else_branch })
    }

    fn parse_command_or_block_call(&mut self) -> PResult<StmtKind> {
        let (name, _) = self.identifier_name()?;

        // `name(args)` is an expression-level function call, not a bare command.
        if self.check_symbol(Symbol::LParen) {
            let call = self.parse_call_tail(name)?;
            let expr = self.parse_infix_continuation(call)?;
            return Ok(StmtKind::Expression(expr));
        }

        let args = if self.check_symbol(Symbol::LBrace) || matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
            None
        } else if self.can_start_expression() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        if self.check_symbol(Symbol::LBrace) {
            let body = self.parse_statement_block()?;
            Ok(StmtKind::BlockCall { name, args, body })
        } else {
            Ok(StmtKind::Command { name, args })
        }
    }

    // ---- expressions (spec §4.2 precedence table) ----
    //
    // Juxtaposition is parsed as the outermost layer: each tuple element is itself a
    // full `or`-level expression, and elements are joined while the next token can
    // start a new primary. This is a deliberate simplification of the source table's
    // placement of tuple-construction above arithmetic — see DESIGN.md.

    pub fn parse_expression(&mut self) -> PResult<Expr> {
        let first = self.parse_or()?;
        if !self.can_start_expression() {
            return Ok(first);
        }
        let start = first.range;
        let mut elements = vec![first];
        while self.can_start_expression() {
            elements.push(self.parse_or()?);
        }
        let end = elements.last().unwrap().range;
        Ok(Expr::new(ExprKind::Tuple(elements), start.join(end)))
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let rhs = self.parse_and()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(InfixOp::Or, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let rhs = self.parse_not()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(InfixOp::And, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.check_keyword(Keyword::Not) {
            let start = self.advance().range;
            let operand = self.parse_not()?;
            let range = start.join(operand.range);
            return Ok(Expr::new(ExprKind::Prefix(PrefixOp::Not, Box::new(operand)), range));
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = if self.check_symbol(Symbol::Eq) {
                InfixOp::Eq
            } else if self.check_symbol(Symbol::NotEq) {
                InfixOp::NotEq
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_in()?;
        loop {
            let op = if self.check_symbol(Symbol::Lt) {
                InfixOp::Lt
            } else if self.check_symbol(Symbol::Le) {
                InfixOp::Le
            } else if self.check_symbol(Symbol::Gt) {
                InfixOp::Gt
            } else if self.check_symbol(Symbol::Ge) {
                InfixOp::Ge
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_in()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_in(&mut self) -> PResult<Expr> {
        let lhs = self.parse_range()?;
        if self.eat_keyword(Keyword::In) {
            let rhs = self.parse_range()?;
            let range = lhs.range.join(rhs.range);
            return Ok(Expr::new(ExprKind::In(Box::new(lhs), Box::new(rhs)), range));
        }
        Ok(lhs)
    }

    fn parse_range(&mut self) -> PResult<Expr> {
        let from = self.parse_additive()?;
        if !self.check_keyword(Keyword::To) {
            return Ok(from);
        }
        self.advance();
        let to = self.parse_additive()?;
        let step = if self.eat_keyword(Keyword::Step) { Some(Box::new(self.parse_additive()?)) } else { None };
        let end = step.as_deref().map_or(to.range, |s| s.range);
        let range = from.range.join(end);
        Ok(Expr::new(
            ExprKind::Range {
                from: Box::new(from),
                to: Some(Box::new(to)),
                step,
            },
            range,
        ))
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = if self.check_symbol(Symbol::Plus) {
                InfixOp::Add
            } else if self.check_symbol(Symbol::Minus) {
                InfixOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.check_symbol(Symbol::Star) {
                InfixOp::Mul
            } else if self.check_symbol(Symbol::Slash) {
                InfixOp::Div
            } else if self.check_symbol(Symbol::Percent) {
                InfixOp::Rem
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = if self.check_symbol(Symbol::Minus) {
            Some(PrefixOp::Neg)
        } else if self.check_symbol(Symbol::Plus) {
            Some(PrefixOp::Pos)
        } else {
            None
        };
        if let Some(op) = op {
            let start = self.advance().range;
            let operand = self.parse_unary()?;
            let range = start.join(operand.range);
            return Ok(Expr::new(ExprKind::Prefix(op, Box::new(operand)), range));
        }
        self.parse_postfix()
    }

    /// Continues parsing infix/postfix operators onto an already-parsed primary — used
    /// when a statement begins with a `name(args)` function call and must still allow
    /// `.member` / arithmetic continuations.
    fn parse_infix_continuation(&mut self, primary: Expr) -> PResult<Expr> {
        let postfixed = self.parse_postfix_continuation(primary)?;
        // Re-enter the precedence chain one level below `*` so `f(x) + 1` still works;
        // full operator support after a statement-level call is rare but cheap to allow.
        let mut lhs = postfixed;
        loop {
            let op = if self.check_symbol(Symbol::Star) {
                InfixOp::Mul
            } else if self.check_symbol(Symbol::Slash) {
                InfixOp::Div
            } else if self.check_symbol(Symbol::Plus) {
                InfixOp::Add
            } else if self.check_symbol(Symbol::Minus) {
                InfixOp::Sub
            } else {
                break;
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            let range = lhs.range.join(rhs.range);
            lhs = Expr::new(ExprKind::Infix(op, Box::new(lhs), Box::new(rhs)), range);
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let primary = self.parse_primary()?;
        self.parse_postfix_continuation(primary)
    }

    fn parse_postfix_continuation(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            if self.eat_symbol(Symbol::Dot) {
                let (name, name_range) = self.identifier_name()?;
                let range = expr.range.join(name_range);
                expr = Expr::new(ExprKind::Member(Box::new(expr), name), range);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_tail(&mut self, name: String) -> PResult<Expr> {
        let start = self.peek().range;
        self.advance(); // '('
        let mut args = Vec::new();
        self.skip_newlines();
        while self.can_start_expression() {
            args.push(self.parse_or()?);
            self.skip_newlines();
        }
        self.skip_newlines();
        let end = self.expect_symbol(Symbol::RParen)?.range;
        Ok(Expr::new(ExprKind::Call(name, args), start.join(end)))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(n), token.range))
            }
            TokenKind::HexColor(c) => {
                self.advance();
                Ok(Expr::new(ExprKind::ColorLiteral(c), token.range))
            }
            TokenKind::String(lit) => {
                self.advance();
                self.build_string_expr(&lit, token.range)
            }
            TokenKind::Symbol(Symbol::LParen) => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                let end = self.expect_symbol(Symbol::RParen)?.range;
                Ok(Expr::new(inner.kind, token.range.join(end)))
            }
            TokenKind::Symbol(Symbol::LBrace) => {
                let body = self.parse_statement_block()?;
                Ok(Expr::new(ExprKind::Block(body), token.range))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_expr(),
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                let operand = self.parse_unary()?;
                let range = token.range.join(operand.range);
                Ok(Expr::new(ExprKind::Prefix(PrefixOp::Not, Box::new(operand)), range))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check_symbol(Symbol::LParen) {
                    self.parse_call_tail(name)
                } else {
                    Ok(Expr::new(ExprKind::Identifier(name), token.range))
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_if_expr(&mut self) -> PResult<Expr> {
        let start = self.advance().range; // 'if'
        let cond = self.parse_or()?;
        let then_value = self.parse_or()?;
        if !self.eat_keyword(Keyword::Else) {
            return Err(self.unexpected("'else'"));
        }
        let else_value = self.parse_or()?;
        let range = start.join(else_value.range);
        Ok(Expr::new(
            ExprKind::IfElse {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            range,
        ))
    }

    fn build_string_expr(&self, lit: &crate::lexer::StringLiteral, range: SourceRange) -> PResult<Expr> {
        if let Some(text) = lit.plain_text() {
            return Ok(Expr::new(ExprKind::StringLiteral(text.to_owned()), range));
        }
        let mut parts = Vec::with_capacity(lit.segments.len());
        for segment in &lit.segments {
            match segment {
                StringSegment::Literal(s) => parts.push(StringPart::Literal(s.clone())),
                StringSegment::Expr(tokens) => {
                    let mut sub = Parser::new(tokens.clone());
                    let expr = sub.parse_expression()?;
                    parts.push(StringPart::Expr(expr));
                }
            }
        }
        Ok(Expr::new(ExprKind::InterpolatedString(parts), range))
    }
}

/// Convenience entry point mirroring [`Parser::parse_source`].
pub fn parse(source: &str) -> PResult<Program> {
    Parser::parse_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        parse(source).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e:?}"))
    }

    #[test]
    fn parses_simple_command() {
        let program = parse_ok("color 1 0 0\nsphere");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0].kind {
            StmtKind::Command { name, args } => {
                assert_eq!(name, "color");
                assert!(matches!(args.as_ref().unwrap().kind, ExprKind::Tuple(_)));
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn parses_block_call_with_body() {
        let program = parse_ok("sphere {\n  color red\n}");
        match &program.statements[0].kind {
            StmtKind::BlockCall { name, body, .. } => {
                assert_eq!(name, "sphere");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected block call, got {other:?}"),
        }
    }

    #[test]
    fn parses_define_expression() {
        let program = parse_ok("define v 1 2 3");
        match &program.statements[0].kind {
            StmtKind::Define { name, definition } => {
                assert_eq!(name, "v");
                match definition {
                    Definition::Expression(expr) => assert!(matches!(expr.kind, ExprKind::Tuple(_))),
                    other => panic!("expected expression definition, got {other:?}"),
                }
            }
            other => panic!("expected define, got {other:?}"),
        }
    }

    #[test]
    fn parses_define_function_with_params() {
        let program = parse_ok("define square(x) {\n  x * x\n}");
        match &program.statements[0].kind {
            StmtKind::Define { definition: Definition::Block { parameters, .. }, .. } => {
                assert_eq!(parameters.as_deref(), Some(["x".to_owned()].as_slice()));
            }
            other => panic!("expected function definition, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_loop() {
        let program = parse_ok("for i in 1 to 3 {\n  print i\n}");
        match &program.statements[0].kind {
            StmtKind::ForLoop { index, .. } => assert_eq!(index.as_deref(), Some("i")),
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn parses_member_access() {
        let program = parse_ok("print v.y");
        match &program.statements[0].kind {
            StmtKind::Command { args: Some(expr), .. } => {
                assert!(matches!(expr.kind, ExprKind::Member(_, _)));
            }
            other => panic!("expected command with member access, got {other:?}"),
        }
    }

    #[test]
    fn member_access_binds_tighter_than_arithmetic() {
        let program = parse_ok("print v.y + 1");
        match &program.statements[0].kind {
            StmtKind::Command { args: Some(expr), .. } => match &expr.kind {
                ExprKind::Infix(InfixOp::Add, lhs, _) => assert!(matches!(lhs.kind, ExprKind::Member(_, _))),
                other => panic!("expected infix add, got {other:?}"),
            },
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn and_binds_looser_than_comparison() {
        let program = parse_ok("print 1 < 2 and 3 > 2");
        match &program.statements[0].kind {
            StmtKind::Command { args: Some(expr), .. } => {
                assert!(matches!(expr.kind, ExprKind::Infix(InfixOp::And, _, _)));
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn range_with_step() {
        let program = parse_ok("define r 0 to 1 step 0.2");
        match &program.statements[0].kind {
            StmtKind::Define { definition: Definition::Expression(expr), .. } => {
                assert!(matches!(expr.kind, ExprKind::Range { step: Some(_), .. }));
            }
            other => panic!("expected range definition, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_parameter_is_an_error() {
        let err = parse("define f(x x) {\n}").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateParameter(name) if name == "x"));
    }

    #[test]
    fn interpolated_string_parses_embedded_expression() {
        let program = parse_ok(r#"print "a\(1 + 1)b""#);
        match &program.statements[0].kind {
            StmtKind::Command { args: Some(expr), .. } => match &expr.kind {
                ExprKind::InterpolatedString(parts) => assert_eq!(parts.len(), 3),
                other => panic!("expected interpolated string, got {other:?}"),
            },
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn if_else_statement_with_elseif() {
        let program = parse_ok("if 1 > 0 {\n  print 1\n} else if 1 < 0 {\n  print 2\n} else {\n  print 3\n}");
        match &program.statements[0].kind {
            StmtKind::If { else_ifs, else_branch, .. } => {
                assert_eq!(else_ifs.len(), 1);
                assert!(else_branch.is_some());
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn extrude_sphere_parses_as_command_with_identifier_arg() {
        let program = parse_ok("extrude sphere");
        match &program.statements[0].kind {
            StmtKind::Command { name, args: Some(arg) } => {
                assert_eq!(name, "extrude");
                assert!(matches!(arg.kind, ExprKind::Identifier(ref s) if s == "sphere"));
            }
            other => panic!("expected command, got {other:?}"),
        }
    }
}
