use super::ast::{
    BinaryOp, Decl, DeclKind, Expr, ExprKind, FexprDecl, IndexSel, Module, Param, PrintArg, Stmt,
    StmtKind, UnaryOp,
};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use crate::types::Type;

/// Recursive-descent parser for VectorL modules
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

/// Binding power of a binary operator token, loosest first
fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::Pipe => (BinaryOp::BitOr, 3),
        TokenKind::Caret => (BinaryOp::BitXor, 4),
        TokenKind::Amp => (BinaryOp::BitAnd, 5),
        TokenKind::EqEq => (BinaryOp::Eq, 6),
        TokenKind::NotEq => (BinaryOp::Ne, 6),
        TokenKind::Lt => (BinaryOp::Lt, 7),
        TokenKind::LtEq => (BinaryOp::Le, 7),
        TokenKind::Gt => (BinaryOp::Gt, 7),
        TokenKind::GtEq => (BinaryOp::Ge, 7),
        TokenKind::Shl => (BinaryOp::Shl, 8),
        TokenKind::Shr => (BinaryOp::Shr, 8),
        TokenKind::Plus => (BinaryOp::Add, 9),
        TokenKind::Minus => (BinaryOp::Sub, 9),
        TokenKind::Star => (BinaryOp::Mul, 10),
        TokenKind::Slash => (BinaryOp::Div, 10),
        TokenKind::Percent => (BinaryOp::Mod, 10),
        _ => return None,
    })
}

fn type_of(kind: &TokenKind) -> Option<Type> {
    match kind {
        TokenKind::Bool => Some(Type::Bool),
        TokenKind::Int => Some(Type::Int),
        TokenKind::Real => Some(Type::Real),
        TokenKind::Time => Some(Type::Time),
        _ => None,
    }
}

impl Parser {
    /// Creates a parser over a scanned token stream (terminated by `Eof`)
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses a module, failing on the first syntax error
    pub fn parse(&mut self) -> Result<Module> {
        let (module, mut errors) = self.parse_module();
        if errors.is_empty() {
            Ok(module)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    /// Parses a module, recovering at declaration boundaries
    ///
    /// Returns the declarations that parsed cleanly together with every
    /// syntax error encountered.
    pub fn parse_module(&mut self) -> (Module, Vec<Error>) {
        let mut decls = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            let start = self.current;
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    errors.push(err);
                    self.synchronize(start);
                }
            }
        }

        (Module { decls }, errors)
    }

    /// Skips to the next declaration keyword at brace depth zero
    fn synchronize(&mut self, start: usize) {
        self.current = (start + 1).min(self.tokens.len() - 1);
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth = depth.saturating_sub(1),
                ref kind if depth == 0 && kind.starts_declaration() => return,
                _ => {}
            }
            self.advance();
        }
    }

    // Declarations

    fn parse_decl(&mut self) -> Result<Decl> {
        let line = self.peek().line;
        let kind = match self.peek().kind {
            TokenKind::Import => self.parse_import()?,
            TokenKind::From => self.parse_from()?,
            TokenKind::Event => self.parse_event()?,
            TokenKind::Func => self.parse_func()?,
            TokenKind::Let | TokenKind::Const => DeclKind::Fexpr(self.parse_fexpr_decl()?),
            TokenKind::Var => self.parse_var()?,
            TokenKind::On => self.parse_action()?,
            _ => {
                return Err(self.expected_error(
                    "a declaration",
                    Some("Top-level items start with import, from, event, func, let, const, var or on."),
                ))
            }
        };
        Ok(Decl { kind, line })
    }

    fn parse_import(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Import)?;
        let first = self.identifier()?;
        let decl = if self.match_kind(&TokenKind::Equals) {
            let module = self.identifier()?;
            DeclKind::Import {
                module,
                alias: first,
            }
        } else {
            DeclKind::Import {
                module: first.clone(),
                alias: first,
            }
        };
        self.consume(TokenKind::Semicolon)?;
        Ok(decl)
    }

    fn parse_from(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::From)?;
        let module = self.identifier()?;
        self.consume(TokenKind::Import)?;
        let mut names = vec![self.identifier()?];
        while self.match_kind(&TokenKind::Comma) {
            names.push(self.identifier()?);
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(DeclKind::From { module, names })
    }

    fn parse_event(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Event)?;
        let name = self.identifier()?;
        let params = self.parse_params()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(DeclKind::Event { name, params })
    }

    fn parse_func(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Func)?;
        let ret = self.parse_type()?;
        let name = self.identifier()?;
        let params = self.parse_params()?;
        self.consume(TokenKind::LeftBrace)?;
        let mut locals = Vec::new();
        while self.check(&TokenKind::Let) || self.check(&TokenKind::Const) {
            locals.push(self.parse_fexpr_decl()?);
        }
        let body = self.parse_expression()?;
        self.consume(TokenKind::RightBrace)?;
        Ok(DeclKind::Func {
            name,
            ret,
            params,
            locals,
            body,
        })
    }

    fn parse_fexpr_decl(&mut self) -> Result<FexprDecl> {
        let line = self.peek().line;
        let constant = match self.advance().kind {
            TokenKind::Const => true,
            TokenKind::Let => false,
            _ => return Err(self.previous_error("expected 'let' or 'const'")),
        };
        let ty = self.parse_type()?;
        let name = self.identifier()?;
        self.consume(TokenKind::Equals)?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(FexprDecl {
            name,
            ty,
            constant,
            expr,
            line,
        })
    }

    fn parse_var(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::Var)?;
        let ty = self.parse_type()?;
        let name = self.identifier()?;
        self.consume(TokenKind::Equals)?;
        let init = self.parse_expression()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(DeclKind::Var { name, ty, init })
    }

    fn parse_action(&mut self) -> Result<DeclKind> {
        self.consume(TokenKind::On)?;
        let event = self.parse_qual_id()?;
        let body = self.parse_statement()?;
        Ok(DeclKind::Action { event, body })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.consume(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let line = self.peek().line;
                let ty = self.parse_type()?;
                let name = self.identifier()?;
                params.push(Param { ty, name, line });
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen)?;
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<Type> {
        match type_of(&self.peek().kind) {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None => Err(self.expected_error("a type name", Some("Types are bool, int, real and time."))),
        }
    }

    fn parse_qual_id(&mut self) -> Result<Vec<String>> {
        let mut parts = vec![self.identifier()?];
        while self.match_kind(&TokenKind::Dot) {
            parts.push(self.identifier()?);
        }
        Ok(parts)
    }

    // Statements

    fn parse_statement(&mut self) -> Result<Stmt> {
        let line = self.peek().line;
        let kind = match self.peek().kind {
            TokenKind::LeftBrace => {
                self.advance();
                let mut stmts = Vec::new();
                while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
                    stmts.push(self.parse_statement()?);
                }
                self.consume(TokenKind::RightBrace)?;
                StmtKind::Block(stmts)
            }
            TokenKind::Emit => self.parse_emit()?,
            TokenKind::Print => self.parse_print()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Let | TokenKind::Const => StmtKind::Fexpr(self.parse_fexpr_decl()?),
            _ => {
                let lhs = self.parse_concat()?;
                self.consume(TokenKind::Assign)?;
                let rhs = self.parse_concat()?;
                self.consume(TokenKind::Semicolon)?;
                StmtKind::Assign { lhs, rhs }
            }
        };
        Ok(Stmt { kind, line })
    }

    fn parse_emit(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Emit)?;
        let event = self.parse_qual_id()?;
        self.consume(TokenKind::LeftParen)?;
        let args = self.parse_expr_list(&TokenKind::RightParen)?;
        self.consume(TokenKind::RightParen)?;
        self.consume(TokenKind::After)?;
        let after = self.parse_expression()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(StmtKind::Emit { event, args, after })
    }

    /// `print a, b;` or `print(a, b);`
    fn parse_print(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Print)?;
        let wrapped = self.check(&TokenKind::LeftParen) && self.parenthesized_statement_tail();
        if wrapped {
            self.advance();
        }
        let close = if wrapped {
            TokenKind::RightParen
        } else {
            TokenKind::Semicolon
        };

        let mut args = Vec::new();
        if !self.check(&close) {
            loop {
                args.push(self.parse_print_arg()?);
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if wrapped {
            self.consume(TokenKind::RightParen)?;
        }
        self.consume(TokenKind::Semicolon)?;
        Ok(StmtKind::Print(args))
    }

    fn parse_print_arg(&mut self) -> Result<PrintArg> {
        if let TokenKind::String(text) = &self.peek().kind {
            let text = text.clone();
            self.advance();
            return Ok(PrintArg::Text(text));
        }
        Ok(PrintArg::Expr(self.parse_expression()?))
    }

    /// True when the `(` at the cursor closes right before a `;`
    fn parenthesized_statement_tail(&self) -> bool {
        let mut depth = 0usize;
        for (i, token) in self.tokens[self.current..].iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(self.current + i + 1).map(|t| &t.kind),
                            Some(TokenKind::Semicolon)
                        );
                    }
                }
                TokenKind::Semicolon | TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_if(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::If)?;
        self.consume(TokenKind::LeftParen)?;
        let cond = self.parse_expression()?;
        self.consume(TokenKind::RightParen)?;
        let then = Box::new(self.parse_statement()?);
        let els = if self.match_kind(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If { cond, then, els })
    }

    // Expressions

    /// Comma list; a single element is returned as is
    fn parse_concat(&mut self) -> Result<Expr> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let line = first.line;
        let mut items = vec![first];
        while self.match_kind(&TokenKind::Comma) {
            items.push(self.parse_expression()?);
        }
        Ok(Expr::new(ExprKind::Concat(items), line))
    }

    /// Parses a full expression, including `?:`
    pub fn parse_expression(&mut self) -> Result<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.match_kind(&TokenKind::Question) {
            return Ok(cond);
        }
        let line = cond.line;
        let yes = self.parse_expression()?;
        self.consume(TokenKind::Colon)?;
        let no = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::Cond {
                cond: Box::new(cond),
                yes: Box::new(yes),
                no: Box::new(no),
            },
            line,
        ))
    }

    fn parse_binary(&mut self, min_power: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((op, power)) = binary_op(&self.peek().kind) {
            if power < min_power {
                break;
            }
            self.advance();
            let right = self.parse_binary(power + 1)?;
            let line = left.line;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                line,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let line = self.peek().line;
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::Invert),
            TokenKind::Plus => None,
            TokenKind::LeftParen if self.is_cast() => {
                self.advance();
                let ty = self.parse_type()?;
                self.consume(TokenKind::RightParen)?;
                let operand = self.parse_unary()?;
                return Ok(Expr::new(
                    ExprKind::Cast {
                        ty,
                        operand: Box::new(operand),
                    },
                    line,
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(match op {
            Some(op) => Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                line,
            ),
            None => operand,
        })
    }

    /// `(` type `)` at the cursor
    fn is_cast(&self) -> bool {
        type_of(&self.peek_at(1).kind).is_some()
            && matches!(self.peek_at(2).kind, TokenKind::RightParen)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.match_kind(&TokenKind::LeftBracket) {
            let selectors = self.parse_selectors()?;
            self.consume(TokenKind::RightBracket)?;
            let line = expr.line;
            expr = Expr::new(
                ExprKind::Index {
                    base: Box::new(expr),
                    selectors,
                },
                line,
            );
        }
        Ok(expr)
    }

    fn parse_selectors(&mut self) -> Result<Vec<IndexSel>> {
        let mut selectors = vec![self.parse_selector()?];
        while self.match_kind(&TokenKind::Comma) {
            selectors.push(self.parse_selector()?);
        }
        Ok(selectors)
    }

    fn parse_selector(&mut self) -> Result<IndexSel> {
        let ends_here = |kind: &TokenKind| matches!(kind, TokenKind::Comma | TokenKind::RightBracket);
        if self.check(&TokenKind::Ellipsis) {
            self.advance();
            return Ok(IndexSel::Ellipsis);
        }
        if self.check(&TokenKind::Underscore) && ends_here(&self.peek_at(1).kind) {
            self.advance();
            return Ok(IndexSel::Full);
        }

        let start = self.parse_slice_bound()?;
        if !self.match_kind(&TokenKind::Colon) {
            return match start {
                Some(expr) => Ok(IndexSel::Expr(expr)),
                None => Err(self.expected_error("an index expression", None)),
            };
        }
        let stop = self.parse_slice_bound()?;
        let step = if self.match_kind(&TokenKind::Colon) {
            self.parse_slice_bound()?
        } else {
            None
        };
        Ok(IndexSel::Slice { start, stop, step })
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Expr>> {
        if matches!(
            self.peek().kind,
            TokenKind::Colon | TokenKind::Comma | TokenKind::RightBracket
        ) {
            Ok(None)
        } else {
            Ok(Some(self.parse_expression()?))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        let line = token.line;
        match token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Integer(n), line))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::new(ExprKind::Float(x), line))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::Bool(token.kind == TokenKind::True),
                    line,
                ))
            }
            TokenKind::Identifier(_) => {
                let name = self.parse_qual_id()?;
                if self.match_kind(&TokenKind::LeftParen) {
                    let args = self.parse_expr_list(&TokenKind::RightParen)?;
                    self.consume(TokenKind::RightParen)?;
                    Ok(Expr::new(ExprKind::Call { callee: name, args }, line))
                } else {
                    Ok(Expr::new(ExprKind::Name(name), line))
                }
            }
            TokenKind::Int | TokenKind::Real | TokenKind::Bool | TokenKind::Time => {
                let ty = self.parse_type()?;
                self.consume(TokenKind::LeftParen)?;
                let operand = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        ty,
                        operand: Box::new(operand),
                    },
                    line,
                ))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_concat()?;
                self.consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                self.advance();
                if self.check(&TokenKind::RightBracket) {
                    return Err(self.syntax_error("array literal needs at least one element"));
                }
                let items = self.parse_expr_list(&TokenKind::RightBracket)?;
                self.consume(TokenKind::RightBracket)?;
                Ok(Expr::new(ExprKind::Array(items), line))
            }
            TokenKind::String(_) => Err(self.syntax_error(
                "string literals are only allowed as print arguments",
            )),
            _ => Err(self.expected_error("an expression", None)),
        }
    }

    /// Possibly empty comma list up to `close` (not consumed)
    fn parse_expr_list(&mut self, close: &TokenKind) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // Helper methods

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.expected_error(&format!("'{}'", kind), None))
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            kind if kind.is_keyword() => Err(self.syntax_error(format!(
                "'{}' is a reserved word and cannot be used as a name",
                kind
            ))),
            _ => Err(self.expected_error("an identifier", None)),
        }
    }

    /// Helper to create a syntax error at current position
    fn syntax_error(&self, message: impl Into<String>) -> Error {
        let token = self.peek();
        Error::syntax(token.line, token.column, message)
    }

    fn previous_error(&self, message: impl Into<String>) -> Error {
        let token = &self.tokens[self.current.saturating_sub(1)];
        Error::syntax(token.line, token.column, message)
    }

    /// Helper to create a syntax error with expected/got pattern
    fn expected_error(&self, expected: &str, hint: Option<&str>) -> Error {
        let token = self.peek();
        let mut message = format!("expected {}, found '{}'", expected, token.kind);
        if let Some(hint) = hint {
            message.push_str("\n\nHelp: ");
            message.push_str(hint);
        }
        Error::syntax(token.line, token.column, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;

    fn parse(source: &str) -> Result<Module> {
        let tokens = Scanner::new(source).scan_tokens()?;
        Parser::new(tokens).parse()
    }

    fn parse_expr(source: &str) -> Expr {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse_expression().unwrap()
    }

    #[test]
    fn test_declarations() {
        let module = parse(
            "import a; import b = c; from d import x, y;
             event tick(int n, time t);
             var int k = 0;
             const real pi = 3.14;
             func int twice(int x) { let int y = x; y*2 }
             on tick k := k + 1;",
        )
        .unwrap();
        assert_eq!(module.decls.len(), 8);
        assert_eq!(
            module.decls[1].kind,
            DeclKind::Import {
                module: "c".to_string(),
                alias: "b".to_string()
            }
        );
        match &module.decls[6].kind {
            DeclKind::Func { locals, params, .. } => {
                assert_eq!(locals.len(), 1);
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected func, got {:?}", other),
        }
        assert_eq!(module.decls[7].line, 6);
    }

    #[test]
    fn test_precedence() {
        let e = parse_expr("1 + 2 * 3 < 4 && true");
        match e.kind {
            ExprKind::Binary {
                op: BinaryOp::And,
                left,
                ..
            } => match left.kind {
                ExprKind::Binary {
                    op: BinaryOp::Lt,
                    left,
                    ..
                } => assert!(matches!(
                    left.kind,
                    ExprKind::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                )),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_left_associative() {
        let e = parse_expr("8 - 4 - 2");
        match e.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(left.kind, ExprKind::Binary { .. }));
                assert_eq!(right.kind, ExprKind::Integer(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_casts() {
        assert!(matches!(
            parse_expr("(int) 2.5").kind,
            ExprKind::Cast { ty: Type::Int, .. }
        ));
        assert!(matches!(
            parse_expr("real(2)").kind,
            ExprKind::Cast { ty: Type::Real, .. }
        ));
        assert!(matches!(parse_expr("(1, 2)").kind, ExprKind::Concat(_)));
    }

    #[test]
    fn test_index_selectors() {
        let e = parse_expr("a[1:, _, ..., ::-1, i]");
        match e.kind {
            ExprKind::Index { selectors, .. } => {
                assert_eq!(selectors.len(), 5);
                assert!(matches!(
                    selectors[0],
                    IndexSel::Slice {
                        start: Some(_),
                        stop: None,
                        step: None
                    }
                ));
                assert_eq!(selectors[1], IndexSel::Full);
                assert_eq!(selectors[2], IndexSel::Ellipsis);
                assert!(matches!(
                    selectors[3],
                    IndexSel::Slice {
                        start: None,
                        stop: None,
                        step: Some(_)
                    }
                ));
                assert!(matches!(selectors[4], IndexSel::Expr(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_print_forms() {
        let module = parse(r#"on Init { print "a=", a; print("b", 1); print (1+2)*3; }"#).unwrap();
        match &module.decls[0].kind {
            DeclKind::Action { body, .. } => match &body.kind {
                StmtKind::Block(stmts) => {
                    assert!(matches!(&stmts[0].kind, StmtKind::Print(args) if args.len() == 2));
                    assert!(matches!(&stmts[1].kind, StmtKind::Print(args) if args.len() == 2));
                    assert!(matches!(&stmts[2].kind, StmtKind::Print(args) if args.len() == 1));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_statements() {
        let module = parse(
            "on tick { x := 1, y; if (k < 3) emit sys.tick() after 1; else { } }",
        )
        .unwrap();
        match &module.decls[0].kind {
            DeclKind::Action { event, body } => {
                assert_eq!(event, &vec!["tick".to_string()]);
                match &body.kind {
                    StmtKind::Block(stmts) => {
                        assert!(matches!(
                            &stmts[0].kind,
                            StmtKind::Assign { rhs, .. } if matches!(rhs.kind, ExprKind::Concat(_))
                        ));
                        assert!(matches!(&stmts[1].kind, StmtKind::If { els: Some(_), .. }));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("event foo()").is_err());
        assert!(parse("int x=1;").is_err());
        assert!(parse("func int x() { 1 };").is_err());
        assert!(parse("var int a = [];").is_err());
        assert!(parse("on Init x := \"s\";").is_err());
        assert!(parse("var int empty = 0; var int var = 1;").is_err());
    }

    #[test]
    fn test_recovery_reports_every_bad_declaration() {
        let tokens = Scanner::new(
            "var int a = ;\n event ok();\n var int b = 1 +;\n on ok { a := 1; }",
        )
        .scan_tokens()
        .unwrap();
        let (module, errors) = Parser::new(tokens).parse_module();
        assert_eq!(errors.len(), 2);
        assert_eq!(module.decls.len(), 2);
        assert_eq!(errors[0].line(), Some(1));
        assert_eq!(errors[1].line(), Some(3));
    }
}
