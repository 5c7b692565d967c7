//! Teleidoscope Recursive Descent Parser
//!
//! Parses Teleidoscope tokens into an Abstract Syntax Tree (AST).
//! Binary expressions use precedence climbing with the classic table:
//! `<` binds at 10, `+`/`-` at 20, `*` at 40.

use crate::ast::*;
use crate::lexer::{Token, TokenType};
use std::collections::VecDeque;
use tlc_common::{CompilerError, SourceLocation, SourceSpan};

/// Parse error types specific to the parser
#[derive(Debug, Clone)]
pub enum ParseError {
    UnexpectedToken { expected: String, found: Token },
    UnexpectedEndOfFile { expected: String, location: SourceLocation },
    InvalidExpression { message: String, location: SourceLocation },
}

impl From<ParseError> for CompilerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnexpectedToken { expected, found } => CompilerError::parse_error(
                format!("Expected {}, found {}", expected, found.token_type),
                found.span.start,
            ),
            ParseError::UnexpectedEndOfFile { expected, location } => CompilerError::parse_error(
                format!("Unexpected end of file, expected {}", expected),
                location,
            ),
            ParseError::InvalidExpression { message, location } => {
                CompilerError::parse_error(message, location)
            }
        }
    }
}

/// Teleidoscope Parser
pub struct Parser {
    tokens: VecDeque<Token>,
    node_id_gen: NodeIdGenerator,
    prev_span: SourceSpan,
}

impl Parser {
    /// Create a new parser
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
            node_id_gen: NodeIdGenerator::new(),
            prev_span: SourceSpan::dummy(),
        }
    }

    /// Peek at current token without consuming
    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    /// Get current token and advance
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.pop_front();
        if let Some(ref t) = token {
            self.prev_span = t.span.clone();
        }
        token
    }

    /// Check if current token matches expected type
    fn check(&self, token_type: &TokenType) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.token_type) == std::mem::discriminant(token_type)
        } else {
            matches!(token_type, TokenType::EndOfFile)
        }
    }

    /// Consume token if it matches expected type
    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect and consume a specific token type
    fn expect(&mut self, token_type: TokenType, context: &str) -> Result<Token, ParseError> {
        if let Some(token) = self.advance() {
            if std::mem::discriminant(&token.token_type) == std::mem::discriminant(&token_type) {
                Ok(token)
            } else {
                Err(ParseError::UnexpectedToken {
                    expected: format!("{} in {}", token_type, context),
                    found: token,
                })
            }
        } else {
            Err(ParseError::UnexpectedEndOfFile {
                expected: format!("{} in {}", token_type, context),
                location: self.prev_span.end.clone(),
            })
        }
    }

    /// Get current location for error reporting
    fn current_location(&self) -> SourceLocation {
        if let Some(token) = self.peek() {
            token.span.start.clone()
        } else {
            self.prev_span.end.clone()
        }
    }

    /// Span from a start location to the end of the last consumed token
    fn span_from(&self, start: SourceLocation) -> SourceSpan {
        SourceSpan::new(start, self.prev_span.end.clone())
    }

    fn make_expr(&mut self, kind: ExpressionKind, span: SourceSpan) -> Expression {
        Expression {
            node_id: self.node_id_gen.next(),
            kind,
            span,
        }
    }

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program, CompilerError> {
        let mut items = Vec::new();

        while !self.check(&TokenType::EndOfFile) {
            if self.match_token(&TokenType::Semicolon) {
                continue;
            }
            if self.check(&TokenType::Def) {
                items.push(TopLevelItem::Function(self.parse_definition()?));
            } else if self.check(&TokenType::Extern) {
                items.push(TopLevelItem::Extern(self.parse_extern()?));
            } else {
                items.push(TopLevelItem::Expression(self.parse_expression()?));
            }
        }

        log::debug!("parsed {} top-level item(s)", items.len());
        Ok(Program { items })
    }

    /// prototype ::= id '(' id* ')'
    ///
    /// Parameters are separated by whitespace, not commas, following the
    /// original grammar.
    fn parse_prototype(&mut self) -> Result<Prototype, ParseError> {
        let start = self.current_location();
        let name_token = self.expect(
            TokenType::Identifier(String::new()),
            "function prototype",
        )?;
        let name = match name_token.token_type {
            TokenType::Identifier(name) => name,
            _ => unreachable!("expect() returned a non-identifier"),
        };

        self.expect(TokenType::LeftParen, "function prototype")?;

        let mut params = Vec::new();
        while self.check(&TokenType::Identifier(String::new())) {
            if let Some(Token {
                token_type: TokenType::Identifier(param),
                ..
            }) = self.advance()
            {
                params.push(param);
            }
        }

        self.expect(TokenType::RightParen, "function prototype")?;

        Ok(Prototype {
            name,
            params,
            span: self.span_from(start),
        })
    }

    /// definition ::= 'def' prototype expression
    fn parse_definition(&mut self) -> Result<Function, CompilerError> {
        let start = self.current_location();
        self.expect(TokenType::Def, "function definition")?;
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression()?;

        Ok(Function {
            prototype,
            body,
            span: self.span_from(start),
        })
    }

    /// external ::= 'extern' prototype
    fn parse_extern(&mut self) -> Result<Prototype, CompilerError> {
        self.expect(TokenType::Extern, "extern declaration")?;
        Ok(self.parse_prototype()?)
    }

    /// Operator precedence; -1 means "not a binary operator"
    fn token_precedence(token_type: &TokenType) -> i32 {
        match token_type {
            TokenType::Less => 10,
            TokenType::Plus | TokenType::Minus => 20,
            TokenType::Star => 40,
            _ => -1,
        }
    }

    fn current_precedence(&self) -> i32 {
        self.peek()
            .map(|t| Self::token_precedence(&t.token_type))
            .unwrap_or(-1)
    }

    /// expression ::= primary binoprhs
    pub fn parse_expression(&mut self) -> Result<Expression, CompilerError> {
        let lhs = self.parse_primary()?;
        self.parse_binop_rhs(0, lhs)
    }

    /// binoprhs ::= (binop primary)*
    fn parse_binop_rhs(
        &mut self,
        expr_prec: i32,
        mut lhs: Expression,
    ) -> Result<Expression, CompilerError> {
        loop {
            let tok_prec = self.current_precedence();
            if tok_prec < expr_prec {
                return Ok(lhs);
            }

            let op = match self.advance().map(|t| t.token_type) {
                Some(TokenType::Less) => BinaryOp::Less,
                Some(TokenType::Plus) => BinaryOp::Add,
                Some(TokenType::Minus) => BinaryOp::Sub,
                Some(TokenType::Star) => BinaryOp::Mul,
                _ => unreachable!("current_precedence() only accepts binary operators"),
            };

            let mut rhs = self.parse_primary()?;

            let next_prec = self.current_precedence();
            if tok_prec < next_prec {
                rhs = self.parse_binop_rhs(tok_prec + 1, rhs)?;
            }

            let span = lhs.span.extend(&rhs.span);
            lhs = self.make_expr(
                ExpressionKind::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                span,
            );
        }
    }

    /// primary ::= identifierexpr | numberexpr | parenexpr | ifexpr | forexpr
    fn parse_primary(&mut self) -> Result<Expression, CompilerError> {
        if self.check(&TokenType::Identifier(String::new())) {
            self.parse_identifier_expr()
        } else if self.check(&TokenType::Number(0.0)) {
            self.parse_number_expr()
        } else if self.check(&TokenType::LeftParen) {
            self.parse_paren_expr()
        } else if self.check(&TokenType::If) {
            self.parse_if_expr()
        } else if self.check(&TokenType::For) {
            self.parse_for_expr()
        } else {
            Err(ParseError::InvalidExpression {
                message: "unknown token when expecting an expression".to_string(),
                location: self.current_location(),
            }
            .into())
        }
    }

    /// numberexpr ::= number
    fn parse_number_expr(&mut self) -> Result<Expression, CompilerError> {
        let start = self.current_location();
        let token = self.expect(TokenType::Number(0.0), "expression")?;
        let value = match token.token_type {
            TokenType::Number(value) => value,
            _ => unreachable!("expect() returned a non-number"),
        };
        let span = self.span_from(start);
        Ok(self.make_expr(ExpressionKind::Number(value), span))
    }

    /// parenexpr ::= '(' expression ')'
    fn parse_paren_expr(&mut self) -> Result<Expression, CompilerError> {
        self.expect(TokenType::LeftParen, "parenthesized expression")?;
        let expr = self.parse_expression()?;
        self.expect(TokenType::RightParen, "parenthesized expression")?;
        Ok(expr)
    }

    /// identifierexpr ::= identifier
    ///                ::= identifier '(' (expression (',' expression)*)? ')'
    fn parse_identifier_expr(&mut self) -> Result<Expression, CompilerError> {
        let start = self.current_location();
        let token = self.expect(TokenType::Identifier(String::new()), "expression")?;
        let name = match token.token_type {
            TokenType::Identifier(name) => name,
            _ => unreachable!("expect() returned a non-identifier"),
        };

        if !self.check(&TokenType::LeftParen) {
            let span = self.span_from(start);
            return Ok(self.make_expr(ExpressionKind::Variable(name), span));
        }

        self.advance(); // '('
        let mut arguments = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if self.check(&TokenType::RightParen) {
                    break;
                }
                self.expect(TokenType::Comma, "argument list")?;
            }
        }
        self.expect(TokenType::RightParen, "argument list")?;

        let span = self.span_from(start);
        Ok(self.make_expr(
            ExpressionKind::Call {
                callee: name,
                arguments,
            },
            span,
        ))
    }

    /// ifexpr ::= 'if' expression 'then' expression 'else' expression
    fn parse_if_expr(&mut self) -> Result<Expression, CompilerError> {
        let start = self.current_location();
        self.expect(TokenType::If, "if expression")?;
        let condition = self.parse_expression()?;
        self.expect(TokenType::Then, "if expression")?;
        let then_expr = self.parse_expression()?;
        self.expect(TokenType::Else, "if expression")?;
        let else_expr = self.parse_expression()?;

        let span = self.span_from(start);
        Ok(self.make_expr(
            ExpressionKind::If {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// forexpr ::= 'for' id '=' expression ',' expression (',' expression)? 'in' expression
    fn parse_for_expr(&mut self) -> Result<Expression, CompilerError> {
        let start = self.current_location();
        self.expect(TokenType::For, "for expression")?;
        let var_token = self.expect(TokenType::Identifier(String::new()), "for expression")?;
        let var = match var_token.token_type {
            TokenType::Identifier(name) => name,
            _ => unreachable!("expect() returned a non-identifier"),
        };

        self.expect(TokenType::Equal, "for expression")?;
        let start_expr = self.parse_expression()?;
        self.expect(TokenType::Comma, "for expression")?;
        let condition = self.parse_expression()?;

        let step = if self.match_token(&TokenType::Comma) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect(TokenType::In, "for expression")?;
        let body = self.parse_expression()?;

        let span = self.span_from(start);
        Ok(self.make_expr(
            ExpressionKind::For {
                var,
                start: Box::new(start_expr),
                condition: Box::new(condition),
                step,
                body: Box::new(body),
            },
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    fn parse_err(source: &str) -> CompilerError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap_err()
    }

    #[test]
    fn test_parse_definition() {
        let program = parse("def fib(x) if x < 3 then 1 else fib(x - 1) + fib(x - 2)");
        assert_eq!(program.items.len(), 1);

        match &program.items[0] {
            TopLevelItem::Function(func) => {
                assert_eq!(func.prototype.name, "fib");
                assert_eq!(func.prototype.params, vec!["x".to_string()]);
                assert!(matches!(func.body.kind, ExpressionKind::If { .. }));
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_extern_params_without_commas() {
        let program = parse("extern atan2(arg1 arg2);");
        match &program.items[0] {
            TopLevelItem::Extern(proto) => {
                assert_eq!(proto.name, "atan2");
                assert_eq!(proto.params, vec!["arg1".to_string(), "arg2".to_string()]);
            }
            _ => panic!("Expected extern declaration"),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse("a + b * c");
        let expr = match &program.items[0] {
            TopLevelItem::Expression(e) => e,
            _ => panic!("Expected expression"),
        };

        // Must parse as a + (b * c)
        match &expr.kind {
            ExpressionKind::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Add);
                assert!(matches!(left.kind, ExpressionKind::Variable(_)));
                assert!(matches!(
                    right.kind,
                    ExpressionKind::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            _ => panic!("Expected binary expression"),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        let program = parse("(a + b) * c");
        let expr = match &program.items[0] {
            TopLevelItem::Expression(e) => e,
            _ => panic!("Expected expression"),
        };

        match &expr.kind {
            ExpressionKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinaryOp::Mul);
                assert!(matches!(
                    left.kind,
                    ExpressionKind::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
            }
            _ => panic!("Expected binary expression"),
        }
    }

    #[test]
    fn test_comparison_binds_loosest() {
        let program = parse("x < y + 1");
        let expr = match &program.items[0] {
            TopLevelItem::Expression(e) => e,
            _ => panic!("Expected expression"),
        };

        match &expr.kind {
            ExpressionKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::Less),
            _ => panic!("Expected binary expression"),
        }
    }

    #[test]
    fn test_parse_for_with_step() {
        let program = parse("def printstar(n) for i = 1, i < n, 1.0 in putchar(42)");
        match &program.items[0] {
            TopLevelItem::Function(func) => match &func.body.kind {
                ExpressionKind::For {
                    var, step, body, ..
                } => {
                    assert_eq!(var, "i");
                    assert!(step.is_some());
                    assert!(matches!(body.kind, ExpressionKind::Call { .. }));
                }
                _ => panic!("Expected for expression"),
            },
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_for_without_step() {
        let program = parse("for i = 1, i < 10 in putchar(42)");
        match &program.items[0] {
            TopLevelItem::Expression(expr) => match &expr.kind {
                ExpressionKind::For { step, .. } => assert!(step.is_none()),
                _ => panic!("Expected for expression"),
            },
            _ => panic!("Expected expression"),
        }
    }

    #[test]
    fn test_call_arguments() {
        let program = parse("atan2(sin(.4), cos(42))");
        match &program.items[0] {
            TopLevelItem::Expression(expr) => match &expr.kind {
                ExpressionKind::Call { callee, arguments } => {
                    assert_eq!(callee, "atan2");
                    assert_eq!(arguments.len(), 2);
                }
                _ => panic!("Expected call expression"),
            },
            _ => panic!("Expected expression"),
        }
    }

    #[test]
    fn test_semicolons_are_separators() {
        let program = parse("printstar(72);\nputchar(10);");
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn test_missing_then_is_error() {
        let err = parse_err("if x < 3 1 else 2");
        assert!(matches!(err, CompilerError::ParseError { .. }));
    }

    #[test]
    fn test_unclosed_paren_is_error() {
        let err = parse_err("(1 + 2");
        assert!(matches!(err, CompilerError::ParseError { .. }));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let program = parse("fib(40) + fib(41)");
        let mut ids = Vec::new();
        fn collect(expr: &Expression, ids: &mut Vec<NodeId>) {
            ids.push(expr.node_id);
            match &expr.kind {
                ExpressionKind::Binary { left, right, .. } => {
                    collect(left, ids);
                    collect(right, ids);
                }
                ExpressionKind::Call { arguments, .. } => {
                    for arg in arguments {
                        collect(arg, ids);
                    }
                }
                _ => {}
            }
        }
        for item in &program.items {
            if let TopLevelItem::Expression(e) = item {
                collect(e, &mut ids);
            }
        }
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }
}
