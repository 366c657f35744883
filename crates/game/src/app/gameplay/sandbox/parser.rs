//! Recursive-descent parser over the token stream.
//!
//! Supported statements: assignment (plain and `+=`/`-=`/`*=`), expression
//! statements, `for NAME in expr:`, `def`, `return`, `pass`. Every other
//! Python keyword is rejected as a syntax error.

use std::rc::Rc;

use super::ast::{BinaryOp, BoolOp, CompareOp, Expr, FunctionDef, Stmt, UnaryOp};
use super::lexer::{syntax_error, Token, TokenKind};
use super::{ErrorKind, SandboxError};

const MAX_NESTING: usize = 100;

const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "break", "continue", "import", "from", "class", "lambda",
    "try", "except", "finally", "raise", "with", "as", "global", "nonlocal", "yield", "del",
    "assert", "is", "async", "await",
];

pub(crate) fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, SandboxError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        function_depth: 0,
        nesting: 0,
    };
    let mut program = Vec::new();
    while !parser.check(&TokenKind::Eof) {
        program.push(parser.statement()?);
    }
    Ok(program)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    function_depth: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|token| &token.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|token| &token.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|token| token.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(name) if name == keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), SandboxError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SandboxError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected '{keyword}'")))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SandboxError> {
        match self.peek().clone() {
            TokenKind::Name(name) if !is_keyword(&name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn error(&self, message: impl AsRef<str>) -> SandboxError {
        syntax_error(message, self.line())
    }

    fn indentation_error(&self, message: &str) -> SandboxError {
        SandboxError::new(
            ErrorKind::IndentationError,
            format!("{message} (line {})", self.line()),
        )
    }

    fn statement(&mut self) -> Result<Stmt, SandboxError> {
        if self.check(&TokenKind::Indent) {
            return Err(self.indentation_error("unexpected indent"));
        }
        if self.check_keyword("for") {
            return self.for_statement();
        }
        if self.check_keyword("def") {
            return self.def_statement();
        }
        let stmt = self.simple_statement()?;
        self.end_of_statement()?;
        Ok(stmt)
    }

    fn end_of_statement(&mut self) -> Result<(), SandboxError> {
        if self.eat(&TokenKind::Newline) {
            Ok(())
        } else {
            Err(self.error("invalid syntax"))
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt, SandboxError> {
        if let TokenKind::Name(name) = self.peek() {
            if UNSUPPORTED_KEYWORDS.contains(&name.as_str()) {
                return Err(self.error(format!("'{name}' is not supported here")));
            }
        }
        if self.check_keyword("pass") {
            self.advance();
            return Ok(Stmt::Pass);
        }
        if self.check_keyword("return") {
            if self.function_depth == 0 {
                return Err(self.error("'return' outside function"));
            }
            self.advance();
            if self.check(&TokenKind::Newline) {
                return Ok(Stmt::Return(None));
            }
            return Ok(Stmt::Return(Some(self.expression()?)));
        }

        let aug_op = match self.peek_at(1) {
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            _ => None,
        };
        if let Some(op) = aug_op {
            let name = self.expect_identifier()?;
            self.advance();
            let value = self.expression()?;
            return Ok(Stmt::AugAssign { name, op, value });
        }

        let expr = self.expression()?;
        if !self.eat(&TokenKind::Assign) {
            return Ok(Stmt::Expr(expr));
        }
        let Expr::Name(name) = expr else {
            return Err(self.error("cannot assign to expression"));
        };
        let value = self.expression()?;
        if self.check(&TokenKind::Assign) {
            return Err(self.error("chained assignment is not supported"));
        }
        Ok(Stmt::Assign { name, value })
    }

    fn for_statement(&mut self) -> Result<Stmt, SandboxError> {
        self.expect_keyword("for")?;
        let var = self.expect_identifier()?;
        self.expect_keyword("in")?;
        let iter = self.expression()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let body = self.suite()?;
        Ok(Stmt::For { var, iter, body })
    }

    fn def_statement(&mut self) -> Result<Stmt, SandboxError> {
        self.expect_keyword("def")?;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params: Vec<String> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param = self.expect_identifier()?;
            if params.contains(&param) {
                return Err(self.error(format!(
                    "duplicate argument '{param}' in function definition"
                )));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        self.expect(&TokenKind::Colon, "':'")?;

        self.function_depth += 1;
        let body = self.suite();
        self.function_depth -= 1;

        Ok(Stmt::Def(Rc::new(FunctionDef {
            name,
            params,
            body: body?,
        })))
    }

    /// Block after `:`; either one simple statement on the same line or an
    /// indented run of statements.
    fn suite(&mut self) -> Result<Vec<Stmt>, SandboxError> {
        if !self.eat(&TokenKind::Newline) {
            let stmt = self.simple_statement()?;
            self.end_of_statement()?;
            return Ok(vec![stmt]);
        }
        if !self.eat(&TokenKind::Indent) {
            return Err(self.indentation_error("expected an indented block"));
        }
        let mut body = Vec::new();
        while !self.eat(&TokenKind::Dedent) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("unexpected EOF while parsing"));
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn expression(&mut self) -> Result<Expr, SandboxError> {
        self.nested(Self::or_expr)
    }

    /// Bounds recursion for deeply nested input.
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, SandboxError>,
    ) -> Result<Expr, SandboxError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("too many nested expressions"));
        }
        self.nesting += 1;
        let result = rule(self);
        self.nesting -= 1;
        result
    }

    fn or_expr(&mut self) -> Result<Expr, SandboxError> {
        let mut left = self.and_expr()?;
        while self.check_keyword("or") {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Logical {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, SandboxError> {
        let mut left = self.not_expr()?;
        while self.check_keyword("and") {
            self.advance();
            let right = self.not_expr()?;
            left = Expr::Logical {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, SandboxError> {
        if self.check_keyword("not") {
            self.advance();
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SandboxError> {
        let left = self.additive()?;
        let Some(op) = self.compare_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.additive()?;
        if self.compare_op().is_some() {
            return Err(self.error("chained comparisons are not supported"));
        }
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn compare_op(&self) -> Option<CompareOp> {
        match self.peek() {
            TokenKind::EqEq => Some(CompareOp::Eq),
            TokenKind::NotEq => Some(CompareOp::NotEq),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::LtE => Some(CompareOp::LtE),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::GtE => Some(CompareOp::GtE),
            _ => None,
        }
    }

    fn additive(&mut self) -> Result<Expr, SandboxError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, SandboxError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, SandboxError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, SandboxError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                expr = self.call(expr)?;
            } else if self.eat(&TokenKind::LBracket) {
                expr = self.subscript(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn call(&mut self, callee: Expr) -> Result<Expr, SandboxError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let is_keyword_arg = matches!(self.peek(), TokenKind::Name(_))
                && self.peek_at(1) == &TokenKind::Assign;
            if is_keyword_arg {
                let name = self.expect_identifier()?;
                self.advance();
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error(format!("keyword argument repeated: {name}")));
                }
                kwargs.push((name, self.expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.expression()?);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            kwargs,
        })
    }

    fn subscript(&mut self, target: Expr) -> Result<Expr, SandboxError> {
        let start = self.optional_slice_part()?;
        if self.eat(&TokenKind::RBracket) {
            let Some(index) = start else {
                return Err(self.error("invalid syntax"));
            };
            return Ok(Expr::Subscript {
                target: Box::new(target),
                index,
            });
        }
        self.expect(&TokenKind::Colon, "']' or ':'")?;
        let stop = self.optional_slice_part()?;
        let step = if self.eat(&TokenKind::Colon) {
            self.optional_slice_part()?
        } else {
            None
        };
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(Expr::Slice {
            target: Box::new(target),
            start,
            stop,
            step,
        })
    }

    fn optional_slice_part(&mut self) -> Result<Option<Box<Expr>>, SandboxError> {
        if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.expression()?)))
    }

    fn atom(&mut self) -> Result<Expr, SandboxError> {
        match self.advance() {
            TokenKind::Int(value) => Ok(Expr::Int(value)),
            TokenKind::Str(mut value) => {
                // Adjacent literals concatenate.
                while let TokenKind::Str(next) = self.peek().clone() {
                    value.push_str(&next);
                    self.advance();
                }
                Ok(Expr::Str(value))
            }
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Name(name) => match name.as_str() {
                "True" => Ok(Expr::Bool(true)),
                "False" => Ok(Expr::Bool(false)),
                "None" => Ok(Expr::NoneLit),
                other if is_keyword(other) => {
                    self.pos -= 1;
                    Err(self.error("invalid syntax"))
                }
                _ => Ok(Expr::Name(name)),
            },
            TokenKind::Indent => {
                self.pos -= 1;
                Err(self.indentation_error("unexpected indent"))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("invalid syntax"))
            }
        }
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "for" | "in" | "def" | "return" | "pass" | "and" | "or" | "not" | "True" | "False"
            | "None"
    ) || UNSUPPORTED_KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::sandbox::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Vec<Stmt>, SandboxError> {
        parse(&tokenize(source)?)
    }

    fn single_expr(source: &str) -> Expr {
        match parse_source(source).expect("parse").as_slice() {
            [Stmt::Expr(expr)] => expr.clone(),
            other => panic!("expected one expression statement, got {other:?}"),
        }
    }

    fn int(value: i64) -> Box<Expr> {
        Box::new(Expr::Int(value))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            single_expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: int(1),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: int(2),
                    right: int(3),
                }),
            }
        );
    }

    #[test]
    fn unary_minus_applies_to_operand() {
        assert_eq!(
            single_expr("-1 - 2"),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: int(1),
                }),
                right: int(2),
            }
        );
    }

    #[test]
    fn slice_with_only_step() {
        let program = parse_source("rune = 'elgnis'[::-1]").expect("parse");
        assert_eq!(
            program,
            vec![Stmt::Assign {
                name: "rune".to_string(),
                value: Expr::Slice {
                    target: Box::new(Expr::Str("elgnis".to_string())),
                    start: None,
                    stop: None,
                    step: Some(Box::new(Expr::Unary {
                        op: UnaryOp::Neg,
                        operand: int(1),
                    })),
                },
            }]
        );
    }

    #[test]
    fn call_with_keyword_arguments() {
        assert_eq!(
            single_expr("print(i, end='')"),
            Expr::Call {
                callee: Box::new(Expr::Name("print".to_string())),
                args: vec![Expr::Name("i".to_string())],
                kwargs: vec![("end".to_string(), Expr::Str(String::new()))],
            }
        );
    }

    #[test]
    fn def_and_for_build_nested_bodies() {
        let program =
            parse_source("def add(a, b):\n    for i in range(2):\n        pass\n    return a + b\n")
                .expect("parse");
        let [Stmt::Def(def)] = program.as_slice() else {
            panic!("expected def, got {program:?}");
        };
        assert_eq!(def.name, "add");
        assert_eq!(def.params, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(def.body.len(), 2);
        assert!(matches!(def.body[0], Stmt::For { ref body, .. } if body == &vec![Stmt::Pass]));
        assert!(matches!(def.body[1], Stmt::Return(Some(_))));
    }

    #[test]
    fn augmented_assignment() {
        assert_eq!(
            parse_source("total += 2").expect("parse"),
            vec![Stmt::AugAssign {
                name: "total".to_string(),
                op: BinaryOp::Add,
                value: Expr::Int(2),
            }]
        );
    }

    fn kind_of(source: &str) -> ErrorKind {
        parse_source(source).expect_err("should fail").kind
    }

    #[test]
    fn structural_errors() {
        assert_eq!(kind_of("return 1"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("1 = x"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("x = 1 < 2 < 3"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("f(a=1, 2)"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("def f(a, a):\n    pass\n"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("for i in range(3):\nx = 1\n"), ErrorKind::IndentationError);
        assert_eq!(kind_of("  x = 1"), ErrorKind::IndentationError);
        assert_eq!(kind_of("for = 3"), ErrorKind::SyntaxError);
        assert_eq!(kind_of("x = 'a'[]"), ErrorKind::SyntaxError);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("x = {}1{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(kind_of(&source), ErrorKind::SyntaxError);
        assert_eq!(kind_of(&format!("x = {}1", "-".repeat(500))), ErrorKind::SyntaxError);
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let error = parse_source("x = 1\ny = 2\nz = = 3\n").expect_err("bad assignment");
        assert_eq!(error.kind, ErrorKind::SyntaxError);
        assert_eq!(error.message, "invalid syntax (line 3)");
    }
}
