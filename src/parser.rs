use std::rc::Rc;

use logos::Logos;

use crate::{
    ast::{
        BinaryOperator, Expr, ExprKind, FunctionDeclaration, Literal, LogicalOperator, Position, Stmt,
        StmtKind, UnaryOperator,
    },
    config::{ensure_sufficient_stack, MAX_NESTING_DEPTH},
    error::LoxError,
};


#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
enum Token<'a> {
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,

    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("var")]
    Var,
    #[token("fun")]
    Fun,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("print")]
    Print,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""[^"]*""#, |lex| { let slice = lex.slice(); &slice[1..slice.len() - 1] })]
    String(&'a str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Identifier(&'a str),
}

impl<'a> Token<'a> {
    fn describe(&self) -> String {
        match self {
            Self::Number(number) => format!("number {}", number),
            Self::String(string) => format!("string \"{}\"", string),
            Self::Identifier(identifier) => format!("identifier '{}'", identifier),
            other => format!("{:?}", other),
        }
    }
}

type ParseResult<O> = Result<O, LoxError>;

/// One unit of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    /// A lone expression whose value should be shown.
    Expression(Expr),
    Statements(Vec<Stmt>),
}

/// Maps byte offsets to line and column numbers.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        Self { source, line_starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position::new(line, column)
    }
}

fn lexer(input: &str) -> ParseResult<(Vec<(Token<'_>, Position)>, Position)> {
    let index = LineIndex::new(input);
    let mut tokens = vec![];
    let mut tokenizer = Token::lexer(input);

    while let Some(result) = tokenizer.next() {
        let position = index.position(tokenizer.span().start);
        match result {
            Ok(token) => tokens.push((token, position)),
            Err(_) => {
                return Err(LoxError::syntax(
                    format!("unexpected input '{}'", tokenizer.slice()),
                    position,
                ))
            }
        }
    }

    Ok((tokens, index.position(input.len())))
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, Position)>,
    current: usize,
    end: Position,
    /// How many syntax levels enclose the node being parsed.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<(Token<'a>, Position)>, end: Position) -> Self {
        Self { tokens, current: 0, end, depth: 0 }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.current).map(|(token, _)| token)
    }

    fn position(&self) -> Position {
        self.tokens.get(self.current).map_or(self.end, |(_, position)| *position)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn check(&self, token: &Token<'_>) -> bool {
        self.peek() == Some(token)
    }

    fn advance(&mut self) -> Option<(Token<'a>, Position)> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn matches(&mut self, token: &Token<'_>) -> Option<Position> {
        if self.check(token) {
            self.advance().map(|(_, position)| position)
        } else {
            None
        }
    }

    fn error(&self, expected: &str) -> LoxError {
        let found = match self.peek() {
            Some(token) => token.describe(),
            None => "end of input".to_owned(),
        };
        LoxError::syntax(format!("expected {}, found {}", expected, found), self.position())
    }

    /// Enters one more level of syntax, failing once the tree would nest
    /// deeper than [MAX_NESTING_DEPTH].
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(LoxError::syntax("nesting too deep", self.position()));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, inner: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.descend()?;
        let result = ensure_sufficient_stack(|| inner(self));
        self.depth -= 1;
        result
    }

    fn expect(&mut self, token: &Token<'_>, expected: &str) -> ParseResult<Position> {
        self.matches(token).ok_or_else(|| self.error(expected))
    }

    fn identifier(&mut self, expected: &str) -> ParseResult<(String, Position)> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                let position = self.position();
                self.current += 1;
                Ok((name, position))
            }
            _ => Err(self.error(expected)),
        }
    }

    fn program(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];
        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        Ok(statements)
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(Token::Fun) => self.nested(Self::function),
            Some(Token::Var) => self.var_declaration(),
            _ => self.statement(),
        }
    }

    fn function(&mut self) -> ParseResult<Stmt> {
        let position = self.expect(&Token::Fun, "'fun'")?;
        let (name, _) = self.identifier("function name")?;
        self.expect(&Token::LeftParen, "'(' after function name")?;

        let mut parameters = vec![];
        if !self.check(&Token::RightParen) {
            loop {
                let (parameter, position) = self.identifier("parameter name")?;
                if parameters.contains(&parameter) {
                    return Err(LoxError::syntax(format!("duplicate parameter '{}'", parameter), position));
                }
                parameters.push(parameter);
                if self.matches(&Token::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen, "')' after parameters")?;

        let body = self.block()?;
        let declaration = FunctionDeclaration { name, parameters, body, position };
        Ok(Stmt::new(StmtKind::Function(Rc::new(declaration)), position))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let position = self.expect(&Token::Var, "'var'")?;
        let (name, _) = self.identifier("variable name")?;
        let initializer = match self.matches(&Token::Equal) {
            Some(_) => Some(self.expression()?),
            None => None,
        };
        self.expect(&Token::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::new(StmtKind::Var { name, initializer }, position))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::statement_kind)
    }

    fn statement_kind(&mut self) -> ParseResult<Stmt> {
        let position = self.position();
        match self.peek() {
            Some(Token::Print) => {
                self.advance();
                let value = self.expression()?;
                self.expect(&Token::Semicolon, "';' after value")?;
                Ok(Stmt::new(StmtKind::Print(value), position))
            }
            Some(Token::LeftBrace) => Ok(Stmt::new(StmtKind::Block(self.block()?), position)),
            Some(Token::If) => self.if_statement(),
            Some(Token::While) => {
                self.advance();
                self.expect(&Token::LeftParen, "'(' after 'while'")?;
                let condition = self.expression()?;
                self.expect(&Token::RightParen, "')' after condition")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::new(StmtKind::While { condition, body }, position))
            }
            Some(Token::For) => self.for_statement(),
            Some(Token::Return) => {
                self.advance();
                let value = match self.check(&Token::Semicolon) {
                    true => None,
                    false => Some(self.expression()?),
                };
                self.expect(&Token::Semicolon, "';' after return value")?;
                Ok(Stmt::new(StmtKind::Return(value), position))
            }
            _ => {
                let expression = self.expression()?;
                self.expect(&Token::Semicolon, "';' after expression")?;
                Ok(Stmt::new(StmtKind::Expression(expression), position))
            }
        }
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(&Token::LeftBrace, "'{'")?;
        let mut statements = vec![];
        while !self.check(&Token::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.expect(&Token::RightBrace, "'}' after block")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let position = self.expect(&Token::If, "'if'")?;
        self.expect(&Token::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(&Token::RightParen, "')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = match self.matches(&Token::Else) {
            Some(_) => Some(Box::new(self.statement()?)),
            None => None,
        };
        Ok(Stmt::new(StmtKind::If { condition, then_branch, else_branch }, position))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let position = self.expect(&Token::For, "'for'")?;
        self.expect(&Token::LeftParen, "'(' after 'for'")?;

        let initializer = match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                None
            }
            Some(Token::Var) => Some(Box::new(self.var_declaration()?)),
            _ => {
                let position = self.position();
                let expression = self.expression()?;
                self.expect(&Token::Semicolon, "';' after loop initializer")?;
                Some(Box::new(Stmt::new(StmtKind::Expression(expression), position)))
            }
        };

        let condition = match self.check(&Token::Semicolon) {
            true => None,
            false => Some(self.expression()?),
        };
        self.expect(&Token::Semicolon, "';' after loop condition")?;

        let increment = match self.check(&Token::RightParen) {
            true => None,
            false => Some(self.expression()?),
        };
        self.expect(&Token::RightParen, "')' after for clauses")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::new(StmtKind::For { initializer, condition, increment, body }, position))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let target = self.or()?;

        if let Some(position) = self.matches(&Token::Equal) {
            let value = Box::new(self.nested(Self::assignment)?);
            return match target.kind {
                ExprKind::Variable(name) => Ok(Expr::new(ExprKind::Assign { name, value }, position)),
                _ => Err(LoxError::syntax("invalid assignment target", position)),
            };
        }

        Ok(target)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut left = self.and()?;
        while let Some(position) = self.matches(&Token::Or) {
            self.descend()?;
            let right = Box::new(self.and()?);
            left = Expr::new(ExprKind::Logical { left: Box::new(left), operator: LogicalOperator::Or, right }, position);
        }
        self.depth = depth;
        Ok(left)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut left = self.equality()?;
        while let Some(position) = self.matches(&Token::And) {
            self.descend()?;
            let right = Box::new(self.equality()?);
            left = Expr::new(ExprKind::Logical { left: Box::new(left), operator: LogicalOperator::And, right }, position);
        }
        self.depth = depth;
        Ok(left)
    }

    /// Parses a left-associative chain of the operators `operator_for` accepts.
    ///
    /// Every link nests the chain so far one level deeper, so links count
    /// against the nesting limit until the chain ends.
    fn binary_chain(
        &mut self,
        operator_for: impl Fn(&Token<'_>) -> Option<BinaryOperator>,
        operand: impl Fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut left = operand(self)?;
        while let Some(operator) = self.peek().and_then(&operator_for) {
            let position = self.position();
            self.descend()?;
            self.advance();
            let right = Box::new(operand(self)?);
            left = Expr::new(ExprKind::Binary { left: Box::new(left), operator, right }, position);
        }
        self.depth = depth;
        Ok(left)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_chain(
            |token| match token {
                Token::EqualEqual => Some(BinaryOperator::Equal),
                Token::BangEqual => Some(BinaryOperator::NotEqual),
                _ => None,
            },
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_chain(
            |token| match token {
                Token::Less => Some(BinaryOperator::Less),
                Token::LessEqual => Some(BinaryOperator::LessEqual),
                Token::Greater => Some(BinaryOperator::Greater),
                Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
                _ => None,
            },
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_chain(
            |token| match token {
                Token::Plus => Some(BinaryOperator::Add),
                Token::Minus => Some(BinaryOperator::Subtract),
                _ => None,
            },
            Self::factor,
        )
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_chain(
            |token| match token {
                Token::Star => Some(BinaryOperator::Multiply),
                Token::Slash => Some(BinaryOperator::Divide),
                Token::Percent => Some(BinaryOperator::Remainder),
                _ => None,
            },
            Self::unary,
        )
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let operator = match self.peek() {
            Some(Token::Minus) => UnaryOperator::Negate,
            Some(Token::Bang | Token::Not) => UnaryOperator::Not,
            _ => return self.call(),
        };
        let position = self.position();
        self.advance();
        let operand = Box::new(self.nested(Self::unary)?);
        Ok(Expr::new(ExprKind::Unary { operator, operand }, position))
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut callee = self.primary()?;

        while let Some(position) = self.matches(&Token::LeftParen) {
            self.descend()?;
            let mut arguments = vec![];
            if !self.check(&Token::RightParen) {
                loop {
                    arguments.push(self.expression()?);
                    if self.matches(&Token::Comma).is_none() {
                        break;
                    }
                }
            }
            self.expect(&Token::RightParen, "')' after arguments")?;
            callee = Expr::new(ExprKind::Call { callee: Box::new(callee), arguments }, position);
        }

        self.depth = depth;
        Ok(callee)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let position = self.position();
        let literal = match self.peek() {
            Some(Token::Number(number)) => Literal::Number(*number),
            Some(Token::String(string)) => Literal::String(string.to_string()),
            Some(Token::True) => Literal::Boolean(true),
            Some(Token::False) => Literal::Boolean(false),
            Some(Token::Nil) => Literal::Nil,
            Some(Token::Identifier(name)) => {
                let name = name.to_string();
                self.advance();
                return Ok(Expr::new(ExprKind::Variable(name), position));
            }
            Some(Token::LeftParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RightParen, "')' after expression")?;
                return Ok(Expr::new(ExprKind::Grouping(Box::new(inner)), position));
            }
            _ => return Err(self.error("expression")),
        };
        self.advance();
        Ok(Expr::new(ExprKind::Literal(literal), position))
    }
}

/// Parses a whole program.
pub fn parse(input: &str) -> ParseResult<Vec<Stmt>> {
    let (tokens, end) = lexer(input)?;
    Parser::new(tokens, end).program()
}

/// Parses one unit of interactive input.
///
/// A trailing `;` may be left off. Input that is exactly one expression with
/// no `;` of its own comes back as [Unit::Expression] so the caller can show
/// its value.
pub fn parse_unit(input: &str) -> ParseResult<Unit> {
    let (mut tokens, end) = lexer(input)?;
    let terminated = matches!(tokens.last(), None | Some((Token::Semicolon | Token::RightBrace, _)));
    if !terminated {
        tokens.push((Token::Semicolon, end));
    }

    let mut parser = Parser::new(tokens, end);
    // `f(1);` written out in full is a statement and shows nothing
    if !terminated {
        if let Ok(expression) = parser.expression() {
            if parser.matches(&Token::Semicolon).is_some() && parser.is_at_end() {
                return Ok(Unit::Expression(expression));
            }
        }
        parser.current = 0;
        parser.depth = 0;
    }

    parser.program().map(Unit::Statements)
}

/// True when `input` has more opening than closing braces or parentheses, so
/// an interactive reader should ask for another line.
pub fn is_incomplete(input: &str) -> bool {
    let Ok((tokens, _)) = lexer(input) else {
        // An unterminated string keeps the unit open too
        return input.matches('"').count() % 2 == 1;
    };
    let depth = tokens.iter().fold(0i64, |depth, (token, _)| match token {
        Token::LeftBrace | Token::LeftParen => depth + 1,
        Token::RightBrace | Token::RightParen => depth - 1,
        _ => depth,
    });
    depth > 0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::ErrorKind;

    use super::*;

    fn literal(literal: Literal, line: usize, column: usize) -> Expr {
        Expr::new(ExprKind::Literal(literal), Position::new(line, column))
    }

    #[test]
    fn precedence_and_positions() -> anyhow::Result<()> {
        let statements = parse("print 1 + 2 * 3;")?;
        let expected = Stmt::new(
            StmtKind::Print(Expr::new(
                ExprKind::Binary {
                    left: Box::new(literal(Literal::Number(1.0), 1, 7)),
                    operator: BinaryOperator::Add,
                    right: Box::new(Expr::new(
                        ExprKind::Binary {
                            left: Box::new(literal(Literal::Number(2.0), 1, 11)),
                            operator: BinaryOperator::Multiply,
                            right: Box::new(literal(Literal::Number(3.0), 1, 15)),
                        },
                        Position::new(1, 13),
                    )),
                },
                Position::new(1, 9),
            )),
            Position::new(1, 1),
        );
        assert_eq!(statements, vec![expected]);
        Ok(())
    }

    #[test]
    fn positions_track_lines() -> anyhow::Result<()> {
        let statements = parse("var a = 1;\n  // comment\n  a = \"two\";")?;
        assert_eq!(statements[1].position, Position::new(3, 3));
        match &statements[1].kind {
            StmtKind::Expression(Expr { kind: ExprKind::Assign { name, value }, .. }) => {
                assert_eq!(name, "a");
                assert_eq!(**value, literal(Literal::String("two".into()), 3, 7));
            }
            other => panic!("unexpected statement {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn for_clauses_are_optional() -> anyhow::Result<()> {
        let statements = parse("for (;;) print 1;")?;
        match &statements[0].kind {
            StmtKind::For { initializer: None, condition: None, increment: None, .. } => Ok(()),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn function_declaration() -> anyhow::Result<()> {
        let statements = parse("fun add(a, b) { return a + b; }")?;
        match &statements[0].kind {
            StmtKind::Function(declaration) => {
                assert_eq!(declaration.name, "add");
                assert_eq!(declaration.parameters, vec!["a".to_owned(), "b".to_owned()]);
                assert_eq!(declaration.body.len(), 1);
                Ok(())
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn syntax_errors() {
        for source in ["print 1", "var = 3;", "1 + ;", "(1 + 2) = 3;", "fun f(a, a) {}", "print \"open;", "print @;"] {
            let error = parse(source).expect_err(source);
            assert_eq!(error.kind(), ErrorKind::Syntax, "{}", source);
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let depth = 100_000;
        let sources = [
            format!("{}print 1;{}", "{".repeat(depth), "}".repeat(depth)),
            format!("{}print 1;", "while (true) ".repeat(depth)),
            format!("{}}}", "fun f() { ".repeat(depth)),
            format!("print {}1{};", "(".repeat(depth), ")".repeat(depth)),
            format!("print {}1;", "-".repeat(depth)),
            format!("print {}1;", "!".repeat(depth)),
            format!("print 1{};", " + 1".repeat(depth)),
            format!("print true{};", " or false".repeat(depth)),
            format!("print clock{};", "()".repeat(depth)),
            format!("{}1;", "a = ".repeat(depth)),
        ];

        for source in &sources {
            match parse(source) {
                Err(LoxError::Syntax { message, .. }) => assert_eq!(message, "nesting too deep"),
                other => panic!("unexpected result {:?}", other.map(|statements| statements.len())),
            }
        }
    }

    #[test]
    fn nesting_below_the_limit_parses() -> anyhow::Result<()> {
        let depth = MAX_NESTING_DEPTH / 2;
        parse(&format!("{}print 1;{}", "{".repeat(depth), "}".repeat(depth)))?;
        parse(&format!("print 1{};", " + 1".repeat(depth)))?;
        parse(&format!("print {}1;", "-".repeat(depth)))?;
        Ok(())
    }

    #[test]
    fn unit_distinguishes_expressions() -> anyhow::Result<()> {
        assert!(matches!(parse_unit("1 + 2")?, Unit::Expression(_)));
        assert!(matches!(parse_unit("f(1)")?, Unit::Expression(_)));
        assert!(matches!(parse_unit("f(1);")?, Unit::Statements(_)));
        assert!(matches!(parse_unit("print 3")?, Unit::Statements(_)));
        assert!(matches!(parse_unit("var x = 1")?, Unit::Statements(_)));
        assert!(matches!(parse_unit("{ var y = 2; }")?, Unit::Statements(_)));
        Ok(())
    }

    #[test]
    fn incomplete_input() {
        assert!(is_incomplete("fun f() {"));
        assert!(is_incomplete("print \"abc"));
        assert!(!is_incomplete("fun f() { return 1; }"));
        assert!(!is_incomplete("print 1;"));
    }
}
