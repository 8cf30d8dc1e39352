use std::ops::Add;

use sqlgate_core::Position;

use crate::ast::{
    self, BinaryOp, ColumnRef, Expr, FromClause, FunctionArgs, FunctionCall, Ident, Join,
    JoinKind, LimitValue, Literal, NullsOrder, OrderByItem, OrderDirection, Precedence,
    SelectItem, Statement, TableRef, UnaryOp,
};
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Keyword, Token, TokenKind};

/// Expression nesting allowed before the parser gives up.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a token stream into a single SELECT statement.
///
/// The whole stream must form exactly one statement, optionally followed by a `;`.
/// The first construct outside the grammar aborts parsing; there is no recovery.
pub fn parse(tokens: Vec<Token>) -> Result<Statement> {
    let mut parser = Parser::new(tokens);
    parser.check_statement_start()?;
    parser.scan_structure()?;
    let statement = parser.parse_select()?;
    parser.next_is(&TokenKind::Semicolon);
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected(token));
    }
    Ok(statement)
}

/// Recursive-descent parser over a lexed token vector.
///
/// The parser only knows the grammar. Whether tables, columns or functions are
/// allowed is decided later by the policy engine.
pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    /// The statement must begin with SELECT.
    fn check_statement_start(&self) -> Result<()> {
        let Some(first) = self.tokens.first() else {
            return Err(ParseError::unsupported("empty statement", Position::start()));
        };
        match &first.kind {
            TokenKind::Keyword(Keyword::Select) => Ok(()),
            TokenKind::Keyword(Keyword::With) => Err(ParseError::unsupported(
                "common table expressions are not supported",
                first.position,
            )),
            TokenKind::Keyword(k) if k.is_write_statement() => Err(ParseError::unsupported(
                format!("{} statements are not allowed", k),
                first.position,
            )),
            _ => Err(ParseError::unsupported(
                format!("statement must start with SELECT, found {}", first.kind),
                first.position,
            )),
        }
    }

    /// Rejects stacked statements and subqueries before any grammar work. The first
    /// offending token in source order decides the error.
    fn scan_structure(&self) -> Result<()> {
        for (i, token) in self.tokens.iter().enumerate().skip(1) {
            match &token.kind {
                TokenKind::Semicolon if i + 1 < self.tokens.len() => {
                    return Err(ParseError::new(
                        ParseErrorKind::MultipleStatements,
                        "only one statement is allowed",
                        self.tokens[i + 1].position,
                    ));
                }
                TokenKind::Keyword(Keyword::Select) | TokenKind::Keyword(Keyword::Exists) => {
                    return Err(ParseError::new(
                        ParseErrorKind::NestedQuery,
                        "subqueries are not allowed",
                        token.position,
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_nth_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.cursor + n).map(|t| &t.kind)
    }

    /// Position used for errors at end of input.
    fn end_position(&self) -> Position {
        self.tokens
            .last()
            .map(|t| t.position)
            .unwrap_or_else(Position::start)
    }

    fn next(&mut self) -> Result<Token> {
        match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::unsupported(
                "unexpected end of input",
                self.end_position(),
            )),
        }
    }

    /// Consumes the next token if it equals `kind`.
    fn next_is(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn next_is_keyword(&mut self, keyword: Keyword) -> bool {
        self.next_is(&TokenKind::Keyword(keyword))
    }

    /// Consumes the next token if it is the unquoted word `word`. Used for words that
    /// only have meaning in one position (NULLS FIRST/LAST).
    fn next_is_word(&mut self, word: &str) -> bool {
        if matches!(self.peek_kind(), Some(TokenKind::Ident(w)) if w == word) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(ParseError::unsupported(
                format!("expected {}, found {}", kind, token.kind),
                token.position,
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        self.expect(TokenKind::Keyword(keyword))
    }

    fn next_ident(&mut self) -> Result<Ident> {
        let token = self.next()?;
        ident_from(&token).ok_or_else(|| {
            ParseError::unsupported(
                format!("expected identifier, found {}", token.kind),
                token.position,
            )
        })
    }

    fn peek_is_ident(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Ident(_) | TokenKind::QuotedIdent(_))
        )
    }

    /// Error for a token the grammar has no place for, with a specific message for the
    /// constructs people actually try.
    fn unexpected(&self, token: &Token) -> ParseError {
        let detail = match &token.kind {
            TokenKind::Keyword(Keyword::Union | Keyword::Intersect | Keyword::Except) => {
                "set operations are not supported".to_string()
            }
            TokenKind::Keyword(Keyword::Into) => "SELECT INTO is not supported".to_string(),
            TokenKind::Keyword(Keyword::For) => "locking clauses are not supported".to_string(),
            TokenKind::Keyword(Keyword::Fetch) => "FETCH is not supported, use LIMIT".to_string(),
            TokenKind::Keyword(Keyword::Window | Keyword::Over) => {
                "window functions are not supported".to_string()
            }
            TokenKind::Keyword(Keyword::Returning) => "RETURNING is not supported".to_string(),
            TokenKind::Comma => "comma-separated FROM lists are not supported".to_string(),
            kind => format!("unexpected {}", kind),
        };
        ParseError::unsupported(detail, token.position)
    }

    fn unexpected_next(&self) -> ParseError {
        match self.peek() {
            Some(token) => self.unexpected(token),
            None => ParseError::unsupported("unexpected end of input", self.end_position()),
        }
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Select)?;
        let distinct = self.next_is_keyword(Keyword::Distinct);
        let projection = self.parse_select_list()?;

        let from = if self.next_is_keyword(Keyword::From) {
            Some(self.parse_from_clause()?)
        } else {
            None
        };

        let selection = if self.next_is_keyword(Keyword::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.next_is_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            loop {
                group_by.push(self.parse_expression()?);
                if !self.next_is(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let having = if self.next_is_keyword(Keyword::Having) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.next_is_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            loop {
                order_by.push(self.parse_order_by_item()?);
                if !self.next_is(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let (limit, offset) = self.parse_limit_offset()?;

        Ok(Statement {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_select_item()?);
            if !self.next_is(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if let Some(Token {
            kind: TokenKind::Asterisk,
            position,
            ..
        }) = self.peek()
        {
            let position = *position;
            self.cursor += 1;
            return Ok(SelectItem::Wildcard(position));
        }

        if self.peek_is_ident()
            && self.peek_nth_kind(1) == Some(&TokenKind::Period)
            && self.peek_nth_kind(2) == Some(&TokenKind::Asterisk)
        {
            let qualifier = self.next_ident()?;
            self.cursor += 2;
            return Ok(SelectItem::QualifiedWildcard(qualifier));
        }

        let expr = self.parse_expression()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    /// `[AS] alias`
    fn parse_alias(&mut self) -> Result<Option<Ident>> {
        if self.next_is_keyword(Keyword::As) {
            return self.next_ident().map(Some);
        }
        if self.peek_is_ident() {
            return self.next_ident().map(Some);
        }
        Ok(None)
    }

    fn parse_from_clause(&mut self) -> Result<FromClause> {
        let base = self.parse_table_ref()?;
        let mut joins = Vec::new();
        while let Some((kind, position)) = self.parse_join_kind()? {
            let table = self.parse_table_ref()?;
            if let Some(Token {
                kind: TokenKind::Keyword(Keyword::Using),
                position,
                ..
            }) = self.peek()
            {
                return Err(ParseError::unsupported(
                    "JOIN ... USING is not supported, use ON",
                    *position,
                ));
            }
            self.expect_keyword(Keyword::On)?;
            let on = self.parse_expression()?;
            joins.push(Join {
                kind,
                table,
                on,
                position,
            });
        }
        Ok(FromClause { base, joins })
    }

    /// Parses the keywords introducing a join, if any.
    fn parse_join_kind(&mut self) -> Result<Option<(JoinKind, Position)>> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let position = token.position;
        let kind = match &token.kind {
            TokenKind::Keyword(Keyword::Join) => JoinKind::Inner,
            TokenKind::Keyword(Keyword::Inner) => JoinKind::Inner,
            TokenKind::Keyword(Keyword::Left) => JoinKind::Left,
            TokenKind::Keyword(Keyword::Right) => JoinKind::Right,
            TokenKind::Keyword(Keyword::Full) => JoinKind::Full,
            TokenKind::Keyword(Keyword::Cross | Keyword::Natural) => {
                return Err(ParseError::unsupported(
                    "CROSS and NATURAL joins are not supported",
                    position,
                ));
            }
            TokenKind::Comma => {
                return Err(ParseError::unsupported(
                    "comma-separated FROM lists are not supported, use JOIN ... ON",
                    position,
                ));
            }
            _ => return Ok(None),
        };
        let first = self.next()?;
        if first.kind != TokenKind::Keyword(Keyword::Join) {
            if kind != JoinKind::Inner {
                self.next_is_keyword(Keyword::Outer);
            }
            self.expect_keyword(Keyword::Join)?;
        }
        Ok(Some((kind, position)))
    }

    /// `name [. name] [[AS] alias]`
    fn parse_table_ref(&mut self) -> Result<TableRef> {
        if let Some(Token {
            kind: TokenKind::Keyword(Keyword::Lateral),
            position,
            ..
        }) = self.peek()
        {
            return Err(ParseError::unsupported("LATERAL is not supported", *position));
        }
        if self.peek_kind() == Some(&TokenKind::OpenParen) {
            return Err(self.unexpected_next());
        }

        let first = self.next_ident()?;
        let (schema, name) = if self.next_is(&TokenKind::Period) {
            let name = self.next_ident()?;
            if let Some(Token {
                kind: TokenKind::Period,
                position,
                ..
            }) = self.peek()
            {
                return Err(ParseError::unsupported(
                    "three-part names are not supported",
                    *position,
                ));
            }
            (Some(first), name)
        } else {
            (None, first)
        };

        if let Some(Token {
            kind: TokenKind::OpenParen,
            position,
            ..
        }) = self.peek()
        {
            return Err(ParseError::unsupported(
                "table functions are not supported",
                *position,
            ));
        }

        let alias = self.parse_alias()?;
        Ok(TableRef {
            schema,
            name,
            alias,
        })
    }

    fn parse_order_by_item(&mut self) -> Result<OrderByItem> {
        let expr = self.parse_expression()?;
        let direction = if self.next_is_keyword(Keyword::Asc) {
            Some(OrderDirection::Asc)
        } else if self.next_is_keyword(Keyword::Desc) {
            Some(OrderDirection::Desc)
        } else {
            None
        };
        let nulls = if self.next_is_word("nulls") {
            if self.next_is_word("first") {
                Some(NullsOrder::First)
            } else if self.next_is_word("last") {
                Some(NullsOrder::Last)
            } else {
                return Err(self.unexpected_next());
            }
        } else {
            None
        };
        Ok(OrderByItem {
            expr,
            direction,
            nulls,
        })
    }

    /// `[LIMIT (n | ALL)] [OFFSET n]`, in either order.
    fn parse_limit_offset(&mut self) -> Result<(Option<LimitValue>, Option<u64>)> {
        let mut limit = None;
        let mut offset = None;
        loop {
            if limit.is_none() && self.next_is_keyword(Keyword::Limit) {
                limit = Some(if self.next_is_keyword(Keyword::All) {
                    LimitValue::All
                } else {
                    let (value, _) = self.parse_integer("LIMIT")?;
                    LimitValue::Count(value)
                });
            } else if offset.is_none() && self.next_is_keyword(Keyword::Offset) {
                let (value, position) = self.parse_integer("OFFSET")?;
                if value > i64::MAX as u64 {
                    return Err(ParseError::unsupported("OFFSET is out of range", position));
                }
                offset = Some(value);
            } else {
                break;
            }
        }
        Ok((limit, offset))
    }

    /// A non-negative integer literal. Values past `u64::MAX` saturate.
    fn parse_integer(&mut self, clause: &str) -> Result<(u64, Position)> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Number(n) if n.bytes().all(|b| b.is_ascii_digit()) => {
                let value = n.parse::<u64>().unwrap_or(u64::MAX);
                Ok((value, token.position))
            }
            kind => Err(ParseError::unsupported(
                format!("{} requires a non-negative integer, found {}", clause, kind),
                token.position,
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_expression_at(0)
    }

    /// Precedence climbing. Prefix operators and atoms form the left-hand side; infix
    /// and postfix operators at or above `min_precedence` are folded in from the left.
    fn parse_expression_at(&mut self, min_precedence: Precedence) -> Result<Expr> {
        self.enter()?;
        let result = self.parse_expression_inner(min_precedence);
        self.depth -= 1;
        result
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            let position = self
                .peek()
                .map(|t| t.position)
                .unwrap_or_else(|| self.end_position());
            self.depth -= 1;
            return Err(ParseError::unsupported(
                format!(
                    "expression nesting exceeds {} levels",
                    MAX_EXPRESSION_DEPTH
                ),
                position,
            ));
        }
        Ok(())
    }

    fn parse_expression_inner(&mut self, min_precedence: Precedence) -> Result<Expr> {
        let mut lhs = if let Some(prefix) = self.parse_prefix_operator_at(min_precedence) {
            let next_precedence = prefix.precedence() + Associativity::Right;
            let operand = self.parse_expression_at(next_precedence)?;
            Expr::Unary {
                op: prefix,
                expr: Box::new(operand),
            }
        } else {
            self.parse_expression_atom()?
        };

        // Each folded operator deepens the left spine of the tree.
        let mut chain = 0;
        loop {
            let folded = if let Some(op) = self.parse_infix_operator_at(min_precedence) {
                let next_precedence = op.precedence() + Associativity::Left;
                let rhs = self.parse_expression_at(next_precedence)?;
                Expr::Binary {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                }
            } else if let Some(postfix) = self.parse_postfix_operator_at(min_precedence)? {
                postfix.into_expression(self, lhs)?
            } else {
                break;
            };
            lhs = folded;
            chain += 1;
            if self.depth + chain > MAX_EXPRESSION_DEPTH {
                return Err(ParseError::unsupported(
                    format!(
                        "expression nesting exceeds {} levels",
                        MAX_EXPRESSION_DEPTH
                    ),
                    self.peek()
                        .map(|t| t.position)
                        .unwrap_or_else(|| self.end_position()),
                ));
            }
        }

        Ok(lhs)
    }

    /// Literal, column reference, function call, CASE or parenthesized expression.
    fn parse_expression_atom(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected_next());
        };
        let expr = match &token.kind {
            TokenKind::Number(n) => {
                self.cursor += 1;
                Expr::Literal(Literal::Number(n.clone()))
            }
            TokenKind::String(s) => {
                self.cursor += 1;
                Expr::Literal(Literal::String(s.clone()))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.cursor += 1;
                Expr::Literal(Literal::Boolean(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.cursor += 1;
                Expr::Literal(Literal::Boolean(false))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.cursor += 1;
                Expr::Literal(Literal::Null)
            }
            TokenKind::Keyword(Keyword::Case) => {
                self.cursor += 1;
                self.parse_case()?
            }
            TokenKind::OpenParen => {
                self.cursor += 1;
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Expr::Nested(Box::new(inner))
            }
            TokenKind::Ident(_) | TokenKind::QuotedIdent(_) => self.parse_name_expression()?,
            _ => return Err(self.unexpected(&token)),
        };
        Ok(expr)
    }

    /// Column reference or function call starting with an identifier.
    fn parse_name_expression(&mut self) -> Result<Expr> {
        let first = self.next_ident()?;

        if self.peek_kind() == Some(&TokenKind::OpenParen) {
            return self.parse_function_call(None, first);
        }

        if !self.next_is(&TokenKind::Period) {
            return Ok(Expr::Column(ColumnRef {
                qualifier: None,
                name: first,
            }));
        }

        if let Some(Token {
            kind: TokenKind::Asterisk,
            position,
            ..
        }) = self.peek()
        {
            return Err(ParseError::unsupported(
                "qualified wildcards are only allowed in the select list",
                *position,
            ));
        }
        let second = self.next_ident()?;

        match self.peek() {
            Some(Token {
                kind: TokenKind::OpenParen,
                ..
            }) => self.parse_function_call(Some(first), second),
            Some(Token {
                kind: TokenKind::Period,
                position,
                ..
            }) => Err(ParseError::unsupported(
                "three-part names are not supported",
                *position,
            )),
            _ => Ok(Expr::Column(ColumnRef {
                qualifier: Some(first),
                name: second,
            })),
        }
    }

    /// `name ( [DISTINCT] args | * )`, with the cursor on the opening parenthesis.
    fn parse_function_call(&mut self, qualifier: Option<Ident>, name: Ident) -> Result<Expr> {
        self.expect(TokenKind::OpenParen)?;

        let mut distinct = false;
        let args = if self.next_is(&TokenKind::Asterisk) {
            self.expect(TokenKind::CloseParen)?;
            FunctionArgs::Wildcard
        } else if self.next_is(&TokenKind::CloseParen) {
            FunctionArgs::Exprs(Vec::new())
        } else {
            distinct = self.next_is_keyword(Keyword::Distinct);
            let mut args = Vec::new();
            loop {
                args.push(self.parse_expression()?);
                if !self.next_is(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::CloseParen)?;
            FunctionArgs::Exprs(args)
        };

        if let Some(Token {
            kind: TokenKind::Keyword(Keyword::Over),
            position,
            ..
        }) = self.peek()
        {
            return Err(ParseError::unsupported(
                "window functions are not supported",
                *position,
            ));
        }

        Ok(Expr::Function(FunctionCall {
            qualifier,
            name,
            distinct,
            args,
        }))
    }

    /// Everything after CASE up to and including END.
    fn parse_case(&mut self) -> Result<Expr> {
        let operand = if self.peek_kind() == Some(&TokenKind::Keyword(Keyword::When)) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut branches = Vec::new();
        while self.next_is_keyword(Keyword::When) {
            let condition = self.parse_expression()?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expression()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.unexpected_next());
        }

        let else_result = if self.next_is_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            branches,
            else_result,
        })
    }

    fn parse_prefix_operator_at(&mut self, min_precedence: Precedence) -> Option<UnaryOp> {
        let op = match self.peek_kind()? {
            TokenKind::Keyword(Keyword::Not) => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            _ => return None,
        };
        if op.precedence() < min_precedence {
            return None;
        }
        self.cursor += 1;
        Some(op)
    }

    fn parse_infix_operator_at(&mut self, min_precedence: Precedence) -> Option<BinaryOp> {
        let (op, width) = match self.peek_kind()? {
            TokenKind::Keyword(Keyword::Or) => (BinaryOp::Or, 1),
            TokenKind::Keyword(Keyword::And) => (BinaryOp::And, 1),
            TokenKind::Equal => (BinaryOp::Eq, 1),
            TokenKind::NotEqual => (BinaryOp::NotEq, 1),
            TokenKind::LessThan => (BinaryOp::Lt, 1),
            TokenKind::LessThanOrEqual => (BinaryOp::LtEq, 1),
            TokenKind::GreaterThan => (BinaryOp::Gt, 1),
            TokenKind::GreaterThanOrEqual => (BinaryOp::GtEq, 1),
            TokenKind::Keyword(Keyword::Like) => (BinaryOp::Like, 1),
            TokenKind::Keyword(Keyword::ILike) => (BinaryOp::ILike, 1),
            TokenKind::Keyword(Keyword::Not) => match self.peek_nth_kind(1)? {
                TokenKind::Keyword(Keyword::Like) => (BinaryOp::NotLike, 2),
                TokenKind::Keyword(Keyword::ILike) => (BinaryOp::NotILike, 2),
                _ => return None,
            },
            TokenKind::Concat => (BinaryOp::Concat, 1),
            TokenKind::Plus => (BinaryOp::Plus, 1),
            TokenKind::Minus => (BinaryOp::Minus, 1),
            TokenKind::Asterisk => (BinaryOp::Multiply, 1),
            TokenKind::Slash => (BinaryOp::Divide, 1),
            TokenKind::Percent => (BinaryOp::Modulo, 1),
            _ => return None,
        };
        if op.precedence() < min_precedence {
            return None;
        }
        self.cursor += width;
        Some(op)
    }

    /// IS [NOT] NULL, [NOT] IN (...), [NOT] BETWEEN. All bind at comparison level.
    fn parse_postfix_operator_at(
        &mut self,
        min_precedence: Precedence,
    ) -> Result<Option<PostfixOperator>> {
        if ast::PREC_COMPARISON < min_precedence {
            return Ok(None);
        }
        let lookahead = (self.peek_kind().cloned(), self.peek_nth_kind(1).cloned());
        let (operator, width) = match lookahead {
            (Some(TokenKind::Keyword(Keyword::Is)), _) => {
                self.cursor += 1;
                let negated = self.next_is_keyword(Keyword::Not);
                let token = self.next()?;
                if token.kind != TokenKind::Keyword(Keyword::Null) {
                    return Err(ParseError::unsupported(
                        format!("only IS [NOT] NULL is supported, found {}", token.kind),
                        token.position,
                    ));
                }
                return Ok(Some(PostfixOperator::IsNull { negated }));
            }
            (Some(TokenKind::Keyword(Keyword::In)), _) => {
                (PostfixOperator::In { negated: false }, 1)
            }
            (Some(TokenKind::Keyword(Keyword::Between)), _) => {
                (PostfixOperator::Between { negated: false }, 1)
            }
            (Some(TokenKind::Keyword(Keyword::Not)), Some(TokenKind::Keyword(Keyword::In))) => {
                (PostfixOperator::In { negated: true }, 2)
            }
            (
                Some(TokenKind::Keyword(Keyword::Not)),
                Some(TokenKind::Keyword(Keyword::Between)),
            ) => (PostfixOperator::Between { negated: true }, 2),
            _ => return Ok(None),
        };
        self.cursor += width;
        Ok(Some(operator))
    }
}

fn ident_from(token: &Token) -> Option<Ident> {
    match &token.kind {
        TokenKind::Ident(value) => Some(Ident::new(value.clone(), token.position)),
        TokenKind::QuotedIdent(value) => Some(Ident::quoted(value.clone(), token.position)),
        _ => None,
    }
}

/// Operator associativity.
enum Associativity {
    Left,
    Right,
}

impl Add<Associativity> for Precedence {
    type Output = Self;

    fn add(self, rhs: Associativity) -> Self {
        // Left-associative operators parse their right operand one level tighter.
        self + match rhs {
            Associativity::Left => 1,
            Associativity::Right => 0,
        }
    }
}

/// Operators written after their left operand.
enum PostfixOperator {
    IsNull { negated: bool },
    In { negated: bool },
    Between { negated: bool },
}

impl PostfixOperator {
    /// Parses whatever follows the operator keywords and builds the expression.
    fn into_expression(self, parser: &mut Parser, lhs: Expr) -> Result<Expr> {
        let expr = Box::new(lhs);
        Ok(match self {
            Self::IsNull { negated } => Expr::IsNull { expr, negated },
            Self::In { negated } => {
                parser.expect(TokenKind::OpenParen)?;
                let mut list = Vec::new();
                loop {
                    list.push(parser.parse_expression()?);
                    if !parser.next_is(&TokenKind::Comma) {
                        break;
                    }
                }
                parser.expect(TokenKind::CloseParen)?;
                Expr::InList {
                    expr,
                    list,
                    negated,
                }
            }
            Self::Between { negated } => {
                let low = parser.parse_expression_at(ast::PREC_CONCAT)?;
                parser.expect_keyword(Keyword::And)?;
                let high = parser.parse_expression_at(ast::PREC_CONCAT)?;
                Expr::Between {
                    expr,
                    negated,
                    low: Box::new(low),
                    high: Box::new(high),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_str(sql: &str) -> Result<Statement> {
        parse(tokenize(sql).unwrap())
    }

    fn error_kind(sql: &str) -> ParseErrorKind {
        parse_str(sql).unwrap_err().kind
    }

    #[test]
    fn test_parse_simple_select() {
        let stmt = parse_str("SELECT id, name FROM seller ORDER BY name;").unwrap();
        assert!(!stmt.distinct);
        assert_eq!(stmt.projection.len(), 2);
        let from = stmt.from.as_ref().unwrap();
        assert_eq!(from.base.name.value, "seller");
        assert!(from.joins.is_empty());
        assert_eq!(stmt.order_by.len(), 1);
        assert_eq!(stmt.limit, None);
    }

    #[test]
    fn test_parse_join_with_aliases() {
        let stmt = parse_str(
            "SELECT s.name, p.title FROM seller AS s LEFT OUTER JOIN product p ON p.seller_id = s.id",
        )
        .unwrap();
        let from = stmt.from.unwrap();
        assert_eq!(from.base.binding().value, "s");
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].kind, JoinKind::Left);
        assert_eq!(from.joins[0].table.binding().value, "p");
    }

    #[test]
    fn test_parse_limit_and_offset() {
        let stmt = parse_str("SELECT id FROM seller LIMIT 10 OFFSET 5").unwrap();
        assert_eq!(stmt.limit, Some(LimitValue::Count(10)));
        assert_eq!(stmt.offset, Some(5));

        let stmt = parse_str("SELECT id FROM seller OFFSET 5 LIMIT ALL").unwrap();
        assert_eq!(stmt.limit, Some(LimitValue::All));
        assert_eq!(stmt.offset, Some(5));

        let stmt = parse_str("SELECT id FROM seller LIMIT 99999999999999999999999").unwrap();
        assert_eq!(stmt.limit, Some(LimitValue::Count(u64::MAX)));
    }

    #[test]
    fn test_precedence() {
        let stmt = parse_str("SELECT 1 + 2 * 3").unwrap();
        let SelectItem::Expr { expr, .. } = &stmt.projection[0] else {
            panic!("expected expression");
        };
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinaryOp::Plus);
        assert!(matches!(
            **right,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_between_binds_tighter_than_and() {
        let stmt = parse_str("SELECT id FROM t WHERE a BETWEEN 1 AND 2 AND b = 3").unwrap();
        let Some(Expr::Binary { left, op, .. }) = stmt.selection else {
            panic!("expected AND at the top");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*left, Expr::Between { negated: false, .. }));
    }

    #[test]
    fn test_multiple_statements() {
        let err = parse_str("SELECT * FROM seller; DROP TABLE seller;").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MultipleStatements);
        assert_eq!(err.position, Position::new(1, 23));
        assert_eq!(error_kind("SELECT 1; SELECT 2"), ParseErrorKind::MultipleStatements);
    }

    #[test]
    fn test_nested_queries() {
        for sql in [
            "SELECT id FROM seller WHERE id IN (SELECT seller_id FROM product)",
            "SELECT (SELECT 1)",
            "SELECT id FROM seller WHERE EXISTS (SELECT 1)",
            "SELECT id FROM seller UNION SELECT id FROM product",
        ] {
            assert_eq!(error_kind(sql), ParseErrorKind::NestedQuery, "{}", sql);
        }
    }

    #[test]
    fn test_unsupported_constructs() {
        for sql in [
            "",
            ";",
            "DELETE FROM seller",
            "INSERT INTO seller VALUES (1)",
            "UPDATE seller SET name = 'x'",
            "DROP TABLE seller",
            "WITH x AS (VALUES (1)) TABLE x",
            "COPY seller TO STDOUT",
            "SELECT id FROM seller, product",
            "SELECT id FROM seller CROSS JOIN product",
            "SELECT id FROM seller NATURAL JOIN product",
            "SELECT id FROM seller JOIN product USING (id)",
            "SELECT id INTO backup FROM seller",
            "SELECT row_number() OVER (ORDER BY id) FROM seller",
            "SELECT id FROM seller LIMIT 1.5",
            "SELECT id FROM seller LIMIT -1",
            "SELECT id FROM a.b.c",
            "SELECT a.b.c FROM seller",
            "SELECT id FROM seller FOR UPDATE",
            "SELECT id FROM seller WHERE id IS TRUE",
            "SELECT id FROM generate_series(1, 10)",
            "SELECT id FROM seller WHERE",
            "SELECT count(t.*) FROM seller t",
            "SELECT id FROM seller OFFSET 99999999999999999999",
        ] {
            assert_eq!(
                error_kind(sql),
                ParseErrorKind::UnsupportedConstruct,
                "{:?}",
                sql
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("SELECT {}1{}", "(".repeat(70), ")".repeat(70));
        assert_eq!(error_kind(&deep), ParseErrorKind::UnsupportedConstruct);

        let shallow = format!("SELECT {}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_str(&shallow).is_ok());

        let long_chain = format!("SELECT 1{}", " + 1".repeat(500));
        assert_eq!(error_kind(&long_chain), ParseErrorKind::UnsupportedConstruct);

        let nots = format!("SELECT {}TRUE", "NOT ".repeat(100));
        assert_eq!(error_kind(&nots), ParseErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn test_count_star_and_distinct_args() {
        let stmt = parse_str("SELECT count(*), count(DISTINCT seller_id) FROM product").unwrap();
        let SelectItem::Expr {
            expr: Expr::Function(count_star),
            ..
        } = &stmt.projection[0]
        else {
            panic!("expected function");
        };
        assert_eq!(count_star.args, FunctionArgs::Wildcard);
        assert_eq!(count_star.args.arity(), 1);

        let SelectItem::Expr {
            expr: Expr::Function(count_distinct),
            ..
        } = &stmt.projection[1]
        else {
            panic!("expected function");
        };
        assert!(count_distinct.distinct);
    }

    #[test]
    fn test_qualified_wildcard() {
        let stmt = parse_str("SELECT s.* FROM seller s").unwrap();
        assert!(matches!(&stmt.projection[0], SelectItem::QualifiedWildcard(q) if q.value == "s"));
    }

    #[test]
    fn test_order_by_modifiers() {
        let stmt = parse_str("SELECT id FROM seller ORDER BY name DESC NULLS LAST, id").unwrap();
        assert_eq!(stmt.order_by[0].direction, Some(OrderDirection::Desc));
        assert_eq!(stmt.order_by[0].nulls, Some(NullsOrder::Last));
        assert_eq!(stmt.order_by[1].direction, None);
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_str("SELECT id FROM seller WHERE id = 1 garbage more").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnsupportedConstruct);
    }
}
