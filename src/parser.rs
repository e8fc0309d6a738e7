use crate::ast::*;
use crate::error::{Error, Result};
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::{ColumnDef, DataType, Value};

/// Recursive-descent parser for a single statement.
///
/// The token vector holds one statement; an [TokenKind::Eof] token placed at
/// `end_offset` is appended so lookahead never runs off the end.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>, end_offset: usize) -> Self {
        tokens.push(Token::new(TokenKind::Eof, end_offset));
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_token() {
            TokenKind::Create => self.parse_create_table(),
            TokenKind::Drop => self.parse_drop_table(),
            TokenKind::Insert => self.parse_insert(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Update => self.parse_update(),
            TokenKind::Delete => self.parse_delete(),
            _ => Err(self.unexpected("CREATE, DROP, INSERT, SELECT, UPDATE or DELETE")),
        }?;

        // semicolon is optional in SQL so skip it
        if matches!(self.current_token(), TokenKind::Semicolon) {
            self.advance();
        }

        // Check we are at the end of the statement
        if !self.is_at_end() {
            return Err(self.unexpected("end of statement"));
        }

        tracing::trace!(kind = statement.kind(), table = statement.table(), "parsed");
        Ok(statement)
    }

    //helpers
    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn current_token(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::Syntax {
            offset: self.current().offset,
            found: self.current_token().to_string(),
            expected: expected.to_string(),
        }
    }

    /// Advances past the current token if it matches `expected`.
    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: TokenKind) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn consume_ident(&mut self) -> Result<String> {
        match self.current_token() {
            TokenKind::Ident(string) => {
                let string = string.clone();
                self.advance();
                Ok(string)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn consume_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current_token() {
            TokenKind::Integer => DataType::Integer,
            TokenKind::Text => DataType::Text,
            TokenKind::Boolean => DataType::Boolean,
            _ => return Err(self.unexpected("column type")),
        };
        self.advance();
        Ok(data_type)
    }

    /// Parses `item (, item)*` using `parse_item` for each element.
    fn parse_comma_list<T>(
        &mut self,
        mut parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = vec![parse_item(self)?];
        while self.eat(&TokenKind::Comma) {
            items.push(parse_item(self)?);
        }
        Ok(items)
    }

    /// Parses `( item, ... )`.
    fn parse_parenthesized<T>(
        &mut self,
        parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.consume(TokenKind::LeftParen)?;
        let items = self.parse_comma_list(parse_item)?;
        self.consume(TokenKind::RightParen)?;
        Ok(items)
    }

    fn parse_where(&mut self) -> Result<Option<Expr>> {
        if self.eat(&TokenKind::Where) {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // --- Statements ---

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.consume_ident()?;
        let data_type = self.consume_data_type()?;

        let primary_key = if self.eat(&TokenKind::Primary) {
            self.consume(TokenKind::Key)?;
            true
        } else {
            false
        };

        Ok(ColumnDef {
            name,
            data_type,
            primary_key,
        })
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Create)?;
        self.consume(TokenKind::Table)?;
        let name = self.consume_ident()?;
        let columns = self.parse_parenthesized(Self::parse_column_def)?;
        Ok(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Drop)?;
        self.consume(TokenKind::Table)?;
        let name = self.consume_ident()?;
        Ok(Statement::DropTable(DropTable { name }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Insert)?;
        self.consume(TokenKind::Into)?;
        let table = self.consume_ident()?;

        let columns = if matches!(self.current_token(), TokenKind::LeftParen) {
            Some(self.parse_parenthesized(Self::consume_ident)?)
        } else {
            None
        };

        self.consume(TokenKind::Values)?;
        let rows = self.parse_comma_list(|p| p.parse_parenthesized(Self::parse_expr))?;

        Ok(Statement::Insert(Insert {
            table,
            columns,
            rows,
        }))
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.eat(&TokenKind::Star) {
            return Ok(SelectItem::Wildcard);
        }
        let expr = self.parse_expr()?;
        let alias = if self.eat(&TokenKind::As) {
            Some(self.consume_ident()?)
        } else {
            None
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_order_by_clause(&mut self) -> Result<OrderByClause> {
        let column = self.consume_ident()?;
        let direction = if self.eat(&TokenKind::Desc) {
            SortDirection::Desc
        } else {
            self.eat(&TokenKind::Asc);
            SortDirection::Asc
        };
        Ok(OrderByClause { column, direction })
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Select)?;
        let projection = self.parse_comma_list(Self::parse_select_item)?;
        self.consume(TokenKind::From)?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;

        let order_by = if self.eat(&TokenKind::Order) {
            self.consume(TokenKind::By)?;
            self.parse_comma_list(Self::parse_order_by_clause)?
        } else {
            vec![]
        };

        let limit = if self.eat(&TokenKind::Limit) {
            match *self.current_token() {
                TokenKind::Number(n) => {
                    self.advance();
                    // Literal numbers are never negative, the lexer only reads digits.
                    Some(usize::try_from(n).unwrap_or(usize::MAX))
                }
                _ => return Err(self.unexpected("row count")),
            }
        } else {
            None
        };

        Ok(Statement::Select(Select {
            projection,
            table,
            where_clause,
            order_by,
            limit,
        }))
    }

    fn parse_assignment(&mut self) -> Result<(String, Expr)> {
        let column = self.consume_ident()?;
        self.consume(TokenKind::Equal)?;
        let value = self.parse_expr()?;
        Ok((column, value))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Update)?;
        let table = self.consume_ident()?;
        self.consume(TokenKind::Set)?;
        let assignments = self.parse_comma_list(Self::parse_assignment)?;
        let where_clause = self.parse_where()?;
        Ok(Statement::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Delete)?;
        self.consume(TokenKind::From)?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;
        Ok(Statement::Delete(Delete {
            table,
            where_clause,
        }))
    }

    // --- Expressions, lowest precedence first ---

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Not) {
            let expr = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, expr));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match self.current_token() {
            TokenKind::Equal => BinaryOp::Eq,
            TokenKind::NotEqual => BinaryOp::NotEq,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::LtEq,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::GtEq,
            TokenKind::Is => {
                self.advance();
                let negated = self.eat(&TokenKind::Not);
                self.consume(TokenKind::Null)?;
                return Ok(Expr::IsNull {
                    expr: Box::new(left),
                    negated,
                });
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_token() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_token() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOp::Negate, expr));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let expr = match self.current_token() {
            TokenKind::Number(n) => Expr::Literal(Value::Integer(*n)),
            TokenKind::String(s) => Expr::Literal(Value::Text(s.as_str().into())),
            TokenKind::True => Expr::Literal(Value::Boolean(true)),
            TokenKind::False => Expr::Literal(Value::Boolean(false)),
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::Ident(name) => Expr::Column(name.clone()),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(TokenKind::RightParen)?;
                return Ok(expr);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }
}

/// Lazily splits SQL text on `;` and parses each non-empty statement.
///
/// A lexical or syntax error fails only the statement it occurs in; the next
/// item starts after the following `;`.
pub struct Statements {
    tokenizer: Tokenizer,
}

impl Statements {
    pub fn new(sql: &str) -> Self {
        Self {
            tokenizer: Tokenizer::new(sql),
        }
    }
}

impl Iterator for Statements {
    type Item = Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut tokens = Vec::new();
            let mut lex_error = None;
            let mut end_offset = self.tokenizer.end_offset();
            let mut terminated = false;

            for item in self.tokenizer.by_ref() {
                match item {
                    Ok(token) if token.kind == TokenKind::Semicolon => {
                        end_offset = token.offset;
                        terminated = true;
                        break;
                    }
                    Ok(token) => tokens.push(token),
                    Err(e) => {
                        lex_error.get_or_insert(e);
                    }
                }
            }

            if let Some(e) = lex_error {
                return Some(Err(e));
            }
            if tokens.is_empty() {
                if terminated {
                    continue;
                }
                return None;
            }
            return Some(Parser::new(tokens, end_offset).parse());
        }
    }
}

/// Parses every statement of `sql`, one result per non-empty statement.
pub fn parse_statements(sql: &str) -> Vec<Result<Statement>> {
    Statements::new(sql).collect()
}
