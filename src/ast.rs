use std::fmt;

use crate::{ColumnDef, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable(DropTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    /// Short name of the statement kind, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "CREATE TABLE",
            Self::DropTable(_) => "DROP TABLE",
            Self::Insert(_) => "INSERT",
            Self::Select(_) => "SELECT",
            Self::Update(_) => "UPDATE",
            Self::Delete(_) => "DELETE",
        }
    }

    /// Name of the table the statement targets.
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(s) => &s.name,
            Self::DropTable(s) => &s.name,
            Self::Insert(s) => &s.table,
            Self::Select(s) => &s.table,
            Self::Update(s) => &s.table,
            Self::Delete(s) => &s.table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Option<Vec<String>>,
    /// One entry per `VALUES` tuple.
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projection: Vec<SelectItem>,
    pub table: String,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderByClause>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        };
        write!(f, "{symbol}")
    }
}

/// Expression tree used in `WHERE` clauses, projections, assignments and
/// `VALUES` tuples.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `expr IS NULL`, or `expr IS NOT NULL` when `negated`.
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Every column name referenced by the expression, in left-to-right order.
    pub fn column_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_column_refs(&mut refs);
        refs
    }

    fn collect_column_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => refs.push(name),
            Self::Unary { expr, .. } | Self::IsNull { expr, .. } => {
                expr.collect_column_refs(refs)
            }
            Self::Binary { left, right, .. } => {
                left.collect_column_refs(refs);
                right.collect_column_refs(refs);
            }
        }
    }

    /// Writes a nested operand, parenthesized when it is itself an operator.
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary { .. } | Self::IsNull { .. } => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Literal(Value::Boolean(b)) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Column(name) => write!(f, "{name}"),
            Self::Unary { op, expr } => {
                match op {
                    UnaryOp::Not => write!(f, "NOT ")?,
                    UnaryOp::Negate => write!(f, "-")?,
                }
                expr.fmt_operand(f)
            }
            Self::Binary { left, op, right } => {
                left.fmt_operand(f)?;
                write!(f, " {op} ")?;
                right.fmt_operand(f)
            }
            Self::IsNull { expr, negated } => {
                expr.fmt_operand(f)?;
                if *negated {
                    write!(f, " IS NOT NULL")
                } else {
                    write!(f, " IS NULL")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_refs() {
        let expr = Expr::binary(
            Expr::binary(Expr::column("a"), BinaryOp::Add, Expr::literal(1)),
            BinaryOp::Gt,
            Expr::unary(UnaryOp::Negate, Expr::column("b")),
        );
        assert_eq!(expr.column_refs(), vec!["a", "b"]);
        assert!(Expr::literal(true).column_refs().is_empty());
    }

    #[test]
    fn test_display() {
        let expr = Expr::binary(
            Expr::binary(Expr::column("a"), BinaryOp::Add, Expr::literal(1)),
            BinaryOp::Mul,
            Expr::column("b"),
        );
        assert_eq!(expr.to_string(), "(a + 1) * b");

        let expr = Expr::IsNull {
            expr: Box::new(Expr::column("name")),
            negated: true,
        };
        assert_eq!(expr.to_string(), "name IS NOT NULL");

        assert_eq!(Expr::literal("it's").to_string(), "'it''s'");
        assert_eq!(
            Expr::unary(UnaryOp::Not, Expr::literal(false)).to_string(),
            "NOT FALSE"
        );
    }
}
