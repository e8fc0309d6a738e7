use std::collections::HashSet;
use std::fmt;

use crate::ast::{
    CreateTable, Delete, DropTable, Expr, Insert, Select, SelectItem, SortDirection, Statement,
    Update,
};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::evaluator;
use crate::table::{Row, Schema};
use crate::value::Value;

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// The actual data, returned as a vector of rows, where each row is a vector of [Value].
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders a header line, then one line per row, cells separated by ` | `.
/// An empty result prints `(no rows)` under the header.
impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.columns.join(" | "))?;
        if self.rows.is_empty() {
            return write!(f, "\n(no rows)");
        }
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(Value::to_string).collect();
            write!(f, "\n{}", cells.join(" | "))?;
        }
        Ok(())
    }
}

/// What a successfully executed statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    Created(String),
    Dropped(String),
    Inserted(usize),
    Updated(usize),
    Deleted(usize),
    Rows(QueryResult),
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "row" } else { "rows" }
}

impl fmt::Display for StatementOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(name) => write!(f, "Table {name} created"),
            Self::Dropped(name) => write!(f, "Table {name} dropped"),
            Self::Inserted(n) => write!(f, "{n} {} inserted", plural(*n)),
            Self::Updated(n) => write!(f, "{n} {} updated", plural(*n)),
            Self::Deleted(n) => write!(f, "{n} {} deleted", plural(*n)),
            Self::Rows(result) => write!(f, "{result}"),
        }
    }
}

/// Runs parsed statements against a catalog.
///
/// Each statement validates every name it references before touching any row,
/// and mutations go through the catalog's all-or-nothing batch operations, so
/// a failing statement leaves the catalog as it found it.
pub struct Executor<'a> {
    catalog: &'a mut Catalog,
    config: &'a Config,
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a mut Catalog, config: &'a Config) -> Self {
        Self { catalog, config }
    }

    pub fn execute(&mut self, statement: Statement) -> Result<StatementOutput> {
        let kind = statement.kind();
        let output = match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::DropTable(drop) => self.drop_table(drop),
            Statement::Insert(insert) => self.insert(insert),
            Statement::Select(select) => query(&*self.catalog, &select).map(StatementOutput::Rows),
            Statement::Update(update) => self.update(update),
            Statement::Delete(delete) => self.delete(delete),
        }?;

        match &output {
            StatementOutput::Rows(result) => {
                tracing::debug!(statement = kind, rows = result.len(), "statement executed")
            }
            other => tracing::debug!(statement = kind, result = %other, "statement executed"),
        }
        Ok(output)
    }

    fn create_table(&mut self, create: CreateTable) -> Result<StatementOutput> {
        self.catalog
            .create_table(create.name.clone(), Schema::new(create.columns))?;
        Ok(StatementOutput::Created(create.name))
    }

    fn drop_table(&mut self, drop: DropTable) -> Result<StatementOutput> {
        self.catalog.drop_table(&drop.name)?;
        Ok(StatementOutput::Dropped(drop.name))
    }

    /// Handles row insertion.
    ///
    /// Values map to the schema positionally when no column list is given;
    /// otherwise they follow the list, and unlisted columns receive `NULL`.
    fn insert(&mut self, insert: Insert) -> Result<StatementOutput> {
        let table = self.catalog.table(&insert.table)?;

        let targets: Vec<usize> = match &insert.columns {
            None => (0..table.schema.len()).collect(),
            Some(columns) => resolve_distinct(&table.schema, columns.iter().map(String::as_str))?,
        };

        let rows = insert
            .rows
            .iter()
            .map(|values| {
                if values.len() != targets.len() {
                    return Err(Error::semantic(format!(
                        "{} values supplied for {} columns",
                        values.len(),
                        targets.len()
                    )));
                }
                let mut row = vec![Value::Null; table.schema.len()];
                for (&idx, expr) in targets.iter().zip(values) {
                    row[idx] = evaluator::evaluate_constant(expr)?;
                }
                Ok(row)
            })
            .collect::<Result<Vec<Row>>>()?;

        if let Some(max) = self.config.max_rows_per_table {
            if table.row_count + rows.len() > max {
                return Err(Error::ResourceLimit(format!(
                    "table {} may hold at most {max} rows",
                    insert.table
                )));
            }
        }

        let count = self.catalog.insert(&insert.table, rows)?;
        Ok(StatementOutput::Inserted(count))
    }

    /// Executes an `UPDATE` statement.
    ///
    /// Assignments are evaluated against each matching row's values before
    /// the update, so `SET x = x + 1` reads the row's own old `x`.
    fn update(&mut self, update: Update) -> Result<StatementOutput> {
        let schema = self.catalog.table(&update.table)?.schema.clone();

        let targets = resolve_distinct(&schema, update.assignments.iter().map(|(c, _)| c.as_str()))?;
        for (_, expr) in &update.assignments {
            evaluator::validate(expr, &schema)?;
        }
        if let Some(predicate) = &update.where_clause {
            evaluator::validate(predicate, &schema)?;
        }

        let count = self.catalog.update(
            &update.table,
            |row| evaluator::matches(update.where_clause.as_ref(), row, &schema),
            |row| {
                let mut new_row = row.to_vec();
                for (&idx, (_, expr)) in targets.iter().zip(&update.assignments) {
                    new_row[idx] = evaluator::evaluate(expr, row, &schema)?;
                }
                Ok(new_row)
            },
        )?;
        Ok(StatementOutput::Updated(count))
    }

    fn delete(&mut self, delete: Delete) -> Result<StatementOutput> {
        let schema = self.catalog.table(&delete.table)?.schema.clone();
        if let Some(predicate) = &delete.where_clause {
            evaluator::validate(predicate, &schema)?;
        }

        let count = self.catalog.delete(&delete.table, |row| {
            evaluator::matches(delete.where_clause.as_ref(), row, &schema)
        })?;
        Ok(StatementOutput::Deleted(count))
    }
}

/// Resolves column names to schema positions, rejecting repeated names.
fn resolve_distinct<'n>(
    schema: &Schema,
    names: impl Iterator<Item = &'n str>,
) -> Result<Vec<usize>> {
    let mut seen = HashSet::new();
    names
        .map(|name| {
            if !seen.insert(name) {
                return Err(Error::semantic(format!("column {name} is listed twice")));
            }
            schema.resolve(name)
        })
        .collect()
}

/// Executes a `SELECT` against a catalog without mutating it.
///
/// Phases: resolve projection, validate `WHERE` and `ORDER BY`, scan, filter,
/// stable sort, limit, project.
pub fn query(catalog: &Catalog, select: &Select) -> Result<QueryResult> {
    let table = catalog.table(&select.table)?;
    let schema = &table.schema;

    let mut columns = Vec::new();
    let mut projection: Vec<Expr> = Vec::new();
    for item in &select.projection {
        match item {
            SelectItem::Wildcard => {
                for column in &schema.columns {
                    columns.push(column.name.clone());
                    projection.push(Expr::Column(column.name.clone()));
                }
            }
            SelectItem::Expr { expr, alias } => {
                evaluator::validate(expr, schema)?;
                columns.push(alias.clone().unwrap_or_else(|| expr.to_string()));
                projection.push(expr.clone());
            }
        }
    }

    if let Some(predicate) = &select.where_clause {
        evaluator::validate(predicate, schema)?;
    }
    let sort_keys = select
        .order_by
        .iter()
        .map(|clause| Ok((schema.resolve(&clause.column)?, clause.direction)))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::new();
    for row in table.rows() {
        if evaluator::matches(select.where_clause.as_ref(), &row, schema)? {
            rows.push(row);
        }
    }

    if !sort_keys.is_empty() {
        // `sort_by` is stable: ties keep their scan order.
        rows.sort_by(|a, b| {
            sort_keys
                .iter()
                .map(|&(idx, direction)| {
                    let ord = a[idx].sort_cmp(&b[idx]);
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if let Some(limit) = select.limit {
        rows.truncate(limit);
    }

    let rows = rows
        .iter()
        .map(|row| {
            projection
                .iter()
                .map(|expr| evaluator::evaluate(expr, row, schema))
                .collect::<Result<Row>>()
        })
        .collect::<Result<Vec<Row>>>()?;

    Ok(QueryResult { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser::parse_statements;

    fn run(catalog: &mut Catalog, sql: &str) -> Result<StatementOutput> {
        let config = Config::default();
        let mut last = None;
        for statement in parse_statements(sql) {
            last = Some(Executor::new(catalog, &config).execute(statement?));
        }
        last.unwrap_or_else(|| panic!("no statement in {sql:?}"))
    }

    fn rows(catalog: &mut Catalog, sql: &str) -> QueryResult {
        match run(catalog, sql).unwrap() {
            StatementOutput::Rows(result) => result,
            other => panic!("Expected rows, got {other:?}"),
        }
    }

    fn people() -> Catalog {
        let mut catalog = Catalog::new();
        run(
            &mut catalog,
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, age INTEGER, active BOOLEAN);
             INSERT INTO people VALUES (1, 'Alice', 30, TRUE), (2, 'Bob', 25, FALSE),
                                       (3, 'Charlie', 30, TRUE), (4, 'Dana', NULL, NULL)",
        )
        .unwrap();
        catalog
    }

    #[test]
    fn test_create_table_output() {
        let mut catalog = Catalog::new();
        let output = run(&mut catalog, "CREATE TABLE t (id INTEGER)").unwrap();
        assert_eq!(output, StatementOutput::Created("t".into()));
        assert_eq!(output.to_string(), "Table t created");
    }

    #[test]
    fn test_create_table_rejects_bad_schema() {
        let mut catalog = Catalog::new();
        let err = run(&mut catalog, "CREATE TABLE t (a INTEGER, a TEXT)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        let err = run(
            &mut catalog,
            "CREATE TABLE t (a INTEGER PRIMARY KEY, b TEXT PRIMARY KEY)",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert!(catalog.list_tables().is_empty());
    }

    #[test]
    fn test_insert_output() {
        let mut catalog = people();
        let output = run(&mut catalog, "INSERT INTO people VALUES (5, 'Eve', 40, TRUE)").unwrap();
        assert_eq!(output.to_string(), "1 row inserted");
        let output = run(
            &mut catalog,
            "INSERT INTO people VALUES (6, 'F', 1, TRUE), (7, 'G', 2, FALSE)",
        )
        .unwrap();
        assert_eq!(output.to_string(), "2 rows inserted");
    }

    #[test]
    fn test_insert_with_column_list() {
        let mut catalog = people();
        run(&mut catalog, "INSERT INTO people (name, id) VALUES ('Zed', 9)").unwrap();
        let result = rows(&mut catalog, "SELECT * FROM people WHERE id = 9");
        assert_eq!(
            result.rows,
            vec![vec![
                Value::Integer(9),
                Value::from("Zed"),
                Value::Null,
                Value::Null
            ]]
        );
    }

    #[test]
    fn test_insert_faults() {
        let mut catalog = people();
        let cases = [
            ("INSERT INTO nope VALUES (1)", ErrorKind::Semantic),
            ("INSERT INTO people VALUES (5, 'x')", ErrorKind::Semantic),
            ("INSERT INTO people (id, id) VALUES (5, 6)", ErrorKind::Semantic),
            ("INSERT INTO people (id, ghost) VALUES (5, 6)", ErrorKind::Semantic),
            ("INSERT INTO people (id) VALUES (id + 1)", ErrorKind::Semantic),
            ("INSERT INTO people VALUES (5, 7, 1, TRUE)", ErrorKind::Type),
            ("INSERT INTO people VALUES (1, 'dup', 1, TRUE)", ErrorKind::Constraint),
            ("INSERT INTO people (name) VALUES ('no key')", ErrorKind::Constraint),
            ("INSERT INTO people VALUES (5, 'x', 1 / 0, TRUE)", ErrorKind::Arithmetic),
        ];
        for (sql, kind) in cases {
            assert_eq!(run(&mut catalog, sql).unwrap_err().kind(), kind, "{sql}");
        }
        assert_eq!(catalog.table("people").unwrap().row_count, 4);
    }

    #[test]
    fn test_insert_respects_row_limit() {
        let mut catalog = Catalog::new();
        let config = Config::new().with_max_rows_per_table(2);
        let mut execute = |sql: &str| {
            let statement = parse_statements(sql).remove(0).unwrap();
            Executor::new(&mut catalog, &config).execute(statement)
        };
        execute("CREATE TABLE t (id INTEGER)").unwrap();
        execute("INSERT INTO t VALUES (1), (2)").unwrap();
        let err = execute("INSERT INTO t VALUES (3)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceLimit);
    }

    #[test]
    fn test_select_star_in_insertion_order() {
        let mut catalog = people();
        let result = rows(&mut catalog, "SELECT * FROM people");
        assert_eq!(result.columns, vec!["id", "name", "age", "active"]);
        let ids: Vec<Value> = result.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            ids,
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4)
            ]
        );
    }

    #[test]
    fn test_select_projection_order_and_expressions() {
        let mut catalog = people();
        let result = rows(
            &mut catalog,
            "SELECT name, id * 10 AS score, age + 1 FROM people WHERE active",
        );
        assert_eq!(result.columns, vec!["name", "score", "age + 1"]);
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("Alice"), Value::Integer(10), Value::Integer(31)],
                vec![Value::from("Charlie"), Value::Integer(30), Value::Integer(31)],
            ]
        );
    }

    #[test]
    fn test_select_where_null_excludes_row() {
        let mut catalog = people();
        let result = rows(&mut catalog, "SELECT id FROM people WHERE age > 0");
        assert_eq!(result.len(), 3);
        let result = rows(&mut catalog, "SELECT id FROM people WHERE NOT (age > 0)");
        assert!(result.is_empty());
        let result = rows(&mut catalog, "SELECT id FROM people WHERE age IS NULL");
        assert_eq!(result.rows, vec![vec![Value::Integer(4)]]);
    }

    #[test]
    fn test_select_validates_before_scanning() {
        // The table is empty, so only up-front validation can catch these.
        let mut catalog = Catalog::new();
        run(&mut catalog, "CREATE TABLE t (id INTEGER)").unwrap();
        for sql in [
            "SELECT ghost FROM t",
            "SELECT id FROM t WHERE ghost = 1",
            "SELECT id FROM t ORDER BY ghost",
        ] {
            assert_eq!(run(&mut catalog, sql).unwrap_err().kind(), ErrorKind::Semantic, "{sql}");
        }
    }

    #[test]
    fn test_select_type_fault() {
        let mut catalog = people();
        let err = run(&mut catalog, "SELECT id FROM people WHERE name = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_order_by_is_stable() {
        let mut catalog = people();
        let result = rows(&mut catalog, "SELECT name FROM people ORDER BY age DESC");
        // Alice and Charlie tie on 30 and keep insertion order; NULL sorts last descending.
        assert_eq!(
            result.rows,
            vec![
                vec![Value::from("Alice")],
                vec![Value::from("Charlie")],
                vec![Value::from("Bob")],
                vec![Value::from("Dana")],
            ]
        );

        let result = rows(&mut catalog, "SELECT id FROM people ORDER BY age");
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Integer(4)],
                vec![Value::Integer(2)],
                vec![Value::Integer(1)],
                vec![Value::Integer(3)],
            ]
        );
    }

    #[test]
    fn test_order_by_multiple_keys_and_limit() {
        let mut catalog = people();
        let result = rows(
            &mut catalog,
            "SELECT id FROM people WHERE age IS NOT NULL ORDER BY age DESC, name DESC LIMIT 2",
        );
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(3)], vec![Value::Integer(1)]]
        );
    }

    #[test]
    fn test_update_self_reference() {
        let mut catalog = people();
        let output = run(&mut catalog, "UPDATE people SET age = age + 1, active = NOT active WHERE id < 3")
            .unwrap();
        assert_eq!(output.to_string(), "2 rows updated");
        let result = rows(&mut catalog, "SELECT age, active FROM people");
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Integer(31), Value::Boolean(false)],
                vec![Value::Integer(26), Value::Boolean(true)],
                vec![Value::Integer(30), Value::Boolean(true)],
                vec![Value::Null, Value::Null],
            ]
        );
    }

    #[test]
    fn test_update_primary_key_shift() {
        let mut catalog = people();
        run(&mut catalog, "UPDATE people SET id = id + 1").unwrap();
        let result = rows(&mut catalog, "SELECT id FROM people");
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Integer(2)],
                vec![Value::Integer(3)],
                vec![Value::Integer(4)],
                vec![Value::Integer(5)],
            ]
        );
    }

    #[test]
    fn test_update_faults_leave_table_unchanged() {
        let mut catalog = people();
        let before = rows(&mut catalog, "SELECT * FROM people");
        let cases = [
            ("UPDATE people SET id = 1", ErrorKind::Constraint),
            ("UPDATE people SET id = NULL WHERE id = 4", ErrorKind::Constraint),
            ("UPDATE people SET name = 5", ErrorKind::Type),
            ("UPDATE people SET ghost = 5", ErrorKind::Semantic),
            ("UPDATE people SET age = 1, age = 2", ErrorKind::Semantic),
            ("UPDATE people SET age = ghost", ErrorKind::Semantic),
            ("UPDATE people SET age = 1 WHERE ghost", ErrorKind::Semantic),
            ("UPDATE people SET age = 100 / (id - 3)", ErrorKind::Arithmetic),
        ];
        for (sql, kind) in cases {
            assert_eq!(run(&mut catalog, sql).unwrap_err().kind(), kind, "{sql}");
        }
        assert_eq!(rows(&mut catalog, "SELECT * FROM people"), before);
    }

    #[test]
    fn test_update_no_match() {
        let mut catalog = people();
        let output = run(&mut catalog, "UPDATE people SET age = 0 WHERE id = 99").unwrap();
        assert_eq!(output, StatementOutput::Updated(0));
        assert_eq!(output.to_string(), "0 rows updated");
    }

    #[test]
    fn test_delete() {
        let mut catalog = people();
        let output = run(&mut catalog, "DELETE FROM people WHERE age = 30").unwrap();
        assert_eq!(output.to_string(), "2 rows deleted");
        let result = rows(&mut catalog, "SELECT name FROM people");
        assert_eq!(
            result.rows,
            vec![vec![Value::from("Bob")], vec![Value::from("Dana")]]
        );

        let output = run(&mut catalog, "DELETE FROM people").unwrap();
        assert_eq!(output.to_string(), "2 rows deleted");
        assert!(rows(&mut catalog, "SELECT * FROM people").is_empty());
    }

    #[test]
    fn test_delete_faults() {
        let mut catalog = people();
        assert_eq!(
            run(&mut catalog, "DELETE FROM ghost").unwrap_err().kind(),
            ErrorKind::Semantic
        );
        assert_eq!(
            run(&mut catalog, "DELETE FROM people WHERE name > 3").unwrap_err().kind(),
            ErrorKind::Type
        );
        assert_eq!(catalog.table("people").unwrap().row_count, 4);
    }

    #[test]
    fn test_drop_table() {
        let mut catalog = people();
        assert_eq!(
            run(&mut catalog, "DROP TABLE people").unwrap().to_string(),
            "Table people dropped"
        );
        assert!(run(&mut catalog, "SELECT * FROM people").is_err());
    }

    #[test]
    fn test_format_rows() {
        let result = QueryResult {
            columns: vec!["id".into(), "name".into(), "ok".into()],
            rows: vec![
                vec![Value::Integer(1), Value::from("a b"), Value::Boolean(true)],
                vec![Value::Integer(-2), Value::Null, Value::Boolean(false)],
            ],
        };
        assert_eq!(
            result.to_string(),
            "id | name | ok\n1 | a b | true\n-2 | NULL | false"
        );
    }

    #[test]
    fn test_format_empty_result() {
        let result = QueryResult {
            columns: vec!["id".into()],
            rows: vec![],
        };
        assert_eq!(result.to_string(), "id\n(no rows)");

        // A row holding an empty string is not an empty result.
        let result = QueryResult {
            columns: vec!["name".into()],
            rows: vec![vec![Value::from("")]],
        };
        assert_eq!(result.to_string(), "name\n");
    }
}
