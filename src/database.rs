use parking_lot::Mutex;

use crate::{
    ast::Statement,
    catalog::Catalog,
    config::Config,
    error::{Error, Result},
    executor::{Executor, QueryResult, StatementOutput},
    parser::Statements,
};

/// The main entry point for the in-memory database engine.
/// It owns the catalog and orchestrates tokenizing, parsing and execution.
///
/// Every statement holds the catalog lock for its whole run, so a `Database`
/// can be shared between threads and no caller observes a half-applied
/// statement.
#[derive(Default)]
pub struct Database {
    catalog: Mutex<Catalog>,
    config: Config,
}

impl Database {
    /// Creates a new, empty database instance.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            catalog: Mutex::new(Catalog::new()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Executes one or more `;`-separated statements and renders their
    /// results, one per line group, in execution order.
    ///
    /// Faults are rendered as `Error: <description>` in place of the
    /// statement's output; they never abort the process.
    ///
    /// # Example
    /// ```
    /// use minisql::Database;
    /// let db = Database::new();
    /// let out = db.execute(
    ///     "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
    ///      INSERT INTO t VALUES (1, 'a'), (2, 'b');
    ///      SELECT name FROM t WHERE id = 2;",
    /// );
    /// assert_eq!(out, "Table t created\n2 rows inserted\nname\nb");
    /// ```
    pub fn execute(&self, sql: &str) -> String {
        self.execute_all(sql)
            .into_iter()
            .map(|result| match result {
                Ok(output) => output.to_string(),
                Err(e) => format!("Error: {e}"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Executes every statement of `sql`, returning one structured result per
    /// non-empty statement.
    ///
    /// A failing statement does not undo earlier ones. Later statements still
    /// run unless [Config::stop_on_error] is set.
    pub fn execute_all(&self, sql: &str) -> Vec<Result<StatementOutput>> {
        let mut results = Vec::new();
        for statement in Statements::new(sql) {
            let result = statement.and_then(|statement| self.run(statement));
            if let Err(e) = &result {
                tracing::warn!(error = %e, "statement failed");
            }
            let failed = result.is_err();
            results.push(result);
            if failed && self.config.stop_on_error {
                break;
            }
        }
        results
    }

    /// Executes a single `SELECT` statement and returns its rows.
    ///
    /// # Example
    ///
    /// ```
    /// use minisql::{Database, Value};
    ///
    /// let db = Database::new();
    /// db.execute("CREATE TABLE products (name TEXT, price INTEGER)");
    /// db.execute("INSERT INTO products VALUES ('Laptop', 1200), ('Mouse', 25)");
    ///
    /// let result = db.query("SELECT name FROM products ORDER BY price").unwrap();
    ///
    /// assert_eq!(result.columns, vec!["name"]);
    /// assert_eq!(result.rows[0][0], Value::from("Mouse"));
    /// assert_eq!(result.rows[1][0], Value::from("Laptop"));
    /// ```
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut statements = Statements::new(sql);
        let statement = statements
            .next()
            .ok_or_else(|| Error::semantic("no statement to execute"))??;
        if statements.next().is_some() {
            return Err(Error::semantic("query expects exactly one statement"));
        }

        let Statement::Select(select) = statement else {
            return Err(Error::semantic(format!(
                "{} is not a queryable statement",
                statement.kind()
            )));
        };
        let catalog = self.catalog.lock();
        crate::executor::query(&catalog, &select)
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.catalog
            .lock()
            .list_tables()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.catalog.lock().table(table)?.row_count)
    }

    fn run(&self, statement: Statement) -> Result<StatementOutput> {
        let mut catalog = self.catalog.lock();
        Executor::new(&mut catalog, &self.config).execute(statement)
    }
}
