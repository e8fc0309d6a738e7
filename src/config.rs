//! Engine configuration.

/// Tunables for a [crate::Database] instance.
///
/// The engine reads no environment variables; hosts build a `Config` in code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Maximum number of rows a single table may hold. `None` means unbounded.
    pub max_rows_per_table: Option<usize>,
    /// Stop a multi-statement input at the first faulting statement.
    pub stop_on_error: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_rows_per_table(mut self, max_rows: usize) -> Self {
        self.max_rows_per_table = Some(max_rows);
        self
    }

    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}
