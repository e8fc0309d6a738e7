use std::io;

use minisql::Database;

/// Reads SQL from stdin, runs it against a fresh database and prints the
/// rendered results.
fn main() -> io::Result<()> {
    let input = io::read_to_string(io::stdin())?;
    let db = Database::new();
    println!("{}", db.execute(&input));
    Ok(())
}
