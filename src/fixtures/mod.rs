// fixtures/mod.rs - Loading SQL fixture files
//
// What is a fixture?
// A fixture is a plain SQL script under `sql/` that seeds known data before
// a test runs. Every script starts by dropping the tables it creates, so
// loading the same file twice leaves the database in the same state.
//
// Instead of writing this in every test...
//   let sql = fs::read_to_string("sql/organizations.sql")?;
//   sqlx::raw_sql(&sql).execute(&pool).await?;
//
// ...we call `conn.load_fixture("organizations.sql")` or
// `conn.load_table::<OrganizationsTable>()` and get proper errors.

pub mod tables;

use crate::errors::{Error, Result};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A table seeded by one of the fixture files under `sql/`
pub trait FixtureTable {
    /// Name of the table the fixture populates
    const TABLE: &'static str;

    /// Fixture file name, relative to the fixture directory
    const FIXTURE: &'static str;
}

/// The directory fixture files are resolved against
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDir {
    root: PathBuf,
}

impl FixtureDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the fixture directory
    ///
    /// An explicit override must exist. Otherwise the crate's own `sql/`
    /// directory is tried, then paths relative to the current directory
    /// since tests can run from different places.
    pub fn discover(override_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = override_dir {
            if dir.is_dir() {
                return Ok(Self::new(dir));
            }
            return Err(Error::Config(format!(
                "fixture directory {} does not exist",
                dir.display()
            )));
        }

        let possible_paths = [
            Path::new(env!("CARGO_MANIFEST_DIR")).join("sql"),
            PathBuf::from("sql"),
            PathBuf::from("../sql"),
        ];

        possible_paths
            .iter()
            .find(|p| p.is_dir())
            .cloned()
            .map(Self::new)
            .ok_or_else(|| Error::Config("SQL fixture directory not found".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a fixture file inside this directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Read a fixture file, failing with `FixtureNotFound` if it is not readable
pub fn read_fixture(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::FixtureNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| {
        tracing::warn!(fixture = %path.display(), error = %e, "fixture is not readable");
        Error::FixtureNotFound {
            path: path.to_path_buf(),
        }
    })
}

/// Execute every statement of a fixture file against `pool`
///
/// The script goes out as one simple query, which Postgres runs in a single
/// implicit transaction: if any statement fails nothing of the fixture is
/// applied and the error propagates as `QueryExecution`.
pub async fn load_fixtures(pool: &PgPool, path: &Path) -> Result<()> {
    let sql = read_fixture(path)?;
    let statements = split_statements(&sql).len();

    tracing::info!(fixture = %path.display(), statements, "loading fixture");
    if statements == 0 {
        return Ok(());
    }

    sqlx::raw_sql(&sql)
        .execute(pool)
        .await
        .map_err(|e| Error::query(format!("loading fixture {}", path.display()), e))?;

    Ok(())
}

/// Split a SQL script into its statements
///
/// Comments are dropped. Semicolons inside string literals, quoted
/// identifiers, dollar-quoted bodies and comments do not end a statement.
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let end = closing_quote(bytes, i);
                current.push_str(&sql[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
                current.push(' ');
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = block_comment_end(bytes, i);
                current.push(' ');
            }
            b'$' => match dollar_tag(sql, i) {
                Some(tag) => {
                    let body_start = i + tag.len();
                    let end = sql[body_start..]
                        .find(tag)
                        .map_or(bytes.len(), |n| body_start + n + tag.len());
                    current.push_str(&sql[i..end]);
                    i = end;
                }
                None => {
                    current.push('$');
                    i += 1;
                }
            },
            b';' => {
                push_statement(&mut statements, &current);
                current.clear();
                i += 1;
            }
            _ => {
                // copy up to the next byte that could start something special
                let from = i + sql[i..].chars().next().map_or(1, char::len_utf8);
                let next = sql[from..]
                    .find(['\'', '"', '-', '/', '$', ';'])
                    .map_or(bytes.len(), |n| from + n);
                current.push_str(&sql[i..next]);
                i = next;
            }
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Index just past the quote closing the literal opened at `start`
fn closing_quote(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            // a doubled quote is an escaped quote
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past the end of the (possibly nested) block comment at `start`
fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// The `$tag$` opening a dollar-quoted string at `start`, if there is one
///
/// `$1` style parameters are not tags: a tag cannot start with a digit.
fn dollar_tag(sql: &str, start: usize) -> Option<&str> {
    let rest = &sql[start + 1..];
    let end = rest.find('$')?;
    let tag = &rest[..end];
    let valid = tag
        .chars()
        .next()
        .map_or(true, |c| c.is_ascii_alphabetic() || c == '_')
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| &sql[start..start + end + 2])
}

/// Number of `INSERT INTO <table>` statements per table in a script
///
/// Table names are unqualified and lower-cased. Fixtures insert one row per
/// statement, so this is also the number of rows each table should hold.
pub fn insert_counts(sql: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for statement in split_statements(sql) {
        let mut words = statement.split_whitespace();
        let is_insert = words
            .next()
            .is_some_and(|w| w.eq_ignore_ascii_case("insert"))
            && words.next().is_some_and(|w| w.eq_ignore_ascii_case("into"));
        if !is_insert {
            continue;
        }
        if let Some(target) = words.next() {
            *counts.entry(normalize_table_name(target)).or_insert(0) += 1;
        }
    }
    counts
}

fn normalize_table_name(target: &str) -> String {
    let name = target.split('(').next().unwrap_or(target);
    let name = name.rsplit('.').next().unwrap_or(name);
    name.trim_matches('"').to_ascii_lowercase()
}
