// assertions.rs - Comparing result sets against literal expectations
//
// Count first, then content, position by position. On a mismatch the
// error carries both result sets as JSON so the failing test output is
// enough to see what went wrong.

use crate::errors::{Error, Result};
use crate::row::Row;

/// Relative float tolerance used by `assert_rows`
///
/// Postgres prints float8 with 15 significant digits, so literals copied
/// from psql output are only accurate to about that.
pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-12;

/// Assert that a result set has exactly `expected` rows
pub fn assert_row_count(actual: &[Row], expected: usize) -> Result<()> {
    if actual.len() != expected {
        return Err(Error::AssertionMismatch {
            reason: format!("expected {} rows, got {}", expected, actual.len()),
            expected: expected.to_string(),
            actual: render(actual),
        });
    }
    Ok(())
}

/// Assert structural equality with the default float tolerance
pub fn assert_rows(actual: &[Row], expected: &[Row]) -> Result<()> {
    assert_rows_with(actual, expected, DEFAULT_FLOAT_TOLERANCE)
}

/// Assert structural equality, floats compared with a relative `tolerance`
pub fn assert_rows_with(actual: &[Row], expected: &[Row], tolerance: f64) -> Result<()> {
    let mismatch = |reason: String| Error::AssertionMismatch {
        reason,
        expected: render(expected),
        actual: render(actual),
    };

    if actual.len() != expected.len() {
        return Err(mismatch(format!(
            "expected {} rows, got {}",
            expected.len(),
            actual.len()
        )));
    }

    for (index, (got, want)) in actual.iter().zip(expected).enumerate() {
        if let Some(reason) = row_difference(got, want, tolerance) {
            return Err(mismatch(format!("row {index}: {reason}")));
        }
    }

    Ok(())
}

fn row_difference(actual: &Row, expected: &Row, tolerance: f64) -> Option<String> {
    let actual_columns: Vec<&str> = actual.columns().collect();
    let expected_columns: Vec<&str> = expected.columns().collect();
    if actual_columns != expected_columns {
        return Some(format!(
            "columns {:?} do not match expected {:?}",
            actual_columns, expected_columns
        ));
    }

    expected.iter().find_map(|(column, want)| {
        let got = actual.get(column)?;
        (!got.approx_eq(want, tolerance))
            .then(|| format!("column `{column}` is {got:?}, expected {want:?}"))
    })
}

fn render(rows: &[Row]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| format!("{rows:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn segments() -> Vec<Row> {
        vec![
            row! { "id" => "KAGOSHIMA_1" },
            row! { "id" => "KAGOSHIMA_2" },
            row! { "id" => "KAGOSHIMA_3" },
        ]
    }

    #[test]
    fn test_identical_rows_pass() {
        assert!(assert_rows(&segments(), &segments()).is_ok());
        assert!(assert_row_count(&segments(), 3).is_ok());
    }

    #[test]
    fn test_count_is_checked_first() {
        let all = segments();
        let actual = &all[..2];
        let err = assert_rows(actual, &all).unwrap_err();
        match err {
            Error::AssertionMismatch { reason, .. } => {
                assert_eq!(reason, "expected 3 rows, got 2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(assert_row_count(actual, 3).is_err());
    }

    #[test]
    fn test_order_matters() {
        let mut reversed = segments();
        reversed.reverse();
        let err = assert_rows(&reversed, &segments()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 0: column `id`"), "got: {}", message);
        assert!(message.contains("KAGOSHIMA_3"));
    }

    #[test]
    fn test_column_sets_must_match() {
        let actual = vec![row! { "id" => 1, "extra" => true }];
        let expected = vec![row! { "id" => 1 }];
        let err = assert_rows(&actual, &expected).unwrap_err();
        assert!(err.to_string().contains("columns [\"id\", \"extra\"]"));
    }

    #[test]
    fn test_float_tolerance() {
        let actual = vec![row! { "longitude" => 130.6422283157748, "latitude" => 30.704545454545453 }];
        let expected = vec![row! { "longitude" => 130.642228315775, "latitude" => 30.7045454545455 }];
        assert!(assert_rows(&actual, &expected).is_ok());
        assert!(assert_rows_with(&actual, &expected, 0.0).is_err());
    }

    #[test]
    fn test_int_and_float_are_distinct() {
        let actual = vec![row! { "subordinates_count" => 4.0 }];
        let expected = vec![row! { "subordinates_count" => 4i64 }];
        assert!(assert_rows(&actual, &expected).is_err());
    }
}
