//! Delimited text matrix reader.
//!
//! Each non-empty line holds one point. Lines starting with `#` are comments.
//! A whitespace delimiter splits on any run of whitespace.

use std::io::{self, BufRead};

use dendra_core::{DenseMatrix, PointSourceError};
use thiserror::Error;

/// Errors raised while reading a delimited matrix.
#[derive(Debug, Error)]
pub enum MatrixReadError {
    /// Reading from the underlying stream failed.
    #[error("failed to read line {line}: {source}")]
    Io {
        /// One-based line number.
        line: usize,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A field could not be parsed as a floating-point number.
    #[error("line {line}, field {field}: `{value}` is not a number")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// One-based field index within the line.
        field: usize,
        /// Offending text.
        value: String,
    },
    /// The parsed rows did not form a valid matrix.
    #[error(transparent)]
    Points(#[from] PointSourceError),
}

/// Reads a dense matrix from `reader`, splitting fields on `delimiter`.
///
/// # Errors
/// Returns [`MatrixReadError`] when a line cannot be read or parsed, or when
/// the rows have inconsistent widths or non-finite values.
///
/// # Examples
/// ```
/// use dendra_cli::cli::read_matrix;
/// use dendra_core::PointSource;
///
/// let input = "# x,y\n0.0,1.0\n2.5,3.0\n\n";
/// let matrix = read_matrix("demo", input.as_bytes(), ',')?;
/// assert_eq!(matrix.len(), 2);
/// assert_eq!(matrix.point(1), &[2.5, 3.0]);
/// # Ok::<(), dendra_cli::cli::MatrixReadError>(())
/// ```
pub fn read_matrix(
    name: &str,
    reader: impl BufRead,
    delimiter: char,
) -> Result<DenseMatrix, MatrixReadError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line.map_err(|source| MatrixReadError::Io {
            line: line_number,
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        rows.push(parse_row(trimmed, delimiter, line_number)?);
    }
    Ok(DenseMatrix::from_rows(name, &rows)?)
}

fn parse_row(line: &str, delimiter: char, line_number: usize) -> Result<Vec<f64>, MatrixReadError> {
    let fields: Box<dyn Iterator<Item = &str>> = if delimiter.is_whitespace() {
        Box::new(line.split_whitespace())
    } else {
        Box::new(line.split(delimiter))
    };
    fields
        .enumerate()
        .map(|(index, raw)| {
            let value = raw.trim();
            value
                .parse::<f64>()
                .map_err(|_| MatrixReadError::InvalidNumber {
                    line: line_number,
                    field: index + 1,
                    value: value.to_owned(),
                })
        })
        .collect()
}
