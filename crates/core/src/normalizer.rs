//! Raw engine rows to [`ResultSet`].
//!
//! The first raw row is the header. Shape mismatches are errors: padding or
//! truncating a row would silently shift values into the wrong columns.
use crate::engine::RawRow;
use switchblade_common::models::ResultSet;
use switchblade_error::{ErrorContext, Result, SwitchbladeError};

pub fn normalize(raw: &[RawRow]) -> Result<ResultSet> {
    let Some((header, data)) = raw.split_first() else {
        return Ok(ResultSet::default());
    };

    let columns = header
        .data
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            cell.var_char_value.clone().ok_or_else(|| {
                SwitchbladeError::malformed_result_set(format!(
                    "Header cell {} has no column name",
                    idx
                ))
            })
        })
        .collect::<Result<Vec<String>>>()?;

    let mut rows = Vec::with_capacity(data.len());
    for (row_index, row) in data.iter().enumerate() {
        if row.data.len() != columns.len() {
            return Err(SwitchbladeError::malformed_result_set(format!(
                "Row {} has {} cells but the header has {} columns",
                row_index,
                row.data.len(),
                columns.len()
            ))
            .with_context(ErrorContext::ResultShape {
                row_index,
                expected_cells: columns.len(),
                actual_cells: row.data.len(),
            }));
        }
        rows.push(
            row.data
                .iter()
                .map(|cell| cell.var_char_value.clone())
                .collect(),
        );
    }

    ResultSet::new(columns, rows)
}
