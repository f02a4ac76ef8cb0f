//! Plain-text table rendering for query results.

use crate::models::{ResultSet, Row};
use serde_json::Value;

/// Extra characters added to every column's content width
const COLUMN_PADDING: usize = 2;

pub const EMPTY_RESULT_MESSAGE: &str = "📭  查询结果为空";

/// Render a result set as an aligned table followed by a summary line
///
/// Columns come from the first row. Rows missing a column show an empty cell.
pub fn format_result_set(result: &ResultSet) -> String {
    if result.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }

    let columns = result.columns();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| columns.iter().map(|col| display_value(row, col)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let longest_value = cells.iter().map(|row| row[idx].chars().count()).max().unwrap_or(0);
            col.chars().count().max(longest_value) + COLUMN_PADDING
        })
        .collect();

    let total_width = widths.iter().sum::<usize>() + columns.len() + 1;
    let rule = "=".repeat(total_width);

    let mut lines = Vec::with_capacity(result.rows.len() + 5);
    lines.push(rule.clone());

    let mut header = String::from("|");
    for (col, width) in columns.iter().zip(&widths) {
        header.push_str(&format!(" {:^w$} |", col, w = width - COLUMN_PADDING));
    }
    lines.push(header);
    lines.push(rule.clone());

    for row in &cells {
        let mut line = String::from("|");
        for (value, width) in row.iter().zip(&widths) {
            let inner = width - COLUMN_PADDING;
            line.push_str(&format!(" {:<w$} |", truncate(value, inner), w = inner));
        }
        lines.push(line);
    }

    lines.push(rule);
    lines.push(summary_line(result));
    lines.join("\n")
}

/// Row count plus a marker when the SQL came from cache
pub fn summary_line(result: &ResultSet) -> String {
    if result.cache_hit {
        format!("📊  共 {} 条记录 (来自缓存)", result.row_count)
    } else {
        format!("📊  共 {} 条记录", result.row_count)
    }
}

/// Cell text for a single value; strings are shown without quotes
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_value(row: &Row, column: &str) -> String {
    row.get(column).map(value_text).unwrap_or_default()
}

/// Keep the first `max_chars` characters, no ellipsis
fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
