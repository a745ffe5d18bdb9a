//! Plain-text tables for record listings

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

/// A table of string cells with a header row
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells render empty, extra cells are dropped
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.width())
                    .chain(std::iter::once(header.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Render with columns padded to their widest cell, measured in
    /// terminal columns; the header is bold when `color` is set
    pub fn render(&self, color: bool) -> String {
        let widths = self.column_widths();
        let mut out = String::new();

        let header = format_row(&self.headers, &widths);
        if color {
            out.push_str(&format!("{}", header.bold()));
        } else {
            out.push_str(&header);
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format_row(row, &widths));
            out.push('\n');
        }
        out
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (col, width) in widths.iter().enumerate() {
        let cell = cells.get(col).map(String::as_str).unwrap_or("");
        if col > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        if col + 1 < widths.len() {
            line.push_str(&" ".repeat(width.saturating_sub(cell.width())));
        }
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_align() {
        let mut table = Table::new(["KEY", "TITLE"]);
        table.push_row(vec!["a".to_string(), "Alpha".to_string()]);
        table.push_row(vec!["long-key".to_string(), "Beta".to_string()]);
        let output = table.render(false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "KEY       TITLE");
        assert_eq!(lines[1], "a         Alpha");
        assert_eq!(lines[2], "long-key  Beta");
    }

    #[test]
    fn test_wide_characters_use_display_width() {
        let mut table = Table::new(["KEY", "TITLE"]);
        table.push_row(vec!["文書".to_string(), "x".to_string()]);
        table.push_row(vec!["abcd".to_string(), "y".to_string()]);
        let output = table.render(false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "文書  x");
        assert_eq!(lines[2], "abcd  y");
    }

    #[test]
    fn test_missing_cells_render_empty() {
        let mut table = Table::new(["A", "B", "C"]);
        table.push_row(vec!["1".to_string()]);
        let output = table.render(false);
        assert_eq!(output.lines().nth(1), Some("1"));
    }
}
