use std::fs;
use std::path::Path;

use crate::error::AlignError;

/// Delimiter by extension: `.tsv` means tab, anything else comma.
pub fn delimiter_for(path: &Path) -> char {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    }
}

/// A parsed delimited text table. The first file line is the header, every
/// row is padded to the header width.
///
/// The corpus files never quote cells, so neither does this reader; embedded
/// delimiters are out of scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self, AlignError> {
        let data = fs::read_to_string(path)
            .map_err(|e| AlignError::io("reading annotation table", path, e))?;
        Self::parse(&data, delimiter_for(path), &path.display().to_string())
    }

    pub(crate) fn parse(data: &str, delimiter: char, context: &str) -> Result<Self, AlignError> {
        let mut lines = data
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .enumerate()
            .filter(|(_, line)| !line.is_empty());
        let (_, header) = lines
            .next()
            .ok_or_else(|| AlignError::schema(context, "empty table, no header line"))?;
        let columns: Vec<String> = header.split(delimiter).map(str::to_string).collect();

        let mut rows = Vec::new();
        for (line_idx, line) in lines {
            let mut row: Vec<String> = line.split(delimiter).map(str::to_string).collect();
            if row.len() > columns.len() {
                return Err(AlignError::schema(
                    context,
                    format!(
                        "line {} has {} cells but the header has {} columns",
                        line_idx + 1,
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str, context: &str) -> Result<usize, AlignError> {
        self.column_index(name)
            .ok_or_else(|| AlignError::schema(context, format!("missing required column '{name}'")))
    }

    /// Cell text, empty for indices past the row. Rows are padded at parse
    /// time, so this only matters for hand-built rows.
    pub fn cell<'a>(&self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes a headered delimited file, creating parent directories.
    /// Delimiter follows the target extension, output ends with a newline.
    pub fn write(path: &Path, columns: &[String], rows: &[Vec<String>]) -> Result<(), AlignError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AlignError::io("creating output directory", parent, e))?;
            }
        }
        let delimiter = delimiter_for(path);
        let mut text = String::new();
        text.push_str(&join_cells(columns, delimiter));
        text.push('\n');
        for row in rows {
            text.push_str(&join_cells(row, delimiter));
            text.push('\n');
        }
        fs::write(path, text).map_err(|e| AlignError::io("writing output table", path, e))
    }
}

fn join_cells(cells: &[String], delimiter: char) -> String {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            line.push(delimiter);
        }
        line.push_str(cell);
    }
    line
}
