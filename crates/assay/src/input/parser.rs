//! CSV/TSV parser with delimiter detection, plus first-sheet workbook decoding.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Xls, Xlsx};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{DataTable, SourceMetadata};
use crate::error::{AssayError, Result};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// File extensions the parser decodes. Extension-less names are accepted too.
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// How an accepted source is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Delimited,
    Xlsx,
    Xls,
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Parses delimited tabular files into a [`DataTable`].
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let kind = source_kind(&path.to_string_lossy())?;

        let mut file = File::open(path).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|e| AssayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.parse_contents(&file_name, kind, &contents)
    }

    /// Parse an in-memory upload, using `name` to decide whether the format is accepted.
    pub fn parse_bytes_named(&self, name: &str, bytes: &[u8]) -> Result<(DataTable, SourceMetadata)> {
        let kind = source_kind(name)?;
        self.parse_contents(name, kind, bytes)
    }

    fn parse_contents(
        &self,
        name: &str,
        kind: SourceKind,
        contents: &[u8],
    ) -> Result<(DataTable, SourceMetadata)> {
        let mut hasher = Sha256::new();
        hasher.update(contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let (data_table, format) = match kind {
            SourceKind::Xlsx => {
                let workbook = Xlsx::new(Cursor::new(contents)).map_err(calamine::Error::from)?;
                (self.parse_sheet(first_sheet(workbook)?)?, "xlsx")
            }
            SourceKind::Xls => {
                let workbook = Xls::new(Cursor::new(contents)).map_err(calamine::Error::from)?;
                (self.parse_sheet(first_sheet(workbook)?)?, "xls")
            }
            SourceKind::Delimited => {
                let delimiter = match self.config.delimiter {
                    Some(d) => d,
                    None => detect_delimiter(contents)?,
                };
                let format = match delimiter {
                    b'\t' => "tsv",
                    b',' => "csv",
                    b';' => "csv-semicolon",
                    b'|' => "psv",
                    _ => "delimited",
                };
                (self.parse_bytes(contents, delimiter)?, format)
            }
        };
        let format = format.to_string();
        debug!(
            file = name,
            format = %format,
            rows = data_table.row_count(),
            columns = data_table.column_count(),
            "Parsed source"
        );

        let source_metadata = SourceMetadata::new(
            name.to_string(),
            hash,
            contents.len() as u64,
            format,
            data_table.row_count(),
            data_table.column_count(),
        );

        Ok((data_table, source_metadata))
    }

    /// Parse bytes with a known delimiter.
    fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = if self.config.has_header {
            reader
                .headers()?
                .iter()
                .map(|s| s.trim().to_string())
                .collect()
        } else {
            let mut probe = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .quote(self.config.quote)
                .flexible(true)
                .from_reader(bytes);
            match probe.records().next() {
                Some(Ok(record)) => (0..record.len())
                    .map(|i| format!("column_{}", i + 1))
                    .collect(),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(AssayError::EmptyData("No data rows found".to_string())),
            }
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(AssayError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            // Pad short rows, drop surplus fields
            while row.len() < expected_cols {
                row.push(String::new());
            }
            row.truncate(expected_cols);

            rows.push(row);
        }

        Ok(DataTable::new(headers, rows, delimiter))
    }

    /// Turn a worksheet range into a raw grid; the first row is the header.
    fn parse_sheet(&self, range: Range<Data>) -> Result<DataTable> {
        let width = range.width();
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect::<Vec<String>>());

        let headers: Vec<String> = if self.config.has_header {
            rows.next()
                .map(|row| row.into_iter().map(|h| h.trim().to_string()).collect())
                .unwrap_or_default()
        } else {
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(AssayError::EmptyData("No columns found".to_string()));
        }

        let rows: Vec<Vec<String>> = match self.config.max_rows {
            Some(max) => rows.take(max).collect(),
            None => rows.collect(),
        };

        Ok(DataTable::new(headers, rows, 0))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decide how to decode a source from its name, rejecting unknown extensions.
fn source_kind(name: &str) -> Result<SourceKind> {
    let Some(ext) = Path::new(name).extension() else {
        return Ok(SourceKind::Delimited);
    };
    let ext = ext.to_string_lossy().to_lowercase();

    match ext.as_str() {
        "xlsx" => Ok(SourceKind::Xlsx),
        "xls" => Ok(SourceKind::Xls),
        e if DELIMITED_EXTENSIONS.contains(&e) => Ok(SourceKind::Delimited),
        _ => Err(AssayError::UnsupportedFormat(format!(
            "only .csv, .tsv, .txt, .xls and .xlsx files are allowed (got .{ext})"
        ))),
    }
}

/// The first worksheet of a workbook.
fn first_sheet<RS, R>(mut workbook: R) -> Result<Range<Data>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    calamine::Error: From<R::Error>,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AssayError::EmptyData("Workbook has no sheets".to_string()))?
        .map_err(calamine::Error::from)?;
    Ok(range)
}

/// Render a workbook cell the way the same value would appear in a CSV export.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(AssayError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab gets a small bonus
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
