//! Record sources feeding the normalization pipeline
//!
//! A source yields one frame per input unit. The bronze source transcodes
//! each legacy-encoded text file to UTF-8 and applies header sanitizing.
//!
//! Column types are inferred once for the whole bronze set, from every row
//! of every file: each file is first read as text, a column becomes
//! integer or float only when all of its values parse as such, and the
//! merged type map is applied to every file. Values are never dropped by
//! inference, and the same column gets the same type in every batch.

use crate::config::RaisConfig;
use crate::error::{RaisError, Result};
use crate::header::read_header;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use polars::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One unit of input: a label for logs and the raw frame
pub struct SourceBatch {
    pub label: String,
    pub frame: LazyFrame,
}

/// Anything that can hand the pipeline raw frames, one at a time
pub trait RecordSource: Send {
    /// Number of batches this source will yield, when known up front
    fn len_hint(&self) -> Option<usize> {
        None
    }

    /// Next raw frame, or `None` once exhausted
    fn next_batch(&mut self) -> Result<Option<SourceBatch>>;
}

/// A bronze file ready to be read: UTF-8 copy (when transcoded) and header
#[derive(Debug)]
struct PreparedFile {
    path: PathBuf,
    utf8: Option<NamedTempFile>,
    header: Vec<String>,
}

impl PreparedFile {
    fn utf8_path(&self) -> &Path {
        self.utf8.as_ref().map(|tmp| tmp.path()).unwrap_or(&self.path)
    }

    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Bronze zone reader over a list of discovered files
#[derive(Debug)]
pub struct BronzeCsvSource {
    files: Vec<PathBuf>,
    prepared: Option<VecDeque<PreparedFile>>,
    column_types: HashMap<String, DataType>,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl BronzeCsvSource {
    pub fn new(files: Vec<PathBuf>, config: &RaisConfig) -> Result<Self> {
        Ok(Self {
            files,
            prepared: None,
            column_types: HashMap::new(),
            delimiter: config.delimiter,
            encoding: config.resolve_encoding()?,
        })
    }

    /// Column types shared by every batch; empty until the first batch is read
    pub fn column_types(&self) -> &HashMap<String, DataType> {
        &self.column_types
    }

    /// Load a single bronze file as text, with sanitized column names
    pub fn read_file(&self, file_path: &Path) -> Result<DataFrame> {
        let file = self.prepare_file(file_path.to_path_buf())?;
        self.read_text(&file)
    }

    fn prepare_file(&self, path: PathBuf) -> Result<PreparedFile> {
        let utf8 = if self.encoding == UTF_8 {
            None
        } else {
            Some(transcode_to_utf8(&path, self.encoding)?)
        };
        let utf8_path = utf8.as_ref().map(|tmp| tmp.path()).unwrap_or(&path);

        let header = read_header(utf8_path, self.delimiter).map_err(|e| match e {
            RaisError::HeaderParsingFailed { reason, .. } => RaisError::HeaderParsingFailed {
                path: path.clone(),
                reason,
            },
            other => other,
        })?;

        Ok(PreparedFile { path, utf8, header })
    }

    /// Read every field as a string; no value is lost to type guessing
    fn read_text(&self, file: &PreparedFile) -> Result<DataFrame> {
        info!("Reading bronze file {}", file.path.display());

        let mut df = CsvReadOptions::default()
            .with_has_header(false)
            .with_skip_rows(1)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|options| options.with_separator(self.delimiter))
            .try_into_reader_with_file_path(Some(file.utf8_path().to_path_buf()))?
            .finish()
            .map_err(|e| RaisError::ProcessingFailed {
                path: file.path.clone(),
                reason: format!("Failed to read delimited data: {}", e),
            })?;

        if df.width() != file.header.len() {
            return Err(RaisError::HeaderParsingFailed {
                path: file.path.clone(),
                reason: format!(
                    "header has {} columns but data rows have {}",
                    file.header.len(),
                    df.width()
                ),
            });
        }
        df.set_column_names(file.header.iter().map(String::as_str))?;
        Ok(df)
    }

    /// Transcode every file and infer the shared column types
    fn prepare(&mut self) -> Result<VecDeque<PreparedFile>> {
        info!("Inferring bronze schema across {} files", self.files.len());

        let mut prepared = VecDeque::with_capacity(self.files.len());
        let mut column_types: HashMap<String, DataType> = HashMap::new();

        for path in std::mem::take(&mut self.files) {
            let file = self.prepare_file(path)?;
            let df = self.read_text(&file)?;

            for (name, dtype) in infer_column_types(&df)? {
                let merged = match column_types.remove(&name) {
                    Some(existing) => merge_types(&existing, &dtype),
                    None => dtype,
                };
                column_types.insert(name, merged);
            }
            prepared.push_back(file);
        }

        debug!("Inferred bronze column types: {:?}", column_types);
        self.column_types = column_types;
        Ok(prepared)
    }

    /// Cast the text columns of one file to the shared types
    fn apply_column_types(&self, df: DataFrame) -> LazyFrame {
        let exprs: Vec<Expr> = df
            .get_column_names()
            .iter()
            .filter_map(|name| {
                self.column_types
                    .get(name.as_str())
                    .filter(|dtype| **dtype != DataType::String)
                    .map(|dtype| col(name.as_str()).cast(dtype.clone()))
            })
            .collect();

        if exprs.is_empty() {
            df.lazy()
        } else {
            df.lazy().with_columns(exprs)
        }
    }
}

impl RecordSource for BronzeCsvSource {
    fn len_hint(&self) -> Option<usize> {
        Some(
            self.prepared
                .as_ref()
                .map(VecDeque::len)
                .unwrap_or(self.files.len()),
        )
    }

    fn next_batch(&mut self) -> Result<Option<SourceBatch>> {
        if self.prepared.is_none() {
            self.prepared = Some(self.prepare()?);
        }
        let Some(file) = self.prepared.as_mut().and_then(VecDeque::pop_front) else {
            return Ok(None);
        };

        let df = self.read_text(&file)?;
        let frame = self.apply_column_types(df);
        debug!(
            "Bronze schema for {}: {:?}",
            file.path.display(),
            frame.clone().collect_schema()?
        );

        Ok(Some(SourceBatch {
            label: file.label(),
            frame,
        }))
    }
}

/// Source over frames already in memory
pub struct FrameSource {
    frames: VecDeque<(String, DataFrame)>,
    total: usize,
}

impl FrameSource {
    pub fn new(frames: Vec<(String, DataFrame)>) -> Self {
        Self {
            total: frames.len(),
            frames: frames.into(),
        }
    }
}

impl RecordSource for FrameSource {
    fn len_hint(&self) -> Option<usize> {
        Some(self.total)
    }

    fn next_batch(&mut self) -> Result<Option<SourceBatch>> {
        Ok(self.frames.pop_front().map(|(label, df)| SourceBatch {
            label,
            frame: df.lazy(),
        }))
    }
}

/// Narrowest type every non-null value of each text column parses as.
/// All-null columns are left out so they do not constrain other files.
pub fn infer_column_types(df: &DataFrame) -> Result<HashMap<String, DataType>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| df.column(name.as_str()).is_ok_and(|c| c.dtype() == &DataType::String))
        .map(|name| name.to_string())
        .collect();

    let mut exprs = Vec::with_capacity(names.len() * 3);
    for (index, name) in names.iter().enumerate() {
        let value = col(name.as_str());
        exprs.push(value.clone().is_not_null().sum().alias(format!("present_{index}")));
        exprs.push(
            value
                .clone()
                .cast(DataType::Int64)
                .is_not_null()
                .sum()
                .alias(format!("int_{index}")),
        );
        exprs.push(
            value
                .cast(DataType::Float64)
                .is_not_null()
                .sum()
                .alias(format!("float_{index}")),
        );
    }
    if exprs.is_empty() {
        return Ok(HashMap::new());
    }

    let counts = df.clone().lazy().select(exprs).collect()?;
    let count = |key: String| -> Result<u64> {
        Ok(counts.column(&key)?.get(0)?.try_extract::<u64>()?)
    };

    let mut types = HashMap::with_capacity(names.len());
    for (index, name) in names.into_iter().enumerate() {
        let present = count(format!("present_{index}"))?;
        if present == 0 {
            continue;
        }
        let dtype = if count(format!("int_{index}"))? == present {
            DataType::Int64
        } else if count(format!("float_{index}"))? == present {
            DataType::Float64
        } else {
            DataType::String
        };
        types.insert(name, dtype);
    }
    Ok(types)
}

/// Widen two inferred types: integers widen to float, anything else to string
pub fn merge_types(left: &DataType, right: &DataType) -> DataType {
    match (left, right) {
        (a, b) if a == b => a.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::String,
    }
}

/// Decode `file_path` from `encoding` into a UTF-8 temp file
pub fn transcode_to_utf8(file_path: &Path, encoding: &'static Encoding) -> Result<NamedTempFile> {
    let file = File::open(file_path).map_err(|e| RaisError::storage(file_path, e))?;
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(BufReader::new(file));

    let tmp = NamedTempFile::new()?;
    let mut writer = BufWriter::new(tmp.as_file());
    let bytes = io::copy(&mut decoder, &mut writer).map_err(|e| RaisError::storage(file_path, e))?;
    writer.flush()?;
    drop(writer);

    debug!(
        "Transcoded {} from {} ({} UTF-8 bytes)",
        file_path.display(),
        encoding.name(),
        bytes
    );
    Ok(tmp)
}
