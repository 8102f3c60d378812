//! Scratch file encoding
//!
//! Scratch files hold one JSON value per line, encoded as UTF-16LE without a
//! byte order mark.

use crate::domain::{ExportError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Buffered writer of UTF-16LE JSON lines
pub struct JsonLineWriter {
    path: PathBuf,
    out: BufWriter<File>,
    lines: u64,
}

impl JsonLineWriter {
    /// Creates (or truncates) the file at `path`
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Appends one value as a single line
    pub async fn write_value(&mut self, value: &Value) -> Result<()> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');

        let mut encoded = Vec::with_capacity(line.len() * 2);
        for unit in line.encode_utf16() {
            encoded.extend_from_slice(&unit.to_le_bytes());
        }

        self.out.write_all(&encoded).await?;
        self.lines += 1;
        Ok(())
    }

    /// Lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered output and closes the file
    pub async fn finish(mut self) -> Result<u64> {
        self.out.flush().await?;
        self.out.into_inner().sync_all().await?;
        Ok(self.lines)
    }
}

/// Reads a scratch file back into JSON values
///
/// # Errors
///
/// Returns an error if the file is not valid UTF-16LE or a line is not JSON.
pub async fn read_json_lines(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    if bytes.len() % 2 != 0 {
        return Err(ExportError::Serialization(format!(
            "{} is not UTF-16LE: odd byte count",
            path.as_ref().display()
        )));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units)
        .map_err(|e| ExportError::Serialization(format!("invalid UTF-16LE: {e}")))?;

    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(ExportError::from))
        .collect()
}
