//! Chunked export: JSON array, JSON Lines, CSV and headered plain text.
//!
//! Records are spread over numbered files of at most `chunk_size` records
//! each. `out.json` becomes `out-0000.json`, `out-0001.json`, …

pub mod csv;
pub mod json;
pub mod text;

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ExtractError, Result};
use crate::model::record::{ExtractSummary, MessageRecord};
use crate::parser::charset::DecodePolicy;

/// Output buffer per chunk file.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One pretty-printed JSON array per file.
    Json,
    /// One JSON object per line.
    JsonLines,
    /// Header row plus one row per record.
    Csv,
    /// `# <index>` marker, four header lines, then the body.
    HeaderedText,
}

impl OutputFormat {
    /// Charset error handling used when producing this format.
    ///
    /// The structured formats substitute invalid sequences in place; the
    /// headered text export decodes strictly and falls back to UTF-8.
    pub fn decode_policy(self) -> DecodePolicy {
        match self {
            OutputFormat::Json | OutputFormat::JsonLines | OutputFormat::Csv => {
                DecodePolicy::SubstituteAlways
            }
            OutputFormat::HeaderedText => DecodePolicy::StrictThenFallback,
        }
    }

    /// A fresh serializer for this format.
    pub fn record_format(self) -> Box<dyn RecordFormat> {
        match self {
            OutputFormat::Json => Box::new(json::JsonArrayFormat::default()),
            OutputFormat::JsonLines => Box::new(json::JsonLinesFormat),
            OutputFormat::Csv => Box::new(csv::CsvFormat),
            OutputFormat::HeaderedText => Box::new(text::HeaderedTextFormat),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
            OutputFormat::Csv => "csv",
            OutputFormat::HeaderedText => "text",
        };
        f.write_str(name)
    }
}

/// Serializes records into one chunk file.
///
/// `begin` runs right after a chunk file is created, `finish` right before
/// it is closed. Implementations may buffer records between the two.
pub trait RecordFormat {
    /// Write whatever precedes the first record (e.g. a header row).
    fn begin(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    /// Write or buffer one record.
    fn write_record(&mut self, out: &mut dyn Write, record: MessageRecord) -> io::Result<()>;

    /// Write whatever is still buffered and any closing syntax.
    fn finish(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    /// Whether an archive without messages still produces a (document-only) file.
    fn emits_empty_document(&self) -> bool {
        true
    }
}

/// Maps a user-supplied output path to numbered chunk file paths.
///
/// The name is split on its last `.`, ignoring leading dots:
/// `dir/name.ext` → `dir/name-0003.ext`, `dir/.hidden` → `dir/.hidden-0003`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNaming {
    base: String,
    ext: String,
}

impl ChunkNaming {
    /// Split `output_path` into base and extension.
    pub fn new(output_path: &Path) -> Result<Self> {
        let path = output_path.to_str().ok_or_else(|| {
            ExtractError::InvalidPath(format!("{} is not valid UTF-8", output_path.display()))
        })?;

        let name_start = path.rfind(std::path::is_separator).map_or(0, |pos| pos + 1);
        let name = &path[name_start..];
        if name.is_empty() || name == "." || name == ".." {
            return Err(ExtractError::InvalidPath(format!(
                "'{path}' does not name a file"
            )));
        }

        let stem_start = name.len() - name.trim_start_matches('.').len();
        let (base, ext) = match name[stem_start..].rfind('.') {
            Some(dot) => path.split_at(name_start + stem_start + dot),
            None => (path, ""),
        };

        Ok(Self {
            base: base.to_string(),
            ext: ext.to_string(),
        })
    }

    /// Path of chunk file number `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}-{:04}{}", self.base, index, self.ext))
    }
}

/// The chunk file currently being written.
struct OpenChunk {
    index: usize,
    count: usize,
    path: PathBuf,
    out: BufWriter<File>,
}

enum WriterState {
    NoFileOpen,
    FileOpen(OpenChunk),
}

/// Writes a record stream into numbered chunk files.
///
/// A chunk file is created right before its first record is written and
/// closed as soon as it holds `chunk_size` records, so no empty trailing
/// file is ever left behind. Call [`ChunkedWriter::finish`] at end of
/// stream to close the last, possibly partial, chunk.
pub struct ChunkedWriter {
    naming: ChunkNaming,
    chunk_size: usize,
    format: Box<dyn RecordFormat>,
    state: WriterState,
    next_chunk: usize,
    records: u64,
    files: Vec<PathBuf>,
    bytes_written: u64,
}

impl ChunkedWriter {
    /// Prepare a writer. No file is created until the first record arrives.
    pub fn new(output_path: &Path, chunk_size: usize, format: OutputFormat) -> Result<Self> {
        Self::with_format(output_path, chunk_size, format.record_format())
    }

    /// Prepare a writer around a custom serializer.
    pub fn with_format(
        output_path: &Path,
        chunk_size: usize,
        format: Box<dyn RecordFormat>,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ExtractError::InvalidChunkSize(chunk_size));
        }
        Ok(Self {
            naming: ChunkNaming::new(output_path)?,
            chunk_size,
            format,
            state: WriterState::NoFileOpen,
            next_chunk: 0,
            records: 0,
            files: Vec::new(),
            bytes_written: 0,
        })
    }

    /// Write one record, opening or closing chunk files as needed.
    pub fn write(&mut self, record: MessageRecord) -> Result<()> {
        let mut chunk = match std::mem::replace(&mut self.state, WriterState::NoFileOpen) {
            WriterState::FileOpen(chunk) => chunk,
            WriterState::NoFileOpen => self.open_chunk()?,
        };

        self.format
            .write_record(&mut chunk.out, record)
            .map_err(|e| ExtractError::io(&chunk.path, e))?;
        chunk.count += 1;
        self.records += 1;

        if chunk.count >= self.chunk_size {
            self.close_chunk(chunk)?;
        } else {
            self.state = WriterState::FileOpen(chunk);
        }
        Ok(())
    }

    /// Close the open chunk and report what was written.
    ///
    /// If nothing was ever written, formats that always produce a document
    /// still get an empty chunk file 0.
    pub fn finish(mut self) -> Result<ExtractSummary> {
        match std::mem::replace(&mut self.state, WriterState::NoFileOpen) {
            WriterState::FileOpen(chunk) => self.close_chunk(chunk)?,
            WriterState::NoFileOpen => {
                if self.next_chunk == 0 && self.format.emits_empty_document() {
                    let chunk = self.open_chunk()?;
                    self.close_chunk(chunk)?;
                }
            }
        }

        Ok(ExtractSummary {
            messages: self.records,
            files: self.files,
            bytes_written: self.bytes_written,
        })
    }

    /// Paths of the chunk files created so far.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn open_chunk(&mut self) -> Result<OpenChunk> {
        let index = self.next_chunk;
        let path = self.naming.path_for(index);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }

        let file = File::create(&path).map_err(|e| ExtractError::io(&path, e))?;
        let mut out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        self.format
            .begin(&mut out)
            .map_err(|e| ExtractError::io(&path, e))?;

        info!(chunk = index, path = %path.display(), "Opened chunk file");
        self.next_chunk += 1;
        self.files.push(path.clone());

        Ok(OpenChunk {
            index,
            count: 0,
            path,
            out,
        })
    }

    fn close_chunk(&mut self, mut chunk: OpenChunk) -> Result<()> {
        self.format
            .finish(&mut chunk.out)
            .map_err(|e| ExtractError::io(&chunk.path, e))?;
        let file = chunk
            .out
            .into_inner()
            .map_err(|e| ExtractError::io(&chunk.path, e.into_error()))?;
        let size = file
            .metadata()
            .map_err(|e| ExtractError::io(&chunk.path, e))?
            .len();
        self.bytes_written += size;

        info!(
            chunk = chunk.index,
            records = chunk.count,
            bytes = size,
            "Closed chunk file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u64) -> MessageRecord {
        MessageRecord {
            index,
            subject: format!("Subject {index}"),
            from: "a@example.com".into(),
            to: "b@example.com".into(),
            date: "Mon, 1 Jan 2024 00:00:00 +0000".into(),
            body: "body\n".into(),
        }
    }

    #[test]
    fn test_chunk_naming_with_extension() {
        let naming = ChunkNaming::new(Path::new("dir/name.ext")).unwrap();
        assert_eq!(naming.path_for(0), PathBuf::from("dir/name-0000.ext"));
        assert_eq!(naming.path_for(12), PathBuf::from("dir/name-0012.ext"));
        assert_eq!(naming.path_for(12345), PathBuf::from("dir/name-12345.ext"));
    }

    #[test]
    fn test_chunk_naming_splits_on_last_dot() {
        let naming = ChunkNaming::new(Path::new("out.tar.json")).unwrap();
        assert_eq!(naming.path_for(1), PathBuf::from("out.tar-0001.json"));
    }

    #[test]
    fn test_chunk_naming_without_extension() {
        let naming = ChunkNaming::new(Path::new("some.dir/out")).unwrap();
        assert_eq!(naming.path_for(0), PathBuf::from("some.dir/out-0000"));

        let naming = ChunkNaming::new(Path::new("dir/.hidden")).unwrap();
        assert_eq!(naming.path_for(0), PathBuf::from("dir/.hidden-0000"));
    }

    #[test]
    fn test_chunk_naming_rejects_directory_path() {
        assert!(ChunkNaming::new(Path::new("dir/")).is_err());
        assert!(ChunkNaming::new(Path::new("")).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = ChunkedWriter::new(Path::new("out.json"), 0, OutputFormat::Json)
            .err()
            .unwrap();
        assert!(matches!(err, ExtractError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_exact_multiple_leaves_no_trailing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.jsonl");
        let mut writer = ChunkedWriter::new(&out, 2, OutputFormat::JsonLines).unwrap();
        for i in 1..=4 {
            writer.write(record(i)).unwrap();
        }
        assert_eq!(writer.files().len(), 2);
        let summary = writer.finish().unwrap();
        assert_eq!(summary.messages, 4);
        assert_eq!(summary.files.len(), 2);
        assert!(!tmp.path().join("out-0002.jsonl").exists());
    }

    #[test]
    fn test_files_open_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out.txt");
        let mut writer = ChunkedWriter::new(&out, 1, OutputFormat::HeaderedText).unwrap();
        assert!(!tmp.path().join("out-0000.txt").exists());
        writer.write(record(1)).unwrap();
        assert!(tmp.path().join("out-0000.txt").exists());
        assert!(!tmp.path().join("out-0001.txt").exists());
        writer.finish().unwrap();
    }

    #[test]
    fn test_empty_stream_per_format() {
        let tmp = tempfile::tempdir().unwrap();

        let summary = ChunkedWriter::new(&tmp.path().join("a.json"), 150, OutputFormat::Json)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(summary.files.len(), 1);
        assert_eq!(std::fs::read_to_string(&summary.files[0]).unwrap(), "[]");

        let summary = ChunkedWriter::new(&tmp.path().join("a.csv"), 150, OutputFormat::Csv)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&summary.files[0]).unwrap(),
            "index,subject,from,to,date,body\r\n"
        );

        let summary =
            ChunkedWriter::new(&tmp.path().join("a.txt"), 150, OutputFormat::HeaderedText)
                .unwrap()
                .finish()
                .unwrap();
        assert!(summary.files.is_empty());
        assert!(!tmp.path().join("a-0000.txt").exists());
    }

    #[test]
    fn test_bytes_written_matches_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = ChunkedWriter::new(&tmp.path().join("o.json"), 3, OutputFormat::Json).unwrap();
        for i in 1..=5 {
            writer.write(record(i)).unwrap();
        }
        let summary = writer.finish().unwrap();
        let total: u64 = summary
            .files
            .iter()
            .map(|p| std::fs::metadata(p).unwrap().len())
            .sum();
        assert_eq!(summary.bytes_written, total);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested").join("deeper").join("o.jsonl");
        let mut writer = ChunkedWriter::new(&out, 10, OutputFormat::JsonLines).unwrap();
        writer.write(record(1)).unwrap();
        writer.finish().unwrap();
        assert!(tmp.path().join("nested/deeper/o-0000.jsonl").exists());
    }

    #[test]
    fn test_decode_policy_per_format() {
        assert_eq!(OutputFormat::Json.decode_policy(), DecodePolicy::SubstituteAlways);
        assert_eq!(OutputFormat::Csv.decode_policy(), DecodePolicy::SubstituteAlways);
        assert_eq!(
            OutputFormat::HeaderedText.decode_policy(),
            DecodePolicy::StrictThenFallback
        );
        assert_eq!(OutputFormat::JsonLines.to_string(), "jsonl");
    }
}
