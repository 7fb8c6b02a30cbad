use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use nws_crawler::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvWriterConfig {
    pub delimiter: char,
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

impl CsvWriterConfig {
    /// The csv crate works on bytes, wider characters would be truncated.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.delimiter.is_ascii() {
            anyhow::bail!("CSV delimiter must be an ASCII character, got {:?}", self.delimiter);
        }
        if let CsvTerminator::Any(c) = self.terminator {
            if !c.is_ascii() {
                anyhow::bail!("CSV terminator must be an ASCII character, got {c:?}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        builder
    }
}

pub enum CsvWriter {
    File(csv::Writer<File>),
    Stdout(csv::Writer<io::Stdout>),
}

impl CsvWriter {
    pub fn new(output: Option<&Path>, conf: &CsvWriterConfig) -> anyhow::Result<Self> {
        conf.validate()?;
        let builder = csv::WriterBuilder::from(conf);
        Ok(match output {
            Some(path) => Self::File(builder.from_writer(File::create(path)?)),
            None => Self::Stdout(builder.from_writer(io::stdout())),
        })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File(wtr) => wtr.flush(),
            Self::Stdout(wtr) => wtr.flush(),
        }
    }

    pub fn serialize(&mut self, record: &Record) -> csv::Result<()> {
        match self {
            Self::File(wtr) => wtr.serialize(record),
            Self::Stdout(wtr) => wtr.serialize(record),
        }
    }
}

/// Writes `records` to `output`, or stdout when `None`.
pub fn write_records(
    records: &[Record],
    format: OutputFormat,
    output: Option<&Path>,
    csv_conf: &CsvWriterConfig,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut wtr = CsvWriter::new(output, csv_conf)?;
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let out: Box<dyn Write> = match output {
                Some(path) => Box::new(File::create(path)?),
                None => Box::new(io::stdout()),
            };
            let mut out = BufWriter::new(out);
            serde_json::to_writer_pretty(&mut out, records)?;
            writeln!(out)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// `{year}_{keyword}_article.{ext}`, with characters that can't appear in a
/// file name replaced by `_`.
pub fn default_output_file(year: i32, keyword: &str, format: OutputFormat) -> PathBuf {
    let safe_keyword = keyword
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect::<String>();
    PathBuf::from(format!("{year}_{safe_keyword}_article.{}", format.extension()))
}
