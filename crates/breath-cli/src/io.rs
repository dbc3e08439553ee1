use anyhow::{anyhow, bail, Context, Result};
use breath_lib::signal::Recording;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Columns to pull from a delimited recording.
#[derive(Debug, Clone)]
pub struct TableLayout<'a> {
    pub time_column: &'a str,
    /// Channel columns to keep; empty keeps every non-time column.
    pub channels: &'a [String],
    pub delimiter: u8,
}

/// Read a recording from `path`, or stdin when `path` is `None`.
pub fn read_recording(path: Option<&Path>, layout: &TableLayout<'_>) -> Result<Recording> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            parse_recording(file, layout).with_context(|| format!("reading {}", path.display()))
        }
        None => parse_recording(io::stdin().lock(), layout).context("reading stdin"),
    }
}

/// Parse a header-first delimited table. Empty and `NaN` cells are missing
/// samples; any other unparsable cell is an error.
pub fn parse_recording<R: Read>(reader: R, layout: &TableLayout<'_>) -> Result<Recording> {
    let mut reader = ReaderBuilder::new()
        .delimiter(layout.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();

    let time_idx = locate_column(&headers, layout.time_column)?;
    let channel_idx: Vec<(String, usize)> = if layout.channels.is_empty() {
        headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != time_idx)
            .map(|(idx, name)| (name.to_string(), idx))
            .collect()
    } else {
        layout
            .channels
            .iter()
            .map(|name| Ok((name.clone(), locate_column(&headers, name)?)))
            .collect::<Result<_>>()?
    };
    if channel_idx.is_empty() {
        bail!("no channel columns besides {}", layout.time_column);
    }

    let mut times = Vec::new();
    let mut columns = vec![Vec::new(); channel_idx.len()];
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let line = row + 2;
        let time = record
            .get(time_idx)
            .filter(|cell| !cell.is_empty())
            .ok_or_else(|| anyhow!("line {line}: missing timestamp"))?;
        times.push(
            time.parse::<f64>()
                .with_context(|| format!("line {line}: timestamp is not f64: {time}"))?,
        );
        for ((name, idx), column) in channel_idx.iter().zip(columns.iter_mut()) {
            column.push(parse_sample(record.get(*idx).unwrap_or("")).with_context(|| {
                format!("line {line}: column {name} is not f64")
            })?);
        }
    }
    if times.is_empty() {
        bail!("no samples found");
    }

    let mut recording = Recording::new(times);
    for ((name, _), values) in channel_idx.into_iter().zip(columns) {
        recording.push_channel(name, values)?;
    }
    Ok(recording)
}

fn parse_sample(cell: &str) -> Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    Ok(cell.parse::<f64>()?)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing column {requested}"))
}

/// A `time` column plus named value columns, all on the same index.
pub struct Table {
    pub header: Vec<String>,
    pub times: Vec<f64>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl Table {
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            header: Vec::new(),
            times,
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        self.header.push(name.into());
        self.columns.push(values);
    }

    /// Write as CSV to `path`, or stdout when `path` is `None`. Missing values
    /// are written as empty cells.
    pub fn write(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                let file =
                    File::create(path).with_context(|| format!("creating {}", path.display()))?;
                self.write_to(file)
            }
            None => self.write_to(io::stdout().lock()),
        }
    }

    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(out);
        writer.write_field("time")?;
        writer.write_record(&self.header)?;
        for (row, time) in self.times.iter().enumerate() {
            writer.write_field(time.to_string())?;
            let cells = self.columns.iter().map(|column| match column[row] {
                Some(v) => v.to_string(),
                None => String::new(),
            });
            writer.write_record(cells)?;
        }
        writer.flush()?;
        Ok(())
    }
}
