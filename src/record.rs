//! Input records read from a tab or comma separated file.
//!
//! The first line is the header naming the fields. If it contains a tab the
//! whole input is read as tab separated, otherwise as comma separated. Field
//! names are lower-cased so lookups are case-insensitive. A row whose field
//! count differs from the header is a [`ShelfkeeperError::RecordFormat`].

use std::io::{BufRead, BufReader, Chain, Cursor, Read};

use csv::{ReaderBuilder, StringRecordsIntoIter};
use tracing::debug;

use crate::error::{Result, ShelfkeeperError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    line: u64,
    fields: Vec<(String, String)>,
}

impl InputRecord {
    /// Builds a record by hand; field names are lower-cased.
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::at_line(0, fields)
    }

    fn at_line<I, K, V>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut record = Self { line, fields: Vec::new() };
        for (name, value) in fields {
            let name = name.as_ref().to_lowercase();
            let value = value.into();
            match record.fields.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => record.fields.push((name, value)),
            }
        }
        record
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Line of the input the record started on, zero for hand-built records.
    pub fn line(&self) -> u64 {
        self.line
    }
}

type Source<R> = Chain<Cursor<Vec<u8>>, BufReader<R>>;

/// Pull-based reader of [`InputRecord`]s; each record is read only when asked for.
pub struct RecordSource<R: Read> {
    headers: Vec<String>,
    delimiter: u8,
    records: StringRecordsIntoIter<Source<R>>,
}

impl<R: Read> RecordSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let mut header = Vec::new();
        if reader.read_until(b'\n', &mut header)? == 0 {
            return Err(ShelfkeeperError::RecordFormat {
                line: 1,
                message: "input is empty, expected a header line".into(),
            });
        }
        let header = String::from_utf8(header).map_err(|e| ShelfkeeperError::RecordFormat {
            line: 1,
            message: format!("header line is not valid UTF-8: {}", e.utf8_error()),
        })?;
        let delimiter = if header.contains('\t') { b'\t' } else { b',' };
        debug!(delimiter = %(delimiter as char).escape_default(), "detected input delimiter");

        let mut delimited = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(Cursor::new(header.into_bytes()).chain(reader));
        let headers: Vec<String> = delimited.headers()?.iter().map(str::to_lowercase).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ShelfkeeperError::RecordFormat {
                line: 1,
                message: "header line names no fields".into(),
            });
        }
        Ok(Self {
            headers,
            delimiter,
            records: delimited.into_records(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Some(Ok(InputRecord::at_line(
            line,
            self.headers.iter().zip(record.iter()),
        )))
    }
}
