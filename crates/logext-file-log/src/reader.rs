//! Offline decoding of `.logext` files back into records
//!
//! Reading is total: malformed lines are logged and skipped, `$INC` lines
//! for unknown ids are ignored, and a missing file yields no records.

use logext_core::{AggregatedRecord, LogSignature, RecordId, Result, StackPayload};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::format::{parse_line, DefLine, Line};

/// Everything recovered from one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedLog {
    /// Value of the `#VERSION` header, if present
    pub version: Option<String>,
    /// Value of the `#SESSION` header, if present
    pub session: Option<String>,
    /// Records in the order their `$DEF` lines appear
    pub records: Vec<AggregatedRecord>,
    /// Lines that could not be decoded
    pub skipped_lines: usize,
}

/// Read the records of a file, best effort
///
/// Never fails: a missing file or an I/O error yields whatever was decoded
/// so far (nothing, for a missing file).
pub fn read_log_file(path: impl AsRef<Path>) -> Vec<AggregatedRecord> {
    let path = path.as_ref();
    match load_log_file(path) {
        Ok(log) => log.records,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read log file");
            Vec::new()
        }
    }
}

/// Read a file with its headers and skip count
///
/// A missing file is an empty log. Other I/O errors are returned.
pub fn load_log_file(path: impl AsRef<Path>) -> Result<LoadedLog> {
    let file = match File::open(path.as_ref()) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LoadedLog::default()),
        Err(e) => return Err(e.into()),
    };
    parse_log(BufReader::new(file))
}

/// Decode a log from any buffered reader
///
/// Invalid UTF-8 is replaced rather than rejected, so one corrupt byte only
/// affects its own line.
pub fn parse_log<R: BufRead>(mut reader: R) -> Result<LoadedLog> {
    let mut builder = LogBuilder::default();
    let mut raw = Vec::with_capacity(256);
    let mut line_no = 0usize;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        line_no += 1;
        let text = String::from_utf8_lossy(&raw);
        builder.apply(&text, line_no);
    }

    Ok(builder.finish())
}

/// Accumulates records while lines are fed in
#[derive(Default)]
struct LogBuilder {
    log: LoadedLog,
    /// Newest record position for every id seen so far
    by_id: HashMap<RecordId, usize>,
}

impl LogBuilder {
    fn apply(&mut self, text: &str, line_no: usize) {
        match parse_line(text, line_no) {
            Ok(Line::Blank) | Ok(Line::Comment(_)) => {}
            Ok(Line::Version(v)) => self.log.version = Some(v.to_string()),
            Ok(Line::Session(s)) => self.log.session = Some(s.to_string()),
            Ok(Line::Def(def)) => self.define(def, line_no),
            Ok(Line::Inc { id, amount }) => match self.by_id.get(&id) {
                Some(&pos) => {
                    let record = &mut self.log.records[pos];
                    record.count = record.count.saturating_add(amount);
                }
                None => tracing::debug!(line = line_no, id, "increment for unknown record"),
            },
            Err(e) => {
                self.log.skipped_lines += 1;
                tracing::warn!(line = line_no, error = %e, "skipping malformed log line");
            }
        }
    }

    fn define(&mut self, def: DefLine<'_>, line_no: usize) {
        let stack = match StackPayload::from_json(&def.stack_json) {
            Ok(stack) => stack,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "undecodable stack payload");
                StackPayload::default()
            }
        };

        let record = AggregatedRecord {
            id: def.id,
            signature: LogSignature::compute(&def.caller_file, def.caller_line, &def.message),
            level: def.level,
            message: def.message.into_owned(),
            payload: def.payload.map(|p| p.into_owned()),
            frames: stack.frames,
            exception: stack.exception,
            caller_file: def.caller_file.into_owned(),
            caller_line: def.caller_line,
            count: 1,
            first_seen: def.timestamp,
            last_seen: def.timestamp,
        };

        self.by_id.insert(record.id, self.log.records.len());
        self.log.records.push(record);
    }

    fn finish(self) -> LoadedLog {
        self.log
    }
}
