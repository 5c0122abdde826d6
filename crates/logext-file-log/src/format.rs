//! The `.logext` line format
//!
//! ```text
//! #VERSION:1.0
//! #SESSION:2026-10-19 14:03:11
//! $DEF|<id>|<levelInt>|<ticks>|<message>|<payload>|<path>:<line>|<stackJson>
//! $INC|<id>|<amount>
//! ```
//!
//! Free-text fields go through one escape pass: the field separator and line
//! breaks are replaced by single substitute glyphs, and the reader maps them
//! back. Text that already contains a substitute glyph reads back as the
//! character it stands for.

use chrono::{DateTime, Local};
use logext_core::{CommandKind, LogLevel, LogextError, RecordId, Result, WriteCommand};
use std::borrow::Cow;
use std::fmt::Write as FmtWrite;

/// Format version written in every file header
pub const FORMAT_VERSION: &str = "1.0";

/// Extension of persisted files (without the dot)
pub const FILE_EXTENSION: &str = "logext";

pub const FIELD_SEPARATOR: char = '|';
pub const COMMENT_MARKER: char = '#';

/// Stand-in for `|` inside free text (BROKEN BAR)
pub const SEPARATOR_SUBSTITUTE: char = '\u{00A6}';
/// Stand-in for `\n` inside free text (SYMBOL FOR NEWLINE)
pub const NEWLINE_SUBSTITUTE: char = '\u{2424}';
/// Stand-in for `\r` inside free text (SYMBOL FOR CARRIAGE RETURN)
pub const CARRIAGE_RETURN_SUBSTITUTE: char = '\u{240D}';

pub const DEF_TAG: &str = "$DEF";
pub const INC_TAG: &str = "$INC";

const VERSION_KEY: &str = "VERSION";
const SESSION_KEY: &str = "SESSION";
const SESSION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of `|`-separated fields in a `$DEF` line, tag included
pub const DEF_FIELD_COUNT: usize = 8;
/// Number of `|`-separated fields in an `$INC` line, tag included
pub const INC_FIELD_COUNT: usize = 3;

/// Append `text` to `buf` with separator and line breaks substituted
pub fn escape_into(buf: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            FIELD_SEPARATOR => buf.push(SEPARATOR_SUBSTITUTE),
            '\n' => buf.push(NEWLINE_SUBSTITUTE),
            '\r' => buf.push(CARRIAGE_RETURN_SUBSTITUTE),
            c => buf.push(c),
        }
    }
}

pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains([FIELD_SEPARATOR, '\n', '\r']) {
        return Cow::Borrowed(text);
    }
    let mut buf = String::with_capacity(text.len() + 8);
    escape_into(&mut buf, text);
    Cow::Owned(buf)
}

/// Reverse [`escape`]
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains([
        SEPARATOR_SUBSTITUTE,
        NEWLINE_SUBSTITUTE,
        CARRIAGE_RETURN_SUBSTITUTE,
    ]) {
        return Cow::Borrowed(text);
    }
    let unescaped = text
        .chars()
        .map(|ch| match ch {
            SEPARATOR_SUBSTITUTE => FIELD_SEPARATOR,
            NEWLINE_SUBSTITUTE => '\n',
            CARRIAGE_RETURN_SUBSTITUTE => '\r',
            c => c,
        })
        .collect();
    Cow::Owned(unescaped)
}

/// Append the two header lines opening every file
pub fn write_header(buf: &mut String, session_start: DateTime<Local>) {
    let _ = writeln!(buf, "{}{}:{}", COMMENT_MARKER, VERSION_KEY, FORMAT_VERSION);
    let _ = writeln!(
        buf,
        "{}{}:{}",
        COMMENT_MARKER,
        SESSION_KEY,
        session_start.format(SESSION_FORMAT)
    );
}

/// File name for a file opened at `opened_at`
///
/// Millisecond resolution keeps names unique across rapid rotations; the
/// writer adds a numeric suffix on the rare collision.
pub fn file_name(prefix: &str, opened_at: DateTime<Local>, attempt: u32) -> String {
    let stamp = opened_at.format("%Y%m%d_%H%M%S_%3f");
    if attempt == 0 {
        format!("{}_{}.{}", prefix, stamp, FILE_EXTENSION)
    } else {
        format!("{}_{}_{}.{}", prefix, stamp, attempt, FILE_EXTENSION)
    }
}

/// Append the line for one command, newline included
pub fn encode_command(buf: &mut String, cmd: &WriteCommand) {
    match cmd.kind {
        CommandKind::Def => encode_def(
            buf,
            &DefLine {
                id: cmd.id,
                level: cmd.level,
                timestamp: cmd.timestamp,
                message: Cow::Borrowed(cmd.message.as_str()),
                payload: cmd.payload.as_deref().map(Cow::Borrowed),
                caller_file: Cow::Borrowed(cmd.caller_file.as_str()),
                caller_line: cmd.caller_line,
                stack_json: Cow::Borrowed(cmd.stack_json.as_str()),
            },
        ),
        CommandKind::Inc => encode_inc(buf, cmd.id, cmd.amount),
    }
}

pub fn encode_def(buf: &mut String, def: &DefLine<'_>) {
    let _ = write!(
        buf,
        "{}|{}|{}|{}|",
        DEF_TAG,
        def.id,
        def.level.as_u8(),
        def.timestamp
    );
    escape_into(buf, &def.message);
    buf.push(FIELD_SEPARATOR);
    if let Some(payload) = &def.payload {
        escape_into(buf, payload);
    }
    buf.push(FIELD_SEPARATOR);
    escape_into(buf, &def.caller_file);
    let _ = write!(buf, ":{}", def.caller_line);
    buf.push(FIELD_SEPARATOR);
    escape_into(buf, &def.stack_json);
    buf.push('\n');
}

pub fn encode_inc(buf: &mut String, id: RecordId, amount: u64) {
    let _ = writeln!(buf, "{}|{}|{}", INC_TAG, id, amount);
}

/// Decoded fields of a `$DEF` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefLine<'a> {
    pub id: RecordId,
    pub level: LogLevel,
    pub timestamp: i64,
    pub message: Cow<'a, str>,
    /// Empty payload fields decode as `None`
    pub payload: Option<Cow<'a, str>>,
    pub caller_file: Cow<'a, str>,
    pub caller_line: u32,
    pub stack_json: Cow<'a, str>,
}

/// One classified line of a `.logext` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Version(&'a str),
    Session(&'a str),
    Comment(&'a str),
    Def(DefLine<'a>),
    Inc { id: RecordId, amount: u64 },
}

/// Classify and decode a single line (without its trailing newline)
///
/// `line_no` is only used for error reporting.
pub fn parse_line(line: &str, line_no: usize) -> Result<Line<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(comment) = line.strip_prefix(COMMENT_MARKER) {
        return Ok(match comment.split_once(':') {
            Some((VERSION_KEY, value)) => Line::Version(value.trim()),
            Some((SESSION_KEY, value)) => Line::Session(value.trim()),
            _ => Line::Comment(comment),
        });
    }

    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    match fields[0] {
        DEF_TAG => parse_def(&fields, line_no).map(Line::Def),
        INC_TAG => {
            if fields.len() != INC_FIELD_COUNT {
                return Err(parse_error(
                    line_no,
                    format!("$INC expects {} fields, found {}", INC_FIELD_COUNT, fields.len()),
                ));
            }
            Ok(Line::Inc {
                id: parse_number(fields[1], "id", line_no)?,
                amount: parse_number(fields[2], "amount", line_no)?,
            })
        }
        other => Err(parse_error(line_no, format!("unknown line tag: {}", other))),
    }
}

fn parse_def<'a>(fields: &[&'a str], line_no: usize) -> Result<DefLine<'a>> {
    if fields.len() != DEF_FIELD_COUNT {
        return Err(parse_error(
            line_no,
            format!("$DEF expects {} fields, found {}", DEF_FIELD_COUNT, fields.len()),
        ));
    }

    let id = parse_number(fields[1], "id", line_no)?;
    let level_int: u8 = parse_number(fields[2], "level", line_no)?;
    let level = LogLevel::from_u8(level_int)
        .ok_or_else(|| parse_error(line_no, format!("unknown level: {}", level_int)))?;
    let timestamp = parse_number(fields[3], "timestamp", line_no)?;

    let payload = if fields[5].is_empty() {
        None
    } else {
        Some(unescape(fields[5]))
    };

    // Paths may contain ':' (drive letters), the line number follows the last one
    let (caller_file, caller_line) = match fields[6].rsplit_once(':') {
        Some((file, line)) => (file, line.trim().parse().unwrap_or(0)),
        None => (fields[6], 0),
    };

    Ok(DefLine {
        id,
        level,
        timestamp,
        message: unescape(fields[4]),
        payload,
        caller_file: unescape(caller_file),
        caller_line,
        stack_json: unescape(fields[7]),
    })
}

fn parse_number<T: std::str::FromStr>(field: &str, name: &str, line_no: usize) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| parse_error(line_no, format!("invalid {}: {:?}", name, field)))
}

fn parse_error(line: usize, reason: String) -> LogextError {
    LogextError::Parse { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn def_command() -> WriteCommand {
        let mut cmd = WriteCommand::default();
        cmd.set_def(
            3,
            LogLevel::Warning,
            17_000_000_000_000_000,
            "disk | almost\nfull",
            Some("(1.00, 2.00, 3.00)"),
            "C:\\game\\src\\disk.rs",
            88,
            "{\"frames\":[{\"scope\":\"Disk\"}]}".into(),
        );
        cmd
    }

    #[test]
    fn test_escape_roundtrip() {
        let original = "a|b\nc\r\nd||";
        let escaped = escape(original);
        assert!(!escaped.contains('|'));
        assert!(!escaped.contains('\n'));
        assert!(!escaped.contains('\r'));
        assert_eq!(unescape(&escaped), original);
    }

    #[test]
    fn test_escape_borrows_clean_text() {
        assert!(matches!(escape("plain text"), Cow::Borrowed(_)));
        assert!(matches!(unescape("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_encode_def_layout() {
        let mut buf = String::new();
        encode_command(&mut buf, &def_command());
        assert!(buf.starts_with("$DEF|3|3|17000000000000000|disk ¦ almost␤full|"));
        assert!(buf.ends_with('\n'));
        assert_eq!(buf.trim_end().split('|').count(), DEF_FIELD_COUNT);
    }

    #[test]
    fn test_def_line_roundtrip() {
        let cmd = def_command();
        let mut buf = String::new();
        encode_command(&mut buf, &cmd);

        match parse_line(&buf, 1).unwrap() {
            Line::Def(def) => {
                assert_eq!(def.id, 3);
                assert_eq!(def.level, LogLevel::Warning);
                assert_eq!(def.timestamp, cmd.timestamp);
                assert_eq!(def.message, cmd.message);
                assert_eq!(def.payload.as_deref(), cmd.payload.as_deref());
                assert_eq!(def.caller_file, cmd.caller_file);
                assert_eq!(def.caller_line, 88);
                assert_eq!(def.stack_json, cmd.stack_json);
            }
            other => panic!("expected $DEF, got {:?}", other),
        }
    }

    #[test]
    fn test_inc_line() {
        let mut buf = String::new();
        encode_inc(&mut buf, 9, 4);
        assert_eq!(buf, "$INC|9|4\n");
        assert_eq!(parse_line(&buf, 1).unwrap(), Line::Inc { id: 9, amount: 4 });
    }

    #[test]
    fn test_header_lines() {
        let session = Local.with_ymd_and_hms(2026, 10, 19, 14, 3, 11).unwrap();
        let mut buf = String::new();
        write_header(&mut buf, session);
        let lines: Vec<_> = buf.lines().collect();
        assert_eq!(lines[0], "#VERSION:1.0");
        assert_eq!(lines[1], "#SESSION:2026-10-19 14:03:11");
        assert_eq!(parse_line(lines[0], 1).unwrap(), Line::Version("1.0"));
        assert_eq!(
            parse_line(lines[1], 2).unwrap(),
            Line::Session("2026-10-19 14:03:11")
        );
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(parse_line("$DEF|1|2|3", 1).is_err());
        assert!(parse_line("$DEF|x|2|3|m||a:1|", 1).is_err());
        assert!(parse_line("$DEF|1|9|3|m||a:1|", 1).is_err());
        assert!(parse_line("$INC|1", 1).is_err());
        assert!(parse_line("garbage", 1).is_err());
        assert_eq!(parse_line("", 1).unwrap(), Line::Blank);
        assert_eq!(parse_line("# note", 1).unwrap(), Line::Comment(" note"));
    }

    #[test]
    fn test_empty_payload_decodes_as_none() {
        match parse_line("$DEF|1|2|3|msg||a.go:10|", 1).unwrap() {
            Line::Def(def) => {
                assert!(def.payload.is_none());
                assert_eq!(def.caller_file, "a.go");
                assert_eq!(def.caller_line, 10);
                assert!(def.stack_json.is_empty());
            }
            other => panic!("expected $DEF, got {:?}", other),
        }
    }

    #[test]
    fn test_file_name() {
        let at = Local.with_ymd_and_hms(2026, 10, 19, 14, 3, 11).unwrap();
        assert_eq!(file_name("log", at, 0), "log_20261019_140311_000.logext");
        assert_eq!(file_name("log", at, 2), "log_20261019_140311_000_2.logext");
    }

    #[test]
    fn test_literal_substitute_glyphs_read_back_as_originals() {
        // A real `¦` or `␤` in text cannot be told apart from a substitution
        assert_eq!(unescape(&escape("price ¦ 5")), "price | 5");
        assert_eq!(unescape(&escape("a␤b")), "a\nb");

        let mut cmd = WriteCommand::default();
        cmd.set_def(1, LogLevel::Info, 1, "price ¦ 5", None, "shop.rs", 4, String::new());
        let mut buf = String::new();
        encode_command(&mut buf, &cmd);
        match parse_line(&buf, 1).unwrap() {
            Line::Def(def) => assert_eq!(def.message, "price | 5"),
            other => panic!("expected $DEF, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_payload_reads_back_as_none() {
        let mut cmd = WriteCommand::default();
        cmd.set_def(1, LogLevel::Info, 1, "m", Some(""), "a.rs", 1, String::new());
        let mut buf = String::new();
        encode_command(&mut buf, &cmd);
        assert!(buf.contains("|m||a.rs:1|"));
        match parse_line(&buf, 1).unwrap() {
            Line::Def(def) => assert!(def.payload.is_none()),
            other => panic!("expected $DEF, got {:?}", other),
        }
    }
}
