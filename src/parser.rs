//! The record parser: turns a TAB-separated, newline-terminated bytestream
//! into a lazy sequence of [`Record`]s with zero per-record allocation on
//! the hot path.
//!
//! Line format (see spec §4.1 / §6): a double-quoted path with `\"`/`\\`
//! escapes, then ten TAB-separated fields in fixed order: size, uid, gid,
//! atime, mtime, ctime, entry-type byte, inode, hardlink-count,
//! block-count, apparent-size.

use std::io::BufRead;

use crate::error::{CoreError, Result};
use crate::record::{EntryType, Record};

const FIELD_COUNT: usize = 11;

/// Reads logical records off a buffered byte stream.
///
/// Owns two reusable buffers (the raw line, and the unescaped path) so a
/// full pass over a multi-hundred-million-line dump allocates nothing
/// beyond the occasional buffer growth. `scan` borrows from those buffers,
/// so a returned [`Record`] is valid only until the next call to `scan`.
pub struct RecordParser<R> {
    reader: R,
    line: Vec<u8>,
    path: Vec<u8>,
    record_number: u64,
}

impl<R: BufRead> RecordParser<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(512),
            path: Vec::with_capacity(512),
            record_number: 0,
        }
    }

    /// The 1-based number of the most recently returned (or attempted)
    /// record, used to annotate errors.
    #[must_use]
    pub const fn record_number(&self) -> u64 {
        self.record_number
    }

    /// Reads the next logical record. Returns `Ok(None)` at end of stream.
    pub fn scan(&mut self) -> Result<Option<Record<'_>>> {
        self.line.clear();
        let read = read_line(&mut self.reader, &mut self.line).map_err(|e| {
            CoreError::MalformedRecord {
                record_number: self.record_number + 1,
                reason: io_error_reason(e),
            }
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.record_number += 1;
        if self.line.is_empty() {
            return Err(CoreError::MalformedRecord {
                record_number: self.record_number,
                reason: "empty line",
            });
        }

        let (path_field, rest) = split_quoted_path(&self.line).ok_or(CoreError::MalformedRecord {
            record_number: self.record_number,
            reason: "path is not a quoted field",
        })?;
        self.path.clear();
        unescape_into(path_field, &mut self.path).ok_or(CoreError::MalformedRecord {
            record_number: self.record_number,
            reason: "invalid escape sequence in path",
        })?;

        let fields: Vec<&[u8]> = rest.split(|&b| b == b'\t').collect();
        if fields.len() != FIELD_COUNT {
            return Err(CoreError::MalformedRecord {
                record_number: self.record_number,
                reason: "wrong field count",
            });
        }

        let record_number = self.record_number;
        let parse_i64 = |idx: usize| -> Result<i64> {
            parse_ascii_int(fields[idx]).ok_or(CoreError::MalformedRecord {
                record_number,
                reason: "invalid integer field",
            })
        };
        let parse_u64 = |idx: usize| -> Result<u64> {
            parse_ascii_uint(fields[idx]).ok_or(CoreError::MalformedRecord {
                record_number,
                reason: "invalid unsigned integer field",
            })
        };

        let size = parse_i64(0)?;
        let uid = u32::try_from(parse_u64(1)?).map_err(|_| CoreError::MalformedRecord {
            record_number,
            reason: "uid out of range",
        })?;
        let gid = u32::try_from(parse_u64(2)?).map_err(|_| CoreError::MalformedRecord {
            record_number,
            reason: "gid out of range",
        })?;
        let atime = parse_i64(3)?;
        let mtime = parse_i64(4)?;
        let ctime = parse_i64(5)?;
        let entry_type = fields[6]
            .first()
            .filter(|_| fields[6].len() == 1)
            .and_then(|&b| EntryType::from_byte(b))
            .ok_or(CoreError::MalformedRecord {
                record_number,
                reason: "unrecognised entry type byte",
            })?;
        let inode = parse_u64(7)?;
        let hardlink_count = parse_optional_uint(fields[8]);
        let block_count = parse_optional_int(fields[9]);
        let apparent_size = parse_optional_int(fields[10]);

        Ok(Some(Record {
            path: &self.path,
            size,
            uid,
            gid,
            atime,
            mtime,
            ctime,
            entry_type,
            inode,
            apparent_size,
            hardlink_count,
            block_count,
        }))
    }
}

fn io_error_reason(_e: std::io::Error) -> &'static str {
    "i/o error reading stream"
}

/// Reads one line (without the trailing `\n`) into `buf`, returning the
/// number of bytes consumed from the underlying reader (0 at EOF).
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize> {
    let n = reader.read_until(b'\n', buf)?;
    if n > 0 && buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(n)
}

/// Splits a line into its leading double-quoted path field and the
/// remaining TAB-separated fields (the TAB right after the closing quote
/// is consumed). Returns the quoted field *without* its surrounding quotes.
fn split_quoted_path(line: &[u8]) -> Option<(&[u8], &[u8])> {
    if line.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    while i < line.len() {
        match line[i] {
            b'\\' => i += 2,
            b'"' => {
                let inner = &line[1..i];
                let after = i + 1;
                if after >= line.len() || line[after] != b'\t' {
                    return None;
                }
                return Some((inner, &line[after + 1..]));
            }
            _ => i += 1,
        }
    }
    None
}

/// Decodes `\"` and `\\` escapes from a quoted path field into `out`.
fn unescape_into(field: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let mut i = 0;
    while i < field.len() {
        match field[i] {
            b'\\' => {
                let next = *field.get(i + 1)?;
                match next {
                    b'"' | b'\\' => {
                        out.push(next);
                        i += 2;
                    }
                    _ => return None,
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Some(())
}

fn parse_ascii_int(field: &[u8]) -> Option<i64> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

fn parse_ascii_uint(field: &[u8]) -> Option<u64> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

fn parse_optional_int(field: &[u8]) -> Option<i64> {
    if field.is_empty() {
        None
    } else {
        parse_ascii_int(field)
    }
}

fn parse_optional_uint(field: &[u8]) -> Option<u64> {
    if field.is_empty() {
        None
    } else {
        parse_ascii_uint(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parser_for(data: &str) -> RecordParser<Cursor<Vec<u8>>> {
        RecordParser::new(Cursor::new(data.as_bytes().to_vec()))
    }

    #[test]
    fn parses_a_well_formed_directory_record() {
        let mut p = parser_for("\"/a/\"\t4096\t1\t1\t100\t200\t300\td\t7\t1\t8\t4096\n");
        let r = p.scan().unwrap().unwrap();
        assert_eq!(r.path, b"/a/");
        assert_eq!(r.size, 4096);
        assert_eq!(r.uid, 1);
        assert_eq!(r.entry_type, EntryType::Directory);
        assert_eq!(r.inode, 7);
        assert_eq!(r.hardlink_count, Some(1));
        assert_eq!(r.block_count, Some(8));
        assert_eq!(r.apparent_size, Some(4096));
        assert!(p.scan().unwrap().is_none());
    }

    #[test]
    fn unescapes_quotes_and_backslashes_in_path() {
        let mut p = parser_for("\"/a/b\\\"c\\\\d\"\t1\t0\t0\t0\t0\t0\tf\t1\t1\t0\t1\n");
        let r = p.scan().unwrap().unwrap();
        assert_eq!(r.path, b"/a/b\"c\\d");
    }

    #[test]
    fn rejects_unquoted_path() {
        let mut p = parser_for("/a/\t1\t0\t0\t0\t0\t0\tf\t1\t1\t0\t1\n");
        assert!(matches!(
            p.scan(),
            Err(CoreError::MalformedRecord { reason: "path is not a quoted field", .. })
        ));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let mut p = parser_for("\"/a\"\t1\t0\t0\n");
        assert!(matches!(
            p.scan(),
            Err(CoreError::MalformedRecord { reason: "wrong field count", .. })
        ));
    }

    #[test]
    fn rejects_bad_entry_type() {
        let mut p = parser_for("\"/a\"\t1\t0\t0\t0\t0\t0\tz\t1\t1\t0\t1\n");
        assert!(matches!(
            p.scan(),
            Err(CoreError::MalformedRecord {
                reason: "unrecognised entry type byte",
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_line() {
        let mut p = parser_for("\n");
        assert!(matches!(
            p.scan(),
            Err(CoreError::MalformedRecord { reason: "empty line", .. })
        ));
    }

    #[test]
    fn accepts_negative_size_and_times() {
        let mut p = parser_for("\"/a\"\t-1\t0\t0\t-5\t-6\t-7\tf\t1\t1\t0\t1\n");
        let r = p.scan().unwrap().unwrap();
        assert_eq!(r.size, -1);
        assert_eq!(r.atime, -5);
    }
}
