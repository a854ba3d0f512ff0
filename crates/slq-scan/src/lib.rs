//! Reverse, chunked line reader for append-only log files.
//!
//! Completion logs grow at the end, and queries want the newest
//! entries, so the file is read back-to-front in fixed-size byte
//! chunks without ever loading it whole. Lines that straddle a chunk
//! boundary are reassembled before they are yielded.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

/// Default read granularity, in bytes.
pub const DEFAULT_CHUNK_SIZE: u64 = 8192;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: Utf8PathBuf,
        source: io::Error,
    },
}

/// Iterator over a file's lines from last to first.
///
/// Each chunk is split on `\n`; the partial fragment at a chunk's
/// start boundary is carried over and prefixed onto the fragment
/// recovered from the next (earlier) chunk, so every line is yielded
/// complete, exactly once, newest first. Empty lines are skipped.
///
/// Mid-scan read failures surface as an `Err` item and end the
/// iteration.
#[derive(Debug)]
pub struct ReverseLines {
    file: File,
    /// Bytes of the file not yet read, counted from the start.
    remaining: u64,
    chunk_size: u64,
    /// Complete lines from the current chunk, in file order; popped
    /// from the back to yield newest first.
    pending: Vec<String>,
    /// Partial line at the start boundary of the last chunk read.
    carry: Option<Vec<u8>>,
}

impl ReverseLines {
    /// Open `path` for reverse scanning with the default chunk size.
    pub fn open(path: &Utf8Path) -> Result<Self, ScanError> {
        Self::with_chunk_size(path, DEFAULT_CHUNK_SIZE)
    }

    /// Open `path` for reverse scanning, reading `chunk_size` bytes at
    /// a time.
    pub fn with_chunk_size(path: &Utf8Path, chunk_size: u64) -> Result<Self, ScanError> {
        let map_err = |source| ScanError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(map_err)?;
        let remaining = file.metadata().map_err(map_err)?.len();
        Ok(Self {
            file,
            remaining,
            chunk_size: chunk_size.max(1),
            pending: Vec::new(),
            carry: None,
        })
    }

    /// Read the next-earlier chunk and split it into lines.
    fn fill(&mut self) -> io::Result<()> {
        let read_size = self.chunk_size.min(self.remaining);
        let offset = self.remaining - read_size;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; read_size as usize];
        self.file.read_exact(&mut buf)?;
        self.remaining = offset;

        // A line cut at this chunk's end continues into the carry from
        // the previously read (later) chunk.
        if let Some(carry) = self.carry.take() {
            buf.extend_from_slice(&carry);
        }

        let mut segments = buf.split(|&b| b == b'\n');
        // The first segment may itself be cut at the chunk's start
        // boundary; hold it until the earlier chunk (or start of file)
        // resolves it.
        self.carry = segments.next().map(|s| s.to_vec());
        for segment in segments {
            if !segment.is_empty() {
                self.pending
                    .push(String::from_utf8_lossy(segment).into_owned());
            }
        }
        Ok(())
    }
}

impl Iterator for ReverseLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop() {
                return Some(Ok(line));
            }
            if self.remaining == 0 {
                // Whatever is still carried is the first physical line.
                let first = self.carry.take()?;
                if first.is_empty() {
                    return None;
                }
                return Some(Ok(String::from_utf8_lossy(&first).into_owned()));
            }
            if let Err(e) = self.fill() {
                self.remaining = 0;
                self.pending.clear();
                self.carry = None;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn scan(content: &str, chunk_size: u64) -> Vec<String> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let path = Utf8Path::from_path(file.path()).unwrap();
        ReverseLines::with_chunk_size(path, chunk_size)
            .unwrap()
            .map(|line| line.unwrap())
            .collect()
    }

    #[test]
    fn test_reverse_order() {
        let lines = scan("one\ntwo\nthree\n", DEFAULT_CHUNK_SIZE);
        assert_eq!(lines, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let lines = scan("one\ntwo\nthree", DEFAULT_CHUNK_SIZE);
        assert_eq!(lines, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_chunk_boundaries_reassemble_lines() {
        let content = "first line\nsecond line\nthird line\n";
        let expected = vec!["third line", "second line", "first line"];
        // Chunk sizes smaller than, equal to, and larger than the file,
        // including sizes that cut every line mid-way.
        for chunk_size in [1, 2, 3, 5, 7, 11, content.len() as u64, 1 << 20] {
            assert_eq!(scan(content, chunk_size), expected, "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn test_reassembly_reproduces_file() {
        let content: String = (0..100).map(|i| format!("line number {i}\n")).collect();
        for chunk_size in [3, 64, 4096] {
            let mut lines = scan(&content, chunk_size);
            lines.reverse();
            let rebuilt: String = lines.iter().map(|l| format!("{l}\n")).collect();
            assert_eq!(rebuilt, content, "chunk_size={chunk_size}");
        }
    }

    #[test]
    fn test_line_longer_than_chunk() {
        let long = "x".repeat(100);
        let content = format!("{long}\nshort\n");
        let lines = scan(&content, 8);
        assert_eq!(lines, vec!["short".to_string(), long]);
    }

    #[test]
    fn test_empty_file() {
        assert!(scan("", DEFAULT_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let lines = scan("one\n\ntwo\n\n", 4);
        assert_eq!(lines, vec!["two", "one"]);
    }

    #[test]
    fn test_open_missing_file() {
        let err = ReverseLines::open(Utf8Path::new("/no/such/slurm.job.log")).unwrap_err();
        assert!(matches!(err, ScanError::Open { .. }));
    }
}
