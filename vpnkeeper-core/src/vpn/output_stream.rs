//! Line-oriented view of the engine's combined stdout and stderr
//!
//! The engine writes its log to both streams. They share the write end of a
//! single pipe, so lines come out of [`EngineOutput`] in exactly the order
//! the engine wrote them.

use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::unix::pipe;

/// Reads newline-terminated lines, tolerating invalid UTF-8
///
/// Partially read bytes stay in the internal buffer, so a pending
/// [`LineReader::next_line`] can be dropped (e.g. by `tokio::select!`)
/// without losing data.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buffer: Vec::with_capacity(512),
        }
    }

    /// Read the next line without its terminator
    ///
    /// Returns `Ok(None)` at end of stream. A final line without a trailing
    /// newline is still returned.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
        if read == 0 && self.buffer.is_empty() {
            return Ok(None);
        }

        let mut end = self.buffer.len();
        if self.buffer[..end].ends_with(b"\n") {
            end -= 1;
        }
        if self.buffer[..end].ends_with(b"\r") {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
        self.buffer.clear();
        Ok(Some(line))
    }
}

/// Read end of the pipe carrying the engine's stdout and stderr
pub type EngineOutput = LineReader<pipe::Receiver>;

/// Handles to give a child as its stdout and stderr, plus the merged reader
///
/// The write end stays open for as long as any `Stdio` handle (or the
/// `Command` holding it) is alive, so the caller must drop those after
/// spawning to see end of input when the child exits.
pub fn merged_output() -> io::Result<(Stdio, Stdio, EngineOutput)> {
    let (writer, reader) = pipe::pipe()?;
    let stdout = writer.into_blocking_fd()?;
    let stderr = stdout.try_clone()?;
    Ok((
        Stdio::from(stdout),
        Stdio::from(stderr),
        LineReader::new(reader),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_reader_strips_terminators() {
        let input: &[u8] = b"first\r\nsecond\nlast";
        let mut reader = LineReader::new(input);

        tokio_test::block_on(async {
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("first"));
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("second"));
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("last"));
            assert_eq!(reader.next_line().await.unwrap(), None);
        });
    }

    #[test]
    fn test_line_reader_keeps_empty_lines() {
        let input: &[u8] = b"\n\nx\n";
        let mut reader = LineReader::new(input);

        tokio_test::block_on(async {
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some(""));
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some(""));
            assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("x"));
            assert_eq!(reader.next_line().await.unwrap(), None);
        });
    }

    #[test]
    fn test_line_reader_replaces_invalid_utf8() {
        let input: &[u8] = b"bad \xff byte\n";
        let mut reader = LineReader::new(input);

        tokio_test::block_on(async {
            assert_eq!(
                reader.next_line().await.unwrap().as_deref(),
                Some("bad \u{fffd} byte")
            );
        });
    }

    #[tokio::test]
    async fn test_merged_output_keeps_write_order() {
        let (stdout, stderr, mut output) = merged_output().unwrap();
        let mut cmd = tokio::process::Command::new("/bin/sh");
        cmd.arg("-c")
            .arg("echo a; echo b >&2; echo c; echo d >&2; echo e")
            .stdout(stdout)
            .stderr(stderr);
        let mut child = cmd.spawn().unwrap();
        drop(cmd);

        let mut lines = Vec::new();
        while let Some(line) = output.next_line().await.unwrap() {
            lines.push(line);
        }

        assert_eq!(lines, vec!["a", "b", "c", "d", "e"]);
        assert!(child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_merged_output_ends_when_writers_are_dropped() {
        let (stdout, stderr, mut output) = merged_output().unwrap();
        drop(stdout);
        drop(stderr);

        assert_eq!(output.next_line().await.unwrap(), None);
    }
}
