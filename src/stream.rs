//! Byte source consumed by the readers.

use std::{
    cell::RefCell,
    io::{self, BufRead},
    rc::Rc,
};

use bytes::Bytes;

/// Blocking byte source with short-read semantics.
///
/// Implementations must not assume a request is satisfied in one call:
/// `read_some` may return fewer bytes than asked for, and an empty result
/// always means end of stream.
pub trait ByteStream {
    /// Reads at most `max` bytes.
    fn read_some(&mut self, max: usize) -> io::Result<Bytes>;

    /// Reads one line, including its trailing `\n` when present.
    fn readline(&mut self) -> io::Result<Bytes>;
}

impl<R: BufRead> ByteStream for R {
    fn read_some(&mut self, max: usize) -> io::Result<Bytes> {
        if max == 0 {
            return Ok(Bytes::new());
        }

        loop {
            let available = match self.fill_buf() {
                Ok(available) => available,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };

            let len = available.len().min(max);
            let chunk = Bytes::copy_from_slice(&available[..len]);
            self.consume(len);
            return Ok(chunk);
        }
    }

    fn readline(&mut self) -> io::Result<Bytes> {
        let mut line = Vec::new();
        self.read_until(b'\n', &mut line)?;
        Ok(Bytes::from(line))
    }
}

/// Stream handle shared by every reader of one multipart body.
///
/// Only the innermost live reader consumes from it at any time; the
/// `MultipartReader` state machine releases a stale child before creating
/// the next one, so the cell is never borrowed twice.
pub type SharedStream<S> = Rc<RefCell<S>>;

/// Wraps a byte stream into a [`SharedStream`].
pub fn shared<S>(stream: S) -> SharedStream<S> {
    Rc::new(RefCell::new(stream))
}
