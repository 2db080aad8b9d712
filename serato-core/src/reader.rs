//! Bounds-checked cursor over an immutable byte slice
//!
//! Every read either returns the requested bytes and advances, or returns
//! `None` and leaves the cursor where it was. Nothing here can panic on
//! short input.

#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Take exactly `n` bytes
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.remaining() {
            return None;
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(bytes)
    }

    pub fn read_u32_be(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read up to the next NUL byte and consume the terminator.
    ///
    /// A missing terminator consumes the rest of the buffer and reports
    /// `terminated: false`; at end of buffer this yields an empty string.
    pub fn read_cstr(&mut self) -> CStr<'a> {
        let rest = self.rest();
        match rest.iter().position(|&b| b == 0) {
            Some(nul) => {
                self.pos += nul + 1;
                CStr { bytes: &rest[..nul], terminated: true }
            }
            None => {
                self.pos = self.data.len();
                CStr { bytes: rest, terminated: false }
            }
        }
    }

    /// Skip any run of NUL bytes at the cursor
    pub fn skip_nuls(&mut self) {
        while self.rest().first() == Some(&0) {
            self.pos += 1;
        }
    }

    /// Move the cursor just past the next occurrence of `pattern`.
    ///
    /// Returns the offset the pattern started at, or `None` (cursor
    /// unchanged) if it does not occur again.
    pub fn seek_past(&mut self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() {
            return None;
        }
        let found = self
            .rest()
            .windows(pattern.len())
            .position(|window| window == pattern)?;
        let start = self.pos + found;
        self.pos = start + pattern.len();
        Some(start)
    }
}

/// A NUL-terminated field read by [`ByteReader::read_cstr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CStr<'a> {
    pub bytes: &'a [u8],
    pub terminated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cstr_sequence() {
        let mut reader = ByteReader::new(b"CUE\0\0tail");
        assert_eq!(reader.read_cstr(), CStr { bytes: b"CUE", terminated: true });
        assert_eq!(reader.read_cstr(), CStr { bytes: b"", terminated: true });
        assert_eq!(reader.read_cstr(), CStr { bytes: b"tail", terminated: false });
        assert!(reader.is_empty());
        assert_eq!(reader.read_cstr().bytes, b"");
    }

    #[test]
    fn test_short_reads_leave_cursor() {
        let mut reader = ByteReader::new(&[0x00, 0x00, 0x01]);
        assert_eq!(reader.read_u32_be(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.take(3), Some(&[0x00, 0x00, 0x01][..]));
        assert_eq!(reader.take(1), None);
    }

    #[test]
    fn test_read_u32_be() {
        let mut reader = ByteReader::new(&[0x00, 0x00, 0x01, 0x02, 0xFF]);
        assert_eq!(reader.read_u32_be(), Some(0x0102));
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_seek_past() {
        let mut reader = ByteReader::new(b"xxptrkAAptrkB");
        assert_eq!(reader.seek_past(b"ptrk"), Some(2));
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.seek_past(b"ptrk"), Some(8));
        assert_eq!(reader.rest(), b"B");
        assert_eq!(reader.seek_past(b"ptrk"), None);
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn test_skip_nuls() {
        let mut reader = ByteReader::new(&[0, 0, 0, 7]);
        reader.skip_nuls();
        assert_eq!(reader.rest(), &[7]);
    }
}
