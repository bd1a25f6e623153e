//! Incremental Annex-B start code scanner

use crate::NalError;
use std::io::{ErrorKind, Read};

const READ_CHUNK: usize = 64 * 1024;

/// One NAL unit exactly as it appears in the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// Absolute offset of the first prefix byte
    pub offset: u64,
    /// Everything before the NAL header: leading zeros, stray bytes, start code
    pub prefix: Vec<u8>,
    /// NAL header byte
    pub header: u8,
    /// Escaped payload up to the next start code (or end of stream)
    pub ebsp: Vec<u8>,
}

/// Position of the next `00 00 01` at or after `from`
#[must_use]
pub fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    if data.len() < 3 || from > data.len() - 3 {
        return None;
    }
    data[from..]
        .windows(3)
        .position(|w| w == [0x00, 0x00, 0x01])
        .map(|pos| from + pos)
}

/// Splits an Annex-B byte stream into [`RawUnit`]s
///
/// Zero bytes right before a start code are attributed to the next unit's
/// prefix, so concatenating every unit's prefix, header and payload
/// reproduces the input byte for byte.
pub struct AnnexBReader<R> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    consumed: u64,
    eof: bool,
}

impl<R: Read> AnnexBReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            start: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Read the next unit; `Ok(None)` at a clean end of stream
    pub fn next_unit(&mut self) -> Result<Option<RawUnit>, NalError> {
        self.compact();

        let start_code = loop {
            if let Some(pos) = find_start_code(&self.buf, 0) {
                break pos;
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(NalError::MissingStartCode {
                    offset: self.consumed,
                });
            }
            self.fill()?;
        };

        let header_pos = start_code + 3;
        while header_pos >= self.buf.len() {
            if self.eof {
                return Err(NalError::TruncatedUnit {
                    offset: self.consumed + start_code as u64,
                });
            }
            self.fill()?;
        }

        let header = self.buf[header_pos];
        if header & 0x80 != 0 {
            return Err(NalError::ForbiddenBit {
                offset: self.consumed + header_pos as u64,
            });
        }

        let body_start = header_pos + 1;
        let mut search_from = body_start;
        let body_end = loop {
            if let Some(next) = find_start_code(&self.buf, search_from) {
                let mut end = next;
                while end > body_start && self.buf[end - 1] == 0 {
                    end -= 1;
                }
                break end;
            }
            if self.eof {
                break self.buf.len();
            }
            search_from = self.buf.len().saturating_sub(2).max(body_start);
            self.fill()?;
        };

        let unit = RawUnit {
            offset: self.consumed,
            prefix: self.buf[..header_pos].to_vec(),
            header,
            ebsp: self.buf[body_start..body_end].to_vec(),
        };
        self.start = body_end;
        Ok(Some(unit))
    }

    /// Drop bytes already handed out as units
    fn compact(&mut self) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.consumed += self.start as u64;
            self.start = 0;
        }
    }

    fn fill(&mut self) -> Result<(), NalError> {
        let old_len = self.buf.len();
        self.buf.resize(old_len + READ_CHUNK, 0);
        loop {
            match self.inner.read(&mut self.buf[old_len..]) {
                Ok(n) => {
                    self.buf.truncate(old_len + n);
                    if n == 0 {
                        self.eof = true;
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(old_len);
                    return Err(NalError::Io(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(data: &[u8]) -> Result<Vec<RawUnit>, NalError> {
        let mut reader = AnnexBReader::new(Cursor::new(data.to_vec()));
        let mut units = Vec::new();
        while let Some(unit) = reader.next_unit()? {
            units.push(unit);
        }
        Ok(units)
    }

    #[test]
    fn test_find_start_code() {
        assert_eq!(find_start_code(&[0, 0, 1], 0), Some(0));
        assert_eq!(find_start_code(&[9, 0, 0, 0, 1, 7], 0), Some(2));
        assert_eq!(find_start_code(&[0, 0, 1, 5, 0, 0, 1], 1), Some(4));
        assert_eq!(find_start_code(&[0, 0], 0), None);
        assert_eq!(find_start_code(&[0, 0, 1], 1), None);
    }

    #[test]
    fn test_splits_three_and_four_byte_start_codes() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1f, // SPS, 4-byte start code
            0x00, 0x00, 0x01, 0x68, 0xce, // PPS, 3-byte start code
            0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, // IDR
        ];
        let units = read_all(&data).unwrap();

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].prefix, vec![0, 0, 0, 1]);
        assert_eq!(units[0].header, 0x67);
        assert_eq!(units[0].ebsp, vec![0x42, 0x00, 0x1f]);
        assert_eq!(units[1].prefix, vec![0, 0, 1]);
        assert_eq!(units[1].ebsp, vec![0xce]);
        assert_eq!(units[2].prefix, vec![0, 0, 0, 1]);
        assert_eq!(units[2].header & 0x1f, 5);
        assert_eq!(units[2].ebsp, vec![0x88, 0x84]);
        assert_eq!(units[2].offset, 13);

        let rebuilt: Vec<u8> = units
            .iter()
            .flat_map(|u| {
                let mut bytes = u.prefix.clone();
                bytes.push(u.header);
                bytes.extend_from_slice(&u.ebsp);
                bytes
            })
            .collect();
        assert_eq!(rebuilt, data.to_vec());
    }

    #[test]
    fn test_empty_stream_has_no_units() {
        assert!(read_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_without_start_code_is_an_error() {
        let err = read_all(&[0x12, 0x34, 0x56, 0x78]).unwrap_err();
        assert!(matches!(err, NalError::MissingStartCode { offset: 0 }));
    }

    #[test]
    fn test_start_code_without_header_is_truncated() {
        let err = read_all(&[0x00, 0x00, 0x01, 0x09, 0x10, 0x00, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, NalError::TruncatedUnit { .. }));
    }

    #[test]
    fn test_forbidden_bit_is_an_error() {
        let err = read_all(&[0x00, 0x00, 0x01, 0xe5, 0x01]).unwrap_err();
        assert!(matches!(err, NalError::ForbiddenBit { offset: 3 }));
    }

    #[test]
    fn test_units_spanning_read_chunks() {
        let mut data = vec![0x00, 0x00, 0x00, 0x01, 0x65];
        data.extend(std::iter::repeat(0xab).take(READ_CHUNK * 2 + 17));
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x41, 0x9a]);

        let units = read_all(&data).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].ebsp.len(), READ_CHUNK * 2 + 17);
        assert_eq!(units[1].header, 0x41);
        assert_eq!(units[1].ebsp, vec![0x9a]);
    }
}
