//! TFRecord framing, the container format of TensorBoard event files.
//!
//! ```text
//! u64 length | u32 masked_crc32c(length) | data[length] | u32 masked_crc32c(data)
//! ```
//!
//! All integers are little endian.

use byteorder::{LittleEndian, ReadBytesExt};
use crate::errors::*;
use std::convert::TryFrom;
use std::io::{self, Read};

const CASTAGNOLI: u32 = 0x82f6_3b78;
const MASK_DELTA: u32 = 0xa282_ead8;
const HEADER_LEN: usize = 12;
/// Larger lengths are rejected without reading.
const MAX_RECORD_LEN: usize = 1 << 30;

fn crc32c(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ CASTAGNOLI } else { crc >> 1 };
        }
    }
    !crc
}

/// Checksum as stored in the record stream.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Fills `buf` as far as the reader allows; returns the number of bytes read.
fn read_full<R: Read>(rdr: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match rdr.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads records one by one. A record cut short at the end of the stream (the
/// writer may still be running) ends the stream instead of failing it.
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> RecordReader<R> {
    /// Wraps a reader positioned at the start of a record stream.
    pub fn new(inner: R) -> Self {
        RecordReader {
            inner: inner,
            offset: 0,
        }
    }

    /// Returns the next record's payload, or `None` at the end of the stream.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_LEN];
        let n = read_full(&mut self.inner, &mut header)?;
        if n == 0 {
            return Ok(None);
        } else if n < HEADER_LEN {
            warn!("truncated record header at byte {}", self.offset);
            return Ok(None);
        }

        let len = (&header[..8]).read_u64::<LittleEndian>()?;
        let len_crc = (&header[8..]).read_u32::<LittleEndian>()?;
        if masked_crc32c(&header[..8]) != len_crc {
            bail!(ErrorKind::CorruptRecord(self.offset, "length checksum mismatch"));
        }

        let len = match usize::try_from(len) {
            Ok(len) if len <= MAX_RECORD_LEN => len,
            _ => bail!(ErrorKind::CorruptRecord(self.offset, "record length out of range")),
        };

        // payload followed by its checksum; the buffer only grows with the
        // bytes actually present
        let mut data = Vec::new();
        (&mut self.inner).take(len as u64 + 4).read_to_end(&mut data)?;
        if data.len() < len + 4 {
            warn!("truncated record payload at byte {}", self.offset);
            return Ok(None);
        }
        let data_crc = (&data[len..]).read_u32::<LittleEndian>()?;
        data.truncate(len);
        if masked_crc32c(&data) != data_crc {
            bail!(ErrorKind::CorruptRecord(self.offset, "payload checksum mismatch"));
        }

        self.offset += (HEADER_LEN + data.len() + 4) as u64;
        Ok(Some(data))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Frames `data` as one record. Only the tests write event files.
#[cfg(test)]
pub fn write_record<W: ::std::io::Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    use byteorder::WriteBytesExt;
    let mut len = Vec::with_capacity(8);
    len.write_u64::<LittleEndian>(data.len() as u64)?;
    w.write_all(&len)?;
    w.write_u32::<LittleEndian>(masked_crc32c(&len))?;
    w.write_all(data)?;
    w.write_u32::<LittleEndian>(masked_crc32c(data))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
        assert_eq!(crc32c(b""), 0);
    }

    #[test]
    fn reads_records_in_order() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"first").unwrap();
        write_record(&mut buf, b"").unwrap();
        write_record(&mut buf, b"third").unwrap();

        let records = RecordReader::new(&buf[..]).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records, vec![b"first".to_vec(), Vec::new(), b"third".to_vec()]);
    }

    #[test]
    fn truncated_tail_ends_stream() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"complete").unwrap();
        write_record(&mut buf, b"partial").unwrap();
        let cut = buf.len() - 3;
        buf.truncate(cut);

        let records = RecordReader::new(&buf[..]).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records, vec![b"complete".to_vec()]);
    }

    fn header(len: u64) -> Vec<u8> {
        use byteorder::WriteBytesExt;
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(len).unwrap();
        let crc = masked_crc32c(&buf);
        buf.write_u32::<LittleEndian>(crc).unwrap();
        buf
    }

    #[test]
    fn oversized_length_is_rejected() {
        for &len in &[u64::max_value(), u64::max_value() - 2, 1 << 40] {
            let mut buf = header(len);
            buf.extend_from_slice(b"short");
            match RecordReader::new(&buf[..]).read_record() {
                Err(Error(ErrorKind::CorruptRecord(offset, _), _)) => assert_eq!(offset, 0),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn length_beyond_stream_is_a_truncated_tail() {
        let mut buf = header(1 << 20);
        buf.extend_from_slice(b"short");
        assert_eq!(RecordReader::new(&buf[..]).read_record().unwrap(), None);
    }

    #[test]
    fn corrupted_payload_is_rejected() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"payload").unwrap();
        buf[HEADER_LEN] ^= 0xff;

        let mut reader = RecordReader::new(&buf[..]);
        match reader.read_record() {
            Err(Error(ErrorKind::CorruptRecord(offset, _), _)) => assert_eq!(offset, 0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
