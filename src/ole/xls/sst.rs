//! Shared string table (SST) with CONTINUE handling.
//!
//! An SST longer than one record spills into CONTINUE records. A string may
//! be split across the boundary; the continuation then starts with a fresh
//! option byte that can switch between 8-bit and 16-bit characters.

use crate::common::{Error, Result};
use crate::ole::codepage::Codepage;
use crate::ole::xls::records::SST;
use crate::sheet::SharedStringSource;

/// Cursor over the SST payload and its CONTINUE payloads.
struct ChunkReader<'a> {
    chunks: &'a [&'a [u8]],
    chunk: usize,
    offset: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(chunks: &'a [&'a [u8]]) -> Self {
        Self {
            chunks,
            chunk: 0,
            offset: 0,
        }
    }

    fn truncated() -> Error {
        Error::InvalidRecord {
            record_type: SST,
            message: "shared string table ends mid-string".to_string(),
        }
    }

    /// Skip exhausted chunks; fails when none is left.
    fn current(&mut self) -> Result<&'a [u8]> {
        while let Some(chunk) = self.chunks.get(self.chunk) {
            if self.offset < chunk.len() {
                return Ok(chunk);
            }
            self.chunk += 1;
            self.offset = 0;
        }
        Err(Self::truncated())
    }

    fn read_u8(&mut self) -> Result<u8> {
        let chunk = self.current()?;
        let byte = chunk[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes([self.read_u8()?, self.read_u8()?]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    fn skip(&mut self, mut len: usize) -> Result<()> {
        while len > 0 {
            let chunk = self.current()?;
            let take = (chunk.len() - self.offset).min(len);
            self.offset += take;
            len -= take;
        }
        Ok(())
    }

    fn read_chars(&mut self, mut remaining: usize, mut wide: bool, codepage: &Codepage) -> Result<String> {
        let mut text = String::with_capacity(remaining);
        while remaining > 0 {
            let at_boundary = self.offset >= self.chunks.get(self.chunk).map_or(0, |c| c.len());
            let mut chunk = self.current()?;
            if at_boundary {
                // Continuation re-declares the character width.
                wide = self.read_u8()? & 0x01 != 0;
                chunk = self.current()?;
            }
            let width = if wide { 2 } else { 1 };
            let here = ((chunk.len() - self.offset) / width).min(remaining);
            if here == 0 {
                return Err(Self::truncated());
            }
            let bytes = &chunk[self.offset..self.offset + here * width];
            if wide {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                text.push_str(&String::from_utf16_lossy(&units));
            } else {
                text.push_str(&codepage.decode(bytes));
            }
            self.offset += here * width;
            remaining -= here;
        }
        Ok(text)
    }
}

/// The workbook's shared strings, in SST order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    /// Parse an SST payload followed by its CONTINUE payloads.
    pub fn parse(chunks: &[&[u8]], codepage: &Codepage) -> Result<Self> {
        let mut reader = ChunkReader::new(chunks);
        let _total = reader.read_u32()?;
        let unique = reader.read_u32()? as usize;
        let available: usize = chunks.iter().map(|chunk| chunk.len()).sum();
        // Every entry takes at least three bytes.
        let mut strings = Vec::with_capacity(unique.min(available / 3));

        for _ in 0..unique {
            let char_count = usize::from(reader.read_u16()?);
            let option = reader.read_u8()?;
            let runs = if option & 0x08 != 0 {
                usize::from(reader.read_u16()?)
            } else {
                0
            };
            let phonetic = if option & 0x04 != 0 {
                reader.read_u32()? as usize
            } else {
                0
            };
            let text = reader.read_chars(char_count, option & 0x01 != 0, codepage)?;
            reader.skip(runs * 4 + phonetic)?;
            strings.push(text);
        }
        log::debug!("shared string table holds {} strings", strings.len());
        Ok(Self { strings })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }
}

impl SharedStringSource for SharedStringTable {
    fn resolve_shared_string(&self, index: usize) -> Option<&str> {
        self.get(index)
    }

    fn shared_string_count(&self) -> usize {
        self.len()
    }
}
