use std::io;

use bitstream_io::{BigEndian, BitRead2, BitReader, BitWrite2, BitWriter};
use num::ToPrimitive;

use crate::errors::RtpResult;

/// Bit widths of the AU header fields. The defaults match the AAC high
/// bit rate mode: a 13 bit size and a 3 bit index.
#[derive(Debug, Clone, Copy)]
pub struct AuConfig {
    pub size_length: u64,
    pub index_length: u64,
    pub index_delta_length: u64,
}

impl Default for AuConfig {
    fn default() -> Self {
        Self {
            size_length: 13,
            index_length: 3,
            index_delta_length: 3,
        }
    }
}

impl AuConfig {
    pub fn max_au_size(&self) -> u64 {
        (1 << self.size_length) - 1
    }

    fn header_bits(&self, is_first: bool) -> u64 {
        self.size_length
            + if is_first {
                self.index_length
            } else {
                self.index_delta_length
            }
    }
}

/// One AU header: the byte size of an access unit plus its serial number
/// field (index on the first header, index delta on the rest).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuHeader {
    pub au_size: u64,
    pub au_index: u64,
}

/// @see: RFC 3640 3.2.1
/// ```text
/// +---------+-----------+-----------+-----------+
/// |AU-headers-length|AU-header|(1)| .. |AU-header|(n)|padding|
/// +---------+-----------+-----------+-----------+
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuHeaderSection {
    pub au_headers: Vec<AuHeader>,
}

impl AuHeaderSection {
    pub fn single(au_size: u64) -> Self {
        Self {
            au_headers: vec![AuHeader {
                au_size,
                au_index: 0,
            }],
        }
    }

    pub fn read_from<R: io::Read>(reader: R, config: &AuConfig) -> RtpResult<Self> {
        let mut reader = BitReader::endian(reader, BigEndian);
        let au_headers_length = reader.read_in::<16, u64>()?;
        let mut au_headers = Vec::new();
        let mut bits_read: u64 = 0;
        let mut is_first = true;
        while bits_read < au_headers_length {
            let au_size = BitRead2::read(
                &mut reader,
                config.size_length.to_u32().expect("integer overflow u32"),
            )?;
            let index_bits = if is_first {
                config.index_length
            } else {
                config.index_delta_length
            };
            let au_index = BitRead2::read(
                &mut reader,
                index_bits.to_u32().expect("integer overflow u32"),
            )?;
            au_headers.push(AuHeader { au_size, au_index });
            bits_read += config.header_bits(is_first);
            is_first = false;
        }
        BitRead2::byte_align(&mut reader);
        Ok(Self { au_headers })
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W, config: &AuConfig) -> RtpResult<()> {
        let au_headers_length: u64 = self
            .au_headers
            .iter()
            .enumerate()
            .map(|(position, _)| config.header_bits(position == 0))
            .sum();

        let mut writer = BitWriter::endian(writer, BigEndian);
        writer.write_out::<16, u64>(au_headers_length)?;
        for (position, header) in self.au_headers.iter().enumerate() {
            BitWrite2::write(
                &mut writer,
                config.size_length.to_u32().expect("integer overflow u32"),
                header.au_size,
            )?;
            let index_bits = if position == 0 {
                config.index_length
            } else {
                config.index_delta_length
            };
            BitWrite2::write(
                &mut writer,
                index_bits.to_u32().expect("integer overflow u32"),
                header.au_index,
            )?;
        }
        writer.byte_align()?;
        Ok(())
    }

    /// Bytes this section occupies on the wire, padding included.
    pub fn bytes_count(&self, config: &AuConfig) -> usize {
        let bits: u64 = self
            .au_headers
            .iter()
            .enumerate()
            .map(|(position, _)| config.header_bits(position == 0))
            .sum();
        2 + (bits as usize).div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_single_header() {
        let section = AuHeaderSection::single(100);
        let mut bytes = Vec::new();
        section
            .write_to(&mut bytes, &AuConfig::default())
            .unwrap();
        assert_eq!(bytes, vec![0x00, 0x10, 0x03, 0x20]);
        assert_eq!(section.bytes_count(&AuConfig::default()), 4);
    }

    #[test]
    fn test_round_trip_two_headers() {
        let section = AuHeaderSection {
            au_headers: vec![
                AuHeader {
                    au_size: 5,
                    au_index: 0,
                },
                AuHeader {
                    au_size: 7,
                    au_index: 0,
                },
            ],
        };
        let config = AuConfig::default();
        let mut bytes = Vec::new();
        section.write_to(&mut bytes, &config).unwrap();
        assert_eq!(bytes, vec![0x00, 0x20, 0x00, 0x28, 0x00, 0x38]);

        let parsed = AuHeaderSection::read_from(io::Cursor::new(&bytes), &config).unwrap();
        assert_eq!(parsed, section);
    }

    #[test]
    fn test_read_aligns_to_byte() {
        // three 16 bit headers make 48 bits, already byte aligned; one
        // header of an 11/2/2 layout needs 3 bits of padding instead
        let config = AuConfig {
            size_length: 11,
            index_length: 2,
            index_delta_length: 2,
        };
        let section = AuHeaderSection::single(42);
        let mut bytes = Vec::new();
        section.write_to(&mut bytes, &config).unwrap();
        assert_eq!(bytes.len(), 4);
        let parsed = AuHeaderSection::read_from(io::Cursor::new(&bytes), &config).unwrap();
        assert_eq!(parsed.au_headers.len(), 1);
        assert_eq!(parsed.au_headers[0].au_size, 42);
    }

    #[test]
    fn test_max_au_size() {
        assert_eq!(AuConfig::default().max_au_size(), 8191);
    }
}
