//! Structured file I/O for binary commit metadata.
//!
//! This module provides checksummed binary serialization for commit files.
//! Every value written or read feeds a running CRC32; the writer appends the
//! checksum on close and the reader verifies it after consuming the payload.

use std::collections::HashMap;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{DoruError, Result};
use crate::storage::{StorageInput, StorageOutput};

/// A structured file writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    hasher: crc32fast::Hasher,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new structured file writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.update_checksum(&[value]);
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write an i64 value (little-endian).
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_i64::<LittleEndian>(value)?;
        self.update_checksum(&value.to_le_bytes());
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, mut value: u64) -> Result<()> {
        let mut encoded = Vec::with_capacity(10);
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                encoded.push(byte);
                break;
            }
            encoded.push(byte | 0x80);
        }
        self.writer.write_all(&encoded)?;
        self.update_checksum(&encoded);
        Ok(())
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.write_varint(bytes.len() as u64)?;
        self.writer.write_all(bytes)?;
        self.update_checksum(bytes);
        Ok(())
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.update_checksum(value);
        Ok(())
    }

    /// Write a map with string keys and string values, in sorted key order.
    pub fn write_string_map(&mut self, map: &HashMap<String, String>) -> Result<()> {
        self.write_varint(map.len() as u64)?;

        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();

        for key in keys {
            self.write_string(key)?;
            self.write_string(&map[key])?;
        }

        Ok(())
    }

    /// Write a list of strings with length prefix.
    pub fn write_string_list(&mut self, values: &[String]) -> Result<()> {
        self.write_varint(values.len() as u64)?;

        for value in values {
            self.write_string(value)?;
        }

        Ok(())
    }

    /// Update the running checksum with new data.
    fn update_checksum(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Write the final checksum and close the writer.
    pub fn close(mut self) -> Result<()> {
        let checksum = self.hasher.finalize();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush_and_sync()?;
        self.writer.close()?;
        Ok(())
    }
}

/// Map a short read to a structural-corruption error.
///
/// A file ending in the middle of a field is a malformed file, not an I/O
/// fault of the storage backend.
fn read_error(e: std::io::Error) -> DoruError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        DoruError::corrupt("File ends mid-field")
    } else {
        DoruError::from(e)
    }
}

/// A structured file reader for binary data.
pub struct StructReader<R: StorageInput> {
    reader: R,
    hasher: crc32fast::Hasher,
    position: u64,
    file_size: u64,
}

impl<R: StorageInput> StructReader<R> {
    /// Create a new structured file reader.
    pub fn new(reader: R) -> Result<Self> {
        let file_size = reader.size()?;
        Ok(StructReader {
            reader,
            hasher: crc32fast::Hasher::new(),
            position: 0,
            file_size,
        })
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.reader.read_u8().map_err(read_error)?;
        self.update_checksum(&[value]);
        self.position += 1;
        Ok(value)
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>().map_err(read_error)?;
        self.update_checksum(&value.to_le_bytes());
        self.position += 4;
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.reader.read_u64::<LittleEndian>().map_err(read_error)?;
        self.update_checksum(&value.to_le_bytes());
        self.position += 8;
        Ok(value)
    }

    /// Read an i64 value (little-endian).
    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.reader.read_i64::<LittleEndian>().map_err(read_error)?;
        self.update_checksum(&value.to_le_bytes());
        self.position += 8;
        Ok(value)
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        let mut count = 0u64;

        loop {
            let byte = self.reader.read_u8().map_err(read_error)?;
            self.update_checksum(&[byte]);
            count += 1;

            if shift >= 64 {
                return Err(DoruError::corrupt("Varint too long"));
            }

            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }

        self.position += count;
        Ok(value)
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_varint()? as usize;
        self.check_remaining(length)?;

        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes).map_err(read_error)?;
        self.update_checksum(&bytes);
        self.position += length as u64;

        String::from_utf8(bytes).map_err(|e| DoruError::corrupt(format!("Invalid UTF-8: {e}")))
    }

    /// Read exact number of raw bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        self.check_remaining(length)?;

        let mut bytes = vec![0u8; length];
        self.reader.read_exact(&mut bytes).map_err(read_error)?;
        self.update_checksum(&bytes);
        self.position += length as u64;
        Ok(bytes)
    }

    /// Read a map with string keys and string values.
    pub fn read_string_map(&mut self) -> Result<HashMap<String, String>> {
        let length = self.read_varint()? as usize;
        let mut map = HashMap::with_capacity(length.min(1024));

        for _ in 0..length {
            let key = self.read_string()?;
            let value = self.read_string()?;
            map.insert(key, value);
        }

        Ok(map)
    }

    /// Read a list of strings with length prefix.
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let length = self.read_varint()? as usize;
        let mut values = Vec::with_capacity(length.min(1024));

        for _ in 0..length {
            values.push(self.read_string()?);
        }

        Ok(values)
    }

    /// Guard against length prefixes pointing past the end of the file.
    fn check_remaining(&self, length: usize) -> Result<()> {
        // The last 4 bytes are the checksum, never payload.
        let payload_end = self.file_size.saturating_sub(4);
        if self.position + length as u64 > payload_end {
            return Err(DoruError::corrupt(format!(
                "Length prefix {length} exceeds remaining payload"
            )));
        }
        Ok(())
    }

    /// Update the running checksum with new data.
    fn update_checksum(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Verify file integrity against the trailing checksum.
    ///
    /// Must be called after the whole payload has been consumed.
    pub fn verify_checksum(&mut self) -> Result<bool> {
        if self.position + 4 > self.file_size {
            return Err(DoruError::corrupt("File too short for checksum"));
        }

        let computed = self.hasher.clone().finalize();
        let stored = self.reader.read_u32::<LittleEndian>().map_err(read_error)?;
        self.position += 4;
        Ok(stored == computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    #[test]
    fn test_struct_writer_reader() {
        let storage = MemoryStorage::new_default();

        // Write structured data
        {
            let output = storage.create_output("test.struct").unwrap();
            let mut writer = StructWriter::new(output);

            writer.write_u8(42).unwrap();
            writer.write_u32(5678).unwrap();
            writer.write_u64(9876543210).unwrap();
            writer.write_i64(-1).unwrap();
            writer.write_varint(12345).unwrap();
            writer.write_string("Hello, World!").unwrap();
            writer.write_raw(&[0xde, 0xad, 0xbe, 0xef]).unwrap();

            writer.close().unwrap();
        }

        // Read structured data
        {
            let input = storage.open_input("test.struct").unwrap();
            let mut reader = StructReader::new(input).unwrap();

            assert_eq!(reader.read_u8().unwrap(), 42);
            assert_eq!(reader.read_u32().unwrap(), 5678);
            assert_eq!(reader.read_u64().unwrap(), 9876543210);
            assert_eq!(reader.read_i64().unwrap(), -1);
            assert_eq!(reader.read_varint().unwrap(), 12345);
            assert_eq!(reader.read_string().unwrap(), "Hello, World!");
            assert_eq!(reader.read_raw(4).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);

            assert!(reader.verify_checksum().unwrap());
        }
    }

    #[test]
    fn test_string_map_roundtrip() {
        let storage = MemoryStorage::new_default();

        let mut original_map = HashMap::new();
        original_map.insert("history_uuid".to_string(), "abc".to_string());
        original_map.insert("max_seq_no".to_string(), "-1".to_string());

        {
            let output = storage.create_output("test.map").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_string_map(&original_map).unwrap();
            writer.close().unwrap();
        }

        {
            let input = storage.open_input("test.map").unwrap();
            let mut reader = StructReader::new(input).unwrap();
            let read_map = reader.read_string_map().unwrap();

            assert_eq!(read_map, original_map);
            assert!(reader.verify_checksum().unwrap());
        }
    }

    #[test]
    fn test_string_list_roundtrip() {
        let storage = MemoryStorage::new_default();

        let values = vec!["_0.dat".to_string(), "_0.idx".to_string()];

        {
            let output = storage.create_output("test.list").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_string_list(&values).unwrap();
            writer.close().unwrap();
        }

        {
            let input = storage.open_input("test.list").unwrap();
            let mut reader = StructReader::new(input).unwrap();
            assert_eq!(reader.read_string_list().unwrap(), values);
            assert!(reader.verify_checksum().unwrap());
        }
    }

    #[test]
    fn test_corrupted_data_fails_checksum() {
        let storage = MemoryStorage::new_default();

        {
            let output = storage.create_output("test.bad").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_u64(12345).unwrap();
            writer.close().unwrap();
        }

        // Flip a payload byte and rewrite the file.
        {
            use std::io::{Read, Write};
            let mut input = storage.open_input("test.bad").unwrap();
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes).unwrap();
            bytes[0] ^= 0xff;

            let mut output = storage.create_output("test.bad").unwrap();
            output.write_all(&bytes).unwrap();
            output.close().unwrap();
        }

        {
            let input = storage.open_input("test.bad").unwrap();
            let mut reader = StructReader::new(input).unwrap();
            reader.read_u64().unwrap();
            assert!(!reader.verify_checksum().unwrap());
        }
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let storage = MemoryStorage::new_default();

        {
            let output = storage.create_output("test.cut").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_u64(12345).unwrap();
            writer.close().unwrap();
        }

        // Cut the file in the middle of the u64 payload.
        {
            use std::io::{Read, Write};
            let mut input = storage.open_input("test.cut").unwrap();
            let mut bytes = Vec::new();
            input.read_to_end(&mut bytes).unwrap();

            let mut output = storage.create_output("test.cut").unwrap();
            output.write_all(&bytes[..5]).unwrap();
            output.close().unwrap();
        }

        {
            let input = storage.open_input("test.cut").unwrap();
            let mut reader = StructReader::new(input).unwrap();
            match reader.read_u64() {
                Err(DoruError::CorruptCommit(_)) => {}
                other => panic!("Expected corrupt commit error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        let storage = MemoryStorage::new_default();

        {
            let output = storage.create_output("test.short").unwrap();
            let mut writer = StructWriter::new(output);
            writer.write_varint(1_000_000).unwrap();
            writer.close().unwrap();
        }

        {
            let input = storage.open_input("test.short").unwrap();
            let mut reader = StructReader::new(input).unwrap();
            match reader.read_string() {
                Err(DoruError::CorruptCommit(_)) => {}
                other => panic!("Expected corrupt commit error, got {other:?}"),
            }
        }
    }
}
