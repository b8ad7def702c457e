use crate::internal::error::Result;
use crate::internal::storage::StreamHandle;
use crate::internal::value::Value;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

// ========================================================================= //

/// The integer returned by `Record::get_int` for fields that do not hold an
/// integer.
pub const NULL_INT: i32 = i32::MIN;

// ========================================================================= //

/// A fixed-size, one-indexed list of field values.
///
/// Field zero exists in addition to the `field_count()` numbered fields; a
/// few operations (such as `Database::get_primary_keys`) store the table name
/// there.
#[derive(Clone, Debug)]
pub struct Record {
    fields: Vec<Value>,
}

impl Record {
    /// Creates a record with `count` fields, all null.
    pub fn new(count: usize) -> Record {
        Record { fields: vec![Value::Null; count + 1] }
    }

    /// Creates a record whose numbered fields hold the given values.
    pub fn from_values(values: Vec<Value>) -> Record {
        let mut fields = Vec::with_capacity(values.len() + 1);
        fields.push(Value::Null);
        fields.extend(values);
        Record { fields }
    }

    /// Returns the number of fields, not counting field zero.
    pub fn field_count(&self) -> usize {
        self.fields.len() - 1
    }

    /// Returns the numbered fields (1 through `field_count()`).
    pub fn values(&self) -> &[Value] {
        &self.fields[1..]
    }

    /// Returns the value of a field, or `None` if the field is out of range.
    pub fn value(&self, field: usize) -> Option<&Value> {
        self.fields.get(field)
    }

    fn slot(&mut self, field: usize) -> Result<&mut Value> {
        let count = self.field_count();
        match self.fields.get_mut(field) {
            Some(slot) => Ok(slot),
            None => invalid_parameter!(
                "Field {} is out of range for a record of {} fields",
                field,
                count
            ),
        }
    }

    /// Replaces the value of a field.
    pub fn set_value(&mut self, field: usize, value: Value) -> Result<()> {
        *self.slot(field)? = value;
        Ok(())
    }

    /// Sets a field to an integer.
    pub fn set_int(&mut self, field: usize, value: i32) -> Result<()> {
        self.set_value(field, Value::Int(value))
    }

    /// Sets a field to a string.  The empty string stores a null.
    pub fn set_string(&mut self, field: usize, value: &str) -> Result<()> {
        if value.is_empty() {
            self.set_value(field, Value::Null)
        } else {
            self.set_value(field, Value::Str(value.to_string()))
        }
    }

    /// Sets a field to null.
    pub fn set_null(&mut self, field: usize) -> Result<()> {
        self.set_value(field, Value::Null)
    }

    /// With a source, makes the field a stream over that source.  Without
    /// one, rewinds the stream already held by the field.
    pub fn load_stream(
        &mut self,
        field: usize,
        source: Option<StreamHandle>,
    ) -> Result<()> {
        let slot = self.slot(field)?;
        match source {
            Some(stream) => {
                *slot = Value::Stream(stream);
                Ok(())
            }
            None => match *slot {
                Value::Stream(ref mut stream) => {
                    stream.seek(SeekFrom::Start(0))?;
                    Ok(())
                }
                _ => invalid_parameter!(
                    "Field {} does not hold a stream to rewind",
                    field
                ),
            },
        }
    }

    /// Makes the field a stream over the contents of a file.
    pub fn load_stream_from_file<P: AsRef<Path>>(
        &mut self,
        field: usize,
        path: P,
    ) -> Result<()> {
        self.slot(field)?;
        let stream = StreamHandle::from_file(path)?;
        self.load_stream(field, Some(stream))
    }

    /// Resets every field, including field zero, to null.
    pub fn clear(&mut self) {
        for field in self.fields.iter_mut() {
            *field = Value::Null;
        }
    }

    /// Returns true if the field is null or out of range.
    pub fn is_null(&self, field: usize) -> bool {
        self.value(field).map_or(true, Value::is_null)
    }

    /// Returns the field as an integer.  Strings of decimal digits (with an
    /// optional leading minus sign) are parsed; anything else yields
    /// `NULL_INT`.
    pub fn get_int(&self, field: usize) -> i32 {
        match self.value(field) {
            Some(&Value::Int(number)) => number,
            Some(Value::Str(string)) => parse_int(string).unwrap_or(NULL_INT),
            _ => NULL_INT,
        }
    }

    /// Returns the field as a string.  Integers are formatted in decimal;
    /// nulls and streams yield the empty string.
    pub fn get_string(&self, field: usize) -> String {
        match self.value(field) {
            Some(Value::Int(number)) => number.to_string(),
            Some(Value::Str(string)) => string.clone(),
            _ => String::new(),
        }
    }

    /// Copies the field's string form into `buffer` with a trailing NUL, and
    /// returns the string's length in bytes.  Fails with `MoreData` if the
    /// buffer cannot hold the string and its terminator; `data_size` gives
    /// the required length.
    pub fn get_string_buf(
        &self,
        field: usize,
        buffer: &mut [u8],
    ) -> Result<usize> {
        let string = self.get_string(field);
        let length = string.len();
        if buffer.len() <= length {
            more_data!(
                "Field {} needs {} bytes but the buffer holds {}",
                field,
                length + 1,
                buffer.len()
            );
        }
        buffer[..length].copy_from_slice(string.as_bytes());
        buffer[length] = 0;
        Ok(length)
    }

    /// Returns the size of the field's data: 4 for integers, the byte length
    /// for strings and streams, 0 for null.
    pub fn data_size(&self, field: usize) -> usize {
        match self.value(field) {
            None | Some(Value::Null) => 0,
            Some(Value::Int(_)) => 4,
            Some(Value::Str(string)) => string.len(),
            Some(Value::Stream(stream)) => stream.len() as usize,
        }
    }

    /// Reads from the field's stream at its current position.
    pub fn read_stream(
        &mut self,
        field: usize,
        buffer: &mut [u8],
    ) -> Result<usize> {
        match *self.slot(field)? {
            Value::Stream(ref mut stream) => Ok(stream.read(buffer)?),
            _ => invalid_parameter!("Field {} is not a stream", field),
        }
    }

    /// Writes the whole of the field's stream to `writer`, regardless of the
    /// stream's current position.
    pub fn save_stream<W: Write>(
        &self,
        field: usize,
        writer: &mut W,
    ) -> Result<u64> {
        match self.value(field) {
            Some(Value::Stream(stream)) => {
                writer.write_all(stream.data())?;
                Ok(stream.len())
            }
            _ => invalid_parameter!("Field {} is not a stream", field),
        }
    }

    /// Returns true if both records have the same number of fields and every
    /// field (including field zero) holds an equal value.  Stream fields
    /// never compare equal.
    pub fn compare(&self, other: &Record) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| a == b)
    }
}

fn parse_int(string: &str) -> Option<i32> {
    let digits = string.strip_prefix('-').unwrap_or(string);
    let mut number: i32 = 0;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        number = number.wrapping_mul(10).wrapping_add((byte - b'0') as i32);
    }
    if string.starts_with('-') {
        number = number.wrapping_neg();
    }
    Some(number)
}

// ========================================================================= //

#[cfg(test)]
mod tests {
    use super::{Record, NULL_INT};
    use crate::internal::error::ErrorKind;
    use crate::internal::storage::StreamHandle;
    use crate::internal::value::Value;
    use std::io::{Seek, SeekFrom};

    #[test]
    fn new_record_is_null() {
        let record = Record::new(3);
        assert_eq!(record.field_count(), 3);
        for field in 0..=3 {
            assert!(record.is_null(field));
        }
        assert!(record.is_null(17));
        assert_eq!(record.get_int(2), NULL_INT);
        assert_eq!(record.get_string(2), "");
    }

    #[test]
    fn set_fields() {
        let mut record = Record::new(2);
        record.set_int(1, 42).unwrap();
        record.set_string(2, "Hello").unwrap();
        assert_eq!(record.get_int(1), 42);
        assert_eq!(record.get_string(1), "42");
        assert_eq!(record.get_string(2), "Hello");
        record.set_string(2, "").unwrap();
        assert!(record.is_null(2));
        let error = record.set_int(3, 1).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn lenient_integer_coercion() {
        let mut record = Record::new(4);
        record.set_string(1, "123").unwrap();
        record.set_string(2, "-45").unwrap();
        record.set_string(3, "12a").unwrap();
        record.set_string(4, "-").unwrap();
        assert_eq!(record.get_int(1), 123);
        assert_eq!(record.get_int(2), -45);
        assert_eq!(record.get_int(3), NULL_INT);
        assert_eq!(record.get_int(4), 0);
    }

    #[test]
    fn clear_resets_field_zero() {
        let mut record = Record::from_values(vec![Value::Int(1)]);
        record.set_string(0, "Table").unwrap();
        record.clear();
        assert!(record.is_null(0));
        assert!(record.is_null(1));
        assert_eq!(record.field_count(), 1);
    }

    #[test]
    fn string_buffer() {
        let mut record = Record::new(1);
        record.set_string(1, "Hello").unwrap();
        let mut small = [0u8; 5];
        let error = record.get_string_buf(1, &mut small).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MoreData);
        assert_eq!(record.data_size(1), 5);
        let mut buffer = [0xffu8; 6];
        assert_eq!(record.get_string_buf(1, &mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Hello\0");
    }

    #[test]
    fn load_and_rewind_stream() {
        let mut record = Record::new(2);
        let stream = StreamHandle::from_bytes(b"abcdef".to_vec());
        record.load_stream(1, Some(stream)).unwrap();
        let mut buffer = [0u8; 4];
        assert_eq!(record.read_stream(1, &mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"abcd");
        record.load_stream(1, None).unwrap();
        assert_eq!(record.read_stream(1, &mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"abcd");
        assert_eq!(record.get_string(1), "");
        let error = record.load_stream(2, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn clone_is_independent() {
        let mut original = Record::new(2);
        original.set_string(1, "Foo").unwrap();
        let stream = StreamHandle::from_bytes(b"0123456789".to_vec());
        original.load_stream(2, Some(stream)).unwrap();
        let mut copy = original.clone();
        copy.set_string(1, "Bar").unwrap();
        assert_eq!(original.get_string(1), "Foo");
        if let Value::Stream(ref mut stream) = copy.fields[2] {
            stream.seek(SeekFrom::Start(7)).unwrap();
        }
        let original_stream = original.value(2).unwrap().as_stream().unwrap();
        assert_eq!(original_stream.position(), 0);
        assert_eq!(copy.value(2).unwrap().as_stream().unwrap().position(), 7);
    }

    #[test]
    fn compare_records() {
        let a = Record::from_values(vec![Value::Int(1), Value::from("x")]);
        let b = Record::from_values(vec![Value::Int(1), Value::from("x")]);
        let c = Record::from_values(vec![Value::Int(1), Value::from("y")]);
        let d = Record::from_values(vec![Value::Int(1)]);
        assert!(a.compare(&b));
        assert!(!a.compare(&c));
        assert!(!a.compare(&d));
        let stream = StreamHandle::from_bytes(b"same".to_vec());
        let e = Record::from_values(vec![Value::Stream(stream.clone())]);
        let f = Record::from_values(vec![Value::Stream(stream)]);
        assert!(!e.compare(&f));
        assert!(!e.compare(&e.clone()));
    }

    #[test]
    fn save_stream_writes_all_bytes() {
        let mut record = Record::new(1);
        let stream = StreamHandle::from_bytes(b"payload".to_vec());
        record.load_stream(1, Some(stream)).unwrap();
        let mut skip = [0u8; 3];
        record.read_stream(1, &mut skip).unwrap();
        let mut output = Vec::new();
        assert_eq!(record.save_stream(1, &mut output).unwrap(), 7);
        assert_eq!(&output as &[u8], b"payload");
    }
}

// ========================================================================= //
