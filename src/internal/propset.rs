// Serialization of a single-section OLE property set, the layout used by the
// `\u{5}SummaryInformation` stream:
//
//     header   u16 byte order (0xfffe), u16 format (0), u32 OS version,
//              16-byte class ID, u32 section count (1)
//     index    16-byte format ID, u32 section offset (48)
//     section  u32 size, u32 property count, (u32 id, u32 offset) pairs,
//              then the typed values, each padded to four bytes

use crate::internal::codepage::CodePage;
use crate::internal::error::Result;
use crate::internal::time;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::time::SystemTime;

// ========================================================================= //

const BYTE_ORDER_MARK: u16 = 0xfffe;
const OS_VERSION: u32 = 0x0002_0005;
const SECTION_OFFSET: u32 = 48;

const PROPERTY_CODEPAGE: u32 = 1;

const VT_EMPTY: u32 = 0;
const VT_I2: u32 = 2;
const VT_I4: u32 = 3;
const VT_LPSTR: u32 = 30;
const VT_FILETIME: u32 = 64;

// ========================================================================= //

/// A single value stored in the summary information stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PropertyValue {
    /// A signed 16-bit integer.
    I2(i16),
    /// A signed 32-bit integer.
    I4(i32),
    /// A string, encoded in the property set's code page.
    LpStr(String),
    /// A timestamp.
    FileTime(SystemTime),
}

impl PropertyValue {
    /// Reads one value.  Returns `None` for an empty (`VT_EMPTY`) value.
    fn read<R: Read>(reader: &mut R, codepage: CodePage)
                     -> Result<Option<PropertyValue>> {
        let value = match reader.read_u32::<LittleEndian>()? {
            VT_EMPTY => return Ok(None),
            VT_I2 => {
                let value = reader.read_i16::<LittleEndian>()?;
                reader.read_u16::<LittleEndian>()?;
                PropertyValue::I2(value)
            }
            VT_I4 => PropertyValue::I4(reader.read_i32::<LittleEndian>()?),
            VT_LPSTR => {
                let length = reader.read_u32::<LittleEndian>()? as usize;
                let mut bytes = vec![0u8; length];
                reader.read_exact(&mut bytes)?;
                // The length counts the terminating NUL.
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
                PropertyValue::LpStr(codepage.decode(&bytes))
            }
            VT_FILETIME => {
                let filetime = reader.read_u64::<LittleEndian>()?;
                PropertyValue::FileTime(time::system_time_from_filetime(
                    filetime,
                ))
            }
            other => function_failed!("Unsupported property type {}", other),
        };
        Ok(Some(value))
    }

    fn encode(&self, codepage: CodePage) -> Vec<u8> {
        let mut data = Vec::new();
        match self {
            PropertyValue::I2(value) => {
                data.extend_from_slice(&VT_I2.to_le_bytes());
                data.extend_from_slice(&(*value as i32).to_le_bytes());
            }
            PropertyValue::I4(value) => {
                data.extend_from_slice(&VT_I4.to_le_bytes());
                data.extend_from_slice(&value.to_le_bytes());
            }
            PropertyValue::LpStr(string) => {
                let mut bytes = codepage.encode(string);
                bytes.push(0);
                data.extend_from_slice(&VT_LPSTR.to_le_bytes());
                data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                data.extend_from_slice(&bytes);
                while data.len() % 4 != 0 {
                    data.push(0);
                }
            }
            PropertyValue::FileTime(timestamp) => {
                let filetime = time::filetime_from_system_time(*timestamp);
                data.extend_from_slice(&VT_FILETIME.to_le_bytes());
                data.extend_from_slice(&filetime.to_le_bytes());
            }
        }
        data
    }

    /// Returns the OLE name of the value's type, e.g. `"LPSTR"`.
    pub fn type_name(&self) -> &str {
        match self {
            PropertyValue::I2(_) => "I2",
            PropertyValue::I4(_) => "I4",
            PropertyValue::LpStr(_) => "LPSTR",
            PropertyValue::FileTime(_) => "FILETIME",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::I2(value) => write!(formatter, "{}", value),
            PropertyValue::I4(value) => write!(formatter, "{}", value),
            PropertyValue::LpStr(string) => formatter.write_str(string),
            PropertyValue::FileTime(timestamp) => {
                formatter.write_str(&time::format_text(*timestamp))
            }
        }
    }
}

// ========================================================================= //

/// The properties of one property-set section, keyed by id.  Strings are
/// encoded with the code page held in property 1.
pub(crate) struct PropertySection {
    fmtid: [u8; 16],
    codepage: CodePage,
    values: BTreeMap<u32, PropertyValue>,
}

impl PropertySection {
    pub(crate) fn new(fmtid: [u8; 16]) -> PropertySection {
        PropertySection {
            fmtid,
            codepage: CodePage::default(),
            values: BTreeMap::new(),
        }
    }

    /// Parses a property set, which must hold a section with the given
    /// format ID.
    pub(crate) fn read<R: Read>(mut reader: R, fmtid: [u8; 16])
                                -> Result<PropertySection> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let mut cursor = Cursor::new(data.as_slice());
        if cursor.read_u16::<LittleEndian>()? != BYTE_ORDER_MARK {
            function_failed!("Property set is not little-endian");
        }
        cursor.seek(SeekFrom::Start(28))?;
        let mut found_fmtid = [0u8; 16];
        cursor.read_exact(&mut found_fmtid)?;
        if found_fmtid != fmtid {
            function_failed!("Property set has wrong format identifier");
        }
        let section_start = u64::from(cursor.read_u32::<LittleEndian>()?);
        cursor.seek(SeekFrom::Start(section_start))?;
        let _section_size = cursor.read_u32::<LittleEndian>()?;
        let count = cursor.read_u32::<LittleEndian>()?;
        let mut offsets = Vec::new();
        for _ in 0..count {
            let id = cursor.read_u32::<LittleEndian>()?;
            let offset = u64::from(cursor.read_u32::<LittleEndian>()?);
            offsets.push((id, section_start + offset));
        }

        let mut section = PropertySection::new(fmtid);
        // The code page must be known before any string is decoded.
        offsets.sort_by_key(|&(id, _)| id != PROPERTY_CODEPAGE);
        for (id, offset) in offsets {
            cursor.seek(SeekFrom::Start(offset))?;
            match PropertyValue::read(&mut cursor, section.codepage)? {
                Some(value) => section.insert(id, value),
                None => continue,
            }
        }
        Ok(section)
    }

    pub(crate) fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        let encoded: Vec<(u32, Vec<u8>)> = self
            .values
            .iter()
            .map(|(&id, value)| (id, value.encode(self.codepage)))
            .collect();
        let index_size = 8 + 8 * encoded.len();
        let section_size =
            index_size + encoded.iter().map(|(_, data)| data.len()).sum::<usize>();

        writer.write_u16::<LittleEndian>(BYTE_ORDER_MARK)?;
        writer.write_u16::<LittleEndian>(0)?;
        writer.write_u32::<LittleEndian>(OS_VERSION)?;
        writer.write_all(&[0u8; 16])?;
        writer.write_u32::<LittleEndian>(1)?;
        writer.write_all(&self.fmtid)?;
        writer.write_u32::<LittleEndian>(SECTION_OFFSET)?;

        writer.write_u32::<LittleEndian>(section_size as u32)?;
        writer.write_u32::<LittleEndian>(encoded.len() as u32)?;
        let mut offset = index_size;
        for (id, data) in encoded.iter() {
            writer.write_u32::<LittleEndian>(*id)?;
            writer.write_u32::<LittleEndian>(offset as u32)?;
            offset += data.len();
        }
        for (_, data) in encoded.iter() {
            writer.write_all(data)?;
        }
        Ok(())
    }

    pub(crate) fn codepage(&self) -> CodePage {
        self.codepage
    }

    pub(crate) fn set_codepage(&mut self, codepage: CodePage) {
        self.insert(PROPERTY_CODEPAGE, PropertyValue::I2(codepage.id() as i16));
    }

    pub(crate) fn value(&self, id: u32) -> Option<&PropertyValue> {
        self.values.get(&id)
    }

    pub(crate) fn ids(&self) -> Vec<u32> {
        self.values.keys().copied().collect()
    }

    pub(crate) fn insert(&mut self, id: u32, value: PropertyValue) {
        if id == PROPERTY_CODEPAGE {
            if let PropertyValue::I2(codepage_id) = value {
                // Code pages above 32767 are stored as negative I2 values.
                if let Some(codepage) =
                    CodePage::from_id(i32::from(codepage_id as u16))
                {
                    self.codepage = codepage;
                }
            }
        }
        self.values.insert(id, value);
    }

    pub(crate) fn remove(&mut self, id: u32) {
        self.values.remove(&id);
    }
}

// ========================================================================= //

#[cfg(test)]
mod tests {
    use super::{PropertySection, PropertyValue};
    use crate::internal::codepage::CodePage;
    use crate::internal::error::ErrorKind;
    use std::io::Cursor;
    use std::time::{Duration, UNIX_EPOCH};

    const FMTID: [u8; 16] = [9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 1, 2, 3, 4, 5, 6];

    #[test]
    fn value_encodings() {
        assert_eq!(PropertyValue::I2(-2).encode(CodePage::Utf8),
                   vec![2, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(PropertyValue::LpStr("Installer".to_string())
                       .encode(CodePage::Utf8),
                   b"\x1e\x00\x00\x00\x0a\x00\x00\x00Installer\x00\x00\x00"
                       .to_vec());
        let mut input: &[u8] = &[3, 0, 0, 0, 0x10, 0x27, 0, 0];
        assert_eq!(PropertyValue::read(&mut input, CodePage::Utf8).unwrap(),
                   Some(PropertyValue::I4(10000)));
        let mut input: &[u8] = &[0, 0, 0, 0];
        assert_eq!(PropertyValue::read(&mut input, CodePage::Utf8).unwrap(),
                   None);
    }

    #[test]
    fn section_layout() {
        let mut section = PropertySection::new(FMTID);
        section.insert(14, PropertyValue::I4(200));
        let mut output = Vec::new();
        section.write(&mut output).unwrap();
        assert_eq!(output.len(), 48 + 8 + 8 + 8);
        assert_eq!(&output[0..8], &[0xfe, 0xff, 0, 0, 5, 0, 2, 0]);
        assert_eq!(&output[28..44], &FMTID);
        assert_eq!(&output[44..48], &[48, 0, 0, 0]);
        assert_eq!(&output[48..56], &[24, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(&output[56..64], &[14, 0, 0, 0, 16, 0, 0, 0]);
    }

    #[test]
    fn values_survive_a_write_and_read() {
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_239_530_400);
        let mut section = PropertySection::new(FMTID);
        section.insert(2, PropertyValue::LpStr("Caf\u{e9}".to_string()));
        section.set_codepage(CodePage::Windows1252);
        section.insert(12, PropertyValue::FileTime(timestamp));
        section.insert(14, PropertyValue::I4(200));
        let mut output = Vec::new();
        section.write(&mut output).unwrap();

        let parsed = PropertySection::read(Cursor::new(output), FMTID).unwrap();
        assert_eq!(parsed.codepage(), CodePage::Windows1252);
        assert_eq!(parsed.ids(), vec![1, 2, 12, 14]);
        assert_eq!(parsed.value(2),
                   Some(&PropertyValue::LpStr("Caf\u{e9}".to_string())));
        assert_eq!(parsed.value(12), Some(&PropertyValue::FileTime(timestamp)));
        assert_eq!(parsed.value(14), Some(&PropertyValue::I4(200)));
    }

    #[test]
    fn utf8_codepage_is_stored_as_negative_i2() {
        let mut section = PropertySection::new(FMTID);
        section.set_codepage(CodePage::Utf8);
        assert_eq!(section.value(1), Some(&PropertyValue::I2(-535)));
        assert_eq!(section.codepage(), CodePage::Utf8);
    }

    #[test]
    fn wrong_format_identifier() {
        let mut output = Vec::new();
        PropertySection::new(FMTID).write(&mut output).unwrap();
        let other = [0u8; 16];
        let error = PropertySection::read(Cursor::new(output), other)
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::FunctionFailed);
    }

    #[test]
    fn bad_byte_order_mark() {
        let input: &[u8] = &[0xff, 0xfe, 0, 0];
        let error = PropertySection::read(input, FMTID).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::FunctionFailed);
    }

    #[test]
    fn display_values() {
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_239_530_400);
        assert_eq!(PropertyValue::I2(1252).to_string(), "1252");
        assert_eq!(PropertyValue::LpStr("x;1033".to_string()).to_string(),
                   "x;1033");
        assert_eq!(PropertyValue::FileTime(timestamp).to_string(),
                   "2009/04/12 10:00:00");
    }
}

// ========================================================================= //
