use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};

// ========================================================================= //

// Constants for the _Columns table's Type column bitfield:
pub(crate) const COL_FIELD_SIZE_MASK: i32 = 0xff;
pub(crate) const COL_VALID_BIT: i32 = 0x100;
pub(crate) const COL_LOCALIZABLE_BIT: i32 = 0x200;
pub(crate) const COL_NONBINARY_BIT: i32 = 0x400;
pub(crate) const COL_STRING_BIT: i32 = 0x800;
pub(crate) const COL_NULLABLE_BIT: i32 = 0x1000;
pub(crate) const COL_PRIMARY_KEY_BIT: i32 = 0x2000;
pub(crate) const COL_TEMPORARY_BIT: i32 = 0x4000;
pub(crate) const COL_UNKNOWN_BIT: i32 = 0x8000;

/// Returns true if the type bits describe a binary (stream) column.
pub(crate) fn is_binary_bits(type_bits: i32) -> bool {
    (type_bits & !COL_NULLABLE_BIT) == (COL_STRING_BIT | COL_VALID_BIT)
}

// ========================================================================= //

/// Converts a signed integer into its on-disk cell representation.  The
/// bias makes the all-zeroes cell stand for null.
pub(crate) fn bias_int(value: i32, width: usize) -> u32 {
    if width == 2 {
        (value.wrapping_add(0x8000) as u32) & 0xffff
    } else {
        (value as u32) ^ 0x8000_0000
    }
}

/// The inverse of `bias_int`.
pub(crate) fn unbias_int(raw: u32, width: usize) -> i32 {
    if width == 2 {
        (raw & 0xffff) as i32 - 0x8000
    } else {
        (raw ^ 0x8000_0000) as i32
    }
}

/// Reads one little-endian cell of the given width (2, 3, or 4 bytes).
pub(crate) fn read_cell<R: Read>(reader: &mut R, width: usize)
                                 -> io::Result<u32> {
    match width {
        2 => Ok(reader.read_u16::<LittleEndian>()? as u32),
        3 => {
            let low = reader.read_u16::<LittleEndian>()? as u32;
            let high = reader.read_u8()? as u32;
            Ok(low | (high << 16))
        }
        _ => reader.read_u32::<LittleEndian>(),
    }
}

/// Writes one little-endian cell of the given width (2, 3, or 4 bytes).
pub(crate) fn write_cell<W: Write>(writer: &mut W, width: usize, value: u32)
                                   -> io::Result<()> {
    match width {
        2 => writer.write_u16::<LittleEndian>(value as u16),
        3 => {
            writer.write_u16::<LittleEndian>(value as u16)?;
            writer.write_u8((value >> 16) as u8)
        }
        _ => writer.write_u32::<LittleEndian>(value),
    }
}

// ========================================================================= //

/// A database column data type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    /// A 16-bit integer.
    Int16,
    /// A 32-bit integer.
    Int32,
    /// A string, with the specified maximum length (or zero for no max).
    Str(usize),
    /// A reference to a binary data stream.
    Binary,
}

impl ColumnType {
    fn from_bitfield(type_bits: i32) -> Option<ColumnType> {
        let field_size = (type_bits & COL_FIELD_SIZE_MASK) as usize;
        if is_binary_bits(type_bits) {
            Some(ColumnType::Binary)
        } else if (type_bits & COL_STRING_BIT) != 0 {
            Some(ColumnType::Str(field_size))
        } else if field_size <= 2 {
            Some(ColumnType::Int16)
        } else if field_size == 4 {
            Some(ColumnType::Int32)
        } else {
            None
        }
    }

    fn bitfield(&self) -> i32 {
        match *self {
            ColumnType::Int16 => COL_NONBINARY_BIT | 2,
            ColumnType::Int32 => 4,
            ColumnType::Str(max_len) => {
                COL_STRING_BIT | COL_NONBINARY_BIT
                    | (max_len as i32 & COL_FIELD_SIZE_MASK)
            }
            ColumnType::Binary => COL_STRING_BIT,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ColumnType::Int16 => formatter.write_str("INT"),
            ColumnType::Int32 => formatter.write_str("LONG"),
            ColumnType::Str(max_len) => write!(formatter, "CHAR({})", max_len),
            ColumnType::Binary => formatter.write_str("OBJECT"),
        }
    }
}

// ========================================================================= //

/// A database column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    name: String,
    type_bits: i32,
    is_temporary: bool,
}

impl Column {
    /// Begins building a new column with the given name.
    ///
    /// # Examples
    ///
    /// ```
    /// let column = msidb::Column::build("Foo").nullable().int16();
    /// assert_eq!(column.name(), "Foo");
    /// assert!(column.is_nullable());
    /// assert_eq!(column.coltype(), msidb::ColumnType::Int16);
    /// ```
    pub fn build<S: Into<String>>(name: S) -> ColumnBuilder {
        ColumnBuilder::new(name.into())
    }

    /// Recreates a column from the type bits stored in the `_Columns` table.
    pub(crate) fn from_bitfield(name: String, type_bits: i32,
                                is_temporary: bool)
                                -> Option<Column> {
        ColumnType::from_bitfield(type_bits)?;
        Some(Column {
            name,
            type_bits: (type_bits & !COL_TEMPORARY_BIT) | COL_VALID_BIT,
            is_temporary,
        })
    }

    /// Builds a column from an import-file type code such as `s72`, `L0`,
    /// `i2`, or `V0`.  Lowercase codes are NOT NULL.
    pub(crate) fn from_type_code(name: &str, code: &str,
                                 is_primary_key: bool)
                                 -> Option<Column> {
        let mut chars = code.chars();
        let letter = chars.next()?;
        let digits = chars.as_str();
        let size = parse_leading_int(digits);
        let mut builder = Column::build(name);
        if letter.is_ascii_uppercase() {
            builder = builder.nullable();
        }
        if is_primary_key {
            builder = builder.primary_key();
        }
        match letter.to_ascii_lowercase() {
            'l' => Some(builder.localizable().string(size.max(0) as usize)),
            's' => Some(builder.string(size.max(0) as usize)),
            'i' if size <= 2 => Some(builder.int16()),
            'i' if size == 4 => Some(builder.int32()),
            'v' => Some(builder.binary()),
            _ => None,
        }
    }

    /// Returns the name of the column.
    pub fn name(&self) -> &str { &self.name }

    /// Returns the type of data stored in the column.
    pub fn coltype(&self) -> ColumnType {
        ColumnType::from_bitfield(self.type_bits).unwrap_or(ColumnType::Int32)
    }

    /// Returns true if values in this column can be localized.
    pub fn is_localizable(&self) -> bool {
        (self.type_bits & COL_LOCALIZABLE_BIT) != 0
    }

    /// Returns true if values in this column can be null.
    pub fn is_nullable(&self) -> bool {
        (self.type_bits & COL_NULLABLE_BIT) != 0
    }

    /// Returns true if this is primary key column.
    pub fn is_primary_key(&self) -> bool {
        (self.type_bits & COL_PRIMARY_KEY_BIT) != 0
    }

    /// Returns true if this column is kept in memory only.
    pub fn is_temporary(&self) -> bool { self.is_temporary }

    pub(crate) fn into_temporary(mut self) -> Column {
        self.is_temporary = true;
        self
    }

    /// Returns true if cells in this column refer to the string table.
    pub fn is_string(&self) -> bool {
        (self.type_bits & COL_STRING_BIT) != 0 && !self.is_binary()
    }

    /// Returns true if cells in this column refer to binary streams.
    pub fn is_binary(&self) -> bool { is_binary_bits(self.type_bits) }

    /// Returns the raw type bitfield, as stored in the `_Columns` table.
    pub fn bitfield(&self) -> i32 { self.type_bits }

    /// Returns the declared width (the low byte of the type bits).
    pub fn declared_size(&self) -> usize {
        (self.type_bits & COL_FIELD_SIZE_MASK) as usize
    }

    /// Returns the number of bytes one cell of this column occupies on disk.
    pub(crate) fn cell_width(&self, bytes_per_strref: usize) -> usize {
        match self.coltype() {
            ColumnType::Binary | ColumnType::Int16 => 2,
            ColumnType::Int32 => 4,
            ColumnType::Str(_) => bytes_per_strref,
        }
    }

    /// Returns the column's type code in the import/export notation, for
    /// example `s72`, `L0`, `i2`, or `v0`.
    pub fn type_code(&self) -> String {
        let bits = self.type_bits;
        let mut letter = if self.is_binary() {
            'v'
        } else if (bits & COL_LOCALIZABLE_BIT) != 0 {
            'l'
        } else if (bits & COL_UNKNOWN_BIT) != 0 {
            'f'
        } else if (bits & COL_STRING_BIT) != 0 {
            if self.is_temporary { 'g' } else { 's' }
        } else if self.is_temporary {
            'j'
        } else {
            'i'
        };
        if self.is_nullable() {
            letter = letter.to_ascii_uppercase();
        }
        format!("{}{}", letter, bits & COL_FIELD_SIZE_MASK)
    }

    /// Returns the column's definition as it appears in a `CREATE TABLE`
    /// statement.
    pub(crate) fn sql_definition(&self) -> String {
        let mut definition = format!("`{}` {}", self.name, self.coltype());
        if !self.is_nullable() {
            definition.push_str(" NOT NULL");
        }
        if self.is_temporary {
            definition.push_str(" TEMPORARY");
        }
        if self.is_localizable() {
            definition.push_str(" LOCALIZABLE");
        }
        definition
    }
}

fn parse_leading_int(string: &str) -> i32 {
    let (negative, digits) = match string.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, string),
    };
    let mut number: i32 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        number = number.wrapping_mul(10).wrapping_add((byte - b'0') as i32);
    }
    if negative { -number } else { number }
}

// ========================================================================= //

/// A factory for configuring a new database column.
pub struct ColumnBuilder {
    name: String,
    is_localizable: bool,
    is_nullable: bool,
    is_primary_key: bool,
    is_temporary: bool,
}

impl ColumnBuilder {
    fn new(name: String) -> ColumnBuilder {
        ColumnBuilder {
            name,
            is_localizable: false,
            is_nullable: false,
            is_primary_key: false,
            is_temporary: false,
        }
    }

    /// Makes the column be localizable.
    pub fn localizable(mut self) -> ColumnBuilder {
        self.is_localizable = true;
        self
    }

    /// Makes the column allow null values.
    pub fn nullable(mut self) -> ColumnBuilder {
        self.is_nullable = true;
        self
    }

    /// Makes the column be a primary key column.
    pub fn primary_key(mut self) -> ColumnBuilder {
        self.is_primary_key = true;
        self
    }

    /// Makes the column exist in memory only; it is never written to disk.
    pub fn temporary(mut self) -> ColumnBuilder {
        self.is_temporary = true;
        self
    }

    /// Builds a column that stores a 16-bit integer.
    pub fn int16(self) -> Column { self.with_type(ColumnType::Int16) }

    /// Builds a column that stores a 32-bit integer.
    pub fn int32(self) -> Column { self.with_type(ColumnType::Int32) }

    /// Builds a column that stores a string.
    pub fn string(self, max_len: usize) -> Column {
        self.with_type(ColumnType::Str(max_len))
    }

    /// Builds a column that refers to a binary data stream.
    pub fn binary(self) -> Column { self.with_type(ColumnType::Binary) }

    fn with_type(self, coltype: ColumnType) -> Column {
        let mut bits = coltype.bitfield() | COL_VALID_BIT;
        if self.is_localizable {
            bits |= COL_LOCALIZABLE_BIT;
        }
        if self.is_nullable {
            bits |= COL_NULLABLE_BIT;
        }
        if self.is_primary_key {
            bits |= COL_PRIMARY_KEY_BIT;
        }
        Column {
            name: self.name,
            type_bits: bits,
            is_temporary: self.is_temporary,
        }
    }
}

// ========================================================================= //

#[cfg(test)]
mod tests {
    use super::{bias_int, read_cell, unbias_int, write_cell, Column,
                ColumnType};
    use proptest::prelude::*;

    #[test]
    fn builder_bitfields() {
        assert_eq!(Column::build("A").primary_key().string(72).bitfield(),
                   0x2d48);
        assert_eq!(Column::build("B").localizable().string(0).bitfield(),
                   0x0f00);
        assert_eq!(Column::build("C").int16().bitfield(), 0x0502);
        assert_eq!(Column::build("D").nullable().int32().bitfield(), 0x1104);
        assert_eq!(Column::build("E").binary().bitfield(), 0x0900);
        assert!(Column::build("E").nullable().binary().is_binary());
        assert!(!Column::build("F").string(0).is_binary());
    }

    #[test]
    fn type_codes() {
        assert_eq!(Column::build("A").string(72).type_code(), "s72");
        assert_eq!(Column::build("A").nullable().string(72).type_code(),
                   "S72");
        assert_eq!(Column::build("A").localizable().string(0).type_code(),
                   "l0");
        assert_eq!(Column::build("A").int16().type_code(), "i2");
        assert_eq!(Column::build("A").nullable().int32().type_code(), "I4");
        assert_eq!(Column::build("A").binary().type_code(), "v0");
        assert_eq!(Column::build("A").nullable().binary().type_code(), "V0");
        assert_eq!(Column::build("A").temporary().string(5).type_code(),
                   "g5");
        assert_eq!(Column::build("A").temporary().int16().type_code(), "j2");
    }

    #[test]
    fn parse_type_codes() {
        let column = Column::from_type_code("Property", "s72", true).unwrap();
        assert_eq!(column.coltype(), ColumnType::Str(72));
        assert!(!column.is_nullable());
        assert!(column.is_primary_key());
        let column = Column::from_type_code("Value", "L0", false).unwrap();
        assert!(column.is_localizable());
        assert!(column.is_nullable());
        assert_eq!(column.type_code(), "L0");
        let column = Column::from_type_code("N", "i1", false).unwrap();
        assert_eq!(column.coltype(), ColumnType::Int16);
        let column = Column::from_type_code("N", "I4", false).unwrap();
        assert_eq!(column.coltype(), ColumnType::Int32);
        let column = Column::from_type_code("Data", "v0", false).unwrap();
        assert!(column.is_binary());
        assert!(Column::from_type_code("N", "i3", false).is_none());
        assert!(Column::from_type_code("N", "x1", false).is_none());
        assert!(Column::from_type_code("N", "", false).is_none());
    }

    #[test]
    fn sql_definitions() {
        let column = Column::build("Property").string(72);
        assert_eq!(column.sql_definition(), "`Property` CHAR(72) NOT NULL");
        let column = Column::build("Value").localizable().string(0);
        assert_eq!(column.sql_definition(),
                   "`Value` CHAR(0) NOT NULL LOCALIZABLE");
        let column = Column::build("Count").nullable().int32();
        assert_eq!(column.sql_definition(), "`Count` LONG");
        let column = Column::build("Data").nullable().binary();
        assert_eq!(column.sql_definition(), "`Data` OBJECT");
    }

    #[test]
    fn from_stored_bitfield() {
        let column = Column::from_bitfield("X".to_string(), 0x1d48, false)
            .unwrap();
        assert_eq!(column.coltype(), ColumnType::Str(72));
        assert!(column.is_nullable());
        assert!(Column::from_bitfield("X".to_string(), 0x0103, false)
                    .is_none());
    }

    #[test]
    fn cell_widths() {
        assert_eq!(Column::build("A").string(3).cell_width(2), 2);
        assert_eq!(Column::build("A").string(3).cell_width(3), 3);
        assert_eq!(Column::build("A").binary().cell_width(3), 2);
        assert_eq!(Column::build("A").int16().cell_width(3), 2);
        assert_eq!(Column::build("A").int32().cell_width(3), 4);
    }

    #[test]
    fn known_biased_values() {
        assert_eq!(bias_int(0x123, 2), 0x8123);
        assert_eq!(bias_int(-1, 2), 0x7fff);
        assert_eq!(bias_int(0x1234567, 4), 0x8123_4567);
        assert_eq!(bias_int(-1, 4), 0x7fff_ffff);
        assert_eq!(unbias_int(0x8123, 2), 0x123);
        assert_eq!(unbias_int(0x7fff_ffff, 4), -1);
    }

    #[test]
    fn cells_round_trip() {
        let mut output = Vec::new();
        write_cell(&mut output, 2, 0x8123).unwrap();
        write_cell(&mut output, 3, 0x01_0002).unwrap();
        write_cell(&mut output, 4, 0x8123_4567).unwrap();
        assert_eq!(&output as &[u8],
                   b"\x23\x81\x02\x00\x01\x67\x45\x23\x81");
        let mut input: &[u8] = &output;
        assert_eq!(read_cell(&mut input, 2).unwrap(), 0x8123);
        assert_eq!(read_cell(&mut input, 3).unwrap(), 0x01_0002);
        assert_eq!(read_cell(&mut input, 4).unwrap(), 0x8123_4567);
    }

    proptest! {
        #[test]
        fn short_bias_round_trip(value in -32768i32..=32767) {
            prop_assert_eq!(unbias_int(bias_int(value, 2), 2), value);
        }

        #[test]
        fn long_bias_round_trip(value in any::<i32>()) {
            prop_assert_eq!(unbias_int(bias_int(value, 4), 4), value);
        }
    }
}

// ========================================================================= //
