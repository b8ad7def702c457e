pub const SUMMARY_INFO_STREAM_NAME: &str = "\u{5}SummaryInformation";

/// Decoded names of the two streams holding the string table.  Both are
/// stored with the table marker.
pub const STRING_POOL: &str = "_StringPool";
pub const STRING_DATA: &str = "_StringData";

/// The longest encoded stream name (in UTF-16 code units) that a compound
/// file directory entry can hold.
pub const MAX_ENCODED_LEN: usize = 31;

const TABLE_PREFIX: char = '\u{4840}';

const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz._";

// Code points holding two alphabet characters, then one.
const PAIR_BASE: u32 = 0x3800;
const PAIR_LAST: u32 = 0x47ff;
const SINGLE_BASE: u32 = 0x4800;
const SINGLE_LAST: u32 = 0x483f;

// ========================================================================= //

/// Decodes a stored stream name into its logical name, also reporting
/// whether the stream holds table data.
pub fn decode(name: &str) -> (String, bool) {
    let rest = name.strip_prefix(TABLE_PREFIX);
    let is_table = rest.is_some();
    let mut output = String::with_capacity(name.len());
    for chr in rest.unwrap_or(name).chars() {
        match chr as u32 {
            code @ PAIR_BASE..=PAIR_LAST => {
                let pair = code - PAIR_BASE;
                output.push(alphabet_char(pair % 64));
                output.push(alphabet_char(pair / 64));
            }
            code @ SINGLE_BASE..=SINGLE_LAST => {
                output.push(alphabet_char(code - SINGLE_BASE));
            }
            _ => output.push(chr),
        }
    }
    (output, is_table)
}

/// Encodes a logical stream name for storage.  Runs of alphabet characters
/// are packed two per code point; anything else is kept as is.
pub fn encode(name: &str, is_table: bool) -> String {
    let mut output = String::with_capacity(name.len());
    if is_table {
        output.push(TABLE_PREFIX);
    }
    let mut pending: Option<u32> = None;
    for chr in name.chars() {
        match (pending, alphabet_index(chr)) {
            (Some(first), Some(second)) => {
                output.push(code_point(PAIR_BASE + second * 64 + first));
                pending = None;
            }
            (None, Some(index)) => pending = Some(index),
            (Some(first), None) => {
                output.push(code_point(SINGLE_BASE + first));
                output.push(chr);
                pending = None;
            }
            (None, None) => output.push(chr),
        }
    }
    if let Some(last) = pending {
        output.push(code_point(SINGLE_BASE + last));
    }
    output
}

/// Returns true if the (already encoded) name carries the table marker.
pub fn is_table_stream(encoded: &str) -> bool {
    encoded.starts_with(TABLE_PREFIX)
}

/// Returns true if the encoded name fits in a compound file directory entry.
pub fn fits(encoded: &str) -> bool {
    encoded.encode_utf16().count() <= MAX_ENCODED_LEN
}

/// Determines if a name will work as a stream name once encoded.
pub fn is_valid(name: &str, is_table: bool) -> bool {
    if name.is_empty() || (!is_table && name.starts_with(TABLE_PREFIX)) {
        false
    } else {
        fits(&encode(name, is_table))
    }
}

/// Returns the decoded name under which a table row's binary field is
/// stored: the table name followed by each primary key value, joined with
/// dots.
pub fn binary_stream_name(table_name: &str, keys: &[String]) -> String {
    let mut name = table_name.to_string();
    for key in keys.iter() {
        name.push('.');
        name.push_str(key);
    }
    name
}

// ========================================================================= //

fn code_point(value: u32) -> char {
    char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn alphabet_char(index: u32) -> char {
    char::from(ALPHABET[index as usize & 0x3f])
}

fn alphabet_index(chr: char) -> Option<u32> {
    if !chr.is_ascii() {
        return None;
    }
    ALPHABET.iter().position(|&byte| byte == chr as u8).map(|index| index as u32)
}

// ========================================================================= //


// ========================================================================= //
