use crate::internal::codepage::CodePage;
use crate::internal::error::Result;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::collections::{BTreeSet, HashMap};

// ========================================================================= //

const LONG_STRING_REFS_BIT: u32 = 0x8000_0000;

/// Cell width of a string reference when the table has few enough strings.
pub const SHORT_STRING_REF_BYTES: usize = 2;
/// Cell width of a string reference when the table has more than 0xffff
/// string slots.
pub const LONG_STRING_REF_BYTES: usize = 3;

// ========================================================================= //

/// Whether a string reference should survive a commit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Persistence {
    /// The reference comes from a row that will be written to disk.
    Persistent,
    /// The reference comes from a temporary row or table, and is never
    /// serialized.
    Transient,
}

struct Entry {
    string: String,
    persistent_refs: u16,
    transient_refs: u16,
}

impl Entry {
    fn empty() -> Entry {
        Entry {
            string: String::new(),
            persistent_refs: 0,
            transient_refs: 0,
        }
    }
}

// ========================================================================= //

/// The interned-string dictionary of a database.
///
/// Table cells refer to strings by ID.  IDs start at 1 and are never
/// renumbered; ID 0 stands for the empty (null) string.
pub struct StringTable {
    codepage: CodePage,
    entries: Vec<Entry>,
    index: HashMap<String, u32>,
    free: BTreeSet<u32>,
}

impl StringTable {
    /// Creates a new, empty string table.
    pub fn new(codepage: CodePage) -> StringTable {
        StringTable {
            codepage,
            entries: Vec::new(),
            index: HashMap::new(),
            free: BTreeSet::new(),
        }
    }

    /// Gets the code page used for serializing the string data.
    pub fn codepage(&self) -> CodePage {
        self.codepage
    }

    /// Changes the code page.  This is only permitted while the table holds
    /// no strings that would be saved, since existing data would be
    /// reinterpreted.  Strings referenced only by temporary rows or
    /// pseudo-tables do not count.
    pub fn set_codepage(&mut self, codepage: CodePage) -> Result<()> {
        if self.entries.iter().any(|entry| entry.persistent_refs > 0) {
            function_failed!(
                "Cannot change the codepage of a string table that already \
                 holds strings"
            );
        }
        self.codepage = codepage;
        Ok(())
    }

    /// Changes the code page regardless of existing strings.
    pub(crate) fn force_codepage(&mut self, id: i32) -> Result<()> {
        match CodePage::from_id(id) {
            Some(codepage) => {
                tracing::debug!("forcing codepage {}", codepage.id());
                self.codepage = codepage;
                Ok(())
            }
            None => function_failed!("Unsupported codepage ({})", id),
        }
    }

    /// Returns the number of string slots (including empty ones).
    pub fn num_strings(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Interns a string and returns its ID.  If the string is already present
    /// its reference count grows (saturating) and the existing ID is
    /// returned.  The empty string always maps to ID 0.
    pub fn add_string(
        &mut self,
        string: &str,
        refcount: u16,
        persistence: Persistence,
    ) -> u32 {
        if string.is_empty() {
            return 0;
        }
        let id = match self.index.get(string) {
            Some(&id) => id,
            None => {
                let id = match self.free.pop_first() {
                    Some(id) => id,
                    None => {
                        self.entries.push(Entry::empty());
                        self.entries.len() as u32
                    }
                };
                self.entries[(id - 1) as usize].string = string.to_string();
                self.index.insert(string.to_string(), id);
                id
            }
        };
        let entry = &mut self.entries[(id - 1) as usize];
        match persistence {
            Persistence::Persistent => {
                entry.persistent_refs =
                    entry.persistent_refs.saturating_add(refcount);
            }
            Persistence::Transient => {
                entry.transient_refs =
                    entry.transient_refs.saturating_add(refcount);
            }
        }
        id
    }

    /// Returns the ID of the given string.
    pub fn id_from_string(&self, string: &str) -> Result<u32> {
        match self.index.get(string) {
            Some(&id) => Ok(id),
            None => not_found!("String {:?} is not in the string table",
                               string),
        }
    }

    /// Returns the string with the given ID, or `None` if the ID is out of
    /// range.
    pub fn get(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return Some("");
        }
        self.entries
            .get((id - 1) as usize)
            .map(|entry| entry.string.as_str())
    }

    /// Returns the cell width that string references would have if the
    /// table were saved now.
    pub fn bytes_per_strref(&self) -> usize {
        if self.entries.len() > 0xffff {
            LONG_STRING_REF_BYTES
        } else {
            SHORT_STRING_REF_BYTES
        }
    }

    // ===================================================================== //

    /// Rebuilds a string table from the contents of the `_StringPool` and
    /// `_StringData` streams, and returns it along with the width of string
    /// references in the table streams.
    pub(crate) fn load(pool: &[u8], data: &[u8])
                       -> Result<(StringTable, usize)> {
        if pool.len() < 4 {
            let table = StringTable::new(CodePage::default());
            return Ok((table, SHORT_STRING_REF_BYTES));
        }
        let header = LittleEndian::read_u32(&pool[0..4]);
        let bytes_per_strref = if (header & LONG_STRING_REFS_BIT) != 0 {
            LONG_STRING_REF_BYTES
        } else {
            SHORT_STRING_REF_BYTES
        };
        let codepage_id = (header & !LONG_STRING_REFS_BIT) as i32;
        let codepage = match CodePage::from_id(codepage_id) {
            Some(codepage) => codepage,
            None => function_failed!("Unknown codepage for string table ({})",
                                     codepage_id),
        };
        let mut table = StringTable::new(codepage);
        if table.entries.try_reserve_exact((pool.len() - 4) / 4).is_err() {
            not_enough_memory!("Cannot allocate string table for {} entries",
                               (pool.len() - 4) / 4);
        }
        let mut pos = 4;
        let mut offset = 0usize;
        while pos + 4 <= pool.len() {
            let mut length = LittleEndian::read_u16(&pool[pos..]) as usize;
            let mut refcount = LittleEndian::read_u16(&pool[pos + 2..]);
            pos += 4;
            if length == 0 && refcount != 0 {
                if pos + 4 > pool.len() {
                    function_failed!("String pool ends inside a long string \
                                      marker");
                }
                length = ((refcount as usize) << 16)
                    | LittleEndian::read_u16(&pool[pos..]) as usize;
                refcount = LittleEndian::read_u16(&pool[pos + 2..]);
                pos += 4;
            }
            if length == 0 {
                table.entries.push(Entry::empty());
                table.free.insert(table.entries.len() as u32);
                continue;
            }
            if offset + length > data.len() {
                function_failed!(
                    "String data is truncated (need {} bytes, have {})",
                    offset + length,
                    data.len()
                );
            }
            let string = codepage.decode(&data[offset..offset + length]);
            offset += length;
            table.entries.push(Entry {
                string: string.clone(),
                persistent_refs: refcount,
                transient_refs: 0,
            });
            let id = table.entries.len() as u32;
            table.index.entry(string).or_insert(id);
        }
        tracing::debug!(
            "loaded {} strings (codepage {}, {}-byte refs)",
            table.entries.len(),
            codepage.id(),
            bytes_per_strref
        );
        Ok((table, bytes_per_strref))
    }

    /// Serializes the table into the `_StringPool` and `_StringData` stream
    /// contents, returning them with the width of string references that
    /// table streams must use.  Strings with no persistent references are
    /// written as empty slots so that IDs keep their positions.
    pub(crate) fn save(&self) -> Result<(Vec<u8>, Vec<u8>, usize)> {
        let bytes_per_strref = self.bytes_per_strref();
        let mut header = self.codepage.id() as u32;
        if bytes_per_strref == LONG_STRING_REF_BYTES {
            header |= LONG_STRING_REFS_BIT;
        }
        let mut pool = Vec::with_capacity(4 + 4 * self.entries.len());
        let mut data = Vec::new();
        pool.write_u32::<LittleEndian>(header)?;
        for entry in self.entries.iter() {
            if entry.persistent_refs == 0 || entry.string.is_empty() {
                pool.write_u16::<LittleEndian>(0)?;
                pool.write_u16::<LittleEndian>(0)?;
                continue;
            }
            let bytes = self.codepage.encode(&entry.string);
            let length = bytes.len();
            if length > 0xffff {
                pool.write_u16::<LittleEndian>(0)?;
                pool.write_u16::<LittleEndian>((length >> 16) as u16)?;
            }
            pool.write_u16::<LittleEndian>((length & 0xffff) as u16)?;
            pool.write_u16::<LittleEndian>(entry.persistent_refs)?;
            data.extend_from_slice(&bytes);
        }
        Ok((pool, data, bytes_per_strref))
    }
}

// ========================================================================= //


// ========================================================================= //
