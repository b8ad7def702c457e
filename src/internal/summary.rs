use crate::internal::codepage::CodePage;
use crate::internal::error::Result;
use crate::internal::propset::{PropertySection, PropertyValue};
use crate::internal::time;
use std::io::{Read, Seek, Write};
use std::time::SystemTime;
use uuid::Uuid;

// ========================================================================= //

// This constant is this UUID:
//     F29F85E0-4FF9-1068-AB91-08002B27B3D9
// Which comes from this page:
//     https://msdn.microsoft.com/en-us/library/windows/desktop/
//     aa380052(v=vs.85).aspx
// The first three fields are in little-endian, and the last two in big-endian,
// because that's how Windows encodes UUIDs.  For details, see:
//     https://en.wikipedia.org/wiki/Universally_unique_identifier#Encoding
const FMTID: [u8; 16] =
    *b"\xe0\x85\x9f\xf2\xf9\x4f\x68\x10\xab\x91\x08\x00\x2b\x27\xb3\xd9";

/// The code page property (I2).
pub const PROPERTY_CODEPAGE: u32 = 1;
/// The title property (string).
pub const PROPERTY_TITLE: u32 = 2;
/// The subject property (string).
pub const PROPERTY_SUBJECT: u32 = 3;
/// The author property (string).
pub const PROPERTY_AUTHOR: u32 = 4;
/// The keywords property (string).
pub const PROPERTY_KEYWORDS: u32 = 5;
/// The comments property (string).
pub const PROPERTY_COMMENTS: u32 = 6;
/// The template property (string), of the form `arch;lang1,lang2`.
pub const PROPERTY_TEMPLATE: u32 = 7;
/// The last-author property (string).
pub const PROPERTY_LAST_AUTHOR: u32 = 8;
/// The revision number property (string), which holds the package code.
pub const PROPERTY_UUID: u32 = 9;
/// The last-printed time property (FILETIME).
pub const PROPERTY_LAST_PRINTED: u32 = 11;
/// The creation time property (FILETIME).
pub const PROPERTY_CREATION_TIME: u32 = 12;
/// The last-saved time property (FILETIME).
pub const PROPERTY_LAST_SAVE_TIME: u32 = 13;
/// The page count property (I4), which holds the schema version.
pub const PROPERTY_PAGE_COUNT: u32 = 14;
/// The word count property (I4), which holds the source image flags.
pub const PROPERTY_WORD_COUNT: u32 = 15;
/// The character count property (I4), which holds the restriction flags.
pub const PROPERTY_CHARACTER_COUNT: u32 = 16;
/// The creating application property (string).
pub const PROPERTY_CREATING_APP: u32 = 18;
/// The security property (I4).
pub const PROPERTY_SECURITY: u32 = 19;

// ========================================================================= //

/// The value types that summary information properties may hold.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyType {
    /// A 16-bit integer.
    I2,
    /// A 32-bit integer.
    I4,
    /// A string.
    String,
    /// A timestamp.
    FileTime,
}

impl PropertyType {
    /// Returns the type of the given summary information property, or `None`
    /// if the property id is not one that MSI files use.
    pub fn of(property: u32) -> Option<PropertyType> {
        match property {
            PROPERTY_CODEPAGE => Some(PropertyType::I2),
            PROPERTY_TITLE..=PROPERTY_UUID | PROPERTY_CREATING_APP => {
                Some(PropertyType::String)
            }
            PROPERTY_LAST_PRINTED..=PROPERTY_LAST_SAVE_TIME => {
                Some(PropertyType::FileTime)
            }
            PROPERTY_PAGE_COUNT..=PROPERTY_CHARACTER_COUNT
            | PROPERTY_SECURITY => Some(PropertyType::I4),
            _ => None,
        }
    }

    fn matches(self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (PropertyType::I2, PropertyValue::I2(_))
                | (PropertyType::I4, PropertyValue::I4(_))
                | (PropertyType::String, PropertyValue::LpStr(_))
                | (PropertyType::FileTime, PropertyValue::FileTime(_))
        )
    }
}

// ========================================================================= //

/// Summary information (e.g. title, author) about an MSI database.
pub struct SummaryInfo {
    properties: PropertySection,
}

impl SummaryInfo {
    /// Creates an empty `SummaryInfo` with no properties set other than the
    /// code page.
    pub fn new() -> SummaryInfo {
        let properties = PropertySection::new(FMTID);
        let mut summary = SummaryInfo { properties };
        summary.set_codepage(CodePage::Utf8);
        summary
    }

    pub(crate) fn read<R: Read + Seek>(reader: R) -> Result<SummaryInfo> {
        let properties = PropertySection::read(reader, FMTID)?;
        Ok(SummaryInfo { properties })
    }

    pub(crate) fn write<W: Write>(&self, writer: W) -> Result<()> {
        self.properties.write(writer)
    }

    /// Returns the raw value of a property, if it is set.
    pub fn property(&self, property: u32) -> Option<&PropertyValue> {
        self.properties.value(property)
    }

    /// Sets the raw value of a property.  Fails with `DatatypeMismatch` if
    /// the property id is unknown or the value has the wrong type for it.
    pub fn set_property(&mut self, property: u32, value: PropertyValue)
                        -> Result<()> {
        match PropertyType::of(property) {
            Some(expected) if expected.matches(&value) => {
                self.properties.insert(property, value);
                Ok(())
            }
            Some(expected) => datatype_mismatch!(
                "Summary property {} must be {:?}, not {}",
                property,
                expected,
                value.type_name()
            ),
            None => datatype_mismatch!("Unknown summary property {}",
                                       property),
        }
    }

    /// Removes a property.
    pub fn clear_property(&mut self, property: u32) {
        self.properties.remove(property);
    }

    /// Returns the ids of all properties that are set, in ascending order.
    pub fn property_ids(&self) -> Vec<u32> {
        self.properties.ids()
    }

    /// Sets a property from the text form used in `_SummaryInformation`
    /// import files.
    pub(crate) fn set_property_text(&mut self, property: &str, value: &str)
                                    -> Result<()> {
        let property: u32 = match property.trim().parse() {
            Ok(property) => property,
            Err(_) => function_failed!("Invalid summary property id {:?}",
                                       property),
        };
        let value = match PropertyType::of(property) {
            // Code pages such as 65001 only fit in an I2 as unsigned.
            Some(PropertyType::I2) => {
                PropertyValue::I2(parse_number::<i32>(value)? as i16)
            }
            Some(PropertyType::I4) => PropertyValue::I4(parse_number(value)?),
            Some(PropertyType::String) => {
                PropertyValue::LpStr(value.to_string())
            }
            Some(PropertyType::FileTime) => match time::parse_text(value) {
                Some(timestamp) => PropertyValue::FileTime(timestamp),
                None => function_failed!("Invalid timestamp {:?}", value),
            },
            None => function_failed!("Unhandled summary property {}",
                                     property),
        };
        self.properties.insert(property, value);
        Ok(())
    }

    /// Returns (property id, text value) for every property, in the form
    /// used in `_SummaryInformation` export files.
    pub(crate) fn text_rows(&self) -> Vec<(u32, String)> {
        self.property_ids()
            .into_iter()
            .filter_map(|id| {
                if id == PROPERTY_CODEPAGE {
                    return Some((id, self.codepage().id().to_string()));
                }
                self.properties.value(id).map(|value| (id, value.to_string()))
            })
            .collect()
    }

    fn string(&self, property: u32) -> Option<&str> {
        match self.properties.value(property) {
            Some(PropertyValue::LpStr(string)) => Some(string.as_str()),
            _ => None,
        }
    }

    fn set_string<S: Into<String>>(&mut self, property: u32, string: S) {
        self.properties
            .insert(property, PropertyValue::LpStr(string.into()));
    }

    fn int(&self, property: u32) -> Option<i32> {
        match self.properties.value(property) {
            Some(&PropertyValue::I4(value)) => Some(value),
            _ => None,
        }
    }

    fn timestamp(&self, property: u32) -> Option<SystemTime> {
        match self.properties.value(property) {
            Some(&PropertyValue::FileTime(timestamp)) => Some(timestamp),
            _ => None,
        }
    }

    /// Gets the architecture string from the "template" property, if one is
    /// set.  This indicates the hardware architecture that this package is
    /// intended for (e.g. `"x64"`).
    pub fn arch(&self) -> Option<&str> {
        let template = self.template()?;
        let arch = template.split_once(';').map_or(template, |x| x.0);
        if arch.is_empty() {
            None
        } else {
            Some(arch)
        }
    }

    /// Gets the "author" property, if one is set.
    pub fn author(&self) -> Option<&str> {
        self.string(PROPERTY_AUTHOR)
    }

    /// Sets the "author" property.
    pub fn set_author<S: Into<String>>(&mut self, author: S) {
        self.set_string(PROPERTY_AUTHOR, author);
    }

    /// Gets the code page used for serializing this summary info.
    pub fn codepage(&self) -> CodePage {
        self.properties.codepage()
    }

    /// Sets the code page used for serializing this summary info.
    pub fn set_codepage(&mut self, codepage: CodePage) {
        self.properties.set_codepage(codepage);
    }

    /// Gets the "comments" property, if one is set.
    pub fn comments(&self) -> Option<&str> {
        self.string(PROPERTY_COMMENTS)
    }

    /// Sets the "comments" property.
    pub fn set_comments<S: Into<String>>(&mut self, comments: S) {
        self.set_string(PROPERTY_COMMENTS, comments);
    }

    /// Gets the "creating application" property, if one is set.  This
    /// indicates the name of the tool that was used to create the package.
    pub fn creating_application(&self) -> Option<&str> {
        self.string(PROPERTY_CREATING_APP)
    }

    /// Sets the "creating application" property.
    pub fn set_creating_application<S: Into<String>>(&mut self, app_name: S) {
        self.set_string(PROPERTY_CREATING_APP, app_name);
    }

    /// Gets the "creation time" property, if one is set.
    pub fn creation_time(&self) -> Option<SystemTime> {
        self.timestamp(PROPERTY_CREATION_TIME)
    }

    /// Sets the "creation time" property.
    pub fn set_creation_time(&mut self, timestamp: SystemTime) {
        self.properties
            .insert(PROPERTY_CREATION_TIME, PropertyValue::FileTime(timestamp));
    }

    /// Gets the "keywords" property, if one is set.
    pub fn keywords(&self) -> Option<&str> {
        self.string(PROPERTY_KEYWORDS)
    }

    /// Sets the "keywords" property.
    pub fn set_keywords<S: Into<String>>(&mut self, keywords: S) {
        self.set_string(PROPERTY_KEYWORDS, keywords);
    }

    /// Gets the "last saved" time property, if one is set.
    pub fn last_save_time(&self) -> Option<SystemTime> {
        self.timestamp(PROPERTY_LAST_SAVE_TIME)
    }

    /// Gets the "page count" property, which MSI files use for the minimum
    /// installer version required (e.g. 200 for 2.0).
    pub fn page_count(&self) -> Option<i32> {
        self.int(PROPERTY_PAGE_COUNT)
    }

    /// Sets the "page count" property.
    pub fn set_page_count(&mut self, page_count: i32) {
        self.properties
            .insert(PROPERTY_PAGE_COUNT, PropertyValue::I4(page_count));
    }

    /// Gets the "subject" property, if one is set.  This typically indicates
    /// the name of the software that will be installed by the package.
    pub fn subject(&self) -> Option<&str> {
        self.string(PROPERTY_SUBJECT)
    }

    /// Sets the "subject" property.
    pub fn set_subject<S: Into<String>>(&mut self, subject: S) {
        self.set_string(PROPERTY_SUBJECT, subject);
    }

    /// Gets the "template" property, if one is set.
    pub fn template(&self) -> Option<&str> {
        self.string(PROPERTY_TEMPLATE)
    }

    /// Sets the "template" property (e.g. `"Intel;1033"`).
    pub fn set_template<S: Into<String>>(&mut self, template: S) {
        self.set_string(PROPERTY_TEMPLATE, template);
    }

    /// Gets the "title" property, if one is set.  This indicates the type of
    /// the installer package (e.g. "Installation Database" or "Patch").
    pub fn title(&self) -> Option<&str> {
        self.string(PROPERTY_TITLE)
    }

    /// Sets the "title" property.
    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.set_string(PROPERTY_TITLE, title);
    }

    /// Gets the "UUID" property, if one is set and parses as a UUID.
    pub fn uuid(&self) -> Option<Uuid> {
        let string = self.string(PROPERTY_UUID)?;
        let trimmed = string.trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(trimmed).ok()
    }

    /// Sets the "UUID" property, formatted as an uppercase braced string.
    pub fn set_uuid(&mut self, uuid: Uuid) {
        let mut string = format!("{{{}}}", uuid.hyphenated());
        string.make_ascii_uppercase();
        self.set_string(PROPERTY_UUID, string);
    }

    /// Gets the "character count" property, which MSI files use for
    /// restriction flags.
    pub fn character_count(&self) -> Option<i32> {
        self.int(PROPERTY_CHARACTER_COUNT)
    }

    /// Sets the "character count" property.
    pub fn set_character_count(&mut self, count: i32) {
        self.properties
            .insert(PROPERTY_CHARACTER_COUNT, PropertyValue::I4(count));
    }

    /// Gets the "word count" property, which MSI files use for source image
    /// flags.
    pub fn word_count(&self) -> Option<i32> {
        self.int(PROPERTY_WORD_COUNT)
    }

    /// Sets the "word count" property.
    pub fn set_word_count(&mut self, word_count: i32) {
        self.properties
            .insert(PROPERTY_WORD_COUNT, PropertyValue::I4(word_count));
    }
}

impl Default for SummaryInfo {
    fn default() -> SummaryInfo {
        SummaryInfo::new()
    }
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    match text.trim().parse() {
        Ok(number) => Ok(number),
        Err(_) => function_failed!("Invalid number {:?}", text),
    }
}

// ========================================================================= //


// ========================================================================= //
