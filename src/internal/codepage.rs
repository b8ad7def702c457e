use encoding_rs::{EncoderResult, Encoding};

// ========================================================================= //

/// A Windows code page, used to encode the string pool and the summary
/// information of a database.
///
/// Only code pages with a known byte encoding are represented; an unknown
/// code page number is rejected when a database is opened or imported.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CodePage {
    /// DOS Cyrillic (866).
    Dos866,
    /// Thai (874).
    Windows874,
    /// Japanese Shift JIS (932).
    ShiftJis,
    /// Simplified Chinese GBK (936).
    Gbk,
    /// Korean Unified Hangul Code (949).
    Korean,
    /// Traditional Chinese Big5 (950).
    Big5,
    /// Central European (1250).
    Windows1250,
    /// Cyrillic (1251).
    Windows1251,
    /// Western European (1252).
    Windows1252,
    /// Greek (1253).
    Windows1253,
    /// Turkish (1254).
    Windows1254,
    /// Hebrew (1255).
    Windows1255,
    /// Arabic (1256).
    Windows1256,
    /// Baltic (1257).
    Windows1257,
    /// Vietnamese (1258).
    Windows1258,
    /// Mac OS Roman (10000).
    MacintoshRoman,
    /// Macintosh Cyrillic (10007).
    MacintoshCyrillic,
    /// Seven-bit ASCII (20127).
    UsAscii,
    /// ISO-8859-1 (28591).
    Iso88591,
    /// ISO-8859-2 (28592).
    Iso88592,
    /// ISO-8859-3 (28593).
    Iso88593,
    /// ISO-8859-4 (28594).
    Iso88594,
    /// ISO-8859-5 (28595).
    Iso88595,
    /// ISO-8859-6 (28596).
    Iso88596,
    /// ISO-8859-7 (28597).
    Iso88597,
    /// ISO-8859-8 (28598).
    Iso88598,
    /// UTF-8 (65001).
    Utf8,
}

// Windows number and display name, ordered as the variants are declared.
static ENTRIES: [(CodePage, i32, &str); 27] = [
    (CodePage::Dos866, 866, "DOS Cyrillic"),
    (CodePage::Windows874, 874, "Windows Thai"),
    (CodePage::ShiftJis, 932, "Shift JIS"),
    (CodePage::Gbk, 936, "GBK"),
    (CodePage::Korean, 949, "Unified Hangul Code"),
    (CodePage::Big5, 950, "Big5"),
    (CodePage::Windows1250, 1250, "Windows Latin 2"),
    (CodePage::Windows1251, 1251, "Windows Cyrillic"),
    (CodePage::Windows1252, 1252, "Windows Latin 1"),
    (CodePage::Windows1253, 1253, "Windows Greek"),
    (CodePage::Windows1254, 1254, "Windows Turkish"),
    (CodePage::Windows1255, 1255, "Windows Hebrew"),
    (CodePage::Windows1256, 1256, "Windows Arabic"),
    (CodePage::Windows1257, 1257, "Windows Baltic"),
    (CodePage::Windows1258, 1258, "Windows Vietnamese"),
    (CodePage::MacintoshRoman, 10000, "Mac OS Roman"),
    (CodePage::MacintoshCyrillic, 10007, "Macintosh Cyrillic"),
    (CodePage::UsAscii, 20127, "US-ASCII"),
    (CodePage::Iso88591, 28591, "ISO Latin 1"),
    (CodePage::Iso88592, 28592, "ISO Latin 2"),
    (CodePage::Iso88593, 28593, "ISO Latin 3"),
    (CodePage::Iso88594, 28594, "ISO Latin 4"),
    (CodePage::Iso88595, 28595, "ISO Latin/Cyrillic"),
    (CodePage::Iso88596, 28596, "ISO Latin/Arabic"),
    (CodePage::Iso88597, 28597, "ISO Latin/Greek"),
    (CodePage::Iso88598, 28598, "ISO Latin/Hebrew"),
    (CodePage::Utf8, 65001, "UTF-8"),
];

impl CodePage {
    /// Looks up a code page by its Windows number.  Zero means "neutral" and
    /// selects the default code page.
    pub fn from_id(id: i32) -> Option<CodePage> {
        if id == 0 {
            return Some(CodePage::default());
        }
        ENTRIES
            .iter()
            .find(|&&(_, number, _)| number == id)
            .map(|&(codepage, _, _)| codepage)
    }

    /// Returns the Windows number of this code page.
    pub fn id(&self) -> i32 {
        ENTRIES[*self as usize].1
    }

    /// Returns a human-readable name for this code page.
    pub fn name(&self) -> &str {
        ENTRIES[*self as usize].2
    }

    /// Decodes bytes in this code page.  Invalid sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if let Some(encoding) = self.encoding() {
            return encoding.decode_without_bom_handling(bytes).0.into_owned();
        }
        let limit = self.direct_limit();
        bytes
            .iter()
            .map(|&byte| {
                if u32::from(byte) < limit {
                    char::from(byte)
                } else {
                    char::REPLACEMENT_CHARACTER
                }
            })
            .collect()
    }

    /// Encodes a string in this code page.  Characters the code page cannot
    /// represent become `'?'`.
    pub fn encode(&self, string: &str) -> Vec<u8> {
        match self.encoding() {
            Some(encoding) if encoding == encoding_rs::UTF_8 => {
                string.as_bytes().to_vec()
            }
            Some(encoding) => encode_lossy(encoding, string),
            None => {
                let limit = self.direct_limit();
                string
                    .chars()
                    .map(|chr| {
                        if (chr as u32) < limit {
                            chr as u8
                        } else {
                            b'?'
                        }
                    })
                    .collect()
            }
        }
    }

    // None for code pages whose bytes map straight onto code points.
    fn encoding(&self) -> Option<&'static Encoding> {
        let encoding = match *self {
            CodePage::Dos866 => encoding_rs::IBM866,
            CodePage::Windows874 => encoding_rs::WINDOWS_874,
            CodePage::ShiftJis => encoding_rs::SHIFT_JIS,
            CodePage::Gbk => encoding_rs::GBK,
            CodePage::Korean => encoding_rs::EUC_KR,
            CodePage::Big5 => encoding_rs::BIG5,
            CodePage::Windows1250 => encoding_rs::WINDOWS_1250,
            CodePage::Windows1251 => encoding_rs::WINDOWS_1251,
            CodePage::Windows1252 => encoding_rs::WINDOWS_1252,
            CodePage::Windows1253 => encoding_rs::WINDOWS_1253,
            CodePage::Windows1254 => encoding_rs::WINDOWS_1254,
            CodePage::Windows1255 => encoding_rs::WINDOWS_1255,
            CodePage::Windows1256 => encoding_rs::WINDOWS_1256,
            CodePage::Windows1257 => encoding_rs::WINDOWS_1257,
            CodePage::Windows1258 => encoding_rs::WINDOWS_1258,
            CodePage::MacintoshRoman => encoding_rs::MACINTOSH,
            CodePage::MacintoshCyrillic => encoding_rs::X_MAC_CYRILLIC,
            CodePage::Iso88592 => encoding_rs::ISO_8859_2,
            CodePage::Iso88593 => encoding_rs::ISO_8859_3,
            CodePage::Iso88594 => encoding_rs::ISO_8859_4,
            CodePage::Iso88595 => encoding_rs::ISO_8859_5,
            CodePage::Iso88596 => encoding_rs::ISO_8859_6,
            CodePage::Iso88597 => encoding_rs::ISO_8859_7,
            CodePage::Iso88598 => encoding_rs::ISO_8859_8,
            CodePage::Utf8 => encoding_rs::UTF_8,
            CodePage::UsAscii | CodePage::Iso88591 => return None,
        };
        Some(encoding)
    }

    fn direct_limit(&self) -> u32 {
        if *self == CodePage::UsAscii {
            0x80
        } else {
            0x100
        }
    }
}

impl Default for CodePage {
    fn default() -> CodePage {
        CodePage::Utf8
    }
}

fn encode_lossy(encoding: &'static Encoding, string: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut output = Vec::with_capacity(string.len());
    let mut chunk = [0u8; 256];
    let mut remaining = string;
    loop {
        let (result, consumed, produced) = encoder
            .encode_from_utf8_without_replacement(remaining, &mut chunk, true);
        output.extend_from_slice(&chunk[..produced]);
        remaining = &remaining[consumed..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(_) => output.push(b'?'),
        }
    }
    output
}

// ========================================================================= //


// ========================================================================= //
