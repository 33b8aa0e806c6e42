//! Character sets for text bodies and decoded response views.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Character set used to turn text into bytes and back. Defaults to UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Charset {
    #[default]
    Utf8,
    /// 7-bit US-ASCII.
    Ascii,
    /// ISO-8859-1: every code point below U+0100 maps to one byte.
    Latin1,
}

impl Charset {
    /// IANA name, as used in a `charset=` media type parameter.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "us-ascii",
            Charset::Latin1 => "iso-8859-1",
        }
    }

    /// Encode `text`, failing on the first character the charset cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, Error> {
        let limit = match self {
            Charset::Utf8 => return Ok(text.as_bytes().to_vec()),
            Charset::Ascii => 0x80,
            Charset::Latin1 => 0x100,
        };
        text.chars()
            .map(|c| {
                let code = c as u32;
                if code < limit {
                    Ok(code as u8)
                } else {
                    Err(Error::Encoding {
                        strategy: "text",
                        reason: format!("{c:?} is not representable in {self}"),
                    })
                }
            })
            .collect()
    }

    /// Decode `bytes`, failing if they are not valid under this charset.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, Error> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| Error::Decoding { charset: *self }),
            Charset::Ascii if !bytes.is_ascii() => Err(Error::Decoding { charset: *self }),
            Charset::Ascii | Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
