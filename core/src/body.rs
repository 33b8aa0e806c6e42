//! Request body encoding.
//!
//! # Design
//! Each strategy carries its own strictly-typed payload, so a payload can
//! never disagree with its strategy at run time. What can still fail is a
//! charset that cannot represent the text, and serializing a `Serialize`
//! value into JSON (reported when the body is built).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::charset::Charset;
use crate::error::Error;
use crate::http::Params;

type Encoder = Arc<dyn Fn() -> Vec<u8> + Send + Sync>;

/// Body of a request together with the strategy that turns it into bytes.
#[derive(Clone)]
pub enum RequestBody {
    /// Bytes sent as given.
    Raw(Vec<u8>),
    /// Plain text encoded with `charset`.
    Text { text: String, charset: Charset },
    /// A JSON document.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` fields; null fields are dropped.
    UrlEncoded { fields: Params, charset: Charset },
    /// Caller-supplied encoder whose output is trusted verbatim.
    Custom(Encoder),
}

impl RequestBody {
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        RequestBody::Raw(bytes.into())
    }

    /// UTF-8 text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::text_in(text, Charset::Utf8)
    }

    pub fn text_in(text: impl Into<String>, charset: Charset) -> Self {
        RequestBody::Text {
            text: text.into(),
            charset,
        }
    }

    /// Serialize `value` into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| Error::Encoding {
                strategy: "json",
                reason: e.to_string(),
            })
    }

    /// UTF-8 form fields.
    pub fn url_encoded(fields: Params) -> Self {
        Self::url_encoded_in(fields, Charset::Utf8)
    }

    pub fn url_encoded_in(fields: Params, charset: Charset) -> Self {
        RequestBody::UrlEncoded { fields, charset }
    }

    /// Encode `payload` with `encoder` each time the body is needed.
    pub fn custom<T, F>(payload: T, encoder: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Vec<u8> + Send + Sync + 'static,
    {
        RequestBody::Custom(Arc::new(move || encoder(&payload)))
    }

    /// Name of the strategy, for diagnostics.
    pub fn strategy(&self) -> &'static str {
        match self {
            RequestBody::Raw(_) => "raw",
            RequestBody::Text { .. } => "text",
            RequestBody::Json(_) => "json",
            RequestBody::UrlEncoded { .. } => "url-encoded",
            RequestBody::Custom(_) => "custom",
        }
    }

    /// Media type implied by the strategy. Raw and custom bodies imply none.
    pub fn content_type(&self) -> Option<String> {
        match self {
            RequestBody::Json(_) => Some("application/json".to_string()),
            RequestBody::Text { charset, .. } => Some(format!("text/plain; charset={charset}")),
            RequestBody::UrlEncoded { charset, .. } => {
                Some(format!("application/x-www-form-urlencoded; charset={charset}"))
            }
            RequestBody::Raw(_) | RequestBody::Custom(_) => None,
        }
    }

    /// Bytes to put on the wire.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        match self {
            RequestBody::Raw(bytes) => Ok(bytes.clone()),
            RequestBody::Text { text, charset } => charset.encode(text),
            RequestBody::Json(value) => serde_json::to_vec(value).map_err(|e| Error::Encoding {
                strategy: "json",
                reason: e.to_string(),
            }),
            RequestBody::UrlEncoded { fields, charset } => {
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (name, value) in fields.present() {
                    form.append_pair(name, value);
                }
                let form = form.finish();
                charset.encode(&form).map_err(|e| Error::Encoding {
                    strategy: "url-encoded",
                    reason: e.to_string(),
                })
            }
            RequestBody::Custom(encoder) => Ok(encoder()),
        }
    }

    /// The encoded body read back as text, for logging.
    pub fn encode_as_text(&self, charset: Charset) -> Result<String, Error> {
        charset.decode(&self.encode()?)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            RequestBody::Text { text, charset } => f
                .debug_struct("Text")
                .field("text", text)
                .field("charset", charset)
                .finish(),
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            RequestBody::UrlEncoded { fields, charset } => f
                .debug_struct("UrlEncoded")
                .field("fields", fields)
                .field("charset", charset)
                .finish(),
            RequestBody::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
