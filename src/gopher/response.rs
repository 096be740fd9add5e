//! Response values and their wire encoding.
//!
//! # Responsibilities
//! - Represent handler results (text, binary, menu)
//! - Encode text with CRLF line endings and the `.` terminator
//! - Provide the fixed error responses
//!
//! # Design Decisions
//! - Binary payloads are written verbatim, never terminated
//! - Error responses always use the text form

use crate::gopher::menu::{Menu, DUMMY_HOST, DUMMY_PORT};

/// Line that ends a text response.
pub const TERMINATOR: &[u8] = b".\r\n";

/// What a handler produced for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Text(String),
    Binary(Vec<u8>),
    Menu(Menu),
}

impl Response {
    /// Encode the response as the bytes to put on the wire.
    pub fn encode(self) -> Vec<u8> {
        match self {
            Response::Text(text) => encode_text(&text),
            Response::Menu(menu) => encode_text(&menu.serialize()),
            Response::Binary(bytes) => bytes,
        }
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Response::Text(text)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Response::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Response {
    fn from(bytes: Vec<u8>) -> Self {
        Response::Binary(bytes)
    }
}

impl From<&[u8]> for Response {
    fn from(bytes: &[u8]) -> Self {
        Response::Binary(bytes.to_vec())
    }
}

impl From<Menu> for Response {
    fn from(menu: Menu) -> Self {
        Response::Menu(menu)
    }
}

/// Normalize line endings to CRLF and append the terminator line.
///
/// An empty body encodes as the terminator alone.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + text.len() / 16 + 5);
    let mut previous = 0u8;
    for &byte in text.as_bytes() {
        if byte == b'\n' && previous != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        previous = byte;
    }
    if !out.is_empty() && !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(TERMINATOR);
    out
}

/// The protocol-level errors a dispatch can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorResponse {
    BadSelector,
    NotFound,
    InternalError,
}

impl ErrorResponse {
    /// Message shown to the client.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorResponse::BadSelector => "Bad selector.",
            ErrorResponse::NotFound => "Not found.",
            ErrorResponse::InternalError => "Internal server error.",
        }
    }

    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorResponse::BadSelector => "bad_selector",
            ErrorResponse::NotFound => "not_found",
            ErrorResponse::InternalError => "internal_error",
        }
    }

    /// `3<message>\t\terror.host\t0\r\n.\r\n`
    pub fn encode(&self) -> Vec<u8> {
        format!("3{}\t\t{}\t{}\r\n.\r\n", self.message(), DUMMY_HOST, DUMMY_PORT).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gopher::menu::MenuEntry;

    #[test]
    fn text_gets_terminator() {
        assert_eq!(Response::from("test").encode(), b"test\r\n.\r\n");
    }

    #[test]
    fn bare_line_feeds_become_crlf() {
        assert_eq!(encode_text("a\nb\r\nc\n"), b"a\r\nb\r\nc\r\n.\r\n");
    }

    #[test]
    fn existing_crlf_is_not_doubled() {
        assert_eq!(encode_text("hello\r\n"), b"hello\r\n.\r\n");
    }

    #[test]
    fn empty_text_is_only_the_terminator() {
        assert_eq!(encode_text(""), b".\r\n");
    }

    #[test]
    fn binary_is_untouched() {
        let payload = vec![0u8, b'\n', 0xff, b'.'];
        assert_eq!(Response::from(payload.clone()).encode(), payload);
    }

    #[test]
    fn menu_is_encoded_as_text() {
        let menu = Menu::from(vec![MenuEntry::info("x").unwrap()]);
        assert_eq!(
            Response::from(menu).encode(),
            b"ix\t\terror.host\t0\r\n.\r\n"
        );
    }

    #[test]
    fn error_responses() {
        assert_eq!(
            ErrorResponse::BadSelector.encode(),
            b"3Bad selector.\t\terror.host\t0\r\n.\r\n"
        );
        assert_eq!(
            ErrorResponse::NotFound.encode(),
            b"3Not found.\t\terror.host\t0\r\n.\r\n"
        );
        assert_eq!(
            ErrorResponse::InternalError.encode(),
            b"3Internal server error.\t\terror.host\t0\r\n.\r\n"
        );
    }
}
