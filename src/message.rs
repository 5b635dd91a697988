use log::{debug, info};
use std::path::Path;

use crate::error::{Error, Result};

/// One top-level header as it appeared in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    /// Unfolded source text, encoded-words left as they were.
    pub value: String,
    /// RFC 2047 decoded form, used for address parsing.
    pub decoded: String,
}

#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl ParsedMessage {
    pub fn parse_file(path: &Path) -> Result<ParsedMessage> {
        let display = path.display().to_string();
        debug!("[message] reading {}", display);
        let data = std::fs::read(path).map_err(|source| Error::MessageRead {
            path: display.clone(),
            source,
        })?;
        info!("[message] read {} ({} bytes)", display, data.len());

        ParsedMessage::parse(&data).map_err(|source| Error::MessageParse {
            path: display,
            source,
        })
    }

    /// Splits raw RFC822 bytes into top-level headers and the top-level body.
    /// Multipart bodies are everything after the header block, boundaries and
    /// nested parts intact. Single-part bodies have their transfer encoding
    /// removed.
    pub fn parse(data: &[u8]) -> std::result::Result<ParsedMessage, mailparse::MailParseError> {
        let parsed = mailparse::parse_mail(data)?;
        let (_, body_offset) = mailparse::parse_headers(data)?;

        let headers = parsed
            .headers
            .iter()
            .map(|h| Header {
                name: h.get_key(),
                value: unfold(h.get_value_raw()),
                decoded: h.get_value(),
            })
            .collect::<Vec<_>>();

        // mailparse only keeps the preamble as a multipart's own body
        let body = if parsed.ctype.mimetype.starts_with("multipart/") {
            data[body_offset..].to_vec()
        } else {
            parsed.get_body_raw()?
        };
        debug!(
            "[message] parsed {} headers, mimetype={}, {} subparts",
            headers.len(),
            parsed.ctype.mimetype,
            parsed.subparts.len()
        );

        Ok(ParsedMessage { headers, body })
    }
}

fn unfold(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect::<String>()
        .trim()
        .to_string()
}
