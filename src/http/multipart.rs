//! `multipart/form-data` body decoding.
//!
//! # Responsibilities
//! - Extract the boundary token from a `Content-Type` header
//! - Split a buffered body into boundary-delimited parts
//! - Parse each part's `Content-Disposition` and `Content-Type` headers
//! - Select the first file part, or fall back to the plain fields
//!
//! # Data Flow
//! ```text
//! body bytes + boundary
//!     → scan for `--boundary` delimiters (byte search, no regex)
//!     → per region: split headers / payload at CRLF CRLF
//!     → parse headers → Part (or DroppedRegion)
//!     → Multipart::File(first part with a filename) | Multipart::Fields(all)
//! ```
//!
//! # Design Decisions
//! - Whole body is buffered; no streaming
//! - Malformed regions are dropped instead of failing the decode, but every
//!   drop is reported in `Decoded::dropped`
//! - A missing boundary is the only hard error

use std::fmt;
use thiserror::Error;

/// Content type used when a file part does not declare one.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

const CRLF: &[u8] = b"\r\n";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Errors that abort a multipart decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("boundary not found in Content-Type")]
    MissingBoundary,
}

/// A single decoded part.
#[derive(Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    /// Present only on file parts.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Payload as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// An uploaded file extracted from a multipart body.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field_name", &self.field_name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FilePart {
    fn from_part(part: &Part) -> Option<Self> {
        let filename = part.filename.clone()?;
        Some(Self {
            field_name: part.name.clone(),
            filename,
            content_type: part
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_string()),
            data: part.data.clone(),
        })
    }
}

/// Decoded body: the first file part wins over plain fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Multipart {
    File(FilePart),
    Fields(Vec<Part>),
}

impl Multipart {
    pub fn file(&self) -> Option<&FilePart> {
        match self {
            Multipart::File(file) => Some(file),
            Multipart::Fields(_) => None,
        }
    }

    pub fn fields(&self) -> &[Part] {
        match self {
            Multipart::File(_) => &[],
            Multipart::Fields(fields) => fields,
        }
    }
}

/// Why a boundary-delimited region was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No blank line between headers and payload.
    MissingHeaderSeparator,
    /// No `Content-Disposition` header carrying a `name`.
    MissingName,
}

/// A region that did not decode to a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedRegion {
    /// Byte offset of the region in the body.
    pub offset: usize,
    pub len: usize,
    pub reason: DropReason,
}

/// Full result of a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub body: Multipart,
    /// Every part that decoded, in body order.
    pub parts: Vec<Part>,
    pub dropped: Vec<DroppedRegion>,
}

/// Extract the `boundary` attribute from a `Content-Type` header value.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|boundary| !boundary.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Decode a buffered multipart body delimited by `boundary`.
pub fn decode(buffer: &[u8], boundary: &str) -> Result<Decoded, MultipartError> {
    if boundary.is_empty() {
        return Err(MultipartError::MissingBoundary);
    }

    let delimiter = format!("--{boundary}").into_bytes();
    let terminal = format!("--{boundary}--").into_bytes();

    let mut parts = Vec::new();
    let mut dropped = Vec::new();
    let mut start = find(buffer, &delimiter, 0);

    while let Some(delimiter_at) = start {
        let region_start = delimiter_at + delimiter.len();
        let Some(region_end) = find(buffer, &delimiter, region_start)
            .or_else(|| find(buffer, &terminal, region_start))
        else {
            break;
        };

        let region = &buffer[region_start..region_end];
        match parse_part(region) {
            Ok(part) => parts.push(part),
            Err(reason) => {
                tracing::debug!(offset = region_start, len = region.len(), ?reason, "Dropping multipart region");
                dropped.push(DroppedRegion {
                    offset: region_start,
                    len: region.len(),
                    reason,
                });
            }
        }

        start = Some(region_end);
    }

    let body = match parts.iter().find_map(FilePart::from_part) {
        Some(file) => Multipart::File(file),
        None => Multipart::Fields(parts.clone()),
    };

    Ok(Decoded {
        body,
        parts,
        dropped,
    })
}

fn parse_part(region: &[u8]) -> Result<Part, DropReason> {
    let header_end =
        find(region, HEADER_SEPARATOR, 0).ok_or(DropReason::MissingHeaderSeparator)?;

    let headers = String::from_utf8_lossy(&region[..header_end]);
    let mut data = &region[header_end + HEADER_SEPARATOR.len()..];
    if data.ends_with(CRLF) {
        data = &data[..data.len() - CRLF.len()];
    }

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for (attr, attr_value) in disposition_params(value) {
                if attr.eq_ignore_ascii_case("name") {
                    name = Some(attr_value);
                } else if attr.eq_ignore_ascii_case("filename") {
                    filename = Some(attr_value);
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name
        .filter(|name| !name.is_empty())
        .ok_or(DropReason::MissingName)?;

    Ok(Part {
        name,
        filename: filename.filter(|filename| !filename.is_empty()),
        content_type: content_type.filter(|ct| !ct.is_empty()),
        data: data.to_vec(),
    })
}

/// Parameters of a `Content-Disposition` value, e.g.
/// `form-data; name="file"; filename="a.csv"`.
///
/// Quoted values run to the closing `"`, so they may contain `;`.
fn disposition_params(value: &str) -> Vec<(&str, String)> {
    let mut params = Vec::new();
    let mut rest = match value.split_once(';') {
        Some((_, rest)) => rest,
        None => return params,
    };

    while let Some((key, after)) = rest.split_once('=') {
        let key = key.trim().trim_start_matches(';').trim();
        let after = after.trim_start();

        let (param, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (quoted[..end].to_string(), &quoted[end + 1..]),
                None => (quoted.to_string(), ""),
            },
            None => match after.find(';') {
                Some(end) => (after[..end].trim().to_string(), &after[end..]),
                None => (after.trim().to_string(), ""),
            },
        };

        if !key.is_empty() {
            params.push((key, param));
        }
        rest = match remainder.find(';') {
            Some(next) => &remainder[next + 1..],
            None => "",
        };
    }
    params
}

/// Position of `needle` in `haystack` at or after `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "----TaskBoundary7MA4YWxk";

    fn field(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file(name: &str, filename: &str, content_type: Option<&str>, value: &str) -> String {
        let ct = content_type
            .map(|ct| format!("Content-Type: {ct}\r\n"))
            .unwrap_or_default();
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n{ct}\r\n{value}\r\n"
        )
    }

    fn close() -> String {
        format!("--{BOUNDARY}--\r\n")
    }

    #[test]
    fn test_boundary_from_content_type() {
        let boundary =
            boundary_from_content_type("multipart/form-data; boundary=abc123").unwrap();
        assert_eq!(boundary, "abc123");

        let quoted =
            boundary_from_content_type("multipart/form-data; BOUNDARY=\"x y\"; charset=utf-8")
                .unwrap();
        assert_eq!(quoted, "x y");
    }

    #[test]
    fn test_missing_boundary() {
        assert_eq!(
            boundary_from_content_type("multipart/form-data"),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary="),
            Err(MultipartError::MissingBoundary)
        );
        assert_eq!(decode(b"anything", ""), Err(MultipartError::MissingBoundary));
    }

    #[test]
    fn test_file_part_wins_over_fields() {
        let body = format!(
            "{}{}{}",
            field("note", "hello"),
            file("upload", "tasks.csv", Some("text/csv"), "title,description\nA,B"),
            close()
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        let file = decoded.body.file().expect("file part");
        assert_eq!(file.field_name, "upload");
        assert_eq!(file.filename, "tasks.csv");
        assert_eq!(file.content_type, "text/csv");
        assert_eq!(file.data, b"title,description\nA,B");
        assert!(decoded.body.fields().is_empty());
        assert_eq!(decoded.parts.len(), 2);
        assert!(decoded.dropped.is_empty());
    }

    #[test]
    fn test_first_file_is_selected() {
        let body = format!(
            "{}{}{}",
            file("first", "a.txt", None, "A"),
            file("second", "b.txt", None, "B"),
            close()
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        let file = decoded.body.file().unwrap();
        assert_eq!(file.filename, "a.txt");
        assert_eq!(file.content_type, DEFAULT_FILE_CONTENT_TYPE);
    }

    #[test]
    fn test_fields_only() {
        let body = format!("{}{}{}", field("a", "1"), field("b", "two"), close());

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        let fields = decoded.body.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[0].text(), "1");
        assert_eq!(fields[1].name, "b");
        assert_eq!(fields[1].text(), "two");
        assert!(decoded.body.file().is_none());
    }

    #[test]
    fn test_empty_buffer() {
        let decoded = decode(b"", BOUNDARY).unwrap();
        assert_eq!(decoded.body, Multipart::Fields(Vec::new()));
        assert!(decoded.dropped.is_empty());
    }

    #[test]
    fn test_binary_payload_is_preserved() {
        let payload: Vec<u8> = vec![0, 159, 146, 150, b'\r', b'\n', 255];
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"blob\"; filename=\"x.bin\"\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(&payload);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(close().as_bytes());

        let decoded = decode(&body, BOUNDARY).unwrap();
        assert_eq!(decoded.body.file().unwrap().data, payload);
    }

    #[test]
    fn test_malformed_regions_are_dropped() {
        let body = format!(
            "{}--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"broken\"\r\nno blank line\r\n--{BOUNDARY}\r\nContent-Type: text/plain\r\n\r\nnameless\r\n{}",
            field("ok", "1"),
            close()
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(decoded.body.fields().len(), 1);
        assert_eq!(decoded.body.fields()[0].name, "ok");
        let reasons: Vec<DropReason> = decoded.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(
            reasons,
            vec![DropReason::MissingHeaderSeparator, DropReason::MissingName]
        );
    }

    #[test]
    fn test_unterminated_trailing_part_is_ignored() {
        let body = format!(
            "{}--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"tail\"\r\n\r\nnever closed",
            field("a", "1")
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        assert_eq!(decoded.body.fields().len(), 1);
        assert_eq!(decoded.body.fields()[0].name, "a");
    }

    #[test]
    fn test_quoted_filename_may_contain_semicolon() {
        let body = format!(
            "{}{}",
            file("file", "week;1.csv", Some("text/csv"), "title,description"),
            close()
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        let file = decoded.body.file().unwrap();
        assert_eq!(file.field_name, "file");
        assert_eq!(file.filename, "week;1.csv");
    }

    #[test]
    fn test_disposition_params() {
        let params = disposition_params(r#" form-data; name=plain ; filename="a; b.csv""#);
        assert_eq!(
            params,
            vec![
                ("name", "plain".to_string()),
                ("filename", "a; b.csv".to_string()),
            ]
        );
    }

    #[test]
    fn test_lowercase_headers() {
        let body = format!(
            "--{BOUNDARY}\r\ncontent-disposition: form-data; name=\"f\"; filename=\"n.csv\"\r\ncontent-type: text/csv\r\n\r\nx\r\n{}",
            close()
        );

        let decoded = decode(body.as_bytes(), BOUNDARY).unwrap();
        let file = decoded.body.file().unwrap();
        assert_eq!(file.filename, "n.csv");
        assert_eq!(file.content_type, "text/csv");
    }
}
