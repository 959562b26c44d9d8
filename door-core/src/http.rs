//! HTTP/1.1 request framing and response parsing for one-shot
//! `Connection: close` exchanges.

use core::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Header block or announced body not complete within the buffer
    Incomplete,
    /// Status line unreadable
    Malformed,
    /// Server answered with a non-2xx status
    Status(u16),
    /// Request did not fit the output buffer
    Overflow,
}

impl From<fmt::Error> for HttpError {
    fn from(_: fmt::Error) -> Self {
        HttpError::Overflow
    }
}

/// Frame a request into `out`. `body`, when present, is sent as JSON.
pub fn write_request<W: Write>(
    out: &mut W,
    method: Method,
    host: &str,
    path: &str,
    auth: &str,
    body: Option<&str>,
) -> Result<(), HttpError> {
    write!(out, "{} {} HTTP/1.1\r\n", method.as_str(), path)?;
    write!(out, "Host: {}\r\n", host)?;
    write!(out, "Authorization: Bearer {}\r\n", auth)?;
    out.write_str("Accept: application/json\r\n")?;
    out.write_str("Connection: close\r\n")?;
    match body {
        Some(body) => {
            out.write_str("Content-Type: application/json\r\n")?;
            write!(out, "Content-Length: {}\r\n\r\n", body.len())?;
            out.write_str(body)?;
        }
        None => out.write_str("\r\n")?,
    }
    Ok(())
}

pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

#[derive(Debug, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: u16,
    pub content_length: Option<usize>,
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    /// Body as text, trimmed to `Content-Length` when the server sent one.
    /// A body shorter than announced is `Incomplete`.
    pub fn text(&self) -> Result<&'a str, HttpError> {
        let body = match self.content_length {
            Some(len) if len <= self.body.len() => &self.body[..len],
            Some(_) => return Err(HttpError::Incomplete),
            None => self.body,
        };
        core::str::from_utf8(body).map_err(|_| HttpError::Malformed)
    }
}

/// Parse a complete response held in `buf`. Non-2xx statuses are errors.
pub fn parse_response(buf: &[u8]) -> Result<Response<'_>, HttpError> {
    let body_start = find_header_end(buf).ok_or(HttpError::Incomplete)?;
    let head = core::str::from_utf8(&buf[..body_start]).map_err(|_| HttpError::Malformed)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(HttpError::Malformed)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed);
    }
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(HttpError::Malformed)?;

    let mut content_length = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    if !(200..300).contains(&status) {
        return Err(HttpError::Status(status));
    }

    Ok(Response {
        status,
        content_length,
        body: &buf[body_start..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::String;

    #[test]
    fn frames_get_without_body() {
        let mut out: String<256> = String::new();
        write_request(&mut out, Method::Get, "api.local", "/door/command/d1", "tok", None).unwrap();
        assert_eq!(
            out,
            "GET /door/command/d1 HTTP/1.1\r\nHost: api.local\r\nAuthorization: Bearer tok\r\n\
             Accept: application/json\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn frames_post_with_length() {
        let mut out: String<512> = String::new();
        let body = r#"{"a":"é"}"#;
        write_request(&mut out, Method::Post, "h", "/door/status", "t", Some(body)).unwrap();
        assert!(out.contains("Content-Type: application/json\r\n"));
        // byte length, not char count
        assert!(out.contains("Content-Length: 10\r\n\r\n"));
        assert!(out.ends_with(body));
    }

    #[test]
    fn small_buffer_overflows() {
        let mut out: String<16> = String::new();
        assert_eq!(
            write_request(&mut out, Method::Get, "h", "/x", "t", None),
            Err(HttpError::Overflow)
        );
    }

    #[test]
    fn parses_ok_response() {
        let raw = b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\nServer: uvicorn\r\n\r\n{}\r\nGARBAGE";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_length, Some(4));
        assert_eq!(resp.text().unwrap(), "{}\r\n");
    }

    #[test]
    fn error_status_is_reported() {
        let raw = b"HTTP/1.1 500 Internal Server Error\r\n\r\n{\"detail\":\"x\"}";
        assert_eq!(parse_response(raw), Err(HttpError::Status(500)));
    }

    #[test]
    fn body_shorter_than_announced() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 40\r\n\r\n{\"has_command\": fal";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.text(), Err(HttpError::Incomplete));

        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}\r\n";
        assert_eq!(parse_response(raw).unwrap().text(), Ok("{}"));
    }

    #[test]
    fn truncated_headers() {
        assert_eq!(parse_response(b"HTTP/1.1 200 OK\r\nHost"), Err(HttpError::Incomplete));
        assert_eq!(parse_response(b"garbage\r\n\r\n"), Err(HttpError::Malformed));
    }
}
