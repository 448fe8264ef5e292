//! Minimal streaming HTTP/1.1 GET client.
//!
//! Plain HTTP runs over `std::net::TcpStream`; HTTPS goes through rustls
//! when the `tls-rustls` feature is enabled. The response body is handed
//! back as a reader so large downloads never sit in memory.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use umod_types::error::{Result, UmodError};

use super::Url;
use crate::config::DownloadConfig;

/// Upper bound on the response head.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Issues GET requests and follows redirects.
pub struct HttpClient {
    user_agent: String,
    max_redirects: u8,
    connect_timeout: Duration,
    read_timeout: Duration,
    #[cfg(feature = "tls-rustls")]
    tls: super::tls::TlsConnector,
}

impl HttpClient {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_redirects: config.max_redirects,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            #[cfg(feature = "tls-rustls")]
            tls: super::tls::TlsConnector::new(),
        }
    }

    /// GET `url`, following redirects (301/302/303/307/308) up to the
    /// configured limit. Any final status outside 2xx is an error.
    pub fn get(&self, url: &Url) -> Result<HttpResponse> {
        if !url.is_http() {
            return Err(UmodError::Network(format!(
                "unsupported scheme for HTTP client: {}",
                url.scheme
            )));
        }

        let mut current = url.clone();
        for _ in 0..=self.max_redirects {
            let resp = self.request(&current)?;

            if is_redirect(resp.status)
                && let Some(location) = resp.header("location")
            {
                let next = current.resolve(location).ok_or_else(|| {
                    UmodError::Network(format!("bad redirect Location: {location}"))
                })?;
                log::debug!("{} redirected to {next}", resp.status);
                current = next;
                continue;
            }

            if !(200..300).contains(&resp.status) {
                return Err(UmodError::Network(format!(
                    "server returned HTTP {} for {current}",
                    resp.status
                )));
            }
            return Ok(resp);
        }

        Err(UmodError::Network("too many redirects".to_string()))
    }

    /// One request/response exchange, no redirect handling.
    fn request(&self, url: &Url) -> Result<HttpResponse> {
        log::info!("GET {url}");
        let stream = self.tcp_connect(&url.host, url.port_or_default())?;
        let mut transport = if url.is_https() {
            self.upgrade(stream, &url.host)?
        } else {
            Transport::Plain(stream)
        };

        send_request(&mut transport, url, &self.user_agent)?;

        let mut reader = BufReader::new(transport);
        let head = read_head(&mut reader)?;
        let (status, headers) = parse_head(&head)?;
        let body = body_reader(reader, &headers)?;

        Ok(HttpResponse {
            url: url.clone(),
            status,
            headers,
            body,
        })
    }

    #[cfg(feature = "tls-rustls")]
    fn upgrade(&self, stream: TcpStream, host: &str) -> Result<Transport> {
        Ok(Transport::Tls(Box::new(self.tls.connect(stream, host)?)))
    }

    #[cfg(not(feature = "tls-rustls"))]
    fn upgrade(&self, _stream: TcpStream, host: &str) -> Result<Transport> {
        Err(UmodError::Network(format!(
            "HTTPS is not available in this build ({host})"
        )))
    }

    /// Open a TCP connection with connect and read timeouts.
    fn tcp_connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| UmodError::Network(format!("DNS resolution failed: {e}")))?
            .next()
            .ok_or_else(|| UmodError::Network(format!("no addresses for {host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(|e| UmodError::Network(format!("TCP connect failed: {e}")))?;

        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.read_timeout))?;
        Ok(stream)
    }
}

// -------------------------------------------------------------------
// Response
// -------------------------------------------------------------------

/// Status, headers and a streaming body.
pub struct HttpResponse {
    /// URL that produced this response, after redirects.
    pub url: Url,
    pub status: u16,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    body: Box<dyn Read>,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Declared body length, when the body is not chunked.
    pub fn content_length(&self) -> Option<u64> {
        if is_chunked(&self.headers) {
            return None;
        }
        self.header("content-length")?.parse().ok()
    }
}

impl Read for HttpResponse {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------
// Transport
// -------------------------------------------------------------------

enum Transport {
    Plain(TcpStream),
    #[cfg(feature = "tls-rustls")]
    Tls(Box<super::tls::TlsStream>),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.read(buf),
            #[cfg(feature = "tls-rustls")]
            Self::Tls(s) => match s.read(buf) {
                // Servers commonly close without close_notify once the
                // body is complete.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
                other => other,
            },
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(s) => s.write(buf),
            #[cfg(feature = "tls-rustls")]
            Self::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(s) => s.flush(),
            #[cfg(feature = "tls-rustls")]
            Self::Tls(s) => s.flush(),
        }
    }
}

// -------------------------------------------------------------------
// Internals
// -------------------------------------------------------------------

/// Send an HTTP/1.1 GET request.
fn send_request(stream: &mut impl Write, url: &Url, user_agent: &str) -> Result<()> {
    let request = format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: {user_agent}\r\n\
         Accept: */*\r\n\
         Connection: close\r\n\
         \r\n",
        url.request_target(),
        url.host_header(),
    );

    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| UmodError::Network(format!("send request: {e}")))
}

/// Read up to and including the blank line that ends the head.
fn read_head(reader: &mut impl BufRead) -> Result<Vec<u8>> {
    let mut head = Vec::with_capacity(1024);
    loop {
        let start = head.len();
        let budget = (MAX_HEAD_SIZE + 1 - start) as u64;
        let n = reader
            .by_ref()
            .take(budget)
            .read_until(b'\n', &mut head)
            .map_err(|e| UmodError::Network(format!("read response: {e}")))?;
        if n == 0 {
            return Err(UmodError::Network(
                "connection closed before response head".to_string(),
            ));
        }
        if head.len() > MAX_HEAD_SIZE {
            return Err(UmodError::Network("response head too large".to_string()));
        }
        let line = &head[start..];
        if line == b"\r\n" || line == b"\n" {
            return Ok(head);
        }
    }
}

/// Parse the status line and headers.
fn parse_head(head: &[u8]) -> Result<(u16, Vec<(String, String)>)> {
    let text = std::str::from_utf8(head)
        .map_err(|_| UmodError::Network("non-UTF-8 headers".to_string()))?;
    let mut lines = text.lines();

    let status_line = lines
        .next()
        .ok_or_else(|| UmodError::Network("empty response".to_string()))?;
    let status = parse_status_line(status_line)?;

    let headers = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
        .collect();

    Ok((status, headers))
}

/// Parse the HTTP status code from the status line.
fn parse_status_line(line: &str) -> Result<u16> {
    // Expected: "HTTP/1.x NNN ..."
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    let code = parts.next();
    match code {
        Some(code) if version.starts_with("HTTP/") => code
            .parse()
            .map_err(|_| UmodError::Network(format!("bad status code in: {line}"))),
        _ => Err(UmodError::Network(format!("bad status line: {line}"))),
    }
}

/// Pick the body framing from the headers.
fn body_reader<R: BufRead + 'static>(
    reader: R,
    headers: &[(String, String)],
) -> Result<Box<dyn Read>> {
    if is_chunked(headers) {
        return Ok(Box::new(ChunkedReader::new(reader)));
    }
    match find_header(headers, "content-length") {
        Some(cl) => {
            let len: u64 = cl
                .parse()
                .map_err(|_| UmodError::Network(format!("bad Content-Length: {cl}")))?;
            Ok(Box::new(reader.take(len)))
        },
        None => Ok(Box::new(reader)),
    }
}

fn is_chunked(headers: &[(String, String)]) -> bool {
    find_header(headers, "transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
}

/// Case-insensitive header lookup.
fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    headers
        .iter()
        .find(|(k, _)| k == &name_lower)
        .map(|(_, v)| v.as_str())
}

/// Whether a status code is a redirect we should follow.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

// -------------------------------------------------------------------
// Chunked transfer decoding
// -------------------------------------------------------------------

/// Decodes a chunked body incrementally.
pub struct ChunkedReader<R> {
    inner: R,
    remaining: u64,
    done: bool,
}

impl<R: BufRead> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
            done: false,
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.inner.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunked body ended early",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read the next chunk-size line. Returns 0 for the last chunk.
    fn next_chunk_size(&mut self) -> io::Result<u64> {
        let line = self.read_line()?;
        // Strip optional chunk extensions (after `;`).
        let size = line.split(';').next().unwrap_or("").trim();
        u64::from_str_radix(size, 16).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad chunk size: {size:?}"))
        })
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            self.remaining = self.next_chunk_size()?;
            if self.remaining == 0 {
                // Trailer section ends with an empty line.
                while !self.read_line()?.is_empty() {}
                self.done = true;
                return Ok(0);
            }
        }

        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunk truncated",
            ));
        }
        self.remaining -= n as u64;
        if self.remaining == 0 {
            self.read_line()?;
        }
        Ok(n)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve `responses` to consecutive connections on a local port.
    /// The join handle yields the request heads received.
    pub fn serve(responses: Vec<Vec<u8>>) -> (u16, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    if stream.read(&mut byte).unwrap_or(0) == 0 {
                        break;
                    }
                    head.push(byte[0]);
                }
                requests.push(String::from_utf8_lossy(&head).into_owned());
                let _ = stream.write_all(&response);
                let _ = stream.flush();
            }
            requests
        });
        (port, handle)
    }

    /// A complete `200 OK` response with a Content-Length.
    pub fn ok(body: &[u8]) -> Vec<u8> {
        let mut resp = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len())
            .into_bytes();
        resp.extend_from_slice(body);
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ok, serve};
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(&DownloadConfig::default())
    }

    fn read_all(mut resp: HttpResponse) -> Vec<u8> {
        let mut body = Vec::new();
        resp.read_to_end(&mut body).unwrap();
        body
    }

    #[test]
    fn parse_head_status_and_headers() {
        let head = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\n";
        let (status, headers) = parse_head(head).unwrap();
        assert_eq!(status, 200);
        assert_eq!(find_header(&headers, "Content-Type"), Some("text/plain"));
        assert_eq!(find_header(&headers, "CONTENT-LENGTH"), Some("5"));
        assert_eq!(find_header(&headers, "missing"), None);
    }

    #[test]
    fn parse_status_line_ok() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK").unwrap(), 200);
        assert_eq!(parse_status_line("HTTP/1.0 301 Moved Permanently").unwrap(), 301);
    }

    #[test]
    fn parse_status_line_bad() {
        assert!(parse_status_line("garbage").is_err());
        assert!(parse_status_line("HTTP/1.1 abc").is_err());
    }

    #[test]
    fn read_head_stops_at_blank_line() {
        let mut reader = &b"HTTP/1.1 200 OK\r\nA: b\r\n\r\nbody"[..];
        let head = read_head(&mut reader).unwrap();
        assert!(head.ends_with(b"\r\n\r\n"));
        assert_eq!(reader, b"body");
    }

    #[test]
    fn read_head_eof_is_error() {
        let mut reader = &b"HTTP/1.1 200 OK\r\n"[..];
        assert!(read_head(&mut reader).is_err());
    }

    #[test]
    fn read_head_stops_at_size_limit_without_newline() {
        let mut reader = BufReader::new(io::repeat(b'a'));
        let err = read_head(&mut reader).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn chunked_basic() {
        let data = &b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"[..];
        let mut out = String::new();
        ChunkedReader::new(data).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn chunked_with_extension_and_trailer() {
        let data = &b"5;ext=val\r\nhello\r\n0\r\nX-Trailer: 1\r\n\r\n"[..];
        let mut out = String::new();
        ChunkedReader::new(data).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn chunked_truncated_is_error() {
        let data = &b"a\r\nhel"[..];
        let mut out = Vec::new();
        let err = ChunkedReader::new(data).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn chunked_bad_size_is_error() {
        let data = &b"zz\r\n"[..];
        let mut out = Vec::new();
        assert!(ChunkedReader::new(data).read_to_end(&mut out).is_err());
    }

    #[test]
    fn is_redirect_codes() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(code));
        }
        for code in [200, 304, 404, 500] {
            assert!(!is_redirect(code));
        }
    }

    #[test]
    fn unsupported_scheme_rejected() {
        let url = Url::parse("ftp://example.com/file").unwrap();
        let err = client().get(&url).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn get_streams_content_length_body() {
        let (port, server) = serve(vec![ok(b"hello world")]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/file.txt")).unwrap();
        let resp = client().get(&url).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_length(), Some(11));
        assert_eq!(read_all(resp), b"hello world");

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /file.txt HTTP/1.1\r\n"));
        assert!(requests[0].contains(&format!("Host: 127.0.0.1:{port}\r\n")));
        assert!(requests[0].contains("User-Agent: uMod.Agent/"));
    }

    #[test]
    fn get_decodes_chunked_body() {
        let resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n";
        let (port, server) = serve(vec![resp.to_vec()]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let resp = client().get(&url).unwrap();
        assert_eq!(resp.content_length(), None);
        assert_eq!(read_all(resp), b"abcde");
        server.join().unwrap();
    }

    #[test]
    fn get_follows_relative_redirect() {
        let redirect = b"HTTP/1.1 302 Found\r\nLocation: /final.bin\r\nContent-Length: 0\r\n\r\n";
        let (port, server) = serve(vec![redirect.to_vec(), ok(b"done")]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/start")).unwrap();
        let resp = client().get(&url).unwrap();
        assert_eq!(resp.url.path, "/final.bin");
        assert_eq!(read_all(resp), b"done");

        let requests = server.join().unwrap();
        assert!(requests[1].starts_with("GET /final.bin "));
    }

    #[test]
    fn too_many_redirects() {
        let redirect = b"HTTP/1.1 301 Moved\r\nLocation: /again\r\nContent-Length: 0\r\n\r\n".to_vec();
        let config = DownloadConfig {
            max_redirects: 1,
            ..DownloadConfig::default()
        };
        let (port, server) = serve(vec![redirect.clone(), redirect]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let err = HttpClient::new(&config).get(&url).unwrap_err();
        assert!(err.to_string().contains("too many redirects"));
        server.join().unwrap();
    }

    #[test]
    fn error_status_is_network_error() {
        let resp = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec();
        let (port, server) = serve(vec![resp]);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/missing")).unwrap();
        let err = client().get(&url).unwrap_err();
        assert!(matches!(err, UmodError::Network(ref m) if m.contains("HTTP 404")));
        server.join().unwrap();
    }

    #[test]
    fn connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        assert!(matches!(client().get(&url), Err(UmodError::Network(_))));
    }
}
