//! Download client: URL handling, HTTP/1.1 GET and TLS.

pub mod http;
#[cfg(feature = "tls-rustls")]
pub mod tls;

use std::fmt;

// ---------------------------------------------------------------------------
// URL parsing and resolution (simplified RFC 3986)
// ---------------------------------------------------------------------------

/// A parsed absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Lowercased scheme (`"http"`, `"https"`).
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Path component starting with `/`.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
}

impl Url {
    /// Parse an absolute `scheme://host[:port][/path][?query]` URL.
    /// Fragments are dropped.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let idx = url.find("://")?;
        let scheme = &url[..idx];
        let valid_scheme = scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c));
        if scheme.is_empty() || !valid_scheme {
            return None;
        }
        Self::parse_authority_and_path(scheme, &url[idx + 3..])
    }

    fn parse_authority_and_path(scheme: &str, rest: &str) -> Option<Url> {
        let rest = rest.split('#').next().unwrap_or("");

        let (rest, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(rest[i + 1..].to_string())),
            None => (rest, None),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rfind(':') {
            Some(i) => {
                let port = authority[i + 1..].parse::<u16>().ok()?;
                (&authority[..i], Some(port))
            },
            None => (authority, None),
        };
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return None;
        }

        Some(Url {
            scheme: scheme.to_lowercase(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            query,
        })
    }

    /// Whether this is an absolute http or https URL.
    pub fn is_http(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Explicit port, or the scheme default.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(self.default_port())
    }

    fn default_port(&self) -> u16 {
        if self.is_https() { 443 } else { 80 }
    }

    /// `Host` header value; the port is included only when non-default.
    pub fn host_header(&self) -> String {
        match self.port {
            Some(p) if p != self.default_port() => format!("{}:{p}", self.host),
            _ => self.host.clone(),
        }
    }

    /// Path plus query, as sent on the request line.
    pub fn request_target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Last non-empty path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.path.rsplit('/').find(|s| !s.is_empty())
    }

    /// Resolve a `Location`-style reference against this URL.
    pub fn resolve(&self, relative: &str) -> Option<Url> {
        let relative = relative.trim();
        if relative.is_empty() {
            return Some(self.clone());
        }
        if relative.contains("://") {
            return Url::parse(relative);
        }
        if relative.starts_with("//") {
            return Url::parse(&format!("{}:{relative}", self.scheme));
        }

        let without_fragment = relative.split('#').next().unwrap_or("");
        let (rel_path, query) = match without_fragment.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (without_fragment.to_string(), None),
        };
        let path = if rel_path.starts_with('/') {
            resolve_path("/", &rel_path)
        } else if rel_path.is_empty() {
            self.path.clone()
        } else {
            resolve_path(self.directory(), &rel_path)
        };
        Some(Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path,
            query,
        })
    }

    /// Path up to and including the last `/`.
    fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(i) => &self.path[..=i],
            None => "/",
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(q) = &self.query {
            write!(f, "?{q}")?;
        }
        Ok(())
    }
}

/// Resolve `relative` against `base_dir`, folding `.` and `..`.
fn resolve_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let trailing = relative.ends_with('/');

    for seg in relative.split('/') {
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    if trailing && path.len() > 1 {
        path.push('/');
    }
    path
}

/// Whether `url` is an absolute http(s) URL the downloader can fetch.
pub fn is_well_formed(url: &str) -> bool {
    !url.chars().any(char::is_whitespace) && Url::parse(url).is_some_and(|u| u.is_http())
}
