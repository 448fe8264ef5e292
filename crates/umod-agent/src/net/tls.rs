//! TLS client connections backed by rustls + ring.
//!
//! Enabled by the `tls-rustls` feature.

use std::net::TcpStream;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use umod_types::error::{Result, UmodError};

/// A TLS session over a TCP socket.
pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// Shared, reusable TLS client configuration.
pub struct TlsConnector {
    config: Arc<ClientConfig>,
}

impl TlsConnector {
    /// Build a connector that trusts Mozilla's root CA bundle.
    pub fn new() -> Self {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Self {
            config: Arc::new(config),
        }
    }

    /// Wrap `stream` in a client session for `server_name`. The handshake
    /// runs on first read or write.
    pub fn connect(&self, stream: TcpStream, server_name: &str) -> Result<TlsStream> {
        let sni = ServerName::try_from(server_name.to_owned())
            .map_err(|e| UmodError::Network(format!("invalid server name: {e}")))?;

        let conn = ClientConnection::new(Arc::clone(&self.config), sni)
            .map_err(|e| UmodError::Network(format!("TLS init: {e}")))?;

        log::debug!("TLS session opened for {server_name}");
        Ok(StreamOwned::new(conn, stream))
    }
}

impl Default for TlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn invalid_server_name_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let err = TlsConnector::new()
            .connect(stream, "not a hostname")
            .err()
            .unwrap();
        assert!(err.to_string().contains("invalid server name"));
    }

    #[test]
    fn connect_is_lazy() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        assert!(TlsConnector::new().connect(stream, "localhost").is_ok());
    }
}
