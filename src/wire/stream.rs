//! The transport a [`crate::wire::frame::FrameTransport`] runs over: a plain
//! TCP socket, a Unix domain socket, or either upgraded to TLS
//! (spec.md §4.1, §4.3 "upgrade the transport to TLS").

use native_tls::TlsStream;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::os::unix::net::UnixStream;
use std::time::Duration;

pub enum Stream {
    Tcp(BufReader<TcpStream>),
    Tls(BufReader<TlsStream<TcpStream>>),
    Unix(BufReader<UnixStream>),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(BufReader::new(stream))
    }

    pub fn unix(stream: UnixStream) -> Self {
        Self::Unix(BufReader::new(stream))
    }

    /// Upgrades a TCP stream to TLS in place. Only valid before any X
    /// Protocol bytes have been exchanged over it (spec.md §4.3 step 2).
    pub fn upgrade_to_tls(self, host: &str, connector: &native_tls::TlsConnector) -> io::Result<Self> {
        let tcp = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "already using TLS"));
            }
            Self::Unix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "TLS is not supported over a Unix domain socket",
                ));
            }
        };
        let tls = connector
            .connect(host, tcp)
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(Self::Tls(BufReader::new(tls)))
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(r) => r.get_ref().set_read_timeout(timeout),
            Self::Tls(r) => r.get_ref().get_ref().set_read_timeout(timeout),
            Self::Unix(r) => r.get_ref().set_read_timeout(timeout),
        }
    }

    pub fn tls_cipher(&self) -> Option<String> {
        // native_tls does not expose the negotiated cipher suite portably;
        // the session caches the server-reported cipher from the bootstrap
        // query (spec.md §4.3) rather than introspecting the TLS layer here.
        match self {
            Self::Tls(_) => None,
            _ => None,
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(r) => r.read(buf),
            Self::Tls(r) => r.read(buf),
            Self::Unix(r) => r.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(r) => r.get_mut().write(buf),
            Self::Tls(r) => r.get_mut().write(buf),
            Self::Unix(r) => r.get_mut().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(r) => r.get_mut().flush(),
            Self::Tls(r) => r.get_mut().flush(),
            Self::Unix(r) => r.get_mut().flush(),
        }
    }
}
