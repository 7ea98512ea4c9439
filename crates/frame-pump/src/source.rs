//! Byte Sources
//!
//! Opens the stream a producer reads from, together with a way to unblock a
//! pending read at shutdown.

use crate::producer::Interrupter;
use crate::synthetic::{SpectrumConfig, SpectrumSource};
use crate::PumpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Poll timeout for stdin, bounding how long a stop request waits
pub const STDIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where the byte stream comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourceSpec {
    /// Standard input (usually a pipe)
    #[default]
    Stdin,
    /// TCP client connection, `tcp://host:port`
    Tcp(String),
    /// Unix domain socket, `unix:///path`
    Unix(PathBuf),
    /// Built-in spectrum generator
    Synthetic,
}

impl FromStr for SourceSpec {
    type Err = PumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "stdin" | "-" => return Ok(SourceSpec::Stdin),
            "synthetic" => return Ok(SourceSpec::Synthetic),
            _ => {}
        }

        if let Some(addr) = s.strip_prefix("tcp://").filter(|a| !a.is_empty()) {
            return Ok(SourceSpec::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix://").filter(|p| !p.is_empty()) {
            return Ok(SourceSpec::Unix(PathBuf::from(path)));
        }
        Err(PumpError::InvalidSource(s.to_string()))
    }
}

impl TryFrom<String> for SourceSpec {
    type Error = PumpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceSpec> for String {
    fn from(spec: SourceSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Stdin => f.write_str("stdin"),
            SourceSpec::Tcp(addr) => write!(f, "tcp://{}", addr),
            SourceSpec::Unix(path) => write!(f, "unix://{}", path.display()),
            SourceSpec::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// An opened source ready to hand to a producer
pub struct OpenedSource {
    pub reader: Box<dyn Read + Send>,
    /// Unblocks a read in progress; `None` when the reader wakes up on its own
    pub interrupter: Option<Interrupter>,
}

impl SourceSpec {
    /// Open the source. `synthetic` configures the built-in generator.
    pub fn open(&self, synthetic: &SpectrumConfig) -> Result<OpenedSource, PumpError> {
        let opened = match self {
            SourceSpec::Stdin => open_stdin().map_err(|error| self.open_error(error))?,
            SourceSpec::Tcp(addr) => {
                let stream = TcpStream::connect(addr).map_err(|error| self.open_error(error))?;
                let control = stream
                    .try_clone()
                    .map_err(|error| self.open_error(error))?;
                OpenedSource {
                    reader: Box::new(stream),
                    interrupter: Some(Box::new(move || {
                        let _ = control.shutdown(Shutdown::Both);
                    })),
                }
            }
            #[cfg(unix)]
            SourceSpec::Unix(path) => {
                use std::os::unix::net::UnixStream;
                let stream = UnixStream::connect(path).map_err(|error| self.open_error(error))?;
                let control = stream
                    .try_clone()
                    .map_err(|error| self.open_error(error))?;
                OpenedSource {
                    reader: Box::new(stream),
                    interrupter: Some(Box::new(move || {
                        let _ = control.shutdown(Shutdown::Both);
                    })),
                }
            }
            #[cfg(not(unix))]
            SourceSpec::Unix(_) => {
                return Err(self.open_error(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix sockets are not available on this platform",
                )))
            }
            SourceSpec::Synthetic => OpenedSource {
                reader: Box::new(SpectrumSource::new(synthetic.clone())),
                interrupter: None,
            },
        };

        info!(source = %self, "Source opened");
        Ok(opened)
    }

    fn open_error(&self, error: io::Error) -> PumpError {
        PumpError::Open {
            target: self.to_string(),
            error,
        }
    }
}

#[cfg(unix)]
fn open_stdin() -> io::Result<OpenedSource> {
    use std::os::fd::AsFd;

    // Read the descriptor directly: std's stdin buffering would hide data
    // from poll(2).
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(OpenedSource {
        reader: Box::new(unix::PollingReader::new(
            std::fs::File::from(fd),
            STDIN_POLL_INTERVAL,
        )),
        interrupter: None,
    })
}

#[cfg(not(unix))]
fn open_stdin() -> io::Result<OpenedSource> {
    Ok(OpenedSource {
        reader: Box::new(io::stdin()),
        interrupter: None,
    })
}

#[cfg(unix)]
pub use unix::PollingReader;

#[cfg(unix)]
mod unix {
    use std::io::{self, ErrorKind, Read};
    use std::os::fd::AsRawFd;
    use std::time::Duration;

    /// Waits for readability with a timeout before each read.
    ///
    /// A timeout surfaces as `ErrorKind::TimedOut`, letting the producer loop
    /// look at its stop flag without the read blocking forever.
    pub struct PollingReader<R> {
        inner: R,
        timeout_ms: libc::c_int,
    }

    impl<R: Read + AsRawFd> PollingReader<R> {
        /// Wrap a readable descriptor
        pub fn new(inner: R, timeout: Duration) -> Self {
            let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
            Self { inner, timeout_ms }
        }

        /// Unwrap the inner reader
        pub fn into_inner(self) -> R {
            self.inner
        }
    }

    impl<R: Read + AsRawFd> Read for PollingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut pfd = libc::pollfd {
                fd: self.inner.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: `pfd` is a valid pollfd for the duration of the call
            let ready = unsafe { libc::poll(&mut pfd, 1, self.timeout_ms) };
            match ready {
                -1 => Err(io::Error::last_os_error()),
                0 => Err(io::Error::from(ErrorKind::TimedOut)),
                _ => self.inner.read(buf),
            }
        }
    }
}
