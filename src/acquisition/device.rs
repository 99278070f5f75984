//! Device session: exclusive, line-oriented access to the sensor node
//!
//! The node is normally a USB serial device (`/dev/ttyACM0`, `/dev/ttyUSB0`).
//! It can also be reached through a serial-to-TCP bridge (ser2net and
//! friends) or replayed through stdin. Serial devices are switched to raw
//! 8N1 at `device.baud_rate` when opened (see [`super::serial`]).
//!
//! Read timeouts are not failures: the node only reports every few minutes,
//! so a quiet line surfaces as [`LineRead::Idle`]. End of stream or an I/O
//! error means the device is gone and is fatal for the process.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;

use super::serial::SerialPort;
use crate::config::{DeviceConfig, DeviceKind};

/// Timeout for establishing a TCP bridge connection.
const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Device errors. All of them end the ingestion loop.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open {target}: {source}")]
    Open {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("device disconnected (end of stream)")]
    Disconnected,

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device session already closed")]
    Closed,
}

/// Outcome of one line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A complete line, line terminator stripped.
    Line(String),
    /// The read timeout elapsed with no complete line.
    Idle,
}

/// Where raw lines come from.
///
/// The ingestion loop calls [`read_line`](LineSource::read_line) inside a
/// `select!` with cancellation, so implementations must keep partially read
/// data across a dropped call.
#[async_trait]
pub trait LineSource: Send {
    /// Read the next line, or report that none arrived within the timeout.
    async fn read_line(&mut self) -> Result<LineRead, DeviceError>;

    /// Release the underlying handle. Safe to call more than once.
    async fn close(&mut self);

    /// Human-readable name for logging (e.g. "/dev/ttyACM0", "stdin").
    fn source_name(&self) -> &str;
}

type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Owns the device handle for the lifetime of the ingestion loop.
pub struct DeviceSession {
    name: String,
    reader: Option<BoxedReader>,
    read_timeout: Duration,
    pending: Vec<u8>,
    /// Set once the stream has returned EOF after a final unterminated line
    eof: bool,
    lines_read: u64,
    idle_reads: u64,
}

impl DeviceSession {
    /// Open the configured device. Failure here is fatal; there is no retry.
    pub async fn open(config: &DeviceConfig) -> Result<Self, DeviceError> {
        let read_timeout = Duration::from_secs(config.read_timeout_secs);
        match &config.kind {
            DeviceKind::Serial => {
                let path = config.path.display().to_string();
                tracing::info!(device = %path, baud_rate = config.baud_rate, "Opening serial device");
                let port = SerialPort::open(&config.path, config.baud_rate).map_err(|source| {
                    DeviceError::Open {
                        target: path.clone(),
                        source,
                    }
                })?;
                Ok(Self::from_reader(path, port, read_timeout))
            }
            DeviceKind::Tcp => {
                let addr = config.addr.clone();
                tracing::info!(address = %addr, "Connecting to serial bridge");
                let stream = tokio::time::timeout(TCP_CONNECT_TIMEOUT, TcpStream::connect(&addr))
                    .await
                    .map_err(|_| DeviceError::ConnectTimeout(addr.clone()))?
                    .map_err(|source| DeviceError::Open {
                        target: addr.clone(),
                        source,
                    })?;

                // Keepalive so a dead bridge surfaces as an I/O error
                let sock_ref = socket2::SockRef::from(&stream);
                let keepalive = socket2::TcpKeepalive::new()
                    .with_time(Duration::from_secs(30))
                    .with_interval(Duration::from_secs(10));
                if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
                    tracing::warn!(error = %e, "Failed to enable TCP keepalive");
                }

                Ok(Self::from_reader(addr, stream, read_timeout))
            }
            DeviceKind::Stdin => {
                tracing::info!("Reading sensor frames from stdin");
                Ok(Self::from_reader("stdin", tokio::io::stdin(), read_timeout))
            }
        }
    }

    /// Wrap any byte stream; used for stdin, tests and replay.
    pub fn from_reader<R>(name: impl Into<String>, reader: R, read_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            name: name.into(),
            reader: Some(Box::new(BufReader::new(reader))),
            read_timeout,
            pending: Vec::with_capacity(512),
            eof: false,
            lines_read: 0,
            idle_reads: 0,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub const fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub const fn idle_reads(&self) -> u64 {
        self.idle_reads
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        let line = match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(device = %self.name, "Invalid UTF-8 from device, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        self.lines_read += 1;
        line.trim_end_matches(['\r', '\n']).to_string()
    }
}

#[async_trait]
impl LineSource for DeviceSession {
    async fn read_line(&mut self) -> Result<LineRead, DeviceError> {
        if self.eof {
            return Err(DeviceError::Disconnected);
        }
        let reader = self.reader.as_mut().ok_or(DeviceError::Closed)?;

        // read_until appends to `pending`, so bytes read before a timeout
        // are kept for the next call.
        let result =
            tokio::time::timeout(self.read_timeout, reader.read_until(b'\n', &mut self.pending))
                .await;

        match result {
            Err(_) => {
                self.idle_reads += 1;
                tracing::debug!(
                    device = %self.name,
                    timeout_secs = self.read_timeout.as_secs(),
                    "No data from device within read timeout"
                );
                Ok(LineRead::Idle)
            }
            Ok(Err(e)) => Err(DeviceError::Io(e)),
            Ok(Ok(0)) => {
                if self.pending.is_empty() {
                    Err(DeviceError::Disconnected)
                } else {
                    self.eof = true;
                    Ok(LineRead::Line(self.take_line()))
                }
            }
            Ok(Ok(_)) => {
                if !self.pending.ends_with(b"\n") {
                    // Final unterminated line before EOF
                    self.eof = true;
                }
                Ok(LineRead::Line(self.take_line()))
            }
        }
    }

    async fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!(
                device = %self.name,
                lines = self.lines_read,
                "🔒 Device session closed"
            );
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(mock: tokio_test::io::Mock) -> DeviceSession {
        DeviceSession::from_reader("mock", mock, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_reads_lines_and_strips_terminators() {
        let mock = tokio_test::io::Builder::new()
            .read(b"boot ok\r\n{\n")
            .read(b"'nh3': [1]\r\n}\r\n")
            .build();
        let mut s = session(mock);
        assert_eq!(s.read_line().await.unwrap(), LineRead::Line("boot ok".into()));
        assert_eq!(s.read_line().await.unwrap(), LineRead::Line("{".into()));
        assert_eq!(s.read_line().await.unwrap(), LineRead::Line("'nh3': [1]".into()));
        assert_eq!(s.read_line().await.unwrap(), LineRead::Line("}".into()));
        assert!(matches!(s.read_line().await, Err(DeviceError::Disconnected)));
        assert_eq!(s.lines_read(), 4);
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = tokio_test::io::Builder::new()
            .read(b"{\"co\": [1,")
            .read(b" 2]}\n")
            .build();
        let mut s = session(mock);
        assert_eq!(
            s.read_line().await.unwrap(),
            LineRead::Line("{\"co\": [1, 2]}".into())
        );
    }

    #[tokio::test]
    async fn test_timeout_is_idle_and_keeps_partial_line() {
        let mock = tokio_test::io::Builder::new()
            .read(b"'temp'")
            .wait(Duration::from_millis(200))
            .read(b": [21]\n")
            .build();
        let mut s = session(mock);
        let mut idle = 0;
        let line = loop {
            match s.read_line().await.unwrap() {
                LineRead::Idle => idle += 1,
                LineRead::Line(l) => break l,
            }
        };
        assert!(idle >= 1);
        assert_eq!(line, "'temp': [21]");
        assert_eq!(s.idle_reads(), idle);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_then_disconnect() {
        let mock = tokio_test::io::Builder::new().read(b"}").build();
        let mut s = session(mock);
        assert_eq!(s.read_line().await.unwrap(), LineRead::Line("}".into()));
        assert!(matches!(s.read_line().await, Err(DeviceError::Disconnected)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_decoded_lossily() {
        let mock = tokio_test::io::Builder::new().read(b"temp \xff ok\n").build();
        let mut s = session(mock);
        assert_eq!(
            s.read_line().await.unwrap(),
            LineRead::Line("temp \u{fffd} ok".into())
        );
    }

    #[tokio::test]
    async fn test_io_error_surfaces() {
        let mock = tokio_test::io::Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let mut s = session(mock);
        assert!(matches!(s.read_line().await, Err(DeviceError::Io(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mock = tokio_test::io::Builder::new().build();
        let mut s = session(mock);
        assert!(s.is_open());
        s.close().await;
        s.close().await;
        assert!(!s.is_open());
        assert!(matches!(s.read_line().await, Err(DeviceError::Closed)));
    }

    #[tokio::test]
    async fn test_open_missing_serial_device_fails() {
        let config = DeviceConfig {
            kind: DeviceKind::Serial,
            path: "/nonexistent/ttyACM9".into(),
            ..DeviceConfig::default()
        };
        let err = DeviceSession::open(&config).await.err().unwrap();
        assert!(matches!(err, DeviceError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/ttyACM9"));
    }

    /// A node that stays silent must not keep the process alive after the
    /// session is closed.
    #[test]
    fn test_close_releases_silent_serial_device() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyQUIET0");
        let status = std::process::Command::new("mkfifo").arg(&path).status().unwrap();
        assert!(status.success());

        let config = DeviceConfig {
            kind: DeviceKind::Serial,
            path: path.clone(),
            read_timeout_secs: 1,
            ..DeviceConfig::default()
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let mut writer = runtime.block_on(async {
            let mut session = DeviceSession::open(&config).await.unwrap();
            // Held open but never written to
            let writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
            assert_eq!(session.read_line().await.unwrap(), LineRead::Idle);
            session.close().await;
            assert!(!session.is_open());
            writer
        });

        // The read end is gone once the session is closed
        let err = writer.write_all(b"{\n").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "runtime shutdown blocked by the closed device"
        );
    }
}
