//! Non-blocking serial port
//!
//! The tty is opened with `O_NONBLOCK` and registered with the tokio reactor
//! through [`AsyncFd`], so no read is ever parked on a blocking thread.
//! Dropping the port closes the descriptor immediately, even when the node
//! has been silent for hours.
//!
//! For a real tty the line is switched to raw 8N1 at the configured baud
//! rate. Other pollable nodes (FIFOs, pseudo-terminals used in tests) are
//! read as they are.

use std::fs::File;
use std::io::{self, Read};
use std::mem::MaybeUninit;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, ReadBuf};

/// Baud rates the line can be configured for.
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115_200];

pub const fn is_supported_baud_rate(baud: u32) -> bool {
    baud_constant(baud).is_some()
}

const fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    match baud {
        1200 => Some(libc::B1200),
        2400 => Some(libc::B2400),
        4800 => Some(libc::B4800),
        9600 => Some(libc::B9600),
        19200 => Some(libc::B19200),
        38400 => Some(libc::B38400),
        57600 => Some(libc::B57600),
        115_200 => Some(libc::B115200),
        _ => None,
    }
}

/// A read-only serial device driven by the tokio reactor.
#[derive(Debug)]
pub struct SerialPort {
    fd: AsyncFd<File>,
}

impl SerialPort {
    /// Open `path` for non-blocking reads and, if it is a tty, configure it
    /// as raw 8N1 at `baud_rate`.
    pub fn open(path: &Path, baud_rate: u32) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(path)?;

        if is_tty(&file) {
            configure_line(&file, baud_rate)?;
            tracing::debug!(device = %path.display(), baud_rate, "Serial line set to raw 8N1");
        } else {
            tracing::debug!(device = %path.display(), "Not a tty, reading without line setup");
        }

        Ok(Self {
            fd: AsyncFd::new(file)?,
        })
    }
}

impl AsyncRead for SerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.fd.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| {
                let mut file: &File = inner.get_ref();
                file.read(unfilled)
            }) {
                Ok(Ok(n)) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                // Spurious readiness; readiness was cleared, poll again
                Err(_would_block) => continue,
            }
        }
    }
}

#[allow(unsafe_code)]
fn is_tty(file: &File) -> bool {
    unsafe { libc::isatty(file.as_raw_fd()) == 1 }
}

#[allow(unsafe_code)]
fn configure_line(file: &File, baud_rate: u32) -> io::Result<()> {
    let speed = baud_constant(baud_rate).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported baud rate {baud_rate}"),
        )
    })?;
    let fd = file.as_raw_fd();

    let mut termios = MaybeUninit::<libc::termios>::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    unsafe {
        libc::cfmakeraw(&mut termios);
        if libc::cfsetispeed(&mut termios, speed) != 0 || libc::cfsetospeed(&mut termios, speed) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    // Ignore modem control lines, enable the receiver
    termios.c_cflag |= libc::CLOCAL | libc::CREAD;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
