//! File-to-socket transmission.
//!
//! On Linux a request is served by `sendfile(2)`, so file pages go from the
//! page cache to the socket without passing through user space. The kernel
//! may accept less than requested, or report `EAGAIN` when the socket buffer
//! is full on a non-blocking socket. Both cases are handled here by waiting
//! and continuing, so callers see a single blocking call per request.
//!
//! Other platforms stage the range through a buffer with the same contract.

use std::fs::File;
use std::net::TcpStream;

use crate::error::{Error, Result};

#[cfg(target_os = "linux")]
mod imp {
    use std::fs::File;
    use std::io;
    use std::net::TcpStream;
    use std::os::unix::io::{AsRawFd, RawFd};

    use crate::error::{Error, Result};
    use crate::MAX_TRANSMIT_SIZE;

    #[allow(unsafe_code)]
    pub(super) fn transmit(socket: &TcpStream, file: &File, offset: u64, len: u64) -> Result<()> {
        let out_fd = socket.as_raw_fd();
        let in_fd = file.as_raw_fd();
        let mut sent = 0u64;

        while sent < len {
            let mut file_offset =
                libc::off_t::try_from(offset + sent).map_err(|_| Error::Transmit {
                    offset,
                    len,
                    source: io::Error::from(io::ErrorKind::InvalidInput),
                })?;
            let count = usize::try_from((len - sent).min(MAX_TRANSMIT_SIZE)).unwrap_or(usize::MAX);

            // SAFETY: both descriptors belong to handles borrowed for the whole
            // call, and `file_offset` is a live local the kernel may update.
            let rc = unsafe { libc::sendfile(out_fd, in_fd, &mut file_offset, count) };

            if rc < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted => {}
                    io::ErrorKind::WouldBlock => wait_writable(out_fd)?,
                    _ => {
                        return Err(Error::Transmit {
                            offset,
                            len,
                            source: err,
                        })
                    }
                }
                continue;
            }

            if rc == 0 {
                return Err(Error::ShortTransmit {
                    offset,
                    expected: len,
                    sent,
                });
            }

            sent += rc.unsigned_abs() as u64;
        }

        Ok(())
    }

    /// Block until the socket can accept more data.
    #[allow(unsafe_code)]
    fn wait_writable(fd: RawFd) -> Result<()> {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLOUT,
            revents: 0,
        };

        loop {
            // SAFETY: `pfd` is a valid pollfd for the duration of the call and
            // the count passed is 1.
            let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
            if rc >= 0 {
                // POLLERR and POLLHUP surface as an error on the next sendfile.
                return Ok(());
            }

            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(Error::Wait(err));
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::fs::File;
    use std::io::{self, Read, Seek, SeekFrom};
    use std::net::TcpStream;

    use crate::error::{Error, Result};

    pub(super) fn transmit(socket: &TcpStream, file: &File, offset: u64, len: u64) -> Result<()> {
        let as_transmit_error = |source| Error::Transmit {
            offset,
            len,
            source,
        };

        let mut handle = file;
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(as_transmit_error)?;

        let mut range = handle.take(len);
        let mut out = socket;
        let sent = io::copy(&mut range, &mut out).map_err(as_transmit_error)?;

        if sent < len {
            return Err(Error::ShortTransmit {
                offset,
                expected: len,
                sent,
            });
        }
        Ok(())
    }
}

/// Transmit `len` bytes of `file` from `offset` onto `socket`, blocking until done.
///
/// The file's own cursor is not used on Linux; on other platforms it is moved.
///
/// # Errors
///
/// Returns [`Error::Transmit`] on a transport error, [`Error::Wait`] if
/// waiting for the socket fails, and [`Error::ShortTransmit`] if the file
/// holds fewer than `offset + len` bytes.
pub fn transmit_file(socket: &TcpStream, file: &File, offset: u64, len: u64) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    imp::transmit(socket, file, offset, len).inspect_err(|e| {
        if !matches!(e, Error::ShortTransmit { .. }) {
            tracing::debug!("Transmit of {} bytes at offset {} failed: {}", len, offset, e);
        }
    })
}
