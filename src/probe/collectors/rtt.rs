//! Kernel round trip time of an established `TCP` connection.
//!
//! The kernel keeps a smoothed RTT estimate for every `TCP` socket, available
//! through `getsockopt(IPPROTO_TCP, TCP_INFO)`. Only Linux exposes it in that
//! form; everywhere else [`TcpInfo`] reports [`RttError::Unsupported`] and the
//! probe records success/failure only. [`SUPPORTED`] tells which case applies.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::probe::errors::RttError;

/// Whether this platform can report a kernel RTT.
pub const SUPPORTED: bool = cfg!(target_os = "linux");

/// A source of round trip time samples for established connections.
pub trait RoundTripTime: Send + Sync {
  fn round_trip_time(&self, stream: &TcpStream) -> Result<Duration, RttError>;
}

/// Reads the RTT from the kernel `tcp_info` structure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpInfo;

impl RoundTripTime for TcpInfo {
  #[cfg(target_os = "linux")]
  fn round_trip_time(&self, stream: &TcpStream) -> Result<Duration, RttError> {
    use std::os::fd::AsRawFd;

    sys::round_trip_time(stream.as_raw_fd())
  }

  #[cfg(not(target_os = "linux"))]
  fn round_trip_time(&self, _stream: &TcpStream) -> Result<Duration, RttError> {
    Err(RttError::Unsupported)
  }
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
mod sys {
  use std::io;
  use std::mem;
  use std::os::fd::RawFd;
  use std::time::Duration;

  use crate::probe::errors::RttError;

  fn getsockopt<T>(
    fd: RawFd,
    level: libc::c_int,
    name: libc::c_int,
    value: &mut T,
  ) -> io::Result<()> {
    let mut len = mem::size_of::<T>() as libc::socklen_t;
    // SAFETY: `value` is a valid, writable `T` of `len` bytes.
    let ret = unsafe { libc::getsockopt(fd, level, name, (value as *mut T).cast(), &mut len) };

    if ret != 0 {
      return Err(io::Error::last_os_error());
    }

    Ok(())
  }

  pub fn round_trip_time(fd: RawFd) -> Result<Duration, RttError> {
    // SAFETY: F_GETFD only inspects the descriptor table.
    if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
      return Err(RttError::Descriptor(io::Error::last_os_error()));
    }

    let mut protocol: libc::c_int = 0;
    getsockopt(fd, libc::SOL_SOCKET, libc::SO_PROTOCOL, &mut protocol)
      .map_err(RttError::Descriptor)?;

    if protocol != libc::IPPROTO_TCP {
      return Err(RttError::NotTcp { protocol });
    }

    // SAFETY: `tcp_info` is plain old data, all-zero is a valid value.
    let mut info: libc::tcp_info = unsafe { mem::zeroed() };
    getsockopt(fd, libc::IPPROTO_TCP, libc::TCP_INFO, &mut info).map_err(RttError::Query)?;

    Ok(Duration::from_micros(u64::from(info.tcpi_rtt)))
  }

}
