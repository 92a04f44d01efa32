//! TCP readiness probing.
//!
//! A probe is a single bounded connection attempt. Retrying is left to the
//! readiness loop in `monitoring`.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

const PROBE_TARGET: &str = "fleetctl::probe";

/// Answers whether something accepts TCP connections on a host and port.
#[cfg_attr(test, mockall::automock)]
pub trait PortProbe {
    fn is_listening(&self, host: &str, port: u16) -> bool;
}

/// Probe performing a real `connect(2)` bounded by a timeout.
#[derive(Debug, Clone, Copy)]
pub struct TcpPortProbe {
    timeout: Duration,
}

impl TcpPortProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl PortProbe for TcpPortProbe {
    fn is_listening(&self, host: &str, port: u16) -> bool {
        match try_connect(host, port, self.timeout) {
            Ok(()) => true,
            Err(error) if is_refusal(&error) => {
                trace!(target: PROBE_TARGET, host, port, "nothing listening");
                false
            }
            Err(error) => {
                debug!(target: PROBE_TARGET, host, port, %error, "probe failed");
                false
            }
        }
    }
}

fn try_connect(host: &str, port: u16, timeout: Duration) -> io::Result<()> {
    let addresses = (host, port).to_socket_addrs()?;
    connect_before(addresses, Instant::now() + timeout)
}

/// Tries each address in turn; all attempts together end at `deadline`.
fn connect_before(
    addresses: impl IntoIterator<Item = SocketAddr>,
    deadline: Instant,
) -> io::Result<()> {
    let mut last_error =
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved address");
    for address in addresses {
        let Some(budget) = deadline
            .checked_duration_since(Instant::now())
            .filter(|budget| !budget.is_zero())
        else {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "probe timeout spent before every address was tried",
            ));
        };
        match TcpStream::connect_timeout(&address, budget) {
            Ok(_) => return Ok(()),
            Err(error) => last_error = error,
        }
    }
    Err(last_error)
}

/// Determines whether an I/O error simply means nobody is listening.
///
/// Timeouts and permission problems are reported separately in the logs
/// even though the probe answer is the same.
fn is_refusal(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::AddrNotAvailable
    )
}
