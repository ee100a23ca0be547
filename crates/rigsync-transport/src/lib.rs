//! Transport plumbing for rigsync drivers.
//!
//! - [`TcpTransport`] / [`TcpConnector`]: sockets to rig daemons (rigctld)
//! - [`FramedTransport`]: line and length framing over any transport
//! - [`BlockingSession`]: a dedicated thread for blocking libraries and COM objects
//! - [`backoff`]: reconnect delays
//!
//! # Example
//!
//! ```no_run
//! use rigsync_transport::{FramedTransport, TcpTransport};
//! use std::time::Duration;
//!
//! # async fn example() -> rigsync_core::Result<()> {
//! let tcp = TcpTransport::connect("localhost:4532").await?;
//! let mut link = FramedTransport::new(Box::new(tcp));
//! link.send(b"f\n").await?;
//! let freq = link.read_line(Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod blocking;
pub mod framed;
pub mod tcp;

pub use blocking::BlockingSession;
pub use framed::FramedTransport;
pub use tcp::{TcpConnector, TcpTransport};
