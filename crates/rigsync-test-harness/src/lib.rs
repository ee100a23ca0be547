//! rigsync-test-harness: mocks and simulators for testing rigsync without
//! a radio.
//!
//! - [`MockTransport`] / [`MockConnector`]: scripted byte streams for codec tests
//! - [`MockTcpServer`]: a scripted peer on a real localhost socket
//! - [`SimulatedRig`] / [`ScriptedDriver`]: a [`RigDriver`](rigsync_core::RigDriver)
//!   test double with fault injection, for facade and polling tests

pub mod mock_connector;
pub mod mock_tcp;
pub mod mock_transport;
pub mod sim_driver;

pub use mock_connector::MockConnector;
pub use mock_tcp::MockTcpServer;
pub use mock_transport::MockTransport;
pub use sim_driver::{ScriptedDriver, SimulatedRig};
