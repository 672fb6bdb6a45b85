//! Command handlers, one module per subcommand.

pub mod devices;
pub mod energy;
pub mod send;
pub mod util;
pub mod watch;
