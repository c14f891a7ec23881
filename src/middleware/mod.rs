pub mod connection_limit;

pub use connection_limit::{ClientIp, ConnectionGuard, connection_limit_middleware};
