pub mod protocol;
pub mod session;
pub mod tracer;
pub mod transport;
