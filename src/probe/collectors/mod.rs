mod dns;
mod http;
pub mod rtt;
mod tcp;

pub use dns::Dns;
pub use http::{Http, Response};
pub use tcp::Tcp;
