//! HTTP plumbing: request construction, responses and the transport

pub mod request;
pub mod response;
pub mod transport;

pub use request::{PreparedRequest, RequestFactory};
pub use response::HttpResponse;
pub use transport::{HttpTransport, ReqwestTransport, ReqwestTransportBuilder};
