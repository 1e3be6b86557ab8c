pub mod config;
pub mod connection;
pub mod context;
pub mod exception;
pub mod param;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod util;

pub use config::Config;
pub use context::{Handler, RequestContext};
pub use exception::Exception;
pub use param::{HttpRequestMethod, StatusCode};
pub use response::{Payload, ResponseFormat, ResponseFormatter};
pub use route::{ParamName, RoutePattern};
pub use router::{RouteHandle, RouteTable};
pub use server::Server;
pub use util::HtmlBuilder;
