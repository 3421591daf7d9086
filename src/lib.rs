pub mod config;
pub mod dispatcher;
pub mod exception;
pub mod listing;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod sanitizer;
pub mod server;
pub mod streamer;
pub mod util;

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use exception::{ErrorKind, Exception};
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::{Response, ResponseBody};
pub use sanitizer::{sanitize_uri, SanitizedPath};
pub use server::{handle_connection, run};
