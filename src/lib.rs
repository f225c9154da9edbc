pub mod clock;
pub mod code;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod remote_log;
pub mod resolver;
pub mod response;
pub mod server;
pub mod shortener;
pub mod store;

pub use config::Config;
pub use error::{LinkError, LinkResult};
pub use resolver::{RedirectResolver, Resolution};
pub use server::{create_app, Server};
pub use shortener::{ShortLink, ShorteningService};
pub use store::{LinkRecord, LinkStore, MemoryStore};
