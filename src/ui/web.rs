pub mod api;
pub mod client;
pub mod response;

pub use api::{router, start, Config};
pub use client::{ClientError, ControlClient};
