//! TCP dial and accept helpers.

mod dial;
mod listener;

pub use dial::{dial_tcp, dial_tcp_with_config};
pub use listener::EventListener;
