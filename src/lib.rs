// #![warn(missing_docs)]

#[macro_use]
extern crate log;

pub mod arena;
pub mod bindings;
pub mod client;
pub mod config;
pub mod geometry;
pub mod hints;
pub mod layout;
pub mod monitor;
pub mod wm;
pub mod xconnection;

#[cfg(test)]
pub(crate) mod mock;

pub use arena::{ClientArena, ClientId, Detached};
pub use client::{Client, Mode, ModeFilter, State};
pub use config::Config;
pub use geometry::{Rectangle, Strut};
pub use hints::SizeHints;
pub use monitor::{Monitor, MonitorId};
pub use wm::WindowManager;
pub use xconnection::{XConn, XcbConnection};

/// What an operation needs to reach the display server: the connection and
/// the user configuration. Built once per event and passed down by reference.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub conn: &'a dyn XConn,
    pub config: &'a Config,
}

impl<'a> Context<'a> {
    pub fn new(conn: &'a dyn XConn, config: &'a Config) -> Context<'a> {
        Context { conn, config }
    }
}
