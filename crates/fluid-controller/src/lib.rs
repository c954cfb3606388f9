#[macro_use]
pub mod config;
pub mod cli;
pub mod core;
pub mod start;
pub mod activation;
pub mod usage;
pub mod events;
pub mod controllers;

mod init;

#[cfg(test)]
mod fixture;

pub use init::{start_main_loop, ControllerHandle};

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dispatcher {
    pub use fluid_stream_dispatcher::*;
}
