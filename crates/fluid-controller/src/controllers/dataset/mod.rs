mod controller;
mod error;
mod phase;
mod reconciler;
mod request;
mod requeue;

pub use controller::*;
pub use error::*;
pub use phase::*;
pub use reconciler::*;
pub use request::*;
pub use requeue::*;
