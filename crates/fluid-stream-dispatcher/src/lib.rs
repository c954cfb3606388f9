pub mod metadata;
pub mod dispatcher;
pub mod queue;

mod error;

pub use error::StoreError;

pub mod core {
    pub use fluid_controlplane_metadata::core::*;
}
