//!
//! # Runtime
//!
//! Engine specific cache runtimes bound 1:1 to a dataset with the same namespace and name.
//! The dataset controller only reads them to find out which engine serves a dataset.
//!
mod alluxio;
mod status;

pub use alluxio::*;
pub use status::*;

use crate::core::Spec;

/// Runtime kind served by a specific caching engine
pub trait RuntimeSpec: Spec<Status = RuntimeStatus> {
    /// engine type tag, used as key for engine controller activation
    const ENGINE: &'static str;
}

mod convert {

    use crate::core::{Spec, Status};
    use super::*;

    impl Spec for AlluxioRuntimeSpec {
        const LABEL: &'static str = "AlluxioRuntime";

        type Status = RuntimeStatus;
    }

    impl RuntimeSpec for AlluxioRuntimeSpec {
        const ENGINE: &'static str = "alluxio";
    }

    impl Status for RuntimeStatus {}
}
