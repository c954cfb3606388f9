mod spec;
mod status;

pub use spec::*;
pub use status::*;

mod convert {

    use crate::core::{Spec, Status};
    use super::*;

    impl Spec for DatasetSpec {
        const LABEL: &'static str = "Dataset";

        type Status = DatasetStatus;
    }

    impl Status for DatasetStatus {}
}
