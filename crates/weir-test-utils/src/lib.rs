//! Test utilities and mock resource models for weir development.
//!
//! Provides small [`ResourceModel`](weir_engine::ResourceModel)
//! implementations with predictable behavior, plus a [`kernel_with`]
//! shortcut for building a kernel around one of them.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{Call, RecordingModel, SharedModel, UnimplementedModel};

use weir_core::ModelId;
use weir_engine::{Kernel, KernelConfig, ResourceModel};

/// A default-configured kernel with `model` registered as model 0.
pub fn kernel_with<M: ResourceModel>(model: M) -> (Kernel, ModelId) {
    let mut kernel = match Kernel::new(KernelConfig::default()) {
        Ok(kernel) => kernel,
        Err(e) => panic!("default kernel config rejected: {e}"),
    };
    let id = kernel.add_model(model);
    (kernel, id)
}
