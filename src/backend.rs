//! Backend selection
//!
//! The CPU `NdArray` backend is the default; the `wgpu` cargo feature swaps
//! in GPU execution. The dataset fits in memory at this scale, so CPU
//! training is the expected configuration.

use burn::backend::Autodiff;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device for the selected backend
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "wgpu (GPU)"
    }
    #[cfg(not(feature = "wgpu"))]
    {
        "ndarray (CPU)"
    }
}
