//! Backend selection for the Burn framework.
//!
//! The NdArray CPU backend is always compiled in; the `wgpu` cargo feature
//! adds a GPU backend on top. Whether the GPU path is taken is decided once,
//! before the training loop starts, by [`accelerator_available`]; when no
//! accelerator is present the harness degrades to the CPU path instead of
//! failing.

use burn::backend::Autodiff;

/// CPU backend, always available.
pub type CpuBackend = burn::backend::NdArray<f32>;

/// Autodiff wrapper over the CPU backend, used for training.
pub type CpuTrainingBackend = Autodiff<CpuBackend>;

/// GPU backend, behind the `wgpu` feature.
#[cfg(feature = "wgpu")]
pub type GpuBackend = burn::backend::Wgpu;

/// Autodiff wrapper over the GPU backend.
#[cfg(feature = "wgpu")]
pub type GpuTrainingBackend = Autodiff<GpuBackend>;

/// One-shot probe for a usable accelerator.
pub fn accelerator_available() -> bool {
    has_nvidia_gpu() || has_amd_gpu()
}

fn has_nvidia_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc/driver/nvidia/version").exists()
            || std::path::Path::new("/dev/nvidia0").exists()
            || std::process::Command::new("nvidia-smi")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("nvidia-smi.exe")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        false
    }
}

fn has_amd_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/sys/module/amdgpu").exists()
            || std::process::Command::new("rocm-smi")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
