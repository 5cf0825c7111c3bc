//! Network architecture description and implementation.

pub mod network;
pub mod spec;

pub use network::{ConvBlock, DenseBlock, Network};
pub use spec::{ConvBlockSpec, DenseBlockSpec, NetworkConfig, PaddingMode};
