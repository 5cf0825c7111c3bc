//! Architecture description.
//!
//! The network is described as a list of typed block records rather than
//! being hard-coded layer by layer. Spatial dimensions are traced through
//! the conv stack before any weight is allocated, so a conv/dense mismatch
//! is a startup error instead of a runtime shape panic.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Convolution padding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaddingMode {
    /// No padding; a 3x3 kernel shrinks each spatial dim by 2
    Valid,
    /// Zero padding preserving the spatial dims
    Same,
}

/// One conv block: 3x3 conv, batch norm, ReLU, square max-pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvBlockSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    pub padding: PaddingMode,
    /// Pool kernel and stride
    pub pool: usize,
}

impl ConvBlockSpec {
    pub const fn new(
        in_channels: usize,
        out_channels: usize,
        padding: PaddingMode,
        pool: usize,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            padding,
            pool,
        }
    }

    fn conv_output_size(&self, input: usize) -> Option<usize> {
        match self.padding {
            PaddingMode::Valid => input.checked_sub(2),
            PaddingMode::Same => Some(input),
        }
    }

    /// Spatial size after the conv and pool of this block, if positive.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        let after_conv = self.conv_output_size(input)?;
        let after_pool = after_conv / self.pool;
        (after_pool > 0).then_some(after_pool)
    }
}

/// One dense block: linear, batch norm, ReLU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseBlockSpec {
    pub input: usize,
    pub output: usize,
}

impl DenseBlockSpec {
    pub const fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }
}

/// Full network description: input contract, conv stack, dense stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub num_classes: usize,
    /// Square input side length the conv stack is traced against
    pub input_size: usize,
    pub in_channels: usize,
    /// Batch-norm running-stat decay for every norm layer
    pub bn_momentum: f64,
    pub conv_blocks: Vec<ConvBlockSpec>,
    pub dense_blocks: Vec<DenseBlockSpec>,
}

impl Default for NetworkConfig {
    /// Reference architecture for 512x512 inputs: five conv blocks down to a
    /// 32x4x4 feature map (512 flattened features), then two dense blocks
    /// before the classification head.
    fn default() -> Self {
        Self {
            num_classes: 4,
            input_size: 512,
            in_channels: 3,
            bn_momentum: 0.9,
            conv_blocks: vec![
                ConvBlockSpec::new(3, 16, PaddingMode::Valid, 3),
                ConvBlockSpec::new(16, 32, PaddingMode::Valid, 2),
                ConvBlockSpec::new(32, 64, PaddingMode::Same, 2),
                ConvBlockSpec::new(64, 64, PaddingMode::Same, 3),
                ConvBlockSpec::new(64, 32, PaddingMode::Valid, 3),
            ],
            dense_blocks: vec![
                DenseBlockSpec::new(512, 256),
                DenseBlockSpec::new(256, 128),
            ],
        }
    }
}

impl NetworkConfig {
    /// Trace the conv stack and return the flattened feature width.
    pub fn feature_len(&self) -> Result<usize> {
        let mut channels = self.in_channels;
        let mut size = self.input_size;

        for (idx, block) in self.conv_blocks.iter().enumerate() {
            if block.in_channels != channels {
                return Err(Error::Shape(format!(
                    "conv block {idx} expects {} input channels but receives {channels}",
                    block.in_channels
                )));
            }
            size = block.output_size(size).ok_or_else(|| {
                Error::Shape(format!(
                    "conv block {idx} collapses the spatial size to zero \
                     (input side {size}, pool {})",
                    block.pool
                ))
            })?;
            channels = block.out_channels;
        }

        Ok(channels * size * size)
    }

    /// Check the whole description for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::Shape("num_classes must be at least 1".to_string()));
        }

        let features = self.feature_len()?;

        let mut width = features;
        for (idx, dense) in self.dense_blocks.iter().enumerate() {
            if dense.input != width {
                return Err(Error::Shape(format!(
                    "dense block {idx} expects {} inputs but the previous layer \
                     produces {width}",
                    dense.input
                )));
            }
            width = dense.output;
        }

        Ok(())
    }
}
