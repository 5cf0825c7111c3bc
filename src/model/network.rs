//! CNN classifier built from an architecture description.
//!
//! The network normalizes its input with a leading batch-norm layer, runs
//! the conv stack, flattens, runs the dense stack and finishes with a plain
//! linear head producing raw logits. Training/eval behavior of the norm
//! layers follows the backend: an autodiff backend trains, its inner
//! backend (via `model.valid()`) evaluates with running statistics.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{
    BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
};
use burn::prelude::*;

use crate::error::Result;
use crate::model::spec::{ConvBlockSpec, DenseBlockSpec, NetworkConfig, PaddingMode};

/// Conv block: 3x3 conv, batch norm, ReLU, max pool.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(spec: &ConvBlockSpec, bn_momentum: f64, device: &B::Device) -> Self {
        let padding = match spec.padding {
            PaddingMode::Valid => PaddingConfig2d::Valid,
            PaddingMode::Same => PaddingConfig2d::Same,
        };

        Self {
            conv: Conv2dConfig::new([spec.in_channels, spec.out_channels], [3, 3])
                .with_padding(padding)
                .init(device),
            bn: BatchNormConfig::new(spec.out_channels)
                .with_momentum(bn_momentum)
                .init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([spec.pool, spec.pool])
                .with_strides([spec.pool, spec.pool])
                .init(),
        }
    }

    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Dense block: linear, batch norm, ReLU.
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    linear: Linear<B>,
    bn: BatchNorm<B, 0>,
    relu: Relu,
}

impl<B: Backend> DenseBlock<B> {
    fn new(spec: &DenseBlockSpec, bn_momentum: f64, device: &B::Device) -> Self {
        Self {
            linear: LinearConfig::new(spec.input, spec.output).init(device),
            bn: BatchNormConfig::new(spec.output)
                .with_momentum(bn_momentum)
                .init(device),
            relu: Relu::new(),
        }
    }

    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(input);
        let x = self.bn.forward(x);
        self.relu.forward(x)
    }
}

/// The full classifier.
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    center: BatchNorm<B, 2>,
    conv_blocks: Vec<ConvBlock<B>>,
    dense_blocks: Vec<DenseBlock<B>>,
    head: Linear<B>,
}

impl<B: Backend> Network<B> {
    /// Build the network on `device`, validating the description first.
    pub fn new(config: &NetworkConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let features = config.feature_len()?;

        let conv_blocks = config
            .conv_blocks
            .iter()
            .map(|spec| ConvBlock::new(spec, config.bn_momentum, device))
            .collect();

        let dense_blocks: Vec<DenseBlock<B>> = config
            .dense_blocks
            .iter()
            .map(|spec| DenseBlock::new(spec, config.bn_momentum, device))
            .collect();

        let head_in = config
            .dense_blocks
            .last()
            .map_or(features, |dense| dense.output);

        Ok(Self {
            center: BatchNormConfig::new(config.in_channels)
                .with_momentum(config.bn_momentum)
                .init(device),
            conv_blocks,
            dense_blocks,
            head: LinearConfig::new(head_in, config.num_classes).init(device),
        })
    }

    /// Forward pass from `[N, C, H, W]` images to `[N, num_classes]` logits.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut feat = self.center.forward(images);
        for block in &self.conv_blocks {
            feat = block.forward(feat);
        }

        let [batch, channels, height, width] = feat.dims();
        let mut flat = feat.reshape([batch, channels * height * width]);

        for block in &self.dense_blocks {
            flat = block.forward(flat);
        }

        self.head.forward(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spec::{ConvBlockSpec, DenseBlockSpec, PaddingMode};
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    // 14x14 input, one valid conv (12) pooled by 3 (4): 4 channels * 4 * 4
    // gives 64 flattened features.
    fn tiny_config() -> NetworkConfig {
        NetworkConfig {
            num_classes: 2,
            input_size: 14,
            in_channels: 3,
            bn_momentum: 0.9,
            conv_blocks: vec![ConvBlockSpec::new(3, 4, PaddingMode::Valid, 3)],
            dense_blocks: vec![DenseBlockSpec::new(64, 16)],
        }
    }

    #[test]
    fn test_forward_produces_logits_per_class() {
        let device = Default::default();
        let network = Network::<TestBackend>::new(&tiny_config(), &device).unwrap();

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 14, 14], &device);
        let logits = network.forward(images);
        assert_eq!(logits.dims(), [2, 2]);
    }

    #[test]
    fn test_eval_forward_is_idempotent() {
        let device = Default::default();
        let network = Network::<TestBackend>::new(&tiny_config(), &device).unwrap();

        let images = Tensor::<TestBackend, 4>::ones([2, 3, 14, 14], &device);
        let first: Vec<f32> = network
            .forward(images.clone())
            .into_data()
            .to_vec()
            .unwrap();
        let second: Vec<f32> = network.forward(images).into_data().to_vec().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_inconsistent_description_is_rejected() {
        let device = Default::default();
        let config = NetworkConfig {
            dense_blocks: vec![DenseBlockSpec::new(100, 16)],
            ..tiny_config()
        };
        assert!(Network::<TestBackend>::new(&config, &device).is_err());
    }
}
