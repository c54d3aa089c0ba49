//! CNN Model Architecture
//!
//! A small convolutional network for binary image classification. The
//! widening-channel, shrinking-spatial-extent stack is standard capacity
//! progression for small-image classification; dropout increases with
//! depth to match the larger parameter count of deeper layers on a corpus
//! of only a few hundred images per class.
//!
//! The network expects inputs normalized to [0, 1]; the batcher and the
//! predictor both guarantee this.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

/// Dropout rates for the three convolutional blocks, increasing with depth
const DROPOUT_RATES: [f64; 3] = [0.2, 0.3, 0.4];

/// Configuration for the classifier. Doubles as the persisted artifact's
/// architecture descriptor.
#[derive(Config, Debug)]
pub struct DinoClassifierConfig {
    /// Input image size (assumes square images)
    #[config(default = "224")]
    pub input_size: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters in the first convolutional block; later blocks double it
    #[config(default = "16")]
    pub base_filters: usize,

    /// Units in the dense hidden layer
    #[config(default = "128")]
    pub hidden_units: usize,
}

/// A CNN block: same-padded Conv2d, ReLU, 2x2 MaxPool, Dropout
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
    pub dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        dropout_rate: f64,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let dropout = DropoutConfig::new(dropout_rate).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
            dropout,
        }
    }

    /// Forward pass through the block; halves the spatial extent
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// Binary dinosaur classifier
///
/// Architecture:
/// - 3 convolutional blocks (16 -> 32 -> 64 filters), each with ReLU,
///   max-pooling, and increasing dropout
/// - Flatten
/// - Dense hidden layer (128 units, ReLU)
/// - Single-unit output head; `forward` returns the raw logit,
///   `forward_probability` the sigmoid probability of the positive class
#[derive(Module, Debug)]
pub struct DinoClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    input_size: usize,
}

impl<B: Backend> DinoClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &DinoClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let conv1 = ConvBlock::new(config.in_channels, base, 3, DROPOUT_RATES[0], device);
        let conv2 = ConvBlock::new(base, base * 2, 3, DROPOUT_RATES[1], device);
        let conv3 = ConvBlock::new(base * 2, base * 4, 3, DROPOUT_RATES[2], device);

        // Three 2x2 pools leave input_size / 8 per side
        let feature_edge = config.input_size / 8;
        let flattened = base * 4 * feature_edge * feature_edge;

        let fc1 = LinearConfig::new(flattened, config.hidden_units).init(device);
        let fc2 = LinearConfig::new(config.hidden_units, 1).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            fc1,
            fc2,
            input_size: config.input_size,
        }
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width],
    ///   values in [0, 1]
    ///
    /// # Returns
    /// * Logit tensor of shape [batch_size, 1]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with sigmoid: probability of the positive class,
    /// shape [batch_size, 1], values in [0, 1]
    pub fn forward_probability(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        sigmoid(self.forward(x))
    }

    /// Expected input edge length
    pub fn input_size(&self) -> usize {
        self.input_size
    }
}
