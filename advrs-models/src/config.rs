use crate::bounds::Bounds;
use crate::preprocessing::Preprocessing;

/// Construction-time settings shared by every adapter.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub bounds: Bounds,
    /// `None` resolves to the adapter's `DEFAULT_CHANNEL_AXIS`.
    pub channel_axis: Option<usize>,
    pub preprocessing: Preprocessing,
}

impl ModelConfig {
    pub fn new(bounds: Bounds) -> Self {
        ModelConfig {
            bounds,
            channel_axis: None,
            preprocessing: Preprocessing::identity(),
        }
    }

    pub fn with_channel_axis(mut self, channel_axis: usize) -> Self {
        self.channel_axis = Some(channel_axis);
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: Preprocessing) -> Self {
        self.preprocessing = preprocessing;
        self
    }
}
