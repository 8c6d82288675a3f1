use datasize::DataSize;

/// Channel-major storage of several scalar grids of equal length.
#[derive(Clone, Debug, Default, PartialEq, DataSize)]
pub struct Channels {
    data: Vec<f64>,
    channels: usize,
}

impl Channels {
    pub fn new(channels: usize, points: usize) -> Self {
        Self {
            data: vec![0.0; channels * points],
            channels,
        }
    }

    /// Number of points in each channel.
    pub fn len(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }

        self.data.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn storage(&self) -> &[f64] {
        &self.data
    }

    pub fn storage_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn channel(&self, channel: usize) -> &[f64] {
        assert!(channel < self.channels, "channel {channel} out of range");
        let stride = self.len();
        &self.data[stride * channel..stride * (channel + 1)]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f64] {
        assert!(channel < self.channels, "channel {channel} out of range");
        let stride = self.len();
        &mut self.data[stride * channel..stride * (channel + 1)]
    }

    /// Disjoint mutable views of every channel.
    pub fn channels_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        let stride = self.len().max(1);
        self.data.chunks_exact_mut(stride)
    }

    pub fn copy_from(&mut self, other: &Channels) {
        self.data.clone_from(&other.data);
        self.channels = other.channels;
    }
}
