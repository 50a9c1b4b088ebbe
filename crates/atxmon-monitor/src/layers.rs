//! Layer/epoch arithmetic.

use crate::error::MonitorError;

/// Default number of layers composing one epoch.
pub const LAYERS_PER_EPOCH: u64 = 5;

/// How layers group into epochs for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochLayout {
    layers_per_epoch: u64,
}

impl Default for EpochLayout {
    fn default() -> Self {
        Self {
            layers_per_epoch: LAYERS_PER_EPOCH,
        }
    }
}

impl EpochLayout {
    pub fn new(layers_per_epoch: u64) -> Result<Self, MonitorError> {
        if layers_per_epoch == 0 {
            return Err(MonitorError::InvalidLayout(
                "layers_per_epoch must be > 0".to_string(),
            ));
        }
        Ok(Self { layers_per_epoch })
    }

    pub fn layers_per_epoch(&self) -> u64 {
        self.layers_per_epoch
    }

    /// `floor(layer / layers_per_epoch)`.
    pub fn epoch_of(&self, layer: u64) -> u64 {
        layer / self.layers_per_epoch
    }

    /// The epoch immediately before the one containing `latest_layer`, i.e.
    /// the most recent epoch known to be complete.
    ///
    /// `None` while the network is still in its first epoch.
    pub fn epoch_to_monitor(&self, latest_layer: u64) -> Option<u64> {
        self.epoch_of(latest_layer).checked_sub(1)
    }

    /// First layer whose release tick opens `epoch`'s window.
    pub fn start_layer(&self, epoch: u64) -> u64 {
        epoch.saturating_mul(self.layers_per_epoch).saturating_add(1)
    }

    /// Last layer whose release tick closes `epoch`'s window.
    pub fn end_layer(&self, epoch: u64) -> u64 {
        epoch.saturating_add(1).saturating_mul(self.layers_per_epoch)
    }
}
