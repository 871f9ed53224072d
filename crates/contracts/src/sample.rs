//! Sample - element type of every handler endpoint channel

use crate::Metric;

/// One element on an endpoint channel.
///
/// Control signals travel on the data channel so they stay ordered with
/// respect to the metrics sent before them.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    /// A real measurement
    Data(Metric),
    /// Flush the pending batch now and keep listening
    Flush,
    /// Stop listening; the pending batch is discarded
    Close,
}

impl Sample {
    pub fn is_control(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}

impl From<Metric> for Sample {
    fn from(metric: Metric) -> Self {
        Self::Data(metric)
    }
}
