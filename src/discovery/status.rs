//! Highly Available Status
//!
//! Each algorithm defines its own status type. Callers hold it as a
//! `Box<dyn HighlyAvailableStatus>` and downcast when they know the algorithm.

use std::any::Any;
use std::fmt::Debug;

/// Algorithm-defined snapshot of replication health for one node
pub trait HighlyAvailableStatus: Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    /// Status rendered for reports
    fn to_json(&self) -> serde_json::Value;
}

impl dyn HighlyAvailableStatus {
    /// Borrow the concrete status type
    pub fn downcast_ref<T: HighlyAvailableStatus>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
