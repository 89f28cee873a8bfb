use std::time::Duration;

use crate::ItemKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a `CLASSIFY_POST` request for the item's description text.
    RequestClassification { key: ItemKey, content: String },
    /// Re-run the whole classify-and-paint sequence for the item after `delay`.
    ScheduleRetry { key: ItemKey, delay: Duration },
    /// Remove the loader overlay after `delay`.
    ScheduleLoaderRemoval { delay: Duration },
}
