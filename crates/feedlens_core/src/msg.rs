use crate::{Classification, DiscoveredItem, FailureKind, ItemKey, ProgressEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The page finished loading; the loader overlay may be shown.
    PageLoaded,
    /// One mutation batch: feed items currently present in the document.
    ItemsDiscovered(Vec<DiscoveredItem>),
    /// The worker answered a classification request.
    /// `None` means no labels are configured and the item is left alone.
    ClassificationSucceeded {
        key: ItemKey,
        result: Option<Classification>,
    },
    /// The classification round trip failed.
    ClassificationFailed { key: ItemKey, failure: FailureKind },
    /// A scheduled retry for an item whose worker context was gone.
    RetryDue { key: ItemKey },
    /// User clicked the detail button of an item.
    DetailsToggled { key: ItemKey },
    /// User clicked "Remove negative" on an item.
    RevokeNegativeClicked { key: ItemKey },
    /// Model loading progress relayed from the worker.
    LoaderProgress(ProgressEvent),
    /// Out-of-band signal from the worker that the model is loaded.
    ModelLoaded,
    /// The delayed loader removal fired.
    LoaderRemovalDue,
}
