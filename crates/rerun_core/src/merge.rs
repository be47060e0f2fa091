use crate::WidgetStates;

/// Combines the widget states of two successive rerun requests.
///
/// Implementations must be pure: the result depends only on the two inputs.
pub trait WidgetStateMerger: Send + Sync {
    fn merge(&self, old: &WidgetStates, new: &WidgetStates) -> WidgetStates;
}

/// Values in the newer set win; widgets only present in the older set keep
/// their old value.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestValueMerger;

impl WidgetStateMerger for LatestValueMerger {
    fn merge(&self, old: &WidgetStates, new: &WidgetStates) -> WidgetStates {
        coalesce_widget_states(old, new)
    }
}

pub fn coalesce_widget_states(old: &WidgetStates, new: &WidgetStates) -> WidgetStates {
    let mut merged = old.clone();
    for (id, value) in new {
        merged.insert(id.clone(), value.clone());
    }
    merged
}
