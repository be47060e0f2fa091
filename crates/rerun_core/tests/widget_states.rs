use pretty_assertions::assert_eq;
use rerun_core::{coalesce_widget_states, WidgetId, WidgetStates, WidgetValue};

#[test]
fn merge_keeps_old_only_entries_and_prefers_new_values() {
    let old = WidgetStates::new()
        .with("slider", WidgetValue::Int(3))
        .with("name", WidgetValue::Text("ada".to_string()));
    let new = WidgetStates::new()
        .with("slider", WidgetValue::Int(9))
        .with("submit", WidgetValue::Trigger(true));

    let merged = coalesce_widget_states(&old, &new);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get("slider"), Some(&WidgetValue::Int(9)));
    assert_eq!(
        merged.get("name"),
        Some(&WidgetValue::Text("ada".to_string()))
    );
    assert_eq!(merged.get("submit"), Some(&WidgetValue::Trigger(true)));
    assert!(!merged.contains(&WidgetId::new("missing")));
}

#[test]
fn merge_does_not_touch_inputs() {
    let old = WidgetStates::new().with("a", WidgetValue::Bool(false));
    let new = WidgetStates::new().with("a", WidgetValue::Bool(true));

    let _ = coalesce_widget_states(&old, &new);

    assert_eq!(old.get("a"), Some(&WidgetValue::Bool(false)));
    assert_eq!(new.get("a"), Some(&WidgetValue::Bool(true)));
}

#[test]
fn widget_states_parse_from_json_objects() {
    let parsed: WidgetStates = serde_json::from_str(
        r#"{"checkbox": {"bool": true}, "tags": {"text_list": ["a", "b"]}, "ratio": {"float": 0.5}}"#,
    )
    .unwrap();

    let ids: Vec<_> = parsed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["checkbox", "ratio", "tags"]);
    assert_eq!(
        parsed.get("tags"),
        Some(&WidgetValue::TextList(vec!["a".into(), "b".into()]))
    );
}

#[test]
fn reset_triggers_clears_fired_triggers_only() {
    let mut states = WidgetStates::new()
        .with("submit", WidgetValue::Trigger(true))
        .with("idle", WidgetValue::Trigger(false))
        .with("agree", WidgetValue::Bool(true));

    states.reset_triggers();

    assert_eq!(states.get("submit"), Some(&WidgetValue::Trigger(false)));
    assert_eq!(states.get("idle"), Some(&WidgetValue::Trigger(false)));
    assert_eq!(states.get("agree"), Some(&WidgetValue::Bool(true)));
}
