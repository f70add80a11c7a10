use std::sync::Arc;
use std::time::{Duration, Instant};

use elements_core::models::{
    DispatchResult, ElementDefinition, ElementReference, SlotLayout,
};
use elements_core::ElementsError;
use elements_dispatcher::{reassemble, DispatchSettings, ElementDispatcher, ElementRegistry};
use elements_testing_utils::{request_for, DefinitionBuilder, Script, ScriptedFactory};
use serde_json::json;

fn delayed(name: &str, millis: u64) -> ElementDefinition {
    DefinitionBuilder::new("page", name)
        .with_factory(ScriptedFactory::new(Script::Delayed(
            Duration::from_millis(millis),
            json!({ "name": name }),
        )))
        .build()
}

fn dispatcher(definitions: Vec<ElementDefinition>) -> ElementDispatcher {
    ElementDispatcher::new(
        Arc::new(ElementRegistry::from_definitions(definitions)),
        None,
        DispatchSettings::default(),
    )
}

fn names(results: &[DispatchResult]) -> Vec<&str> {
    results
        .iter()
        .map(|result| result.field("name").and_then(|v| v.as_str()).unwrap_or("-"))
        .collect()
}

#[tokio::test]
async fn test_slot_order_is_preserved_and_gaps_removed() {
    let dispatcher = dispatcher(vec![
        delayed("first", 60),
        delayed("second", 30),
        delayed("third", 0),
    ]);
    let layout: SlotLayout = serde_json::from_value(json!({
        "content": ["page.first", null, "page.second", "page.third"]
    }))
    .unwrap();

    let resolved = dispatcher
        .dispatch_slots(&layout, &request_for("/"))
        .await
        .unwrap();

    let content = resolved.get("content").unwrap();
    assert_eq!(names(content), vec!["first", "second", "third"]);
    let positions: Vec<_> = content.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![Some(0), Some(2), Some(3)]);
    assert!(content.iter().all(|r| r.slot_name.as_deref() == Some("content")));
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let dispatcher = dispatcher(vec![
        DefinitionBuilder::new("page", "broken")
            .with_factory(ScriptedFactory::new(Script::Reject("boom".into())))
            .build(),
        DefinitionBuilder::new("page", "hero")
            .with_factory(ScriptedFactory::resolving(json!({"title": "Welcome"})))
            .build(),
    ]);
    let layout = SlotLayout::new()
        .with_slot("header", ["page.broken"])
        .with_slot("content", ["page.hero", "page.unknown"]);

    let resolved = dispatcher
        .dispatch_slots(&layout, &request_for("/"))
        .await
        .unwrap();

    let header = resolved.get("header").unwrap();
    assert_eq!(header.len(), 1);
    assert!(header[0].is_error);

    let content = resolved.get("content").unwrap();
    assert_eq!(content.len(), 2);
    assert!(!content[0].is_error);
    assert_eq!(content[0].field("title"), Some(&json!("Welcome")));
    assert!(content[1].does_not_exist);
}

#[tokio::test]
async fn test_elements_run_concurrently() {
    let definitions: Vec<_> = (0..6).map(|i| delayed(&format!("e{i}"), 150)).collect();
    let dispatcher = dispatcher(definitions);
    let mut layout = SlotLayout::new();
    for i in 0..6 {
        layout.push(if i % 2 == 0 { "content" } else { "footer" }, format!("page.e{i}"));
    }

    let started = Instant::now();
    let resolved = dispatcher
        .dispatch_slots(&layout, &request_for("/"))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(names(resolved.get("content").unwrap()), vec!["e0", "e2", "e4"]);
    assert_eq!(names(resolved.get("footer").unwrap()), vec!["e1", "e3", "e5"]);
}

#[tokio::test]
async fn test_unlisted_slots_are_dispatched() {
    let dispatcher = dispatcher(vec![delayed("aside", 0), delayed("hero", 0)]);
    let layout = SlotLayout::new()
        .with_slot("sidebar", ["page.aside"])
        .with_slot("content", ["page.hero"])
        .with_slot("empty", Vec::<&str>::new());

    let resolved = dispatcher
        .dispatch_slots(&layout, &request_for("/"))
        .await
        .unwrap();

    assert_eq!(names(resolved.get("sidebar").unwrap()), vec!["aside"]);
    assert_eq!(names(resolved.get("content").unwrap()), vec!["hero"]);
    assert!(resolved.get("empty").unwrap().is_empty());
}

#[tokio::test]
async fn test_submission_order_follows_priority_then_name() {
    let dispatcher = ElementDispatcher::new(
        Arc::new(ElementRegistry::default()),
        None,
        DispatchSettings::default().with_slot_order(["header", "content"]),
    );
    let layout = SlotLayout::new()
        .with_slot("sidebar", ["a.b"])
        .with_slot("content", ["a.b"])
        .with_slot("aside", ["a.b"])
        .with_slot("header", ["a.b"]);

    assert_eq!(
        dispatcher.submission_order(&layout),
        vec!["header", "content", "aside", "sidebar"]
    );
}

#[tokio::test]
async fn test_input_layout_is_untouched() {
    let dispatcher = dispatcher(vec![delayed("hero", 0)]);
    let layout = SlotLayout::new().with_slot(
        "content",
        [ElementReference::new("page.hero").with_config_overwrite(Some(json!({"x": 1})))],
    );
    let before = layout.clone();

    dispatcher
        .dispatch_elements_in_slots(&layout, &request_for("/"))
        .await
        .unwrap();

    assert_eq!(layout, before);
    assert!(layout.get("content").unwrap()[0]
        .as_ref()
        .unwrap()
        .slot_name
        .is_none());
}

#[test]
fn test_reassemble_rejects_unplaced_results() {
    let layout = SlotLayout::new().with_slot("content", ["a.b"]);

    let unplaced = reassemble(&layout, vec![DispatchResult::new("a.b")]);
    assert!(matches!(unplaced, Err(ElementsError::Reassembly(_))));

    let out_of_range = reassemble(
        &layout,
        vec![DispatchResult::new("a.b").located(Some("content".into()), Some(5), "/")],
    );
    assert!(matches!(out_of_range, Err(ElementsError::Reassembly(_))));
}
