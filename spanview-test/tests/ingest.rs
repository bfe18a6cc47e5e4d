use anyhow::Result;
use spanview::loader::load_trace;
use spanview_core::focus::{FocusAction, QueryRef};
use spanview_core::{ingest, Config, RefType, TraceError};
use spanview_test::harness::TestView;
use spanview_test::fixtures::{checkout_json, CHECKOUT_TRACE_ID, INVENTORY_TRACE_ID};

#[test]
fn fixture_parses_into_tree_ordered_traces() -> Result<()> {
    let traces = ingest::traces_from_json(&checkout_json())?;
    assert_eq!(traces.len(), 2);

    let checkout = &traces[0];
    assert_eq!(checkout.trace_id, CHECKOUT_TRACE_ID);
    let order: Vec<&str> = checkout.spans.iter().map(|s| s.span_id.as_str()).collect();
    assert_eq!(
        order,
        vec!["a1a1a1a1", "d4d4d4d4", "b2b2b2b2", "c3c3c3c3", "e5e5e5e5"]
    );
    assert_eq!(checkout.duration, 100_000);
    assert_eq!(checkout.span("c3c3c3c3").map(|s| s.depth), Some(2));
    assert_eq!(
        checkout
            .span("e5e5e5e5")
            .and_then(|s| s.parent_ref_type()),
        Some(RefType::FollowsFrom)
    );
    Ok(())
}

#[test]
fn loader_picks_trace_by_id() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("spanview-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("traces.json");
    std::fs::write(&path, checkout_json())?;

    let first = load_trace(&path, None)?;
    assert_eq!(first.trace_id, CHECKOUT_TRACE_ID);

    let inventory = load_trace(&path, Some(INVENTORY_TRACE_ID))?;
    assert_eq!(inventory.len(), 2);

    assert!(load_trace(&path, Some("missing")).is_err());
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn link_resolves_against_a_non_first_trace() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("spanview-link-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("traces.json");
    std::fs::write(&path, checkout_json())?;

    let inventory = load_trace(&path, Some(INVENTORY_TRACE_ID))?;
    let mut view = TestView::new(Config::default());
    view.model
        .set_active_query(Some(QueryRef::new("traceql", INVENTORY_TRACE_ID)));
    view.model.set_trace(Some(inventory));

    let link = view.model.resolve_focus_link(INVENTORY_TRACE_ID, "f6f6f6f6");
    assert_eq!(link.action, FocusAction::ToggleFocus("f6f6f6f6".to_string()));
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn duplicate_span_ids_are_rejected() {
    let json = r#"{
        "traceID": "t",
        "spans": [
            {"traceID": "t", "spanID": "a", "operationName": "x", "startTime": 0, "duration": 1, "processID": "p"},
            {"traceID": "t", "spanID": "a", "operationName": "y", "startTime": 0, "duration": 1, "processID": "p"}
        ],
        "processes": {"p": {"serviceName": "svc"}}
    }"#;
    assert!(matches!(
        ingest::from_jaeger_json(json),
        Err(TraceError::DuplicateSpan(id)) if id == "a"
    ));
}
