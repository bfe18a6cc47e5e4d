use anyhow::Result;
use spanview_core::focus::{Activation, FocusAction, QueryRef};
use spanview_core::state::{DetailKey, DetailSection};
use spanview_core::{Config, FrontendSettings, PanelStateStore, RenderState};
use spanview_test::fixtures::{checkout_fixture, inventory_trace, CHECKOUT_TRACE_ID};
use spanview_test::harness::TestView;
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn absent_trace_renders_no_data() -> Result<()> {
    let mut view = TestView::new(Config::default());
    view.model.set_search("checkout");

    assert!(matches!(view.model.snapshot(), RenderState::NoData));
    assert_eq!(view.model.critical_path_stats().misses, 0);
    Ok(())
}

#[test]
fn checkout_critical_path_follows_the_nested_chain() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    let bundle = view.bundle().ok_or_else(|| anyhow::anyhow!("no bundle"))?;
    let path = bundle.critical_path.ok_or_else(|| anyhow::anyhow!("no path"))?;

    assert_eq!(path.path, fixture.expected_critical_path);
    assert!(!path.contains(fixture.warmup));
    assert!(!path.contains(fixture.audit));
    assert_eq!(path.total_duration_us, 100_000);
    Ok(())
}

#[test]
fn critical_path_is_reused_until_trace_object_changes() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    let first = view.model.critical_path().ok_or_else(|| anyhow::anyhow!("no path"))?;
    let again = view.model.critical_path().ok_or_else(|| anyhow::anyhow!("no path"))?;
    assert!(Arc::ptr_eq(&first, &again));

    // Refresh: same id, new object
    let refreshed = checkout_fixture()?.trace;
    view.model.set_trace(Some(refreshed));
    let recomputed = view.model.critical_path().ok_or_else(|| anyhow::anyhow!("no path"))?;
    assert!(!Arc::ptr_eq(&first, &recomputed));
    assert_eq!(first.path, recomputed.path);
    Ok(())
}

#[test]
fn collapsing_charge_keeps_root_and_siblings() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    view.model.collapse_one(fixture.charge);
    let visible = view.visible_ids();

    assert!(visible.contains(&fixture.root.to_string()));
    assert!(visible.contains(&fixture.warmup.to_string()));
    assert!(visible.contains(&fixture.audit.to_string()));
    assert!(visible.contains(&fixture.charge.to_string()));
    assert!(!visible.contains(&fixture.card_lookup.to_string()));
    Ok(())
}

#[test]
fn collapse_all_wins_over_prior_expand_all() -> Result<()> {
    let fixture = checkout_fixture()?;
    let roots = fixture.trace.root_ids();

    let mut direct = TestView::new(Config::default());
    direct.model.set_trace(Some(Arc::clone(&fixture.trace)));
    direct.model.collapse_all(&roots);

    let mut expanded = TestView::new(Config::default());
    expanded.model.set_trace(Some(Arc::clone(&fixture.trace)));
    expanded.model.collapse_one(fixture.charge);
    expanded.model.expand_all();
    expanded.model.collapse_all(&roots);

    assert_eq!(
        direct.model.children().hidden_ids(),
        expanded.model.children().hidden_ids()
    );
    assert_eq!(direct.visible_ids(), vec![fixture.root.to_string()]);
    Ok(())
}

#[test]
fn detail_toggles_are_involutions_and_independent() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    let span = fixture.card_lookup;
    assert!(view.model.toggle_logs(span));
    assert!(view.model.toggle_log_item(span, 0));
    assert!(!view.model.toggle_logs(span));

    let details = view.model.details();
    assert!(!details.is_open(&DetailKey::section(span, DetailSection::Logs)));
    assert!(details.is_open(&DetailKey::item(span, DetailSection::Logs, 0)));
    assert!(!details.is_open(&DetailKey::item(span, DetailSection::Logs, 1)));

    assert!(!view.model.toggle_log_item(span, 0));
    assert!(view.model.details().open_keys().is_empty());
    Ok(())
}

#[test]
fn search_is_derived_from_query_and_trace() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    view.model.set_search("");
    assert!(view.model.search().matches().is_empty());

    view.model.set_search("slow");
    assert_eq!(
        view.model.search().matches(),
        &HashSet::from([fixture.card_lookup.to_string()])
    );

    view.model.set_search("payments");
    assert_eq!(view.model.search().matches().len(), 2);

    // Switching trace keeps the query but recomputes matches
    view.model.set_trace(Some(inventory_trace()?));
    assert_eq!(view.model.search().query(), "payments");
    assert!(view.model.search().matches().is_empty());
    Ok(())
}

#[test]
fn trace_switch_resets_per_trace_state() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));
    view.model.collapse_one(fixture.charge);
    view.model.toggle_tags(fixture.root);
    view.model.add_hover_indent_guide_id(fixture.root);
    view.model.update_view_range_time(0.25, 0.5, Some("test"))?;
    view.model.critical_path();

    view.model.set_trace(Some(inventory_trace()?));
    let bundle = view.bundle().ok_or_else(|| anyhow::anyhow!("no bundle"))?;

    assert!(bundle.hidden_span_ids.is_empty());
    assert!(bundle.detail_states.is_empty());
    assert!(bundle.hover_indent_guide_ids.is_empty());
    assert_eq!(bundle.view_range.current, (0.0, 1.0));
    assert_eq!(view.model.critical_path_stats().entries, 1);
    let path = bundle.critical_path.ok_or_else(|| anyhow::anyhow!("no path"))?;
    assert_eq!(path.trace_id, bundle.trace_id);
    Ok(())
}

#[test]
fn focus_toggles_in_place_for_the_displayed_trace() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));
    view.model
        .set_active_query(Some(QueryRef::new("traceql", CHECKOUT_TRACE_ID)));

    let link = view.model.resolve_focus_link(CHECKOUT_TRACE_ID, fixture.charge);
    assert_eq!(link.action, FocusAction::ToggleFocus(fixture.charge.to_string()));

    view.model.activate(&link, None);
    assert_eq!(
        view.store.focused_span_id("left").as_deref(),
        Some(fixture.charge)
    );
    assert_eq!(
        view.model.activate(&link, None),
        Activation::Focused(None)
    );
    assert_eq!(view.store.focused_span_id("left"), None);

    let first = view.model.resolve_focus_link(CHECKOUT_TRACE_ID, fixture.root);
    let second = view.model.resolve_focus_link(CHECKOUT_TRACE_ID, fixture.warmup);
    view.model.activate(&first, None);
    view.model.activate(&second, None);
    let bundle = view.bundle().ok_or_else(|| anyhow::anyhow!("no bundle"))?;
    assert_eq!(bundle.focused_span_id.as_deref(), Some(fixture.warmup));
    Ok(())
}

#[test]
fn links_to_other_traces_open_a_split_view() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut config = Config::default();
    config.focus.datasource_uid = Some("tempo-uid".into());
    config.focus.datasource_name = Some("Tempo".into());
    let settings = FrontendSettings {
        app_sub_url: "/grafana".into(),
        ..FrontendSettings::default()
    };
    let mut view = TestView::with_settings(config, settings);
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));
    view.model
        .set_active_query(Some(QueryRef::new("traceql", CHECKOUT_TRACE_ID)));

    let link = view.model.resolve_focus_link("ffffffffffffffff", "0000aaaa");
    let FocusAction::SplitOpen(request) = &link.action else {
        anyhow::bail!("expected a split open, got {:?}", link.action);
    };
    assert_eq!(request.datasource_uid, "tempo-uid");
    assert_eq!(request.query.query, "ffffffffffffffff");
    assert_eq!(
        request.panels_state.trace.span_id.as_deref(),
        Some("0000aaaa")
    );
    assert_eq!(link.descriptor.internal.datasource_name, "Tempo");
    assert!(link.descriptor.url.starts_with("/grafana/explore?left="));

    // Activating without a host to open the split must not touch focus
    assert_eq!(view.model.activate(&link, None), Activation::SplitFailed);
    assert_eq!(view.store.focused_span_id("left"), None);
    Ok(())
}

#[test]
fn pending_view_range_is_separate_from_committed() -> Result<()> {
    let fixture = checkout_fixture()?;
    let mut view = TestView::new(Config::default());
    view.model.set_trace(Some(Arc::clone(&fixture.trace)));

    view.model
        .update_next_view_range_time(spanview_core::state::ViewRangeTimeUpdate::shift_end(0.6));
    let bundle = view.bundle().ok_or_else(|| anyhow::anyhow!("no bundle"))?;
    assert_eq!(bundle.view_range.current, (0.0, 1.0));
    assert_eq!(bundle.view_range.preview(), Some((0.0, 0.6)));

    assert!(view.model.update_view_range_time(0.8, 0.2, None).is_err());
    view.model.update_view_range_time(0.0, 0.6, Some("drag"))?;
    let bundle = view.bundle().ok_or_else(|| anyhow::anyhow!("no bundle"))?;
    assert_eq!(bundle.view_range.current, (0.0, 0.6));
    assert!(bundle.view_range.next.is_none());
    Ok(())
}
