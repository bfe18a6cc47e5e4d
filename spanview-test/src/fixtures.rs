use anyhow::Result;
use spanview_core::{ingest, Trace};
use std::sync::Arc;

pub const CHECKOUT_TRACE_ID: &str = "4bf92f3577b34da6";
pub const INVENTORY_TRACE_ID: &str = "00f067aa0ba902b7";

/// Expectations that go with [`checkout_json`]
pub struct CheckoutFixture {
    pub trace: Arc<Trace>,
    pub root: &'static str,
    pub charge: &'static str,
    pub card_lookup: &'static str,
    pub warmup: &'static str,
    pub audit: &'static str,
    pub expected_critical_path: Vec<&'static str>,
}

/// Jaeger query-API document with two traces.
///
/// The checkout trace is
/// `root (0-100ms) -> charge (10-90ms) -> card lookup (20-80ms)` plus a
/// `warmup (0-5ms)` child of the root and an `audit` span that only follows
/// from the root.
pub fn checkout_json() -> String {
    const T: u64 = 1_700_000_000_000_000;
    let ms = |v: u64| T + v * 1_000;

    serde_json::json!({
        "data": [
            {
                "traceID": CHECKOUT_TRACE_ID,
                "spans": [
                    {
                        "traceID": CHECKOUT_TRACE_ID, "spanID": "c3c3c3c3",
                        "operationName": "SELECT card",
                        "references": [{"refType": "CHILD_OF", "traceID": CHECKOUT_TRACE_ID, "spanID": "b2b2b2b2"}],
                        "startTime": ms(20), "duration": 60_000, "processID": "p2",
                        "tags": [{"key": "db.statement", "type": "string", "value": "SELECT * FROM cards"}],
                        "logs": [{"timestamp": ms(75), "fields": [{"key": "event", "value": "slow query"}]}]
                    },
                    {
                        "traceID": CHECKOUT_TRACE_ID, "spanID": "a1a1a1a1",
                        "operationName": "HTTP GET /checkout",
                        "startTime": ms(0), "duration": 100_000, "processID": "p1",
                        "tags": [{"key": "http.status_code", "type": "int64", "value": 200}]
                    },
                    {
                        "traceID": CHECKOUT_TRACE_ID, "spanID": "b2b2b2b2",
                        "operationName": "charge",
                        "references": [{"refType": "CHILD_OF", "traceID": CHECKOUT_TRACE_ID, "spanID": "a1a1a1a1"}],
                        "startTime": ms(10), "duration": 80_000, "processID": "p2",
                        "tags": [{"key": "error", "type": "bool", "value": true}]
                    },
                    {
                        "traceID": CHECKOUT_TRACE_ID, "spanID": "d4d4d4d4",
                        "operationName": "warmup",
                        "references": [{"refType": "CHILD_OF", "traceID": CHECKOUT_TRACE_ID, "spanID": "a1a1a1a1"}],
                        "startTime": ms(0), "duration": 5_000, "processID": "p1"
                    },
                    {
                        "traceID": CHECKOUT_TRACE_ID, "spanID": "e5e5e5e5",
                        "operationName": "audit",
                        "references": [{"refType": "FOLLOWS_FROM", "traceID": CHECKOUT_TRACE_ID, "spanID": "a1a1a1a1"}],
                        "startTime": ms(50), "duration": 30_000, "processID": "p3"
                    }
                ],
                "processes": {
                    "p1": {"serviceName": "frontend", "tags": [{"key": "hostname", "value": "web-1"}]},
                    "p2": {"serviceName": "payments", "tags": []},
                    "p3": {"serviceName": "audit-log", "tags": []}
                }
            },
            {
                "traceID": INVENTORY_TRACE_ID,
                "spans": [
                    {
                        "traceID": INVENTORY_TRACE_ID, "spanID": "f6f6f6f6",
                        "operationName": "GET /inventory",
                        "startTime": ms(0), "duration": 40_000, "processID": "p1"
                    },
                    {
                        "traceID": INVENTORY_TRACE_ID, "spanID": "a7a7a7a7",
                        "operationName": "SELECT stock",
                        "references": [{"refType": "CHILD_OF", "traceID": INVENTORY_TRACE_ID, "spanID": "f6f6f6f6"}],
                        "startTime": ms(5), "duration": 30_000, "processID": "p1"
                    }
                ],
                "processes": {
                    "p1": {"serviceName": "inventory", "tags": []}
                }
            }
        ]
    })
    .to_string()
}

pub fn load_traces() -> Result<Vec<Arc<Trace>>> {
    Ok(ingest::traces_from_json(&checkout_json())?
        .into_iter()
        .map(Arc::new)
        .collect())
}

pub fn checkout_fixture() -> Result<CheckoutFixture> {
    let trace = load_traces()?
        .into_iter()
        .find(|t| t.trace_id == CHECKOUT_TRACE_ID)
        .ok_or_else(|| anyhow::anyhow!("checkout trace missing from fixture"))?;

    Ok(CheckoutFixture {
        trace,
        root: "a1a1a1a1",
        charge: "b2b2b2b2",
        card_lookup: "c3c3c3c3",
        warmup: "d4d4d4d4",
        audit: "e5e5e5e5",
        expected_critical_path: vec!["a1a1a1a1", "b2b2b2b2", "c3c3c3c3"],
    })
}

pub fn inventory_trace() -> Result<Arc<Trace>> {
    load_traces()?
        .into_iter()
        .find(|t| t.trace_id == INVENTORY_TRACE_ID)
        .ok_or_else(|| anyhow::anyhow!("inventory trace missing from fixture"))
}
