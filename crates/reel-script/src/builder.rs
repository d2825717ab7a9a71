//! Assembles captured stage output into the demo script.
//!
//! The section order mirrors the demo narrative and is a content
//! contract: stack startup, health checks, the primary API, the two
//! dependent services, the automated test run, and a closing marker.
//! Reordering sections changes the meaning of the recording and is a
//! breaking change.

use crate::compact::compact;
use crate::line::{DisplayLine, Script};

/// Default visible-line bound for long outputs.
const DEFAULT_MAX_LINES: usize = 14;
/// Bound for individual API responses.
const API_MAX_LINES: usize = 8;
/// Bound for the anomaly-detection response (slightly larger payload).
const DETECT_MAX_LINES: usize = 10;
/// Bound for the test-runner tail.
const TEST_MAX_LINES: usize = 6;

// ---------------------------------------------------------------------------
// DemoResults
// ---------------------------------------------------------------------------

/// One health check's label and captured response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResult {
    /// e.g. `digital-twin-api (8000)`
    pub label: String,
    /// e.g. `{"status":"ok"}`
    pub body: String,
}

/// Captured output of every orchestration stage, in the order the stages
/// ran. The builder consumes this; nothing here is retained afterwards.
#[derive(Debug, Clone, Default)]
pub struct DemoResults {
    pub compose_up: String,
    pub compose_ps: String,
    pub health: Vec<HealthResult>,
    pub telemetry_post: String,
    pub telemetry_latest: String,
    pub history: String,
    pub alerts_legacy: String,
    pub aggregate_legacy: String,
    pub aggregate_modern: String,
    pub anomaly_detect: String,
    pub tool_rul: String,
    pub spindle_health: String,
    pub maintenance_schedule: String,
    pub test_run: String,
}

// ---------------------------------------------------------------------------
// build_script
// ---------------------------------------------------------------------------

/// Build the playback script from captured results.
///
/// Deterministic: the same results always produce the same line sequence.
pub fn build_script(results: &DemoResults) -> Script {
    let mut s = Script::new();

    // The opening section sits under a single blank row; every later one
    // gets two, so sections read as visually separate blocks.
    s.push_blank();
    s.push(DisplayLine::section("Start Stack"));
    s.push(DisplayLine::command("$ docker compose up --build -d"));
    s.push_output_block(&compact(&results.compose_up, DEFAULT_MAX_LINES));
    s.push_blank();
    s.push(DisplayLine::command("$ docker compose ps"));
    s.push_output_block(&results.compose_ps);

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Health Checks"));
    s.push(DisplayLine::command("$ curl health endpoints (8000-8004)"));
    for check in &results.health {
        s.push(DisplayLine::output(format!(
            "{}: {}",
            check.label, check.body
        )));
    }

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Digital Twin API"));
    for (cmd, body) in [
        ("$ POST /machines/CNC-001/telemetry", &results.telemetry_post),
        ("$ GET /machines/CNC-001/telemetry", &results.telemetry_latest),
        ("$ GET /machines/CNC-001/history", &results.history),
        (
            "$ POST /machines/CNC-001/alerts  (legacy severity=warning)",
            &results.alerts_legacy,
        ),
        (
            "$ POST /machines/CNC-001/aggregate  (legacy window_minutes=5)",
            &results.aggregate_legacy,
        ),
        (
            "$ POST /machines/CNC-001/aggregate  (modern windows=[1min,5min])",
            &results.aggregate_modern,
        ),
    ] {
        s.push(DisplayLine::command(cmd));
        s.push_output_block(&compact(body, API_MAX_LINES));
    }

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Anomaly Detection Service"));
    s.push(DisplayLine::command("$ POST /detect"));
    s.push_output_block(&compact(&results.anomaly_detect, DETECT_MAX_LINES));

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Predictive Maintenance Service"));
    for (cmd, body) in [
        ("$ POST /predict/tool-rul", &results.tool_rul),
        ("$ POST /predict/spindle-health", &results.spindle_health),
        (
            "$ POST /predict/maintenance-schedule",
            &results.maintenance_schedule,
        ),
    ] {
        s.push(DisplayLine::command(cmd));
        s.push_output_block(&compact(body, API_MAX_LINES));
    }

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Tests"));
    s.push(DisplayLine::command("$ .venv/bin/pytest -q"));
    s.push_output_block(&compact(&results.test_run, TEST_MAX_LINES));

    s.push_blank();
    s.push_blank();
    s.push(DisplayLine::section("Demo Complete"));
    s.push(DisplayLine::output("All core functions verified in one run."));

    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
