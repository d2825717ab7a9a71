//! The demo's orchestration stages: every command the recording drives,
//! executed strictly in order against the project root.
//!
//! Stage order is the demo narrative and must match the script sections
//! the builder emits. Only the health checks retry; by the time they pass,
//! every later endpoint is expected to answer on the first attempt.

use reel_exec::{run_with_retry, CommandRunner, ExecError, RetryPolicy};
use reel_script::{DemoResults, HealthResult};

// ---------------------------------------------------------------------------
// Stage commands
// ---------------------------------------------------------------------------

pub const COMPOSE_UP: &str = "docker compose up --build -d";
pub const COMPOSE_PS: &str =
    r#"docker compose ps --format "table {{.Name}}\t{{.State}}\t{{.Ports}}""#;

/// Health endpoints, one per service, labeled for the script.
pub const HEALTH_CHECKS: [(&str, &str); 5] = [
    ("digital-twin-api (8000)", "curl -s http://localhost:8000/health"),
    ("anomaly-detection (8001)", "curl -s http://localhost:8001/health"),
    (
        "predictive-maintenance (8002)",
        "curl -s http://localhost:8002/health",
    ),
    ("alerting-service (8003)", "curl -s http://localhost:8003/health"),
    ("data-aggregator (8004)", "curl -s http://localhost:8004/health"),
];

pub const TELEMETRY_POST: &str = r#"curl -s -X POST http://localhost:8000/machines/CNC-001/telemetry -H 'Content-Type: application/json' -H 'x-api-key: dev-key' -d '{"timestamp":"2026-02-04T10:00:00Z","machine_id":"CNC-001","data":{"spindle":{"temperature_c":95.0,"rpm":12000},"tool":{"wear_percent":85}}}'"#;
pub const TELEMETRY_LATEST: &str =
    "curl -s http://localhost:8000/machines/CNC-001/telemetry -H 'x-api-key: dev-key'";
pub const HISTORY: &str =
    "curl -s http://localhost:8000/machines/CNC-001/history -H 'x-api-key: dev-key'";
pub const ALERTS_LEGACY: &str = r#"curl -s -X POST http://localhost:8000/machines/CNC-001/alerts -H 'Content-Type: application/json' -H 'x-api-key: dev-key' -d '{"severity":"warning","message":"Legacy warning demo","metric":"spindle.temperature_c","value":95}'"#;
pub const AGGREGATE_LEGACY: &str = r#"curl -s -X POST http://localhost:8000/machines/CNC-001/aggregate -H 'Content-Type: application/json' -H 'x-api-key: dev-key' -d '{"window_minutes":5}'"#;
pub const AGGREGATE_MODERN: &str = r#"curl -s -X POST http://localhost:8000/machines/CNC-001/aggregate -H 'Content-Type: application/json' -H 'x-api-key: dev-key' -d '{"metric":"spindle.temperature_c","windows":["1min","5min"]}'"#;

pub const ANOMALY_DETECT: &str = r#"curl -s -X POST http://localhost:8001/detect -H 'Content-Type: application/json' -d '{"telemetry":[{"timestamp":"2026-02-04T10:00:00Z","machine_id":"CNC-001","spindle":{"rpm":12000,"load_percent":45,"temperature_c":95,"vibration_mm_s":7},"axes":{"x":{"position_mm":10,"velocity_mm_min":1000},"y":{"position_mm":20,"velocity_mm_min":1000},"z":{"position_mm":-5,"velocity_mm_min":500}},"tool":{"id":"T01","type":"end_mill","diameter_mm":10,"wear_percent":85,"runtime_minutes":120},"coolant":{"flow_rate_lpm":1,"temperature_c":25,"pressure_bar":3},"power":{"total_kw":10,"spindle_kw":6,"servo_kw":4},"status":{"mode":"AUTO","program":"O1234","block":"N0100","cycle_time_s":1000}}]}'"#;

pub const TOOL_RUL: &str = r#"curl -s -X POST http://localhost:8002/predict/tool-rul -H 'Content-Type: application/json' -d '{"machine_id":"CNC-001","wear_percent":85,"runtime_minutes":120,"cutting_speed_m_min":180}'"#;
pub const SPINDLE_HEALTH: &str = r#"curl -s -X POST http://localhost:8002/predict/spindle-health -H 'Content-Type: application/json' -d '{"machine_id":"CNC-001","vibration_mm_s":6.5,"temperature_c":88,"trend_slope":0.2}'"#;
pub const MAINTENANCE_SCHEDULE: &str = r#"curl -s -X POST http://localhost:8002/predict/maintenance-schedule -H 'Content-Type: application/json' -d '{"machine_id":"CNC-001","wear_percent":85,"runtime_minutes":120,"cutting_speed_m_min":180}'"#;

pub const TEST_RUN: &str = ".venv/bin/pytest -q";

// ---------------------------------------------------------------------------
// run_stages
// ---------------------------------------------------------------------------

/// Drive every stage in order and capture its output.
pub async fn run_stages(runner: &dyn CommandRunner) -> Result<DemoResults, ExecError> {
    tracing::info!("starting demo stack");
    let compose_up = runner.run(COMPOSE_UP).await?;
    let compose_ps = runner.run(COMPOSE_PS).await?;

    tracing::info!("waiting for health endpoints");
    let mut health = Vec::with_capacity(HEALTH_CHECKS.len());
    for (label, command) in HEALTH_CHECKS {
        let body = run_with_retry(runner, command, RetryPolicy::health_check()).await?;
        tracing::info!(service = label, "healthy");
        health.push(HealthResult {
            label: label.to_string(),
            body,
        });
    }

    tracing::info!("exercising the digital twin API");
    let telemetry_post = runner.run(TELEMETRY_POST).await?;
    let telemetry_latest = runner.run(TELEMETRY_LATEST).await?;
    let history = runner.run(HISTORY).await?;
    let alerts_legacy = runner.run(ALERTS_LEGACY).await?;
    let aggregate_legacy = runner.run(AGGREGATE_LEGACY).await?;
    let aggregate_modern = runner.run(AGGREGATE_MODERN).await?;

    tracing::info!("exercising the dependent services");
    let anomaly_detect = runner.run(ANOMALY_DETECT).await?;
    let tool_rul = runner.run(TOOL_RUL).await?;
    let spindle_health = runner.run(SPINDLE_HEALTH).await?;
    let maintenance_schedule = runner.run(MAINTENANCE_SCHEDULE).await?;

    tracing::info!("running the test suite");
    let test_run = runner.run(TEST_RUN).await?;

    Ok(DemoResults {
        compose_up,
        compose_ps,
        health,
        telemetry_post,
        telemetry_latest,
        history,
        alerts_legacy,
        aggregate_legacy,
        aggregate_modern,
        anomaly_detect,
        tool_rul,
        spindle_health,
        maintenance_schedule,
        test_run,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Runner that logs commands and answers from a canned table. Commands
    /// listed in `fail_once` fail on their first invocation only.
    struct MockRunner {
        calls: Mutex<Vec<String>>,
        fail_once: Vec<&'static str>,
    }

    impl MockRunner {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_once: Vec::new(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, command: &str) -> Result<String, ExecError> {
            let prior = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(command.to_string());
                calls.iter().filter(|c| *c == command).count() - 1
            };
            if prior == 0 && self.fail_once.contains(&command) {
                return Err(ExecError::CommandFailed {
                    command: command.to_string(),
                    code: 7,
                    stderr: "connection refused".to_string(),
                });
            }
            Ok(format!("out of: {command}"))
        }
    }

    #[tokio::test]
    async fn stages_run_in_narrative_order() {
        let runner = MockRunner::new();
        let results = run_stages(&runner).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0], COMPOSE_UP);
        assert_eq!(calls[1], COMPOSE_PS);
        for (i, (_, cmd)) in HEALTH_CHECKS.iter().enumerate() {
            assert_eq!(calls[2 + i], *cmd);
        }
        assert_eq!(
            &calls[7..],
            &[
                TELEMETRY_POST,
                TELEMETRY_LATEST,
                HISTORY,
                ALERTS_LEGACY,
                AGGREGATE_LEGACY,
                AGGREGATE_MODERN,
                ANOMALY_DETECT,
                TOOL_RUL,
                SPINDLE_HEALTH,
                MAINTENANCE_SCHEDULE,
                TEST_RUN,
            ]
        );

        assert_eq!(results.compose_up, format!("out of: {COMPOSE_UP}"));
        assert_eq!(results.health.len(), 5);
        assert_eq!(results.health[0].label, "digital-twin-api (8000)");
    }

    #[tokio::test(start_paused = true)]
    async fn health_checks_retry_until_the_service_answers() {
        let mut runner = MockRunner::new();
        runner.fail_once = vec![HEALTH_CHECKS[2].1];

        let results = run_stages(&runner).await.unwrap();

        // The flaky endpoint was polled twice; every other stage ran once.
        let calls = runner.calls();
        let polls = calls.iter().filter(|c| *c == HEALTH_CHECKS[2].1).count();
        assert_eq!(polls, 2);
        assert_eq!(results.health[2].label, "predictive-maintenance (8002)");
    }

    #[tokio::test]
    async fn non_health_stage_failure_aborts_the_run() {
        struct FailingRunner;

        #[async_trait::async_trait]
        impl CommandRunner for FailingRunner {
            async fn run(&self, command: &str) -> Result<String, ExecError> {
                if command == TEST_RUN {
                    Err(ExecError::CommandFailed {
                        command: command.to_string(),
                        code: 1,
                        stderr: "2 failed".to_string(),
                    })
                } else {
                    Ok("ok".to_string())
                }
            }
        }

        let err = run_stages(&FailingRunner).await.unwrap_err();
        assert!(matches!(err, ExecError::CommandFailed { .. }));
    }

    #[test]
    fn health_checks_cover_all_five_service_ports() {
        for (i, (label, cmd)) in HEALTH_CHECKS.iter().enumerate() {
            let port = 8000 + i;
            assert!(label.contains(&format!("({port})")), "label: {label}");
            assert!(cmd.contains(&format!("localhost:{port}/health")), "cmd: {cmd}");
        }
    }
}
