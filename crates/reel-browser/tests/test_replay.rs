//! Cross-crate integration tests for script replay.
//!
//! Builds a full demo script from canned stage results and replays it
//! against a recording surface under virtual time, verifying that the
//! animation draws the whole narrative in order and takes exactly the
//! duration the timing profile predicts.

use reel_browser::{play, BrowserError, LineClass, Surface};
use reel_script::{
    build_script, script_duration, DemoResults, HealthResult, TimingProfile,
};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Surface that reassembles drawn characters into finished lines.
#[derive(Default)]
struct CapturingSurface {
    lines: Vec<(LineClass, String)>,
    current: Option<(LineClass, String)>,
}

#[async_trait::async_trait]
impl Surface for CapturingSurface {
    async fn begin_line(&mut self, class: LineClass) -> Result<(), BrowserError> {
        self.current = Some((class, String::new()));
        Ok(())
    }

    async fn put_char(&mut self, ch: char) -> Result<(), BrowserError> {
        if let Some((_, text)) = self.current.as_mut() {
            text.push(ch);
        }
        Ok(())
    }

    async fn end_line(&mut self) -> Result<(), BrowserError> {
        if let Some(line) = self.current.take() {
            self.lines.push(line);
        }
        Ok(())
    }
}

fn canned_results() -> DemoResults {
    DemoResults {
        compose_up: "Network demo_default  Created\nContainer api  Started".into(),
        compose_ps: "NAME  STATE  PORTS\napi   running  8000".into(),
        health: vec![
            HealthResult {
                label: "digital-twin-api (8000)".into(),
                body: r#"{"status":"ok"}"#.into(),
            },
            HealthResult {
                label: "anomaly-detection (8001)".into(),
                body: r#"{"status":"ok"}"#.into(),
            },
        ],
        telemetry_post: r#"{"accepted":true}"#.into(),
        telemetry_latest: r#"{"machine_id":"CNC-001"}"#.into(),
        history: r#"{"entries":[]}"#.into(),
        alerts_legacy: r#"{"alert_id":"a1"}"#.into(),
        aggregate_legacy: r#"{"window_minutes":5}"#.into(),
        aggregate_modern: r#"{"windows":["1min","5min"]}"#.into(),
        anomaly_detect: r#"{"anomalies":[]}"#.into(),
        tool_rul: r#"{"rul_minutes":42}"#.into(),
        spindle_health: r#"{"health":"degraded"}"#.into(),
        maintenance_schedule: r#"{"next_service":"soon"}"#.into(),
        test_run: "....\n5 passed in 2.31s".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn full_script_replays_every_line_in_order() {
    let script = build_script(&canned_results());
    let mut surface = CapturingSurface::default();

    play(&script, TimingProfile::compact(), &mut surface)
        .await
        .unwrap();

    assert_eq!(surface.lines.len(), script.len());
    for (drawn, expected) in surface.lines.iter().zip(script.iter()) {
        assert_eq!(drawn.1, expected.text);
    }
}

#[tokio::test(start_paused = true)]
async fn full_script_duration_matches_prediction_in_both_profiles() {
    let script = build_script(&canned_results());

    for timing in [TimingProfile::compact(), TimingProfile::extended()] {
        let mut surface = CapturingSurface::default();
        let start = Instant::now();
        play(&script, timing, &mut surface).await.unwrap();
        assert_eq!(start.elapsed(), script_duration(&script, &timing));
    }
}

#[tokio::test(start_paused = true)]
async fn styles_follow_line_content() {
    let script = build_script(&canned_results());
    let mut surface = CapturingSurface::default();
    play(&script, TimingProfile::compact(), &mut surface)
        .await
        .unwrap();

    let class_of = |text: &str| {
        surface
            .lines
            .iter()
            .find(|(_, t)| t == text)
            .map(|(c, _)| *c)
            .unwrap_or_else(|| panic!("line not drawn: {text}"))
    };

    assert_eq!(class_of("### Health Checks ###"), LineClass::Section);
    assert_eq!(class_of("$ docker compose up --build -d"), LineClass::Command);
    assert_eq!(
        class_of(r#"digital-twin-api (8000): {"status":"ok"}"#),
        LineClass::Success
    );
    assert_eq!(class_of("5 passed in 2.31s"), LineClass::Success);
    assert_eq!(class_of("Container api  Started"), LineClass::Plain);
}
