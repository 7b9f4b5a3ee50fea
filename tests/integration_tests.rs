//! Integration tests for the export pipeline.
//!
//! These tests validate:
//! - Step ordering and single, reverse-order teardown under fault injection
//! - Precondition errors before any I/O
//! - The static content host (serving, decoding, redirects, 404s, occupied
//!   port, stop)
//! - The full Chromium export (ignored: needs a local browser)

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cheatsheet_pdf::config::{
    EngineConfig, ExportConfig, NavigationConfig, PipelineConfig, ServerConfig, ViewportConfig,
};
use cheatsheet_pdf::error::{ErrorKind, PipelineError};
use cheatsheet_pdf::host::StaticHost;
use cheatsheet_pdf::pipeline::{run, PipelineState, Session, Stages};
use cheatsheet_pdf::templates;

// =====================================================================
// Recording stages
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    StartHost,
    LaunchEngine,
    OpenPage,
    SetViewport,
    Navigate,
    Export,
    CloseEngine,
    StopHost,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Vec<Step>,
}

impl Recorder {
    fn failing_at(steps: &[Step]) -> Self {
        Self {
            failing: steps.to_vec(),
            ..Self::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, step: Step) -> Result<(), PipelineError> {
        if !self.failing.contains(&step) {
            return Ok(());
        }
        Err(match step {
            Step::StartHost => PipelineError::HostStart {
                port: 3000,
                source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
            },
            Step::LaunchEngine => PipelineError::EngineLaunch("no executable".into()),
            Step::OpenPage => PipelineError::PageOpen("target crashed".into()),
            Step::SetViewport => PipelineError::Viewport("rejected".into()),
            Step::Navigate => PipelineError::Navigation {
                url: "http://fake/".into(),
                reason: "connection refused".into(),
            },
            Step::Export => PipelineError::Export("print failed".into()),
            Step::CloseEngine => PipelineError::EngineClose("already gone".into()),
            Step::StopHost => PipelineError::HostStop("task panicked".into()),
        })
    }
}

#[async_trait]
impl Stages for Recorder {
    type Host = u16;
    type Engine = &'static str;
    type Page = &'static str;

    async fn start_host(&mut self, server: &ServerConfig) -> Result<u16, PipelineError> {
        self.record("start_host");
        self.check(Step::StartHost)?;
        Ok(server.port)
    }

    fn origin(&self, host: &u16) -> String {
        format!("http://fake:{host}/")
    }

    async fn launch_engine(&mut self) -> Result<&'static str, PipelineError> {
        self.record("launch_engine");
        self.check(Step::LaunchEngine)?;
        Ok("engine")
    }

    async fn open_page(&mut self, engine: &&'static str) -> Result<&'static str, PipelineError> {
        assert_eq!(*engine, "engine");
        self.record("open_page");
        self.check(Step::OpenPage)?;
        Ok("page")
    }

    async fn set_viewport(
        &mut self,
        _page: &&'static str,
        viewport: &ViewportConfig,
    ) -> Result<(), PipelineError> {
        self.record(format!(
            "set_viewport {}x{}@{}",
            viewport.width, viewport.height, viewport.device_scale_factor
        ));
        self.check(Step::SetViewport)
    }

    async fn navigate(
        &mut self,
        _page: &&'static str,
        url: &str,
        _navigation: &NavigationConfig,
    ) -> Result<(), PipelineError> {
        self.record(format!("navigate {url}"));
        self.check(Step::Navigate)
    }

    async fn export(
        &mut self,
        _page: &&'static str,
        _export: &ExportConfig,
    ) -> Result<u64, PipelineError> {
        self.record("export");
        self.check(Step::Export)?;
        Ok(1234)
    }

    async fn close_engine(
        &mut self,
        engine: Option<&'static str>,
    ) -> Result<(), PipelineError> {
        match engine {
            Some(_) => {
                self.record("close_engine");
                self.check(Step::CloseEngine)
            }
            None => {
                self.record("close_engine (none)");
                Ok(())
            }
        }
    }

    async fn stop_host(&mut self, _host: u16) -> Result<(), PipelineError> {
        self.record("stop_host");
        self.check(Step::StopHost)
    }
}

fn default_config() -> PipelineConfig {
    PipelineConfig::default()
}

const FULL_RUN: [&str; 8] = [
    "start_host",
    "launch_engine",
    "open_page",
    "set_viewport 1123x794@2",
    "navigate http://fake:3000/",
    "export",
    "close_engine",
    "stop_host",
];

// =====================================================================
// Orchestration
// =====================================================================

#[tokio::test]
async fn successful_run_calls_every_step_in_order() {
    let recorder = Recorder::default();
    let report = run(recorder.clone(), &default_config()).await.unwrap();

    assert_eq!(recorder.calls(), FULL_RUN);
    assert_eq!(report.bytes_written, 1234);
    assert_eq!(
        report.output_path,
        PathBuf::from("generated/tailwind-flexbox-cheatsheet.pdf")
    );
    assert!(report.teardown_failures.is_empty());
}

#[tokio::test]
async fn failure_at_each_step_tears_down_once_in_reverse_order() {
    let cases: [(Step, &[&str]); 6] = [
        (Step::StartHost, &["start_host", "close_engine (none)"]),
        (
            Step::LaunchEngine,
            &["start_host", "launch_engine", "close_engine (none)", "stop_host"],
        ),
        (
            Step::OpenPage,
            &["start_host", "launch_engine", "open_page", "close_engine", "stop_host"],
        ),
        (
            Step::SetViewport,
            &[
                "start_host",
                "launch_engine",
                "open_page",
                "set_viewport 1123x794@2",
                "close_engine",
                "stop_host",
            ],
        ),
        (
            Step::Navigate,
            &[
                "start_host",
                "launch_engine",
                "open_page",
                "set_viewport 1123x794@2",
                "navigate http://fake:3000/",
                "close_engine",
                "stop_host",
            ],
        ),
        (
            Step::Export,
            &[
                "start_host",
                "launch_engine",
                "open_page",
                "set_viewport 1123x794@2",
                "navigate http://fake:3000/",
                "export",
                "close_engine",
                "stop_host",
            ],
        ),
    ];

    for (step, expected) in cases {
        let recorder = Recorder::failing_at(&[step]);
        let result = run(recorder.clone(), &default_config()).await;
        assert!(result.is_err(), "{step:?} should fail the run");
        assert_eq!(recorder.calls(), expected, "calls after failure at {step:?}");
    }
}

#[tokio::test]
async fn occupied_port_never_launches_engine() {
    let recorder = Recorder::failing_at(&[Step::StartHost]);
    let err = run(recorder.clone(), &default_config()).await.unwrap_err();

    assert!(matches!(err, PipelineError::HostStart { port: 3000, .. }));
    assert_eq!(err.kind(), ErrorKind::Acquisition);
    assert!(!recorder.calls().iter().any(|c| c == "launch_engine"));
}

#[tokio::test]
async fn teardown_failure_does_not_override_success() {
    let recorder = Recorder::failing_at(&[Step::CloseEngine]);
    let report = run(recorder.clone(), &default_config()).await.unwrap();

    assert_eq!(recorder.calls(), FULL_RUN);
    assert_eq!(report.teardown_failures.len(), 1);
    assert_eq!(report.teardown_failures[0].kind(), ErrorKind::Teardown);
}

#[tokio::test]
async fn teardown_failure_does_not_mask_step_failure() {
    let recorder = Recorder::failing_at(&[Step::Navigate, Step::StopHost]);
    let err = run(recorder.clone(), &default_config()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Navigation { .. }));
    assert_eq!(recorder.calls().last().map(String::as_str), Some("stop_host"));
}

#[tokio::test]
async fn invalid_config_touches_nothing() {
    let recorder = Recorder::default();
    let mut config = default_config();
    config.export.scale = 5.0;

    let err = run(recorder.clone(), &config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn open_page_without_engine_is_a_precondition_violation() {
    let recorder = Recorder::default();
    let mut session = Session::new(recorder.clone());

    let err = session.open_page().await.unwrap_err();
    assert!(matches!(err, PipelineError::Precondition(_)));
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(recorder.calls().is_empty());
    assert_eq!(session.state(), PipelineState::Idle);
}

#[tokio::test]
async fn export_requires_completed_navigation() {
    let recorder = Recorder::default();
    let config = default_config();
    let mut session = Session::new(recorder.clone());

    session.start_host(&config.server).await.unwrap();
    session.launch_engine().await.unwrap();
    session.open_page().await.unwrap();
    session.set_viewport(&config.viewport).await.unwrap();

    let err = session.export(&config.export).await.unwrap_err();
    assert!(matches!(err, PipelineError::Precondition(_)));
    assert!(!recorder.calls().iter().any(|c| c == "export"));
    assert_eq!(session.state(), PipelineState::PageConfigured);

    assert!(session.teardown().await.is_empty());
    assert_eq!(session.state(), PipelineState::TornDown);
}

#[tokio::test]
async fn failed_navigation_leaves_export_unreachable() {
    let recorder = Recorder::failing_at(&[Step::Navigate]);
    let config = default_config();
    let mut session = Session::new(recorder.clone());

    session.start_host(&config.server).await.unwrap();
    session.launch_engine().await.unwrap();
    session.open_page().await.unwrap();
    session.set_viewport(&config.viewport).await.unwrap();
    assert!(session.navigate(&config.navigation).await.is_err());

    let err = session.export(&config.export).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    session.teardown().await;
}

#[tokio::test]
async fn teardown_runs_at_most_once() {
    let recorder = Recorder::default();
    let config = default_config();
    let mut session = Session::new(recorder.clone());

    session.start_host(&config.server).await.unwrap();
    session.launch_engine().await.unwrap();
    session.teardown().await;
    session.teardown().await;

    assert_eq!(
        recorder.calls(),
        ["start_host", "launch_engine", "close_engine", "stop_host"]
    );
}

#[tokio::test]
async fn engine_cannot_launch_before_host() {
    let recorder = Recorder::default();
    let mut session = Session::new(recorder.clone());

    let err = session.launch_engine().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(recorder.calls().is_empty());
}

#[test]
fn default_viewport_snapshot() {
    let viewport = default_config().viewport;
    assert_eq!(
        viewport,
        ViewportConfig {
            width: 1123,
            height: 794,
            device_scale_factor: 2.0,
        }
    );
}

// =====================================================================
// Static content host
// =====================================================================

fn server_for(dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        port: 0,
        static_dir: dir.to_path_buf(),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn host_serves_index_and_assets() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(dir.path(), &templates::styled_bundle()).unwrap();

    let mut host = StaticHost::start(&server_for(dir.path())).await.unwrap();
    let origin = host.origin();

    let index = reqwest::get(&origin).await.unwrap();
    assert_eq!(index.status(), 200);
    let content_type = index.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");
    assert_eq!(index.text().await.unwrap(), templates::styled_page());

    let css = reqwest::get(format!("{origin}assets/sheet.css")).await.unwrap();
    assert_eq!(css.status(), 200);
    assert!(css.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/css"));

    let missing = reqwest::get(format!("{origin}nope.js")).await.unwrap();
    assert_eq!(missing.status(), 404);

    host.stop().await.unwrap();
}

#[tokio::test]
async fn host_serves_percent_encoded_names() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(
        dir.path(),
        &[("a b.css", "body {}"), ("fonts/grüße.txt", "hallo")],
    )
    .unwrap();

    let mut host = StaticHost::start(&server_for(dir.path())).await.unwrap();
    let origin = host.origin();

    let css = reqwest::get(format!("{origin}a%20b.css")).await.unwrap();
    assert_eq!(css.status(), 200);
    assert!(css.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    assert_eq!(css.text().await.unwrap(), "body {}");

    let text = reqwest::get(format!("{origin}fonts/gr%C3%BC%C3%9Fe.txt"))
        .await
        .unwrap();
    assert_eq!(text.status(), 200);
    assert_eq!(text.text().await.unwrap(), "hallo");

    host.stop().await.unwrap();
}

#[tokio::test]
async fn host_redirects_directory_without_trailing_slash() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(dir.path(), &[("docs/index.html", templates::minimal_page())])
        .unwrap();

    let mut host = StaticHost::start(&server_for(dir.path())).await.unwrap();
    let response = reqwest::get(format!("{}docs", host.origin())).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.url().path(), "/docs/");
    assert_eq!(response.text().await.unwrap(), templates::minimal_page());

    host.stop().await.unwrap();
}

#[tokio::test]
async fn host_stop_is_idempotent_and_closes_listener() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(dir.path(), &[("index.html", templates::minimal_page())]).unwrap();

    let mut host = StaticHost::start(&server_for(dir.path())).await.unwrap();
    let origin = host.origin();
    assert_eq!(reqwest::get(&origin).await.unwrap().status(), 200);

    host.stop().await.unwrap();
    host.stop().await.unwrap();
    assert!(reqwest::get(&origin).await.is_err());
}

#[tokio::test]
async fn host_fails_on_occupied_port() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();

    let config = ServerConfig {
        port,
        ..server_for(dir.path())
    };
    let err = StaticHost::start(&config).await.err().unwrap();
    match err {
        PipelineError::HostStart { port: p, source } => {
            assert_eq!(p, port);
            assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
        }
        other => panic!("expected HostStart, got {other}"),
    }
}

#[tokio::test]
async fn chrome_pipeline_stops_at_occupied_port() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dir = tempfile::tempdir().unwrap();

    let mut config = default_config();
    config.server = ServerConfig {
        port: occupied.local_addr().unwrap().port(),
        ..server_for(dir.path())
    };
    config.export.output_path = dir.path().join("out.pdf");

    let err = cheatsheet_pdf::generate_pdf(&config).await.unwrap_err();
    assert!(matches!(err, PipelineError::HostStart { .. }));
    assert!(!config.export.output_path.exists());
}

// =====================================================================
// End to end (requires Chromium)
// =====================================================================

fn e2e_config(dir: &std::path::Path) -> PipelineConfig {
    let mut config = default_config();
    config.server = server_for(&dir.join("dist"));
    config.export.output_path = dir.join("generated").join("sheet.pdf");
    config.engine = EngineConfig {
        sandbox: false,
        ..EngineConfig::default()
    };
    config.navigation.timeout_secs = Some(60);
    config
}

fn assert_valid_pdf(path: &std::path::Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn exports_single_page_to_pdf() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(
        &dir.path().join("dist"),
        &[("index.html", templates::minimal_page())],
    )
    .unwrap();
    let config = e2e_config(dir.path());

    let report = cheatsheet_pdf::generate_pdf(&config).await.unwrap();
    assert!(report.bytes_written > 0);
    assert!(report.teardown_failures.is_empty());
    assert_valid_pdf(&config.export.output_path);
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn exports_page_with_subresources_after_network_idle() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(&dir.path().join("dist"), &templates::styled_bundle()).unwrap();
    let config = e2e_config(dir.path());

    cheatsheet_pdf::generate_pdf(&config).await.unwrap();
    assert_valid_pdf(&config.export.output_path);
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn page_that_never_settles_times_out() {
    let dir = tempfile::tempdir().unwrap();
    templates::write_bundle(
        &dir.path().join("dist"),
        &[("index.html", templates::restless_page())],
    )
    .unwrap();
    let mut config = e2e_config(dir.path());
    config.navigation.timeout_secs = Some(3);

    let err = cheatsheet_pdf::generate_pdf(&config).await.unwrap_err();
    match &err {
        PipelineError::NavigationTimeout { limit, .. } => {
            assert_eq!(*limit, std::time::Duration::from_secs(3));
        }
        other => panic!("expected NavigationTimeout, got {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Operation);
    assert!(!config.export.output_path.exists());
}
