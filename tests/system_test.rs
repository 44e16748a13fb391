//! End-to-end tests: editor session over HTTP collaborators.
//!
//! One in-process axum server plays both the declaration CDN and the
//! backtest API. Sessions are wired the way `strategy-check` wires them.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strategy_editor_core::{
    DiagnosticOrigin, Error, HeadlessView, HeadlessViewFactory, TextChange, TextDocument,
};
use strategy_editor_sandbox::{
    CdnDeclarationSource, CompilerOptions, SandboxManager, StructuralAnalysisBackend,
    DEFAULT_STRATEGY,
};
use strategy_editor_validation::{
    install_strategy_libraries, BacktestClient, EditOutcome, EditorSession, SessionDeps,
    SessionOptions, SessionSettings,
};

// =============================================================================
// Test Backend
// =============================================================================

/// Rejects any strategy using a zero-length moving average.
const FORBIDDEN: &str = "sma(0)";

struct Backend {
    base_url: String,
    parse_calls: Arc<AtomicUsize>,
}

async fn start_backend(with_parse: bool) -> Backend {
    let parse_calls = Arc::new(AtomicUsize::new(0));
    let counter = parse_calls.clone();

    let mut router = Router::new()
        .route(
            "/cdn/:version/typescript/lib/:file",
            get(|Path((_version, file)): Path<(String, String)>| async move {
                format!("// {}\ninterface Array<T> {{}}", file)
            }),
        )
        .route(
            "/backtest/universe",
            get(|| async { Json(json!([{ "ticker": "BTCUSDT" }, { "ticker": "ETHUSDT" }])) }),
        );

    if with_parse {
        router = router.route(
            "/backtest/parse",
            post(move |Json(body): Json<Value>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    parse(body["content"].as_str().unwrap_or_default())
                }
            }),
        );
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Backend {
        base_url: format!("http://{}", addr),
        parse_calls,
    }
}

fn parse(content: &str) -> Response {
    let Some(byte) = content.find(FORBIDDEN) else {
        return StatusCode::OK.into_response();
    };
    let index = content[..byte].chars().count() as i64 + 1;
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "case": "parserError",
            "fields": {
                "message": "period must be positive",
                "line": 0,
                "column": 0,
                "index": index
            }
        })),
    )
        .into_response()
}

struct Wired {
    client: Arc<BacktestClient>,
    views: Arc<HeadlessViewFactory>,
    deps: SessionDeps,
}

fn wire(backend: &Backend) -> Wired {
    let timeout = Duration::from_secs(5);
    let client = Arc::new(BacktestClient::new(&backend.base_url, timeout).unwrap());
    let source = CdnDeclarationSource::new(
        format!("{}/cdn", backend.base_url),
        "3.7.3",
        vec!["lib.d.ts".into(), "lib.es5.d.ts".into()],
        timeout,
    );
    let views = Arc::new(HeadlessViewFactory::new());
    let deps = SessionDeps {
        sandboxes: Arc::new(SandboxManager::new(
            Arc::new(source),
            Arc::new(StructuralAnalysisBackend::new()),
            CompilerOptions::default(),
        )),
        validator: client.clone(),
        views: views.clone(),
        settings: SessionSettings::default(),
    };
    Wired {
        client,
        views,
        deps,
    }
}

fn last_view(wired: &Wired) -> Arc<HeadlessView> {
    wired.views.last_view().unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_default_strategy_round_trip() {
    let backend = start_backend(true).await;
    let wired = wire(&backend);

    let mut session = EditorSession::open(SessionOptions::editable(DEFAULT_STRATEGY), wired.deps.clone())
        .await
        .unwrap();
    let view = last_view(&wired);
    assert!(*session.ready().borrow());
    assert!(*session.has_errors().borrow(), "libraries are not installed yet");

    install_strategy_libraries(&mut session, wired.client.as_ref())
        .await
        .unwrap();
    session.flush_validation().await.unwrap();

    assert!(view.all_diagnostics().is_empty());
    assert!(!*session.has_errors().borrow());
    assert_eq!(backend.parse_calls.load(Ordering::SeqCst), 1);

    // Break the entry rule in the body of the strategy.
    let at = DEFAULT_STRATEGY.find("200").unwrap();
    let outcome = session
        .apply_edit(TextChange::new(at, at + 3, "0"))
        .unwrap();
    assert_eq!(outcome, EditOutcome::Applied);
    session.flush_validation().await.unwrap();

    let remote = view.diagnostics(DiagnosticOrigin::Remote);
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].message, "period must be positive");
    let doc = TextDocument::new(session.text());
    let line = doc.line_at(remote[0].from);
    assert_eq!(line.number, 4);
    assert_eq!(remote[0].span(), line.span());
    assert!(*session.has_errors().borrow());

    // The header stays untouched.
    let outcome = session.apply_edit(TextChange::insert(0, "//")).unwrap();
    assert_eq!(outcome, EditOutcome::Rejected);

    session.close().await;
    assert!(view.is_destroyed());
}

#[tokio::test]
async fn test_sessions_share_declaration_snapshot() {
    let backend = start_backend(true).await;
    let wired = wire(&backend);

    let first = EditorSession::open(SessionOptions::editable("const a = 1;"), wired.deps.clone())
        .await
        .unwrap();
    let second = EditorSession::open(SessionOptions::editable("const b = 2;"), wired.deps.clone())
        .await
        .unwrap();
    assert!(wired.deps.sandboxes.is_initialized().await);

    first.flush_validation().await.unwrap();
    second.flush_validation().await.unwrap();
    assert_eq!(backend.parse_calls.load(Ordering::SeqCst), 2);

    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn test_read_only_session_never_calls_backend() {
    let backend = start_backend(true).await;
    let wired = wire(&backend);

    let session = EditorSession::open(SessionOptions::read_only(DEFAULT_STRATEGY), wired.deps.clone())
        .await
        .unwrap();
    session.flush_validation().await.unwrap();

    assert!(session.is_read_only());
    assert!(!*session.has_errors().borrow());
    assert!(!wired.deps.sandboxes.is_initialized().await);
    assert_eq!(backend.parse_calls.load(Ordering::SeqCst), 0);
    session.close().await;
}

#[tokio::test]
async fn test_missing_validator_endpoint_is_reported() {
    let backend = start_backend(false).await;
    let wired = wire(&backend);

    let mut session = EditorSession::open(SessionOptions::editable("const a = 1;"), wired.deps.clone())
        .await
        .unwrap();
    session.flush_validation().await.unwrap();

    let failures = session.take_failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        Error::Transport {
            status: Some(404),
            ..
        }
    ));
    assert!(last_view(&wired).diagnostics(DiagnosticOrigin::Remote).is_empty());
    assert!(*session.has_errors().borrow(), "unverified content keeps the flag");
    session.close().await;
}
