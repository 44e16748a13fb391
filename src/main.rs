#![deny(unused)]
//! strategy-check - headless strategy checker.
//!
//! Opens a strategy file the way the editor does, installs the helper API and
//! the instrument universe, waits for the remote validator and prints every
//! diagnostic. Exits non-zero when the strategy has errors.

mod tracing_layer;

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use strategy_editor_core::config::EditorConfig;
use strategy_editor_core::{Diagnostic, HeadlessViewFactory, Severity, TextDocument};
use strategy_editor_sandbox::{
    CdnDeclarationSource, CompilerOptions, SandboxManager, ScriptTarget,
    StructuralAnalysisBackend, DEFAULT_STRATEGY,
};
use strategy_editor_validation::{
    install_strategy_libraries, BacktestClient, EditorSession, SessionDeps, SessionOptions,
    SessionSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = EditorConfig::load().context("failed to load configuration")?;
    tracing_layer::configure_tracing(&config.logging)?;

    tracing::info!("Starting strategy-check v{}", env!("CARGO_PKG_VERSION"));

    let (name, code) = match std::env::args().nth(1) {
        Some(path) => {
            let code = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path))?;
            (path, code)
        }
        None => {
            tracing::info!("No strategy file given, checking the default strategy");
            ("<default>".to_string(), DEFAULT_STRATEGY.to_string())
        }
    };

    // =========================================================================
    // Sandbox
    // =========================================================================
    let timeout = Duration::from_millis(config.api.request_timeout_ms);
    let target: ScriptTarget = config.sandbox.target.parse()?;
    let source = CdnDeclarationSource::new(
        config.sandbox.cdn_prefix.clone(),
        config.sandbox.declaration_version.clone(),
        config.sandbox.lib_files.clone(),
        timeout,
    );
    let sandboxes = Arc::new(SandboxManager::new(
        Arc::new(source),
        Arc::new(StructuralAnalysisBackend::new()),
        CompilerOptions { target },
    ));
    tracing::info!(
        version = %config.sandbox.declaration_version,
        target = ?target,
        "Sandbox manager initialized"
    );

    // =========================================================================
    // Backtest API
    // =========================================================================
    let client = Arc::new(BacktestClient::new(&config.api.base_url, timeout)?);
    tracing::info!(base_url = %client.base_url(), "Backtest client initialized");

    // =========================================================================
    // Session
    // =========================================================================
    let views = Arc::new(HeadlessViewFactory::new());
    let deps = SessionDeps {
        sandboxes,
        validator: client.clone(),
        views: views.clone(),
        settings: SessionSettings::from_config(&config),
    };
    let mut session = EditorSession::open(SessionOptions::editable(code), deps).await?;

    if let Err(e) = install_strategy_libraries(&mut session, client.as_ref()).await {
        eprintln!("warning: instrument universe unavailable: {}", e);
    }
    session.flush_validation().await?;

    for failure in session.take_failures() {
        eprintln!("warning: remote validation unavailable: {}", failure);
    }

    let doc = TextDocument::new(session.text());
    let mut diagnostics = views
        .last_view()
        .map(|view| view.all_diagnostics())
        .unwrap_or_default();
    diagnostics.sort_by_key(|d| (d.from, d.to));
    for diagnostic in &diagnostics {
        println!("{}", format_diagnostic(&name, &doc, diagnostic));
    }

    let has_errors = *session.has_errors().borrow();
    session.close().await;

    if has_errors {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        println!("{}: {} error(s); strategy not accepted", name, errors);
        Ok(ExitCode::FAILURE)
    } else {
        println!("{}: ok", name);
        Ok(ExitCode::SUCCESS)
    }
}

/// `name:line:column: severity [source] message`, 1-based positions.
fn format_diagnostic(name: &str, doc: &TextDocument, diagnostic: &Diagnostic) -> String {
    let line = doc.line_at(diagnostic.from);
    let column = diagnostic.from - line.from + 1;
    let severity = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    format!(
        "{}:{}:{}: {} [{}] {}",
        name, line.number, column, severity, diagnostic.source, diagnostic.message
    )
}
