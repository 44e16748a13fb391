//! Library injection into a sandbox.
//!
//! Strategies import two virtual modules: the helper API (`helper-methods`)
//! and the instrument universe (`universe`), generated from the tickers the
//! backend offers.

use strategy_editor_core::{Error, Result};

use crate::engine::{FileChange, SandboxEnvironment};

/// Virtual path of the helper API declarations.
pub const HELPER_METHODS_PATH: &str = "/helper-methods.ts";

/// Virtual path of the generated instrument universe.
pub const UNIVERSE_PATH: &str = "/universe.ts";

/// Strategy a new editor starts from. The first two lines are the imports
/// that stay protected from user edits.
pub const DEFAULT_STRATEGY: &str = r#"import { Mode, main } from "helper-methods";
import { Instrument } from "universe";

export const entry = main.priceMinute() > main.priceMinute().trend.sma(200);
export const exit = main.priceMinute() < main.priceMinute().trend.sma(200);

export const universe = [Instrument.BTCUSDT, Instrument.ETHUSDT];

export const name = "strategy1";

export const start = new Date(2020, 1, 1);

export const mode = Mode.Backtest;"#;

/// Declarations of the helper API.
pub fn helper_methods_module() -> &'static str {
    include_str!("../declarations/helper-methods.d.ts")
}

/// `declare module "universe"` with one `Instrument` member per ticker.
pub fn universe_module(tickers: &[String]) -> String {
    format!(
        r#"
declare module "universe" {{
  /**
   * @description
   * Instruments available for backtesting.
   *
   * @example
   * export const universe = [Instrument.BTCUSDT, Instrument.ETHUSDT];
   */
  export enum Instrument {{
    {}
  }}
}}
"#,
        tickers.join(", ")
    )
}

/// Create or replace `path` inside the sandbox.
///
/// `env` is `None` until the sandbox has been acquired; writing before then
/// is an ordering bug in the caller and fails with
/// [`Error::SandboxUninitialized`]. Diagnostics are not refreshed here.
pub fn upsert_file(
    env: Option<&mut SandboxEnvironment>,
    path: &str,
    content: &str,
) -> Result<FileChange> {
    let env = env.ok_or_else(|| Error::sandbox_uninitialized(path))?;
    let change = env.upsert_file(path, content)?;
    tracing::debug!(sandbox_id = %env.id(), path, ?change, bytes = content.len(), "Library file injected");
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StructuralAnalysisBackend;
    use crate::engine::{
        AnalysisBackend, CompilerOptions, DeclarationSnapshot, SandboxId, VirtualFileSystem,
    };
    use std::sync::Arc;

    fn env() -> SandboxEnvironment {
        SandboxEnvironment::new(
            SandboxId("library-test".into()),
            VirtualFileSystem::new(Arc::new(DeclarationSnapshot::default())),
            StructuralAnalysisBackend::new()
                .create_service(&CompilerOptions::default())
                .unwrap(),
        )
    }

    #[test]
    fn test_upsert_before_acquire_is_fatal() {
        let err = upsert_file(None, UNIVERSE_PATH, "x").unwrap_err();
        assert!(matches!(err, Error::SandboxUninitialized { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_upsert_creates_then_replaces() {
        let mut env = env();
        assert_eq!(
            upsert_file(Some(&mut env), UNIVERSE_PATH, "a").unwrap(),
            FileChange::Created
        );
        assert_eq!(
            upsert_file(Some(&mut env), UNIVERSE_PATH, "b").unwrap(),
            FileChange::Updated
        );
        assert_eq!(env.fs().read(UNIVERSE_PATH), Some("b"));
        assert_eq!(env.fs().files().count(), 1);
    }

    #[test]
    fn test_universe_module_lists_tickers() {
        let module = universe_module(&["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
        assert!(module.contains("declare module \"universe\""));
        assert!(module.contains("BTCUSDT, ETHUSDT"));
    }

    #[test]
    fn test_default_strategy_checks_clean_with_libraries() {
        let mut env = env();
        upsert_file(Some(&mut env), HELPER_METHODS_PATH, helper_methods_module()).unwrap();
        upsert_file(
            Some(&mut env),
            UNIVERSE_PATH,
            &universe_module(&["BTCUSDT".to_string(), "ETHUSDT".to_string()]),
        )
        .unwrap();
        env.sync_document("/index.ts", DEFAULT_STRATEGY).unwrap();

        assert_eq!(env.diagnostics("/index.ts"), Vec::new());
    }

    #[test]
    fn test_default_strategy_without_universe_fails() {
        let mut env = env();
        upsert_file(Some(&mut env), HELPER_METHODS_PATH, helper_methods_module()).unwrap();
        env.sync_document("/index.ts", DEFAULT_STRATEGY).unwrap();

        let diagnostics = env.diagnostics("/index.ts");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Cannot find module 'universe'.");
    }
}
