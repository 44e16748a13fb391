//! Strategy libraries installed into a fresh session.

use strategy_editor_core::{tickers, Result, UniverseProvider};
use strategy_editor_sandbox::{
    helper_methods_module, universe_module, HELPER_METHODS_PATH, UNIVERSE_PATH,
};

use crate::session::EditorSession;

/// Inject the helper API and the universe fetched from `provider`.
///
/// The helper module is installed first, so a universe failure still leaves
/// helper completions working. The failure is logged and returned to the
/// host, which decides how to present it.
pub async fn install_strategy_libraries(
    session: &mut EditorSession,
    provider: &dyn UniverseProvider,
) -> Result<()> {
    session.add_extra_lib(HELPER_METHODS_PATH, helper_methods_module())?;

    let universe = match provider.get_universe().await {
        Ok(universe) => universe,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch instrument universe");
            return Err(e);
        }
    };

    let tickers = tickers(&universe);
    session.add_extra_lib(UNIVERSE_PATH, &universe_module(&tickers))?;
    tracing::info!(instruments = tickers.len(), "Strategy libraries installed");
    Ok(())
}
