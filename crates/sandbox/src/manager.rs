//! Sandbox lifecycle.

use std::sync::Arc;

use strategy_editor_core::Result;

use crate::engine::{
    AnalysisBackend, CompilerOptions, DeclarationSnapshot, DeclarationSource, SandboxEnvironment,
    SandboxId, VirtualFileSystem,
};

// =============================================================================
// Sandbox Manager
// =============================================================================

/// Creates sandbox environments over a lazily loaded declaration snapshot.
///
/// The snapshot is loaded on the first `acquire` and reused by every later
/// environment built from this manager. The host owns the manager and shares
/// it between documents; each environment gets its own filesystem overlay
/// and language service.
pub struct SandboxManager {
    source: Arc<dyn DeclarationSource>,
    backend: Arc<dyn AnalysisBackend>,
    options: CompilerOptions,
    snapshot: tokio::sync::RwLock<Option<Arc<DeclarationSnapshot>>>,
}

impl SandboxManager {
    /// Create a new sandbox manager.
    pub fn new(
        source: Arc<dyn DeclarationSource>,
        backend: Arc<dyn AnalysisBackend>,
        options: CompilerOptions,
    ) -> Self {
        Self {
            source,
            backend,
            options,
            snapshot: tokio::sync::RwLock::new(None),
        }
    }

    /// Build a fresh environment for one document.
    pub async fn acquire(&self) -> Result<SandboxEnvironment> {
        let snapshot = self.snapshot().await?;
        let service = self.backend.create_service(&self.options)?;
        let id = SandboxId(format!("sandbox-{}", uuid::Uuid::new_v4()));

        tracing::debug!(sandbox_id = %id, declarations = snapshot.len(), "Sandbox environment created");
        Ok(SandboxEnvironment::new(
            id,
            VirtualFileSystem::new(snapshot),
            service,
        ))
    }

    /// Dispose an environment's language service. The snapshot stays cached.
    pub fn release(&self, mut env: SandboxEnvironment) {
        env.dispose();
        tracing::debug!(sandbox_id = %env.id(), "Sandbox environment released");
    }

    /// Whether the declaration snapshot has been loaded.
    pub async fn is_initialized(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    async fn snapshot(&self) -> Result<Arc<DeclarationSnapshot>> {
        // Fast path: snapshot already loaded
        {
            let guard = self.snapshot.read().await;
            if let Some(ref snapshot) = *guard {
                return Ok(snapshot.clone());
            }
        }

        // Slow path: load it
        let mut guard = self.snapshot.write().await;
        // Double-check after acquiring write lock
        if let Some(ref snapshot) = *guard {
            return Ok(snapshot.clone());
        }

        let snapshot = Arc::new(self.source.load(&self.options).await?);
        tracing::info!(files = snapshot.len(), "Declaration snapshot loaded");
        *guard = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StructuralAnalysisBackend;
    use crate::engine::StaticDeclarationSource;
    use std::collections::HashMap;

    fn manager(source: Arc<StaticDeclarationSource>) -> SandboxManager {
        SandboxManager::new(
            source,
            Arc::new(StructuralAnalysisBackend::new()),
            CompilerOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_snapshot_loaded_once_across_acquisitions() {
        let source = Arc::new(StaticDeclarationSource::new(HashMap::from([(
            "/lib.d.ts".to_string(),
            String::new(),
        )])));
        let manager = manager(source.clone());
        assert!(!manager.is_initialized().await);

        let first = manager.acquire().await.unwrap();
        let second = manager.acquire().await.unwrap();

        assert_eq!(source.load_count(), 1);
        assert!(manager.is_initialized().await);
        assert_ne!(first.id(), second.id());
        assert!(Arc::ptr_eq(first.fs().snapshot(), second.fs().snapshot()));
    }

    #[tokio::test]
    async fn test_environments_do_not_share_files() {
        let manager = manager(Arc::new(StaticDeclarationSource::default()));
        let mut first = manager.acquire().await.unwrap();
        let second = manager.acquire().await.unwrap();

        first.upsert_file("/universe.ts", "declare module \"universe\" {}").unwrap();
        assert!(first.fs().exists("/universe.ts"));
        assert!(!second.fs().exists("/universe.ts"));
    }

    #[tokio::test]
    async fn test_release_keeps_snapshot_cached() {
        let source = Arc::new(StaticDeclarationSource::default());
        let manager = manager(source.clone());

        let env = manager.acquire().await.unwrap();
        manager.release(env);
        assert!(manager.is_initialized().await);

        let env = manager.acquire().await.unwrap();
        assert!(!env.is_disposed());
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_loads_once() {
        let source = Arc::new(StaticDeclarationSource::default());
        let manager = Arc::new(manager(source.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.acquire().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(source.load_count(), 1);
    }
}
