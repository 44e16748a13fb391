//! Declaration files fetched from the TypeScript playground CDN.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::time::Duration;

use strategy_editor_core::{Error, Result};

use crate::engine::{CompilerOptions, DeclarationSnapshot, DeclarationSource, ScriptTarget};

const ES5_LIBS: &[&str] = &[
    "lib.d.ts",
    "lib.es5.d.ts",
    "lib.dom.d.ts",
    "lib.dom.iterable.d.ts",
    "lib.webworker.importscripts.d.ts",
    "lib.scripthost.d.ts",
];

const ES2015_LIBS: &[&str] = &[
    "lib.es2015.d.ts",
    "lib.es2015.core.d.ts",
    "lib.es2015.collection.d.ts",
    "lib.es2015.generator.d.ts",
    "lib.es2015.iterable.d.ts",
    "lib.es2015.promise.d.ts",
    "lib.es2015.proxy.d.ts",
    "lib.es2015.reflect.d.ts",
    "lib.es2015.symbol.d.ts",
    "lib.es2015.symbol.wellknown.d.ts",
];

const ES2017_LIBS: &[&str] = &[
    "lib.es2016.d.ts",
    "lib.es2016.array.include.d.ts",
    "lib.es2017.d.ts",
    "lib.es2017.object.d.ts",
    "lib.es2017.string.d.ts",
    "lib.es2017.intl.d.ts",
];

/// Standard library files for a compilation target.
pub fn default_lib_files(target: ScriptTarget) -> Vec<String> {
    let tiers: &[&[&str]] = match target {
        ScriptTarget::Es5 => &[ES5_LIBS],
        ScriptTarget::Es2015 => &[ES5_LIBS, ES2015_LIBS],
        ScriptTarget::Es2017 | ScriptTarget::EsNext => &[ES5_LIBS, ES2015_LIBS, ES2017_LIBS],
    };
    tiers
        .iter()
        .flat_map(|tier| tier.iter().map(|f| f.to_string()))
        .collect()
}

/// Downloads `{prefix}/{version}/typescript/lib/{file}` for every lib file,
/// concurrently, into a snapshot keyed `/{file}`.
pub struct CdnDeclarationSource {
    client: reqwest::Client,
    prefix: String,
    version: String,
    lib_files: Vec<String>,
}

impl CdnDeclarationSource {
    /// An empty `lib_files` falls back to [`default_lib_files`] of the target.
    pub fn new(
        prefix: impl Into<String>,
        version: impl Into<String>,
        lib_files: Vec<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            prefix: prefix.into().trim_end_matches('/').to_string(),
            version: version.into(),
            lib_files,
        }
    }

    fn url(&self, file: &str) -> String {
        format!("{}/{}/typescript/lib/{}", self.prefix, self.version, file)
    }

    async fn fetch(&self, file: String) -> Result<(String, String)> {
        let url = self.url(&file);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::declaration_load(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::declaration_load(format!("{}: HTTP {}", url, status)));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Error::declaration_load(format!("{}: {}", url, e)))?;

        tracing::trace!(file = %file, bytes = body.len(), "Declaration file downloaded");
        Ok((format!("/{}", file), body))
    }
}

#[async_trait]
impl DeclarationSource for CdnDeclarationSource {
    async fn load(&self, options: &CompilerOptions) -> Result<DeclarationSnapshot> {
        let files = if self.lib_files.is_empty() {
            default_lib_files(options.target)
        } else {
            self.lib_files.clone()
        };

        tracing::info!(
            version = %self.version,
            files = files.len(),
            "Downloading declaration files"
        );
        let fetched = try_join_all(files.into_iter().map(|file| self.fetch(file))).await?;
        Ok(DeclarationSnapshot::new(fetched.into_iter().collect::<HashMap<_, _>>()))
    }
}
