use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct EditorConfig {
    pub api: ApiConfig,
    pub validation: ValidationConfig,
    pub editor: EditorSettings,
    pub sandbox: SandboxSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationConfig {
    pub debounce_ms: u64,
}

impl ValidationConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorSettings {
    /// Virtual path the edited document is mirrored to inside the sandbox.
    pub document_path: String,
    pub protected_lines: usize,
    pub styled_lines: Vec<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxSettings {
    pub target: String,
    pub declaration_version: String,
    pub cdn_prefix: String,
    pub lib_files: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl EditorConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env =
            std::env::var("STRATEGY_EDITOR_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map STRATEGY_EDITOR__API__BASE_URL=... to api.base_url
            .add_source(Environment::with_prefix("STRATEGY_EDITOR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080".into(),
                request_timeout_ms: 10_000,
            },
            validation: ValidationConfig { debounce_ms: 500 },
            editor: EditorSettings {
                document_path: "/index.ts".into(),
                protected_lines: 2,
                styled_lines: vec![1, 2],
            },
            sandbox: SandboxSettings {
                target: "ES2015".into(),
                declaration_version: "3.7.3".into(),
                cdn_prefix: "https://playgroundcdn.typescriptlang.org/cdn".into(),
                lib_files: vec![
                    "lib.d.ts".into(),
                    "lib.es5.d.ts".into(),
                    "lib.es2015.d.ts".into(),
                    "lib.es2015.core.d.ts".into(),
                    "lib.es2015.collection.d.ts".into(),
                    "lib.es2015.generator.d.ts".into(),
                    "lib.es2015.iterable.d.ts".into(),
                    "lib.es2015.promise.d.ts".into(),
                    "lib.es2015.proxy.d.ts".into(),
                    "lib.es2015.reflect.d.ts".into(),
                    "lib.es2015.symbol.d.ts".into(),
                    "lib.es2015.symbol.wellknown.d.ts".into(),
                    "lib.dom.d.ts".into(),
                ],
            },
            logging: LoggingConfig {
                filter: "info,strategy_editor=debug".into(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_contract() {
        let config = EditorConfig::default();
        assert_eq!(config.validation.debounce(), Duration::from_millis(500));
        assert_eq!(config.editor.protected_lines, 2);
        assert_eq!(config.editor.styled_lines, vec![1, 2]);
        assert_eq!(config.editor.document_path, "/index.ts");
        assert_eq!(config.sandbox.target, "ES2015");
        assert!(config.sandbox.lib_files.contains(&"lib.es5.d.ts".to_string()));
    }
}
