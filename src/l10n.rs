use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// Localization messages for one language, parsed from a TOML file:
///
/// ```toml
/// locale-code = "en"
/// display-name = "English"
///
/// [messages]
/// user_welcome = "Hi! ..."
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    #[serde(rename = "locale-code")]
    pub locale_code: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
    #[serde(default)]
    pub messages: HashMap<String, String>,
}

impl Bundle {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("unable to parse locale bundle")
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }
}

/// Resolves a message key plus a language tag to display text.
///
/// Lookup order: requested language, then the fallback language, then the
/// key itself. Bundles are loaded once at startup and never change.
pub struct Localizer {
    fallback_language: String,
    bundles: HashMap<String, Bundle>,
}

impl Localizer {
    pub fn new(fallback_language: &str) -> Self {
        Self {
            fallback_language: fallback_language.to_string(),
            bundles: HashMap::new(),
        }
    }

    pub fn add_bundle(&mut self, bundle: Bundle) -> Result<()> {
        if self.bundles.contains_key(&bundle.locale_code) {
            bail!("bundle for locale {} already added", bundle.locale_code);
        }
        self.bundles.insert(bundle.locale_code.clone(), bundle);
        Ok(())
    }

    pub fn get(&self, key: &str, lang: &str) -> String {
        if let Some(text) = self.bundles.get(lang).and_then(|b| b.get(key)) {
            return text.to_string();
        }
        if let Some(text) = self
            .bundles
            .get(&self.fallback_language)
            .and_then(|b| b.get(key))
        {
            return text.to_string();
        }
        key.to_string()
    }

    /// Look up a template and substitute its `{}` placeholders in order.
    pub fn render(&self, key: &str, lang: &str, args: &[&str]) -> String {
        let mut text = self.get(key, lang);
        for arg in args {
            text = text.replacen("{}", arg, 1);
        }
        text
    }

    /// Load every `*.toml` bundle from a directory. A file that fails to
    /// parse is logged and skipped rather than aborting startup.
    pub async fn load_from_dir(dir: &Path, fallback_language: &str) -> Result<Self> {
        let mut localizer = Self::new(fallback_language);

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read locales directory: {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match load_bundle_file(&path).await {
                Ok(bundle) => {
                    let label = format!("{} ({})", bundle.locale_code, bundle.display_name);
                    match localizer.add_bundle(bundle) {
                        Ok(()) => info!("Loaded locale {}", label),
                        Err(e) => warn!("Skipping locale from {}: {}", path.display(), e),
                    }
                }
                Err(e) => warn!("Failed to load locale from {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} locales", localizer.bundles.len());
        Ok(localizer)
    }
}

async fn load_bundle_file(path: &Path) -> Result<Bundle> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read locale file: {}", path.display()))?;
    Bundle::parse(&content)
}
