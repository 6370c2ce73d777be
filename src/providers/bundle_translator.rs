use super::{Segment, TextTranslator, TranslatedBundle, TranslationProvider};
use crate::bundle::{LocalizationBundle, LOCALE_KEY};
use crate::error::ProviderError;
use crate::placeholders::check_placeholders;
use crate::staging::StageHandle;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Translates staged ARB files through a text backend and writes the result
/// to the output directory.
pub struct BundleTranslator {
    backend: Arc<dyn TextTranslator>,
    output_dir: PathBuf,
}

impl BundleTranslator {
    pub fn new(backend: Arc<dyn TextTranslator>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
        }
    }

    /// Serialize `bundle` and write it under a unique `{target}_*.arb` name.
    /// File I/O runs on the blocking pool.
    async fn write_output(
        &self,
        bundle: &LocalizationBundle,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let json = bundle.to_pretty_json().map_err(ProviderError::Encode)?;
        let dir = self.output_dir.clone();
        let prefix = format!("{}_", target_language);

        let written =
            tokio::task::spawn_blocking(move || write_unique(&dir, &prefix, json.as_bytes()))
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
                .and_then(|result| result)
                .map_err(|source| ProviderError::Io {
                    path: self.output_dir.clone(),
                    source,
                })?;
        Ok(written.display().to_string())
    }
}

fn write_unique(dir: &Path, prefix: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".arb")
        .tempfile_in(dir)?;
    file.write_all(contents)?;
    file.into_temp_path().keep().map_err(|e| e.error)
}

/// Entries worth sending to a backend: translatable keys with non-empty text.
fn collect_segments(bundle: &LocalizationBundle) -> Vec<Segment> {
    bundle
        .messages()
        .filter_map(|(key, value)| match value {
            Value::String(text) if !text.is_empty() => {
                let segment = Segment::new(key.as_str(), text.as_str());
                Some(match bundle.description(key) {
                    Some(description) => segment.with_description(description),
                    None => segment,
                })
            }
            _ => None,
        })
        .collect()
}

/// Rebuild the bundle in source order with translated values and the target
/// locale. Metadata and untranslatable entries are copied through.
fn assemble(
    source: &LocalizationBundle,
    segments: &[Segment],
    translations: Vec<String>,
    target_language: &str,
) -> LocalizationBundle {
    let mut translated: HashMap<&str, String> = HashMap::with_capacity(segments.len());
    for (segment, text) in segments.iter().zip(translations) {
        if let Some(warning) = check_placeholders(&segment.key, &segment.text, &text) {
            warn!("Translation to {}: {}", target_language, warning);
        }
        translated.insert(segment.key.as_str(), text);
    }

    let mut output = LocalizationBundle::new();
    for (key, value) in source.iter() {
        if key == LOCALE_KEY {
            output.insert(key.as_str(), Value::String(target_language.to_string()));
        } else if let Some(text) = translated.remove(key.as_str()) {
            output.insert(key.as_str(), Value::String(text));
        } else {
            output.insert(key.as_str(), value.clone());
        }
    }
    if source.locale().is_none() {
        output.set_locale(target_language);
    }
    output
}

#[async_trait]
impl TranslationProvider for BundleTranslator {
    async fn translate_bundle(
        &self,
        source: &StageHandle,
        source_language: &str,
        target_language: &str,
    ) -> Result<TranslatedBundle, ProviderError> {
        let raw = tokio::fs::read_to_string(source.path())
            .await
            .map_err(|e| ProviderError::Io {
                path: source.path().to_path_buf(),
                source: e,
            })?;
        let bundle = LocalizationBundle::from_json_str(&raw)?;

        let segments = collect_segments(&bundle);
        let translations = if segments.is_empty() {
            Vec::new()
        } else {
            self.backend
                .translate_segments(&segments, source_language, target_language)
                .await?
        };

        if translations.len() != segments.len() {
            return Err(ProviderError::Malformed {
                provider: self.backend.name(),
                message: format!(
                    "expected {} translations, got {}",
                    segments.len(),
                    translations.len()
                ),
            });
        }

        let content = assemble(&bundle, &segments, translations, target_language);
        let location = self.write_output(&content, target_language).await?;
        debug!(
            "Translated {} entries to {} at {}",
            segments.len(),
            target_language,
            location
        );

        Ok(TranslatedBundle { content, location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedBackend;
    use crate::staging::{ResourceStage, TempFileStage};
    use serde_json::json;
    use tempfile::TempDir;

    fn source_bundle() -> LocalizationBundle {
        LocalizationBundle::from_value(json!({
            "@@locale": "en",
            "title": "Home",
            "@title": {"description": "Screen title"},
            "empty": "",
            "count": 3
        }))
        .unwrap()
    }

    #[test]
    fn test_collect_segments_skips_metadata_and_empty_values() {
        let segments = collect_segments(&source_bundle());
        assert_eq!(
            segments,
            vec![Segment::new("title", "Home").with_description("Screen title")]
        );
    }

    #[test]
    fn test_assemble_sets_locale_and_keeps_order() {
        let bundle = source_bundle();
        let segments = collect_segments(&bundle);
        let output = assemble(&bundle, &segments, vec!["Inicio".to_string()], "es");

        let keys: Vec<&str> = output.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["@@locale", "title", "@title", "empty", "count"]);
        assert_eq!(output.locale(), Some("es"));
        assert_eq!(output.get("title"), Some(&json!("Inicio")));
        assert_eq!(output.get("@title"), Some(&json!({"description": "Screen title"})));
        assert_eq!(output.get("empty"), Some(&json!("")));
        assert_eq!(output.get("count"), Some(&json!(3)));
    }

    #[test]
    fn test_assemble_adds_missing_locale() {
        let bundle = LocalizationBundle::from_value(json!({"a": "b"})).unwrap();
        let segments = collect_segments(&bundle);
        let output = assemble(&bundle, &segments, vec!["B".to_string()], "fr");
        assert_eq!(output.locale(), Some("fr"));
    }

    #[tokio::test]
    async fn test_translate_bundle_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let stage = TempFileStage::new(temp_dir.path().join("staging"));
        let handle = stage.acquire(&source_bundle()).unwrap();

        let translator = BundleTranslator::new(
            Arc::new(ScriptedBackend::ok("scripted")),
            temp_dir.path().join("output"),
        );
        let result = translator
            .translate_bundle(&handle, "en", "es")
            .await
            .expect("Should translate");

        assert_eq!(result.content.get("title"), Some(&json!("[es] HOME")));
        assert!(result.location.ends_with(".arb"));
        let written = std::fs::read_to_string(&result.location).unwrap();
        assert_eq!(
            LocalizationBundle::from_json_str(&written).unwrap(),
            result.content
        );
    }

    #[tokio::test]
    async fn test_translate_bundle_without_segments_skips_backend() {
        let temp_dir = TempDir::new().unwrap();
        let stage = TempFileStage::new(temp_dir.path());
        let handle = stage
            .acquire(&LocalizationBundle::from_value(json!({"@@locale": "en", "a": ""})).unwrap())
            .unwrap();

        let backend = Arc::new(ScriptedBackend::failing("scripted", 500));
        let translator = BundleTranslator::new(backend.clone(), temp_dir.path());
        let result = translator.translate_bundle(&handle, "en", "de").await;

        assert!(result.is_ok());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_translate_bundle_missing_stage_file() {
        let temp_dir = TempDir::new().unwrap();
        let translator =
            BundleTranslator::new(Arc::new(ScriptedBackend::ok("scripted")), temp_dir.path());

        let error = translator
            .translate_bundle(
                &StageHandle::new(temp_dir.path().join("gone.arb")),
                "en",
                "es",
            )
            .await
            .unwrap_err();

        assert!(matches!(error, ProviderError::Io { .. }));
    }

    #[tokio::test]
    async fn test_translate_bundle_corrupt_stage_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupt.arb");
        std::fs::write(&path, "{not json").unwrap();
        let translator =
            BundleTranslator::new(Arc::new(ScriptedBackend::ok("scripted")), temp_dir.path());

        let error = translator
            .translate_bundle(&StageHandle::new(path), "en", "es")
            .await
            .unwrap_err();

        assert!(matches!(error, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unwritable_output_dir_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let stage = TempFileStage::new(temp_dir.path().join("staging"));
        let handle = stage.acquire(&source_bundle()).unwrap();
        let blocked = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocked, "occupied").unwrap();

        let translator =
            BundleTranslator::new(Arc::new(ScriptedBackend::ok("scripted")), &blocked);
        let error = translator
            .translate_bundle(&handle, "en", "es")
            .await
            .unwrap_err();

        match error {
            ProviderError::Io { path, .. } => assert_eq!(path, blocked),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translate_bundle_backend_failure() {
        let temp_dir = TempDir::new().unwrap();
        let stage = TempFileStage::new(temp_dir.path());
        let handle = stage.acquire(&source_bundle()).unwrap();
        let translator = BundleTranslator::new(
            Arc::new(ScriptedBackend::failing("scripted", 400)),
            temp_dir.path(),
        );

        let error = translator
            .translate_bundle(&handle, "en", "es")
            .await
            .unwrap_err();

        assert!(error.to_string().contains("400"));
    }
}
