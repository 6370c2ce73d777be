use super::TranslationProvider;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn TranslationProvider>> + Send + Sync>;

/// Process-wide provider handle, built at most once on first use.
///
/// Concurrent first callers wait on the same initialization. A failed build
/// is not remembered, so the next caller tries again.
pub struct SharedProvider {
    cell: OnceCell<Arc<dyn TranslationProvider>>,
    factory: ProviderFactory,
}

impl SharedProvider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn TranslationProvider>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Wrap an already constructed provider.
    pub fn ready(provider: Arc<dyn TranslationProvider>) -> Self {
        let fallback = provider.clone();
        Self {
            cell: OnceCell::new_with(Some(provider)),
            factory: Box::new(move || Ok(fallback.clone())),
        }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn TranslationProvider>> {
        let provider = self
            .cell
            .get_or_try_init(|| async {
                info!("Initializing translation provider");
                (self.factory)()
            })
            .await?;
        Ok(Arc::clone(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::TranslatedBundle;
    use crate::staging::StageHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopProvider;

    #[async_trait]
    impl TranslationProvider for NoopProvider {
        async fn translate_bundle(
            &self,
            _source: &StageHandle,
            _source_language: &str,
            _target_language: &str,
        ) -> Result<TranslatedBundle, ProviderError> {
            Err(ProviderError::Exhausted(Vec::new()))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let shared = Arc::new(SharedProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(Arc::new(NoopProvider) as Arc<dyn TranslationProvider>)
        }));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let shared = shared.clone();
                tokio::spawn(async move { shared.get().await.is_ok() })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(shared.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_build_is_retried() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let shared = SharedProvider::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("no credentials yet");
            }
            Ok(Arc::new(NoopProvider) as Arc<dyn TranslationProvider>)
        });

        assert!(shared.get().await.is_err());
        assert!(!shared.is_initialized());
        assert!(shared.get().await.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ready_provider_is_returned() {
        let provider: Arc<dyn TranslationProvider> = Arc::new(NoopProvider);
        let shared = SharedProvider::ready(provider.clone());

        assert!(shared.is_initialized());
        let got = shared.get().await.unwrap();
        assert!(Arc::ptr_eq(&got, &provider));
    }
}
