use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::source::ImageRef;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to create OCR engine: {0}")]
    EngineCreation(String),
    #[error("Failed to load image: {0}")]
    ImageLoad(String),
    #[error("OCR recognition failed: {0}")]
    Recognition(String),
    #[error("Failed to release OCR engine: {0}")]
    Release(String),
    #[error("Tesseract not available, build with `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
///
/// Each extraction acquires its own `Worker`, uses it for exactly one
/// recognition, and hands it back through [`OcrEngine::release`]. Acquire and
/// release are synchronous: `recognize` is the only await point, so a
/// cancelled call always has a guard owning its worker.
pub trait OcrEngine: Send + Sync {
    type Worker: Send;

    fn acquire(&self, language: &str) -> Result<Self::Worker, OcrError>;

    fn recognize(
        &self,
        worker: &mut Self::Worker,
        image: &ImageRef,
    ) -> impl Future<Output = Result<String, OcrError>> + Send;

    fn release(&self, worker: Self::Worker) -> Result<(), OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Where a [`MockEngine`] should fail, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFailure {
    #[default]
    None,
    Acquire,
    Recognize,
    Release,
    /// `recognize` never completes.
    Hang,
}

/// Shared call counters, so tests can check the release guarantee.
#[derive(Debug, Default)]
pub struct MockCounters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl MockCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Returns a pre-set string, useful for testing the extraction pipeline
/// without requiring Tesseract to be installed.
#[derive(Debug, Clone)]
pub struct MockEngine {
    pub text: String,
    pub failure: MockFailure,
    pub counters: Arc<MockCounters>,
}

#[derive(Debug)]
pub struct MockWorker {
    pub language: String,
}

impl MockEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failure: MockFailure::None,
            counters: Arc::new(MockCounters::default()),
        }
    }

    pub fn failing(failure: MockFailure) -> Self {
        Self { failure, ..Self::new("") }
    }
}

impl OcrEngine for MockEngine {
    type Worker = MockWorker;

    fn acquire(&self, language: &str) -> Result<MockWorker, OcrError> {
        if self.failure == MockFailure::Acquire {
            return Err(OcrError::EngineCreation("mock acquire failure".into()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockWorker { language: language.to_string() })
    }

    async fn recognize(
        &self,
        _worker: &mut MockWorker,
        _image: &ImageRef,
    ) -> Result<String, OcrError> {
        match self.failure {
            MockFailure::Recognize => {
                Err(OcrError::Recognition("mock unreadable image".into()))
            }
            MockFailure::Hang => std::future::pending::<Result<String, OcrError>>().await,
            _ => Ok(self.text.clone()),
        }
    }

    fn release(&self, _worker: MockWorker) -> Result<(), OcrError> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        if self.failure == MockFailure::Release {
            return Err(OcrError::Release("mock release failure".into()));
        }
        Ok(())
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrEngine, OcrError};
    use crate::preprocess::prepare_screenshot;
    use crate::source::{load_image, ImageRef};
    use leptess::LepTess;

    /// One `LepTess` instance per extraction; dropping it frees the
    /// Tesseract handle.
    pub struct TesseractEngine {
        data_path: Option<String>,
    }

    impl TesseractEngine {
        pub fn new(data_path: Option<String>) -> Self {
            Self { data_path }
        }
    }

    impl OcrEngine for TesseractEngine {
        type Worker = LepTess;

        fn acquire(&self, language: &str) -> Result<LepTess, OcrError> {
            LepTess::new(self.data_path.as_deref(), language)
                .map_err(|e| OcrError::EngineCreation(e.to_string()))
        }

        async fn recognize(
            &self,
            worker: &mut LepTess,
            image: &ImageRef,
        ) -> Result<String, OcrError> {
            let bytes = load_image(image).await?;
            let png = prepare_screenshot(&bytes)
                .map_err(|e| OcrError::Recognition(e.to_string()))?;
            worker
                .set_image_from_mem(&png)
                .map_err(|e| OcrError::Recognition(e.to_string()))?;
            worker
                .get_utf8_text()
                .map_err(|e| OcrError::Recognition(e.to_string()))
        }

        fn release(&self, worker: LepTess) -> Result<(), OcrError> {
            drop(worker);
            Ok(())
        }
    }
}

/// Stand-in used when the crate is built without the `tesseract` feature.
/// Every acquisition fails, so extractions degrade instead of erroring.
#[cfg(not(feature = "tesseract"))]
pub mod tesseract_backend {
    use super::{OcrEngine, OcrError};
    use crate::source::ImageRef;

    pub struct TesseractEngine;

    impl TesseractEngine {
        pub fn new(_data_path: Option<String>) -> Self {
            Self
        }
    }

    impl OcrEngine for TesseractEngine {
        type Worker = ();

        fn acquire(&self, _language: &str) -> Result<(), OcrError> {
            Err(OcrError::NotAvailable)
        }

        async fn recognize(&self, _worker: &mut (), _image: &ImageRef) -> Result<String, OcrError> {
            Err(OcrError::NotAvailable)
        }

        fn release(&self, _worker: ()) -> Result<(), OcrError> {
            Ok(())
        }
    }
}
