use thiserror::Error;

use crate::config::ExtractionConfig;
use crate::extract::Extractor;
use crate::recognizer::{OcrEngine, OcrError};
use crate::source::ImageRef;
use crate::types::ExtractionRecord;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("OCR engine could not be created: {0}")]
    EngineCreation(#[source] OcrError),
    #[error("OCR recognition failed: {0}")]
    Recognition(#[source] OcrError),
}

/// Owns one acquired worker and hands it back to the engine on drop, so the
/// release runs exactly once on every exit path, including cancellation of
/// the surrounding future.
struct WorkerGuard<'a, E: OcrEngine> {
    engine: &'a E,
    worker: Option<E::Worker>,
}

impl<'a, E: OcrEngine> WorkerGuard<'a, E> {
    fn new(engine: &'a E, worker: E::Worker) -> Self {
        Self { engine, worker: Some(worker) }
    }

    async fn recognize(&mut self, image: &ImageRef) -> Result<String, OcrError> {
        match self.worker.as_mut() {
            Some(worker) => self.engine.recognize(worker, image).await,
            None => Err(OcrError::Recognition("OCR worker already released".into())),
        }
    }
}

impl<E: OcrEngine> Drop for WorkerGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            match self.engine.release(worker) {
                Ok(()) => tracing::debug!("OCR worker released"),
                Err(e) => tracing::warn!("Ignoring OCR release failure: {e}"),
            }
        }
    }
}

/// Orchestrates: acquire worker → recognize → extract → release.
///
/// Holds no per-call state, so one pipeline can serve concurrent uploads;
/// each call acquires its own worker.
pub struct ProofPipeline<E: OcrEngine> {
    engine: E,
    extractor: Extractor,
    language: String,
}

impl<E: OcrEngine> ProofPipeline<E> {
    /// Pipeline driven by the process-wide [`ExtractionConfig`].
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, ExtractionConfig::global())
    }

    pub fn with_config(engine: E, config: &ExtractionConfig) -> Self {
        Self {
            engine,
            extractor: Extractor::new(config),
            language: config.language.clone(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Read a payment screenshot. Never fails: engine or image problems
    /// produce [`ExtractionRecord::degraded`] and a warning.
    #[tracing::instrument(skip(self, image), fields(image = %image))]
    pub async fn extract(&self, image: &ImageRef) -> ExtractionRecord {
        match self.try_extract(image).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Proof extraction degraded: {e}");
                ExtractionRecord::degraded()
            }
        }
    }

    /// Same as [`extract`](Self::extract) but reports why nothing could be read.
    /// A failed release is logged, never returned.
    pub async fn try_extract(&self, image: &ImageRef) -> Result<ExtractionRecord, PipelineError> {
        tracing::debug!(language = %self.language, "Acquiring OCR worker");
        let worker = self
            .engine
            .acquire(&self.language)
            .map_err(PipelineError::EngineCreation)?;
        let mut guard = WorkerGuard::new(&self.engine, worker);

        let text = guard.recognize(image).await.map_err(PipelineError::Recognition)?;
        tracing::debug!(chars = text.chars().count(), "Recognition complete");

        Ok(self.extract_text(&text))
    }

    /// Extraction step alone, for text recognized elsewhere.
    pub fn extract_text(&self, raw_text: &str) -> ExtractionRecord {
        let record = self.extractor.extract(raw_text);
        tracing::debug!(missing = ?record.missing_fields(), "Extracted proof fields");
        record
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{MockEngine, MockFailure};
    use crate::types::UpiProvider;
    use bachat_core::Money;
    use std::time::Duration;

    const GPAY_TEXT: &str =
        "Paid ₹1,250.00 to Amit Kumar\r\nUPI transaction ID: ABC123456\r\nGoogle Pay";

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn image() -> ImageRef {
        ImageRef::Url("https://storage.example.com/proofs/42.jpg".into())
    }

    fn pipeline(engine: MockEngine) -> ProofPipeline<MockEngine> {
        ProofPipeline::with_config(engine, &ExtractionConfig::default())
    }

    #[tokio::test]
    async fn extract_reads_fields_and_releases_once() {
        init_tracing();
        let p = pipeline(MockEngine::new(GPAY_TEXT));

        let r = p.extract(&image()).await;

        assert_eq!(r.amount, Some(Money::parse("1250").unwrap()));
        assert_eq!(r.transaction_id.as_deref(), Some("ABC123456"));
        assert_eq!(r.payee_name.as_deref(), Some("Amit Kumar"));
        assert_eq!(r.upi_provider, Some(UpiProvider::Gpay));
        assert_eq!(r.raw_text_snippet, GPAY_TEXT.replace('\r', ""));
        assert_eq!(p.engine().counters.acquired(), 1);
        assert_eq!(p.engine().counters.released(), 1);
    }

    #[tokio::test]
    async fn acquire_failure_degrades_without_release() {
        init_tracing();
        let p = pipeline(MockEngine::failing(MockFailure::Acquire));

        let r = p.extract(&image()).await;

        assert!(r.is_degraded());
        assert_eq!(p.engine().counters.released(), 0);
        assert!(matches!(
            p.try_extract(&image()).await,
            Err(PipelineError::EngineCreation(_))
        ));
    }

    #[tokio::test]
    async fn recognition_failure_degrades_and_releases() {
        init_tracing();
        let p = pipeline(MockEngine::failing(MockFailure::Recognize));

        let r = p.extract(&image()).await;

        assert_eq!(r, ExtractionRecord::degraded());
        assert_eq!(r.raw_text_snippet, "");
        assert_eq!(p.engine().counters.acquired(), 1);
        assert_eq!(p.engine().counters.released(), 1);

        assert!(matches!(
            p.try_extract(&image()).await,
            Err(PipelineError::Recognition(OcrError::Recognition(_)))
        ));
        assert_eq!(p.engine().counters.released(), 2);
    }

    #[tokio::test]
    async fn release_failure_keeps_the_record() {
        init_tracing();
        let engine = MockEngine { text: GPAY_TEXT.into(), ..MockEngine::failing(MockFailure::Release) };
        let p = pipeline(engine);

        let r = p.extract(&image()).await;

        assert_eq!(r.transaction_id.as_deref(), Some("ABC123456"));
        assert_eq!(p.engine().counters.released(), 1);
    }

    #[tokio::test]
    async fn cancelled_extraction_still_releases() {
        init_tracing();
        let p = pipeline(MockEngine::failing(MockFailure::Hang));

        let res = tokio::time::timeout(Duration::from_millis(20), p.extract(&image())).await;

        assert!(res.is_err(), "hanging recognition should time out");
        assert_eq!(p.engine().counters.acquired(), 1);
        assert_eq!(p.engine().counters.released(), 1);
    }

    #[tokio::test]
    async fn unpolled_extraction_acquires_nothing() {
        let p = pipeline(MockEngine::new(GPAY_TEXT));

        drop(p.extract(&image()));
        let res = tokio::time::timeout(Duration::ZERO, p.extract(&image())).await;

        assert!(res.is_ok(), "mock recognition completes on first poll");
        assert_eq!(p.engine().counters.acquired(), 1);
        assert_eq!(p.engine().counters.released(), 1);
    }

    #[tokio::test]
    async fn global_config_pipeline() {
        init_tracing();
        let p = ProofPipeline::new(MockEngine::new("PhonePe\nTo: Ramesh Traders\nRs 500"));

        let r = p.extract(&image()).await;

        assert_eq!(r.upi_provider, Some(UpiProvider::Phonepe));
        assert_eq!(r.payee_name.as_deref(), Some("Ramesh Traders"));
        assert_eq!(r.amount, Some(Money::parse("500").unwrap()));
        assert_eq!(p.engine().counters.acquired(), 1);
        assert_eq!(p.engine().counters.released(), 1);
        assert_eq!(p.engine().text, "PhonePe\nTo: Ramesh Traders\nRs 500");
    }

    #[tokio::test]
    async fn concurrent_calls_use_separate_workers() {
        init_tracing();
        let p = pipeline(MockEngine::new("PhonePe\nTo: Ramesh Traders\nRs 500"));
        let a = ImageRef::Bytes(vec![1]);
        let b = ImageRef::Path("/uploads/2.png".into());

        let (ra, rb) = tokio::join!(p.extract(&a), p.extract(&b));

        assert_eq!(ra, rb);
        assert_eq!(ra.upi_provider, Some(UpiProvider::Phonepe));
        assert_eq!(p.engine().counters.acquired(), 2);
        assert_eq!(p.engine().counters.released(), 2);
    }

    #[tokio::test]
    async fn spawned_extraction_is_send() {
        let p = std::sync::Arc::new(pipeline(MockEngine::new("Rs 20")));
        let task = {
            let p = p.clone();
            tokio::spawn(async move { p.extract(&ImageRef::Bytes(vec![0])).await })
        };
        let r = task.await.unwrap();
        assert_eq!(r.amount, Some(Money::parse("20").unwrap()));
    }

    #[tokio::test]
    async fn empty_recognition_gives_empty_record() {
        let p = pipeline(MockEngine::new(""));
        let r = p.extract(&image()).await;
        assert!(r.is_degraded());
        assert_eq!(p.engine().counters.released(), 1);
    }

    #[tokio::test]
    async fn repeated_extraction_is_identical() {
        let p = pipeline(MockEngine::new(GPAY_TEXT));
        assert_eq!(p.extract(&image()).await, p.extract(&image()).await);
    }

    #[test]
    fn extract_text_matches_extractor() {
        let p = pipeline(MockEngine::new(""));
        let text = "PhonePe\nTo: Ramesh Traders\nRs 500\n12/04/2024 14:32";
        assert_eq!(
            p.extract_text(text),
            Extractor::new(&ExtractionConfig::default()).extract(text)
        );
    }

    #[cfg(not(feature = "tesseract"))]
    #[tokio::test]
    async fn missing_tesseract_degrades() {
        use crate::recognizer::tesseract_backend::TesseractEngine;
        let p = ProofPipeline::with_config(TesseractEngine::new(None), &ExtractionConfig::default());
        assert!(p.extract(&image()).await.is_degraded());
    }
}
