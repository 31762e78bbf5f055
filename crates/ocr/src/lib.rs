pub mod config;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod source;
pub mod types;

pub use config::{ConfigError, ExtractionConfig, ProviderKeywords};
pub use extract::Extractor;
pub use normalize::{sanitize_identifier, sanitize_value, NormalizedText};
pub use pipeline::{PipelineError, ProofPipeline};
pub use preprocess::{prepare_screenshot, PreprocessError};
pub use recognizer::tesseract_backend::TesseractEngine;
pub use recognizer::{MockEngine, MockFailure, OcrEngine, OcrError};
pub use source::{load_image, ImageRef};
pub use types::{ExtractionRecord, UpiProvider};
