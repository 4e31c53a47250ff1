use crate::model::{ClassifyError, DetectionResult, Purity, Verdict, YesNo};
use crate::normalizer::{normalize, BrandCatalog};
use crate::parser::parse_detection;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Trait defining the interface for a cooler content classifier.
pub trait Classifier {
    fn classify(&self, detection: &DetectionResult) -> Verdict;

    /// Classifies, turning any unexpected panic into `InternalError`.
    fn try_classify(&self, detection: &DetectionResult) -> Result<Verdict, ClassifyError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.classify(detection))).map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            ClassifyError::InternalError(reason)
        })
    }

    /// Parses and validates a raw identification response, then classifies it.
    fn evaluate(&self, response: &str) -> Result<Verdict, ClassifyError> {
        let detection = parse_detection(response)?;
        self.try_classify(&detection)
    }
}

/// Classifies coolers against a shared reference brand catalog.
#[derive(Debug, Clone)]
pub struct CoolerClassifier {
    catalog: Arc<BrandCatalog>,
}

impl CoolerClassifier {
    pub fn new(catalog: Arc<BrandCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &BrandCatalog {
        &self.catalog
    }
}

impl Classifier for CoolerClassifier {
    fn classify(&self, detection: &DetectionResult) -> Verdict {
        if detection.objects.is_empty() {
            return Verdict {
                chargeability_percentage: detection.chargeability_percentage.clone(),
                auditable: detection.auditable.clone(),
                purity: Purity::Impure,
                abused: YesNo::Yes,
                empty: YesNo::Yes,
                non_coca_cola_products: Vec::new(),
            };
        }

        let mut matched = 0usize;
        let mut non_matching = Vec::new();

        for object in &detection.objects {
            match normalize(object.label.as_deref()) {
                Some(key) if self.catalog.matches(&key) => matched += 1,
                // unparseable labels keep their raw text, missing ones stay None
                _ => non_matching.push(object.label.clone()),
            }
        }

        debug!(
            "Classified {} objects: {} matched, {} non-matching",
            detection.objects.len(),
            matched,
            non_matching.len()
        );

        Verdict {
            chargeability_percentage: detection.chargeability_percentage.clone(),
            auditable: detection.auditable.clone(),
            purity: if matched == detection.objects.len() {
                Purity::Pure
            } else {
                Purity::Impure
            },
            abused: YesNo::from_bool(matched == 0),
            empty: YesNo::No,
            non_coca_cola_products: non_matching,
        }
    }
}
