use crate::analyzer::{Classifier, CoolerClassifier};
use crate::model::{AnalysisError, DetectionResult, StoreImage, Verdict};
use crate::parser::parse_detection;
use crate::scraper::{Identifier, ImageFetcher};
use crate::storage::SqliteStorage;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ImageOutcome {
    Analysed(Verdict),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub assignment_id: i64,
    pub outcomes: BTreeMap<i64, ImageOutcome>,
}

impl AnalysisReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ImageOutcome::Failed(_)))
            .count()
    }
}

/// Runs fetch, identification, classification and persistence for every
/// image of an assignment. Images are independent: one failure is recorded
/// on that image and the rest of the batch carries on.
pub struct AnalysisPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    identifier: Arc<dyn Identifier>,
    classifier: CoolerClassifier,
    storage: Arc<Mutex<SqliteStorage>>,
    max_concurrency: usize,
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        identifier: Arc<dyn Identifier>,
        classifier: CoolerClassifier,
        storage: Arc<Mutex<SqliteStorage>>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            identifier,
            classifier,
            storage,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn run_analysis(&self, assignment_id: i64) -> Result<AnalysisReport, AnalysisError> {
        info!("Starting analysis for assignment {}", assignment_id);

        let images = self.storage.lock().await.get_images(assignment_id)?;
        if images.is_empty() {
            info!("No images found for assignment {}", assignment_id);
            return Ok(AnalysisReport {
                assignment_id,
                outcomes: BTreeMap::new(),
            });
        }

        let outcomes: BTreeMap<i64, ImageOutcome> = stream::iter(images)
            .map(|image| self.process_image(image))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        self.storage
            .lock()
            .await
            .mark_assignment_analysed(assignment_id)?;

        let report = AnalysisReport {
            assignment_id,
            outcomes,
        };
        info!(
            "Analysis completed for assignment {}: {} images, {} failed",
            assignment_id,
            report.outcomes.len(),
            report.failed()
        );
        Ok(report)
    }

    async fn process_image(&self, image: StoreImage) -> (i64, ImageOutcome) {
        info!("Processing image {} ({})", image.image_id, image.image_url);

        let result = match self.analyse_image(&image).await {
            Ok((detection, verdict)) => self
                .storage
                .lock()
                .await
                .save_image_verdict(image.image_id, &detection, &verdict)
                .map(|_| verdict)
                .map_err(AnalysisError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(verdict) => {
                info!(
                    "Image {}: purity={} abused={} empty={}",
                    image.image_id, verdict.purity, verdict.abused, verdict.empty
                );
                (image.image_id, ImageOutcome::Analysed(verdict))
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Image {} failed: {}", image.image_id, reason);
                if let Err(mark_err) = self
                    .storage
                    .lock()
                    .await
                    .mark_image_failed(image.image_id, &reason)
                {
                    warn!("Could not mark image {} as failed: {}", image.image_id, mark_err);
                }
                (image.image_id, ImageOutcome::Failed(reason))
            }
        }
    }

    async fn analyse_image(&self, image: &StoreImage) -> Result<(DetectionResult, Verdict), AnalysisError> {
        let bytes = self.fetcher.fetch(&image.image_url).await?;
        let response = self.identifier.identify(&bytes).await?;
        let detection = parse_detection(&response)?;
        let verdict = self.classifier.try_classify(&detection)?;
        Ok((detection, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchError, IdentifyError, Purity, YesNo};
    use crate::normalizer::BrandCatalog;
    use crate::storage::sqlite::{STATUS_ANALYSED, STATUS_ERROR, STATUS_PENDING};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves canned bytes per URL; unknown URLs fail with a timeout.
    struct FakeFetcher {
        images: HashMap<String, Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.images.get(url).cloned().ok_or(FetchError::Timeout)
        }
    }

    /// Answers with the response registered for the image bytes.
    struct FakeIdentifier {
        responses: HashMap<Vec<u8>, String>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Identifier for FakeIdentifier {
        async fn identify(&self, image: &[u8]) -> Result<String, IdentifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(image)
                .cloned()
                .ok_or(IdentifyError::Status(503))
        }
    }

    struct Fixture {
        pipeline: AnalysisPipeline,
        storage: Arc<Mutex<SqliteStorage>>,
        identifier: Arc<FakeIdentifier>,
        assignment: i64,
        ids: HashMap<&'static str, i64>,
    }

    fn fixture(max_concurrency: usize) -> Fixture {
        let storage = SqliteStorage::in_memory().unwrap();
        let assignment = storage.add_assignment().unwrap();

        let cases: [(&'static str, &'static [u8], Option<&'static str>); 5] = [
            ("pure", b"img-pure", Some("```json\n{\"chargeability_percentage\": 90, \"auditable\": \"Yes\", \"objects\": [{\"object\": \"Bottle\", \"label\": \"Sprite\"}]}\n```")),
            ("mixed", b"img-mixed", Some("{\"objects\": [{\"label\": \"Sprite\"}, {\"label\": \"Pepsi\"}]}")),
            ("empty", b"img-empty", Some("{\"chargeability_percentage\": 0, \"objects\": []}")),
            ("garbled", b"img-garbled", Some("I could not read this photo.")),
            ("down", b"img-down", None),
        ];

        let mut images = HashMap::new();
        let mut responses = HashMap::new();
        let mut ids = HashMap::new();
        for (name, bytes, response) in cases {
            let url = format!("https://blob/{}.jpg", name);
            ids.insert(name, storage.add_image(assignment, &url).unwrap());
            images.insert(url, bytes.to_vec());
            if let Some(body) = response {
                responses.insert(bytes.to_vec(), body.to_string());
            }
        }
        // an image whose download never succeeds
        ids.insert("missing", storage.add_image(assignment, "https://blob/missing.jpg").unwrap());

        let storage = Arc::new(Mutex::new(storage));
        let identifier = Arc::new(FakeIdentifier {
            responses,
            calls: AtomicUsize::new(0),
        });
        let pipeline = AnalysisPipeline::new(
            Arc::new(FakeFetcher { images }),
            identifier.clone(),
            CoolerClassifier::new(Arc::new(BrandCatalog::default())),
            storage.clone(),
            max_concurrency,
        );

        Fixture {
            pipeline,
            storage,
            identifier,
            assignment,
            ids,
        }
    }

    #[tokio::test]
    async fn isolates_per_image_failures() {
        let fx = fixture(3);
        let report = fx.pipeline.run_analysis(fx.assignment).await.unwrap();

        assert_eq!(report.outcomes.len(), 6);
        assert_eq!(report.failed(), 3);

        match &report.outcomes[&fx.ids["pure"]] {
            ImageOutcome::Analysed(v) => {
                assert_eq!(v.purity, Purity::Pure);
                assert_eq!(v.chargeability_percentage, Some(serde_json::Number::from(90)));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        match &report.outcomes[&fx.ids["mixed"]] {
            ImageOutcome::Analysed(v) => {
                assert_eq!(v.purity, Purity::Impure);
                assert_eq!(v.abused, YesNo::No);
                assert_eq!(v.non_coca_cola_products, vec![Some("Pepsi".to_string())]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        match &report.outcomes[&fx.ids["empty"]] {
            ImageOutcome::Analysed(v) => assert_eq!(v.empty, YesNo::Yes),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(
            &report.outcomes[&fx.ids["garbled"]],
            ImageOutcome::Failed(reason) if reason.starts_with("classification failed: invalid input")
        ));
        assert!(matches!(
            &report.outcomes[&fx.ids["down"]],
            ImageOutcome::Failed(reason) if reason.contains("503")
        ));
        assert!(matches!(
            &report.outcomes[&fx.ids["missing"]],
            ImageOutcome::Failed(reason) if reason == "fetch failed: request timed out"
        ));

        // the missing image never reaches identification
        assert_eq!(fx.identifier.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn persists_results_and_error_markers() {
        let fx = fixture(1);
        fx.pipeline.run_analysis(fx.assignment).await.unwrap();

        let storage = fx.storage.lock().await;
        assert_eq!(storage.assignment_status(fx.assignment).unwrap(), STATUS_ANALYSED);

        let records = storage.get_image_records(fx.assignment).unwrap();
        let by_id: HashMap<i64, _> = records.iter().map(|r| (r.image_id, r)).collect();

        let pure = by_id[&fx.ids["pure"]];
        assert_eq!(pure.status, STATUS_ANALYSED);
        assert_eq!(pure.purity.as_deref(), Some("Pure"));
        assert_eq!(pure.emptyy.as_deref(), Some("No"));
        assert_eq!(pure.auditable_photo.as_deref(), Some("Yes"));
        assert_eq!(pure.detected_objects.len(), 1);

        let empty = by_id[&fx.ids["empty"]];
        assert_eq!(empty.emptyy.as_deref(), Some("Yes"));
        assert_eq!(empty.abused.as_deref(), Some("Yes"));

        let down = by_id[&fx.ids["down"]];
        assert_eq!(down.status, STATUS_ERROR);
        assert!(down.error.as_deref().unwrap_or_default().contains("503"));
    }

    #[tokio::test]
    async fn assignment_without_images_is_left_alone() {
        let storage = SqliteStorage::in_memory().unwrap();
        let assignment = storage.add_assignment().unwrap();
        let storage = Arc::new(Mutex::new(storage));
        let pipeline = AnalysisPipeline::new(
            Arc::new(FakeFetcher { images: HashMap::new() }),
            Arc::new(FakeIdentifier {
                responses: HashMap::new(),
                calls: AtomicUsize::new(0),
            }),
            CoolerClassifier::new(Arc::new(BrandCatalog::default())),
            storage.clone(),
            0,
        );

        let report = pipeline.run_analysis(assignment).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(storage.lock().await.assignment_status(assignment).unwrap(), STATUS_PENDING);
    }
}
