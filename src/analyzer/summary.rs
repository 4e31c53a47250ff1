use crate::model::ImageRecord;
use crate::storage::sqlite::{STATUS_ANALYSED, STATUS_ERROR};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated view over every image of one assignment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AssignmentSummary {
    pub total_images: usize,
    pub analysed: usize,
    pub failed: usize,
    pub pending: usize,
    pub pure: usize,
    pub abused: usize,
    pub empty: usize,
    /// Mean chargeability over analysed images that reported one.
    pub avg_chargeability: Option<f64>,
    /// Detected objects per object kind, across all analysed images.
    pub object_counts: BTreeMap<String, usize>,
}

pub fn summarize(records: &[ImageRecord]) -> AssignmentSummary {
    let mut summary = AssignmentSummary {
        total_images: records.len(),
        ..AssignmentSummary::default()
    };
    let mut charge_sum = 0.0;
    let mut charge_count = 0usize;

    for record in records {
        match record.status.as_str() {
            STATUS_ANALYSED => summary.analysed += 1,
            STATUS_ERROR => {
                summary.failed += 1;
                continue;
            }
            _ => {
                summary.pending += 1;
                continue;
            }
        }

        if record.purity.as_deref() == Some("Pure") {
            summary.pure += 1;
        }
        if record.abused.as_deref() == Some("Yes") {
            summary.abused += 1;
        }
        if record.emptyy.as_deref() == Some("Yes") {
            summary.empty += 1;
        }
        if let Some(charge) = record.chargeability {
            charge_sum += charge;
            charge_count += 1;
        }
        for object in &record.detected_objects {
            let kind = object.object_kind.clone().unwrap_or_else(|| "Unknown".into());
            *summary.object_counts.entry(kind).or_default() += 1;
        }
    }

    if charge_count > 0 {
        summary.avg_chargeability = Some(charge_sum / charge_count as f64);
    }

    summary
}
