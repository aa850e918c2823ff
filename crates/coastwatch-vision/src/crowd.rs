//! Crowd density scoring from detector output.

use tracing::{debug, warn};

use coastwatch_models::{round2, CrowdLevel, CrowdScore, PersonDetection};

use crate::detector::PeopleDetector;
use crate::frame::Frame;

/// Minimum confidence for a detection to be counted.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// COCO class id for "person".
pub const PERSON_CLASS_ID: usize = 0;

/// Map a head count onto the 0-10 crowd scale.
///
/// Early individuals weigh more than incremental crowding:
/// 1-5 people add 1.5 each (capped at 5), 6-15 add 0.5 each,
/// anything above 15 saturates.
pub fn crowd_score_for_count(count: u32) -> f64 {
    match count {
        0 => 0.0,
        1..=5 => (count as f64 * 1.5).min(5.0),
        6..=15 => 5.0 + (count - 5) as f64 * 0.5,
        _ => 10.0,
    }
}

/// Stateless crowd scorer.
#[derive(Debug, Clone, Copy)]
pub struct CrowdScorer {
    confidence_threshold: f32,
    target_class: usize,
}

impl CrowdScorer {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            target_class: PERSON_CLASS_ID,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Aggregate raw detections for a frame of `frame_area` pixels.
    pub fn score(&self, detections: &[PersonDetection], frame_area: u64) -> CrowdScore {
        let accepted: Vec<PersonDetection> = detections
            .iter()
            .filter(|d| d.class_id == self.target_class && d.confidence > self.confidence_threshold)
            .cloned()
            .collect();

        let people_count = accepted.len() as u32;
        let score = crowd_score_for_count(people_count);

        CrowdScore {
            people_count,
            level: CrowdLevel::from_score(score),
            score: round2(score),
            area_per_person: frame_area / people_count.max(1) as u64,
            detections: accepted,
        }
    }

    /// Run the detector on a frame and score the result.
    ///
    /// Never fails: an unavailable detector yields [`CrowdScore::unknown`],
    /// a failed inference yields [`CrowdScore::failed`].
    pub fn assess(&self, detector: &dyn PeopleDetector, frame: &Frame) -> CrowdScore {
        if !detector.is_available() {
            return CrowdScore::unknown();
        }

        match detector.detect(frame) {
            Ok(detections) => {
                let crowd = self.score(&detections, frame.area());
                debug!(
                    detector = detector.name(),
                    raw = detections.len(),
                    people = crowd.people_count,
                    "Crowd frame scored"
                );
                crowd
            }
            Err(e) if e.is_unavailable() => {
                warn!(detector = detector.name(), error = %e, "People detector unavailable");
                CrowdScore::unknown()
            }
            Err(e) => {
                warn!(detector = detector.name(), error = %e, "People detection failed");
                CrowdScore::failed()
            }
        }
    }
}

impl Default for CrowdScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::UnavailableDetector;
    use crate::error::DetectorError;
    use coastwatch_models::BoundingBox;
    use image::{GrayImage, Luma};

    fn people(n: usize, confidence: f32) -> Vec<PersonDetection> {
        (0..n)
            .map(|i| PersonDetection::person(BoundingBox::new(i as f32, 0.0, 10.0, 20.0), confidence))
            .collect()
    }

    #[test]
    fn test_count_mapping() {
        let cases = [
            (0, 0.0, CrowdLevel::Empty),
            (1, 1.5, CrowdLevel::Empty),
            (5, 5.0, CrowdLevel::Moderate),
            (6, 5.5, CrowdLevel::Moderate),
            (15, 10.0, CrowdLevel::VeryCrowded),
            (16, 10.0, CrowdLevel::VeryCrowded),
        ];
        let scorer = CrowdScorer::default();
        for (count, score, level) in cases {
            assert_eq!(crowd_score_for_count(count), score, "count={count}");
            let crowd = scorer.score(&people(count as usize, 0.9), 10_000);
            assert_eq!(crowd.people_count, count);
            assert_eq!(crowd.score, score);
            assert_eq!(crowd.level, level, "count={count}");
        }
    }

    #[test]
    fn test_mid_range_levels() {
        assert_eq!(CrowdLevel::from_score(crowd_score_for_count(2)), CrowdLevel::Sparse);
        assert_eq!(CrowdLevel::from_score(crowd_score_for_count(10)), CrowdLevel::Crowded);
    }

    #[test]
    fn test_filters_low_confidence_and_other_classes() {
        let mut detections = people(2, 0.9);
        detections.extend(people(3, 0.5)); // threshold is exclusive
        detections.push(PersonDetection::new(BoundingBox::new(0.0, 0.0, 5.0, 5.0), 0.99, 2));

        let crowd = CrowdScorer::default().score(&detections, 1_000);
        assert_eq!(crowd.people_count, 2);
        assert_eq!(crowd.detections.len(), 2);
        assert_eq!(crowd.area_per_person, 500);
    }

    #[test]
    fn test_empty_frame_area_per_person_uses_full_area() {
        let crowd = CrowdScorer::default().score(&[], 76_800);
        assert_eq!(crowd.area_per_person, 76_800);
        assert_eq!(crowd.level, CrowdLevel::Empty);
    }

    struct FailingDetector;

    impl PeopleDetector for FailingDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
            Err(DetectorError::inference("tensor shape mismatch"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct FixedDetector(Vec<PersonDetection>);

    impl PeopleDetector for FixedDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<PersonDetection>, DetectorError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn frame() -> Frame {
        Frame::from_gray(GrayImage::from_pixel(40, 30, Luma([0])))
    }

    #[test]
    fn test_assess_degrades_when_unavailable() {
        let crowd = CrowdScorer::default().assess(&UnavailableDetector::default(), &frame());
        assert_eq!(crowd, CrowdScore::unknown());
        assert_eq!(crowd.level.name(), "unknown");
    }

    #[test]
    fn test_assess_reports_inference_failure() {
        let crowd = CrowdScorer::default().assess(&FailingDetector, &frame());
        assert_eq!(crowd.level, CrowdLevel::Error);
        assert_eq!(crowd.people_count, 0);
    }

    #[test]
    fn test_assess_uses_frame_area() {
        let crowd = CrowdScorer::default().assess(&FixedDetector(people(3, 0.8)), &frame());
        assert_eq!(crowd.people_count, 3);
        assert_eq!(crowd.area_per_person, 400);
        assert_eq!(crowd.level, CrowdLevel::Moderate);
    }
}
