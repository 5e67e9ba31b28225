//! Per-run metrics and their two renderings: the tagged JSON line read by
//! harnesses and the human summary written to the log.

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};
use crate::run_id::RunId;
use crate::timing::{millis, Timed};

/// Prefix of the single machine-readable stdout line.
pub const METRICS_PREFIX: &str = "PERFORMANCE_METRICS_JSON:";

const RULE_WIDTH: usize = 50;

/// The metrics of one successful run. Field order is the JSON order.
///
/// Values are unrounded milliseconds (and megabytes for `file_size_mb`).
/// Earlier versions of this tool rounded every value to two decimals; here
/// only [`MetricsRecord::summary_lines`] rounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub test_id: String,
    pub start_time: String,
    pub file_size_mb: f64,
    pub upload_time_ms: f64,
    pub sas_generation_time_ms: f64,
    pub download_time_ms: f64,
    pub total_time_ms: f64,
    pub upload_to_download_time_ms: f64,
}

impl MetricsRecord {
    /// `PERFORMANCE_METRICS_JSON:{...}` on one line.
    pub fn to_tagged_line(&self) -> BenchResult<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| BenchError::Internal(format!("metrics serialization: {e}")))?;
        Ok(format!("{METRICS_PREFIX}{json}"))
    }

    /// Parse a line produced by [`MetricsRecord::to_tagged_line`].
    pub fn from_tagged_line(line: &str) -> Option<Self> {
        let json = line.strip_prefix(METRICS_PREFIX)?;
        serde_json::from_str(json).ok()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let rule = "=".repeat(RULE_WIDTH);
        vec![
            "Performance Test Results:".to_string(),
            rule.clone(),
            format!("Test ID: {}", self.test_id),
            format!("File Size: {:.2} MB", self.file_size_mb),
            format!("Upload Time: {:.2} ms", self.upload_time_ms),
            format!("SAS Generation Time: {:.2} ms", self.sas_generation_time_ms),
            format!("Download Time: {:.2} ms", self.download_time_ms),
            format!("Total Time: {:.2} ms", self.total_time_ms),
            format!("Upload to Download Time: {:.2} ms", self.upload_to_download_time_ms),
            rule,
        ]
    }
}

type Window = (Instant, Instant);

fn window_of<T>(timed: &Timed<T>) -> Window {
    (timed.started, timed.finished)
}

fn span_ms(from: Instant, to: Instant) -> f64 {
    millis(to.saturating_duration_since(from))
}

/// Collects stage results as the run progresses.
///
/// Each `with_*` call consumes and returns the builder, so a record can only
/// be finished once every stage has reported.
#[derive(Clone, Debug)]
pub struct MetricsBuilder {
    test_id: RunId,
    start_time: DateTime<Utc>,
    run_started: Instant,
    file_size_mb: Option<f64>,
    upload: Option<Window>,
    link: Option<Window>,
    download: Option<Window>,
}

impl MetricsBuilder {
    /// `run_started` marks the beginning of payload generation and anchors
    /// `total_time_ms`.
    pub fn new(test_id: RunId, start_time: DateTime<Utc>, run_started: Instant) -> Self {
        Self {
            test_id,
            start_time,
            run_started,
            file_size_mb: None,
            upload: None,
            link: None,
            download: None,
        }
    }

    pub fn with_payload(mut self, size_mb: f64) -> Self {
        self.file_size_mb = Some(size_mb);
        self
    }

    pub fn with_upload<T>(mut self, upload: &Timed<T>) -> Self {
        self.upload = Some(window_of(upload));
        self
    }

    pub fn with_link<T>(mut self, link: &Timed<T>) -> Self {
        self.link = Some(window_of(link));
        self
    }

    pub fn with_download<T>(mut self, download: &Timed<T>) -> Self {
        self.download = Some(window_of(download));
        self
    }

    pub fn finish(self) -> BenchResult<MetricsRecord> {
        let missing = |stage: &str| BenchError::Internal(format!("no {stage} timing recorded"));
        let file_size_mb = self.file_size_mb.ok_or_else(|| missing("payload"))?;
        let upload = self.upload.ok_or_else(|| missing("upload"))?;
        let link = self.link.ok_or_else(|| missing("link"))?;
        let download = self.download.ok_or_else(|| missing("download"))?;

        Ok(MetricsRecord {
            test_id: self.test_id.to_string(),
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Micros, true),
            file_size_mb,
            upload_time_ms: span_ms(upload.0, upload.1),
            sas_generation_time_ms: span_ms(link.0, link.1),
            download_time_ms: span_ms(download.0, download.1),
            total_time_ms: span_ms(self.run_started, download.1),
            upload_to_download_time_ms: span_ms(upload.0, download.1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::timed_sync;
    use chrono::TimeZone;
    use std::time::Duration;

    fn run_id() -> RunId {
        serde_json::from_str("\"test_1704110400_4242\"").unwrap()
    }

    fn stage(ms: u64) -> Timed<()> {
        timed_sync(|| std::thread::sleep(Duration::from_millis(ms)))
    }

    fn sample_record() -> MetricsRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let run_started = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        let upload = stage(3);
        let link = stage(1);
        let download = stage(3);
        MetricsBuilder::new(run_id(), start, run_started)
            .with_payload(0.75)
            .with_upload(&upload)
            .with_link(&link)
            .with_download(&download)
            .finish()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Derived timings
    // -----------------------------------------------------------------------

    #[test]
    fn derived_spans_cover_their_stages() {
        let r = sample_record();
        assert!(r.upload_time_ms > 0.0);
        assert!(r.sas_generation_time_ms > 0.0);
        assert!(r.download_time_ms > 0.0);
        assert!(r.upload_to_download_time_ms >= r.upload_time_ms);
        assert!(r.upload_to_download_time_ms >= r.sas_generation_time_ms);
        assert!(r.upload_to_download_time_ms >= r.download_time_ms);
        assert!(r.total_time_ms >= r.upload_to_download_time_ms);
        assert!(
            r.upload_to_download_time_ms
                >= r.upload_time_ms + r.sas_generation_time_ms + r.download_time_ms - 1e-6
        );
    }

    #[test]
    fn finish_requires_every_stage() {
        let builder = MetricsBuilder::new(run_id(), Utc::now(), Instant::now()).with_payload(1.0);
        let upload = stage(0);
        let err = builder.clone().with_upload(&upload).finish().unwrap_err();
        assert!(matches!(err, BenchError::Internal(msg) if msg.contains("link")));
        assert!(builder.finish().is_err());
    }

    #[test]
    fn start_time_is_iso8601_utc() {
        let r = sample_record();
        assert_eq!(r.start_time, "2024-01-01T12:00:00.000000Z");
        assert!(DateTime::parse_from_rfc3339(&r.start_time).is_ok());
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    #[test]
    fn tagged_line_has_prefix_and_all_fields_in_order() {
        let line = sample_record().to_tagged_line().unwrap();
        assert!(line.starts_with("PERFORMANCE_METRICS_JSON:{"));
        assert!(!line.contains('\n'));

        let json: serde_json::Value =
            serde_json::from_str(line.strip_prefix(METRICS_PREFIX).unwrap()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        assert_eq!(obj["test_id"], "test_1704110400_4242");

        let order = [
            "test_id",
            "start_time",
            "file_size_mb",
            "upload_time_ms",
            "sas_generation_time_ms",
            "download_time_ms",
            "total_time_ms",
            "upload_to_download_time_ms",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|field| line.find(&format!("\"{field}\"")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn tagged_line_parses_back() {
        let record = sample_record();
        let line = record.to_tagged_line().unwrap();
        let parsed = MetricsRecord::from_tagged_line(&line).unwrap();
        assert_eq!(parsed.test_id, record.test_id);
        assert_eq!(parsed.start_time, record.start_time);
        assert_eq!(parsed.file_size_mb, 0.75);
        assert!((parsed.total_time_ms - record.total_time_ms).abs() < 1e-9);
        assert_eq!(MetricsRecord::from_tagged_line("not a metrics line"), None);
    }

    #[test]
    fn tagged_line_keeps_full_precision() {
        let record = MetricsRecord {
            file_size_mb: 0.123456,
            download_time_ms: 12.3456789,
            ..sample_record()
        };
        let line = record.to_tagged_line().unwrap();
        assert!(line.contains("\"file_size_mb\":0.123456"));
        assert!(line.contains("\"download_time_ms\":12.3456789"));
        assert!(record.summary_lines().contains(&"File Size: 0.12 MB".to_string()));
    }

    #[test]
    fn summary_is_framed() {
        let lines = sample_record().summary_lines();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "Performance Test Results:");
        assert_eq!(lines[1], "=".repeat(50));
        assert_eq!(lines[9], "=".repeat(50));
        assert_eq!(lines[2], "Test ID: test_1704110400_4242");
        assert_eq!(lines[3], "File Size: 0.75 MB");
        assert!(lines[8].starts_with("Upload to Download Time: "));
    }
}
