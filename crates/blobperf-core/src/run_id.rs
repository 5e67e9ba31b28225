use std::fmt;

use blobperf_store::BlobLocation;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifier of a single benchmark run: `test_{unix_seconds}_{1000..=9999}`.
///
/// The random suffix keeps concurrent invocations started within the same
/// second from writing to the same blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: u16 = rng.gen_range(1000..=9999);
        Self(format!("test_{}_{}", now.timestamp(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blob key derived from this run.
    pub fn blob_key(&self) -> String {
        format!("test-image-{}.jpg", self.0)
    }

    /// Where this run's payload lives in `container`.
    pub fn location(&self, container: &str) -> BlobLocation {
        BlobLocation::new(container, self.blob_key())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn format_is_prefix_timestamp_suffix() {
        let id = RunId::generate(fixed_now(), &mut StdRng::seed_from_u64(5));
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "test");
        assert_eq!(parts[1], "1704110400");
        let suffix: u16 = parts[2].parse().unwrap();
        assert!((1000..=9999).contains(&suffix));
    }

    #[test]
    fn blob_key_and_location() {
        let id = RunId("test_1_1234".into());
        assert_eq!(id.blob_key(), "test-image-test_1_1234.jpg");
        let loc = id.location("performance-test");
        assert_eq!(loc.container, "performance-test");
        assert_eq!(loc.key, "test-image-test_1_1234.jpg");
    }

    #[test]
    fn ids_differ_across_draws() {
        let mut rng = StdRng::seed_from_u64(99);
        let ids: std::collections::HashSet<_> =
            (0..20).map(|_| RunId::generate(fixed_now(), &mut rng)).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = RunId("test_1_1234".into());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"test_1_1234\"");
    }
}
