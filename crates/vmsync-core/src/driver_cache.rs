// ── Driver cache ──
//
// Resolving a hardware unit's driver means scanning its recording server's
// driver collection, which is slow. Results (including "no driver") are
// memoized per hardware id for the life of the cache. The lock is held
// across the scan so concurrent lookups of the same unit scan only once.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{DriverRecord, Entity, EntityId, EntityKind, child_folder};
use crate::service::ConfigService;

#[derive(Debug, Default)]
pub struct DriverCache {
    entries: Mutex<HashMap<EntityId, Option<DriverRecord>>>,
}

impl DriverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver for `hardware`, scanning `recorder_path`'s drivers on a miss.
    ///
    /// Returns `Ok(None)` when no driver matches the hardware's driver path.
    /// Failed scans are not cached.
    pub async fn get_driver(
        &self,
        service: &dyn ConfigService,
        hardware: &Entity,
        recorder_path: &str,
    ) -> Result<Option<DriverRecord>, CoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(hit) = entries.get(&hardware.id) {
            return Ok(hit.clone());
        }

        let wanted = hardware.property("HardwareDriverPath").unwrap_or_default();
        let drivers = service
            .get_child_items(&child_folder(recorder_path, EntityKind::HardwareDriver))
            .await?;
        let driver = drivers
            .iter()
            .find(|d| d.path.eq_ignore_ascii_case(wanted))
            .map(DriverRecord::from);

        debug!(
            hardware = %hardware.name,
            driver = driver.as_ref().map_or("<none>", |d| d.name.as_str()),
            "resolved hardware driver"
        );
        entries.insert(hardware.id.clone(), driver.clone());
        Ok(driver)
    }

    pub async fn cached_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::service::fake::{FakeService, driver, hardware, recorder};

    fn fixture(delay: Option<Duration>) -> (FakeService, Entity, Entity) {
        let fake = match delay {
            Some(d) => FakeService::new().with_child_delay(d),
            None => FakeService::new(),
        };
        let rec = recorder("r1", "Recorder 1");
        let axis = driver(&rec, "d1", "Axis Generic", 806);
        let hw = hardware(&rec, "h1", "Lobby encoder")
            .with_property("HardwareDriverPath", axis.path.clone());
        fake.insert(rec.clone());
        fake.insert(axis);
        fake.insert(driver(&rec, "d2", "Bosch", 421));
        fake.insert(hw.clone());
        (fake, rec, hw)
    }

    #[tokio::test]
    async fn resolves_by_driver_path_and_memoizes() {
        let (fake, rec, hw) = fixture(None);
        let cache = DriverCache::new();

        let first = cache.get_driver(&fake, &hw, &rec.path).await.unwrap().unwrap();
        let second = cache.get_driver(&fake, &hw, &rec.path).await.unwrap().unwrap();

        assert_eq!(first.name, "Axis Generic");
        assert_eq!(first.number, 806);
        assert_eq!(first, second);
        assert_eq!(
            fake.child_calls(&child_folder(&rec.path, EntityKind::HardwareDriver)),
            1
        );
    }

    #[tokio::test]
    async fn missing_driver_is_cached_as_none() {
        let (fake, rec, hw) = fixture(None);
        let orphan = hardware(&rec, "h2", "Orphan")
            .with_property("HardwareDriverPath", "/nowhere/HardwareDriver[x]");
        fake.insert(orphan.clone());
        let cache = DriverCache::new();

        assert!(cache.get_driver(&fake, &orphan, &rec.path).await.unwrap().is_none());
        assert!(cache.get_driver(&fake, &orphan, &rec.path).await.unwrap().is_none());
        assert_eq!(cache.cached_count().await, 1);

        cache.get_driver(&fake, &hw, &rec.path).await.unwrap();
        assert_eq!(
            fake.child_calls(&child_folder(&rec.path, EntityKind::HardwareDriver)),
            2
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_scan_once() {
        let (fake, rec, hw) = fixture(Some(Duration::from_millis(20)));
        let fake = Arc::new(fake);
        let cache = Arc::new(DriverCache::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (fake, cache, hw, path) =
                (Arc::clone(&fake), Arc::clone(&cache), hw.clone(), rec.path.clone());
            handles.push(tokio::spawn(async move {
                cache.get_driver(fake.as_ref(), &hw, &path).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().number, 806);
        }

        assert_eq!(
            fake.child_calls(&child_folder(&rec.path, EntityKind::HardwareDriver)),
            1
        );
    }
}
