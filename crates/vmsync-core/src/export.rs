// ── Export ──
//
// Projects live entities into desired-state records, filling in the
// `ReadOnly*` columns an operator needs to recognise each row: owning
// recording server, hardware name, driver, MAC address, stream resolution.
// Lookups that cannot be answered degrade to placeholder values; only a
// failure to enumerate the entities themselves fails the export.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::EntityCatalog;
use crate::config::EngineSettings;
use crate::driver_cache::DriverCache;
use crate::error::CoreError;
use crate::model::{
    CameraRecord, DeviceRecord, DriverRecord, Entity, EntityKind, HardwareRecord, RecorderRecord,
};
use crate::parallel;
use crate::service::ConfigService;

/// Server method that materializes a hardware unit's stored password.
pub const READ_PASSWORD_METHOD: &str = "ReadPasswordHardware";

const UNKNOWN: &str = "Unknown";
const NOT_AVAILABLE: &str = "Not Available";

#[derive(Clone)]
pub struct Exporter {
    service: Arc<dyn ConfigService>,
    catalog: EntityCatalog,
    drivers: Arc<DriverCache>,
    concurrency: usize,
}

/// Owning hardware and recording server of channel devices, by path.
struct Lineage {
    recorders: HashMap<String, String>,
    hardware: HashMap<String, Entity>,
}

impl Lineage {
    fn recorder_name(&self, hardware: &Entity) -> String {
        self.recorders
            .get(hardware.parent_path())
            .cloned()
            .unwrap_or_else(|| UNKNOWN.to_owned())
    }
}

impl Exporter {
    pub fn new(service: Arc<dyn ConfigService>, settings: &EngineSettings) -> Self {
        Self {
            catalog: EntityCatalog::new(Arc::clone(&service), settings.concurrency),
            service,
            drivers: Arc::new(DriverCache::new()),
            concurrency: settings.concurrency,
        }
    }

    pub async fn recorders(&self) -> Result<Vec<RecorderRecord>, CoreError> {
        let recorders = self.catalog.recording_servers().await?;
        info!(count = recorders.len(), "exporting recording servers");
        Ok(recorders.iter().map(recorder_record).collect())
    }

    pub async fn hardware(&self) -> Result<Vec<HardwareRecord>, CoreError> {
        let lineage = Arc::new(self.lineage().await?);
        let units: Vec<Entity> = lineage.hardware.values().cloned().collect();
        info!(count = units.len(), "exporting hardware");

        let this = self.clone();
        let rows = parallel::map_collect(units, self.concurrency, move |unit| {
            let (this, lineage) = (this.clone(), Arc::clone(&lineage));
            async move { this.hardware_record(&unit, &lineage).await }
        })
        .await;

        let mut records = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    pub async fn cameras(&self) -> Result<Vec<CameraRecord>, CoreError> {
        let (lineage, cameras) = self.channels(EntityKind::Camera).await?;

        let this = self.clone();
        let rows = parallel::map_collect(cameras, self.concurrency, move |camera| {
            let (this, lineage) = (this.clone(), Arc::clone(&lineage));
            async move { this.camera_record(&camera, &lineage).await }
        })
        .await;

        let mut records = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    /// Microphones, speakers, metadata, inputs, or outputs.
    pub async fn devices(&self, kind: EntityKind) -> Result<Vec<DeviceRecord>, CoreError> {
        let (lineage, devices) = self.channels(kind).await?;

        let this = self.clone();
        let rows = parallel::map_collect(devices, self.concurrency, move |device| {
            let (this, lineage) = (this.clone(), Arc::clone(&lineage));
            async move { this.device_record(&device, &lineage).await }
        })
        .await;

        let mut records = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    // ── Projection ───────────────────────────────────────────────────

    async fn lineage(&self) -> Result<Lineage, CoreError> {
        let recorders = self.catalog.recording_servers().await?;
        let hardware = self.catalog.fan_out(&recorders, EntityKind::Hardware).await?;
        Ok(Lineage {
            recorders: recorders.into_iter().map(|r| (r.path, r.name)).collect(),
            hardware: hardware.into_iter().map(|h| (h.path.clone(), h)).collect(),
        })
    }

    async fn channels(&self, kind: EntityKind) -> Result<(Arc<Lineage>, Vec<Entity>), CoreError> {
        let lineage = self.lineage().await?;
        let parents: Vec<Entity> = lineage.hardware.values().cloned().collect();
        let devices = self.catalog.fan_out(&parents, kind).await?;
        info!(%kind, count = devices.len(), "exporting devices");
        Ok((Arc::new(lineage), devices))
    }

    async fn driver(&self, hardware: &Entity) -> Result<Option<DriverRecord>, CoreError> {
        self.drivers
            .get_driver(self.service.as_ref(), hardware, hardware.parent_path())
            .await
    }

    async fn hardware_record(
        &self,
        unit: &Entity,
        lineage: &Lineage,
    ) -> Result<HardwareRecord, CoreError> {
        let driver = self.driver(unit).await?;
        let (driver_name, driver_number) = driver_columns(driver.as_ref());
        Ok(HardwareRecord {
            name: unit.name.clone(),
            enabled: unit.enabled,
            address: unit.property("Address").unwrap_or_default().to_owned(),
            user_name: unit.property("UserName").unwrap_or_default().to_owned(),
            password: self.read_password(unit).await,
            read_only_mac: self.mac_address(unit).await,
            read_only_driver_name: driver_name,
            read_only_driver_number: driver_number,
            read_only_recording_server: lineage.recorder_name(unit),
            read_only_id: unit.id.clone(),
        })
    }

    async fn camera_record(
        &self,
        camera: &Entity,
        lineage: &Lineage,
    ) -> Result<CameraRecord, CoreError> {
        let owner = lineage.hardware.get(camera.parent_path());
        let (driver_name, driver_number) = match owner {
            Some(hw) => driver_columns(self.driver(hw).await?.as_ref()),
            None => driver_columns(None),
        };
        Ok(CameraRecord {
            name: camera.name.clone(),
            enabled: camera.enabled,
            read_only_resolution: self.resolution(camera).await,
            read_only_channel: camera.channel().unwrap_or_default(),
            read_only_hardware_name: owner.map(|h| h.name.clone()).unwrap_or_default(),
            recording_enabled: camera.bool_property("RecordingEnabled").unwrap_or_default(),
            read_only_driver_name: driver_name,
            read_only_driver_number: driver_number,
            read_only_recording_server: owner
                .map_or_else(|| UNKNOWN.to_owned(), |h| lineage.recorder_name(h)),
            read_only_id: camera.id.clone(),
        })
    }

    async fn device_record(
        &self,
        device: &Entity,
        lineage: &Lineage,
    ) -> Result<DeviceRecord, CoreError> {
        let owner = lineage.hardware.get(device.parent_path());
        let (driver_name, driver_number) = match owner {
            Some(hw) => driver_columns(self.driver(hw).await?.as_ref()),
            None => driver_columns(None),
        };
        Ok(DeviceRecord {
            name: device.name.clone(),
            enabled: device.enabled,
            read_only_channel: device.channel().unwrap_or_default(),
            read_only_hardware_name: owner.map(|h| h.name.clone()).unwrap_or_default(),
            recording_enabled: device.bool_property("RecordingEnabled").unwrap_or_default(),
            read_only_driver_name: driver_name,
            read_only_driver_number: driver_number,
            read_only_recording_server: owner
                .map_or_else(|| UNKNOWN.to_owned(), |h| lineage.recorder_name(h)),
            read_only_id: device.id.clone(),
        })
    }

    // ── Lookups that degrade ─────────────────────────────────────────

    /// The server fills in the password only on the second call.
    async fn read_password(&self, unit: &Entity) -> String {
        let mut password = String::new();
        for _ in 0..2 {
            match self
                .service
                .invoke_method(&unit.path, READ_PASSWORD_METHOD)
                .await
            {
                Ok(result) => {
                    password = property(&result, "Password").unwrap_or_default().to_owned();
                }
                Err(e) => {
                    debug!(hardware = %unit.name, error = %e, "could not read password");
                    return String::new();
                }
            }
        }
        password
    }

    async fn mac_address(&self, unit: &Entity) -> String {
        let folder = unit.child_folder(EntityKind::HardwareDriverSettings);
        match self.service.get_child_items(&folder).await {
            Ok(settings) => settings
                .first()
                .and_then(|s| s.property("MacAddress"))
                .unwrap_or_default()
                .to_owned(),
            Err(e) => {
                debug!(hardware = %unit.name, error = %e, "could not read driver settings");
                String::new()
            }
        }
    }

    async fn resolution(&self, camera: &Entity) -> String {
        let folder = camera.child_folder(EntityKind::DeviceDriverSettings);
        let settings = match self.service.get_child_items(&folder).await {
            Ok(settings) => settings,
            Err(e) => {
                debug!(camera = %camera.name, error = %e, "could not read stream settings");
                return NOT_AVAILABLE.to_owned();
            }
        };
        settings
            .first()
            .and_then(|s| {
                s.properties
                    .iter()
                    .find(|(key, _)| key.contains("Resolution"))
                    .map(|(_, value)| value.clone())
            })
            .unwrap_or_else(|| NOT_AVAILABLE.to_owned())
    }
}

fn property<'a>(map: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn driver_columns(driver: Option<&DriverRecord>) -> (String, i32) {
    driver.map_or_else(|| (String::new(), -1), |d| (d.name.clone(), d.number))
}

fn recorder_record(recorder: &Entity) -> RecorderRecord {
    let text = |key: &str| {
        recorder
            .property(key)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN)
            .to_owned()
    };
    RecorderRecord {
        name: recorder.name.clone(),
        read_only_host_name: text("HostName"),
        read_only_port: recorder.int_property("PortNumber").unwrap_or_default(),
        read_only_version: text("Version"),
        read_only_device_pack: text("DevicePack"),
        read_only_time_zone_name: text("TimeZoneName"),
        read_only_management_server: text("ManagementServer"),
        read_only_id: recorder.id.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::EntityId;
    use crate::service::fake::{FakeService, channel, driver, hardware, recorder};

    struct Site {
        fake: Arc<FakeService>,
        hw: Entity,
        cam: Entity,
    }

    fn site() -> Site {
        let fake = FakeService::new();
        let rec = recorder("r1", "Recorder 1")
            .with_property("HostName", "rec1.example.com")
            .with_property("PortNumber", "7563");
        let drv = driver(&rec, "d1", "Axis P3245", 806);
        let hw = hardware(&rec, "h1", "Lobby encoder")
            .with_property("Address", "http://10.0.0.5/")
            .with_property("UserName", "root")
            .with_property("HardwareDriverPath", drv.path.clone());
        let settings = Entity::new(
            "hs1",
            EntityKind::HardwareDriverSettings,
            format!("{}/HardwareDriverSettings[hs1]", hw.child_folder(EntityKind::HardwareDriverSettings)),
        )
        .with_property("MacAddress", "00:40:8C:12:34:56");
        let cam = channel(&hw, EntityKind::Camera, "c0", 0).with_property("RecordingEnabled", "True");
        let stream = Entity::new(
            "ds1",
            EntityKind::DeviceDriverSettings,
            format!("{}/DeviceDriverSettings[ds1]", cam.child_folder(EntityKind::DeviceDriverSettings)),
        )
        .with_property("StreamResolution", "1920x1080");
        for e in [rec, drv, hw.clone(), settings, cam.clone(), stream] {
            fake.insert(e);
        }
        Site {
            fake: Arc::new(fake),
            hw,
            cam,
        }
    }

    fn exporter(fake: &Arc<FakeService>) -> Exporter {
        Exporter::new(
            Arc::clone(fake) as Arc<dyn ConfigService>,
            &EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn recorder_rows_fall_back_to_unknown() {
        let site = site();
        let rows = exporter(&site.fake).recorders().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].read_only_host_name, "rec1.example.com");
        assert_eq!(rows[0].read_only_port, 7563);
        assert_eq!(rows[0].read_only_version, "Unknown");
        assert_eq!(rows[0].read_only_id, EntityId::from("r1"));
    }

    #[tokio::test]
    async fn hardware_rows_carry_driver_mac_and_password() {
        let site = site();
        site.fake
            .set_invoke_result(&site.hw.path, READ_PASSWORD_METHOD, &[("Password", "hunter2")]);

        let rows = exporter(&site.fake).hardware().await.unwrap();
        let row = &rows[0];
        assert_eq!(row.name, "Lobby encoder");
        assert_eq!(row.address, "http://10.0.0.5/");
        assert_eq!(row.password, "hunter2");
        assert_eq!(row.read_only_mac, "00:40:8C:12:34:56");
        assert_eq!(
            (row.read_only_driver_name.as_str(), row.read_only_driver_number),
            ("Axis P3245", 806)
        );
        assert_eq!(row.read_only_recording_server, "Recorder 1");

        let reads = site
            .fake
            .invoke_calls()
            .iter()
            .filter(|(_, method)| method == READ_PASSWORD_METHOD)
            .count();
        assert_eq!(reads, 2);
    }

    #[tokio::test]
    async fn unreadable_password_exports_empty() {
        let site = site();
        let rows = exporter(&site.fake).hardware().await.unwrap();
        assert_eq!(rows[0].password, "");
    }

    #[tokio::test]
    async fn camera_rows_carry_resolution_and_owner() {
        let site = site();
        let rows = exporter(&site.fake).cameras().await.unwrap();
        let row = &rows[0];
        assert_eq!(row.read_only_id, site.cam.id);
        assert_eq!(row.read_only_resolution, "1920x1080");
        assert_eq!(row.read_only_hardware_name, "Lobby encoder");
        assert!(row.recording_enabled);
        assert_eq!(row.read_only_driver_number, 806);
    }

    #[tokio::test]
    async fn unresolved_driver_and_missing_stream_use_placeholders() {
        let site = site();
        let rec = recorder("r1", "Recorder 1");
        let orphan = hardware(&rec, "h2", "Orphan");
        site.fake.insert(channel(&orphan, EntityKind::Output, "o0", 0));
        site.fake.insert(orphan);

        let outputs = exporter(&site.fake).devices(EntityKind::Output).await.unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].read_only_driver_number, -1);
        assert_eq!(outputs[0].read_only_hardware_name, "Orphan");
        assert_eq!(outputs[0].read_only_channel, 0);

        let cameras = exporter(&site.fake).cameras().await.unwrap();
        assert_eq!(cameras.len(), 1);
    }
}
