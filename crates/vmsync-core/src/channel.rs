// ── Channel configuration ──
//
// Every channel-bearing device (camera, microphone, speaker, metadata,
// input, output) is configured the same way after hardware is added: give
// it a name, enable or disable it, save. `Channel` is that shared
// capability; `configure_channels` is the routine that drives it.

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{Entity, EntityKind};
use crate::service::ConfigService;

/// Which channels of a fresh hardware unit start out enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableStrategy {
    EnableAll,
    EnableNone,
    EnableFirstChannelOnly,
}

impl EnableStrategy {
    pub fn enabled_for(self, channel: i32) -> bool {
        match self {
            Self::EnableAll => true,
            Self::EnableNone => false,
            Self::EnableFirstChannelOnly => channel == 0,
        }
    }
}

/// Generated channel name: `"{prefix} - {Kind} {channel + 1}"`.
pub fn channel_name(prefix: &str, kind: EntityKind, channel: i32) -> String {
    format!("{prefix} - {} {}", kind.label(), channel + 1)
}

/// Common surface of channel-bearing devices.
pub trait Channel {
    fn kind(&self) -> EntityKind;
    fn channel(&self) -> i32;
    fn set_name(&mut self, name: &str);
    fn set_enabled(&mut self, enabled: bool);
    fn entity(&self) -> &Entity;
}

/// A channel-bearing entity whose channel index is known.
#[derive(Debug, Clone)]
pub struct ChannelDevice {
    entity: Entity,
    channel: i32,
}

impl TryFrom<Entity> for ChannelDevice {
    type Error = CoreError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        if !entity.kind.is_channel() {
            return Err(CoreError::Internal(format!(
                "{} is a {}, not a channel device",
                entity.path, entity.kind
            )));
        }
        let channel = entity.channel().ok_or_else(|| {
            CoreError::Internal(format!("{} has no channel number", entity.path))
        })?;
        Ok(Self { entity, channel })
    }
}

impl Channel for ChannelDevice {
    fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    fn channel(&self) -> i32 {
        self.channel
    }

    fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.entity.name);
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.entity.enabled = enabled;
    }

    fn entity(&self) -> &Entity {
        &self.entity
    }
}

/// Name and enabled state to give one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSummary {
    pub saved: usize,
    pub failed: usize,
}

/// Apply `plan` to each channel in channel order and save it.
///
/// A failed save is logged and counted; the remaining channels still run.
pub async fn configure_channels<C, P>(
    service: &dyn ConfigService,
    mut channels: Vec<C>,
    plan: P,
) -> ChannelSummary
where
    C: Channel + Send,
    P: Fn(&C) -> ChannelSettings + Send,
{
    channels.sort_by_key(Channel::channel);
    let mut summary = ChannelSummary::default();

    for mut ch in channels {
        let settings = plan(&ch);
        ch.set_name(&settings.name);
        ch.set_enabled(settings.enabled);
        match service.save(ch.entity()).await {
            Ok(()) => {
                debug!(kind = %ch.kind(), channel = ch.channel(), name = %settings.name, "channel configured");
                summary.saved += 1;
            }
            Err(e) => {
                warn!(
                    kind = %ch.kind(),
                    channel = ch.channel(),
                    path = %ch.entity().path,
                    error = %e,
                    "failed to configure channel"
                );
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Wrap entities as channel devices, skipping any without a readable
/// channel number.
pub fn channel_devices(entities: Vec<Entity>) -> Vec<ChannelDevice> {
    entities
        .into_iter()
        .filter_map(|e| match ChannelDevice::try_from(e) {
            Ok(device) => Some(device),
            Err(err) => {
                warn!(error = %err, "skipping device");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::service::fake::{FakeService, SaveFailure, channel, hardware, recorder};

    #[test]
    fn enable_strategies() {
        assert!(EnableStrategy::EnableAll.enabled_for(3));
        assert!(!EnableStrategy::EnableNone.enabled_for(0));
        assert!(EnableStrategy::EnableFirstChannelOnly.enabled_for(0));
        assert!(!EnableStrategy::EnableFirstChannelOnly.enabled_for(1));
    }

    #[test]
    fn names_are_one_based() {
        assert_eq!(
            channel_name("Dock 4", EntityKind::Microphone, 0),
            "Dock 4 - Microphone 1"
        );
        assert_eq!(channel_name("Gate", EntityKind::Input, 2), "Gate - Input 3");
    }

    #[test]
    fn non_channel_entities_are_rejected() {
        let rec = recorder("r1", "Recorder 1");
        assert!(ChannelDevice::try_from(rec).is_err());
    }

    #[tokio::test]
    async fn configures_in_channel_order_and_survives_failures() {
        let fake = FakeService::new();
        let hw = hardware(&recorder("r1", "R"), "h1", "Encoder");
        let cams: Vec<Entity> = (0..4)
            .rev()
            .map(|c| channel(&hw, EntityKind::Camera, &format!("c{c}"), c))
            .collect();
        for c in &cams {
            fake.insert(c.clone());
        }
        fake.fail_save(&cams[0].path, SaveFailure::Systemic);

        let summary = configure_channels(&fake, channel_devices(cams), |ch: &ChannelDevice| {
            ChannelSettings {
                name: channel_name("Encoder", ch.kind(), ch.channel()),
                enabled: EnableStrategy::EnableFirstChannelOnly.enabled_for(ch.channel()),
            }
        })
        .await;

        assert_eq!(summary, ChannelSummary { saved: 3, failed: 1 });
        let saved = fake.saved();
        let names: Vec<&str> = saved.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Encoder - Camera 1", "Encoder - Camera 2", "Encoder - Camera 3"]
        );
        assert!(saved[0].enabled);
        assert!(!saved[1].enabled);
    }
}
