//! Service lifecycle: wiring collaborators, starting the trigger adapters,
//! and tearing everything down in order.
//!
//! # Startup
//!
//! ```text
//! SosService::start(config, paths)
//!   1. service-status.toml ← is_running = true
//!   2. build Services from config (contacts, location, dispatch, recorder, haptics)
//!   3. AlertCoordinator::new
//!   4. MotionListener  (source_from_config)       ─┐ a failure here is logged
//!   5. VoiceListener   (WhisperRecognizer, model) ─┘ and the other still runs
//! ```
//!
//! # Shutdown
//!
//! ```text
//! SosService::stop()
//!   1. stop adapters (no new triggers)
//!   2. coordinator.shutdown()  (in-flight session → Releasing)
//!   3. service-status.toml ← is_running = false
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::alert::{
    AlertCoordinator, AlertEvent, AlertStatus, Services, SessionOutcome, Submission,
    TriggerSource,
};
use crate::audio::CpalRecorder;
use crate::config::{AppConfig, AppPaths, LocationProviderKind, NotifyProviderKind};
use crate::response::{
    BellHaptics, Coordinates, FixedLocationProvider, Haptics, HttpLocationProvider,
    JsonContactStore, LocationProvider, LogDispatcher, NoHaptics, NotificationDispatcher,
    UnavailableLocationProvider, WebhookDispatcher,
};
use crate::stt::WhisperRecognizer;
use crate::trigger::{
    source_from_config, MotionListener, PhraseMatcher, ShakeDetector, TriggerSink, VoiceListener,
};

use super::status::ServiceStatus;

// ---------------------------------------------------------------------------
// Collaborator wiring
// ---------------------------------------------------------------------------

/// Production collaborators selected by `config`.
pub fn build_services(config: &AppConfig, paths: &AppPaths) -> Services {
    let location: Arc<dyn LocationProvider> = match config.location.provider {
        LocationProviderKind::Http => Arc::new(HttpLocationProvider::from_config(&config.location)),
        LocationProviderKind::Fixed => match config.location.fixed {
            Some((lat, lon)) => Arc::new(FixedLocationProvider(Coordinates::new(lat, lon))),
            None => {
                log::warn!("service: fixed location selected but none configured");
                Arc::new(UnavailableLocationProvider)
            }
        },
        LocationProviderKind::Disabled => Arc::new(UnavailableLocationProvider),
    };

    let dispatcher: Arc<dyn NotificationDispatcher> = match config.notify.provider {
        NotifyProviderKind::Webhook => Arc::new(WebhookDispatcher::from_config(&config.notify)),
        NotifyProviderKind::Log => Arc::new(LogDispatcher),
    };

    let haptics: Arc<dyn Haptics> = if config.alert.haptics {
        Arc::new(BellHaptics)
    } else {
        Arc::new(NoHaptics)
    };

    Services {
        contacts: Arc::new(JsonContactStore::new(&paths.contacts_file)),
        location,
        dispatcher,
        recorder: Arc::new(CpalRecorder::new()),
        haptics,
        recordings_dir: config.recordings_dir(paths),
    }
}

// ---------------------------------------------------------------------------
// SosService
// ---------------------------------------------------------------------------

/// A running alert service.  Must be created inside a tokio runtime.
pub struct SosService {
    coordinator: AlertCoordinator,
    motion: Option<MotionListener>,
    voice: Option<VoiceListener>,
    paths: AppPaths,
    stopped: bool,
}

impl SosService {
    /// Start with the production collaborators.
    pub async fn start(config: AppConfig, paths: AppPaths) -> Result<Self> {
        let services = build_services(&config, &paths);
        Self::start_with(config, paths, services).await
    }

    /// Start with caller-supplied collaborators.
    pub async fn start_with(config: AppConfig, paths: AppPaths, services: Services) -> Result<Self> {
        ServiceStatus::record(&paths.status_file, true);

        let coordinator = AlertCoordinator::new(&config, services);
        let sink: Arc<dyn TriggerSink> = Arc::new(coordinator.clone());

        let motion = start_motion(&config, sink.clone());
        let voice = start_voice(&config, &paths, sink).await;

        if motion.is_none() && voice.is_none() {
            log::warn!("service: no trigger source is active; only manual tests can raise alerts");
        }

        log::info!("service: started");
        Ok(Self {
            coordinator,
            motion,
            voice,
            paths,
            stopped: false,
        })
    }

    pub fn coordinator(&self) -> &AlertCoordinator {
        &self.coordinator
    }

    pub fn status(&self) -> AlertStatus {
        self.coordinator.current_status()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Names of the adapters currently feeding the coordinator.
    pub fn active_sources(&self) -> Vec<TriggerSource> {
        let mut sources = Vec::new();
        if self.motion.as_ref().is_some_and(MotionListener::is_running) {
            sources.push(TriggerSource::Shake);
        }
        if self.voice.as_ref().is_some_and(VoiceListener::is_running) {
            sources.push(TriggerSource::Voice);
        }
        sources
    }

    /// Stop adapters, release any in-flight session, clear the running flag.
    /// A second call does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        log::info!("service: stopping");

        let motion = self.motion.take();
        let voice = self.voice.take();
        tokio::task::spawn_blocking(move || {
            if let Some(listener) = motion {
                listener.stop();
            }
            if let Some(listener) = voice {
                listener.stop();
            }
        })
        .await
        .map_err(|e| anyhow!("adapter shutdown failed: {e}"))?;

        self.coordinator.shutdown().await;

        ServiceStatus::record(&self.paths.status_file, false);
        log::info!("service: stopped");
        Ok(())
    }
}

fn start_motion(config: &AppConfig, sink: Arc<dyn TriggerSink>) -> Option<MotionListener> {
    let source = match source_from_config(&config.motion) {
        Ok(Some(source)) => source,
        Ok(None) => {
            log::info!("motion: shake trigger disabled");
            return None;
        }
        Err(e) => {
            log::warn!("motion: sensor unavailable ({e}); shake trigger off");
            return None;
        }
    };

    match MotionListener::start(source, ShakeDetector::from_config(&config.motion), sink) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::error!("motion: could not start listener: {e}");
            None
        }
    }
}

async fn start_voice(
    config: &AppConfig,
    paths: &AppPaths,
    sink: Arc<dyn TriggerSink>,
) -> Option<VoiceListener> {
    if !config.voice.enabled {
        log::info!("voice: activation phrase trigger disabled");
        return None;
    }

    // Model loading reads hundreds of MB from disk.
    let voice = config.voice.clone();
    let models_dir = paths.models_dir.clone();
    let loaded =
        tokio::task::spawn_blocking(move || WhisperRecognizer::from_config(&voice, &models_dir))
            .await;

    let recognizer = match loaded {
        Ok(Ok(recognizer)) => recognizer,
        Ok(Err(e)) => {
            log::warn!("voice: recognizer unavailable ({e}); voice trigger off");
            return None;
        }
        Err(e) => {
            log::error!("voice: model loader panicked: {e}");
            return None;
        }
    };

    let matcher = PhraseMatcher::new(&config.voice.activation_phrase);
    match VoiceListener::start(Box::new(recognizer), matcher, sink) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::error!("voice: could not start listener: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// One-shot alert
// ---------------------------------------------------------------------------

/// Run a single alert sequence as if `source` had fired, passing every
/// progress event to `on_event`, and return how the session ended.
///
/// Uses a fresh coordinator, so the cooldown of a running service does not
/// apply.
pub async fn run_once(
    config: &AppConfig,
    services: Services,
    source: TriggerSource,
    mut on_event: impl FnMut(&AlertEvent),
) -> Result<SessionOutcome> {
    let coordinator = AlertCoordinator::new(config, services);
    let mut events = coordinator.subscribe();

    if let Submission::Rejected(reason) = coordinator.submit_trigger(source) {
        return Err(anyhow!("trigger rejected: {reason}"));
    }

    while let Some(event) = events.recv().await {
        on_event(&event);
        if let AlertEvent::SessionFinished { outcome, .. } = event {
            coordinator.shutdown().await;
            return Ok(outcome);
        }
    }

    Err(anyhow!("coordinator closed before the session finished"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
