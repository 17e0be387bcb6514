// Per-channel stream lifecycle controller
//
// Drives ready → starting → streaming → (ended | error) → ready. Each async
// continuation captures the channel epoch at issue time; any transition bumps
// the epoch, so responses that arrive late are discarded instead of
// corrupting newer state.
use crate::application::playback::{FatalKind, PlaybackAdapter, PlaybackEvent, PlaybackSession};
use crate::application::stream_api::StreamApi;
use crate::domain::channel::{ChannelConfig, ChannelPhase, ChannelStatus};
use crate::infrastructure::config::StreamTimings;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    UserStop,
    AutoStop,
    RemoteInactive,
    PlaybackEnded,
}

struct ChannelInner {
    phase: ChannelPhase,
    detail: String,
    epoch: u64,
    started_at: Option<DateTime<Utc>>,
    auto_stop_at: Option<Instant>,
    // Non-None iff phase == Streaming; set and cleared together.
    player_task: Option<JoinHandle<()>>,
    auto_stop_task: Option<JoinHandle<()>>,
    health_poll_task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct ChannelController {
    config: ChannelConfig,
    timings: StreamTimings,
    api: Arc<dyn StreamApi>,
    playback: Arc<dyn PlaybackAdapter>,
    inner: Arc<Mutex<ChannelInner>>,
    status_tx: Arc<watch::Sender<ChannelStatus>>,
}

impl ChannelController {
    pub fn new(
        config: ChannelConfig,
        timings: StreamTimings,
        api: Arc<dyn StreamApi>,
        playback: Arc<dyn PlaybackAdapter>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::initial(&config));
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                phase: ChannelPhase::Ready,
                detail: ChannelPhase::Ready.default_detail().to_string(),
                epoch: 0,
                started_at: None,
                auto_stop_at: None,
                player_task: None,
                auto_stop_task: None,
                health_poll_task: None,
            })),
            config,
            timings,
            api,
            playback,
            status_tx: Arc::new(status_tx),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn status(&self) -> ChannelStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    /// Advisory check at startup: logs whether the remote already has the
    /// stream running. Does not change state.
    pub fn probe_remote(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            if controller.api.status(&controller.config.id).await {
                tracing::info!(channel = %controller.config.id, "remote stream already active");
            }
        });
    }

    /// User play action. A click while starting is ignored; a click while
    /// streaming is an explicit stop; otherwise a fresh start sequence is
    /// launched.
    pub fn play(&self) -> ChannelStatus {
        enum Action {
            Ignore,
            Stop(u64),
            Start(u64),
        }

        let action = {
            let mut inner = self.inner.lock().unwrap();
            if inner.phase == ChannelPhase::Streaming {
                Action::Stop(inner.epoch)
            } else if inner.phase.accepts_start() {
                inner.epoch += 1;
                inner.phase = ChannelPhase::Starting;
                inner.detail = ChannelPhase::Starting.default_detail().to_string();
                Action::Start(inner.epoch)
            } else {
                Action::Ignore
            }
        };

        match action {
            Action::Ignore => {
                tracing::debug!(channel = %self.config.id, "start already in flight, ignoring");
            }
            Action::Stop(epoch) => {
                self.finish(epoch, StopReason::UserStop);
            }
            Action::Start(epoch) => {
                self.publish();
                let controller = self.clone();
                tokio::spawn(async move { controller.run_start_sequence(epoch).await });
            }
        }
        self.status()
    }

    /// Explicit stop. No-op unless currently streaming.
    pub fn stop(&self) -> ChannelStatus {
        let epoch = {
            let inner = self.inner.lock().unwrap();
            (inner.phase == ChannelPhase::Streaming).then_some(inner.epoch)
        };
        if let Some(epoch) = epoch {
            self.finish(epoch, StopReason::UserStop);
        }
        self.status()
    }

    async fn run_start_sequence(self, epoch: u64) {
        let accepted = self.api.start(&self.config.id).await;
        if !self.epoch_is_current(epoch) {
            tracing::debug!(channel = %self.config.id, "discarding stale start response");
            return;
        }
        if !accepted {
            tracing::warn!(channel = %self.config.id, "remote refused to start stream");
            self.fail(epoch, "Failed to start stream".to_string());
            return;
        }

        // Give the remote ingest pipeline time to spin up before attaching.
        tokio::time::sleep(self.timings.startup_delay).await;
        if !self.epoch_is_current(epoch) {
            return;
        }

        match self.playback.attach(&self.config.manifest_url).await {
            Ok(session) => self.enter_streaming(epoch, session),
            Err(err) => {
                tracing::warn!(channel = %self.config.id, error = %err, "playback attach failed");
                self.fail(epoch, format!("Playback error: {err}"));
            }
        }
    }

    fn enter_streaming(&self, epoch: u64, session: PlaybackSession) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch {
                // Session drops here and detaches itself.
                return;
            }
            inner.phase = ChannelPhase::Streaming;
            inner.detail = ChannelPhase::Streaming.default_detail().to_string();
            inner.started_at = Some(Utc::now());
            inner.auto_stop_at = Some(Instant::now() + self.timings.stream_duration);

            let controller = self.clone();
            inner.player_task = Some(tokio::spawn(async move {
                controller.consume_playback_events(epoch, session).await;
            }));
            let controller = self.clone();
            inner.auto_stop_task = Some(tokio::spawn(async move {
                controller.run_auto_stop(epoch).await;
            }));
            let controller = self.clone();
            inner.health_poll_task = Some(tokio::spawn(async move {
                controller.run_health_poll(epoch).await;
            }));
        }
        tracing::info!(channel = %self.config.id, "streaming");
        self.publish();
    }

    async fn run_auto_stop(self, epoch: u64) {
        tokio::time::sleep(self.timings.stream_duration).await;
        tracing::info!(channel = %self.config.id, "auto-stop timeout reached");
        self.finish(epoch, StopReason::AutoStop);
    }

    async fn run_health_poll(self, epoch: u64) {
        loop {
            tokio::time::sleep(self.timings.status_check_interval).await;
            if !self.epoch_is_current(epoch) {
                return;
            }
            let active = self.api.status(&self.config.id).await;
            if !self.epoch_is_current(epoch) {
                return;
            }
            if !active {
                tracing::info!(channel = %self.config.id, "remote reports stream inactive");
                self.finish(epoch, StopReason::RemoteInactive);
                return;
            }
        }
    }

    async fn consume_playback_events(self, epoch: u64, mut session: PlaybackSession) {
        while let Some(event) = session.next_event().await {
            match event {
                PlaybackEvent::ManifestReady => {}
                PlaybackEvent::Ended => {
                    self.finish(epoch, StopReason::PlaybackEnded);
                    return;
                }
                PlaybackEvent::Fatal(FatalKind::Network)
                | PlaybackEvent::Fatal(FatalKind::Media) => {
                    // The adapter reloads/recovers these itself.
                    tracing::warn!(channel = %self.config.id, ?event, "recoverable playback error");
                }
                PlaybackEvent::Fatal(FatalKind::Other) => {
                    self.playback_failed(epoch);
                    return;
                }
            }
        }
    }

    fn playback_failed(&self, epoch: u64) {
        // A fatal error landing within the grace window of the auto-stop
        // deadline is just the stream winding down.
        let near_deadline = {
            let inner = self.inner.lock().unwrap();
            if inner.epoch != epoch {
                return;
            }
            inner
                .auto_stop_at
                .is_some_and(|at| Instant::now() + self.timings.end_grace >= at)
        };
        if near_deadline {
            self.finish(epoch, StopReason::PlaybackEnded);
        } else {
            tracing::error!(channel = %self.config.id, "unrecoverable playback error");
            self.fail(epoch, "Playback error. Please try restarting.".to_string());
        }
    }

    /// Tear down a streaming channel. Returns false for stale epochs.
    fn finish(&self, epoch: u64, reason: StopReason) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch || inner.phase != ChannelPhase::Streaming {
                return false;
            }
            Self::teardown_locked(&mut inner);
            inner.phase = match reason {
                StopReason::UserStop => ChannelPhase::Ready,
                StopReason::AutoStop | StopReason::RemoteInactive | StopReason::PlaybackEnded => {
                    ChannelPhase::Ended
                }
            };
            inner.detail = inner.phase.default_detail().to_string();
        }
        tracing::info!(channel = %self.config.id, ?reason, "stream torn down");
        self.publish();

        if matches!(reason, StopReason::UserStop | StopReason::AutoStop) {
            let api = Arc::clone(&self.api);
            let channel = self.config.id.clone();
            tokio::spawn(async move {
                api.stop(&channel).await;
            });
        }
        true
    }

    /// Transition to the error affordance. Valid from starting (start refused,
    /// attach failed) and streaming (fatal playback error).
    fn fail(&self, epoch: u64, detail: String) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.epoch != epoch {
                return;
            }
            Self::teardown_locked(&mut inner);
            inner.phase = ChannelPhase::Error;
            inner.detail = detail;
        }
        self.publish();
    }

    fn teardown_locked(inner: &mut ChannelInner) {
        for task in [
            inner.player_task.take(),
            inner.auto_stop_task.take(),
            inner.health_poll_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        inner.started_at = None;
        inner.auto_stop_at = None;
        inner.epoch += 1;
    }

    fn epoch_is_current(&self, epoch: u64) -> bool {
        self.inner.lock().unwrap().epoch == epoch
    }

    fn publish(&self) {
        let snapshot = {
            let inner = self.inner.lock().unwrap();
            ChannelStatus {
                id: self.config.id.clone(),
                name: self.config.name.clone(),
                phase: inner.phase,
                detail: inner.detail.clone(),
                is_streaming: inner.phase == ChannelPhase::Streaming,
                started_at: inner.started_at,
                epoch: inner.epoch,
            }
        };
        self.status_tx.send_replace(snapshot);
    }

    #[cfg(test)]
    fn armed_timers(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.auto_stop_task.is_some() as usize + inner.health_poll_task.is_some() as usize
    }
}
