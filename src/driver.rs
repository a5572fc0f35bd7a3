//! Runs the session on a tokio runtime, off the UI thread.
//!
//! The UI submits [`SessionCommand`]s; a single worker applies them strictly
//! in order and publishes whatever changed as [`SessionEvent`]s. Because only
//! the worker touches the session, no two handlers ever interleave.

use tao::event_loop::EventLoopProxy;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use soundboard_core::{Clip, Recording, SessionEvent, SessionState, find_clip};

use crate::session::{AudioPlatform, SoundboardSession};

/// Something the UI asked the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleRecording,
    BeginRecording,
    StopRecording,
    /// Play a bundled clip by catalog name
    PlayClip(String),
    /// Play the recording at this zero-based index
    PlayRecording(usize),
    Shutdown,
}

/// Destination for session events.
pub trait EventSink: Send + 'static {
    fn publish(&self, event: SessionEvent);
}

impl EventSink for EventLoopProxy<SessionEvent> {
    fn publish(&self, event: SessionEvent) {
        if let Err(e) = self.send_event(event) {
            debug!("event loop closed, dropping session event: {}", e);
        }
    }
}

/// Owns the runtime and the command channel into the session worker.
pub struct SessionDriver {
    runtime: Runtime,
    commands: mpsc::UnboundedSender<SessionCommand>,
    worker: Option<JoinHandle<()>>,
}

impl SessionDriver {
    pub fn new<P, S>(platform: P, sink: S) -> anyhow::Result<Self>
    where
        P: AudioPlatform + 'static,
        S: EventSink,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("soundboard-session")
            .enable_all()
            .build()?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let session = SoundboardSession::new(platform);
        let worker = runtime.spawn(run_session(session, receiver, sink));

        Ok(Self {
            runtime,
            commands,
            worker: Some(worker),
        })
    }

    /// Queue a command. Non-blocking.
    pub fn submit(&self, command: SessionCommand) -> anyhow::Result<()> {
        debug!(?command, "command submitted");
        self.commands.send(command)?;
        Ok(())
    }

    /// Stop the worker and wait for it. An in-flight capture is finalized
    /// when the session is dropped.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.commands.send(SessionCommand::Shutdown).ok();
        if let Err(e) = self.runtime.block_on(worker) {
            error!("Error joining session worker: {:?}", e);
        }
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// What the UI can observe about a session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    state: SessionState,
    status: String,
    recordings: usize,
}

impl Snapshot {
    fn of<P: AudioPlatform>(session: &SoundboardSession<P>) -> Self {
        Self {
            state: session.state(),
            status: session.status().to_string(),
            recordings: session.recordings().len(),
        }
    }
}

/// Apply commands until the channel closes or `Shutdown` arrives.
pub async fn run_session<P, S>(
    mut session: SoundboardSession<P>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    sink: S,
) where
    P: AudioPlatform,
    S: EventSink,
{
    while let Some(command) = commands.recv().await {
        if command == SessionCommand::Shutdown {
            break;
        }
        let before = Snapshot::of(&session);
        apply(&mut session, command).await;
        publish_changes(&session, &before, &sink);
    }
    if session.is_recording() {
        info!("shutting down with a recording in progress, finalizing it");
    }
    info!("session worker stopped");
}

async fn apply<P: AudioPlatform>(session: &mut SoundboardSession<P>, command: SessionCommand) {
    // Errors are already reflected in the status line and logged by the
    // session itself.
    let result = match command {
        SessionCommand::ToggleRecording => session.toggle_recording().await,
        SessionCommand::BeginRecording => session.begin_recording().await,
        SessionCommand::StopRecording => session.stop_recording().await,
        SessionCommand::PlayClip(name) => {
            let source = find_clip(&name).map(Clip::source);
            session.play_clip(source).await;
            Ok(())
        }
        SessionCommand::PlayRecording(index) => {
            let source = session.recordings().get(index).map(Recording::source);
            session.play_clip(source).await;
            Ok(())
        }
        SessionCommand::Shutdown => Ok(()),
    };
    if let Err(e) = result {
        debug!(error = %e, "command finished with an error");
    }
}

fn publish_changes<P: AudioPlatform, S: EventSink>(
    session: &SoundboardSession<P>,
    before: &Snapshot,
    sink: &S,
) {
    let after = Snapshot::of(session);
    for (index, recording) in session
        .recordings()
        .iter()
        .enumerate()
        .skip(before.recordings)
    {
        sink.publish(SessionEvent::RecordingAdded {
            index,
            recording: recording.clone(),
        });
    }
    if after.status != before.status {
        sink.publish(SessionEvent::StatusChanged(after.status.clone()));
    }
    if after.state != before.state {
        sink.publish(SessionEvent::StateChanged(after.state));
    }
}

#[cfg(test)]
mod tests {
    use soundboard_core::{AssetHandle, ClipSource};

    use super::*;
    use crate::session::tests::MockPlatform;
    use crate::session::{Permission, STATUS_DENIED, STATUS_NOT_RECORDING};

    impl EventSink for mpsc::UnboundedSender<SessionEvent> {
        fn publish(&self, event: SessionEvent) {
            self.send(event).ok();
        }
    }

    async fn drive(platform: MockPlatform, commands: Vec<SessionCommand>) -> Vec<SessionEvent> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        for command in commands {
            command_tx.send(command).unwrap();
        }
        drop(command_tx);

        run_session(SoundboardSession::new(platform), command_rx, event_tx).await;

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_record_cycle_events() {
        let events = drive(MockPlatform::with_locators(["file:///tmp/rec1.m4a"]), vec![
            SessionCommand::ToggleRecording,
            SessionCommand::ToggleRecording,
        ])
        .await;

        assert_eq!(events, vec![
            SessionEvent::StatusChanged("Recording started...".to_string()),
            SessionEvent::StateChanged(SessionState::Recording),
            SessionEvent::RecordingAdded {
                index: 0,
                recording: Recording::new("file:///tmp/rec1.m4a"),
            },
            SessionEvent::StatusChanged("Recording stopped.".to_string()),
            SessionEvent::StateChanged(SessionState::Idle),
        ]);
    }

    #[tokio::test]
    async fn test_denied_begin_only_changes_status() {
        let platform = MockPlatform {
            permission: Permission::Denied,
            ..Default::default()
        };
        let events = drive(platform, vec![SessionCommand::BeginRecording]).await;
        assert_eq!(events, vec![SessionEvent::StatusChanged(
            STATUS_DENIED.to_string()
        )]);
    }

    #[tokio::test]
    async fn test_repeated_status_is_not_republished() {
        let events = drive(MockPlatform::default(), vec![
            SessionCommand::StopRecording,
            SessionCommand::StopRecording,
        ])
        .await;
        assert_eq!(events, vec![SessionEvent::StatusChanged(
            STATUS_NOT_RECORDING.to_string()
        )]);
    }

    #[tokio::test]
    async fn test_play_commands_publish_nothing() {
        let events = drive(MockPlatform::default(), vec![
            SessionCommand::PlayClip("amen".to_string()),
            SessionCommand::PlayClip("not-in-catalog".to_string()),
            SessionCommand::PlayRecording(3),
        ])
        .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_are_ignored() {
        let events = drive(MockPlatform::default(), vec![
            SessionCommand::Shutdown,
            SessionCommand::BeginRecording,
        ])
        .await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_play_commands_resolve_sources() {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let mut session =
            SoundboardSession::new(MockPlatform::with_locators(["file:///tmp/rec1.m4a"]));
        session.begin_recording().await.unwrap();
        session.stop_recording().await.unwrap();

        for command in [
            SessionCommand::PlayClip("amen".to_string()),
            SessionCommand::PlayClip("missing".to_string()),
            SessionCommand::PlayRecording(0),
            SessionCommand::PlayRecording(1),
        ] {
            command_tx.send(command).unwrap();
        }
        drop(command_tx);

        // Drive the worker inline so the session can be inspected afterwards.
        let mut commands = command_rx;
        while let Some(command) = commands.recv().await {
            let before = Snapshot::of(&session);
            apply(&mut session, command).await;
            publish_changes(&session, &before, &event_tx);
        }

        assert_eq!(session.platform().plays(), vec![
            ClipSource::Bundled(AssetHandle::new("amen.mp3")),
            ClipSource::Recorded("file:///tmp/rec1.m4a".to_string()),
        ]);
    }
}
