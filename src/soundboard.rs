use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arboard::Clipboard;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use soundboard::driver::{SessionCommand, SessionDriver};
use soundboard::hotkey::toggle_hotkey;
use soundboard::menu::{MenuAction, SoundboardMenu};
use soundboard::notify::StatusNotifier;
use soundboard::platform::DevicePlatform;
use soundboard::{
    BUNDLED_ASSETS_DIR, ConfigManager, DEFAULT_LOG_LEVEL, SessionEvent, SessionState, VERSION, icon,
};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tray_icon::TrayIconBuilder;
use tray_icon::menu::MenuEvent;

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SOUNDBOARD_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();
    info!(version = VERSION, "Starting soundboard");

    // Load config
    let config_manager = ConfigManager::new()?;
    let config = config_manager.load()?;
    // save back the config to create the file if it doesn't exist
    config_manager.save(&config)?;

    let assets_dir = config
        .assets_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(BUNDLED_ASSETS_DIR));
    info!(
        assets_dir = ?assets_dir,
        recordings_dir = ?config.recordings_dir(),
        max_concurrent_playbacks = config.max_concurrent_playbacks(),
        "Audio paths"
    );

    // Set up hotkey
    let hotkey = toggle_hotkey(&config);
    let hotkey_manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    hotkey_manager
        .register(hotkey)
        .context("Failed to register hotkey")?;

    let mut clipboard = Clipboard::new()?;
    let mut view = SoundboardMenu::new()?;
    let notifier = StatusNotifier::new(config.notify_status());

    let event_loop: EventLoop<SessionEvent> = EventLoopBuilder::with_user_event().build();

    // The session lives on its own runtime and reports back via the proxy.
    let platform = DevicePlatform::new(&config, assets_dir);
    let mut driver = SessionDriver::new(platform, event_loop.create_proxy())?;

    let menu_channel = MenuEvent::receiver();
    let hotkey_channel = GlobalHotKeyEvent::receiver();
    let mut icon_tray = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        if let Event::NewEvents(StartCause::Init) = event {
            // We create the icon once the event loop is actually running
            // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90
            let tray = icon::icon(SessionState::Idle).and_then(|idle| {
                TrayIconBuilder::new()
                    .with_menu(Box::new(view.menu().clone()))
                    .with_tooltip(icon::tooltip(SessionState::Idle))
                    .with_icon(idle)
                    .build()
                    .context("Failed to build tray icon")
            });
            match tray {
                Ok(tray) => {
                    icon_tray.replace(tray);
                }
                Err(e) => {
                    error!("{:?}", e);
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            // We have to request a redraw here to have the icon actually show up.
            // Tao only exposes a redraw method on the Window so we use core-foundation directly.
            #[cfg(target_os = "macos")]
            unsafe {
                use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};

                let rl = CFRunLoopGetMain();
                CFRunLoopWakeUp(rl);
            }

            info!("Soundboard ready");
        }

        if let Ok(event) = menu_channel.try_recv() {
            match view.action(&event.id).cloned() {
                Some(MenuAction::Session(command)) => submit(&driver, command),
                Some(MenuAction::CopyConfigPath) => {
                    if let Err(e) = clipboard
                        .set_text(config_manager.config_path().to_string_lossy().into_owned())
                    {
                        error!("Failed to copy config path to clipboard: {}", e);
                    }
                }
                Some(MenuAction::Quit) => {
                    driver.shutdown();
                    icon_tray.take();
                    *control_flow = ControlFlow::Exit;
                }
                None => {}
            }
        }

        // Handle session events
        if let Event::UserEvent(event) = event {
            match event {
                SessionEvent::StateChanged(state) => {
                    info!(state = ?state, "State changed");
                    view.set_state(state);
                    if let Some(tray) = icon_tray.as_ref() {
                        match icon::icon(state) {
                            Ok(icon) => {
                                tray.set_icon(Some(icon)).ok();
                            }
                            Err(e) => warn!("Failed to update tray icon: {:?}", e),
                        }
                        tray.set_tooltip(Some(icon::tooltip(state))).ok();
                    }
                }
                SessionEvent::StatusChanged(status) => {
                    view.set_status(&status);
                    notifier.status_changed(&status);
                }
                SessionEvent::RecordingAdded { index, recording } => {
                    info!(index, uri = %recording.uri, "Recording added");
                    if let Err(e) = view.add_recording(index) {
                        error!("{:?}", e);
                    }
                }
            }
        }

        // Handle hotkey events
        if let Ok(event) = hotkey_channel.try_recv() {
            if event.id() == hotkey.id() && event.state() == HotKeyState::Pressed {
                submit(&driver, SessionCommand::ToggleRecording);
            }
        }
    });
}

fn submit(driver: &SessionDriver, command: SessionCommand) {
    if let Err(e) = driver.submit(command) {
        error!("Failed to submit command to session: {:?}", e);
    }
}
