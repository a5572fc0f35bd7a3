//! The soundboard view: a tray menu with one row per bundled clip, the
//! record toggle, the status line and the growing list of recordings.

use std::collections::HashMap;

use anyhow::Context;
use tray_icon::menu::{Menu, MenuId, MenuItem, PredefinedMenuItem};

use soundboard_core::{APP_NAME_PRETTY, CATALOG, SessionState};

use crate::driver::SessionCommand;

/// What a click on a menu row means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Session(SessionCommand),
    CopyConfigPath,
    Quit,
}

/// Maps menu ids to actions. Kept apart from the widgets so the routing can
/// be exercised without a windowing system.
#[derive(Debug, Default)]
pub struct ActionTable {
    actions: HashMap<MenuId, MenuAction>,
}

impl ActionTable {
    pub fn insert(&mut self, id: MenuId, action: MenuAction) {
        self.actions.insert(id, action);
    }

    pub fn resolve(&self, id: &MenuId) -> Option<&MenuAction> {
        self.actions.get(id)
    }
}

pub fn recording_label(index: usize) -> String {
    format!("Recording {} - Play", index + 1)
}

pub struct SoundboardMenu {
    menu: Menu,
    actions: ActionTable,
    toggle: MenuItem,
    status: MenuItem,
    recordings: Vec<MenuItem>,
    // Position of the first row after the recordings section.
    recordings_end: usize,
}

impl SoundboardMenu {
    pub fn new() -> anyhow::Result<Self> {
        let menu = Menu::new();
        let mut actions = ActionTable::default();

        menu.append(&MenuItem::new(APP_NAME_PRETTY, false, None))?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&MenuItem::new("Pre-recorded Sounds:", false, None))?;
        for clip in CATALOG {
            let item = MenuItem::new(clip.name, true, None);
            actions.insert(
                item.id().clone(),
                MenuAction::Session(SessionCommand::PlayClip(clip.name.to_string())),
            );
            menu.append(&item)?;
        }

        menu.append(&PredefinedMenuItem::separator())?;
        let toggle = MenuItem::new(SessionState::Idle.toggle_label(), true, None);
        actions.insert(
            toggle.id().clone(),
            MenuAction::Session(SessionCommand::ToggleRecording),
        );
        menu.append(&toggle)?;
        let status = MenuItem::new("", false, None);
        menu.append(&status)?;

        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&MenuItem::new("User Recordings:", false, None))?;
        let recordings_end = menu.items().len();

        menu.append(&PredefinedMenuItem::separator())?;
        let copy_config = MenuItem::new("Copy config path", true, None);
        actions.insert(copy_config.id().clone(), MenuAction::CopyConfigPath);
        menu.append(&copy_config)?;
        let quit = MenuItem::new("Quit", true, None);
        actions.insert(quit.id().clone(), MenuAction::Quit);
        menu.append(&quit)?;

        Ok(Self {
            menu,
            actions,
            toggle,
            status,
            recordings: Vec::new(),
            recordings_end,
        })
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn action(&self, id: &MenuId) -> Option<&MenuAction> {
        self.actions.resolve(id)
    }

    pub fn set_state(&self, state: SessionState) {
        self.toggle.set_text(state.toggle_label());
    }

    pub fn set_status(&self, status: &str) {
        self.status.set_text(status);
    }

    /// Add the row for the recording at `index`. Rows always arrive in order.
    pub fn add_recording(&mut self, index: usize) -> anyhow::Result<()> {
        let item = MenuItem::new(recording_label(index), true, None);
        self.actions.insert(
            item.id().clone(),
            MenuAction::Session(SessionCommand::PlayRecording(index)),
        );
        self.menu
            .insert(&item, self.recordings_end)
            .context("Failed to add recording to menu")?;
        self.recordings_end += 1;
        self.recordings.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_labels_are_one_based() {
        assert_eq!(recording_label(0), "Recording 1 - Play");
        assert_eq!(recording_label(9), "Recording 10 - Play");
    }

    #[test]
    fn test_action_table_routes_ids() {
        let mut table = ActionTable::default();
        table.insert(
            MenuId::new("amen"),
            MenuAction::Session(SessionCommand::PlayClip("amen".to_string())),
        );
        table.insert(
            MenuId::new("recording-0"),
            MenuAction::Session(SessionCommand::PlayRecording(0)),
        );
        table.insert(MenuId::new("quit"), MenuAction::Quit);

        assert_eq!(
            table.resolve(&MenuId::new("amen")),
            Some(&MenuAction::Session(SessionCommand::PlayClip(
                "amen".to_string()
            )))
        );
        assert_eq!(
            table.resolve(&MenuId::new("recording-0")),
            Some(&MenuAction::Session(SessionCommand::PlayRecording(0)))
        );
        assert_eq!(table.resolve(&MenuId::new("quit")), Some(&MenuAction::Quit));
        assert_eq!(table.resolve(&MenuId::new("unknown")), None);
    }
}
