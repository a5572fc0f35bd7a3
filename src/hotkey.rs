//! Global hotkey that toggles recording.

use std::str::FromStr;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use tracing::warn;

use soundboard_core::Config;

/// Default hotkey: Meta+Shift+R
pub fn default_hotkey() -> HotKey {
    HotKey::new(Some(Modifiers::META | Modifiers::SHIFT), Code::KeyR)
}

/// The configured toggle hotkey, or the default when unset or unparsable.
pub fn toggle_hotkey(config: &Config) -> HotKey {
    let Some(raw) = config.hotkey() else {
        return default_hotkey();
    };
    match HotKey::from_str(raw) {
        Ok(hotkey) => hotkey,
        Err(e) => {
            warn!(hotkey = raw, error = %e, "Invalid hotkey in config, using default");
            default_hotkey()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_hotkey_uses_default() {
        assert_eq!(toggle_hotkey(&Config::default()), default_hotkey());
    }

    #[test]
    fn test_configured_hotkey_is_parsed() {
        let mut config = Config::default();
        config.set_hotkey("ctrl+alt+KeyS");
        assert_eq!(
            toggle_hotkey(&config),
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::ALT), Code::KeyS)
        );
    }

    #[test]
    fn test_invalid_hotkey_falls_back() {
        let mut config = Config::default();
        config.set_hotkey("ctrl+not-a-key");
        assert_eq!(toggle_hotkey(&config), default_hotkey());
    }
}
