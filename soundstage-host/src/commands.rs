//! Commands the frontend sends over its JSON bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use soundstage_core::soundboard::PlayRequest;

use crate::state::AppState;

/// One frontend call, tagged by `command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Play {
        url: String,
        #[serde(default)]
        options: PlayRequest,
    },
    Stop {
        track_id: String,
    },
    StopAll,
    SetMasterVolume {
        level: f32,
    },
    AdjustTrackVolume {
        track_id: String,
        level: f32,
    },
    ToggleMute {
        track_id: String,
    },
    AddTrack {
        name: String,
        url: String,
    },
    GetActiveState,
    GetDebugLog,
    ClearDebugLog,
}

/// Runs a command. Queries return their snapshot, everything else `null`.
pub fn dispatch(state: &AppState, command: Command) -> Value {
    match command {
        Command::Play { url, options } => {
            state.play(&url, options);
            Value::Null
        }
        Command::Stop { track_id } => {
            state.stop(&track_id);
            Value::Null
        }
        Command::StopAll => {
            state.stop_all();
            Value::Null
        }
        Command::SetMasterVolume { level } => {
            state.set_master_volume(level);
            Value::Null
        }
        Command::AdjustTrackVolume { track_id, level } => {
            state.adjust_track_volume(&track_id, level);
            Value::Null
        }
        Command::ToggleMute { track_id } => {
            state.toggle_mute(&track_id);
            Value::Null
        }
        Command::AddTrack { name, url } => {
            state.add_track(&name, &url);
            Value::Null
        }
        Command::GetActiveState => to_value(state.get_active_state()),
        Command::GetDebugLog => to_value(state.get_debug_log()),
        Command::ClearDebugLog => {
            state.clear_debug_log();
            Value::Null
        }
    }
}

/// Parses and runs a raw JSON command.
pub fn dispatch_json(state: &AppState, raw: &str) -> Result<Value, String> {
    let command: Command = serde_json::from_str(raw).map_err(|e| {
        tracing::warn!("Rejected command {}: {}", raw, e);
        e.to_string()
    })?;
    tracing::debug!(?command, "dispatch");
    Ok(dispatch(state, command))
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize command result: {}", e);
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LogBuffer;
    use soundstage_core::config::AudioConfig;
    use soundstage_core::engines::MemoryBackend;
    use std::collections::VecDeque;
    use std::sync::Arc;

    fn state() -> AppState {
        let log_buffer: LogBuffer = Arc::new(std::sync::Mutex::new(VecDeque::new()));
        AppState::with_backend(&AudioConfig::default(), Arc::new(MemoryBackend::new()), log_buffer)
            .unwrap()
    }

    #[test]
    fn test_parse_play_with_ui_options() {
        let command: Command = serde_json::from_str(
            r#"{
                "command": "play",
                "url": "amb.mp3",
                "options": {"location_id": "forest", "loop": true}
            }"#,
        )
        .unwrap();

        match command {
            Command::Play { url, options } => {
                assert_eq!(url, "amb.mp3");
                assert_eq!(options.location_id, "forest");
                assert!(options.looping);
                assert!(!options.replace);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_play_options_default_when_omitted() {
        let command: Command =
            serde_json::from_str(r#"{"command": "play", "url": "a.mp3"}"#).unwrap();
        match command {
            Command::Play { options, .. } => assert_eq!(options, PlayRequest::default()),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let state = state();
        assert!(dispatch_json(&state, r#"{"command": "pause"}"#).is_err());
        assert!(dispatch_json(&state, "not json").is_err());
    }

    #[test]
    fn test_commands_drive_state() {
        let state = state();
        state.play_blocking("a.mp3", PlayRequest::at("cave"));

        dispatch_json(&state, r#"{"command": "add_track", "name": "amb", "url": "amb.mp3"}"#)
            .unwrap();
        dispatch_json(&state, r#"{"command": "set_master_volume", "level": 0.25}"#).unwrap();

        let snapshot = dispatch_json(&state, r#"{"command": "get_active_state"}"#).unwrap();
        assert_eq!(snapshot["master_volume"], 0.25);
        assert_eq!(snapshot["tracks"][0]["name"], "amb");
        let id = snapshot["active_tracks"][0]["id"].as_str().unwrap().to_string();

        let toggle = format!(r#"{{"command": "toggle_mute", "track_id": "{}"}}"#, id);
        dispatch_json(&state, &toggle).unwrap();
        assert!(state.get_active_state().active_tracks[0].is_muted);

        dispatch_json(&state, r#"{"command": "stop_all"}"#).unwrap();
        assert!(!state.get_active_state().is_playing);
    }
}
