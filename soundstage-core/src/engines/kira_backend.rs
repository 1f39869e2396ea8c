//! Sound backend that plays through the shared kira `AudioManager`.

use std::path::{Path, PathBuf};

use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::streaming::{StreamingSoundData, StreamingSoundHandle};
use kira::sound::FromFileError;
use kira::Tween;

use crate::engines::audio_output::{is_audio_available, volume_to_db, with_audio_manager};
use crate::engines::{HandleOptions, SoundBackend, SoundHandle};
use crate::error::{Error, Result};

/// Backend producing kira-backed handles.
pub struct KiraBackend {
    available: bool,
}

impl KiraBackend {
    pub fn new() -> Self {
        let available = is_audio_available();
        if !available {
            tracing::warn!("No audio output device detected. Sound playback will be disabled.");
        }
        Self { available }
    }

    /// Returns whether an audio output device is available.
    pub fn is_available(&self) -> bool {
        self.available
    }

    fn load(&self, path: &Path, options: HandleOptions) -> Result<PendingSound> {
        if options.streaming {
            let data = StreamingSoundData::from_file(path)
                .map_err(|e| Error::SoundLoad(path.display().to_string(), e.to_string()))?;
            let data = if options.looping { data.loop_region(..) } else { data };
            Ok(PendingSound::Streaming(data))
        } else {
            let data = StaticSoundData::from_file(path)
                .map_err(|e| Error::SoundLoad(path.display().to_string(), e.to_string()))?;
            let data = if options.looping { data.loop_region(..) } else { data };
            Ok(PendingSound::Static(data))
        }
    }
}

impl Default for KiraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundBackend for KiraBackend {
    fn create(&self, sources: &[String], options: HandleOptions) -> Result<Box<dyn SoundHandle>> {
        if !self.available {
            return Err(Error::NoAudioDevice);
        }

        // Sources are tried in order; the first that decodes wins.
        let mut last_error = Error::SourceRejected("no sources given".to_string());
        for source in sources {
            let path = source_to_path(source);
            match self.load(&path, options) {
                Ok(pending) => {
                    return Ok(Box::new(KiraHandle {
                        source: source.clone(),
                        sound: KiraSound::Pending(pending),
                        volume: options.volume,
                        muted: false,
                    }));
                }
                Err(e) => {
                    tracing::debug!("Skipping source {}: {}", source, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn name(&self) -> &'static str {
        "kira"
    }
}

/// Accepts plain paths and `file://` urls.
fn source_to_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

enum PendingSound {
    Static(StaticSoundData),
    Streaming(StreamingSoundData<FromFileError>),
}

enum KiraSound {
    Pending(PendingSound),
    Static(StaticSoundHandle),
    Streaming(StreamingSoundHandle<FromFileError>),
    Stopped,
}

/// A kira sound that is decoded (or opened for streaming) but not started
/// until [`SoundHandle::play`].
struct KiraHandle {
    source: String,
    sound: KiraSound,
    volume: f32,
    muted: bool,
}

impl KiraHandle {
    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn apply_volume(&mut self) {
        let db = volume_to_db(self.effective_volume());
        match &mut self.sound {
            KiraSound::Static(handle) => handle.set_volume(db, Tween::default()),
            KiraSound::Streaming(handle) => handle.set_volume(db, Tween::default()),
            KiraSound::Pending(_) | KiraSound::Stopped => {}
        }
    }
}

impl SoundHandle for KiraHandle {
    fn play(&mut self) -> Result<()> {
        let pending = match std::mem::replace(&mut self.sound, KiraSound::Stopped) {
            KiraSound::Pending(pending) => pending,
            other => {
                // Already started (or stopped); nothing to do.
                self.sound = other;
                return Ok(());
            }
        };

        let db = volume_to_db(self.effective_volume());
        self.sound = match pending {
            PendingSound::Static(data) => {
                let handle = with_audio_manager(|mgr| mgr.play(data.volume(db)))
                    .ok_or(Error::NoAudioDevice)?
                    .map_err(|e| Error::SoundPlayback(format!("{}", e)))?;
                KiraSound::Static(handle)
            }
            PendingSound::Streaming(data) => {
                let handle = with_audio_manager(|mgr| mgr.play(data.volume(db)))
                    .ok_or(Error::NoAudioDevice)?
                    .map_err(|e| Error::SoundPlayback(format!("{}", e)))?;
                KiraSound::Streaming(handle)
            }
        };

        tracing::debug!("kira started {}", self.source);
        Ok(())
    }

    fn stop(&mut self) {
        match std::mem::replace(&mut self.sound, KiraSound::Stopped) {
            KiraSound::Static(mut handle) => handle.stop(Tween::default()),
            KiraSound::Streaming(mut handle) => handle.stop(Tween::default()),
            KiraSound::Pending(_) | KiraSound::Stopped => {}
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_volume();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.apply_volume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_to_path_strips_file_scheme() {
        assert_eq!(source_to_path("file:///tmp/a.wav"), PathBuf::from("/tmp/a.wav"));
        assert_eq!(source_to_path("audio/a.wav"), PathBuf::from("audio/a.wav"));
    }

    #[test]
    fn test_create_missing_file_fails() {
        let backend = KiraBackend::new();
        let options = HandleOptions { looping: false, volume: 1.0, streaming: false };

        // Without a device this is NoAudioDevice; with one it is a load failure.
        let result = backend.create(&["does/not/exist.wav".to_string()], options);
        assert!(result.is_err());
    }

    /// Plays a looping generated tone through a real device, then mutes and stops it.
    ///
    /// Needs a working audio device.
    #[test]
    #[ignore] // Requires audio device: cargo test -- --ignored
    fn test_looping_handle_plays_and_stops() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tone.wav");
        create_test_wav(&path, 440.0, 1.0, 44100);

        let backend = KiraBackend::new();
        assert!(backend.is_available());

        for streaming in [false, true] {
            let options = HandleOptions { looping: true, volume: 0.5, streaming };
            let mut handle = backend
                .create(&[path.display().to_string()], options)
                .unwrap();
            handle.play().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(300));
            handle.set_muted(true);
            handle.set_volume(0.8);
            handle.set_muted(false);
            handle.stop();
        }
    }

    /// Helper: create a WAV file with a sine wave for testing.
    fn create_test_wav(path: &Path, frequency: f32, duration_secs: f32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        for i in 0..num_samples {
            let t = i as f32 / sample_rate as f32;
            let sample = (t * frequency * 2.0 * std::f32::consts::PI).sin();
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
}
