// Speech-to-text front end: ffmpeg pulls a 16 kHz mono track out of any
// audio/video file, whisper.cpp turns it into text. The transcript can then
// go through the regular translation dispatch.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{Config, MediaConfig, TranscriberConfig};
use crate::error::{CommandError, Error, Result};
use crate::process::ExternalCommand;

/// Builds the external commands of the transcription pipeline
pub struct TranscriptionCommandBuilder {
    ffmpeg_path: String,
    whisper_path: String,
}

impl TranscriptionCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, whisper_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            whisper_path: whisper_path.into(),
        }
    }

    /// Build audio extraction command
    pub fn extract_audio<P: AsRef<Path>>(&self, media_path: P, audio_path: P) -> ExternalCommand {
        ExternalCommand::new(&self.ffmpeg_path, "Audio extraction")
            .arg("-i")
            .path_arg(media_path)
            .arg("-vn")
            .args(["-c:a", "pcm_s16le"])
            .args(["-ar", "16000"])
            .args(["-ac", "1"])
            .arg("-y")
            .path_arg(audio_path)
    }

    /// Build whisper.cpp command writing `<output_base>.txt`
    pub fn transcribe<P: AsRef<Path>>(
        &self,
        model_path: P,
        audio_path: P,
        output_base: P,
        language: &str,
    ) -> ExternalCommand {
        ExternalCommand::new(&self.whisper_path, "Transcription")
            .arg("-m")
            .path_arg(model_path)
            .arg("-f")
            .path_arg(audio_path)
            .arg("-l")
            .arg(language)
            .arg("-otxt")
            .arg("-of")
            .path_arg(output_base)
            .arg("-np")
    }
}

/// Transcribes media files with ffmpeg and whisper.cpp
pub struct Transcriber {
    config: TranscriberConfig,
    commands: TranscriptionCommandBuilder,
    work_dir: PathBuf,
}

impl Transcriber {
    /// Transcriber working below `<data_root>/tmp`
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            config.transcriber.clone(),
            &config.media,
            config.data_root.join("tmp"),
        )
    }

    /// Transcriber from explicit settings and work directory
    pub fn with_parts(config: TranscriberConfig, media: &MediaConfig, work_dir: PathBuf) -> Self {
        let commands = TranscriptionCommandBuilder::new(&media.binary_path, &config.binary_path);
        Self {
            config,
            commands,
            work_dir,
        }
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// Transcribe `media_path`; `language` falls back to the configured one
    pub async fn transcribe(&self, media_path: &Path, language: Option<&str>) -> Result<String> {
        if !media_path.exists() {
            return Err(Error::Media(format!("File not found: {}", media_path.display())));
        }

        let model_path = self.config.model_path();
        if !model_path.exists() {
            return Err(Error::Transcription(format!(
                "Whisper model not found: {}",
                model_path.display()
            )));
        }

        tokio::fs::create_dir_all(&self.work_dir).await?;
        // removed with everything in it once this call returns
        let work = tempfile::tempdir_in(&self.work_dir)?;
        let audio_path = work.path().join("audio.wav");
        let output_base = work.path().join("transcript");

        info!("Extracting audio from {}", media_path.display());
        self.commands
            .extract_audio(media_path, audio_path.as_path())
            .timeout(self.timeout())
            .execute()
            .await
            .map_err(|e| Error::Media(describe(e)))?;

        let language = language.unwrap_or(&self.config.language);
        info!("Transcribing {} (language: {})", media_path.display(), language);
        self.commands
            .transcribe(model_path.as_path(), audio_path.as_path(), output_base.as_path(), language)
            .timeout(self.timeout())
            .execute()
            .await
            .map_err(|e| Error::Transcription(describe(e)))?;

        let transcript_path = output_base.with_extension("txt");
        let transcript = tokio::fs::read_to_string(&transcript_path).await.map_err(|e| {
            Error::Transcription(format!(
                "Failed to read transcript {}: {}",
                transcript_path.display(),
                e
            ))
        })?;

        let transcript = transcript.trim().to_string();
        debug!("Transcript has {} characters", transcript.len());
        Ok(transcript)
    }
}

fn describe(err: CommandError) -> String {
    match err {
        CommandError::NotFound { program } => format!("`{}` is not installed", program),
        other => other.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    /// Fake ffmpeg writes its last argument; fake whisper writes `-of`.txt
    fn transcriber(dir: &TempDir, whisper_body: &str) -> Transcriber {
        let ffmpeg = script(dir, "ffmpeg", "for last; do :; done\necho RIFF > \"$last\"");
        let whisper = script(dir, "whisper-cli", whisper_body);
        dir.child("models/ggml-tiny.bin").write_str("model").unwrap();

        let config = TranscriberConfig {
            binary_path: whisper,
            model_root: dir.path().join("models"),
            model: "ggml-tiny.bin".to_string(),
            timeout: 10,
            language: "auto".to_string(),
        };
        let media = MediaConfig { binary_path: ffmpeg };
        Transcriber::with_parts(config, &media, dir.path().join("work"))
    }

    const WHISPER_OK: &str = "while [ $# -gt 0 ]; do\n\
        case \"$1\" in -of) out=\"$2\"; shift;; -l) lang=\"$2\"; shift;; esac\n\
        shift\ndone\n\
        printf '  Hallo (%s)\\n' \"$lang\" > \"$out.txt\"";

    #[tokio::test]
    async fn test_transcript_is_read_and_trimmed() {
        let dir = TempDir::new().unwrap();
        dir.child("talk.mp4").write_str("video").unwrap();
        let transcriber = transcriber(&dir, WHISPER_OK);

        let text = transcriber
            .transcribe(&dir.path().join("talk.mp4"), Some("de"))
            .await
            .unwrap();
        assert_eq!(text, "Hallo (de)");

        let text = transcriber.transcribe(&dir.path().join("talk.mp4"), None).await.unwrap();
        assert_eq!(text, "Hallo (auto)");

        let leftovers = std::fs::read_dir(dir.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_whisper_failure_is_a_transcription_error() {
        let dir = TempDir::new().unwrap();
        dir.child("talk.mp4").write_str("video").unwrap();
        let transcriber = transcriber(&dir, "echo 'bad model' >&2; exit 1");

        let result = transcriber.transcribe(&dir.path().join("talk.mp4"), None).await;
        match result {
            Err(Error::Transcription(message)) => assert!(message.contains("bad model")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_media_is_rejected() {
        let dir = TempDir::new().unwrap();
        let transcriber = transcriber(&dir, WHISPER_OK);
        let result = transcriber.transcribe(&dir.path().join("missing.mp4"), None).await;
        assert!(matches!(result, Err(Error::Media(_))));
    }
}
