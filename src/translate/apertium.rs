use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, Span};

use crate::config::ApertiumConfig;
use crate::error::EngineError;
use crate::language::LanguagePair;
use crate::process::ExternalCommand;
use super::{Engine, Readiness, Translator, translator_span};

const ENGINE: &str = "apertium";

/// Handle on the apertium installation, shared by every apertium translator
/// of one dispatcher.
///
/// The installed pair list is probed once and then trusted for the rest of
/// the run; a failed probe is not remembered.
pub struct ApertiumEngine {
    binary_path: String,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
    installed_pairs: OnceCell<Vec<String>>,
}

impl ApertiumEngine {
    pub fn new(config: &ApertiumConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            timeout: config.timeout(),
            temp_dir: None,
            installed_pairs: OnceCell::new(),
        }
    }

    /// Write temporary input files below `dir` instead of the system default
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = Some(dir);
        self
    }

    /// Locally installed language pairs, as reported by `apertium -l`
    pub async fn installed_pairs(&self) -> Result<&[String], EngineError> {
        let pairs = self
            .installed_pairs
            .get_or_try_init(|| async {
                let output = ExternalCommand::new(&self.binary_path, "Apertium pair listing")
                    .arg("-l")
                    .timeout(self.timeout)
                    .execute()
                    .await
                    .map_err(|e| EngineError::from_command(ENGINE, e))?;

                let pairs: Vec<String> = output
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty())
                    .map(str::to_string)
                    .collect();
                debug!("Apertium reports {} installed pairs", pairs.len());
                Ok::<_, EngineError>(pairs)
            })
            .await?;
        Ok(pairs.as_slice())
    }

    async fn run(&self, pair: &str, text: &str) -> Result<String, EngineError> {
        let temp_dir = self.temp_dir.clone();
        let content = text.to_string();
        let input = tokio::task::spawn_blocking(move || write_input(temp_dir.as_deref(), &content))
            .await
            .map_err(std::io::Error::other)??;

        // `input` is removed when it goes out of scope, on every path
        let output = ExternalCommand::new(&self.binary_path, format!("Apertium translation `{}`", pair))
            .arg("-u")
            .arg(pair)
            .path_arg(input.path())
            .timeout(self.timeout)
            .execute()
            .await
            .map_err(|e| EngineError::from_command(ENGINE, e))?;

        Ok(output.stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// Write `text` to a fresh `.txt` temp file, below `dir` when given
fn write_input(dir: Option<&Path>, text: &str) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.suffix(".txt");
    let mut input = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempfile_in(dir)?
        }
        None => builder.tempfile()?,
    };
    input.write_all(text.as_bytes())?;
    input.flush()?;
    Ok(input)
}

/// Rule-based translator backed by the apertium command line.
/// Missing language data is never installed automatically.
pub struct ApertiumTranslator {
    pair: LanguagePair,
    source_alpha3: String,
    target_alpha3: String,
    engine: Arc<ApertiumEngine>,
    readiness: Readiness,
    span: Span,
}

impl ApertiumTranslator {
    /// Translator for `pair`; nothing is probed until first use
    pub fn new(pair: LanguagePair, engine: Arc<ApertiumEngine>) -> Self {
        let (source_alpha3, target_alpha3) = pair.alpha3();
        let span = translator_span(Engine::Apertium, &pair);
        span.in_scope(|| info!("Initializing translator ..."));

        Self {
            pair,
            source_alpha3,
            target_alpha3,
            engine,
            readiness: Readiness::new(),
            span,
        }
    }

    /// The `src-tgt` token apertium is invoked with
    pub fn mode(&self) -> String {
        format!("{}-{}", self.source_alpha3, self.target_alpha3)
    }

    fn reverse_mode(&self) -> String {
        format!("{}-{}", self.target_alpha3, self.source_alpha3)
    }
}

#[async_trait]
impl Translator for ApertiumTranslator {
    fn engine(&self) -> Engine {
        Engine::Apertium
    }

    fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    fn span(&self) -> &Span {
        &self.span
    }

    fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    async fn check_pair(&self) -> Result<(), EngineError> {
        let installed = self.engine.installed_pairs().await?;
        let mode = self.mode();

        if installed.iter().any(|p| *p == mode) {
            return Ok(());
        }

        // some pairs are packaged for one direction but work both ways
        let reverse = self.reverse_mode();
        if installed.iter().any(|p| *p == reverse) {
            debug!("Using reverse apertium pair `{}` for `{}`", reverse, mode);
            return Ok(());
        }

        Err(EngineError::PairNotInstalled {
            pair: mode,
            available: installed
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    async fn translate_text(&self, text: &str) -> Result<String, EngineError> {
        self.engine.run(&self.mode(), text).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Fake apertium: `-l` lists `pairs` and logs each probe to `probes.log`;
    /// `-u <pair> <file>` prints `<pair>:` followed by the file content.
    fn fake_apertium(dir: &TempDir, pairs: &[&str]) -> String {
        let path = dir.path().join("apertium");
        let log = dir.path().join("probes.log");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"-l\" ]; then\n  echo probe >> '{log}'\n  printf '{pairs}'\n  exit 0\nfi\n\
             if [ \"$2\" = \"fail-fail\" ]; then echo 'mode missing' >&2; exit 1; fi\n\
             printf '%s:' \"$2\"\ncat \"$3\"\necho\n",
            log = log.display(),
            pairs = pairs.iter().map(|p| format!("{}\\n", p)).collect::<String>(),
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn engine(binary_path: String, temp_dir: &TempDir) -> Arc<ApertiumEngine> {
        let config = ApertiumConfig {
            binary_path,
            timeout: 10,
        };
        Arc::new(ApertiumEngine::new(&config).with_temp_dir(temp_dir.path().join("tmp")))
    }

    fn probe_count(dir: &TempDir) -> usize {
        std::fs::read_to_string(dir.path().join("probes.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_direct_pair_is_ready_and_translates() {
        let dir = TempDir::new().unwrap();
        let engine = engine(fake_apertium(&dir, &["spa-cat", "deu-eng"]), &dir);
        let translator = ApertiumTranslator::new(LanguagePair::new("de", "en"), engine);

        assert!(translator.ensure_pair().await.unwrap());
        let result = translator.translate("Hallo Welt").await.unwrap();
        assert_eq!(result.as_deref(), Some("deu-eng:Hallo Welt"));
    }

    #[tokio::test]
    async fn test_reverse_pair_is_accepted() {
        let dir = TempDir::new().unwrap();
        let engine = engine(fake_apertium(&dir, &["cat-spa"]), &dir);
        let translator = ApertiumTranslator::new(LanguagePair::new("es", "ca"), engine);

        assert!(translator.ensure_pair().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_pair_lists_first_ten_installed() {
        let dir = TempDir::new().unwrap();
        let pairs: Vec<String> = (0..12).map(|i| format!("aa{}-bb{}", i, i)).collect();
        let pair_refs: Vec<&str> = pairs.iter().map(String::as_str).collect();
        let engine = engine(fake_apertium(&dir, &pair_refs), &dir);
        let translator = ApertiumTranslator::new(LanguagePair::new("de", "en"), engine);

        match translator.ensure_pair().await {
            Err(EngineError::PairNotInstalled { pair, available }) => {
                assert_eq!(pair, "deu-eng");
                assert!(available.contains("aa9-bb9"));
                assert!(!available.contains("aa10-bb10"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_engine_not_installed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-apertium").to_string_lossy().to_string();
        let translator =
            ApertiumTranslator::new(LanguagePair::new("de", "en"), engine(missing, &dir));

        assert!(matches!(
            translator.ensure_pair().await,
            Err(EngineError::EngineNotInstalled { .. })
        ));
    }

    #[tokio::test]
    async fn test_installed_pairs_are_probed_once_per_engine() {
        let dir = TempDir::new().unwrap();
        let engine = engine(fake_apertium(&dir, &["deu-eng", "eng-spa"]), &dir);
        let first = ApertiumTranslator::new(LanguagePair::new("de", "en"), engine.clone());
        let second = ApertiumTranslator::new(LanguagePair::new("en", "es"), engine);

        first.ensure_pair().await.unwrap();
        second.ensure_pair().await.unwrap();
        first.translate("eins").await.unwrap();

        assert_eq!(probe_count(&dir), 1);
    }

    #[tokio::test]
    async fn test_failed_run_carries_stderr_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let engine = engine(fake_apertium(&dir, &[]), &dir);

        let result = engine.run("fail-fail", "text").await;
        match result {
            Err(EngineError::TranslationFailed(message)) => {
                assert!(message.contains("mode missing"))
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let leftovers = std::fs::read_dir(dir.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_input_file_is_created_in_missing_temp_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("tmp").join("apertium");

        let input = write_input(Some(&nested), "Hallo Welt").unwrap();
        assert!(input.path().starts_with(&nested));
        assert_eq!(input.path().extension().unwrap(), "txt");
        assert_eq!(std::fs::read_to_string(input.path()).unwrap(), "Hallo Welt");

        let path = input.path().to_path_buf();
        drop(input);
        assert!(!path.exists());
    }
}
