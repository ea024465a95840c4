use crate::defaults;
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    pub chime: ChimeConfig,
    pub speech: SpeechConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
}

/// Queue backend connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_ms: u64,
}

/// Polling and transition detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub collision_window_ms: u64,
    pub template: String,
    pub announce_client_name: bool,
}

/// Chime phase tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChimeConfig {
    /// Overrides the chime URL stored in the backend settings.
    pub url: Option<String>,
    pub confirm_timeout_ms: u64,
    pub phase_timeout_ms: u64,
    pub min_progress_ms: u64,
    pub min_progress_fraction: f32,
}

/// Speech phase configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub server_tts: bool,
    pub timeout_ms: u64,
    pub local_enabled: bool,
    pub local_command: String,
    pub local_args: Vec<String>,
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub device: Option<String>,
    pub volume: f32,
}

/// Background video player configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// mpv `--input-ipc-server` socket; no socket means no video to duck.
    pub mpv_socket: Option<PathBuf>,
    pub duck_volume: f32,
    pub max_volume: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            token: None,
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            collision_window_ms: defaults::COLLISION_WINDOW_MS,
            template: defaults::ANNOUNCEMENT_TEMPLATE.to_string(),
            announce_client_name: true,
        }
    }
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            confirm_timeout_ms: defaults::CHIME_CONFIRM_TIMEOUT_MS,
            phase_timeout_ms: defaults::CHIME_PHASE_TIMEOUT_MS,
            min_progress_ms: defaults::CHIME_MIN_PROGRESS_MS,
            min_progress_fraction: defaults::CHIME_MIN_PROGRESS_FRACTION,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            server_tts: true,
            timeout_ms: defaults::SPEECH_TIMEOUT_MS,
            local_enabled: true,
            local_command: defaults::LOCAL_SPEECH_COMMAND.to_string(),
            local_args: defaults::LOCAL_SPEECH_ARGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: None,
            volume: 1.0,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            mpv_socket: None,
            duck_volume: defaults::DUCK_VOLUME,
            max_volume: defaults::MPV_MAX_VOLUME,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn collision_window(&self) -> Duration {
        Duration::from_millis(self.collision_window_ms)
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file yields defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(MonitorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(MonitorError::ConfigParse {
                message: format!("{}: {}", path.display(), e),
            }),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NOWSERVING_SERVER_URL → server.base_url
    /// - NOWSERVING_TOKEN → server.token
    /// - NOWSERVING_AUDIO_DEVICE → audio.device
    /// - NOWSERVING_MPV_SOCKET → video.mpv_socket
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("NOWSERVING_SERVER_URL")
            && !url.is_empty()
        {
            self.server.base_url = url;
        }

        if let Ok(token) = std::env::var("NOWSERVING_TOKEN")
            && !token.is_empty()
        {
            self.server.token = Some(token);
        }

        if let Ok(device) = std::env::var("NOWSERVING_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(socket) = std::env::var("NOWSERVING_MPV_SOCKET")
            && !socket.is_empty()
        {
            self.video.mpv_socket = Some(PathBuf::from(socket));
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn positive(key: &str, value: u64) -> Result<()> {
            if value == 0 {
                return Err(MonitorError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        fn unit_interval(key: &str, value: f32) -> Result<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: format!("must be between 0.0 and 1.0, got {value}"),
                });
            }
            Ok(())
        }

        if self.server.base_url.trim().is_empty() {
            return Err(MonitorError::ConfigInvalidValue {
                key: "server.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if let Err(e) = reqwest::Url::parse(self.server.base_url.trim()) {
            return Err(MonitorError::ConfigInvalidValue {
                key: "server.base_url".to_string(),
                message: e.to_string(),
            });
        }
        positive("server.request_timeout_ms", self.server.request_timeout_ms)?;
        positive("monitor.poll_interval_ms", self.monitor.poll_interval_ms)?;
        positive("chime.confirm_timeout_ms", self.chime.confirm_timeout_ms)?;
        positive("chime.phase_timeout_ms", self.chime.phase_timeout_ms)?;
        positive("speech.timeout_ms", self.speech.timeout_ms)?;
        unit_interval("chime.min_progress_fraction", self.chime.min_progress_fraction)?;
        unit_interval("audio.volume", self.audio.volume)?;
        unit_interval("video.duck_volume", self.video.duck_volume)?;

        if !self.monitor.template.contains("{counter}") {
            return Err(MonitorError::ConfigInvalidValue {
                key: "monitor.template".to_string(),
                message: "must contain the {counter} placeholder".to_string(),
            });
        }

        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/nowserving/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("nowserving")
            .join("config.toml")
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MonitorError::Other(format!(
            "Failed to serialize configuration: {}",
            e
        )))
    }

    /// Look up a dotted key such as `monitor.poll_interval_ms`.
    pub fn get_value_by_path(&self, key: &str) -> Result<toml::Value> {
        let unknown = || MonitorError::ConfigInvalidValue {
            key: key.to_string(),
            message: "unknown configuration key".to_string(),
        };
        let root = toml::Value::try_from(self).map_err(|e| MonitorError::Other(format!(
            "Failed to serialize configuration: {}",
            e
        )))?;

        key.split('.').try_fold(root, |value, part| match value {
            toml::Value::Table(mut table) => table.remove(part).ok_or_else(unknown),
            _ => Err(unknown()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_nowserving_env() {
        remove_env("NOWSERVING_SERVER_URL");
        remove_env("NOWSERVING_TOKEN");
        remove_env("NOWSERVING_AUDIO_DEVICE");
        remove_env("NOWSERVING_MPV_SOCKET");
    }

    #[test]
    fn test_get_value_by_path() {
        let config = Config::default();
        assert_eq!(
            config.get_value_by_path("monitor.poll_interval_ms").unwrap(),
            toml::Value::Integer(2000)
        );
        assert_eq!(
            config.get_value_by_path("speech.local_command").unwrap(),
            toml::Value::String("spd-say".to_string())
        );
        assert!(config.get_value_by_path("monitor.nope").is_err());
        assert!(config.get_value_by_path("monitor.poll_interval_ms.deeper").is_err());
        // Unset options are absent
        assert!(config.get_value_by_path("chime.url").is_err());
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = Config::default();
        config.video.mpv_socket = Some(PathBuf::from("/run/user/1000/mpv.sock"));
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.server.base_url, "http://localhost:3000/api");
        assert_eq!(config.server.token, None);
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.monitor.collision_window(), Duration::from_secs(8));
        assert!(config.monitor.announce_client_name);
        assert_eq!(config.chime.url, None);
        assert_eq!(config.chime.confirm_timeout_ms, 2000);
        assert_eq!(config.chime.phase_timeout_ms, 7000);
        assert_eq!(config.chime.min_progress_ms, 100);
        assert_eq!(config.chime.min_progress_fraction, 0.1);
        assert!(config.speech.server_tts);
        assert_eq!(config.speech.local_command, "spd-say");
        assert_eq!(config.speech.local_args, vec!["--wait".to_string()]);
        assert!(config.audio.enabled);
        assert_eq!(config.video.duck_volume, 0.5);
        assert_eq!(config.video.max_volume, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [server]
            base_url = "http://queue.local/api"
            token = "secret"

            [monitor]
            poll_interval_ms = 1500
            collision_window_ms = 10000
            template = "Number {counter}, {window}"
            announce_client_name = false

            [chime]
            url = "/uploads/ding.wav"

            [speech]
            server_tts = false
            local_command = "espeak-ng"
            local_args = []

            [video]
            mpv_socket = "/run/user/1000/mpv.sock"
            duck_volume = 0.3
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.server.base_url, "http://queue.local/api");
        assert_eq!(config.server.token.as_deref(), Some("secret"));
        assert_eq!(config.monitor.poll_interval_ms, 1500);
        assert_eq!(config.monitor.collision_window_ms, 10000);
        assert_eq!(config.monitor.template, "Number {counter}, {window}");
        assert!(!config.monitor.announce_client_name);
        assert_eq!(config.chime.url.as_deref(), Some("/uploads/ding.wav"));
        assert!(!config.speech.server_tts);
        assert_eq!(config.speech.local_command, "espeak-ng");
        assert!(config.speech.local_args.is_empty());
        assert_eq!(
            config.video.mpv_socket,
            Some(PathBuf::from("/run/user/1000/mpv.sock"))
        );
        assert_eq!(config.video.duck_volume, 0.3);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [audio]
            device = "pulse"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.device.as_deref(), Some("pulse"));
        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.chime, ChimeConfig::default());
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_env_override_server_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nowserving_env();

        set_env("NOWSERVING_SERVER_URL", "http://10.0.0.5:3000/api");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.base_url, "http://10.0.0.5:3000/api");
        assert_eq!(config.server.token, None);

        clear_nowserving_env();
    }

    #[test]
    fn test_env_override_all() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nowserving_env();

        set_env("NOWSERVING_SERVER_URL", "http://queue/api");
        set_env("NOWSERVING_TOKEN", "abc");
        set_env("NOWSERVING_AUDIO_DEVICE", "hw:1,0");
        set_env("NOWSERVING_MPV_SOCKET", "/tmp/mpv.sock");

        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.base_url, "http://queue/api");
        assert_eq!(config.server.token.as_deref(), Some("abc"));
        assert_eq!(config.audio.device.as_deref(), Some("hw:1,0"));
        assert_eq!(config.video.mpv_socket, Some(PathBuf::from("/tmp/mpv.sock")));

        clear_nowserving_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_nowserving_env();

        set_env("NOWSERVING_SERVER_URL", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.server.base_url, defaults::BASE_URL);

        clear_nowserving_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [monitor
            template = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_nowserving_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[server\nbase_url = ").unwrap();

        let err = Config::load_or_default(temp_file.path()).unwrap_err();
        assert!(matches!(err, MonitorError::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let mut config = Config::default();
        config.monitor.poll_interval_ms = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("monitor.poll_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_duck_volume() {
        let mut config = Config::default();
        config.video.duck_volume = 1.5;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("video.duck_volume"));
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let mut config = Config::default();
        config.server.base_url = "queue.local/api".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.base_url"));
    }

    #[test]
    fn test_validate_rejects_template_without_counter() {
        let mut config = Config::default();
        config.monitor.template = "Please proceed to {window}".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{counter}"));
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("nowserving"));
        assert!(path_str.ends_with("config.toml"));
    }
}
