use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::args::BaseArgs;
use crate::ui::{print_command_status, CommandStatus};

pub const DEFAULT_API_URL: &str = "https://zkillboard.com/api/history";
pub const DEFAULT_ROOT: &str = "./json";
pub const DEFAULT_DOWNLOAD_RATE: u32 = 10;
pub const DEFAULT_DISPATCH_RATE: u32 = 1;
pub const DEFAULT_WORKERS: usize = 8;

const LOCAL_CONFIG_FILE: &str = "histsync.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub root: Option<PathBuf>,
    pub download_rate: Option<u32>,
    pub dispatch_rate: Option<u32>,
    pub workers: Option<usize>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Config {
    fn merge(&self, other: &Config) -> Config {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.clone());
        Config {
            api_url: other.api_url.clone().or_else(|| self.api_url.clone()),
            root: other.root.clone().or_else(|| self.root.clone()),
            download_rate: other.download_rate.or(self.download_rate),
            dispatch_rate: other.dispatch_rate.or(self.dispatch_rate),
            workers: other.workers.or(self.workers),
            extra,
        }
    }
}

/// Effective settings after layering flags and env over config files and
/// built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub root: PathBuf,
    pub download_rate: u32,
    pub dispatch_rate: u32,
    pub workers: usize,
    pub json: bool,
}

impl Settings {
    pub fn resolve(base: &BaseArgs) -> Settings {
        let config = match &base.config {
            Some(path) => load_file(path),
            None => load(),
        };
        Self::from_layers(base, &config)
    }

    fn from_layers(base: &BaseArgs, config: &Config) -> Settings {
        Settings {
            api_url: base
                .api_url
                .clone()
                .or_else(|| config.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            root: base
                .root
                .clone()
                .or_else(|| config.root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)),
            download_rate: config
                .download_rate
                .filter(|rate| *rate > 0)
                .unwrap_or(DEFAULT_DOWNLOAD_RATE),
            dispatch_rate: config
                .dispatch_rate
                .filter(|rate| *rate > 0)
                .unwrap_or(DEFAULT_DISPATCH_RATE),
            workers: config
                .workers
                .filter(|workers| *workers > 0)
                .unwrap_or(DEFAULT_WORKERS),
            json: base.json,
        }
    }
}

pub fn global_path() -> Option<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("histsync").join("config.json"));
    }
    dirs::home_dir().map(|home| home.join(".config").join("histsync").join("config.json"))
}

pub fn load_file(path: &Path) -> Config {
    let file_contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("could not read {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    let config: Config = match serde_json::from_str(&file_contents) {
        Ok(c) => c,
        Err(e) => {
            print_command_status(
                CommandStatus::Warning,
                &format!("could not parse {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    for key in config.extra.keys() {
        print_command_status(
            CommandStatus::Warning,
            &format!("unknown config key {} in {}", key, path.display()),
        );
    }

    config
}

/// Global config overlaid with `./histsync.json`.
pub fn load() -> Config {
    let global = global_path().map(|p| load_file(&p)).unwrap_or_default();
    let local = load_file(Path::new(LOCAL_CONFIG_FILE));
    global.merge(&local)
}
