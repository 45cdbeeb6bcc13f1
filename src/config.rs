use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

const APP_DIR: &str = "ticket-timer";
const DOTFILE: &str = ".ticket-timer";

/// Keys recognised in a config file, in the order `init` prompts for them.
pub const KEYS: [&str; 9] = [
    "TICKET_PREFIX",
    "TICKET_SUFFIX",
    "DEFAULT_SUBJECT",
    "SUPPORT_NAME",
    "ZENDESK_BASE_URL",
    "TIMEZONE",
    "COPY_TO_CLIPBOARD",
    "TIME_TRACKER_CMD",
    "TICKET_CLIENT_CMD",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ticket_prefix: String,
    pub ticket_suffix: String,
    pub default_subject: String,
    pub support_name: String,
    pub zendesk_base_url: String,
    pub timezone: String,
    pub copy_to_clipboard: bool,
    pub time_tracker_cmd: String,
    pub ticket_client_cmd: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ticket_prefix: "#".into(),
            ticket_suffix: String::new(),
            default_subject: "Ticket Update".into(),
            support_name: "Support".into(),
            zendesk_base_url: "https://your-company.zendesk.com".into(),
            timezone: "UTC".into(),
            copy_to_clipboard: true,
            time_tracker_cmd: "toggl".into(),
            ticket_client_cmd: "zendesk".into(),
        }
    }
}

impl Config {
    pub fn set(&mut self, key: &str, value: String) {
        match key {
            "TICKET_PREFIX" => self.ticket_prefix = value,
            "TICKET_SUFFIX" => self.ticket_suffix = value,
            "DEFAULT_SUBJECT" => self.default_subject = value,
            "SUPPORT_NAME" => self.support_name = value,
            "ZENDESK_BASE_URL" => self.zendesk_base_url = value.trim_end_matches('/').to_string(),
            "TIMEZONE" => self.timezone = value,
            "COPY_TO_CLIPBOARD" => self.copy_to_clipboard = is_truthy(&value),
            "TIME_TRACKER_CMD" if !value.is_empty() => self.time_tracker_cmd = value,
            "TICKET_CLIENT_CMD" if !value.is_empty() => self.ticket_client_cmd = value,
            _ => debug!(key, "ignoring unknown config key"),
        }
    }

    /// Value of `key` as it would be written back to a config file.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "TICKET_PREFIX" => self.ticket_prefix.clone(),
            "TICKET_SUFFIX" => self.ticket_suffix.clone(),
            "DEFAULT_SUBJECT" => self.default_subject.clone(),
            "SUPPORT_NAME" => self.support_name.clone(),
            "ZENDESK_BASE_URL" => self.zendesk_base_url.clone(),
            "TIMEZONE" => self.timezone.clone(),
            "COPY_TO_CLIPBOARD" => self.copy_to_clipboard.to_string(),
            "TIME_TRACKER_CMD" => self.time_tracker_cmd.clone(),
            "TICKET_CLIENT_CMD" => self.ticket_client_cmd.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Builds a config from `KEY=value` text layered over the defaults.
    pub fn parse(text: &str) -> Self {
        let mut config = Config::default();
        for (key, value) in parse_lines(text) {
            config.set(&key, value);
        }
        config
    }
}

/// Outcome of searching the candidate paths.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub config: Config,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn parse_lines(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), strip_quotes(value.trim()).to_string()))
        })
        .collect()
}

/// Candidate config files in search order.
pub fn candidate_paths(cwd: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(cwd) = cwd {
        paths.push(cwd.join(DOTFILE));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(DOTFILE));
    }
    paths.push(config_path());
    paths
}

/// Where `init` writes the config file.
pub fn config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join(APP_DIR).join("config");
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR)
        .join("config")
}

/// Uses the first readable candidate; never fails.
pub fn resolve(candidates: &[PathBuf]) -> Resolved {
    let mut warnings = Vec::new();
    for path in candidates {
        if !path.is_file() {
            debug!(path = %path.display(), "config candidate not present");
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "using config file");
                return Resolved {
                    config: Config::parse(&text),
                    source: Some(path.clone()),
                    warnings,
                };
            }
            Err(e) => warnings.push(format!("cannot read {}: {e}", path.display())),
        }
    }
    debug!("no config file found, using built-in defaults");
    warnings.push(
        "no configuration file found; using defaults (run `ticket-timer init` to create one)"
            .to_string(),
    );
    Resolved {
        config: Config::default(),
        source: None,
        warnings,
    }
}

fn quote(value: &str) -> String {
    if value.contains('"') {
        format!("'{value}'")
    } else {
        format!("\"{value}\"")
    }
}

pub fn render(config: &Config) -> String {
    let mut out = String::from("# ticket-timer configuration\n");
    for key in KEYS {
        if let Some(value) = config.get(key) {
            out.push_str(&format!("{key}={}\n", quote(&value)));
        }
    }
    out
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, render(config))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&temp_path, perms)?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}
