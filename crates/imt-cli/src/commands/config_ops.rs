use std::fs;

use imt_core::settings::{self, Settings, SettingsError};

use crate::die;

pub fn settings_export() {
    print!("{}", settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(settings::parse_settings_toml(&content), "Error: {}");
    println!(
        "OK: search.beam_size={}, interaction.mode={:?}, training.online={}",
        s.search.beam_size, s.interaction.mode, s.training.online
    );
}

/// `--config` replaces the embedded defaults, then `--set` overrides apply.
pub fn load(config: Option<&str>, overrides: &[String]) -> Result<Settings, SettingsError> {
    let base = config
        .map(|path| {
            fs::read_to_string(path)
                .map_err(|e| SettingsError::Parse(format!("reading {path}: {e}")))
        })
        .transpose()?;
    settings::load_settings(base.as_deref(), overrides)
}
