use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, Settings};

#[derive(Default)]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub rules_file: Option<String>,
    pub use_cache: Option<bool>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.model.is_none() && self.rules_file.is_none() && self.use_cache.is_none()
    }

    /// An empty string clears an optional setting.
    fn apply(self, settings: &mut Settings) {
        if let Some(key) = self.api_key {
            settings.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Some(model) = self.model.filter(|m| !m.trim().is_empty()) {
            settings.model = model;
        }
        if let Some(path) = self.rules_file {
            settings.rules_file = Some(path).filter(|p| !p.trim().is_empty());
        }
        if let Some(on) = self.use_cache {
            settings.use_cache = on;
        }
    }
}

pub fn run(update: ConfigUpdate) -> Result<()> {
    let mut settings = load_settings();
    if !update.is_empty() {
        update.apply(&mut settings);
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }

    println!("model:        {}", settings.model);
    println!("api_base_url: {}", settings.api_base_url);
    println!("api_key:      {}", if settings.api_key.is_some() { "(set)" } else { "(not set)" });
    println!("rules_file:   {}", settings.rules_file.as_deref().unwrap_or("(built-in)"));
    println!("use_cache:    {}", settings.use_cache);
    Ok(())
}
