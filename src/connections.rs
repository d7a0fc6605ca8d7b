use crate::config::{Config, S3Config, TRANSIENT};
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use tracing::info;

/// Saved connection profiles and which one is in use.
#[derive(Debug)]
pub struct ConnectionManager {
    config: Config,
    path: PathBuf,
    selected: Option<usize>,
}

impl ConnectionManager {
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            config,
            path,
            selected: None,
        }
    }

    /// Loads profiles from `path`, with the environment profile first.
    pub fn load(path: PathBuf) -> Result<Self> {
        let config = Config::load(&path)?;
        Ok(Self::new(config, path))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn list(&self) -> &[S3Config] {
        &self.config.connections
    }

    pub fn count(&self) -> usize {
        self.config.connections.len()
    }

    pub fn get(&self, index: usize) -> Option<&S3Config> {
        self.config.connections.get(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.config.connections.iter().position(|c| c.name == name)
    }

    /// Adds a profile, replacing an existing one with the same name.
    pub fn add(&mut self, profile: S3Config) -> usize {
        match self.find(&profile.name) {
            Some(index) => {
                self.config.connections[index] = profile;
                index
            }
            None => {
                self.config.connections.push(profile);
                self.config.connections.len() - 1
            }
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<S3Config> {
        if index >= self.count() {
            return None;
        }
        let removed = self.config.connections.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Some(removed)
    }

    /// Saves a copy of the profile at `index` under `new_name`. The copy of
    /// the environment profile is an ordinary, persisted profile.
    pub fn duplicate(&mut self, index: usize, new_name: &str) -> Result<usize> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            bail!("Profile name is required");
        }
        if new_name == TRANSIENT {
            bail!("{} is reserved for the environment profile", TRANSIENT);
        }
        if self.find(new_name).is_some() {
            bail!("A profile named {:?} already exists", new_name);
        }
        let mut copy = self
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("No connection profile at position {}", index))?;
        copy.name = new_name.to_string();
        Ok(self.add(copy))
    }

    pub fn select(&mut self, index: usize) -> Result<&S3Config> {
        let profile = self
            .config
            .connections
            .get(index)
            .ok_or_else(|| anyhow!("No connection profile at position {}", index))?;
        self.selected = Some(index);
        Ok(profile)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_profile(&self) -> Option<&S3Config> {
        self.selected.and_then(|i| self.get(i))
    }

    pub fn save(&self) -> Result<()> {
        self.config.save_to_file(&self.path)?;
        info!(path = %self.path.display(), "saved connection profiles");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> S3Config {
        S3Config {
            name: name.into(),
            endpoint: "localhost:9000".into(),
            ..Default::default()
        }
    }

    #[test]
    fn add_replaces_same_name_and_remove_shifts_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ConnectionManager::new(Config::default(), dir.path().join("s.json"));
        manager.add(profile("a"));
        manager.add(profile("b"));
        manager.add(profile("c"));
        let mut updated = profile("b");
        updated.bucket = "new".into();
        assert_eq!(manager.add(updated), 1);
        assert_eq!(manager.count(), 3);

        manager.select(2).unwrap();
        manager.remove(0);
        assert_eq!(manager.selected(), Some(1));
        assert_eq!(manager.selected_profile().unwrap().name, "c");
        manager.remove(1);
        assert_eq!(manager.selected(), None);
        assert!(manager.select(5).is_err());
    }

    #[test]
    fn duplicate_copies_every_field_under_a_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = ConnectionManager::new(Config::default(), dir.path().join("s.json"));
        let mut source = profile("prod");
        source.bucket = "media".into();
        source.use_ssl = true;
        manager.add(source);

        let index = manager.duplicate(0, " Copy of prod ").unwrap();
        assert_eq!(index, 1);
        let copy = manager.get(index).unwrap();
        assert_eq!(copy.name, "Copy of prod");
        assert_eq!(copy.bucket, "media");
        assert!(copy.use_ssl);
        assert_eq!(manager.get(0).unwrap().name, "prod");

        assert!(manager.duplicate(0, "prod").is_err());
        assert!(manager.duplicate(0, "  ").is_err());
        assert!(manager.duplicate(0, TRANSIENT).is_err());
        assert!(manager.duplicate(7, "other").is_err());
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut manager = ConnectionManager::new(Config::default(), path.clone());
        manager.add(profile(TRANSIENT));
        manager.add(profile("kept"));
        manager.save().unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        let names: Vec<_> = reloaded.connections.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["kept"]);
    }
}
