/// Profile persistence: named mapping-set + config snapshots saved under
/// `%APPDATA%`, following a read-TOML-with-fallback-to-defaults idiom —
/// this is the one active persistence path; `EngineConfig` itself has no
/// standalone file, it's just a field of each `Profile`.

use crate::config::EngineConfig;
use crate::mapping::{default_mapping, MappingSet, Source, Target};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// A saved mapping set paired with the engine config active when it was
/// saved. The "Default" profile is synthesized at load time if missing and
/// cannot be deleted.
///
/// `mappings` is stored as an ordered list of (source, targets) pairs
/// rather than the engine's `HashMap<Source, Vec<Target>>` directly — TOML
/// tables require string keys, and `Source` is an enum, so the map form
/// doesn't round-trip through `toml::to_string`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub mappings: Vec<(Source, Vec<Target>)>,
    pub config: EngineConfig,
}

impl Profile {
    pub fn default_profile() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            mappings: mapping_set_to_vec(default_mapping()),
            config: EngineConfig::default(),
        }
    }

    pub fn mapping_set(&self) -> MappingSet {
        self.mappings.iter().cloned().collect()
    }
}

fn mapping_set_to_vec(set: MappingSet) -> Vec<(Source, Vec<Target>)> {
    use crate::mapping::ALL_SOURCES;
    ALL_SOURCES
        .iter()
        .filter_map(|s| set.get(s).map(|t| (*s, t.clone())))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalPreferences {
    pub start_minimized: bool,
}

/// The whole of what's written to disk. `schema_version` lets a future
/// format change detect and migrate (or fall back to defaults) rather than
/// fail outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub schema_version: u32,
    pub profiles: Vec<Profile>,
    pub current_profile: String,
    pub preferences: GlobalPreferences,
}

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

impl Default for PersistedDocument {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            profiles: vec![Profile::default_profile()],
            current_profile: DEFAULT_PROFILE_NAME.to_string(),
            preferences: GlobalPreferences::default(),
        }
    }
}

impl PersistedDocument {
    /// Load from the default profiles file, falling back to a fresh
    /// document (with just "Default") on any read/parse/schema failure.
    /// Never fatal — a corrupt profiles file must not block the engine
    /// from starting. The second return value is a non-fatal notice the
    /// supervisor should surface to the UI when the file existed but
    /// couldn't be honored as-is.
    pub fn load() -> (Self, Option<String>) {
        let path = profiles_file_path();
        let (mut doc, notice) = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<PersistedDocument>(&contents) {
                Ok(doc) if doc.schema_version == CURRENT_SCHEMA_VERSION => {
                    log::info!("Loaded profiles from {path}");
                    (doc, None)
                }
                Ok(doc) => {
                    let msg = format!(
                        "profiles file schema version {} is forward-incompatible with {CURRENT_SCHEMA_VERSION}; reset to defaults",
                        doc.schema_version
                    );
                    log::warn!("{msg}");
                    (Self::default(), Some(msg))
                }
                Err(e) => {
                    let msg = format!("failed to parse profiles file {path}: {e}; reset to defaults");
                    log::warn!("{msg}");
                    (Self::default(), Some(msg))
                }
            },
            Err(_) => {
                log::info!("No profiles file found at {path}. Using defaults.");
                (Self::default(), None)
            }
        };
        doc.ensure_default_profile();
        (doc, notice)
    }

    pub fn save(&self) -> std::io::Result<()> {
        let path = profiles_file_path();
        if let Some(parent) = std::path::Path::new(&path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, toml_str)
    }

    /// The "Default" profile is always present; synthesize it if a
    /// hand-edited or migrated file dropped it.
    fn ensure_default_profile(&mut self) {
        if !self.profiles.iter().any(|p| p.name == DEFAULT_PROFILE_NAME) {
            self.profiles.insert(0, Profile::default_profile());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn upsert(&mut self, profile: Profile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(slot) => *slot = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Delete a profile by name. The "Default" profile can never be
    /// deleted; callers attempting it get `false` back.
    pub fn delete(&mut self, name: &str) -> bool {
        if name == DEFAULT_PROFILE_NAME {
            return false;
        }
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        if self.current_profile == name {
            self.current_profile = DEFAULT_PROFILE_NAME.to_string();
        }
        self.profiles.len() != before
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }
}

fn profiles_file_path() -> String {
    if let Ok(appdata) = std::env::var("APPDATA") {
        format!("{appdata}\\padlink\\profiles.toml")
    } else {
        "padlink_profiles.toml".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_has_default_profile() {
        let doc = PersistedDocument::default();
        assert_eq!(doc.current_profile, DEFAULT_PROFILE_NAME);
        assert!(doc.get(DEFAULT_PROFILE_NAME).is_some());
    }

    #[test]
    fn default_profile_cannot_be_deleted() {
        let mut doc = PersistedDocument::default();
        assert!(!doc.delete(DEFAULT_PROFILE_NAME));
        assert!(doc.get(DEFAULT_PROFILE_NAME).is_some());
    }

    #[test]
    fn deleting_current_profile_falls_back_to_default() {
        let mut doc = PersistedDocument::default();
        doc.upsert(Profile {
            name: "Racing".to_string(),
            mappings: mapping_set_to_vec(default_mapping()),
            config: EngineConfig::default(),
        });
        doc.current_profile = "Racing".to_string();
        assert!(doc.delete("Racing"));
        assert_eq!(doc.current_profile, DEFAULT_PROFILE_NAME);
    }

    #[test]
    fn upsert_replaces_existing_profile_by_name() {
        let mut doc = PersistedDocument::default();
        let mut custom = Profile::default_profile();
        custom.config.deadzone_left = 0.5;
        doc.upsert(custom);
        assert_eq!(doc.profiles.len(), 1);
        assert_eq!(doc.get(DEFAULT_PROFILE_NAME).unwrap().config.deadzone_left, 0.5);
    }

    #[test]
    fn names_lists_every_profile() {
        let mut doc = PersistedDocument::default();
        doc.upsert(Profile {
            name: "Sim".to_string(),
            mappings: mapping_set_to_vec(default_mapping()),
            config: EngineConfig::default(),
        });
        assert_eq!(doc.names(), vec![DEFAULT_PROFILE_NAME.to_string(), "Sim".to_string()]);
    }
}
