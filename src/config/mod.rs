use crate::models::{
    AnimationLibrary, Category, MovesetModel, Rule, RuleMatch, Settings, UserConfig, default_categories,
};
use crate::services::ConditionDocument;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_yaml_ng::Value;
use std::fs;
use std::sync::LazyLock;

/// Prefix of environment variables that override settings, e.g. `STANCECRAFT_DEBUG_MODE=true`
pub const ENV_PREFIX: &str = "STANCECRAFT";

static UNSAFE_FILE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9 _.-]+").expect("Invalid file name regex")
});

/// Settings overrides read from the environment through the `config` crate
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    cycle_mode: Option<crate::models::CycleMode>,
    preserve_conditions: Option<bool>,
    combo_window_ms: Option<u64>,
    sweep_interval_ms: Option<u64>,
    output_dir: Option<String>,
    debug_mode: Option<bool>,
}

impl EnvOverrides {
    fn collect(source: config::Environment) -> Result<Self> {
        config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()
            .context("Failed to read environment overrides")?
            .try_deserialize()
            .context("Failed to parse environment overrides")
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(mode) = self.cycle_mode {
            settings.cycle_mode = mode;
        }
        if let Some(preserve) = self.preserve_conditions {
            settings.preserve_conditions = preserve;
        }
        if let Some(ms) = self.combo_window_ms {
            settings.combo_window_ms = ms;
        }
        if let Some(ms) = self.sweep_interval_ms {
            settings.sweep_interval_ms = ms;
        }
        if let Some(dir) = self.output_dir {
            settings.output_dir = dir;
        }
        if let Some(debug) = self.debug_mode {
            settings.debug_mode = debug;
        }
    }
}

/// Configuration manager for the data directory.
///
/// Manages three YAML files:
/// - `Stancecraft Settings.yaml`: user settings
/// - `Stancecraft Rules.yaml`: category templates, Player, General NPC and declared rules
/// - `Stancecraft Library.yaml`: source animation definitions
///
/// Compiled documents are written as JSON into the output directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    data_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    rules_path: Utf8PathBuf,
    library_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `data_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)
                .with_context(|| format!("Failed to create data directory: {}", data_dir))?;
        }

        Ok(Self {
            settings_path: data_dir.join("Stancecraft Settings.yaml"),
            rules_path: data_dir.join("Stancecraft Rules.yaml"),
            library_path: data_dir.join("Stancecraft Library.yaml"),
            data_dir,
        })
    }

    /// Load user settings, then apply `STANCECRAFT_*` environment overrides.
    ///
    /// # Returns
    /// The loaded UserConfig, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<UserConfig> {
        let mut config = self.load_settings_file()?;
        EnvOverrides::collect(config::Environment::with_prefix(ENV_PREFIX))?.apply(&mut config.settings);
        Ok(config)
    }

    fn load_settings_file(&self) -> Result<UserConfig> {
        if !self.settings_path.exists() {
            tracing::warn!("Settings file not found at {}, using defaults", self.settings_path);
            return Ok(UserConfig::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let config: UserConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(config)
    }

    pub fn save_settings(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the rule file.
    ///
    /// Malformed categories and rules are skipped with a warning rather than
    /// failing the whole load; missing categories are then rebuilt from the
    /// templates. Only a file that is not YAML at all is an error.
    pub fn load_model(&self) -> Result<MovesetModel> {
        if !self.rules_path.exists() {
            tracing::warn!("Rules file not found at {}, using defaults", self.rules_path);
            return Ok(MovesetModel::default());
        }

        let file_contents = fs::read_to_string(&self.rules_path)
            .with_context(|| format!("Failed to read rules: {}", self.rules_path))?;

        let raw: Value = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse rules: {}", self.rules_path))?;

        let model = model_from_value(&raw);
        tracing::info!(
            "Loaded {} declared rules and {} categories from {}",
            model.rules.len(),
            model.templates.len(),
            self.rules_path
        );
        Ok(model)
    }

    pub fn save_model(&self, model: &MovesetModel) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(model).context("Failed to serialize rules to YAML")?;

        fs::write(&self.rules_path, yaml_string)
            .with_context(|| format!("Failed to write rules: {}", self.rules_path))?;

        tracing::info!("Saved rules to {}", self.rules_path);
        Ok(())
    }

    pub fn load_library(&self) -> Result<AnimationLibrary> {
        if !self.library_path.exists() {
            tracing::warn!("Library file not found at {}, using an empty library", self.library_path);
            return Ok(AnimationLibrary::new());
        }

        let file_contents = fs::read_to_string(&self.library_path)
            .with_context(|| format!("Failed to read library: {}", self.library_path))?;

        let library: AnimationLibrary = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse library: {}", self.library_path))?;

        tracing::info!("Loaded {} source animations from {}", library.len(), self.library_path);
        Ok(library)
    }

    pub fn save_library(&self, library: &AnimationLibrary) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(library).context("Failed to serialize library to YAML")?;

        fs::write(&self.library_path, yaml_string)
            .with_context(|| format!("Failed to write library: {}", self.library_path))?;

        tracing::info!("Saved library to {}", self.library_path);
        Ok(())
    }

    /// Output directory from settings, relative paths resolved against the data directory
    pub fn output_dir(&self, settings: &Settings) -> Utf8PathBuf {
        let dir = Utf8Path::new(&settings.output_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.data_dir.join(dir)
        }
    }

    /// Write every document as pretty JSON into `out_dir`.
    ///
    /// With `preserve` set, an existing document's foreign conditions are
    /// carried over. Existing files that are not valid JSON are overwritten.
    ///
    /// # Returns
    /// Number of documents written
    pub fn write_documents(&self, documents: &[ConditionDocument], out_dir: &Utf8Path, preserve: bool) -> Result<usize> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {}", out_dir))?;

        for document in documents {
            let path = out_dir.join(document_file_name(document));
            let existing = if preserve { read_existing(&path) } else { None };

            let rendered = document.render(existing.as_ref(), preserve);
            let json = serde_json::to_string_pretty(&rendered)
                .with_context(|| format!("Failed to serialize document {}", document.source))?;

            fs::write(&path, json).with_context(|| format!("Failed to write document: {}", path))?;
            tracing::debug!("Wrote {}", path);
        }

        tracing::info!("Wrote {} documents to {}", documents.len(), out_dir);
        Ok(documents.len())
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }
}

/// `{mod:03}_{sub:03}_{name}.json`, with characters unsafe in file names replaced
pub fn document_file_name(document: &ConditionDocument) -> String {
    let name = UNSAFE_FILE_CHARS.replace_all(document.name.trim(), "_");
    format!(
        "{:03}_{:03}_{}.json",
        document.source.mod_index, document.source.sub_index, name
    )
}

fn read_existing(path: &Utf8Path) -> Option<serde_json::Value> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Existing document {} is not valid JSON ({}), replacing it", path, e);
            None
        }
    }
}

fn model_from_value(raw: &Value) -> MovesetModel {
    let templates = match raw.get("templates") {
        Some(value) => parse_categories("templates", value),
        None => {
            tracing::warn!("Rules file has no templates, using built-in categories");
            default_categories()
        }
    };

    let mut model = MovesetModel::new(templates);

    for (key, matcher) in [("player", RuleMatch::Player), ("general", RuleMatch::General)] {
        let Some(value) = raw.get(key) else {
            tracing::warn!("Rules file has no {} rule, using an empty one", key);
            continue;
        };
        if let Some(mut rule) = parse_rule(value) {
            if rule.matcher != matcher {
                tracing::warn!("Rule {} stored under {} with a {} matcher, fixing", rule.name, key, rule.rule_type());
                rule.matcher = matcher.clone();
            }
            match matcher {
                RuleMatch::Player => model.player = rule,
                _ => model.general = rule,
            }
        }
    }

    if let Some(rules) = raw.get("rules").and_then(Value::as_sequence) {
        for value in rules {
            let Some(rule) = parse_rule(value) else {
                continue;
            };
            if matches!(rule.matcher, RuleMatch::Player | RuleMatch::General) {
                tracing::warn!("Skipping declared rule {} with a {} matcher", rule.name, rule.rule_type());
                continue;
            }
            if model.rules.iter().any(|r| r.matcher == rule.matcher) {
                tracing::warn!("Skipping duplicate rule {}", rule.name);
                continue;
            }
            model.rules.push(rule);
        }
    }

    let rebuilt = model.reconcile();
    if rebuilt > 0 {
        tracing::info!("Reconstructed {} categories from templates", rebuilt);
    }
    model
}

fn parse_categories(owner: &str, value: &Value) -> IndexMap<String, Category> {
    let Some(mapping) = value.as_mapping() else {
        tracing::warn!("Categories of {} are not a mapping, ignoring them", owner);
        return IndexMap::new();
    };

    let mut categories = IndexMap::new();
    for (key, value) in mapping {
        let Some(name) = key.as_str() else {
            tracing::warn!("Skipping category with a non-string key in {}", owner);
            continue;
        };
        match serde_yaml_ng::from_value::<Category>(value.clone()) {
            Ok(category) => {
                categories.insert(name.to_string(), category);
            }
            Err(e) => tracing::warn!("Skipping malformed category {} in {}: {}", name, owner, e),
        }
    }
    categories
}

fn parse_rule(value: &Value) -> Option<Rule> {
    let name = value.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");

    let matcher = match value.get("matcher").cloned().map(serde_yaml_ng::from_value::<RuleMatch>) {
        Some(Ok(matcher)) => matcher,
        Some(Err(e)) => {
            tracing::warn!("Skipping rule {}: invalid matcher: {}", name, e);
            return None;
        }
        None => {
            tracing::warn!("Skipping rule {}: no matcher", name);
            return None;
        }
    };

    let mut rule = Rule::new(name, matcher);
    if let Some(categories) = value.get("categories") {
        rule.categories = parse_categories(name, categories);
    }
    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CycleMode, ConfigurationEntry, RuleRef, SourceAnimation, SourceRef, VariantInstance};
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert_eq!(manager.load_settings_file().unwrap(), UserConfig::default());
        assert_eq!(manager.load_model().unwrap(), MovesetModel::default());
        assert!(manager.load_library().unwrap().is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let vars: config::Map<String, String> = [
            ("STANCECRAFT_CYCLE_MODE", "Random"),
            ("STANCECRAFT_COMBO_WINDOW_MS", "900"),
            ("STANCECRAFT_DEBUG_MODE", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let overrides =
            EnvOverrides::collect(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars))).unwrap();
        let mut settings = Settings::default();
        overrides.apply(&mut settings);

        assert_eq!(settings.cycle_mode, CycleMode::Random);
        assert_eq!(settings.combo_window_ms, 900);
        assert!(settings.debug_mode);
        assert_eq!(settings.sweep_interval_ms, Settings::default().sweep_interval_ms);
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = UserConfig::default();
        config.settings.preserve_conditions = true;
        config.settings.output_dir = "meshes/out".into();
        manager.save_settings(&config).unwrap();

        let loaded = manager.load_settings_file().unwrap();
        assert!(loaded.settings.preserve_conditions);
        assert_eq!(manager.output_dir(&loaded.settings), manager.data_dir().join("meshes/out"));
    }

    #[test]
    fn test_model_round_trip() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut model = MovesetModel::default();
        let rule = model
            .add_rule("Guards", RuleMatch::Keyword("GuardKeyword".into()))
            .unwrap();
        model
            .rule_mut(rule)
            .and_then(|r| r.category_mut("Sword"))
            .and_then(|c| c.stance_mut(0))
            .unwrap()
            .entries
            .push(ConfigurationEntry::new("Guard", vec![VariantInstance::parent(SourceRef::new(2, 5))]));

        manager.save_model(&model).unwrap();
        assert_eq!(manager.load_model().unwrap(), model);
        assert!(model.rule(RuleRef::Declared(0)).is_some());
    }

    #[test]
    fn test_malformed_rules_skipped() {
        let (manager, _temp_dir) = create_test_config_manager();
        let yaml = r#"
player:
  name: Player
  matcher: { type: Player }
  categories:
    Sword: { name: Sword, right_type: "not a number" }
general:
  name: General NPC
  matcher: { type: General }
rules:
  - name: Broken
    matcher: { type: Race, target: "not a form" }
  - name: Bandits
    matcher: { type: Faction, target: "Skyrim.esm|0x0001BCC0" }
  - name: Bandits again
    matcher: { type: Faction, target: "Skyrim.esm|0x0001BCC0" }
"#;
        fs::write(&manager.rules_path, yaml).unwrap();

        let model = manager.load_model().unwrap();
        assert_eq!(model.rules.len(), 1);
        assert_eq!(model.rules[0].name, "Bandits");
        // Malformed category rebuilt from the built-in template
        assert_eq!(model.player.categories["Sword"].right_type, 1);
        assert_eq!(model.player.categories.len(), model.templates.len());
        assert_eq!(model.rules[0].categories.len(), model.templates.len());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(&manager.rules_path, "player: [unclosed").unwrap();
        assert!(manager.load_model().is_err());
    }

    #[test]
    fn test_library_round_trip() {
        let (manager, _temp_dir) = create_test_config_manager();
        let library = AnimationLibrary::from(vec![
            SourceAnimation::new(SourceRef::new(0, 1), "Heavy"),
            SourceAnimation::new(SourceRef::new(0, 0), "Light"),
        ]);
        manager.save_library(&library).unwrap();
        assert_eq!(manager.load_library().unwrap(), library);
    }

    #[test]
    fn test_document_file_name() {
        let document = ConditionDocument {
            source: SourceRef::new(3, 12),
            name: " Dual: Wield/Fast ".into(),
            priority: 0,
            capabilities: Default::default(),
            tree: crate::services::ConditionNode::kill_switch(),
        };
        assert_eq!(document_file_name(&document), "003_012_Dual_ Wield_Fast.json");
    }
}
