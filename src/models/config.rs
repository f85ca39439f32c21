use serde::{Deserialize, Serialize};

/// How variants advance when cycling
///
/// A single switch: every actor cycles the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CycleMode {
    #[default]
    Sequential,
    Random,
}

/// User settings from Stancecraft Settings.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "Stancecraft_Settings", default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Cycle Mode", default)]
    pub cycle_mode: CycleMode,

    #[serde(rename = "Preserve Conditions", default)]
    pub preserve_conditions: bool,

    #[serde(rename = "Combo Window Ms", default = "default_combo_window_ms")]
    pub combo_window_ms: u64,

    #[serde(rename = "Sweep Interval Ms", default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    #[serde(rename = "Output Dir", default = "default_output_dir")]
    pub output_dir: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cycle_mode: CycleMode::Sequential,
            preserve_conditions: false,
            combo_window_ms: default_combo_window_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            output_dir: default_output_dir(),
            debug_mode: false,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
        }
    }
}

fn default_combo_window_ms() -> u64 {
    1500
}

fn default_sweep_interval_ms() -> u64 {
    250
}

fn default_output_dir() -> String {
    "output".to_string()
}
