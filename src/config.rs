//! Configuration for the handicapping engine.

use serde::{Deserialize, Serialize};

use crate::evaluator::WeightProfile;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Dark-horse store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub dark_horse_db: String,
}

fn default_db_path() -> String {
    "data/dark_horse.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dark_horse_db: default_db_path(),
        }
    }
}

/// Pace analysis configuration, as wired into the scoring passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaceConfig {
    /// How many leaders on each side decide the race shape.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Base scale of the multiplicative adjustment.
    #[serde(default = "default_adjustment_scale")]
    pub adjustment_scale: f64,
    /// Relative gap between the top sums before the shape is called.
    #[serde(default = "default_bias_threshold")]
    pub bias_threshold: f64,
}

fn default_top_n() -> usize {
    2
}

fn default_adjustment_scale() -> f64 {
    0.10
}

fn default_bias_threshold() -> f64 {
    0.12
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            adjustment_scale: default_adjustment_scale(),
            bias_threshold: default_bias_threshold(),
        }
    }
}

/// Betting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BettingConfig {
    /// Total budget per race in yen.
    #[serde(default = "default_total_budget")]
    pub total_budget: u32,
    /// Minimum ticket increment.
    #[serde(default = "default_bet_unit")]
    pub bet_unit: u32,
}

fn default_total_budget() -> u32 {
    400
}

fn default_bet_unit() -> u32 {
    100
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            total_budget: default_total_budget(),
            bet_unit: default_bet_unit(),
        }
    }
}

/// Weight profiles for the two scoring passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "WeightProfile::ability")]
    pub ability: WeightProfile,
    #[serde(default = "WeightProfile::value")]
    pub value: WeightProfile,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            ability: WeightProfile::ability(),
            value: WeightProfile::value(),
        }
    }
}

/// Curated reference lists used for report commentary. Injected rather than
/// hardcoded so callers and tests can swap them freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    /// Ranked list; the first three count as tier 1, the next five tier 2.
    #[serde(default = "default_top_jockeys")]
    pub top_jockeys: Vec<String>,
    #[serde(default = "default_sprint_sires")]
    pub sprint_sires: Vec<String>,
    #[serde(default = "default_mud_sires")]
    pub mud_sires: Vec<String>,
    #[serde(default = "default_turf_sires")]
    pub turf_sires: Vec<String>,
}

fn default_top_jockeys() -> Vec<String> {
    [
        "C.ルメール",
        "武豊",
        "戸崎圭太",
        "川田将雅",
        "M.デムーロ",
        "福永祐一",
        "池添謙一",
        "横山武史",
        "松岡正海",
        "藤岡佑介",
        "岩田康誠",
        "鮫島克駿",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sprint_sires() -> Vec<String> {
    ["ダイワメジャー", "クロフネ", "ロードカナロア", "キンシャサノキセキ"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_mud_sires() -> Vec<String> {
    ["クロフネ", "ゴールドアリュール", "キングカメハメハ", "ハーツクライ"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_turf_sires() -> Vec<String> {
    ["ディープインパクト", "キングカメハメハ", "ハーツクライ", "ステイゴールド"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            top_jockeys: default_top_jockeys(),
            sprint_sires: default_sprint_sires(),
            mud_sires: default_mud_sires(),
            turf_sires: default_turf_sires(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pace: PaceConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub profiles: ProfileConfig,
    #[serde(default)]
    pub reference: ReferenceData,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (KEIBA_SERVER_PORT, etc.)
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
