use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

use crate::record::{Category, DEFAULT_REGION};

const CONFIG_FILE: &str = "vahan";

/// Runtime settings. Defaults cover the public Vahan dashboard; any field can
/// be overridden from `vahan.toml` or `VAHAN__*` environment variables.
/// Endpoint lists come from the environment as comma-separated values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub base_url: String,
    pub report_url: String,
    pub primary_timeout_secs: u64,
    pub alternate_timeout_secs: u64,
    pub region: String,
    pub category_alternates: Vec<String>,
    pub manufacturer_alternates: Vec<String>,
    pub synthetic_months: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/vahan.sqlite"),
            base_url: "https://vahan.parivahan.gov.in/vahan4dashboard/".into(),
            report_url: "https://vahan.parivahan.gov.in/vahan4dashboard/vahan/view/reportview.xhtml"
                .into(),
            primary_timeout_secs: 30,
            alternate_timeout_secs: 15,
            region: DEFAULT_REGION.into(),
            category_alternates: vec![
                "vahan/view/reportview.xhtml".into(),
                "vahan/reports/reportview.xhtml".into(),
                "api/vehicle-registrations".into(),
                "data/vehicle-stats".into(),
            ],
            manufacturer_alternates: vec![
                "vahan/view/manufacturer-report.xhtml".into(),
                "vahan/reports/manufacturer.xhtml".into(),
                "api/manufacturer-registrations".into(),
            ],
            synthetic_months: 24,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Settings> {
        Self::from_environment(environment())
    }

    fn from_environment(env: Environment) -> Result<Settings> {
        Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.primary_timeout_secs)
    }

    pub fn alternate_timeout(&self) -> Duration {
        Duration::from_secs(self.alternate_timeout_secs)
    }

    /// Absolute URL for an alternate endpoint.
    pub fn alternate_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("VAHAN")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("category_alternates")
        .with_list_parse_key("manufacturer_alternates")
}

/// Word lists used by normalization and extraction.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub category_synonyms: HashMap<String, Category>,
    pub category_keywords: Vec<String>,
    pub manufacturer_keywords: Vec<String>,
}

const TWO_WHEELER: &[&str] = &["2w", "two wheeler", "two-wheeler", "2 wheeler", "motorcycle", "scooter"];
const THREE_WHEELER: &[&str] = &["3w", "three wheeler", "three-wheeler", "3 wheeler", "auto rickshaw", "tuk-tuk"];
const FOUR_WHEELER: &[&str] = &["4w", "four wheeler", "four-wheeler", "4 wheeler", "car", "suv", "sedan"];

impl Default for Vocabulary {
    fn default() -> Self {
        let mut category_synonyms = HashMap::new();
        for (words, cat) in [
            (TWO_WHEELER, Category::TwoWheeler),
            (THREE_WHEELER, Category::ThreeWheeler),
            (FOUR_WHEELER, Category::FourWheeler),
        ] {
            for w in words {
                category_synonyms.insert(w.to_string(), cat.clone());
            }
        }

        Vocabulary {
            category_synonyms,
            category_keywords: [
                "2w", "3w", "4w", "two wheeler", "three wheeler", "four wheeler", "registration",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            manufacturer_keywords: ["manufacturer", "maker", "company", "brand"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
