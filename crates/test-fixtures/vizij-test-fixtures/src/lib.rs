//! Shared authoring fixtures for tests and benches.
//!
//! Every fixture is listed in `fixtures/manifest.json` under its kind; the
//! per-kind modules resolve a fixture name to its file and load it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    entities: BTreeMap<String, String>,
    #[serde(rename = "state-events", default)]
    state_events: BTreeMap<String, String>,
    #[serde(rename = "param-rules", default)]
    param_rules: BTreeMap<String, String>,
    #[serde(default)]
    scenarios: BTreeMap<String, ScenarioEntry>,
}

/// A scenario points at the entity asset it drives.
#[derive(Debug, Deserialize)]
struct ScenarioEntry {
    path: String,
    entity: String,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

macro_rules! fixture_kind {
    ($module:ident, $field:ident, $label:literal) => {
        pub mod $module {
            use super::*;

            /// Fixture names, sorted.
            pub fn keys() -> Vec<String> {
                MANIFEST.$field.keys().cloned().collect()
            }

            pub fn json(name: &str) -> Result<String> {
                read_to_string(lookup(&MANIFEST.$field, $label, name)?)
            }

            pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
                load_json(lookup(&MANIFEST.$field, $label, name)?)
            }

            pub fn path(name: &str) -> Result<PathBuf> {
                Ok(resolve_path(lookup(&MANIFEST.$field, $label, name)?))
            }
        }
    };
}

fixture_kind!(entities, entities, "entity");
fixture_kind!(state_events, state_events, "state events");
fixture_kind!(param_rules, param_rules, "param rules");

pub mod scenarios {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.scenarios.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.scenarios, "scenario", name)?;
        read_to_string(&entry.path)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.scenarios, "scenario", name)?;
        load_json(&entry.path)
    }

    /// Name of the entity fixture the scenario drives.
    pub fn entity(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.scenarios, "scenario", name)?;
        Ok(entry.entity.clone())
    }
}
