//! Runs bridge generation over a fixture directory.
//!
//! Every `<name>.json` contract may carry a sibling `<name>.expect.json` naming the
//! registered types it must produce, or an error substring it must fail with.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use colored::Colorize;
use log::{debug, info};
use serde::Deserialize;

use contract_bridge::{BridgeAssembler, ContractSchema, GeneratorConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FixtureExpectation {
    /// Registered type names, in registration order.
    types: Option<Vec<String>>,
    /// Substring of the generation error.
    error: Option<String>,
    config: Option<GeneratorConfig>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let pattern = std::env::args().nth(1).unwrap_or_else(|| "fixtures/*.json".to_string());

    let mut fixtures = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
        let path = entry?;
        if !is_expectation(&path) {
            fixtures.push(path);
        }
    }
    info!("{} fixture(s) matched {pattern}", fixtures.len());

    let mut failed = 0usize;
    for path in &fixtures {
        match run_fixture(path) {
            Ok(summary) => println!("{} {}: {summary}", "ok".green().bold(), path.display()),
            Err(error) => {
                failed += 1;
                println!("{} {}: {error:#}", "FAIL".red().bold(), path.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} fixture(s) failed", fixtures.len());
    }
    Ok(())
}

fn is_expectation(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".expect.json")
}

fn expectation_path(path: &Path) -> PathBuf {
    path.with_extension("expect.json")
}

fn run_fixture(path: &Path) -> anyhow::Result<String> {
    let expect_path = expectation_path(path);
    let expectation: FixtureExpectation = if expect_path.exists() {
        let src = std::fs::read_to_string(&expect_path)
            .with_context(|| format!("failed to read {}", expect_path.display()))?;
        serde_json::from_str(&src).with_context(|| format!("malformed {}", expect_path.display()))?
    } else {
        FixtureExpectation::default()
    };
    debug!("{}: {expectation:?}", path.display());

    let contract = ContractSchema::from_path(path)?;
    let config = expectation.config.clone().unwrap_or_default();
    let outcome = BridgeAssembler::new(config.clone()).assemble(&contract);

    let bridge = match (outcome, &expectation.error) {
        (Err(error), Some(expected)) if error.to_string().contains(expected.as_str()) => {
            return Ok(format!("failed as expected ({error})"));
        }
        (Err(error), _) => return Err(error.into()),
        (Ok(_), Some(expected)) => bail!("expected generation to fail with `{expected}`"),
        (Ok(bridge), None) => bridge,
    };

    let names: Vec<String> = bridge.types().names().into_iter().map(str::to_string).collect();
    if let Some(expected) = &expectation.types {
        if &names != expected {
            bail!("registered types {names:?}, expected {expected:?}");
        }
    }

    // emission must not depend on anything but the schema
    let again = BridgeAssembler::new(config).assemble(&contract)?;
    if bridge.emit() != again.emit() {
        bail!("emission differs between two passes");
    }

    // every tag-only activity variant round-trips through the bridge
    let mut checked = 0usize;
    if let Ok(activity) = bridge.activity() {
        let activity_name = bridge.activity_descriptor().canonical_name().unwrap_or_default();
        for (variant, accessor) in &activity.accessors().variants {
            if accessor.label() != "tag-only" {
                continue;
            }
            let encoded = activity.tag_only(variant)?;
            let decoded = bridge.decode(activity_name, &encoded)?;
            if decoded.get(variant.as_str()).is_none() {
                bail!("`{variant}` decoded as {decoded}");
            }
            checked += 1;
        }
    }

    Ok(format!("{} type(s), {checked} tag-only round trip(s)", names.len()))
}
