//! CLI: contract schema → (types | bridge report | encode | decode)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use contract_bridge::registry::HelperClassHook;
use contract_bridge::{Bridge, BridgeAssembler, CollisionPolicy, ContractSchema, GeneratorConfig, LedgerData};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate data bridges (type views, codecs, variant accessors) from contract type schemas
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit type declarations and accessor tables for each contract
    Types(TypesOut),
    /// assemble each contract and report registered types and accessors
    Bridge(BridgeReport),
    /// encode a JSON value through one contract's bridge
    Encode(EncodeArgs),
    /// decode ledger data (as JSON) through one contract's bridge
    Decode(DecodeArgs),
}

#[derive(Args, Debug, Clone)]
struct GeneratorSettings {
    /// JSON generator configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// field name marking a uniqueness seed in activity variants
    #[arg(long)]
    seed_field: Option<String>,

    #[arg(long, value_enum)]
    collision_policy: Option<CollisionPolicy>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// attach `<Name>Helper` helper classes to structs and enums
    #[arg(long, default_value_t = false)]
    helper_classes: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more contract schema files. May be literal paths or quoted glob patterns.
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generator: GeneratorSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct BridgeReport {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    generator: GeneratorSettings,
}

#[derive(clap::Parser, Debug)]
struct EncodeArgs {
    /// contract schema file
    #[arg(long, short)]
    input: PathBuf,

    #[command(flatten)]
    generator: GeneratorSettings,

    /// registered type to encode; `--activity` and `--datum` are shortcuts
    #[arg(long = "type", conflicts_with_all = ["activity", "datum"])]
    type_name: Option<String>,

    /// activity variant to construct
    #[arg(long)]
    activity: Option<String>,

    #[arg(long, default_value_t = false)]
    datum: bool,

    /// the value (or the variant's fields) as JSON
    #[arg(long, default_value = "null")]
    value: String,
}

#[derive(clap::Parser, Debug)]
struct DecodeArgs {
    /// contract schema file
    #[arg(long, short)]
    input: PathBuf,

    #[command(flatten)]
    generator: GeneratorSettings,

    /// registered type to decode as
    #[arg(long = "type")]
    type_name: String,

    /// ledger data as JSON, e.g. {"constr":{"tag":0,"fields":[]}}
    #[arg(long)]
    data: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl GeneratorSettings {
    fn config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match self.config.as_ref() {
            Some(path) => GeneratorConfig::load(path)
                .with_context(|| format!("failed to load generator config {}", path.display()))?,
            None => GeneratorConfig::default(),
        };
        if let Some(seed_field) = self.seed_field.as_ref() {
            config.seed_field_name = seed_field.clone();
        }
        if let Some(policy) = self.collision_policy {
            config.collision_policy = policy;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        Ok(config)
    }

    fn assembler(&self, config: GeneratorConfig) -> BridgeAssembler {
        let assembler = BridgeAssembler::new(config);
        if self.helper_classes {
            return assembler.with_hook(HelperClassHook);
        }
        assembler
    }

    /// Load one contract, assemble it, and hand the bridge to `apply`.
    fn with_bridge<T>(
        &self,
        config: &GeneratorConfig,
        path: &Path,
        apply: impl FnOnce(&Bridge<'_>) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let contract = ContractSchema::from_path(path)
            .with_context(|| format!("failed to load contract schema {}", path.display()))?;
        let bridge = self
            .assembler(config.clone())
            .assemble(&contract)
            .with_context(|| format!("failed to generate bridge for {}", path.display()))?;
        apply(&bridge)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Types(target) => {
                let config = target.generator.config()?;
                let source_paths = resolve_file_path_patterns(&target.input_settings.input)?;
                // one independent pass per file; output keeps input order
                let rendered = source_paths
                    .par_iter()
                    .map(|path| {
                        target.generator.with_bridge(&config, path, |bridge| {
                            Ok(format!("// {}\n{}", path.display(), bridge.emit()))
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                write_output(target.out.as_deref(), &rendered.join("\n"))
            }
            Command::Bridge(target) => {
                let config = target.generator.config()?;
                let source_paths = resolve_file_path_patterns(&target.input_settings.input)?;
                let reports = source_paths
                    .par_iter()
                    .map(|path| {
                        let outcome = target.generator.with_bridge(&config, path, |bridge| Ok(summarize(bridge)));
                        (path, outcome)
                    })
                    .collect::<Vec<_>>();
                let mut failures = 0usize;
                for (path, outcome) in reports {
                    match outcome {
                        Ok(summary) => println!("{} {}: {summary}", "ok".green().bold(), path.display()),
                        Err(error) => {
                            failures += 1;
                            println!("{} {}: {error:#}", "failed".red().bold(), path.display());
                        }
                    }
                }
                if failures > 0 {
                    bail!("{failures} contract(s) failed to generate");
                }
                Ok(())
            }
            Command::Encode(target) => {
                let config = target.generator.config()?;
                let value: serde_json::Value = serde_json::from_str(&target.value).context("`--value` is not JSON")?;
                let encoded = target.generator.with_bridge(&config, &target.input, |bridge| {
                    let encoded = match (&target.type_name, &target.activity, target.datum) {
                        (Some(name), _, _) => {
                            let helper = bridge
                                .types()
                                .get(name)
                                .with_context(|| format!("no registered type named `{name}`"))?;
                            helper.encode(&value)?
                        }
                        (None, Some(variant), _) => bridge.encode_activity(variant, &value)?,
                        (None, None, true) => bridge
                            .encode_datum(&value)
                            .context("contract has no datum type")??,
                        (None, None, false) => bail!("one of `--type`, `--activity` or `--datum` is required"),
                    };
                    Ok(encoded)
                })?;
                println!("{}", serde_json::to_string_pretty(&encoded)?);
                Ok(())
            }
            Command::Decode(target) => {
                let config = target.generator.config()?;
                let data: LedgerData =
                    contract_bridge::path_de::from_str_with_path(&target.data).context("`--data` is not ledger data")?;
                let decoded = target
                    .generator
                    .with_bridge(&config, &target.input, |bridge| Ok(bridge.decode(&target.type_name, &data)?))?;
                println!("{}", serde_json::to_string_pretty(&decoded)?);
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn summarize(bridge: &Bridge<'_>) -> String {
    let names = bridge.types().names();
    let variants = bridge.activity_accessors().map(|a| a.variants.len()).unwrap_or(0);
    format!(
        "{} type(s) [{}], {variants} activity accessor(s), datum {}",
        names.len(),
        names.join(", "),
        if bridge.datum().is_some() { "present" } else { "absent" }
    )
}

fn write_output(out: Option<&Path>, src: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        print!("{src}");
        return Ok(());
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matched nothing is an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
