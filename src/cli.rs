use crate::config::ImportOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Command-line flags. Every flag takes a value; root flags may repeat and
/// accumulate, scalar flags follow latest-wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    config_path: Option<PathBuf>,
    map: Option<PathBuf>,
    asset_roots: Vec<PathBuf>,
    texture_roots: Vec<PathBuf>,
    material_roots: Vec<PathBuf>,
    dedup_precision: Option<u32>,
    dedup: Option<bool>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags start with '--' and take a value.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config_path = Some(PathBuf::from(value)),
                "map" => overrides.map = Some(PathBuf::from(value)),
                "assets" => overrides.asset_roots.push(PathBuf::from(value)),
                "textures" => overrides.texture_roots.push(PathBuf::from(value)),
                "materials" => overrides.material_roots.push(PathBuf::from(value)),
                "dedup-precision" => {
                    overrides.dedup_precision = Some(
                        value
                            .parse::<u32>()
                            .with_context(|| format!("Invalid dedup precision '{value}'"))?,
                    );
                }
                "dedup" => overrides.dedup = Some(parse_bool_flag("dedup", &value)?),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --map, --assets, \
                     --textures, --materials, --dedup-precision, --dedup."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub fn into_import_overrides(self) -> ImportOverrides {
        ImportOverrides {
            container_path: self.map,
            asset_roots: self.asset_roots,
            texture_roots: self.texture_roots,
            material_roots: self.material_roots,
            dedup_precision: self.dedup_precision,
            dedup: self.dedup,
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
