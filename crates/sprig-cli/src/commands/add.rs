//! `sprig add` command implementation.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use sprig_core::pkg::{manifest, PackageSpec, PkgError};
use sprig_core::Config;
use tracing::info;

use super::ErrorInfo;

/// Add result for JSON output (locked format: `{ ok, added }`).
#[derive(Serialize)]
struct AddJsonResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    added: Option<AddedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

#[derive(Serialize)]
struct AddedEntry {
    name: String,
    range: String,
}

/// Run the add command.
pub fn run(spec: &str, config: &Config, json: bool) -> Result<()> {
    match add(spec, config) {
        Ok(parsed) => {
            info!(name = %parsed.name, range = %parsed.range, "recorded dependency");
            if json {
                let result = AddJsonResult {
                    ok: true,
                    added: Some(AddedEntry {
                        name: parsed.name,
                        range: parsed.range,
                    }),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                println!("Added {}@{} to package.json", parsed.name, parsed.range);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let result = AddJsonResult {
                    ok: false,
                    added: None,
                    error: Some(ErrorInfo::from(&e)),
                };
                if let Ok(body) = serde_json::to_string_pretty(&result) {
                    println!("{body}");
                }
                std::process::exit(1);
            }
            Err(e).into_diagnostic()
        }
    }
}

fn add(spec: &str, config: &Config) -> Result<PackageSpec, PkgError> {
    let parsed = PackageSpec::parse(spec)?;
    manifest::add_dependency(&config.manifest_path(), &parsed.name, &parsed.range)?;
    Ok(parsed)
}
