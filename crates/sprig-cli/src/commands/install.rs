//! `sprig install` command implementation.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use sprig_core::pkg::{run_install, InstallReport};
use sprig_core::Config;
use tracing::info;

use super::ErrorInfo;

/// Install result for JSON output (locked format: `{ ok, install }`).
#[derive(Serialize)]
struct InstallJsonResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    install: Option<InstallReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

/// Run the install command.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;

    match runtime.block_on(run_install(config)) {
        Ok(report) => {
            info!(
                packages = report.packages,
                downloaded = report.downloaded,
                reused_cache = report.reused_cache,
                "install complete"
            );
            if json {
                let result = InstallJsonResult {
                    ok: true,
                    install: Some(report),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                print_summary(&report);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let result = InstallJsonResult {
                    ok: false,
                    install: None,
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

fn print_summary(report: &InstallReport) {
    let source = if report.from_lock {
        "from lock file"
    } else {
        "resolved"
    };
    println!(
        "Installed {} package{} {source} ({} downloaded, {} from cache)",
        report.packages,
        if report.packages == 1 { "" } else { "s" },
        report.downloaded,
        report.reused_cache
    );
    for entry in &report.removed {
        println!("Removed {entry}");
    }
}
