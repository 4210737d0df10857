//! Version range parsing and matching.
//!
//! Wraps the `semver` crate with the npm-specific range grammar:
//! `||` unions, hyphen ranges, x-ranges, space-separated comparators, and
//! bare exact versions (which npm treats as `=x.y.z`, not `^x.y.z`).

use super::error::PkgError;
use semver::{Version, VersionReq};

/// Parse a range into its `||` alternatives.
///
/// Invalid alternatives are skipped as long as at least one parses.
///
/// # Errors
/// Returns an error if no alternative is a valid range.
pub fn parse_alternatives(range: &str) -> Result<Vec<VersionReq>, PkgError> {
    let mut reqs = Vec::new();

    for alt in range.split("||").map(str::trim) {
        if alt.is_empty() {
            continue;
        }
        if let Ok(req) = parse_single(alt) {
            reqs.push(req);
        }
    }

    if reqs.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid version range '{range}': no valid alternatives"
        )));
    }

    Ok(reqs)
}

/// Check whether an exact version satisfies a range.
///
/// Unparseable ranges (including dist-tags like `latest`) match nothing.
#[must_use]
pub fn range_matches(range: &str, version: &Version) -> bool {
    match parse_alternatives(range) {
        Ok(reqs) => reqs.iter().any(|req| req.matches(version)),
        Err(_) => false,
    }
}

/// Select the greatest version from `versions` satisfying `range`.
///
/// Versions that do not parse as semver are ignored. Prereleases only match
/// when a comparator names a prerelease, per semver's matching rules.
///
/// # Errors
/// Returns an error if the range itself is invalid.
pub fn select_highest(versions: &[&str], range: &str) -> Result<Option<String>, PkgError> {
    // Exact version published under exactly that key wins outright,
    // including build metadata the comparator grammar would reject.
    if Version::parse(range).is_ok() && versions.contains(&range) {
        return Ok(Some(range.to_string()));
    }

    let reqs = parse_alternatives(range)?;

    let mut parsed: Vec<Version> = versions
        .iter()
        .filter_map(|v| Version::parse(v).ok())
        .collect();
    parsed.sort_by(|a, b| b.cmp(a));

    Ok(parsed
        .into_iter()
        .find(|v| reqs.iter().any(|req| req.matches(v)))
        .map(|v| v.to_string()))
}

/// Parse a single range alternative, handling npm-specific syntax.
fn parse_single(range: &str) -> Result<VersionReq, PkgError> {
    let range = range.trim();

    // Hyphen ranges: "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = split_hyphen_range(range) {
        let converted = format!(">={start}, <={end}");
        return VersionReq::parse(&converted)
            .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{range}': {e}")));
    }

    // X-ranges: "1.x" -> ">=1.0.0, <2.0.0"
    if range.contains('x') || range.contains('X') || range == "*" {
        let converted = convert_x_range(range);
        return VersionReq::parse(&converted)
            .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{range}': {e}")));
    }

    // A bare full version means exact under npm; rust semver would read it
    // as a caret requirement.
    if Version::parse(range).is_ok() {
        return VersionReq::parse(&format!("={range}"))
            .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{range}': {e}")));
    }

    // npm allows spaces between comparators to mean AND; rust semver wants commas.
    let converted = join_space_separated_comparators(range);

    VersionReq::parse(&converted)
        .map_err(|e| PkgError::spec_invalid(format!("Invalid version range '{range}': {e}")))
}

/// Split a hyphen range like "1.0.0 - 2.0.0" (space-hyphen-space).
fn split_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

/// Convert space-separated comparators to comma-separated.
///
/// ">= 2.1.2 < 3.0.0" means ">=2.1.2 AND <3.0.0"; an operator token without
/// a version number is glued onto the following token.
fn join_space_separated_comparators(range: &str) -> String {
    let mut result = String::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        if token.chars().any(|c| c.is_ascii_digit()) {
            if !result.is_empty() && pending_op.is_empty() {
                result.push_str(", ");
            }
            result.push_str(&pending_op);
            result.push_str(token);
            pending_op.clear();
        } else {
            if !result.is_empty() {
                result.push_str(", ");
            }
            pending_op.push_str(token);
        }
    }
    result.push_str(&pending_op);

    if result.is_empty() {
        range.to_string()
    } else {
        result
    }
}

/// Convert an x-range to a comparator pair.
fn convert_x_range(range: &str) -> String {
    let range = range.trim();

    if range == "*" || range == "x" || range == "X" {
        return ">=0.0.0".to_string();
    }

    let parts: Vec<&str> = range.split('.').collect();

    match parts.as_slice() {
        [major, "x" | "X" | "*"] => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Fallback: just replace x with 0
    range.replace(['x', 'X'], "0")
}
