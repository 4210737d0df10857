//! Package spec and identifier parsing.
//!
//! Two closely related grammars live here:
//! - CLI specs like `react`, `react@^18.0.0`, `@types/node@20.0.0`
//! - package identifiers like `react@18.2.0`, the keys of the dependency
//!   graph and the lock file
//!
//! Both split on the *last* `@`, which keeps scoped names (`@scope/name`)
//! unambiguous: the leading `@` is at index 0 and never a delimiter.

use super::error::PkgError;

/// Range recorded when a spec carries no explicit version.
pub const DEFAULT_RANGE: &str = "latest";

/// Join a package name and exact version into a package identifier.
#[must_use]
pub fn package_ident(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// Split a package identifier into `(name, version)`.
///
/// The delimiter is the last `@` at index > 0, so `@scope/x@1.2.3` splits
/// into `("@scope/x", "1.2.3")`.
///
/// # Errors
/// Returns an error if the identifier has no version part.
pub fn split_ident(ident: &str) -> Result<(&str, &str), PkgError> {
    match ident.rfind('@') {
        Some(pos) if pos > 0 => {
            let (name, version) = (&ident[..pos], &ident[pos + 1..]);
            if version.is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid package identifier: empty version in '{ident}'"
                )));
            }
            Ok((name, version))
        }
        _ => Err(PkgError::spec_invalid(format!(
            "Invalid package identifier: missing version in '{ident}'"
        ))),
    }
}

/// A parsed package specification from the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Version range or tag; `"latest"` when the spec carried none.
    pub range: String,
}

impl PackageSpec {
    /// Parse a package specification string.
    ///
    /// # Errors
    /// Returns an error if the spec is empty, malformed, or the name
    /// contains invalid characters.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        let (name, range) = match input.rfind('@') {
            Some(pos) if pos > 0 => {
                let range = &input[pos + 1..];
                if range.is_empty() {
                    return Err(PkgError::spec_invalid(format!(
                        "Invalid package spec: empty version range in '{input}'"
                    )));
                }
                (&input[..pos], range)
            }
            _ => (input, DEFAULT_RANGE),
        };

        validate_name(name)?;

        Ok(Self {
            name: name.to_string(),
            range: range.to_string(),
        })
    }

    /// Check if this spec names a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@')
    }
}

/// Validate a package name (bare `foo` or scoped `@scope/name`).
fn validate_name(name: &str) -> Result<(), PkgError> {
    if let Some(rest) = name.strip_prefix('@') {
        let Some((scope, pkg)) = rest.split_once('/') else {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: missing '/' in '{name}'"
            )));
        };
        if scope.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty scope in '{name}'"
            )));
        }
        if pkg.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty name in '{name}'"
            )));
        }
        validate_token(scope)?;
        validate_token(pkg)
    } else {
        validate_token(name)
    }
}

fn validate_token(token: &str) -> Result<(), PkgError> {
    if token.is_empty() {
        return Err(PkgError::spec_invalid("Empty package name"));
    }

    for c in token.chars() {
        if !c.is_alphanumeric() && c != '-' && c != '_' && c != '.' {
            return Err(PkgError::spec_invalid(format!(
                "Invalid character '{c}' in package name '{token}'"
            )));
        }
    }

    Ok(())
}
