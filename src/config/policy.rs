use crate::error::{Error, Result};
use crate::sanitizer::policy::{
    Policy, DEFAULT_ALLOWED_ATTRIBUTES, DEFAULT_ALLOWED_TAGS, DEFAULT_FORBIDDEN_ATTRIBUTES,
    DEFAULT_FORBIDDEN_TAGS, DEFAULT_MAX_DEPTH, DEFAULT_URL_SCHEMES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Upper bound on entries per name list; a policy file is configuration,
/// not a dumping ground.
const MAX_NAMES: usize = 1024;

/// Upper bound on the configurable nesting depth.
const MAX_DEPTH_LIMIT: usize = 4096;

/// On-disk policy file. Lists hold names as spelled by the author; they are
/// lowercased when compiled into a runtime [`Policy`]. Omitting
/// `url_schemes` keeps the default scheme allow-list; an explicit `null`
/// disables scheme filtering entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub version: u32,
    #[serde(default)]
    pub allowed_tags: Vec<String>,
    #[serde(default)]
    pub allowed_attributes: Vec<String>,
    #[serde(default)]
    pub forbidden_tags: Vec<String>,
    #[serde(default)]
    pub forbidden_attributes: Vec<String>,
    #[serde(default)]
    pub allow_data_attributes: bool,
    #[serde(default = "default_url_schemes")]
    pub url_schemes: Option<Vec<String>>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_url_schemes() -> Option<Vec<String>> {
    Some(DEFAULT_URL_SCHEMES.iter().map(|s| s.to_string()).collect())
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            version: 1,
            allowed_tags: to_strings(DEFAULT_ALLOWED_TAGS),
            allowed_attributes: to_strings(DEFAULT_ALLOWED_ATTRIBUTES),
            forbidden_tags: to_strings(DEFAULT_FORBIDDEN_TAGS),
            forbidden_attributes: to_strings(DEFAULT_FORBIDDEN_ATTRIBUTES),
            allow_data_attributes: false,
            url_schemes: default_url_schemes(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl PolicyConfig {
    /// Load a policy from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read policy from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: PolicyConfig = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse policy from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the policy file
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported policy version: {}. Expected version 1",
                self.version
            )));
        }

        for (field, names) in [
            ("allowed_tags", &self.allowed_tags),
            ("allowed_attributes", &self.allowed_attributes),
            ("forbidden_tags", &self.forbidden_tags),
            ("forbidden_attributes", &self.forbidden_attributes),
        ] {
            if names.len() > MAX_NAMES {
                return Err(Error::Config(format!(
                    "Too many entries in {}: {} > {}",
                    field,
                    names.len(),
                    MAX_NAMES
                )));
            }
            for name in names {
                if !is_valid_name(name) {
                    return Err(Error::Config(format!(
                        "Invalid name '{name}' in {field}"
                    )));
                }
            }
        }

        if let Some(schemes) = &self.url_schemes {
            for scheme in schemes {
                if !is_valid_scheme(scheme) {
                    return Err(Error::Config(format!(
                        "Invalid URL scheme '{scheme}' in url_schemes"
                    )));
                }
            }
        }

        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be non-zero".to_string()));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(Error::Config(format!(
                "max_depth too large: {} > {}",
                self.max_depth, MAX_DEPTH_LIMIT
            )));
        }

        // Overlap is resolved at runtime (forbidden wins), but it usually
        // means the author expected something else
        for name in overlap(&self.allowed_tags, &self.forbidden_tags) {
            warn!(
                "Policy lists '{}' in both allowed and forbidden tags; forbidden wins",
                name
            );
        }
        for name in overlap(&self.allowed_attributes, &self.forbidden_attributes) {
            warn!(
                "Policy lists '{}' in both allowed and forbidden attributes; forbidden wins",
                name
            );
        }

        Ok(())
    }

    /// Compile into the runtime policy used by the sanitizer
    pub fn compile(&self) -> Policy {
        Policy {
            allowed_tags: lower_set(&self.allowed_tags),
            allowed_attributes: lower_set(&self.allowed_attributes),
            forbidden_tags: lower_set(&self.forbidden_tags),
            forbidden_attributes: lower_set(&self.forbidden_attributes),
            allow_data_attributes: self.allow_data_attributes,
            url_schemes: self.url_schemes.as_ref().map(|s| lower_set(s)),
            max_depth: self.max_depth,
        }
    }

    /// Render a runtime policy back to the file representation, with lists
    /// sorted for stable output
    pub fn from_policy(policy: &Policy) -> Self {
        PolicyConfig {
            version: 1,
            allowed_tags: sorted(&policy.allowed_tags),
            allowed_attributes: sorted(&policy.allowed_attributes),
            forbidden_tags: sorted(&policy.forbidden_tags),
            forbidden_attributes: sorted(&policy.forbidden_attributes),
            allow_data_attributes: policy.allow_data_attributes,
            url_schemes: policy.url_schemes.as_ref().map(|s| sorted(s)),
            max_depth: policy.max_depth,
        }
    }
}

fn lower_set(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| n.to_ascii_lowercase()).collect()
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

fn overlap(a: &[String], b: &[String]) -> Vec<String> {
    let b_lower: HashSet<String> = b.iter().map(|n| n.to_ascii_lowercase()).collect();
    let mut seen = HashSet::new();
    a.iter()
        .map(|n| n.to_ascii_lowercase())
        .filter(|n| b_lower.contains(n) && seen.insert(n.clone()))
        .collect()
}

/// Tag and attribute names: a letter followed by letters, digits, or
/// `: . _ -` (covers HTML, SVG, and namespaced names)
fn is_valid_name(name: &str) -> bool {
    regex::Regex::new(r"^[A-Za-z][A-Za-z0-9:._-]*$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

fn is_valid_scheme(scheme: &str) -> bool {
    regex::Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*$")
        .map(|re| re.is_match(scheme))
        .unwrap_or(false)
}
