use crate::cli::OutputFormat;
use crate::config::policy::PolicyConfig;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::sanitizer::{default_policy, sanitize, Policy};
use crate::utils::escape::escape_text;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Sanitize a file or stdin against the effective policy
pub fn clean(
    settings: &Settings,
    file: Option<&Path>,
    policy_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let policy = load_policy(policy_path.or(settings.policy_path.as_deref()))?;
    let input = read_input(file, settings.limits.max_input_size)?;
    let cleaned = sanitize(&input, &policy);

    match output {
        Some(path) => {
            std::fs::write(path, &cleaned)?;
            println!(
                "✓ Sanitized {} bytes -> {}",
                input.len(),
                path.display()
            );
        }
        None => println!("{cleaned}"),
    }

    Ok(())
}

/// Escape input as plain text
pub fn escape(settings: &Settings, file: Option<&Path>) -> Result<()> {
    let input = read_input(file, settings.limits.max_input_size)?;
    println!("{}", escape_text(&input));
    Ok(())
}

/// Validate a policy file and print a summary
pub fn check_policy(path: &Path) -> Result<()> {
    let config = PolicyConfig::from_file(path)?;

    println!("✓ Policy is valid: {}", path.display());
    println!("  Allowed tags: {}", config.allowed_tags.len());
    println!("  Allowed attributes: {}", config.allowed_attributes.len());
    println!("  Forbidden tags: {}", config.forbidden_tags.len());
    println!(
        "  Forbidden attributes: {}",
        config.forbidden_attributes.len()
    );
    println!(
        "  Data attributes: {}",
        if config.allow_data_attributes {
            "allowed"
        } else {
            "stripped"
        }
    );
    match &config.url_schemes {
        Some(schemes) => println!("  URL schemes: {}", schemes.join(", ")),
        None => println!("  URL schemes: unrestricted"),
    }
    println!("  Max nesting depth: {}", config.max_depth);

    Ok(())
}

/// Print the effective policy in the requested format
pub fn show_policy(policy_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = match policy_path {
        Some(path) => PolicyConfig::from_file(path)?,
        None => PolicyConfig::default(),
    };

    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&config)
            .map_err(|e| Error::Internal(format!("Failed to render policy: {e}")))?,
        OutputFormat::Json => serde_json::to_string_pretty(&config)
            .map_err(|e| Error::Internal(format!("Failed to render policy: {e}")))?,
    };
    println!("{rendered}");

    Ok(())
}

fn load_policy(path: Option<&Path>) -> Result<Policy> {
    match path {
        Some(path) => {
            let config = PolicyConfig::from_file(path)?;
            info!("Loaded policy from {}", path.display());
            Ok(config.compile())
        }
        None => Ok(default_policy().clone()),
    }
}

fn read_input(file: Option<&Path>, max_size: usize) -> Result<String> {
    let content = match file {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Validation(format!(
                    "File not found: {}",
                    path.display()
                )));
            }
            std::fs::read_to_string(path)?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    if content.len() > max_size {
        return Err(Error::Validation(format!(
            "Input too large: {} bytes (limit {})",
            content.len(),
            max_size
        )));
    }

    Ok(content)
}
