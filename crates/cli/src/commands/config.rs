//! Configuration commands

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use biofile_finder::config::Config;

use super::print_json;

/// Show current effective configuration
pub fn cmd_config_show(cwd: &Path, config: &Config, source: Option<&Path>, json: bool) -> Result<()> {
  if json {
    return print_json(config);
  }

  println!("Effective configuration for: {:?}", cwd);
  println!();
  for line in describe_sources(cwd, source) {
    println!("{}", line);
  }
  if let Ok(url) = std::env::var(biofile_finder::config::BASE_URL_ENV) {
    println!("Service root overridden by {}: {}", biofile_finder::config::BASE_URL_ENV, url);
  }
  println!();

  let toml_str = toml::to_string_pretty(config)?;
  println!("{}", toml_str);
  Ok(())
}

/// Which file the config came from, plus any existing file that was skipped as invalid.
fn describe_sources(cwd: &Path, source: Option<&Path>) -> Vec<String> {
  let candidates = std::iter::once(("project", Config::project_config_path(cwd)))
    .chain(Config::user_config_path().map(|p| ("user", p)));

  let mut lines = Vec::new();
  for (kind, path) in candidates {
    if source == Some(path.as_path()) {
      lines.push(format!("Using {} config: {:?}", kind, path));
      return lines;
    }
    if path.exists() {
      lines.push(format!("Ignored invalid {} config: {:?}", kind, path));
    }
  }
  lines.push("Using default configuration (no valid config file found)".to_string());
  lines
}

/// Write the commented config template to the project or user location
pub fn cmd_config_init(cwd: &Path, user: bool, force: bool) -> Result<()> {
  let path = init_target(cwd, user)?;
  write_template(&path, force)?;

  println!("Created config: {:?}", path);
  println!("Edit the file to customize settings.");
  Ok(())
}

fn init_target(cwd: &Path, user: bool) -> Result<PathBuf> {
  if user {
    Config::user_config_path().context("Could not determine user config path")
  } else {
    Ok(Config::project_config_path(cwd))
  }
}

fn write_template(path: &Path, force: bool) -> Result<()> {
  if path.exists() && !force {
    bail!("Config file already exists: {:?} (use --force to overwrite)", path);
  }
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, Config::generate_template()).with_context(|| format!("Failed to write {:?}", path))?;
  Ok(())
}
