//! Init command implementation
//!
//! Writes a commented default `triad.toml` and a `.env.example` listing the
//! credential variables.

use super::output::Output;
use crate::utils::DEFAULT_CONFIG_FILE;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// triad.toml already exists and --force was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Triad configuration");

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    let config_path = base_path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !config.force {
        output.warning(&format!("{} already exists!", DEFAULT_CONFIG_FILE));
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_file(&config_path, &generate_triad_toml(), config.force) {
        output.error(&format!("Failed to create {}: {}", DEFAULT_CONFIG_FILE, e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", DEFAULT_CONFIG_FILE);

    let env_example_path = base_path.join(".env.example");
    if env_example_path.exists() && !config.force {
        output.skipped(".env.example", "already exists");
    } else if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    } else {
        output.created("env", ".env.example");
    }

    output.hint("Start Ollama and pull a model, then run a research topic:");
    output.command("ollama pull llama3.2");
    output.command("triad run --topic \"Solar microgrids\"");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(()); // Skip existing files unless force is true
    }
    fs::write(path, content)
}

/// Default configuration with every field spelled out.
pub fn generate_triad_toml() -> String {
    r#"# Triad configuration
# ====================
# Every field is optional; the values below are the defaults.

[research]
topic = "The future of AI in renewable energy"
# "remote" uses Tavily when TAVILY_API_KEY is set and stand-in results otherwise.
# "local" always uses the stand-in local document set.
search_mode = "remote"

# Model binding per agent role.
# provider = "local" (Ollama) or "hosted" (Gemini, needs GEMINI_API_KEY)
[agents.planner]
provider = "local"
model = "llama3.2"

[agents.researcher]
provider = "local"
model = "llama3.2"

[agents.writer]
provider = "local"
model = "llama3.2"

[providers.local]
base_url = "http://localhost:11434"

[providers.hosted]
api_base = "https://generativelanguage.googleapis.com/v1beta"
api_key_env = "GEMINI_API_KEY"

[search]
api_base = "https://api.tavily.com"
api_key_env = "TAVILY_API_KEY"
max_results = 5
search_depth = "advanced"

# Delays between stage announcements, in milliseconds. 0 disables a delay.
[pacing]
stage_delay_ms = 1000
researcher_stagger_ms = 500
remote_standin_delay_ms = 1500
local_standin_delay_ms = 2500
# Optional limit for every backend call, in seconds.
# call_timeout_secs = 120

[logging]
level = "info"
# "pretty" or "json"; logs are written to stderr.
format = "pretty"
"#
    .to_string()
}

fn generate_env_example() -> String {
    r#"# Triad Environment Variables
# ===========================
# Copy this file to .env and fill in the values you need.

# Optional: Gemini API key, required only for agents bound to provider = "hosted"
# GEMINI_API_KEY=

# Optional: Tavily API key for live web search (search_mode = "remote")
# TAVILY_API_KEY=

# Optional: Logging override (trace, debug, info, warn, error)
# RUST_LOG=info,triad=debug
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TriadConfig;
    use tempfile::TempDir;

    #[test]
    fn test_generated_toml_parses_to_defaults() {
        let parsed = TriadConfig::from_toml_str(&generate_triad_toml()).unwrap();
        assert_eq!(parsed, TriadConfig::default());
    }

    #[test]
    fn test_generate_env_example() {
        let content = generate_env_example();
        assert!(content.contains("GEMINI_API_KEY"));
        assert!(content.contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_init_writes_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = run(
            InitConfig {
                path: temp_dir.path().to_path_buf(),
                force: false,
            },
            &Output::no_color(),
        );
        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join(DEFAULT_CONFIG_FILE).exists());
        assert!(temp_dir.path().join(".env.example").exists());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&config_path, "# mine").unwrap();

        let result = run(
            InitConfig {
                path: temp_dir.path().to_path_buf(),
                force: false,
            },
            &Output::no_color(),
        );
        assert!(matches!(result, InitResult::AlreadyExists));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine");

        let result = run(
            InitConfig {
                path: temp_dir.path().to_path_buf(),
                force: true,
            },
            &Output::no_color(),
        );
        assert!(matches!(result, InitResult::Success));
        assert!(fs::read_to_string(&config_path).unwrap().contains("[research]"));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("existing.txt");
        fs::write(&file_path, "original").unwrap();

        write_file(&file_path, "new content", false).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "original");

        write_file(&file_path, "new content", true).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }
}
