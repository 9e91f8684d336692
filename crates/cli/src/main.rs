//! SAML2Map command-line management tool.
//!
//! Provides subcommands for generating and validating configuration files,
//! inspecting main-attribute resolution, and dry-running attribute mapping
//! and authentication against user records read from JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use saml2map_core::config::AppConfig;
use saml2map_core::mapping::{AssertedAttributes, MainAttributeResolver};
use saml2map_core::store::{InMemoryUserStore, UserStore};
use saml2map_core::user::User;
use saml2map_core::Saml2Backend;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// SAML2Map command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "saml2map",
    version,
    about = "Map SAML asserted attributes onto local user records"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./saml2map.toml")]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./saml2map.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Show which field identifies users and how it is matched.
    MainAttribute,

    /// Apply the attribute mapping to a user and print the result.
    Apply {
        /// JSON file with asserted attributes, e.g. `{"uid": ["john"]}`.
        #[arg(short, long)]
        attributes: PathBuf,

        /// JSON file with the existing user. A blank user is used if omitted.
        #[arg(short, long)]
        user: Option<PathBuf>,
    },

    /// Run the full authentication flow against a set of users.
    Authenticate {
        /// JSON file with asserted attributes.
        #[arg(short, long)]
        attributes: PathBuf,

        /// JSON file with an array of existing users.
        #[arg(short, long)]
        users: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output)
        }
        command => {
            let config = load_config(&cli.config)?;
            init_tracing(cli.log_level.as_deref().unwrap_or(&config.logging.level));

            match command {
                Commands::Validate => cmd_validate(&cli.config, &config),
                Commands::MainAttribute => cmd_main_attribute(&config),
                Commands::Apply { attributes, user } => {
                    cmd_apply(&config, &attributes, user.as_deref())
                }
                Commands::Authenticate { attributes, users } => {
                    cmd_authenticate(&config, &attributes, users.as_deref())
                }
                Commands::Init { .. } => unreachable!(),
            }
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    let mut config =
        AppConfig::load_from_file(path).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment overrides")?;
    Ok(config)
}

fn validated_backend(config: &AppConfig) -> Result<Saml2Backend> {
    config
        .validate()
        .context("configuration validation failed")?;
    Ok(Saml2Backend::from_config(config))
}

fn read_users(path: &Path, backend: &Saml2Backend) -> Result<Vec<User>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read users from {}", path.display()))?;
    let mut users: Vec<User> =
        serde_json::from_str(&contents).context("failed to parse users JSON")?;
    for user in &mut users {
        user.attach_schema(Arc::clone(backend.schema()));
    }
    debug!(count = users.len(), "loaded users");
    Ok(users)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"# SAML2Map Configuration
# See documentation for all available options.

[backend]
# main_attribute = "email"
# main_attribute_lookup = "__iexact"
create_unknown_user = true
legacy_profiles = false

[logging]
level = "info"

[user_model]
label = "auth.User"
username_field = "username"
# custom_fields = ["age"]
# profile_fields = ["age"]

[attribute_mapping]
uid = ["username"]
mail = ["email"]
cn = ["first_name"]
sn = ["last_name"]
"#;

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit [attribute_mapping] to match what your identity provider releases");
    println!("  2. Describe your user model under [user_model]");
    println!(
        "  3. Validate with: saml2map validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();
    println!("  [OK] TOML structure is valid");
    println!("  [OK] Environment overrides processed");

    match config.validate() {
        Ok(()) => {
            println!("  [OK] All values are valid");
        }
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let schema = config.user_model.to_schema();
    let resolver = MainAttributeResolver::new(&config.backend, &schema);

    println!();
    println!("Configuration summary:");
    println!("  User model     : {}", schema.label);
    println!("  Main attribute : {}", resolver.get_main_attribute());
    println!("  Lookup         : {}", resolver.lookup());
    println!(
        "  Create unknown : {}",
        if config.backend.create_unknown_user { "yes" } else { "no" }
    );
    println!(
        "  Legacy profiles: {}",
        if config.backend.legacy_profiles { "yes" } else { "no" }
    );
    println!("  Mappings       : {}", config.attribute_mapping.len());
    for (attribute, targets) in config.attribute_mapping.iter() {
        println!("    {:<20} -> {}", attribute, targets.join(", "));
    }
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn cmd_main_attribute(config: &AppConfig) -> Result<()> {
    let backend = validated_backend(config)?;
    let main = backend.get_main_attribute();
    let lookup = backend.get_main_attribute_lookup();

    println!("Main attribute : {}", main);
    println!(
        "Lookup suffix  : {}",
        if lookup.is_empty() { "(none)" } else { lookup.as_str() }
    );
    println!("Expression     : {}{}", main, lookup);
    match backend.mapping().attribute_for_target(&main) {
        Some(attribute) => println!("Asserted as    : {}", attribute),
        None => println!("Asserted as    : (not mapped)"),
    }

    Ok(())
}

fn cmd_apply(config: &AppConfig, attributes_path: &Path, user_path: Option<&Path>) -> Result<()> {
    let backend = validated_backend(config)?;
    let attributes =
        AssertedAttributes::load_json(attributes_path).context("failed to load attributes")?;

    let mut user = match user_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read user from {}", path.display()))?;
            let mut user: User =
                serde_json::from_str(&contents).context("failed to parse user JSON")?;
            user.attach_schema(Arc::clone(backend.schema()));
            user
        }
        None => User::with_schema(Arc::clone(backend.schema()), String::new()),
    };

    let changed = backend.update_user(&mut user, &attributes, backend.mapping());

    println!(
        "{}",
        serde_json::to_string_pretty(&user).context("failed to serialize user")?
    );
    eprintln!("changed: {}", changed);

    Ok(())
}

fn cmd_authenticate(
    config: &AppConfig,
    attributes_path: &Path,
    users_path: Option<&Path>,
) -> Result<()> {
    let backend = validated_backend(config)?;
    let attributes =
        AssertedAttributes::load_json(attributes_path).context("failed to load attributes")?;

    let store = InMemoryUserStore::new(Arc::clone(backend.schema()));
    if let Some(path) = users_path {
        let main_attribute = backend.get_main_attribute();
        for user in read_users(path, &backend)? {
            store
                .create(user, &main_attribute)
                .context("failed to seed user store")?;
        }
    }

    match backend
        .authenticate(&store, &attributes)
        .context("authentication failed")?
    {
        Some(user) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&user).context("failed to serialize user")?
            );
        }
        None => {
            println!("No user authenticated.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config: AppConfig = toml_config(DEFAULT_CONFIG);
        config.validate().unwrap();
        assert_eq!(config.attribute_mapping.len(), 4);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saml2map.toml");
        cmd_init(&path).unwrap();
        assert!(cmd_init(&path).is_err());
    }

    #[test]
    fn test_cli_parses_apply() {
        let cli = Cli::parse_from([
            "saml2map",
            "--config",
            "/tmp/c.toml",
            "apply",
            "--attributes",
            "a.json",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/c.toml"));
        assert!(matches!(cli.command, Commands::Apply { user: None, .. }));
    }

    fn toml_config(contents: &str) -> AppConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        AppConfig::load_from_file(&path).unwrap()
    }
}
