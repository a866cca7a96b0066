use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use watchlog_config::{Config, CredentialStore, PathManager, TMDB_API_KEY_ENV};

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output).await,
        ConfigCommands::Init => init_config(output).await,
        ConfigCommands::Tmdb { api_key } => configure_tmdb(api_key, output).await,
    }
}

async fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Built-in defaults are in use. Run 'watchlog config init' to write them to disk.");
    }

    let config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    let mut credentials = CredentialStore::new(path_manager.credentials_file());
    credentials
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
    let api_key_source = if std::env::var(TMDB_API_KEY_ENV).map(|v| !v.trim().is_empty()).unwrap_or(false) {
        "environment"
    } else if credentials.get_tmdb_api_key().is_some() {
        "credentials file"
    } else {
        "not set"
    };
    let api_key = credentials.resolve_tmdb_api_key().unwrap_or_default();
    let api_key_display = if full { api_key.clone() } else { mask_string(&api_key) };

    output.data(&json!({
        "config_file": config_file.display().to_string(),
        "config": config,
        "tmdb_api_key": api_key_display,
        "tmdb_api_key_source": api_key_source,
    }));

    if !output.is_human() || output.is_quiet() {
        return Ok(());
    }

    println!("\n{}", "Configuration".bright_cyan().bold());
    println!();

    let mut info_table = Table::new();
    info_table.set_header(vec![
        Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    info_table.add_row(vec![Cell::new("Records"), Cell::new(path_manager.records_file().display().to_string())]);
    info_table.add_row(vec![
        Cell::new("Metadata Cache"),
        Cell::new(path_manager.metadata_cache_file(config.cache.compression).display().to_string()),
    ]);
    info_table.load_preset(comfy_table::presets::UTF8_FULL);
    info_table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}\n", info_table);

    let mut tmdb_table = section_table("TMDB");
    tmdb_table.add_row(vec![Cell::new("Base URL"), Cell::new(&config.tmdb.base_url)]);
    tmdb_table.add_row(vec![Cell::new("Language"), Cell::new(&config.tmdb.language)]);
    tmdb_table.add_row(vec![Cell::new("Timeout"), Cell::new(format!("{}s", config.tmdb.timeout_seconds))]);
    tmdb_table.add_row(vec![
        Cell::new("API Key"),
        Cell::new(format!("{} ({})", api_key_display, api_key_source)),
    ]);
    println!("{}\n", tmdb_table);

    let mut cache_table = section_table("Metadata Cache");
    cache_table.add_row(vec![Cell::new("Batch Size"), Cell::new(config.cache.batch_size)]);
    cache_table.add_row(vec![
        Cell::new("Compression"),
        Cell::new(if config.cache.compression { "✓".green().to_string() } else { "✗".red().to_string() }),
    ]);
    println!("{}\n", cache_table);

    let mut stats_table = section_table("Statistics");
    stats_table.add_row(vec![Cell::new("Genre Chart Size"), Cell::new(config.stats.genre_top_n)]);
    stats_table.add_row(vec![Cell::new("Country Chart Size"), Cell::new(config.stats.country_top_n)]);
    stats_table.add_row(vec![
        Cell::new("Home Country"),
        Cell::new(format!("{} ({})", config.stats.home_country_name, config.stats.home_country_code)),
    ]);
    println!("{}\n", stats_table);

    let mut rec_table = section_table("Recommendations");
    rec_table.add_row(vec![Cell::new("Limit"), Cell::new(config.recommendations.limit)]);
    rec_table.add_row(vec![Cell::new("Genre Sample"), Cell::new(config.recommendations.genre_sample_size)]);
    rec_table.add_row(vec![Cell::new("Top Genres"), Cell::new(config.recommendations.top_genres)]);
    rec_table.add_row(vec![
        Cell::new("Similar-Title Seeds"),
        Cell::new(format!(
            "{} of the {} most recent",
            config.recommendations.seed_count, config.recommendations.seed_pool_size
        )),
    ]);
    println!("{}\n", rec_table);

    Ok(())
}

async fn init_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    if config_file.exists() {
        output.info(format!("Configuration already exists at {}", config_file.display()));
        return Ok(());
    }

    Config::default()
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default configuration to {}", config_file.display()));
    Ok(())
}

async fn configure_tmdb(api_key_arg: Option<String>, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    print_section_header("TMDB API Key Setup", output);
    output.println("  1. Create an account at https://www.themoviedb.org");
    output.println("  2. Request an API key under Settings → API");
    output.println("");

    let api_key = match api_key_arg {
        Some(key) => key,
        None => rpassword::prompt_password("TMDB API key: ")
            .map_err(|e| eyre!("Failed to read API key: {}", e))?,
    };
    let api_key = api_key.trim().to_string();
    validate_api_key(&api_key).map_err(|e| eyre!("Validation error: {}", e))?;

    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    cred_store.set_tmdb_api_key(api_key.clone());
    cred_store
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;

    output.success(format!("TMDB API key saved ({})", mask_string(&api_key)));
    if std::env::var(TMDB_API_KEY_ENV).is_ok() {
        output.warn(format!("{} is set and takes precedence over the stored key", TMDB_API_KEY_ENV));
    }

    Ok(())
}

fn section_table(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(title).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold),
    ]);
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn validate_api_key(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("API key cannot be empty");
    }
    if !input.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("API key should only contain letters and digits");
    }
    Ok(())
}

fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.chars().count()).bright_cyan()));
}
