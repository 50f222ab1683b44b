/*
[INPUT]:  Interactive user input via CLI
[OUTPUT]: Generated YAML configuration file
[POS]:    CLI initialization layer
[UPDATE]: When WatchConfig schema changes
*/

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};
use std::path::PathBuf;

use examdesk_import_watch::config::{
    ApiConfig, AuthConfig, PollingConfig, StorageConfig, WatchConfig,
};

pub fn run_init(output: PathBuf) -> Result<()> {
    println!(
        "{}",
        style("Welcome to examdesk import watch init").bold().cyan()
    );
    println!(
        "{}",
        style("This will guide you through creating a watcher configuration.").dim()
    );

    let theme = ColorfulTheme::default();

    println!("\n{}", style("--- API ---").bold());
    let base_url: String = Input::with_theme(&theme)
        .with_prompt("API base URL")
        .default("https://exam.example.edu".to_string())
        .validate_with(|input: &String| {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|err| err.to_string())
        })
        .interact_text()?;

    let token: String = Input::with_theme(&theme)
        .with_prompt("Bearer token (leave empty to set EXAMDESK__AUTH__TOKEN later)")
        .allow_empty(true)
        .interact_text()?;

    println!("\n{}", style("--- Tracking ---").bold());
    let key: String = Input::with_theme(&theme)
        .with_prompt("Storage key (e.g., student-import, score-import)")
        .default("student-import".to_string())
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("storage key must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let interval_secs: u64 = Input::with_theme(&theme)
        .with_prompt("Poll interval (seconds)")
        .default(10)
        .validate_with(|input: &u64| {
            if *input == 0 {
                Err("interval must be at least 1 second")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let config = WatchConfig {
        api: ApiConfig {
            base_url,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        },
        auth: AuthConfig {
            token: Some(token.trim().to_string()).filter(|token| !token.is_empty()),
            expires_in_secs: None,
        },
        storage: StorageConfig {
            key: key.trim().to_string(),
            path: None,
        },
        polling: PollingConfig { interval_secs },
    };
    config.validate()?;

    let yaml = serde_yaml::to_string(&config).context("failed to serialize config to YAML")?;

    std::fs::write(&output, yaml)
        .context(format!("failed to write config to {}", output.display()))?;

    println!("\n{}", style("SUCCESS!").bold().green());
    println!(
        "Configuration written to: {}",
        style(output.display()).cyan()
    );

    Ok(())
}
