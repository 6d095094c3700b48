//! Config command implementation.

use std::time::Duration;

use anyhow::{anyhow, Result};

use uplift_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub async fn run(args: ConfigArgs) -> Result<()> {
    let mut config = Config::load()?;

    match args.action {
        ConfigAction::Get { key } => {
            let value = get_config_value(&config, &key);
            match value {
                Some(v) => println!("{}: {}", key, v),
                None => println!("Unknown configuration key: {}", key),
            }
        }

        ConfigAction::Set { key, value } => {
            if set_config_value(&mut config, &key, &value)? {
                config.save()?;
                println!("Set {} = {}", key, value);
            } else {
                println!("Unknown configuration key: {}", key);
            }
        }

        ConfigAction::Show => {
            println!();
            println!("Uplift Configuration");
            println!("{}", "─".repeat(50));
            println!();
            println!("[transport]");
            println!("  endpoint = \"{}\"", config.transport.endpoint);
            println!("  timeout = \"{}s\"", config.transport.timeout.as_secs());
            println!();
            println!("[upload]");
            println!("  accept = [{}]", quote_list(&config.upload.accept));
            println!("  auto_start = {}", config.upload.auto_start);
            println!();
        }

        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "transport.endpoint" => Some(config.transport.endpoint.clone()),
        "transport.timeout" => Some(format!("{}s", config.transport.timeout.as_secs())),
        "upload.accept" => Some(config.upload.accept.join(",")),
        "upload.auto_start" => Some(config.upload.auto_start.to_string()),
        _ => None,
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<bool> {
    match key {
        "transport.endpoint" => {
            config.transport.endpoint = value.to_string();
            Ok(true)
        }
        "transport.timeout" => {
            config.transport.timeout = parse_duration(value)?;
            Ok(true)
        }
        "upload.accept" => {
            config.upload.accept = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            Ok(true)
        }
        "upload.auto_start" => {
            config.upload.auto_start = value.parse()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Parse a duration value like "30s", "5m", or a bare number of seconds
fn parse_duration(value: &str) -> Result<Duration> {
    if let Some(secs) = value.strip_suffix('s') {
        return Ok(Duration::from_secs(secs.parse()?));
    }
    if let Some(mins) = value.strip_suffix('m') {
        return Ok(Duration::from_secs(mins.parse::<u64>()? * 60));
    }
    value
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| anyhow!("Invalid duration: '{}'", value))
}

fn quote_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{v}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
