use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = default_config_path()?;
    load_or_create(&path)
}

/// Load `path`, writing the defaults there first if it does not exist.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = format!(
        "# coolrelay config\n\
broker_host = \"{}\"\n\
broker_port = {}\n\
topic = \"{}\"\n\
client_id = \"{}\"\n\
temp_threshold = {:?}\n\
tick_interval_ms = {}\n\
history_capacity = {}\n\
store_path = \"{}\"\n\
synthetic_sensor = {}\n",
        config.broker_host,
        config.broker_port,
        config.topic,
        config.client_id,
        config.temp_threshold,
        config.tick_interval_ms,
        config.history_capacity,
        config.store_path,
        config.synthetic_sensor,
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "broker_host" => cfg.broker_host = value.to_string(),
            "broker_port" => {
                cfg.broker_port = value.parse().map_err(|_| {
                    Error::InvalidArgs(format!("invalid broker_port value on line {}", idx + 1))
                })?;
            }
            "topic" => cfg.topic = value.to_string(),
            "client_id" => cfg.client_id = value.to_string(),
            "temp_threshold" => {
                cfg.temp_threshold = value.parse().map_err(|_| {
                    Error::InvalidArgs(format!("invalid temp_threshold on line {}", idx + 1))
                })?;
            }
            "tick_interval_ms" => {
                cfg.tick_interval_ms = value.parse().map_err(|_| {
                    Error::InvalidArgs(format!("invalid tick_interval_ms on line {}", idx + 1))
                })?;
            }
            "history_capacity" => {
                cfg.history_capacity = value.parse().map_err(|_| {
                    Error::InvalidArgs(format!("invalid history_capacity on line {}", idx + 1))
                })?;
            }
            "store_path" => cfg.store_path = value.to_string(),
            "synthetic_sensor" => {
                cfg.synthetic_sensor = parse_bool(value).ok_or_else(|| {
                    Error::InvalidArgs(format!(
                        "invalid synthetic_sensor on line {}: expected true or false",
                        idx + 1
                    ))
                })?;
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{}' on line {}",
                    other,
                    idx + 1
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

pub fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| Error::InvalidArgs("HOME not set; cannot locate config directory".into()))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_default_when_missing() {
        let dir = tempdir().unwrap();
        let cfg = load_from_path(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_valid_config() {
        let contents = r#"
            # local broker
            broker_host = "localhost"
            broker_port = 1884
            topic = "lab/cooling"
            client_id = "bench"
            temp_threshold = 27.5
            tick_interval_ms = 1000
            history_capacity = 50
            store_path = "/var/lib/coolrelay/data.jsonl"
            synthetic_sensor = false
        "#;
        let cfg = parse(contents).unwrap();
        assert_eq!(cfg.broker_host, "localhost");
        assert_eq!(cfg.broker_port, 1884);
        assert_eq!(cfg.topic, "lab/cooling");
        assert_eq!(cfg.client_id, "bench");
        assert_eq!(cfg.temp_threshold, 27.5);
        assert_eq!(cfg.tick_interval_ms, 1000);
        assert_eq!(cfg.history_capacity, 50);
        assert_eq!(cfg.store_path, "/var/lib/coolrelay/data.jsonl");
        assert!(!cfg.synthetic_sensor);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse("nope = 1").unwrap_err();
        assert!(format!("{err}").contains("unknown config key"));
    }

    #[test]
    fn rejects_bad_values_with_line_number() {
        let err = parse("\nbroker_port = seventy").unwrap_err();
        assert!(format!("{err}").contains("line 2"), "{err}");
        let err = parse("synthetic_sensor = maybe").unwrap_err();
        assert!(format!("{err}").contains("synthetic_sensor"));
        let err = parse("just words").unwrap_err();
        assert!(format!("{err}").contains("invalid config line 1"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = parse("history_capacity = 0").unwrap_err();
        assert!(format!("{err}").contains("history_capacity"));
        let err = parse("tick_interval_ms = 5").unwrap_err();
        assert!(format!("{err}").contains("tick_interval_ms"));
    }

    #[test]
    fn saves_and_loads_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            broker_host: "mqtt.local".into(),
            broker_port: 8883,
            topic: "home/ac".into(),
            client_id: "ac-1".into(),
            temp_threshold: 28.25,
            tick_interval_ms: 2_500,
            history_capacity: 500,
            store_path: "data/readings.jsonl".into(),
            synthetic_sensor: false,
        };
        save_to_path(&cfg, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg, Config::default());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("temp_threshold = 30.0"));
        assert!(contents.contains("broker_host ="));
    }
}
