//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range/consistency checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use super::app_config::{AppConfig, DeviceKind};
use super::defaults::DESTINATION_HASH_LEN;
use crate::acquisition::serial::{is_supported_baud_rate, SUPPORTED_BAUD_RATES};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path for [`AppConfig`].
///
/// Maintained by hand to match the struct hierarchy in `app_config.rs`.
pub const KNOWN_CONFIG_KEYS: &[&str] = &[
    // [device]
    "device",
    "device.kind",
    "device.path",
    "device.addr",
    "device.baud_rate",
    "device.read_timeout_secs",
    "device.max_frame_bytes",
    // [oracle]
    "oracle",
    "oracle.url",
    "oracle.timeout_secs",
    // [gateway]
    "gateway",
    "gateway.enabled",
    "gateway.url",
    "gateway.destination_hash",
    "gateway.timeout_secs",
    // [storage]
    "storage",
    "storage.exports_dir",
    "storage.summaries_dir",
    // [server]
    "server",
    "server.addr",
    "server.model_url",
    // [thresholds]
    "thresholds",
    "thresholds.nh3",
    "thresholds.nh3.warning",
    "thresholds.nh3.danger",
    "thresholds.ch4",
    "thresholds.ch4.warning",
    "thresholds.ch4.danger",
    "thresholds.co",
    "thresholds.co.warning",
    "thresholds.co.danger",
    "thresholds.temp",
    "thresholds.temp.warning",
    "thresholds.temp.danger",
    "thresholds.humidity",
    "thresholds.humidity.warning_low",
    "thresholds.humidity.danger_low",
    "thresholds.humidity.warning_high",
    "thresholds.humidity.danger_high",
];

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3; earliest in the table wins ties.
pub fn suggest_correction(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(k, _)| k.to_string())
}

/// Warn about keys the config structs would silently ignore.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are handled by serde later
    };

    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !KNOWN_CONFIG_KEYS.contains(&key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, KNOWN_CONFIG_KEYS),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Value Checks
// ============================================================================

/// All hard errors in a parsed config. Empty means valid.
pub fn validate_config(config: &AppConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.device.read_timeout_secs == 0 {
        errors.push("device.read_timeout_secs must be greater than 0".to_string());
    }
    if config.device.kind == DeviceKind::Serial && !is_supported_baud_rate(config.device.baud_rate) {
        errors.push(format!(
            "device.baud_rate must be one of {:?}, got {}",
            SUPPORTED_BAUD_RATES, config.device.baud_rate
        ));
    }
    if config.device.max_frame_bytes == 0 {
        errors.push("device.max_frame_bytes must be greater than 0".to_string());
    }
    if config.device.kind == DeviceKind::Tcp && !is_host_port(&config.device.addr) {
        errors.push(format!(
            "device.addr must be HOST:PORT when kind = \"tcp\", got '{}'",
            config.device.addr
        ));
    }

    check_http_url("oracle.url", &config.oracle.url, &mut errors);
    if config.oracle.timeout_secs == 0 {
        errors.push("oracle.timeout_secs must be greater than 0".to_string());
    }

    if config.gateway.enabled {
        check_http_url("gateway.url", &config.gateway.url, &mut errors);
        if config.gateway.timeout_secs == 0 {
            errors.push("gateway.timeout_secs must be greater than 0".to_string());
        }
        if !is_destination_hash(&config.gateway.destination_hash) {
            errors.push(format!(
                "gateway.destination_hash must be {DESTINATION_HASH_LEN} hex characters, got '{}'",
                config.gateway.destination_hash
            ));
        }
    }

    check_http_url("server.model_url", &config.server.model_url, &mut errors);

    errors.extend(config.thresholds.validate());
    errors
}

fn check_http_url(field: &str, url: &str, errors: &mut Vec<String>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{field} must be an http(s) URL, got '{url}'"));
    }
}

fn is_host_port(addr: &str) -> bool {
    addr.rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

/// LXMF addresses: exactly 32 hex digits.
pub fn is_destination_hash(hash: &str) -> bool {
    hash.len() == DESTINATION_HASH_LEN && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.gateway.destination_hash = "1583f76976bcb3747199f86b9ae9e9f6".to_string();
        config
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "kitten"), 0);
        assert_eq!(levenshtein("kitten", "sitten"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let value: toml::Value = "[thresholds.co]\nwarning = 1.0\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert_eq!(keys, vec!["thresholds", "thresholds.co", "thresholds.co.warning"]);
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let warnings = validate_unknown_keys("[oracle]\ntimout_secs = 5\n");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "oracle.timout_secs");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("oracle.timeout_secs"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_known_keys_produce_zero_warnings() {
        let toml = r#"
[device]
kind = "serial"
path = "/dev/ttyUSB0"
addr = "127.0.0.1:4000"
read_timeout_secs = 30
max_frame_bytes = 4096

[oracle]
url = "http://127.0.0.1:8001/predict"
timeout_secs = 30

[gateway]
enabled = true
url = "http://localhost:8000/api/v1/lxmf-messages/send"
destination_hash = "1583f76976bcb3747199f86b9ae9e9f6"
timeout_secs = 10

[storage]
exports_dir = "exports"
summaries_dir = "summaries"

[server]
addr = "0.0.0.0:8001"
model_url = "http://127.0.0.1:8501/predict"

[thresholds.humidity]
warning_low = 30.0
danger_low = 20.0
warning_high = 70.0
danger_high = 80.0
"#;
        assert!(validate_unknown_keys(toml).is_empty());
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        assert_eq!(suggest_correction("zzzzzzzzzzzz", KNOWN_CONFIG_KEYS), None);
    }

    #[test]
    fn test_defaults_with_destination_are_valid() {
        assert!(validate_config(&valid_config()).is_empty());
    }

    #[test]
    fn test_disabled_gateway_skips_destination_check() {
        let mut config = AppConfig::default();
        config.gateway.enabled = false;
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.device.read_timeout_secs = 0;
        config.oracle.url = "ftp://oracle".to_string();
        config.gateway.destination_hash = "not-a-hash".to_string();
        config.device.kind = DeviceKind::Tcp;
        config.device.addr = "no-port".to_string();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 4, "{errors:?}");
    }

    #[test]
    fn test_serial_baud_rate_checked() {
        let mut config = valid_config();
        config.device.baud_rate = 9601;
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].starts_with("device.baud_rate"));

        // Only the serial path uses it
        config.device.kind = DeviceKind::Stdin;
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_destination_hash_format() {
        assert!(is_destination_hash("1583f76976bcb3747199f86b9ae9e9f6"));
        assert!(!is_destination_hash("1583f76976bcb3747199f86b9ae9e9f"));
        assert!(!is_destination_hash("1583f76976bcb3747199f86b9ae9e9fg"));
    }
}
