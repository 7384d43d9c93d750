use super::{load_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    settings
        .apply_file(
            r#"
rpc_url = "http://node.internal:8545"
contract_address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
receipt_poll_ms = 250
"#,
        )
        .expect("parse config");

    assert_eq!(settings.rpc_url, "http://node.internal:8545");
    assert_eq!(settings.receipt_poll_ms, 250);
    assert_eq!(settings.watch_poll_ms, Settings::default().watch_poll_ms);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn unknown_file_keys_are_rejected() {
    let mut settings = Settings::default();
    assert!(settings.apply_file("rpc = \"http://x\"").is_err());
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_short_names() {
    let mut settings = Settings::default();
    settings.apply_env_with(env_from(&[
        ("CARBON_RPC_URL", "http://short:8545"),
        ("APP__RPC_URL", "http://long:8545"),
        ("CARBON_CONTRACT_ADDRESS", CONTRACT),
        ("APP__WATCH_POLL_MS", "not-a-number"),
        ("APP__RECEIPT_POLL_MS", "50"),
        ("RUST_LOG", "debug"),
    ]));

    assert_eq!(settings.rpc_url, "http://long:8545");
    assert_eq!(settings.contract_address.as_deref(), Some(CONTRACT));
    assert_eq!(settings.receipt_poll_ms, 50);
    assert_eq!(settings.watch_poll_ms, 2000);
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn resolve_validates_url_and_contract() {
    let mut settings = Settings {
        contract_address: Some(CONTRACT.into()),
        ..Settings::default()
    };
    let resolved = settings.resolve().expect("valid settings");
    assert_eq!(resolved.contract.to_string(), CONTRACT);
    assert_eq!(resolved.wallet.endpoint.as_str(), "http://127.0.0.1:8545/");
    assert_eq!(resolved.wallet.receipt_poll, Duration::from_millis(1000));

    settings.rpc_url = "not a url".into();
    assert!(settings.resolve().is_err());

    settings.rpc_url = "ws://127.0.0.1:8546".into();
    assert!(settings.resolve().is_err());

    settings.rpc_url = Settings::default().rpc_url;
    settings.contract_address = Some("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into());
    assert!(settings.resolve().is_err());

    settings.contract_address = None;
    let err = settings.resolve().expect_err("missing contract");
    assert!(err.to_string().contains("no contract address"));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("carbon_cli_missing_{suffix}.toml"));

    let settings = load_settings(&path).expect("defaults");
    assert_eq!(settings.receipt_poll_ms, 1000);
}

#[test]
fn malformed_config_file_is_an_error() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("carbon_cli_bad_{suffix}.toml"));
    fs::write(&path, "receipt_poll_ms = \"soon\"").expect("write config");

    let err = load_settings(&path).expect_err("bad config");
    assert!(format!("{err:#}").contains("failed to load"));

    fs::remove_file(path).expect("cleanup");
}
