// tests/ingest_config.rs
use metal_price_tracker::config::tracker::{ENV_CONFIG_PATH, ENV_HISTORY_PATH, ENV_MOCK_MODE};
use metal_price_tracker::TrackerConfig;
use std::{env, fs, path::PathBuf};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("tracker.toml");
    fs::write(
        &p_toml,
        r#"
refresh_interval_secs = 60
locale = "en-US"
history_path = "data/history.jsonl"
"#,
    )
    .unwrap();
    let t = TrackerConfig::load_from(&p_toml).unwrap();
    assert_eq!(t.refresh_interval_secs, 60);
    assert_eq!(t.locale, "en-US");
    assert_eq!(t.history_path, Some(PathBuf::from("data/history.jsonl")));
    assert!(!t.mock_mode);

    let p_json = dir.path().join("tracker.json");
    fs::write(&p_json, r#"{ "mock_mode": true, "default_window_hours": 0 }"#).unwrap();
    let j = TrackerConfig::load_from(&p_json).unwrap();
    assert!(j.mock_mode);
    assert_eq!(j.default_window_hours, 24);

    let p_bad = dir.path().join("tracker.toml");
    fs::write(&p_bad, "refresh_interval_secs = \"soon\"").unwrap();
    assert!(TrackerConfig::load_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Run in a scratch CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_MOCK_MODE);
    env::remove_var(ENV_HISTORY_PATH);

    // 1) Nothing on disk -> defaults
    assert_eq!(TrackerConfig::load_default().unwrap(), TrackerConfig::default());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("tracker.toml"), "refresh_interval_secs = 45").unwrap();
    assert_eq!(TrackerConfig::load_default().unwrap().refresh_interval_secs, 45);

    // 3) Env path wins
    let p_env = tmp.path().join("other.json");
    fs::write(&p_env, r#"{ "refresh_interval_secs": 5 }"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(TrackerConfig::load_default().unwrap().refresh_interval_secs, 5);

    // 4) Env path pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(TrackerConfig::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    // 5) Field overrides
    env::set_var(ENV_MOCK_MODE, "true");
    env::set_var(ENV_HISTORY_PATH, "state/h.jsonl");
    let o = TrackerConfig::load_default().unwrap();
    assert!(o.mock_mode);
    assert_eq!(o.history_path, Some(PathBuf::from("state/h.jsonl")));
    env::remove_var(ENV_MOCK_MODE);
    env::remove_var(ENV_HISTORY_PATH);

    env::set_current_dir(&old).unwrap();
}
