use std::io::Write;

use lamco_pointer::config::Config;
use lamco_pointer::pointer::InactivityTimeout;
use tempfile::TempDir;

#[test]
fn test_load_partial_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pointer.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "[pointer]\ninactivity_timeout_short_ms = 1500\nmax_spots = 6\n\n[demo]\ntouch_contacts = 5"
    )
    .unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.pointer.max_spots, 6);
    assert_eq!(
        config.pointer.inactivity_delay(InactivityTimeout::Short),
        std::time::Duration::from_millis(1500)
    );
    assert_eq!(config.pointer.pointer_fade_duration_ms, 500);
    assert_eq!(config.demo.touch_contacts, 5);
    assert_eq!(config.demo.width, 1920);
}

#[test]
fn test_empty_file_is_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.toml");
    std::fs::write(&path, "").unwrap();

    let config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.pointer.max_recycled_sprites, 12);
    assert_eq!(config.pointer.frame_interval_ms, 16);
}

#[test]
fn test_invalid_values_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "[pointer]\nmax_spots = 0\n").unwrap();

    let error = Config::load(path.to_str().unwrap()).unwrap_err();
    assert!(format!("{:#}", error).contains("max_spots"));
}

#[test]
fn test_missing_file_reports_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.toml");

    let error = Config::load(path.to_str().unwrap()).unwrap_err();
    assert!(error.to_string().contains("missing.toml"));
}

#[test]
fn test_malformed_toml_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[pointer\nmax_spots = ").unwrap();

    assert!(Config::load(path.to_str().unwrap()).is_err());
}
