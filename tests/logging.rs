//! File logger installation. Kept in its own test binary because the logger
//! is global to the process.

use log::LevelFilter;
use rework_rs::{AutoRefine, Rework, ReworkError, Settings, init_logger};

#[test]
fn test_file_logger_records_driver_phases() {
    let path = std::env::temp_dir().join(format!("rework-log-{}.log", std::process::id()));
    let _ = std::fs::remove_file(&path);

    init_logger(&path, LevelFilter::Debug).unwrap();
    let mut rework = Rework::new(Settings::new().auto_refine(AutoRefine::All)).unwrap();
    rework.process(".a { color: red }").unwrap();

    let logged = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(logged.contains("[DEBUG] rework::subscription: registering auto-refiner"));
    assert!(logged.contains("validating from"));
    assert!(!logged.contains("[TRACE]"));

    assert!(matches!(
        init_logger(&path, LevelFilter::Trace),
        Err(ReworkError::Logger(_))
    ));
}
