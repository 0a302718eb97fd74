use std::env;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use pathtrack_sim::config::{Config, SimProfile, DEFAULT_GOAL_X, DEFAULT_NODE_NAME};

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().expect("lock")
}

#[test]
fn defaults_without_flags() {
    let _guard = env_lock();
    env::remove_var("PATHTRACK_NODE_NAME");
    env::remove_var("PATHTRACK_GOAL_X");
    env::remove_var("PATHTRACK_GOAL_Y");

    let config = Config::from_args_iter(["bin"]);
    assert_eq!(config.node_name, DEFAULT_NODE_NAME);
    assert_eq!(config.goal_x, DEFAULT_GOAL_X);
    assert!(config.profile_path.is_none());
    assert!(config.cancel_after.is_none());
}

#[test]
fn flags_override_defaults_in_both_spellings() {
    let _guard = env_lock();
    env::remove_var("PATHTRACK_NODE_NAME");
    env::remove_var("PATHTRACK_GOAL_X");
    env::remove_var("PATHTRACK_GOAL_Y");

    let config = Config::from_args_iter(["bin", "--goal-x", "3.5", "--goal-y=-1.0"]);
    assert_eq!(config.goal_x, 3.5);
    assert_eq!(config.goal_y, -1.0);

    let config = Config::from_args_iter(["bin", "--node-name=sim_a", "--cancel-after-ms", "250"]);
    assert_eq!(config.node_name, "sim_a");
    assert_eq!(config.cancel_after, Some(Duration::from_millis(250)));
}

#[test]
fn env_overrides_apply_when_flags_are_absent() {
    let _guard = env_lock();
    env::set_var("PATHTRACK_NODE_NAME", "from_env");
    env::set_var("PATHTRACK_GOAL_X", "7.25");

    let config = Config::from_args_iter(["bin"]);
    assert_eq!(config.node_name, "from_env");
    assert_eq!(config.goal_x, 7.25);

    // Flags still win over the environment.
    let config = Config::from_args_iter(["bin", "--goal-x", "1.0"]);
    assert_eq!(config.goal_x, 1.0);

    env::remove_var("PATHTRACK_NODE_NAME");
    env::remove_var("PATHTRACK_GOAL_X");
}

#[test]
fn default_profile_matches_the_controller_defaults() {
    let profile = SimProfile::default();
    let config = profile.controller_config();
    config.validate().unwrap();
    assert_eq!(config.control_period, Duration::from_millis(100));
    assert_eq!(config.max_consecutive_failures, 3);
}

#[test]
fn yaml_profile_overrides_selected_fields() {
    let profile: SimProfile = serde_yaml::from_str(
        "control_period_ms: 50\n\
         max_speed: 1.5\n\
         goal_tolerance_yaw_deg: 10.0\n",
    )
    .unwrap();

    let config = profile.controller_config();
    assert_eq!(config.control_period, Duration::from_millis(50));
    assert!((config.goal_tolerance.yaw - 10.0_f64.to_radians()).abs() < 1e-12);
    assert_eq!(profile.max_speed, 1.5);
    // Untouched fields keep their defaults.
    assert_eq!(config.halt_wait, Duration::from_millis(500));
}

#[test]
fn unknown_profile_keys_are_rejected() {
    let result: Result<SimProfile, _> = serde_yaml::from_str("control_perid_ms: 50\n");
    assert!(result.is_err());
}
