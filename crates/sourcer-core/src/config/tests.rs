use super::*;
use serial_test::serial;

fn clear_env() {
    for var in [
        "SOURCER_PORT",
        "SOURCER_BIND_ADDR",
        "SOURCER_ENV",
        "EMBEDDING_PROVIDER",
        "EMBEDDING_DIMENSIONS",
        "ENABLE_RERANK",
        "ENABLE_AUTO_MIGRATE",
        "ML_TRAJECTORY_ENABLED",
        "ML_TRAJECTORY_URL",
        "WEIGHTS_VERSION",
        "SEARCH_CACHE_PURGE",
        "SOURCER_EMBEDDING_PRIMARY_URL",
    ] {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
#[serial]
fn defaults_are_valid() {
    clear_env();
    let config = Config::from_env().expect("defaults parse");
    assert_eq!(config.port, 8080);
    assert_eq!(config.embedding_provider, ProviderKind::Primary);
    assert_eq!(config.embedding_dim.embedding_dim, 768);
    assert!(config.enable_rerank);
    assert!(!config.search_cache_purge);
    assert_eq!(config.weights_version, "wv-2025-10");
}

#[test]
#[serial]
fn rejects_unknown_provider() {
    clear_env();
    unsafe { std::env::set_var("EMBEDDING_PROVIDER", "vertex") };
    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidChoice { .. }));
    unsafe { std::env::remove_var("EMBEDDING_PROVIDER") };
}

#[test]
#[serial]
fn rejects_zero_port() {
    clear_env();
    unsafe { std::env::set_var("SOURCER_PORT", "0") };
    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPort { .. }));
    unsafe { std::env::remove_var("SOURCER_PORT") };
}

#[test]
#[serial]
fn rejects_bad_bool() {
    clear_env();
    unsafe { std::env::set_var("ENABLE_RERANK", "maybe") };
    let err = Config::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBool { .. }));
    unsafe { std::env::remove_var("ENABLE_RERANK") };
}

#[test]
fn local_provider_forbidden_in_production() {
    let config = Config {
        environment: Environment::Production,
        embedding_provider: ProviderKind::Local,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::LocalProviderForbidden)
    ));
}

#[test]
fn production_primary_requires_url() {
    let config = Config {
        environment: Environment::Production,
        embedding_provider: ProviderKind::Primary,
        embedding_primary_url: None,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingRequired { .. })
    ));
}

#[test]
fn ml_enabled_requires_url() {
    let config = Config {
        ml_trajectory_enabled: true,
        ml_trajectory_url: None,
        ..Config::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingRequired { .. })
    ));
}

#[test]
fn provider_kind_round_trip() {
    for kind in [
        ProviderKind::Primary,
        ProviderKind::Secondary,
        ProviderKind::Local,
    ] {
        assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
    }
    assert!("bogus".parse::<ProviderKind>().is_err());
}

#[test]
fn stage_budget_defaults() {
    let budgets = StageBudgets::default();
    assert_eq!(budgets.embed.as_millis(), 150);
    assert_eq!(budgets.recall.as_millis(), 300);
    assert_eq!(budgets.scoring.as_millis(), 200);
    assert_eq!(budgets.rerank.as_millis(), 350);
    assert_eq!(budgets.ml.as_millis(), 100);
}
