use serial_test::serial;

use super::*;

const ALL_VARS: &[&str] = &[
    "PDFSEED_DB_URI",
    "PDFSEED_INDEX_NAME",
    "PDFSEED_API_KEY",
    "PDFSEED_REGION",
    "PDFSEED_EMBEDDING_URL",
    "PDFSEED_EMBEDDING_MODEL",
    "PDFSEED_EMBEDDING_DIMENSION",
    "PDFSEED_METRIC",
    "PDFSEED_BATCH_SIZE",
];

fn clear_env() {
    for var in ALL_VARS {
        // SAFETY: tests mutating the environment are serialized with
        // #[serial] so no other thread reads the environment concurrently.
        unsafe { env::remove_var(var) };
    }
}

fn set_var(name: &str, value: &str) {
    // SAFETY: see clear_env.
    unsafe { env::set_var(name, value) };
}

fn set_required() {
    set_var("PDFSEED_DB_URI", "/tmp/pdfseed-test-db");
    set_var("PDFSEED_INDEX_NAME", "medical-handbook");
}

#[test]
#[serial]
fn load_with_defaults() {
    clear_env();
    set_required();

    let config = Config::from_env().expect("config should load");

    assert_eq!(config.store.uri, "/tmp/pdfseed-test-db");
    assert_eq!(config.store.index_name, "medical-handbook");
    assert_eq!(config.store.metric, DistanceMetric::Cosine);
    assert_eq!(config.embedding.dimension, 384);
    assert_eq!(config.embedding.model, "all-minilm");
    assert_eq!(config.chunking.max_words, 400);
    assert_eq!(config.chunking.overlap, 40);
    assert_eq!(config.batch_size, 100);
}

#[test]
#[serial]
fn missing_uri_fails_fast() {
    clear_env();
    set_var("PDFSEED_INDEX_NAME", "some-index");

    let result = Config::from_env();
    assert!(matches!(result, Err(SeedError::Config(_))));
}

#[test]
#[serial]
fn missing_index_name_fails_fast() {
    clear_env();
    set_var("PDFSEED_DB_URI", "/tmp/db");

    let result = Config::from_env();
    assert!(matches!(result, Err(SeedError::Config(_))));
}

#[test]
#[serial]
fn remote_uri_requires_credentials() {
    clear_env();
    set_var("PDFSEED_DB_URI", "db://my-deployment");
    set_var("PDFSEED_INDEX_NAME", "some-index");

    let result = Config::from_env();
    assert!(matches!(result, Err(SeedError::Config(_))));

    set_var("PDFSEED_API_KEY", "sk-test");
    set_var("PDFSEED_REGION", "us-east-1");
    let config = Config::from_env().expect("config should load with credentials");
    assert!(config.store.is_remote());
}

#[test]
#[serial]
fn env_overrides_are_applied() {
    clear_env();
    set_required();
    set_var("PDFSEED_EMBEDDING_URL", "http://embed-host:9999");
    set_var("PDFSEED_EMBEDDING_MODEL", "nomic-embed-text");
    set_var("PDFSEED_EMBEDDING_DIMENSION", "768");
    set_var("PDFSEED_METRIC", "l2");
    set_var("PDFSEED_BATCH_SIZE", "50");

    let config = Config::from_env().expect("config should load");

    assert_eq!(config.embedding.url, "http://embed-host:9999");
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.embedding.dimension, 768);
    assert_eq!(config.store.metric, DistanceMetric::L2);
    assert_eq!(config.batch_size, 50);
}

#[test]
#[serial]
fn invalid_metric_is_rejected() {
    clear_env();
    set_required();
    set_var("PDFSEED_METRIC", "euclidean-ish");

    let result = Config::from_env();
    assert!(matches!(result, Err(SeedError::Config(_))));
}

#[test]
#[serial]
fn invalid_batch_size_is_rejected() {
    clear_env();
    set_required();
    set_var("PDFSEED_BATCH_SIZE", "zero");

    assert!(matches!(Config::from_env(), Err(SeedError::Config(_))));

    set_var("PDFSEED_BATCH_SIZE", "0");
    assert!(matches!(Config::from_env(), Err(SeedError::Config(_))));
}

#[test]
fn budget_smaller_than_window_is_rejected() {
    let mut config = Config {
        store: StoreConfig {
            uri: "/tmp/db".to_string(),
            api_key: None,
            region: None,
            index_name: "idx".to_string(),
            metric: DistanceMetric::Cosine,
        },
        embedding: EmbeddingConfig::default(),
        chunking: ChunkingConfig::default(),
        batch_size: DEFAULT_BATCH_SIZE,
    };

    config.embedding.input_word_budget = 100;
    assert!(matches!(config.validate(), Err(SeedError::Config(_))));

    config.embedding.input_word_budget = 400;
    config.validate().expect("budget equal to max_words is fine");
}

#[test]
fn degenerate_chunking_fails_validation() {
    let mut config = Config {
        store: StoreConfig {
            uri: "/tmp/db".to_string(),
            api_key: None,
            region: None,
            index_name: "idx".to_string(),
            metric: DistanceMetric::Cosine,
        },
        embedding: EmbeddingConfig::default(),
        chunking: ChunkingConfig {
            max_words: 40,
            overlap: 40,
        },
        batch_size: DEFAULT_BATCH_SIZE,
    };

    assert!(matches!(config.validate(), Err(SeedError::Config(_))));

    config.chunking.overlap = 39;
    config.validate().expect("overlap below max_words is valid");
}

#[test]
fn embedding_config_bounds() {
    let mut embedding = EmbeddingConfig::default();
    embedding.validate().expect("defaults should be valid");

    embedding.dimension = 16;
    assert!(matches!(embedding.validate(), Err(SeedError::Config(_))));

    embedding.dimension = 384;
    embedding.url = "not a url".to_string();
    assert!(matches!(embedding.validate(), Err(SeedError::Config(_))));
}
