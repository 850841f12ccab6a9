use newsletter_aggregator::{CuratorConfig, CuratorError};
use std::collections::HashMap;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_defaults_without_environment() {
    let config = CuratorConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.pipeline.chunk_size, 20);
    assert_eq!(config.pipeline.max_concurrency, 1);
    assert_eq!(config.completion.model, "gpt-4o");
    assert!(config.completion.api_key.is_empty());
    assert!(config.serper_api_key.is_none());
    assert_eq!(config.reducer.corrective_retries, 1);
}

#[test]
fn test_environment_overrides() {
    let config = CuratorConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_MODEL", "gpt-4o-mini"),
        ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ("SERPER_API_KEY", "serper-test"),
        ("CURATOR_CHUNK_SIZE", " 15 "),
        ("CURATOR_CONCURRENCY", "4"),
    ]))
    .unwrap();

    assert_eq!(config.completion.api_key, "sk-test");
    assert_eq!(config.completion.model, "gpt-4o-mini");
    assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
    assert_eq!(config.serper_api_key.as_deref(), Some("serper-test"));
    assert_eq!(config.pipeline.chunk_size, 15);
    assert_eq!(config.pipeline.max_concurrency, 4);

    // Keys never show up in debug output
    let debug = format!("{:?}", config.completion);
    assert!(!debug.contains("sk-test"));
}

#[test]
fn test_invalid_numbers_are_rejected() {
    let result = CuratorConfig::from_lookup(lookup(&[("CURATOR_CHUNK_SIZE", "twenty")]));
    assert!(matches!(result, Err(CuratorError::Config(_))));

    let config = CuratorConfig::from_lookup(lookup(&[("SERPER_API_KEY", "   ")])).unwrap();
    assert!(config.serper_api_key.is_none());
}
