//! Built-in module catalog

use overseer_config::Config;
use overseer_runtime::ModuleCatalog;

/// Catalog of every module shipped with the agent, configured from `config`
pub fn builtin_catalog(config: &Config) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new()
        .with(data_collector::NAME, data_collector::factory)
        .with(api_wrapper::NAME, api_wrapper::factory);

    for (name, settings) in &config.modules {
        if !catalog.contains(name) {
            tracing::warn!(module = %name, "Ignoring settings for unknown module");
            continue;
        }
        catalog.configure(name.clone(), settings.clone());
    }

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_runtime::ModuleResolver;

    #[test]
    fn test_builtin_names() {
        let catalog = builtin_catalog(&Config::default());
        assert_eq!(catalog.names(), vec!["api_wrapper", "data_collector"]);
    }

    #[test]
    fn test_settings_reach_factories() {
        let mut config = Config::default();
        config.modules.insert(
            "api_wrapper".to_string(),
            serde_json::json!({"base_url": "not a url"}),
        );
        let catalog = builtin_catalog(&config);

        assert!(catalog.resolve("api_wrapper").is_err());
        assert!(catalog.resolve("data_collector").is_ok());
    }
}
