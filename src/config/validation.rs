use crate::config::types::{
    AdapterConfig, CatalogConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_extraction_config(&config.extraction)?;
    validate_extraction_budget(&config.crawler, &config.extraction)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_catalog_config(&config.catalog)?;
    validate_adapter_config(&config.adapter)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates orchestrator timeouts
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.ready_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "ready_timeout must be >= 100ms, got {}ms",
            config.ready_timeout
        )));
    }

    if config.operation_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "operation_timeout must be >= 100ms, got {}ms",
            config.operation_timeout
        )));
    }

    Ok(())
}

/// Validates the citation extraction retry policy
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.poll_interval == 0 {
        return Err(ConfigError::Validation(
            "poll_interval must be > 0ms".to_string(),
        ));
    }

    if config.request_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 100ms, got {}ms",
            config.request_timeout
        )));
    }

    if config.element_timeout < config.poll_interval {
        return Err(ConfigError::Validation(format!(
            "element_timeout ({}ms) must not be shorter than poll_interval ({}ms)",
            config.element_timeout, config.poll_interval
        )));
    }

    Ok(())
}

/// Validates that an extraction with every retry fits inside one agent command
///
/// The coordinator bounds the whole extraction call by `operation_timeout`,
/// so a shorter bound would cut the retry loop off after it already saved
/// a file.
fn validate_extraction_budget(
    crawler: &CrawlerConfig,
    extraction: &ExtractionConfig,
) -> Result<(), ConfigError> {
    let needed = extraction.worst_case();
    if crawler.operation_timeout() < needed {
        return Err(ConfigError::Validation(format!(
            "operation_timeout ({}ms) is shorter than the worst-case extraction ({}ms)",
            crawler.operation_timeout,
            needed.as_millis()
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the catalog seed
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            config.seed_url
        )));
    }

    Ok(())
}

/// Validates that every selector parses and the total pattern compiles
fn validate_adapter_config(config: &AdapterConfig) -> Result<(), ConfigError> {
    if config.item_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one item selector is required".to_string(),
        ));
    }

    let selectors = config
        .item_selectors
        .iter()
        .chain([
            &config.next_page_selector,
            &config.total_selector,
            &config.article.cite,
            &config.article.download,
            &config.chapter.cite,
            &config.chapter.download,
        ]);

    for selector in selectors {
        validate_selector(selector)?;
    }

    let pattern = Regex::new(&config.total_pattern).map_err(|e| {
        ConfigError::Validation(format!(
            "total_pattern '{}' is not a valid regex: {}",
            config.total_pattern, e
        ))
    })?;

    if pattern.captures_len() < 2 {
        return Err(ConfigError::Validation(format!(
            "total_pattern '{}' must contain a capture group",
            config.total_pattern
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("state_path", &config.state_path),
        ("download_dir", &config.download_dir),
        ("titles_path", &config.titles_path),
        ("merged_path", &config.merged_path),
        ("report_path", &config.report_path),
    ];

    for (name, value) in paths {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
