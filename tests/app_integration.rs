use std::fs;
use std::sync::Arc;
use std::time::Duration;

use folio::aggregator::RateAggregator;
use folio::model::{AssetClass, Side, Symbol};
use folio::providers::exchange_rate_api::ExchangeRateApiProvider;
use folio::providers::exchange_rate_host::ExchangeRateHostProvider;
use folio::rate_provider::RateProvider;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_yahoo_mock_server(symbol: &str, price: f64) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{symbol}");
        let body = format!(
            r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {price}}}}}]}}}}"#
        );

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_failing_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(
    dir: &std::path::Path,
    yahoo_url: &str,
    coingecko_url: Option<&str>,
) -> std::path::PathBuf {
    let coingecko = coingecko_url.map_or(String::new(), |url| {
        format!("\n  - kind: coingecko\n    base_url: \"{url}\"")
    });
    let config_content = format!(
        r#"
symbols:
  - name: "AAPL"
    class: equity
  - name: "bitcoin"
    class: crypto
providers:
  - kind: yahoo
    base_url: "{yahoo_url}"{coingecko}
default_user: "demo"
provider_timeout_ms: 1000
data_path: "{}"
"#,
        dir.join("data").display()
    );

    let config_path = dir.join("config.yaml");
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path
}

#[test_log::test(tokio::test)]
async fn test_record_then_summary_flow() {
    let mock_server = test_utils::create_yahoo_mock_server("AAPL", 150.0).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &mock_server.uri(), None);
    let config_path = config_path.to_str().unwrap();

    let result = folio::run_command(
        folio::AppCommand::Record {
            user: None,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: 10.0,
            price: 120.0,
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "record failed with: {:?}", result.err());

    let result = folio::run_command(
        folio::AppCommand::Summary { user: None },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "summary failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_summary_is_partial_when_one_symbol_has_no_rate() {
    let yahoo = test_utils::create_yahoo_mock_server("AAPL", 150.0).await;
    let broken = test_utils::create_failing_server().await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &yahoo.uri(), Some(&broken.uri()));
    let config_path = config_path.to_str().unwrap();

    for (symbol, quantity, price) in [("AAPL", 10.0, 120.0), ("bitcoin", 0.5, 20000.0)] {
        folio::run_command(
            folio::AppCommand::Record {
                user: None,
                symbol: symbol.to_string(),
                side: Side::Buy,
                quantity,
                price,
            },
            Some(config_path),
        )
        .await
        .expect("record failed");
    }

    // All providers for bitcoin fail, yet the whole summary still succeeds.
    let result = folio::run_command(
        folio::AppCommand::Summary { user: None },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "summary failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_overselling_is_rejected_end_to_end() {
    let mock_server = test_utils::create_yahoo_mock_server("AAPL", 150.0).await;
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(dir.path(), &mock_server.uri(), None);
    let config_path = config_path.to_str().unwrap();

    folio::run_command(
        folio::AppCommand::Record {
            user: None,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: 15.0,
            price: 100.0,
        },
        Some(config_path),
    )
    .await
    .expect("buy failed");

    let result = folio::run_command(
        folio::AppCommand::Record {
            user: None,
            symbol: "AAPL".to_string(),
            side: Side::Sell,
            quantity: 20.0,
            price: 110.0,
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_err(), "oversell unexpectedly succeeded");
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("insufficient holdings"),
        "unexpected error message"
    );
}

#[test_log::test(tokio::test)]
async fn test_weighted_aggregation_across_http_providers() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // exchangerate.host answers 1.10 with weight 0.8.
    let host_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"base": "USD", "rates": {"EUR": 1.10}}"#),
        )
        .mount(&host_server)
        .await;

    // ExchangeRate-API answers 1.12 with weight 0.9.
    let api_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v6/test-key/latest/USD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"result": "success", "conversion_rates": {"EUR": 1.12}}"#),
        )
        .mount(&api_server)
        .await;

    let providers: Vec<Arc<dyn RateProvider>> = vec![
        Arc::new(ExchangeRateHostProvider::new(&host_server.uri(), 0.8)),
        Arc::new(ExchangeRateApiProvider::new(
            &api_server.uri(),
            "test-key",
            0.9,
        )),
    ];
    let aggregator = RateAggregator::new(providers, Duration::from_secs(1));

    let rate = aggregator
        .get_rate(&Symbol::new("USD_EUR", AssetClass::Forex))
        .await
        .expect("aggregation failed");

    let expected = (1.10 * 0.8 + 1.12 * 0.9) / 1.7;
    assert!((rate.rate - expected).abs() < 1e-9);
    assert_eq!(rate.quote_count, 2);
}

#[test_log::test(tokio::test)]
async fn test_aggregation_survives_one_provider_outage() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"base": "USD", "rates": {"EUR": 1.05}}"#),
        )
        .mount(&healthy)
        .await;

    let broken = test_utils::create_failing_server().await;

    let providers: Vec<Arc<dyn RateProvider>> = vec![
        Arc::new(ExchangeRateApiProvider::new(&broken.uri(), "test-key", 0.9)),
        Arc::new(ExchangeRateHostProvider::new(&healthy.uri(), 1.0)),
    ];
    let aggregator = RateAggregator::new(providers, Duration::from_secs(1));

    let rate = aggregator
        .get_rate(&Symbol::new("USD_EUR", AssetClass::Forex))
        .await
        .expect("aggregation failed");

    assert_eq!(rate.rate, 1.05);
    assert_eq!(rate.quote_count, 1);
}
