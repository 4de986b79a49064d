use crate::core::currency::CurrencyRateProvider;
use crate::core::error::FetchError;
use crate::core::site::{Site, SiteRepository, SiteSummary};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

#[derive(Debug, Deserialize)]
struct ConversionResponse {
    ratio: f64,
}

/// Marketplace API client serving both sites and currency conversions.
#[derive(Clone)]
pub struct MercadoLibreProvider {
    base_url: String,
    client: reqwest::Client,
}

impl MercadoLibreProvider {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent("sitefx/1.0");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::transport(base_url, e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to parse response");
            FetchError::decode(url, e)
        })
    }
}

#[async_trait]
impl SiteRepository for MercadoLibreProvider {
    #[instrument(name = "ListSites", skip(self))]
    async fn list_sites(&self) -> Result<Vec<SiteSummary>, FetchError> {
        let url = format!("{}/sites", self.base_url);
        let sites: Vec<SiteSummary> = self.get_json(&url).await?;
        debug!("Found sites: {}", sites.len());
        Ok(sites)
    }

    #[instrument(name = "GetSite", skip(self))]
    async fn get_site(&self, id: &str) -> Result<Site, FetchError> {
        let endpoint = format!("{}/sites", self.base_url);
        let mut url = Url::parse(&endpoint).map_err(|e| FetchError::transport(&endpoint, e))?;
        // push encodes '/', '?' and '#' so the id stays a single segment
        url.path_segments_mut()
            .map_err(|_| FetchError::transport(&endpoint, "base URL cannot carry a path"))?
            .push(id);

        self.get_json(url.as_str()).await
    }
}

#[async_trait]
impl CurrencyRateProvider for MercadoLibreProvider {
    #[instrument(name = "ConvertCurrency", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, FetchError> {
        let endpoint = format!("{}/currency_conversions/search", self.base_url);
        let url = Url::parse_with_params(&endpoint, &[("from", from), ("to", to)])
            .map_err(|e| FetchError::transport(&endpoint, e))?;

        let conversion: ConversionResponse = self.get_json(url.as_str()).await?;
        Ok(conversion.ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(request_path: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(server: &MockServer) -> MercadoLibreProvider {
        MercadoLibreProvider::new(&server.uri(), Some(Duration::from_secs(5))).unwrap()
    }

    #[tokio::test]
    async fn test_list_sites() {
        let mock_response = r#"[
            {"default_currency_id": "ARS", "id": "MLA", "name": "Argentina"},
            {"default_currency_id": "BRL", "id": "MLB", "name": "Brasil"}
        ]"#;
        let mock_server = create_mock_server("/sites", mock_response).await;

        let sites = provider(&mock_server).list_sites().await.unwrap();
        assert_eq!(
            sites,
            vec![
                SiteSummary {
                    id: "MLA".to_string(),
                    name: "Argentina".to_string()
                },
                SiteSummary {
                    id: "MLB".to_string(),
                    name: "Brasil".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_get_site() {
        let mock_response = r#"{
            "id": "MLA",
            "name": "Argentina",
            "country_id": "AR",
            "sale_fees_mode": "not_free",
            "mercadopago_version": 3,
            "default_currency_id": "ARS"
        }"#;
        let mock_server = create_mock_server("/sites/MLA", mock_response).await;

        let site = provider(&mock_server).get_site("MLA").await.unwrap();
        assert_eq!(site.id, "MLA");
        assert_eq!(site.name, "Argentina");
        assert_eq!(site.country_id, "AR");
        assert_eq!(site.default_currency_id, "ARS");
    }

    #[tokio::test]
    async fn test_site_id_is_a_single_path_segment() {
        let mock_response = r#"{"id": "ML/A", "name": "Odd", "country_id": "AR", "default_currency_id": "ARS"}"#;
        let mock_server = create_mock_server("/sites/ML%2FA%3Fx", mock_response).await;

        let site = provider(&mock_server).get_site("ML/A?x").await.unwrap();
        assert_eq!(site.id, "ML/A");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.path(), "/sites/ML%2FA%3Fx");
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_get_rate() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "currency_base": "Peso argentino",
            "currency_quote": "Dólar",
            "ratio": 0.0025,
            "rate": 0.0025,
            "inv_rate": 400.0
        }"#;

        Mock::given(method("GET"))
            .and(path("/currency_conversions/search"))
            .and(query_param("from", "ARS"))
            .and(query_param("to", "USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let rate = provider(&mock_server).get_rate("ARS", "USD").await.unwrap();
        assert_eq!(rate, 0.0025);
    }

    #[tokio::test]
    async fn test_server_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sites"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).list_sites().await;
        assert_eq!(
            result.unwrap_err(),
            FetchError::Status {
                url: format!("{}/sites", mock_server.uri()),
                status: 500,
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_site_response() {
        // "currency" instead of "default_currency_id"
        let mock_response = r#"{"id": "MLA", "name": "Argentina", "country_id": "AR", "currency": "ARS"}"#;
        let mock_server = create_mock_server("/sites/MLA", mock_response).await;

        let result = provider(&mock_server).get_site("MLA").await;
        let err = result.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.to_string().contains("Failed to parse JSON response for"));
    }

    #[tokio::test]
    async fn test_missing_ratio_is_decode_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/currency_conversions/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"message": "not found"}"#),
            )
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server).get_rate("VES", "USD").await;
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let result = MercadoLibreProvider::new("http://127.0.0.1:1", None)
            .unwrap()
            .list_sites()
            .await;
        assert!(matches!(result, Err(FetchError::Transport { .. })));
    }
}
