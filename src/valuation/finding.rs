use crate::http::build_client;
use crate::valuation::config::FindingConfig;
use crate::valuation::price::parse_amount;
use crate::valuation::{PriceLookup, PriceQuote, PriceSource, SearchQuery, ValuationError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

// Finding API JSON wraps every field in a single-element array.

#[derive(Debug, Default, Deserialize)]
struct FindingEnvelope {
    #[serde(rename = "findCompletedItemsResponse", default)]
    response: Vec<CompletedItemsResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletedItemsResponse {
    #[serde(rename = "searchResult", default)]
    search_result: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    item: Vec<CompletedItem>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletedItem {
    #[serde(rename = "sellingStatus", default)]
    selling_status: Vec<SellingStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct SellingStatus {
    #[serde(rename = "currentPrice", default)]
    current_price: Vec<Amount>,
}

#[derive(Debug, Default, Deserialize)]
struct Amount {
    #[serde(rename = "__value__", default)]
    value: Option<String>,
}

impl FindingEnvelope {
    fn into_quote(self) -> PriceQuote {
        self.response
            .into_iter()
            .next()
            .and_then(|response| response.search_result.into_iter().next())
            .map(|result| result.item)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                let status = item.selling_status.into_iter().next()?;
                let amount = status.current_price.into_iter().next()?;
                parse_amount(amount.value.as_deref()?)
            })
            .collect()
    }
}

/// Sold prices from the marketplace's completed-items search API.
pub struct FindingApiSource {
    http: Client,
    config: FindingConfig,
}

impl FindingApiSource {
    pub fn new(config: FindingConfig) -> Self {
        Self::with_client(config, build_client())
    }

    pub fn with_client(config: FindingConfig, http: Client) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl PriceSource for FindingApiSource {
    fn name(&self) -> &'static str {
        "finding_api"
    }

    async fn fetch_prices(&self, query: &SearchQuery) -> Result<PriceLookup, ValuationError> {
        if self.config.app_id.trim().is_empty() {
            return Err(ValuationError::MissingCredentials);
        }
        let keywords = query.keywords();
        let response = self
            .http
            .get(self.config.endpoint.as_str())
            .query(&[
                ("OPERATION-NAME", "findCompletedItems"),
                ("SERVICE-VERSION", "1.0.0"),
                ("SECURITY-APPNAME", self.config.app_id.as_str()),
                ("RESPONSE-DATA-FORMAT", "JSON"),
                ("REST-PAYLOAD", ""),
                ("keywords", keywords.as_str()),
                ("itemFilter(0).name", "SoldItemsOnly"),
                ("itemFilter(0).value", "true"),
                ("sortOrder", "EndTimeSoonest"),
            ])
            .send()
            .await
            .map_err(|err| ValuationError::Query(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ValuationError::Query(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let envelope: FindingEnvelope = response
            .json()
            .await
            .map_err(|err| ValuationError::Query(err.to_string()))?;
        Ok(PriceLookup::Quote(envelope.into_quote()))
    }
}
