use crate::valuation::config::ScrapeConfig;
use crate::valuation::price::parse_price_label;
use crate::valuation::render::{RenderSession, Renderer};
use crate::valuation::{PriceLookup, PriceQuote, PriceSource, SearchQuery, ValuationError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

/// Container of the sold-listing result list; its absence means the search had no hits.
pub const RESULTS_SELECTOR: &str = "ul.srp-results";

static PRICE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.s-item__price").expect("static price selector"));

/// Sold prices read off the marketplace's rendered sold-listings page.
pub struct SoldListingsScraper<R> {
    renderer: R,
    config: ScrapeConfig,
}

impl<R: Renderer> SoldListingsScraper<R> {
    pub fn new(renderer: R, config: ScrapeConfig) -> Self {
        Self { renderer, config }
    }

    pub fn search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}?_nkw={}&LH_Complete=1&LH_Sold=1",
            self.config.search_url,
            urlencoding::encode(&query.keywords())
        )
    }

    async fn scrape(
        &self,
        session: &mut R::Session,
        url: &str,
    ) -> Result<PriceLookup, ValuationError> {
        session.goto(url).await?;
        if !session
            .wait_for(RESULTS_SELECTOR, self.config.wait_timeout)
            .await?
        {
            debug!(target = "media.valuation", url = %url, "results_container_timeout");
            return Ok(PriceLookup::NoListings);
        }
        let html = session.content().await?;
        Ok(PriceLookup::Quote(extract_prices(
            &html,
            self.config.max_candidates,
        )))
    }
}

#[async_trait]
impl<R: Renderer> PriceSource for SoldListingsScraper<R> {
    fn name(&self) -> &'static str {
        "sold_listings_page"
    }

    async fn fetch_prices(&self, query: &SearchQuery) -> Result<PriceLookup, ValuationError> {
        let url = self.search_url(query);
        let mut session = self.renderer.open().await?;
        let result = self.scrape(&mut session, &url).await;
        session.close().await;
        result
    }
}

/// Parses the first `limit` price labels of a results page, in document order.
/// Labels that do not parse still count against the limit.
pub fn extract_prices(html: &str, limit: usize) -> PriceQuote {
    let document = Html::parse_document(html);
    document
        .select(&PRICE_SELECTOR)
        .take(limit)
        .filter_map(|node| parse_price_label(&node.text().collect::<String>()))
        .collect()
}
