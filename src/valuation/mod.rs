//! Resale-value estimation from recent sold listings.
//!
//! A [`PriceSource`] turns a [`SearchQuery`] into the sold prices it can find;
//! [`estimate`] owns the aggregation so the structured API and the rendered
//! page share one averaging and rounding rule.

pub mod config;
pub mod finding;
pub mod price;
pub mod render;
pub mod scrape;

use crate::error::ServiceError;
use crate::metrics;
use async_trait::async_trait;
use render::RenderError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("a title is required to search for a value")]
    EmptyTitle,
    #[error("missing marketplace application id in env")]
    MissingCredentials,
    #[error("marketplace query failed: {0}")]
    Query(String),
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),
}

impl From<ValuationError> for ServiceError {
    fn from(value: ValuationError) -> Self {
        match value {
            ValuationError::EmptyTitle => ServiceError::invalid_argument(
                "valuation",
                "A title is required to search for a value.",
            ),
            ValuationError::MissingCredentials => ServiceError::upstream_auth(
                "valuation",
                "missing marketplace application id in env",
            ),
            ValuationError::Query(msg) => ServiceError::upstream_query("valuation", msg),
            ValuationError::Render(err) => ServiceError::internal(
                "valuation",
                format!("An error occurred while running the agent: {err}"),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    title: String,
    platform: Option<String>,
}

impl SearchQuery {
    pub fn new(title: &str, platform: Option<&str>) -> Result<Self, ValuationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValuationError::EmptyTitle);
        }
        let platform = platform
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Ok(Self {
            title: title.to_string(),
            platform,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Title and platform joined by a space, as typed into a marketplace search box.
    pub fn keywords(&self) -> String {
        match &self.platform {
            Some(platform) => format!("{} {}", self.title, platform),
            None => self.title.clone(),
        }
    }
}

/// Amounts extracted from a single marketplace response, in response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuote(Vec<Decimal>);

impl PriceQuote {
    pub fn new(amounts: Vec<Decimal>) -> Self {
        Self(amounts)
    }

    pub fn amounts(&self) -> &[Decimal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mean(&self) -> Option<Decimal> {
        price::rounded_mean(&self.0)
    }
}

impl FromIterator<Decimal> for PriceQuote {
    fn from_iter<I: IntoIterator<Item = Decimal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceLookup {
    Quote(PriceQuote),
    /// The marketplace showed no sold-listing results at all.
    NoListings,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_prices(&self, query: &SearchQuery) -> Result<PriceLookup, ValuationError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValueEstimate {
    pub estimated_price: Decimal,
    pub sample_size: usize,
    pub source: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    NoListings,
    NoPrices,
}

impl NotFoundReason {
    pub fn message(&self) -> &'static str {
        match self {
            NotFoundReason::NoListings => {
                "Could not find any sold listings that match the search query."
            }
            NotFoundReason::NoPrices => {
                "Could not determine a market value. No recent sales found."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueOutcome {
    Estimated(ValueEstimate),
    NotFound(NotFoundReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPhase {
    Idle,
    Requesting,
    Parsing,
    Estimated,
    NotFound,
    Failed,
}

impl LookupPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LookupPhase::Estimated | LookupPhase::NotFound | LookupPhase::Failed
        )
    }

    pub fn can_advance_to(self, next: LookupPhase) -> bool {
        matches!(
            (self, next),
            (LookupPhase::Idle, LookupPhase::Requesting)
                | (LookupPhase::Requesting, LookupPhase::Parsing)
                | (LookupPhase::Requesting, LookupPhase::Failed)
                | (LookupPhase::Parsing, LookupPhase::Estimated)
                | (LookupPhase::Parsing, LookupPhase::NotFound)
        )
    }

    fn label(self) -> &'static str {
        match self {
            LookupPhase::Idle => "idle",
            LookupPhase::Requesting => "requesting",
            LookupPhase::Parsing => "parsing",
            LookupPhase::Estimated => "estimated",
            LookupPhase::NotFound => "not_found",
            LookupPhase::Failed => "failed",
        }
    }
}

struct Lookup {
    source: &'static str,
    phase: LookupPhase,
    started: Instant,
}

impl Lookup {
    fn start(source: &'static str) -> Self {
        Self {
            source,
            phase: LookupPhase::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: LookupPhase) {
        debug_assert!(self.phase.can_advance_to(next));
        debug!(
            target = "media.valuation",
            source = self.source,
            from = self.phase.label(),
            to = next.label(),
            "lookup_phase"
        );
        self.phase = next;
        if next.is_terminal() {
            metrics::lookup_elapsed(self.source, next.label(), self.started.elapsed().as_millis());
        }
    }
}

/// Runs one lookup against `source` and averages whatever prices it yields.
///
/// An empty result is a normal [`ValueOutcome::NotFound`], never an error.
pub async fn estimate(
    source: &dyn PriceSource,
    query: &SearchQuery,
) -> Result<ValueOutcome, ValuationError> {
    let mut lookup = Lookup::start(source.name());
    lookup.advance(LookupPhase::Requesting);

    let fetched = match source.fetch_prices(query).await {
        Ok(fetched) => fetched,
        Err(err) => {
            lookup.advance(LookupPhase::Failed);
            warn!(
                target = "media.valuation",
                source = source.name(),
                keywords = %query.keywords(),
                error = %err,
                "value_lookup_failed"
            );
            return Err(err);
        }
    };

    lookup.advance(LookupPhase::Parsing);
    let outcome = match fetched {
        PriceLookup::NoListings => ValueOutcome::NotFound(NotFoundReason::NoListings),
        PriceLookup::Quote(quote) => match quote.mean() {
            Some(mean) => ValueOutcome::Estimated(ValueEstimate {
                estimated_price: mean,
                sample_size: quote.len(),
                source: source.name(),
            }),
            None => ValueOutcome::NotFound(NotFoundReason::NoPrices),
        },
    };

    match &outcome {
        ValueOutcome::Estimated(estimate) => {
            lookup.advance(LookupPhase::Estimated);
            info!(
                target = "media.valuation",
                source = source.name(),
                keywords = %query.keywords(),
                estimated_price = %estimate.estimated_price,
                sample_size = estimate.sample_size,
                "value_estimated"
            );
        }
        ValueOutcome::NotFound(reason) => {
            lookup.advance(LookupPhase::NotFound);
            info!(
                target = "media.valuation",
                source = source.name(),
                keywords = %query.keywords(),
                reason = ?reason,
                "value_not_found"
            );
        }
    }
    Ok(outcome)
}
