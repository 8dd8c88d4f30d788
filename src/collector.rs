//! Marketplace Collector.
//!
//! Runs a fixed list of keyword queries against the sold-listings search
//! endpoint, classifies and matches each item, and emits accepted `Sale`s.
//! A failed query or unparseable page simply contributes fewer sales; no
//! error in this module is ever fatal to the run.

use crate::http::{HttpFetcher, Throttle};
use crate::matcher::match_title;
use crate::model::{Bucket, Card, Sale};
use crate::title_parser::{detect_grading_bucket, is_likely_lot, parse_eur_price, DetectedBucket};
use chrono::{DateTime, Utc};
use log::debug;
use scraper::{Html, Selector};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub keyword: String,
    pub graded_only: bool,
}

struct ListingRow {
    title: String,
    url: String,
    price_eur: Option<f64>,
}

pub struct Collector {
    fetcher: HttpFetcher,
    base_url: String,
    category: String,
    pages_per_query: u32,
    confidence_threshold: f64,
    query_throttle: Throttle,
}

impl Collector {
    pub fn new(
        fetcher: HttpFetcher,
        base_url: impl Into<String>,
        category: impl Into<String>,
        pages_per_query: u32,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            category: category.into(),
            pages_per_query,
            confidence_threshold,
            // Paginated calls pause ~200ms every 6 pages.
            query_throttle: Throttle::new(6, Duration::from_millis(200)),
        }
    }

    pub async fn collect(&self, queries: &[QuerySpec], catalog: &[Card], now: DateTime<Utc>) -> Vec<Sale> {
        let mut sales = Vec::new();

        for query in queries {
            for page in 1..=self.pages_per_query {
                self.query_throttle.tick().await;

                let url = self.build_search_url(query, page);
                let Some(html) = self.fetcher.fetch_html(&url).await else {
                    debug!("collector: query {:?} page {page} unreadable, skipping", query.keyword);
                    continue;
                };

                for row in parse_listing_rows(&html) {
                    if let Some(sale) = self.classify_and_match(query, row, catalog, now) {
                        sales.push(sale);
                    }
                }
            }
        }

        sales
    }

    fn classify_and_match(
        &self,
        query: &QuerySpec,
        row: ListingRow,
        catalog: &[Card],
        now: DateTime<Utc>,
    ) -> Option<Sale> {
        if is_likely_lot(&row.title) {
            return None;
        }

        let detected = detect_grading_bucket(&row.title);
        if query.graded_only && !matches!(detected, Some(DetectedBucket::Known(_))) {
            return None;
        }

        let bucket = match detected {
            Some(DetectedBucket::Known(bucket)) => bucket,
            Some(DetectedBucket::Unknown) => return None,
            None => Bucket::Raw,
        };

        let outcome = match_title(&row.title, catalog);
        if !outcome.is_acceptable(self.confidence_threshold) {
            return None;
        }

        let price_eur = row.price_eur.or_else(|| parse_eur_price(&row.title))?;
        if !(price_eur > 0.0) {
            return None;
        }

        Some(Sale {
            collected_at: now,
            source: "marketplace".to_string(),
            title: row.title,
            url: row.url,
            price_eur,
            card_id: outcome.card_id?,
            bucket,
        })
    }

    fn build_search_url(&self, query: &QuerySpec, page: u32) -> String {
        let keyword = query.keyword.replace(' ', "+");
        let mut url = format!(
            "{}?_nkw={keyword}&LH_Sold=1&LH_Complete=1&rt=nc&_pgn={page}&_sacat={}",
            self.base_url, self.category
        );
        if query.graded_only {
            url.push_str("&LH_ItemCondition=2750");
        }
        url
    }
}

fn parse_listing_rows(html: &str) -> Vec<ListingRow> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse(".s-item").unwrap();
    let title_selector = Selector::parse(".s-item__title").unwrap();
    let link_selector = Selector::parse(".s-item__link").unwrap();
    let price_selector = Selector::parse(".s-item__price").unwrap();

    let mut rows = Vec::new();
    for item in document.select(&item_selector) {
        let Some(title_el) = item.select(&title_selector).next() else { continue };
        let title: String = title_el.text().collect::<Vec<_>>().join("").trim().to_string();
        if title.is_empty() {
            continue;
        }

        let Some(url) = item
            .select(&link_selector)
            .next()
            .and_then(|el| el.value().attr("href"))
        else {
            continue;
        };

        let price_text = item
            .select(&price_selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(""));
        let price_eur = price_text.and_then(|text| parse_eur_price(&text));

        rows.push(ListingRow {
            title,
            url: url.to_string(),
            price_eur,
        });
    }
    rows
}
