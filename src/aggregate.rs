//! Aggregator.
//!
//! Groups retained sales by card, then by bucket, and computes a median
//! price per group. Only the six canonical bucket keys are ever emitted.

use crate::model::{Bucket, PriceAggregate, Sale};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::HashMap;

pub type PricesByCard = IndexMap<String, IndexMap<&'static str, PriceAggregate>>;

pub fn aggregate_prices(sales: &[Sale]) -> PricesByCard {
    let mut grouped: HashMap<&str, HashMap<Bucket, Vec<f64>>> = HashMap::new();

    for sale in sales {
        grouped
            .entry(sale.card_id.as_str())
            .or_default()
            .entry(sale.bucket)
            .or_default()
            .push(sale.price_eur);
    }

    // Each card's six medians are independent of every other card's, so a
    // catalog-wide aggregation run (which can cover thousands of cards) fans
    // the per-card reduction out across threads rather than sorting every
    // group on a single core.
    let mut rows: Vec<(String, IndexMap<&'static str, PriceAggregate>)> = grouped
        .into_par_iter()
        .map(|(card_id, by_bucket)| {
            let mut entry = IndexMap::new();
            for bucket in Bucket::CANONICAL {
                let prices = by_bucket.get(&bucket).map(Vec::as_slice).unwrap_or(&[]);
                entry.insert(bucket.key(), median_aggregate(prices));
            }
            (card_id.to_string(), entry)
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    rows.into_iter().collect()
}

fn median_aggregate(prices: &[f64]) -> PriceAggregate {
    let mut finite: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
    if finite.is_empty() {
        return PriceAggregate::EMPTY;
    }

    finite.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = finite.len();
    let median = if n % 2 == 1 {
        finite[n / 2]
    } else {
        (finite[n / 2 - 1] + finite[n / 2]) / 2.0
    };

    PriceAggregate {
        median_eur: Some(median),
        n,
    }
}
