//! Japanese HTML-index adapter (`split` strategy, Japanese half).
//!
//! Three steps: fetch the set index and pull out set ids; for each set,
//! fetch its listing page and pull out one row per card link; for rows
//! whose visible text isn't actually Japanese, fetch the per-card detail
//! page only when the species cache hasn't already resolved a translation.

use super::PartialRecord;
use crate::cache::SpeciesCache;
use crate::error::{PipelineError, PipelineResult};
use crate::http::{HttpFetcher, Throttle};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;

static SET_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/cards/jp/([A-Za-z0-9]+)/?$").unwrap());
static DEX_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:national\s+)?pok[ée]dex[:\s#]*(\d+)").unwrap());
static IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cards?|image|img").unwrap());

/// True if any char falls in the hiragana/katakana or CJK-unified-ideograph
/// ranges — used to tell an actual Japanese name from a romanized stand-in.
fn has_japanese_script(s: &str) -> bool {
    s.chars().any(|c| {
        let cp = c as u32;
        (0x3040..=0x30FF).contains(&cp) || (0x3400..=0x9FFF).contains(&cp)
    })
}

fn card_link_re(set_id: &str) -> Regex {
    Regex::new(&format!(r"^/cards/jp/{}/([A-Za-z0-9]+)/?$", regex::escape(set_id))).unwrap()
}

struct CardRowHtml {
    number: String,
    link_text: Option<String>,
    title: Option<String>,
    aria_label: Option<String>,
    adjacent_cell_text: Option<String>,
    image_src: Option<String>,
    detail_url: String,
}

pub struct JapaneseIndexAdapter {
    fetcher: HttpFetcher,
    base_url: String,
    detail_throttle: Throttle,
}

impl JapaneseIndexAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            // Detail fetches pause ~700ms every 40 requests.
            detail_throttle: Throttle::new(40, Duration::from_millis(700)),
        }
    }

    pub async fn walk(
        &self,
        species_cache: &SpeciesCache,
        image_map: &HashMap<String, HashMap<String, String>>,
    ) -> PipelineResult<HashMap<(String, String), PartialRecord>> {
        let mut out: HashMap<(String, String), PartialRecord> = HashMap::new();

        let index_url = format!("{}/cards/jp", self.base_url);
        let index_html = self.fetcher.fetch_html(&index_url).await.ok_or_else(|| {
            PipelineError::SourceFatal("japanese index adapter: could not fetch set index".to_string())
        })?;

        let set_ids = Self::parse_set_ids(&index_html);
        if set_ids.is_empty() {
            return Err(PipelineError::SourceFatal(
                "japanese index adapter: set index yielded no sets".to_string(),
            ));
        }

        for set_id in set_ids {
            let set_url = format!("{}/cards/jp/{set_id}", self.base_url);
            let Some(set_html) = self.fetcher.fetch_html(&set_url).await else {
                continue;
            };

            let rows = Self::parse_card_rows(&set_html, &set_id, &self.base_url);
            let set_image_map = image_map.get(&set_id);

            for row in rows {
                let mut name_ja = row
                    .link_text
                    .clone()
                    .unwrap_or_else(|| row.number.clone());

                for candidate in [&row.title, &row.aria_label, &row.link_text, &row.adjacent_cell_text] {
                    if let Some(text) = candidate {
                        if has_japanese_script(text) {
                            name_ja = text.clone();
                            break;
                        }
                    }
                }

                let mut dex_id = None;
                let mut detail_image = None;
                let already_resolved = species_cache.get(&name_ja).await.is_some();
                if !has_japanese_script(&name_ja) && !already_resolved {
                    self.detail_throttle.tick().await;
                    if let Some(detail_html) = self.fetcher.fetch_html(&row.detail_url).await {
                        let (detail_name, detail_dex, detail_img) = Self::parse_detail(&detail_html);
                        if let Some(detail_name) = detail_name.filter(|n| has_japanese_script(n)) {
                            name_ja = detail_name;
                        }
                        dex_id = detail_dex;
                        detail_image = detail_img.map(|src| resolve_url(&self.base_url, &src));
                    }
                }

                let image_large = set_image_map
                    .and_then(|m| m.get(&row.number).cloned())
                    .or_else(|| row.image_src.clone())
                    .or(detail_image);

                let partial = PartialRecord {
                    set_id: set_id.clone(),
                    set_name: set_id.clone(),
                    number: row.number.clone(),
                    name_ja: Some(name_ja),
                    image_large,
                    dex_id_ja: dex_id,
                    detail_url_ja: Some(row.detail_url.clone()),
                    japanese_exclusive: true,
                    ..Default::default()
                };

                out.entry((set_id.clone(), row.number.clone()))
                    .and_modify(|existing| existing.merge(partial.clone()))
                    .or_insert(partial);
            }
        }

        Ok(out)
    }

    fn parse_set_ids(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let anchor_selector = Selector::parse("a[href]").unwrap();
        let mut seen = Vec::new();
        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else { continue };
            if let Some(caps) = SET_LINK_RE.captures(href) {
                let id = caps.get(1).unwrap().as_str().to_string();
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        seen
    }

    fn parse_card_rows(html: &str, set_id: &str, base_url: &str) -> Vec<CardRowHtml> {
        let document = Html::parse_document(html);
        let anchor_selector = Selector::parse("a[href]").unwrap();
        let img_selector = Selector::parse("img").unwrap();
        let td_selector = Selector::parse("td").unwrap();
        let link_re = card_link_re(set_id);

        let mut rows = Vec::new();
        for anchor in document.select(&anchor_selector) {
            let Some(href) = anchor.value().attr("href") else { continue };
            let Some(caps) = link_re.captures(href) else { continue };
            let number = caps.get(1).unwrap().as_str().to_string();

            let link_text = {
                let text: String = anchor.text().collect::<Vec<_>>().join("").trim().to_string();
                (!text.is_empty()).then_some(text)
            };
            let title = anchor.value().attr("title").map(str::to_string);
            let aria_label = anchor.value().attr("aria-label").map(str::to_string);

            let enclosing_row = anchor
                .ancestors()
                .find_map(|node| ElementRef::wrap(node).filter(|el| el.value().name() == "tr"));

            let mut image_src = None;
            let mut adjacent_cell_text = None;
            if let Some(row) = enclosing_row {
                image_src = row
                    .select(&img_selector)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .map(|s| resolve_url(base_url, s));
                adjacent_cell_text = row.select(&td_selector).find_map(|cell| {
                    let text: String = cell.text().collect::<Vec<_>>().join("").trim().to_string();
                    (!text.is_empty() && has_japanese_script(&text)).then_some(text)
                });
            }

            rows.push(CardRowHtml {
                number,
                link_text,
                title,
                aria_label,
                adjacent_cell_text,
                image_src,
                detail_url: resolve_url(base_url, href),
            });
        }
        rows
    }

    fn parse_detail(html: &str) -> (Option<String>, Option<u32>, Option<String>) {
        let document = Html::parse_document(html);

        let dex_id = DEX_NUMBER_RE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        let text_selector = Selector::parse("p, span, div, td, h1, h2, h3").unwrap();
        let name = document.select(&text_selector).find_map(|el| {
            let text: String = el.text().collect::<Vec<_>>().join("").trim().to_string();
            (has_japanese_script(&text) && text.chars().count() <= 40 && !text.is_empty()).then_some(text)
        });

        let image = Self::parse_detail_image(&document);

        (name, dex_id, image)
    }

    /// Prefers the page's open-graph image; falls back to the first `<img>`
    /// whose `src` looks like a card/product image rather than an icon.
    fn parse_detail_image(document: &Html) -> Option<String> {
        let og_selector = Selector::parse(r#"meta[property="og:image"]"#).unwrap();
        if let Some(content) = document
            .select(&og_selector)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            return Some(content.to_string());
        }

        let img_selector = Selector::parse("img[src]").unwrap();
        document.select(&img_selector).find_map(|el| {
            let src = el.value().attr("src")?;
            IMAGE_URL_RE.is_match(src).then(|| src.to_string())
        })
    }
}

fn resolve_url(base_url: &str, maybe_relative: &str) -> String {
    if maybe_relative.starts_with("http://") || maybe_relative.starts_with("https://") {
        maybe_relative.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), maybe_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn japanese_script_detection() {
        assert!(has_japanese_script("ピカチュウ"));
        assert!(has_japanese_script("メロエッタ"));
        assert!(!has_japanese_script("Pikachu"));
        assert!(!has_japanese_script("181"));
    }

    #[test]
    fn set_id_extraction_from_index_links() {
        let html = r#"<html><body>
            <a href="/cards/jp/sv9a">SV9a</a>
            <a href="/cards/jp/sv2a/">SV2a</a>
            <a href="/cards/en/base1">not a jp link</a>
        </body></html>"#;
        let ids = JapaneseIndexAdapter::parse_set_ids(html);
        assert_eq!(ids, vec!["sv9a".to_string(), "sv2a".to_string()]);
    }

    #[test]
    fn card_row_extraction_picks_up_image_and_text() {
        let html = r#"<html><body><table>
            <tr>
                <td><img src="/img/sv9a-181.png"></td>
                <td><a href="/cards/jp/sv9a/181" title="ピカチュウV">Pikachu V</a></td>
            </tr>
        </table></body></html>"#;
        let rows = JapaneseIndexAdapter::parse_card_rows(html, "sv9a", "http://example.test");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].number, "181");
        assert_eq!(rows[0].title.as_deref(), Some("ピカチュウV"));
        assert_eq!(
            rows[0].image_src.as_deref(),
            Some("http://example.test/img/sv9a-181.png")
        );
        assert_eq!(rows[0].detail_url, "http://example.test/cards/jp/sv9a/181");
    }

    #[test]
    fn detail_dex_number_extraction() {
        let html = "<html><body><p>National Pokédex: #25</p></body></html>";
        let (_, dex, _) = JapaneseIndexAdapter::parse_detail(html);
        assert_eq!(dex, Some(25));
    }

    #[test]
    fn detail_dex_number_extraction_without_national_prefix() {
        let html = "<html><body><p>Pokédex: #25</p></body></html>";
        let (_, dex, _) = JapaneseIndexAdapter::parse_detail(html);
        assert_eq!(dex, Some(25));
    }

    #[test]
    fn detail_image_prefers_og_meta_tag() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://example.test/og/sv9a-181.png">
        </head><body>
            <img src="https://example.test/icons/star.png">
        </body></html>"#;
        let (_, _, image) = JapaneseIndexAdapter::parse_detail(html);
        assert_eq!(image.as_deref(), Some("https://example.test/og/sv9a-181.png"));
    }

    #[test]
    fn detail_image_falls_back_to_first_matching_img() {
        let html = r#"<html><body>
            <img src="/icons/star.png">
            <img src="/cards/sv9a-181.png">
        </body></html>"#;
        let (_, _, image) = JapaneseIndexAdapter::parse_detail(html);
        assert_eq!(image.as_deref(), Some("/cards/sv9a-181.png"));
    }
}
