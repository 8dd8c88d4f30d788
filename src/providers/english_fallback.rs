//! English fallback adapter: the dual-language structured walk restricted
//! to `en`, used only when the English primary adapter fails outright.

use super::PartialRecord;
use crate::error::PipelineResult;
use crate::http::HttpFetcher;
use std::collections::HashMap;

use super::tcgdex::TcgdexAdapter;

pub struct EnglishFallbackAdapter {
    inner: TcgdexAdapter,
}

impl EnglishFallbackAdapter {
    pub fn new(fetcher: HttpFetcher, base_url: impl Into<String>) -> Self {
        Self {
            inner: TcgdexAdapter::new(fetcher, base_url),
        }
    }

    pub async fn fetch_all(&self) -> PipelineResult<HashMap<(String, String), PartialRecord>> {
        self.inner.walk(&["en"]).await
    }
}
