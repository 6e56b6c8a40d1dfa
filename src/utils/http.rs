use crate::error::FeedError;
use crate::query::PageResponse;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

/// `base` with a `page` query parameter appended.
pub fn page_url(base: &str, page: u32) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", base, separator, page)
}

pub fn parse_page<T: DeserializeOwned>(body: &str) -> Result<PageResponse<T>, FeedError> {
    Ok(serde_json::from_str(body)?)
}

/// GETs `url` and decodes a `{ "data": [...] }` document.
pub async fn fetch_page_json<T: DeserializeOwned>(
    url: &str,
) -> Result<PageResponse<T>, FeedError> {
    let window = web_sys::window().ok_or_else(|| FeedError::Js("No window".into()))?;

    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .unchecked_into();
    if !response.ok() {
        return Err(FeedError::Fetch(format!(
            "{} {} ({})",
            response.status(),
            response.status_text(),
            url
        )));
    }

    let body = JsFuture::from(response.text()?).await?;
    let body = body
        .as_string()
        .ok_or_else(|| FeedError::Decode("response body is not text".into()))?;
    parse_page(&body)
}
