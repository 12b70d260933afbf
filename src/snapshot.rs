use crate::messaging::{ContentRequest, ContentResponse, PageInfo, MAX_HEADINGS};
use chrono::Utc;
use scraper::{Html, Selector};
use serde_json::Value;

/// A loaded page as the content script sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub url: String,
    pub html: String,
}

impl PageSource {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// Reads title, first headings and meta description out of the page markup.
pub fn capture(page: &PageSource) -> PageInfo {
    let document = Html::parse_document(&page.html);

    let title = select_texts(&document, "title", 1)
        .into_iter()
        .next()
        .map(|text| collapse_whitespace(&text))
        .unwrap_or_default();
    let headings = select_texts(&document, "h1, h2, h3", usize::MAX)
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .take(MAX_HEADINGS)
        .collect();
    let meta_description = select_attr(&document, r#"meta[name="description"]"#, "content").unwrap_or_default();

    PageInfo {
        title,
        url: page.url.clone(),
        headings,
        meta_description,
        timestamp: Utc::now(),
    }
}

fn select_texts(document: &Html, css: &str, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    let texts = document
        .select(&selector)
        .take(limit)
        .map(|element| element.text().collect::<String>())
        .collect::<Vec<_>>();
    texts
}

fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let value = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr).map(ToString::to_string));
    value
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Endpoint living inside an inspected page.
#[derive(Debug, Clone)]
pub struct ContentScript {
    page: PageSource,
}

impl ContentScript {
    /// Loads the script into a page; this always performs one diagnostic capture.
    pub fn attach(page: PageSource) -> Self {
        let script = Self { page };
        script.log_page_info("auto capture");
        script
    }

    pub fn page(&self) -> &PageSource {
        &self.page
    }

    /// Replies to recognised requests; anything else gets no reply.
    pub fn handle_message(&self, message: &Value) -> Option<Value> {
        match serde_json::from_value::<ContentRequest>(message.clone()) {
            Ok(ContentRequest::LogPage) => {
                let info = self.log_page_info("manual trigger");
                serde_json::to_value(ContentResponse::success(info)).ok()
            }
            Err(_) => None,
        }
    }

    fn log_page_info(&self, reason: &str) -> PageInfo {
        let info = capture(&self.page);
        let meta_description = if info.meta_description.is_empty() {
            "N/A"
        } else {
            info.meta_description.as_str()
        };
        tracing::info!(
            reason,
            title = %info.title,
            url = %info.url,
            meta_description,
            headings = ?info.headings,
            captured_at = %info.timestamp.to_rfc3339(),
            "page snapshot"
        );
        info
    }
}

#[cfg(test)]
mod tests {
    use super::{capture, ContentScript, PageSource};
    use crate::messaging::ContentResponse;
    use serde_json::json;

    #[test]
    fn four_h2_headings_are_returned_in_order_trimmed() {
        let page = PageSource::new(
            "https://example.test/faq",
            "<html><head><title> FAQ \n page </title></head><body>
               <h2> One </h2><p>x</p><h2>Two</h2><div><h2>\tThree</h2></div><h2>Four  </h2>
             </body></html>",
        );
        let info = capture(&page);
        assert_eq!(info.title, "FAQ page");
        assert_eq!(info.url, "https://example.test/faq");
        assert_eq!(info.headings, vec!["One", "Two", "Three", "Four"]);
        assert_eq!(info.meta_description, "");
    }

    #[test]
    fn headings_skip_empty_ones_and_stop_at_five() {
        let page = PageSource::new(
            "https://example.test",
            "<body><h1>A</h1><h2>  </h2><h3>B</h3><h4>ignored</h4><h2>C</h2><h1>D</h1><h3>E</h3><h2>F</h2></body>",
        );
        let info = capture(&page);
        assert_eq!(info.headings, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn meta_description_is_read_from_named_meta() {
        let page = PageSource::new(
            "https://example.test",
            r#"<head><meta name="keywords" content="k"><meta name="description" content="Help centre"></head>"#,
        );
        assert_eq!(capture(&page).meta_description, "Help centre");
    }

    #[test]
    fn log_page_request_gets_success_reply() {
        let script = ContentScript::attach(PageSource::new("https://example.test", "<title>T</title>"));
        let reply = script
            .handle_message(&json!({ "type": "SUPPORT_ASSISTANT_LOG_PAGE" }))
            .expect("reply");
        let response: ContentResponse = serde_json::from_value(reply.clone()).expect("decode");
        assert!(response.ok);
        assert_eq!(response.info.expect("info").title, "T");
        assert!(reply["info"]["metaDescription"].is_string());
    }

    #[test]
    fn unknown_requests_get_no_reply() {
        let script = ContentScript::attach(PageSource::new("https://example.test", ""));
        assert!(script.handle_message(&json!({ "type": "OTHER" })).is_none());
        assert!(script.handle_message(&json!(null)).is_none());
    }
}
