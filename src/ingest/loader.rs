// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document loaders: web pages, PDFs and plain text

use scraper::{Html, Selector};
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::error::IndexError;

/// Fetch a web page and reduce it to plain text.
pub async fn load_webpage(client: &reqwest::Client, url: &str) -> Result<String, IndexError> {
    let url = Url::parse(url).map_err(|e| IndexError::Provider(format!("invalid URL: {}", e)))?;

    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(IndexError::Provider(format!(
            "fetching {} returned {}",
            url, status
        )));
    }

    let html = response.text().await?;
    let text = extract_body_text(&html);
    debug!("Loaded {} chars from {}", text.len(), url);

    Ok(text)
}

/// Extract visible text from an HTML document, tags stripped and
/// whitespace normalized.
fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return clean_text(&body.text().collect::<Vec<_>>().join(" "));
        }
    }

    // Fragments without a <body> still carry text worth indexing.
    clean_text(
        &document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read a plain-text file.
pub fn load_text(path: &Path) -> Result<String, IndexError> {
    std::fs::read_to_string(path).map_err(IndexError::provider)
}

/// Extract the text of every page of a PDF.
pub fn load_pdf(path: &Path) -> Result<String, IndexError> {
    pdf_extract::extract_text(path).map_err(IndexError::provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html>
        <head><title>Ignored</title></head>
        <body>
            <h1>Reading  Practice</h1>
            <p>Short passage
            about dinosaurs.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_body_text_strips_tags() {
        let text = extract_body_text(SAMPLE_HTML);
        assert_eq!(text, "Reading Practice Short passage about dinosaurs.");
    }

    #[test]
    fn test_extract_handles_fragment_without_body() {
        let text = extract_body_text("<p>just a fragment</p>");
        assert!(text.contains("just a fragment"));
    }

    #[test]
    fn test_clean_text_normalizes_whitespace() {
        assert_eq!(clean_text("  a \n\n b   c "), "a b c");
    }
}
