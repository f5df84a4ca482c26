use tracing::{info, warn};

/// Something that can yield one page of raw review data. `None` means the
/// page could not be retrieved (transport failure or non-200); the caller
/// decides whether that ends pagination.
pub trait ReviewSource {
    async fn fetch_page(&self, page: u32) -> Option<String>;
}

/// The Apple customer-reviews RSS feed. Public, unauthenticated, paginated;
/// pages are 1-based. One GET per call, no retries.
pub struct AppleApi {
    client: reqwest::Client,
    app_id: u64,
    country: String,
}

impl AppleApi {
    pub fn new(app_id: u64, country: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            app_id,
            country: country.to_string(),
        }
    }

    fn page_url(&self, page: u32) -> String {
        format!(
            "https://itunes.apple.com/{}/rss/customerreviews/page={}/id={}/sortBy=mostRecent/json",
            self.country, page, self.app_id
        )
    }
}

impl ReviewSource for AppleApi {
    async fn fetch_page(&self, page: u32) -> Option<String> {
        let url = self.page_url(page);
        info!("Fetching reviews page {} for app {}", page, self.app_id);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Request failed for page {}: {}", page, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Error retrieving reviews page {}: HTTP {}", page, status);
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Failed to read body for page {}: {}", page, e);
                None
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_carries_country_page_and_app_id() {
        let api = AppleApi::new(1234567890, "gb");
        let url = api.page_url(3);
        assert_eq!(
            url,
            "https://itunes.apple.com/gb/rss/customerreviews/page=3/id=1234567890/sortBy=mostRecent/json"
        );
    }
}
