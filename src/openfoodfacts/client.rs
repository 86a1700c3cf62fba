use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{
    NutritionSource, SourceError,
    dto::{
        CategoriesResponse, ProductLookupResponse, ProductPageResponse, RemoteCategory,
        RemoteProduct,
    },
};
use crate::config::OpenFoodFactsConfig;

const USER_AGENT: &str = concat!("nutri-social-api/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Open Food Facts JSON API.
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    categories_url: String,
    product_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(config: &OpenFoodFactsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            categories_url: config.categories_url.clone(),
            product_url: config.product_url.clone(),
        })
    }

    pub fn page_url(category: &RemoteCategory, page: u32) -> String {
        format!("{}/{}.json", category.url.trim_end_matches('/'), page)
    }

    pub fn product_lookup_url(&self, code: &str) -> String {
        format!("{}{}.json", self.product_url, code)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| map_transport_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| map_transport_error(url, err))?;
        serde_json::from_slice(&body).map_err(|err| SourceError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl NutritionSource for OpenFoodFactsClient {
    async fn fetch_categories(&self) -> Result<Vec<RemoteCategory>, SourceError> {
        let response: CategoriesResponse = self.get_json(&self.categories_url).await?;
        Ok(response.tags)
    }

    async fn fetch_category_page(
        &self,
        category: &RemoteCategory,
        page: u32,
    ) -> Result<Vec<RemoteProduct>, SourceError> {
        let url = Self::page_url(category, page);
        let response: ProductPageResponse = self.get_json(&url).await?;
        Ok(response.products)
    }

    async fn fetch_product(&self, code: &str) -> Result<Option<RemoteProduct>, SourceError> {
        let url = self.product_lookup_url(code);
        let response = match self.get_json::<ProductLookupResponse>(&url).await {
            Ok(response) => response,
            Err(SourceError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if response.status == 0 {
            return Ok(None);
        }
        Ok(response.product)
    }
}

fn map_transport_error(url: &str, error: reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout {
            url: url.to_string(),
        }
    } else {
        SourceError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_append_the_page_number() {
        let category = RemoteCategory {
            name: "Snacks".into(),
            url: "https://fr.openfoodfacts.org/categorie/snacks/".into(),
            products: 40,
        };
        assert_eq!(
            OpenFoodFactsClient::page_url(&category, 3),
            "https://fr.openfoodfacts.org/categorie/snacks/3.json"
        );
    }

    #[test]
    fn product_lookup_url_uses_configured_prefix() {
        let client = OpenFoodFactsClient::new(&OpenFoodFactsConfig::default()).unwrap();
        assert_eq!(
            client.product_lookup_url("3017620422003"),
            "https://fr.openfoodfacts.org/api/v0/product/3017620422003.json"
        );
    }
}
