use serde::{Deserialize, Deserializer};

/// `GET categories.json`
#[derive(Debug, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub tags: Vec<RemoteCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteCategory {
    pub name: String,
    pub url: String,
    /// Number of products the database lists for the category.
    #[serde(default)]
    pub products: u64,
}

/// `GET {category.url}/{page}.json`
#[derive(Debug, Deserialize)]
pub struct ProductPageResponse {
    #[serde(default)]
    pub products: Vec<RemoteProduct>,
}

/// `GET {product_url}{code}.json`
#[derive(Debug, Deserialize)]
pub struct ProductLookupResponse {
    #[serde(default)]
    pub status: i64,
    pub product: Option<RemoteProduct>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NutrientLevels {
    pub salt: Option<String>,
    pub fat: Option<String>,
    pub sugars: Option<String>,
    #[serde(rename = "saturated-fat")]
    pub saturated_fat: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteProduct {
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub brands: Option<String>,
    pub allergens: Option<String>,
    pub nutrition_grades: Option<String>,
    #[serde(default)]
    pub nutrient_levels: NutrientLevels,
}

impl RemoteProduct {
    /// The grade as a single lower-case letter `a`..=`e`, if the feed carries one.
    pub fn grade(&self) -> Option<char> {
        let raw = self.nutrition_grades.as_deref()?.trim();
        let mut chars = raw.chars();
        let grade = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() || !('a'..='e').contains(&grade) {
            return None;
        }
        Some(grade)
    }

    pub fn name(&self) -> Option<&str> {
        self.product_name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    /// Entries without a name, a code or a valid grade cannot be ranked or saved.
    pub fn is_importable(&self) -> bool {
        self.name().is_some() && self.code().is_some() && self.grade().is_some()
    }
}

/// Codes are usually strings but some feed entries carry bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Int(number) => number.to_string(),
    }))
}
