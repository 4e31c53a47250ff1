use tracing::warn;

/// Brands audited by default when the config does not list its own catalog.
pub const DEFAULT_BRANDS: &[&str] = &[
    "Coca-Cola Original",
    "Coca-Cola Zero Sugar",
    "Diet Coke",
    "Sprite",
    "Fanta",
    "Thums Up",
    "Maaza",
    "Minute Maid",
    "Dasani",
    "Toplo Chico",
    "Smartwater",
    "Vitaminwater",
    "Powerade",
    "BODYARMOR",
    "Aquarius",
    "Ayataka",
    "Georgia (coffee)",
    "Gold Peak",
    "Costa Coffee",
    "Del Valle",
    "Fairlife",
    "Simply",
    "Schweppes",
    "AdeS",
    "Honest Kids",
    "Core Power",
];

/// Lower-cases `text` and drops everything except ASCII letters and digits.
/// Returns `None` for absent input and for input that leaves no key behind.
pub fn normalize(text: Option<&str>) -> Option<String> {
    let key: String = text?
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if key.is_empty() { None } else { Some(key) }
}

/// Reference brands, normalized once at construction.
#[derive(Debug, Clone)]
pub struct BrandCatalog {
    raw: Vec<String>,
    keys: Vec<String>,
}

impl BrandCatalog {
    pub fn new<I, S>(brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = brands.into_iter().map(Into::into).collect();
        let mut keys = Vec::with_capacity(raw.len());

        for brand in &raw {
            match normalize(Some(brand.as_str())) {
                Some(key) => keys.push(key),
                // an empty key would be a substring of every label
                None => warn!("Skipping reference brand with no comparable key: {:?}", brand),
            }
        }

        Self { raw, keys }
    }

    /// Symmetric containment test against every reference key.
    pub fn matches(&self, norm_key: &str) -> bool {
        !norm_key.is_empty()
            && self
                .keys
                .iter()
                .any(|brand| norm_key.contains(brand.as_str()) || brand.contains(norm_key))
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for BrandCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_BRANDS.iter().copied())
    }
}
