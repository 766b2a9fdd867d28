//! Name to GUID substitution for product and language fields.
//!
//! A field holding `"Sales Cloud;Service Cloud"` is rewritten to the GUIDs of
//! the known names, `;`-joined. Which field of a record carries products or
//! languages is declared per type through [`GuidMapped`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub const SEPARATOR: &str = ";";

/// Name to GUID lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuidCache {
    map: HashMap<String, String>,
}

impl GuidCache {
    /// Build from `(name, guid)` pairs. Pairs with an empty GUID are skipped;
    /// a repeated name keeps the last GUID.
    pub fn from_records<I, N, G>(records: I) -> Self
    where
        I: IntoIterator<Item = (N, G)>,
        N: Into<String>,
        G: Into<String>,
    {
        let map = records
            .into_iter()
            .map(|(name, guid)| (name.into(), guid.into()))
            .filter(|(_, guid): &(String, String)| !guid.is_empty())
            .collect();
        Self { map }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Map each `;`-separated part to its GUID, dropping unknown parts.
    #[must_use]
    pub fn resolve(&self, value: &str) -> String {
        let mut resolved: Vec<&str> = Vec::new();
        for part in value.split(SEPARATOR) {
            if let Some(guid) = self.get(part) {
                tracing::debug!(name = part, "found guid in cache");
                resolved.push(guid);
            } else {
                tracing::debug!(name = part, "guid not found");
            }
        }
        resolved.join(SEPARATOR)
    }
}

/// Cache that can be reloaded while readers hold the previous table.
#[derive(Debug, Default)]
pub struct SharedGuidCache {
    inner: RwLock<Arc<GuidCache>>,
}

impl SharedGuidCache {
    #[must_use]
    pub fn new(cache: GuidCache) -> Self {
        Self {
            inner: RwLock::new(Arc::new(cache)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<GuidCache> {
        Arc::clone(&self.inner.read())
    }

    pub fn replace(&self, cache: GuidCache) {
        *self.inner.write() = Arc::new(cache);
    }
}

/// Accessor pair for one `String` field of `T`.
pub struct GuidField<T> {
    pub name: &'static str,
    pub get: fn(&T) -> &str,
    pub set: fn(&mut T, String),
}

impl<T> Clone for GuidField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GuidField<T> {}

impl<T> std::fmt::Debug for GuidField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidField").field("name", &self.name).finish()
    }
}

/// Kind of GUID a field carries.
pub trait GuidKind {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct ProductGuid;

impl GuidKind for ProductGuid {
    const NAME: &'static str = "product";
}

#[derive(Debug, Clone, Copy)]
pub struct LanguageGuid;

impl GuidKind for LanguageGuid {
    const NAME: &'static str = "language";
}

/// Declares which field of `Self` holds names of kind `K`.
pub trait GuidMapped<K: GuidKind>: Sized {
    fn guid_field() -> GuidField<Self>;
}

/// Replace the value of `field` on `data` with its resolved GUIDs.
pub fn map_guids<T>(data: &mut T, field: &GuidField<T>, cache: &GuidCache) {
    let names = (field.get)(data);
    let resolved = cache.resolve(names);
    tracing::debug!(field = field.name, value = names, guids = %resolved, "mapped guid field");
    (field.set)(data, resolved);
}

/// [`map_guids`] on the field `T` declares for kind `K`.
pub fn map_kind<K: GuidKind, T: GuidMapped<K>>(data: &mut T, cache: &GuidCache) {
    let field = T::guid_field();
    tracing::debug!(kind = K::NAME, "mapping guids");
    map_guids(data, &field, cache);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub business_line: String,
    #[serde(default)]
    pub product_line: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub cloud: String,
}

impl Product {
    #[must_use]
    pub fn guid_record(&self) -> (&str, &str) {
        (&self.name, &self.guid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub mc_name: String,
}

impl Language {
    #[must_use]
    pub fn guid_record(&self) -> (&str, &str) {
        (&self.name, &self.guid)
    }
}

impl GuidCache {
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        Self::from_records(products.iter().map(Product::guid_record))
    }

    #[must_use]
    pub fn from_languages(languages: &[Language]) -> Self {
        Self::from_records(languages.iter().map(Language::guid_record))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Article {
        title: String,
        products: String,
        locale: String,
    }

    impl GuidMapped<ProductGuid> for Article {
        fn guid_field() -> GuidField<Self> {
            GuidField {
                name: "products",
                get: |a| a.products.as_str(),
                set: |a, v| a.products = v,
            }
        }
    }

    impl GuidMapped<LanguageGuid> for Article {
        fn guid_field() -> GuidField<Self> {
            GuidField {
                name: "locale",
                get: |a| a.locale.as_str(),
                set: |a, v| a.locale = v,
            }
        }
    }

    fn product(name: &str, guid: &str) -> Product {
        Product {
            name: name.to_owned(),
            guid: guid.to_owned(),
            ..Product::default()
        }
    }

    #[test]
    fn resolve_keeps_known_parts_in_order() {
        let cache = GuidCache::from_records([("A", "g-a"), ("B", "g-b")]);
        assert_eq!(cache.resolve("B;X;A"), "g-b;g-a");
        assert_eq!(cache.resolve("A"), "g-a");
    }

    #[test]
    fn resolve_with_no_hits_is_empty() {
        let cache = GuidCache::from_records([("A", "g-a")]);
        assert_eq!(cache.resolve("X;Y"), "");
        assert_eq!(cache.resolve(""), "");
    }

    #[test]
    fn records_without_guid_are_skipped() {
        let cache = GuidCache::from_products(&[product("A", "g-a"), product("B", "")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("B"), None);
    }

    #[test]
    fn map_kind_rewrites_only_declared_field() {
        let products = GuidCache::from_products(&[product("Sales", "p-1"), product("Service", "p-2")]);
        let languages = GuidCache::from_languages(&[Language {
            name: "English".to_owned(),
            guid: "l-en".to_owned(),
            ..Language::default()
        }]);

        let mut article = Article {
            title: "Sales".to_owned(),
            products: "Sales;Unknown;Service".to_owned(),
            locale: "English".to_owned(),
        };
        map_kind::<ProductGuid, _>(&mut article, &products);
        map_kind::<LanguageGuid, _>(&mut article, &languages);

        assert_eq!(article.products, "p-1;p-2");
        assert_eq!(article.locale, "l-en");
        assert_eq!(article.title, "Sales");
    }

    #[test]
    fn shared_cache_replace_keeps_old_snapshot() {
        let shared = SharedGuidCache::new(GuidCache::from_records([("A", "old")]));
        let before = shared.snapshot();
        shared.replace(GuidCache::from_records([("A", "new")]));

        assert_eq!(before.get("A"), Some("old"));
        assert_eq!(shared.snapshot().get("A"), Some("new"));
    }
}
