//! JSON-backed column types shared by programs and lessons

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered list of language codes, stored as a JSON array
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LanguageList(pub Vec<String>);

impl LanguageList {
    pub fn contains(&self, language: &str) -> bool {
        self.0.iter().any(|l| l == language)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for LanguageList {
    fn from(languages: Vec<String>) -> Self {
        Self(languages)
    }
}

/// Language code -> URL mapping, stored as a JSON object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct UrlMap(pub BTreeMap<String, String>);

impl UrlMap {
    pub fn get(&self, language: &str) -> Option<&String> {
        self.0.get(language)
    }

    pub fn contains_language(&self, language: &str) -> bool {
        self.0.contains_key(language)
    }
}

impl From<BTreeMap<String, String>> for UrlMap {
    fn from(urls: BTreeMap<String, String>) -> Self {
        Self(urls)
    }
}
