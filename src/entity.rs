use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const BODY_TEXT: &str = "bodyText";
pub const INDEX_TEXT: &str = "indexText";
pub const TRANSLATED_TEXT: &str = "translatedText";
pub const TRANSLATED_LANGUAGE: &str = "translatedLanguage";
pub const DETECTED_LANGUAGE: &str = "detectedLanguage";

/// Schemata whose extracted text lives in `indexText`
const PAGES_SCHEMATA: &[&str] = &["Pages"];

/// Field access the translation loop needs from a record
pub trait TranslatableEntity {
    fn id(&self) -> Option<&str>;

    /// Source texts, in order, from the field matching the record's kind
    fn source_texts(&self) -> Vec<String>;

    /// Language the record was detected to be written in, if known
    fn detected_language(&self) -> Option<&str>;

    /// Append one translation result
    fn add_translation(&mut self, text: String, language: &str);
}

/// A FollowTheMoney entity as found in JSON-lines streams
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
    /// Remaining top-level keys (`datasets`, `referents`, `first_seen`, ...),
    /// written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// Create an entity of `schema` with no properties
    pub fn new<S: Into<String>, I: Into<String>>(schema: S, id: I) -> Self {
        Self {
            id: Some(id.into()),
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// All values of `prop`, empty when unset
    pub fn get(&self, prop: &str) -> &[String] {
        self.properties.get(prop).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of `prop`
    pub fn first(&self, prop: &str) -> Option<&str> {
        self.get(prop).first().map(String::as_str)
    }

    /// Append a value to `prop`
    pub fn add<S: Into<String>>(&mut self, prop: &str, value: S) {
        self.properties
            .entry(prop.to_string())
            .or_default()
            .push(value.into());
    }

    /// Name of the property holding this entity's text
    pub fn text_property(&self) -> &'static str {
        if PAGES_SCHEMATA.contains(&self.schema.as_str()) {
            INDEX_TEXT
        } else {
            BODY_TEXT
        }
    }

    /// Minimal fragment carrying identity and translation output only,
    /// for merging downstream.
    pub fn dehydrate(&self) -> Entity {
        let mut properties = BTreeMap::new();
        for prop in [TRANSLATED_TEXT, TRANSLATED_LANGUAGE] {
            let values = self.get(prop);
            if !values.is_empty() {
                properties.insert(prop.to_string(), values.to_vec());
            }
        }

        Entity {
            id: self.id.clone(),
            schema: self.schema.clone(),
            caption: self.caption.clone(),
            properties,
            extra: Map::new(),
        }
    }
}

impl TranslatableEntity for Entity {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn source_texts(&self) -> Vec<String> {
        self.get(self.text_property()).to_vec()
    }

    fn detected_language(&self) -> Option<&str> {
        self.first(DETECTED_LANGUAGE)
    }

    fn add_translation(&mut self, text: String, language: &str) {
        self.add(TRANSLATED_TEXT, text);
        self.add(TRANSLATED_LANGUAGE, language);
    }
}
