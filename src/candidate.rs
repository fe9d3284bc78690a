// Candidate records produced by the external generator
//
// Field names follow the generator's camelCase JSON payload so records
// round-trip to the delivery side unchanged.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// A single product idea proposed by the generator in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(
        default,
        rename = "amazonRating",
        alias = "rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_match_score")]
    pub match_score: u8,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub required_tech: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_tech: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_new_release: bool,
}

impl CandidateRecord {
    /// Minimal record with only a name, mostly useful for tests and tooling
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: None,
            rating: None,
            description: String::new(),
            match_score: 0,
            reasoning: String::new(),
            required_tech: Vec::new(),
            missing_tech: None,
            url: None,
            image_url: None,
            is_new_release: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// True when the name is empty after trimming
    pub fn has_blank_name(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Scores arrive as arbitrary JSON numbers; clamp into 0-100
fn deserialize_match_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value.min(100.0).round() as u8)
}

/// One generator response: an optional trend summary plus the candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationBatch {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub products: Vec<CandidateRecord>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CandidateRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CandidateRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json|JSON)?").expect("valid fence pattern");
}

/// Strip Markdown code fences the generator sometimes wraps its JSON in
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Parse raw generator output into a batch.
///
/// Accepts `{ "summary", "products" }`, a bare array of products, and
/// either form wrapped in ```json fences.
pub fn parse_generation_output(text: &str) -> Result<GenerationBatch, String> {
    let parsed = serde_json::from_str::<serde_json::Value>(text.trim())
        .or_else(|_| serde_json::from_str::<serde_json::Value>(&strip_code_fences(text)))
        .map_err(|e| format!("Failed to parse generator output: {}", e))?;

    match parsed {
        serde_json::Value::Array(_) => {
            let products: Vec<CandidateRecord> = serde_json::from_value(parsed)
                .map_err(|e| format!("Failed to parse candidate list: {}", e))?;
            Ok(GenerationBatch {
                summary: None,
                products,
            })
        }
        serde_json::Value::Object(_) => serde_json::from_value(parsed)
            .map_err(|e| format!("Failed to parse candidate batch: {}", e)),
        other => Err(format!(
            "Failed to parse generator output: expected object or array, got {}",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let text = r#"{
            "summary": "本周趋势",
            "products": [{
                "name": "Smart Clock",
                "price": "$29.99",
                "amazonRating": "4.5",
                "description": "Wifi clock",
                "matchScore": 85,
                "reasoning": "Uses our LCD stack",
                "requiredTech": ["WiFi", "LCD"],
                "url": "https://www.amazon.com/s?k=smart+clock",
                "isNewRelease": true
            }]
        }"#;

        let batch = parse_generation_output(text).unwrap();
        assert_eq!(batch.summary.as_deref(), Some("本周趋势"));
        assert_eq!(batch.products.len(), 1);

        let product = &batch.products[0];
        assert_eq!(product.name, "Smart Clock");
        assert_eq!(product.rating.as_deref(), Some("4.5"));
        assert_eq!(product.match_score, 85);
        assert_eq!(product.required_tech, vec!["WiFi", "LCD"]);
        assert!(product.is_new_release);
    }

    #[test]
    fn test_parse_fenced_output() {
        let text = "```json\n{\"products\": [{\"name\": \"Neck Fan\"}]}\n```";
        let batch = parse_generation_output(text).unwrap();
        assert_eq!(batch.products.len(), 1);
        assert_eq!(batch.products[0].name, "Neck Fan");
        assert!(batch.summary.is_none());
    }

    #[test]
    fn test_parse_bare_array() {
        let batch = parse_generation_output(r#"[{"name": "A"}, {"name": "B"}]"#).unwrap();
        assert_eq!(batch.products.len(), 2);
    }

    #[test]
    fn test_parse_missing_products_is_empty() {
        let batch = parse_generation_output(r#"{"summary": "nothing"}"#).unwrap();
        assert!(batch.products.is_empty());
    }

    #[test]
    fn test_parse_null_products_is_empty() {
        let batch = parse_generation_output(r#"{"summary": "quiet week", "products": null}"#).unwrap();
        assert!(batch.products.is_empty());
        assert_eq!(batch.summary.as_deref(), Some("quiet week"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_generation_output("not json").is_err());
        assert!(parse_generation_output("42").is_err());
    }

    #[test]
    fn test_match_score_is_clamped() {
        let batch =
            parse_generation_output(r#"[{"name": "A", "matchScore": 140}, {"name": "B", "matchScore": -3}]"#)
                .unwrap();
        assert_eq!(batch.products[0].match_score, 100);
        assert_eq!(batch.products[1].match_score, 0);
    }

    #[test]
    fn test_rating_alias_and_serialized_name() {
        let batch = parse_generation_output(r#"[{"name": "A", "rating": "4.1"}]"#).unwrap();
        assert_eq!(batch.products[0].rating.as_deref(), Some("4.1"));

        let json = serde_json::to_value(&batch.products[0]).unwrap();
        assert_eq!(json["amazonRating"], "4.1");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_missing_name_is_blank() {
        let batch = parse_generation_output(r#"[{"description": "no name"}]"#).unwrap();
        assert!(batch.products[0].has_blank_name());
    }
}
