//! Request and response types for the endpoints the client exposes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub main_format: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    #[serde(default)]
    pub shares_translation_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalePreview {
    pub code: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locale {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub rtl: bool,
    #[serde(default)]
    pub plural_forms: Vec<String>,
    pub source_locale: Option<LocalePreview>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Translation progress counters for a locale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleStatistics {
    pub keys_total_count: i64,
    pub keys_untranslated_count: i64,
    pub missing_words_count: i64,
    pub translations_completed_count: i64,
    pub translations_unverified_count: i64,
    pub unverified_words_count: i64,
    pub words_total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleDetails {
    #[serde(flatten)]
    pub locale: Locale,
    pub statistics: Option<LocaleStatistics>,
}

/// Parameters for creating a locale
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocaleParams {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_locale_id: Option<String>,
}

/// Options for downloading a locale file
///
/// Sent as query parameters, so each combination of options is cached
/// separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleDownloadParams {
    pub file_format: Option<String>,
    pub tag: Option<String>,
    pub encoding: Option<String>,
    pub fallback_locale_id: Option<String>,
    pub convert_emoji: bool,
    pub include_empty_translations: bool,
    pub keep_notranslate_tags: bool,
    pub skip_unverified_translations: bool,
}

impl LocaleDownloadParams {
    /// Query pairs in a fixed order, so equal params always produce the same URL
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let options = [
            ("file_format", &self.file_format),
            ("tag", &self.tag),
            ("encoding", &self.encoding),
            ("fallback_locale_id", &self.fallback_locale_id),
        ];
        for (name, value) in options {
            if let Some(value) = value {
                pairs.push((name, value.clone()));
            }
        }

        let flags = [
            ("convert_emoji", self.convert_emoji),
            ("include_empty_translations", self.include_empty_translations),
            ("keep_notranslate_tags", self.keep_notranslate_tags),
            ("skip_unverified_translations", self.skip_unverified_translations),
        ];
        for (name, set) in flags {
            if set {
                pairs.push((name, "true".to_string()));
            }
        }

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_details_parses_api_payload() {
        let json = r#"{
            "id": "abcd1234",
            "name": "German",
            "code": "de-DE",
            "default": false,
            "main": true,
            "rtl": false,
            "plural_forms": ["zero", "one", "other"],
            "source_locale": {"id": "efgh", "name": "English", "code": "en"},
            "created_at": "2015-01-28T09:52:53Z",
            "updated_at": "2015-01-28T09:52:53Z",
            "statistics": {
                "keys_total_count": 10,
                "keys_untranslated_count": 2,
                "words_total_count": 40
            }
        }"#;

        let details: LocaleDetails = serde_json::from_str(json).expect("Failed to parse");

        assert_eq!(details.locale.code, "de-DE");
        assert!(details.locale.main);
        assert_eq!(details.locale.plural_forms.len(), 3);
        assert_eq!(details.locale.source_locale.as_ref().unwrap().code, "en");
        let stats = details.statistics.unwrap();
        assert_eq!(stats.keys_total_count, 10);
        assert_eq!(stats.missing_words_count, 0);
    }

    #[test]
    fn test_project_details_flattens_project() {
        let json = r#"{
            "id": "p1",
            "name": "Website",
            "main_format": "yml",
            "created_at": null,
            "updated_at": null,
            "shares_translation_memory": true
        }"#;

        let details: ProjectDetails = serde_json::from_str(json).unwrap();

        assert_eq!(details.project.name, "Website");
        assert!(details.shares_translation_memory);
    }

    #[test]
    fn test_download_params_default_has_no_query() {
        assert!(LocaleDownloadParams::default().query_pairs().is_empty());
    }

    #[test]
    fn test_download_params_query_order_is_stable() {
        let params = LocaleDownloadParams {
            tag: Some("web".to_string()),
            file_format: Some("yml".to_string()),
            skip_unverified_translations: true,
            ..Default::default()
        };

        assert_eq!(
            params.query_pairs(),
            vec![
                ("file_format", "yml".to_string()),
                ("tag", "web".to_string()),
                ("skip_unverified_translations", "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_locale_params_omit_unset_fields() {
        let params = LocaleParams {
            name: "French".to_string(),
            code: "fr".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&params).unwrap();

        assert_eq!(json, serde_json::json!({"name": "French", "code": "fr"}));
    }
}
