//! Natural-language explanation of the current simulation
//!
//! A thin pass-through to an external text-generation API. The simulation
//! core never calls into this module; callers request an explanation
//! explicitly and always get text back, with failures folded into static
//! fallback messages at this boundary.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::SimulationConfig;

pub const REQUEST_FAILED_MESSAGE: &str =
    "An error occurred while fetching the explanation. Please check your API limits or connection.";
pub const EMPTY_MESSAGE: &str = "No explanation generated.";

/// Noise level above which the prompt asks for a statistical-power caveat.
pub const HIGH_NOISE: f64 = 5.0;
/// Curvature magnitude at which the prompt asks for a non-linearity caveat.
pub const HIGH_CURVATURE: f64 = 2.0;

/// Fallback text naming the environment variable to set.
pub fn missing_key_message(api_key_env: &str) -> String {
    format!("API key is missing. Set {api_key_env} in the environment to receive AI insights.")
}

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("response contained no text")]
    MissingText,
}

/// Where and how to reach the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the credential
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Prompt describing the current parameters.
pub fn build_prompt(config: &SimulationConfig) -> String {
    let mut prompt = format!(
        "You are an econometrics professor with a gift for visual intuition.\n\
         Explain the Regression Discontinuity Design (RDD) simulation the user is looking at.\n\
         \n\
         Current parameters:\n\
         - Cutoff (threshold): {}\n\
         - Treatment effect (jump): {}\n\
         - Noise level: {}\n\
         - Underlying slope: {}\n\
         - Curvature (non-linearity): {}\n\
         \n\
         Explain intuitively what the jump at the cutoff {} means in causal terms.\n",
        config.cutoff,
        config.effect_size,
        config.noise_level,
        config.slope,
        config.curvature,
        config.cutoff,
    );

    if config.noise_level > HIGH_NOISE {
        prompt.push_str(&format!(
            "The noise level ({}) is high: warn about statistical power.\n",
            config.noise_level
        ));
    }
    if config.curvature.abs() >= HIGH_CURVATURE {
        prompt.push_str(&format!(
            "The curvature is {}: mention the risk of mistaking non-linearity for a discontinuity.\n",
            config.curvature
        ));
    }

    prompt.push_str("Keep it to at most three short paragraphs and use Markdown bold for key terms.\n");
    prompt
}

/// A text-generation backend.
pub trait Explainer {
    fn explain(&self, prompt: &str) -> Result<String, ExplainError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        Some(text)
    }
}

/// Google `generateContent` client.
pub struct GeminiExplainer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl fmt::Debug for GeminiExplainer {
    // keeps the key out of logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiExplainer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiExplainer {
    pub fn new(config: &ExplainConfig, api_key: String) -> Result<Self, ExplainError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Explainer for GeminiExplainer {
    fn explain(&self, prompt: &str) -> Result<String, ExplainError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExplainError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json()?;
        parsed.text().ok_or(ExplainError::MissingText)
    }
}

/// Optional explanation backend; `Unavailable` when no credential is set.
pub enum ExplanationService {
    Available(Box<dyn Explainer>),
    Unavailable { api_key_env: String },
}

impl fmt::Debug for ExplanationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplanationService::Available(_) => f.write_str("ExplanationService::Available"),
            ExplanationService::Unavailable { api_key_env } => f
                .debug_struct("ExplanationService::Unavailable")
                .field("api_key_env", api_key_env)
                .finish(),
        }
    }
}

impl ExplanationService {
    /// Read the credential named by `config.api_key_env`.
    pub fn from_env(config: &ExplainConfig) -> Self {
        Self::from_key(config, std::env::var(&config.api_key_env).ok())
    }

    pub fn from_key(config: &ExplainConfig, api_key: Option<String>) -> Self {
        let unavailable = || ExplanationService::Unavailable {
            api_key_env: config.api_key_env.clone(),
        };
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            return unavailable();
        };

        match GeminiExplainer::new(config, api_key) {
            Ok(explainer) => ExplanationService::Available(Box::new(explainer)),
            Err(err) => {
                warn!(error = %err, "explanation client could not be built");
                unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ExplanationService::Available(_))
    }

    /// Explanation text for `config`; never fails.
    pub fn explain(&self, config: &SimulationConfig) -> String {
        let explainer = match self {
            ExplanationService::Available(explainer) => explainer,
            ExplanationService::Unavailable { api_key_env } => {
                return missing_key_message(api_key_env);
            }
        };

        match explainer.explain(&build_prompt(config)) {
            Ok(text) if text.trim().is_empty() => EMPTY_MESSAGE.to_string(),
            Ok(text) => text,
            Err(ExplainError::MissingText) => EMPTY_MESSAGE.to_string(),
            Err(err) => {
                error!(error = %err, "explanation request failed");
                REQUEST_FAILED_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Canned {
        reply: fn() -> Result<String, ExplainError>,
        seen: RefCell<Vec<String>>,
    }

    impl Explainer for Canned {
        fn explain(&self, prompt: &str) -> Result<String, ExplainError> {
            self.seen.borrow_mut().push(prompt.to_string());
            (self.reply)()
        }
    }

    fn service(reply: fn() -> Result<String, ExplainError>) -> ExplanationService {
        ExplanationService::Available(Box::new(Canned {
            reply,
            seen: RefCell::new(Vec::new()),
        }))
    }

    #[test]
    fn test_prompt_mentions_parameters() {
        let prompt = build_prompt(&SimulationConfig::default());
        assert!(prompt.contains("Cutoff (threshold): 50"));
        assert!(prompt.contains("Treatment effect (jump): 15"));
        assert!(!prompt.contains("statistical power"));
        assert!(!prompt.contains("non-linearity for a discontinuity"));
    }

    #[test]
    fn test_prompt_caveats() {
        let config = SimulationConfig {
            noise_level: 12.0,
            curvature: -2.5,
            ..Default::default()
        };
        let prompt = build_prompt(&config);
        assert!(prompt.contains("statistical power"));
        assert!(prompt.contains("non-linearity for a discontinuity"));
    }

    #[test]
    fn test_mild_curvature_has_no_caveat() {
        let mild = SimulationConfig {
            curvature: 0.5,
            ..Default::default()
        };
        assert!(!build_prompt(&mild).contains("non-linearity for a discontinuity"));

        let at_threshold = SimulationConfig {
            curvature: -HIGH_CURVATURE,
            ..Default::default()
        };
        assert!(build_prompt(&at_threshold).contains("non-linearity for a discontinuity"));
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let config = ExplainConfig::default();
        let svc = ExplanationService::from_key(&config, None);
        assert!(!svc.is_available());
        let message = svc.explain(&SimulationConfig::default());
        assert_eq!(message, missing_key_message("API_KEY"));
        assert!(message.contains("Set API_KEY"));

        let svc = ExplanationService::from_key(&config, Some("   ".to_string()));
        assert!(!svc.is_available());

        let custom = ExplainConfig {
            api_key_env: "RDD_SIM_GEMINI_KEY".to_string(),
            ..Default::default()
        };
        let svc = ExplanationService::from_key(&custom, None);
        assert!(svc
            .explain(&SimulationConfig::default())
            .contains("RDD_SIM_GEMINI_KEY"));
        assert!(format!("{svc:?}").contains("RDD_SIM_GEMINI_KEY"));
    }

    #[test]
    fn test_key_builds_client() {
        let svc = ExplanationService::from_key(&ExplainConfig::default(), Some("k".to_string()));
        assert!(svc.is_available());
    }

    #[test]
    fn test_fallbacks() {
        let config = SimulationConfig::default();
        assert_eq!(service(|| Ok("**Jump**".to_string())).explain(&config), "**Jump**");
        assert_eq!(service(|| Ok(" \n".to_string())).explain(&config), EMPTY_MESSAGE);
        assert_eq!(service(|| Err(ExplainError::MissingText)).explain(&config), EMPTY_MESSAGE);
        assert_eq!(
            service(|| Err(ExplainError::Status {
                code: 429,
                body: "quota".to_string()
            }))
            .explain(&config),
            REQUEST_FAILED_MESSAGE
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"a "},{"text":"b"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("a b"));

        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), None);
    }

    #[test]
    fn test_endpoint_shape() {
        let config = ExplainConfig {
            base_url: "http://localhost:9/v1beta/".to_string(),
            ..Default::default()
        };
        let client = GeminiExplainer::new(&config, "k".to_string()).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("\"k\""));
    }
}
