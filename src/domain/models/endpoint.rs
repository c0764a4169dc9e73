//! Model endpoint domain model.
//!
//! An endpoint names one selectable remote backend. Each routed invocation
//! works with exactly two of them: a primary and a secondary fallback.

use serde::{Deserialize, Serialize};

/// Role an endpoint plays inside one routed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// First choice for every invocation
    Primary,
    /// Sticky fallback once the primary has failed on quota
    Secondary,
}

/// Identifier for a selectable remote model backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelEndpoint {
    /// Model path or name (e.g. "gemini-2.5-pro", "publishers/google/models/llama-4")
    pub name: String,
}

impl ModelEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Human-readable display name for this endpoint's model.
    ///
    /// Strips any publisher path prefix, then maps known model names; unknown
    /// models get a title-cased rendering of their last path segment.
    pub fn display_name(&self) -> String {
        let model_name = self.name.rsplit('/').next().unwrap_or(&self.name);
        let lowered = model_name.to_lowercase();

        let known: &[(&str, &str)] = &[
            ("llama-4", "Llama 4"),
            ("llama-3-70b", "Llama 3 70B"),
            ("llama-3-8b", "Llama 3 8B"),
            ("llama-3.3-70b", "Llama 3.3 70B"),
            ("codestral", "Codestral"),
            ("mistral-large", "Mistral Large"),
            ("mistral-medium", "Mistral Medium"),
            ("mistral-small", "Mistral Small"),
            ("devstral-2", "Devstral2"),
            ("devstral2", "Devstral2"),
            ("gemini-2.5-pro", "Gemini 2.5 Pro"),
            ("gemini-2.5-flash", "Gemini 2.5 Flash"),
            ("gemini-3-pro", "Gemini 3.0 Pro"),
            ("gemini-3-pro-preview", "Gemini 3.0 Pro"),
        ];

        if let Some((_, display)) = known.iter().find(|(key, _)| *key == lowered) {
            return (*display).to_string();
        }
        if let Some((_, display)) = known.iter().find(|(key, _)| lowered.contains(key)) {
            return (*display).to_string();
        }

        // Title-case each dash-separated segment as a readable default.
        model_name
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().collect::<String>() + chars.as_str()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Select the secondary endpoint paired with this primary.
    ///
    /// Pairing strategy: pro-tier models fall back to Llama 4, flash-tier
    /// models fall back to Codestral, and Codestral itself falls back to
    /// Llama 4. Anything unrecognized gets the default Llama 4 fallback.
    pub fn fallback(&self) -> Self {
        const LLAMA_4: &str = "publishers/google/models/llama-4";
        const CODESTRAL: &str = "publishers/mistral-ai/models/codestral";

        let lowered = self.name.to_lowercase();

        let fallback_name = match self.name.as_str() {
            "gemini-2.5-pro" => LLAMA_4,
            "gemini-2.5-flash" | "gemini-2.0-flash" => CODESTRAL,
            "publishers/mistral-ai/models/codestral" | "codestral" => LLAMA_4,
            _ if lowered.contains("codestral") => LLAMA_4,
            _ if self.name.starts_with("gemini") => {
                if lowered.contains("flash") {
                    CODESTRAL
                } else {
                    LLAMA_4
                }
            }
            _ => {
                tracing::warn!(model = %self.name, "unknown model, using default fallback");
                LLAMA_4
            }
        };

        Self::new(fallback_name)
    }
}

impl std::fmt::Display for ModelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// One recorded primary→secondary switch, appended to session state.
///
/// At most one of these is produced per routed invocation; telemetry reads
/// them later to annotate the review output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRecord {
    /// Name of the agent whose invocation fell back
    pub agent: String,
    /// The primary endpoint that failed
    pub primary: String,
    /// The secondary endpoint the invocation switched to
    pub fallback: String,
}
