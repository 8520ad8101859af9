pub mod error;
pub mod events;
pub mod items;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_true() -> bool {
        true
    }

    fn default_temperature() -> f32 {
        0.6
    }

    /// Connection and model settings for the local runtime.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct RuntimeSettings {
        /// Base URL of the local runtime (Ollama), e.g. "http://127.0.0.1:11434"
        pub base_url: String,
        /// Model tag to generate with, e.g. "llama3.2:3b"
        pub model: String,
        #[serde(default = "default_temperature")]
        pub temperature: f32,
        /// Pick a model tag matching this machine's RAM when true
        #[serde(default = "default_true")]
        pub auto_select_model: bool,
    }

    impl Default for RuntimeSettings {
        fn default() -> Self {
            Self {
                base_url: "http://127.0.0.1:11434".into(),
                model: "llama3.2:3b".into(),
                temperature: default_temperature(),
                auto_select_model: true,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_are_sane() {
            let s = RuntimeSettings::default();
            assert_eq!(s.base_url, "http://127.0.0.1:11434");
            assert!((s.temperature - 0.6).abs() < f32::EPSILON);
            assert!(s.auto_select_model);
        }

        #[test]
        fn round_trips_through_json() {
            let s = RuntimeSettings {
                base_url: "http://localhost:9999".into(),
                model: "tinyllama".into(),
                temperature: 0.2,
                auto_select_model: false,
            };
            let json = serde_json::to_string(&s).unwrap();
            let back: RuntimeSettings = serde_json::from_str(&json).unwrap();
            assert_eq!(back.model, "tinyllama");
            assert!(!back.auto_select_model);
        }

        #[test]
        fn missing_optional_fields_take_defaults() {
            let json = r#"{"base_url":"http://127.0.0.1:11434","model":"llama3.2:3b"}"#;
            let s: RuntimeSettings = serde_json::from_str(json).unwrap();
            assert!((s.temperature - 0.6).abs() < f32::EPSILON);
            assert!(s.auto_select_model);
        }
    }
}

pub mod generation_api {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    /// One increment of a streaming generation.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum StreamChunk {
        /// A piece of generated text, in arrival order
        Text(String),
        /// The provider finished the stream normally
        Done { stop_reason: Option<String> },
        /// The stream broke after it had already started
        Error(String),
    }

    /// Sampling knobs forwarded to the runtime.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SamplingConfig {
        pub temperature: f32,
    }

    impl Default for SamplingConfig {
        fn default() -> Self {
            Self { temperature: 0.6 }
        }
    }

    /// Proof that a model tag was resolved (present locally, pulled if needed).
    #[derive(Debug, Clone)]
    pub struct ModelHandle {
        pub model: String,
        pub resolved_at: DateTime<Utc>,
    }

    impl ModelHandle {
        pub fn new(model: impl Into<String>) -> Self {
            Self {
                model: model.into(),
                resolved_at: Utc::now(),
            }
        }
    }
}
