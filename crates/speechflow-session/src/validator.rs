use regex::Regex;
use speechflow_core::{AudioEncoding, DeliveryMode, SessionConfig, SessionError};

pub const MIN_SAMPLE_RATE: i32 = 8_000;
pub const MAX_SAMPLE_RATE: i32 = 48_000;
pub const MAX_ALTERNATIVES: i32 = 30;
pub const MAX_PHRASES: usize = 50;
pub const MAX_PHRASE_CHARS: usize = 100;

/// Checks the initial request of a session before any audio is accepted.
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    default_language: String,
    language_tag: Regex,
}

impl ConfigValidator {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            language_tag: Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$")
                .expect("static pattern compiles"),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Returns the config with an empty language tag replaced by the default.
    pub fn validate(
        &self,
        mut config: SessionConfig,
        mode: DeliveryMode,
    ) -> Result<SessionConfig, SessionError> {
        if config.encoding == AudioEncoding::EncodingUnspecified {
            return Err(invalid("encoding must be specified"));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate) {
            return Err(invalid(format!(
                "sample rate {} Hz outside [{MIN_SAMPLE_RATE}, {MAX_SAMPLE_RATE}]",
                config.sample_rate
            )));
        }
        if !(0..=MAX_ALTERNATIVES).contains(&config.max_alternatives) {
            return Err(invalid(format!(
                "max alternatives {} outside [0, {MAX_ALTERNATIVES}]",
                config.max_alternatives
            )));
        }

        let phrases = config.phrases();
        if phrases.len() > MAX_PHRASES {
            return Err(invalid(format!(
                "{} phrase hints exceed the limit of {MAX_PHRASES}",
                phrases.len()
            )));
        }
        if let Some(long) = phrases.iter().find(|p| p.chars().count() > MAX_PHRASE_CHARS) {
            return Err(invalid(format!(
                "phrase hint of {} characters exceeds {MAX_PHRASE_CHARS}",
                long.chars().count()
            )));
        }

        if config.language_code.is_empty() {
            config.language_code = self.default_language.clone();
        } else if !self.language_tag.is_match(&config.language_code) {
            return Err(invalid(format!(
                "language code {:?} is not a language tag",
                config.language_code
            )));
        }

        if config.output_uri().is_some() && mode == DeliveryMode::Streaming {
            return Err(invalid(
                "output uri is only allowed on buffered sessions",
            ));
        }

        tracing::debug!(
            encoding = ?config.encoding,
            sample_rate = config.sample_rate,
            language = %config.language_code,
            continuous = config.continuous,
            "session config validated"
        );
        Ok(config)
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new("en-US")
    }
}

fn invalid(reason: impl Into<String>) -> SessionError {
    SessionError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use speechflow_core::SpeechContext;

    fn base_config() -> SessionConfig {
        SessionConfig {
            encoding: AudioEncoding::Linear16,
            sample_rate: 16000,
            language_code: "en-US".to_string(),
            ..Default::default()
        }
    }

    fn expect_invalid(config: SessionConfig, mode: DeliveryMode, needle: &str) {
        match ConfigValidator::default().validate(config, mode) {
            Err(SessionError::InvalidConfig(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle:?}")
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let config = ConfigValidator::default()
            .validate(base_config(), DeliveryMode::Streaming)
            .unwrap();
        assert_eq!(config, base_config());
    }

    #[test]
    fn test_unspecified_encoding_rejected() {
        let config = SessionConfig {
            encoding: AudioEncoding::EncodingUnspecified,
            ..base_config()
        };
        expect_invalid(config, DeliveryMode::Streaming, "encoding");
    }

    #[test]
    fn test_sample_rate_bounds() {
        for rate in [7000, 0, 48001, 96000] {
            let config = SessionConfig {
                sample_rate: rate,
                ..base_config()
            };
            expect_invalid(config, DeliveryMode::Streaming, "sample rate");
        }
        for rate in [8000, 44100, 48000] {
            let config = SessionConfig {
                sample_rate: rate,
                ..base_config()
            };
            assert!(ConfigValidator::default()
                .validate(config, DeliveryMode::Streaming)
                .is_ok());
        }
    }

    #[test]
    fn test_max_alternatives_bounds() {
        for n in [-1, 31] {
            let config = SessionConfig {
                max_alternatives: n,
                ..base_config()
            };
            expect_invalid(config, DeliveryMode::Streaming, "max alternatives");
        }
        for n in [0, 1, 30] {
            let config = SessionConfig {
                max_alternatives: n,
                ..base_config()
            };
            assert!(ConfigValidator::default()
                .validate(config, DeliveryMode::Streaming)
                .is_ok());
        }
    }

    #[test]
    fn test_phrase_hint_limits() {
        let config = SessionConfig {
            speech_context: Some(SpeechContext {
                phrases: vec!["x".to_string(); 51],
            }),
            ..base_config()
        };
        expect_invalid(config, DeliveryMode::Streaming, "phrase hints");

        let config = SessionConfig {
            speech_context: Some(SpeechContext {
                phrases: vec!["é".repeat(101)],
            }),
            ..base_config()
        };
        expect_invalid(config, DeliveryMode::Streaming, "101 characters");

        // 100 multi-byte characters are within the limit.
        let config = SessionConfig {
            speech_context: Some(SpeechContext {
                phrases: vec!["é".repeat(100); 50],
            }),
            ..base_config()
        };
        assert!(ConfigValidator::default()
            .validate(config, DeliveryMode::Streaming)
            .is_ok());
    }

    #[test]
    fn test_empty_language_gets_default() {
        let config = SessionConfig {
            language_code: String::new(),
            ..base_config()
        };
        let validated = ConfigValidator::new("de-DE")
            .validate(config, DeliveryMode::Streaming)
            .unwrap();
        assert_eq!(validated.language_code, "de-DE");
    }

    #[test]
    fn test_malformed_language_rejected() {
        let config = SessionConfig {
            language_code: "english please".to_string(),
            ..base_config()
        };
        expect_invalid(config, DeliveryMode::Streaming, "language code");
    }

    #[test]
    fn test_output_uri_only_on_buffered_sessions() {
        let config = SessionConfig {
            output_uri: "file:///tmp/out.json".to_string(),
            ..base_config()
        };
        expect_invalid(config.clone(), DeliveryMode::Streaming, "output uri");
        assert!(ConfigValidator::default()
            .validate(config, DeliveryMode::Buffered)
            .is_ok());
    }
}
