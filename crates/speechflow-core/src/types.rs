use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Audio encoding of the data sent in audio requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    #[default]
    EncodingUnspecified = 0,
    Linear16 = 1,
    Flac = 2,
    Mulaw = 3,
    Amr = 4,
    AmrWb = 5,
}

/// Speech boundary events reported alongside recognition results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointerEvent {
    #[default]
    EndpointerEventUnspecified = 0,
    StartOfSpeech = 1,
    EndOfSpeech = 2,
    EndOfAudio = 3,
    EndOfUtterance = 4,
}

impl EndpointerEvent {
    pub fn is_unspecified(&self) -> bool {
        *self == EndpointerEvent::EndpointerEventUnspecified
    }
}

/// How a session hands its responses back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Every response is released as soon as it is produced.
    #[default]
    Streaming,
    /// All responses are held back and released once, at completion.
    Buffered,
}

/// Phrase hints biasing recognition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechContext {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,
}

/// The initial request of a session. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "is_unspecified_encoding")]
    pub encoding: AudioEncoding,
    #[serde(skip_serializing_if = "is_zero")]
    pub sample_rate: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language_code: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_alternatives: i32,
    #[serde(skip_serializing_if = "is_false")]
    pub profanity_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_context: Option<SpeechContext>,
    #[serde(skip_serializing_if = "is_false")]
    pub continuous: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub interim_results: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub enable_endpointer_events: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_uri: String,
}

impl SessionConfig {
    /// Number of alternatives a result may carry. Zero means one.
    pub fn effective_max_alternatives(&self) -> usize {
        self.max_alternatives.max(1) as usize
    }

    pub fn phrases(&self) -> &[String] {
        self.speech_context
            .as_ref()
            .map(|c| c.phrases.as_slice())
            .unwrap_or(&[])
    }

    pub fn output_uri(&self) -> Option<&str> {
        if self.output_uri.is_empty() {
            None
        } else {
            Some(&self.output_uri)
        }
    }
}

/// Wire form of one audio request. Exactly one of `content` and `uri` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioRequest {
    #[serde(with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<u8>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
}

impl AudioRequest {
    pub fn inline(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            uri: String::new(),
        }
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            content: Vec::new(),
            uri: uri.into(),
        }
    }
}

/// Where the audio of a chunk lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Inline(Vec<u8>),
    Uri(String),
}

impl TryFrom<AudioRequest> for AudioSource {
    type Error = SessionError;

    fn try_from(request: AudioRequest) -> Result<Self, Self::Error> {
        match (request.content.is_empty(), request.uri.is_empty()) {
            (false, true) => Ok(AudioSource::Inline(request.content)),
            (true, false) => Ok(AudioSource::Uri(request.uri)),
            (false, false) => Err(SessionError::InvalidAudioChunk(
                "both content and uri are set".to_string(),
            )),
            (true, true) => Err(SessionError::InvalidAudioChunk(
                "neither content nor uri is set".to_string(),
            )),
        }
    }
}

/// An accepted audio chunk, numbered in arrival order within its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub sequence: u64,
    pub source: AudioSource,
}

impl AudioChunk {
    /// Byte length of inline content; zero for external references.
    pub fn inline_len(&self) -> usize {
        match &self.source {
            AudioSource::Inline(bytes) => bytes.len(),
            AudioSource::Uri(_) => 0,
        }
    }
}

/// One inbound message of a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognizeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_request: Option<SessionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_request: Option<AudioRequest>,
}

impl RecognizeRequest {
    pub fn config(config: SessionConfig) -> Self {
        Self {
            initial_request: Some(config),
            audio_request: None,
        }
    }

    pub fn audio(audio: AudioRequest) -> Self {
        Self {
            initial_request: None,
            audio_request: Some(audio),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionAlternative {
    pub transcript: String,
    /// `None` on the wire is the 0.0 sentinel.
    #[serde(with = "unset_sentinel", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl RecognitionAlternative {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognitionResult {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<RecognitionAlternative>,
    #[serde(skip_serializing_if = "is_false")]
    pub is_final: bool,
    /// Only meaningful while the result is not final.
    #[serde(with = "unset_sentinel", skip_serializing_if = "Option::is_none")]
    pub stability: Option<f32>,
}

impl RecognitionResult {
    pub fn interim(alternatives: Vec<RecognitionAlternative>, stability: Option<f32>) -> Self {
        Self {
            alternatives,
            is_final: false,
            stability,
        }
    }

    pub fn settled(alternatives: Vec<RecognitionAlternative>) -> Self {
        Self {
            alternatives,
            is_final: true,
            stability: None,
        }
    }

    /// Transcript of the top alternative, if any.
    pub fn transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

/// google.rpc status codes used by sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 0,
    Cancelled = 1,
    InvalidArgument = 3,
    Internal = 13,
    Unavailable = 14,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub code: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
        }
    }

    pub fn is(&self, code: StatusCode) -> bool {
        self.code == code as i32
    }
}

/// One outbound message: a ledger update, an endpointer event, or a terminal error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognizeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<RecognitionResult>,
    #[serde(skip_serializing_if = "is_zero")]
    pub result_index: i32,
    #[serde(skip_serializing_if = "EndpointerEvent::is_unspecified")]
    pub endpoint: EndpointerEvent,
}

impl RecognizeResponse {
    pub fn update(result_index: i32, results: Vec<RecognitionResult>) -> Self {
        Self {
            results,
            result_index,
            ..Default::default()
        }
    }

    pub fn endpoint(event: EndpointerEvent) -> Self {
        Self {
            endpoint: event,
            ..Default::default()
        }
    }

    pub fn error(status: Status) -> Self {
        Self {
            error: Some(status),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Container of every response of a buffered session, in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NonStreamingRecognizeResponse {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<RecognizeResponse>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

fn is_unspecified_encoding(e: &AudioEncoding) -> bool {
    *e == AudioEncoding::EncodingUnspecified
}

/// Maps `Option<f32>` to the wire convention where 0.0 means unset.
mod unset_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f32>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f32(value.unwrap_or(0.0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f32>, D::Error> {
        let value = f32::deserialize(d)?;
        Ok(if value == 0.0 { None } else { Some(value) })
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
