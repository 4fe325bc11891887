/// Classified recognizer failure. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    #[error("No speech was detected. Please try again.")]
    NoSpeech,
    #[error("Audio capture failed. Please check your microphone.")]
    AudioCapture,
    #[error("Microphone access denied. Please allow microphone access.")]
    NotAllowed,
    #[error("Network error. Please check your internet connection.")]
    Network,
    #[error("Speech recognition was aborted.")]
    Aborted,
    #[error("Language not supported.")]
    LanguageNotSupported,
    #[error("Speech recognition service not allowed.")]
    ServiceNotAllowed,
    #[error("An unknown error occurred with speech recognition.")]
    Unknown(String),
}

impl RecognitionError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            "language-not-supported" => Self::LanguageNotSupported,
            "service-not-allowed" => Self::ServiceNotAllowed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::LanguageNotSupported => "language-not-supported",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::Unknown(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech recognition is not available on this system.")]
    Unsupported,
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CODES: [&str; 7] = [
        "no-speech",
        "audio-capture",
        "not-allowed",
        "network",
        "aborted",
        "language-not-supported",
        "service-not-allowed",
    ];

    #[test]
    fn every_known_code_has_its_own_message() {
        let mut messages = HashSet::new();
        for code in CODES {
            let error = RecognitionError::from_code(code);
            assert!(!matches!(error, RecognitionError::Unknown(_)), "{code}");
            assert_eq!(error.code(), code);
            assert!(messages.insert(error.to_string()), "{code}");
        }
        assert!(messages.insert(RecognitionError::Unknown("x".into()).to_string()));
    }

    #[test]
    fn unknown_codes_get_the_generic_message() {
        let error = RecognitionError::from_code("bad-grammar");
        assert_eq!(error, RecognitionError::Unknown("bad-grammar".into()));
        assert_eq!(
            error.to_string(),
            "An unknown error occurred with speech recognition."
        );
    }

    #[test]
    fn permission_denied_message() {
        assert_eq!(
            RecognitionError::from_code("not-allowed").to_string(),
            "Microphone access denied. Please allow microphone access."
        );
    }
}
