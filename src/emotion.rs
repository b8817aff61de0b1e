use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional tone of a dream narrative.
///
/// This is a closed set: every classification result is one of these six
/// labels, no matter what an upstream provider returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joyful,
    Stressful,
    Neutral,
    Mysterious,
    Peaceful,
    Intense,
}

impl Emotion {
    /// All six labels in canonical order.
    pub const ALL: [Emotion; 6] = [
        Emotion::Joyful,
        Emotion::Stressful,
        Emotion::Neutral,
        Emotion::Mysterious,
        Emotion::Peaceful,
        Emotion::Intense,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joyful => "joyful",
            Emotion::Stressful => "stressful",
            Emotion::Neutral => "neutral",
            Emotion::Mysterious => "mysterious",
            Emotion::Peaceful => "peaceful",
            Emotion::Intense => "intense",
        }
    }

    /// Display glyph for journal listings.
    pub fn glyph(&self) -> &'static str {
        match self {
            Emotion::Joyful => "😊",
            Emotion::Stressful => "😰",
            Emotion::Neutral => "😐",
            Emotion::Mysterious => "🔮",
            Emotion::Peaceful => "😌",
            Emotion::Intense => "🔥",
        }
    }
}

impl Default for Emotion {
    fn default() -> Self {
        // The classification fallback chain bottoms out here.
        Emotion::Neutral
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_lowercase_json() {
        let json = serde_json::to_string(&Emotion::Mysterious).unwrap();
        assert_eq!(json, "\"mysterious\"");

        let parsed: Emotion = serde_json::from_str("\"peaceful\"").unwrap();
        assert_eq!(parsed, Emotion::Peaceful);
    }

    #[test]
    fn test_all_covers_six_distinct_labels() {
        let mut labels: Vec<&str> = Emotion::ALL.iter().map(|e| e.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 6);
    }
}
