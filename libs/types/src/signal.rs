//! Detected signals and their notification rendering

use crate::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pattern detected by the classifier.
///
/// Serde names are the wire/storage names and must stay stable across
/// releases; stored records are read back by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    #[serde(rename = "FLATnVOLUME")]
    FlatAndVolume,
    #[serde(rename = "INCREASED_VOLUME")]
    VolumeSpike,
    #[serde(rename = "VSA")]
    VolumeSpikeAdjusted,
}

impl SignalType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SignalType::FlatAndVolume => "FLATnVOLUME",
            SignalType::VolumeSpike => "INCREASED_VOLUME",
            SignalType::VolumeSpikeAdjusted => "VSA",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One detected pattern for one `(instrument, timeframe)` evaluation pass.
///
/// Created by the classifier and never mutated afterwards, except that the
/// persistence sink assigns `id`. At most one signal exists per pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Storage identifier, assigned on insert. Skipped when unset so
    /// flattened storage records carry a single id key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub instrument: String,
    pub timeframe: Timeframe,
    /// Open time of the evaluated candle, milliseconds since the Unix epoch.
    pub evaluation_time: i64,
    /// Volume oscillator at the evaluation index, percent.
    pub volume_oscillator: f64,
    /// Percent change of the evaluated candle.
    pub percent_change: f64,
    /// Normalized taker-flow delta, absent for venues without taker data.
    pub delta: Option<f64>,
    /// Type-specific metric (`flat_value`, `vsa_value`, `prev_percent_change`).
    pub extra: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// Human-readable evaluation time for message templates.
    fn evaluation_time_utc(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.evaluation_time)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.evaluation_time.to_string())
    }

    fn delta_display(&self) -> String {
        match self.delta {
            Some(d) => format!("{d}"),
            None => "-".to_string(),
        }
    }

    fn extra_display(&self, key: &str) -> String {
        match self.extra.get(key) {
            Some(v) => format!("{v}"),
            None => "-".to_string(),
        }
    }

    /// Notification text for this signal, templated per type.
    pub fn message(&self) -> String {
        let head = format!(
            "{}\n{}\n{}",
            self.instrument,
            self.timeframe,
            self.evaluation_time_utc()
        );
        let tail = format!(
            "% change: {}\nVO: {}%\nDelta: {}",
            self.percent_change,
            self.volume_oscillator,
            self.delta_display()
        );

        match self.signal_type {
            SignalType::VolumeSpike => format!("{head}\npattern: INCREASED VOLUME\n{tail}"),
            SignalType::VolumeSpikeAdjusted => format!(
                "{head}\npattern: VSA\nvsa value: {}\n{tail}",
                self.extra_display("vsa_value")
            ),
            SignalType::FlatAndVolume => format!(
                "{head}\npattern: FLATnVOLUME\nmean value: {}\n{tail}",
                self.extra_display("flat_value")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(signal_type: SignalType) -> Signal {
        let mut extra = BTreeMap::new();
        extra.insert("vsa_value".to_string(), 0.72);
        extra.insert("flat_value".to_string(), 0.013);
        Signal {
            id: None,
            signal_type,
            instrument: "BTCUSDT".to_string(),
            timeframe: Timeframe::H1,
            evaluation_time: 1_699_488_000_000,
            volume_oscillator: 23.41,
            percent_change: -1.2,
            delta: Some(3.1),
            extra,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn wire_names_are_stable() {
        let json = serde_json::to_string(&SignalType::VolumeSpikeAdjusted).unwrap();
        assert_eq!(json, "\"VSA\"");
        let json = serde_json::to_value(sample(SignalType::FlatAndVolume)).unwrap();
        assert_eq!(json["type"], "FLATnVOLUME");
    }

    #[test]
    fn message_carries_type_specific_metric() {
        let msg = sample(SignalType::VolumeSpikeAdjusted).message();
        assert!(msg.contains("pattern: VSA"));
        assert!(msg.contains("vsa value: 0.72"));
        assert!(msg.contains("VO: 23.41%"));

        let msg = sample(SignalType::FlatAndVolume).message();
        assert!(msg.contains("pattern: FLATnVOLUME"));
        assert!(msg.contains("mean value: 0.013"));

        let mut no_delta = sample(SignalType::VolumeSpike);
        no_delta.delta = None;
        assert!(no_delta.message().contains("Delta: -"));
    }
}
