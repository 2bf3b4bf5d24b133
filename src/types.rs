// =============================================================================
// Shared types used across the momentum screener
// =============================================================================

use serde::{Deserialize, Serialize};

/// Equity market whose listed universe is screened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketId {
    Kospi,
    Kosdaq,
    Konex,
}

impl Default for MarketId {
    fn default() -> Self {
        Self::Kospi
    }
}

impl MarketId {
    /// Market code used by the KRX data endpoints (`mktId`).
    pub fn krx_code(self) -> &'static str {
        match self {
            Self::Kospi => "STK",
            Self::Kosdaq => "KSQ",
            Self::Konex => "KNX",
        }
    }
}

impl std::fmt::Display for MarketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kospi => write!(f, "KOSPI"),
            Self::Kosdaq => write!(f, "KOSDAQ"),
            Self::Konex => write!(f, "KONEX"),
        }
    }
}

impl std::str::FromStr for MarketId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KOSPI" => Ok(Self::Kospi),
            "KOSDAQ" => Ok(Self::Kosdaq),
            "KONEX" => Ok(Self::Konex),
            other => Err(format!(
                "unknown market '{other}'. Use KOSPI, KOSDAQ or KONEX."
            )),
        }
    }
}

/// MACD classification of the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacdSignal {
    #[serde(rename = "Golden Cross")]
    GoldenCross,
    #[serde(rename = "-")]
    NoSignal,
}

impl MacdSignal {
    pub fn from_cross(golden_cross: bool) -> Self {
        if golden_cross {
            Self::GoldenCross
        } else {
            Self::NoSignal
        }
    }
}

impl std::fmt::Display for MacdSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoldenCross => write!(f, "Golden Cross"),
            Self::NoSignal => write!(f, "-"),
        }
    }
}

/// Bollinger classification of the latest close against the upper band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BbSignal {
    Breakout,
    Inside,
}

impl BbSignal {
    pub fn from_breakout(breakout: bool) -> Self {
        if breakout {
            Self::Breakout
        } else {
            Self::Inside
        }
    }
}

impl std::fmt::Display for BbSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Breakout => write!(f, "Breakout"),
            Self::Inside => write!(f, "Inside"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_parses_case_insensitively() {
        assert_eq!("kosdaq".parse::<MarketId>().unwrap(), MarketId::Kosdaq);
        assert_eq!(" KOSPI ".parse::<MarketId>().unwrap(), MarketId::Kospi);
        assert!("NASDAQ".parse::<MarketId>().is_err());
    }

    #[test]
    fn market_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&MarketId::Konex).unwrap(), "\"KONEX\"");
        assert_eq!(MarketId::Kosdaq.krx_code(), "KSQ");
    }

    #[test]
    fn signal_labels_match_wire_strings() {
        assert_eq!(
            serde_json::to_string(&MacdSignal::GoldenCross).unwrap(),
            "\"Golden Cross\""
        );
        assert_eq!(serde_json::to_string(&MacdSignal::NoSignal).unwrap(), "\"-\"");
        assert_eq!(BbSignal::from_breakout(true).to_string(), "Breakout");
        assert_eq!(BbSignal::from_breakout(false).to_string(), "Inside");
    }
}
