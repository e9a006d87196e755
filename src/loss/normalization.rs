use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::Error;

/// Selects the divisor applied to the summed loss and to the gradient.
///
/// - `Full`      — divide by every element, `outer_num * inner_num`.
/// - `Valid`     — divide by the count of valid elements; falls back to
///                 `Full` when that count is negative.
/// - `BatchSize` — divide by `outer_num`.
/// - `None`      — no normalization.
///
/// Names follow the legacy config spelling (`"FULL"`, `"VALID"`,
/// `"BATCH_SIZE"`, `"NONE"`); numeric ids 0..=3 are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ModeRepr", into = "String")]
pub enum NormalizationMode {
    Full,
    Valid,
    BatchSize,
    None,
}

impl NormalizationMode {
    pub const ALL: [NormalizationMode; 4] = [
        NormalizationMode::Full,
        NormalizationMode::Valid,
        NormalizationMode::BatchSize,
        NormalizationMode::None,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NormalizationMode::Full => "FULL",
            NormalizationMode::Valid => "VALID",
            NormalizationMode::BatchSize => "BATCH_SIZE",
            NormalizationMode::None => "NONE",
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalizationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Ok(NormalizationMode::Full),
            "VALID" | "VALID_COUNT" => Ok(NormalizationMode::Valid),
            "BATCH_SIZE" => Ok(NormalizationMode::BatchSize),
            "NONE" => Ok(NormalizationMode::None),
            _ => Err(Error::UnknownNormalizationMode(s.to_string())),
        }
    }
}

impl TryFrom<i64> for NormalizationMode {
    type Error = Error;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(NormalizationMode::Full),
            1 => Ok(NormalizationMode::Valid),
            2 => Ok(NormalizationMode::BatchSize),
            3 => Ok(NormalizationMode::None),
            _ => Err(Error::UnknownNormalizationMode(id.to_string())),
        }
    }
}

/// Wire form of a mode: either its name or its numeric id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModeRepr {
    Name(String),
    Id(i64),
}

impl TryFrom<ModeRepr> for NormalizationMode {
    type Error = Error;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Name(name) => name.parse(),
            ModeRepr::Id(id) => NormalizationMode::try_from(id),
        }
    }
}

impl From<NormalizationMode> for String {
    fn from(mode: NormalizationMode) -> String {
        mode.name().to_string()
    }
}

/// Divisor for a summed loss of `outer_num * inner_num` elements.
///
/// `valid_count` is only consulted in `Valid` mode; a negative value means
/// "unknown" and falls back to the full element count. The result is never
/// below 1.0, so degenerate shapes cannot amplify the loss.
pub fn resolve_normalizer(
    mode: NormalizationMode,
    valid_count: f64,
    outer_num: usize,
    inner_num: usize,
) -> f64 {
    let full = (outer_num * inner_num) as f64;
    let normalizer = match mode {
        NormalizationMode::Full => full,
        NormalizationMode::Valid => {
            if valid_count < 0.0 { full } else { valid_count }
        }
        NormalizationMode::BatchSize => outer_num as f64,
        NormalizationMode::None => 1.0,
    };
    normalizer.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizer_table() {
        assert_eq!(resolve_normalizer(NormalizationMode::Full, -1.0, 4, 10), 40.0);
        assert_eq!(resolve_normalizer(NormalizationMode::BatchSize, -1.0, 4, 10), 4.0);
        assert_eq!(resolve_normalizer(NormalizationMode::None, -1.0, 4, 10), 1.0);
        assert_eq!(resolve_normalizer(NormalizationMode::Valid, -1.0, 4, 10), 40.0);
        assert_eq!(resolve_normalizer(NormalizationMode::Valid, 7.0, 4, 10), 7.0);
    }

    #[test]
    fn empty_shapes_clamp_to_one() {
        for mode in NormalizationMode::ALL {
            assert_eq!(resolve_normalizer(mode, 0.0, 0, 0), 1.0, "{mode}");
        }
        assert_eq!(resolve_normalizer(NormalizationMode::Valid, 0.25, 4, 10), 1.0);
    }

    #[test]
    fn parses_names_and_ids() {
        assert_eq!("batch_size".parse::<NormalizationMode>().unwrap(), NormalizationMode::BatchSize);
        assert_eq!("VALID_COUNT".parse::<NormalizationMode>().unwrap(), NormalizationMode::Valid);
        assert_eq!(NormalizationMode::try_from(3i64).unwrap(), NormalizationMode::None);
        for mode in NormalizationMode::ALL {
            assert_eq!(mode.name().parse::<NormalizationMode>().unwrap(), mode);
        }
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(matches!(
            "MEAN".parse::<NormalizationMode>(),
            Err(Error::UnknownNormalizationMode(name)) if name == "MEAN"
        ));
        assert!(matches!(
            NormalizationMode::try_from(7i64),
            Err(Error::UnknownNormalizationMode(_))
        ));
    }

    #[test]
    fn serde_uses_legacy_names() {
        let json = serde_json::to_string(&NormalizationMode::BatchSize).unwrap();
        assert_eq!(json, "\"BATCH_SIZE\"");
        let mode: NormalizationMode = serde_json::from_str("2").unwrap();
        assert_eq!(mode, NormalizationMode::BatchSize);
        assert!(serde_json::from_str::<NormalizationMode>("\"SUM\"").is_err());
    }

    fn any_mode() -> impl Strategy<Value = NormalizationMode> {
        prop::sample::select(NormalizationMode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn normalizer_never_below_one(
            mode in any_mode(),
            valid in -10.0f64..1e6,
            outer in 0usize..512,
            inner in 0usize..512,
        ) {
            prop_assert!(resolve_normalizer(mode, valid, outer, inner) >= 1.0);
        }
    }
}
