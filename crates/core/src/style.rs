//! Style catalog offered by the generation form.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Visual style applied to a generation.
///
/// Serialized by its display name (`"Editorial"`, `"Vintage"`, ...), which
/// is also the form stored in history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Style {
    #[default]
    Editorial,
    Streetwear,
    Vintage,
    Minimalist,
    Futuristic,
}

impl Style {
    /// Every style, in the order the form lists them.
    pub const ALL: [Style; 5] = [
        Style::Editorial,
        Style::Streetwear,
        Style::Vintage,
        Style::Minimalist,
        Style::Futuristic,
    ];

    /// Display name, also the serialized value.
    pub fn name(self) -> &'static str {
        match self {
            Self::Editorial => "Editorial",
            Self::Streetwear => "Streetwear",
            Self::Vintage => "Vintage",
            Self::Minimalist => "Minimalist",
            Self::Futuristic => "Futuristic",
        }
    }

    /// Parse a display name. Matching is exact, as stored in history.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown style '{name}'. Must be one of: {}",
                    Self::ALL.map(Style::name).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
