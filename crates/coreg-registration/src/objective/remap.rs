//! Intensity remappings applied to one side of a volume fit.

use coreg_core::filter::{apply_mask, binarize, histogram_equalize, invert, rank_ramp, rank_transform};
use coreg_core::Volume;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bins of the equalization histogram.
const EQUALIZE_BINS: usize = 256;

/// Intensity transformation applied before comparing two volumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Remap {
    #[default]
    None,
    Equalize,
    Rank,
    RankRamp,
    Binarize,
    /// Zero everything outside the side's mask.
    Mask,
    Invert,
}

impl Remap {
    /// Remap `volume`. `mask` and `threshold` are used by the modes that need them.
    pub fn apply(self, volume: &Volume, mask: &Volume, threshold: f32) -> Result<Volume> {
        Ok(match self {
            Self::None => volume.clone(),
            Self::Equalize => histogram_equalize(volume, EQUALIZE_BINS),
            Self::Rank => rank_transform(volume),
            Self::RankRamp => rank_ramp(volume, threshold),
            Self::Binarize => binarize(volume, threshold),
            Self::Mask => apply_mask(volume, mask)?,
            Self::Invert => invert(volume),
        })
    }
}
