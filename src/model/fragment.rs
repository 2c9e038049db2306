use serde::{Deserialize, Serialize};

pub type MosaicId = i64;
pub type FragmentId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub fragment_id: FragmentId,
    pub mosaic_id: MosaicId,
    pub caption: String,
    pub embedding: Vec<f32>,
}

/// A fragment from each mosaic together with their similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentPair {
    pub fragment_a_id: FragmentId,
    pub fragment_b_id: FragmentId,
    pub score: f32,
}
