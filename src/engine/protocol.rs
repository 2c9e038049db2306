use serde::Serialize;
use tokio::sync::oneshot;

use crate::model::fragment::MosaicId;
use crate::model::interest::InterestProfile;
use crate::model::outcome::NegotiationOutcome;

pub enum ServiceCommand {
    /// Build profiles for two mosaics, negotiate, and notify both on success.
    Compare {
        mosaic_a: MosaicId,
        mosaic_b: MosaicId,
        reply: oneshot::Sender<ServiceResponse>,
    },

    /// Negotiate directly between two already-built profiles.
    Negotiate {
        profile_a: InterestProfile,
        profile_b: InterestProfile,
        reply: oneshot::Sender<ServiceResponse>,
    },

    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
pub enum ServiceResponse {
    Compared(CompareReport),
    Negotiated(NegotiationOutcome),
    Rejected { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub mosaic_a: MosaicId,
    pub mosaic_b: MosaicId,
    pub outcome: NegotiationOutcome,

    /// Both mosaics received the question.
    pub notified: bool,
}
