use super::error::SequenceError;
use crate::catalog::Target;
use crate::device::TimeSample;

/// Instantaneous pointing coordinates for one target (deg).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointingEstimate {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// Recovers a target's current right ascension from its catalog hour angle
/// and a fresh sidereal-time sample.
///
/// All arithmetic is in degrees; the sample's LST hours are converted at
/// this boundary. The catalog records the LST at the planned observation
/// start, so `ha = observation_lst - ra` and the field currently sits at
/// `current_lst - ha`.
pub fn estimate_pointing(
    target: &Target,
    sample: TimeSample,
) -> Result<PointingEstimate, SequenceError> {
    if !target.is_well_formed() {
        return Err(SequenceError::InvalidInput(format!(
            "target {} has malformed coordinates",
            target.id
        )));
    }
    if !sample.lst_hours.is_finite() {
        return Err(SequenceError::InvalidInput(format!(
            "non-finite LST sample {}",
            sample.lst_hours
        )));
    }
    let hour_angle = target.observation_lst_deg - target.ra_deg;
    let ra_deg = wrap_degrees(sample.lst_deg() - hour_angle);
    Ok(PointingEstimate { ra_deg, dec_deg: target.dec_deg })
}

/// Wraps an angle into [0, 360).
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
}
