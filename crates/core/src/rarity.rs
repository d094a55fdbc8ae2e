//! Performance-based rarity classification.
//!
//! A vehicle is rare when any single performance figure crosses its
//! threshold. Missing or unparseable figures neither qualify nor disqualify.

use crate::metrics::{parse_power, parse_top_speed, parse_zero_to_sixty};
use crate::vehicle::VehicleAttributes;

/// Power at or above which a vehicle is rare (bhp).
pub const RARE_POWER_BHP: u32 = 400;
/// Top speed at or above which a vehicle is rare (mph).
pub const RARE_TOP_SPEED_MPH: u32 = 155;
/// 0-60 time at or below which a vehicle is rare (seconds).
pub const RARE_ZERO_TO_SIXTY_SECS: f64 = 4.0;

/// Whether the attributes describe a rare (high-performance) vehicle.
pub fn is_rare(attributes: &VehicleAttributes) -> bool {
    let powerful = attributes
        .power
        .as_deref()
        .and_then(parse_power)
        .is_some_and(|bhp| bhp >= RARE_POWER_BHP);

    let fast = attributes
        .top_speed
        .as_deref()
        .and_then(parse_top_speed)
        .is_some_and(|mph| mph >= RARE_TOP_SPEED_MPH);

    let quick = attributes
        .zero_to_sixty
        .as_deref()
        .and_then(parse_zero_to_sixty)
        .is_some_and(|secs| secs <= RARE_ZERO_TO_SIXTY_SECS);

    powerful || fast || quick
}
