/// Balance every participant starts (and restarts) with
pub const INITIAL_BALANCE: f64 = 10_000.0;

/// Rounds per game when the facilitator does not configure a valid value
pub const DEFAULT_MAX_ROUNDS: u32 = 5;

/// Compounding periods per round when none is configured (12 = monthly)
pub const DEFAULT_COMPOUNDING_FREQ: u32 = 12;

/// Upper bound accepted for the configured number of rounds
pub const MAX_ROUNDS_LIMIT: u32 = 1_000;

/// Upper bound accepted for the compounding frequency (hourly over a year)
pub const MAX_COMPOUNDING_FREQ: u32 = 8_760;

/// Maximum name length for participant registration
pub const MAX_NAME_LENGTH: usize = 32;

/// Display name used when a participant logs in without one
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

/// Percentage an allocation must add up to
pub const FULL_ALLOCATION: f64 = 100.0;

/// Lowest rate a bucket may return (a total loss)
pub const MIN_RATE_PERCENT: f64 = -100.0;
