//! Integer codes shared with hosts that store trigger settings as numbers,
//! and trigger limits.

/// Let the trigger choose; recurrence-rule triggers fire once now.
pub const MISFIRE_INSTRUCTION_SMART_POLICY: i32 = 0;

/// Fire once immediately, then continue with the regular schedule.
pub const MISFIRE_INSTRUCTION_FIRE_ONCE_NOW: i32 = 1;

/// Skip missed occurrences and wait for the next one after now.
pub const MISFIRE_INSTRUCTION_DO_NOTHING: i32 = 2;

/// Repeat-count sentinel for triggers without an occurrence limit.
pub const REPEAT_INDEFINITELY: i32 = -1;

/// Occurrences walked by `final_fire_time` before it gives up.
pub const FINAL_FIRE_TIME_SCAN_LIMIT: u32 = 100_000;
