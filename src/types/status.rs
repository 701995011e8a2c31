use serde::{Deserialize, Serialize};

/// IMU health bit-flags shared with upstream sensor reporting.
///
/// Bit positions must match the producer of the raw data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImuStatus(pub u32);

impl ImuStatus {
    pub const IMU1_OK: u32 = 0x0001_0000;
    pub const IMU2_OK: u32 = 0x0002_0000;
    pub const IMU3_OK: u32 = 0x0004_0000;
    pub const IMU_OK_MASK: u32 = 0x0007_0000;

    /// Per-unit OK flag, indexed 0..3
    pub const UNIT_OK: [u32; 3] = [Self::IMU1_OK, Self::IMU2_OK, Self::IMU3_OK];

    pub fn all_units_ok() -> Self {
        Self(Self::IMU_OK_MASK)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, flags: u32) -> bool {
        (self.0 & flags) == flags
    }

    pub fn insert(&mut self, flags: u32) {
        self.0 |= flags;
    }

    pub fn remove(&mut self, flags: u32) {
        self.0 &= !flags;
    }

    pub fn unit_ok(self, unit: usize) -> bool {
        Self::UNIT_OK
            .get(unit)
            .map(|&flag| self.contains(flag))
            .unwrap_or(false)
    }

    pub fn ok_unit_count(self) -> usize {
        (0..Self::UNIT_OK.len()).filter(|&i| self.unit_ok(i)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_flags_cover_mask() {
        let combined = ImuStatus::UNIT_OK.iter().fold(0, |acc, f| acc | f);
        assert_eq!(combined, ImuStatus::IMU_OK_MASK);
    }

    #[test]
    fn test_remove_only_clears_requested_bit() {
        let mut status = ImuStatus(ImuStatus::IMU_OK_MASK | 0x1);
        status.remove(ImuStatus::IMU2_OK);
        assert!(status.unit_ok(0));
        assert!(!status.unit_ok(1));
        assert!(status.unit_ok(2));
        assert_eq!(status.bits() & 0x1, 0x1);
        assert_eq!(status.ok_unit_count(), 2);
    }

    #[test]
    fn test_unit_out_of_range() {
        assert!(!ImuStatus::all_units_ok().unit_ok(3));
    }
}
