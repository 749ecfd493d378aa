// HEXA core upgrade cost calculator. Pure arithmetic over the in-game
// cost table, no storage involved.

use thiserror::Error;

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 30;

/// Cost of reaching each level from the one below it, indexed by
/// `level - 1`: (origin fragments, sol erda, sol erda energy).
const LEVEL_COSTS: [(u64, u64, u64); 30] = [
    (35, 75, 0),
    (40, 90, 0),
    (50, 110, 0),
    (65, 135, 0),
    (85, 165, 0),
    (110, 200, 0),
    (145, 245, 0),
    (190, 300, 0),
    (250, 370, 0),
    (330, 455, 0),
    (435, 560, 25),
    (570, 690, 35),
    (750, 850, 50),
    (980, 1050, 65),
    (1285, 1300, 85),
    (1685, 1610, 110),
    (2205, 1990, 145),
    (2890, 2460, 190),
    (3780, 3040, 250),
    (4950, 3760, 330),
    (6480, 4640, 435),
    (8490, 5740, 570),
    (11115, 7100, 750),
    (14545, 8780, 980),
    (19045, 10850, 1285),
    (24945, 13410, 1685),
    (32665, 16580, 2205),
    (42795, 20490, 2890),
    (56055, 25320, 3780),
    (73375, 31300, 4950),
];

/// Which core slot is being upgraded. Cost is identical across kinds,
/// the label is carried through for the reply embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillKind {
    Origin,
    Mastery,
    Enhancement,
    Common,
}

impl SkillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKind::Origin => "Origin",
            SkillKind::Mastery => "Mastery",
            SkillKind::Enhancement => "Enhancement",
            SkillKind::Common => "Common",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBreakdown {
    pub fragments: u64,
    pub sol_erda: u64,
    pub erda_energy: u64,
    /// How many level-ups the range covers.
    pub levels: u32,
}

impl CostBreakdown {
    /// What is still missing after subtracting owned resources.
    pub fn shortfall(&self, fragments: u64, sol_erda: u64, erda_energy: u64) -> CostBreakdown {
        CostBreakdown {
            fragments: self.fragments.saturating_sub(fragments),
            sol_erda: self.sol_erda.saturating_sub(sol_erda),
            erda_energy: self.erda_energy.saturating_sub(erda_energy),
            levels: self.levels,
        }
    }

    pub fn is_covered(&self) -> bool {
        self.fragments == 0 && self.sol_erda == 0 && self.erda_energy == 0
    }
}

#[derive(Debug, Error)]
pub enum HexaError {
    #[error("Levels run from {MIN_LEVEL} to {MAX_LEVEL} and the target must be above the current level (got {current} -> {target})")]
    InvalidRange { current: u32, target: u32 },
}

/// Total cost of raising a core from `current` to `target`.
pub fn cost_between(current: u32, target: u32) -> Result<CostBreakdown, HexaError> {
    if current < MIN_LEVEL || target > MAX_LEVEL || current >= target {
        return Err(HexaError::InvalidRange { current, target });
    }

    let mut total = CostBreakdown {
        fragments: 0,
        sol_erda: 0,
        erda_energy: 0,
        levels: target - current,
    };
    for level in (current + 1)..=target {
        let (fragments, sol_erda, energy) = LEVEL_COSTS[(level - 1) as usize];
        total.fragments += fragments;
        total.sol_erda += sol_erda;
        total.erda_energy += energy;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_level_up_costs_the_next_level_entry() {
        let cost = cost_between(1, 2).unwrap();
        assert_eq!(cost.fragments, 40);
        assert_eq!(cost.sol_erda, 90);
        assert_eq!(cost.erda_energy, 0);
        assert_eq!(cost.levels, 1);
    }

    #[test]
    fn energy_costs_start_at_level_eleven() {
        let cost = cost_between(10, 12).unwrap();
        assert_eq!(cost.fragments, 1_005);
        assert_eq!(cost.sol_erda, 1_250);
        assert_eq!(cost.erda_energy, 60);
    }

    #[test]
    fn maxing_a_core_from_level_one() {
        let cost = cost_between(1, 30).unwrap();
        assert_eq!(cost.fragments, 310_305);
        assert_eq!(cost.sol_erda, 163_590);
        assert_eq!(cost.erda_energy, 20_815);
        assert_eq!(cost.levels, 29);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(cost_between(5, 5).is_err());
        assert!(cost_between(10, 4).is_err());
        assert!(cost_between(0, 10).is_err());
        assert!(cost_between(1, 31).is_err());
    }

    #[test]
    fn shortfall_subtracts_owned_resources() {
        let cost = cost_between(29, 30).unwrap();
        let missing = cost.shortfall(80_000, 1_000, 0);
        assert_eq!(missing.fragments, 0);
        assert_eq!(missing.sol_erda, 30_300);
        assert_eq!(missing.erda_energy, 4_950);
        assert!(!missing.is_covered());

        assert!(cost.shortfall(100_000, 40_000, 5_000).is_covered());
    }
}
