//! Decider resolution once the negotiation script completes.
//!
//! For `bo1` the decider is the single survivor and carries no side. For
//! `bo3` and `bo5` the decider map and its starting side are drawn
//! independently and uniformly from the survivors. Randomness is injected so
//! the draw is reproducible under test.

use rand::Rng;
use veto_types::{GameMap, MapId, Side, VetoFormat};

/// The resolved decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decider {
    /// The decider map, absent when no map survived.
    pub map_id: Option<MapId>,
    /// Starting side on the decider, absent for `bo1`.
    pub side: Option<Side>,
}

impl Decider {
    /// No decider could be resolved.
    pub const NONE: Self = Self {
        map_id: None,
        side: None,
    };
}

/// Resolve the decider from the surviving maps.
///
/// `bo1` yields a decider only when exactly one map survives. `bo3` and
/// `bo5` yield nothing on an empty survivor list.
pub fn resolve_decider<R: Rng + ?Sized>(
    format: VetoFormat,
    survivors: &[&GameMap],
    rng: &mut R,
) -> Decider {
    match format {
        VetoFormat::Bo1 => match survivors {
            [only] => Decider {
                map_id: Some(only.id),
                side: None,
            },
            _ => Decider::NONE,
        },
        VetoFormat::Bo3 | VetoFormat::Bo5 => {
            if survivors.is_empty() {
                return Decider::NONE;
            }
            let index = rng.random_range(0..survivors.len());
            let Some(map) = survivors.get(index) else {
                return Decider::NONE;
            };
            Decider {
                map_id: Some(map.id),
                side: Some(random_side(rng)),
            }
        }
    }
}

/// Draw a starting side uniformly.
pub fn random_side<R: Rng + ?Sized>(rng: &mut R) -> Side {
    if rng.random::<bool>() {
        Side::Attack
    } else {
        Side::Defence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pool;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::RngCore;

    /// Returns the same word forever.
    struct FixedRng(u64);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::try_from(self.0 & u64::from(u32::MAX)).unwrap_or(u32::MAX)
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            let byte = self.0.to_le_bytes().first().copied().unwrap_or_default();
            dst.fill(byte);
        }
    }

    #[test]
    fn bo1_takes_the_single_survivor_without_side() {
        let pool = pool(1);
        let survivors: Vec<&GameMap> = pool.maps.iter().collect();
        let decider = resolve_decider(VetoFormat::Bo1, &survivors, &mut FixedRng(0));
        assert_eq!(decider.map_id, pool.maps.first().map(|m| m.id));
        assert_eq!(decider.side, None);
    }

    #[test]
    fn bo1_without_a_single_survivor_has_no_decider() {
        let pool = pool(2);
        let survivors: Vec<&GameMap> = pool.maps.iter().collect();
        let decider = resolve_decider(VetoFormat::Bo1, &survivors, &mut FixedRng(0));
        assert_eq!(decider, Decider::NONE);
    }

    #[test]
    fn bo3_draws_map_and_side() {
        let pool = pool(3);
        let survivors: Vec<&GameMap> = pool.maps.iter().collect();
        let mut rng = SmallRng::seed_from_u64(7);
        let decider = resolve_decider(VetoFormat::Bo3, &survivors, &mut rng);
        assert!(decider.map_id.is_some_and(|id| pool.contains(id)));
        assert!(decider.side.is_some());
    }

    #[test]
    fn empty_survivors_leave_decider_unset() {
        let decider = resolve_decider(VetoFormat::Bo5, &[], &mut FixedRng(0));
        assert_eq!(decider, Decider::NONE);
    }

    #[test]
    fn injected_randomness_controls_the_draw() {
        let pool = pool(4);
        let survivors: Vec<&GameMap> = pool.maps.iter().collect();

        let low = resolve_decider(VetoFormat::Bo5, &survivors, &mut FixedRng(0));
        assert_eq!(low.map_id, pool.maps.first().map(|m| m.id));

        let high = resolve_decider(VetoFormat::Bo5, &survivors, &mut FixedRng(u64::MAX));
        assert_eq!(high.map_id, pool.maps.last().map(|m| m.id));

        assert_ne!(low.side, high.side);
    }

    #[test]
    fn same_seed_same_decider() {
        let pool = pool(6);
        let survivors: Vec<&GameMap> = pool.maps.iter().collect();
        let a = resolve_decider(VetoFormat::Bo3, &survivors, &mut SmallRng::seed_from_u64(42));
        let b = resolve_decider(VetoFormat::Bo3, &survivors, &mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
