//! Variant selection: stat filtering, proximity ranking and cycling.
//!
//! Everything here degrades to a sentinel instead of failing: `0` for "no
//! ordinal", [`NOT_FOUND_NAME`] for names, and an empty list for candidates.

use crate::models::{
    ActorStats, AnimationLibrary, CycleMode, Directions, OrderedVariant, Rule, STANCE_COUNT, Stance,
};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Display name returned when an ordinal or source cannot be resolved
pub const NOT_FOUND_NAME: &str = "Not found";

/// Ordinals of the selected stance-0 entries whose thresholds admit `stats`,
/// tightest match first.
///
/// Each selected entry takes the next 1-based ordinal whether or not it
/// survives the filter. Ties keep ordinal order.
pub fn available_indices(rule: &Rule, category: &str, stats: &ActorStats) -> Vec<u32> {
    let Some(stance) = rule.category(category).and_then(|c| c.stance(0)) else {
        return Vec::new();
    };

    let mut candidates: Vec<(u32, f32)> = stance
        .selected_entries()
        .enumerate()
        .filter_map(|(index, entry)| {
            let ordinal = index as u32 + 1;
            entry
                .thresholds
                .admits(stats)
                .then(|| (ordinal, entry.thresholds.slack(stats)))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates.into_iter().map(|(ordinal, _)| ordinal).collect()
}

/// `current + 1`, wrapping to 1 past `max_count`; 0 when there is nothing to cycle
pub fn next_sequential(current: u32, max_count: u32) -> u32 {
    if max_count == 0 {
        0
    } else if current >= max_count {
        1
    } else {
        current + 1
    }
}

/// `current - 1`, wrapping to `max_count` below 1; 0 when there is nothing to cycle
pub fn prev_sequential(current: u32, max_count: u32) -> u32 {
    if max_count == 0 {
        0
    } else if current <= 1 || current > max_count {
        max_count
    } else {
        current - 1
    }
}

/// The two most recent picks, 0 meaning none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecentPicks {
    pub last: u32,
    pub second_to_last: u32,
}

impl RecentPicks {
    pub fn push(&mut self, pick: u32) {
        self.second_to_last = self.last;
        self.last = pick;
    }

    fn contains(&self, ordinal: u32) -> bool {
        ordinal == self.last || ordinal == self.second_to_last
    }
}

/// Weighted draw that avoids the two most recent picks.
///
/// `available` is ordered best-first and weighted `N, N-1, ..., 1` after the
/// recent picks are removed. If nothing is left the full list is used.
/// Returns 0 for an empty list.
pub fn next_weighted_no_repeat<R: Rng + ?Sized>(available: &[u32], recent: &mut RecentPicks, rng: &mut R) -> u32 {
    if available.is_empty() {
        return 0;
    }

    let mut remaining: Vec<u32> = available.iter().copied().filter(|o| !recent.contains(*o)).collect();
    if remaining.is_empty() {
        remaining = available.to_vec();
    }

    let weights: Vec<usize> = (1..=remaining.len()).rev().collect();
    let drawn = match WeightedIndex::new(&weights) {
        Ok(distribution) => remaining[distribution.sample(rng)],
        Err(e) => {
            tracing::warn!("Weighted draw failed ({}), taking best candidate", e);
            remaining[0]
        }
    };

    recent.push(drawn);
    drawn
}

fn display_name(variant: &OrderedVariant<'_>, library: &AnimationLibrary) -> Option<String> {
    if !variant.variant.display_name.is_empty() {
        return Some(variant.variant.display_name.clone());
    }
    library.get(variant.variant.source).map(|animation| animation.name.clone())
}

/// Name of the variant active for a parent ordinal and direction code.
///
/// Direction 0 names the parent. Otherwise the parent's children are searched
/// for one gated on that direction, falling back to the parent when there is
/// no such child or the child cannot be named.
pub fn variant_name(stance: &Stance, library: &AnimationLibrary, ordinal: u32, direction: u8) -> String {
    let ordered = stance.ordered_variants();

    let Some(position) = ordered
        .iter()
        .position(|v| v.is_parent() && v.ordinal == ordinal)
    else {
        return NOT_FOUND_NAME.to_string();
    };

    if let Some(wanted) = Directions::from_code(direction) {
        let child = ordered[position + 1..]
            .iter()
            .take_while(|v| !v.is_parent())
            .find(|v| {
                v.variant
                    .role
                    .gate()
                    .is_some_and(|gate| gate.directions.contains(wanted))
            });
        if let Some(name) = child.and_then(|child| display_name(child, library)) {
            return name;
        }
    }

    display_name(&ordered[position], library).unwrap_or_else(|| NOT_FOUND_NAME.to_string())
}

/// Player stance slot, wrapping over the four stances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StanceCycler {
    stance: usize,
}

impl StanceCycler {
    pub fn current(&self) -> usize {
        self.stance
    }

    pub fn set(&mut self, stance: usize) -> usize {
        self.stance = stance.min(STANCE_COUNT - 1);
        self.stance
    }

    pub fn next(&mut self) -> usize {
        self.stance = (self.stance + 1) % STANCE_COUNT;
        self.stance
    }

    pub fn prev(&mut self) -> usize {
        self.stance = (self.stance + STANCE_COUNT - 1) % STANCE_COUNT;
        self.stance
    }
}

/// Current ordinal of one playlist and how it advances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantCycler {
    mode: CycleMode,
    current: u32,
    recent: RecentPicks,
}

impl VariantCycler {
    pub fn new(mode: CycleMode) -> Self {
        Self {
            mode,
            current: 0,
            recent: RecentPicks::default(),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn mode(&self) -> CycleMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CycleMode) {
        self.mode = mode;
    }

    /// Advance to the next ordinal out of `max_count`
    pub fn advance<R: Rng + ?Sized>(&mut self, max_count: u32, rng: &mut R) -> u32 {
        self.current = match self.mode {
            CycleMode::Sequential => next_sequential(self.current, max_count),
            CycleMode::Random => {
                let all: Vec<u32> = (1..=max_count).collect();
                next_weighted_no_repeat(&all, &mut self.recent, rng)
            }
        };
        self.current
    }

    /// Step back one ordinal; always sequential
    pub fn retreat(&mut self, max_count: u32) -> u32 {
        self.current = prev_sequential(self.current, max_count);
        self.current
    }

    /// Pull the current ordinal back into range after the playlist shrank
    pub fn clamp(&mut self, max_count: u32) -> u32 {
        if self.current > max_count {
            self.current = if max_count == 0 { 0 } else { 1 };
        }
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.recent = RecentPicks::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChildGate, ConfigurationEntry, RuleMatch, SourceAnimation, SourceRef, Thresholds,
        VariantInstance,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rule_with(entries: Vec<ConfigurationEntry>) -> Rule {
        let mut rule = Rule::new("General", RuleMatch::General);
        let mut category = crate::models::Category::new("Sword", 1);
        category.stances[0].entries = entries;
        rule.categories.insert("Sword".into(), category);
        rule
    }

    fn gated(health: f32, level: u16) -> ConfigurationEntry {
        ConfigurationEntry::new("Moveset", vec![VariantInstance::parent(SourceRef::new(0, 0))]).with_thresholds(
            Thresholds {
                health_ceiling: health,
                min_level: level,
                ..Thresholds::default()
            },
        )
    }

    #[test]
    fn test_available_indices_filters_and_ranks() {
        let rule = rule_with(vec![
            gated(100.0, 0),
            gated(50.0, 0),
            gated(100.0, 10),
            gated(100.0, 50),
        ]);
        let stats = ActorStats::new(40.0, 100.0, 100.0, 20);

        // slack: #1 = 60 + 20, #2 = 10 + 20, #3 = 60 + 10, #4 excluded by level
        assert_eq!(available_indices(&rule, "Sword", &stats), vec![2, 3, 1]);
    }

    #[test]
    fn test_health_ceiling_excludes() {
        let rule = rule_with(vec![gated(50.0, 0)]);
        let stats = ActorStats::new(80.0, 10.0, 10.0, 99);
        assert!(available_indices(&rule, "Sword", &stats).is_empty());
        assert!(available_indices(&rule, "Dagger", &stats).is_empty());
    }

    #[test]
    fn test_unselected_entries_take_no_ordinal() {
        let rule = rule_with(vec![gated(100.0, 0).deselected(), gated(100.0, 0)]);
        assert_eq!(available_indices(&rule, "Sword", &ActorStats::default()), vec![1]);
    }

    #[test]
    fn test_sequential_wraps() {
        assert_eq!(next_sequential(3, 3), 1);
        assert_eq!(next_sequential(0, 3), 1);
        assert_eq!(next_sequential(1, 3), 2);
        assert_eq!(next_sequential(1, 0), 0);
        assert_eq!(prev_sequential(1, 3), 3);
        assert_eq!(prev_sequential(0, 3), 3);
        assert_eq!(prev_sequential(3, 3), 2);
        assert_eq!(prev_sequential(9, 3), 3);
        assert_eq!(prev_sequential(2, 0), 0);
    }

    #[test]
    fn test_weighted_avoids_recent() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut recent = RecentPicks {
            last: 1,
            second_to_last: 2,
        };
        for _ in 0..50 {
            let mut history = recent;
            let pick = next_weighted_no_repeat(&[1, 2, 3], &mut history, &mut rng);
            assert_eq!(pick, 3);
            assert_eq!(history.last, 3);
            assert_eq!(history.second_to_last, 1);
        }
        recent.push(3);
        assert_eq!(recent.second_to_last, 1);
    }

    #[test]
    fn test_weighted_restores_when_exhausted() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut recent = RecentPicks {
            last: 1,
            second_to_last: 2,
        };
        let pick = next_weighted_no_repeat(&[2, 1], &mut recent, &mut rng);
        assert!(pick == 1 || pick == 2);
        assert_eq!(next_weighted_no_repeat(&[], &mut recent, &mut rng), 0);
    }

    #[test]
    fn test_weighted_prefers_best_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let mut first = 0;
        let mut last = 0;
        for _ in 0..2000 {
            let mut recent = RecentPicks::default();
            match next_weighted_no_repeat(&[4, 5, 6], &mut recent, &mut rng) {
                4 => first += 1,
                6 => last += 1,
                _ => {}
            }
        }
        assert!(first > last);
    }

    fn named_stance() -> (Stance, AnimationLibrary) {
        let front = ChildGate {
            directions: crate::models::Directions::FRONT,
            ..ChildGate::default()
        };
        let stance = Stance::new(vec![ConfigurationEntry::new(
            "Moveset",
            vec![
                VariantInstance::parent(SourceRef::new(0, 0)),
                VariantInstance::parent(SourceRef::new(0, 1)).with_display_name("Renamed"),
                VariantInstance::child(SourceRef::new(0, 2), front),
                VariantInstance::parent(SourceRef::new(0, 9)),
            ],
        )]);
        let library = AnimationLibrary::from(vec![
            SourceAnimation::new(SourceRef::new(0, 0), "Base"),
            SourceAnimation::new(SourceRef::new(0, 1), "Second"),
            SourceAnimation::new(SourceRef::new(0, 2), "Forward"),
        ]);
        (stance, library)
    }

    #[test]
    fn test_variant_name_resolution() {
        let (stance, library) = named_stance();
        assert_eq!(variant_name(&stance, &library, 1, 0), "Base");
        assert_eq!(variant_name(&stance, &library, 2, 0), "Renamed");
        assert_eq!(variant_name(&stance, &library, 2, 1), "Forward");
        // No child gated on "back": parent name
        assert_eq!(variant_name(&stance, &library, 2, 5), "Renamed");
        // Children of ordinal 2 are not visible from ordinal 1
        assert_eq!(variant_name(&stance, &library, 1, 1), "Base");
        // Dangling source and out of range ordinal
        assert_eq!(variant_name(&stance, &library, 3, 0), NOT_FOUND_NAME);
        assert_eq!(variant_name(&stance, &library, 4, 0), NOT_FOUND_NAME);
        assert_eq!(variant_name(&stance, &library, 0, 0), NOT_FOUND_NAME);
    }

    #[test]
    fn test_unnamed_child_falls_back_to_parent() {
        let back = ChildGate {
            directions: crate::models::Directions::BACK,
            ..ChildGate::default()
        };
        let stance = Stance::new(vec![ConfigurationEntry::new(
            "Moveset",
            vec![
                VariantInstance::parent(SourceRef::new(0, 0)),
                VariantInstance::child(SourceRef::new(0, 7), back),
            ],
        )]);
        let library = AnimationLibrary::from(vec![SourceAnimation::new(SourceRef::new(0, 0), "Base")]);

        assert_eq!(variant_name(&stance, &library, 1, 5), "Base");
    }

    #[test]
    fn test_stance_cycler_wraps() {
        let mut cycler = StanceCycler::default();
        assert_eq!(cycler.prev(), 3);
        assert_eq!(cycler.next(), 0);
        assert_eq!(cycler.next(), 1);
        assert_eq!(cycler.set(10), 3);
    }

    #[test]
    fn test_variant_cycler_modes() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut cycler = VariantCycler::new(CycleMode::Sequential);
        assert_eq!(cycler.advance(2, &mut rng), 1);
        assert_eq!(cycler.advance(2, &mut rng), 2);
        assert_eq!(cycler.advance(2, &mut rng), 1);
        assert_eq!(cycler.retreat(2), 2);

        cycler.set_mode(CycleMode::Random);
        cycler.reset();
        let a = cycler.advance(5, &mut rng);
        let b = cycler.advance(5, &mut rng);
        let c = cycler.advance(5, &mut rng);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);

        assert_eq!(cycler.clamp(0), 0);
    }
}
