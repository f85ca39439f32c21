use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable address of a source animation definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRef {
    pub mod_index: u32,
    pub sub_index: u32,
}

impl SourceRef {
    pub fn new(mod_index: u32, sub_index: u32) -> Self {
        Self {
            mod_index,
            sub_index,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mod_index, self.sub_index)
    }
}

bitflags! {
    /// Capability tags carried through to exported documents verbatim
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const IDLE = 1 << 0;
        const POWER_A = 1 << 1;
        const POWER_B = 1 << 2;
        const POWER_L = 1 << 3;
        const POWER_R = 1 << 4;
        const COMBO_POWER = 1 << 5;
    }
}

/// A source animation definition as discovered by the loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAnimation {
    pub source: SourceRef,
    pub name: String,
    #[serde(default)]
    pub moveset: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub capabilities: Capabilities,
}

impl SourceAnimation {
    pub fn new(source: SourceRef, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            moveset: String::new(),
            priority: 0,
            capabilities: Capabilities::empty(),
        }
    }

    pub fn with_moveset(mut self, moveset: impl Into<String>) -> Self {
        self.moveset = moveset.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Lookup of source animation definitions by (mod, sub) index
///
/// Iteration is ordered by [`SourceRef`], so anything derived from it is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SourceAnimation>", into = "Vec<SourceAnimation>")]
pub struct AnimationLibrary {
    animations: BTreeMap<SourceRef, SourceAnimation>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition, returning the previous one
    pub fn insert(&mut self, animation: SourceAnimation) -> Option<SourceAnimation> {
        self.animations.insert(animation.source, animation)
    }

    pub fn get(&self, source: SourceRef) -> Option<&SourceAnimation> {
        self.animations.get(&source)
    }

    pub fn contains(&self, source: SourceRef) -> bool {
        self.animations.contains_key(&source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceAnimation> {
        self.animations.values()
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl From<Vec<SourceAnimation>> for AnimationLibrary {
    fn from(animations: Vec<SourceAnimation>) -> Self {
        let mut library = Self::new();
        for animation in animations {
            if let Some(previous) = library.insert(animation) {
                tracing::warn!(
                    "Duplicate source animation {} ({}), keeping the later definition",
                    previous.source,
                    previous.name
                );
            }
        }
        library
    }
}

impl From<AnimationLibrary> for Vec<SourceAnimation> {
    fn from(library: AnimationLibrary) -> Self {
        library.animations.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_lookup() {
        let library = AnimationLibrary::from(vec![
            SourceAnimation::new(SourceRef::new(1, 0), "Heavy"),
            SourceAnimation::new(SourceRef::new(0, 2), "Light")
                .with_moveset("Swift Strikes")
                .with_priority(5),
        ]);

        assert_eq!(library.len(), 2);
        assert_eq!(library.get(SourceRef::new(0, 2)).unwrap().priority, 5);
        assert_eq!(library.get(SourceRef::new(0, 2)).unwrap().moveset, "Swift Strikes");
        assert!(!library.contains(SourceRef::new(9, 9)));

        let order: Vec<_> = library.iter().map(|a| a.source).collect();
        assert_eq!(order, vec![SourceRef::new(0, 2), SourceRef::new(1, 0)]);
    }

    #[test]
    fn test_duplicate_keeps_later() {
        let library = AnimationLibrary::from(vec![
            SourceAnimation::new(SourceRef::new(0, 0), "First"),
            SourceAnimation::new(SourceRef::new(0, 0), "Second"),
        ]);
        assert_eq!(library.len(), 1);
        assert_eq!(library.get(SourceRef::new(0, 0)).unwrap().name, "Second");
    }

    #[test]
    fn test_capabilities_roundtrip_yaml() {
        let animation = SourceAnimation::new(SourceRef::new(0, 0), "Idle")
            .with_capabilities(Capabilities::IDLE | Capabilities::COMBO_POWER);
        let yaml = serde_yaml_ng::to_string(&animation).unwrap();
        let loaded: SourceAnimation = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(loaded.capabilities, animation.capabilities);
    }
}
