// State management module
//
// MovesetManager owns the data model and the player's cycling state, hands out
// read access under RwLock, and emits change events for listeners.

pub mod cache;
pub mod combo;

pub use cache::MaxVariantCache;
pub use combo::{ActorSource, ComboTracker, SelectionEvent};

use crate::metrics::Metrics;
use crate::models::{
    ActorSnapshot, AnimationLibrary, ConfigurationEntry, CycleMode, ModelError, MovesetModel, Rule,
    RuleMatch, RuleRef, STANCE_COUNT,
};
use crate::services::{
    ConditionDocument, DocumentBuilder, Resolution, RuleResolver, StanceCycler, VariantCycler,
    available_indices, variant_name,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::broadcast;

/// Change events emitted when the model or player selection changes
#[derive(Clone, Debug, PartialEq)]
pub enum ModelChange {
    /// A rule was declared
    RuleAdded { rule: RuleRef, name: String },

    /// A rule was removed; later declared indices shifted down by one
    RuleRemoved { name: String },

    /// Entries of one stance were replaced
    StanceEdited {
        rule: RuleRef,
        category: String,
        stance: usize,
    },

    /// Arbitrary edit through [`MovesetManager::update`]
    ModelEdited,

    /// The model was replaced wholesale
    ModelReloaded,

    /// Documents were compiled
    Compiled { documents: usize },

    /// Player switched stance slot
    StanceChanged { stance: usize },

    /// Player's active ordinal changed for a category
    VariantChanged { category: String, ordinal: u32 },
}

/// Player-facing cycling state
#[derive(Debug, Default)]
struct PlayerSelection {
    mode: CycleMode,
    stance: StanceCycler,
    variants: HashMap<(String, usize), VariantCycler>,
}

impl PlayerSelection {
    fn cycler(&mut self, category: &str, stance: usize) -> &mut VariantCycler {
        let mode = self.mode;
        self.variants
            .entry((category.to_string(), stance))
            .or_insert_with(|| VariantCycler::new(mode))
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single owner of the stance configuration.
///
/// - Thread-safe access to [`MovesetModel`] and [`AnimationLibrary`] via `RwLock`
/// - Owns the [`MaxVariantCache`], invalidated on every edit
/// - Player stance/variant cycling
/// - NPC resolution and candidate ranking
/// - [`ModelChange`] events over a tokio broadcast channel
pub struct MovesetManager {
    model: RwLock<MovesetModel>,
    library: RwLock<AnimationLibrary>,
    cache: RwLock<MaxVariantCache>,
    player: Mutex<PlayerSelection>,
    metrics: Arc<Metrics>,
    change_tx: broadcast::Sender<ModelChange>,
}

impl MovesetManager {
    /// Create a manager with a broadcast buffer of 100 events
    pub fn new(model: MovesetModel, library: AnimationLibrary) -> Self {
        Self::with_metrics(model, library, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(model: MovesetModel, library: AnimationLibrary, metrics: Arc<Metrics>) -> Self {
        let (change_tx, _) = broadcast::channel(100);
        Self {
            model: RwLock::new(model),
            library: RwLock::new(library),
            cache: RwLock::new(MaxVariantCache::new()),
            player: Mutex::new(PlayerSelection::default()),
            metrics,
            change_tx,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelChange> {
        self.change_tx.subscribe()
    }

    fn emit(&self, change: ModelChange) {
        // Nobody listening is fine
        let _ = self.change_tx.send(change);
    }

    /// Clone of the current model
    pub fn snapshot(&self) -> MovesetModel {
        read_lock(&self.model).clone()
    }

    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&MovesetModel) -> R,
    {
        f(&read_lock(&self.model))
    }

    pub fn read_library<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AnimationLibrary) -> R,
    {
        f(&read_lock(&self.library))
    }

    /// Mutate the model; invalidates the variant cache
    pub fn update<F, R>(&self, update_fn: F) -> R
    where
        F: FnOnce(&mut MovesetModel) -> R,
    {
        let result = {
            let mut model = write_lock(&self.model);
            update_fn(&mut model)
        };
        write_lock(&self.cache).invalidate();
        self.emit(ModelChange::ModelEdited);
        result
    }

    /// Replace the model and library, e.g. after loading from disk
    pub fn replace(&self, mut model: MovesetModel, library: AnimationLibrary) {
        let rebuilt = model.reconcile();
        if rebuilt > 0 {
            tracing::info!("Reconstructed {} categories from defaults", rebuilt);
        }
        *write_lock(&self.model) = model;
        *write_lock(&self.library) = library;
        write_lock(&self.cache).invalidate();
        mutex_lock(&self.player).variants.clear();
        self.emit(ModelChange::ModelReloaded);
    }

    pub fn add_rule(&self, name: impl Into<String>, matcher: RuleMatch) -> Result<RuleRef, ModelError> {
        let name = name.into();
        let rule = write_lock(&self.model).add_rule(name.clone(), matcher)?;
        write_lock(&self.cache).invalidate();
        self.emit(ModelChange::RuleAdded { rule, name });
        Ok(rule)
    }

    pub fn remove_rule(&self, index: usize) -> Result<Rule, ModelError> {
        let rule = write_lock(&self.model).remove_rule(index)?;
        write_lock(&self.cache).invalidate();
        self.emit(ModelChange::RuleRemoved {
            name: rule.name.clone(),
        });
        Ok(rule)
    }

    /// Replace the entries of one stance of one rule
    pub fn set_stance_entries(
        &self,
        rule: RuleRef,
        category: &str,
        stance: usize,
        entries: Vec<ConfigurationEntry>,
    ) -> Result<(), ModelError> {
        if stance >= STANCE_COUNT {
            return Err(ModelError::StanceOutOfRange(stance));
        }
        {
            let mut model = write_lock(&self.model);
            // Only declared rules can be missing
            let target = model.rule_mut(rule).ok_or(match rule {
                RuleRef::Declared(index) => ModelError::UnknownRule(index),
                RuleRef::Player | RuleRef::General => ModelError::UnknownRule(0),
            })?;
            let slot = target
                .category_mut(category)
                .ok_or_else(|| ModelError::UnknownCategory(category.to_string()))?
                .stance_mut(stance)
                .ok_or(ModelError::StanceOutOfRange(stance))?;
            slot.entries = entries;
        }
        write_lock(&self.cache).invalidate();
        self.emit(ModelChange::StanceEdited {
            rule,
            category: category.to_string(),
            stance,
        });
        Ok(())
    }

    /// Parent-variant count of a stance, rebuilding the cache if needed
    pub fn max_variants(&self, rule: RuleRef, category: &str, stance: usize) -> u32 {
        if let Some(count) = read_lock(&self.cache).get(rule, category, stance) {
            return count;
        }
        let model = read_lock(&self.model);
        let mut cache = write_lock(&self.cache);
        cache.rebuild(&model);
        cache.get(rule, category, stance).unwrap_or(0)
    }

    /// Compile every document and refresh the variant cache
    pub fn compile_documents(&self) -> Vec<ConditionDocument> {
        let start = Instant::now();
        let documents = {
            let model = read_lock(&self.model);
            let library = read_lock(&self.library);
            let documents = DocumentBuilder::new(&model, &library)
                .with_metrics(&self.metrics)
                .build();
            write_lock(&self.cache).rebuild(&model);
            documents
        };
        self.metrics.record_compile_time(start.elapsed());
        self.emit(ModelChange::Compiled {
            documents: documents.len(),
        });
        documents
    }

    /// Rule driving an NPC's category
    pub fn resolve(&self, actor: Option<&ActorSnapshot>, category: &str) -> Resolution {
        let resolution = self.read(|model| RuleResolver::new(model).resolve(actor, category));
        self.metrics
            .record_resolution(resolution.rule == RuleRef::General);
        resolution
    }

    /// Resolve an NPC and rank the resolved rule's candidates against its stats
    pub fn npc_candidates(&self, actor: Option<&ActorSnapshot>, category: &str) -> (Resolution, Vec<u32>) {
        let resolution = self.resolve(actor, category);
        let Some(actor) = actor else {
            return (resolution, Vec::new());
        };
        let candidates = self.read(|model| {
            model
                .rule(resolution.rule)
                .map(|rule| available_indices(rule, category, &actor.stats))
                .unwrap_or_default()
        });
        (resolution, candidates)
    }

    pub fn cycle_mode(&self) -> CycleMode {
        mutex_lock(&self.player).mode
    }

    /// Switch how player variants advance; applies to every playlist
    pub fn set_cycle_mode(&self, mode: CycleMode) {
        let mut player = mutex_lock(&self.player);
        player.mode = mode;
        for cycler in player.variants.values_mut() {
            cycler.set_mode(mode);
        }
    }

    pub fn player_stance(&self) -> usize {
        mutex_lock(&self.player).stance.current()
    }

    pub fn next_player_stance(&self) -> usize {
        let stance = mutex_lock(&self.player).stance.next();
        self.emit(ModelChange::StanceChanged { stance });
        stance
    }

    pub fn prev_player_stance(&self) -> usize {
        let stance = mutex_lock(&self.player).stance.prev();
        self.emit(ModelChange::StanceChanged { stance });
        stance
    }

    pub fn set_player_stance(&self, stance: usize) -> usize {
        let stance = mutex_lock(&self.player).stance.set(stance);
        self.emit(ModelChange::StanceChanged { stance });
        stance
    }

    /// Current player ordinal for a category in the active stance, 0 if none yet.
    ///
    /// Pulled back into range if the playlist shrank since the last cycle.
    pub fn player_variant(&self, category: &str) -> u32 {
        let stance = self.player_stance();
        let max = self.max_variants(RuleRef::Player, category, stance);
        mutex_lock(&self.player)
            .variants
            .get_mut(&(category.to_string(), stance))
            .map(|cycler| cycler.clamp(max))
            .unwrap_or(0)
    }

    /// Advance the player's variant for a category in the active stance
    pub fn next_player_variant<R: Rng + ?Sized>(&self, category: &str, rng: &mut R) -> u32 {
        let stance = self.player_stance();
        let max = self.max_variants(RuleRef::Player, category, stance);
        let ordinal = mutex_lock(&self.player).cycler(category, stance).advance(max, rng);
        self.emit(ModelChange::VariantChanged {
            category: category.to_string(),
            ordinal,
        });
        ordinal
    }

    /// Step the player's variant back for a category in the active stance
    pub fn prev_player_variant(&self, category: &str) -> u32 {
        let stance = self.player_stance();
        let max = self.max_variants(RuleRef::Player, category, stance);
        let ordinal = mutex_lock(&self.player).cycler(category, stance).retreat(max);
        self.emit(ModelChange::VariantChanged {
            category: category.to_string(),
            ordinal,
        });
        ordinal
    }

    /// Display name of the player's active variant, honoring a direction code
    pub fn player_variant_name(&self, category: &str, direction: u8) -> String {
        let stance = self.player_stance();
        let ordinal = self.player_variant(category);
        let model = read_lock(&self.model);
        let library = read_lock(&self.library);
        match model.player.category(category).and_then(|c| c.stance(stance)) {
            Some(slot) => variant_name(slot, &library, ordinal, direction),
            None => crate::services::NOT_FOUND_NAME.to_string(),
        }
    }
}
