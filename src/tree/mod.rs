//! Configuration tree and state tree, kept in step by one routine.
//!
//! ```text
//!   router ──▶ Trees::commit(entity) ──┬─▶ ConfigTree  (persisted)
//!                                      └─▶ StateTree   (mirrored, dirty)
//!                                              │
//!   Trees::take_changes() ◀────────────────────┘  ──▶ EventSink
//! ```
//!
//! Every category implements [`Mirrored`], which names its state type
//! and the maps on both sides.  Routers never touch the two maps
//! separately for create/update/delete: [`Trees::commit`] and
//! [`Trees::remove`] keep the rule "a state entry exists iff its config
//! is active" in one place.

pub mod config;
pub mod state;

use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::app::events::StateChange;
use crate::equipment::Category;

use config::{
    Body, ChemController, Circuit, CircuitGroup, ConfigTree, Feature, Heater, LightGroup, Pump,
    Valve,
};
use state::{
    BodyState, ChemControllerState, CircuitState, ControllerStatus, GroupState, HeaterState,
    PumpState, StateTree, ValveState,
};

// ---------------------------------------------------------------------------
// Mirroring contract
// ---------------------------------------------------------------------------

/// Runtime half of an entity.
pub trait StateEntity: Serialize + Default {
    fn dirty(&mut self) -> &mut bool;
}

/// Configuration half of an entity and how it maps onto its state.
pub trait Mirrored: Clone {
    type State: StateEntity;
    const CATEGORY: Category;

    fn id(&self) -> u16;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);

    /// Copy config-derived attributes into the state entry.
    fn mirror(&self, state: &mut Self::State);

    fn configs(tree: &ConfigTree) -> &BTreeMap<u16, Self>;
    fn configs_mut(tree: &mut ConfigTree) -> &mut BTreeMap<u16, Self>;
    fn states(tree: &StateTree) -> &BTreeMap<u16, Self::State>;
    fn states_mut(tree: &mut StateTree) -> &mut BTreeMap<u16, Self::State>;
}

macro_rules! state_entity {
    ($($state:ty),* $(,)?) => {
        $(impl StateEntity for $state {
            fn dirty(&mut self) -> &mut bool {
                &mut self.has_changed
            }
        })*
    };
}

state_entity!(
    BodyState,
    CircuitState,
    GroupState,
    ValveState,
    HeaterState,
    PumpState,
    ChemControllerState,
);

macro_rules! mirrored {
    ($config:ty => $state:ty, $category:expr, $field:ident, |$c:ident, $s:ident| $body:block) => {
        impl Mirrored for $config {
            type State = $state;
            const CATEGORY: Category = $category;

            fn id(&self) -> u16 {
                self.id
            }
            fn is_active(&self) -> bool {
                self.is_active
            }
            fn set_active(&mut self, active: bool) {
                self.is_active = active;
            }
            fn mirror(&self, state: &mut $state) {
                let $c = self;
                let $s = state;
                $body
            }
            fn configs(tree: &ConfigTree) -> &BTreeMap<u16, Self> {
                &tree.$field
            }
            fn configs_mut(tree: &mut ConfigTree) -> &mut BTreeMap<u16, Self> {
                &mut tree.$field
            }
            fn states(tree: &StateTree) -> &BTreeMap<u16, $state> {
                &tree.$field
            }
            fn states_mut(tree: &mut StateTree) -> &mut BTreeMap<u16, $state> {
                &mut tree.$field
            }
        }
    };
}

mirrored!(Body => BodyState, Category::Body, bodies, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.body_type = c.body_type;
    s.circuit = c.circuit;
    s.set_point = c.set_point;
    s.heat_mode = c.heat_mode;
});

mirrored!(Circuit => CircuitState, Category::Circuit, circuits, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.function = c.function;
    if !c.function.is_light() {
        s.lighting_theme = None;
    }
});

mirrored!(Feature => CircuitState, Category::Feature, features, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.function = c.function;
});

mirrored!(CircuitGroup => GroupState, Category::CircuitGroup, circuit_groups, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
});

mirrored!(LightGroup => GroupState, Category::LightGroup, light_groups, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.lighting_theme = c.lighting_theme;
});

mirrored!(Valve => ValveState, Category::Valve, valves, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.circuit = c.circuit;
});

mirrored!(Heater => HeaterState, Category::Heater, heaters, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.heater_type = c.heater_type;
});

mirrored!(Pump => PumpState, Category::Pump, pumps, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.pump_type = c.pump_type;
});

mirrored!(ChemController => ChemControllerState, Category::ChemController, chem_controllers, |c, s| {
    s.id = c.id;
    s.name.clone_from(&c.name);
    s.chem_type = c.chem_type;
});

// Call a generic `Trees` method once per mirrored category.
macro_rules! for_each_category {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        $self.$method::<Body>($($arg),*);
        $self.$method::<Circuit>($($arg),*);
        $self.$method::<Feature>($($arg),*);
        $self.$method::<CircuitGroup>($($arg),*);
        $self.$method::<LightGroup>($($arg),*);
        $self.$method::<Valve>($($arg),*);
        $self.$method::<Heater>($($arg),*);
        $self.$method::<Pump>($($arg),*);
        $self.$method::<ChemController>($($arg),*);
    };
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// Both trees plus the queue of changes not yet broadcast.
#[derive(Debug, Default)]
pub struct Trees {
    pub config: ConfigTree,
    pub state: StateTree,
    changes: Vec<StateChange>,
}

impl Trees {
    pub fn new(mut config: ConfigTree) -> Self {
        config.normalize_egg_timers();
        let mut trees = Self {
            config,
            ..Self::default()
        };
        trees.resync();
        trees
    }

    pub fn config_of<T: Mirrored>(&self, id: u16) -> Option<&T> {
        T::configs(&self.config).get(&id)
    }

    pub fn state_of<T: Mirrored>(&self, id: u16) -> Option<&T::State> {
        T::states(&self.state).get(&id)
    }

    /// Create or replace the config entry and bring its state entry in line.
    pub fn commit<T: Mirrored>(&mut self, entity: T) {
        let id = entity.id();
        if entity.is_active() {
            let state = T::states_mut(&mut self.state).entry(id).or_default();
            entity.mirror(state);
            *state.dirty() = true;
        } else if T::states_mut(&mut self.state).remove(&id).is_some() {
            self.changes.push(StateChange::Removed {
                category: T::CATEGORY,
                id,
            });
        }
        T::configs_mut(&mut self.config).insert(id, entity);
    }

    /// Remove an entity from both trees.  Returns the config entry, marked
    /// inactive.
    pub fn remove<T: Mirrored>(&mut self, id: u16) -> Option<T> {
        let mut removed = T::configs_mut(&mut self.config).remove(&id);
        if let Some(entity) = removed.as_mut() {
            entity.set_active(false);
        }
        let had_state = T::states_mut(&mut self.state).remove(&id).is_some();
        if removed.is_some() || had_state {
            self.changes.push(StateChange::Removed {
                category: T::CATEGORY,
                id,
            });
        }
        removed
    }

    /// Apply `f` to a state entry and mark it dirty.  Returns `false` when
    /// the entity has no state.
    pub fn touch<T: Mirrored>(&mut self, id: u16, f: impl FnOnce(&mut T::State)) -> bool {
        match T::states_mut(&mut self.state).get_mut(&id) {
            Some(state) => {
                f(state);
                *state.dirty() = true;
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, status: ControllerStatus) {
        if self.state.status != status {
            self.state.status = status.clone();
            self.changes.push(StateChange::Status(status));
        }
    }

    /// Queue a broadcast of the current message list.
    pub fn messages_changed(&mut self) {
        self.changes.push(StateChange::Messages {
            messages: self.state.messages.clone(),
        });
    }

    /// Drop state entries whose config is gone or inactive.
    pub fn cleanup(&mut self) {
        for_each_category!(self.prune());
    }

    /// Mirror every active config entry, then drop orphans.  Used after the
    /// config tree is replaced wholesale.
    pub fn resync(&mut self) {
        for_each_category!(self.resync_category());
        self.cleanup();
    }

    /// Drain queued changes plus every dirty state entry.
    pub fn take_changes(&mut self) -> Vec<StateChange> {
        for_each_category!(self.drain_dirty());
        std::mem::take(&mut self.changes)
    }

    fn prune<T: Mirrored>(&mut self) {
        let configs = T::configs(&self.config);
        let orphans: Vec<u16> = T::states(&self.state)
            .keys()
            .filter(|id| !configs.get(*id).is_some_and(Mirrored::is_active))
            .copied()
            .collect();
        for id in orphans {
            T::states_mut(&mut self.state).remove(&id);
            self.changes.push(StateChange::Removed {
                category: T::CATEGORY,
                id,
            });
        }
    }

    fn resync_category<T: Mirrored>(&mut self) {
        let active: Vec<T> = T::configs(&self.config)
            .values()
            .filter(|c| c.is_active())
            .cloned()
            .collect();
        let states = T::states_mut(&mut self.state);
        for entity in active {
            let state = states.entry(entity.id()).or_default();
            entity.mirror(state);
            *state.dirty() = true;
        }
    }

    fn drain_dirty<T: Mirrored>(&mut self) {
        for (id, state) in T::states_mut(&mut self.state) {
            if !std::mem::take(state.dirty()) {
                continue;
            }
            match serde_json::to_value(&*state) {
                Ok(value) => self.changes.push(StateChange::Updated {
                    category: T::CATEGORY,
                    id: *id,
                    state: value,
                }),
                Err(e) => warn!("{} {}: state not serialisable: {}", T::CATEGORY, id, e),
            }
        }
    }
}
