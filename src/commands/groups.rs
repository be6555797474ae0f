//! Group router: circuit groups and light groups.
//!
//! Both kinds draw ids from the same range.  A group's on/off state is
//! never set directly; [`recompute_group_states`] derives it from the
//! members after every related change.
//!
//! ```text
//!  set_group_state ──▶ join_all(member set_state ...) ──▶ first error
//!  set_light_group_theme ──▶ members on/off ──▶ sequence_light_group
//!                                                   │
//!                         action = sync/swim/...  ◀─┘
//!                         Timer(light_sequence_ms) ──▶ action = idle
//! ```

use core::time::Duration;

use futures_util::future::join_all;
use heapless::Vec as HVec;
use log::debug;
use serde::Deserialize;

use crate::app::ports::HardwareGateway;
use crate::board::Board;
use crate::equipment::{BOARD_MASTER, Category, DesiredState, LightAction, LightTheme, merge_egg_timer};
use crate::error::{BoardError, Result};
use crate::ids::{IdCategory, allocate_next, is_in_range};
use crate::tree::Trees;
use crate::tree::config::{
    CircuitGroup, GroupMember, LightGroup, LightGroupMember, MAX_GROUP_MEMBERS,
};

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupMemberUpdate {
    pub circuit: Option<u16>,
    pub desired_state: Option<DesiredState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitGroupUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    pub egg_timer: Option<u16>,
    pub dont_stop: Option<bool>,
    pub members: Option<Vec<GroupMemberUpdate>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightGroupMemberUpdate {
    pub circuit: Option<u16>,
    pub color: Option<u8>,
    pub swim_delay: Option<u8>,
    pub position: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightGroupUpdate {
    pub id: Option<u16>,
    pub name: Option<String>,
    pub egg_timer: Option<u16>,
    pub dont_stop: Option<bool>,
    pub members: Option<Vec<LightGroupMemberUpdate>>,
}

/// Resize `current` to `updates.len()` and merge each update over the
/// prior member at the same index.
fn merge_members<M: Copy + Default, U>(
    current: &HVec<M, MAX_GROUP_MEMBERS>,
    updates: &[U],
    apply: impl Fn(&mut M, &U),
) -> Result<HVec<M, MAX_GROUP_MEMBERS>> {
    if updates.len() > MAX_GROUP_MEMBERS {
        return Err(BoardError::InvalidParameter(format!(
            "{} members exceeds the limit of {}",
            updates.len(),
            MAX_GROUP_MEMBERS
        )));
    }
    let mut merged = HVec::new();
    for (idx, update) in updates.iter().enumerate() {
        let mut member = current.get(idx).copied().unwrap_or_default();
        apply(&mut member, update);
        // Capacity checked above.
        let _ = merged.push(member);
    }
    Ok(merged)
}

fn check_member_circuit(trees: &Trees, circuit: u16) -> Result<()> {
    let limits = &trees.config.limits;
    let valid = circuit != 0
        && (is_in_range(IdCategory::Circuits, limits, circuit)
            || is_in_range(IdCategory::Features, limits, circuit));
    if valid {
        Ok(())
    } else {
        Err(BoardError::InvalidParameter(format!(
            "group member circuit {circuit} is not a circuit or feature"
        )))
    }
}

// ---------------------------------------------------------------------------
// Aggregate state
// ---------------------------------------------------------------------------

/// Derive every group's `is_on` from its members.
///
/// A circuit group is on when any member that is active and not ignored
/// has the live state it declares.  A light group is on when any member
/// is on.
pub fn recompute_group_states(trees: &mut Trees) {
    let mut circuit_groups = Vec::new();
    for g in trees.config.circuit_groups.values().filter(|g| g.is_active) {
        let on = g.members.iter().any(|m| {
            m.desired_state
                .as_bool()
                .zip(trees.state.is_on(m.circuit))
                .is_some_and(|(desired, live)| desired == live)
        });
        circuit_groups.push((g.id, on));
    }
    let mut light_groups = Vec::new();
    for g in trees.config.light_groups.values().filter(|g| g.is_active) {
        let on = g
            .members
            .iter()
            .any(|m| trees.state.is_on(m.circuit).unwrap_or(false));
        light_groups.push((g.id, on));
    }

    for (id, on) in circuit_groups {
        if trees.state_of::<CircuitGroup>(id).is_some_and(|s| s.is_on != on) {
            trees.touch::<CircuitGroup>(id, |s| s.is_on = on);
        }
    }
    for (id, on) in light_groups {
        if trees.state_of::<LightGroup>(id).is_some_and(|s| s.is_on != on) {
            trees.touch::<LightGroup>(id, |s| s.is_on = on);
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct GroupCommands<'a, G: HardwareGateway + 'static> {
    board: &'a Board<G>,
}

impl<'a, G: HardwareGateway + 'static> GroupCommands<'a, G> {
    pub(crate) fn new(board: &'a Board<G>) -> Self {
        Self { board }
    }

    /// Fan `on` out to every member concurrently.  The first member
    /// failure is returned; commands already issued to other members stand.
    pub async fn set_group_state(&self, id: u16, on: bool) -> Result<()> {
        self.check_range(Category::CircuitGroup, id)?;
        let targets: Vec<(u16, bool)> = self
            .board
            .with_trees(|t| {
                if let Some(g) = t.config_of::<CircuitGroup>(id).filter(|g| g.is_active) {
                    Some(g.members.iter().map(|m| (m.circuit, on)).collect::<Vec<_>>())
                } else {
                    t.config_of::<LightGroup>(id)
                        .filter(|g| g.is_active)
                        .map(|g| g.members.iter().map(|m| (m.circuit, on)).collect::<Vec<_>>())
                }
            })
            .ok_or(BoardError::not_found(Category::CircuitGroup, id))?;

        let _guard = self.board.suspend_status();
        self.fan_out(&targets).await
    }

    async fn fan_out(&self, targets: &[(u16, bool)]) -> Result<()> {
        let circuits = self.board.circuits();
        let results = join_all(targets.iter().map(|(c, on)| circuits.set_state(*c, *on))).await;
        results.into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    // -----------------------------------------------------------------------
    // Light groups
    // -----------------------------------------------------------------------

    /// Apply a theme: off turns every member off, anything else turns on
    /// the members that are off.  Most themes then run a timed sequence.
    pub async fn set_light_group_theme(&self, id: u16, theme: u8) -> Result<()> {
        let theme = LightTheme::from_code(theme)
            .ok_or_else(|| BoardError::InvalidParameter(format!("unknown light theme {theme}")))?;
        self.check_range(Category::LightGroup, id)?;
        let _guard = self.board.suspend_status();

        let targets = self.board.with_trees_mut(|t| -> Result<Vec<(u16, bool)>> {
            let mut group = t
                .config_of::<LightGroup>(id)
                .filter(|g| g.is_active)
                .cloned()
                .ok_or(BoardError::not_found(Category::LightGroup, id))?;
            group.lighting_theme = Some(theme);
            let targets = group
                .members
                .iter()
                .filter(|m| theme.is_off() || !t.state.is_on(m.circuit).unwrap_or(false))
                .map(|m| (m.circuit, !theme.is_off()))
                .collect();
            t.commit(group);
            Ok(targets)
        })?;

        let result = self.fan_out(&targets).await;
        if let Some(action) = theme.action() {
            self.sequence_light_group(id, action)?;
        }
        self.board.with_trees_mut(|t| t.touch::<LightGroup>(id, |_| {}));
        result
    }

    /// Show `action` on the group, reverting to idle after the configured
    /// sequence time.  Starting a sequence cancels the group's previous one.
    pub fn sequence_light_group(&self, id: u16, action: LightAction) -> Result<()> {
        self.check_range(Category::LightGroup, id)?;
        let found = self
            .board
            .with_trees_mut(|t| t.touch::<LightGroup>(id, |s| s.action = action));
        if !found {
            return Err(BoardError::not_found(Category::LightGroup, id));
        }
        self.board.emit_changes();

        let board = self.board.clone();
        let delay = Duration::from_millis(self.board.config().light_sequence_ms);
        let task = self.board.spawn(async move {
            async_io_mini::Timer::after(delay).await;
            board.with_trees_mut(|t| t.touch::<LightGroup>(id, |s| s.action = LightAction::Idle));
            board.emit_changes();
        });
        let prior = self.board.inner.light_sequences.borrow_mut().insert(id, task);
        if prior.is_some() {
            debug!("Light group {}: previous sequence cancelled", id);
        }
        Ok(())
    }

    /// Rewrite member order, positions and colors.
    pub fn set_light_group_attribs(&self, id: u16, members: &[LightGroupMemberUpdate]) -> Result<LightGroup> {
        self.check_range(Category::LightGroup, id)?;
        let group = self.board.with_trees_mut(|t| -> Result<LightGroup> {
            let mut group = t
                .config_of::<LightGroup>(id)
                .cloned()
                .ok_or(BoardError::not_found(Category::LightGroup, id))?;
            group.members = merge_light_members(&group.members, members)?;
            for m in &group.members {
                check_member_circuit(t, m.circuit)?;
            }
            t.commit(group.clone());
            Ok(group)
        })?;
        self.board.emit_changes();
        Ok(group)
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn set_circuit_group(&self, update: CircuitGroupUpdate) -> Result<CircuitGroup> {
        let default_egg_timer = self.board.config().default_egg_timer;
        let group = self.board.with_trees_mut(|t| -> Result<CircuitGroup> {
            let id = self.resolve_id(t, Category::CircuitGroup, update.id)?;
            if t.config_of::<LightGroup>(id).is_some() {
                return Err(BoardError::invalid_id(Category::CircuitGroup, id));
            }
            let mut group = t.config_of::<CircuitGroup>(id).cloned().unwrap_or_else(|| CircuitGroup {
                id,
                name: format!("Group {}", id - IdCategory::CircuitGroups.range(&t.config.limits).start + 1),
                master: BOARD_MASTER,
                egg_timer: default_egg_timer,
                ..CircuitGroup::default()
            });
            if let Some(name) = update.name.clone() {
                group.name = name;
            }
            if let Some(members) = update.members.as_deref() {
                group.members = merge_members(&group.members, members, |m: &mut GroupMember, u| {
                    if let Some(c) = u.circuit {
                        m.circuit = c;
                    }
                    if let Some(d) = u.desired_state {
                        m.desired_state = d;
                    }
                })?;
                for m in &group.members {
                    check_member_circuit(t, m.circuit)?;
                }
            }
            group.dont_stop = merge_egg_timer(&mut group.egg_timer, update.egg_timer, update.dont_stop);
            group.is_active = true;
            t.commit(group.clone());
            recompute_group_states(t);
            Ok(group)
        })?;
        self.board.emit_changes();
        Ok(group)
    }

    pub fn set_light_group(&self, update: LightGroupUpdate) -> Result<LightGroup> {
        let default_egg_timer = self.board.config().default_egg_timer;
        let group = self.board.with_trees_mut(|t| -> Result<LightGroup> {
            let id = self.resolve_id(t, Category::LightGroup, update.id)?;
            if t.config_of::<CircuitGroup>(id).is_some() {
                return Err(BoardError::invalid_id(Category::LightGroup, id));
            }
            let mut group = t.config_of::<LightGroup>(id).cloned().unwrap_or_else(|| LightGroup {
                id,
                name: format!("Light Group {}", id - IdCategory::CircuitGroups.range(&t.config.limits).start + 1),
                master: BOARD_MASTER,
                egg_timer: default_egg_timer,
                ..LightGroup::default()
            });
            if let Some(name) = update.name.clone() {
                group.name = name;
            }
            if let Some(members) = update.members.as_deref() {
                group.members = merge_light_members(&group.members, members)?;
                for m in &group.members {
                    check_member_circuit(t, m.circuit)?;
                }
            }
            group.dont_stop = merge_egg_timer(&mut group.egg_timer, update.egg_timer, update.dont_stop);
            group.is_active = true;
            t.commit(group.clone());
            recompute_group_states(t);
            Ok(group)
        })?;
        self.board.emit_changes();
        Ok(group)
    }

    pub fn delete_circuit_group(&self, id: u16) -> Result<()> {
        self.check_range(Category::CircuitGroup, id)?;
        self.board
            .with_trees_mut(|t| t.remove::<CircuitGroup>(id))
            .ok_or(BoardError::not_found(Category::CircuitGroup, id))?;
        self.board.emit_changes();
        Ok(())
    }

    pub fn delete_light_group(&self, id: u16) -> Result<()> {
        self.check_range(Category::LightGroup, id)?;
        self.board
            .with_trees_mut(|t| t.remove::<LightGroup>(id))
            .ok_or(BoardError::not_found(Category::LightGroup, id))?;
        self.board.inner.light_sequences.borrow_mut().remove(&id);
        self.board.emit_changes();
        Ok(())
    }

    fn resolve_id(&self, t: &Trees, category: Category, id: Option<u16>) -> Result<u16> {
        let limits = &t.config.limits;
        match id.filter(|id| *id != 0) {
            Some(id) if is_in_range(IdCategory::CircuitGroups, limits, id) => Ok(id),
            Some(id) => Err(BoardError::invalid_id(category, id)),
            None => allocate_next(
                IdCategory::CircuitGroups,
                limits,
                t.config
                    .circuit_groups
                    .keys()
                    .chain(t.config.light_groups.keys())
                    .copied(),
                &[],
            )
            .map_err(|_| BoardError::RangeExhausted(category)),
        }
    }

    fn check_range(&self, category: Category, id: u16) -> Result<()> {
        let limits = self.board.with_trees(|t| t.config.limits);
        if is_in_range(IdCategory::CircuitGroups, &limits, id) {
            Ok(())
        } else {
            Err(BoardError::invalid_id(category, id))
        }
    }
}

fn merge_light_members(
    current: &HVec<LightGroupMember, MAX_GROUP_MEMBERS>,
    updates: &[LightGroupMemberUpdate],
) -> Result<HVec<LightGroupMember, MAX_GROUP_MEMBERS>> {
    let mut merged = merge_members(current, updates, |m: &mut LightGroupMember, u| {
        if let Some(c) = u.circuit {
            m.circuit = c;
        }
        if let Some(color) = u.color {
            m.color = color;
        }
        if let Some(delay) = u.swim_delay {
            m.swim_delay = delay;
        }
        if let Some(p) = u.position {
            m.position = p;
        }
    })?;
    // Members without an explicit position take their list index.
    for (idx, m) in merged.iter_mut().enumerate() {
        if m.position == 0 {
            m.position = idx as u8 + 1;
        }
    }
    Ok(merged)
}
