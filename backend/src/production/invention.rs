//! Inventing tools and higher devices
//!
//! Each night every active agent may invent. Invention is driven by
//! experience: the agent considers the resources (or devices) it knows
//! best plus a few random ones it holds, and the chance to invent grows
//! with the experience behind them. Inventing writes a new definition into
//! the shared device table and resets everyone's experience of it; the
//! inventor alone starts out knowing it.
//!
//! # Escalation
//!
//! When every considered resource already has a known Tool, the agent
//! tries a Machine or a DevMachine instead. When those exist too, it tries
//! the next tier up (Machine → Factory → Industry, DevMachine →
//! DevFactory).
//!
//! # Critical Invariants
//!
//! - A definition's target is never among its components
//! - Only resources still in the simulation are considered

use crate::config::SimulationConfig;
use crate::core::select::max_by_key_first;
use crate::devices::{DeviceKind, DeviceTable};
use crate::models::{Agent, ResourceRegistry};
use crate::rng::RngManager;

/// A device that was just invented
#[derive(Debug, Clone, PartialEq)]
pub struct Invention {
    pub kind: DeviceKind,
    pub resource: usize,
    pub components: Vec<usize>,
}

/// Move the two entries with the highest experience from `pool` into
/// `considered`, also dropping them from every list in `others`
fn take_top_two(
    pool: &mut Vec<usize>,
    others: &mut [&mut Vec<usize>],
    considered: &mut Vec<usize>,
    experience: impl Fn(usize) -> f64,
) {
    for _ in 0..2 {
        let Some(best) = max_by_key_first(pool, &experience) else {
            break;
        };
        considered.push(best);
        pool.retain(|&r| r != best);
        for list in others.iter_mut() {
            list.retain(|&r| r != best);
        }
    }
}

/// Draw one entry out of `pool` at random
fn draw(pool: &mut Vec<usize>, rng: &mut RngManager) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }
    let idx = rng.index(pool.len());
    Some(pool.remove(idx))
}

/// Try to invent a Tool, escalating to higher devices when every
/// considered resource already has one
///
/// # Arguments
/// * `agents` - whole population; everyone's experience of a reinvented
///   device is reset
/// * `inventor` - index of the agent inventing
/// * `devices` - shared device table, updated on success
///
/// # Returns
/// The new device, if one was invented
pub fn tool_invention(
    agents: &mut [Agent],
    inventor: usize,
    devices: &mut DeviceTable,
    config: &SimulationConfig,
    resources: &ResourceRegistry,
    rng: &mut RngManager,
) -> Option<Invention> {
    let agent = &agents[inventor];

    let mut held: Vec<usize> = resources
        .active()
        .filter(|&r| agent.held(r) > config.min_res_held_for_device_consideration)
        .collect();
    let mut ranked: Vec<usize> = resources.active().collect();

    let mut considered = Vec::with_capacity(config.resources_in_tool + 1);
    take_top_two(&mut ranked, &mut [&mut held], &mut considered, |r| agent.experience(r));

    let extra = config.resources_in_tool.saturating_sub(1);
    if held.len() >= extra {
        considered.extend(rng.sample_without_replacement(&held, extra));
    }
    considered.sort_unstable();

    let unknown: Vec<usize> = considered
        .iter()
        .copied()
        .filter(|&r| !devices.is_known(agents, DeviceKind::Tool, r))
        .collect();

    if !unknown.is_empty() {
        if considered.len() < 2 {
            return None;
        }
        let total_experience: f64 = considered.iter().map(|&r| agents[inventor].experience(r)).sum();
        let chance = config.tool_probability_factor * total_experience * agents[inventor].invent_speed();
        if rng.next_f64() >= chance {
            return None;
        }
        let target = rng.choice(&unknown)?;
        let components = considered.into_iter().filter(|&r| r != target).collect();
        return Some(register(agents, inventor, devices, config, DeviceKind::Tool, target, components));
    }

    if config.tools_only {
        return None;
    }
    let kind = if rng.random_int_inclusive(0, 1) == 0 {
        DeviceKind::Machine
    } else {
        DeviceKind::DevMachine
    };
    device_invention(agents, inventor, kind, devices, config, resources, rng)
}

/// Try to invent a `kind` device from devices of its component tier
///
/// Considers the component devices the inventor knows best, topped up
/// with other known ones. Escalates to the next tier when every considered
/// resource already has a known `kind`.
pub fn device_invention(
    agents: &mut [Agent],
    inventor: usize,
    kind: DeviceKind,
    devices: &mut DeviceTable,
    config: &SimulationConfig,
    resources: &ResourceRegistry,
    rng: &mut RngManager,
) -> Option<Invention> {
    let comp_kind = kind.component_kind()?;
    let agent = &agents[inventor];

    let mut mine = Vec::new();
    let mut known = Vec::new();
    for r in resources.active() {
        if agent.device_experience(comp_kind, r) > 0.0 {
            mine.push(r);
        } else if devices.is_known(agents, comp_kind, r) {
            known.push(r);
        }
    }

    let mut considered = Vec::with_capacity(config.num_device_components);
    if !mine.is_empty() && mine.len() + known.len() >= config.num_device_components {
        let mut ranked = mine.clone();
        take_top_two(
            &mut ranked,
            &mut [&mut mine, &mut known],
            &mut considered,
            |r| agent.device_experience(comp_kind, r),
        );
        while considered.len() < config.num_device_components {
            let pool = if !mine.is_empty() { &mut mine } else { &mut known };
            match draw(pool, rng) {
                Some(r) => considered.push(r),
                None => break,
            }
        }
        considered.sort_unstable();
    }

    let unknown: Vec<usize> = considered
        .iter()
        .copied()
        .filter(|&r| !devices.is_known(agents, kind, r))
        .collect();

    if unknown.is_empty() {
        let next = kind.next_tier()?;
        return device_invention(agents, inventor, next, devices, config, resources, rng);
    }

    let total_experience: f64 = considered
        .iter()
        .map(|&r| agents[inventor].device_experience(comp_kind, r))
        .sum();
    let chance = config.device_probability_factor * total_experience * agents[inventor].invent_speed();
    if rng.next_f64() >= chance {
        return None;
    }
    let target = rng.choice(&unknown)?;
    let components: Vec<usize> = considered.into_iter().filter(|&r| r != target).collect();
    if components.is_empty() {
        return None;
    }
    Some(register(agents, inventor, devices, config, kind, target, components))
}

/// Store the definition and hand the inventor its starting experience
fn register(
    agents: &mut [Agent],
    inventor: usize,
    devices: &mut DeviceTable,
    config: &SimulationConfig,
    kind: DeviceKind,
    target: usize,
    components: Vec<usize>,
) -> Invention {
    devices.define(kind, target, components.clone(), config.devices.get(kind));

    for agent in agents.iter_mut() {
        let device = agent.device_mut(kind, target);
        device.experience = 0.0;
        device.idle = true;
        agent.reset_valuations();
    }

    let agent = &mut agents[inventor];
    let device = agent.device_mut(kind, target);
    device.experience = config.inventor_device_experience;
    device.idle = false;
    if let Some(comp_kind) = kind.component_kind() {
        for &c in &components {
            let comp = agent.device_mut(comp_kind, c);
            if comp.experience < 1.0 {
                comp.experience = 1.0;
            }
        }
    }

    Invention {
        kind,
        resource: target,
        components,
    }
}
