//! Bilateral markets
//!
//! Agents are paired at random and negotiate one pair at a time. Resource
//! trades swap units of two resources at a ratio both sides accept; device
//! trades exchange one device for a bundle of resources.
//!
//! # Critical Invariants
//!
//! - **Rationality**: a trade only executes when both sides gain
//! - **Conservation**: trades move units between agents, never create them
//! - **Termination**: every negotiation is bounded by the attempt limit

pub mod device;
pub mod resource;

pub use device::trade_devices;
pub use resource::trade_resources;

use crate::rng::RngManager;

/// Pair up `0..n` at random, dropping the odd one out
///
/// Both members of a pair are drawn uniformly from the agents still
/// unpaired.
pub fn random_pairs(n: usize, rng: &mut RngManager) -> Vec<(usize, usize)> {
    let mut unpaired: Vec<usize> = (0..n).collect();
    let mut pairs = Vec::with_capacity(n / 2);
    while unpaired.len() > 1 {
        let first = unpaired.remove(rng.index(unpaired.len()));
        let second = unpaired.remove(rng.index(unpaired.len()));
        pairs.push((first, second));
    }
    pairs
}

/// Resources with positive holdings and the lowest marginal utility,
/// ascending by utility, at most `menu_size` of them
pub(crate) fn sale_menu(agent: &crate::Agent, menu_size: usize) -> Vec<usize> {
    let mut menu: Vec<usize> = (0..agent.num_resources())
        .filter(|&r| agent.held(r) > 0)
        .collect();
    menu.sort_by(|&a, &b| {
        agent
            .resource(a)
            .end_day_utility()
            .total_cmp(&agent.resource(b).end_day_utility())
    });
    menu.truncate(menu_size);
    menu
}
