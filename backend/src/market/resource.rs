//! Resource-for-resource barter
//!
//! # Negotiation
//!
//! 1. Each side's menu is its lowest-utility holdings; only resources the
//!    other side does not also offer are tradable
//! 2. Candidate (A gives, B gives) pairs are ranked alternately by A's and
//!    B's utility ratio, starting with whoever's turn it is
//! 3. For each pair, A proposes the bundle that is best for A; if B would
//!    not accept it, B counter-proposes the bundle that is best for B
//! 4. A successful trade refreshes both menus and starts over
//!
//! A session ends after `res_trade_attempts` attempts, when a menu is
//! empty, or when no candidate pair is left.

use super::{random_pairs, sale_menu};
use crate::config::{SimulationConfig, TradeRatioRule};
use crate::core::select::{argmax, pair_mut};
use crate::core::Environment;
use crate::models::{Agent, Event, EventLog};
use crate::rng::RngManager;
use std::collections::VecDeque;
use tracing::trace;

/// Run every resource-trading round of the day
///
/// # Returns
/// Number of trades executed
pub fn trade_resources(
    env: Environment<'_>,
    agents: &mut [Agent],
    rng: &mut RngManager,
    events: &mut EventLog,
    day: usize,
) -> usize {
    let mut trades = 0;
    for _ in 0..env.config.res_trade_rounds {
        for (i, j) in random_pairs(agents.len(), rng) {
            let (a, b) = pair_mut(agents, i, j);
            trades += ResourceSession::new(env.config, a, b).run(events, day);
        }
    }
    trades
}

/// Nearest integer, halves rounded up
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Units of A's pick and B's pick exchanged in one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Offer {
    /// Units A receives
    to_a: i64,
    /// Units B receives
    to_b: i64,
}

/// One negotiation between two agents
pub struct ResourceSession<'a> {
    config: &'a SimulationConfig,
    a: &'a mut Agent,
    b: &'a mut Agent,
    attempts: u32,
}

impl<'a> ResourceSession<'a> {
    pub fn new(config: &'a SimulationConfig, a: &'a mut Agent, b: &'a mut Agent) -> Self {
        Self {
            config,
            a,
            b,
            attempts: 0,
        }
    }

    /// Negotiate until the attempt limit or until nothing is tradable
    ///
    /// # Returns
    /// Number of trades executed
    pub fn run(&mut self, events: &mut EventLog, day: usize) -> usize {
        let limit = self.config.res_trade_attempts;
        let mut trades = 0;

        'session: while self.a.is_active() && self.b.is_active() && self.attempts < limit {
            let a_menu = sale_menu(self.a, self.config.menu_size);
            let b_menu = sale_menu(self.b, self.config.menu_size);
            let a_selling = exclusive(&a_menu, &b_menu);
            let b_selling = exclusive(&b_menu, &a_menu);
            if a_selling.is_empty() || b_selling.is_empty() {
                break;
            }

            let mut queue = self.rank_pairs(&a_selling, &b_selling);
            while let Some((a_gives, b_gives)) = queue.pop_front() {
                // A receives what B gives and the other way round
                if let Some(offer) = self.negotiate(b_gives, a_gives) {
                    self.execute(b_gives, a_gives, offer, events, day);
                    trades += 1;
                    self.attempts += 1;
                    continue 'session;
                }
                if queue.is_empty() {
                    break;
                }
                self.attempts += 1;
                if self.attempts >= limit {
                    break;
                }
            }
            break;
        }
        trades
    }

    /// Candidate (A gives, B gives) pairs, best first, alternating whose
    /// preference picks next
    fn rank_pairs(&self, a_selling: &[usize], b_selling: &[usize]) -> VecDeque<(usize, usize)> {
        let mut pairs = Vec::with_capacity(a_selling.len() * b_selling.len());
        let mut a_ratios = Vec::with_capacity(pairs.capacity());
        let mut b_ratios = Vec::with_capacity(pairs.capacity());
        for &a_off in a_selling {
            for &b_off in b_selling {
                pairs.push((a_off, b_off));
                a_ratios.push(self.a.resource(b_off).end_day_utility() / self.a.temp_util(a_off, -1));
                b_ratios.push(self.b.resource(a_off).end_day_utility() / self.b.temp_util(b_off, -1));
            }
        }

        let mut queue = VecDeque::new();
        for i in 0..self.config.res_trade_attempts {
            let ratios = if i % 2 == self.attempts % 2 { &a_ratios } else { &b_ratios };
            let Some(best) = argmax(ratios) else {
                break;
            };
            queue.push_back(pairs.remove(best));
            a_ratios.remove(best);
            b_ratios.remove(best);
        }
        queue
    }

    /// Units of `b_pick` A gives per unit of `a_pick` it receives
    fn trade_ratio(&self, a_pick: usize, b_pick: usize) -> f64 {
        let a_ratio = self.a.util(a_pick) / self.a.temp_util(b_pick, -1);
        let b_ratio = self.b.temp_util(a_pick, -1) / self.b.util(b_pick);
        let a_power = self.a.res_trade_power();
        let b_power = self.b.res_trade_power();
        match self.config.trade_ratio_rule {
            TradeRatioRule::PowerWeighted => {
                ((a_ratio.ln() * a_power + b_ratio.ln() * b_power) / (a_power + b_power)).exp()
            }
            TradeRatioRule::Legacy => {
                ((a_ratio * b_power.ln() + b_ratio * b_power.ln()) / (a_power + b_power)).exp()
            }
        }
    }

    fn a_surplus(&self, a_pick: usize, b_pick: usize, offer: Offer) -> f64 {
        self.a.barter_utility(a_pick, offer.to_a) - self.a.barter_utility(b_pick, -offer.to_b)
    }

    fn b_surplus(&self, a_pick: usize, b_pick: usize, offer: Offer) -> f64 {
        self.b.barter_utility(b_pick, offer.to_b) - self.b.barter_utility(a_pick, -offer.to_a)
    }

    fn affordable(&self, a_pick: usize, b_pick: usize, offer: Offer) -> bool {
        offer.to_a > 0
            && offer.to_b > 0
            && offer.to_a <= self.b.held(a_pick)
            && offer.to_b <= self.a.held(b_pick)
    }

    fn accepted(&self, a_pick: usize, b_pick: usize, offer: Offer) -> bool {
        let eps = self.config.trade_epsilon;
        self.affordable(a_pick, b_pick, offer)
            && self.a_surplus(a_pick, b_pick, offer) > eps
            && self.b_surplus(a_pick, b_pick, offer) > eps
    }

    /// Grow the smallest bundle at `ratio` while it stays affordable and
    /// `surplus` stays positive, returning the bundle with the largest
    /// surplus
    fn best_offer(
        &self,
        a_pick: usize,
        b_pick: usize,
        ratio: f64,
        surplus: impl Fn(&Self, Offer) -> f64,
    ) -> Offer {
        let to_b = if ratio <= 1.0 { round_half_up(1.0 / ratio) } else { 1 };
        let mut best = Offer {
            to_a: round_half_up(to_b as f64 * ratio),
            to_b,
        };
        let mut best_surplus = surplus(self, best);
        let mut current = best;
        loop {
            let next_b = current.to_b + 1;
            let next = Offer {
                to_a: round_half_up(next_b as f64 * ratio),
                to_b: next_b,
            };
            let next_surplus = surplus(self, next);
            if !self.affordable(a_pick, b_pick, next) || next_surplus <= self.config.trade_epsilon {
                break;
            }
            if next_surplus > best_surplus {
                best = next;
                best_surplus = next_surplus;
            }
            current = next;
        }
        best
    }

    /// A's proposal, then B's counter-proposal
    fn negotiate(&self, a_pick: usize, b_pick: usize) -> Option<Offer> {
        let ratio = self.trade_ratio(a_pick, b_pick);
        if !ratio.is_finite() || ratio <= 0.0 {
            return None;
        }

        let proposal = self.best_offer(a_pick, b_pick, ratio, |s, o| s.a_surplus(a_pick, b_pick, o));
        if self.accepted(a_pick, b_pick, proposal) {
            return Some(proposal);
        }
        let counter = self.best_offer(a_pick, b_pick, ratio, |s, o| s.b_surplus(a_pick, b_pick, o));
        self.accepted(a_pick, b_pick, counter).then_some(counter)
    }

    fn execute(&mut self, a_pick: usize, b_pick: usize, offer: Offer, events: &mut EventLog, day: usize) {
        let Offer { to_a, to_b } = offer;
        self.b.sells(a_pick, to_a);
        self.a.buys(a_pick, to_a);
        self.a.sells(b_pick, to_b);
        self.b.buys(b_pick, to_b);
        for r in [a_pick, b_pick] {
            self.a.refresh_end_day_utility(r);
            self.b.refresh_end_day_utility(r);
        }

        let cross_group = self.a.group() != self.b.group();
        let a_stats = &mut self.a.stats;
        a_stats.units_sold_today += to_b as u32;
        a_stats.bought_end_day[a_pick] += to_a;
        a_stats.sold_end_day[b_pick] += to_b;
        let b_stats = &mut self.b.stats;
        b_stats.units_sold_today += to_a as u32;
        b_stats.bought_end_day[b_pick] += to_b;
        b_stats.sold_end_day[a_pick] += to_a;
        if cross_group {
            self.a.stats.units_sold_cross_group_today += to_b as u32;
            self.b.stats.units_sold_cross_group_today += to_a as u32;
        }

        trace!(
            day,
            agent_a = self.a.id(),
            agent_b = self.b.id(),
            a_pick,
            to_a,
            b_pick,
            to_b,
            "resource trade"
        );
        events.log(Event::ResourceTrade {
            day,
            agent_a: self.a.id(),
            agent_b: self.b.id(),
            a_received: a_pick,
            a_received_units: to_a,
            a_gave: b_pick,
            a_gave_units: to_b,
        });
    }
}

/// Entries of `menu` missing from `other`, ascending
fn exclusive(menu: &[usize], other: &[usize]) -> Vec<usize> {
    let mut only: Vec<usize> = menu.iter().copied().filter(|r| !other.contains(r)).collect();
    only.sort_unstable();
    only
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(0.5), 1);
    }

    #[test]
    fn test_exclusive_is_sorted_difference() {
        assert_eq!(exclusive(&[5, 1, 3], &[3]), vec![1, 5]);
        assert!(exclusive(&[2], &[2]).is_empty());
    }
}
