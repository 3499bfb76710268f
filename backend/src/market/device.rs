//! Device-for-resources trading
//!
//! One session per device kind. Agents pair up by preference: each agent
//! prefers partners it made the most surplus with before, and never meets
//! the same partner twice in a session.
//!
//! # Negotiation
//!
//! 1. The seller lists the devices it can build tonight; the buyer lists
//!    its lowest-utility resources
//! 2. The buyer picks the device worth the most to it
//! 3. The seller builds the smallest bundle it would accept, the buyer the
//!    largest bundle it would give; the final bundle is their average
//!    weighted by the other side's trade power
//! 4. The trade executes when both sides gain; otherwise the roles swap
//!
//! A pair keeps trading until it runs out of `device_trade_attempts`.

use super::sale_menu;
use crate::core::select::{argmax, argmin, pair_mut};
use crate::core::Environment;
use crate::devices::DeviceKind;
use crate::models::{Agent, Event, EventLog};
use crate::rng::RngManager;
use tracing::trace;

/// Run the device market for `kind`
///
/// # Returns
/// Number of devices that changed hands
pub fn trade_devices(
    env: Environment<'_>,
    agents: &mut [Agent],
    rng: &mut RngManager,
    events: &mut EventLog,
    day: usize,
    kind: DeviceKind,
) -> usize {
    for agent in agents.iter_mut() {
        agent.new_device_trade(kind);
    }
    if !env.devices.any_known(agents, kind) {
        return 0;
    }

    let mut trades = 0;
    for _ in 0..env.config.device_trade_rounds {
        for (buyer, seller) in device_pairs(agents, rng, kind) {
            let (a, b) = pair_mut(agents, buyer, seller);
            trades += DeviceSession::new(env, kind, a, b).run(events, day);
        }
    }
    trades
}

/// Pair agents for one round, honouring trade preferences
///
/// An agent drawn at random picks its most preferred partner still
/// unpaired and not yet met this session, else the first unpaired agent
/// not yet met, else any unpaired agent.
pub fn device_pairs(agents: &mut [Agent], rng: &mut RngManager, kind: DeviceKind) -> Vec<(usize, usize)> {
    for agent in agents.iter_mut() {
        agent.bought_this_round.clear();
    }

    let mut unpaired: Vec<usize> = (0..agents.len()).collect();
    let mut pairs = Vec::with_capacity(agents.len() / 2);
    while unpaired.len() > 1 {
        let current = unpaired.remove(rng.index(unpaired.len()));
        let trader = &agents[current];
        let not_met = |p: &usize| !trader.traded_with.contains(p);

        let preferred = trader
            .preferred_device_traders(kind)
            .into_iter()
            .find(|p| unpaired.contains(p) && not_met(p));
        let position = match preferred {
            Some(p) => unpaired.iter().position(|&u| u == p),
            None => unpaired.iter().position(not_met),
        };
        let position = position.unwrap_or_else(|| rng.index(unpaired.len()));
        let partner = unpaired.remove(position);
        pairs.push((current, partner));
    }
    pairs
}

/// Terms both sides agreed on
#[derive(Debug, Clone)]
struct DeviceDeal {
    resource: usize,
    bundle: Vec<i64>,
    buyer_gain: f64,
    buyer_loss: f64,
    seller_gain: f64,
    seller_loss: f64,
}

/// One negotiation between two agents over devices of one kind
pub struct DeviceSession<'e, 'a> {
    env: Environment<'e>,
    kind: DeviceKind,
    a: &'a mut Agent,
    b: &'a mut Agent,
    /// `a` buys while true
    a_buys: bool,
    attempts: u32,
}

impl<'e, 'a> DeviceSession<'e, 'a> {
    /// `a` starts as the buyer
    pub fn new(env: Environment<'e>, kind: DeviceKind, a: &'a mut Agent, b: &'a mut Agent) -> Self {
        Self {
            env,
            kind,
            a,
            b,
            a_buys: true,
            attempts: 0,
        }
    }

    fn roles(&mut self) -> (&mut Agent, &mut Agent) {
        if self.a_buys {
            (&mut *self.a, &mut *self.b)
        } else {
            (&mut *self.b, &mut *self.a)
        }
    }

    /// Trade until the attempt limit
    ///
    /// # Returns
    /// Number of devices sold
    pub fn run(&mut self, events: &mut EventLog, day: usize) -> usize {
        let a_id = self.a.id();
        let b_id = self.b.id();
        self.a.traded_with.push(b_id);
        self.b.traded_with.push(a_id);

        let limit = self.env.config.device_trade_attempts;
        let mut trades = 0;
        while self.a.is_active() && self.b.is_active() && self.attempts < limit {
            let (env, kind) = (self.env, self.kind);
            let (buyer, seller) = self.roles();
            match negotiate(env, kind, buyer, seller) {
                Some(deal) => {
                    execute(env, kind, buyer, seller, &deal, events, day);
                    trades += 1;
                }
                None => self.a_buys = !self.a_buys,
            }
            self.attempts += 1;
        }
        trades
    }
}

/// Devices the seller can build tonight and has not just bought
fn seller_offers(env: Environment<'_>, kind: DeviceKind, seller: &mut Agent) -> Vec<usize> {
    let day_length = env.day_length();
    let mut offers = Vec::new();
    for r in 0..seller.num_resources() {
        if seller.device_experience(kind, r) < 1.0 || seller.bought_this_round.contains(&r) {
            continue;
        }
        let Some(worst) = seller.worst_case_construction(env, kind, r) else {
            continue;
        };
        if seller.holds_bundle(&worst.resources) && seller.set_aside_time + worst.minutes < day_length {
            offers.push(r);
        }
    }
    offers
}

fn negotiate(env: Environment<'_>, kind: DeviceKind, buyer: &mut Agent, seller: &mut Agent) -> Option<DeviceDeal> {
    let n = seller.num_resources();
    let seller_max_experience = (0..n)
        .map(|r| seller.device_experience(kind, r))
        .fold(0.0, f64::max);
    if seller_max_experience < 1.0 {
        return None;
    }

    let menu = sale_menu(buyer, env.config.menu_size);
    let devices = seller_offers(env, kind, seller);
    if menu.is_empty() || devices.is_empty() {
        return None;
    }

    // Buyer picks the device worth the most to it
    let mut buyer_gain = 0.0;
    let mut pick = None;
    for &r in &devices {
        let value = buyer.buyer_device_value(env, kind, r);
        if value > buyer_gain {
            buyer_gain = value;
            pick = Some(r);
        }
        if buyer.device(kind, r).to_make() > 0 {
            let cost = buyer.device_cost(env, kind, r);
            if cost > buyer_gain {
                buyer_gain = cost;
                pick = Some(r);
            }
        }
    }
    let resource = pick?;
    let seller_loss = seller.seller_device_value(env, kind, resource);

    let asked = seller_bundle(buyer, seller, &menu, seller_loss);
    let offered = buyer_bundle(buyer, &menu, buyer_gain);
    let buyer_power = buyer.device_trade_power();
    let seller_power = seller.device_trade_power();
    let bundle: Vec<i64> = (0..n)
        .map(|r| {
            let mean = (asked[r] as f64 * buyer_power + offered[r] as f64 * seller_power)
                / (buyer_power + seller_power);
            (mean.round() as i64).clamp(0, buyer.held(r).max(0))
        })
        .collect();

    let buyer_loss = buyer.cost_of_bundle(&bundle);
    let seller_gain = seller.gain_of_bundle(&bundle);
    (buyer_loss < buyer_gain && seller_loss < seller_gain).then_some(DeviceDeal {
        resource,
        bundle,
        buyer_gain,
        buyer_loss,
        seller_gain,
        seller_loss,
    })
}

/// Smallest bundle from the buyer's menu that covers the seller's loss,
/// taking the unit the seller values most each time
fn seller_bundle(buyer: &Agent, seller: &Agent, menu: &[usize], seller_loss: f64) -> Vec<i64> {
    let n = seller.num_resources();
    let mut offers = vec![0i64; n];
    let mut utilities: Vec<f64> = (0..n)
        .map(|r| if menu.contains(&r) { seller.util(r) } else { 0.0 })
        .collect();

    let mut gain = 0.0;
    while gain < seller_loss {
        let Some(r) = argmax(&utilities).filter(|&r| utilities[r] > 0.0) else {
            break;
        };
        gain += seller.temp_util(r, offers[r]);
        offers[r] += 1;
        utilities[r] = if buyer.held(r) > offers[r] {
            seller.temp_util(r, offers[r])
        } else {
            0.0
        };
    }
    offers
}

/// Largest bundle from the menu the buyer would give without losing more
/// than the device is worth, giving up its least valued unit each time
fn buyer_bundle(buyer: &Agent, menu: &[usize], buyer_gain: f64) -> Vec<i64> {
    let n = buyer.num_resources();
    let mut offers = vec![0i64; n];
    let mut utilities: Vec<f64> = (0..n)
        .map(|r| if menu.contains(&r) { buyer.temp_util(r, -1) } else { f64::INFINITY })
        .collect();

    let mut loss = 0.0;
    let mut last = None;
    while loss < buyer_gain {
        let Some(r) = argmin(&utilities).filter(|&r| utilities[r].is_finite()) else {
            break;
        };
        offers[r] += 1;
        loss += buyer.temp_util(r, -offers[r]);
        last = Some(r);
        utilities[r] = if buyer.held(r) > offers[r] {
            buyer.temp_util(r, -offers[r] - 1)
        } else {
            f64::INFINITY
        };
    }
    // The unit that tipped the loss over the gain is not offered
    if loss >= buyer_gain {
        if let Some(r) = last {
            offers[r] -= 1;
        }
    }
    offers
}

fn execute(
    env: Environment<'_>,
    kind: DeviceKind,
    buyer: &mut Agent,
    seller: &mut Agent,
    deal: &DeviceDeal,
    events: &mut EventLog,
    day: usize,
) {
    let r = deal.resource;
    seller.sells_device(env, kind, r);
    buyer.buys_device(env, kind, r);

    for (res, &units) in deal.bundle.iter().enumerate() {
        if units > 0 {
            buyer.sells(res, units);
            seller.buys(res, units);
            buyer.stats.sold_end_day[res] += units;
            seller.stats.bought_end_day[res] += units;
        }
    }
    buyer.refresh_end_day_utilities();
    seller.refresh_end_day_utilities();

    let seller_surplus = deal.seller_gain - deal.seller_loss;
    let buyer_surplus = deal.buyer_gain - deal.buyer_loss;
    seller.remember_trade_surplus(kind, buyer.id(), seller_surplus);
    buyer.remember_trade_surplus(kind, seller.id(), buyer_surplus);
    buyer.device_mut(kind, r).remember_price(deal.buyer_loss);
    buyer.bought_this_round.push(r);
    seller.device_mut(kind, r).remember_price(-seller_surplus);

    let units: i64 = deal.bundle.iter().sum();
    buyer.stats.units_sold_for_devices_today += units as u32;
    if buyer.group() != seller.group() {
        buyer.stats.units_sold_cross_group_for_devices_today += units as u32;
    }
    buyer.stats.devices_bought_total[kind.index()][r] += 1;
    seller.stats.devices_sold_total[kind.index()][r] += 1;

    trace!(
        day,
        buyer = buyer.id(),
        seller = seller.id(),
        %kind,
        resource = r,
        units,
        "device trade"
    );
    events.log(Event::DeviceTrade {
        day,
        buyer: buyer.id(),
        seller: seller.id(),
        kind,
        resource: r,
        bundle: deal.bundle.clone(),
        buyer_surplus,
        seller_surplus,
    });
}
