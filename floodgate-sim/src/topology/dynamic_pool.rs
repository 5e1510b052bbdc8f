//! Pooled liquidity reallocated at periodic round settlements.
//!
//! Endpoints are grouped into pools of contiguous ids. Inside a pool the LSP
//! holds one share and every member holds one. Payments are checked against
//! side aggregates, not single shares, and shares only move back toward the
//! target allocation when a round settles.

use std::time::Duration;

use floodgate_core::{
    ConsistencyError, EndpointId, FlowKind, Party, PaymentIntent, RunParameters, Sats,
    SettlementAllocation, SimTime, TopologyKind,
};
use tracing::debug;

use super::{FailureReason, OperationalStats, OutcomeRecord, Topology, apportion};
use crate::deterministic::invariants::debit;
use crate::deterministic::{EventKind, EventSink, ScheduledEvent};

/// Bounds applied to the demand-derived LSP fraction.
const MIN_DEMAND_LSP_FRACTION: f64 = 0.1;
const MAX_DEMAND_LSP_FRACTION: f64 = 0.9;

/// Round cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundPhase {
    /// Payments are accepted against current shares
    RoundOpen,
    /// Shares are being reallocated
    RoundSettling,
}

/// One participant's claim on a pool's liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolShare {
    owner: Party,
    balance: Sats,
}

impl PoolShare {
    /// Who holds the share.
    pub fn owner(&self) -> Party {
        self.owner
    }

    /// Current balance.
    pub fn balance(&self) -> Sats {
        self.balance
    }
}

/// Liquidity shared by the LSP and a group of endpoints.
#[derive(Debug, Clone)]
pub struct Pool {
    index: usize,
    liquidity: Sats,
    lsp: PoolShare,
    members: Vec<PoolShare>,
    inbound_demand: u128,
    outbound_demand: Vec<u128>,
}

impl Pool {
    fn new(index: usize, first: u32, size: u32, liquidity: Sats, lsp_fraction: f64) -> Self {
        let members = (first..first + size)
            .map(|id| PoolShare {
                owner: Party::Endpoint(EndpointId::new(id)),
                balance: 0,
            })
            .collect();
        let mut pool = Self {
            index,
            liquidity,
            lsp: PoolShare {
                owner: Party::Lsp,
                balance: 0,
            },
            members,
            inbound_demand: 0,
            outbound_demand: vec![0; size as usize],
        };
        pool.allocate_even(lsp_fraction);
        pool
    }

    /// Position of this pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Liquidity the pool was funded with.
    pub fn liquidity(&self) -> Sats {
        self.liquidity
    }

    /// The LSP's share.
    pub fn lsp_share(&self) -> &PoolShare {
        &self.lsp
    }

    /// Member shares in endpoint order.
    pub fn member_shares(&self) -> &[PoolShare] {
        &self.members
    }

    /// Sum of member balances.
    pub fn endpoint_side(&self) -> u128 {
        self.members.iter().map(|s| u128::from(s.balance)).sum()
    }

    fn allocate_even(&mut self, lsp_fraction: f64) {
        let weights = vec![1u128; self.members.len()];
        self.allocate(lsp_fraction, &weights);
    }

    fn allocate(&mut self, lsp_fraction: f64, member_weights: &[u128]) {
        let lsp = fraction_of(self.liquidity, lsp_fraction);
        self.lsp.balance = lsp;
        let split = apportion(self.liquidity - lsp, member_weights);
        for (share, balance) in self.members.iter_mut().zip(split) {
            share.balance = balance;
        }
    }

    fn settle(&mut self, allocation: SettlementAllocation, lsp_fraction: f64) {
        let outbound: u128 = self.outbound_demand.iter().sum();
        let observed = self.inbound_demand + outbound;

        match allocation {
            SettlementAllocation::DemandWeighted if observed > 0 => {
                let fraction = (self.inbound_demand as f64 / observed as f64)
                    .clamp(MIN_DEMAND_LSP_FRACTION, MAX_DEMAND_LSP_FRACTION);
                let weights: Vec<u128> = self.outbound_demand.iter().map(|d| d + 1).collect();
                self.allocate(fraction, &weights);
            }
            _ => self.allocate_even(lsp_fraction),
        }

        self.inbound_demand = 0;
        self.outbound_demand.iter_mut().for_each(|d| *d = 0);
    }

    // LSP side pays `amount` to `member`
    fn pay_member(
        &mut self,
        member: usize,
        amount: Sats,
        time: SimTime,
    ) -> Result<(), ConsistencyError> {
        let index = self.index;
        debit(&mut self.lsp.balance, amount, time, || {
            format!("pool {index} LSP share")
        })?;
        self.members[member].balance += amount;
        Ok(())
    }

    // Endpoint side pays `amount`, drawn from `source` first
    fn draw_endpoint_side(
        &mut self,
        source: usize,
        amount: Sats,
        time: SimTime,
    ) -> Result<(), ConsistencyError> {
        let from_source = self.members[source].balance.min(amount);
        self.members[source].balance -= from_source;
        let mut remaining = amount - from_source;
        if remaining == 0 {
            return Ok(());
        }

        // Largest balance first, lower id on ties
        let mut order: Vec<usize> = (0..self.members.len()).filter(|&i| i != source).collect();
        order.sort_by(|&a, &b| {
            self.members[b]
                .balance
                .cmp(&self.members[a].balance)
                .then(a.cmp(&b))
        });
        for member in order {
            if remaining == 0 {
                break;
            }
            let take = self.members[member].balance.min(remaining);
            self.members[member].balance -= take;
            remaining -= take;
        }

        if remaining > 0 {
            return Err(ConsistencyError::BalanceUnderflow {
                time,
                context: format!("pool {} endpoint side", self.index),
                amount,
                balance: amount - remaining,
            });
        }
        Ok(())
    }

    fn check_conservation(&self) -> Result<(), ConsistencyError> {
        let sum = u128::from(self.lsp.balance) + self.endpoint_side();
        if sum != u128::from(self.liquidity) {
            return Err(ConsistencyError::PoolConservation {
                pool: self.index,
                sum,
                expected: u128::from(self.liquidity),
            });
        }
        Ok(())
    }
}

/// Dynamic topology: pools reallocated every round interval.
#[derive(Debug, Clone)]
pub struct DynamicPools {
    pools: Vec<Pool>,
    endpoint_count: u32,
    pool_size: u32,
    total_liquidity: Sats,
    round_interval_millis: u64,
    round_cost: Sats,
    lsp_target_fraction: f64,
    allocation: SettlementAllocation,
    phase: RoundPhase,
    next_settlement: SimTime,
    stats: OperationalStats,
}

impl DynamicPools {
    /// Builds the pools and funds them in proportion to member count.
    ///
    /// Expects validated parameters.
    pub fn from_parameters(params: &RunParameters) -> Self {
        let pool_size = params.pool_size.max(1);
        let endpoint_count = params.endpoint_count;
        let sizes: Vec<u32> = (0..endpoint_count)
            .step_by(pool_size as usize)
            .map(|first| pool_size.min(endpoint_count - first))
            .collect();
        let weights: Vec<u128> = sizes.iter().map(|&s| u128::from(s)).collect();
        let funding = apportion(params.pool_total_liquidity, &weights);

        let pools = sizes
            .iter()
            .zip(funding)
            .enumerate()
            .map(|(index, (&size, liquidity))| {
                let first = index as u32 * pool_size;
                Pool::new(index, first, size, liquidity, params.lsp_target_fraction)
            })
            .collect();

        let round_interval_millis = params.round_interval_millis().max(1);
        Self {
            pools,
            endpoint_count,
            pool_size,
            total_liquidity: params.pool_total_liquidity,
            round_interval_millis,
            round_cost: params.round_cost,
            lsp_target_fraction: params.lsp_target_fraction,
            allocation: params.settlement_allocation,
            phase: RoundPhase::RoundOpen,
            next_settlement: SimTime::from_millis(round_interval_millis),
            stats: OperationalStats::default(),
        }
    }

    /// All pools.
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Current round phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Time of the next settlement.
    pub fn next_settlement(&self) -> SimTime {
        self.next_settlement
    }

    /// Pool and member position of `endpoint`.
    fn locate(&self, party: Party) -> Result<(usize, usize), ConsistencyError> {
        let Some(endpoint) = party.endpoint() else {
            return Err(ConsistencyError::UnexpectedEvent {
                kind: "LSP-side endpoint",
                topology: TopologyKind::Dynamic.as_str(),
            });
        };
        if endpoint.as_u32() >= self.endpoint_count {
            return Err(ConsistencyError::UnknownEndpoint { endpoint });
        }
        let id = endpoint.as_u32();
        Ok(((id / self.pool_size) as usize, (id % self.pool_size) as usize))
    }

    fn settle_round(
        &mut self,
        round: u64,
        sink: &mut dyn EventSink,
    ) -> Result<(), ConsistencyError> {
        self.phase = RoundPhase::RoundSettling;
        let now = sink.now();
        for pool in &mut self.pools {
            pool.settle(self.allocation, self.lsp_target_fraction);
        }
        self.stats.round_count += 1;
        self.stats.fees_paid = self.stats.fees_paid.saturating_add(self.round_cost);

        self.next_settlement = now.saturating_add_millis(self.round_interval_millis);
        sink.schedule(ScheduledEvent::new(
            self.next_settlement,
            EventKind::RoundSettlement { round: round + 1 },
        ))?;
        self.phase = RoundPhase::RoundOpen;
        debug!(sim_time = %now, round, "Round settled");
        Ok(())
    }

    fn apply(
        &mut self,
        intent: &PaymentIntent,
        now: SimTime,
    ) -> Result<Option<FailureReason>, ConsistencyError> {
        let amount = intent.amount();
        let wide = u128::from(amount);

        match intent.flow() {
            FlowKind::Inbound => {
                let (pool, member) = self.locate(intent.destination())?;
                let target = &mut self.pools[pool];
                target.inbound_demand += wide;
                if target.lsp.balance < amount {
                    return Ok(Some(FailureReason::LspSideShortfall));
                }
                target.pay_member(member, amount, now)?;
            }
            FlowKind::Outbound => {
                let (pool, member) = self.locate(intent.source())?;
                let source = &mut self.pools[pool];
                source.outbound_demand[member] += wide;
                if source.endpoint_side() < wide {
                    return Ok(Some(FailureReason::EndpointSideShortfall));
                }
                source.draw_endpoint_side(member, amount, now)?;
                source.lsp.balance += amount;
            }
            FlowKind::Internal => {
                let (src_pool, src_member) = self.locate(intent.source())?;
                let (dst_pool, dst_member) = self.locate(intent.destination())?;
                self.pools[src_pool].outbound_demand[src_member] += wide;

                if src_pool == dst_pool {
                    let pool = &mut self.pools[src_pool];
                    if pool.endpoint_side() < wide {
                        return Ok(Some(FailureReason::EndpointSideShortfall));
                    }
                    pool.draw_endpoint_side(src_member, amount, now)?;
                    pool.members[dst_member].balance += amount;
                } else {
                    self.pools[dst_pool].inbound_demand += wide;
                    let endpoint_short = self.pools[src_pool].endpoint_side() < wide;
                    let lsp_short = self.pools[dst_pool].lsp.balance < amount;
                    if let Some(reason) = FailureReason::from_shortfalls(lsp_short, endpoint_short)
                    {
                        return Ok(Some(reason));
                    }
                    let source = &mut self.pools[src_pool];
                    source.draw_endpoint_side(src_member, amount, now)?;
                    source.lsp.balance += amount;
                    self.pools[dst_pool].pay_member(dst_member, amount, now)?;
                }
            }
        }
        Ok(None)
    }
}

impl Topology for DynamicPools {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Dynamic
    }

    fn start(&mut self, sink: &mut dyn EventSink) -> Result<(), ConsistencyError> {
        sink.schedule(ScheduledEvent::new(
            self.next_settlement,
            EventKind::RoundSettlement { round: 0 },
        ))
    }

    fn process_payment(
        &mut self,
        intent: &PaymentIntent,
        sink: &mut dyn EventSink,
    ) -> Result<OutcomeRecord, ConsistencyError> {
        let now = sink.now();
        let shortfall = self.apply(intent, now)?;
        let locked = self.locked_capital()?;
        Ok(match shortfall {
            None => {
                let latency: Duration = self.next_settlement.saturating_since(now);
                OutcomeRecord::success(intent, latency, locked)
            }
            Some(reason) => {
                debug!(
                    sim_time = %now,
                    payment = %intent.id(),
                    amount = intent.amount(),
                    ?reason,
                    "Payment failed"
                );
                OutcomeRecord::failure(intent, reason, locked)
            }
        })
    }

    fn handle_scheduled_event(
        &mut self,
        event: &ScheduledEvent,
        sink: &mut dyn EventSink,
    ) -> Result<(), ConsistencyError> {
        match &event.kind {
            EventKind::RoundSettlement { round } => self.settle_round(*round, sink),
            other => Err(ConsistencyError::UnexpectedEvent {
                kind: other.as_str(),
                topology: TopologyKind::Dynamic.as_str(),
            }),
        }
    }

    fn locked_capital(&self) -> Result<Sats, ConsistencyError> {
        Ok(self.pools.iter().map(|p| p.lsp.balance).sum())
    }

    fn capital_ceiling(&self) -> Sats {
        self.total_liquidity
    }

    fn check_invariants(&self) -> Result<(), ConsistencyError> {
        self.pools.iter().try_for_each(Pool::check_conservation)?;
        let total: u128 = self.pools.iter().map(|p| u128::from(p.liquidity)).sum();
        if total != u128::from(self.total_liquidity) {
            return Err(ConsistencyError::PoolConservation {
                pool: self.pools.len(),
                sum: total,
                expected: u128::from(self.total_liquidity),
            });
        }
        Ok(())
    }

    fn operations(&self) -> OperationalStats {
        self.stats
    }
}

fn fraction_of(total: Sats, fraction: f64) -> Sats {
    let part = (total as f64 * fraction).round();
    (part as Sats).min(total)
}

#[cfg(test)]
mod tests {
    use floodgate_core::PaymentId;

    use super::*;
    use crate::deterministic::{AbortSignal, CapitalBounds, EventScheduler};
    use crate::metrics::MetricsAccumulator;
    use crate::topology::Outcome;

    fn params(endpoints: u32, pool_size: u32, liquidity: Sats) -> RunParameters {
        RunParameters {
            endpoint_count: endpoints,
            pool_size,
            pool_total_liquidity: liquidity,
            ..RunParameters::dynamic_baseline()
        }
    }

    fn at(millis: u64) -> SimTime {
        SimTime::from_millis(millis)
    }

    fn member_balances(pool: &Pool) -> Vec<Sats> {
        pool.member_shares().iter().map(PoolShare::balance).collect()
    }

    #[test]
    fn test_pools_split_by_member_count() {
        let model = DynamicPools::from_parameters(&params(25, 10, 10_000));
        let pools = model.pools();
        assert_eq!(pools.len(), 3);
        assert_eq!(pools[0].member_shares().len(), 10);
        assert_eq!(pools[2].member_shares().len(), 5);
        assert_eq!(pools[0].liquidity(), 4_000);
        assert_eq!(pools[2].liquidity(), 2_000);
        assert_eq!(pools[0].lsp_share().balance(), 2_000);
        assert_eq!(member_balances(&pools[0]), vec![200; 10]);
        assert_eq!(
            pools[2].member_shares()[0].owner(),
            Party::Endpoint(EndpointId::new(20))
        );
        assert_eq!(model.locked_capital().unwrap(), 5_000);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_start_schedules_first_settlement() {
        let mut model = DynamicPools::from_parameters(&params(4, 2, 1_000));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        model.start(&mut sink).unwrap();
        assert_eq!(sink.pending(), 1);
        assert_eq!(model.next_settlement(), at(600_000));
    }

    #[test]
    fn test_outbound_draws_source_then_largest() {
        // One pool of 3, liquidity 600: LSP 300, members 100 each
        let mut model = DynamicPools::from_parameters(&params(3, 3, 600));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        let intent = PaymentIntent::internal(
            PaymentId::new(0),
            SimTime::ZERO,
            30,
            EndpointId::new(2),
            EndpointId::new(1),
        )
        .unwrap();
        assert!(model.process_payment(&intent, &mut sink).unwrap().is_success());
        assert_eq!(member_balances(&model.pools()[0]), vec![100, 130, 70]);

        let intent = PaymentIntent::outbound(PaymentId::new(1), SimTime::ZERO, 150, EndpointId::new(2));
        let record = model.process_payment(&intent, &mut sink).unwrap();
        assert!(record.is_success());
        // 70 from the source, then 80 from member 1 (largest)
        assert_eq!(member_balances(&model.pools()[0]), vec![100, 50, 0]);
        assert_eq!(model.pools()[0].lsp_share().balance(), 450);
        assert_eq!(record.latency, Duration::from_millis(600_000));
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_aggregate_not_per_endpoint_liquidity() {
        let mut model = DynamicPools::from_parameters(&params(3, 3, 600));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        // Source share is 100 but the pool's endpoint side holds 300
        let ok = PaymentIntent::outbound(PaymentId::new(0), SimTime::ZERO, 300, EndpointId::new(0));
        assert!(model.process_payment(&ok, &mut sink).unwrap().is_success());

        let short = PaymentIntent::outbound(PaymentId::new(1), SimTime::ZERO, 1, EndpointId::new(1));
        let record = model.process_payment(&short, &mut sink).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                reason: FailureReason::EndpointSideShortfall
            }
        );
        assert_eq!(record.latency, Duration::ZERO);
    }

    #[test]
    fn test_inbound_needs_lsp_share() {
        let mut model = DynamicPools::from_parameters(&params(3, 3, 600));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        let too_big = PaymentIntent::inbound(PaymentId::new(0), SimTime::ZERO, 301, EndpointId::new(0));
        let record = model.process_payment(&too_big, &mut sink).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                reason: FailureReason::LspSideShortfall
            }
        );

        let fits = PaymentIntent::inbound(PaymentId::new(1), SimTime::ZERO, 300, EndpointId::new(0));
        let record = model.process_payment(&fits, &mut sink).unwrap();
        assert!(record.is_success());
        assert_eq!(record.locked_capital, 0);
    }

    #[test]
    fn test_cross_pool_internal_is_atomic() {
        // Two pools of 2, 400 each: LSP 200, members 100
        let mut model = DynamicPools::from_parameters(&params(4, 2, 800));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        let (a, c) = (EndpointId::new(0), EndpointId::new(2));

        let ok = PaymentIntent::internal(PaymentId::new(0), SimTime::ZERO, 150, a, c).unwrap();
        assert!(model.process_payment(&ok, &mut sink).unwrap().is_success());
        assert_eq!(model.pools()[0].endpoint_side(), 50);
        assert_eq!(model.pools()[0].lsp_share().balance(), 350);
        assert_eq!(model.pools()[1].lsp_share().balance(), 50);
        assert_eq!(member_balances(&model.pools()[1]), vec![250, 100]);

        let short = PaymentIntent::internal(PaymentId::new(1), SimTime::ZERO, 60, a, c).unwrap();
        let record = model.process_payment(&short, &mut sink).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                reason: FailureReason::BothSides
            }
        );
        assert_eq!(model.pools()[0].endpoint_side(), 50);
        assert_eq!(model.pools()[1].lsp_share().balance(), 50);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn test_even_settlement_restores_target() {
        let mut model = DynamicPools::from_parameters(&params(3, 3, 600));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        model.start(&mut sink).unwrap();

        let intent = PaymentIntent::inbound(PaymentId::new(0), SimTime::ZERO, 250, EndpointId::new(1));
        model.process_payment(&intent, &mut sink).unwrap();
        assert_eq!(model.pools()[0].lsp_share().balance(), 50);

        let settlement = ScheduledEvent::new(at(0), EventKind::RoundSettlement { round: 0 });
        model.handle_scheduled_event(&settlement, &mut sink).unwrap();
        assert_eq!(model.pools()[0].lsp_share().balance(), 300);
        assert_eq!(member_balances(&model.pools()[0]), vec![100, 100, 100]);
        assert_eq!(model.phase(), RoundPhase::RoundOpen);
        assert_eq!(model.operations().round_count, 1);
        assert_eq!(sink.pending(), 2);
    }

    #[test]
    fn test_demand_weighted_settlement_follows_demand() {
        let p = params(3, 3, 1_000).with_settlement_allocation(SettlementAllocation::DemandWeighted);
        let mut model = DynamicPools::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        // Only outbound demand from member 0: LSP fraction clamps to 0.1
        let intent = PaymentIntent::outbound(PaymentId::new(0), SimTime::ZERO, 98, EndpointId::new(0));
        model.process_payment(&intent, &mut sink).unwrap();

        let settlement = ScheduledEvent::new(at(0), EventKind::RoundSettlement { round: 0 });
        model.handle_scheduled_event(&settlement, &mut sink).unwrap();
        let pool = &model.pools()[0];
        assert_eq!(pool.lsp_share().balance(), 100);
        // 900 split by weights 99 / 1 / 1
        assert_eq!(member_balances(pool), vec![882, 9, 9]);

        // A round without demand falls back to the even split
        model.handle_scheduled_event(&settlement, &mut sink).unwrap();
        assert_eq!(model.pools()[0].lsp_share().balance(), 500);
        assert_eq!(member_balances(&model.pools()[0]), vec![167, 167, 166]);
    }

    #[test]
    fn test_payment_at_settlement_time_sees_restored_shares() {
        // One pool of 2, liquidity 1_000: LSP 500, members 250
        let mut model = DynamicPools::from_parameters(&params(2, 2, 1_000));
        let mut scheduler = EventScheduler::new(SimTime::from_days(1.0));
        let mut metrics =
            MetricsAccumulator::new(CapitalBounds::new(model.capital_ceiling())).retain_outcomes();
        model.start(&mut scheduler).unwrap();

        let boundary = model.next_settlement();
        let to = EndpointId::new(0);
        scheduler
            .preload([
                PaymentIntent::inbound(PaymentId::new(0), at(1_000), 500, to),
                PaymentIntent::inbound(PaymentId::new(1), at(2_000), 1, to),
                PaymentIntent::inbound(PaymentId::new(2), boundary, 500, to),
            ])
            .unwrap();
        scheduler
            .drive(
                &mut model,
                &mut metrics,
                &mut std::iter::empty::<PaymentIntent>(),
                &AbortSignal::new(),
            )
            .unwrap();

        let outcomes = metrics.outcomes();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert_eq!(
            outcomes[1].outcome,
            Outcome::Failure {
                reason: FailureReason::LspSideShortfall
            }
        );
        // Settlement fires before the payment sharing its timestamp
        assert_eq!(outcomes[2].time, boundary);
        assert!(outcomes[2].is_success());
        assert_eq!(outcomes[2].locked_capital, 0);
        assert_eq!(outcomes[2].latency, Duration::from_millis(600_000));
    }

    #[test]
    fn test_round_cost_is_accounted() {
        let mut p = params(3, 3, 600);
        p.round_cost = 25;
        let mut model = DynamicPools::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        let settlement = ScheduledEvent::new(at(0), EventKind::RoundSettlement { round: 0 });
        model.handle_scheduled_event(&settlement, &mut sink).unwrap();
        model.handle_scheduled_event(&settlement, &mut sink).unwrap();
        assert_eq!(model.operations().fees_paid, 50);
        assert_eq!(model.locked_capital().unwrap(), 300);
    }
}
