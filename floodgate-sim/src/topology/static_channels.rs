//! Bilateral channels between the LSP and each endpoint.
//!
//! `local` is the LSP side of the channel and `remote` the endpoint side. A
//! payment moves sats from one side to the other. Capacity is fixed for the
//! whole run; rebalance fees are paid by the LSP from outside the channel and
//! only show up in the operational stats.

use std::time::Duration;

use floodgate_core::{
    ConsistencyError, EndpointId, FlowKind, Party, PaymentIntent, RebalancePolicy, RunParameters,
    Sats, SimTime, TopologyKind,
};
use tracing::debug;

use super::{FailureReason, OperationalStats, OutcomeRecord, Topology};
use crate::deterministic::invariants::debit;
use crate::deterministic::{EventKind, EventSink, ScheduledEvent};

/// Lifecycle state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Carried its last payment or was just reset
    Available,
    /// Lacked liquidity and no rebalance was requested
    Depleted,
    /// Waiting for a rebalance to complete
    RebalancePending,
}

/// One channel between the LSP and an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    endpoint: EndpointId,
    capacity: Sats,
    local: Sats,
    remote: Sats,
    pending_rebalance: Option<SimTime>,
    shortfalls_since_rebalance: u32,
    state: ChannelState,
}

impl Channel {
    fn new(endpoint: EndpointId, capacity: Sats, target_split: f64) -> Self {
        let local = split_local(capacity, target_split);
        Self {
            endpoint,
            capacity,
            local,
            remote: capacity - local,
            pending_rebalance: None,
            shortfalls_since_rebalance: 0,
            state: ChannelState::Available,
        }
    }

    /// Endpoint owning this channel.
    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    /// Current capacity.
    pub fn capacity(&self) -> Sats {
        self.capacity
    }

    /// LSP-side balance.
    pub fn local_balance(&self) -> Sats {
        self.local
    }

    /// Endpoint-side balance.
    pub fn remote_balance(&self) -> Sats {
        self.remote
    }

    /// Completion time of the pending rebalance, if any.
    pub fn pending_rebalance(&self) -> Option<SimTime> {
        self.pending_rebalance
    }

    /// Lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    fn check_balanced(&self) -> Result<(), ConsistencyError> {
        let sum = u128::from(self.local) + u128::from(self.remote);
        if sum != u128::from(self.capacity) {
            return Err(ConsistencyError::ChannelImbalance {
                endpoint: self.endpoint,
                local: self.local,
                remote: self.remote,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn mark_used(&mut self) {
        if self.state == ChannelState::Depleted {
            self.state = ChannelState::Available;
        }
    }

    // LSP pays the endpoint
    fn push_to_endpoint(&mut self, amount: Sats, time: SimTime) -> Result<(), ConsistencyError> {
        let endpoint = self.endpoint;
        debit(&mut self.local, amount, time, || format!("{endpoint} local"))?;
        self.remote += amount;
        self.mark_used();
        Ok(())
    }

    // Endpoint pays the LSP
    fn pull_from_endpoint(&mut self, amount: Sats, time: SimTime) -> Result<(), ConsistencyError> {
        let endpoint = self.endpoint;
        debit(&mut self.remote, amount, time, || format!("{endpoint} remote"))?;
        self.local += amount;
        self.mark_used();
        Ok(())
    }
}

/// Static topology: one channel per endpoint, rebalanced on demand.
#[derive(Debug, Clone)]
pub struct StaticChannels {
    channels: Vec<Channel>,
    ceiling: Sats,
    target_split: f64,
    rebalance_latency: Duration,
    rebalance_cost: Sats,
    policy: RebalancePolicy,
    stats: OperationalStats,
}

impl StaticChannels {
    /// Opens `endpoint_count` channels of `channel_capacity` at the target split.
    ///
    /// Expects validated parameters.
    pub fn from_parameters(params: &RunParameters) -> Self {
        let channels = (0..params.endpoint_count)
            .map(|id| {
                Channel::new(
                    EndpointId::new(id),
                    params.channel_capacity,
                    params.target_split,
                )
            })
            .collect();

        Self {
            channels,
            ceiling: params
                .channel_capacity
                .saturating_mul(Sats::from(params.endpoint_count)),
            target_split: params.target_split,
            rebalance_latency: Duration::from_millis(params.rebalance_latency_millis()),
            rebalance_cost: params.rebalance_cost,
            policy: params.rebalance_policy,
            stats: OperationalStats::default(),
        }
    }

    /// All channels, indexed by endpoint.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel of `endpoint`.
    pub fn channel(&self, endpoint: EndpointId) -> Option<&Channel> {
        self.channels.get(endpoint.index())
    }

    fn index_of(&self, party: Party) -> Result<usize, ConsistencyError> {
        let Some(endpoint) = party.endpoint() else {
            return Err(ConsistencyError::UnexpectedEvent {
                kind: "LSP-side endpoint",
                topology: TopologyKind::Static.as_str(),
            });
        };
        if endpoint.index() >= self.channels.len() {
            return Err(ConsistencyError::UnknownEndpoint { endpoint });
        }
        Ok(endpoint.index())
    }

    fn on_shortfall(
        &mut self,
        index: usize,
        sink: &mut dyn EventSink,
    ) -> Result<(), ConsistencyError> {
        let now = sink.now();
        let latency = self.rebalance_latency;
        let policy = self.policy;
        let channel = &mut self.channels[index];
        channel.shortfalls_since_rebalance = channel.shortfalls_since_rebalance.saturating_add(1);

        if channel.pending_rebalance.is_some() {
            return Ok(());
        }

        let fire = match policy {
            RebalancePolicy::OnFirstShortfall => true,
            RebalancePolicy::AfterFailures { threshold } => {
                channel.shortfalls_since_rebalance >= threshold
            }
            RebalancePolicy::Never => false,
        };

        if !fire {
            channel.state = ChannelState::Depleted;
            return Ok(());
        }

        let completes_at = now.saturating_add(latency);
        sink.schedule(ScheduledEvent::new(
            completes_at,
            EventKind::RebalanceComplete {
                endpoint: channel.endpoint,
            },
        ))?;
        channel.pending_rebalance = Some(completes_at);
        channel.state = ChannelState::RebalancePending;
        debug!(
            sim_time = %now,
            endpoint = %channel.endpoint,
            completes_at = %completes_at,
            "Rebalance requested"
        );
        Ok(())
    }

    fn complete_rebalance(
        &mut self,
        endpoint: EndpointId,
        now: SimTime,
    ) -> Result<(), ConsistencyError> {
        let index = self.index_of(Party::Endpoint(endpoint))?;
        let target_split = self.target_split;
        let cost = self.rebalance_cost;
        let channel = &mut self.channels[index];
        if channel.pending_rebalance.is_none() {
            return Err(ConsistencyError::UnexpectedEvent {
                kind: "RebalanceComplete without pending rebalance",
                topology: TopologyKind::Static.as_str(),
            });
        }

        channel.local = split_local(channel.capacity, target_split);
        channel.remote = channel.capacity - channel.local;
        channel.pending_rebalance = None;
        channel.shortfalls_since_rebalance = 0;
        channel.state = ChannelState::Available;

        self.stats.rebalance_count += 1;
        self.stats.fees_paid = self.stats.fees_paid.saturating_add(cost);
        debug!(
            sim_time = %now,
            endpoint = %endpoint,
            fee = cost,
            "Rebalance complete"
        );
        Ok(())
    }
}

impl Topology for StaticChannels {
    fn kind(&self) -> TopologyKind {
        TopologyKind::Static
    }

    fn start(&mut self, _sink: &mut dyn EventSink) -> Result<(), ConsistencyError> {
        Ok(())
    }

    fn process_payment(
        &mut self,
        intent: &PaymentIntent,
        sink: &mut dyn EventSink,
    ) -> Result<OutcomeRecord, ConsistencyError> {
        let now = sink.now();
        let amount = intent.amount();

        let shortfall = match intent.flow() {
            FlowKind::Inbound => {
                let dest = self.index_of(intent.destination())?;
                if self.channels[dest].local >= amount {
                    self.channels[dest].push_to_endpoint(amount, now)?;
                    None
                } else {
                    self.on_shortfall(dest, sink)?;
                    Some(FailureReason::LspSideShortfall)
                }
            }
            FlowKind::Outbound => {
                let source = self.index_of(intent.source())?;
                if self.channels[source].remote >= amount {
                    self.channels[source].pull_from_endpoint(amount, now)?;
                    None
                } else {
                    self.on_shortfall(source, sink)?;
                    Some(FailureReason::EndpointSideShortfall)
                }
            }
            FlowKind::Internal => {
                let source = self.index_of(intent.source())?;
                let dest = self.index_of(intent.destination())?;
                let endpoint_short = self.channels[source].remote < amount;
                let lsp_short = self.channels[dest].local < amount;
                match FailureReason::from_shortfalls(lsp_short, endpoint_short) {
                    None => {
                        self.channels[source].pull_from_endpoint(amount, now)?;
                        self.channels[dest].push_to_endpoint(amount, now)?;
                        None
                    }
                    Some(reason) => {
                        if endpoint_short {
                            self.on_shortfall(source, sink)?;
                        }
                        if lsp_short {
                            self.on_shortfall(dest, sink)?;
                        }
                        Some(reason)
                    }
                }
            }
        };

        let locked = self.locked_capital()?;
        Ok(match shortfall {
            None => OutcomeRecord::success(intent, Duration::ZERO, locked),
            Some(reason) => {
                debug!(sim_time = %now, payment = %intent.id(), amount, ?reason, "Payment failed");
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
            EventKind::RebalanceComplete { endpoint } => {
                self.complete_rebalance(*endpoint, sink.now())
            }
            other => Err(ConsistencyError::UnexpectedEvent {
                kind: other.as_str(),
                topology: TopologyKind::Static.as_str(),
            }),
        }
    }

    fn locked_capital(&self) -> Result<Sats, ConsistencyError> {
        Ok(self.channels.iter().map(|c| c.local).sum())
    }

    fn capital_ceiling(&self) -> Sats {
        self.ceiling
    }

    fn check_invariants(&self) -> Result<(), ConsistencyError> {
        self.channels.iter().try_for_each(Channel::check_balanced)
    }

    fn operations(&self) -> OperationalStats {
        self.stats
    }
}

fn split_local(capacity: Sats, target_split: f64) -> Sats {
    let local = (capacity as f64 * target_split).round();
    // `as` saturates, the clamp keeps the remote side non-negative
    (local as Sats).min(capacity)
}

#[cfg(test)]
mod tests {
    use floodgate_core::PaymentId;

    use super::*;
    use crate::deterministic::EventScheduler;
    use crate::topology::Outcome;

    fn params(capacity: Sats, latency_secs: f64) -> RunParameters {
        RunParameters::default()
            .with_endpoint_count(3)
            .with_channel_capacity(capacity)
            .with_rebalance_latency_secs(latency_secs)
    }

    fn inbound(id: u64, millis: u64, amount: Sats, to: u32) -> PaymentIntent {
        PaymentIntent::inbound(
            PaymentId::new(id),
            SimTime::from_millis(millis),
            amount,
            EndpointId::new(to),
        )
    }

    fn outbound(id: u64, millis: u64, amount: Sats, from: u32) -> PaymentIntent {
        PaymentIntent::outbound(
            PaymentId::new(id),
            SimTime::from_millis(millis),
            amount,
            EndpointId::new(from),
        )
    }

    #[test]
    fn test_channels_open_at_target_split() {
        let model = StaticChannels::from_parameters(&params(1_000, 0.0));
        assert_eq!(model.channels().len(), 3);
        for channel in model.channels() {
            assert_eq!(channel.local_balance(), 500);
            assert_eq!(channel.remote_balance(), 500);
            assert_eq!(channel.state(), ChannelState::Available);
        }
        assert_eq!(model.locked_capital().unwrap(), 1_500);
        assert_eq!(model.capital_ceiling(), 3_000);
    }

    #[test]
    fn test_inbound_and_outbound_move_balances() {
        let mut model = StaticChannels::from_parameters(&params(1_000, 0.0));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        let record = model.process_payment(&inbound(0, 0, 200, 1), &mut sink).unwrap();
        assert!(record.is_success());
        assert_eq!(record.latency, Duration::ZERO);
        let channel = model.channel(EndpointId::new(1)).unwrap();
        assert_eq!((channel.local_balance(), channel.remote_balance()), (300, 700));
        assert_eq!(record.locked_capital, 1_300);

        let record = model.process_payment(&outbound(1, 0, 650, 1), &mut sink).unwrap();
        assert!(record.is_success());
        let channel = model.channel(EndpointId::new(1)).unwrap();
        assert_eq!((channel.local_balance(), channel.remote_balance()), (950, 50));
        assert!(model.check_invariants().is_ok());
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_shortfall_schedules_one_rebalance() {
        let mut model = StaticChannels::from_parameters(&params(1_000, 60.0));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        let record = model.process_payment(&inbound(0, 0, 600, 0), &mut sink).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                reason: FailureReason::LspSideShortfall
            }
        );
        let channel = model.channel(EndpointId::new(0)).unwrap();
        assert_eq!(channel.state(), ChannelState::RebalancePending);
        assert_eq!(channel.pending_rebalance(), Some(SimTime::from_millis(60_000)));
        assert_eq!(sink.pending(), 1);

        // Opposite side depleted while pending: still one rebalance
        model.process_payment(&outbound(1, 0, 900, 0), &mut sink).unwrap();
        assert_eq!(sink.pending(), 1);

        // Live balances keep serving payments while pending
        let record = model.process_payment(&inbound(2, 0, 100, 0), &mut sink).unwrap();
        assert!(record.is_success());
    }

    #[test]
    fn test_rebalance_completion_charges_fee_and_resets() {
        let mut p = params(1_000, 60.0);
        p.rebalance_cost = 100;
        let mut model = StaticChannels::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        model.process_payment(&inbound(0, 0, 400, 2), &mut sink).unwrap();
        model.process_payment(&inbound(1, 0, 400, 2), &mut sink).unwrap();

        let event = ScheduledEvent::new(
            SimTime::from_millis(60_000),
            EventKind::RebalanceComplete {
                endpoint: EndpointId::new(2),
            },
        );
        model.handle_scheduled_event(&event, &mut sink).unwrap();

        let channel = model.channel(EndpointId::new(2)).unwrap();
        assert_eq!(channel.capacity(), 1_000);
        assert_eq!(channel.local_balance(), 500);
        assert_eq!(channel.remote_balance(), 500);
        assert_eq!(channel.state(), ChannelState::Available);
        assert_eq!(channel.pending_rebalance(), None);
        assert_eq!(
            model.operations(),
            OperationalStats {
                rebalance_count: 1,
                round_count: 0,
                fees_paid: 100,
            }
        );
    }

    #[test]
    fn test_repeated_rebalances_keep_capacity_and_accumulate_fees() {
        let mut p = params(1_000, 60.0);
        p.rebalance_cost = 400;
        let mut model = StaticChannels::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        // Far more rebalances than capacity / cost
        for cycle in 0..10u64 {
            let millis = cycle * 60_000;
            let record = model.process_payment(&inbound(cycle, millis, 600, 0), &mut sink).unwrap();
            assert!(!record.is_success());
            let event = ScheduledEvent::new(
                SimTime::from_millis(millis + 60_000),
                EventKind::RebalanceComplete {
                    endpoint: EndpointId::new(0),
                },
            );
            model.handle_scheduled_event(&event, &mut sink).unwrap();

            let channel = model.channel(EndpointId::new(0)).unwrap();
            assert_eq!(channel.capacity(), 1_000);
            assert_eq!((channel.local_balance(), channel.remote_balance()), (500, 500));
        }

        assert_eq!(model.operations().rebalance_count, 10);
        assert_eq!(model.operations().fees_paid, 4_000);
        assert!(model.check_invariants().is_ok());
        assert_eq!(model.locked_capital().unwrap(), 1_500);

        // A reset channel serves the payment that used to fail
        let record = model.process_payment(&inbound(99, 600_000, 500, 0), &mut sink).unwrap();
        assert!(record.is_success());
    }

    #[test]
    fn test_internal_payment_is_atomic() {
        let mut model = StaticChannels::from_parameters(&params(1_000, 60.0));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        let (a, b) = (EndpointId::new(0), EndpointId::new(1));

        let ok = PaymentIntent::internal(PaymentId::new(0), SimTime::ZERO, 300, a, b).unwrap();
        assert!(model.process_payment(&ok, &mut sink).unwrap().is_success());
        assert_eq!(model.channel(a).unwrap().remote_balance(), 200);
        assert_eq!(model.channel(a).unwrap().local_balance(), 800);
        assert_eq!(model.channel(b).unwrap().local_balance(), 200);
        assert_eq!(model.channel(b).unwrap().remote_balance(), 800);

        // Source can pay 200 but destination can only receive 200: both short at 250
        let short = PaymentIntent::internal(PaymentId::new(1), SimTime::ZERO, 250, a, b).unwrap();
        let record = model.process_payment(&short, &mut sink).unwrap();
        assert_eq!(
            record.outcome,
            Outcome::Failure {
                reason: FailureReason::BothSides
            }
        );
        assert_eq!(model.channel(a).unwrap().remote_balance(), 200);
        assert_eq!(model.channel(b).unwrap().local_balance(), 200);
        assert_eq!(sink.pending(), 2);
    }

    #[test]
    fn test_never_policy_marks_depleted_until_used() {
        let p = params(1_000, 0.0).with_rebalance_policy(RebalancePolicy::Never);
        let mut model = StaticChannels::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        model.process_payment(&inbound(0, 0, 501, 0), &mut sink).unwrap();
        assert_eq!(
            model.channel(EndpointId::new(0)).unwrap().state(),
            ChannelState::Depleted
        );
        assert_eq!(sink.pending(), 0);

        model.process_payment(&outbound(1, 0, 10, 0), &mut sink).unwrap();
        assert_eq!(
            model.channel(EndpointId::new(0)).unwrap().state(),
            ChannelState::Available
        );
    }

    #[test]
    fn test_after_failures_policy_waits_for_threshold() {
        let p = params(1_000, 0.0)
            .with_rebalance_policy(RebalancePolicy::AfterFailures { threshold: 3 });
        let mut model = StaticChannels::from_parameters(&p);
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));

        for id in 0..2 {
            model.process_payment(&inbound(id, 0, 900, 0), &mut sink).unwrap();
        }
        assert_eq!(sink.pending(), 0);
        model.process_payment(&inbound(2, 0, 900, 0), &mut sink).unwrap();
        assert_eq!(sink.pending(), 1);
    }

    #[test]
    fn test_unknown_endpoint_is_an_error() {
        let mut model = StaticChannels::from_parameters(&params(1_000, 0.0));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        assert!(matches!(
            model.process_payment(&inbound(0, 0, 1, 7), &mut sink),
            Err(ConsistencyError::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn test_round_settlement_is_unexpected() {
        let mut model = StaticChannels::from_parameters(&params(1_000, 0.0));
        let mut sink = EventScheduler::new(SimTime::from_days(1.0));
        let event = ScheduledEvent::new(SimTime::ZERO, EventKind::RoundSettlement { round: 0 });
        assert!(matches!(
            model.handle_scheduled_event(&event, &mut sink),
            Err(ConsistencyError::UnexpectedEvent { .. })
        ));
    }
}
