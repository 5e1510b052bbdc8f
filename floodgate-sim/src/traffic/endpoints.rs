//! Choosing payment participants from the endpoint population.

use floodgate_core::{ArchetypeMix, ConfigurationError, EndpointId, EndpointSelection};
use rand::distr::weighted::WeightedIndex;
use rand_distr::Zipf;

use crate::deterministic::SimRng;

/// Draws before falling back to a uniform pick of a distinct receiver.
const DISTINCT_RECEIVER_ATTEMPTS: usize = 10;

/// Behavioural role of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// Mostly receives
    Merchant,
    /// Mostly sends
    Consumer,
    /// Rarely transacts
    Hodler,
}

impl EndpointRole {
    const ALL: [EndpointRole; 3] = [
        EndpointRole::Merchant,
        EndpointRole::Consumer,
        EndpointRole::Hodler,
    ];

    fn index(self) -> usize {
        match self {
            EndpointRole::Merchant => 0,
            EndpointRole::Consumer => 1,
            EndpointRole::Hodler => 2,
        }
    }
}

/// Distribution over endpoint indices.
#[derive(Debug, Clone)]
enum Selector {
    Weighted(WeightedIndex<f64>),
    /// Rank `r` drawn with probability proportional to `1 / r^s`
    Ranked(Zipf<f64>),
}

impl Selector {
    fn draw(&self, rng: &mut SimRng) -> usize {
        match self {
            Selector::Weighted(index) => rng.sample(index),
            // Ranks start at 1
            Selector::Ranked(zipf) => (rng.sample(zipf) as usize).saturating_sub(1),
        }
    }
}

/// Weighted sender and receiver selection over a fixed population.
#[derive(Debug, Clone)]
pub struct EndpointPicker {
    count: u32,
    roles: Vec<EndpointRole>,
    senders: Selector,
    receivers: Selector,
}

impl EndpointPicker {
    /// Builds the picker. Archetype roles are assigned with `rng`.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError::InvalidParameter` - If the population is empty or weights are invalid
    pub fn new(
        selection: &EndpointSelection,
        count: u32,
        rng: &mut SimRng,
    ) -> Result<Self, ConfigurationError> {
        if count == 0 {
            return Err(ConfigurationError::invalid(
                "endpoint_count",
                "must be at least 1",
            ));
        }

        let (roles, senders, receivers) = match selection {
            EndpointSelection::Uniform => {
                let uniform = weighted("endpoint_selection", vec![1.0; count as usize])?;
                (Vec::new(), uniform.clone(), uniform)
            }
            EndpointSelection::Hubs { exponent } => {
                let zipf = Zipf::new(f64::from(count), *exponent).map_err(|err| {
                    ConfigurationError::invalid("endpoint_selection.exponent", err.to_string())
                })?;
                (Vec::new(), Selector::Ranked(zipf), Selector::Ranked(zipf))
            }
            EndpointSelection::Archetypes(mix) => {
                let roles = assign_roles(mix, count, rng)?;
                let senders = role_weights(&roles, mix.sender_weights.as_array());
                let receivers = role_weights(&roles, mix.receiver_weights.as_array());
                (
                    roles,
                    weighted("endpoint_selection.sender_weights", senders)?,
                    weighted("endpoint_selection.receiver_weights", receivers)?,
                )
            }
        };

        Ok(Self {
            count,
            roles,
            senders,
            receivers,
        })
    }

    /// Size of the population.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Role of `endpoint`, when archetypes are in use.
    pub fn role(&self, endpoint: EndpointId) -> Option<EndpointRole> {
        self.roles.get(endpoint.index()).copied()
    }

    /// Draws a paying endpoint.
    pub fn pick_sender(&self, rng: &mut SimRng) -> EndpointId {
        self.endpoint(self.senders.draw(rng))
    }

    /// Draws a receiving endpoint.
    pub fn pick_receiver(&self, rng: &mut SimRng) -> EndpointId {
        self.endpoint(self.receivers.draw(rng))
    }

    fn endpoint(&self, index: usize) -> EndpointId {
        EndpointId::new((index as u32).min(self.count - 1))
    }

    /// Draws a receiver different from `sender`.
    ///
    /// Needs a population of at least two. Returns `sender` otherwise.
    pub fn pick_distinct_receiver(&self, sender: EndpointId, rng: &mut SimRng) -> EndpointId {
        if self.count < 2 {
            return sender;
        }
        for _ in 0..DISTINCT_RECEIVER_ATTEMPTS {
            let receiver = self.pick_receiver(rng);
            if receiver != sender {
                return receiver;
            }
        }
        // Uniform over everyone but the sender
        let mut index = rng.random_index(self.count as usize - 1) as u32;
        if index >= sender.as_u32() {
            index += 1;
        }
        EndpointId::new(index)
    }
}

fn assign_roles(
    mix: &ArchetypeMix,
    count: u32,
    rng: &mut SimRng,
) -> Result<Vec<EndpointRole>, ConfigurationError> {
    let shares = weighted("endpoint_selection.shares", mix.shares.as_array().to_vec())?;
    Ok((0..count)
        .map(|_| EndpointRole::ALL[shares.draw(rng)])
        .collect())
}

/// Spreads each role's weight evenly over its members.
fn role_weights(roles: &[EndpointRole], per_role: [f64; 3]) -> Vec<f64> {
    let mut members = [0usize; 3];
    for role in roles {
        members[role.index()] += 1;
    }
    let weights: Vec<f64> = roles
        .iter()
        .map(|role| per_role[role.index()] / members[role.index()] as f64)
        .collect();
    if weights.iter().sum::<f64>() > 0.0 {
        weights
    } else {
        vec![1.0; roles.len()]
    }
}

fn weighted(name: &'static str, weights: Vec<f64>) -> Result<Selector, ConfigurationError> {
    WeightedIndex::new(weights)
        .map(Selector::Weighted)
        .map_err(|err| ConfigurationError::invalid(name, format!("invalid weights: {err}")))
}

#[cfg(test)]
mod tests {
    use floodgate_core::RoleWeights;

    use super::*;

    fn histogram(picker: &EndpointPicker, draws: usize, receiver: bool) -> Vec<usize> {
        let mut rng = SimRng::from_seed(21);
        let mut counts = vec![0; picker.count() as usize];
        for _ in 0..draws {
            let id = if receiver {
                picker.pick_receiver(&mut rng)
            } else {
                picker.pick_sender(&mut rng)
            };
            counts[id.index()] += 1;
        }
        counts
    }

    #[test]
    fn test_uniform_covers_population() {
        let mut rng = SimRng::from_seed(1);
        let picker = EndpointPicker::new(&EndpointSelection::Uniform, 4, &mut rng).unwrap();
        let counts = histogram(&picker, 8_000, false);
        assert!(counts.iter().all(|&c| (1_700..2_300).contains(&c)), "{counts:?}");
        assert_eq!(picker.role(EndpointId::new(0)), None);
    }

    #[test]
    fn test_hubs_concentrate_on_low_ranks() {
        let mut rng = SimRng::from_seed(1);
        let picker =
            EndpointPicker::new(&EndpointSelection::Hubs { exponent: 1.5 }, 20, &mut rng).unwrap();
        let counts = histogram(&picker, 20_000, true);
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[10]);
        assert!(counts[0] > 4 * counts[19]);
    }

    #[test]
    fn test_hubs_follow_inverse_power_of_rank() {
        let mut rng = SimRng::from_seed(9);
        let picker =
            EndpointPicker::new(&EndpointSelection::Hubs { exponent: 1.0 }, 4, &mut rng).unwrap();
        let counts = histogram(&picker, 25_000, false);
        // Weights 1, 1/2, 1/3, 1/4 over a total of 25/12: rank 1 gets 48%
        assert!((11_300..12_700).contains(&counts[0]), "{counts:?}");
        assert!((5_500..6_500).contains(&counts[1]), "{counts:?}");
        assert!((2_600..3_400).contains(&counts[3]), "{counts:?}");
        assert_eq!(counts.iter().sum::<usize>(), 25_000);
    }

    #[test]
    fn test_hubs_with_zero_exponent_are_uniform() {
        let mut rng = SimRng::from_seed(2);
        let picker =
            EndpointPicker::new(&EndpointSelection::Hubs { exponent: 0.0 }, 5, &mut rng).unwrap();
        let counts = histogram(&picker, 10_000, true);
        assert!(counts.iter().all(|&c| (1_750..2_250).contains(&c)), "{counts:?}");
    }

    #[test]
    fn test_hubs_reject_negative_exponent() {
        let mut rng = SimRng::from_seed(2);
        assert!(
            EndpointPicker::new(&EndpointSelection::Hubs { exponent: -0.5 }, 5, &mut rng).is_err()
        );
    }

    #[test]
    fn test_archetypes_assign_every_endpoint() {
        let mut rng = SimRng::from_seed(3);
        let selection = EndpointSelection::Archetypes(ArchetypeMix::default());
        let picker = EndpointPicker::new(&selection, 200, &mut rng).unwrap();
        let consumers = (0..200)
            .filter(|&id| picker.role(EndpointId::new(id)) == Some(EndpointRole::Consumer))
            .count();
        assert!((140..195).contains(&consumers), "consumers {consumers}");
        assert!((0..200).all(|id| picker.role(EndpointId::new(id)).is_some()));
    }

    #[test]
    fn test_archetype_role_weights_drive_selection() {
        let mix = ArchetypeMix {
            shares: RoleWeights::new(0.5, 0.5, 0.0),
            sender_weights: RoleWeights::new(0.0, 1.0, 0.0),
            receiver_weights: RoleWeights::new(1.0, 0.0, 0.0),
        };
        let mut rng = SimRng::from_seed(17);
        let picker = EndpointPicker::new(&EndpointSelection::Archetypes(mix), 30, &mut rng).unwrap();
        let mut draw_rng = SimRng::from_seed(5);
        for _ in 0..500 {
            let sender = picker.pick_sender(&mut draw_rng);
            assert_eq!(picker.role(sender), Some(EndpointRole::Consumer));
            let receiver = picker.pick_receiver(&mut draw_rng);
            assert_eq!(picker.role(receiver), Some(EndpointRole::Merchant));
        }
    }

    #[test]
    fn test_distinct_receiver_even_when_weights_collapse() {
        let mut rng = SimRng::from_seed(1);
        // Rank 1 takes nearly all the weight
        let picker =
            EndpointPicker::new(&EndpointSelection::Hubs { exponent: 20.0 }, 3, &mut rng).unwrap();
        let hub = EndpointId::new(0);
        for _ in 0..200 {
            assert_ne!(picker.pick_distinct_receiver(hub, &mut rng), hub);
        }
    }

    #[test]
    fn test_single_endpoint_population() {
        let mut rng = SimRng::from_seed(1);
        let picker = EndpointPicker::new(&EndpointSelection::Uniform, 1, &mut rng).unwrap();
        let only = EndpointId::new(0);
        assert_eq!(picker.pick_sender(&mut rng), only);
        assert_eq!(picker.pick_distinct_receiver(only, &mut rng), only);
        assert!(EndpointPicker::new(&EndpointSelection::Uniform, 0, &mut rng).is_err());
    }
}
