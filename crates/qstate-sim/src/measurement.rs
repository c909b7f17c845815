//! Measurement: marginal probabilities, shot sampling and collapse.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::trace;

use qstate_ir::{CircuitProgram, ClbitId, QubitId};

use crate::counts::Counts;
use crate::error::{SimError, SimResult};
use crate::statevector::Statevector;

/// Which qubit is read into which classical bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementMap {
    pairs: Vec<(QubitId, ClbitId)>,
    num_clbits: usize,
}

impl MeasurementMap {
    /// Build a map from explicit pairs. A later pair for the same classical
    /// bit replaces an earlier one.
    pub fn new(pairs: impl IntoIterator<Item = (QubitId, ClbitId)>, num_clbits: u32) -> Self {
        let mut sources: Vec<Option<QubitId>> = vec![None; num_clbits as usize];
        for (q, c) in pairs {
            if let Some(slot) = sources.get_mut(c.index()) {
                *slot = Some(q);
            }
        }
        let pairs = sources
            .into_iter()
            .enumerate()
            .filter_map(|(c, q)| q.map(|q| (q, ClbitId(c as u32))))
            .collect();
        Self {
            pairs,
            num_clbits: num_clbits as usize,
        }
    }

    /// Terminal measurements of a program.
    pub fn from_program(program: &CircuitProgram) -> Self {
        Self {
            pairs: program.terminal_measurement_map(),
            num_clbits: program.num_clbits() as usize,
        }
    }

    /// `(qubit, clbit)` pairs ordered by classical bit.
    pub fn pairs(&self) -> &[(QubitId, ClbitId)] {
        &self.pairs
    }

    /// Width of the classical register.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Distinct measured qubits in first-use order.
    pub fn qubits(&self) -> Vec<QubitId> {
        let mut qubits: Vec<QubitId> = Vec::with_capacity(self.pairs.len());
        for &(q, _) in &self.pairs {
            if !qubits.contains(&q) {
                qubits.push(q);
            }
        }
        qubits
    }

    /// Render the classical register for a marginal pattern over `qubits`
    /// (bit `j` of `pattern` is `qubits[j]`).
    fn render(&self, qubits: &[QubitId], pattern: usize) -> String {
        let mut bits = vec!['0'; self.num_clbits];
        for &(q, c) in &self.pairs {
            let j = qubits.iter().position(|&x| x == q).unwrap_or(0);
            if (pattern >> j) & 1 == 1 {
                bits[c.index()] = '1';
            }
        }
        bits.into_iter().collect()
    }
}

/// Probability of every outcome pattern over a qubit subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginalDistribution {
    qubits: Vec<QubitId>,
    probabilities: Vec<f64>,
}

impl MarginalDistribution {
    /// Qubits the distribution is over; bit `j` of a pattern is `qubits[j]`.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Probability of one pattern; 0 for patterns out of range.
    pub fn probability(&self, pattern: usize) -> f64 {
        self.probabilities.get(pattern).copied().unwrap_or(0.0)
    }

    /// Probability of a bitstring, position `j` = `qubits[j]`.
    pub fn probability_of(&self, bitstring: &str) -> f64 {
        if bitstring.len() != self.qubits.len() {
            return 0.0;
        }
        let mut pattern = 0usize;
        for (j, ch) in bitstring.chars().enumerate() {
            match ch {
                '0' => {}
                '1' => pattern |= 1 << j,
                _ => return 0.0,
            }
        }
        self.probability(pattern)
    }

    /// Probabilities indexed by pattern.
    pub fn as_slice(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of patterns (`2^k`).
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Always false: the empty subset has one pattern.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Render a pattern as a bitstring, position `j` = `qubits[j]`.
    pub fn bitstring(&self, pattern: usize) -> String {
        (0..self.qubits.len())
            .map(|j| if (pattern >> j) & 1 == 1 { '1' } else { '0' })
            .collect()
    }

    /// Non-zero outcomes keyed by bitstring.
    pub fn to_map(&self) -> FxHashMap<String, f64> {
        self.probabilities
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > 0.0)
            .map(|(pattern, &p)| (self.bitstring(pattern), p))
            .collect()
    }
}

/// Outcome probability at or below which a forced collapse is refused.
pub const ZERO_PROBABILITY: f64 = f64::EPSILON;

/// Samples measurement outcomes from a statevector.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementSampler {
    tolerance: f64,
}

impl Default for MeasurementSampler {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl MeasurementSampler {
    /// Create a sampler with the given normalization tolerance.
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Normalization tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Marginal distribution over `qubits`.
    pub fn probabilities(
        &self,
        sv: &Statevector,
        qubits: &[QubitId],
    ) -> SimResult<MarginalDistribution> {
        let indices = sv.resolve_qubits(qubits, "measure")?;
        let mut probabilities = vec![0.0; 1 << indices.len()];

        for (basis, amp) in sv.amplitudes().iter().enumerate() {
            let pattern = indices
                .iter()
                .enumerate()
                .fold(0usize, |acc, (j, &q)| acc | (((basis >> q) & 1) << j));
            probabilities[pattern] += amp.norm_sqr();
        }

        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > self.tolerance {
            return Err(SimError::normalization("marginal probabilities", total, self.tolerance));
        }

        Ok(MarginalDistribution {
            qubits: qubits.to_vec(),
            probabilities,
        })
    }

    /// Draw `shots` independent outcomes without disturbing `sv`.
    pub fn sample_shots<R: Rng + ?Sized>(
        &self,
        sv: &Statevector,
        map: &MeasurementMap,
        shots: u32,
        rng: &mut R,
    ) -> SimResult<Counts> {
        let qubits = map.qubits();
        let marginal = self.probabilities(sv, &qubits)?;
        let dist = WeightedIndex::new(marginal.as_slice()).map_err(|_| {
            SimError::normalization("shot sampling", marginal.as_slice().iter().sum(), self.tolerance)
        })?;

        let mut tally = vec![0u64; marginal.len()];
        for _ in 0..shots {
            tally[dist.sample(rng)] += 1;
        }

        let mut counts = Counts::new();
        for (pattern, &n) in tally.iter().enumerate() {
            if n > 0 {
                counts.insert(map.render(&qubits, pattern), n);
            }
        }
        trace!(distinct = counts.len(), "sampled shots");
        Ok(counts)
    }

    /// Probability that `qubit` reads 1.
    pub fn probability_of_one(&self, sv: &Statevector, qubit: QubitId) -> SimResult<f64> {
        let q = sv.resolve_qubits(&[qubit], "measure")?[0];
        Ok(sv.probability_of_one(q))
    }

    /// Project `qubit` onto `outcome` and renormalize.
    ///
    /// Fails with [`SimError::ZeroProbabilityOutcome`] only when the outcome
    /// probability is at most [`ZERO_PROBABILITY`]. Rare but possible
    /// outcomes below the normalization tolerance are still accepted.
    pub fn collapse(&self, sv: &mut Statevector, qubit: QubitId, outcome: bool) -> SimResult<()> {
        let q = sv.resolve_qubits(&[qubit], "measure")?[0];
        let kept = sv.probability_of(q, outcome);
        if kept <= ZERO_PROBABILITY {
            return Err(SimError::ZeroProbabilityOutcome {
                qubit,
                outcome: u8::from(outcome),
            });
        }
        sv.project(q, outcome, kept);
        sv.check_normalized(self.tolerance, "collapse")
    }

    /// Sample one outcome for `qubit` and collapse onto it.
    pub fn measure<R: Rng + ?Sized>(
        &self,
        sv: &mut Statevector,
        qubit: QubitId,
        rng: &mut R,
    ) -> SimResult<bool> {
        let p1 = self.probability_of_one(sv, qubit)?;
        let outcome = rng.r#gen::<f64>() < p1;
        self.collapse(sv, qubit, outcome)?;
        Ok(outcome)
    }
}
