use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The single random source of a run. Everything stochastic (initialization,
/// variation, selection, clustering) draws from the context it is handed, so
/// a seed fully determines a run.
#[derive(Debug, Clone)]
pub struct EvolutionContext {
    seed: u64,
    rng: StdRng,
}

impl EvolutionContext {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picks a fresh seed from the OS and remembers it so the run can be replayed.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// `p` must already be validated to lie in [0, 1].
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p)
    }

    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}
