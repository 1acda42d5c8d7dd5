//! Variant-independent variation and selection operators.

use crate::context::EvolutionContext;
use crate::genetic_algorithm::{
    Chromosome, Crossover, Direction, Gene, GeneSampler, Initializer, Mutation, Selection,
};
use rand::prelude::*;

/// Builds a genome of fixed length by drawing every gene from the same sampler.
#[derive(Debug)]
pub struct RepeatInitializer<S> {
    pub sampler: S,
    pub length: usize,
}

impl<G: Gene, S: GeneSampler<G>> Initializer<G> for RepeatInitializer<S> {
    fn generate(&self, ctx: &mut EvolutionContext) -> Vec<G> {
        (0..self.length).map(|_| self.sampler.sample(ctx)).collect()
    }
}

/// Swaps the tails behind one cut point drawn from [1, len - 1].
#[derive(Debug, Default, Clone, Copy)]
pub struct SinglePointCrossover;

impl<G: Gene> Crossover<G> for SinglePointCrossover {
    fn crossover(&self, a: &[G], b: &[G], ctx: &mut EvolutionContext) -> (Vec<G>, Vec<G>) {
        let len = a.len().min(b.len());
        if len < 2 {
            return (a.to_vec(), b.to_vec());
        }

        let crossover_point = ctx.rng().gen_range(1..len);

        let mut genes_1 = Vec::with_capacity(b.len());
        let mut genes_2 = Vec::with_capacity(a.len());

        genes_1.extend_from_slice(&a[..crossover_point]);
        genes_2.extend_from_slice(&b[..crossover_point]);
        genes_1.extend_from_slice(&b[crossover_point..]);
        genes_2.extend_from_slice(&a[crossover_point..]);

        (genes_1, genes_2)
    }
}

/// Swaps the segment between two cut points; an empty segment leaves both parents intact.
#[derive(Debug, Default, Clone, Copy)]
pub struct TwoPointCrossover;

impl<G: Gene> Crossover<G> for TwoPointCrossover {
    fn crossover(&self, a: &[G], b: &[G], ctx: &mut EvolutionContext) -> (Vec<G>, Vec<G>) {
        let len = a.len().min(b.len());
        if len < 2 {
            return (a.to_vec(), b.to_vec());
        }

        // distinct points, so the exchanged segment is never empty
        let rng = ctx.rng();
        let first = rng.gen_range(1..=len);
        let second = rng.gen_range(1..len);
        let (crossover_point_1, crossover_point_2) = if second >= first {
            (first, second + 1)
        } else {
            (second, first)
        };

        let mut genes_1 = a.to_vec();
        let mut genes_2 = b.to_vec();

        genes_1[crossover_point_1..crossover_point_2]
            .clone_from_slice(&b[crossover_point_1..crossover_point_2]);
        genes_2[crossover_point_1..crossover_point_2]
            .clone_from_slice(&a[crossover_point_1..crossover_point_2]);

        (genes_1, genes_2)
    }
}

/// Replaces each gene, with probability `indpb`, by a fresh draw from `sampler`.
#[derive(Debug)]
pub struct ResampleMutation<S> {
    pub sampler: S,
    pub indpb: f64,
}

impl<G: Gene, S: GeneSampler<G>> Mutation<G> for ResampleMutation<S> {
    fn mutate(&self, genes: &mut [G], ctx: &mut EvolutionContext) {
        for gene in genes.iter_mut() {
            if ctx.chance(self.indpb) {
                *gene = self.sampler.sample(ctx);
            }
        }
    }
}

/// Swaps each gene, with probability `indpb`, with another random position.
/// The multiset of genes is preserved.
#[derive(Debug, Clone, Copy)]
pub struct ShuffleIndexesMutation {
    pub indpb: f64,
}

impl<G: Gene> Mutation<G> for ShuffleIndexesMutation {
    fn mutate(&self, genes: &mut [G], ctx: &mut EvolutionContext) {
        let len = genes.len();
        if len < 2 {
            return;
        }

        for i in 0..len {
            if ctx.chance(self.indpb) {
                let mut swap_idx = ctx.rng().gen_range(0..len - 1);
                if swap_idx >= i {
                    swap_idx += 1;
                }
                genes.swap(i, swap_idx);
            }
        }
    }
}

/// Tournament selection with replacement.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    pub size: usize,
}

impl<G: Gene> Selection<G> for TournamentSelection {
    fn select(
        &self,
        pool: &[Chromosome<G>],
        count: usize,
        direction: Direction,
        ctx: &mut EvolutionContext,
    ) -> Vec<Chromosome<G>> {
        if pool.is_empty() {
            return Vec::new();
        }

        (0..count)
            .map(|_| {
                let mut winner = &pool[ctx.index(pool.len())];
                for _ in 1..self.size {
                    let contender = &pool[ctx.index(pool.len())];
                    if direction.is_better(contender.score(direction), winner.score(direction)) {
                        winner = contender;
                    }
                }
                winner.clone()
            })
            .collect()
    }
}
