//! Genetic search over fixed-size subsets of nodes.
//!
//! An individual is a sorted subset of `k` distinct node ids drawn from a universe. The population is kept sorted by
//! cost, so the best individual is always the first one.

use std::sync::{Arc, Mutex};

use log::debug;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::{
    connection::{ConnectionSet, CostAndConn},
    error::{PlacementError, Result},
    task::Nid,
};

/// How parents of the next generation are picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffspringSelection {
    /// Best of `tournament_size` uniformly drawn individuals.
    Tournament,
    /// Probability proportional to `1 / (1 + cost)`.
    Roulette,
    Random,
}

/// Which individuals form the next population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurvivorSelection {
    /// Best individuals among parents and offspring.
    Elitist,
    /// Offspring replace parents, only the best parent survives.
    Generational,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// Genes shared by both parents are kept, the rest is drawn from genes owned by one parent only.
    Uniform,
    /// Prefix of the first parent, completed with genes of the second one.
    SinglePoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Replaces one gene with a node outside of the subset.
    Swap,
    /// Replaces a random number of genes.
    Scramble,
}

/// Parameters of the genetic search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub offspring_selection: OffspringSelection,
    pub tournament_size: usize,
    pub survivor_selection: SurvivorSelection,
    pub crossover: Crossover,
    pub mutation: Mutation,
    pub mutation_probability: f64,
    /// Hard cap on the number of generations.
    pub max_generations: usize,
    /// Stop after this many generations without improvement of the best cost.
    pub steady_generations: usize,
    /// Number of threads evaluating a generation, `1` evaluates in the calling thread.
    pub threads: usize,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            offspring_selection: OffspringSelection::Tournament,
            tournament_size: 3,
            survivor_selection: SurvivorSelection::Elitist,
            crossover: Crossover::Uniform,
            mutation: Mutation::Swap,
            mutation_probability: 0.2,
            max_generations: 50,
            steady_generations: 10,
            threads: 1,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(PlacementError::InvalidConfig("population size must be positive".to_string()));
        }
        if self.tournament_size == 0 {
            return Err(PlacementError::InvalidConfig("tournament size must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(PlacementError::InvalidConfig(format!(
                "mutation probability {} is outside of [0, 1]",
                self.mutation_probability
            )));
        }
        Ok(())
    }
}

/// Result of a genetic search.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Best candidate ever evaluated.
    pub best: CostAndConn,
    /// Subset of the best candidate.
    pub best_subset: Vec<Nid>,
    /// Number of generations bred after the initial population.
    pub generations: usize,
}

#[derive(Clone)]
struct Individual {
    genes: Vec<Nid>,
    fitness: CostAndConn,
}

/// Genetic search over subsets of size `k`, minimizing the cost returned by `fitness`.
pub struct GeneticSearch<F> {
    config: GeneticConfig,
    universe: Vec<Nid>,
    k: usize,
    fitness: Arc<F>,
    pool: Option<ThreadPool>,
    rng: Pcg64,
}

impl<F> GeneticSearch<F>
where
    F: Fn(&[Nid]) -> Result<CostAndConn> + Send + Sync + 'static,
{
    /// Creates new search. `universe` must not contain duplicates, its order together with `seed` fixes the run.
    pub fn new(config: GeneticConfig, universe: Vec<Nid>, k: usize, seed: u64, fitness: F) -> Self {
        let pool = (config.threads > 1).then(|| ThreadPool::new(config.threads));
        Self {
            k: k.min(universe.len()),
            config,
            universe,
            fitness: Arc::new(fitness),
            pool,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn run(mut self) -> Result<SearchOutcome> {
        self.config.validate()?;
        if self.k == 0 {
            return Ok(SearchOutcome {
                best: CostAndConn::infeasible(ConnectionSet::new()),
                best_subset: Vec::new(),
                generations: 0,
            });
        }

        let initial = (0..self.config.population_size)
            .map(|_| self.random_subset())
            .collect::<Vec<_>>();
        let mut population = self.evaluate(initial)?;
        population.sort_by(|a, b| a.fitness.cmp(&b.fitness));
        let mut best = population[0].clone();

        let mut generation = 0;
        let mut steady = 0;
        while generation < self.config.max_generations && steady < self.config.steady_generations {
            generation += 1;
            let children = (0..self.config.population_size)
                .map(|_| {
                    let first = self.select(&population);
                    let second = self.select(&population);
                    let child = self.crossover(&population[first].genes, &population[second].genes);
                    if self.rng.gen_bool(self.config.mutation_probability) {
                        self.mutate(child)
                    } else {
                        child
                    }
                })
                .collect::<Vec<_>>();
            let offspring = self.evaluate(children)?;
            population = self.survivors(population, offspring);

            // candidates of equal cost don't count as progress
            if population[0].fitness.cost() < best.fitness.cost() {
                best = population[0].clone();
                steady = 0;
            } else {
                steady += 1;
            }
            debug!(
                "generation {}: best cost {}, generation best {}",
                generation,
                best.fitness.cost(),
                population[0].fitness.cost()
            );
        }

        Ok(SearchOutcome {
            best: best.fitness,
            best_subset: best.genes,
            generations: generation,
        })
    }

    fn random_subset(&mut self) -> Vec<Nid> {
        let mut genes = rand::seq::index::sample(&mut self.rng, self.universe.len(), self.k)
            .into_iter()
            .map(|i| self.universe[i])
            .collect::<Vec<_>>();
        genes.sort_unstable();
        genes
    }

    fn evaluate(&self, candidates: Vec<Vec<Nid>>) -> Result<Vec<Individual>> {
        let costs = match &self.pool {
            None => candidates
                .iter()
                .map(|genes| (self.fitness)(genes))
                .collect::<Result<Vec<_>>>()?,
            Some(pool) => {
                let slots: Arc<Mutex<Vec<Option<Result<CostAndConn>>>>> =
                    Arc::new(Mutex::new((0..candidates.len()).map(|_| None).collect()));
                for (i, genes) in candidates.iter().cloned().enumerate() {
                    let fitness = self.fitness.clone();
                    let slots = slots.clone();
                    pool.execute(move || {
                        let result = fitness(&genes);
                        if let Ok(mut slots) = slots.lock() {
                            slots[i] = Some(result);
                        }
                    });
                }
                pool.join();
                let slots = std::mem::take(&mut *slots.lock().map_err(|_| PlacementError::WorkerLost)?);
                slots
                    .into_iter()
                    .map(|slot| slot.unwrap_or(Err(PlacementError::WorkerLost)))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(candidates
            .into_iter()
            .zip(costs)
            .map(|(genes, fitness)| Individual { genes, fitness })
            .collect())
    }

    /// Index of a parent in the sorted population.
    fn select(&mut self, population: &[Individual]) -> usize {
        match self.config.offspring_selection {
            OffspringSelection::Tournament => (0..self.config.tournament_size)
                .map(|_| self.rng.gen_range(0..population.len()))
                .min()
                .unwrap_or(0),
            OffspringSelection::Roulette => {
                let weights = population
                    .iter()
                    .map(|individual| 1.0 / (1.0 + individual.fitness.cost()))
                    .collect::<Vec<_>>();
                let total = weights.iter().sum::<f64>();
                if !total.is_finite() || total <= 0.0 {
                    return self.rng.gen_range(0..population.len());
                }
                let mut point = self.rng.gen::<f64>() * total;
                for (i, weight) in weights.iter().enumerate() {
                    if point < *weight {
                        return i;
                    }
                    point -= weight;
                }
                population.len() - 1
            }
            OffspringSelection::Random => self.rng.gen_range(0..population.len()),
        }
    }

    fn crossover(&mut self, first: &[Nid], second: &[Nid]) -> Vec<Nid> {
        let mut child = match self.config.crossover {
            Crossover::Uniform => {
                let mut child = first
                    .iter()
                    .copied()
                    .filter(|gene| second.binary_search(gene).is_ok())
                    .collect::<Vec<_>>();
                let mut rest = first
                    .iter()
                    .chain(second.iter())
                    .copied()
                    .filter(|gene| child.binary_search(gene).is_err())
                    .collect::<Vec<_>>();
                rest.shuffle(&mut self.rng);
                child.extend(rest.into_iter().take(self.k - child.len()));
                child
            }
            Crossover::SinglePoint => {
                let cut = self.rng.gen_range(0..=self.k);
                let mut child = first[..cut].to_vec();
                for &gene in second.iter() {
                    if child.len() == self.k {
                        break;
                    }
                    if !child.contains(&gene) {
                        child.push(gene);
                    }
                }
                child
            }
        };
        child.sort_unstable();
        child
    }

    fn mutate(&mut self, mut genes: Vec<Nid>) -> Vec<Nid> {
        let replacements = match self.config.mutation {
            Mutation::Swap => 1,
            Mutation::Scramble => self.rng.gen_range(1..=genes.len()),
        };
        for _ in 0..replacements {
            let outside = self
                .universe
                .iter()
                .copied()
                .filter(|gene| genes.binary_search(gene).is_err())
                .collect::<Vec<_>>();
            if outside.is_empty() {
                break;
            }
            let pos = self.rng.gen_range(0..genes.len());
            genes[pos] = outside[self.rng.gen_range(0..outside.len())];
            genes.sort_unstable();
        }
        genes
    }

    fn survivors(&self, parents: Vec<Individual>, offspring: Vec<Individual>) -> Vec<Individual> {
        let mut next = match self.config.survivor_selection {
            SurvivorSelection::Elitist => parents.into_iter().chain(offspring).collect::<Vec<_>>(),
            SurvivorSelection::Generational => parents.into_iter().take(1).chain(offspring).collect::<Vec<_>>(),
        };
        next.sort_by(|a, b| a.fitness.cmp(&b.fitness));
        next.truncate(self.config.population_size);
        next
    }
}
