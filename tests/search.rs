mod common;

use std::sync::Arc;

use manet_mr::{
    config::HeuristicConfig,
    connection::{Connection, ConnectionSet, CostAndConn, SourceNodes},
    error::PlacementError,
    genetic::{Crossover, GeneticConfig, GeneticSearch, Mutation, OffspringSelection, SurvivorSelection},
    heuristics::{
        bisection_search::{BisectionBracket, BisectionSearchHeuristic},
        resolve_heuristic,
        subset_search::SubsetSearchHeuristic,
    },
    placement_heuristic::PlacementHeuristic,
    profile::{CommType, JobWeighting},
    replay::HopReplaySimulator,
    task::{Nid, Task},
    topology::{ReplaySimulator, Snapshot, Trace},
};

use common::{chain_trace, context, job, tasks_on, uniform_history, CountingReplay, SilentReplay};

/// Cost of a subset is the sum of its node ids.
fn sum_of_ids(subset: &[Nid]) -> Result<CostAndConn, PlacementError> {
    let connections = subset.iter().map(|&nid| Connection::new(0, nid)).collect::<ConnectionSet>();
    CostAndConn::new(subset.iter().sum::<usize>() as f64, connections)
}

fn small_genetic() -> GeneticConfig {
    GeneticConfig {
        population_size: 8,
        max_generations: 6,
        steady_generations: 3,
        ..GeneticConfig::default()
    }
}

#[test]
fn genetic_search_finds_cheapest_subset() {
    let config = GeneticConfig {
        population_size: 30,
        mutation_probability: 0.5,
        max_generations: 100,
        steady_generations: 25,
        ..GeneticConfig::default()
    };
    let outcome = GeneticSearch::new(config, (0..8).collect(), 2, 17, sum_of_ids).run().unwrap();
    assert_eq!(outcome.best_subset, vec![0, 1]);
    assert_eq!(outcome.best.cost(), 1.0);
}

#[test]
fn every_operator_keeps_subsets_valid() {
    for (offspring_selection, survivor_selection, crossover, mutation) in [
        (
            OffspringSelection::Tournament,
            SurvivorSelection::Elitist,
            Crossover::Uniform,
            Mutation::Swap,
        ),
        (
            OffspringSelection::Roulette,
            SurvivorSelection::Generational,
            Crossover::SinglePoint,
            Mutation::Scramble,
        ),
        (
            OffspringSelection::Random,
            SurvivorSelection::Elitist,
            Crossover::SinglePoint,
            Mutation::Swap,
        ),
    ] {
        let config = GeneticConfig {
            offspring_selection,
            survivor_selection,
            crossover,
            mutation,
            mutation_probability: 1.0,
            ..small_genetic()
        };
        let fitness = |subset: &[Nid]| {
            assert_eq!(subset.len(), 4);
            assert!(subset.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(subset.iter().all(|&nid| (10..20).contains(&nid)));
            sum_of_ids(subset)
        };
        let outcome = GeneticSearch::new(config.clone(), (10..20).collect(), 4, 3, fitness)
            .run()
            .unwrap();
        assert!(outcome.generations <= config.max_generations);
        assert_eq!(outcome.best.connections().len(), 4);
    }
}

#[test]
fn threaded_evaluation_matches_inline() {
    let inline = GeneticSearch::new(small_genetic(), (0..12).collect(), 5, 99, sum_of_ids)
        .run()
        .unwrap();
    let threaded = GeneticSearch::new(
        GeneticConfig {
            threads: 4,
            ..small_genetic()
        },
        (0..12).collect(),
        5,
        99,
        sum_of_ids,
    )
    .run()
    .unwrap();
    assert_eq!(inline.best_subset, threaded.best_subset);
    assert_eq!(inline.best, threaded.best);
    assert_eq!(inline.generations, threaded.generations);
}

#[test]
fn infeasible_search_stops_when_steady() {
    let config = GeneticConfig::default();
    let outcome = GeneticSearch::new(config.clone(), (0..10).collect(), 3, 5, |subset: &[Nid]| {
        Ok(CostAndConn::infeasible(
            subset.iter().map(|&nid| Connection::new(0, nid)).collect(),
        ))
    })
    .run()
    .unwrap();
    assert!(outcome.best.is_infeasible());
    assert_eq!(outcome.generations, config.steady_generations);
}

#[test]
fn generation_cap_is_respected() {
    let config = GeneticConfig {
        max_generations: 4,
        steady_generations: 1000,
        ..GeneticConfig::default()
    };
    let outcome = GeneticSearch::new(config, (0..30).collect(), 10, 8, sum_of_ids)
        .run()
        .unwrap();
    assert_eq!(outcome.generations, 4);
}

#[test]
fn empty_subset_is_infeasible() {
    let outcome = GeneticSearch::new(GeneticConfig::default(), (0..5).collect(), 0, 1, sum_of_ids)
        .run()
        .unwrap();
    assert!(outcome.best.is_infeasible());
    assert!(outcome.best_subset.is_empty());
    assert_eq!(outcome.generations, 0);
}

#[test]
fn genetic_errors_are_propagated() {
    let config = GeneticConfig {
        population_size: 0,
        ..GeneticConfig::default()
    };
    assert!(matches!(
        GeneticSearch::new(config, (0..5).collect(), 2, 1, sum_of_ids).run(),
        Err(PlacementError::InvalidConfig(_))
    ));

    for threads in [1, 3] {
        let config = GeneticConfig {
            threads,
            ..small_genetic()
        };
        let result = GeneticSearch::new(config, (0..5).collect(), 2, 1, |_: &[Nid]| {
            CostAndConn::new(f64::NAN, ConnectionSet::new())
        })
        .run();
        assert!(matches!(result, Err(PlacementError::InvalidCost(_))));
    }
}

fn hop_replay() -> Arc<dyn ReplaySimulator> {
    Arc::new(HopReplaySimulator::new(10.0, 0.1))
}

#[test]
fn subset_search_counts_evaluations() {
    let job = job(JobWeighting::FavorMap, &[CommType::Shuffle]);
    let ctx = context(
        chain_trace(6),
        &job,
        0,
        tasks_on(&[0, 5], 20.0),
        uniform_history(6, 0.01),
        hop_replay(),
    );
    let genetic = small_genetic();
    let heuristic = SubsetSearchHeuristic::new(0.5, genetic.clone());
    let run = heuristic
        .search("MTA-S", &ctx, &SourceNodes::from_tasks(&ctx.tasks).unwrap(), 3)
        .unwrap();

    assert_eq!(run.k, 3);
    assert!(!run.best.is_infeasible());
    assert_eq!(run.evaluations, genetic.population_size * (run.generations + 1));
    assert_eq!(run.search_effort, (run.generations + 1) as f64);

    let result = heuristic.allocate_tasks(&ctx).unwrap();
    assert_eq!(result.destinations().len(), 3);
    assert_eq!(result.connections.len(), 6);
    assert_eq!(result.connections, run.best.connections().clone());
    assert_eq!(result.search_effort, run.search_effort);
}

#[test]
fn replicate_search_covers_every_task() {
    let job = job(JobWeighting::FavorMap, &[CommType::Replicate]);
    let ctx = context(
        chain_trace(8),
        &job,
        0,
        tasks_on(&[0, 2, 4, 6, 7], 20.0),
        uniform_history(8, 0.02),
        hop_replay(),
    );
    let heuristic =
        resolve_heuristic("MTA-S[population_size=8,max_generations=5]", &HeuristicConfig::default()).unwrap();
    let result = heuristic.allocate_tasks(&ctx).unwrap();
    let tids = result.connections.iter().map(|connection| connection.tid).collect::<Vec<_>>();
    assert_eq!(tids, vec![0, 1, 2, 3, 4]);
    assert!(result.search_effort > 0.0);
    assert!(result.reliability > 0.0 && result.reliability < 1.0);
}

#[test]
fn subset_search_without_reachable_nodes_terminates() {
    let job = job(JobWeighting::FavorMap, &[CommType::Shuffle]);
    let ctx = context(
        chain_trace(6),
        &job,
        0,
        tasks_on(&[0, 1], 20.0),
        uniform_history(6, 0.01),
        Arc::new(SilentReplay),
    );
    let genetic = GeneticConfig::default();
    let run = SubsetSearchHeuristic::new(0.5, genetic.clone())
        .search("MTA-S", &ctx, &SourceNodes::from_tasks(&ctx.tasks).unwrap(), 3)
        .unwrap();
    assert!(run.best.is_infeasible());
    assert_eq!(run.generations, genetic.steady_generations);
}

#[test]
fn bisection_keeps_best_of_every_bracket() {
    let job = job(JobWeighting::FavorMap, &[CommType::Shuffle]);
    let ctx = context(
        chain_trace(10),
        &job,
        0,
        tasks_on(&[0, 3, 9], 30.0),
        uniform_history(10, 0.05),
        hop_replay(),
    );
    let sources = SourceNodes::from_tasks(&ctx.tasks).unwrap();
    let bracket = BisectionBracket::default();
    assert_eq!(bracket.range(ctx.trace.closest_snapshot(0.0).node_count()), (6, 8));

    let heuristic = BisectionSearchHeuristic::new(small_genetic(), bracket);
    let outcome = heuristic.bisect(&ctx, &sources).unwrap();
    assert!(!outcome.best.is_infeasible());
    assert_eq!((outcome.steps[0].low, outcome.steps[0].high), (6, 8));

    for (step, next) in outcome.steps.iter().zip(outcome.steps.iter().skip(1)) {
        assert_eq!(step.left.k, (3 * step.low + step.high) / 4);
        assert_eq!(step.right.k, (step.low + 3 * step.high) / 4);
        let mid = (step.low + step.high) / 2;
        if step.left.best <= step.right.best {
            assert_eq!((next.low, next.high), (step.low, mid - 1));
        } else {
            assert_eq!((next.low, next.high), (mid + 1, step.high));
        }
    }
    for step in outcome.steps.iter() {
        assert!(outcome.best <= step.left.best);
        assert!(outcome.best <= step.right.best);
    }

    let last = outcome.steps.last().unwrap();
    let search = SubsetSearchHeuristic::new(1.0, small_genetic());
    let left = search.search("MTA-D", &ctx, &sources, last.left.k).unwrap();
    let right = search.search("MTA-D", &ctx, &sources, last.right.k).unwrap();
    assert_eq!(left.best, last.left.best);
    assert_eq!(right.best, last.right.best);
    assert!(outcome.best <= left.best);
    assert!(outcome.best <= right.best);
    assert_eq!(outcome.search_effort, last.right.search_effort);

    let result = heuristic.allocate_tasks(&ctx).unwrap();
    assert_eq!(&result.connections, outcome.best.connections());
}

#[test]
fn bisection_stops_on_infeasible_phase() {
    let job = job(JobWeighting::FavorMap, &[CommType::Shuffle]);
    let replay = Arc::new(CountingReplay::default());
    let ctx = context(
        chain_trace(10),
        &job,
        0,
        tasks_on(&[0, 1], 30.0),
        uniform_history(10, 0.05),
        replay.clone(),
    );
    let genetic = small_genetic();
    let heuristic = BisectionSearchHeuristic::new(genetic.clone(), BisectionBracket::default());
    let outcome = heuristic
        .bisect(&ctx, &SourceNodes::from_tasks(&ctx.tasks).unwrap())
        .unwrap();

    assert!(outcome.best.is_infeasible());
    assert_eq!(outcome.steps.len(), 1);
    let step = &outcome.steps[0];
    assert_eq!((step.left.k, step.right.k), (6, 7));
    // both searches of the first bracket give up after the steady window
    let per_search = genetic.population_size * (genetic.steady_generations + 1);
    assert_eq!(step.left.evaluations, per_search);
    assert_eq!(step.right.evaluations, per_search);
    assert_eq!(replay.calls(), 2 * per_search);
}

#[test]
fn tasks_sharing_a_node_are_rejected() {
    let mut tasks = tasks_on(&[0, 2], 10.0);
    tasks.insert(5, Task::new(5, 2, 10.0));
    assert!(matches!(
        SourceNodes::from_tasks(&tasks),
        Err(PlacementError::InvalidConfig(_))
    ));

    let job = job(JobWeighting::FavorMap, &[CommType::Replicate]);
    let ctx = context(
        chain_trace(4),
        &job,
        0,
        tasks,
        uniform_history(4, 0.01),
        hop_replay(),
    );
    let heuristic = resolve_heuristic("MTA-S", &HeuristicConfig::default()).unwrap();
    assert!(matches!(
        heuristic.allocate_tasks(&ctx),
        Err(PlacementError::InvalidConfig(_))
    ));
}

#[test]
fn bracket_range_is_clamped() {
    let bracket = BisectionBracket { low: 0.0, high: 1.0 };
    assert_eq!(bracket.range(5), (1, 5));
    assert_eq!(BisectionBracket::default().range(1), (1, 1));
    assert!(BisectionBracket { low: 0.9, high: 0.1 }.validate().is_err());
}
