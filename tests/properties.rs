use keyword_clusterer::graph::edges::{CoOccurrenceRecord, SemanticRecord};
use keyword_clusterer::graph::Node;
use keyword_clusterer::{ClusterAggregator, ClusteringConfig, CommunityDetector, GraphBuilder, KeywordGraph};
use proptest::prelude::*;

const NODES: u32 = 12;

fn vocabulary() -> Vec<Node> {
    (0..NODES)
        .map(|id| Node::new(id, format!("kw{}", id % 5), u64::from(id % 3) + 1))
        .collect()
}

fn co_records() -> impl Strategy<Value = Vec<CoOccurrenceRecord>> {
    prop::collection::vec(
        (0..NODES, 0..NODES, 0.0f64..1.0, 0u32..10).prop_map(|(source, target, similarity, count)| {
            CoOccurrenceRecord {
                source,
                target,
                similarity,
                count,
            }
        }),
        0..40,
    )
}

fn sem_records() -> impl Strategy<Value = Vec<SemanticRecord>> {
    prop::collection::vec(
        (0..NODES, 0..NODES, -1.0f32..1.0).prop_map(|(source, target, similarity)| SemanticRecord {
            source,
            target,
            similarity,
        }),
        0..40,
    )
}

fn build(config: &ClusteringConfig, co: Vec<CoOccurrenceRecord>, sem: Vec<SemanticRecord>, semantic_first: bool) -> KeywordGraph {
    let mut builder = GraphBuilder::new(vocabulary(), config).unwrap();
    if semantic_first {
        builder.add_semantic(sem).unwrap();
        builder.add_co_occurrence(co).unwrap();
    } else {
        builder.add_co_occurrence(co).unwrap();
        builder.add_semantic(sem).unwrap();
    }
    builder.build()
}

proptest! {
    #[test]
    fn fusion_ignores_source_and_record_order(co in co_records(), sem in sem_records()) {
        let config = ClusteringConfig::default();
        let forward = build(&config, co.clone(), sem.clone(), false);

        let mut co_rev = co;
        co_rev.reverse();
        let mut sem_rev = sem;
        sem_rev.reverse();
        let backward = build(&config, co_rev, sem_rev, true);

        prop_assert_eq!(forward.edges(), backward.edges());
    }

    #[test]
    fn partition_is_total_and_deterministic(
        co in co_records(),
        sem in sem_records(),
        resolution in 0.1f64..3.0,
    ) {
        let config = ClusteringConfig { resolution, ..Default::default() };
        let graph = build(&config, co, sem, false);
        let detector = CommunityDetector::from_config(&config).unwrap();

        let partition = detector.detect(&graph);
        prop_assert_eq!(partition.len(), graph.node_count());
        prop_assert!(partition.membership().iter().all(|&c| (c as usize) < partition.community_count()));
        prop_assert_eq!(partition.sizes().iter().sum::<usize>(), graph.node_count());
        prop_assert_eq!(detector.detect(&graph), partition);
    }

    #[test]
    fn keyword_counts_sum_to_total(co in co_records(), sem in sem_records(), top_k in 1usize..6) {
        let config = ClusteringConfig { top_k, ..Default::default() };
        let graph = build(&config, co, sem, false);
        let partition = CommunityDetector::from_config(&config).unwrap().detect(&graph);
        let summary = ClusterAggregator::from_config(&config).unwrap().aggregate(&graph, &partition);

        prop_assert_eq!(summary.stats.len(), partition.community_count());
        for (id, stats) in &summary.stats {
            prop_assert_eq!(stats.keywords.values().sum::<u64>(), stats.total);
            prop_assert!(summary.top_keywords[id].len() <= top_k);
        }
    }
}
