use std::collections::HashSet;

use instaweave::{
    Playbook,
    config::{GenerationConfig, ResolutionStrategy},
    lpg::{Lpg, ProjectionName},
    set_builders::{Instance, NameHints},
};
use instaweave_core::{Model, error::ErrorCode, identifier::ElementId};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

/// A random acyclic type hierarchy.
///
/// Definition `i` may specialize any definition `j < i`, and owns a feature
/// typed by some `j < i` so containment paths always terminate.
#[derive(Debug, Clone)]
struct Hierarchy {
    bounds: Vec<(u64, u64)>,
    supertypes: Vec<Vec<usize>>,
    features: Vec<Option<(usize, u64)>>,
}

fn hierarchy() -> impl Strategy<Value = Hierarchy> {
    (2usize..7).prop_flat_map(|n| {
        let bounds = prop::collection::vec((0u64..3, 0u64..3), n);
        let supertypes = (0..n)
            .map(|i| prop::collection::vec(0..i.max(1), 0..=i.min(2)))
            .collect::<Vec<_>>();
        let features = (0..n)
            .map(|i| prop::option::of((0..i.max(1), 0u64..3)))
            .collect::<Vec<_>>();
        (bounds, supertypes, features)
    })
    .prop_map(|(bounds, supertypes, features)| {
        let supertypes = supertypes
            .into_iter()
            .enumerate()
            .map(|(i, sups)| {
                let mut sups: Vec<usize> = sups.into_iter().filter(|j| *j < i).collect();
                sups.sort_unstable();
                sups.dedup();
                sups
            })
            .collect();
        let features = features
            .into_iter()
            .enumerate()
            .map(|(i, f)| f.filter(|(j, _)| *j < i))
            .collect();
        Hierarchy {
            bounds: bounds.into_iter().map(|(lower, extra)| (lower, lower + extra)).collect(),
            supertypes,
            features,
        }
    })
}

fn def(i: usize) -> String {
    format!("d{i}")
}

fn to_model(h: &Hierarchy) -> Model {
    let mut records: Vec<Value> = Vec::new();
    for (i, (lower, upper)) in h.bounds.iter().enumerate() {
        records.push(json!({"@id": def(i), "@type": "PartDefinition", "name": format!("D{i}"),
                            "lowerBound": lower, "upperBound": upper}));
    }
    for (i, sups) in h.supertypes.iter().enumerate() {
        for j in sups {
            records.push(json!({"@id": format!("g{i}-{j}"), "@type": "Subclassification",
                                "source": [{"@id": def(i)}], "target": [{"@id": def(*j)}]}));
        }
    }
    for (i, feature) in h.features.iter().enumerate() {
        if let Some((j, count)) = feature {
            let f = format!("f{i}");
            records.push(json!({"@id": f, "@type": "PartUsage", "owner": {"@id": def(i)},
                                "lowerBound": count, "upperBound": count}));
            records.push(json!({"@id": format!("t{i}"), "@type": "FeatureTyping",
                                "source": [{"@id": f}], "target": [{"@id": def(*j)}]}));
        }
    }
    Model::load(records)
}

fn pool(playbook: &Playbook<'_, StdRng>, id: &str) -> Vec<Instance> {
    playbook.instances()[&ElementId::new(id)]
        .iter()
        .filter_map(|s| s.last().cloned())
        .collect()
}

fn through_rollup(model: &Model, config: GenerationConfig, seed: u64) -> Playbook<'_, StdRng> {
    let mut playbook = Playbook::new(model, config, NameHints::new(), StdRng::seed_from_u64(seed));
    playbook.interpret_edges().unwrap();
    playbook.resolve_multiplicities().unwrap();
    playbook.rollup().unwrap();
    playbook
}

proptest! {
    #[test]
    fn test_rolled_up_counts_respect_bounds(h in hierarchy(), seed in any::<u64>()) {
        let model = to_model(&h);
        let playbook = through_rollup(&model, GenerationConfig::default(), seed);
        let oversubscribed: HashSet<ElementId> = playbook
            .notes()
            .iter()
            .filter(|n| n.code() == Some(ErrorCode::E202))
            .filter_map(|n| n.subject())
            .collect();

        for (i, (lower, upper)) in h.bounds.iter().enumerate() {
            let id = ElementId::new(&def(i));
            let count = playbook.multiplicities()[&id];
            prop_assert_eq!(count as usize, playbook.instances()[&id].len());
            prop_assert!(count >= *lower);
            if !oversubscribed.contains(&id) {
                prop_assert!(count <= *upper);
            }
        }
    }

    #[test]
    fn test_supertype_pools_contain_subtype_pools(h in hierarchy(), seed in any::<u64>()) {
        let model = to_model(&h);
        let playbook = through_rollup(&model, GenerationConfig::default(), seed);

        for (i, sups) in h.supertypes.iter().enumerate() {
            let sub: HashSet<Instance> = pool(&playbook, &def(i)).into_iter().collect();
            for j in sups {
                let sup: HashSet<Instance> = pool(&playbook, &def(*j)).into_iter().collect();
                prop_assert!(sub.is_subset(&sup), "{} not within {}", def(i), def(*j));
            }
        }
    }

    #[test]
    fn test_sequences_match_template_lengths(h in hierarchy(), seed in any::<u64>()) {
        let model = to_model(&h);
        let mut playbook = through_rollup(&model, GenerationConfig::default(), seed);
        playbook.build_sequences().unwrap();

        for template in playbook.templates() {
            let Some(tail) = template.tail() else { continue };
            if template.len() < 2 {
                continue;
            }
            let lengths: HashSet<usize> = playbook
                .templates()
                .iter()
                .filter(|t| t.tail() == Some(tail))
                .map(|t| t.len())
                .collect();
            for sequence in &playbook.instances()[&tail] {
                prop_assert!(lengths.contains(&sequence.len()));
            }
        }
    }

    #[test]
    fn test_minimum_strategy_is_seed_independent(h in hierarchy(), a in any::<u64>(), b in any::<u64>()) {
        let model = to_model(&h);
        let config = GenerationConfig::default().with_strategy(ResolutionStrategy::Minimum);
        let run = |seed| {
            let result = Playbook::new(&model, config.clone(), NameHints::new(), StdRng::seed_from_u64(seed))
                .run()
                .unwrap();
            serde_json::to_value(&result).unwrap()
        };
        prop_assert_eq!(run(a), run(b));
    }

    #[test]
    fn test_projection_edges_come_from_the_lpg(h in hierarchy()) {
        let model = to_model(&h);
        let lpg = Lpg::new(&model);
        let all: HashSet<(ElementId, ElementId, ElementId)> = lpg
            .edges()
            .map(|(s, t, e)| (s, t, e.relationship()))
            .collect();

        for name in ProjectionName::ALL {
            let projection = lpg.projection(name);
            for (s, t, edge) in projection.edges() {
                prop_assert!(name.includes(edge.kind()));
                prop_assert!(all.contains(&(s, t, edge.relationship())));
            }
        }
    }
}
