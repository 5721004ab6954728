use instaweave::{
    ExpressionHook, InstaweaveError, Playbook,
    config::{GenerationConfig, ResolutionStrategy},
    run_playbook,
    set_builders::{InstanceSequence, NameHints, Quantity},
};
use instaweave_core::{
    Model,
    element::Element,
    error::{ErrorCode, ModelError, Severity},
    identifier::ElementId,
    phase::Phase,
};
use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

fn id(s: &str) -> ElementId {
    ElementId::new(s)
}

fn minimum() -> GenerationConfig {
    GenerationConfig::default().with_strategy(ResolutionStrategy::Minimum)
}

fn playbook(model: &Model, config: GenerationConfig) -> Playbook<'_, StdRng> {
    Playbook::new(model, config, NameHints::new(), StdRng::seed_from_u64(42))
}

fn rendered(sequences: &[InstanceSequence]) -> Vec<String> {
    sequences.iter().map(ToString::to_string).collect()
}

fn subclassification(rel: &str, specific: &str, general: &str) -> Value {
    json!({"@id": rel, "@type": "Subclassification",
           "source": [{"@id": specific}], "target": [{"@id": general}]})
}

fn typing(rel: &str, feature: &str, ty: &str) -> Value {
    json!({"@id": rel, "@type": "FeatureTyping",
           "source": [{"@id": feature}], "target": [{"@id": ty}]})
}

fn rocket_model() -> Model {
    Model::load(vec![
        json!({"@id": "pkg", "@type": "Package", "name": "Rockets"}),
        json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket",
               "owner": {"@id": "pkg"}, "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "tank-def", "@type": "PartDefinition", "name": "FuelTank",
               "owner": {"@id": "pkg"}, "lowerBound": 2, "upperBound": 2}),
        json!({"@id": "tank", "@type": "PartUsage", "name": "tank",
               "owner": {"@id": "rocket"}, "lowerBound": 2, "upperBound": 2}),
        typing("t1", "tank", "tank-def"),
    ])
}

#[test]
fn test_engine_minimum_yields_one_named_instance() {
    let model = Model::load(vec![json!({
        "@id": "engine", "@type": "PartDefinition", "name": "Engine",
        "lowerBound": 1, "upperBound": 3
    })]);
    let mut playbook = playbook(&model, minimum());
    playbook.interpret_edges().unwrap();
    playbook.resolve_multiplicities().unwrap();

    assert_eq!(playbook.multiplicities()[&id("engine")], 1);
    assert_eq!(rendered(&playbook.instances()[&id("engine")]), vec!["(Engine#1)"]);
}

#[test]
fn test_rollup_reuses_subtype_instances() {
    let model = Model::load(vec![
        json!({"@id": "engine", "@type": "PartDefinition", "name": "Engine",
               "lowerBound": 1, "upperBound": 3}),
        json!({"@id": "liquid", "@type": "PartDefinition", "name": "LiquidEngine",
               "lowerBound": 1, "upperBound": 1}),
        subclassification("g1", "liquid", "engine"),
    ]);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(rendered(result.sequences(id("liquid"))), vec!["(LiquidEngine#1)"]);
    assert_eq!(
        rendered(result.sequences(id("engine"))),
        vec!["(Engine#1)", "(LiquidEngine#1)"]
    );
    assert_eq!(result.multiplicities[&id("engine")], 2);
}

#[test]
fn test_feature_sequences_share_parent_with_distinct_children() {
    let model = rocket_model();
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(rendered(result.sequences(id("rocket"))), vec!["(Rocket#1)"]);
    assert_eq!(
        rendered(result.sequences(id("tank"))),
        vec!["(Rocket#1, FuelTank#1)", "(Rocket#1, FuelTank#2)"]
    );
    assert!(result.sequences(id("tank")).iter().all(|s| s.len() == 2));
}

#[test]
fn test_unconnected_feature_gets_one_instance() {
    let model = Model::load(vec![
        json!({"@id": "pkg", "@type": "Package"}),
        json!({"@id": "payload", "@type": "PartUsage", "name": "Payload",
               "owner": {"@id": "pkg"}}),
    ]);
    let mut playbook = playbook(&model, minimum());
    playbook.interpret_edges().unwrap();
    playbook.resolve_multiplicities().unwrap();
    assert!(playbook.instances().get(&id("payload")).is_none());

    playbook.rollup().unwrap();
    assert_eq!(rendered(&playbook.instances()[&id("payload")]), vec!["(Payload#1)"]);
    assert_eq!(playbook.multiplicities()[&id("payload")], 1);

    let result = playbook.run().unwrap();
    assert_eq!(rendered(result.sequences(id("payload"))), vec!["(Payload#1)"]);
}

#[test]
fn test_malformed_bound_defaults_to_one_with_note() {
    let model = Model::load(vec![json!({
        "@id": "x", "@type": "PartDefinition", "name": "X",
        "lowerBound": "lots", "upperBound": 4
    })]);
    let result = run_playbook(&model, ResolutionStrategy::Random, NameHints::new(), Some(3)).unwrap();

    assert_eq!(rendered(result.sequences(id("x"))), vec!["(X#1)"]);
    let note = result
        .notes
        .iter()
        .find(|n| n.code() == Some(ErrorCode::E200))
        .unwrap();
    assert_eq!(note.severity(), Severity::Warning);
    assert_eq!(note.subject(), Some(id("x")));
    assert_eq!(note.phase(), Some(Phase::Multiplicities));
}

#[test]
fn test_supertype_own_instances_are_trimmed_to_bound() {
    let model = Model::load(vec![
        json!({"@id": "vehicle", "@type": "PartDefinition", "name": "Vehicle",
               "lowerBound": 1, "upperBound": 3}),
        json!({"@id": "car", "@type": "PartDefinition", "name": "Car",
               "lowerBound": 2, "upperBound": 2}),
        subclassification("g1", "car", "vehicle"),
    ]);
    for seed in 0..20 {
        let config = GenerationConfig::default().with_seed(Some(seed));
        let result = Playbook::from_config(&model, config, NameHints::new()).run().unwrap();
        assert_eq!(result.multiplicities[&id("vehicle")], 3, "seed {seed}");
        let sequences = rendered(result.sequences(id("vehicle")));
        assert_eq!(&sequences[1..], &["(Car#1)", "(Car#2)"]);
    }
}

#[test]
fn test_oversubscribed_supertype_is_noted() {
    let model = Model::load(vec![
        json!({"@id": "vehicle", "@type": "PartDefinition", "lowerBound": 0, "upperBound": 1}),
        json!({"@id": "car", "@type": "PartDefinition", "lowerBound": 2, "upperBound": 2}),
        subclassification("g1", "car", "vehicle"),
    ]);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(result.multiplicities[&id("vehicle")], 2);
    let note = result
        .notes
        .iter()
        .find(|n| n.code() == Some(ErrorCode::E202))
        .unwrap();
    assert_eq!(note.subject(), Some(id("vehicle")));
    assert_eq!(note.related(), &[id("car")]);
}

#[test]
fn test_multiple_inheritance_feeds_each_supertype() {
    let model = Model::load(vec![
        json!({"@id": "a", "@type": "PartDefinition", "name": "A", "lowerBound": 0, "upperBound": 5}),
        json!({"@id": "b", "@type": "PartDefinition", "name": "B", "lowerBound": 0, "upperBound": 5}),
        json!({"@id": "c", "@type": "PartDefinition", "name": "C", "lowerBound": 1, "upperBound": 1}),
        subclassification("g1", "c", "a"),
        subclassification("g2", "c", "b"),
    ]);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(rendered(result.sequences(id("a"))), vec!["(C#1)"]);
    assert_eq!(rendered(result.sequences(id("b"))), vec!["(C#1)"]);
}

#[test]
fn test_exhausted_pool_creates_instances_for_type_and_supertypes() {
    let model = Model::load(vec![
        json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket",
               "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "tank-base", "@type": "PartDefinition", "name": "Tank",
               "lowerBound": 0, "upperBound": "*"}),
        json!({"@id": "tank-def", "@type": "PartDefinition", "name": "FuelTank",
               "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "tank", "@type": "PartUsage", "owner": {"@id": "rocket"},
               "lowerBound": 3, "upperBound": 3}),
        typing("t1", "tank", "tank-def"),
        subclassification("g1", "tank-def", "tank-base"),
    ]);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(
        rendered(result.sequences(id("tank"))),
        vec![
            "(Rocket#1, FuelTank#1)",
            "(Rocket#1, FuelTank#2)",
            "(Rocket#1, FuelTank#3)",
        ]
    );
    assert_eq!(result.sequences(id("tank-def")).len(), 3);
    assert_eq!(
        rendered(result.sequences(id("tank-base"))),
        vec!["(FuelTank#1)", "(FuelTank#2)", "(FuelTank#3)"]
    );
    assert_eq!(result.multiplicities[&id("tank-def")], 3);
    assert_eq!(result.multiplicities[&id("tank-base")], 3);
}

fn valve_model(tanks: u64) -> Model {
    Model::load(vec![
        json!({"@id": "pkg", "@type": "Package"}),
        json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket",
               "owner": {"@id": "pkg"}, "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "tank-def", "@type": "PartDefinition", "name": "FuelTank",
               "owner": {"@id": "pkg"}, "lowerBound": tanks, "upperBound": tanks}),
        json!({"@id": "valve-def", "@type": "PartDefinition", "name": "Valve",
               "owner": {"@id": "pkg"}, "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "tank", "@type": "PartUsage", "owner": {"@id": "rocket"},
               "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "valve", "@type": "PartUsage", "owner": {"@id": "tank-def"},
               "lowerBound": 1, "upperBound": 1}),
        typing("t1", "tank", "tank-def"),
        typing("t2", "valve", "valve-def"),
    ])
}

#[test]
fn test_typed_definition_features_are_built_once_per_instance() {
    let model = valve_model(1);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(
        rendered(result.sequences(id("valve"))),
        vec!["(Rocket#1, FuelTank#1, Valve#1)"]
    );
    assert_eq!(rendered(result.sequences(id("valve-def"))), vec!["(Valve#1)"]);
    assert_eq!(result.multiplicities[&id("valve-def")], 1);
}

#[test]
fn test_unplaced_instances_get_features_from_their_definition() {
    let model = valve_model(2);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(
        rendered(result.sequences(id("valve"))),
        vec!["(Rocket#1, FuelTank#1, Valve#1)", "(FuelTank#2, Valve#2)"]
    );
    for tank in ["FuelTank#1", "FuelTank#2"] {
        let valves = result
            .sequences(id("valve"))
            .iter()
            .filter(|s| {
                let owner = s.instances().iter().rev().nth(1);
                owner.is_some_and(|owner| owner.name() == tank)
            })
            .count();
        assert_eq!(valves, 1, "{tank}");
    }
    assert_eq!(result.multiplicities[&id("valve-def")], 2);
    assert_eq!(result.sequences(id("valve-def")).len(), 2);
}

#[test]
fn test_name_hints_name_instances() {
    let model = rocket_model();
    let hints = NameHints::new().with(id("tank-def"), ["port", "starboard"]);
    let result = Playbook::new(&model, minimum(), hints, StdRng::seed_from_u64(0))
        .run()
        .unwrap();

    assert_eq!(
        rendered(result.sequences(id("tank"))),
        vec!["(Rocket#1, port)", "(Rocket#1, starboard)"]
    );
}

fn expression_model() -> Model {
    Model::load(vec![
        json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket",
               "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "mass", "@type": "AttributeUsage", "name": "mass",
               "owner": {"@id": "rocket"}}),
        json!({"@id": "mass-expr", "@type": "OperatorExpression", "name": "sum",
               "owner": {"@id": "mass"}}),
    ])
}

#[test]
fn test_expression_sequences_extend_feature_sequences() {
    let model = expression_model();
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(rendered(result.sequences(id("mass"))), vec!["(Rocket#1, mass#1)"]);
    assert_eq!(
        rendered(result.sequences(id("mass-expr"))),
        vec!["(Rocket#1, mass#1, sum#1)"]
    );
    assert!(
        result
            .notes
            .iter()
            .any(|n| n.code() == Some(ErrorCode::E201) && n.phase() == Some(Phase::ExpressionSequences))
    );
}

struct Pairs;

impl ExpressionHook for Pairs {
    fn quantity(
        &self,
        _expression: &Element,
        _parent: &InstanceSequence,
    ) -> Result<Option<Quantity>, ModelError> {
        Ok(Some(Quantity::new(2)))
    }
}

struct Broken;

impl ExpressionHook for Broken {
    fn quantity(
        &self,
        _expression: &Element,
        _parent: &InstanceSequence,
    ) -> Result<Option<Quantity>, ModelError> {
        Quantity::try_from(-1_i64).map(Some)
    }
}

#[test]
fn test_expression_hook_sizes_sequences() {
    let model = expression_model();
    let result = playbook(&model, minimum())
        .with_expression_hook(Pairs)
        .run()
        .unwrap();

    assert_eq!(result.sequences(id("mass-expr")).len(), 2);
    assert!(
        result
            .notes
            .iter()
            .all(|n| n.phase() != Some(Phase::ExpressionSequences))
    );
}

#[test]
fn test_failing_expression_hook_aborts_phase_four() {
    let model = expression_model();
    let err = playbook(&model, minimum())
        .with_expression_hook(Broken)
        .run()
        .unwrap_err();

    assert_eq!(err.phase(), Some(Phase::ExpressionSequences));
    assert!(matches!(
        err,
        InstaweaveError::Phase {
            source: ModelError::Configuration(_),
            ..
        }
    ));
}

#[test]
fn test_phases_must_run_in_order() {
    let model = rocket_model();
    let mut playbook = playbook(&model, minimum());

    let err = playbook.rollup().unwrap_err();
    assert!(matches!(
        err,
        InstaweaveError::PhaseOrder {
            requested: Phase::Rollup,
            ..
        }
    ));

    playbook.interpret_edges().unwrap();
    let err = playbook.interpret_edges().unwrap_err();
    assert!(err.to_string().contains("already ran"));
    assert_eq!(playbook.completed(), Some(Phase::InterpretEdges));

    assert!(playbook.build_sequences().is_err());
    playbook.resolve_multiplicities().unwrap();
    assert_eq!(playbook.completed(), Some(Phase::Multiplicities));
}

#[test]
fn test_generalization_cycle_is_fatal() {
    let model = Model::load(vec![
        json!({"@id": "a", "@type": "PartDefinition"}),
        json!({"@id": "b", "@type": "PartDefinition"}),
        subclassification("g1", "a", "b"),
        subclassification("g2", "b", "a"),
    ]);
    let err = playbook(&model, minimum()).run().unwrap_err();

    assert_eq!(err.phase(), Some(Phase::Rollup));
    let InstaweaveError::Phase { source, .. } = err else {
        panic!("expected a phase error");
    };
    let mut members = source.members().to_vec();
    members.sort_by_key(ElementId::as_string);
    assert_eq!(members, vec![id("a"), id("b")]);
}

#[test]
fn test_ownership_cycle_is_fatal() {
    let model = Model::load(vec![
        json!({"@id": "a", "@type": "PartDefinition", "owner": {"@id": "b"}}),
        json!({"@id": "b", "@type": "PartDefinition", "owner": {"@id": "a"}}),
    ]);
    let err = playbook(&model, minimum()).run().unwrap_err();

    assert_eq!(err.phase(), Some(Phase::InterpretEdges));
}

#[test]
fn test_self_loops_are_noted_and_ignored() {
    let model = Model::load(vec![
        json!({"@id": "a", "@type": "PartDefinition", "name": "A"}),
        subclassification("g1", "a", "a"),
    ]);
    let result = playbook(&model, minimum()).run().unwrap();

    assert_eq!(rendered(result.sequences(id("a"))), vec!["(A#1)"]);
    assert!(result.notes.iter().any(|n| n.code() == Some(ErrorCode::E302)));
}

#[test]
fn test_same_seed_same_interpretation() {
    let model = rocket_model();
    let run = |seed| {
        let config = GenerationConfig::default().with_seed(Some(seed));
        let result = Playbook::from_config(&model, config, NameHints::new()).run().unwrap();
        serde_json::to_value(&result).unwrap()
    };

    assert_eq!(run(11), run(11));
}

#[test]
fn test_interpretation_serializes_to_json() {
    let model = rocket_model();
    let result = playbook(&model, minimum()).run().unwrap();
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(
        value["instances"]["tank"][0],
        json!([["rocket", "Rocket#1"], ["tank-def", "FuelTank#1"]])
    );
    assert_eq!(value["multiplicities"]["tank-def"], json!(2));
}
