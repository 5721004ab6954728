//! Example: Stepping through the playbook phases
//!
//! This example builds a small rocket model in code and runs the playbook
//! one phase at a time, printing what each phase produced.

use instaweave::{
    Playbook,
    config::{GenerationConfig, ResolutionStrategy},
    lpg::ProjectionName,
    set_builders::NameHints,
};
use instaweave_core::Model;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let model = Model::load(vec![
        json!({"@id": "rocket", "@type": "PartDefinition", "name": "Rocket",
               "lowerBound": 1, "upperBound": 1}),
        json!({"@id": "engine", "@type": "PartDefinition", "name": "Engine",
               "lowerBound": 1, "upperBound": 4}),
        json!({"@id": "vacuum", "@type": "PartDefinition", "name": "VacuumEngine",
               "lowerBound": 1, "upperBound": 2}),
        json!({"@id": "engines", "@type": "PartUsage", "name": "engines",
               "owner": {"@id": "rocket"}, "lowerBound": 2, "upperBound": 3}),
        json!({"@id": "typing", "@type": "FeatureTyping",
               "source": [{"@id": "engines"}], "target": [{"@id": "engine"}]}),
        json!({"@id": "gen", "@type": "Subclassification",
               "source": [{"@id": "vacuum"}], "target": [{"@id": "engine"}]}),
    ]);

    let config = GenerationConfig::default().with_strategy(ResolutionStrategy::Random);
    let mut playbook = Playbook::new(&model, config, NameHints::new(), StdRng::seed_from_u64(2024));

    let lpg = playbook.lpg();
    println!("LPG: {} nodes, {} edges", lpg.node_count(), lpg.edge_count());
    for name in ProjectionName::ALL {
        println!("  {name}: {} edges", lpg.projection(name).edge_count());
    }

    playbook.interpret_edges()?;
    println!("\nFeature templates:");
    for template in playbook.templates() {
        println!("  {template}");
    }

    playbook.resolve_multiplicities()?;
    println!("\nAfter phase 1:");
    for (id, count) in playbook.multiplicities() {
        println!("  {id}: {count}");
    }

    playbook.rollup()?;
    println!("\nAfter phase 2:");
    for (id, count) in playbook.multiplicities() {
        println!("  {id}: {count}");
    }

    let interpretation = playbook.run()?;
    println!("\nSequences:");
    for (id, sequences) in &interpretation.instances {
        for sequence in sequences {
            println!("  {id}: {sequence}");
        }
    }
    println!("\n{} notes", interpretation.notes.len());

    Ok(())
}
