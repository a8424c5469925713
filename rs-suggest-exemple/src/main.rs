use rs_suggest_core::config::{PipelinesConfig, StrategyRegistry};
use rs_suggest_core::{Domains, InputName, Interpretation, MetaSampler, RequestParams, SamplerKind, Status};

const PIPELINES: &str = include_str!("../../data/pipelines.toml");

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Build every pipeline of the configuration with the built-in strategies
    let config = PipelinesConfig::from_toml(PIPELINES)?;
    let sampler = MetaSampler::from_config(&config, &StrategyRegistry::default())?;
    for pipeline in sampler.pipelines() {
        println!("Pipeline: {:?}", pipeline);
    }

    // In-memory registry, every unlisted name is available
    let domains = Domains::from_entries(vec![
        ("catbig".to_owned(), Status::Taken, 12.0),
        ("hugecat".to_owned(), Status::Taken, 40.0),
        ("bigcathq".to_owned(), Status::OnSale, 3.5),
        ("thebigcat".to_owned(), Status::OnSale, 1.0),
    ]);

    for kind in [SamplerKind::WeightedSampling, SamplerKind::RoundRobin] {
        // Parameters are validated by their setters
        let mut params = RequestParams::default();
        params.min_suggestions = 6;
        params.max_suggestions = 12;
        params.sampler = kind;
        params.set_min_available_fraction(0.5)?;
        match params.set_min_available_fraction(1.5) {
            Ok(_) => println!("Should not happen"),
            Err(e) => println!("{}", e),
        }

        // Two readings of the same label: two tokens or a single one
        let mut input = InputName::new("BigCat", params);
        input.add_interpretation(Interpretation::new("ngram", "en", vec!["big".to_owned(), "cat".to_owned()], 0.8));
        input.add_interpretation(Interpretation::new("ngram", "en", vec!["bigcat".to_owned()], 0.2));
        input.add_interpretation(Interpretation::new("person", "en", vec!["big".to_owned(), "cat".to_owned()], 0.4));
        input.set_type_lang_weight("person", "en", 0.25);

        println!("Suggestions for '{}' ({}):", input.input_name(), kind);
        for (i, name) in sampler.sample(&input, &domains).iter().enumerate() {
            println!("{:>3}. {:<16} {:?} from {}", i + 1, name.rendered(), name.status(), name.source_pipeline().unwrap_or("?"));
        }
    }

    // Same request, instant mode: multipliers and quotas change
    let mut params = RequestParams::default();
    params.mode = "instant".to_owned();
    params.max_suggestions = 5;
    let mut input = InputName::new("dogcoin", params);
    input.add_interpretation(Interpretation::new("ngram", "en", vec!["dog".to_owned(), "coin".to_owned()], 1.0));
    let names: Vec<String> = sampler.sample(&input, &domains).iter().map(|n| n.to_string()).collect();
    println!("Instant suggestions for 'dogcoin': {}", names.join(", "));

    Ok(())
}
