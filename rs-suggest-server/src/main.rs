use std::env;
use std::sync::RwLock;
use std::time::Duration;

use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use rs_suggest_core::config::{PipelinesConfig, StrategyRegistry};
use rs_suggest_core::{Domains, GeneratedName, InputName, Interpretation, MetaSampler, RequestParams, SamplerKind, Status};

const DEFAULT_CONFIG: &str = "./data/pipelines.toml";
const DEFAULT_DOMAINS: &str = "./data/domains.dat";
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Wall-time budget of one suggestion request.
const REQUEST_DEADLINE: Duration = Duration::from_millis(500);

/// Struct representing query parameters for the `/v1/suggest` endpoint
#[derive(Deserialize)]
struct SuggestParams {
	label: Option<String>,
	min: Option<usize>,
	max: Option<usize>,
	fraction: Option<f64>,
	mode: Option<String>,
	sampler: Option<String>,
	seed: Option<u64>,
}

/// One suggestion as returned to clients.
#[derive(Serialize)]
struct Suggestion {
	name: String,
	tokens: Vec<String>,
	pipeline: Option<String>,
	status: Status,
	score: f64,
	provenance: Vec<Vec<String>>,
}

struct SharedData {
	sampler: MetaSampler,
	domains: RwLock<Domains>,
}

impl SuggestParams {
	/// Builds the request parameters, validating the user-provided values.
	fn request_params(&self) -> Result<RequestParams, String> {
		let mut params = RequestParams::default();
		if let Some(min) = self.min {
			params.min_suggestions = min;
		}
		if let Some(max) = self.max {
			params.max_suggestions = max;
		}
		if let Some(fraction) = self.fraction {
			params.set_min_available_fraction(fraction)?;
		}
		if let Some(mode) = &self.mode {
			params.mode = mode.trim().to_lowercase();
		}
		if let Some(sampler) = &self.sampler {
			params.sampler = sampler.parse::<SamplerKind>()?;
		}
		params.seed = self.seed;
		params.deadline = Some(REQUEST_DEADLINE);
		Ok(params)
	}
}

/// Minimal interpretation of a raw label.
///
/// Splits on `-`, `_` and whitespace. The label as a single token is always
/// an interpretation, the split form is a second one when it differs.
fn interpret(label: &str, params: RequestParams) -> InputName {
	let mut input = InputName::new(label, params);
	let normalized = input.normalized().to_owned();
	let tokens: Vec<String> = normalized
		.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
		.filter(|t| !t.is_empty())
		.map(str::to_owned)
		.collect();
	let compact = tokens.concat();

	if tokens.len() > 1 {
		input.add_interpretation(Interpretation::new("ngram", "default", tokens, 0.7));
		input.add_interpretation(Interpretation::new("ngram", "default", vec![compact], 0.3));
	} else if !compact.is_empty() {
		input.add_interpretation(Interpretation::new("ngram", "default", vec![compact], 1.0));
	}
	input
}

fn to_suggestion(name: GeneratedName, domains: &Domains) -> Suggestion {
	Suggestion {
		name: name.rendered().to_owned(),
		tokens: name.tokens().to_vec(),
		pipeline: name.source_pipeline().map(str::to_owned),
		status: name.status(),
		score: domains.score_of(name.rendered()),
		provenance: name.provenance().iter().cloned().collect(),
	}
}

/// HTTP GET endpoint `/v1/suggest`
///
/// Runs the scheduler on the label and returns the suggestions as JSON.
#[get("/v1/suggest")]
async fn get_suggestions(data: web::Data<SharedData>, query: web::Query<SuggestParams>) -> impl Responder {
	let label = match &query.label {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty label"),
	};

	let params = match query.request_params() {
		Ok(p) => p,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let domains = match data.domains.read() {
		Ok(d) => d,
		Err(_) => return HttpResponse::InternalServerError().body("Domains lock failed"),
	};

	let input = interpret(label, params);
	let suggestions: Vec<Suggestion> = data
		.sampler
		.sample(&input, &domains)
		.into_iter()
		.map(|name| to_suggestion(name, &domains))
		.collect();
	HttpResponse::Ok().json(suggestions)
}

#[get("/v1/pipelines")]
async fn get_pipelines(data: web::Data<SharedData>) -> impl Responder {
	let names: Vec<&str> = data.sampler.pipelines().map(|p| p.name()).collect();
	HttpResponse::Ok().body(names.join("\n"))
}

#[put("/v1/reload_domains")]
async fn put_reload_domains(data: web::Data<SharedData>) -> impl Responder {
	let mut domains = match data.domains.write() {
		Ok(d) => d,
		Err(_) => return HttpResponse::InternalServerError().body("Domains lock failed"),
	};

	match domains.reload() {
		Ok(_) => HttpResponse::Ok().body(format!("{} domains loaded", domains.len())),
		Err(e) => HttpResponse::InternalServerError().body(format!("Failed to reload domains: {e}")),
	}
}

/// Main entry point for the server.
///
/// Loads the pipelines and the domains classifier, then starts an Actix-web
/// HTTP server sharing both between workers.
///
/// # Notes
/// - Paths and bind address come from `RS_SUGGEST_CONFIG`, `RS_SUGGEST_DOMAINS`
///   and `RS_SUGGEST_BIND`.
/// - A missing domains file starts the server with an empty classifier
///   (every name available).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let config_path = env::var("RS_SUGGEST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_owned());
	let domains_path = env::var("RS_SUGGEST_DOMAINS").unwrap_or_else(|_| DEFAULT_DOMAINS.to_owned());
	let bind = env::var("RS_SUGGEST_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());

	let config = PipelinesConfig::load(&config_path).map_err(std::io::Error::other)?;
	let sampler = MetaSampler::from_config(&config, &StrategyRegistry::default()).map_err(std::io::Error::other)?;

	let domains = match Domains::init(&domains_path) {
		Ok(d) => d,
		Err(e) => {
			warn!("failed to load domains from {}: {}", domains_path, e);
			Domains::from_entries(Vec::new())
		}
	};

	info!("serving {} pipelines on {}", sampler.pipelines().count(), bind);
	let shared_data = web::Data::new(SharedData { sampler, domains: RwLock::new(domains) });

	HttpServer::new(move || {
		App::new()
			.app_data(shared_data.clone())
			.service(get_suggestions)
			.service(get_pipelines)
			.service(put_reload_domains)
	})
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_labels_into_interpretations() {
		let input = interpret("Big-Cat", RequestParams::default());
		let ngram = &input.interpretations()[&("ngram".to_owned(), "default".to_owned())];
		let tokenizations: Vec<String> = ngram.iter().map(|i| i.tokenization.join("+")).collect();
		assert_eq!(tokenizations, vec!["big+cat", "bigcat"]);

		let single = interpret("cats", RequestParams::default());
		assert_eq!(single.interpretations().values().flatten().count(), 1);
	}

	#[test]
	fn validates_query_parameters() {
		let query = SuggestParams {
			label: Some("cats".to_owned()),
			min: Some(5),
			max: None,
			fraction: Some(2.0),
			mode: None,
			sampler: None,
			seed: None,
		};
		assert!(query.request_params().is_err());

		let query = SuggestParams { fraction: None, sampler: Some("round_robin".to_owned()), ..query };
		let params = query.request_params().unwrap();
		assert_eq!(params.min_suggestions, 5);
		assert_eq!(params.sampler, SamplerKind::RoundRobin);
	}
}
