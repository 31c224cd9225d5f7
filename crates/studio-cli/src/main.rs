use std::env;
use std::net::SocketAddr;
use std::path::Path;

use studio_api::{serve, ServeOptions, StudioApi};
use studio_core::migration::StoredModel;

fn print_usage() {
    println!("studio-cli <command>");
    println!("commands:");
    println!("  serve [addr] [sqlite_path]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  generate <count> [seed] [sqlite_path]");
    println!("    generates narratives from the stored model and prints them as JSON");
    println!("  decision [sqlite_path]");
    println!("    prints the suggested-approach narrative for the stored model");
    println!("  risk <probability 0-4> <impact 0-4>");
    println!("  migrate <input.json> [output.json]");
    println!("    converts a legacy model file to the current shape");
}

fn default_sqlite_path() -> String {
    env::var("STUDIO_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "studio_models.sqlite".to_string())
}

fn parse_sqlite_path(value: Option<&String>) -> String {
    value
        .map(String::to_string)
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path)
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn parse_ordinal_arg(value: Option<&String>, label: &str) -> Result<u8, String> {
    let raw = value.ok_or_else(|| format!("missing {label}"))?;
    raw.parse::<u8>()
        .map_err(|_| format!("invalid {label}: {raw}"))
}

fn load_api(sqlite_path: &str) -> Result<StudioApi, String> {
    let mut api = StudioApi::new();
    api.attach_sqlite_store(sqlite_path)
        .map_err(|err| format!("failed to open model store: {err}"))?;
    let loaded = api
        .load_from_store()
        .map_err(|err| format!("failed to load model: {err}"))?;
    if !loaded {
        return Err(format!("no model stored in {sqlite_path}"));
    }
    Ok(api)
}

fn run_generate(args: &[String]) -> Result<(), String> {
    let count = args
        .get(2)
        .ok_or_else(|| "missing count".to_string())?
        .parse::<usize>()
        .map_err(|_| "invalid count".to_string())?;
    let seed = args
        .get(3)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| format!("invalid seed: {raw}"))
        })
        .transpose()?;
    let sqlite_path = parse_sqlite_path(args.get(4));

    let api = load_api(&sqlite_path)?;
    let batch = api.generate_batch(&Default::default(), count, seed);

    for narrative in &batch.narratives {
        let rendered = serde_json::to_string(narrative)
            .map_err(|err| format!("failed to encode narrative: {err}"))?;
        println!("{rendered}");
    }
    if batch.exhausted > 0 {
        eprintln!(
            "warning: {} of {} attempts found no consistent scenario",
            batch.exhausted, count
        );
    }
    Ok(())
}

fn run_decision(args: &[String]) -> Result<(), String> {
    let sqlite_path = parse_sqlite_path(args.get(2));
    let api = load_api(&sqlite_path)?;
    let breakdown = api.decision_support();

    let rendered = serde_json::to_string_pretty(&breakdown.suggested)
        .map_err(|err| format!("failed to encode narrative: {err}"))?;
    println!("{rendered}");
    Ok(())
}

fn run_risk(args: &[String]) -> Result<(), String> {
    let probability = parse_ordinal_arg(args.get(2), "probability")?;
    let impact = parse_ordinal_arg(args.get(3), "impact")?;

    let risk = studio_core::compute_risk(probability, impact).map_err(|err| err.to_string())?;
    println!("probability={probability} impact={impact} risk={risk}");
    Ok(())
}

fn run_migrate(args: &[String]) -> Result<(), String> {
    let input = args
        .get(2)
        .ok_or_else(|| "missing input path".to_string())?;
    let raw = std::fs::read_to_string(input).map_err(|err| format!("failed to read {input}: {err}"))?;
    let value = serde_json::from_str(&raw).map_err(|err| format!("invalid json in {input}: {err}"))?;

    let model = StoredModel::from_value(value)
        .map_err(|err| format!("unrecognized model shape: {err}"))?
        .into_current();
    let rendered = serde_json::to_string_pretty(&model)
        .map_err(|err| format!("failed to encode model: {err}"))?;

    match args.get(3) {
        Some(output) => {
            std::fs::write(Path::new(output), rendered)
                .map_err(|err| format!("failed to write {output}: {err}"))?;
            println!("migrated {input} -> {output}");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                let options = ServeOptions {
                    sqlite_path: parse_sqlite_path(args.get(3)),
                    textgen_endpoint: env::var("STUDIO_TEXTGEN_URL").ok(),
                };
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr, options).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("generate") => {
            if let Err(err) = run_generate(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("decision") => {
            if let Err(err) = run_decision(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("risk") => {
            if let Err(err) = run_risk(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("migrate") => {
            if let Err(err) = run_migrate(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
