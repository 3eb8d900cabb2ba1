//! routemap CLI — driving adapter for the routemap dispatch engine.
//!
//! Subcommands:
//! - `check <config>` — validate that every rule in the config binds
//! - `match <config> <path> [options]` — dispatch a path against the config
//! - `build <config> <endpoint> [--values key=value...] [options]` — build a URL

use std::process;

use routemap::{MapConfig, MatchError, UrlValue, UrlValues};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "check" => cmd_check(&args[2..]),
        "match" => cmd_match(&args[2..]),
        "build" => cmd_build(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_check(args: &[String]) -> Result<(), String> {
    if args.is_empty() {
        return Err("check requires a config file path".into());
    }

    let config = load_config(&args[0])?;
    let map = config
        .into_map()
        .map_err(|e| format!("config invalid: {e}"))?;

    println!("Config valid ({} rules)", map.len());
    Ok(())
}

fn cmd_match(args: &[String]) -> Result<(), String> {
    if args.len() < 2 {
        return Err("match requires a config file path and a request path".into());
    }

    let config = load_config(&args[0])?;
    let path = &args[1];
    let options = parse_request_options(&args[2..])?;

    let map = config
        .into_map()
        .map_err(|e| format!("config load failed: {e}"))?;

    match map.match_path(path, &options.script_name, options.subdomain.as_deref()) {
        Ok((endpoint, values)) => {
            println!("{endpoint}");
            let mut pairs: Vec<(&String, &UrlValue)> = values.iter().collect();
            pairs.sort_by_key(|(name, _)| name.as_str());
            for (name, value) in pairs {
                println!("  {name} = {value}");
            }
        }
        Err(MatchError::Redirect { url }) => println!("redirect -> {url}"),
        Err(e @ MatchError::NotFound { .. }) => return Err(e.to_string()),
    }

    Ok(())
}

fn cmd_build(args: &[String]) -> Result<(), String> {
    if args.len() < 2 {
        return Err("build requires a config file path and an endpoint".into());
    }

    let config = load_config(&args[0])?;
    let endpoint = &args[1];
    let options = parse_request_options(&args[2..])?;

    let map = config
        .into_map()
        .map_err(|e| format!("config load failed: {e}"))?;

    let url = map
        .build(
            endpoint.as_str(),
            &options.values,
            &options.script_name,
            options.subdomain.as_deref(),
            options.external,
        )
        .map_err(|e| e.to_string())?;

    println!("{url}");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(path: &str) -> Result<MapConfig, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error: {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error: {e}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

struct RequestOptions {
    script_name: String,
    subdomain: Option<String>,
    external: bool,
    values: UrlValues,
}

fn parse_request_options(args: &[String]) -> Result<RequestOptions, String> {
    let mut options = RequestOptions {
        script_name: "/".into(),
        subdomain: None,
        external: false,
        values: UrlValues::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--script-name" => {
                i += 1;
                options.script_name = take_value(args, i, "--script-name")?.clone();
            }
            "--subdomain" => {
                i += 1;
                options.subdomain = Some(take_value(args, i, "--subdomain")?.clone());
            }
            "--external" => {
                options.external = true;
            }
            "--values" => {
                i += 1;
                while i < args.len() && !args[i].starts_with("--") {
                    let pair = &args[i];
                    let (key, value) = pair.split_once('=').ok_or_else(|| {
                        format!("invalid value pair \"{pair}\", expected key=value")
                    })?;
                    options.values.insert(key.to_owned(), parse_value(value));
                    i += 1;
                }
                continue;
            }
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
        i += 1;
    }

    Ok(options)
}

fn take_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a String, String> {
    args.get(i).ok_or_else(|| format!("{flag} requires a value"))
}

/// Integer-looking values become integers so converters like `int` accept
/// them. Everything else stays text.
fn parse_value(raw: &str) -> UrlValue {
    match raw.parse::<i64>() {
        Ok(n) => UrlValue::Int(n),
        Err(_) => UrlValue::Text(raw.to_owned()),
    }
}

fn print_usage() {
    eprintln!(
        "Usage: routemap <command> [options]

Commands:
  check <config>                                Validate that every rule binds
  match <config> <path> [options]               Dispatch a path, print endpoint and values
  build <config> <endpoint> [options]           Build a URL for an endpoint
  help                                          Show this help

Options:
  --script-name <prefix>    Mount prefix of the application (default \"/\")
  --subdomain <name>        Subdomain of the request (default from config)
  --values key=value...     Variable values for build
  --external                Force an absolute URL on build"
    );
}
