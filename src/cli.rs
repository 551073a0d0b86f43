use std::env;
use std::path::PathBuf;

/// Default interval between printed tick lines.
const DEFAULT_PRINT_EVERY: u64 = 100;

#[derive(Debug)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub load: Option<PathBuf>,
    pub seed: Option<u64>,
    pub ticks: Option<u64>,
    pub telemetry_out: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub print_every: u64,
    pub help: bool,
    #[cfg(feature = "api")]
    pub serve: bool,
    #[cfg(feature = "api")]
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions {
        scenario: None,
        preset: None,
        load: None,
        seed: None,
        ticks: None,
        telemetry_out: None,
        save: None,
        print_every: DEFAULT_PRINT_EVERY,
        help: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --scenario (expected a TOML file path)",
                )?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(
                    i,
                    "missing value for --preset (expected a preset name)",
                )?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--load" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --load (expected a save file path)",
                )?;
                opts.load = Some(PathBuf::from(path));
            }
            "--seed" => {
                i += 1;
                opts.seed = Some(parse_number(args, i, "--seed")?);
            }
            "--ticks" => {
                i += 1;
                opts.ticks = Some(parse_number(args, i, "--ticks")?);
            }
            "--print-every" => {
                i += 1;
                opts.print_every = parse_number(args, i, "--print-every")?;
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --telemetry-out (expected a file path)",
                )?;
                opts.telemetry_out = Some(PathBuf::from(path));
            }
            "--save" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --save (expected a file path)")?;
                opts.save = Some(PathBuf::from(path));
            }
            #[cfg(feature = "api")]
            "--serve" => {
                opts.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                opts.port = raw
                    .parse()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
            }
            "--help" | "-h" => {
                opts.help = true;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    Ok(opts)
}

fn parse_number(args: &[String], index: usize, flag: &str) -> Result<u64, String> {
    let raw = args.next_or_err(index, &format!("missing value for {flag} (expected a u64)"))?;
    raw.parse()
        .map_err(|_| format!("{flag} value \"{raw}\" is not a valid u64"))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("energy-pool: shared energy networks of adjacent capacitor banks");
    eprintln!();
    eprintln!("Usage: energy-pool [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, mixed_tiers, split)");
    eprintln!("  --load <path>            Resume from a world save");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --ticks <u64>            Override number of ticks");
    eprintln!("  --print-every <u64>      Print every n-th tick (0 prints none, default 100)");
    eprintln!("  --telemetry-out <path>   Export tick results to CSV");
    eprintln!("  --save <path>            Write the final world to a save file");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after simulation");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

#[cfg(test)]
mod tests {
    use super::parse_options;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn supports_scenario_cli() {
        let opts = parse_options(&args(&["--scenario", "scenario.toml"]))
            .expect("parse should succeed");
        assert_eq!(
            opts.scenario.as_deref().and_then(|p| p.to_str()),
            Some("scenario.toml")
        );
        assert!(opts.preset.is_none());
    }

    #[test]
    fn supports_preset_and_overrides() {
        let opts = parse_options(&args(&["--preset", "split", "--seed", "7", "--ticks", "50"]))
            .expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("split"));
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.ticks, Some(50));
        assert_eq!(opts.print_every, 100);
    }

    #[test]
    fn rejects_scenario_with_preset() {
        let err = parse_options(&args(&["--scenario", "a.toml", "--preset", "baseline"]));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_bad_number() {
        let err = parse_options(&args(&["--seed", "soon"])).unwrap_err();
        assert!(err.contains("not a valid u64"));
    }

    #[test]
    fn rejects_missing_value_and_unknown_flag() {
        assert!(parse_options(&args(&["--save"])).is_err());
        assert!(parse_options(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn help_flag_is_reported() {
        let opts = parse_options(&args(&["-h"])).expect("parse should succeed");
        assert!(opts.help);
    }
}
