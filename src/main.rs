//! energy-pool entry point: CLI wiring, scenario loading, and the run loop.

mod cli;

use std::path::Path;
use std::process;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use energy_pool::config::ScenarioConfig;
use energy_pool::io::export::export_csv;
use energy_pool::io::save::WorldSave;
use energy_pool::sim::kpi::PoolReport;
use energy_pool::sim::world::World;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn load_scenario(opts: &cli::CliOptions) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then the baseline default
    let loaded = if let Some(ref path) = opts.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = opts.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| fail(e));

    if let Some(seed) = opts.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(ticks) = opts.ticks {
        scenario.simulation.ticks = ticks;
    }
    scenario
}

fn build_world(opts: &cli::CliOptions, scenario: &ScenarioConfig) -> World {
    let built = match opts.load {
        Some(ref path) => WorldSave::read_from_path(path)
            .and_then(|save| save.restore(scenario))
            .map_err(|e| e.to_string()),
        None => World::from_config(scenario).map_err(|e| e.to_string()),
    };
    built.unwrap_or_else(|e| fail(e))
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_pool=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let opts = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });
    if opts.help {
        cli::print_usage();
        return;
    }

    let scenario = load_scenario(&opts);
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mut world = build_world(&opts, &scenario);
    tracing::info!(
        tick = world.tick(),
        banks = world.banks().len(),
        networks = world.graph().component_count(),
        ticks = scenario.simulation.ticks,
        "starting run"
    );
    let results = world.run(scenario.simulation.ticks);

    if opts.print_every > 0 {
        for r in results.iter().step_by(usize::try_from(opts.print_every).unwrap_or(usize::MAX)) {
            println!("{r}");
        }
    }
    println!("\n{}", PoolReport::from_results(&results));

    if let Some(ref path) = opts.telemetry_out {
        if let Err(e) = export_csv(&results, path) {
            fail(format!("failed to write CSV: {e}"));
        }
        eprintln!("Telemetry written to {}", path.display());
    }

    if let Some(ref path) = opts.save {
        if let Err(e) = WorldSave::capture(&world).write_to_path(Path::new(path)) {
            fail(e);
        }
        eprintln!("World saved to {}", path.display());
    }

    #[cfg(feature = "api")]
    if opts.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(energy_pool::api::AppState::new(world, results));
        let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));
        let rt = tokio::runtime::Runtime::new()
            .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
        rt.block_on(energy_pool::api::serve(state, addr));
    }
}
