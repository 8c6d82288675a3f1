//! An executable for evolving BSSN initial data on a block-structured mesh hierarchy.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use console::style;
use eyre::eyre;
use indicatif::{HumanDuration, ProgressBar};
use strata::prelude::*;
use strata::tagging::tag_gradient;
use strata_app::logging::Logging;

mod config;

use config::Config;

/// Constraint statistics recorded at the start of every step.
#[derive(Default)]
struct History {
    times: Vec<f64>,
    data: Vec<ConstraintStatistics>,
}

impl History {
    fn append(&mut self, time: f64, stats: ConstraintStatistics) {
        self.times.push(time);
        self.data.push(stats);
    }

    fn flush(&self, config: &Config) -> eyre::Result<()> {
        if !config.diagnostic.save {
            return Ok(());
        }

        let directory = config.directory()?;
        std::fs::create_dir_all(&directory)?;

        let resolved = config.output("toml")?;
        strata_app::file::export_toml(&resolved, config)?;

        let mut data = String::new();
        writeln!(data, "# time H_mean H_max M_max G_max trA_max det_max")?;
        for (&time, stats) in self.times.iter().zip(self.data.iter()) {
            writeln!(
                data,
                "{time} {} {} {} {} {} {}",
                stats.hamiltonian.mean,
                stats.hamiltonian.max,
                stats.momentum.max,
                stats.christoffel.max,
                stats.trace.max,
                stats.determinant.max
            )?;
        }

        let path = config.output("dat")?;
        std::fs::write(&path, data)?;
        println!("Constraint history: {}", style(path.display()).green());
        println!("Resolved config: {}", style(resolved.display()).green());

        Ok(())
    }
}

fn build(config: &Config) -> eyre::Result<Simulation> {
    let system = BssnSystem::new(config.bssn.clone())?
        .with_boundary(config.boundary.build()?)
        .with_background(config.background.build()?)
        .with_matter(config.matter.build()?);

    let initial = config.initial.build()?;

    Ok(Simulation::new(
        system,
        &config.domain,
        &config.refinement(),
        initial.as_ref(),
        config.evolve.dt_frac,
    )?)
}

fn report_tags(config: &Config, sim: &Simulation) -> eyre::Result<()> {
    let Some(tagging) = &config.tagging else {
        return Ok(());
    };

    if sim.steps() % tagging.interval != 0 {
        return Ok(());
    }

    let field = tagging.field(sim.system().layout().fields())?;
    for level in 0..sim.hierarchy().num_levels() {
        let tagged = tag_gradient(sim.hierarchy(), level, field, tagging.threshold);
        log::info!(
            "Level {level}: {} cells exceed |grad {field}| > {:e}",
            tagged.len(),
            tagging.threshold
        );
    }

    Ok(())
}

fn run(config: &Config, history: &mut History) -> eyre::Result<()> {
    let start = Instant::now();

    let mut sim = build(config)?;
    println!(
        "Built {} levels, dt = {:.5e}",
        sim.hierarchy().num_levels(),
        sim.dt()
    );

    let pb = ProgressBar::new(config.evolve.steps as u64);
    pb.set_style(strata_app::progress::run_style());
    pb.set_prefix("[Evolve]");

    for _ in 0..config.evolve.steps {
        report_tags(config, &sim)?;

        let time = sim.time();
        let stats = sim.run_step()?;
        history.append(time, stats);

        pb.set_message(format!(
            "t = {:.5}, max H = {:.5e}",
            sim.time(),
            stats.hamiltonian.max
        ));
        pb.inc(1);
    }

    let stats = sim.statistics();
    history.append(sim.time(), stats);

    pb.finish_with_message(format!("t = {:.5}", sim.time()));
    println!(
        "Evolution finished in {}, final max H = {:.5e}",
        HumanDuration(start.elapsed()),
        stats.hamiltonian.max
    );

    Ok(())
}

fn main() -> eyre::Result<()> {
    // Set up nice colored error handing.
    color_eyre::install()?;

    let matches = Command::new("evbssn")
        .about("A program for evolving BSSN initial data on block-structured mesh hierarchies.")
        .version("0.1.0")
        .arg(
            arg!(<config> "Path of the run configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-v --verbose "Increase logging verbosity (repeatable)")
                .action(ArgAction::Count),
        )
        .get_matches();

    let logging = Logging::from_verbosity(matches.get_count("verbose"));
    env_logger::builder().filter_level(logging.filter()).init();

    let config = parse_config(&matches)?;
    config.validate()?;

    println!("Simulation: {}", style(&config.name).green());
    println!(
        "Output Directory: {}",
        style(config.directory()?.display()).green()
    );
    println!(
        "Domain: {:?} cells, {:?} length, {} refined levels",
        config.domain.cells,
        config.domain.length,
        config.levels.len()
    );
    println!(
        "Initial data: {}, matter: {}, boundary: {}",
        style(&config.initial.kind).cyan(),
        style(&config.matter.kind).cyan(),
        style(&config.boundary.kind).cyan()
    );

    let mut history = History::default();
    let result = run(&config, &mut history);
    // Keep whatever history was recorded before a failure.
    history.flush(&config)?;

    result
}

fn parse_config(matches: &ArgMatches) -> eyre::Result<Config> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .ok_or_else(|| eyre!("failed to specify config argument"))?;
    let path = strata_app::file::abs_or_relative(&path)?;

    strata_app::file::import_toml(&path)
        .map_err(|err| eyre!("failed to load config {}: {err}", path.display()))
}
