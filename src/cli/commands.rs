//! Command dispatch

use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::TopologyService;
use crate::cli::args::{Cli, Commands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{self, Settings};
use crate::domain::Topology;

/// Runs the selected command; `show` when none is given.
pub fn execute(cli: &Cli) -> CliResult<()> {
    if let Some(Commands::Completion { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli)?;
    let service = TopologyService::new(Arc::new(settings));
    let topology = service.load()?;

    match &cli.command {
        None => cmd_show(&service, &topology, false, false),
        Some(Commands::Show {
            no_cpuset,
            no_os_index,
        }) => cmd_show(&service, &topology, *no_cpuset, *no_os_index),
        Some(Commands::Info) => cmd_info(&service, &topology),
        Some(Commands::Check) => cmd_check(&topology),
        Some(Commands::Closest { object, count }) => cmd_closest(&service, &topology, object, *count),
        Some(Commands::Ancestor { first, second }) => cmd_ancestor(&service, &topology, first, second),
        Some(Commands::Mask { cpuset }) => cmd_mask(&service, &topology, cpuset),
        Some(Commands::Completion { .. }) => Ok(()),
    }
}

/// Settings from config files and env, with `--synthetic` on top.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(synthetic) = &cli.synthetic {
        settings.synthetic = Some(synthetic.clone());
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(level = "debug", skip(service, topology))]
fn cmd_show(
    service: &TopologyService,
    topology: &Topology,
    no_cpuset: bool,
    no_os_index: bool,
) -> CliResult<()> {
    let tree = if no_cpuset || no_os_index {
        let mut settings = service.settings().clone();
        settings.render.show_cpuset &= !no_cpuset;
        settings.render.show_os_index &= !no_os_index;
        TopologyService::new(Arc::new(settings)).render(topology)?
    } else {
        service.render(topology)?
    };
    output::info(&tree);
    Ok(())
}

fn cmd_info(service: &TopologyService, topology: &Topology) -> CliResult<()> {
    let settings = service.settings();

    output::header("Source");
    output::detail(&format!("supplier:   {}", topology.supplier_name()));
    output::detail(&format!(
        "synthetic:  {}",
        settings.synthetic.as_deref().unwrap_or("(none, single PU)")
    ));
    if let Some(path) = config::global_config_path() {
        let state = if path.exists() { "" } else { " (not present)" };
        output::detail(&format!("config:     {}{}", path.display(), state));
    }

    output::header("Levels");
    for level in service.levels(topology)? {
        output::detail(&format!(
            "depth {:>2}  {:<8} {:>5} objects  arity {}",
            level.depth, level.obj_type, level.count, level.arity
        ));
    }

    let root = topology.get_system_obj()?;
    output::header("Machine");
    output::detail(&format!("processing units: {}", root.cpuset().count()));
    output::detail(&format!("cpuset:           {}", root.cpuset()));
    Ok(())
}

fn cmd_check(topology: &Topology) -> CliResult<()> {
    topology.check()?;
    output::success("topology consistent");
    Ok(())
}

#[instrument(level = "debug", skip(service, topology))]
fn cmd_closest(
    service: &TopologyService,
    topology: &Topology,
    object: &str,
    count: Option<usize>,
) -> CliResult<()> {
    if count == Some(0) {
        return Err(CliError::InvalidArgs("--count must be at least 1".into()));
    }
    let target = service.resolve(topology, object)?;
    let entries = service.closest(topology, target, count)?;
    if entries.is_empty() {
        output::warning(&format!("{} has no other objects at its depth", topology.get_obj(target)?));
        return Ok(());
    }

    output::header(&format!("closest to {}", topology.get_obj(target)?));
    for (distance, group) in &entries.iter().chunk_by(|e| e.distance) {
        let labels = group.map(|e| e.label.as_str()).join(" ");
        output::action(&format!("distance {}", distance), &labels);
    }
    Ok(())
}

fn cmd_ancestor(service: &TopologyService, topology: &Topology, first: &str, second: &str) -> CliResult<()> {
    let a = service.resolve(topology, first)?;
    let b = service.resolve(topology, second)?;
    let ancestor = service.common_ancestor(topology, a, b)?;
    output::action("ancestor", ancestor);
    output::detail(&format!("cpuset:   {}", ancestor.cpuset().to_list_string()));
    output::detail(&format!("distance: {}", topology.tree_distance(a, b)?));
    Ok(())
}

fn cmd_mask(service: &TopologyService, topology: &Topology, list: &str) -> CliResult<()> {
    let report = service.mask(topology, list)?;
    output::action("cpuset", &report.cpuset);
    output::detail(&format!("list:     {}", report.cpuset.to_list_string()));
    output::detail(&format!(
        "cpu_set_t: {}",
        report.os_mask.iter().map(|b| format!("{:02x}", b)).join(" ")
    ));
    output::action("nodeset", &report.nodeset.to_list_string());
    output::detail(&format!("maxnode:  {}", report.maxnode));
    match &report.covering {
        Some(obj) => output::detail(&format!("covered by: {}", obj)),
        None => output::warning("no object covers this cpuset"),
    }
    if !report.largest.is_empty() {
        output::detail(&format!("largest inside: {}", report.largest.join(" ")));
    }
    Ok(())
}
