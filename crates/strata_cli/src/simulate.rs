//! `simulate`: run the design against free-running clocks.
//!
//! Every clock domain whose clock is not driven by logic gets a clock
//! generator. The period comes from `--period`, then from the domain's
//! `[clocks.<name>]` table, then defaults to 1us. The run lasts COUNT
//! periods of the `sync` domain (or of the first clocked domain).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use strata_config::{resolve_simulation, ProjectConfig, ResolvedSimulation};
use strata_elaborate::{elaborate, ElaboratedDesign, SignalRole};
use strata_ir::Design;
use strata_sim::{format_fs, parse_duration, ClockSpec, SimConfig, Simulator, VcdRecorder, FS_PER_US};

use crate::SimulateArgs;

const DEFAULT_PERIOD_FS: u64 = FS_PER_US;

/// Runs the `simulate` command.
pub fn run(args: &SimulateArgs, design: &Design, project: Option<&ProjectConfig>) -> Result<i32, Box<dyn std::error::Error>> {
    let elaborated = elaborate(design)?;
    let resolved = project.map(resolve_simulation).transpose()?;
    let plan = plan(args, &elaborated, resolved.as_ref())?;

    let mut sim = Simulator::new(&elaborated, plan.sim);
    for clock in &plan.clocks {
        sim.add_clock(clock.domain, clock.period_fs, clock.phase_fs)?;
    }
    if let Some(path) = &plan.vcd {
        let file = File::create(path)?;
        sim.add_sink(Box::new(VcdRecorder::new(BufWriter::new(file))))?;
    }
    sim.run_until(plan.duration_fs)?;
    sim.finish()?;

    tracing::info!(
        design = %elaborated.top_name(),
        clocks = plan.clocks.len(),
        duration = %format_fs(plan.duration_fs),
        vcd = ?plan.vcd,
        "simulation complete"
    );
    Ok(0)
}

#[derive(Debug)]
struct Plan {
    sim: SimConfig,
    clocks: Vec<ClockSpec>,
    duration_fs: u64,
    vcd: Option<PathBuf>,
}

fn plan(
    args: &SimulateArgs,
    design: &ElaboratedDesign,
    resolved: Option<&ResolvedSimulation>,
) -> Result<Plan, Box<dyn std::error::Error>> {
    let forced = args.period.as_deref().map(parse_duration).transpose()?;

    let mut clocks = Vec::new();
    let mut reference = None;
    for (id, domain) in design.domains().iter() {
        let clk = design.signal(design.resolve(domain.clk));
        if clk.role != SignalRole::Input {
            tracing::debug!(domain = %domain.name, "clock is driven by logic; no generator attached");
            continue;
        }
        let configured = resolved.and_then(|r| r.clocks.iter().find(|c| c.domain == domain.name));
        let spec = match (forced, configured) {
            (Some(period), _) => ClockSpec::new(id, period),
            (None, Some(c)) => ClockSpec {
                domain: id,
                period_fs: c.period_fs,
                phase_fs: c.phase_fs,
            },
            (None, None) => ClockSpec::new(id, DEFAULT_PERIOD_FS),
        };
        if domain.name == "sync" || reference.is_none() {
            reference = Some(spec.period_fs);
        }
        clocks.push(spec);
    }

    let period = reference.or(forced).unwrap_or(DEFAULT_PERIOD_FS);
    let duration_fs = period
        .checked_mul(args.clocks)
        .ok_or("simulation length does not fit in 64-bit femtoseconds")?;

    Ok(Plan {
        sim: resolved.map(|r| r.sim).unwrap_or_default(),
        clocks,
        duration_fs,
        vcd: args.vcd.clone().or_else(|| resolved.and_then(|r| r.waveform.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::load_config_from_str;
    use strata_ir::{DomainOptions, Shape, Statement};
    use strata_sim::FS_PER_NS;

    fn two_domains() -> Design {
        let mut d = Design::new();
        let top = d.fragment("top");
        let sync = d.add_domain("sync", DomainOptions::new().reset_less()).unwrap();
        let fast = d.add_domain("fast", DomainOptions::new().reset_less()).unwrap();
        let a = d.output(top, "a", Shape::unsigned(4));
        let b = d.output(top, "b", Shape::unsigned(4));
        d.sync(top, sync, Statement::assign(a, a + 1u32));
        d.sync(top, fast, Statement::assign(b, b + 1u32));
        d.set_top(top);
        d
    }

    fn args(clocks: u64, period: Option<&str>, vcd: Option<PathBuf>) -> SimulateArgs {
        SimulateArgs {
            clocks,
            period: period.map(str::to_string),
            vcd,
        }
    }

    #[test]
    fn forced_period_applies_to_every_domain() {
        let design = elaborate(&two_domains()).unwrap();
        let plan = plan(&args(10, Some("10ns"), None), &design, None).unwrap();
        assert_eq!(plan.clocks.len(), 2);
        assert!(plan.clocks.iter().all(|c| c.period_fs == 10 * FS_PER_NS));
        assert_eq!(plan.duration_fs, 100 * FS_PER_NS);
        assert_eq!(plan.sim, SimConfig::default());
    }

    #[test]
    fn configured_clocks_and_sync_reference() {
        let config = load_config_from_str(
            r#"
[project]
name = "demo"

[simulation]
max_delta_cycles = 64

[clocks.sync]
period = "10ns"

[clocks.fast]
frequency = "300MHz"
phase = "1ns"

[waveform]
path = "out/trace.vcd"
"#,
        )
        .unwrap();
        let resolved = resolve_simulation(&config).unwrap();
        let design = elaborate(&two_domains()).unwrap();
        let plan = plan(&args(3, None, None), &design, Some(&resolved)).unwrap();

        let sync = design.domains().iter().find(|(_, d)| d.name == "sync").unwrap().0;
        let fast = design.domains().iter().find(|(_, d)| d.name == "fast").unwrap().0;
        let by_domain = |id| plan.clocks.iter().find(|c| c.domain == id).unwrap();
        assert_eq!(by_domain(sync).period_fs, 10 * FS_PER_NS);
        assert_eq!(by_domain(fast).phase_fs, FS_PER_NS);
        assert_eq!(plan.duration_fs, 30 * FS_PER_NS);
        assert_eq!(plan.sim.max_delta_cycles, 64);
        assert_eq!(plan.vcd, Some(PathBuf::from("out/trace.vcd")));
    }

    #[test]
    fn default_period_is_one_microsecond() {
        let design = elaborate(&two_domains()).unwrap();
        let plan = plan(&args(2, None, None), &design, None).unwrap();
        assert!(plan.clocks.iter().all(|c| c.period_fs == FS_PER_US && c.phase_fs == FS_PER_US / 2));
        assert_eq!(plan.duration_fs, 2 * FS_PER_US);
    }

    #[test]
    fn bad_period_is_rejected() {
        let design = elaborate(&two_domains()).unwrap();
        assert!(plan(&args(2, Some("fast"), None), &design, None).is_err());
    }

    #[test]
    fn writes_vcd_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.vcd");
        let code = run(&args(4, Some("10ns"), Some(path.clone())), &two_domains(), None).unwrap();
        assert_eq!(code, 0);
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$timescale"));
        assert!(vcd.contains("$enddefinitions $end"));
        assert!(vcd.contains(&format!("#{}", 5 * FS_PER_NS)));
    }
}
