//! Resolution of human-written times and frequencies into simulator
//! settings.

use crate::error::ConfigError;
use crate::types::{ClockDef, ProjectConfig, WaveformFormat};
use std::path::PathBuf;
use strata_common::Frequency;
use strata_sim::{parse_duration, SimConfig};

/// A clock generator with its timing in femtoseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClock {
    /// Domain name.
    pub domain: String,
    /// Full period.
    pub period_fs: u64,
    /// Time of the first active edge.
    pub phase_fs: u64,
}

/// Everything the simulator needs from a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSimulation {
    /// Simulator policy.
    pub sim: SimConfig,
    /// Default run length, if configured.
    pub duration_fs: Option<u64>,
    /// Clock generators, ordered by domain name.
    pub clocks: Vec<ResolvedClock>,
    /// VCD output path, if waveform output is enabled and a path is set.
    pub waveform: Option<PathBuf>,
}

/// Resolves the `[simulation]`, `[clocks]` and `[waveform]` tables.
pub fn resolve_simulation(config: &ProjectConfig) -> Result<ResolvedSimulation, ConfigError> {
    let duration_fs = config
        .simulation
        .duration
        .as_deref()
        .map(|d| duration(d, "simulation.duration"))
        .transpose()?;

    let clocks = config
        .clocks
        .iter()
        .map(|(name, def)| resolve_clock(name, def))
        .collect::<Result<Vec<_>, _>>()?;

    let waveform = match config.waveform.format {
        WaveformFormat::Vcd => config.waveform.path.as_ref().map(PathBuf::from),
        WaveformFormat::None => None,
    };

    Ok(ResolvedSimulation {
        sim: SimConfig {
            max_delta_cycles: config.simulation.max_delta_cycles,
            async_reset_applies_immediately: config.simulation.async_reset_applies_immediately,
        },
        duration_fs,
        clocks,
        waveform,
    })
}

fn duration(text: &str, field: &str) -> Result<u64, ConfigError> {
    parse_duration(text).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

fn resolve_clock(name: &str, def: &ClockDef) -> Result<ResolvedClock, ConfigError> {
    let period_fs = match (&def.frequency, &def.period) {
        (Some(freq), None) => {
            let field = format!("clocks.{name}.frequency");
            let invalid = |message: String| ConfigError::InvalidValue {
                field: field.clone(),
                message,
            };
            let f: Frequency = freq.parse().map_err(|e: strata_common::ParseFrequencyError| invalid(e.to_string()))?;
            f.period_fs()
                .ok_or_else(|| invalid(format!("{f} has no representable period")))?
        }
        (None, Some(period)) => duration(period, &format!("clocks.{name}.period"))?,
        _ => return Err(ConfigError::AmbiguousClock(name.to_string())),
    };
    if period_fs < 2 {
        return Err(ConfigError::InvalidValue {
            field: format!("clocks.{name}"),
            message: format!("period of {period_fs} fs is shorter than 2 fs"),
        });
    }
    let phase_fs = match &def.phase {
        Some(phase) => duration(phase, &format!("clocks.{name}.phase"))?,
        None => period_fs / 2,
    };
    Ok(ResolvedClock {
        domain: name.to_string(),
        period_fs,
        phase_fs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn resolve(toml: &str) -> ResolvedSimulation {
        resolve_simulation(&load_config_from_str(toml).unwrap()).unwrap()
    }

    #[test]
    fn frequency_and_period_clocks() {
        let r = resolve(
            r#"
[project]
name = "t"

[clocks.sync]
frequency = "100MHz"

[clocks.video]
period = "13.5ns"
phase = "2ns"
"#,
        );
        assert_eq!(
            r.clocks,
            vec![
                ResolvedClock {
                    domain: "sync".into(),
                    period_fs: 10_000_000,
                    phase_fs: 5_000_000,
                },
                ResolvedClock {
                    domain: "video".into(),
                    period_fs: 13_500_000,
                    phase_fs: 2_000_000,
                },
            ]
        );
    }

    #[test]
    fn simulation_policy_and_duration() {
        let r = resolve(
            r#"
[project]
name = "t"

[simulation]
max_delta_cycles = 64
duration = "2us"
"#,
        );
        assert_eq!(r.sim.max_delta_cycles, 64);
        assert!(r.sim.async_reset_applies_immediately);
        assert_eq!(r.duration_fs, Some(2_000_000_000));
    }

    #[test]
    fn waveform_path_only_for_vcd() {
        let r = resolve(
            r#"
[project]
name = "t"

[waveform]
path = "trace.vcd"
"#,
        );
        assert_eq!(r.waveform, Some(PathBuf::from("trace.vcd")));

        let r = resolve(
            r#"
[project]
name = "t"

[waveform]
format = "none"
path = "trace.vcd"
"#,
        );
        assert!(r.waveform.is_none());
    }

    #[test]
    fn clock_without_timing_is_ambiguous() {
        let err = load_config_from_str(
            r#"
[project]
name = "t"

[clocks.sync]
phase = "1ns"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousClock(_)));
    }

    #[test]
    fn unparseable_frequency() {
        let err = load_config_from_str(
            r#"
[project]
name = "t"

[clocks.sync]
frequency = "fast"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "clocks.sync.frequency"));
    }

    #[test]
    fn too_short_period() {
        let err = load_config_from_str(
            r#"
[project]
name = "t"

[clocks.sync]
period = "1fs"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
