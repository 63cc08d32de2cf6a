//! Configuration types deserialized from `strata.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// Simulator policy and default run length.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Clock generators keyed by domain name.
    #[serde(default)]
    pub clocks: BTreeMap<String, ClockDef>,
    /// Waveform output.
    #[serde(default)]
    pub waveform: WaveformConfig,
    /// External synthesis tool invocation.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

/// Core project metadata required in every `strata.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Name of the top fragment; used as the netlist module name.
    #[serde(default)]
    pub top: Option<String>,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// List of project authors.
    #[serde(default)]
    pub authors: Vec<String>,
}

/// The `[simulation]` table.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Delta cycles allowed per settle before the design counts as
    /// diverged.
    #[serde(default = "default_max_delta_cycles")]
    pub max_delta_cycles: u32,
    /// Whether asynchronous resets act immediately instead of at the next
    /// edge.
    #[serde(default = "default_true")]
    pub async_reset_applies_immediately: bool,
    /// Default run length, e.g. `"1us"`.
    #[serde(default)]
    pub duration: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_delta_cycles: default_max_delta_cycles(),
            async_reset_applies_immediately: true,
            duration: None,
        }
    }
}

fn default_max_delta_cycles() -> u32 {
    10_000
}

fn default_true() -> bool {
    true
}

/// A clock generator for one domain. Exactly one of `frequency` and
/// `period` must be given.
#[derive(Debug, Default, Deserialize)]
pub struct ClockDef {
    /// Clock frequency, e.g. `"50MHz"`.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Clock period, e.g. `"20ns"`.
    #[serde(default)]
    pub period: Option<String>,
    /// Time of the first active edge. Defaults to half a period.
    #[serde(default)]
    pub phase: Option<String>,
}

/// The `[waveform]` table.
#[derive(Debug, Default, Deserialize)]
pub struct WaveformConfig {
    /// Output format.
    #[serde(default)]
    pub format: WaveformFormat,
    /// Output file, relative to the project directory.
    #[serde(default)]
    pub path: Option<String>,
}

/// Waveform output format for simulation dumps.
#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WaveformFormat {
    /// Value Change Dump (IEEE 1364).
    #[default]
    Vcd,
    /// No waveform output.
    None,
}

/// The `[synthesis]` table.
#[derive(Debug, Default, Deserialize)]
pub struct SynthesisConfig {
    /// Program name or path of the synthesis tool. The `YOSYS` environment
    /// variable takes precedence.
    #[serde(default)]
    pub tool: Option<String>,
    /// Commands run after the netlist is read.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub script: Vec<String>,
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `script = "synth"` as well as `script = ["proc", "opt_clean"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
