//! `generate`: elaborate the design and write its netlist.

use strata_backend::{convert, run_tool, ToolConfig};
use strata_config::ProjectConfig;
use strata_elaborate::elaborate;
use strata_ir::Design;

use crate::{GenerateArgs, OutputLanguage};

/// Runs the `generate` command.
///
/// The module is named after `project.top` when configured, otherwise after
/// the top fragment.
pub fn run(args: &GenerateArgs, design: &Design, project: Option<&ProjectConfig>) -> Result<i32, Box<dyn std::error::Error>> {
    let output = render(args, design, project)?;
    match &args.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &output)?;
            tracing::info!(path = %path.display(), bytes = output.len(), "wrote netlist");
        }
        None => print!("{output}"),
    }
    Ok(0)
}

fn render(args: &GenerateArgs, design: &Design, project: Option<&ProjectConfig>) -> Result<String, Box<dyn std::error::Error>> {
    let elaborated = elaborate(design)?;
    let name = project.and_then(|p| p.project.top.as_deref());
    let netlist = match args.lang {
        OutputLanguage::Verilog => convert(&elaborated, name)?,
    };
    tracing::info!("{}", elaborated.fragment_info());
    if !args.synth {
        return Ok(netlist);
    }
    let tool = ToolConfig {
        program: project.and_then(|p| p.synthesis.tool.clone()),
        script: project.map(|p| p.synthesis.script.clone()).unwrap_or_default(),
    };
    Ok(run_tool(&tool, &netlist)?)
}
