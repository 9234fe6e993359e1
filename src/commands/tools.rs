use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ToolsArgs;
use crate::detect::engine::installed_languages;
use crate::util::tool_version;

pub fn run(args: ToolsArgs) -> Result<()> {
    let mut missing = Vec::new();

    match tool_version(&args.pdftoppm_bin, &["-v"]) {
        Some(version) => {
            info!(program = %args.pdftoppm_bin, version = %version, "renderer available")
        }
        None => {
            warn!(program = %args.pdftoppm_bin, "renderer missing");
            missing.push(args.pdftoppm_bin.clone());
        }
    }

    match tool_version(&args.tesseract_bin, &["--version"]) {
        Some(version) => info!(
            program = %args.tesseract_bin,
            version = %version,
            "recognition engine available"
        ),
        None => {
            warn!(program = %args.tesseract_bin, "recognition engine missing");
            missing.push(args.tesseract_bin.clone());
        }
    }

    if let Some(languages) = installed_languages(&args.tesseract_bin) {
        if languages.iter().any(|language| language == &args.lang) {
            info!(
                language = %args.lang,
                installed = languages.len(),
                "recognition language installed"
            );
        } else {
            warn!(
                language = %args.lang,
                installed = %languages.join(","),
                "recognition language not installed"
            );
            missing.push(format!("{} traineddata", args.lang));
        }
    }

    if !missing.is_empty() {
        bail!("missing external tools: {}", missing.join(", "));
    }

    info!("all external tools available");
    Ok(())
}
