//! Bundling, linting and rendering of the assembled tree with external
//! Node.js tools (`swagger-cli`, `spectral`, `redoc-cli`).

use crate::error::{Error, Result};
use crate::serializer::write_to_file;
use log::{debug, info};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_TOOLS_DIR: &str = "./node_modules/.bin";
pub const BUNDLE_FILE: &str = "bundle.yml";
pub const HTML_FILE: &str = "index.html";

const TEMPLATE_REF_KEY: &str = "$$ref";
const REF_KEY: &str = "$ref";

/// Files produced by [`Toolchain::run_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainOutput {
    pub bundle: PathBuf,
    pub html: PathBuf,
}

/// External tools, resolved from one binary directory.
#[derive(Debug, Clone)]
pub struct Toolchain {
    bin_dir: PathBuf,
}

impl Toolchain {
    pub fn new(bin_dir: PathBuf) -> Self {
        Self { bin_dir }
    }

    /// Bundles `index.yml` into a single document, restores component
    /// references, lints the bundle and renders it to HTML.
    pub fn run_all(&self, root_index: &Path, output_dir: &Path) -> Result<ToolchainOutput> {
        let bundle = output_dir.join(BUNDLE_FILE);
        let html = output_dir.join(HTML_FILE);

        self.bundle(root_index, &bundle)?;
        restore_schema_refs(&bundle)?;
        self.lint(&bundle)?;
        self.render(&bundle, &html)?;

        info!("Rendered documentation: {}", html.display());
        Ok(ToolchainOutput { bundle, html })
    }

    pub fn bundle(&self, root_index: &Path, bundle: &Path) -> Result<()> {
        info!("Bundling {} into {}", root_index.display(), bundle.display());
        self.run(
            "swagger-cli",
            [
                OsStr::new("bundle"),
                root_index.as_os_str(),
                OsStr::new("--outfile"),
                bundle.as_os_str(),
                OsStr::new("--type"),
                OsStr::new("yaml"),
            ],
        )
    }

    pub fn lint(&self, bundle: &Path) -> Result<()> {
        info!("Linting {}", bundle.display());
        self.run("spectral", [OsStr::new("lint"), bundle.as_os_str()])
    }

    pub fn render(&self, bundle: &Path, html: &Path) -> Result<()> {
        info!("Rendering {} to {}", bundle.display(), html.display());
        self.run(
            "redoc-cli",
            [
                OsStr::new("bundle"),
                bundle.as_os_str(),
                OsStr::new("--output"),
                html.as_os_str(),
                OsStr::new("--options.onlyRequiredInSamples"),
            ],
        )
    }

    fn run<'a, I>(&self, tool: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a OsStr>,
    {
        let program = self.bin_dir.join(tool);
        debug!("Running {}", program.display());

        let output = Command::new(&program)
            .args(args)
            .output()
            .map_err(|e| Error::ExternalTool {
                tool: tool.to_string(),
                message: format!("failed to start {}: {}", program.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: tool.to_string(),
                message: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{} output:\n{}", tool, stdout.trim_end());
        }
        Ok(())
    }
}

/// Rewrites the `$$ref` keys of component references to `$ref` once the
/// bundler has resolved every fragment reference.
pub fn restore_schema_refs(bundle: &Path) -> Result<()> {
    let content = fs::read_to_string(bundle)?;
    let restored = content.replace(TEMPLATE_REF_KEY, REF_KEY);
    write_to_file(&restored, bundle).map_err(|e| Error::ExternalTool {
        tool: "bundle".to_string(),
        message: format!("{:#}", e),
    })
}
