use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use glsl_assembler::{
    manifest::ProgramDescriptor, AssembleShaderOptions, GlslTranspiler, LogDeprecations,
    ShaderAssembler, ShaderManifest, Uniforms,
};
use log::{error, info};
use rayon::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The JSON manifest describing modules and programs.
    manifest: PathBuf,
    /// The output folder for the assembled shaders.
    output_folder: PathBuf,
    /// Convert all shaders to GLSL ES 1.00.
    #[arg(long)]
    glsl100: bool,
    /// Skip the version, platform, and define macros.
    #[arg(long)]
    no_prologue: bool,
    /// The maximum log level like "warn" or "debug".
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let start = std::time::Instant::now();

    let manifest = ShaderManifest::from_file(&cli.manifest)
        .with_context(|| format!("failed to load manifest {:?}", cli.manifest))?;
    let registry = manifest.registry()?;
    info!("Loaded {} modules", registry.len());

    // Shader paths are relative to the manifest.
    let folder = cli.manifest.parent().unwrap_or_else(|| Path::new(""));
    std::fs::create_dir_all(&cli.output_folder)?;

    let assembler = ShaderAssembler::new(&registry, &manifest.platform, &GlslTranspiler);

    // Assembly is pure, so programs can be assembled in parallel.
    let failed = manifest
        .programs
        .par_iter()
        .filter(|program| match assemble_program(&assembler, program, folder, &cli) {
            Ok(()) => false,
            Err(e) => {
                error!("Error assembling {:?}: {e:?}", program.id);
                true
            }
        })
        .count();

    println!("Finished in {:?}", start.elapsed());

    if failed > 0 {
        anyhow::bail!(
            "failed to assemble {failed} of {} programs",
            manifest.programs.len()
        );
    }
    Ok(())
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level: log::LevelFilter = level
        .parse()
        .map_err(|_| anyhow!("invalid log level {level:?}"))?;

    #[cfg(not(feature = "tracing"))]
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| anyhow!("{e}"))?;

    // Log records are forwarded to the subscriber.
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_max_level(tracing_level(level))
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init()
        .map_err(|e| anyhow!("{e}"))?;

    Ok(())
}

#[cfg(feature = "tracing")]
fn tracing_level(level: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    use tracing_subscriber::filter::LevelFilter;
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

fn assemble_program(
    assembler: &ShaderAssembler,
    program: &ProgramDescriptor,
    folder: &Path,
    cli: &Cli,
) -> anyhow::Result<()> {
    let options = AssembleShaderOptions {
        transpile_to_glsl100: cli.glsl100,
        prologue: !cli.no_prologue,
        log: Some(&LogDeprecations),
        ..program.load_options(folder)?
    };
    let shaders = assembler.assemble_shaders(&options)?;

    let output = &cli.output_folder;
    std::fs::write(output.join(format!("{}.vert", program.id)), &shaders.vs)?;
    std::fs::write(output.join(format!("{}.frag", program.id)), &shaders.fs)?;

    let uniforms = shaders.get_uniforms(&Uniforms::new());
    let json = serde_json::to_string_pretty(&uniforms)?;
    std::fs::write(output.join(format!("{}.uniforms.json", program.id)), json)?;

    Ok(())
}
