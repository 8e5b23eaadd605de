use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result, anyhow};
use node_forge_shadergen::{
    dsl,
    generator::{
        FileLibrary, GenContext, GenOptions, HlslResourceBinding, HlslShaderGenerator,
        MemoryLibrary, Shader, StageKind,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: node-forge-shadergen --document <doc.json> [--material <graph>] \
[--options <options.json>] [--library <dir>] [--output-dir <dir>] [--implicit-bindings]";

#[derive(Debug, Default, Clone)]
struct Cli {
    document: Option<PathBuf>,
    material: Option<String>,
    options: Option<PathBuf>,
    libraries: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    implicit_bindings: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match flag {
            "--document" => {
                cli.document = Some(PathBuf::from(value()?));
                i += 2;
            }
            "--material" => {
                cli.material = Some(value()?);
                i += 2;
            }
            "--options" => {
                cli.options = Some(PathBuf::from(value()?));
                i += 2;
            }
            "--library" => {
                cli.libraries.push(PathBuf::from(value()?));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                cli.output_dir = Some(PathBuf::from(value()?));
                i += 2;
            }
            "--implicit-bindings" => {
                cli.implicit_bindings = true;
                i += 1;
            }
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other => return Err(anyhow!("unknown argument: {other}\n{USAGE}")),
        }
    }
    Ok(cli)
}

fn write_outputs(shader: &Shader, output_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;
    let name = shader.name();
    let files = [
        (format!("{name}.vs.hlsl"), shader.source(StageKind::Vertex)),
        (format!("{name}.ps.hlsl"), shader.source(StageKind::Pixel)),
        (
            format!("{name}.bindings.json"),
            shader
                .binding_table_json()
                .context("failed to serialize binding table")?,
        ),
    ];
    for (file_name, text) in files {
        let path = output_dir.join(file_name);
        std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let document_path = cli
        .document
        .ok_or_else(|| anyhow!("--document is required\n{USAGE}"))?;
    let doc = dsl::load_document_from_path(&document_path)?;
    let graph_desc = dsl::find_graph(&doc, cli.material.as_deref())?;

    let options = match &cli.options {
        Some(path) => GenOptions::load_from_path(path)?,
        None => GenOptions::default(),
    };

    let mut ctx = GenContext::new(options);
    if !cli.libraries.is_empty() {
        let library = FileLibrary::new(cli.libraries).with_fallback(MemoryLibrary::builtin());
        ctx = ctx.with_resolver(Arc::new(library));
    }
    if !cli.implicit_bindings {
        ctx = ctx.with_binding_strategy(HlslResourceBinding::default());
    }

    let started = Instant::now();
    let generator = HlslShaderGenerator::new();
    let graph = generator
        .build_graph(graph_desc)
        .with_context(|| format!("failed to build graph '{}'", graph_desc.name))?;
    let shader = generator
        .generate(&graph_desc.name, &graph, &mut ctx)
        .with_context(|| format!("failed to generate hlsl for '{}'", graph_desc.name))?;
    info!(
        material = %graph_desc.name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated"
    );

    let output_dir = cli.output_dir.unwrap_or_else(|| PathBuf::from("."));
    write_outputs(&shader, &output_dir)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;
    run(cli)
}
