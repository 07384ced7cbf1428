use clap::Parser;
use glam::Vec3;
use sog_lib::{decode_async, decode_bytes, write_ply, SogDataV2, SogResult, SplatView};
use std::error::Error;
use std::fs;
use std::process;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "SOG Decoder",
    version = "1.0",
    about = "Decodes SOG v2 splat containers and optionally exports them as PLY"
)]
struct Cli {
    #[arg(
        short = 'i',
        long = "input",
        value_name = "INPUT",
        required = true,
        help = "Path to the input .sog file."
    )]
    input: String,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "OUTPUT",
        help = "Path to the output PLY file. Without it only a summary is printed."
    )]
    output: Option<String>,

    #[arg(
        short = 'n',
        value_name = "INCLUDE_NORMALS",
        default_value = "false",
        long = "normals",
        help = "Include zeroed normals in the output PLY file (only valid with --output)."
    )]
    include_normals: bool,

    #[arg(
        short = 'a',
        long = "async",
        default_value = "false",
        help = "Read the input file asynchronously."
    )]
    async_mode: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        default_value = "false",
        help = "Log debug details. RUST_LOG takes precedence."
    )]
    verbose: bool,
}

async fn load_async(path: &str) -> SogResult<SogDataV2> {
    let mut file = tokio::fs::File::open(path).await?;
    decode_async(&mut file).await
}

fn load(path: &str) -> SogResult<SogDataV2> {
    let raw_data = fs::read(path)?;
    decode_bytes(&raw_data)
}

fn position_bounds(view: &SplatView<'_>) -> Option<(Vec3, Vec3)> {
    view.splats().fold(None, |bounds, splat| {
        let p = splat.position;
        Some(match bounds {
            None => (p, p),
            Some((min, max)) => (min.min(p), max.max(p)),
        })
    })
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if cli.include_normals && cli.output.is_none() {
        eprintln!("Error: --normals (-n) can only be used with an output file (-o).");
        process::exit(1);
    }

    let mode = if cli.async_mode {
        "Asynchronous"
    } else {
        "Synchronous"
    };
    info!(
        "Mode: {} | Input: {} | Output: {}",
        mode,
        cli.input,
        cli.output.as_deref().unwrap_or("-")
    );

    let start = Instant::now();

    let data = if cli.async_mode {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        rt.block_on(load_async(&cli.input))
    } else {
        load(&cli.input)
    }
    .unwrap_or_else(|e| {
        eprintln!("Error decoding {} ({:?}): {}", cli.input, e.class(), e);
        process::exit(1);
    });

    let elapsed = start.elapsed().as_millis();
    info!("Decode Time: {} ms", elapsed);

    data.scoped(|view| -> Result<(), Box<dyn Error + Send + Sync>> {
        info!(
            splats = view.count,
            sh_degree = view.sh_degree,
            antialiased = view.antialiased,
            "Decoded container"
        );
        if let Some((min, max)) = position_bounds(&view) {
            debug!(?min, ?max, "Position bounds");
        }

        let Some(output) = &cli.output else {
            return Ok(());
        };
        let mut ply = Vec::new();
        write_ply(&mut ply, &view, cli.include_normals)?;
        fs::write(output, &ply)?;
        println!("Successfully wrote to '{}'.", output);
        Ok(())
    })??;

    Ok(())
}
