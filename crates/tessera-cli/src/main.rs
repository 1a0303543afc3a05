use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use tessera_accel::{BackendConfig, BackendDescriptor, EltwiseAddOp, TilePlan, INPUT0, INPUT1};
use tessera_core::{DType, Result, Shape, Storage, Tensor, TesseraError, Workspace};

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Scratchpad-tiled elementwise offload",
    long_about = "Plan and run tiled elementwise addition on simulated accelerator backends.\n\nSet RUST_LOG (or pass -v, -vv, -vvv) to see planning, dispatch and transfer detail.",
    version,
)]
struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List backend presets
    Info {
        /// Print each preset as a JSON backend config
        #[arg(long)]
        json: bool,
    },
    /// Print the tile plan for a tensor shape
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Add two generated tensors and check against an untiled sum
    Run {
        #[command(flatten)]
        target: TargetArgs,
        /// Input data
        #[arg(long, value_enum, default_value = "seq")]
        fill: Fill,
        /// Seed for random fill
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Tensor shape (comma-separated)
    #[arg(long, default_value = "1,10")]
    shape: String,
    /// Element encoding (defaults to the backend's native one)
    #[arg(long)]
    dtype: Option<String>,
    /// Backend preset: reference, smv
    #[arg(long, default_value = "reference")]
    backend: String,
    /// Override the scratchpad capacity in bytes
    #[arg(long)]
    spad_bytes: Option<usize>,
    /// JSON backend config (takes precedence over --backend)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Fill {
    /// a[i] = b[i] = i
    Seq,
    /// Uniform in [-1, 1)
    Random,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Info { json } => cmd_info(json),
        Commands::Plan { target } => cmd_plan(&target),
        Commands::Run { target, fill, seed } => cmd_run(&target, fill, seed),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_info(json: bool) -> Result<()> {
    println!("tessera v{}\n", env!("CARGO_PKG_VERSION"));
    println!("Backends");
    for name in BackendDescriptor::preset_names() {
        let backend = BackendDescriptor::preset(name)?;
        if json {
            println!("{}", BackendConfig::from_descriptor(&backend)?.to_json_string()?);
        } else {
            println!("  {}", backend);
        }
    }
    println!("\nOffloadable dtypes: {}, {}", DType::F32, DType::F16);
    Ok(())
}

/// Resolved backend, shape and dtype for one command.
struct Target {
    backend: BackendDescriptor,
    shape: Shape,
    dtype: DType,
}

impl TargetArgs {
    fn resolve(&self) -> Result<Target> {
        let mut backend = match &self.config {
            Some(path) => BackendConfig::from_path(path)?.into_descriptor()?,
            None => BackendDescriptor::preset(&self.backend)?,
        };
        if let Some(bytes) = self.spad_bytes {
            backend = backend.with_spad_capacity(bytes);
        }
        let dtype = match &self.dtype {
            Some(d) => DType::from_str(d)?,
            None => backend.native_dtype().ok_or_else(|| {
                TesseraError::Config(format!("backend '{}' lists no dtypes", backend.name))
            })?,
        };
        let shape = parse_shape(&self.shape)?;
        tracing::debug!("target: backend={} shape={} dtype={}", backend.name, shape, dtype);
        Ok(Target {
            backend,
            shape,
            dtype,
        })
    }
}

fn parse_shape(s: &str) -> Result<Shape> {
    let dims = s
        .split(',')
        .map(|d| {
            d.trim()
                .parse::<usize>()
                .map_err(|_| TesseraError::Config(format!("bad dimension '{}' in shape '{}'", d, s)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Shape::new(&dims))
}

fn cmd_plan(args: &TargetArgs) -> Result<()> {
    let target = args.resolve()?;
    let plan = TilePlan::new(&target.shape, target.dtype, &target.backend);

    println!("backend:        {}", target.backend);
    println!("shape:          {} {}", target.shape, target.dtype);
    println!("max tile elems: {}", plan.max_tile_elems());
    println!("tiles:          {}\n", plan.tile_count());

    println!("{:<6} {:>10} {:>10} {:>8} {:>8}", "Tile", "Rows", "Offset", "Len", "Stored");
    println!("{}", "-".repeat(46));
    for range in plan.ranges() {
        println!("{:<6} {:>10} {:>10} {:>8} {:>8}",
            range.index,
            format!("{}..{}", range.rows.start, range.rows.end),
            range.offset,
            range.len,
            plan.tile_shape(range).storage_size(),
        );
    }
    Ok(())
}

fn cmd_run(args: &TargetArgs, fill: Fill, seed: u64) -> Result<()> {
    let target = args.resolve()?;
    let n = target.shape.numel();

    let mut a = Tensor::zeros("a", target.shape.clone(), target.dtype);
    let mut b = Tensor::zeros("b", target.shape.clone(), target.dtype);
    match fill {
        Fill::Seq => {
            a.fill_with(|i| i as f32);
            b.fill_with(|i| i as f32);
        }
        Fill::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            a.fill_with(|_| rng.gen_range(-1.0f32..1.0));
            b.fill_with(|_| rng.gen_range(-1.0f32..1.0));
        }
    }

    let mut expected = Storage::zeros(target.dtype, n);
    tessera_kernels::add_storage(a.storage(), b.storage(), &mut expected, n)?;

    let mut ws = Workspace::new();
    ws.add_tensor(a)?;
    ws.add_tensor(b)?;
    let mut op = EltwiseAddOp::new("sum", target.backend);
    op.set_input(INPUT0, "a")?;
    op.set_input(INPUT1, "b")?;

    let start = Instant::now();
    let report = op.run(&mut ws)?;
    let elapsed = start.elapsed();

    let out = ws.tensor(op.output_name())?;
    let mismatches = match (out.storage(), &expected) {
        (Storage::F16(got), Storage::F16(want)) => {
            got.iter().zip(want).filter(|(g, w)| g.to_bits() != w.to_bits()).count()
        }
        (Storage::F32(got), Storage::F32(want)) => {
            got.iter().zip(want).filter(|(g, w)| g.to_bits() != w.to_bits()).count()
        }
        _ => n,
    };

    println!("backend:     {}", op.backend());
    println!("shape:       {} {}", out.shape(), out.dtype());
    println!("kernel:      {}", report.kernel.map_or("none".to_string(), |k| k.to_string()));
    println!("tiles:       {} ({})", report.tiles, report.mode);
    println!("transfers:   {} loads, {} stores, {} bytes",
        report.stats.loads, report.stats.stores, report.stats.total_bytes());
    println!("time:        {:.3}ms", elapsed.as_secs_f64() * 1000.0);

    let preview: Vec<String> = out.to_f32_vec().iter().take(8).map(|v| v.to_string()).collect();
    println!("output[..8]: [{}]", preview.join(", "));

    if mismatches > 0 {
        return Err(TesseraError::StorageError(format!(
            "{} of {} elements differ from the untiled sum",
            mismatches, n
        )));
    }
    println!("verify:      ok (bitwise equal to untiled sum)");
    Ok(())
}
