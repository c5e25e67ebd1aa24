use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, ensure, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use matrt_core::{eye, make_view, matmul_into, transpose, DType, NaiveGemm, RuntimeConfig, Tensor};

#[derive(Parser)]
#[command(
    name = "matrt",
    about = "matrt dynamic matrix runtime CLI",
    long_about = "Inspect and smoke-test the matrix runtime used by generated numeric code.\n\nSettings come from an optional JSON config file, then MATRT_MAX_ELEMENTS and MATRT_FATAL.",
    version,
)]
struct Cli {
    /// Path to a JSON runtime config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show runtime configuration and supported element types
    Info,
    /// Time buffer reuse against reallocation
    Bench {
        /// Square matrix sizes to benchmark (comma-separated)
        #[arg(long, default_value = "16,64,256,1024")]
        sizes: String,
        /// Iterations per measurement
        #[arg(long, default_value = "200")]
        iters: usize,
    },
    /// Run runtime self-checks and exit non-zero on failure
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    config.install();

    match cli.command {
        Commands::Info => cmd_info(&config),
        Commands::Bench { sizes, iters } => cmd_bench(&config, &sizes, iters),
        Commands::Check => cmd_check(&config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => RuntimeConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    config.apply_env().context("applying MATRT_* environment overrides")?;
    Ok(config)
}

fn cmd_info(config: &RuntimeConfig) -> anyhow::Result<()> {
    println!("matrt v{}\n", env!("CARGO_PKG_VERSION"));

    println!("Platform");
    println!("  OS:   {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);

    println!("\nRuntime");
    println!("  fatal policy:   {}", config.fatal_policy);
    println!("  alloc retries:  {}", config.alloc_retries);
    match config.max_elements {
        Some(max) => println!("  element budget: {}", max),
        None => println!("  element budget: unlimited"),
    }
    println!("  log filter:     {}", config.log_filter);

    println!("\nDTypes");
    for dtype in DType::ALL {
        let kind = if dtype.is_float() { "float" } else { "int" };
        println!("  {:<4} {:>2} bytes  {}", dtype.to_string(), dtype.element_size(), kind);
    }
    Ok(())
}

fn cmd_bench(config: &RuntimeConfig, sizes_str: &str, iters: usize) -> anyhow::Result<()> {
    let sizes: Vec<usize> = sizes_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if sizes.is_empty() {
        bail!("no valid sizes in '{}'", sizes_str);
    }
    let iters = iters.max(1);
    let allocator = config.allocator::<f64>();

    println!("=== matrt Allocation Benchmark ===\n");
    println!("{:<14} {:>12} {:>14} {:>12} {:>12}",
        "Size", "Reuse (us)", "Realloc (us)", "Alias (us)", "Copy (us)");
    println!("{}", "-".repeat(68));

    for &sz in &sizes {
        let extents = [sz, sz];

        let mut reused: Tensor<f64> = Tensor::new();
        reused.allocate_or_reuse_with(&extents, allocator.as_ref(), config.alloc_retries)?;
        let mut failures = 0usize;
        let reuse_s = time_it(iters, || {
            if reused.allocate_or_reuse_with(&extents, allocator.as_ref(), config.alloc_retries).is_err() {
                failures += 1;
            }
        });

        let mut fresh: Tensor<f64> = Tensor::new();
        let realloc_s = time_it(iters, || {
            if fresh.allocate_or_reuse_with(&extents, allocator.as_ref(), config.alloc_retries).is_err() {
                failures += 1;
            }
            fresh.release();
        });
        ensure!(failures == 0, "{} allocation(s) failed at {}x{}", failures, sz, sz);

        let mut src: Tensor<f64> = Tensor::ones(&extents)?;
        let alias_s = time_it(iters, || {
            let mut view = Tensor::new();
            if make_view(&mut src, 0, sz, false, &mut view).is_ok() {
                std::hint::black_box(view.as_slice());
            }
        });
        let copy_s = time_it(iters, || {
            let mut view = Tensor::new();
            if src.view_copy(0, sz, &mut view).is_ok() {
                std::hint::black_box(view.as_slice());
            }
        });

        println!("{:<14} {:>12.3} {:>14.3} {:>12.3} {:>12.3}",
            format!("{}x{}", sz, sz),
            reuse_s * 1e6,
            realloc_s * 1e6,
            alias_s * 1e6,
            copy_s * 1e6,
        );
    }
    Ok(())
}

fn time_it(iters: usize, mut f: impl FnMut()) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

type Check = fn() -> anyhow::Result<()>;

fn cmd_check(config: &RuntimeConfig) -> anyhow::Result<()> {
    let checks: [(&str, Check); 8] = [
        ("reuse keeps buffer", check_reuse),
        ("squeeze trailing unit dims", check_squeeze),
        ("alias writes through", check_alias),
        ("copy view independence", check_copy),
        ("broadcast set_row", check_set_row),
        ("eye", check_eye),
        ("transpose involution", check_transpose),
        ("matmul against identity", check_matmul),
    ];

    let mut failed = 0;
    for (name, check) in checks {
        match check() {
            Ok(()) => println!("  [x] {}", name),
            Err(err) => {
                failed += 1;
                tracing::error!(check = name, error = %err, "runtime check failed");
                println!("  [ ] {}: {:#}", name, err);
            }
        }
    }

    if let Some(max) = config.max_elements {
        let allocator = config.allocator::<f64>();
        let mut t: Tensor<f64> = Tensor::new();
        let over = max.saturating_add(1);
        match t.allocate_or_reuse_with(&[over, 1], allocator.as_ref(), 0) {
            Err(_) => println!("  [x] element budget of {} enforced", max),
            Ok(_) => {
                failed += 1;
                println!("  [ ] element budget of {} not enforced", max);
            }
        }
    }

    if failed > 0 {
        bail!("{} runtime check(s) failed", failed);
    }
    println!("\nall checks passed");
    Ok(())
}

fn check_reuse() -> anyhow::Result<()> {
    let mut t: Tensor<f64> = Tensor::zeros(&[8, 8])?;
    t.fill(2.0);
    let ptr = t.as_ptr();
    ensure!(t.allocate_or_reuse(&[8, 8])?.is_reused(), "matching shape reallocated");
    ensure!(t.as_ptr() == ptr, "buffer moved on reuse");
    ensure!(t.as_slice().iter().all(|&v| v == 2.0), "contents changed on reuse");
    Ok(())
}

fn check_squeeze() -> anyhow::Result<()> {
    let t: Tensor<u8> = Tensor::zeros(&[2, 3, 1, 1])?;
    ensure!(t.extents() == [2, 3], "retained {:?}", t.extents());
    let t: Tensor<u8> = Tensor::zeros(&[4, 1, 1])?;
    ensure!(t.extents() == [4, 1], "retained {:?}", t.extents());
    Ok(())
}

fn check_alias() -> anyhow::Result<()> {
    let mut src: Tensor<i32> = Tensor::zeros(&[2, 4])?;
    {
        let mut view = Tensor::new();
        make_view(&mut src, 2, 4, false, &mut view)?;
        ensure!(view.is_alias() && !view.owns_data(), "view does not alias");
        view.fill(1);
    }
    ensure!(src.as_slice() == [0, 0, 1, 1, 1, 1, 0, 0], "source reads {:?}", src.as_slice());
    Ok(())
}

fn check_copy() -> anyhow::Result<()> {
    let mut src = Tensor::from_row(&[1i32, 2, 3, 4]);
    let mut view = Tensor::new();
    src.view_copy(1, 2, &mut view)?;
    src.fill(0);
    ensure!(view.as_slice() == [2, 3], "copy view reads {:?}", view.as_slice());
    view.release_view();
    ensure!(!view.is_bound(), "released view still bound");
    Ok(())
}

fn check_set_row() -> anyhow::Result<()> {
    let mut t: Tensor<f64> = Tensor::zeros(&[2, 3])?;
    t.set_row(0, 3, &[9.0])?;
    t.set_row(3, 3, &[1.0, 2.0, 3.0])?;
    ensure!(t.as_slice() == [9.0, 9.0, 9.0, 1.0, 2.0, 3.0], "got {}", t);
    ensure!(t.set_row(0, 3, &[1.0, 2.0]).is_err(), "count mismatch accepted");
    Ok(())
}

fn check_eye() -> anyhow::Result<()> {
    let mut t: Tensor<f64> = Tensor::full(&[2, 3], 5.0)?;
    eye(2, 3, &mut t)?;
    ensure!(t.as_slice() == [1.0, 0.0, 0.0, 0.0, 1.0, 0.0], "got {}", t);
    Ok(())
}

fn check_transpose() -> anyhow::Result<()> {
    let data: Vec<i64> = (0..12).collect();
    let a = Tensor::from_vec(data.clone(), &[3, 4])?;
    let mut t = Tensor::new();
    transpose(&a, &mut t)?;
    ensure!(t.extents() == [4, 3], "transposed shape {:?}", t.extents());
    t.transpose_in_place()?;
    ensure!(t.as_slice() == data.as_slice(), "double transpose differs");
    Ok(())
}

fn check_matmul() -> anyhow::Result<()> {
    let a = Tensor::from_vec((1..=6).map(|v| v as f64).collect(), &[2, 3])?;
    let id: Tensor<f64> = Tensor::eye(3, 3)?;
    let mut c = Tensor::new();
    matmul_into(&a, &id, &mut c, &NaiveGemm)?;
    ensure!(c.as_slice() == a.as_slice(), "a * I = {}", c);
    Ok(())
}
