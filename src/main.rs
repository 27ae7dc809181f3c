use flipgraph::bits::BitVector;
use flipgraph::error::SchemeError;
use flipgraph::format;
use flipgraph::scheme::Decomposition;
use flipgraph::search::{self, SearchConfig};
use flipgraph::tensor::{Dims, Width};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

enum Mode {
    Search(PathBuf),
    Standard(Dims),
    Expand(PathBuf, Dims),
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = SearchConfig::default();
    let mut file: Option<PathBuf> = None;
    let mut dims: Option<Dims> = None;
    let mut target: Option<Dims> = None;
    let mut standard: Option<Dims> = None;
    let mut expand = false;
    let mut validate_only = false;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--test" | "--validate" => {
                validate_only = true;
                i += 1;
            }
            "--dims" => {
                dims = Some(parse_dims(&args, i + 1));
                i += 4;
            }
            "--to" => {
                target = Some(parse_dims(&args, i + 1));
                i += 4;
            }
            "--standard" => {
                standard = Some(parse_dims(&args, i + 1));
                i += 4;
            }
            "--expand" => {
                expand = true;
                i += 1;
            }
            "--steps" => {
                cfg.steps = parse_value(&args, i + 1);
                i += 2;
            }
            "--split" => {
                cfg.split = true;
                i += 1;
            }
            "--restart" => {
                cfg.restart = true;
                i += 1;
            }
            "--split-distance" => {
                cfg.split_distance = parse_value(&args, i + 1);
                i += 2;
            }
            "--no-check" => {
                cfg.check_correctness = false;
                i += 1;
            }
            "--seed" => {
                cfg.seed = Some(parse_value(&args, i + 1));
                i += 2;
            }
            "--out" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.output_dir = PathBuf::from(v);
                i += 2;
            }
            "--help" | "-h" => usage_and_exit(0),
            s if !s.starts_with("--") && file.is_none() => {
                file = Some(PathBuf::from(s));
                i += 1;
            }
            _ => usage_and_exit(2),
        }
    }

    let mode = if validate_only {
        Mode::Validate
    } else if let Some(d) = standard {
        Mode::Standard(d)
    } else if expand {
        let src = file.clone().unwrap_or_else(|| usage_and_exit(2));
        Mode::Expand(src, target.unwrap_or_else(|| usage_and_exit(2)))
    } else {
        Mode::Search(file.clone().unwrap_or_else(|| usage_and_exit(2)))
    };

    let result = match mode {
        Mode::Validate => match flipgraph::validate::validate_known_schemes() {
            Ok(()) => {
                println!("Validation OK: bundled schemes are correct.");
                return;
            }
            Err(e) => {
                eprintln!("Validation FAILED: {e}");
                std::process::exit(1);
            }
        },
        Mode::Standard(d) => write_standard(d, &cfg.output_dir),
        Mode::Expand(src, to) => {
            let from = dims.unwrap_or_else(|| usage_and_exit(2));
            expand_file(&src, from, to, &cfg.output_dir)
        }
        Mode::Search(path) => {
            let d = dims.unwrap_or_else(|| usage_and_exit(2));
            search::run_file(&path, d, &cfg).map(|r| (r.path, r.outcome.final_rank))
        }
    };

    match result {
        Ok((path, rank)) => println!("{},{rank}", path.display()),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn write_standard(dims: Dims, dir: &Path) -> Result<(PathBuf, usize), SchemeError> {
    fn as_width<B: BitVector>(dims: Dims, dir: &Path) -> Result<(PathBuf, usize), SchemeError> {
        let scheme = Decomposition::<B>::standard(dims)?;
        Ok((search::persist(&scheme, dir)?, scheme.rank()))
    }
    match dims.width() {
        Width::W64 => as_width::<u64>(dims, dir),
        Width::W128 => as_width::<u128>(dims, dir),
    }
}

fn expand_file(
    src: &Path,
    from: Dims,
    to: Dims,
    dir: &Path,
) -> Result<(PathBuf, usize), SchemeError> {
    fn as_widths<B: BitVector, W: BitVector>(
        src: &Path,
        from: Dims,
        to: Dims,
        dir: &Path,
    ) -> Result<(PathBuf, usize), SchemeError> {
        let scheme = format::load::<B>(src, from)?;
        scheme.check()?;
        let expanded = scheme.expand::<W>(to)?;
        Ok((search::persist(&expanded, dir)?, expanded.rank()))
    }
    match (from.width(), to.width()) {
        (Width::W64, Width::W64) => as_widths::<u64, u64>(src, from, to, dir),
        (Width::W64, Width::W128) => as_widths::<u64, u128>(src, from, to, dir),
        (Width::W128, Width::W64) => as_widths::<u128, u64>(src, from, to, dir),
        (Width::W128, Width::W128) => as_widths::<u128, u128>(src, from, to, dir),
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], at: usize) -> T {
    let v = args.get(at).unwrap_or_else(|| usage_and_exit(2));
    v.parse().unwrap_or_else(|_| usage_and_exit(2))
}

fn parse_dims(args: &[String], at: usize) -> Dims {
    let n = parse_value(args, at);
    let m = parse_value(args, at + 1);
    let l = parse_value(args, at + 2);
    Dims::new(n, m, l).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    })
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  flipgraph <FILE> --dims N M L [--steps S] [--split] [--restart] [--split-distance D] [--no-check] [--seed SEED] [--out DIR]\n  flipgraph --standard N M L [--out DIR]\n  flipgraph --expand <FILE> --dims N M L --to N M L [--out DIR]\n  flipgraph --validate\n\nOptions:\n  --dims N M L             Instance of FILE: (N x M) times (M x L). Scripts that take\n                           <l> <m> <n> name the same instance as L M N\n  --steps S                Flip budget per walk attempt (default: 10000000)\n  --split                  Diversify with a split before walking\n  --restart                Keep walking after each reduction until an attempt fails\n  --split-distance D       Uninformed flips after a split (default: 10)\n  --no-check               Skip verifying the input scheme\n  --seed SEED              Deterministic seed (optional)\n  --out DIR                Output directory (default: .)\n  --standard N M L         Write the schoolbook scheme for an instance\n  --expand FILE --to N M L Embed FILE into a larger instance\n  --test/--validate        Validate bundled schemes (fast, deterministic)\n\nThe result is written as k<hash>.exp (or .lexp) and reported as <path>,<rank> on stdout.\nSet RUST_LOG=info for progress on stderr.\n"
    );
    std::process::exit(code)
}
