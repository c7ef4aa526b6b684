//! Convert document packages to PDF/A
//!
//! Loads each package, runs a PDF/A conversion and writes the result next
//! to the input (or into `--output-dir`). Files that fail to load are
//! reported and skipped.
//!
//! Usage:
//!   folio-preflight [options] FILE...
//!
//! Options:
//!   --target NAME       default target, e.g. "PDF/A-2b" (default PDF/A-1a)
//!   --any               accept any PDF/A level the file already claims
//!   --lang TAG          language set on files that declare none
//!   --password PW       password for encrypted packages
//!   --threads N         rasterize pages on N threads
//!   --output-dir DIR    where converted files go
//!   --dry-run           report without writing

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use pdf_folio::config::{ConversionConfig, ProfilerConfig};
use pdf_folio::io::{render_file, PasswordHandler, Reader};
use pdf_folio::model::Locale;
use pdf_folio::profile::{ConversionState, PdfAConversion, StandardProfile};

struct PreflightConfig {
    files: Vec<PathBuf>,
    target: Option<StandardProfile>,
    any: bool,
    language: Option<Locale>,
    password: Option<String>,
    threads: Option<usize>,
    output_dir: Option<PathBuf>,
    dry_run: bool,
}

impl PreflightConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self {
            files: Vec::new(),
            target: None,
            any: false,
            language: None,
            password: None,
            threads: None,
            output_dir: None,
            dry_run: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = |i: usize| args.get(i + 1).cloned().ok_or(format!("{} needs a value", args[i]));
            match args[i].as_str() {
                "--target" => {
                    config.target = Some(value(i)?.parse().map_err(|e| format!("{}", e))?);
                    i += 1;
                },
                "--any" => config.any = true,
                "--lang" => {
                    config.language = Some(value(i)?.parse().map_err(|e| format!("{}", e))?);
                    i += 1;
                },
                "--password" => {
                    config.password = Some(value(i)?);
                    i += 1;
                },
                "--threads" => {
                    let n = value(i)?;
                    config.threads = Some(n.parse().map_err(|_| format!("invalid thread count '{}'", n))?);
                    i += 1;
                },
                "--output-dir" => {
                    config.output_dir = Some(PathBuf::from(value(i)?));
                    i += 1;
                },
                "--dry-run" => config.dry_run = true,
                other if other.starts_with("--") => return Err(format!("unknown option {}", other)),
                file => config.files.push(PathBuf::from(file)),
            }
            i += 1;
        }
        if config.files.is_empty() {
            return Err("no input files".to_string());
        }
        Ok(config)
    }

    fn conversion(&self) -> Result<ConversionConfig, String> {
        let mut profiler = ProfilerConfig::new();
        if let Some(locale) = &self.language {
            profiler = profiler.with_default_language(locale.clone());
        }
        if let Some(threads) = self.threads {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| format!("cannot start thread pool: {}", e))?;
            profiler = profiler.with_raster_pool(Arc::new(pool));
        }
        let mut config = if self.any {
            ConversionConfig::any_pdfa()
        } else {
            ConversionConfig::new()
        };
        if let Some(target) = self.target {
            config = config.with_default_target(target);
        }
        Ok(config.with_profiler(profiler))
    }

    fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let name = format!("{}-pdfa.folio", stem);
        match &self.output_dir {
            Some(dir) => dir.join(name),
            None => input.with_file_name(name),
        }
    }
}

fn main() {
    env_logger::init();

    let config = match PreflightConfig::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: folio-preflight [--target NAME] [--any] [--lang TAG] [--password PW] [--threads N] [--output-dir DIR] [--dry-run] FILE...");
            std::process::exit(1);
        },
    };
    let conversion = match config.conversion() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        },
    };
    if let Some(dir) = &config.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error creating {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }

    let mut reader = Reader::new();
    if let Some(password) = &config.password {
        reader = reader.with_decryption(PasswordHandler::new(password.clone()));
    }

    let start = Instant::now();
    let mut failed = 0;
    for path in &config.files {
        let mut doc = match reader.load_file(path) {
            Ok(d) => d,
            Err(e) => {
                println!("{}: cannot load: {}", path.display(), e);
                failed += 1;
                continue;
            },
        };

        let mut job = PdfAConversion::new(conversion.clone());
        let state = match job.run(&mut doc) {
            Ok(s) => s,
            Err(e) => {
                println!("{}: {}", path.display(), e);
                failed += 1;
                continue;
            },
        };
        let target = job.used_target().map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
        println!("{}: {} ({})", path.display(), state, target);
        if let Some(report) = job.report() {
            for fix in &report.fixes {
                println!("    {}: {}", fix.feature, fix.description);
            }
            for (from, to) in &report.substituted_fonts {
                println!("    font {} -> {}", from, to);
            }
            for page in &report.rasterized {
                println!("    page {} rasterized ({})", page.index + 1, page.feature);
            }
        }

        match state {
            ConversionState::Failed => {
                if let Some(message) = job.message() {
                    println!("    {}", message);
                }
                failed += 1;
            },
            ConversionState::Fixed | ConversionState::FixedWithRasterization if !config.dry_run => {
                let out = config.output_path(path);
                if let Err(e) = render_file(&doc, &out) {
                    println!("    cannot write {}: {}", out.display(), e);
                    failed += 1;
                } else {
                    println!("    written to {}", out.display());
                }
            },
            _ => {},
        }
    }

    log::info!("processed {} files in {:?}", config.files.len(), start.elapsed());
    if failed > 0 {
        eprintln!("{} of {} files failed", failed, config.files.len());
        std::process::exit(1);
    }
}
