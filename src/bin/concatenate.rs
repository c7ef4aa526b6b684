//! Concatenate document packages
//!
//! Appends every input to the first and writes the result.
//!
//! Usage:
//!   folio-concat [--bmtree] [--password PW] -o OUT FILE...
//!
//! With `--bmtree` the bookmarks of each input are nested under a new
//! bookmark named after the file, pointing at its first page.

use std::path::{Path, PathBuf};

use pdf_folio::io::{render_file, PasswordHandler, Reader};
use pdf_folio::model::{BookmarkMode, Document};

struct ConcatConfig {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    bookmark_tree: bool,
    password: Option<String>,
}

impl ConcatConfig {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut inputs = Vec::new();
        let mut output = None;
        let mut bookmark_tree = false;
        let mut password = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--bmtree" => bookmark_tree = true,
                "-o" | "--output" => {
                    i += 1;
                    output = Some(PathBuf::from(args.get(i).ok_or("-o needs a file name")?));
                },
                "--password" => {
                    i += 1;
                    password = Some(args.get(i).ok_or("--password needs a value")?.clone());
                },
                other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
                file => inputs.push(PathBuf::from(file)),
            }
            i += 1;
        }

        let output = output.ok_or("no output file given")?;
        if inputs.is_empty() {
            return Err("no input files".to_string());
        }
        Ok(Self {
            inputs,
            output,
            bookmark_tree,
            password,
        })
    }
}

fn title(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() {
    env_logger::init();

    let config = match ConcatConfig::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: folio-concat [--bmtree] [--password PW] -o OUT FILE...");
            std::process::exit(1);
        },
    };

    let mut reader = Reader::new();
    if let Some(password) = &config.password {
        reader = reader.with_decryption(PasswordHandler::new(password.clone()));
    }

    let mut result: Option<Document> = None;
    for path in &config.inputs {
        let doc = match reader.load_file(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Error loading {}: {}", path.display(), e);
                std::process::exit(1);
            },
        };
        match result.as_mut() {
            None => {
                let mut doc = doc;
                if config.bookmark_tree {
                    doc.nest_bookmarks(title(path));
                }
                result = Some(doc);
            },
            Some(target) => {
                let mode = if config.bookmark_tree {
                    BookmarkMode::Nested(title(path))
                } else {
                    BookmarkMode::Flatten
                };
                match target.concatenate(doc, mode) {
                    Ok(pages) => log::info!("appended {} pages from {}", pages, path.display()),
                    Err(e) => {
                        eprintln!("Error appending {}: {}", path.display(), e);
                        std::process::exit(1);
                    },
                }
            },
        }
    }

    let Some(doc) = result else {
        std::process::exit(1);
    };
    if let Err(e) = render_file(&doc, &config.output) {
        eprintln!("Error writing {}: {}", config.output.display(), e);
        std::process::exit(1);
    }
    println!("{} pages written to {}", doc.pages().len(), config.output.display());
}
