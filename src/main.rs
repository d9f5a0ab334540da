use std::env;
use std::path::Path;
use std::process::ExitCode;

use mbyte_huffman::{CodecConfig, HuffmanCodec, Result};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:\n  mbhuff encode <input> <codebook> <encoded>\n  mbhuff decode <output> <codebook> <encoded>";

fn load_config() -> Result<CodecConfig> {
    match env::var_os("MBHUFF_CONFIG") {
        Some(path) => CodecConfig::from_file(Path::new(&path)),
        None => Ok(CodecConfig::default()),
    }
}

fn run(mode: &str, target: &Path, codebook: &Path, encoded: &Path) -> Result<()> {
    let codec = HuffmanCodec::new(load_config()?);
    match mode {
        "encode" => codec.encode_files(target, codebook, encoded).map(|_| ()),
        _ => codec.decode_files(target, codebook, encoded).map(|_| ()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let [mode, target, codebook, encoded] = args.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    if mode != "encode" && mode != "decode" {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    match run(mode, Path::new(target), Path::new(codebook), Path::new(encoded)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mbhuff: {e}");
            ExitCode::FAILURE
        }
    }
}
