use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use w65816_analyze::analyze::{analyze_entries, prepare, Report};
use w65816_analyze::model::{load_config, load_cop_defs, load_listing, load_raw_bin};
use w65816_rs::{Analyzer, CopTable, Ea, XrefKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "65816 operand and context analysis CLI", long_about = None)]
struct Cli {
    /// Load address of the image in the 24-bit address space
    #[arg(long, default_value = "0", value_parser = parse_ea)]
    base: Ea,
    /// Skip N bytes at start of file before loading (e.g. a copier header)
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input ROM image
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded segments
    Sections,
    /// Run the analysis over a pre-decoded listing
    Analyze {
        /// Instruction listing (JSON: { instructions, functions })
        #[arg(long, value_name = "FILE")]
        listing: PathBuf,
        /// Entry addresses (hex or dec). Repeat flag to add multiple entries.
        #[arg(long = "entry", value_name = "ADDR", value_parser = parse_ea)]
        entries: Vec<Ea>,
        /// Maximum instructions to analyze before stopping
        #[arg(long, default_value_t = 100_000usize)]
        max_instr: usize,
        /// Analysis settings (JSON, missing fields keep defaults)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// COP command definitions (JSON list)
        #[arg(long, value_name = "FILE")]
        cop_defs: Option<PathBuf>,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write analysis output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_ea(s: &str) -> Result<Ea> {
    let s = s.trim();
    let v = if let Some(hex) = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('$'))
    {
        u32::from_str_radix(hex, 16)?
    } else {
        s.parse::<u32>()?
    };
    anyhow::ensure!(v <= 0xFF_FFFF, "{s} is outside the 24-bit address space");
    Ok(v)
}

fn render_text(report: &Report) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "Analysis summary:");
    let entries: Vec<String> = report.entries.iter().map(|a| format!("{a:#08x}")).collect();
    let _ = writeln!(buf, "  entries     : {entries:?}");
    let _ = writeln!(buf, "  insts       : {}", report.instructions);
    let _ = writeln!(buf, "  xrefs       : {}", report.xrefs.len());
    let _ = writeln!(buf, "  functions   : {}", report.functions.len());
    let _ = writeln!(buf, "  jump tables : {}", report.jump_tables.len());
    if !report.missing.is_empty() {
        let missing: Vec<String> = report.missing.iter().map(|a| format!("{a:#08x}")).collect();
        let _ = writeln!(buf, "  not listed  : {missing:?}");
    }
    let _ = writeln!(buf, "References:");
    for x in &report.xrefs {
        let kind = match x.kind {
            XrefKind::Code(k) => format!("code {k:?}"),
            XrefKind::Data(k) => format!("data {k:?}"),
        };
        let _ = writeln!(buf, "  {:#08x} -> {:#08x} ({kind})", x.from, x.to);
    }
    let _ = writeln!(buf, "Functions:");
    for f in &report.functions {
        let _ = writeln!(buf, "  {:#08x}..{:#08x}", f.start, f.end);
    }
    for jt in &report.jump_tables {
        let _ = writeln!(buf, "Jump table at {:#08x} (base {:#08x}):", jt.ea, jt.table.base);
        for (entry, target) in &jt.table.entries {
            let _ = writeln!(buf, "  {entry:#08x}: {target:#08x}");
        }
    }
    if !report.indirect.is_empty() {
        let _ = writeln!(buf, "Indirect transfers:");
        for ea in &report.indirect {
            let _ = writeln!(buf, "  {ea:#08x}");
        }
    }
    let _ = writeln!(buf, "Context:");
    for (reg, ranges) in &report.context {
        for r in ranges {
            let end = r.end.map(|e| format!("{e:#08x}")).unwrap_or_else(|| "end".into());
            let val = r.value.map(|v| format!("{v:#x}")).unwrap_or_else(|| "?".into());
            let _ = writeln!(buf, "  {reg:<3} {:#08x}..{end:<8} = {val}", r.start);
        }
    }
    buf
}

fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(&cli.input, cli.base, cli.skip, cli.len)?;

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<10} {:<10} {:<6} {:<6}", "name", "start", "end", "perms", "kind");
            for s in &img.segments {
                println!("{:<10} {:#08x}   {:#08x}   {:<6} {:<6}", s.name, s.base, s.end(), s.perms, s.kind);
            }
        }
        Command::Analyze { listing, entries, max_instr, config, cop_defs, format, out } => {
            let cfg = load_config(config.as_deref())?;
            let cop = match &cop_defs {
                Some(path) => load_cop_defs(path)?,
                None => CopTable::default(),
            };
            let file = load_listing(&listing)?;
            anyhow::ensure!(!file.instructions.is_empty(), "listing {} is empty", listing.display());

            let mut analyzer = Analyzer::new(cfg).with_cop_table(cop);
            let (decoder, mut db) = prepare(&analyzer, &img, &file);

            // default seeds: every known function, else the first listed instruction
            let mut seeds: Vec<Ea> = if entries.is_empty() {
                let funcs: Vec<Ea> = file.functions.iter().map(|f| f.start).collect();
                if funcs.is_empty() {
                    decoder.first().into_iter().collect()
                } else {
                    funcs
                }
            } else {
                entries
            };
            seeds.sort_unstable();
            seeds.dedup();

            let walk = analyze_entries(&mut analyzer, &img, &decoder, &mut db, &seeds, max_instr);
            let report = Report::new(&seeds, &walk, &db, &analyzer.ctx);
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)? + "\n",
                OutputFormat::Text => render_text(&report),
            };
            emit(&text, out.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ea_hex_dollar_and_dec() {
        assert_eq!(parse_ea("0x8000").unwrap(), 0x8000);
        assert_eq!(parse_ea("$80FFC0").unwrap(), 0x80_FFC0);
        assert_eq!(parse_ea("16").unwrap(), 16);
        assert!(parse_ea("zz").is_err());
        assert!(parse_ea("0x1000000").is_err());
    }

    #[test]
    fn cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "w65816-analyze", "--base", "0x808000", "rom.bin", "analyze", "--listing", "l.json",
            "--entry", "0x808000", "--entry", "$809000", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.base, 0x80_8000);
        match cli.cmd {
            Command::Analyze { entries, format, .. } => {
                assert_eq!(entries, vec![0x80_8000, 0x80_9000]);
                assert!(matches!(format, OutputFormat::Json));
            }
            Command::Sections => panic!("expected analyze"),
        }
    }
}
