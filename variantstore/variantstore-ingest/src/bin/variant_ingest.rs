use anyhow::{Context, Result};
use variantstore_core::config::{StoreConfig, DEFAULT_INDEX_NAME};
use variantstore_ingest::{run_ingest, IngestConfig, DEFAULT_BATCH_SIZE};

struct CliArgs {
    project_id: String,
    vcf: String,
    out_root: String,
    index_root: String,
    index_name: String,
    batch_size: usize,
    max_error_rate: f64,
    threads: usize,
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} --project-id <id> --vcf <path> --out-root <dir> --index-root <dir> \
         [--index-name <name>] [--batch-size <n>] [--max-error-rate <fraction>] [--threads <n>]",
        program
    );
}

fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut project_id = None;
    let mut vcf = None;
    let mut out_root = None;
    let mut index_root = None;
    let mut index_name = DEFAULT_INDEX_NAME.to_string();
    let mut batch_size = DEFAULT_BATCH_SIZE;
    let mut max_error_rate = 0.0f64;
    let mut threads = 1usize;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args
            .get(i + 1)
            .with_context(|| format!("missing value for {}", flag))?;
        match flag {
            "--project-id" => project_id = Some(value.clone()),
            "--vcf" => vcf = Some(value.clone()),
            "--out-root" => out_root = Some(value.clone()),
            "--index-root" => index_root = Some(value.clone()),
            "--index-name" => index_name = value.clone(),
            "--batch-size" => {
                batch_size = value
                    .parse()
                    .with_context(|| format!("invalid --batch-size: {}", value))?
            }
            "--max-error-rate" => {
                max_error_rate = value
                    .parse()
                    .with_context(|| format!("invalid --max-error-rate: {}", value))?
            }
            "--threads" => {
                threads = value
                    .parse()
                    .with_context(|| format!("invalid --threads: {}", value))?
            }
            other => {
                usage(&args[0]);
                anyhow::bail!("unknown flag: {}", other);
            }
        }
        i += 2;
    }

    let missing = |name: &str| {
        usage(&args[0]);
        anyhow::anyhow!("missing required flag: {}", name)
    };
    Ok(CliArgs {
        project_id: project_id.ok_or_else(|| missing("--project-id"))?,
        vcf: vcf.ok_or_else(|| missing("--vcf"))?,
        out_root: out_root.ok_or_else(|| missing("--out-root"))?,
        index_root: index_root.ok_or_else(|| missing("--index-root"))?,
        index_name,
        batch_size,
        max_error_rate,
        threads,
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = parse_args()?;
    let mut store = StoreConfig::new(cli.out_root, cli.index_root);
    store.index_name = cli.index_name;

    let mut config = IngestConfig::new(cli.project_id, cli.vcf, store);
    config.batch_size = cli.batch_size;
    config.max_error_rate = cli.max_error_rate;
    config.threads = cli.threads;

    let stats = run_ingest(&config).context("ingestion failed")?;
    println!(
        "ingested {} of {} rows ({} skipped)",
        stats.ingested_rows, stats.total_rows, stats.skipped_rows
    );
    Ok(())
}
